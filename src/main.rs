use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io::Write;
use wellspring::hash::HashSpec;

#[derive(Parser)]
#[command(name = "wellspring")]
#[command(about = "Hardened pseudo-random generator with a Fortuna accumulator and pluggable entropy collectors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate random bytes from a provider algorithm
    Generate {
        /// Number of bytes
        #[arg(short = 'n', long, default_value = "32")]
        bytes: usize,

        /// Algorithm name (see `wellspring status` for the full list)
        #[arg(short, long, default_value = "Nist/HmacSHA-512")]
        algorithm: String,

        /// Write raw bytes to stdout instead of hex
        #[arg(long)]
        raw: bool,
    },

    /// Show entropy source, accumulator and network cache state
    Status {
        /// Emit machine-readable JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Run the built-in known-answer and output-quality checks
    Selftest,

    /// Fill every empty network seed slot now
    Fetch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    install_signal_handler();

    match cli.command {
        Commands::Generate {
            bytes,
            algorithm,
            raw,
        } => generate(bytes, &algorithm, raw)?,
        Commands::Status { json } => status(json),
        Commands::Selftest => selftest()?,
        Commands::Fetch => fetch(),
    }

    wellspring::shutdown();
    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flush the write-back queue before dying on SIGINT/SIGTERM.
fn install_signal_handler() {
    match Signals::new([SIGINT, SIGTERM]) {
        Ok(mut signals) => {
            std::thread::spawn(move || {
                if signals.forever().next().is_some() {
                    wellspring::shutdown();
                    std::process::exit(130);
                }
            });
        }
        Err(e) => tracing::warn!(error = %e, "signal handler unavailable"),
    }
}

fn generate(bytes: usize, algorithm: &str, raw: bool) -> Result<()> {
    wellspring::start();
    let output = wellspring::random_bytes(algorithm, bytes)?;

    if raw {
        std::io::stdout().write_all(&output)?;
    } else {
        for chunk in output.chunks(32) {
            let hex: String = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            println!("{}", hex);
        }
    }
    Ok(())
}

fn status(json: bool) {
    if json {
        let accumulator = wellspring::fortuna::accumulator();
        let report = serde_json::json!({
            "algorithms": wellspring::provider_algorithms(),
            "sources": wellspring::entropy::system::multiplexer().status(),
            "accumulator": {
                "reseeds": accumulator.reseed_count(),
                "events": accumulator.event_count(),
                "pool_draws": accumulator.pool_draw_counts(),
            },
            "network_slots": wellspring::net::manager()
                .map(|manager| manager.status())
                .unwrap_or_default(),
            "instant_slots_filled": wellspring::entropy::instant::holder().filled(),
        });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return;
    }

    println!("{}", "Provider algorithms".bold());
    for name in wellspring::provider_algorithms() {
        println!("  {}", name);
    }

    println!("\n{}", "Host entropy sources".bold());
    for source in wellspring::entropy::system::multiplexer().status() {
        let state = if source.failed {
            "failed".red().to_string()
        } else if source.available < 0 {
            "initializing".yellow().to_string()
        } else {
            format!("{} bytes buffered", source.available).green().to_string()
        };
        println!(
            "  {:<10} quality {:.2}  served {:<8} {}",
            source.name, source.quality, source.served, state
        );
    }

    let accumulator = wellspring::fortuna::accumulator();
    println!("\n{}", "Accumulator".bold());
    println!("  reseeds  {}", accumulator.reseed_count());
    println!("  events   {}", accumulator.event_count());
    let draws = accumulator.pool_draw_counts();
    let consulted = draws.iter().filter(|&&c| c > 0).count();
    println!("  pools    {} of {} consulted", consulted, draws.len());

    println!("\n{}", "Network seed cache".bold());
    match wellspring::net::manager() {
        Some(manager) => {
            println!("  sources  {}", manager.source_names().join(", "));
            let slots = manager.status();
            println!("  slots    {} of {} populated", slots.len(), wellspring::net::SLOTS);
            for slot in slots.iter().take(8) {
                println!(
                    "    slot {:<3} age {:>6}s  usage {}",
                    slot.slot,
                    slot.age_ms / 1000,
                    slot.usage
                );
            }
        }
        None => println!("  {}", "disabled (no sources enabled)".yellow()),
    }

    println!("\n{}", "Instant entropy".bold());
    println!(
        "  holder   {} of 64 slots filled",
        wellspring::entropy::instant::holder().filled()
    );
}

fn selftest() -> Result<()> {
    let mut failures = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("  {} {}", "PASS".green(), name);
        } else {
            println!("  {} {}", "FAIL".red(), name);
            failures += 1;
        }
    };

    println!("{}", "Known answers".bold());
    check(
        "SHA-256(abc)",
        HashSpec::Sha256.digest(b"abc")
            == decode_hex("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
    );
    check(
        "SHA-1(abc)",
        HashSpec::Sha1.digest(b"abc") == decode_hex("a9993e364706816aba3e25717850c26c9cd0d89d"),
    );
    check(
        "HMAC-SHA-256 (RFC 4231 case 1)",
        HashSpec::Sha256.hmac(&[0x0b; 20], b"Hi There")
            == decode_hex("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"),
    );

    println!("{}", "Generator output".bold());
    for name in wellspring::provider_algorithms() {
        let sample = wellspring::random_bytes(name, 16_384)?;
        let entropy = wellspring::shannon_entropy(&sample);
        check(&format!("{} entropy {:.3} bits/byte", name, entropy), entropy > 7.8);
    }

    if failures > 0 {
        anyhow::bail!("{} self test(s) failed", failures);
    }
    println!("{}", "All self tests passed".green().bold());
    Ok(())
}

fn fetch() {
    match wellspring::net::manager() {
        Some(manager) => {
            println!("Fetching into empty network seed slots...");
            manager.fetch();
            println!("{} slots populated", manager.status().len());
        }
        None => println!("{}", "Network entropy is disabled".yellow()),
    }
}

fn decode_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap_or(0))
        .collect()
}
