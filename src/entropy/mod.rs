/// Entropy gathering: host RNG sources, the system multiplexer that blends
/// them, the instant-entropy bootstrap and the periodic collectors feeding
/// the accumulator.
pub mod collectors;
pub mod instant;
pub mod sources;
pub mod system;

#[cfg(test)]
mod instant_tests;
#[cfg(test)]
mod sources_tests;

pub use instant::InstantEntropy;
pub use sources::EntropySource;
pub use system::SystemRng;
