#[cfg(test)]
mod tests {
    use crate::config::expand;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_resolves_environment() {
        std::env::set_var("WELLSPRING_TEST_VALUE", "resolved");
        assert_eq!(
            expand("prefix-${WELLSPRING_TEST_VALUE}-suffix".to_string()),
            "prefix-resolved-suffix"
        );
        std::env::remove_var("WELLSPRING_TEST_VALUE");
    }

    #[test]
    #[serial]
    fn test_expand_multiple_references() {
        std::env::set_var("WELLSPRING_TEST_A", "one");
        std::env::set_var("WELLSPRING_TEST_B", "two");
        assert_eq!(
            expand("${WELLSPRING_TEST_A}/${WELLSPRING_TEST_B}".to_string()),
            "one/two"
        );
        std::env::remove_var("WELLSPRING_TEST_A");
        std::env::remove_var("WELLSPRING_TEST_B");
    }

    #[test]
    fn test_expand_unresolved_kept_verbatim() {
        assert_eq!(
            expand("${WELLSPRING_TEST_DOES_NOT_EXIST}".to_string()),
            "${WELLSPRING_TEST_DOES_NOT_EXIST}"
        );
    }

    #[test]
    fn test_expand_plain_strings_untouched() {
        assert_eq!(expand("no references here".to_string()), "no references here");
        assert_eq!(expand("$HOME is not a reference".to_string()), "$HOME is not a reference");
    }

    #[test]
    fn test_defaults() {
        let settings = crate::config::settings();
        assert_eq!(settings.network_expected_usage(), 32);
        assert_eq!(settings.network_seeds_used(), 4);
        assert_eq!(settings.storage_save_period().as_millis(), 5_000);
        assert_eq!(settings.storage_save_period_multiplier(), 1);
        assert!(settings.collector_enabled("jitter"));
        assert_eq!(settings.provider_strong_algorithm(), "Nist/HmacSHA-512");
    }
}
