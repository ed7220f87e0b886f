#[cfg(test)]
mod config_tests {
    use relmap::config::{ConfigError, TranslationConfig};
    use relmap::mapping::DEFAULT_MAX_JOIN_RESOLUTION_STEPS;
    use test_case::test_case;

    #[test]
    fn test_default_matches_resolution_stage() {
        let config = TranslationConfig::default();
        assert_eq!(config.max_join_resolution_steps, DEFAULT_MAX_JOIN_RESOLUTION_STEPS);
        assert!(!config.log_statements);
    }

    #[test_case(1 ; "lower bound")]
    #[test_case(32 ; "default")]
    #[test_case(1024 ; "upper bound")]
    fn test_accepted_step_limits(steps: usize) {
        let config = TranslationConfig::default().with_max_join_resolution_steps(steps).unwrap();
        assert_eq!(config.max_join_resolution_steps, steps);
    }

    #[test_case(0 ; "zero")]
    #[test_case(1025 ; "too large")]
    fn test_rejected_step_limits(steps: usize) {
        assert!(matches!(
            TranslationConfig::default().with_max_join_resolution_steps(steps),
            Err(ConfigError::Validation(_))
        ));
    }
}
