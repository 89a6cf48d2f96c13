#[cfg(test)]
mod tests {
    use crate::config::{
        ConfigBuilder, ConfigLoader, LogLevel, RapportConfig, ReverseRequestPolicy,
        StorageBackend, validation,
    };
    use crate::storage::config::SurrealDBEngine;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = RapportConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(
            config.friendship.reverse_request_policy,
            ReverseRequestPolicy::Reject
        );
        assert_eq!(config.allocator.max_duration, Duration::from_secs(86_400));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_data_dir("/tmp/test_data")
            .with_persistent_storage()
            .with_reverse_request_policy(ReverseRequestPolicy::AutoAccept)
            .with_max_allocation(Duration::from_secs(60))
            .with_log_level(LogLevel::Debug)
            .build()
            .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/test_data"));
        assert_eq!(config.storage.backend, StorageBackend::SurrealDB);
        assert_eq!(config.storage.surrealdb.engine, SurrealDBEngine::RocksDB);
        assert_eq!(
            config.friendship.reverse_request_policy,
            ReverseRequestPolicy::AutoAccept
        );
        assert_eq!(config.allocator.max_duration, Duration::from_secs(60));
        assert_eq!(config.allocator.default_duration, Duration::from_secs(60));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_validation() {
        assert!(ConfigBuilder::new().build().is_ok());
        assert!(validation::validate_config(&RapportConfig::default()).is_ok());

        let mut config = RapportConfig::default();
        config.allocator.max_duration = Duration::ZERO;
        assert!(validation::validate_config(&config).is_err());

        let mut config = RapportConfig::default();
        config.storage.backend = StorageBackend::SurrealDB;
        config.storage.surrealdb.namespace = String::new();
        assert!(validation::validate_config(&config).is_err());
    }

    #[test]
    fn test_predefined_configs() {
        let dev = ConfigBuilder::development().build().unwrap();
        let test = ConfigBuilder::testing().build().unwrap();
        let prod = ConfigBuilder::production().build().unwrap();

        assert_eq!(dev.storage.backend, StorageBackend::Memory);
        assert_eq!(dev.logging.level, LogLevel::Debug);
        assert_eq!(test.storage.data_dir, PathBuf::from("./test_data"));
        assert_eq!(prod.storage.backend, StorageBackend::SurrealDB);
        assert_eq!(prod.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[friendship]
reverse_request_policy = "auto_accept"

[allocator]
max_duration = "2h"
default_duration = "30m"
"#
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_file(file.path()).unwrap();
        let config = loader.extract().unwrap();

        assert_eq!(
            config.friendship.reverse_request_policy,
            ReverseRequestPolicy::AutoAccept
        );
        assert_eq!(config.allocator.max_duration, Duration::from_secs(7200));
        assert_eq!(config.allocator.default_duration, Duration::from_secs(1800));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_load_rejects_unknown_format() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let mut loader = ConfigLoader::new();
        assert!(loader.load_file(file.path()).is_err());
        assert!(loader.load_file("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ConfigBuilder::new()
            .with_data_dir("/tmp/test_data")
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RapportConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, deserialized);
    }
}
