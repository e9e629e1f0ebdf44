/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use subcue::app_config::{Config, LogLevel, ProviderConfig};
use subcue::manager::SubtitleManager;
use subcue::orchestrator::ProviderOrchestrator;

use crate::common::{create_temp_dir, create_test_file};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.providers.is_empty());
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert_eq!(config.search_ttl(), Duration::from_secs(600));
    assert_eq!(config.sync.drift_sample_capacity, 120);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_fromFile_withProviders_shouldLoadAndValidate() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "config.json",
        r#"{
            "log_level": "debug",
            "providers": [
                {"id": "opensubs", "endpoint": "https://api.opensubs.test/v1", "timeout_secs": 5},
                {"id": "local", "endpoint": "http://localhost:8080", "enabled": false, "rate_limit_requests": null}
            ],
            "retry": {"max_attempts": 5},
            "cache": {"enabled": false}
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.providers[0].timeout(), Duration::from_secs(5));
    assert!(config.providers[1].rate_budget().is_none());
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert!(!config.cache.enabled);
}

#[test]
fn test_config_fromFile_withInvalidJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "config.json", "{ not json").unwrap();
    let error = Config::from_file(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_config_fromFile_withDuplicateProviders_shouldFailValidation() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "config.json",
        r#"{"providers": [
            {"id": "a", "endpoint": "https://a.test"},
            {"id": "a", "endpoint": "https://b.test"}
        ]}"#,
    )
    .unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[tokio::test]
async fn test_orchestrator_fromConfig_shouldHonourEnabledFlags() {
    let mut config = Config::default();
    config.providers.push(ProviderConfig::new("on", "https://on.test"));
    let mut off = ProviderConfig::new("off", "https://off.test");
    off.enabled = false;
    config.providers.push(off);

    let orchestrator = ProviderOrchestrator::from_config(&config);
    assert_eq!(orchestrator.provider_ids(), vec!["on".to_string(), "off".to_string()]);
    let statuses = orchestrator.provider_status();
    assert!(statuses.iter().find(|s| s.provider_id == "on").unwrap().enabled);
    assert!(!statuses.iter().find(|s| s.provider_id == "off").unwrap().enabled);
    assert_eq!(orchestrator.rate_limiter().remaining("on"), Some(40));
}

#[test]
fn test_manager_fromConfig_shouldApplyDefaultOffset() {
    let mut config = Config::default();
    config.sync.default_offset_ms = -300;
    let manager = SubtitleManager::from_config(&config);
    assert_eq!(manager.offset(), -300);
}
