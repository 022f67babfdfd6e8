//! 配置加载与保存集成测试

use voxroom_lib::config::{AppConfig, ConfigError, ConfigManager};
use voxroom_lib::session::SessionConfig;

#[test]
fn test_load_missing_file_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigManager::load(dir.path().join("missing.json")).unwrap();

    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("voxroom.json");

    let mut config = AppConfig::default();
    config.livekit.server_url = "wss://example.livekit.cloud".to_string();
    config.livekit.room_name = "support-room".to_string();
    config.session = SessionConfig::default().with_connect_timeout(2_500);

    ConfigManager::save(&path, &config).unwrap();
    assert!(path.exists());

    let loaded = ConfigManager::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_saved_file_is_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxroom.json");

    ConfigManager::save(&path, &AppConfig::default()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();

    assert!(content.contains('\n'));
    assert!(content.contains("\"room_name\": \"agent-room\""));
    assert!(content.contains("\"connect_timeout_ms\": 10000"));
}

#[test]
fn test_load_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxroom.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = ConfigManager::load(&path);
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[test]
fn test_load_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxroom.json");
    std::fs::write(&path, r#"{"session": {"listener_capacity": 4}}"#).unwrap();

    let config = ConfigManager::load(&path).unwrap();
    assert_eq!(config.session.listener_capacity, 4);
    assert_eq!(config.session.connect_timeout_ms, 10_000);
    assert_eq!(config.livekit.identity_prefix, "user-");
}

#[test]
fn test_default_config_is_not_valid() {
    // 默认配置缺少服务器地址和凭据
    assert!(matches!(
        AppConfig::default().validate(),
        Err(ConfigError::Invalid(_))
    ));
}
