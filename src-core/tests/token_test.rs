//! 访问令牌集成测试

use livekit_api::access_token::TokenVerifier;

use voxroom_lib::config::LiveKitConfig;
use voxroom_lib::token::{RoomGrants, TokenError, TokenIssuer, TOKEN_TTL_SECS};

fn livekit_config() -> LiveKitConfig {
    LiveKitConfig {
        server_url: "wss://example.livekit.cloud".to_string(),
        api_key: "APIdevkey".to_string(),
        api_secret: "devsecret-devsecret-devsecret-devsecret".to_string(),
        ..LiveKitConfig::default()
    }
}

#[test]
fn test_issue_for_configured_room() {
    let config = livekit_config();
    let issuer = TokenIssuer::from_config(&config).unwrap();

    let identity = config.participant_identity("1234");
    let issued = issuer.issue(&identity, &config.room_name).unwrap();

    assert_eq!(issued.identity, "user-1234");
    assert_eq!(issued.room_name, "agent-room");
    assert!(!issued.token.is_empty());

    let claims = TokenVerifier::with_api_key(&config.api_key, &config.api_secret)
        .verify(&issued.token)
        .unwrap();
    assert_eq!(claims.sub, "user-1234");
    assert_eq!(claims.video.room, "agent-room");
    assert!((claims.exp as i64 - issued.expires_at as i64).abs() <= 1);
}

#[test]
fn test_restricted_grants() {
    let config = livekit_config();
    let issuer = TokenIssuer::from_config(&config).unwrap();

    let grants = RoomGrants {
        can_publish: false,
        ..RoomGrants::default()
    };
    let issued = issuer
        .issue_with_grants("listener", "agent-room", grants)
        .unwrap();

    let claims = TokenVerifier::with_api_key(&config.api_key, &config.api_secret)
        .verify(&issued.token)
        .unwrap();
    assert!(claims.video.room_join);
    assert!(!claims.video.can_publish);
    assert!(claims.video.can_subscribe);
}

#[test]
fn test_token_lifetime() {
    assert_eq!(TOKEN_TTL_SECS, 3600);
}

#[test]
fn test_missing_credentials() {
    let result = TokenIssuer::from_config(&LiveKitConfig::default());
    assert!(matches!(result, Err(TokenError::MissingCredentials)));
}
