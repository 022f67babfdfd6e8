//! 全局错误处理模块
//!
//! 提供统一的应用错误类型和用户友好的错误消息
//!
//! # 功能
//!
//! - 统一的 `AppError` 类型，聚合传输、会话、令牌与配置错误
//! - 面向用户的错误消息与恢复建议
//! - 可序列化的错误代码，供 UI 层识别
//!
//! # 使用示例
//!
//! ```
//! use voxroom_lib::utils::error::{AppError, ErrorCode};
//! use voxroom_lib::session::SessionError;
//!
//! let err = AppError::from(SessionError::Timeout(10000));
//! assert_eq!(err.code(), ErrorCode::SessionTimeout);
//! assert!(err.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;
use crate::token::TokenError;
use crate::transport::TransportError;

/// 应用错误类型
///
/// 聚合所有模块的错误类型，提供统一的错误处理接口
#[derive(Error, Debug)]
pub enum AppError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 会话错误
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// 令牌错误
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 错误代码
///
/// 用于 UI 层识别和处理特定错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 传输错误
    /// 连接失败
    TransportConnectionFailed,
    /// 令牌被拒绝
    TransportAuthFailed,
    /// 麦克风不可用
    TransportMicrophoneUnavailable,
    /// 轨道发布失败
    TransportPublishFailed,
    /// 连接已断开
    TransportDisconnected,

    // 会话错误
    /// 握手超时
    SessionTimeout,
    /// connect 被 disconnect 取代
    SessionSuperseded,

    // 令牌错误
    /// 缺少 API 凭据
    TokenMissingCredentials,
    /// 令牌参数无效
    TokenInvalidRequest,
    /// 签名失败
    TokenSigningFailed,

    // 配置错误
    /// 配置加载失败
    ConfigLoadFailed,
    /// 配置无效
    ConfigInvalid,

    // 通用错误
    /// 内部错误
    InternalError,
}

/// 错误上下文信息
///
/// 提供用户友好的错误信息和恢复建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// 错误代码
    pub code: ErrorCode,
    /// 用户友好的错误消息
    pub message: String,
    /// 详细错误信息（用于日志）
    pub detail: Option<String>,
    /// 恢复建议
    pub recovery_hint: Option<String>,
    /// 是否可恢复
    pub recoverable: bool,
}

impl ErrorContext {
    /// 创建新的错误上下文
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
            recovery_hint: None,
            recoverable: true,
        }
    }

    /// 设置详细信息
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 设置恢复建议
    pub fn with_recovery_hint(mut self, hint: impl Into<String>) -> Self {
        self.recovery_hint = Some(hint.into());
        self
    }

    /// 标记为不可恢复
    pub fn not_recoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }
}

fn transport_code(err: &TransportError) -> ErrorCode {
    match err {
        TransportError::AuthenticationFailed => ErrorCode::TransportAuthFailed,
        TransportError::MicrophoneUnavailable(_) => ErrorCode::TransportMicrophoneUnavailable,
        TransportError::PublishFailed(_) => ErrorCode::TransportPublishFailed,
        TransportError::Disconnected => ErrorCode::TransportDisconnected,
        TransportError::Timeout(_) => ErrorCode::SessionTimeout,
        TransportError::ConnectionFailed(_) | TransportError::Other(_) => {
            ErrorCode::TransportConnectionFailed
        }
    }
}

fn transport_message(err: &TransportError) -> String {
    match err {
        TransportError::AuthenticationFailed => "访问令牌无效或已过期".to_string(),
        TransportError::MicrophoneUnavailable(_) => "无法打开麦克风，请检查麦克风权限".to_string(),
        TransportError::PublishFailed(_) => "无法发布麦克风音频，请重试".to_string(),
        TransportError::Disconnected => "与语音房间的连接已断开".to_string(),
        TransportError::Timeout(_) => "连接超时，请检查网络状况".to_string(),
        TransportError::ConnectionFailed(_) | TransportError::Other(_) => {
            "无法连接到语音服务，请检查网络连接".to_string()
        }
    }
}

impl AppError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Transport(err) | AppError::Session(SessionError::Transport(err)) => {
                transport_code(err)
            }
            AppError::Session(SessionError::Timeout(_)) => ErrorCode::SessionTimeout,
            AppError::Session(SessionError::Superseded) => ErrorCode::SessionSuperseded,

            AppError::Token(TokenError::MissingCredentials) => ErrorCode::TokenMissingCredentials,
            AppError::Token(TokenError::EmptyIdentity | TokenError::EmptyRoom) => {
                ErrorCode::TokenInvalidRequest
            }
            AppError::Token(TokenError::Signing(_)) => ErrorCode::TokenSigningFailed,

            AppError::Config(ConfigError::Invalid(_) | ConfigError::Json(_)) => {
                ErrorCode::ConfigInvalid
            }
            AppError::Config(ConfigError::Io(_)) => ErrorCode::ConfigLoadFailed,

            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 获取用户友好的错误消息
    ///
    /// 返回适合直接显示给用户的错误消息
    pub fn user_message(&self) -> String {
        match self {
            AppError::Transport(err) | AppError::Session(SessionError::Transport(err)) => {
                transport_message(err)
            }
            AppError::Session(SessionError::Timeout(ms)) => {
                format!("连接超时 ({}ms)，请检查网络状况", ms)
            }
            AppError::Session(SessionError::Superseded) => "连接已取消".to_string(),

            AppError::Token(TokenError::MissingCredentials) => {
                "未配置 API Key 或 API Secret".to_string()
            }
            AppError::Token(TokenError::EmptyIdentity | TokenError::EmptyRoom) => {
                "参与者身份或房间名为空".to_string()
            }
            AppError::Token(TokenError::Signing(_)) => "访问令牌生成失败".to_string(),

            AppError::Config(ConfigError::Io(_)) => "无法读取配置文件".to_string(),
            AppError::Config(ConfigError::Json(_)) => "配置文件格式错误".to_string(),
            AppError::Config(ConfigError::Invalid(msg)) => format!("配置无效: {}", msg),

            AppError::Internal(msg) => format!("内部错误: {}", msg),
        }
    }

    /// 获取完整的错误上下文
    pub fn context(&self) -> ErrorContext {
        let mut ctx = ErrorContext::new(self.code(), self.user_message())
            .with_detail(self.to_string());

        ctx.recovery_hint = self.recovery_hint();

        if !self.is_recoverable() {
            ctx = ctx.not_recoverable();
        }

        ctx
    }

    /// 获取恢复建议
    pub fn recovery_hint(&self) -> Option<String> {
        match self.code() {
            ErrorCode::TransportAuthFailed => Some("请重新获取访问令牌后再连接".to_string()),
            ErrorCode::TransportMicrophoneUnavailable => {
                Some("请在系统设置中允许应用访问麦克风".to_string())
            }
            ErrorCode::TransportConnectionFailed | ErrorCode::SessionTimeout => {
                Some("请检查服务器地址和网络连接，然后重新连接".to_string())
            }
            ErrorCode::TokenMissingCredentials => Some(
                "请设置 LIVEKIT_API_KEY 和 LIVEKIT_API_SECRET 环境变量".to_string(),
            ),
            _ => None,
        }
    }

    /// 检查错误是否可恢复
    ///
    /// 会话错误都可以通过重新 connect 恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AppError::Config(_) | AppError::Token(TokenError::MissingCredentials) | AppError::Internal(_)
        )
    }

    /// 检查是否是超时错误
    pub fn is_timeout(&self) -> bool {
        self.code() == ErrorCode::SessionTimeout
    }

    /// 检查是否是认证错误
    pub fn is_auth_error(&self) -> bool {
        self.code() == ErrorCode::TransportAuthFailed
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 将任意错误转换为内部错误
impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = AppError::Transport(TransportError::AuthenticationFailed);
        assert_eq!(err.code(), ErrorCode::TransportAuthFailed);

        // 会话包装的传输错误使用相同的代码
        let err = AppError::Session(SessionError::Transport(
            TransportError::MicrophoneUnavailable("busy".to_string()),
        ));
        assert_eq!(err.code(), ErrorCode::TransportMicrophoneUnavailable);

        let err = AppError::Session(SessionError::Superseded);
        assert_eq!(err.code(), ErrorCode::SessionSuperseded);

        let err = AppError::Token(TokenError::EmptyRoom);
        assert_eq!(err.code(), ErrorCode::TokenInvalidRequest);
    }

    #[test]
    fn test_user_message() {
        let err = AppError::Transport(TransportError::MicrophoneUnavailable("x".to_string()));
        assert!(err.user_message().contains("麦克风"));

        let err = AppError::Session(SessionError::Timeout(10000));
        assert!(err.user_message().contains("10000ms"));

        let err = AppError::Token(TokenError::MissingCredentials);
        assert!(err.user_message().contains("API Key"));
    }

    #[test]
    fn test_error_context() {
        let err = AppError::Transport(TransportError::AuthenticationFailed);
        let ctx = err.context();

        assert_eq!(ctx.code, ErrorCode::TransportAuthFailed);
        assert!(!ctx.message.is_empty());
        assert!(ctx.detail.is_some());
        assert!(ctx.recovery_hint.is_some());
        assert!(ctx.recoverable);
    }

    #[test]
    fn test_context_serialization() {
        let err = AppError::Config(ConfigError::Invalid("server_url is empty".to_string()));
        let json = serde_json::to_string(&err.context()).unwrap();

        assert!(json.contains("\"code\":\"CONFIG_INVALID\""));
        assert!(json.contains("\"recoverable\":false"));
        assert!(json.contains("server_url is empty"));
    }

    #[test]
    fn test_recoverable() {
        // 可恢复的错误
        let err = AppError::Session(SessionError::Timeout(10));
        assert!(err.is_recoverable());
        assert!(err.is_timeout());

        // 不可恢复的错误
        let err = AppError::Config(ConfigError::Invalid("server_url is empty".to_string()));
        assert!(!err.is_recoverable());
        assert!(!err.context().recoverable);

        let err = AppError::Internal("fatal".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_auth_error() {
        let err = AppError::Session(SessionError::Transport(TransportError::AuthenticationFailed));
        assert!(err.is_auth_error());
        assert!(!AppError::Transport(TransportError::Disconnected).is_auth_error());
    }

    #[test]
    fn test_from_string() {
        let err: AppError = "test error".into();
        match err {
            AppError::Internal(msg) => assert_eq!(msg, "test error"),
            _ => panic!("Expected Internal error"),
        }
    }

    #[test]
    fn test_error_code_serialization() {
        let code = ErrorCode::TransportMicrophoneUnavailable;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"TRANSPORT_MICROPHONE_UNAVAILABLE\"");

        let deserialized: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, code);
    }

    #[test]
    fn test_error_context_serialization() {
        let ctx = ErrorContext::new(ErrorCode::SessionTimeout, "Test message")
            .with_detail("Detailed error")
            .with_recovery_hint("Try again");

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("SESSION_TIMEOUT"));
        assert!(json.contains("Test message"));

        let deserialized: ErrorContext = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.code, ErrorCode::SessionTimeout);
        assert_eq!(deserialized.message, "Test message");
    }
}
