use thiserror::Error;

use crate::transport::TransportError;

/// 会话错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// 传输层错误（握手、麦克风、发布、静音切换）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 握手超时
    #[error("Connect timed out after {0}ms")]
    Timeout(u64),

    /// connect 进行期间会话已被 disconnect 取代
    #[error("Connect superseded by disconnect")]
    Superseded,
}

/// 会话模块的结果类型
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Timeout(10000);
        assert!(err.to_string().contains("10000ms"));

        let err = SessionError::from(TransportError::AuthenticationFailed);
        assert!(err.to_string().contains("Authentication failed"));

        let err = SessionError::Superseded;
        assert!(err.to_string().contains("superseded"));
    }
}
