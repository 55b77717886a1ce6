//! Secure Store Error Types
//!
//! 저장소 경계를 넘는 모든 실패는 여기 정의된 6가지 종류 중 하나로 매핑됩니다.
//! 하위 백엔드(키체인, 파일 시스템, 암호화)의 원본 에러 타입은 밖으로 나가지 않습니다.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// 에러 종류 (호출자가 분기할 수 있는 닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unavailable,
    Locked,
    Denied,
    Corrupt,
    Timeout,
    NotFound,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Locked => "LOCKED",
            ErrorKind::Denied => "DENIED",
            ErrorKind::Corrupt => "CORRUPT",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NotFound => "NOT_FOUND",
        }
    }
}

/// Secure Store 에러
///
/// 메시지에는 연산/자격 증명 이름만 포함되며 값은 절대 포함되지 않습니다.
#[derive(Error, Debug)]
pub enum SecureStoreError {
    #[error("Secure storage unavailable: {0}")]
    Unavailable(String),

    #[error("Secure storage is locked: {0}")]
    Locked(String),

    #[error("Access to secure storage denied: {0}")]
    Denied(String),

    #[error("Stored credential '{name}' is corrupt ({reason}). Re-save the credential to replace it")]
    Corrupt { name: String, reason: String },

    #[error("Secure storage operation '{operation}' timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Credential not found: {0}")]
    NotFound(String),
}

impl SecureStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecureStoreError::Unavailable(_) => ErrorKind::Unavailable,
            SecureStoreError::Locked(_) => ErrorKind::Locked,
            SecureStoreError::Denied(_) => ErrorKind::Denied,
            SecureStoreError::Corrupt { .. } => ErrorKind::Corrupt,
            SecureStoreError::Timeout { .. } => ErrorKind::Timeout,
            SecureStoreError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// 프로브 캐시를 즉시 무효화해야 하는 일시적 실패인지
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    pub(crate) fn corrupt(name: &str, reason: impl Into<String>) -> Self {
        SecureStoreError::Corrupt {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// 파일 폴백 경로의 I/O 실패 매핑
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                SecureStoreError::Denied(format!("{}: {}", context, err))
            }
            _ => SecureStoreError::Unavailable(format!("{}: {}", context, err)),
        }
    }
}

/// CLI 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<SecureStoreError> for CommandError {
    fn from(error: SecureStoreError) -> Self {
        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// CLI 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
