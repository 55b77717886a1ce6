//! 도메인별 래퍼 계층
//!
//! 각 래퍼는 상태 없이 SecureStore 위에 이름 검증과 직렬화 규칙만 더합니다.
//! service 네임스페이스가 서로 달라 같은 볼트를 써도 충돌하지 않습니다.

pub mod oauth_tokens;
pub mod provider_keys;

pub use oauth_tokens::{OAuthToken, TokenStorage, OAUTH_SERVICE};
pub use provider_keys::{ProviderKeyStorage, PROVIDER_KEYS_SERVICE};

use crate::error::SecureStoreError;

/// 최대 이름 길이
pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum KeyStorageError {
    #[error("Invalid key name '{0}': use 1-64 characters from [A-Za-z0-9._-]")]
    InvalidName(String),

    #[error("Key value must not be empty")]
    EmptyValue,

    #[error(transparent)]
    Store(#[from] SecureStoreError),
}

/// `[A-Za-z0-9._-]{1,64}`
pub fn validate_name(name: &str) -> Result<(), KeyStorageError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(KeyStorageError::InvalidName(name.to_string()))
    }
}
