//! OS 볼트 어댑터
//!
//! OS 키체인/키링에 대한 최소 기능 집합(get/set/delete, 선택적 열거)을 추상화합니다.
//! 어댑터는 재시도하지 않으며, 타임아웃과 재시도 정책은 오케스트레이터의 몫입니다.

use keyring::{Entry, Error as KeyringError};
use std::sync::Arc;

use crate::error::SecureStoreError;
use crate::models::VaultHandle;

/// 볼트 백엔드 오류 분류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("vault backend unavailable: {0}")]
    Unavailable(String),

    #[error("vault is locked: {0}")]
    Locked(String),

    #[error("vault access denied: {0}")]
    Denied(String),

    #[error("vault error: {0}")]
    Other(String),
}

impl From<VaultError> for SecureStoreError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Unavailable(msg) | VaultError::Other(msg) => {
                SecureStoreError::Unavailable(msg)
            }
            VaultError::Locked(msg) => SecureStoreError::Locked(msg),
            VaultError::Denied(msg) => SecureStoreError::Denied(msg),
        }
    }
}

/// OS 볼트 기능 집합
///
/// 모든 호출은 블로킹일 수 있으므로 오케스트레이터가 blocking 스레드에서 실행합니다.
pub trait VaultAdapter: Send + Sync {
    fn get_password(&self, handle: &VaultHandle) -> Result<Option<String>, VaultError>;

    fn set_password(&self, handle: &VaultHandle, value: &str) -> Result<(), VaultError>;

    /// 삭제된 항목이 있었으면 true
    fn delete_password(&self, handle: &VaultHandle) -> Result<bool, VaultError>;

    /// `Ok(None)`은 백엔드가 열거를 지원하지 않는다는 뜻
    fn find_credentials(&self, _service: &str) -> Result<Option<Vec<(String, String)>>, VaultError> {
        Ok(None)
    }
}

/// 어댑터 로더
///
/// 저장소가 첫 사용 시점에 한 번만 호출합니다. 실패는 캐시되어 UNAVAILABLE로 보고됩니다.
pub type VaultLoader =
    Arc<dyn Fn() -> Result<Arc<dyn VaultAdapter>, VaultError> + Send + Sync>;

/// `keyring` 크레이트 기반 어댑터 (macOS Keychain, Windows Credential Manager, Secret Service)
#[derive(Debug, Default)]
pub struct KeyringVault;

impl KeyringVault {
    /// 플랫폼 저장소가 엔트리를 만들 수 있는지 확인한 뒤 어댑터를 반환하는 로더
    pub fn loader() -> VaultLoader {
        Arc::new(|| {
            Entry::new("secure-store", "__loader_check__").map_err(map_keyring_error)?;
            Ok(Arc::new(KeyringVault) as Arc<dyn VaultAdapter>)
        })
    }

    fn entry(handle: &VaultHandle) -> Result<Entry, VaultError> {
        Entry::new(&handle.service, &handle.account).map_err(map_keyring_error)
    }
}

impl VaultAdapter for KeyringVault {
    fn get_password(&self, handle: &VaultHandle) -> Result<Option<String>, VaultError> {
        match Self::entry(handle)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(map_keyring_error(err)),
        }
    }

    fn set_password(&self, handle: &VaultHandle, value: &str) -> Result<(), VaultError> {
        Self::entry(handle)?
            .set_password(value)
            .map_err(map_keyring_error)
    }

    fn delete_password(&self, handle: &VaultHandle) -> Result<bool, VaultError> {
        match Self::entry(handle)?.delete_password() {
            Ok(()) => Ok(true),
            Err(KeyringError::NoEntry) => Ok(false),
            Err(err) => Err(map_keyring_error(err)),
        }
    }
}

fn map_keyring_error(err: KeyringError) -> VaultError {
    match err {
        KeyringError::PlatformFailure(inner) => VaultError::Unavailable(inner.to_string()),
        KeyringError::NoStorageAccess(inner) => {
            let msg = inner.to_string();
            if msg.to_ascii_lowercase().contains("lock") {
                VaultError::Locked(msg)
            } else {
                VaultError::Denied(msg)
            }
        }
        other => VaultError::Other(other.to_string()),
    }
}
