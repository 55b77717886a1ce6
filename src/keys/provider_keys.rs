//! Provider API 키 저장소
//!
//! 이름 붙은 API 키를 저장합니다. 볼트가 없으면 암호화 파일 폴백을 허용합니다.

use crate::config::SecureStoreConfig;
use crate::keys::{validate_name, KeyStorageError};
use crate::models::FallbackPolicy;
use crate::secrets::{SecureStore, VaultLoader};

/// Provider 키 전용 service 네임스페이스
pub const PROVIDER_KEYS_SERVICE: &str = "secure-store-provider-keys";

#[derive(Debug)]
pub struct ProviderKeyStorage {
    store: SecureStore,
}

impl ProviderKeyStorage {
    /// 설정의 service/policy 는 provider 키 규칙으로 덮어씁니다.
    /// 폴백 파일은 `fallback_dir/<service>` 하위에 저장
    pub fn new(config: SecureStoreConfig, loader: VaultLoader) -> Self {
        let dir = config.fallback_dir.join(PROVIDER_KEYS_SERVICE);
        let config = config
            .with_service(PROVIDER_KEYS_SERVICE)
            .with_fallback_dir(dir)
            .with_policy(FallbackPolicy::Allow);
        Self {
            store: SecureStore::new(config, loader),
        }
    }

    pub fn with_keyring(config: SecureStoreConfig) -> Self {
        Self::new(config, crate::secrets::KeyringVault::loader())
    }

    pub fn store(&self) -> &SecureStore {
        &self.store
    }

    /// 앞뒤 공백을 제거한 값을 저장
    pub async fn save_key(&self, name: &str, api_key: &str) -> Result<(), KeyStorageError> {
        validate_name(name)?;
        let trimmed = api_key.trim();
        if trimmed.is_empty() {
            return Err(KeyStorageError::EmptyValue);
        }
        self.store.set(name, trimmed).await?;
        Ok(())
    }

    pub async fn get_key(&self, name: &str) -> Result<Option<String>, KeyStorageError> {
        validate_name(name)?;
        Ok(self.store.get(name).await?)
    }

    pub async fn delete_key(&self, name: &str) -> Result<bool, KeyStorageError> {
        validate_name(name)?;
        Ok(self.store.delete(name).await?)
    }

    pub async fn has_key(&self, name: &str) -> Result<bool, KeyStorageError> {
        validate_name(name)?;
        Ok(self.store.has(name).await?)
    }

    /// 유효한 이름만 반환 (다른 도구가 남긴 항목은 숨김)
    pub async fn list_keys(&self) -> Result<Vec<String>, KeyStorageError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|name| validate_name(name).is_ok())
            .collect())
    }
}
