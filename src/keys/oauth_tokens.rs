//! OAuth 토큰 저장소
//!
//! provider 이름마다 토큰 하나를 JSON으로 직렬화해 저장합니다.
//! 기본 정책은 `deny` (볼트가 없으면 파일에 토큰을 남기지 않음).

use serde::{Deserialize, Serialize};

use crate::config::SecureStoreConfig;
use crate::error::SecureStoreError;
use crate::keys::{validate_name, KeyStorageError};
use crate::models::FallbackPolicy;
use crate::secrets::{SecureStore, VaultLoader};

/// OAuth 토큰 전용 service 네임스페이스
pub const OAUTH_SERVICE: &str = "secure-store-oauth";

// 만료 판정 여유 시간
const EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// 만료 시각 (Unix timestamp, 초)
    #[serde(default)]
    pub expiry: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: None,
            expiry: None,
            token_type: default_token_type(),
            scope: None,
        }
    }

    /// 토큰 응답의 `expires_in`(초)을 절대 만료 시각으로 변환
    pub fn with_expires_in(mut self, expires_in: i64) -> Self {
        self.expiry = Some(chrono::Utc::now().timestamp() + expires_in);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(refresh_token.to_string());
        self
    }

    /// 만료되었거나 30초 안에 만료되면 true. 만료 시각이 없으면 false
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => chrono::Utc::now().timestamp() >= expiry - EXPIRY_SKEW_SECS,
            None => false,
        }
    }

    /// 남은 유효 시간 (초)
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.expiry
            .map(|expiry| (expiry - chrono::Utc::now().timestamp()).max(0))
    }
}

#[derive(Debug)]
pub struct TokenStorage {
    store: SecureStore,
}

impl TokenStorage {
    /// 폴백 금지 (`deny`)
    pub fn new(config: SecureStoreConfig, loader: VaultLoader) -> Self {
        Self::with_policy(config, loader, FallbackPolicy::Deny)
    }

    pub fn with_policy(
        config: SecureStoreConfig,
        loader: VaultLoader,
        policy: FallbackPolicy,
    ) -> Self {
        let dir = config.fallback_dir.join(OAUTH_SERVICE);
        let config = config
            .with_service(OAUTH_SERVICE)
            .with_fallback_dir(dir)
            .with_policy(policy);
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

    pub async fn save_token(
        &self,
        provider: &str,
        token: &OAuthToken,
    ) -> Result<(), KeyStorageError> {
        validate_name(provider)?;
        if token.access_token.trim().is_empty() {
            return Err(KeyStorageError::EmptyValue);
        }
        let json = serde_json::to_string(token).map_err(|e| {
            SecureStoreError::Unavailable(format!("Failed to serialize token: {}", e))
        })?;
        self.store.set(provider, &json).await?;
        tracing::debug!(provider, "oauth token saved");
        Ok(())
    }

    pub async fn get_token(&self, provider: &str) -> Result<Option<OAuthToken>, KeyStorageError> {
        validate_name(provider)?;
        let Some(json) = self.store.get(provider).await? else {
            return Ok(None);
        };
        let token = serde_json::from_str(&json).map_err(|e| {
            SecureStoreError::corrupt(provider, format!("stored token is not valid JSON: {}", e))
        })?;
        Ok(Some(token))
    }

    pub async fn remove_token(&self, provider: &str) -> Result<bool, KeyStorageError> {
        validate_name(provider)?;
        Ok(self.store.delete(provider).await?)
    }

    pub async fn list_providers(&self) -> Result<Vec<String>, KeyStorageError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|name| validate_name(name).is_ok())
            .collect())
    }
}
