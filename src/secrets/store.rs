//! Secure Store - 백엔드 선택 오케스트레이터
//!
//! - 볼트가 사용 가능하면(프로브 캐시) OS 볼트에 읽고 씀
//! - 사용 불가하면 폴백 정책이 `allow`일 때만 암호화 파일 저장소 사용
//! - 모든 실패는 `SecureStoreError` 6종으로 매핑되어 반환
//!
//! 로그에는 연산 이름과 자격 증명 이름만 남기며 값은 절대 기록하지 않습니다.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::config::SecureStoreConfig;
use crate::error::SecureStoreError;
use crate::models::{FallbackPolicy, VaultHandle};
use crate::secrets::adapter::{KeyringVault, VaultAdapter, VaultError, VaultLoader};
use crate::secrets::envelope::{Envelope, EnvelopeCodec, PassphraseMaterial};
use crate::secrets::file_store::AtomicFileStore;
use crate::secrets::key_file::KeySource;
use crate::secrets::probe::{AvailabilityProbe, PROBE_ACCOUNT};

/// 진단용 상태
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub service: String,
    pub policy: FallbackPolicy,
    pub vault_available: bool,
    /// 캐시된 프로브 결과의 나이 (로더 실패로 프로브가 없으면 `None`)
    pub last_probe_age_ms: Option<u64>,
    pub fallback_dir: PathBuf,
    pub envelope_version: u32,
}

/// Secure Store
///
/// 프로브 캐시와 정책 값은 인스턴스가 소유하고, 볼트 어댑터는 로더를 통해 주입받습니다.
pub struct SecureStore {
    service: String,
    policy: FallbackPolicy,
    vault_timeout: Duration,
    loader: VaultLoader,
    /// 로더 결과 (실패도 캐시: `None`)
    adapter: OnceCell<Option<Arc<dyn VaultAdapter>>>,
    probe: AvailabilityProbe,
    files: AtomicFileStore,
    codec: EnvelopeCodec,
    key_source: KeySource,
    /// 첫 암복호화 때 `key_source`에서 한 번 로드
    material: Arc<OnceCell<PassphraseMaterial>>,
}

impl SecureStore {
    pub fn new(config: SecureStoreConfig, loader: VaultLoader) -> Self {
        let key_source = config.key_source();
        Self {
            service: config.service,
            policy: config.policy,
            vault_timeout: config.vault_timeout,
            loader,
            adapter: OnceCell::new(),
            probe: AvailabilityProbe::new(config.probe_ttl),
            files: AtomicFileStore::new(config.fallback_dir),
            codec: EnvelopeCodec::new(config.kdf),
            key_source,
            material: Arc::new(OnceCell::new()),
        }
    }

    /// OS 키체인(`keyring`)을 볼트로 사용하는 저장소
    pub fn with_keyring(config: SecureStoreConfig) -> Self {
        Self::new(config, KeyringVault::loader())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// 볼트 사용 가능 여부 (TTL 캐시)
    pub async fn is_available(&self) -> bool {
        let Some(adapter) = self.adapter() else {
            return false;
        };
        self.probe.check(|| self.probe_round_trip(adapter)).await
    }

    pub async fn set(&self, name: &str, value: &str) -> Result<(), SecureStoreError> {
        tracing::debug!(operation = "set", name, service = %self.service, "secure store operation");

        if self.is_available().await {
            let handle = self.handle(name);
            let value = Zeroizing::new(value.to_string());
            return self
                .vault_call("set", move |vault| vault.set_password(&handle, &value))
                .await;
        }

        self.require_fallback("set", name)?;
        let envelope = self.seal(name, value).await?;
        self.files.write(name, &envelope).await?;
        tracing::warn!(name, service = %self.service, "vault unavailable, credential stored in encrypted fallback file");
        Ok(())
    }

    /// 볼트 값이 있으면 그 값이 우선 (폴백 파일과 병합하지 않음)
    pub async fn get(&self, name: &str) -> Result<Option<String>, SecureStoreError> {
        tracing::debug!(operation = "get", name, service = %self.service, "secure store operation");

        if self.is_available().await {
            let handle = self.handle(name);
            if let Some(value) = self
                .vault_call("get", move |vault| vault.get_password(&handle))
                .await?
            {
                return Ok(Some(value));
            }
        } else {
            self.require_fallback("get", name)?;
        }

        match self.files.read(name).await? {
            Some(envelope) => self.open(name, envelope).await.map(Some),
            None => Ok(None),
        }
    }

    /// 없으면 `NotFound`를 반환하는 명시적 조회
    pub async fn require(&self, name: &str) -> Result<String, SecureStoreError> {
        self.get(name)
            .await?
            .ok_or_else(|| SecureStoreError::NotFound(name.to_string()))
    }

    /// 두 백엔드 모두에서 삭제 시도, 하나라도 지웠으면 true
    pub async fn delete(&self, name: &str) -> Result<bool, SecureStoreError> {
        tracing::debug!(operation = "delete", name, service = %self.service, "secure store operation");

        let removed_file = self.files.remove(name).await?;
        let removed_vault = if self.is_available().await {
            let handle = self.handle(name);
            self.vault_call("delete", move |vault| vault.delete_password(&handle))
                .await?
        } else {
            false
        };
        Ok(removed_file || removed_vault)
    }

    /// 볼트(열거 가능할 때)와 폴백 파일 이름의 합집합, 정렬 + 중복 제거
    ///
    /// 볼트가 열거를 지원하지 않으면 폴백 사본이 없는 볼트 전용 항목은 보이지 않습니다.
    pub async fn list(&self) -> Result<Vec<String>, SecureStoreError> {
        tracing::debug!(operation = "list", service = %self.service, "secure store operation");

        let mut names = self.files.list_names().await?;
        if self.is_available().await {
            let service = self.service.clone();
            match self
                .vault_call("list", move |vault| vault.find_credentials(&service))
                .await?
            {
                Some(credentials) => names.extend(
                    credentials
                        .into_iter()
                        .map(|(account, _)| account)
                        .filter(|account| account != PROBE_ACCOUNT),
                ),
                None => {
                    tracing::debug!(service = %self.service, "vault cannot enumerate, listing fallback entries only")
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// 존재 여부. "없음" 이외의 오류는 false로 삼키지 않고 그대로 반환
    pub async fn has(&self, name: &str) -> Result<bool, SecureStoreError> {
        tracing::debug!(operation = "has", name, service = %self.service, "secure store operation");

        if self.is_available().await {
            let handle = self.handle(name);
            if self
                .vault_call("has", move |vault| vault.get_password(&handle))
                .await?
                .is_some()
            {
                return Ok(true);
            }
        } else {
            self.require_fallback("has", name)?;
        }

        // 봉투 헤더까지만 검사 (KDF 실행 없음)
        Ok(self.files.read(name).await?.is_some())
    }

    pub async fn status(&self) -> StoreStatus {
        let vault_available = self.is_available().await;
        let last_probe_age_ms = self
            .probe
            .last_result()
            .await
            .map(|probe| u64::try_from(probe.checked_at.elapsed().as_millis()).unwrap_or(u64::MAX));
        StoreStatus {
            service: self.service.clone(),
            policy: self.policy,
            vault_available,
            last_probe_age_ms,
            fallback_dir: self.files.dir().to_path_buf(),
            envelope_version: self.codec.current_version(),
        }
    }

    fn handle(&self, name: &str) -> VaultHandle {
        VaultHandle::new(&self.service, name)
    }

    fn adapter(&self) -> Option<Arc<dyn VaultAdapter>> {
        self.adapter
            .get_or_init(|| match (self.loader)() {
                Ok(adapter) => Some(adapter),
                Err(e) => {
                    tracing::warn!(service = %self.service, "vault backend failed to load: {}", e);
                    None
                }
            })
            .clone()
    }

    fn require_fallback(&self, operation: &str, name: &str) -> Result<(), SecureStoreError> {
        if self.policy.allows_fallback() {
            return Ok(());
        }
        tracing::warn!(operation, name, service = %self.service, "vault unavailable and fallback denied");
        Err(SecureStoreError::Unavailable(format!(
            "OS credential vault for '{}' is unavailable and encrypted file fallback is disabled",
            self.service
        )))
    }

    /// 일회용 값으로 set → get → delete 왕복
    async fn probe_round_trip(&self, adapter: Arc<dyn VaultAdapter>) -> bool {
        let handle = self.handle(PROBE_ACCOUNT);
        let token = uuid::Uuid::new_v4().to_string();
        let result = self
            .run_blocking(adapter, "probe", move |vault| {
                vault.set_password(&handle, &token)?;
                let read_back = vault.get_password(&handle)?;
                vault.delete_password(&handle)?;
                Ok(read_back.as_deref() == Some(token.as_str()))
            })
            .await;

        match result {
            Ok(available) => available,
            Err(e) => {
                tracing::debug!(service = %self.service, "vault probe failed: {}", e);
                false
            }
        }
    }

    /// 실제 연산용 볼트 호출. 일시적 실패면 프로브 캐시를 즉시 무효화
    async fn vault_call<T, F>(&self, operation: &'static str, f: F) -> Result<T, SecureStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VaultAdapter) -> Result<T, VaultError> + Send + 'static,
    {
        let Some(adapter) = self.adapter() else {
            return Err(SecureStoreError::Unavailable(format!(
                "OS credential vault for '{}' failed to load",
                self.service
            )));
        };
        let result = self.run_blocking(adapter, operation, f).await;
        if let Err(e) = &result {
            if e.is_transient() {
                tracing::warn!(operation, service = %self.service, "transient vault failure: {}", e);
                self.probe.invalidate().await;
            }
        }
        result
    }

    /// blocking 스레드에서 타임아웃을 걸고 실행 (프로브 캐시는 건드리지 않음)
    async fn run_blocking<T, F>(
        &self,
        adapter: Arc<dyn VaultAdapter>,
        operation: &'static str,
        f: F,
    ) -> Result<T, SecureStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VaultAdapter) -> Result<T, VaultError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(move || f(adapter.as_ref()));
        match tokio::time::timeout(self.vault_timeout, task).await {
            Err(_) => Err(SecureStoreError::Timeout {
                operation,
                after: self.vault_timeout,
            }),
            Ok(Err(join)) => Err(SecureStoreError::Unavailable(format!(
                "vault task for '{}' failed: {}",
                operation, join
            ))),
            Ok(Ok(result)) => result.map_err(SecureStoreError::from),
        }
    }

    async fn seal(&self, name: &str, value: &str) -> Result<Envelope, SecureStoreError> {
        let codec = self.codec.clone();
        let (cell, source) = (Arc::clone(&self.material), self.key_source.clone());
        let name = name.to_string();
        let value = Zeroizing::new(value.to_string());
        tokio::task::spawn_blocking(move || {
            let material = cell.get_or_try_init(|| source.resolve())?;
            codec
                .encrypt(&name, &value, material)
                .map_err(|e| SecureStoreError::Unavailable(e.to_string()))
        })
        .await
        .map_err(|e| SecureStoreError::Unavailable(format!("encryption task failed: {}", e)))?
    }

    async fn open(&self, name: &str, envelope: Envelope) -> Result<String, SecureStoreError> {
        let codec = self.codec.clone();
        let (cell, source) = (Arc::clone(&self.material), self.key_source.clone());
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let material = cell.get_or_try_init(|| source.resolve())?;
            codec
                .decrypt(&name, &envelope, material)
                .map_err(|e| SecureStoreError::corrupt(&name, e.to_string()))
        })
        .await
        .map_err(|e| SecureStoreError::Unavailable(format!("decryption task failed: {}", e)))?
    }
}

impl std::fmt::Debug for SecureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStore")
            .field("service", &self.service)
            .field("policy", &self.policy)
            .field("fallback_dir", &self.files.dir())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::secrets::envelope::tests::fast_params;
    use crate::secrets::memory::MemoryVault;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const SERVICE: &str = "test-provider-keys";

    fn config(dir: &Path, policy: FallbackPolicy) -> SecureStoreConfig {
        SecureStoreConfig::new(SERVICE)
            .with_fallback_dir(dir)
            .with_policy(policy)
            .with_passphrase("test-passphrase")
            .with_kdf(fast_params())
            .with_vault_timeout(Duration::from_secs(2))
    }

    fn vault_store(vault: &Arc<MemoryVault>, dir: &Path) -> SecureStore {
        SecureStore::new(config(dir, FallbackPolicy::Allow), vault.loader())
    }

    fn missing_backend() -> VaultLoader {
        Arc::new(|| Err(VaultError::Unavailable("backend not installed".into())))
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_vault_round_trip() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        store.set("alpha", "sk-1").await.unwrap();
        assert_eq!(store.get("alpha").await.unwrap(), Some("sk-1".to_string()));
        assert!(vault.contains(SERVICE, "alpha"));
        assert!(!vault.contains(SERVICE, PROBE_ACCOUNT));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_fallback_round_trip_when_allowed() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), missing_backend());

        assert!(!store.is_available().await);
        store.set("beta", "tok-2").await.unwrap();
        assert_eq!(file_count(dir.path()), 1);
        assert_eq!(store.get("beta").await.unwrap(), Some("tok-2".to_string()));

        // 평문이 디스크에 남지 않아야 함
        let raw = std::fs::read_to_string(store.files.path_for("beta")).unwrap();
        assert!(!raw.contains("tok-2"));
        assert!(raw.contains("\"version\":1"));
    }

    #[tokio::test]
    async fn test_deny_policy_fails_without_touching_disk() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("secrets");
        let store = SecureStore::new(config(&root, FallbackPolicy::Deny), missing_backend());

        let err = store.set("gamma", "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(!store.files.path_for("gamma").exists());
        assert!(!root.exists());

        assert_eq!(store.get("gamma").await.unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(store.has("gamma").await.unwrap_err().kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_unknown_version_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), missing_backend());
        std::fs::write(
            store.files.path_for("delta"),
            r#"{"version":99,"salt":"AAAA","nonce":"AAAA","ciphertext":"AAAA","authTag":"AAAA"}"#,
        )
        .unwrap();

        let err = store.get("delta").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.to_string().contains("Re-save"));
        assert_eq!(store.has("delta").await.unwrap_err().kind(), ErrorKind::Corrupt);
    }

    #[tokio::test]
    async fn test_tampered_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), missing_backend());
        store.set("alpha", "sk-1").await.unwrap();

        let path = store.files.path_for("alpha");
        let mut envelope = Envelope::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        envelope.ciphertext = envelope.auth_tag.clone();
        std::fs::write(&path, envelope.to_vec().unwrap()).unwrap();

        assert_eq!(store.get("alpha").await.unwrap_err().kind(), ErrorKind::Corrupt);
    }

    #[tokio::test]
    async fn test_concurrent_fallback_writes_leave_one_value() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), missing_backend());
        store.set("eps", "v1").await.unwrap();

        let (a, b) = tokio::join!(store.set("eps", "v2"), store.set("eps", "v3"));
        a.unwrap();
        b.unwrap();

        let value = store.get("eps").await.unwrap().unwrap();
        assert!(value == "v2" || value == "v3", "unexpected value {}", value);
        assert_eq!(file_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_vault_value_wins_over_fallback_file() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        // 볼트가 잠시 죽어 있는 동안 폴백 파일이 생김
        vault.set_failure(Some(VaultError::Unavailable("daemon down".into())));
        store.set("alpha", "from-file").await.unwrap();
        assert!(store.files.exists("alpha").await.unwrap());

        vault.set_failure(None);
        store.probe.invalidate().await;
        vault
            .set_password(&VaultHandle::new(SERVICE, "alpha"), "from-vault")
            .unwrap();

        assert_eq!(store.get("alpha").await.unwrap(), Some("from-vault".to_string()));
    }

    #[tokio::test]
    async fn test_vault_miss_falls_back_to_file() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        vault.set_failure(Some(VaultError::Unavailable("daemon down".into())));
        store.set("beta", "tok-2").await.unwrap();
        vault.set_failure(None);
        store.probe.invalidate().await;

        assert!(store.is_available().await);
        assert_eq!(store.get("beta").await.unwrap(), Some("tok-2".to_string()));
        assert!(store.has("beta").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_hits_both_backends() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        assert!(!store.delete("missing").await.unwrap());

        vault.set_failure(Some(VaultError::Unavailable("daemon down".into())));
        store.set("alpha", "file-copy").await.unwrap();
        vault.set_failure(None);
        store.probe.invalidate().await;
        store.set("alpha", "vault-copy").await.unwrap();

        assert!(store.delete("alpha").await.unwrap());
        assert!(!vault.contains(SERVICE, "alpha"));
        assert!(!store.files.exists("alpha").await.unwrap());
        assert_eq!(store.get("alpha").await.unwrap(), None);
        assert!(!store.delete("alpha").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_deduplicates_across_backends() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::enumerable());
        let store = vault_store(&vault, dir.path());

        vault.set_failure(Some(VaultError::Unavailable("daemon down".into())));
        store.set("shared", "a").await.unwrap();
        store.set("file-only", "b").await.unwrap();
        vault.set_failure(None);
        store.probe.invalidate().await;
        store.set("shared", "c").await.unwrap();
        store.set("vault-only", "d").await.unwrap();
        vault
            .set_password(&VaultHandle::new("other-service", "foreign"), "e")
            .unwrap();

        assert_eq!(
            store.list().await.unwrap(),
            vec!["file-only", "shared", "vault-only"]
        );
    }

    #[tokio::test]
    async fn test_list_without_enumeration_shows_fallback_only() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        store.set("vault-only", "d").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.has("vault-only").await.unwrap());
    }

    #[tokio::test]
    async fn test_probe_is_cached_between_calls() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        assert!(store.is_available().await);
        assert!(store.is_available().await);
        assert_eq!(vault.set_calls(), 1);

        store.set("alpha", "sk-1").await.unwrap();
        assert_eq!(vault.set_calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_invalidates_probe_cache() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = SecureStore::new(
            config(dir.path(), FallbackPolicy::Allow).with_vault_timeout(Duration::from_millis(50)),
            vault.loader(),
        );

        assert!(store.is_available().await);
        assert_eq!(vault.set_calls(), 1);

        vault.set_latency(Some(Duration::from_millis(300)));
        let err = store.get("alpha").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(store.probe.last_result().await.is_none());

        vault.set_latency(None);
        assert!(store.is_available().await);
        assert_eq!(vault.set_calls(), 2);
    }

    #[tokio::test]
    async fn test_locked_vault_propagates() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        assert!(store.is_available().await);
        vault.set_failure(Some(VaultError::Locked("keychain locked".into())));

        assert_eq!(store.get("alpha").await.unwrap_err().kind(), ErrorKind::Locked);
        assert_eq!(store.has("alpha").await.unwrap_err().kind(), ErrorKind::Locked);
        assert_eq!(store.set("alpha", "v").await.unwrap_err().kind(), ErrorKind::Locked);
        // 일시적 실패가 아니므로 캐시는 유지
        assert!(store.probe.last_result().await.is_some());
    }

    #[tokio::test]
    async fn test_loader_runs_once_and_failure_is_cached() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader: VaultLoader = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(VaultError::Unavailable("module missing".into()))
        });
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), loader);

        assert!(!store.is_available().await);
        store.set("alpha", "v").await.unwrap();
        assert_eq!(store.get("alpha").await.unwrap(), Some("v".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_has_and_require_distinguish_absence() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        assert!(!store.has("nobody").await.unwrap());
        assert_eq!(store.get("nobody").await.unwrap(), None);
        assert_eq!(
            store.require("nobody").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        store.set("alpha", "sk-1").await.unwrap();
        assert_eq!(store.require("alpha").await.unwrap(), "sk-1");
    }

    #[tokio::test]
    async fn test_status_reports_backend() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Deny), missing_backend());

        let status = store.status().await;
        assert_eq!(status.service, SERVICE);
        assert_eq!(status.policy, FallbackPolicy::Deny);
        assert!(!status.vault_available);

        assert_eq!(status.last_probe_age_ms, None);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["vaultAvailable"], false);
        assert_eq!(json["policy"], "deny");
        assert_eq!(json["envelopeVersion"], 1);
    }

    #[tokio::test]
    async fn test_status_reports_cached_probe() {
        let dir = tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = vault_store(&vault, dir.path());

        let status = store.status().await;
        assert!(status.vault_available);
        assert!(status.last_probe_age_ms.is_some());
        assert_eq!(vault.set_calls(), 1);
    }

    #[tokio::test]
    async fn test_default_key_survives_new_process_environment() {
        let dir = tempdir().unwrap();
        let config = SecureStoreConfig::new(SERVICE)
            .with_fallback_dir(dir.path())
            .with_kdf(fast_params());

        std::env::set_var("HOSTNAME", "box-a");
        let first = SecureStore::new(config.clone(), missing_backend());
        first.set("beta", "tok-2").await.unwrap();

        // 같은 계정의 다른 실행 환경 (cron, 컨테이너)
        std::env::remove_var("HOSTNAME");
        std::env::set_var("USER", "someone-else");
        let second = SecureStore::new(config, missing_backend());
        assert_eq!(second.get("beta").await.unwrap().as_deref(), Some("tok-2"));
        assert_eq!(second.list().await.unwrap(), vec!["beta"]);
    }

    #[tokio::test]
    async fn test_long_names_on_fallback_path() {
        let dir = tempdir().unwrap();
        let store = SecureStore::new(config(dir.path(), FallbackPolicy::Allow), missing_backend());

        let long = "k".repeat(120);
        store.set(&long, "v").await.unwrap();
        assert_eq!(store.get(&long).await.unwrap().as_deref(), Some("v"));

        let too_long = "k".repeat(200);
        let err = store.set(&too_long, "v").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("at most"));
        assert_eq!(store.get(&too_long).await.unwrap(), None);
        assert!(!store.has(&too_long).await.unwrap());
    }
}
