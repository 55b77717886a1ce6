//! Secure Store 설정
//!
//! 기본값 → 환경 변수 → 호출자 빌더 순으로 덮어씁니다.
//! 개발 환경에서는 `.env.local`/`.env`를 먼저 로드할 수 있습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::FallbackPolicy;
use crate::secrets::envelope::{KdfParams, PassphraseMaterial};
use crate::secrets::key_file::KeySource;
use crate::secrets::probe::DEFAULT_PROBE_TTL;

pub const ENV_SERVICE: &str = "SECURE_STORE_SERVICE";
pub const ENV_DIR: &str = "SECURE_STORE_DIR";
pub const ENV_FALLBACK: &str = "SECURE_STORE_FALLBACK";
pub const ENV_PASSPHRASE: &str = "SECURE_STORE_PASSPHRASE";
pub const ENV_VAULT_TIMEOUT_MS: &str = "SECURE_STORE_VAULT_TIMEOUT_MS";

pub const DEFAULT_SERVICE: &str = "secure-store";
pub const DEFAULT_VAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SecureStoreConfig {
    /// OS 볼트 service 네임스페이스 (래퍼 계층마다 다르게)
    pub service: String,
    /// 폴백 봉투 파일 디렉토리
    pub fallback_dir: PathBuf,
    pub policy: FallbackPolicy,
    pub probe_ttl: Duration,
    pub vault_timeout: Duration,
    /// 없으면 폴백 디렉토리의 키 파일 사용
    pub passphrase: Option<String>,
    pub kdf: KdfParams,
}

impl std::fmt::Debug for SecureStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStoreConfig")
            .field("service", &self.service)
            .field("fallback_dir", &self.fallback_dir)
            .field("policy", &self.policy)
            .field("probe_ttl", &self.probe_ttl)
            .field("vault_timeout", &self.vault_timeout)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl Default for SecureStoreConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            fallback_dir: default_base_dir().join("secrets"),
            policy: FallbackPolicy::Allow,
            probe_ttl: DEFAULT_PROBE_TTL,
            vault_timeout: DEFAULT_VAULT_TIMEOUT,
            passphrase: None,
            kdf: KdfParams::default(),
        }
    }
}

impl SecureStoreConfig {
    pub fn new(service: &str) -> Self {
        Self::default().with_service(service)
    }

    /// 기본값 위에 환경 변수를 덮어씀
    pub fn from_env() -> Result<Self, String> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(service) = get(ENV_SERVICE) {
            self.service = service.trim().to_string();
        }
        if let Some(dir) = get(ENV_DIR) {
            self.fallback_dir = PathBuf::from(dir.trim());
        }
        if let Some(policy) = get(ENV_FALLBACK) {
            self.policy = policy.parse()?;
        }
        if let Some(passphrase) = get(ENV_PASSPHRASE) {
            self.passphrase = Some(passphrase);
        }
        if let Some(ms) = get(ENV_VAULT_TIMEOUT_MS) {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| format!("{} must be an integer (milliseconds)", ENV_VAULT_TIMEOUT_MS))?;
            self.vault_timeout = Duration::from_millis(ms);
        }
        Ok(self)
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = dir.into();
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_probe_ttl(mut self, ttl: Duration) -> Self {
        self.probe_ttl = ttl;
        self
    }

    pub fn with_vault_timeout(mut self, timeout: Duration) -> Self {
        self.vault_timeout = timeout;
        self
    }

    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn key_source(&self) -> KeySource {
        match &self.passphrase {
            Some(passphrase) => KeySource::Passphrase(PassphraseMaterial::from_passphrase(passphrase)),
            None => KeySource::KeyFile(self.fallback_dir.clone()),
        }
    }
}

/// `$HOME/.secure-store` (HOME이 없으면 현재 디렉토리)
pub fn default_base_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".secure-store")
}

fn is_valid_env_key(key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    key.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// KEY=VALUE 라인만 골라 로드 (이미 값이 있는 키는 덮어쓰지 않음)
fn try_load_env_lenient(path: &Path) -> std::io::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let mut loaded = 0usize;

    for (key, value) in parse_env_lines(&text) {
        if let Ok(existing) = std::env::var(&key) {
            if !existing.trim().is_empty() {
                continue;
            }
        }
        std::env::set_var(&key, value);
        loaded += 1;
    }

    Ok(loaded)
}

fn parse_env_lines(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("```") {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line).trim();
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if !is_valid_env_key(key) {
            continue;
        }

        let mut value = v.trim().to_string();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = value[1..value.len() - 1].to_string();
        }
        pairs.push((key.to_string(), value));
    }
    pairs
}

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

/// `.env.local` (상위 디렉토리 탐색) → `.env` 순으로 로드
///
/// strict 파서(dotenvy)가 실패하면 lenient 로더로 보강합니다. 파일이 없어도 실패하지 않습니다.
pub fn load_env_files() {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_upwards(cwd, ".env.local", 6) {
            if dotenvy::from_path(&path).is_err() {
                match try_load_env_lenient(&path) {
                    Ok(loaded) => tracing::debug!(loaded, path = %path.display(), "env file loaded leniently"),
                    Err(e) => tracing::warn!(path = %path.display(), "failed to read env file: {}", e),
                }
            }
        }
    }
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SecureStoreConfig::default();
        assert_eq!(config.service, DEFAULT_SERVICE);
        assert_eq!(config.policy, FallbackPolicy::Allow);
        assert_eq!(config.probe_ttl, Duration::from_secs(60));
        assert_eq!(config.vault_timeout, Duration::from_secs(5));
        assert!(config.fallback_dir.ends_with(".secure-store/secrets"));
    }

    #[test]
    fn test_env_overrides() {
        let config = SecureStoreConfig::default()
            .apply_env(env(&[
                (ENV_SERVICE, "my-cli-provider-keys"),
                (ENV_DIR, "/tmp/ss"),
                (ENV_FALLBACK, "deny"),
                (ENV_PASSPHRASE, "hunter2"),
                (ENV_VAULT_TIMEOUT_MS, "250"),
            ]))
            .unwrap();

        assert_eq!(config.service, "my-cli-provider-keys");
        assert_eq!(config.fallback_dir, PathBuf::from("/tmp/ss"));
        assert_eq!(config.policy, FallbackPolicy::Deny);
        assert_eq!(config.passphrase.as_deref(), Some("hunter2"));
        assert_eq!(config.vault_timeout, Duration::from_millis(250));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_env_rejects_bad_values() {
        assert!(SecureStoreConfig::default()
            .apply_env(env(&[(ENV_FALLBACK, "sometimes")]))
            .is_err());
        assert!(SecureStoreConfig::default()
            .apply_env(env(&[(ENV_VAULT_TIMEOUT_MS, "soon")]))
            .is_err());
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = SecureStoreConfig::default()
            .apply_env(env(&[(ENV_SERVICE, "  "), (ENV_PASSPHRASE, "")]))
            .unwrap();
        assert_eq!(config.service, DEFAULT_SERVICE);
        assert!(config.passphrase.is_none());
    }

    #[test]
    fn test_key_source_prefers_passphrase() {
        let config = SecureStoreConfig::default().with_fallback_dir("/tmp/ss");
        assert!(matches!(
            config.key_source(),
            KeySource::KeyFile(dir) if dir == PathBuf::from("/tmp/ss")
        ));
        assert!(matches!(
            config.with_passphrase("p").key_source(),
            KeySource::Passphrase(_)
        ));
    }

    #[test]
    fn test_parse_env_lines_is_lenient() {
        let text = "# comment\n```\nexport SECURE_STORE_DIR=\"/tmp/a\"\nnot a pair\nlower=skip\nSECURE_STORE_FALLBACK='deny'\n";
        let pairs = parse_env_lines(text);
        assert_eq!(
            pairs,
            vec![
                ("SECURE_STORE_DIR".to_string(), "/tmp/a".to_string()),
                ("SECURE_STORE_FALLBACK".to_string(), "deny".to_string()),
            ]
        );
    }
}
