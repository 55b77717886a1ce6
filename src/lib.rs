//! Secure Store - 자격 증명 저장 라이브러리
//!
//! OS 자격 증명 볼트(키체인/Secret Service/Credential Manager)를 우선 사용하고,
//! 볼트를 쓸 수 없는 환경에서는 정책에 따라 암호화 파일로 폴백합니다.
//!
//! ```no_run
//! use secure_store::{SecureStore, SecureStoreConfig};
//!
//! # async fn demo() -> Result<(), secure_store::SecureStoreError> {
//! let store = SecureStore::with_keyring(SecureStoreConfig::new("my-cli"));
//! store.set("alpha", "tok-1").await?;
//! assert_eq!(store.get("alpha").await?.as_deref(), Some("tok-1"));
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod secrets;

pub use config::SecureStoreConfig;
pub use error::{CommandError, CommandResult, ErrorKind, SecureStoreError};
pub use keys::{KeyStorageError, OAuthToken, ProviderKeyStorage, TokenStorage};
pub use models::{FallbackPolicy, VaultHandle};
pub use secrets::{MemoryVault, SecureStore, StoreStatus, VaultAdapter, VaultError, VaultLoader};
