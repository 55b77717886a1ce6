//! Secure Store 모듈
//!
//! OS 자격 증명 볼트를 우선 사용하고, 사용할 수 없으면 암호화 파일로 폴백합니다.
//!
//! - 볼트 가용성은 일회용 왕복 프로브로 판단하고 60초 동안 캐시
//! - 폴백 파일은 자격 증명당 1개, Argon2id + XChaCha20-Poly1305 봉투
//! - 패스프레이즈가 없으면 폴백 디렉토리의 무작위 키 파일을 키 재료로 사용
//! - 쓰기는 임시 파일 → fsync → rename 으로 원자적

pub mod adapter;
pub mod envelope;
pub mod file_store;
pub mod key_file;
pub mod memory;
pub mod probe;
pub mod store;

pub use adapter::{KeyringVault, VaultAdapter, VaultError, VaultLoader};
pub use envelope::{Envelope, EnvelopeCodec, EnvelopeError, KdfParams, PassphraseMaterial};
pub use file_store::AtomicFileStore;
pub use key_file::KeySource;
pub use memory::MemoryVault;
pub use probe::{AvailabilityProbe, ProbeResult};
pub use store::{SecureStore, StoreStatus};
