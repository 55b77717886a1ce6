//! 암호화 봉투(Envelope) 코덱
//!
//! 파일 포맷 (v1, JSON):
//! - `version`: 포맷 버전 (현재 1, 다른 값은 모두 손상으로 취급)
//! - `salt`: Argon2id 솔트 16 bytes (base64)
//! - `nonce`: XChaCha20-Poly1305 nonce 24 bytes (base64)
//! - `ciphertext`: 암호문 (base64)
//! - `authTag`: Poly1305 태그 16 bytes (base64)
//!
//! AAD: `secure-store:v{version}:{name}` (버전 + 자격 증명 이름 바인딩)

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// 현재 봉투 포맷 버전
pub const CURRENT_VERSION: u32 = 1;

/// 파생 키 길이 (256-bit)
pub const KEY_LEN: usize = 32;

/// 솔트 길이
pub const SALT_LEN: usize = 16;

/// Nonce 길이 (XChaCha20-Poly1305용 24 bytes)
pub const NONCE_LEN: usize = 24;

/// Poly1305 태그 길이
pub const TAG_LEN: usize = 16;

/// 봉투 오류
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("unsupported envelope version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u32 },

    #[error("unrecognized envelope format: {0}")]
    Malformed(String),

    #[error("decryption failed (wrong key or tampered data)")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),
}

/// 디스크에 저장되는 봉투
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub version: u32,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
    pub auth_tag: String,
}

/// 버전만 먼저 읽기 위한 헤더
#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u64,
}

impl Envelope {
    /// 버전 검사를 먼저 수행한 뒤 나머지 필드를 파싱
    ///
    /// 알 수 없는 버전은 다른 필드를 보지 않고 거부합니다.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let header: EnvelopeHeader = serde_json::from_slice(bytes)
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        if header.version != u64::from(CURRENT_VERSION) {
            return Err(EnvelopeError::UnsupportedVersion {
                found: header.version,
                expected: CURRENT_VERSION,
            });
        }
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|e| EnvelopeError::EncryptionFailed(e.to_string()))
    }
}

/// 키 파생에 쓰이는 로컬 비밀 재료 (drop 시 zeroize)
#[derive(Clone)]
pub struct PassphraseMaterial(Zeroizing<Vec<u8>>);

impl PassphraseMaterial {
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(Zeroizing::new(passphrase.as_bytes().to_vec()))
    }

    /// 키 파일에서 읽은 무작위 바이트
    pub(crate) fn from_key_bytes(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PassphraseMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PassphraseMaterial(<redacted>)")
    }
}

/// Argon2id 비용 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// 메모리 비용 (KiB)
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// 봉투 암호화/복호화
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    params: KdfParams,
}

impl EnvelopeCodec {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn current_version(&self) -> u32 {
        CURRENT_VERSION
    }

    pub fn encrypt(
        &self,
        name: &str,
        value: &str,
        material: &PassphraseMaterial,
    ) -> Result<Envelope, EnvelopeError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut salt);
        rand::thread_rng().fill(&mut nonce);

        let key = self.derive_key(material, &salt)?;
        let cipher = XChaCha20Poly1305::new(key.as_slice().into());
        let aad = associated_data(CURRENT_VERSION, name);

        let mut sealed = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: value.as_bytes(),
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|e| EnvelopeError::EncryptionFailed(e.to_string()))?;

        // AEAD 결과 = 암호문 + 태그
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(Envelope {
            version: CURRENT_VERSION,
            salt: BASE64.encode(salt),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(&sealed),
            auth_tag: BASE64.encode(tag),
        })
    }

    pub fn decrypt(
        &self,
        name: &str,
        envelope: &Envelope,
        material: &PassphraseMaterial,
    ) -> Result<String, EnvelopeError> {
        if envelope.version != CURRENT_VERSION {
            return Err(EnvelopeError::UnsupportedVersion {
                found: u64::from(envelope.version),
                expected: CURRENT_VERSION,
            });
        }

        let salt = decode_field("salt", &envelope.salt, Some(SALT_LEN))?;
        let nonce = decode_field("nonce", &envelope.nonce, Some(NONCE_LEN))?;
        let tag = decode_field("authTag", &envelope.auth_tag, Some(TAG_LEN))?;
        let mut sealed = decode_field("ciphertext", &envelope.ciphertext, None)?;
        sealed.extend_from_slice(&tag);

        let key = self.derive_key(material, &salt)?;
        let cipher = XChaCha20Poly1305::new(key.as_slice().into());
        let aad = associated_data(envelope.version, name);

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    XNonce::from_slice(&nonce),
                    Payload {
                        msg: &sealed,
                        aad: aad.as_bytes(),
                    },
                )
                .map_err(|_| EnvelopeError::DecryptionFailed)?,
        );

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| EnvelopeError::Malformed("decrypted value is not UTF-8".to_string()))
    }

    fn derive_key(
        &self,
        material: &PassphraseMaterial,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, EnvelopeError> {
        let params = Params::new(
            self.params.m_cost,
            self.params.t_cost,
            self.params.p_cost,
            Some(KEY_LEN),
        )
        .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(material.as_bytes(), salt, &mut key[..])
            .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;
        Ok(key)
    }
}

fn associated_data(version: u32, name: &str) -> String {
    format!("secure-store:v{}:{}", version, name)
}

fn decode_field(
    field: &str,
    encoded: &str,
    expected_len: Option<usize>,
) -> Result<Vec<u8>, EnvelopeError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| EnvelopeError::Malformed(format!("{} is not base64: {}", field, e)))?;
    match expected_len {
        Some(len) if bytes.len() != len => Err(EnvelopeError::Malformed(format!(
            "{} has length {} (expected {})",
            field,
            bytes.len(),
            len
        ))),
        _ => Ok(bytes),
    }
}
