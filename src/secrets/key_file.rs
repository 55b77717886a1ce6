//! 폴백 키 파일
//!
//! 패스프레이즈가 설정되지 않으면 폴백 디렉토리의 `.fallback.key`(0600)에 저장된
//! 무작위 32바이트를 키 파생 재료로 사용합니다. 파일은 처음 필요할 때 한 번 생성되고,
//! 이후에는 실행 환경(셸, cron, 컨테이너)과 관계없이 같은 값을 읽습니다.
//!
//! 동시에 여러 프로세스가 생성을 시도해도 `hard_link`가 이미 있는 파일을 덮어쓰지
//! 않으므로 먼저 링크한 쪽의 키 하나만 남습니다.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::error::SecureStoreError;
use crate::secrets::envelope::PassphraseMaterial;

pub const KEY_FILE_NAME: &str = ".fallback.key";

const KEY_BYTES: usize = 32;

/// 키 파생 재료의 출처
#[derive(Debug, Clone)]
pub enum KeySource {
    Passphrase(PassphraseMaterial),
    /// 이 디렉토리의 `.fallback.key`
    KeyFile(PathBuf),
}

impl KeySource {
    /// blocking I/O. `spawn_blocking` 안에서 호출
    pub fn resolve(&self) -> Result<PassphraseMaterial, SecureStoreError> {
        match self {
            KeySource::Passphrase(material) => Ok(material.clone()),
            KeySource::KeyFile(dir) => load_or_create(dir),
        }
    }
}

pub fn load_or_create(dir: &Path) -> Result<PassphraseMaterial, SecureStoreError> {
    let path = dir.join(KEY_FILE_NAME);
    if let Some(material) = read_key(&path)? {
        return Ok(material);
    }

    create_dir(dir)?;
    let temp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let written = write_new_key(&temp_path);
    let linked = written.and_then(|()| match std::fs::hard_link(&temp_path, &path) {
        Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => Err(e),
        _ => Ok(()),
    });
    let _ = std::fs::remove_file(&temp_path);
    linked.map_err(|e| SecureStoreError::from_io("create fallback key file", e))?;

    tracing::info!(path = %path.display(), "fallback key file ready");
    read_key(&path)?.ok_or_else(|| {
        SecureStoreError::Unavailable(format!("fallback key file {} vanished", path.display()))
    })
}

fn read_key(path: &Path) -> Result<Option<PassphraseMaterial>, SecureStoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => Zeroizing::new(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SecureStoreError::from_io("read fallback key file", e)),
    };
    let bytes = BASE64
        .decode(text.trim())
        .ok()
        .filter(|bytes| bytes.len() == KEY_BYTES)
        .ok_or_else(|| SecureStoreError::corrupt(KEY_FILE_NAME, "fallback key file is malformed"))?;
    Ok(Some(PassphraseMaterial::from_key_bytes(Zeroizing::new(bytes))))
}

fn write_new_key(path: &Path) -> std::io::Result<()> {
    let mut key = Zeroizing::new([0u8; KEY_BYTES]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    let encoded = Zeroizing::new(BASE64.encode(&key[..]));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(encoded.as_bytes())?;
    file.sync_all()
}

fn create_dir(dir: &Path) -> Result<(), SecureStoreError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| SecureStoreError::from_io("create fallback dir", e))
}
