//! 원자적 파일 저장소
//!
//! 자격 증명 하나당 봉투 파일 하나를 전용 디렉토리(0700)에 저장합니다.
//! 쓰기는 항상 같은 디렉토리의 임시 파일에 쓰고 fsync 한 뒤 rename 합니다.
//! 파일 이름은 이름의 hex 이므로 대소문자를 구분하지 않는 파일 시스템에서도 충돌하지 않습니다.
//! 읽는 쪽은 이전 파일 전체 또는 새 파일 전체만 보게 됩니다.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::SecureStoreError;
use crate::secrets::envelope::Envelope;

/// 봉투 파일 확장자
pub const FILE_SUFFIX: &str = ".enc";

/// 파일 이름으로 저장할 수 있는 최대 자격 증명 이름 길이 (bytes)
///
/// hex 인코딩 + `.enc`가 일반적인 NAME_MAX(255)에 들어가야 함
pub const MAX_NAME_BYTES: usize = (255 - FILE_SUFFIX.len()) / 2;

const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct AtomicFileStore {
    dir: PathBuf,
}

/// rename 직전까지 완료된 쓰기
#[derive(Debug)]
pub(crate) struct StagedWrite {
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl StagedWrite {
    pub(crate) async fn commit(self) -> Result<(), SecureStoreError> {
        if let Err(e) = fs::rename(&self.temp_path, &self.final_path).await {
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(SecureStoreError::from_io("rename fallback file", e));
        }
        Ok(())
    }
}

impl AtomicFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 자격 증명 이름 → 파일 경로 (UTF-8 바이트의 소문자 hex)
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", hex::encode(name), FILE_SUFFIX))
    }

    pub async fn write(&self, name: &str, envelope: &Envelope) -> Result<(), SecureStoreError> {
        let bytes = envelope
            .to_vec()
            .map_err(|e| SecureStoreError::Unavailable(e.to_string()))?;
        self.stage(name, &bytes).await?.commit().await
    }

    pub async fn read(&self, name: &str) -> Result<Option<Envelope>, SecureStoreError> {
        if !fits(name) {
            return Ok(None);
        }
        let bytes = match fs::read(self.path_for(name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SecureStoreError::from_io("read fallback file", e)),
        };
        Envelope::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SecureStoreError::corrupt(name, e.to_string()))
    }

    pub async fn remove(&self, name: &str) -> Result<bool, SecureStoreError> {
        if !fits(name) {
            return Ok(false);
        }
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SecureStoreError::from_io("remove fallback file", e)),
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, SecureStoreError> {
        if !fits(name) {
            return Ok(false);
        }
        fs::try_exists(self.path_for(name))
            .await
            .map_err(|e| SecureStoreError::from_io("stat fallback file", e))
    }

    /// 디렉토리의 봉투 파일 이름을 디코딩해 반환 (임시/외부 파일은 무시)
    pub async fn list_names(&self) -> Result<BTreeSet<String>, SecureStoreError> {
        let mut names = BTreeSet::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(SecureStoreError::from_io("list fallback dir", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SecureStoreError::from_io("list fallback dir", e))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = decode_file_name(file_name) {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// 임시 파일에 쓰고 fsync 까지 수행 (rename 은 `commit`에서)
    pub(crate) async fn stage(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<StagedWrite, SecureStoreError> {
        if !fits(name) {
            return Err(SecureStoreError::Unavailable(format!(
                "credential name is {} bytes; the encrypted file fallback supports at most {}",
                name.len(),
                MAX_NAME_BYTES
            )));
        }
        self.ensure_dir().await?;

        let temp_path = self
            .dir
            .join(format!(".{}{}", uuid::Uuid::new_v4().simple(), TEMP_SUFFIX));

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let result = async {
            let mut file = options.open(&temp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SecureStoreError::from_io("write fallback file", e));
        }

        Ok(StagedWrite {
            temp_path,
            final_path: self.path_for(name),
        })
    }

    async fn ensure_dir(&self) -> Result<(), SecureStoreError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.dir)
            .await
            .map_err(|e| SecureStoreError::from_io("create fallback dir", e))
    }
}

fn fits(name: &str) -> bool {
    name.len() <= MAX_NAME_BYTES
}

fn decode_file_name(file_name: &str) -> Option<String> {
    if file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.strip_suffix(FILE_SUFFIX)?;
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}
