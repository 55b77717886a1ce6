//! CLI 명령 정의
//!
//! clap derive 로 인자를 파싱하고 `secure_store::execute`로 위임합니다.

pub mod secure_store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use secure_store::{build_config, execute};

/// OS 자격 증명 볼트 + 암호화 파일 폴백 자격 증명 저장소
#[derive(Parser, Debug)]
#[command(name = "secure-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// 볼트 service 네임스페이스 (기본: SECURE_STORE_SERVICE 또는 "secure-store")
    #[arg(long, global = true)]
    pub service: Option<String>,

    /// 폴백 파일 디렉토리 (기본: SECURE_STORE_DIR 또는 ~/.secure-store/secrets)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// 볼트를 쓸 수 없을 때 파일 폴백 금지
    #[arg(long, global = true)]
    pub deny_fallback: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 자격 증명 저장 (덮어쓰기)
    Set { name: String, value: String },

    /// 값 출력. 없으면 NOT_FOUND 로 실패
    Get { name: String },

    /// 두 백엔드에서 모두 삭제
    Delete { name: String },

    /// 저장된 이름 목록 (값은 출력하지 않음)
    List,

    /// 존재 여부 (true/false)
    Has { name: String },

    /// 볼트 가용성과 설정 요약 (JSON)
    Status,
}
