//! tracing 초기화
//!
//! `RUST_LOG`가 없으면 `info`. 출력은 stderr (stdout은 명령 결과 전용).
//! 로그에는 자격 증명 이름만 남고 값은 남지 않습니다.

use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// 여러 번 호출해도 안전 (이미 설정되어 있으면 무시)
pub fn init_logging() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::debug!("tracing initialized");
}
