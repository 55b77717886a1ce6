//! 볼트 가용성 프로브
//!
//! 일회용 값을 쓰고/읽고/지우는 왕복으로 볼트 사용 가능 여부를 판단하고,
//! 결과를 TTL 동안 캐시합니다. 실제 연산 중 일시적 실패가 관찰되면 즉시 무효화합니다.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 프로브 결과 캐시 TTL 기본값
pub const DEFAULT_PROBE_TTL: Duration = Duration::from_secs(60);

/// 프로브에 사용하는 예약 계정 이름
pub const PROBE_ACCOUNT: &str = "__secure_store_probe__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub available: bool,
    pub checked_at: Instant,
}

impl ProbeResult {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.checked_at.elapsed() < ttl
    }
}

/// 인스턴스 범위의 프로브 캐시
///
/// 슬롯 하나를 mutex로 보호하며, 프로브 왕복 동안 잠금을 유지하므로
/// 동시에 들어온 호출은 같은 결과를 공유합니다.
#[derive(Debug)]
pub struct AvailabilityProbe {
    ttl: Duration,
    slot: Mutex<Option<ProbeResult>>,
}

impl AvailabilityProbe {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// 캐시가 유효하면 캐시 값을, 아니면 `round_trip`을 실행해 결과를 저장
    pub async fn check<F, Fut>(&self, round_trip: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(result) = slot.as_ref() {
            if result.is_fresh(self.ttl) {
                return result.available;
            }
        }

        let available = round_trip().await;
        tracing::info!(available, "vault availability probed");
        *slot = Some(ProbeResult {
            available,
            checked_at: Instant::now(),
        });
        available
    }

    /// 다음 `check`가 반드시 다시 프로브하도록 캐시를 비움
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            tracing::warn!("vault availability cache invalidated");
        }
    }

    pub async fn last_result(&self) -> Option<ProbeResult> {
        *self.slot.lock().await
    }
}

impl Default for AvailabilityProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>, verdict: bool) -> impl Future<Output = bool> {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            verdict
        }
    }

    #[tokio::test]
    async fn test_result_is_cached_within_ttl() {
        let probe = AvailabilityProbe::default();
        let runs = Arc::new(AtomicUsize::new(0));

        assert!(probe.check(|| counting(&runs, true)).await);
        // 두 번째 판정은 무시되어야 함 (캐시 사용)
        assert!(probe.check(|| counting(&runs, false)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(probe.last_result().await.unwrap().available);
    }

    #[tokio::test]
    async fn test_expired_result_reprobes() {
        let probe = AvailabilityProbe::new(Duration::from_millis(20));
        let runs = Arc::new(AtomicUsize::new(0));

        assert!(!probe.check(|| counting(&runs, false)).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(probe.check(|| counting(&runs, true)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reprobe() {
        let probe = AvailabilityProbe::default();
        let runs = Arc::new(AtomicUsize::new(0));

        assert!(probe.check(|| counting(&runs, true)).await);
        probe.invalidate().await;
        assert!(probe.last_result().await.is_none());
        assert!(!probe.check(|| counting(&runs, false)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_round_trip() {
        let probe = Arc::new(AvailabilityProbe::default());
        let runs = Arc::new(AtomicUsize::new(0));

        let slow = |runs: Arc<AtomicUsize>| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            runs.fetch_add(1, Ordering::SeqCst);
            true
        };

        let (a, b) = tokio::join!(
            probe.check(|| slow(Arc::clone(&runs))),
            probe.check(|| slow(Arc::clone(&runs)))
        );
        assert!(a && b);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
