//! 프로세스 내 메모리 볼트
//!
//! OS 볼트가 없는 환경과 테스트에서 사용합니다. 열거 지원 여부, 호출 지연, 강제 실패를
//! 설정할 수 있어 오케스트레이터의 폴백/타임아웃 경로를 재현할 수 있습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::models::VaultHandle;
use crate::secrets::adapter::{VaultAdapter, VaultError, VaultLoader};

#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<(String, String), String>>,
    enumerable: bool,
    failure: Mutex<Option<VaultError>>,
    latency: Mutex<Option<Duration>>,
    set_calls: AtomicUsize,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// `find_credentials`를 지원하는 볼트
    pub fn enumerable() -> Self {
        Self {
            enumerable: true,
            ..Self::default()
        }
    }

    /// 이 인스턴스를 공유하는 로더
    pub fn loader(self: &Arc<Self>) -> VaultLoader {
        let vault = Arc::clone(self);
        Arc::new(move || Ok(Arc::clone(&vault) as Arc<dyn VaultAdapter>))
    }

    /// 이후 모든 호출을 주어진 오류로 실패시킴 (`None`이면 해제)
    pub fn set_failure(&self, failure: Option<VaultError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = failure;
    }

    /// 이후 모든 호출 전에 지연을 넣음 (멈춘 볼트 재현)
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// 지금까지의 `set_password` 호출 수 (프로브 포함)
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, service: &str, account: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(service.to_string(), account.to_string()))
    }

    fn before_call(&self) -> Result<(), VaultError> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        match &*self.failure.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn key(handle: &VaultHandle) -> (String, String) {
        (handle.service.clone(), handle.account.clone())
    }
}

impl VaultAdapter for MemoryVault {
    fn get_password(&self, handle: &VaultHandle) -> Result<Option<String>, VaultError> {
        self.before_call()?;
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(handle))
            .cloned())
    }

    fn set_password(&self, handle: &VaultHandle, value: &str) -> Result<(), VaultError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(handle), value.to_string());
        Ok(())
    }

    fn delete_password(&self, handle: &VaultHandle) -> Result<bool, VaultError> {
        self.before_call()?;
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::key(handle))
            .is_some())
    }

    fn find_credentials(&self, service: &str) -> Result<Option<Vec<(String, String)>>, VaultError> {
        if !self.enumerable {
            return Ok(None);
        }
        self.before_call()?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Some(
            entries
                .iter()
                .filter(|((svc, _), _)| svc == service)
                .map(|((_, account), value)| (account.clone(), value.clone()))
                .collect(),
        ))
    }
}
