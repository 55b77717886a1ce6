//! Secure Store Data Models
//!
//! 여러 모듈이 공유하는 작은 값 타입

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 볼트를 사용할 수 없을 때 암호화 파일 저장소로 폴백할지 여부
///
/// 저장소가 아닌 호출자가 생성 시점에 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Allow,
    Deny,
}

impl FallbackPolicy {
    pub fn allows_fallback(self) -> bool {
        self == FallbackPolicy::Allow
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Allow => f.write_str("allow"),
            FallbackPolicy::Deny => f.write_str("deny"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(FallbackPolicy::Allow),
            "deny" => Ok(FallbackPolicy::Deny),
            other => Err(format!("Invalid fallback policy '{}' (expected allow|deny)", other)),
        }
    }
}

/// OS 볼트 안에서 자격 증명 하나를 가리키는 service/account 쌍
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultHandle {
    pub service: String,
    pub account: String,
}

impl VaultHandle {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }
}
