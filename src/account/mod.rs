/// 계정 정지 확인 게이트
/// 계정/신원 서비스는 외부 협력자다. 코어는 호출 전에 정지 여부만 확인한다.
// region:    --- Imports
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::error;
use uuid::Uuid;

use crate::error::CoreError;
// endregion: --- Imports

// region:    --- Suspension Gate

#[async_trait]
pub trait SuspensionGate: Send + Sync {
    /// 정지된 계정이면 AccountSuspended 오류를 반환한다.
    async fn ensure_active(&self, user_id: Uuid) -> Result<(), CoreError>;
}

/// 계정 서비스 미연동 환경(로컬 개발)용: 모든 계정 허용
pub struct AllowAllGate;

#[async_trait]
impl SuspensionGate for AllowAllGate {
    async fn ensure_active(&self, _user_id: Uuid) -> Result<(), CoreError> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct SuspensionResponse {
    suspended: bool,
}

/// 계정 서비스 HTTP 연동 게이트
pub struct HttpSuspensionGate {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSuspensionGate {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl SuspensionGate for HttpSuspensionGate {
    async fn ensure_active(&self, user_id: Uuid) -> Result<(), CoreError> {
        let url = format!("{}/accounts/{}/suspension", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("{:<12} --> 계정 서비스 호출 오류: {}", "Gate", e);
                CoreError::Internal(format!("계정 서비스 호출 실패: {}", e))
            })?;
        let body: SuspensionResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("계정 서비스 응답 파싱 실패: {}", e)))?;
        if body.suspended {
            return Err(CoreError::AccountSuspended);
        }
        Ok(())
    }
}

/// 테스트용: 지정한 계정만 정지 처리
pub struct StaticSuspensionGate {
    suspended: HashSet<Uuid>,
}

impl StaticSuspensionGate {
    pub fn new<I: IntoIterator<Item = Uuid>>(suspended: I) -> Self {
        Self {
            suspended: suspended.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SuspensionGate for StaticSuspensionGate {
    async fn ensure_active(&self, user_id: Uuid) -> Result<(), CoreError> {
        if self.suspended.contains(&user_id) {
            return Err(CoreError::AccountSuspended);
        }
        Ok(())
    }
}

// endregion: --- Suspension Gate
