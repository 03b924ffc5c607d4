/// 코어 오류 타입
/// 모든 커맨드/쿼리는 CoreError 로 실패를 반환한다.
// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
// endregion: --- Imports

// region:    --- CoreError

#[derive(Debug, Error)]
pub enum CoreError {
    /// 입력값 검증 실패(필드 단위)
    #[error("{0}")]
    Validation(String),

    /// 대상 없음
    #[error("{0}")]
    NotFound(String),

    /// 소유자가 아닌 사용자의 변경 시도
    #[error("{0}")]
    Forbidden(String),

    /// 현재 상태에서 허용되지 않는 연산
    #[error("{0}")]
    InvalidState(String),

    /// 중복 리스팅, 중복 제안, 버전 충돌 등
    #[error("{0}")]
    Conflict(String),

    /// 최소 호가 미달. 재시도에 필요한 최소 금액을 함께 반환한다.
    #[error("입찰 금액이 최소 호가({minimum})보다 낮습니다.")]
    BidTooLow { minimum: i64 },

    /// 이용 정지 계정
    #[error("이용이 정지된 계정입니다.")]
    AccountSuspended,

    /// 저장소/외부 서비스 등 복구 불가능한 내부 오류
    #[error("내부 오류가 발생했습니다: {0}")]
    Internal(String),
}

impl CoreError {
    /// 클라이언트가 분기할 수 있는 안정적인 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::BidTooLow { .. } => "LOW_BID",
            CoreError::AccountSuspended => "ACCOUNT_SUSPENDED",
            CoreError::Internal(_) => "INTERNAL",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Forbidden(_) | CoreError::AccountSuspended => StatusCode::FORBIDDEN,
            CoreError::InvalidState(_) | CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::BidTooLow { .. } => StatusCode::BAD_REQUEST,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

/// HTTP 응답 변환: { "error": ..., "code": ... } 형태로 내려준다.
impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = match &self {
            CoreError::BidTooLow { minimum } => serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
                "minimum": minimum,
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            }),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

// endregion: --- CoreError
