use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// region:    --- Offer Model

/// 가격 제안 상태
/// PENDING -> ACCEPTED | REJECTED | COUNTERED | EXPIRED
/// COUNTERED -> ACCEPTED | REJECTED | EXPIRED (구매자 응답)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Countered,
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Countered => "COUNTERED",
            OfferStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OfferStatus::Pending),
            "ACCEPTED" => Some(OfferStatus::Accepted),
            "REJECTED" => Some(OfferStatus::Rejected),
            "COUNTERED" => Some(OfferStatus::Countered),
            "EXPIRED" => Some(OfferStatus::Expired),
            _ => None,
        }
    }

    /// PENDING/COUNTERED 만 진행 중인 제안이다.
    pub fn is_open(&self) -> bool {
        matches!(self, OfferStatus::Pending | OfferStatus::Countered)
    }
}

/// 가격 제안 모델
/// 구매자 한 명은 리스팅당 진행 중인 제안을 하나만 가질 수 있다.
/// expires_at 은 마지막 상태 변경으로부터 48시간이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: i64,
    pub status: OfferStatus,
    pub counter_amount: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// 제안 유효 기간: 마지막 상태 변경 기준 48시간
pub const OFFER_TTL_HOURS: i64 = 48;

// endregion: --- Offer Model
