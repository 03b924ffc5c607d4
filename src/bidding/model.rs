use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 입찰 모델
// 입찰 로그는 추가 전용이며 기록 후 절대 수정하지 않는다.
// 한 입찰자의 여러 입찰 중 가장 나중 기록(placed_at, 같으면 기록 순서)만 유효하다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub bidder_id: Uuid,
    /// 입찰자가 지불할 의사가 있는 최대 금액(비공개)
    pub max_bid: i64,
    pub placed_at: DateTime<Utc>,
}

/// 입찰 이력 조회용 투영
/// 입찰자 식별자는 본인에게만 공개하고, 나머지에게는 "입찰자 N" 으로 익명화한다.
/// 진행 중인 경매에서 선두 입찰자의 최대 금액은 현재 가격으로 가려서 내려준다.
#[derive(Debug, Clone, Serialize)]
pub struct BidView {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub bidder_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidder_id: Option<Uuid>,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
}
