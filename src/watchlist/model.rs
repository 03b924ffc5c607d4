use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 관심 목록 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// 판매자 평가
// 거래(판매 완료된 리스팅)당 평가자 한 명이 한 번만 남길 수 있는 추가 전용 기록
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SellerRating {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub rater_id: Uuid,
    pub positive: bool,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// 판매자 평판 집계
#[derive(Debug, Clone, Serialize)]
pub struct SellerScore {
    pub seller_id: Uuid,
    pub total: i64,
    pub positive: i64,
    /// 긍정 평가 비율(%). 평가가 없으면 None.
    pub positive_pct: Option<f64>,
}

impl SellerScore {
    pub fn from_ratings(seller_id: Uuid, ratings: &[SellerRating]) -> Self {
        let total = ratings.len() as i64;
        let positive = ratings.iter().filter(|r| r.positive).count() as i64;
        let positive_pct = if total > 0 {
            Some(positive as f64 * 100.0 / total as f64)
        } else {
            None
        };
        SellerScore {
            seller_id,
            total,
            positive,
            positive_pct,
        }
    }
}
