use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bidding::engine;

// region:    --- Listing Model

/// 판매 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingType {
    Auction,
    FixedPrice,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Auction => "AUCTION",
            ListingType::FixedPrice => "FIXED_PRICE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUCTION" => Some(ListingType::Auction),
            "FIXED_PRICE" => Some(ListingType::FixedPrice),
            _ => None,
        }
    }
}

/// 리스팅 상태
/// SCHEDULED -> ACTIVE -> (ENDED) -> SOLD | UNSOLD
/// 취소는 판매 전, 경매는 입찰 전에만 가능하다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Scheduled,
    Active,
    Ended,
    Sold,
    Unsold,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Scheduled => "SCHEDULED",
            ListingStatus::Active => "ACTIVE",
            ListingStatus::Ended => "ENDED",
            ListingStatus::Sold => "SOLD",
            ListingStatus::Unsold => "UNSOLD",
            ListingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(ListingStatus::Scheduled),
            "ACTIVE" => Some(ListingStatus::Active),
            "ENDED" => Some(ListingStatus::Ended),
            "SOLD" => Some(ListingStatus::Sold),
            "UNSOLD" => Some(ListingStatus::Unsold),
            "CANCELLED" => Some(ListingStatus::Cancelled),
            _ => None,
        }
    }

    /// 판매 완료/유찰/취소 여부
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingStatus::Sold | ListingStatus::Unsold | ListingStatus::Cancelled
        )
    }
}

/// 결제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    None,
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::None => "NONE",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(PaymentStatus::None),
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// 리스팅 모델
/// 금액은 모두 센트 단위 i64.
/// current_price / high_bidder_id 는 입찰 로그에서 유도되는 투영값으로,
/// 입찰 기록과 같은 트랜잭션 안에서만 갱신된다.
/// version 은 낙관적 동시성 제어(CAS)에 사용한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub item_id: Uuid,
    pub listing_type: ListingType,
    pub status: ListingStatus,
    pub starting_price: i64,
    pub current_price: i64,
    pub buy_now_price: Option<i64>,
    pub high_bidder_id: Option<Uuid>,
    pub winning_amount: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub accepts_offers: bool,
    pub min_offer_amount: Option<i64>,
    pub shipping_cost: i64,
    pub description: String,
    pub detail_images: Vec<String>,
    pub payment_status: PaymentStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Listing Model

// region:    --- Listing Filter

/// 리스팅 검색 정렬 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingSort {
    EndingSoonest,
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ListingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSort::EndingSoonest => "ENDING_SOONEST",
            ListingSort::Newest => "NEWEST",
            ListingSort::PriceAsc => "PRICE_ASC",
            ListingSort::PriceDesc => "PRICE_DESC",
        }
    }
}

impl Default for ListingSort {
    fn default() -> Self {
        ListingSort::Newest
    }
}

/// ACTIVE 리스팅 검색 필터
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    pub listing_type: Option<ListingType>,
    pub seller_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub has_buy_now: Option<bool>,
    /// 마감 임박 필터: 지금부터 N분 이내에 마감되는 리스팅만
    pub ending_within_minutes: Option<i64>,
    #[serde(default)]
    pub sort: ListingSort,
}

// endregion: --- Listing Filter

// region:    --- Listing View

/// 조회용 투영: 남은 시간과 다음 최소 입찰가를 계산해서 내려준다.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    /// 마감까지 남은 시간(초). 마감 이후 또는 고정가 판매 완료면 0.
    pub time_remaining_secs: i64,
    /// 경매에서 다음 입찰이 통과하기 위한 최소 금액
    pub minimum_next_bid: Option<i64>,
    /// 판매자 긍정 평가 비율(%). 단건 조회에서만 채워진다.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_positive_pct: Option<f64>,
}

impl ListingView {
    pub fn project(listing: Listing, now: DateTime<Utc>) -> Self {
        let time_remaining_secs = (listing.end_time - now).num_seconds().max(0);
        let minimum_next_bid = match (listing.listing_type, listing.status) {
            (ListingType::Auction, ListingStatus::Scheduled | ListingStatus::Active) => {
                Some(engine::required_minimum(
                    listing.starting_price,
                    listing.current_price,
                    listing.high_bidder_id.is_some(),
                ))
            }
            _ => None,
        };
        ListingView {
            listing,
            time_remaining_secs,
            minimum_next_bid,
            seller_positive_pct: None,
        }
    }
}

// endregion: --- Listing View
