/// 저장소 추상화
/// 코어 커맨드는 MarketStore 트레이트에만 의존한다.
/// 운영은 PostgresMarketStore, 테스트/로컬은 MemoryMarketStore 를 사용하며
/// 두 구현 모두 동일한 버전 CAS 계약을 지킨다.
// region:    --- Imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bidding::model::Bid;
use crate::error::CoreError;
use crate::listing::model::{Listing, ListingFilter};
use crate::offer::model::Offer;
use crate::watchlist::model::SellerRating;

pub mod memory;
pub mod postgres;
pub mod queries;

pub use memory::MemoryMarketStore;
pub use postgres::PostgresMarketStore;
// endregion: --- Imports

// region:    --- Market Store Trait

/// CAS 계약: 갱신 메서드에 넘기는 엔티티의 version 은 호출자가 미리 1 올린 값이다.
/// 저장소는 저장된 version == (전달된 version - 1) 일 때만 쓰고 true 를 반환한다.
/// false 는 동시 쓰기에 밀린 것이므로 호출자가 다시 읽고 재시도한다.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- 리스팅
    /// 같은 상품의 SCHEDULED/ACTIVE 리스팅이 이미 있으면 Conflict
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError>;
    async fn listing(&self, id: Uuid) -> Result<Option<Listing>, CoreError>;
    async fn open_listing_for_item(&self, item_id: Uuid) -> Result<Option<Listing>, CoreError>;
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, CoreError>;
    /// 버전 CAS 갱신
    async fn update_listing(&self, listing: &Listing) -> Result<bool, CoreError>;
    /// 마감 시간이 지난 ACTIVE/ENDED 경매(마감 작업 후보)
    async fn due_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError>;
    /// 시작 시간이 지난 SCHEDULED 리스팅을 ACTIVE 로 전환하고 개수를 반환
    async fn activate_due_listings(&self, now: DateTime<Utc>) -> Result<u64, CoreError>;

    // -- 입찰
    /// 입찰 기록 추가 + 리스팅 투영 갱신을 하나의 CAS 단위로 수행
    async fn append_bid(&self, bid: &Bid, updated: &Listing) -> Result<bool, CoreError>;
    /// 기록 순서대로 반환
    async fn bids_for_listing(&self, listing_id: Uuid) -> Result<Vec<Bid>, CoreError>;
    async fn bid_count(&self, listing_id: Uuid) -> Result<i64, CoreError>;

    // -- 가격 제안
    /// 같은 구매자의 진행 중인 제안이 이미 있으면 Conflict
    async fn insert_offer(&self, offer: &Offer) -> Result<(), CoreError>;
    async fn offer(&self, id: Uuid) -> Result<Option<Offer>, CoreError>;
    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<Offer>, CoreError>;
    async fn open_offer_for_buyer(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<Option<Offer>, CoreError>;
    /// 버전 CAS 갱신
    async fn update_offer(&self, offer: &Offer) -> Result<bool, CoreError>;
    async fn expired_open_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CoreError>;

    // -- 관심 목록
    /// 이미 있으면 false
    async fn add_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError>;
    async fn remove_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError>;
    async fn watchers_of(&self, listing_id: Uuid) -> Result<Vec<Uuid>, CoreError>;
    async fn watchlist_of(&self, user_id: Uuid) -> Result<Vec<Listing>, CoreError>;

    // -- 판매자 평가
    /// 같은 거래에 같은 평가자가 이미 평가했으면 false
    async fn insert_rating(&self, rating: &SellerRating) -> Result<bool, CoreError>;
    async fn ratings_for_seller(&self, seller_id: Uuid) -> Result<Vec<SellerRating>, CoreError>;
}

// endregion: --- Market Store Trait
