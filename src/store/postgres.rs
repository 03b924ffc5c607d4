/// Postgres 저장소 구현체
// region:    --- Imports
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::error::CoreError;
use crate::listing::model::{
    Listing, ListingFilter, ListingStatus, ListingType, PaymentStatus,
};
use crate::offer::model::{Offer, OfferStatus};
use crate::store::{queries, MarketStore};
use crate::watchlist::model::SellerRating;
// endregion: --- Imports

// region:    --- Rows

/// 리스팅 행: 상태 문자열을 도메인 enum 으로 변환해서 쓴다.
#[derive(FromRow)]
struct ListingRow {
    id: Uuid,
    seller_id: Uuid,
    item_id: Uuid,
    listing_type: String,
    status: String,
    starting_price: i64,
    current_price: i64,
    buy_now_price: Option<i64>,
    high_bidder_id: Option<Uuid>,
    winning_amount: Option<i64>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    accepts_offers: bool,
    min_offer_amount: Option<i64>,
    shipping_cost: i64,
    description: String,
    detail_images: Vec<String>,
    payment_status: String,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = CoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let listing_type = ListingType::parse(&row.listing_type)
            .ok_or_else(|| CoreError::Internal(format!("알 수 없는 판매 방식: {}", row.listing_type)))?;
        let status = ListingStatus::parse(&row.status)
            .ok_or_else(|| CoreError::Internal(format!("알 수 없는 리스팅 상태: {}", row.status)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            CoreError::Internal(format!("알 수 없는 결제 상태: {}", row.payment_status))
        })?;
        Ok(Listing {
            id: row.id,
            seller_id: row.seller_id,
            item_id: row.item_id,
            listing_type,
            status,
            starting_price: row.starting_price,
            current_price: row.current_price,
            buy_now_price: row.buy_now_price,
            high_bidder_id: row.high_bidder_id,
            winning_amount: row.winning_amount,
            start_time: row.start_time,
            end_time: row.end_time,
            accepts_offers: row.accepts_offers,
            min_offer_amount: row.min_offer_amount,
            shipping_cost: row.shipping_cost,
            description: row.description,
            detail_images: row.detail_images,
            payment_status,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct OfferRow {
    id: Uuid,
    listing_id: Uuid,
    buyer_id: Uuid,
    amount: i64,
    status: String,
    counter_amount: Option<i64>,
    expires_at: DateTime<Utc>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = CoreError;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
        let status = OfferStatus::parse(&row.status)
            .ok_or_else(|| CoreError::Internal(format!("알 수 없는 제안 상태: {}", row.status)))?;
        Ok(Offer {
            id: row.id,
            listing_id: row.listing_id,
            buyer_id: row.buyer_id,
            amount: row.amount,
            status,
            counter_amount: row.counter_amount,
            expires_at: row.expires_at,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

fn listings_from_rows(rows: Vec<ListingRow>) -> Result<Vec<Listing>, CoreError> {
    rows.into_iter().map(Listing::try_from).collect()
}

// endregion: --- Rows

// region:    --- Postgres Store

pub struct PostgresMarketStore {
    db: Arc<DatabaseManager>,
}

impl PostgresMarketStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.pool()
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError> {
        let result = sqlx::query(queries::INSERT_LISTING)
            .bind(listing.id)
            .bind(listing.seller_id)
            .bind(listing.item_id)
            .bind(listing.listing_type.as_str())
            .bind(listing.status.as_str())
            .bind(listing.starting_price)
            .bind(listing.current_price)
            .bind(listing.buy_now_price)
            .bind(listing.high_bidder_id)
            .bind(listing.winning_amount)
            .bind(listing.start_time)
            .bind(listing.end_time)
            .bind(listing.accepts_offers)
            .bind(listing.min_offer_amount)
            .bind(listing.shipping_cost)
            .bind(&listing.description)
            .bind(&listing.detail_images)
            .bind(listing.payment_status.as_str())
            .bind(listing.version)
            .bind(listing.created_at)
            .execute(self.pool())
            .await;
        match result {
            Ok(_) => Ok(()),
            // 상품당 진행 중 리스팅 하나 제약(부분 유니크 인덱스) 위반
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CoreError::Conflict(
                "해당 상품의 진행 중인 리스팅이 이미 있습니다.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn listing(&self, id: Uuid) -> Result<Option<Listing>, CoreError> {
        let row = sqlx::query_as::<_, ListingRow>(queries::GET_LISTING)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Listing::try_from).transpose()
    }

    async fn open_listing_for_item(&self, item_id: Uuid) -> Result<Option<Listing>, CoreError> {
        let row = sqlx::query_as::<_, ListingRow>(queries::GET_OPEN_LISTING_FOR_ITEM)
            .bind(item_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Listing::try_from).transpose()
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, CoreError> {
        let ending_cutoff = filter
            .ending_within_minutes
            .map(|m| now + Duration::minutes(m));
        let rows = sqlx::query_as::<_, ListingRow>(queries::SEARCH_LISTINGS)
            .bind(filter.listing_type.map(|t| t.as_str()))
            .bind(filter.seller_id)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.has_buy_now)
            .bind(ending_cutoff)
            .bind(filter.sort.as_str())
            .fetch_all(self.pool())
            .await?;
        listings_from_rows(rows)
    }

    async fn update_listing(&self, listing: &Listing) -> Result<bool, CoreError> {
        let result = sqlx::query(queries::UPDATE_LISTING_CAS)
            .bind(listing.id)
            .bind(listing.status.as_str())
            .bind(listing.current_price)
            .bind(listing.buy_now_price)
            .bind(listing.high_bidder_id)
            .bind(listing.winning_amount)
            .bind(listing.end_time)
            .bind(listing.min_offer_amount)
            .bind(listing.shipping_cost)
            .bind(&listing.description)
            .bind(&listing.detail_images)
            .bind(listing.payment_status.as_str())
            .bind(listing.version)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn due_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(queries::DUE_AUCTIONS)
            .bind(now)
            .fetch_all(self.pool())
            .await?;
        listings_from_rows(rows)
    }

    async fn activate_due_listings(&self, now: DateTime<Utc>) -> Result<u64, CoreError> {
        let result = sqlx::query(queries::ACTIVATE_DUE_LISTINGS)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn append_bid(&self, bid: &Bid, updated: &Listing) -> Result<bool, CoreError> {
        // 입찰 기록과 리스팅 투영은 같은 트랜잭션에서 갱신한다.
        self.db
            .transaction(|tx| {
                let bid = bid.clone();
                let listing = updated.clone();
                Box::pin(async move {
                    let result = sqlx::query(queries::UPDATE_LISTING_CAS)
                        .bind(listing.id)
                        .bind(listing.status.as_str())
                        .bind(listing.current_price)
                        .bind(listing.buy_now_price)
                        .bind(listing.high_bidder_id)
                        .bind(listing.winning_amount)
                        .bind(listing.end_time)
                        .bind(listing.min_offer_amount)
                        .bind(listing.shipping_cost)
                        .bind(&listing.description)
                        .bind(&listing.detail_images)
                        .bind(listing.payment_status.as_str())
                        .bind(listing.version)
                        .execute(&mut **tx)
                        .await?;
                    if result.rows_affected() != 1 {
                        return Ok::<bool, CoreError>(false);
                    }
                    sqlx::query(queries::INSERT_BID)
                        .bind(bid.id)
                        .bind(bid.listing_id)
                        .bind(bid.bidder_id)
                        .bind(bid.max_bid)
                        .bind(bid.placed_at)
                        .execute(&mut **tx)
                        .await?;
                    Ok(true)
                })
            })
            .await
    }

    async fn bids_for_listing(&self, listing_id: Uuid) -> Result<Vec<Bid>, CoreError> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_BIDS_FOR_LISTING)
            .bind(listing_id)
            .fetch_all(self.pool())
            .await?)
    }

    async fn bid_count(&self, listing_id: Uuid) -> Result<i64, CoreError> {
        Ok(sqlx::query_scalar::<_, i64>(queries::COUNT_BIDS)
            .bind(listing_id)
            .fetch_one(self.pool())
            .await?)
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<(), CoreError> {
        let result = sqlx::query(queries::INSERT_OFFER)
            .bind(offer.id)
            .bind(offer.listing_id)
            .bind(offer.buyer_id)
            .bind(offer.amount)
            .bind(offer.status.as_str())
            .bind(offer.counter_amount)
            .bind(offer.expires_at)
            .bind(offer.version)
            .bind(offer.created_at)
            .execute(self.pool())
            .await;
        match result {
            Ok(_) => Ok(()),
            // 구매자당 진행 중 제안 하나 제약(부분 유니크 인덱스) 위반
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CoreError::Conflict(
                "이미 진행 중인 가격 제안이 있습니다.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn offer(&self, id: Uuid) -> Result<Option<Offer>, CoreError> {
        let row = sqlx::query_as::<_, OfferRow>(queries::GET_OFFER)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Offer::try_from).transpose()
    }

    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<Offer>, CoreError> {
        let rows = sqlx::query_as::<_, OfferRow>(queries::GET_OFFERS_FOR_LISTING)
            .bind(listing_id)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Offer::try_from).collect()
    }

    async fn open_offer_for_buyer(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<Option<Offer>, CoreError> {
        let row = sqlx::query_as::<_, OfferRow>(queries::GET_OPEN_OFFER_FOR_BUYER)
            .bind(listing_id)
            .bind(buyer_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Offer::try_from).transpose()
    }

    async fn update_offer(&self, offer: &Offer) -> Result<bool, CoreError> {
        let result = sqlx::query(queries::UPDATE_OFFER_CAS)
            .bind(offer.id)
            .bind(offer.status.as_str())
            .bind(offer.counter_amount)
            .bind(offer.expires_at)
            .bind(offer.version)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expired_open_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CoreError> {
        let rows = sqlx::query_as::<_, OfferRow>(queries::GET_EXPIRED_OPEN_OFFERS)
            .bind(now)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Offer::try_from).collect()
    }

    async fn add_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query(queries::ADD_WATCH)
            .bind(user_id)
            .bind(listing_id)
            .bind(Utc::now())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query(queries::REMOVE_WATCH)
            .bind(user_id)
            .bind(listing_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn watchers_of(&self, listing_id: Uuid) -> Result<Vec<Uuid>, CoreError> {
        Ok(sqlx::query_scalar::<_, Uuid>(queries::GET_WATCHERS_OF)
            .bind(listing_id)
            .fetch_all(self.pool())
            .await?)
    }

    async fn watchlist_of(&self, user_id: Uuid) -> Result<Vec<Listing>, CoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(queries::GET_WATCHLIST_OF)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        listings_from_rows(rows)
    }

    async fn insert_rating(&self, rating: &SellerRating) -> Result<bool, CoreError> {
        let result = sqlx::query(queries::INSERT_RATING)
            .bind(rating.id)
            .bind(rating.listing_id)
            .bind(rating.seller_id)
            .bind(rating.rater_id)
            .bind(rating.positive)
            .bind(&rating.comment)
            .bind(rating.created_at)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn ratings_for_seller(&self, seller_id: Uuid) -> Result<Vec<SellerRating>, CoreError> {
        Ok(
            sqlx::query_as::<_, SellerRating>(queries::GET_RATINGS_FOR_SELLER)
                .bind(seller_id)
                .fetch_all(self.pool())
                .await?,
        )
    }
}

// endregion: --- Postgres Store
