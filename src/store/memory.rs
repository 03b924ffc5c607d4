/// 인메모리 저장소
/// 테스트와 로컬 실행용. 모든 연산을 하나의 뮤텍스 아래에서 수행하므로
/// 버전 CAS 의 직렬화 의미는 Postgres 구현과 동일하다.
// region:    --- Imports
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::bidding::model::Bid;
use crate::error::CoreError;
use crate::listing::model::{Listing, ListingFilter, ListingSort, ListingStatus, ListingType};
use crate::offer::model::Offer;
use crate::store::MarketStore;
use crate::watchlist::model::{SellerRating, WatchlistEntry};
// endregion: --- Imports

// region:    --- Memory Store

#[derive(Default)]
struct Inner {
    listings: HashMap<Uuid, Listing>,
    /// 리스팅별 입찰 로그(기록 순서 유지)
    bids: HashMap<Uuid, Vec<Bid>>,
    offers: HashMap<Uuid, Offer>,
    watchlist: Vec<WatchlistEntry>,
    ratings: Vec<SellerRating>,
}

#[derive(Default)]
pub struct MemoryMarketStore {
    inner: Mutex<Inner>,
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // 락을 쥔 채 패닉하지 않으므로 poison 은 복구해도 안전하다.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MarketStore for MemoryMarketStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), CoreError> {
        let mut inner = self.lock();
        let duplicate = inner.listings.values().any(|l| {
            l.item_id == listing.item_id
                && matches!(l.status, ListingStatus::Scheduled | ListingStatus::Active)
        });
        if duplicate {
            return Err(CoreError::Conflict(
                "해당 상품의 진행 중인 리스팅이 이미 있습니다.".to_string(),
            ));
        }
        inner.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn listing(&self, id: Uuid) -> Result<Option<Listing>, CoreError> {
        Ok(self.lock().listings.get(&id).cloned())
    }

    async fn open_listing_for_item(&self, item_id: Uuid) -> Result<Option<Listing>, CoreError> {
        Ok(self
            .lock()
            .listings
            .values()
            .find(|l| {
                l.item_id == item_id
                    && matches!(l.status, ListingStatus::Scheduled | ListingStatus::Active)
            })
            .cloned())
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, CoreError> {
        let inner = self.lock();
        let mut found: Vec<Listing> = inner
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active)
            .filter(|l| filter.listing_type.map_or(true, |t| l.listing_type == t))
            .filter(|l| filter.seller_id.map_or(true, |s| l.seller_id == s))
            .filter(|l| filter.min_price.map_or(true, |p| l.current_price >= p))
            .filter(|l| filter.max_price.map_or(true, |p| l.current_price <= p))
            .filter(|l| {
                filter
                    .has_buy_now
                    .map_or(true, |wanted| l.buy_now_price.is_some() == wanted)
            })
            .filter(|l| {
                filter.ending_within_minutes.map_or(true, |m| {
                    l.listing_type == ListingType::Auction
                        && l.end_time <= now + Duration::minutes(m)
                })
            })
            .cloned()
            .collect();
        match filter.sort {
            ListingSort::EndingSoonest => found.sort_by_key(|l| l.end_time),
            ListingSort::Newest => found.sort_by_key(|l| std::cmp::Reverse(l.created_at)),
            ListingSort::PriceAsc => found.sort_by_key(|l| l.current_price),
            ListingSort::PriceDesc => found.sort_by_key(|l| std::cmp::Reverse(l.current_price)),
        }
        Ok(found)
    }

    async fn update_listing(&self, listing: &Listing) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let stored = inner
            .listings
            .get_mut(&listing.id)
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if stored.version != listing.version - 1 {
            return Ok(false);
        }
        *stored = listing.clone();
        Ok(true)
    }

    async fn due_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, CoreError> {
        Ok(self
            .lock()
            .listings
            .values()
            .filter(|l| {
                l.listing_type == ListingType::Auction
                    && matches!(l.status, ListingStatus::Active | ListingStatus::Ended)
                    && l.end_time <= now
            })
            .cloned()
            .collect())
    }

    async fn activate_due_listings(&self, now: DateTime<Utc>) -> Result<u64, CoreError> {
        let mut inner = self.lock();
        let mut activated = 0;
        for listing in inner.listings.values_mut() {
            if listing.status == ListingStatus::Scheduled && listing.start_time <= now {
                listing.status = ListingStatus::Active;
                listing.version += 1;
                activated += 1;
            }
        }
        Ok(activated)
    }

    async fn append_bid(&self, bid: &Bid, updated: &Listing) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let stored = inner
            .listings
            .get_mut(&updated.id)
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if stored.version != updated.version - 1 {
            return Ok(false);
        }
        *stored = updated.clone();
        inner.bids.entry(bid.listing_id).or_default().push(bid.clone());
        Ok(true)
    }

    async fn bids_for_listing(&self, listing_id: Uuid) -> Result<Vec<Bid>, CoreError> {
        Ok(self
            .lock()
            .bids
            .get(&listing_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn bid_count(&self, listing_id: Uuid) -> Result<i64, CoreError> {
        Ok(self
            .lock()
            .bids
            .get(&listing_id)
            .map_or(0, |bids| bids.len() as i64))
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<(), CoreError> {
        let mut inner = self.lock();
        let duplicate = inner.offers.values().any(|o| {
            o.listing_id == offer.listing_id
                && o.buyer_id == offer.buyer_id
                && o.status.is_open()
        });
        if duplicate {
            return Err(CoreError::Conflict(
                "이미 진행 중인 가격 제안이 있습니다.".to_string(),
            ));
        }
        inner.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn offer(&self, id: Uuid) -> Result<Option<Offer>, CoreError> {
        Ok(self.lock().offers.get(&id).cloned())
    }

    async fn offers_for_listing(&self, listing_id: Uuid) -> Result<Vec<Offer>, CoreError> {
        let mut offers: Vec<Offer> = self
            .lock()
            .offers
            .values()
            .filter(|o| o.listing_id == listing_id)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.created_at);
        Ok(offers)
    }

    async fn open_offer_for_buyer(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<Option<Offer>, CoreError> {
        Ok(self
            .lock()
            .offers
            .values()
            .find(|o| o.listing_id == listing_id && o.buyer_id == buyer_id && o.status.is_open())
            .cloned())
    }

    async fn update_offer(&self, offer: &Offer) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let stored = inner
            .offers
            .get_mut(&offer.id)
            .ok_or_else(|| CoreError::NotFound("가격 제안을 찾을 수 없습니다.".to_string()))?;
        if stored.version != offer.version - 1 {
            return Ok(false);
        }
        *stored = offer.clone();
        Ok(true)
    }

    async fn expired_open_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, CoreError> {
        Ok(self
            .lock()
            .offers
            .values()
            .filter(|o| o.status.is_open() && o.expires_at <= now)
            .cloned()
            .collect())
    }

    async fn add_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let exists = inner
            .watchlist
            .iter()
            .any(|w| w.user_id == user_id && w.listing_id == listing_id);
        if exists {
            return Ok(false);
        }
        inner.watchlist.push(WatchlistEntry {
            user_id,
            listing_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let before = inner.watchlist.len();
        inner
            .watchlist
            .retain(|w| !(w.user_id == user_id && w.listing_id == listing_id));
        Ok(inner.watchlist.len() < before)
    }

    async fn watchers_of(&self, listing_id: Uuid) -> Result<Vec<Uuid>, CoreError> {
        Ok(self
            .lock()
            .watchlist
            .iter()
            .filter(|w| w.listing_id == listing_id)
            .map(|w| w.user_id)
            .collect())
    }

    async fn watchlist_of(&self, user_id: Uuid) -> Result<Vec<Listing>, CoreError> {
        let inner = self.lock();
        Ok(inner
            .watchlist
            .iter()
            .filter(|w| w.user_id == user_id)
            .filter_map(|w| inner.listings.get(&w.listing_id))
            .cloned()
            .collect())
    }

    async fn insert_rating(&self, rating: &SellerRating) -> Result<bool, CoreError> {
        let mut inner = self.lock();
        let exists = inner
            .ratings
            .iter()
            .any(|r| r.listing_id == rating.listing_id && r.rater_id == rating.rater_id);
        if exists {
            return Ok(false);
        }
        inner.ratings.push(rating.clone());
        Ok(true)
    }

    async fn ratings_for_seller(&self, seller_id: Uuid) -> Result<Vec<SellerRating>, CoreError> {
        Ok(self
            .lock()
            .ratings
            .iter()
            .filter(|r| r.seller_id == seller_id)
            .cloned()
            .collect())
    }
}

// endregion: --- Memory Store
