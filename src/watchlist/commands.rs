/// 관심 목록 / 판매자 평가 처리
// region:    --- Imports
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::CoreError;
use crate::listing::model::{ListingStatus, ListingView};
use crate::store::MarketStore;
use crate::watchlist::model::{SellerRating, SellerScore};
// endregion: --- Imports

// region:    --- Watchlist

/// 관심 목록 추가(이미 있으면 그대로 성공)
pub async fn add_to_watchlist(
    store: &impl MarketStore,
    user_id: Uuid,
    listing_id: Uuid,
) -> Result<(), CoreError> {
    info!(
        "{:<12} --> 관심 목록 추가 user: {} listing: {}",
        "Command", user_id, listing_id
    );
    store
        .listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    store.add_watch(user_id, listing_id).await?;
    Ok(())
}

/// 관심 목록 제거(없어도 그대로 성공)
pub async fn remove_from_watchlist(
    store: &impl MarketStore,
    user_id: Uuid,
    listing_id: Uuid,
) -> Result<(), CoreError> {
    info!(
        "{:<12} --> 관심 목록 제거 user: {} listing: {}",
        "Command", user_id, listing_id
    );
    store.remove_watch(user_id, listing_id).await?;
    Ok(())
}

/// 사용자의 관심 목록 조회
pub async fn watchlist_of(
    store: &impl MarketStore,
    user_id: Uuid,
) -> Result<Vec<ListingView>, CoreError> {
    info!("{:<12} --> 관심 목록 조회 user: {}", "Query", user_id);
    let now = Utc::now();
    Ok(store
        .watchlist_of(user_id)
        .await?
        .into_iter()
        .map(|l| ListingView::project(l, now))
        .collect())
}

// endregion: --- Watchlist

// region:    --- Seller Ratings

/// 판매자 평가 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitRatingCommand {
    pub listing_id: Uuid,
    pub rater_id: Uuid,
    pub positive: bool,
    #[serde(default)]
    pub comment: String,
}

/// 판매자 평가 등록
/// 판매 완료된 거래의 구매자만, 거래당 한 번만 남길 수 있다.
pub async fn submit_rating(
    cmd: SubmitRatingCommand,
    store: &impl MarketStore,
) -> Result<SellerRating, CoreError> {
    info!("{:<12} --> 판매자 평가 등록: {:?}", "Command", cmd);
    let listing = store
        .listing(cmd.listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    if listing.status != ListingStatus::Sold {
        return Err(CoreError::InvalidState(
            "판매 완료된 거래만 평가할 수 있습니다.".to_string(),
        ));
    }
    if listing.high_bidder_id != Some(cmd.rater_id) {
        return Err(CoreError::Forbidden(
            "거래 구매자만 판매자를 평가할 수 있습니다.".to_string(),
        ));
    }

    let rating = SellerRating {
        id: Uuid::new_v4(),
        listing_id: cmd.listing_id,
        seller_id: listing.seller_id,
        rater_id: cmd.rater_id,
        positive: cmd.positive,
        comment: cmd.comment,
        created_at: Utc::now(),
    };
    if !store.insert_rating(&rating).await? {
        return Err(CoreError::Conflict(
            "이미 평가를 남긴 거래입니다.".to_string(),
        ));
    }
    Ok(rating)
}

/// 판매자 평판 집계 조회
pub async fn seller_score(
    store: &impl MarketStore,
    seller_id: Uuid,
) -> Result<SellerScore, CoreError> {
    let ratings = store.ratings_for_seller(seller_id).await?;
    Ok(SellerScore::from_ratings(seller_id, &ratings))
}

/// 판매자 평가 목록 조회
pub async fn ratings_of(
    store: &impl MarketStore,
    seller_id: Uuid,
) -> Result<Vec<SellerRating>, CoreError> {
    info!("{:<12} --> 판매자 평가 조회 seller: {}", "Query", seller_id);
    store.ratings_for_seller(seller_id).await
}

// endregion: --- Seller Ratings
