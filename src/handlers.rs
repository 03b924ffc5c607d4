/// HTTP 핸들러
/// 전송 계층은 여기까지만: 커맨드 호출, 이벤트 발행, 응답 변환.
// region:    --- Imports
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::SuspensionGate;
use crate::bidding::commands::{BuyNowCommand, PlaceBidCommand};
use crate::closer;
use crate::error::CoreError;
use crate::events::publish_events;
use crate::listing::commands::{
    CreateAuctionCommand, CreateFixedPriceCommand, ListingPatch,
};
use crate::listing::model::ListingFilter;
use crate::message_broker::KafkaProducer;
use crate::offer::commands::{CounterAction, CreateOfferCommand, OfferAction};
use crate::store::PostgresMarketStore;
use crate::watchlist::commands::SubmitRatingCommand;
use crate::{bidding, listing, offer, watchlist};
// endregion: --- Imports

// region:    --- App State

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PostgresMarketStore>,
    pub producer: Arc<KafkaProducer>,
    pub gate: Arc<dyn SuspensionGate>,
}

// endregion: --- App State

// region:    --- Listing Handlers

/// 경매 등록
pub async fn handle_create_auction(
    State(state): State<AppState>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let (created, events) =
        listing::commands::handle_create_auction(cmd, state.store.as_ref(), state.gate.as_ref())
            .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(created))
}

/// 고정가 등록
pub async fn handle_create_fixed_price(
    State(state): State<AppState>,
    Json(cmd): Json<CreateFixedPriceCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let (created, events) = listing::commands::handle_create_fixed_price(
        cmd,
        state.store.as_ref(),
        state.gate.as_ref(),
    )
    .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(created))
}

/// 리스팅 검색
pub async fn handle_search_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<impl IntoResponse, CoreError> {
    let views = listing::commands::search_listings(state.store.as_ref(), &filter).await?;
    Ok(Json(views))
}

/// 리스팅 단건 조회
pub async fn handle_get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let view = listing::commands::get_listing_view(state.store.as_ref(), listing_id).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingRequest {
    pub seller_id: Uuid,
    #[serde(flatten)]
    pub patch: ListingPatch,
}

/// 리스팅 수정
pub async fn handle_update_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let updated = listing::commands::handle_update_listing(
        listing_id,
        req.seller_id,
        req.patch,
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct CancelListingRequest {
    pub seller_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

/// 리스팅 취소
pub async fn handle_cancel_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<CancelListingRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let (cancelled, events) = listing::commands::handle_cancel_listing(
        listing_id,
        req.seller_id,
        req.reason,
        state.store.as_ref(),
    )
    .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(cancelled))
}

/// 결제 확인 콜백(결제 서비스 전용)
pub async fn handle_mark_paid(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let (paid, events) =
        listing::commands::handle_mark_paid(listing_id, state.store.as_ref()).await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(paid))
}

// endregion: --- Listing Handlers

// region:    --- Bidding Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let bid_amount = cmd.max_bid;
    let (updated, events) =
        bidding::commands::handle_place_bid(cmd, state.store.as_ref(), state.gate.as_ref())
            .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(serde_json::json!({
        "message": "입찰이 성공적으로 처리되었습니다.",
        "current_price": updated.current_price,
        "high_bidder_id": updated.high_bidder_id,
        "status": updated.status,
        "bid_amount": bid_amount,
    })))
}

/// 즉시 구매 요청 처리
pub async fn handle_buy_now(
    State(state): State<AppState>,
    Json(cmd): Json<BuyNowCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let (updated, events) =
        bidding::commands::handle_buy_now(cmd, state.store.as_ref(), state.gate.as_ref()).await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(serde_json::json!({
        "message": "즉시 구매가 성공적으로 처리되었습니다.",
        "winning_amount": updated.winning_amount,
        "status": updated.status,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BidHistoryParams {
    /// 조회하는 사용자(본인 입찰은 익명화하지 않음)
    pub viewer: Option<Uuid>,
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Query(params): Query<BidHistoryParams>,
) -> Result<impl IntoResponse, CoreError> {
    let history =
        bidding::commands::get_bid_history(state.store.as_ref(), listing_id, params.viewer)
            .await?;
    Ok(Json(history))
}

// endregion: --- Bidding Handlers

// region:    --- Offer Handlers

/// 가격 제안 생성
pub async fn handle_create_offer(
    State(state): State<AppState>,
    Json(cmd): Json<CreateOfferCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let (created, events) =
        offer::commands::handle_create_offer(cmd, state.store.as_ref(), state.gate.as_ref())
            .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct RespondToOfferRequest {
    pub seller_id: Uuid,
    pub action: OfferAction,
    pub counter_amount: Option<i64>,
}

/// 판매자 제안 응답
pub async fn handle_respond_to_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(req): Json<RespondToOfferRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let (updated, events) = offer::commands::handle_respond_to_offer(
        req.seller_id,
        offer_id,
        req.action,
        req.counter_amount,
        state.store.as_ref(),
    )
    .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct CounterResponseRequest {
    pub buyer_id: Uuid,
    pub action: CounterAction,
}

/// 구매자 역제안 응답
pub async fn handle_respond_to_counter_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(req): Json<CounterResponseRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let (updated, events) = offer::commands::handle_respond_to_counter_offer(
        req.buyer_id,
        offer_id,
        req.action,
        state.store.as_ref(),
    )
    .await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(updated))
}

// endregion: --- Offer Handlers

// region:    --- Closer Handler

/// 일괄 마감 수동 실행
/// 스케줄러와 같은 경로를 타며 겹쳐 호출해도 안전하다.
pub async fn handle_close_ended_auctions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CoreError> {
    let (report, events) = closer::process_ended_auctions(state.store.as_ref()).await?;
    publish_events(&state.producer, &events).await;
    Ok(Json(report))
}

// endregion: --- Closer Handler

// region:    --- Watchlist / Rating Handlers

#[derive(Debug, Deserialize)]
pub struct WatchlistRequest {
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

/// 관심 목록 추가
pub async fn handle_add_to_watchlist(
    State(state): State<AppState>,
    Json(req): Json<WatchlistRequest>,
) -> Result<impl IntoResponse, CoreError> {
    watchlist::commands::add_to_watchlist(state.store.as_ref(), req.user_id, req.listing_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "관심 목록에 추가되었습니다." })))
}

/// 관심 목록 제거
pub async fn handle_remove_from_watchlist(
    State(state): State<AppState>,
    Json(req): Json<WatchlistRequest>,
) -> Result<impl IntoResponse, CoreError> {
    watchlist::commands::remove_from_watchlist(state.store.as_ref(), req.user_id, req.listing_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "관심 목록에서 제거되었습니다." })))
}

/// 관심 목록 조회
pub async fn handle_get_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let views = watchlist::commands::watchlist_of(state.store.as_ref(), user_id).await?;
    Ok(Json(views))
}

/// 판매자 평가 등록
pub async fn handle_submit_rating(
    State(state): State<AppState>,
    Json(cmd): Json<SubmitRatingCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let rating = watchlist::commands::submit_rating(cmd, state.store.as_ref()).await?;
    Ok(Json(rating))
}

/// 판매자 평판 조회
pub async fn handle_get_seller_score(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let score = watchlist::commands::seller_score(state.store.as_ref(), seller_id).await?;
    Ok(Json(score))
}

/// 판매자 평가 목록 조회
pub async fn handle_get_seller_ratings(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let ratings = watchlist::commands::ratings_of(state.store.as_ref(), seller_id).await?;
    Ok(Json(ratings))
}

// endregion: --- Watchlist / Rating Handlers
