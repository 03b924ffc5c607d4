/// 리스팅 관련 커맨드 처리
/// 1. 경매 등록 / 고정가 등록
/// 2. 수정 / 취소
/// 3. 결제 확인
/// 4. 검색 / 단건 조회
// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::SuspensionGate;
use crate::error::CoreError;
use crate::events::MarketEvent;
use crate::listing::model::{
    Listing, ListingFilter, ListingStatus, ListingType, ListingView, PaymentStatus,
};
use crate::offer;
use crate::store::MarketStore;
use crate::watchlist;
// endregion: --- Imports

// region:    --- Validation Rules

/// 플랫폼 최소 등록가(센트)
pub const MINIMUM_LISTING_PRICE: i64 = 100;
/// 과거 데이터 호환을 위해 유일하게 허용하는 1.00 미만 금액
pub const LEGACY_PRICE_EXCEPTION: i64 = 99;
/// 경매 기간 범위(일)
pub const DURATION_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=14;
/// 상세 이미지 최대 장수
pub const MAX_DETAIL_IMAGES: usize = 4;
// 고정가 리스팅은 판매/취소 전까지 만료되지 않으므로 형식상 먼 종료 시점을 둔다.
const OPEN_ENDED_DAYS: i64 = 36_500;

/// 등록가 검증: 정수 단위 금액만 허용(과거 예외값 0.99 제외)
fn validate_price_field(label: &str, amount: i64) -> Result<(), CoreError> {
    if amount == LEGACY_PRICE_EXCEPTION {
        return Ok(());
    }
    if amount < MINIMUM_LISTING_PRICE {
        return Err(CoreError::Validation(format!(
            "{}은(는) 최소 {}센트 이상이어야 합니다.",
            label, MINIMUM_LISTING_PRICE
        )));
    }
    if amount % 100 != 0 {
        return Err(CoreError::Validation(format!(
            "{}은(는) 정수 단위 금액이어야 합니다.",
            label
        )));
    }
    Ok(())
}

fn validate_detail_images(images: &[String]) -> Result<(), CoreError> {
    if images.len() > MAX_DETAIL_IMAGES {
        return Err(CoreError::Validation(format!(
            "상세 이미지는 최대 {}장입니다.",
            MAX_DETAIL_IMAGES
        )));
    }
    Ok(())
}

fn validate_shipping_cost(shipping_cost: i64) -> Result<(), CoreError> {
    if shipping_cost < 0 {
        return Err(CoreError::Validation(
            "배송비는 0 이상이어야 합니다.".to_string(),
        ));
    }
    Ok(())
}

/// 같은 상품의 SCHEDULED/ACTIVE 리스팅이 이미 있으면 Conflict
/// 삽입 시점에도 부분 유니크 제약이 같은 규칙을 한 번 더 지킨다.
async fn ensure_item_not_listed(
    store: &impl MarketStore,
    item_id: Uuid,
) -> Result<(), CoreError> {
    if store.open_listing_for_item(item_id).await?.is_some() {
        return Err(CoreError::Conflict(
            "해당 상품의 진행 중인 리스팅이 이미 있습니다.".to_string(),
        ));
    }
    Ok(())
}

// endregion: --- Validation Rules

// region:    --- Create

/// 경매 등록 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateAuctionCommand {
    pub seller_id: Uuid,
    pub item_id: Uuid,
    pub starting_price: i64,
    pub buy_now_price: Option<i64>,
    pub duration_days: i64,
    /// 미지정이면 즉시 시작
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_cost: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detail_images: Vec<String>,
}

/// 고정가 등록 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateFixedPriceCommand {
    pub seller_id: Uuid,
    pub item_id: Uuid,
    pub price: i64,
    #[serde(default)]
    pub accepts_offers: bool,
    pub min_offer_amount: Option<i64>,
    /// 미지정이면 즉시 시작
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_cost: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detail_images: Vec<String>,
}

/// 1. 경매 등록
pub async fn handle_create_auction(
    cmd: CreateAuctionCommand,
    store: &impl MarketStore,
    gate: &dyn SuspensionGate,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 경매 등록 처리 시작: {:?}", "Command", cmd);
    gate.ensure_active(cmd.seller_id).await?;

    validate_price_field("시작가", cmd.starting_price)?;
    if let Some(buy_now) = cmd.buy_now_price {
        validate_price_field("즉시 구매가", buy_now)?;
        if buy_now <= cmd.starting_price {
            return Err(CoreError::Validation(
                "즉시 구매가는 시작가보다 높아야 합니다.".to_string(),
            ));
        }
    }
    if !DURATION_DAYS_RANGE.contains(&cmd.duration_days) {
        return Err(CoreError::Validation(format!(
            "경매 기간은 {}일에서 {}일 사이여야 합니다.",
            DURATION_DAYS_RANGE.start(),
            DURATION_DAYS_RANGE.end()
        )));
    }
    validate_detail_images(&cmd.detail_images)?;
    validate_shipping_cost(cmd.shipping_cost)?;

    let now = Utc::now();
    let start_time = cmd.start_time.unwrap_or(now);
    let end_time = start_time + Duration::days(cmd.duration_days);
    if end_time <= now {
        return Err(CoreError::Validation(
            "종료 시점이 이미 지난 경매입니다.".to_string(),
        ));
    }

    ensure_item_not_listed(store, cmd.item_id).await?;

    let listing = Listing {
        id: Uuid::new_v4(),
        seller_id: cmd.seller_id,
        item_id: cmd.item_id,
        listing_type: ListingType::Auction,
        status: if start_time > now {
            ListingStatus::Scheduled
        } else {
            ListingStatus::Active
        },
        starting_price: cmd.starting_price,
        current_price: cmd.starting_price,
        buy_now_price: cmd.buy_now_price,
        high_bidder_id: None,
        winning_amount: None,
        start_time,
        end_time,
        accepts_offers: false,
        min_offer_amount: None,
        shipping_cost: cmd.shipping_cost,
        description: cmd.description,
        detail_images: cmd.detail_images,
        payment_status: PaymentStatus::None,
        version: 0,
        created_at: now,
    };
    store.insert_listing(&listing).await?;

    let marketplace_events = vec![MarketEvent::ListingCreated {
        listing_id: listing.id,
        seller_id: listing.seller_id,
        timestamp: now,
    }];
    Ok((listing, marketplace_events))
}

/// 1'. 고정가 등록
pub async fn handle_create_fixed_price(
    cmd: CreateFixedPriceCommand,
    store: &impl MarketStore,
    gate: &dyn SuspensionGate,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 고정가 등록 처리 시작: {:?}", "Command", cmd);
    gate.ensure_active(cmd.seller_id).await?;

    validate_price_field("판매가", cmd.price)?;
    if cmd.accepts_offers {
        if let Some(min_offer) = cmd.min_offer_amount {
            validate_price_field("최소 제안 금액", min_offer)?;
            if min_offer >= cmd.price {
                return Err(CoreError::Validation(
                    "최소 제안 금액은 판매가보다 낮아야 합니다.".to_string(),
                ));
            }
        }
    } else if cmd.min_offer_amount.is_some() {
        return Err(CoreError::Validation(
            "가격 제안을 받지 않는 리스팅에는 최소 제안 금액을 둘 수 없습니다.".to_string(),
        ));
    }
    validate_detail_images(&cmd.detail_images)?;
    validate_shipping_cost(cmd.shipping_cost)?;

    let now = Utc::now();
    let start_time = cmd.start_time.unwrap_or(now);

    ensure_item_not_listed(store, cmd.item_id).await?;

    let listing = Listing {
        id: Uuid::new_v4(),
        seller_id: cmd.seller_id,
        item_id: cmd.item_id,
        listing_type: ListingType::FixedPrice,
        status: if start_time > now {
            ListingStatus::Scheduled
        } else {
            ListingStatus::Active
        },
        starting_price: cmd.price,
        current_price: cmd.price,
        buy_now_price: None,
        high_bidder_id: None,
        winning_amount: None,
        start_time,
        end_time: start_time + Duration::days(OPEN_ENDED_DAYS),
        accepts_offers: cmd.accepts_offers,
        min_offer_amount: cmd.min_offer_amount,
        shipping_cost: cmd.shipping_cost,
        description: cmd.description,
        detail_images: cmd.detail_images,
        payment_status: PaymentStatus::None,
        version: 0,
        created_at: now,
    };
    store.insert_listing(&listing).await?;

    let marketplace_events = vec![MarketEvent::ListingCreated {
        listing_id: listing.id,
        seller_id: listing.seller_id,
        timestamp: now,
    }];
    Ok((listing, marketplace_events))
}

// endregion: --- Create

// region:    --- Update / Cancel

/// 수정 가능한 필드만 담는 패치
/// 가격 항목(즉시 구매가)은 입찰이 하나라도 있으면 수정할 수 없다.
/// 가격 제안은 수정을 막지 않는다.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ListingPatch {
    pub description: Option<String>,
    pub detail_images: Option<Vec<String>>,
    pub buy_now_price: Option<i64>,
}

const MAX_RETRIES: i32 = 100;

/// 2. 리스팅 수정
pub async fn handle_update_listing(
    listing_id: Uuid,
    seller_id: Uuid,
    patch: ListingPatch,
    store: &impl MarketStore,
) -> Result<Listing, CoreError> {
    info!("{:<12} --> 리스팅 수정 처리 시작 id: {}", "Command", listing_id);
    if let Some(images) = &patch.detail_images {
        validate_detail_images(images)?;
    }

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .listing(listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if listing.seller_id != seller_id {
            return Err(CoreError::Forbidden(
                "리스팅 판매자만 수정할 수 있습니다.".to_string(),
            ));
        }
        if !matches!(
            listing.status,
            ListingStatus::Scheduled | ListingStatus::Active
        ) {
            return Err(CoreError::InvalidState(
                "진행 중인 리스팅만 수정할 수 있습니다.".to_string(),
            ));
        }

        let mut updated = listing.clone();
        if let Some(description) = &patch.description {
            updated.description = description.clone();
        }
        if let Some(images) = &patch.detail_images {
            updated.detail_images = images.clone();
        }
        if let Some(buy_now) = patch.buy_now_price {
            if listing.listing_type != ListingType::Auction {
                return Err(CoreError::InvalidState(
                    "즉시 구매가는 경매에만 둘 수 있습니다.".to_string(),
                ));
            }
            if store.bid_count(listing_id).await? > 0 {
                return Err(CoreError::InvalidState(
                    "입찰이 있는 경매는 가격 항목을 수정할 수 없습니다.".to_string(),
                ));
            }
            validate_price_field("즉시 구매가", buy_now)?;
            if buy_now <= listing.starting_price {
                return Err(CoreError::Validation(
                    "즉시 구매가는 시작가보다 높아야 합니다.".to_string(),
                ));
            }
            updated.buy_now_price = Some(buy_now);
        }
        updated.version += 1;

        if store.update_listing(&updated).await? {
            return Ok(updated);
        }
        warn!(
            "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
            "Command"
        );
        retries += 1;
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

/// 3. 리스팅 취소
/// 경매: SCHEDULED 또는 입찰이 없는 ACTIVE 상태에서만 가능
/// 고정가: 판매 전까지 가능하며, 진행 중인 가격 제안은 모두 거절 처리한다.
pub async fn handle_cancel_listing(
    listing_id: Uuid,
    seller_id: Uuid,
    reason: String,
    store: &impl MarketStore,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 리스팅 취소 처리 시작 id: {}", "Command", listing_id);
    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .listing(listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if listing.seller_id != seller_id {
            return Err(CoreError::Forbidden(
                "리스팅 판매자만 취소할 수 있습니다.".to_string(),
            ));
        }
        if !matches!(
            listing.status,
            ListingStatus::Scheduled | ListingStatus::Active
        ) {
            return Err(CoreError::InvalidState(
                "이미 종료된 리스팅입니다.".to_string(),
            ));
        }
        if listing.listing_type == ListingType::Auction
            && listing.status == ListingStatus::Active
            && store.bid_count(listing_id).await? > 0
        {
            return Err(CoreError::InvalidState(
                "입찰이 있는 경매는 취소할 수 없습니다.".to_string(),
            ));
        }

        let mut updated = listing.clone();
        updated.status = ListingStatus::Cancelled;
        updated.version += 1;

        if !store.update_listing(&updated).await? {
            warn!(
                "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
                "Command"
            );
            retries += 1;
            continue;
        }

        let now = Utc::now();
        let mut marketplace_events = vec![MarketEvent::ListingCancelled {
            listing_id,
            seller_id,
            reason: reason.clone(),
            timestamp: now,
        }];
        // 고정가 리스팅 취소는 열린 제안을 모두 거절시킨다.
        if listing.listing_type == ListingType::FixedPrice {
            let rejected =
                offer::commands::reject_open_offers(store, listing_id, None, now).await?;
            marketplace_events.extend(rejected);
        }
        return Ok((updated, marketplace_events));
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

/// 4. 결제 확인(결제 서비스 콜백)
/// 같은 콜백이 중복 도착해도 안전하도록 이미 PAID 면 그대로 성공 처리한다.
pub async fn handle_mark_paid(
    listing_id: Uuid,
    store: &impl MarketStore,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 결제 확인 처리 시작 id: {}", "Command", listing_id);
    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .listing(listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if listing.status != ListingStatus::Sold {
            return Err(CoreError::InvalidState(
                "판매 완료된 리스팅이 아닙니다.".to_string(),
            ));
        }
        match listing.payment_status {
            PaymentStatus::Paid => return Ok((listing, vec![])),
            PaymentStatus::Pending => {}
            PaymentStatus::None => {
                return Err(CoreError::InvalidState(
                    "결제 대기 상태가 아닙니다.".to_string(),
                ))
            }
        }

        let mut updated = listing.clone();
        updated.payment_status = PaymentStatus::Paid;
        updated.version += 1;
        if store.update_listing(&updated).await? {
            let marketplace_events = vec![MarketEvent::PaymentConfirmed {
                listing_id,
                seller_id: updated.seller_id,
                timestamp: Utc::now(),
            }];
            return Ok((updated, marketplace_events));
        }
        retries += 1;
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

// endregion: --- Update / Cancel

// region:    --- Queries

/// 검색: ACTIVE 리스팅에 필터/정렬을 적용해 투영으로 반환한다.
pub async fn search_listings(
    store: &impl MarketStore,
    filter: &ListingFilter,
) -> Result<Vec<ListingView>, CoreError> {
    info!("{:<12} --> 리스팅 검색: {:?}", "Query", filter);
    let now = Utc::now();
    let listings = store.search_listings(filter, now).await?;
    Ok(listings
        .into_iter()
        .map(|l| ListingView::project(l, now))
        .collect())
}

/// 단건 조회: 판매자 평판을 함께 내려준다.
pub async fn get_listing_view(
    store: &impl MarketStore,
    listing_id: Uuid,
) -> Result<ListingView, CoreError> {
    info!("{:<12} --> 리스팅 조회 id: {}", "Query", listing_id);
    let listing = store
        .listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    let score = watchlist::commands::seller_score(store, listing.seller_id).await?;
    let mut view = ListingView::project(listing, Utc::now());
    view.seller_positive_pct = score.positive_pct;
    Ok(view)
}

// endregion: --- Queries
