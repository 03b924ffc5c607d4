/// 가격 제안 관련 커맨드 처리
/// 1. 제안 생성
/// 2. 판매자 응답(수락/거절/역제안)
/// 3. 구매자 역제안 응답
/// 4. 만료 처리
// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::SuspensionGate;
use crate::error::CoreError;
use crate::events::MarketEvent;
use crate::listing::model::{Listing, ListingStatus, ListingType, PaymentStatus};
use crate::offer::model::{Offer, OfferStatus, OFFER_TTL_HOURS};
use crate::store::MarketStore;
// endregion: --- Imports

// region:    --- Commands

/// 가격 제안 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateOfferCommand {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: i64,
}

/// 판매자 응답
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferAction {
    Accept,
    Reject,
    Counter,
}

/// 구매자 역제안 응답
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterAction {
    Accept,
    Reject,
}

const MAX_RETRIES: i32 = 100;

fn is_expired(offer: &Offer, now: DateTime<Utc>) -> bool {
    offer.status.is_open() && offer.expires_at <= now
}

/// 만료 시간이 지난 제안을 읽기/쓰기 시점에 게으르게 EXPIRED 로 전환한다.
/// CAS 가 밀리면 다른 쪽이 이미 처리한 것이므로 그대로 둔다.
async fn expire_lazily(store: &impl MarketStore, offer: &Offer) -> Result<(), CoreError> {
    let mut expired = offer.clone();
    expired.status = OfferStatus::Expired;
    expired.version += 1;
    store.update_offer(&expired).await?;
    Ok(())
}

/// 1. 가격 제안 생성
pub async fn handle_create_offer(
    cmd: CreateOfferCommand,
    store: &impl MarketStore,
    gate: &dyn SuspensionGate,
) -> Result<(Offer, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 가격 제안 처리 시작: {:?}", "Command", cmd);
    gate.ensure_active(cmd.buyer_id).await?;
    if cmd.amount <= 0 {
        return Err(CoreError::Validation(
            "제안 금액은 0보다 커야 합니다.".to_string(),
        ));
    }

    let listing = store
        .listing(cmd.listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    if listing.listing_type != ListingType::FixedPrice {
        return Err(CoreError::InvalidState(
            "고정가 리스팅에만 가격 제안을 할 수 있습니다.".to_string(),
        ));
    }
    if listing.status != ListingStatus::Active {
        return Err(CoreError::InvalidState(
            "판매 중인 리스팅이 아닙니다.".to_string(),
        ));
    }
    if !listing.accepts_offers {
        return Err(CoreError::InvalidState(
            "가격 제안을 받지 않는 리스팅입니다.".to_string(),
        ));
    }
    if cmd.buyer_id == listing.seller_id {
        return Err(CoreError::Forbidden(
            "판매자는 자신의 리스팅에 제안할 수 없습니다.".to_string(),
        ));
    }
    if let Some(min_offer) = listing.min_offer_amount {
        if cmd.amount < min_offer {
            return Err(CoreError::Validation(format!(
                "제안 금액이 최소 제안 금액({})보다 낮습니다.",
                min_offer
            )));
        }
    }
    if cmd.amount >= listing.current_price {
        return Err(CoreError::Validation(
            "판매가 이상의 제안은 즉시 구매를 이용하세요.".to_string(),
        ));
    }

    let now = Utc::now();
    if let Some(existing) = store
        .open_offer_for_buyer(cmd.listing_id, cmd.buyer_id)
        .await?
    {
        if is_expired(&existing, now) {
            expire_lazily(store, &existing).await?;
        } else {
            return Err(CoreError::Conflict(
                "이미 진행 중인 가격 제안이 있습니다.".to_string(),
            ));
        }
    }

    let offer = Offer {
        id: Uuid::new_v4(),
        listing_id: cmd.listing_id,
        buyer_id: cmd.buyer_id,
        amount: cmd.amount,
        status: OfferStatus::Pending,
        counter_amount: None,
        expires_at: now + Duration::hours(OFFER_TTL_HOURS),
        version: 0,
        created_at: now,
    };
    store.insert_offer(&offer).await?;

    let marketplace_events = vec![MarketEvent::OfferReceived {
        offer_id: offer.id,
        listing_id: listing.id,
        seller_id: listing.seller_id,
        amount: offer.amount,
        timestamp: now,
    }];
    Ok((offer, marketplace_events))
}

/// 2. 판매자 응답
pub async fn handle_respond_to_offer(
    seller_id: Uuid,
    offer_id: Uuid,
    action: OfferAction,
    counter_amount: Option<i64>,
    store: &impl MarketStore,
) -> Result<(Offer, Vec<MarketEvent>), CoreError> {
    info!(
        "{:<12} --> 제안 응답 처리 시작 id: {} action: {:?}",
        "Command", offer_id, action
    );
    let mut retries = 0;
    while retries < MAX_RETRIES {
        let offer = store
            .offer(offer_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("가격 제안을 찾을 수 없습니다.".to_string()))?;
        let listing = store
            .listing(offer.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if listing.seller_id != seller_id {
            return Err(CoreError::Forbidden(
                "리스팅 판매자만 제안에 응답할 수 있습니다.".to_string(),
            ));
        }

        let now = Utc::now();
        if is_expired(&offer, now) {
            expire_lazily(store, &offer).await?;
            return Err(CoreError::InvalidState("만료된 제안입니다.".to_string()));
        }
        if offer.status != OfferStatus::Pending {
            return Err(CoreError::InvalidState(
                "대기 중인 제안이 아닙니다.".to_string(),
            ));
        }

        match action {
            OfferAction::Accept => {
                return accept_offer(store, listing, offer.clone(), offer.amount, now).await;
            }
            OfferAction::Reject => {
                let mut updated = offer.clone();
                updated.status = OfferStatus::Rejected;
                updated.version += 1;
                if !store.update_offer(&updated).await? {
                    retries += 1;
                    continue;
                }
                let marketplace_events = vec![MarketEvent::OfferRejected {
                    offer_id,
                    listing_id: offer.listing_id,
                    buyer_id: offer.buyer_id,
                    timestamp: now,
                }];
                return Ok((updated, marketplace_events));
            }
            OfferAction::Counter => {
                let counter = counter_amount.ok_or_else(|| {
                    CoreError::Validation("역제안 금액이 필요합니다.".to_string())
                })?;
                if counter <= offer.amount {
                    return Err(CoreError::Validation(
                        "역제안 금액은 제안 금액보다 높아야 합니다.".to_string(),
                    ));
                }
                if counter > listing.current_price {
                    return Err(CoreError::Validation(
                        "역제안 금액은 판매가를 넘을 수 없습니다.".to_string(),
                    ));
                }
                let mut updated = offer.clone();
                updated.status = OfferStatus::Countered;
                updated.counter_amount = Some(counter);
                updated.expires_at = now + Duration::hours(OFFER_TTL_HOURS);
                updated.version += 1;
                if !store.update_offer(&updated).await? {
                    retries += 1;
                    continue;
                }
                let marketplace_events = vec![MarketEvent::OfferCountered {
                    offer_id,
                    listing_id: offer.listing_id,
                    buyer_id: offer.buyer_id,
                    counter_amount: counter,
                    timestamp: now,
                }];
                return Ok((updated, marketplace_events));
            }
        }
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

/// 3. 구매자 역제안 응답
pub async fn handle_respond_to_counter_offer(
    buyer_id: Uuid,
    offer_id: Uuid,
    action: CounterAction,
    store: &impl MarketStore,
) -> Result<(Offer, Vec<MarketEvent>), CoreError> {
    info!(
        "{:<12} --> 역제안 응답 처리 시작 id: {} action: {:?}",
        "Command", offer_id, action
    );
    let mut retries = 0;
    while retries < MAX_RETRIES {
        let offer = store
            .offer(offer_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("가격 제안을 찾을 수 없습니다.".to_string()))?;
        if offer.buyer_id != buyer_id {
            return Err(CoreError::Forbidden(
                "제안한 구매자만 응답할 수 있습니다.".to_string(),
            ));
        }

        let now = Utc::now();
        if is_expired(&offer, now) {
            expire_lazily(store, &offer).await?;
            return Err(CoreError::InvalidState("만료된 제안입니다.".to_string()));
        }
        if offer.status != OfferStatus::Countered {
            return Err(CoreError::InvalidState(
                "역제안 상태의 제안이 아닙니다.".to_string(),
            ));
        }

        match action {
            CounterAction::Accept => {
                let amount = offer.counter_amount.ok_or_else(|| {
                    CoreError::Internal("역제안 금액이 없는 COUNTERED 제안입니다.".to_string())
                })?;
                let listing = store
                    .listing(offer.listing_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
                return accept_offer(store, listing, offer.clone(), amount, now).await;
            }
            CounterAction::Reject => {
                let mut updated = offer.clone();
                updated.status = OfferStatus::Rejected;
                updated.version += 1;
                if !store.update_offer(&updated).await? {
                    retries += 1;
                    continue;
                }
                let marketplace_events = vec![MarketEvent::OfferRejected {
                    offer_id,
                    listing_id: offer.listing_id,
                    buyer_id: offer.buyer_id,
                    timestamp: now,
                }];
                return Ok((updated, marketplace_events));
            }
        }
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

// endregion: --- Commands

// region:    --- Acceptance / Expiry

/// 제안 수락 공통 처리
/// 리스팅 판매 전환이 직렬화 지점이다: 같은 리스팅의 다른 판매 경로(즉시 구매,
/// 취소, 다른 제안 수락)와 버전 CAS 로 경합하고, 진 쪽은 다시 읽어 상태 오류를 받는다.
async fn accept_offer(
    store: &impl MarketStore,
    listing: Listing,
    offer: Offer,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<(Offer, Vec<MarketEvent>), CoreError> {
    let mut current = listing;
    let mut retries = 0;
    loop {
        if current.status != ListingStatus::Active {
            return Err(CoreError::InvalidState(
                "이미 판매되었거나 종료된 리스팅입니다.".to_string(),
            ));
        }
        let mut sold = current.clone();
        sold.status = ListingStatus::Sold;
        sold.high_bidder_id = Some(offer.buyer_id);
        sold.winning_amount = Some(amount);
        sold.payment_status = PaymentStatus::Pending;
        sold.end_time = now;
        sold.version += 1;
        if store.update_listing(&sold).await? {
            current = sold;
            break;
        }
        retries += 1;
        if retries >= MAX_RETRIES {
            return Err(CoreError::Conflict(
                "최대 재시도 횟수를 초과했습니다.".to_string(),
            ));
        }
        current = store
            .listing(offer.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    }

    let mut accepted = offer.clone();
    accepted.status = OfferStatus::Accepted;
    accepted.version += 1;
    if !store.update_offer(&accepted).await? {
        // 리스팅은 이미 팔렸으므로 제안 상태는 최신본 위에 덮어쓴다.
        let fresh = store
            .offer(offer.id)
            .await?
            .ok_or_else(|| CoreError::NotFound("가격 제안을 찾을 수 없습니다.".to_string()))?;
        if fresh.status.is_open() {
            accepted = fresh.clone();
            accepted.status = OfferStatus::Accepted;
            accepted.version += 1;
            if !store.update_offer(&accepted).await? {
                warn!(
                    "{:<12} --> 제안 수락 기록 실패(동시 변경) id: {}",
                    "Command", offer.id
                );
            }
        } else {
            warn!(
                "{:<12} --> 수락 도중 제안 상태가 바뀜 id: {} status: {:?}",
                "Command", offer.id, fresh.status
            );
        }
    }

    let mut marketplace_events = vec![
        MarketEvent::OfferAccepted {
            offer_id: offer.id,
            listing_id: current.id,
            buyer_id: offer.buyer_id,
            amount,
            timestamp: now,
        },
        MarketEvent::PaymentDue {
            listing_id: current.id,
            winner_id: offer.buyer_id,
            amount_due: amount + current.shipping_cost,
            timestamp: now,
        },
    ];
    // 재고가 하나이므로 나머지 열린 제안은 모두 거절시킨다.
    let rejected = reject_open_offers(store, current.id, Some(offer.id), now).await?;
    marketplace_events.extend(rejected);
    Ok((accepted, marketplace_events))
}

/// 리스팅의 열린 제안을 일괄 거절한다(수락된 제안 제외).
/// 취소/수락 양쪽에서 공유하는 부수 효과 처리.
pub(crate) async fn reject_open_offers(
    store: &impl MarketStore,
    listing_id: Uuid,
    exclude: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<MarketEvent>, CoreError> {
    let mut marketplace_events = Vec::new();
    for offer in store.offers_for_listing(listing_id).await? {
        if !offer.status.is_open() || exclude == Some(offer.id) {
            continue;
        }
        let mut rejected = offer.clone();
        rejected.status = OfferStatus::Rejected;
        rejected.version += 1;
        if store.update_offer(&rejected).await? {
            marketplace_events.push(MarketEvent::OfferRejected {
                offer_id: offer.id,
                listing_id,
                buyer_id: offer.buyer_id,
                timestamp: now,
            });
        } else {
            warn!(
                "{:<12} --> 제안 일괄 거절 중 버전 충돌 id: {}",
                "Command", offer.id
            );
        }
    }
    Ok(marketplace_events)
}

/// 4. 만료 처리(스케줄러의 일괄 정리)
/// 개별 커맨드의 게으른 만료와 같은 규칙을 주기적으로 적용한다.
pub async fn expire_open_offers(
    store: &impl MarketStore,
    now: DateTime<Utc>,
) -> Result<(usize, Vec<MarketEvent>), CoreError> {
    let mut expired_count = 0;
    let mut marketplace_events = Vec::new();
    for offer in store.expired_open_offers(now).await? {
        let mut expired = offer.clone();
        expired.status = OfferStatus::Expired;
        expired.version += 1;
        if store.update_offer(&expired).await? {
            expired_count += 1;
            marketplace_events.push(MarketEvent::OfferExpired {
                offer_id: offer.id,
                listing_id: offer.listing_id,
                buyer_id: offer.buyer_id,
                timestamp: now,
            });
        }
    }
    Ok((expired_count, marketplace_events))
}

// endregion: --- Acceptance / Expiry
