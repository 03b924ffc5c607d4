/// 입찰 관련 커맨드 처리
/// 1. 입찰(자동 입찰)
/// 2. 즉시 구매
/// 3. 입찰 이력 조회(익명화)
// region:    --- Imports
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::SuspensionGate;
use crate::bidding::engine::{self, BidResolution};
use crate::bidding::model::{Bid, BidView};
use crate::error::CoreError;
use crate::events::MarketEvent;
use crate::listing::model::{Listing, ListingStatus, ListingType, PaymentStatus};
use crate::store::MarketStore;
// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub listing_id: Uuid,
    pub bidder_id: Uuid,
    pub max_bid: i64,
}

/// 즉시 구매 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BuyNowCommand {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
}

// 버전 충돌 시 최대 재시도 횟수
const MAX_RETRIES: i32 = 100;

/// 1. 입찰
/// 읽기-해석-CAS 쓰기를 한 단위로 수행하고, 버전 충돌이면 새로 읽어 재시도한다.
/// 같은 경매에 대한 두 입찰이 같은 가격 스냅샷을 근거로 확정되는 일은 없다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    store: &impl MarketStore,
    gate: &dyn SuspensionGate,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    gate.ensure_active(cmd.bidder_id).await?;
    if cmd.max_bid <= 0 {
        return Err(CoreError::Validation(
            "입찰 금액은 0보다 커야 합니다.".to_string(),
        ));
    }

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .listing(cmd.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        let bids = store.bids_for_listing(cmd.listing_id).await?;
        let now = Utc::now();

        let accepted =
            match engine::resolve_bid(&listing, &bids, cmd.bidder_id, cmd.max_bid, now)? {
                BidResolution::Noop => return Ok((listing, vec![])),
                BidResolution::Accepted(accepted) => accepted,
            };

        let mut updated = listing.clone();
        updated.current_price = accepted.current_price;
        updated.high_bidder_id = Some(accepted.high_bidder_id);
        updated.version += 1;
        if accepted.sold {
            updated.status = ListingStatus::Sold;
            updated.winning_amount = accepted.winning_amount;
            updated.payment_status = PaymentStatus::Pending;
            updated.end_time = now;
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            listing_id: cmd.listing_id,
            bidder_id: cmd.bidder_id,
            max_bid: cmd.max_bid,
            placed_at: now,
        };

        if !store.append_bid(&bid, &updated).await? {
            warn!(
                "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
                "Command"
            );
            retries += 1;
            continue;
        }

        let mut marketplace_events = Vec::new();
        if accepted.sold {
            marketplace_events.push(MarketEvent::BuyNowExecuted {
                listing_id: updated.id,
                buyer_id: cmd.bidder_id,
                price: accepted.current_price,
                timestamp: now,
            });
            marketplace_events.push(MarketEvent::PaymentDue {
                listing_id: updated.id,
                winner_id: cmd.bidder_id,
                amount_due: accepted.current_price + updated.shipping_cost,
                timestamp: now,
            });
        } else {
            marketplace_events.push(MarketEvent::BidPlaced {
                listing_id: updated.id,
                bidder_id: cmd.bidder_id,
                current_price: accepted.current_price,
                timestamp: now,
            });
        }
        if let Some(previous) = accepted.outbid {
            marketplace_events.push(MarketEvent::Outbid {
                listing_id: updated.id,
                previous_bidder_id: previous,
                current_price: accepted.current_price,
                timestamp: now,
            });
        }
        return Ok((updated, marketplace_events));
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

/// 2. 즉시 구매(낙찰)
/// 경매는 설정된 즉시 구매가로, 고정가 리스팅은 정가로 즉시 판매 처리한다.
pub async fn handle_buy_now(
    cmd: BuyNowCommand,
    store: &impl MarketStore,
    gate: &dyn SuspensionGate,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    info!("{:<12} --> 즉시 구매 요청 처리 시작: {:?}", "Command", cmd);
    gate.ensure_active(cmd.buyer_id).await?;

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let listing = store
            .listing(cmd.listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
        if cmd.buyer_id == listing.seller_id {
            return Err(CoreError::Forbidden(
                "판매자는 자신의 리스팅을 구매할 수 없습니다.".to_string(),
            ));
        }
        let now = Utc::now();
        match listing.status {
            ListingStatus::Scheduled => {
                return Err(CoreError::InvalidState(
                    "판매가 아직 시작되지 않았습니다.".to_string(),
                ))
            }
            ListingStatus::Active => {}
            _ => {
                return Err(CoreError::InvalidState(
                    "판매가 이미 종료되었습니다.".to_string(),
                ))
            }
        }

        let price = match listing.listing_type {
            ListingType::Auction => {
                if now > listing.end_time {
                    return Err(CoreError::InvalidState(
                        "경매가 이미 종료되었습니다.".to_string(),
                    ));
                }
                listing.buy_now_price.ok_or_else(|| {
                    CoreError::InvalidState("즉시 구매가 설정되지 않은 경매입니다.".to_string())
                })?
            }
            ListingType::FixedPrice => listing.current_price,
        };

        let mut updated = listing.clone();
        updated.status = ListingStatus::Sold;
        updated.current_price = price;
        updated.high_bidder_id = Some(cmd.buyer_id);
        updated.winning_amount = Some(price);
        updated.payment_status = PaymentStatus::Pending;
        updated.end_time = now;
        updated.version += 1;

        // 경매의 즉시 구매는 입찰 로그에도 남긴다.
        let committed = match listing.listing_type {
            ListingType::Auction => {
                let bid = Bid {
                    id: Uuid::new_v4(),
                    listing_id: cmd.listing_id,
                    bidder_id: cmd.buyer_id,
                    max_bid: price,
                    placed_at: now,
                };
                store.append_bid(&bid, &updated).await?
            }
            ListingType::FixedPrice => store.update_listing(&updated).await?,
        };
        if !committed {
            warn!(
                "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
                "Command"
            );
            retries += 1;
            continue;
        }

        let marketplace_events = vec![
            MarketEvent::BuyNowExecuted {
                listing_id: updated.id,
                buyer_id: cmd.buyer_id,
                price,
                timestamp: now,
            },
            MarketEvent::PaymentDue {
                listing_id: updated.id,
                winner_id: cmd.buyer_id,
                amount_due: price + updated.shipping_cost,
                timestamp: now,
            },
        ];
        return Ok((updated, marketplace_events));
    }

    Err(CoreError::Conflict(
        "최대 재시도 횟수를 초과했습니다.".to_string(),
    ))
}

/// 3. 입찰 이력 조회
/// 입찰자 식별자는 "입찰자 N" 으로 익명화한다(본인 제외).
/// 진행 중인 경매에서는 선두 입찰자의 최대 금액 대신 현재 가격을 보여준다.
pub async fn get_bid_history(
    store: &impl MarketStore,
    listing_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Vec<BidView>, CoreError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", listing_id);
    let listing = store
        .listing(listing_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("리스팅을 찾을 수 없습니다.".to_string()))?;
    let bids = store.bids_for_listing(listing_id).await?;

    let live = engine::live_bids(&bids);
    let leader_order = engine::leader(&live).map(|l| l.order);

    let mut label_order: Vec<Uuid> = Vec::new();
    let mut views = Vec::with_capacity(bids.len());
    for (order, bid) in bids.iter().enumerate() {
        let label_index = match label_order.iter().position(|b| *b == bid.bidder_id) {
            Some(i) => i,
            None => {
                label_order.push(bid.bidder_id);
                label_order.len() - 1
            }
        };
        let is_own = viewer == Some(bid.bidder_id);
        // 선두 입찰자의 유효 최대 금액은 경매가 끝나기 전까지 비공개
        let masked =
            !listing.status.is_terminal() && leader_order == Some(order) && !is_own;
        views.push(BidView {
            id: bid.id,
            listing_id,
            bidder_label: format!("입찰자 {}", label_index + 1),
            bidder_id: is_own.then_some(bid.bidder_id),
            amount: if masked {
                listing.current_price
            } else {
                bid.max_bid
            },
            placed_at: bid.placed_at,
        });
    }
    Ok(views)
}

// endregion: --- Commands
