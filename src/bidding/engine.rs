/// 자동 입찰(최대 입찰가) 해석 엔진
/// 입찰자는 지불 가능한 최대 금액만 선언하고, 엔진은 선두를 유지하는 데
/// 필요한 만큼만 가시 가격을 올린다. 이 모듈은 순수 계산만 담당하고
/// 저장은 커맨드 계층의 CAS 루프가 수행한다.
// region:    --- Imports
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bidding::model::Bid;
use crate::error::CoreError;
use crate::listing::model::{Listing, ListingStatus, ListingType};
// endregion: --- Imports

// region:    --- Increment Table

/// 호가 단위표: 현재 가격 구간별 최소 인상 단위(센트)
pub fn minimum_increment(current_price: i64) -> i64 {
    match current_price {
        p if p < 100 => 5,
        p if p < 500 => 25,
        p if p < 2_500 => 50,
        p if p < 10_000 => 100,
        p if p < 25_000 => 250,
        p if p < 100_000 => 500,
        _ => 1_000,
    }
}

/// 다음 입찰이 통과하기 위한 최소 금액
/// 입찰이 없으면 시작가, 있으면 현재 가격 + 호가 단위
pub fn required_minimum(starting_price: i64, current_price: i64, has_bids: bool) -> i64 {
    if has_bids {
        current_price + minimum_increment(current_price)
    } else {
        starting_price
    }
}

// endregion: --- Increment Table

// region:    --- Live Bids

/// 입찰자별 유효 입찰(가장 나중 기록)
/// order 는 입찰 로그에서의 위치로, 동률일 때 먼저 기록된 쪽이 이긴다.
#[derive(Debug, Clone)]
pub struct LiveBid {
    pub bidder_id: Uuid,
    pub max_bid: i64,
    pub order: usize,
    pub placed_at: DateTime<Utc>,
}

/// 입찰 로그에서 입찰자별 유효 입찰만 추린다.
pub fn live_bids(bids: &[Bid]) -> Vec<LiveBid> {
    let mut live: Vec<LiveBid> = Vec::new();
    for (order, bid) in bids.iter().enumerate() {
        match live.iter_mut().find(|l| l.bidder_id == bid.bidder_id) {
            Some(existing) => {
                existing.max_bid = bid.max_bid;
                existing.order = order;
                existing.placed_at = bid.placed_at;
            }
            None => live.push(LiveBid {
                bidder_id: bid.bidder_id,
                max_bid: bid.max_bid,
                order,
                placed_at: bid.placed_at,
            }),
        }
    }
    live
}

/// 현재 선두 입찰: 최대 금액이 가장 크고, 동률이면 먼저 기록된 입찰
pub fn leader(live: &[LiveBid]) -> Option<&LiveBid> {
    live.iter()
        .max_by(|a, b| a.max_bid.cmp(&b.max_bid).then(b.order.cmp(&a.order)))
}

// endregion: --- Live Bids

// region:    --- Bid Resolution

/// 수락된 입찰의 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedBid {
    pub current_price: i64,
    pub high_bidder_id: Uuid,
    /// 선두에서 밀려난 기존 입찰자(알림 대상)
    pub outbid: Option<Uuid>,
    /// 즉시 구매 가격 도달로 경매가 종료되는 경우
    pub sold: bool,
    pub winning_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidResolution {
    /// 선두 입찰자가 자신의 유효 최대 금액 이하로 다시 입찰:
    /// 오류가 아니라 상태 변화 없는 no-op 으로 처리한다.
    Noop,
    Accepted(AcceptedBid),
}

/// 입찰 하나를 현재 리스팅 상태와 입찰 로그에 대해 해석한다.
pub fn resolve_bid(
    listing: &Listing,
    bids: &[Bid],
    bidder_id: Uuid,
    max_bid: i64,
    now: DateTime<Utc>,
) -> Result<BidResolution, CoreError> {
    if listing.listing_type != ListingType::Auction {
        return Err(CoreError::InvalidState(
            "경매 리스팅이 아닙니다.".to_string(),
        ));
    }
    if bidder_id == listing.seller_id {
        return Err(CoreError::Forbidden(
            "판매자는 자신의 경매에 입찰할 수 없습니다.".to_string(),
        ));
    }

    // 경매 상태 및 시간 검증
    match listing.status {
        ListingStatus::Scheduled => {
            return Err(CoreError::InvalidState(
                "경매가 아직 시작되지 않았습니다.".to_string(),
            ))
        }
        ListingStatus::Active if now < listing.start_time => {
            return Err(CoreError::InvalidState(
                "경매가 아직 시작되지 않았습니다.".to_string(),
            ))
        }
        ListingStatus::Active if now > listing.end_time => {
            return Err(CoreError::InvalidState(
                "경매가 이미 종료되었습니다.".to_string(),
            ))
        }
        ListingStatus::Active => {}
        _ => {
            return Err(CoreError::InvalidState(
                "경매가 이미 종료되었습니다.".to_string(),
            ))
        }
    }

    let live = live_bids(bids);
    let prior = leader(&live);

    // 선두 입찰자 본인의 재입찰
    if let Some(current) = prior {
        if current.bidder_id == bidder_id {
            if max_bid <= current.max_bid {
                return Ok(BidResolution::Noop);
            }
            // 최대 금액 상향: 가시 가격과 선두는 그대로 둔다.
            if let Some(buy_now) = listing.buy_now_price {
                if max_bid >= buy_now {
                    return Ok(BidResolution::Accepted(AcceptedBid {
                        current_price: buy_now,
                        high_bidder_id: bidder_id,
                        outbid: None,
                        sold: true,
                        winning_amount: Some(buy_now),
                    }));
                }
            }
            return Ok(BidResolution::Accepted(AcceptedBid {
                current_price: listing.current_price,
                high_bidder_id: bidder_id,
                outbid: None,
                sold: false,
                winning_amount: None,
            }));
        }
    }

    let minimum = required_minimum(listing.starting_price, listing.current_price, prior.is_some());
    if max_bid < minimum {
        return Err(CoreError::BidTooLow { minimum });
    }

    // 즉시 구매 가격 도달 시 낙찰 처리
    if let Some(buy_now) = listing.buy_now_price {
        if max_bid >= buy_now {
            return Ok(BidResolution::Accepted(AcceptedBid {
                current_price: buy_now,
                high_bidder_id: bidder_id,
                outbid: prior.map(|l| l.bidder_id),
                sold: true,
                winning_amount: Some(buy_now),
            }));
        }
    }

    let accepted = match prior {
        // 첫 입찰: 가시 가격은 시작가 그대로
        None => AcceptedBid {
            current_price: listing.starting_price,
            high_bidder_id: bidder_id,
            outbid: None,
            sold: false,
            winning_amount: None,
        },
        // 기존 선두를 넘어서는 입찰: 기존 최대 금액 + 호가 단위까지만 가격을 올린다.
        Some(top) if max_bid > top.max_bid => AcceptedBid {
            current_price: max_bid.min(top.max_bid + minimum_increment(top.max_bid)),
            high_bidder_id: bidder_id,
            outbid: Some(top.bidder_id),
            sold: false,
            winning_amount: None,
        },
        // 선두를 넘지 못한 입찰: 진 입찰을 이기는 데 필요한 만큼 가격만 오른다.
        Some(top) => AcceptedBid {
            current_price: (max_bid + minimum_increment(max_bid)).min(top.max_bid),
            high_bidder_id: top.bidder_id,
            outbid: None,
            sold: false,
            winning_amount: None,
        },
    };
    Ok(BidResolution::Accepted(accepted))
}

// endregion: --- Bid Resolution

// region:    --- Tests


// endregion: --- Tests
