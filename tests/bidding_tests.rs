mod common;

use std::sync::Arc;
use uuid::Uuid;

use common::{count_events, create_auction, create_fixed, place};
use marketplace_service::account::{AllowAllGate, StaticSuspensionGate};
use marketplace_service::bidding::commands::{
    get_bid_history, handle_buy_now, handle_place_bid, BuyNowCommand, PlaceBidCommand,
};
use marketplace_service::error::CoreError;
use marketplace_service::events::MarketEvent;
use marketplace_service::listing::model::{ListingStatus, PaymentStatus};
use marketplace_service::store::{MarketStore, MemoryMarketStore};

/// 자동 입찰 해석 시나리오: A $20 -> B $15 -> C $25
#[tokio::test]
async fn proxy_bidding_sequence() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let (after_a, events_a) = place(&store, listing.id, a, 2_000).await.unwrap();
    assert_eq!(after_a.current_price, 1_000);
    assert_eq!(after_a.high_bidder_id, Some(a));
    assert_eq!(
        count_events(&events_a, |e| matches!(e, MarketEvent::BidPlaced { .. })),
        1
    );

    let (after_b, events_b) = place(&store, listing.id, b, 1_500).await.unwrap();
    assert_eq!(after_b.current_price, 1_550);
    assert_eq!(after_b.high_bidder_id, Some(a));
    assert_eq!(
        count_events(&events_b, |e| matches!(e, MarketEvent::Outbid { .. })),
        0
    );

    let (after_c, events_c) = place(&store, listing.id, c, 2_500).await.unwrap();
    assert_eq!(after_c.current_price, 2_050);
    assert_eq!(after_c.high_bidder_id, Some(c));
    assert_eq!(
        count_events(&events_c, |e| matches!(
            e,
            MarketEvent::Outbid { previous_bidder_id, .. } if *previous_bidder_id == a
        )),
        1
    );

    // 입찰 로그는 추가 전용이다.
    assert_eq!(store.bid_count(listing.id).await.unwrap(), 3);
}

#[tokio::test]
async fn bid_below_minimum_returns_required_amount() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    place(&store, listing.id, Uuid::new_v4(), 2_000).await.unwrap();

    let err = place(&store, listing.id, Uuid::new_v4(), 1_049)
        .await
        .unwrap_err();
    match err {
        CoreError::BidTooLow { minimum } => assert_eq!(minimum, 1_050),
        other => panic!("LOW_BID 가 아니라 {:?}", other),
    }

    // 최소 호가 정보로 재시도하면 통과한다.
    let (after, _) = place(&store, listing.id, Uuid::new_v4(), 1_050)
        .await
        .unwrap();
    assert_eq!(after.current_price, 1_100);
}

#[tokio::test]
async fn first_bid_must_meet_starting_price() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;

    let err = place(&store, listing.id, Uuid::new_v4(), 900)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::BidTooLow { minimum: 1_000 }));
}

/// 선두 입찰자의 재입찰: 같거나 낮으면 no-op, 높으면 조용히 최대 금액만 올라간다.
#[tokio::test]
async fn leader_rebid_semantics() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let a = Uuid::new_v4();

    place(&store, listing.id, a, 2_000).await.unwrap();

    // 자신의 최대 금액 이하: 상태 그대로, 기록도 없음
    let (unchanged, events) = place(&store, listing.id, a, 1_500).await.unwrap();
    assert_eq!(unchanged.current_price, 1_000);
    assert!(events.is_empty());
    assert_eq!(store.bid_count(listing.id).await.unwrap(), 1);

    // 최대 금액 상향: 가시 가격은 그대로, 기록은 추가
    let (raised, _) = place(&store, listing.id, a, 3_000).await.unwrap();
    assert_eq!(raised.current_price, 1_000);
    assert_eq!(raised.high_bidder_id, Some(a));
    assert_eq!(store.bid_count(listing.id).await.unwrap(), 2);

    // 올린 최대 금액이 실제로 유효한지: B 가 $25 를 걸어도 A 가 선두
    let b = Uuid::new_v4();
    let (after_b, _) = place(&store, listing.id, b, 2_500).await.unwrap();
    assert_eq!(after_b.high_bidder_id, Some(a));
    assert_eq!(after_b.current_price, 2_600);
}

/// 즉시 구매가 도달 입찰은 경매를 그 자리에서 끝낸다.
#[tokio::test]
async fn bid_reaching_buy_now_price_sells_immediately() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, Some(5_000)).await;
    let a = Uuid::new_v4();
    place(&store, listing.id, a, 3_000).await.unwrap();

    let winner = Uuid::new_v4();
    let (sold, events) = place(&store, listing.id, winner, 5_000).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.winning_amount, Some(5_000));
    assert_eq!(sold.high_bidder_id, Some(winner));
    assert_eq!(sold.payment_status, PaymentStatus::Pending);
    assert!(sold.end_time <= chrono::Utc::now());
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::BuyNowExecuted { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::PaymentDue { .. })),
        1
    );

    // 끝난 경매에는 더 입찰할 수 없다.
    let err = place(&store, listing.id, Uuid::new_v4(), 6_000)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[tokio::test]
async fn buy_now_command_on_auction_and_fixed_price() {
    let store = MemoryMarketStore::new();
    let auction = create_auction(&store, Uuid::new_v4(), 1_000, Some(5_000)).await;
    let fixed = create_fixed(&store, Uuid::new_v4(), 4_000, false, None).await;
    let buyer = Uuid::new_v4();

    let (sold_auction, _) = handle_buy_now(
        BuyNowCommand {
            listing_id: auction.id,
            buyer_id: buyer,
        },
        &store,
        &AllowAllGate,
    )
    .await
    .unwrap();
    assert_eq!(sold_auction.status, ListingStatus::Sold);
    assert_eq!(sold_auction.winning_amount, Some(5_000));
    // 경매 즉시 구매는 입찰 로그에도 남는다.
    assert_eq!(store.bid_count(auction.id).await.unwrap(), 1);

    let (sold_fixed, _) = handle_buy_now(
        BuyNowCommand {
            listing_id: fixed.id,
            buyer_id: buyer,
        },
        &store,
        &AllowAllGate,
    )
    .await
    .unwrap();
    assert_eq!(sold_fixed.status, ListingStatus::Sold);
    assert_eq!(sold_fixed.winning_amount, Some(4_000));
    assert_eq!(store.bid_count(fixed.id).await.unwrap(), 0);
}

#[tokio::test]
async fn buy_now_requires_configured_price() {
    let store = MemoryMarketStore::new();
    let auction = create_auction(&store, Uuid::new_v4(), 1_000, None).await;

    let err = handle_buy_now(
        BuyNowCommand {
            listing_id: auction.id,
            buyer_id: Uuid::new_v4(),
        },
        &store,
        &AllowAllGate,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[tokio::test]
async fn suspended_account_cannot_bid() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let suspended = Uuid::new_v4();
    let gate = StaticSuspensionGate::new([suspended]);

    let err = handle_place_bid(
        PlaceBidCommand {
            listing_id: listing.id,
            bidder_id: suspended,
            max_bid: 2_000,
        },
        &store,
        &gate,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::AccountSuspended));
}

/// 입찰 이력 익명화: 본인 외에는 "입찰자 N", 선두의 최대 금액은 비공개
#[tokio::test]
async fn bid_history_is_anonymized_and_masks_leader_maximum() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    place(&store, listing.id, a, 2_000).await.unwrap();
    place(&store, listing.id, b, 1_500).await.unwrap();

    let anonymous = get_bid_history(&store, listing.id, None).await.unwrap();
    assert_eq!(anonymous.len(), 2);
    assert_eq!(anonymous[0].bidder_label, "입찰자 1");
    assert_eq!(anonymous[1].bidder_label, "입찰자 2");
    assert!(anonymous.iter().all(|v| v.bidder_id.is_none()));
    // 선두 A 의 유효 최대 금액($20)은 현재 가격($15.50)으로 가려진다.
    assert_eq!(anonymous[0].amount, 1_550);
    // 진 입찰 B 의 금액은 그대로 보인다.
    assert_eq!(anonymous[1].amount, 1_500);

    // 본인은 자기 최대 금액과 식별자를 본다.
    let own = get_bid_history(&store, listing.id, Some(a)).await.unwrap();
    assert_eq!(own[0].bidder_id, Some(a));
    assert_eq!(own[0].amount, 2_000);
}

/// 동시 입찰: 같은 리스팅의 입찰은 전부 직렬화되어 최종 상태가 결정적이어야 한다.
#[tokio::test]
async fn concurrent_bids_serialize_per_listing() {
    let store = Arc::new(MemoryMarketStore::new());
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;

    let mut handles = vec![];
    for i in 1..=30i64 {
        let store = Arc::clone(&store);
        let listing_id = listing.id;
        handles.push(tokio::spawn(async move {
            let bidder = Uuid::new_v4();
            let max_bid = 1_000 + i * 1_000;
            let result = place(&store, listing_id, bidder, max_bid).await;
            (bidder, max_bid, result)
        }));
    }

    let mut accepted = vec![];
    for handle in handles {
        let (bidder, max_bid, result) = handle.await.unwrap();
        match result {
            Ok(_) => accepted.push((bidder, max_bid)),
            Err(CoreError::BidTooLow { .. }) => {}
            Err(other) => panic!("예상 밖의 실패: {:?}", other),
        }
    }

    let final_listing = store.listing(listing.id).await.unwrap().unwrap();
    // 최종 선두는 수락된 입찰 중 최대 금액 입찰자
    let top = accepted.iter().max_by_key(|(_, max)| *max).unwrap();
    assert_eq!(final_listing.high_bidder_id, Some(top.0));
    // 가격은 두 번째 최대 금액 + 호가 단위를 넘지 못한다.
    let mut maxes: Vec<i64> = accepted.iter().map(|(_, m)| *m).collect();
    maxes.sort_unstable_by(|x, y| y.cmp(x));
    if maxes.len() > 1 {
        let second = maxes[1];
        assert!(final_listing.current_price <= second + 1_000);
    }
    // 수락된 만큼만 로그에 남는다(유실도 중복도 없음).
    assert_eq!(
        store.bid_count(listing.id).await.unwrap(),
        accepted.len() as i64
    );
}

/// 가격 단조 증가: 어떤 입찰 순서에서도 현재 가격은 내려가지 않는다.
#[tokio::test]
async fn current_price_is_monotonic() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let bidders: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let sequence = [
        (0usize, 2_000i64),
        (1, 1_500),
        (2, 2_500),
        (0, 2_600),
        (3, 2_200),
        (1, 10_000),
        (2, 9_000),
    ];

    let mut last_price = 0;
    for (who, max_bid) in sequence {
        match place(&store, listing.id, bidders[who], max_bid).await {
            Ok((after, _)) => {
                assert!(
                    after.current_price >= last_price,
                    "가격이 {} 에서 {} 로 내려갔다",
                    last_price,
                    after.current_price
                );
                last_price = after.current_price;
            }
            Err(CoreError::BidTooLow { .. }) => {}
            Err(other) => panic!("예상 밖의 실패: {:?}", other),
        }
    }

    let final_listing = store.listing(listing.id).await.unwrap().unwrap();
    // 최대 $100 를 건 1번 입찰자가 선두, 가격은 $90 + 호가 단위
    assert_eq!(final_listing.high_bidder_id, Some(bidders[1]));
    assert_eq!(final_listing.current_price, 9_100);
}
