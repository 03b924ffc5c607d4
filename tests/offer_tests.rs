mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{count_events, create_auction, create_fixed};
use marketplace_service::account::AllowAllGate;
use marketplace_service::error::CoreError;
use marketplace_service::events::MarketEvent;
use marketplace_service::listing::model::{ListingStatus, PaymentStatus};
use marketplace_service::offer::commands::{
    expire_open_offers, handle_create_offer, handle_respond_to_counter_offer,
    handle_respond_to_offer, CounterAction, CreateOfferCommand, OfferAction,
};
use marketplace_service::offer::model::{Offer, OfferStatus};
use marketplace_service::store::{MarketStore, MemoryMarketStore};

async fn offer(
    store: &MemoryMarketStore,
    listing_id: Uuid,
    buyer_id: Uuid,
    amount: i64,
) -> Result<Offer, CoreError> {
    handle_create_offer(
        CreateOfferCommand {
            listing_id,
            buyer_id,
            amount,
        },
        store,
        &AllowAllGate,
    )
    .await
    .map(|(created, _)| created)
}

/// $40 리스팅, 최소 제안 $25: $20 거절 -> $30 접수 -> $35 역제안 -> 구매자 거절
#[tokio::test]
async fn negotiation_scenario_from_listing_price_40() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, Some(2_500)).await;
    let buyer = Uuid::new_v4();

    // 최소 제안 금액 미달
    let err = offer(&store, listing.id, buyer, 2_000).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // $30 제안 접수
    let pending = offer(&store, listing.id, buyer, 3_000).await.unwrap();
    assert_eq!(pending.status, OfferStatus::Pending);

    // 판매자 $35 역제안
    let (countered, events) = handle_respond_to_offer(
        seller,
        pending.id,
        OfferAction::Counter,
        Some(3_500),
        &store,
    )
    .await
    .unwrap();
    assert_eq!(countered.status, OfferStatus::Countered);
    assert_eq!(countered.counter_amount, Some(3_500));
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::OfferCountered { .. })),
        1
    );

    // 구매자 거절로 스레드 종료
    let (rejected, _) =
        handle_respond_to_counter_offer(buyer, pending.id, CounterAction::Reject, &store)
            .await
            .unwrap();
    assert_eq!(rejected.status, OfferStatus::Rejected);

    // 리스팅은 그대로 판매 중이고 새 제안을 받을 수 있다.
    let still_active = store.listing(listing.id).await.unwrap().unwrap();
    assert_eq!(still_active.status, ListingStatus::Active);
    let again = offer(&store, listing.id, buyer, 3_200).await.unwrap();
    assert_eq!(again.status, OfferStatus::Pending);
}

/// 제안 수락은 리스팅을 판매 처리하고 나머지 열린 제안을 모두 거절시킨다.
#[tokio::test]
async fn accepting_offer_rejects_all_other_open_offers() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, None).await;
    let (buyer_a, buyer_b, buyer_c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let offer_a = offer(&store, listing.id, buyer_a, 3_000).await.unwrap();
    let offer_b = offer(&store, listing.id, buyer_b, 3_200).await.unwrap();
    let offer_c = offer(&store, listing.id, buyer_c, 2_800).await.unwrap();

    let (accepted, events) =
        handle_respond_to_offer(seller, offer_b.id, OfferAction::Accept, None, &store)
            .await
            .unwrap();
    assert_eq!(accepted.status, OfferStatus::Accepted);

    let sold = store.listing(listing.id).await.unwrap().unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.winning_amount, Some(3_200));
    assert_eq!(sold.high_bidder_id, Some(buyer_b));
    assert_eq!(sold.payment_status, PaymentStatus::Pending);

    for other in [offer_a.id, offer_c.id] {
        let rejected = store.offer(other).await.unwrap().unwrap();
        assert_eq!(rejected.status, OfferStatus::Rejected);
    }
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::OfferAccepted { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::OfferRejected { .. })),
        2
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::PaymentDue { .. })),
        1
    );

    // 판매 완료된 리스팅에는 새 제안을 받지 않는다.
    let err = offer(&store, listing.id, Uuid::new_v4(), 3_000)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

/// 역제안 수락은 역제안 금액으로 판매를 확정한다.
#[tokio::test]
async fn accepting_counter_offer_finalizes_at_counter_amount() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, None).await;
    let buyer = Uuid::new_v4();

    let pending = offer(&store, listing.id, buyer, 3_000).await.unwrap();
    handle_respond_to_offer(seller, pending.id, OfferAction::Counter, Some(3_500), &store)
        .await
        .unwrap();
    let (accepted, _) =
        handle_respond_to_counter_offer(buyer, pending.id, CounterAction::Accept, &store)
            .await
            .unwrap();
    assert_eq!(accepted.status, OfferStatus::Accepted);

    let sold = store.listing(listing.id).await.unwrap().unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.winning_amount, Some(3_500));
}

/// 구매자 한 명당 진행 중인 제안은 하나다.
#[tokio::test]
async fn one_open_offer_per_buyer() {
    let store = MemoryMarketStore::new();
    let listing = create_fixed(&store, Uuid::new_v4(), 4_000, true, None).await;
    let buyer = Uuid::new_v4();

    offer(&store, listing.id, buyer, 3_000).await.unwrap();
    let err = offer(&store, listing.id, buyer, 3_100).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // 다른 구매자는 제한 없이 제안할 수 있다.
    offer(&store, listing.id, Uuid::new_v4(), 3_100)
        .await
        .unwrap();
}

#[tokio::test]
async fn offer_validation_rules() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let auction = create_auction(&store, seller, 1_000, None).await;
    let no_offers = create_fixed(&store, seller, 4_000, false, None).await;
    let listing = create_fixed(&store, seller, 4_000, true, None).await;

    // 경매에는 가격 제안 불가
    let err = offer(&store, auction.id, Uuid::new_v4(), 3_000)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    // 제안을 받지 않는 리스팅
    let err = offer(&store, no_offers.id, Uuid::new_v4(), 3_000)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    // 판매자 본인 제안 불가
    let err = offer(&store, listing.id, seller, 3_000).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    // 정가 이상 제안은 구매로 안내
    let err = offer(&store, listing.id, Uuid::new_v4(), 4_000)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn counter_amount_must_be_between_offer_and_price() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, None).await;
    let pending = offer(&store, listing.id, Uuid::new_v4(), 3_000)
        .await
        .unwrap();

    let err = handle_respond_to_offer(seller, pending.id, OfferAction::Counter, Some(2_900), &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = handle_respond_to_offer(seller, pending.id, OfferAction::Counter, Some(4_100), &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = handle_respond_to_offer(seller, pending.id, OfferAction::Counter, None, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

/// 판매자만 제안에, 제안한 구매자만 역제안에 응답할 수 있다.
#[tokio::test]
async fn only_parties_to_the_offer_may_respond() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, None).await;
    let buyer = Uuid::new_v4();
    let pending = offer(&store, listing.id, buyer, 3_000).await.unwrap();

    let err = handle_respond_to_offer(Uuid::new_v4(), pending.id, OfferAction::Accept, None, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    handle_respond_to_offer(seller, pending.id, OfferAction::Counter, Some(3_500), &store)
        .await
        .unwrap();
    let err =
        handle_respond_to_counter_offer(Uuid::new_v4(), pending.id, CounterAction::Accept, &store)
            .await
            .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
}

/// 만료된 제안은 읽기/쓰기 시점에 게으르게 EXPIRED 로 처리된다.
#[tokio::test]
async fn expired_offer_is_lazily_marked_on_response() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let listing = create_fixed(&store, seller, 4_000, true, None).await;
    let buyer = Uuid::new_v4();

    // 만료 시간이 이미 지난 제안을 직접 심는다.
    let stale = Offer {
        id: Uuid::new_v4(),
        listing_id: listing.id,
        buyer_id: buyer,
        amount: 3_000,
        status: OfferStatus::Pending,
        counter_amount: None,
        expires_at: Utc::now() - Duration::hours(1),
        version: 0,
        created_at: Utc::now() - Duration::hours(49),
    };
    store.insert_offer(&stale).await.unwrap();

    let err = handle_respond_to_offer(seller, stale.id, OfferAction::Accept, None, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
    let expired = store.offer(stale.id).await.unwrap().unwrap();
    assert_eq!(expired.status, OfferStatus::Expired);

    // 만료 처리 후에는 같은 구매자가 새 제안을 올릴 수 있다.
    offer(&store, listing.id, buyer, 3_000).await.unwrap();
}

/// 일괄 만료 스윕
#[tokio::test]
async fn expiry_sweep_marks_due_offers() {
    let store = MemoryMarketStore::new();
    let listing = create_fixed(&store, Uuid::new_v4(), 4_000, true, None).await;

    let stale = Offer {
        id: Uuid::new_v4(),
        listing_id: listing.id,
        buyer_id: Uuid::new_v4(),
        amount: 3_000,
        status: OfferStatus::Pending,
        counter_amount: None,
        expires_at: Utc::now() - Duration::minutes(5),
        version: 0,
        created_at: Utc::now() - Duration::hours(49),
    };
    store.insert_offer(&stale).await.unwrap();
    let fresh = offer(&store, listing.id, Uuid::new_v4(), 3_100)
        .await
        .unwrap();

    let (expired_count, events) = expire_open_offers(&store, Utc::now()).await.unwrap();
    assert_eq!(expired_count, 1);
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::OfferExpired { .. })),
        1
    );
    assert_eq!(
        store.offer(stale.id).await.unwrap().unwrap().status,
        OfferStatus::Expired
    );
    // 기한이 남은 제안은 건드리지 않는다.
    assert_eq!(
        store.offer(fresh.id).await.unwrap().unwrap().status,
        OfferStatus::Pending
    );
}
