mod common;

use std::sync::Arc;
use uuid::Uuid;

use common::{count_events, create_auction, force_end, place};
use marketplace_service::closer::process_ended_auctions;
use marketplace_service::events::MarketEvent;
use marketplace_service::listing::model::{ListingStatus, PaymentStatus};
use marketplace_service::store::{MarketStore, MemoryMarketStore};
use marketplace_service::watchlist::commands::add_to_watchlist;

/// 입찰이 있으면 SOLD, 없으면 UNSOLD 로 마감된다.
#[tokio::test]
async fn closes_due_auctions_sold_and_unsold() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let with_bids = create_auction(&store, seller, 1_000, None).await;
    let without_bids = create_auction(&store, seller, 1_000, None).await;
    let winner = Uuid::new_v4();
    place(&store, with_bids.id, winner, 2_000).await.unwrap();
    place(&store, with_bids.id, Uuid::new_v4(), 1_500)
        .await
        .unwrap();
    force_end(&store, with_bids.id).await;
    force_end(&store, without_bids.id).await;

    let (report, events) = process_ended_auctions(&store).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.sold, 1);
    assert_eq!(report.unsold, 1);
    assert!(report.errors.is_empty());

    let sold = store.listing(with_bids.id).await.unwrap().unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    // 낙찰가는 선언한 최대 금액이 아니라 현재 가격이다.
    assert_eq!(sold.winning_amount, Some(1_550));
    assert_eq!(sold.high_bidder_id, Some(winner));
    assert_eq!(sold.payment_status, PaymentStatus::Pending);

    let unsold = store.listing(without_bids.id).await.unwrap().unwrap();
    assert_eq!(unsold.status, ListingStatus::Unsold);

    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::AuctionSold { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::PaymentDue { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, MarketEvent::AuctionUnsold { .. })),
        1
    );
}

/// 두 번 돌려도 두 번째 실행은 아무것도 바꾸지 않는다.
#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    place(&store, listing.id, Uuid::new_v4(), 2_000)
        .await
        .unwrap();
    force_end(&store, listing.id).await;

    let (first, first_events) = process_ended_auctions(&store).await.unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(
        count_events(&first_events, |e| matches!(e, MarketEvent::AuctionSold { .. })),
        1
    );
    let settled = store.listing(listing.id).await.unwrap().unwrap();

    let (second, second_events) = process_ended_auctions(&store).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 0);
    assert!(second_events.is_empty());

    // 종결 상태는 그대로다(버전까지 동일).
    let untouched = store.listing(listing.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, ListingStatus::Sold);
    assert_eq!(untouched.version, settled.version);
}

/// 겹쳐 실행해도 리스팅 하나는 정확히 한 번만 정산되고 알림도 한 번만 나간다.
#[tokio::test]
async fn overlapping_runs_settle_each_listing_once() {
    let store = Arc::new(MemoryMarketStore::new());
    let seller = Uuid::new_v4();
    let mut listing_ids = vec![];
    for _ in 0..5 {
        let listing = create_auction(&store, seller, 1_000, None).await;
        place(&store, listing.id, Uuid::new_v4(), 2_000)
            .await
            .unwrap();
        force_end(&store, listing.id).await;
        listing_ids.push(listing.id);
    }

    let store_a = Arc::clone(&store);
    let store_b = Arc::clone(&store);
    let (result_a, result_b) = tokio::join!(
        async move { process_ended_auctions(store_a.as_ref()).await.unwrap() },
        async move { process_ended_auctions(store_b.as_ref()).await.unwrap() },
    );
    let (report_a, events_a) = result_a;
    let (report_b, events_b) = result_b;

    // 다섯 건 모두 어느 한쪽에서만 정산된다.
    assert_eq!(report_a.processed + report_b.processed, 5);
    assert!(report_a.errors.is_empty() && report_b.errors.is_empty());

    for listing_id in &listing_ids {
        let sold_notifications = count_events(&events_a, |e| {
            matches!(e, MarketEvent::AuctionSold { listing_id: id, .. } if id == listing_id)
        }) + count_events(&events_b, |e| {
            matches!(e, MarketEvent::AuctionSold { listing_id: id, .. } if id == listing_id)
        });
        assert_eq!(sold_notifications, 1, "중복 정산 알림: {}", listing_id);

        let listing = store.listing(*listing_id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Sold);
    }
}

/// 마감 후에는 기한이 지난 ACTIVE 경매가 남지 않는다.
#[tokio::test]
async fn no_dangling_active_auctions_after_run() {
    let store = MemoryMarketStore::new();
    for _ in 0..3 {
        let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
        force_end(&store, listing.id).await;
    }

    process_ended_auctions(&store).await.unwrap();

    let leftover = store.due_auctions(chrono::Utc::now()).await.unwrap();
    assert!(leftover.is_empty());
}

/// 관심 목록 사용자에게 종료 알림이 전개된다.
#[tokio::test]
async fn watchers_receive_close_notification() {
    let store = MemoryMarketStore::new();
    let listing = create_auction(&store, Uuid::new_v4(), 1_000, None).await;
    let (w1, w2) = (Uuid::new_v4(), Uuid::new_v4());
    add_to_watchlist(&store, w1, listing.id).await.unwrap();
    add_to_watchlist(&store, w2, listing.id).await.unwrap();
    force_end(&store, listing.id).await;

    let (_, events) = process_ended_auctions(&store).await.unwrap();
    let watcher_notifications: Vec<Uuid> = events
        .iter()
        .filter_map(|e| match e {
            MarketEvent::WatchedListingEnded { watcher_id, .. } => Some(*watcher_id),
            _ => None,
        })
        .collect();
    assert_eq!(watcher_notifications.len(), 2);
    assert!(watcher_notifications.contains(&w1));
    assert!(watcher_notifications.contains(&w2));
}

/// 시작 시간이 지난 SCHEDULED 리스팅은 활성화 스윕이 ACTIVE 로 올린다.
#[tokio::test]
async fn scheduled_listings_activate_when_due() {
    let store = MemoryMarketStore::new();
    let seller = Uuid::new_v4();
    let mut cmd = common::auction_cmd(seller, 1_000, None);
    cmd.start_time = Some(chrono::Utc::now() + chrono::Duration::hours(1));
    let (listing, _) = marketplace_service::listing::commands::handle_create_auction(
        cmd,
        &store,
        &marketplace_service::account::AllowAllGate,
    )
    .await
    .unwrap();
    assert_eq!(listing.status, ListingStatus::Scheduled);

    // 아직 시작 전이면 아무것도 활성화되지 않는다.
    assert_eq!(
        store
            .activate_due_listings(chrono::Utc::now())
            .await
            .unwrap(),
        0
    );

    // 시작 시간이 지나면 활성화된다.
    let after_start = listing.start_time + chrono::Duration::seconds(1);
    assert_eq!(store.activate_due_listings(after_start).await.unwrap(), 1);
    let activated = store.listing(listing.id).await.unwrap().unwrap();
    assert_eq!(activated.status, ListingStatus::Active);
}
