#![allow(dead_code)]

use chrono::{Duration, Utc};
use uuid::Uuid;

use marketplace_service::account::AllowAllGate;
use marketplace_service::bidding::commands::{handle_place_bid, PlaceBidCommand};
use marketplace_service::error::CoreError;
use marketplace_service::events::MarketEvent;
use marketplace_service::listing::commands::{
    handle_create_auction, handle_create_fixed_price, CreateAuctionCommand,
    CreateFixedPriceCommand,
};
use marketplace_service::listing::model::Listing;
use marketplace_service::store::{MarketStore, MemoryMarketStore};

/// 경매 등록 명령 생성
pub fn auction_cmd(seller_id: Uuid, starting_price: i64, buy_now_price: Option<i64>) -> CreateAuctionCommand {
    CreateAuctionCommand {
        seller_id,
        item_id: Uuid::new_v4(),
        starting_price,
        buy_now_price,
        duration_days: 3,
        start_time: None,
        shipping_cost: 0,
        description: "테스트용 경매 리스팅입니다.".to_string(),
        detail_images: vec![],
    }
}

/// 고정가 등록 명령 생성
pub fn fixed_cmd(
    seller_id: Uuid,
    price: i64,
    accepts_offers: bool,
    min_offer_amount: Option<i64>,
) -> CreateFixedPriceCommand {
    CreateFixedPriceCommand {
        seller_id,
        item_id: Uuid::new_v4(),
        price,
        accepts_offers,
        min_offer_amount,
        start_time: None,
        shipping_cost: 0,
        description: "테스트용 고정가 리스팅입니다.".to_string(),
        detail_images: vec![],
    }
}

/// ACTIVE 경매 생성
pub async fn create_auction(
    store: &MemoryMarketStore,
    seller_id: Uuid,
    starting_price: i64,
    buy_now_price: Option<i64>,
) -> Listing {
    let (listing, _) = handle_create_auction(
        auction_cmd(seller_id, starting_price, buy_now_price),
        store,
        &AllowAllGate,
    )
    .await
    .unwrap();
    listing
}

/// ACTIVE 고정가 리스팅 생성
pub async fn create_fixed(
    store: &MemoryMarketStore,
    seller_id: Uuid,
    price: i64,
    accepts_offers: bool,
    min_offer_amount: Option<i64>,
) -> Listing {
    let (listing, _) = handle_create_fixed_price(
        fixed_cmd(seller_id, price, accepts_offers, min_offer_amount),
        store,
        &AllowAllGate,
    )
    .await
    .unwrap();
    listing
}

/// 입찰 실행
pub async fn place(
    store: &MemoryMarketStore,
    listing_id: Uuid,
    bidder_id: Uuid,
    max_bid: i64,
) -> Result<(Listing, Vec<MarketEvent>), CoreError> {
    handle_place_bid(
        PlaceBidCommand {
            listing_id,
            bidder_id,
            max_bid,
        },
        store,
        &AllowAllGate,
    )
    .await
}

/// 마감 시간을 과거로 돌려 마감 대상으로 만든다.
pub async fn force_end(store: &MemoryMarketStore, listing_id: Uuid) {
    let mut listing = store.listing(listing_id).await.unwrap().unwrap();
    listing.end_time = Utc::now() - Duration::seconds(5);
    listing.version += 1;
    assert!(store.update_listing(&listing).await.unwrap());
}

/// 이벤트 목록에서 특정 종류의 개수를 센다.
pub fn count_events(events: &[MarketEvent], pred: impl Fn(&MarketEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
