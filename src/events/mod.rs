/// 도메인 이벤트(아웃박스)
/// 코어 커맨드는 상태 변경과 함께 발생한 이벤트 목록을 반환하고,
/// 호출 측(핸들러/스케줄러)이 메시지 브로커로 발행한다.
/// 발행 실패는 로그만 남기고 상태 변경을 되돌리지 않는다.
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::message_broker::KafkaProducer;
// endregion: --- Imports

// region:    --- Market Event

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum MarketEvent {
    // 리스팅 등록
    ListingCreated {
        listing_id: Uuid,
        seller_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    // 리스팅 취소
    ListingCancelled {
        listing_id: Uuid,
        seller_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    // 입찰 접수
    BidPlaced {
        listing_id: Uuid,
        bidder_id: Uuid,
        current_price: i64,
        timestamp: DateTime<Utc>,
    },
    // 선두 입찰자 교체 알림
    Outbid {
        listing_id: Uuid,
        previous_bidder_id: Uuid,
        current_price: i64,
        timestamp: DateTime<Utc>,
    },
    // 즉시 구매 체결
    BuyNowExecuted {
        listing_id: Uuid,
        buyer_id: Uuid,
        price: i64,
        timestamp: DateTime<Utc>,
    },
    // 경매 낙찰(판매자 알림)
    AuctionSold {
        listing_id: Uuid,
        seller_id: Uuid,
        winner_id: Uuid,
        winning_amount: i64,
        /// 알림 문구에 쓰이는 판매자 긍정 평가 비율(%)
        seller_positive_pct: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    // 유찰(판매자 알림)
    AuctionUnsold {
        listing_id: Uuid,
        seller_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    // 결제 요청(낙찰자 알림)
    PaymentDue {
        listing_id: Uuid,
        winner_id: Uuid,
        /// 낙찰가 + 배송비
        amount_due: i64,
        timestamp: DateTime<Utc>,
    },
    // 결제 확인
    PaymentConfirmed {
        listing_id: Uuid,
        seller_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    // 가격 제안 접수(판매자 알림)
    OfferReceived {
        offer_id: Uuid,
        listing_id: Uuid,
        seller_id: Uuid,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 제안 수락(구매자 알림)
    OfferAccepted {
        offer_id: Uuid,
        listing_id: Uuid,
        buyer_id: Uuid,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 제안 거절(구매자 알림)
    OfferRejected {
        offer_id: Uuid,
        listing_id: Uuid,
        buyer_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    // 판매자 역제안(구매자 알림)
    OfferCountered {
        offer_id: Uuid,
        listing_id: Uuid,
        buyer_id: Uuid,
        counter_amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 제안 만료
    OfferExpired {
        offer_id: Uuid,
        listing_id: Uuid,
        buyer_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    // 관심 리스팅 종료(관심 목록 사용자 알림)
    WatchedListingEnded {
        listing_id: Uuid,
        watcher_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// 이벤트가 속한 리스팅(카프카 파티션 키로 사용)
    pub fn listing_id(&self) -> Uuid {
        match self {
            MarketEvent::ListingCreated { listing_id, .. }
            | MarketEvent::ListingCancelled { listing_id, .. }
            | MarketEvent::BidPlaced { listing_id, .. }
            | MarketEvent::Outbid { listing_id, .. }
            | MarketEvent::BuyNowExecuted { listing_id, .. }
            | MarketEvent::AuctionSold { listing_id, .. }
            | MarketEvent::AuctionUnsold { listing_id, .. }
            | MarketEvent::PaymentDue { listing_id, .. }
            | MarketEvent::PaymentConfirmed { listing_id, .. }
            | MarketEvent::OfferReceived { listing_id, .. }
            | MarketEvent::OfferAccepted { listing_id, .. }
            | MarketEvent::OfferRejected { listing_id, .. }
            | MarketEvent::OfferCountered { listing_id, .. }
            | MarketEvent::OfferExpired { listing_id, .. }
            | MarketEvent::WatchedListingEnded { listing_id, .. } => *listing_id,
        }
    }
}

// endregion: --- Market Event

// region:    --- Publish

/// 이벤트 토픽
pub const EVENTS_TOPIC: &str = "events";

/// 이벤트 발행(fire-and-forget)
/// 실패해도 이미 커밋된 상태 변경에는 영향을 주지 않는다.
pub async fn publish_events(producer: &KafkaProducer, events: &[MarketEvent]) {
    for event in events {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!("{:<12} --> 이벤트 직렬화 오류: {:?}", "Events", e);
                continue;
            }
        };
        if let Err(e) = producer
            .send_message(EVENTS_TOPIC, &event.listing_id().to_string(), &payload)
            .await
        {
            error!("{:<12} --> 이벤트 발행 오류: {}", "Events", e);
        }
    }
}

// endregion: --- Publish
