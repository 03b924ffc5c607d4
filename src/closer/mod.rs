/// 경매 마감 처리
/// 마감 시간이 지난 경매를 찾아 정확히 한 번만 종료한다.
/// 주기 실행은 LifecycleScheduler 가, 수동 실행은 핸들러가 같은 함수를 호출한다.
/// 겹쳐서 호출해도 안전하다: 상태 전환은 전부 버전 CAS 를 통과해야 하고,
/// CAS 에 밀린 쪽은 오류가 아니라 건너뜀으로 처리한다.
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::{publish_events, MarketEvent};
use crate::listing::model::{Listing, ListingStatus, PaymentStatus};
use crate::message_broker::KafkaProducer;
use crate::offer;
use crate::store::MarketStore;
use crate::watchlist;
// endregion: --- Imports

// region:    --- Close Report

/// 리스팅 하나의 마감 실패 기록
#[derive(Debug, Clone, Serialize)]
pub struct CloseError {
    pub listing_id: Uuid,
    pub message: String,
}

/// 일괄 마감 결과
/// skipped 는 다른 실행이 먼저 마감한 경우로, 동시 실행에서 정상이다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CloseReport {
    pub processed: usize,
    pub sold: usize,
    pub unsold: usize,
    pub skipped: usize,
    pub errors: Vec<CloseError>,
}

enum CloseOutcome {
    Sold(Vec<MarketEvent>),
    Unsold(Vec<MarketEvent>),
    Skipped,
}

// endregion: --- Close Report

// region:    --- Process Ended Auctions

/// 마감 시간이 지난 ACTIVE 경매를 일괄 종료한다.
/// 개별 리스팅의 실패는 모아서 반환하고 나머지는 계속 처리한다.
pub async fn process_ended_auctions(
    store: &impl MarketStore,
) -> Result<(CloseReport, Vec<MarketEvent>), CoreError> {
    let now = Utc::now();
    let due = store.due_auctions(now).await?;
    if !due.is_empty() {
        info!("{:<12} --> 마감 대상 경매 {}건 처리 시작", "Closer", due.len());
    }

    let mut report = CloseReport::default();
    let mut marketplace_events = Vec::new();
    for listing in due {
        let listing_id = listing.id;
        match close_one(store, listing, now).await {
            Ok(CloseOutcome::Sold(events)) => {
                report.processed += 1;
                report.sold += 1;
                marketplace_events.extend(events);
            }
            Ok(CloseOutcome::Unsold(events)) => {
                report.processed += 1;
                report.unsold += 1;
                marketplace_events.extend(events);
            }
            Ok(CloseOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                error!(
                    "{:<12} --> 경매 마감 실패 id: {} 오류: {}",
                    "Closer", listing_id, e
                );
                report.errors.push(CloseError {
                    listing_id,
                    message: e.to_string(),
                });
            }
        }
    }
    Ok((report, marketplace_events))
}

/// 경매 하나를 마감한다.
/// 1단계: ACTIVE -> ENDED 조건부 전환(겹침 실행에 대한 멱등성 가드)
/// 2단계: ENDED -> SOLD/UNSOLD 정산. 1단계 후 중단된 경매는 다음 실행의
/// 2단계가 이어받으므로 ACTIVE 에 영원히 남는 경매는 없다.
async fn close_one(
    store: &impl MarketStore,
    mut listing: Listing,
    now: DateTime<Utc>,
) -> Result<CloseOutcome, CoreError> {
    if listing.status == ListingStatus::Active {
        let mut ended = listing.clone();
        ended.status = ListingStatus::Ended;
        ended.version += 1;
        if !store.update_listing(&ended).await? {
            // 다른 실행이 먼저 전환했다: 오류가 아니다.
            return Ok(CloseOutcome::Skipped);
        }
        listing = ended;
    }

    // 정산 이벤트에 쓸 읽기 전용 정보는 CAS 전에 모아 둔다.
    let watchers = store.watchers_of(listing.id).await?;
    let mut settled = listing.clone();
    settled.version += 1;

    match listing.high_bidder_id {
        Some(winner_id) => {
            let seller_positive_pct =
                match watchlist::commands::seller_score(store, listing.seller_id).await {
                    Ok(score) => score.positive_pct,
                    Err(e) => {
                        warn!("{:<12} --> 판매자 평판 조회 실패: {}", "Closer", e);
                        None
                    }
                };
            settled.status = ListingStatus::Sold;
            settled.winning_amount = Some(listing.current_price);
            settled.payment_status = PaymentStatus::Pending;
            if !store.update_listing(&settled).await? {
                return Ok(CloseOutcome::Skipped);
            }

            let mut events = vec![
                MarketEvent::AuctionSold {
                    listing_id: listing.id,
                    seller_id: listing.seller_id,
                    winner_id,
                    winning_amount: listing.current_price,
                    seller_positive_pct,
                    timestamp: now,
                },
                MarketEvent::PaymentDue {
                    listing_id: listing.id,
                    winner_id,
                    amount_due: listing.current_price + listing.shipping_cost,
                    timestamp: now,
                },
            ];
            events.extend(watcher_events(&listing, &watchers, now));
            Ok(CloseOutcome::Sold(events))
        }
        None => {
            settled.status = ListingStatus::Unsold;
            if !store.update_listing(&settled).await? {
                return Ok(CloseOutcome::Skipped);
            }
            let mut events = vec![MarketEvent::AuctionUnsold {
                listing_id: listing.id,
                seller_id: listing.seller_id,
                timestamp: now,
            }];
            events.extend(watcher_events(&listing, &watchers, now));
            Ok(CloseOutcome::Unsold(events))
        }
    }
}

/// 관심 목록 사용자에게 종료 알림 이벤트 전개
fn watcher_events(
    listing: &Listing,
    watchers: &[Uuid],
    now: DateTime<Utc>,
) -> Vec<MarketEvent> {
    watchers
        .iter()
        .map(|watcher_id| MarketEvent::WatchedListingEnded {
            listing_id: listing.id,
            watcher_id: *watcher_id,
            timestamp: now,
        })
        .collect()
}

// endregion: --- Process Ended Auctions

// region:    --- Lifecycle Scheduler

/// 리스팅 상태 갱신 스케줄러
/// 주기마다 1) 시작 시간이 지난 SCHEDULED 리스팅 활성화,
/// 2) 마감 시간이 지난 경매 종료, 3) 만료된 가격 제안 정리를 수행한다.
pub struct LifecycleScheduler<S: MarketStore + 'static> {
    store: Arc<S>,
    producer: Arc<KafkaProducer>,
    period: Duration,
}

impl<S: MarketStore + 'static> LifecycleScheduler<S> {
    pub fn new(store: Arc<S>, producer: Arc<KafkaProducer>, period: Duration) -> Self {
        Self {
            store,
            producer,
            period,
        }
    }

    /// 스케줄러 시작
    pub async fn start(&self) {
        let store = Arc::clone(&self.store);
        let producer = Arc::clone(&self.producer);
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = Self::run_once(&store, &producer).await {
                    error!(
                        "{:<12} --> 리스팅 상태 갱신 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        });
    }

    /// 한 주기 실행
    async fn run_once(store: &Arc<S>, producer: &Arc<KafkaProducer>) -> Result<(), CoreError> {
        let now = Utc::now();

        // SCHEDULED -> ACTIVE 상태 변경
        let activated = store.activate_due_listings(now).await?;
        if activated > 0 {
            info!("{:<12} --> 리스팅 {}건 판매 시작", "Scheduler", activated);
        }

        // ACTIVE -> SOLD/UNSOLD 마감 처리
        let (report, close_events) = process_ended_auctions(store.as_ref()).await?;
        if !report.errors.is_empty() {
            error!(
                "{:<12} --> 마감 실패 {}건: {:?}",
                "Scheduler",
                report.errors.len(),
                report.errors
            );
        }
        publish_events(producer, &close_events).await;

        // 만료된 가격 제안 정리
        let (expired, offer_events) = offer::commands::expire_open_offers(store.as_ref(), now).await?;
        if expired > 0 {
            info!("{:<12} --> 가격 제안 {}건 만료 처리", "Scheduler", expired);
        }
        publish_events(producer, &offer_events).await;

        debug!(
            "{:<12} --> 리스팅 상태가 성공적으로 업데이트되었습니다.",
            "Scheduler"
        );
        Ok(())
    }
}

// endregion: --- Lifecycle Scheduler
