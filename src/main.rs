// region:    --- Imports
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use marketplace_service::account::{AllowAllGate, HttpSuspensionGate, SuspensionGate};
use marketplace_service::closer::LifecycleScheduler;
use marketplace_service::database::DatabaseManager;
use marketplace_service::events::EVENTS_TOPIC;
use marketplace_service::handlers::{self, AppState};
use marketplace_service::message_broker::KafkaManager;
use marketplace_service::store::PostgresMarketStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // Kafka 매니저 생성 및 이벤트 토픽 생성
    let kafka_manager = Arc::new(KafkaManager::new());
    kafka_manager.create_topic(EVENTS_TOPIC, 5, 1).await?;
    info!("{:<12} --> Kafka 초기화 성공", "Main");

    // 저장소 및 계정 게이트 구성
    let store = Arc::new(PostgresMarketStore::new(Arc::clone(&db_manager)));
    let gate: Arc<dyn SuspensionGate> = match std::env::var("ACCOUNT_SERVICE_URL") {
        Ok(url) => Arc::new(HttpSuspensionGate::new(url)),
        Err(_) => {
            info!(
                "{:<12} --> ACCOUNT_SERVICE_URL 미설정: 계정 정지 확인 비활성화",
                "Main"
            );
            Arc::new(AllowAllGate)
        }
    };

    // 리스팅 상태 스케줄러 시작(활성화, 경매 마감, 제안 만료)
    let closer_interval = std::env::var("CLOSER_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);
    let scheduler = LifecycleScheduler::new(
        Arc::clone(&store),
        kafka_manager.get_producer(),
        Duration::from_secs(closer_interval),
    );
    scheduler.start().await;

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        store,
        producer: kafka_manager.get_producer(),
        gate,
    };

    // 라우터 설정
    let routes_all = Router::new()
        .route("/listings/auction", post(handlers::handle_create_auction))
        .route(
            "/listings/fixed-price",
            post(handlers::handle_create_fixed_price),
        )
        .route("/listings", get(handlers::handle_search_listings))
        .route(
            "/listings/:id",
            get(handlers::handle_get_listing).patch(handlers::handle_update_listing),
        )
        .route("/listings/:id/cancel", post(handlers::handle_cancel_listing))
        .route("/listings/:id/mark-paid", post(handlers::handle_mark_paid))
        .route("/listings/:id/bids", get(handlers::handle_get_bid_history))
        .route("/bid", post(handlers::handle_bid))
        .route("/buy-now", post(handlers::handle_buy_now))
        .route("/offers", post(handlers::handle_create_offer))
        .route(
            "/offers/:id/respond",
            post(handlers::handle_respond_to_offer),
        )
        .route(
            "/offers/:id/counter-response",
            post(handlers::handle_respond_to_counter_offer),
        )
        .route("/close", post(handlers::handle_close_ended_auctions))
        .route(
            "/watchlist",
            post(handlers::handle_add_to_watchlist)
                .delete(handlers::handle_remove_from_watchlist),
        )
        .route("/watchlist/:user_id", get(handlers::handle_get_watchlist))
        .route("/ratings", post(handlers::handle_submit_rating))
        .route(
            "/sellers/:id/score",
            get(handlers::handle_get_seller_score),
        )
        .route(
            "/sellers/:id/ratings",
            get(handlers::handle_get_seller_ratings),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state(state);

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
