use axum::Router;
use axum::http::Method;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_server::routes::create_router;
use ledger_server::shared::config::Config;
use ledger_server::shared::database::Database;
use ledger_server::shared::services::AppState;

// Import models for OpenAPI schema
use ledger_server::domains::gifts::models::*;
use ledger_server::domains::ledger::models::*;
use ledger_server::domains::payments::models::*;

// OpenAPI 스키마 정의: Swagger 문서 자동 생성
#[derive(OpenApi)]
#[openapi(
    paths(
        ledger_server::domains::ledger::handlers::operation_handler::submit_operation,
        ledger_server::domains::ledger::handlers::operation_handler::grant_daily_reward,
        ledger_server::domains::ledger::handlers::balance_handler::get_account,
        ledger_server::domains::ledger::handlers::balance_handler::get_transactions,
        ledger_server::domains::ledger::handlers::cashout_handler::get_cashout_eligibility,
        ledger_server::domains::ledger::handlers::cashout_handler::request_payout,
        ledger_server::domains::gifts::handlers::gift_handler::submit_gift,
        ledger_server::domains::gifts::handlers::gift_handler::get_gift,
        ledger_server::domains::gifts::handlers::gift_handler::list_batch_runs,
        ledger_server::domains::payments::handlers::payment_handler::create_order,
        ledger_server::domains::payments::handlers::payment_handler::payment_webhook,
        ledger_server::domains::payments::handlers::payment_handler::reconcile_order
    ),
    components(schemas(
        Account,
        AccountResponse,
        Transaction,
        TransactionsResponse,
        Bucket,
        TransactionKind,
        OperationRequest,
        OperationResponse,
        DailyRewardRequest,
        RewardRole,
        PayoutRequestBody,
        PayoutResponse,
        CashoutEligibilityResponse,
        CashoutTierInfo,
        GiftRequest,
        GiftAcceptedResponse,
        GiftStatusResponse,
        GiftStatus,
        PendingGift,
        BatchRun,
        BatchRunsResponse,
        CreateOrderRequest,
        CreateOrderResponse,
        CoinOrder,
        OrderStatus,
        ReconcileOutcome,
        PaymentWebhookPayload,
        WebhookResource
    )),
    tags(
        (name = "Ledger Operations", description = "Idempotent balance operations"),
        (name = "Ledger Accounts", description = "Balance projections and transaction history"),
        (name = "Ledger Cashout", description = "Cashout tier eligibility and payout requests"),
        (name = "Gifts", description = "Gift queue and batch settlement"),
        (name = "Payments", description = "Provider orders, webhooks, reconciliation")
    ),
    info(
        title = "Coin Ledger API Server",
        description = "Coin ledger and settlement engine for the livestreaming economy",
        version = "1.0.0"
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // 로깅 초기화 (RUST_LOG로 레벨 제어)
    // Logging init (level via RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 설정 로드
    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    // DB 연결
    // Connect to database
    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db.initialize()
        .await
        .expect("Failed to initialize database");

    // AppState 생성 (모든 Service 초기화)
    // Create AppState (initializes every service)
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(db, config).expect("Failed to initialize AppState");

    // 백그라운드 워커 시작 (정산 배치 + 재조정 스윕)
    // Start background workers (settlement batch + reconciliation sweep)
    app_state.start_workers();

    // CORS 설정
    // CORS settings
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ]);

    // Router 생성
    // Build the router
    let app = Router::new()
        .merge(create_router())
        .merge(SwaggerUi::new("/api").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(app_state);

    // 서버 시작
    // Start the server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(addr = %bind_addr, "Ledger server running");
    tracing::info!("Swagger UI available at /api");

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
