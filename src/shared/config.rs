use anyhow::{Context, Result};
use std::time::Duration;

/// 서버 설정
/// Server configuration
///
/// 환경변수에서 한 번 로드하여 AppState에 주입합니다.
/// Loaded once from environment variables and injected into AppState.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL 연결 문자열
    /// PostgreSQL connection string
    pub database_url: String,

    /// 서버 바인드 주소
    /// Server bind address
    pub bind_addr: String,

    /// 선물 정산 배치 주기
    /// Gift settlement batch interval
    pub settle_interval: Duration,

    /// 배치당 최대 처리 건수
    /// Max gifts claimed per cycle
    pub settle_batch_size: i64,

    /// settling 클레임 만료 시간 (이후 다른 사이클이 재클레임 가능)
    /// Claim expiry for stuck settling rows (reclaimable afterwards)
    pub claim_expiry: Duration,

    /// 미완료 주문 재조정 스윕 주기
    /// Reconciliation sweep interval for stale orders
    pub reconcile_sweep_interval: Duration,

    /// 웹훅 서명 검증용 공유 비밀키
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// PayPal API 설정
    /// PayPal API settings
    pub paypal_base_url: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
}

impl Config {
    /// 환경변수에서 설정 로드 (.env 파일 지원)
    /// Load configuration from environment (.env supported)
    pub fn from_env() -> Result<Self> {
        // .env가 없어도 에러 아님
        // Missing .env is not an error
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3002"),
            settle_interval: Duration::from_millis(env_parse("SETTLE_INTERVAL_MS", 2_000)),
            settle_batch_size: env_parse("SETTLE_BATCH_SIZE", 200),
            claim_expiry: Duration::from_secs(env_parse("CLAIM_EXPIRY_SECS", 60)),
            reconcile_sweep_interval: Duration::from_secs(env_parse("RECONCILE_SWEEP_SECS", 300)),
            webhook_secret: env_or("WEBHOOK_SECRET", "dev-webhook-secret"),
            paypal_base_url: env_or("PAYPAL_BASE_URL", "https://api-m.sandbox.paypal.com"),
            paypal_client_id: env_or("PAYPAL_CLIENT_ID", ""),
            paypal_client_secret: env_or("PAYPAL_CLIENT_SECRET", ""),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
