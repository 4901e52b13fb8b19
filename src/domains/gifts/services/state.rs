// Gifts domain state
// 선물 도메인 상태
use crate::shared::config::Config;
use crate::shared::database::Database;
use crate::domains::gifts::services::{GiftService, SettlementProcessor};

/// Gifts domain state
/// 선물 도메인에서 필요한 서비스들을 포함하는 상태
#[derive(Clone)]
pub struct GiftsState {
    pub gift_service: GiftService,
    pub settlement: SettlementProcessor,
}

impl GiftsState {
    /// Create GiftsState with database
    /// GiftsState 생성 (데이터베이스 필요)
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            gift_service: GiftService::new(db.clone()),
            settlement: SettlementProcessor::new(
                db,
                config.settle_batch_size,
                config.claim_expiry,
            ),
        }
    }
}
