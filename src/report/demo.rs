use async_trait::async_trait;
use rand::Rng;

use super::ReportSource;
use crate::error::RugError;
use crate::models::report::{
    HolderShare,
    Indicator,
    MarketMetrics,
    Report,
    ReportOrigin,
    RiskStatus,
    TokenIdentity,
};

/// Placeholder producer for running without a scan service. Every field
/// is an independent random draw and every report is tagged `Demo`.
#[derive(Debug, Default)]
pub struct DemoReportSource;

impl DemoReportSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSource for DemoReportSource {
    fn name(&self) -> &str {
        "demo"
    }

    async fn analyze(&self, identifier: &str) -> Result<Report, RugError> {
        let report = synthesize(identifier, &mut rand::thread_rng());
        Ok(report)
    }
}

pub fn synthesize<R: Rng>(identifier: &str, rng: &mut R) -> Report {
    let liquidity_locked = rng.gen_bool(0.5);
    let dev_holdings_pct = rng.gen_range(0..40) as f64;
    let audited = rng.gen_bool(0.3);
    let risk_score = rng.gen_range(0..=100) as f64;

    let top_holders = (1..=3)
        .map(|i| HolderShare {
            address: format!("Wallet {}", i),
            percentage: rng.gen_range(0..15) as f64,
        })
        .collect();

    let market = MarketMetrics {
        market_cap: Some(rng.gen_range(50_000..50_000_000) as f64),
        volume_24h: Some(rng.gen_range(5_000..5_000_000) as f64),
        holders: Some(rng.gen_range(100..20_000)),
    };

    let transfers = if rng.gen_bool(0.3) { RiskStatus::Warning } else { RiskStatus::Safe };
    let overall_status = if rng.gen_bool(0.3) { RiskStatus::Safe } else { RiskStatus::Warning };

    Report {
        identifier: identifier.to_string(),
        origin: ReportOrigin::Demo,
        risk_score,
        identity: TokenIdentity::default(),
        market,
        liquidity_locked: Some(liquidity_locked),
        audited: Some(audited),
        dev_holdings_pct: Some(dev_holdings_pct),
        top_holders,
        indicators: vec![
            Indicator::liquidity(Some(liquidity_locked)),
            Indicator::dev_holdings(Some(dev_holdings_pct)),
            Indicator::audit(Some(audited)),
            Indicator::new("activity", RiskStatus::Safe, "Normal trading activity detected", None),
            Indicator::new("transfers", transfers, "Recent large transfers detected", None)
        ],
        overall: Indicator::overall(overall_status, Some(risk_score as u8)),
    }
}
