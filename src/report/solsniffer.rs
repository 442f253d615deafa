use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use super::ReportSource;
use crate::config::field_map::ScanFieldMap;
use crate::error::RugError;
use crate::models::report::{
    HolderShare,
    Indicator,
    MarketMetrics,
    Report,
    ReportOrigin,
    TokenIdentity,
};

const PROVIDER: &str = "solsniffer";

/// Token scan client for the SolSniffer v2 API. Field names are read
/// through a `ScanFieldMap`, so a renamed or relocated field is a config
/// change rather than a code change.
pub struct SolSnifferSource {
    http: HttpClient,
    base_url: Url,
    api_key: String,
    fields: ScanFieldMap,
}

impl SolSnifferSource {
    pub fn new(
        base_url: &str,
        api_key: String,
        fields: ScanFieldMap,
        timeout: Duration
    ) -> Result<Self, RugError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(RugError::Config(format!("scan base URL '{}' cannot be a base", base_url)));
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RugError::Config(format!("Failed to build scan HTTP client: {}", e)))?;
        Ok(Self { http, base_url, api_key, fields })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RugError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RugError::Config("scan base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch(&self, url: Url, identifier: &str) -> Result<JsonValue, RugError> {
        debug!("Scanning token {} via {}", identifier, url);
        let resp = self.http
            .get(url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RugError::NotFound(format!("scanner has no data for token '{}'", identifier)));
        }

        let body = resp.error_for_status()?.json::<JsonValue>().await?;
        Ok(body)
    }
}

#[async_trait]
impl ReportSource for SolSnifferSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn analyze(&self, identifier: &str) -> Result<Report, RugError> {
        let url = self.endpoint(&["token", identifier])?;
        let body = self.fetch(url, identifier).await?;
        map_scan(identifier, PROVIDER, &body, &self.fields)
    }

    async fn refresh(&self, identifier: &str) -> Result<Report, RugError> {
        let url = self.endpoint(&["token", "refresh", identifier])?;
        let body = self.fetch(url, identifier).await?;
        map_scan(identifier, PROVIDER, &body, &self.fields)
    }
}

fn lookup<'a>(body: &'a JsonValue, pointer: Option<&str>) -> Option<&'a JsonValue> {
    pointer
        .filter(|p| !p.is_empty())
        .and_then(|p| body.pointer(p))
        .filter(|v| !v.is_null())
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_flag(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) =>
            match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            }
        JsonValue::Number(n) =>
            match n.as_u64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            }
        _ => None,
    }
}

fn as_text(value: &JsonValue) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn percentage(body: &JsonValue, pointer: Option<&str>, field: &str) -> Option<f64> {
    let value = lookup(body, pointer).and_then(as_number)?;
    if (0.0..=100.0).contains(&value) {
        Some(value)
    } else {
        warn!("Ignoring out-of-range {} value {} in scan response", field, value);
        None
    }
}

fn holders(body: &JsonValue, fields: &ScanFieldMap) -> Vec<HolderShare> {
    let Some(items) = lookup(body, fields.top_holders.as_deref()).and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let address = item.get(&fields.holder_address_key).and_then(as_text)?;
            let percentage = item.get(&fields.holder_percentage_key).and_then(as_number)?;
            Some(HolderShare { address, percentage })
        })
        .collect()
}

/// Maps a raw scan response onto the report shape. The risk score is the
/// only required field and is copied through unchanged; everything else
/// the response lacks stays `None`.
pub fn map_scan(
    identifier: &str,
    provider: &str,
    body: &JsonValue,
    fields: &ScanFieldMap
) -> Result<Report, RugError> {
    let risk_score = lookup(body, Some(fields.risk_score.as_str()))
        .and_then(as_number)
        .ok_or_else(|| {
            RugError::MalformedResponse(
                format!("scan response has no numeric risk score at '{}'", fields.risk_score)
            )
        })?;
    if !(0.0..=100.0).contains(&risk_score) {
        return Err(
            RugError::MalformedResponse(format!("risk score {} is outside 0-100", risk_score))
        );
    }

    let identity = TokenIdentity {
        name: lookup(body, fields.name.as_deref()).and_then(as_text),
        symbol: lookup(body, fields.symbol.as_deref()).and_then(as_text),
        image: lookup(body, fields.image.as_deref()).and_then(as_text),
    };
    let market = MarketMetrics {
        market_cap: lookup(body, fields.market_cap.as_deref()).and_then(as_number),
        volume_24h: lookup(body, fields.volume_24h.as_deref()).and_then(as_number),
        holders: lookup(body, fields.holders.as_deref()).and_then(JsonValue::as_u64),
    };
    let liquidity_locked = lookup(body, fields.liquidity_locked.as_deref()).and_then(as_flag);
    let audited = lookup(body, fields.audited.as_deref()).and_then(as_flag);
    let dev_holdings_pct = percentage(body, fields.dev_holdings_pct.as_deref(), "developer holdings");

    Ok(Report {
        identifier: identifier.to_string(),
        origin: ReportOrigin::Scan { provider: provider.to_string() },
        risk_score,
        identity,
        market,
        liquidity_locked,
        audited,
        dev_holdings_pct,
        top_holders: holders(body, fields),
        indicators: vec![
            Indicator::liquidity(liquidity_locked),
            Indicator::dev_holdings(dev_holdings_pct),
            Indicator::audit(audited)
        ],
        overall: Indicator::overall_from_score(risk_score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::RiskStatus;
    use crate::testutil::spawn_stub;
    use axum::{ extract::Path, http::{ HeaderMap, StatusCode as AxumStatus }, routing::get, Json, Router };
    use serde_json::json;

    const MINT: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";

    fn scan_body() -> JsonValue {
        json!({
            "address": MINT,
            "tokenData": {
                "tokenName": "dogwifhat",
                "tokenSymbol": "WIF",
                "tokenImg": "https://img/wif.png",
                "score": 87,
                "marketCap": 2345678901.5,
                "auditRisk": { "mintDisabled": true, "freezeDisabled": true, "lpBurned": true, "top10Holders": false },
                "ownersList": [
                    { "address": "9xQe", "amount": "1000", "percentage": "4.12" },
                    { "address": "3bF1", "amount": "800", "percentage": 3.5 }
                ]
            }
        })
    }

    fn stub_router() -> Router {
        Router::new()
            .route(
                "/token/{address}",
                get(|headers: HeaderMap, Path(address): Path<String>| async move {
                    if headers.get("x-api-key").map(|v| v.as_bytes()) != Some(b"scan-key".as_slice()) {
                        return (AxumStatus::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
                    }
                    if address != MINT {
                        return (AxumStatus::NOT_FOUND, Json(json!({ "error": "unknown token" })));
                    }
                    (AxumStatus::OK, Json(scan_body()))
                })
            )
            .route(
                "/token/refresh/{address}",
                get(|Path(_address): Path<String>| async move {
                    let mut body = scan_body();
                    body["tokenData"]["score"] = json!(42);
                    Json(body)
                })
            )
    }

    async fn source() -> SolSnifferSource {
        let base = spawn_stub(stub_router()).await;
        SolSnifferSource::new(
            &base,
            "scan-key".to_string(),
            ScanFieldMap::default(),
            Duration::from_secs(5)
        ).unwrap()
    }

    #[tokio::test]
    async fn score_is_passed_through_unchanged() {
        let report = source().await.analyze(MINT).await.unwrap();

        assert_eq!(report.risk_score, 87.0);
        assert!(report.is_authoritative());
        assert_eq!(report.identity.name.as_deref(), Some("dogwifhat"));
        assert_eq!(report.market.market_cap, Some(2345678901.5));
        assert_eq!(report.liquidity_locked, Some(true));
        assert_eq!(report.top_holders.len(), 2);
        assert_eq!(report.top_holders[0].percentage, 4.12);
        assert_eq!(report.overall.status, RiskStatus::Safe);
    }

    #[tokio::test]
    async fn absent_fields_stay_unknown() {
        let report = source().await.analyze(MINT).await.unwrap();

        assert_eq!(report.audited, None);
        assert_eq!(report.dev_holdings_pct, None);
        assert_eq!(report.market.volume_24h, None);
        assert_eq!(report.indicator("audit").unwrap().score, None);
        assert_eq!(report.indicator("dev_holdings").unwrap().message, "Developer holdings unknown");
    }

    #[tokio::test]
    async fn repeated_analysis_is_deterministic() {
        let source = source().await;
        let first = source.analyze(MINT).await.unwrap();
        let second = source.analyze(MINT).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn refresh_uses_refresh_endpoint() {
        let report = source().await.refresh(MINT).await.unwrap();
        assert_eq!(report.risk_score, 42.0);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let err = source().await.analyze("nope").await.unwrap_err();
        assert!(matches!(err, RugError::NotFound(_)));
    }

    #[tokio::test]
    async fn wrong_key_is_network_failure() {
        let base = spawn_stub(stub_router()).await;
        let source = SolSnifferSource::new(
            &base,
            "wrong".to_string(),
            ScanFieldMap::default(),
            Duration::from_secs(5)
        ).unwrap();
        assert!(matches!(source.analyze(MINT).await, Err(RugError::Network(_))));
    }

    #[tokio::test]
    async fn unreachable_scanner_is_network_failure() {
        let source = SolSnifferSource::new(
            "http://127.0.0.1:9",
            "k".to_string(),
            ScanFieldMap::default(),
            Duration::from_secs(2)
        ).unwrap();
        assert!(matches!(source.analyze(MINT).await, Err(RugError::Network(_))));
    }

    #[test]
    fn missing_score_is_malformed() {
        let body = json!({ "tokenData": { "tokenName": "x" } });
        let err = map_scan(MINT, PROVIDER, &body, &ScanFieldMap::default()).unwrap_err();
        assert!(matches!(err, RugError::MalformedResponse(_)));
    }

    #[test]
    fn out_of_range_score_is_malformed() {
        let body = json!({ "tokenData": { "score": 140 } });
        let err = map_scan(MINT, PROVIDER, &body, &ScanFieldMap::default()).unwrap_err();
        assert!(matches!(err, RugError::MalformedResponse(_)));
    }

    #[test]
    fn default_map_reads_audit_and_dev_holdings() {
        let body = json!({ "tokenData": { "score": 50, "audited": true, "devHoldingsPercentage": 12 } });
        let report = map_scan(MINT, PROVIDER, &body, &ScanFieldMap::default()).unwrap();

        assert_eq!(report.audited, Some(true));
        assert_eq!(report.dev_holdings_pct, Some(12.0));
        assert_eq!(report.indicator("audit").unwrap().status, RiskStatus::Safe);
        assert_eq!(report.indicator("dev_holdings").unwrap().status, RiskStatus::Safe);
        assert_eq!(report.overall.status, RiskStatus::Warning);
    }

    #[test]
    fn custom_field_map_is_honoured() {
        let fields = ScanFieldMap {
            risk_score: "/result/safety".to_string(),
            audited: Some("/result/audit/passed".to_string()),
            dev_holdings_pct: Some("/result/devPct".to_string()),
            ..ScanFieldMap::default()
        };
        let body = json!({ "result": { "safety": 33, "audit": { "passed": "true" }, "devPct": 25 } });
        let report = map_scan(MINT, "other", &body, &fields).unwrap();

        assert_eq!(report.risk_score, 33.0);
        assert_eq!(report.audited, Some(true));
        assert_eq!(report.dev_holdings_pct, Some(25.0));
        assert_eq!(report.indicator("dev_holdings").unwrap().status, RiskStatus::Warning);
        assert_eq!(report.overall.status, RiskStatus::Danger);
        assert_eq!(report.identity.name, None);
    }
}
