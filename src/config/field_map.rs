use serde::Deserialize;
use std::fs;
use log::info;

use super::ConfigError;

/// Where each report field lives in a scan-service response, as JSON
/// pointers (RFC 6901). A `None` pointer means the service does not carry
/// that field and the report shows it as unknown.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScanFieldMap {
    pub risk_score: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    pub market_cap: Option<String>,
    pub volume_24h: Option<String>,
    pub holders: Option<String>,
    pub liquidity_locked: Option<String>,
    pub audited: Option<String>,
    pub dev_holdings_pct: Option<String>,
    /// Array of holder objects; each item is read with the two keys below.
    pub top_holders: Option<String>,
    pub holder_address_key: String,
    pub holder_percentage_key: String,
}

impl Default for ScanFieldMap {
    fn default() -> Self {
        Self {
            risk_score: "/tokenData/score".to_string(),
            name: Some("/tokenData/tokenName".to_string()),
            symbol: Some("/tokenData/tokenSymbol".to_string()),
            image: Some("/tokenData/tokenImg".to_string()),
            market_cap: Some("/tokenData/marketCap".to_string()),
            volume_24h: None,
            holders: None,
            liquidity_locked: Some("/tokenData/auditRisk/lpBurned".to_string()),
            audited: Some("/tokenData/audited".to_string()),
            dev_holdings_pct: Some("/tokenData/devHoldingsPercentage".to_string()),
            top_holders: Some("/tokenData/ownersList".to_string()),
            holder_address_key: "address".to_string(),
            holder_percentage_key: "percentage".to_string(),
        }
    }
}

impl ScanFieldMap {
    fn validate(&self) -> Result<(), ConfigError> {
        let pointers = [
            Some(&self.risk_score),
            self.name.as_ref(),
            self.symbol.as_ref(),
            self.image.as_ref(),
            self.market_cap.as_ref(),
            self.volume_24h.as_ref(),
            self.holders.as_ref(),
            self.liquidity_locked.as_ref(),
            self.audited.as_ref(),
            self.dev_holdings_pct.as_ref(),
            self.top_holders.as_ref(),
        ];
        for pointer in pointers.into_iter().flatten() {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(
                    ConfigError::Invalid(
                        format!("field map pointer '{}' must be empty or start with '/'", pointer)
                    )
                );
            }
        }
        Ok(())
    }
}

pub fn load_field_map_from_str(json_str: &str) -> Result<ScanFieldMap, ConfigError> {
    let map: ScanFieldMap = serde_json::from_str(json_str)?;
    map.validate()?;
    Ok(map)
}

pub fn load_field_map(path: Option<&str>) -> Result<ScanFieldMap, ConfigError> {
    match path {
        Some(path) => {
            info!("Loading scan field map from: {}", path);
            let json_str = fs::read_to_string(path)?;
            load_field_map_from_str(&json_str)
        }
        None => Ok(ScanFieldMap::default()),
    }
}
