use serde::{ Deserialize, Serialize };

pub const DEMO_BANNER: &str =
    "Demo mode: this report is randomly generated and is not a real security analysis.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Safe,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub key: String,
    pub status: RiskStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl Indicator {
    pub fn new(key: &str, status: RiskStatus, message: impl Into<String>, score: Option<u8>) -> Self {
        Self {
            key: key.to_string(),
            status,
            message: message.into(),
            score,
        }
    }

    pub fn liquidity(locked: Option<bool>) -> Self {
        match locked {
            Some(true) => Self::new("liquidity", RiskStatus::Safe, "Liquidity is locked", Some(90)),
            Some(false) =>
                Self::new(
                    "liquidity",
                    RiskStatus::Danger,
                    "Liquidity is not locked - High Risk",
                    Some(30)
                ),
            None => Self::new("liquidity", RiskStatus::Warning, "Liquidity lock status unknown", None),
        }
    }

    pub fn dev_holdings(percentage: Option<f64>) -> Self {
        match percentage {
            Some(pct) => {
                let status = if pct < 20.0 { RiskStatus::Safe } else { RiskStatus::Warning };
                let score = (100.0 - pct).round().clamp(0.0, 100.0) as u8;
                Self::new(
                    "dev_holdings",
                    status,
                    format!("Developer holds {}% of total supply", pct),
                    Some(score)
                )
            }
            None => Self::new("dev_holdings", RiskStatus::Warning, "Developer holdings unknown", None),
        }
    }

    pub fn audit(audited: Option<bool>) -> Self {
        match audited {
            Some(true) => Self::new("audit", RiskStatus::Safe, "Contract is audited", Some(100)),
            Some(false) => Self::new("audit", RiskStatus::Warning, "No audit found", Some(50)),
            None => Self::new("audit", RiskStatus::Warning, "Audit status unknown", None),
        }
    }

    /// Overall assessment read off the producer's score; the score itself is untouched.
    pub fn overall_from_score(score: f64) -> Self {
        let status = if score >= 70.0 {
            RiskStatus::Safe
        } else if score >= 40.0 {
            RiskStatus::Warning
        } else {
            RiskStatus::Danger
        };
        Self::overall(status, Some(score.round().clamp(0.0, 100.0) as u8))
    }

    pub fn overall(status: RiskStatus, score: Option<u8>) -> Self {
        let message = match status {
            RiskStatus::Safe => "Token appears to have normal activity and security measures in place",
            RiskStatus::Warning => "Some risk factors detected - proceed with caution",
            RiskStatus::Danger => "Multiple high-risk factors detected - extreme caution advised",
        };
        Self::new("overall", status, message, score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReportOrigin {
    Scan {
        provider: String,
    },
    Demo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub holders: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderShare {
    pub address: String,
    pub percentage: f64,
}

/// Normalized per-token risk summary. `None` means the producer did not
/// supply the value; nothing is filled in on its behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub identifier: String,
    pub origin: ReportOrigin,
    /// 0 to 100, higher is safer.
    pub risk_score: f64,
    pub identity: TokenIdentity,
    pub market: MarketMetrics,
    pub liquidity_locked: Option<bool>,
    pub audited: Option<bool>,
    pub dev_holdings_pct: Option<f64>,
    pub top_holders: Vec<HolderShare>,
    pub indicators: Vec<Indicator>,
    pub overall: Indicator,
}

impl Report {
    pub fn is_authoritative(&self) -> bool {
        matches!(self.origin, ReportOrigin::Scan { .. })
    }

    pub fn banner(&self) -> Option<&'static str> {
        if self.is_authoritative() { None } else { Some(DEMO_BANNER) }
    }

    /// Name used when composing advice prompts: the token name if the
    /// producer supplied one, otherwise the identifier that was analyzed.
    pub fn display_name(&self) -> &str {
        self.identity.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.identifier)
    }

    pub fn indicator(&self, key: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.key == key)
    }
}
