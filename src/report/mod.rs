pub mod demo;
pub mod solsniffer;

use async_trait::async_trait;
use log::{ info, warn };
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Args;
use crate::config::field_map::ScanFieldMap;
use crate::error::RugError;
use crate::models::report::Report;
use self::demo::DemoReportSource;
use self::solsniffer::SolSnifferSource;

/// Producer of whole reports. Exactly one implementation is active for
/// the lifetime of the service; results from different sources are never
/// combined.
#[async_trait]
pub trait ReportSource: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, identifier: &str) -> Result<Report, RugError>;

    /// Asks the producer for a fresh evaluation instead of a cached one.
    async fn refresh(&self, identifier: &str) -> Result<Report, RugError> {
        self.analyze(identifier).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SolSniffer,
    Demo,
}

impl FromStr for SourceKind {
    type Err = RugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solsniffer" | "scan" => Ok(SourceKind::SolSniffer),
            "demo" | "mock" => Ok(SourceKind::Demo),
            other => Err(RugError::Config(format!("Unsupported report source: '{}'", other))),
        }
    }
}

pub fn create_report_source(
    args: &Args,
    field_map: ScanFieldMap
) -> Result<Arc<dyn ReportSource>, RugError> {
    match args.report_source.parse::<SourceKind>()? {
        SourceKind::SolSniffer => {
            if args.scan_api_key.trim().is_empty() {
                return Err(
                    RugError::Config(
                        "SCAN_API_KEY is required when REPORT_SOURCE=solsniffer".to_string()
                    )
                );
            }
            let source = SolSnifferSource::new(
                &args.scan_base_url,
                args.scan_api_key.clone(),
                field_map,
                Duration::from_secs(args.scan_timeout_secs)
            )?;
            info!("Report source: solsniffer at {}", args.scan_base_url);
            Ok(Arc::new(source))
        }
        SourceKind::Demo => {
            warn!("Report source: demo. Reports are randomly generated and labeled as non-authoritative.");
            Ok(Arc::new(DemoReportSource::new()))
        }
    }
}

/// Trims the identifier and rejects it when nothing is left.
pub fn validate_identifier(identifier: &str) -> Result<&str, RugError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(RugError::Validation("token address must not be empty".to_string()));
    }
    Ok(trimmed)
}

/// Stateless front door to the configured report source.
#[derive(Clone)]
pub struct ReportAggregator {
    source: Arc<dyn ReportSource>,
}

impl ReportAggregator {
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn analyze(&self, identifier: &str) -> Result<Report, RugError> {
        let identifier = validate_identifier(identifier)?;
        self.source.analyze(identifier).await
    }

    pub async fn refresh(&self, identifier: &str) -> Result<Report, RugError> {
        let identifier = validate_identifier(identifier)?;
        self.source.refresh(identifier).await
    }
}
