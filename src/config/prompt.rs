use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use log::info;

use super::ConfigError;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a cryptocurrency expert advisor. Provide detailed analysis and insights about crypto tokens while maintaining a balanced and cautious perspective. Always include risk warnings and remind users about the volatile nature of cryptocurrency investments.";

pub const DEFAULT_FALLBACK_REPLY: &str =
    "I apologize, but I'm unable to provide advice at the moment. Please try again later.";

pub const DEFAULT_SELECTED_TOKEN_TEMPLATE: &str =
    "Please analyze this token: {name} ({symbol}) including its recent performance, market trends, and potential risks.";

pub const DEFAULT_REPORT_TEMPLATE: &str =
    "Please analyze this token: {name}. Include information about market cap, liquidity, and potential risks.";

pub const DEFAULT_DISCLAIMER: &str =
    "All cryptocurrency advice and analysis provided are for informational purposes only. Users are solely responsible for their investment decisions and any consequences thereof.";

/// Fixed wording used by the advisory session. Every field can be
/// overridden from a JSON file; missing fields keep their defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub system_instruction: String,
    pub fallback_reply: String,
    /// Used when a coin is picked from the trending list. Placeholders: `{name}`, `{symbol}`.
    pub selected_token_template: String,
    /// Used for a typed address once its report is shown. Placeholder: `{name}`.
    pub report_template: String,
    pub quick_questions: Vec<String>,
    pub disclaimer: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            selected_token_template: DEFAULT_SELECTED_TOKEN_TEMPLATE.to_string(),
            report_template: DEFAULT_REPORT_TEMPLATE.to_string(),
            quick_questions: vec![
                "What makes a token safe?".to_string(),
                "How to spot a rug pull?".to_string(),
                "Latest market trends".to_string(),
                "Top safe tokens".to_string()
            ],
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.system_instruction.trim().is_empty() {
            return Err(ConfigError::Invalid("system_instruction must not be empty".to_string()));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_reply must not be empty".to_string()));
        }
        if !self.selected_token_template.contains("{name}") {
            return Err(
                ConfigError::Invalid("selected_token_template must contain {name}".to_string())
            );
        }
        if !self.report_template.contains("{name}") {
            return Err(ConfigError::Invalid("report_template must contain {name}".to_string()));
        }
        Ok(())
    }

    /// The symbol is upper-cased the same way the trending list displays it.
    pub fn selected_token_prompt(&self, name: &str, symbol: &str) -> String {
        self.selected_token_template
            .replace("{name}", name)
            .replace("{symbol}", &symbol.to_uppercase())
    }

    pub fn report_prompt(&self, name: &str) -> String {
        self.report_template.replace("{name}", name)
    }
}

pub fn load_prompts_from_str(json_str: &str) -> Result<Arc<PromptConfig>, ConfigError> {
    let config: PromptConfig = serde_json::from_str(json_str)?;
    config.validate()?;
    Ok(Arc::new(config))
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, ConfigError> {
    match path {
        Some(path) => {
            info!("Loading prompt overrides from: {}", path);
            let json_str = fs::read_to_string(path)?;
            load_prompts_from_str(&json_str)
        }
        None => {
            info!("Using built-in prompts");
            Ok(Arc::new(PromptConfig::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_token_prompt_matches_expected_text() {
        let prompts = PromptConfig::default();
        assert_eq!(
            prompts.selected_token_prompt("Dogecoin", "doge"),
            "Please analyze this token: Dogecoin (DOGE) including its recent performance, market trends, and potential risks."
        );
    }

    #[test]
    fn report_prompt_interpolates_name() {
        let prompts = PromptConfig::default();
        assert_eq!(
            prompts.report_prompt("So11111111111111111111111111111111111111112"),
            "Please analyze this token: So11111111111111111111111111111111111111112. Include information about market cap, liquidity, and potential risks."
        );
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let prompts = load_prompts_from_str(r#"{"fallback_reply": "Try again soon."}"#).unwrap();
        assert_eq!(prompts.fallback_reply, "Try again soon.");
        assert_eq!(prompts.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
        assert_eq!(prompts.quick_questions.len(), 4);
    }

    #[test]
    fn template_without_name_is_rejected() {
        let err = load_prompts_from_str(r#"{"report_template": "Analyze it"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
