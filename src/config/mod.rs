#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::cnb::{CnbRates, DEFAULT_CNB_URL};
use crate::core::currency::FixedRates;
use crate::core::flyers::{DemoFlyers, NoFlyers};
use crate::domain::model::Currency;
use crate::domain::ports::{FlyerLookup, RateProvider};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{
    validate_optional_url, validate_path, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "issuecoin.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub n8n: N8nConfig,
    pub budget: BudgetConfig,
    pub location: LocationConfig,
    pub google: GoogleConfig,
    pub rates: RatesConfig,
    pub flyers: FlyersConfig,
    pub plan: PlanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

/// Webhook URLs; an empty string means the workflow is not wired up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct N8nConfig {
    pub webhook_url: String,
    pub ocr_url: String,
    pub deals_url: String,
    pub mcp_url: String,
    pub stt_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub monthly_czk: u32,
    pub daily_target_czk: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub address: String,
    pub preferred_stores: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub sheets_enabled: bool,
    pub spreadsheet_id: Option<String>,
    pub drive_folder_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    #[default]
    Cnb,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub source: RateSource,
    pub cnb_url: String,
    /// CZK per unit keyed by currency code, used directly for `fixed`
    /// and as fallback for `cnb`.
    pub fixed: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyersConfig {
    pub demo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Keys from the file are layered over the default restrictions.
    #[serde(deserialize_with = "merge_restrictions")]
    pub restrictions: BTreeMap<String, bool>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            ocr_url: String::new(),
            deals_url: String::new(),
            mcp_url: String::new(),
            stt_url: String::new(),
            timeout_seconds: 60,
        }
    }
}

impl BudgetConfig {
    /// Command-line overrides, held to the same ranges as the file.
    pub fn with_overrides(&self, monthly: Option<u32>, daily: Option<u32>) -> Result<Self> {
        let budget = Self {
            monthly_czk: monthly.unwrap_or(self.monthly_czk),
            daily_target_czk: daily.unwrap_or(self.daily_target_czk),
        };
        budget.validate_ranges()?;
        Ok(budget)
    }

    fn validate_ranges(&self) -> Result<()> {
        validate_range("budget.monthly_czk", self.monthly_czk, 1000, 20000)?;
        validate_range("budget.daily_target_czk", self.daily_target_czk, 60, 180)
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            monthly_czk: 7000,
            daily_target_czk: 120,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            address: "Pod Terebkou 15/4, Praha".to_string(),
            preferred_stores: ["Albert", "Penny", "Lidl", "Tesco", "DM", "Rossmann"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            source: RateSource::Cnb,
            cnb_url: DEFAULT_CNB_URL.to_string(),
            fixed: BTreeMap::new(),
        }
    }
}

impl Default for FlyersConfig {
    fn default() -> Self {
        Self { demo: true }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        let restrictions = [
            "no_sour_raw",
            "mustard_cooked_only",
            "no_mayo_tartar",
            "mild_spicy_ok",
        ]
        .iter()
        .map(|k| (k.to_string(), true))
        .collect();
        Self { restrictions }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then the process environment.
    ///
    /// An explicitly requested file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TrackerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TrackerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Apply the environment variables the deployment sets.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value.trim().to_string();
            }
        };

        set(&mut self.storage.data_dir, "DATA_DIR");
        set(&mut self.n8n.webhook_url, "N8N_WEBHOOK_URL");
        set(&mut self.n8n.ocr_url, "N8N_WEBHOOK_OCR");
        set(&mut self.n8n.deals_url, "N8N_WEBHOOK_DEALS");
        set(&mut self.n8n.mcp_url, "N8N_WEBHOOK_MCP");
        set(&mut self.n8n.stt_url, "N8N_WEBHOOK_STT");
        set(&mut self.location.address, "LOCATION_ADDRESS");

        if let Some(value) = lookup("N8N_TIMEOUT_SECONDS") {
            self.n8n.timeout_seconds = parse_env("N8N_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("BUDGET_MONTHLY_CZK") {
            self.budget.monthly_czk = parse_env("BUDGET_MONTHLY_CZK", &value)?;
        }
        if let Some(value) = lookup("BUDGET_DAILY_CZK") {
            self.budget.daily_target_czk = parse_env("BUDGET_DAILY_CZK", &value)?;
        }
        if let Some(value) = lookup("PREFERRED_STORES") {
            self.location.preferred_stores = serde_json::from_str(&value).map_err(|e| {
                TrackerError::InvalidConfigValueError {
                    field: "PREFERRED_STORES".to_string(),
                    value: value.clone(),
                    reason: format!("expected a JSON array of store names: {}", e),
                }
            })?;
        }
        if let Some(value) = lookup("GSPREAD_ENABLED") {
            self.google.sheets_enabled = value.trim().eq_ignore_ascii_case("true");
        }
        if let Some(value) = lookup("GSHEETS_SPREADSHEET") {
            self.google.spreadsheet_id = non_empty(value);
        }
        if let Some(value) = lookup("GDRIVE_FOLDER_ID") {
            self.google.drive_folder_id = non_empty(value);
        }
        if let Some(value) = lookup("RATES_SOURCE") {
            self.rates.source = match value.trim().to_ascii_lowercase().as_str() {
                "cnb" => RateSource::Cnb,
                "fixed" => RateSource::Fixed,
                _ => {
                    return Err(TrackerError::InvalidConfigValueError {
                        field: "RATES_SOURCE".to_string(),
                        value,
                        reason: "expected 'cnb' or 'fixed'".to_string(),
                    })
                }
            };
        }

        Ok(())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("storage.data_dir", &self.storage.data_dir)?;

        validate_optional_url("n8n.webhook_url", &self.n8n.webhook_url)?;
        validate_optional_url("n8n.ocr_url", &self.n8n.ocr_url)?;
        validate_optional_url("n8n.deals_url", &self.n8n.deals_url)?;
        validate_optional_url("n8n.mcp_url", &self.n8n.mcp_url)?;
        validate_optional_url("n8n.stt_url", &self.n8n.stt_url)?;
        validate_positive_number("n8n.timeout_seconds", self.n8n.timeout_seconds, 1)?;

        self.budget.validate_ranges()?;

        if self.google.sheets_enabled {
            validate_required_field("google.spreadsheet_id", &self.google.spreadsheet_id)?;
        }

        if self.rates.source == RateSource::Cnb {
            validate_url("rates.cnb_url", &self.rates.cnb_url)?;
        }
        for (currency, rate) in &self.rates.fixed {
            currency
                .parse::<Currency>()
                .map_err(|_| TrackerError::InvalidConfigValueError {
                    field: "rates.fixed".to_string(),
                    value: currency.clone(),
                    reason: "expected EUR or PLN".to_string(),
                })?;
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(TrackerError::InvalidConfigValueError {
                    field: format!("rates.fixed.{}", currency),
                    value: rate.to_string(),
                    reason: "rate must be a positive number".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Unknown currency codes are rejected by validation and skipped here.
    pub fn fixed_rates(&self) -> FixedRates {
        let rates: HashMap<Currency, f64> = self
            .rates
            .fixed
            .iter()
            .filter_map(|(code, rate)| code.parse().ok().map(|c| (c, *rate)))
            .collect();
        FixedRates::new(rates)
    }

    pub fn rate_provider(&self) -> Box<dyn RateProvider> {
        match self.rates.source {
            RateSource::Cnb => Box::new(CnbRates::new(
                self.rates.cnb_url.clone(),
                self.fixed_rates(),
            )),
            RateSource::Fixed => Box::new(self.fixed_rates()),
        }
    }

    pub fn flyer_lookup(&self) -> Box<dyn FlyerLookup> {
        if self.flyers.demo {
            Box::new(DemoFlyers)
        } else {
            Box::new(NoFlyers)
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

fn merge_restrictions<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = BTreeMap::<String, bool>::deserialize(deserializer)?;
    let mut restrictions = PlanConfig::default().restrictions;
    restrictions.extend(overrides);
    Ok(restrictions)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TrackerError::InvalidConfigValueError {
            field: key.to_string(),
            value: value.to_string(),
            reason: "not a valid number".to_string(),
        })
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
