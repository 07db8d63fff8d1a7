use crate::core::fetch::{Backoff, FetchBudget};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FundEntry {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| &p.base_url)
    }
}

/// Fetch limits as written in the config file, in milliseconds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(FetchBudget::default())
    }
}

impl From<FetchBudget> for FetchConfig {
    fn from(budget: FetchBudget) -> Self {
        FetchConfig {
            request_timeout_ms: budget.request_timeout.as_millis() as u64,
            max_retries: budget.max_retries,
            max_concurrency: budget.max_concurrency,
            base_delay_ms: budget.backoff.base.as_millis() as u64,
            max_delay_ms: budget.backoff.max.as_millis() as u64,
            deadline_ms: budget.deadline.map(|d| d.as_millis() as u64),
        }
    }
}

impl From<&FetchConfig> for FetchBudget {
    fn from(config: &FetchConfig) -> Self {
        FetchBudget {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_retries: config.max_retries,
            max_concurrency: config.max_concurrency,
            backoff: Backoff {
                base: Duration::from_millis(config.base_delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
            },
            deadline: config.deadline_ms.map(Duration::from_millis),
        }
    }
}

fn default_lookback_days() -> u32 {
    730
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub funds: Vec<FundEntry>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// How far back `performance` asks for history.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl AppConfig {
    /// The file named on the command line, or the platform default.
    pub fn resolve_path(config_path: Option<&str>) -> Result<PathBuf> {
        match config_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                debug!("Using default config location");
                Self::default_config_path()
            }
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fundtrack", "fundtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Writes the configuration back as YAML. Comments in the original file
    /// are not preserved.
    pub fn save_to_path<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let config_str =
            serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        fs::write(path.as_ref(), config_str)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        debug!("Saved config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn fetch_budget(&self) -> FetchBudget {
        FetchBudget::from(&self.fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
funds:
  - symbol: "FXAIX"
    name: "S&P 500 index"
  - symbol: "AAPL"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
fetch:
  request_timeout_ms: 2500
  max_retries: 1
  max_concurrency: 2
  base_delay_ms: 100
  max_delay_ms: 800
  deadline_ms: 30000
lookback_days: 365
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.funds.len(), 2);
        assert_eq!(
            config.funds[0],
            FundEntry {
                symbol: "FXAIX".to_string(),
                name: Some("S&P 500 index".to_string()),
            }
        );
        assert_eq!(config.funds[1].name, None);
        assert_eq!(config.providers.yahoo_base_url(), "http://example.com/yahoo");
        assert_eq!(config.lookback_days, 365);

        let budget = config.fetch_budget();
        assert_eq!(budget.request_timeout, Duration::from_millis(2500));
        assert_eq!(budget.max_retries, 1);
        assert_eq!(budget.max_concurrency, 2);
        assert_eq!(budget.backoff.base, Duration::from_millis(100));
        assert_eq!(budget.backoff.max, Duration::from_millis(800));
        assert_eq!(budget.deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = serde_yaml::from_str("funds: []\n").unwrap();
        assert!(config.funds.is_empty());
        assert_eq!(
            config.providers.yahoo_base_url(),
            "https://query1.finance.yahoo.com"
        );
        assert_eq!(config.lookback_days, 730);
        assert_eq!(config.fetch_budget(), FetchBudget::default());

        let partial: AppConfig = serde_yaml::from_str("fetch:\n  max_retries: 0\n").unwrap();
        assert_eq!(partial.fetch.max_retries, 0);
        assert_eq!(partial.fetch.request_timeout_ms, 10_000);
        assert_eq!(partial.fetch.deadline_ms, None);
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "funds:\n  - symbol: VTSAX")?;
        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.funds[0].symbol, "VTSAX");

        let err = AppConfig::load_from_path("/nonexistent/fundtrack.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
        Ok(())
    }

    #[test]
    fn test_save_round_trips_funds() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        let mut config: AppConfig = serde_yaml::from_str("funds: []\nlookback_days: 90\n")?;
        config.funds.push(FundEntry {
            symbol: "FXAIX".to_string(),
            name: Some("Index".to_string()),
        });
        config.funds.push(FundEntry {
            symbol: "AAPL".to_string(),
            name: None,
        });

        config.save_to_path(&path)?;
        let saved = fs::read_to_string(&path)?;
        assert!(!saved.contains("null"), "{saved}");

        let reloaded = AppConfig::load_from_path(&path)?;
        assert_eq!(reloaded.funds, config.funds);
        assert_eq!(reloaded.lookback_days, 90);
        assert_eq!(reloaded.fetch, config.fetch);
        Ok(())
    }

    #[test]
    fn test_resolve_path_prefers_explicit_file() -> Result<()> {
        assert_eq!(
            AppConfig::resolve_path(Some("/tmp/custom.yaml"))?,
            PathBuf::from("/tmp/custom.yaml")
        );
        Ok(())
    }
}
