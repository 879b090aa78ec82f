use std::path::Path;

use config::{Config, Environment, File};
use tracing::{debug, info};

use super::runtime::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Looked up in the working directory when no explicit path is given
/// (any extension the `config` crate understands, e.g. `loan-risk.toml`).
pub const DEFAULT_CONFIG_FILE: &str = "loan-risk";
pub const ENV_PREFIX: &str = "LOAN_RISK";

/// Load engine configuration.
///
/// Layers, lowest priority first: built-in defaults, the config file, then
/// `LOAN_RISK_*` environment variables (`LOAN_RISK_CACHE__MAX_SIZE=500`,
/// `LOAN_RISK_MODELS__WARM_UP=fraud-detector,credit-risk`). A `.env` file is
/// read first if present.
pub fn load_config(path: Option<&Path>) -> EngineResult<EngineConfig> {
    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {}", e);
    }

    let mut builder = Config::builder();
    builder = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            builder.add_source(File::from(path).required(true))
        }
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("models.warm_up"),
        )
        .build()
        .map_err(|e| EngineError::Config(e.to_string()))?;

    let config: EngineConfig = settings
        .try_deserialize()
        .map_err(|e| EngineError::Config(e.to_string()))?;

    config
        .validate()
        .map_err(|errors| EngineError::Config(errors.join(", ")))?;

    Ok(config)
}

impl EngineConfig {
    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))?;
        config
            .validate()
            .map_err(|errors| EngineError::Config(errors.join(", ")))?;
        Ok(config)
    }
}
