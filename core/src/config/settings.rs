use super::GatewayConfig;
use crate::Result;
use config::{Config, Environment};

impl GatewayConfig {
    /// Load configuration from `GATEMQ_*` environment variables
    ///
    /// Unset variables fall back to the struct defaults, so an empty
    /// environment yields a working local-development configuration.
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix("GATEMQ").try_parsing(true))
            .build()
            .map_err(|e| crate::GatemqError::Config(e.to_string()))?;

        let config = settings
            .try_deserialize::<GatewayConfig>()
            .map_err(|e| crate::GatemqError::Config(e.to_string()))?;

        Ok(config)
    }
}
