//! Factory for building the server state from configuration.

use std::sync::Arc;

use tracing::info;

use herald_core::error::HeraldResult;
use herald_core::{HeraldConfig, SqliteStore};
use herald_llm::LlmFactory;

use crate::state::AppState;

/// Load configuration from `HERALD_CONFIG` when set, else from the environment.
pub fn load_config() -> HeraldResult<HeraldConfig> {
    let config = match std::env::var("HERALD_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            HeraldConfig::from_file(path)?
        }
        Err(_) => HeraldConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

/// Open the database and the inference provider, then wire the state.
pub fn create_state(config: &HeraldConfig) -> HeraldResult<AppState> {
    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    info!(db_path = %config.db_path.display(), "Opened database");

    let llm = LlmFactory::from_provider_config(&config.llm)?;

    Ok(AppState::new(config, store, llm))
}
