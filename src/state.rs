//! Application state: collaborator handles plus prompts and tuning.
//!
//! Nothing here is request-scoped. The current question, attempt counter and
//! learner identity always travel as explicit parameters.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_agent_config_from_env, AgentConfig, Prompts, Settings, Tuning};
use crate::error::CoreError;
use crate::executor::{Executor, Piston};
use crate::oracle::{ChatOracle, Oracle};
use crate::store::{MemoryStore, Store, SupabaseStore};

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn Executor>,
    pub oracle: Option<Arc<dyn Oracle>>,
    pub store: Arc<dyn Store>,
    pub prompts: Prompts,
    pub tuning: Tuning,
}

impl AppState {
    pub fn new(
        executor: Arc<dyn Executor>,
        oracle: Option<Arc<dyn Oracle>>,
        store: Arc<dyn Store>,
        config: AgentConfig,
    ) -> Self {
        Self {
            executor,
            oracle,
            store,
            prompts: config.prompts,
            tuning: config.tuning,
        }
    }

    /// Build state from env: load TOML config, then wire executor, oracle and store.
    #[instrument(level = "info", skip_all)]
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let config = load_agent_config_from_env().unwrap_or_default();

        let executor = Piston::new(&settings.piston_url, settings.execution_timeout)?;
        info!(target: "codeforge", url = %executor.url, "Execution service configured.");

        let oracle: Option<Arc<dyn Oracle>> = match &settings.oracle {
            Some(cfg) => {
                let oa = ChatOracle::new(cfg)?;
                info!(target: "codeforge", base_url = %oa.base_url, model = %oa.model, "Oracle enabled.");
                Some(Arc::new(oa))
            }
            None => {
                warn!(target: "codeforge", "Oracle disabled (no ORACLE_API_KEY). Analysis and generation will fail.");
                None
            }
        };

        let store: Arc<dyn Store> = match &settings.supabase {
            Some(cfg) => {
                info!(target: "codeforge", url = %cfg.url, "Using Supabase store.");
                Arc::new(SupabaseStore::new(cfg)?)
            }
            None => {
                warn!(target: "codeforge", "No SUPABASE_URL/SUPABASE_KEY; using in-memory store (data is lost on restart).");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::new(Arc::new(executor), oracle, store, config))
    }

    pub fn oracle(&self) -> Result<&dyn Oracle, CoreError> {
        self.oracle
            .as_deref()
            .ok_or_else(|| CoreError::OracleUnavailable("no oracle configured".into()))
    }
}
