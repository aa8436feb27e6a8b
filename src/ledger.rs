//! Weakness ledger: per-learner weakness list, read and replaced as a whole.
//!
//! Resolve/retain/add decisions are made by the oracle during analysis; the
//! ledger stores whatever sequence it is handed, including an empty one.

use tracing::{info, instrument};

use crate::error::StoreError;
use crate::store::Store;

pub struct WeaknessLedger<'a> {
  store: &'a dyn Store,
}

impl<'a> WeaknessLedger<'a> {
  pub fn new(store: &'a dyn Store) -> Self {
    Self { store }
  }

  /// Current weaknesses, empty for a learner with no row yet.
  #[instrument(level = "debug", skip(self), fields(%learner_id))]
  pub async fn get(&self, learner_id: &str) -> Result<Vec<String>, StoreError> {
    Ok(self.store.get_weaknesses(learner_id).await?.unwrap_or_default())
  }

  #[instrument(level = "info", skip(self, weaknesses), fields(%learner_id, count = weaknesses.len()))]
  pub async fn replace(&self, learner_id: &str, weaknesses: &[String]) -> Result<(), StoreError> {
    self.store.replace_weaknesses(learner_id, weaknesses).await?;
    info!(target: "ledger", %learner_id, count = weaknesses.len(), "Weaknesses replaced");
    Ok(())
  }
}
