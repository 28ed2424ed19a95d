use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::simulate::SimulationDriver;
use crate::store::{SecurityDataStore, SharedStore};

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub driver: Arc<SimulationDriver>,
}

impl AppState {
    pub fn new(settings: SimulationConfig) -> Self {
        let store = SecurityDataStore::shared();
        let driver = Arc::new(SimulationDriver::new(store.clone(), settings));
        Self { store, driver }
    }

    /// State whose driver draws from a fixed seed.
    pub fn seeded(settings: SimulationConfig, seed: u64) -> Self {
        let store = SecurityDataStore::shared();
        let driver = Arc::new(SimulationDriver::with_seed(store.clone(), settings, seed));
        Self { store, driver }
    }
}
