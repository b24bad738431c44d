// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{AttemptRecorder, AvailabilityResolver, QuizScheduler},
    store::{AttemptLedger, QuizAuthoring, QuizCatalog},
    utils::clock::Clock,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub resolver: AvailabilityResolver,
    pub recorder: AttemptRecorder,
    pub scheduler: QuizScheduler,
}

impl AppState {
    /// Wires the engine services over one backing store.
    pub fn new<S>(config: Config, store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: QuizCatalog + AttemptLedger + QuizAuthoring + 'static,
    {
        let resolver = AvailabilityResolver::new(store.clone(), config.cohorts.clone(), clock.clone());
        let recorder = AttemptRecorder::new(store.clone(), store.clone(), clock, config.lock_timeout);
        let scheduler = QuizScheduler::new(store.clone(), store);

        Self {
            config,
            resolver,
            recorder,
            scheduler,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AvailabilityResolver {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

impl FromRef<AppState> for AttemptRecorder {
    fn from_ref(state: &AppState) -> Self {
        state.recorder.clone()
    }
}

impl FromRef<AppState> for QuizScheduler {
    fn from_ref(state: &AppState) -> Self {
        state.scheduler.clone()
    }
}
