pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use avifpress_core::Config;
use avifpress_services::SweeperHandle;
use axum::Router;

use crate::state::AppState;

/// Build the shared state, start the session sweeper, and assemble the
/// router. The sweeper stops when the returned handle is dropped.
pub fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router, SweeperHandle), anyhow::Error> {
    let state = AppState::new(config);
    let sweeper = state
        .sessions
        .start_sweeper(Duration::from_secs(state.config.sweep_interval_secs));
    let router = routes::build_router(&state.config, state.clone())?;
    Ok((state, router, sweeper))
}
