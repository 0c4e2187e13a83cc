//! Runtime adapters (timer facility) and API surface.

pub mod api;
pub mod tokio_timer;

pub use api::{
    get_balances, get_build, health, list_user_builds, start_build, BalanceResponse,
    BuildResponse, Health, StartBuildRequest,
};
pub use tokio_timer::TokioTicker;
