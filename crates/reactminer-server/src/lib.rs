//! ReactMiner server: batch CLI and HTTP API around the extraction pipeline.

pub mod cli;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
