//! HTTP ingress and process wiring: environment-driven `Config`, the
//! axum `Router` carrying ingress routes, and the `AppState` shared
//! between them and the three stage workers.

pub mod config;
pub mod errors;
pub mod routes;
pub mod state;

pub use config::Config;
pub use errors::AppError;
pub use routes::create_router;
pub use state::AppState;
