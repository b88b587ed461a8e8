//! HTTP edge of the service: authentication, conversations, generation
//! endpoints, document upload and request monitoring.

pub mod auth;
pub mod conversations;
pub mod error;
pub mod files;
pub mod generate;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppContext, AppState, Settings};
