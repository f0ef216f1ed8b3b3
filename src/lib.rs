pub mod archive;
pub mod auth;
pub mod cancel;
pub mod config;
pub mod drive;
pub mod model;
pub mod prompt;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_support;

pub use archive::{archive, effective_query, fetch_matching, run, Outcome};
pub use auth::{acquire, AuthError};
pub use cancel::{cancel_on_interrupt, CancelToken, Cancelled};
pub use config::{Config, FlowOptions};
pub use drive::{ApiError, Drive, PhotoStore};
pub use model::logical::{Page, Photo};
pub use session::Session;
