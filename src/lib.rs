#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authbridge application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod oauth;
pub mod profiles;
pub mod service;
pub mod settings;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use app::AppServices;
pub use error::ApiError;
pub use models::{AuthResult, Identity, Profile};
pub use profiles::ProfileDirectory;
pub use settings::AuthBridgeSettings;
