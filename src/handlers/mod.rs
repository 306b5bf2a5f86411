// HTTP request handlers
pub mod credentials;
pub mod federated;
pub mod static_files;

// Re-export the main handler functions
pub use credentials::{sign_in, sign_up};
pub use federated::{google_callback, google_sign_in};
pub use static_files::{home, list_users};
