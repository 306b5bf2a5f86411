//! Application services sitting between the HTTP handlers and the external clients

pub mod credentials;
pub mod federation;

pub use credentials::{CredentialError, CredentialService};
pub use federation::{FederationError, FederationService};
