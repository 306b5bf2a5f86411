//! Testing utilities shared by unit and integration tests
//!
//! - [`fixtures`] - key material, profiles, claims and settings
//! - [`mock`] - in-memory identity provider and scripted OAuth client
//!
//! Integration tests reach this module through the `testing` feature.

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{InMemoryIdentityProvider, MockOAuthClient};
