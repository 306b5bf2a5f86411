pub mod crypto;
pub mod logging;
pub mod recovery;
pub mod responses;
