//! License key management.
//!
//! Keys are capability tokens granting bounded usage of the tunnel service.
//! The store owns all records; callers only ever receive copies. Revoked
//! keys are kept (never deleted) so the panel retains an audit trail for
//! the lifetime of the process.

mod error;
mod store;

pub use error::KeyError;
pub use store::{KeyStatus, KeyStore, LicenseKey, Validation, KEY_PREFIX};
