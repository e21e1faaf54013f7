//! IONOS Core
//!
//! Provider-agnostic building blocks of the IONOS Cloud provider: the
//! resource model, attribute schemas, data-source filtering and the
//! readiness poller used after every mutating API call.

pub mod filter;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod wait;
