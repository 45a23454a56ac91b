//! Services for the phishguard page classifier.
//!
//! Provides the inference worker lifecycle ([`worker`]) and the request
//! router that callers use to obtain one verdict per request
//! ([`router`]).

pub mod router;
pub mod worker;
