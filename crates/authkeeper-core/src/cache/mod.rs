//! Session caching module.
//!
//! This module provides the `SessionCache`, which keeps the last-known
//! session state in memory and mirrors it to a `KeyValueStore` so a negative
//! answer survives a restart without another round trip.
//!
//! Next to the user and flag keys the cache records a `Confirmation`: when the
//! server last settled the session either way.

pub mod confirmed;
pub mod session;

pub use confirmed::Confirmation;
pub use session::SessionCache;
