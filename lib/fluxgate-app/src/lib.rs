//! Process-level helpers for hosts embedding the datastore.
//!
//! Nothing in this workspace depends on this crate. It is meant for the host process that owns a
//! `fluxgate_datastore::MetricWriter`, which calls [`logging::initialize_logging`] once at startup so that the
//! datastore's `tracing` output goes somewhere.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod logging;

/// Common imports.
pub mod prelude {
    pub use super::logging::initialize_logging;
}
