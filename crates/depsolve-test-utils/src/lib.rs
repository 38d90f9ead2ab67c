//! Shared test fixtures for the workspace.
//!
//! Every crate in this workspace hand-rolled its own minimal `PackageStore`/
//! `EventSink` stub inline under `#[cfg(test)]`; this crate collects the
//! fuller, reusable versions so integration tests spanning several crates
//! (the orchestrator's end-to-end scenarios, in particular) don't each
//! re-derive the same bookkeeping.
//!
//! # Modules
//!
//! - [`store`]: an in-memory `PackageStore` backed by `Mutex<Vec<Arc<Package>>>`
//! - [`fetch`]: a no-op `FetchTransport`
//! - [`sink`]: an `EventSink` that records every event it receives
//! - [`fixtures`]: pre-built package sets for common resolution scenarios
//! - [`assertions`]: domain-specific assertion helpers
//! - [`proptest_strategies`]: `PkgVersion`-shaped string generators

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod fetch;
pub mod fixtures;
pub mod proptest_strategies;
pub mod sink;
pub mod store;

/// Re-export of the pieces most integration tests reach for.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fetch::NullFetchTransport;
    pub use crate::fixtures;
    pub use crate::sink::RecordingEventSink;
    pub use crate::store::MemoryStore;

    // Re-export common testing crates, matching the teacher's prelude.
    pub use insta::{assert_debug_snapshot, assert_snapshot};
    pub use pretty_assertions::{assert_eq, assert_ne};
    pub use proptest::prelude::*;
}
