//! Shared fundamentals for the depsolve resolution core.
//!
//! This crate provides the pieces every other crate in the workspace
//! depends on:
//! - The version comparator (spec.md §4.A)
//! - Error kinds and their exit-code mapping (spec.md §6, §7)
//! - An explicit `Context` replacing module-level global state (spec.md §9)
//! - The `EventSink` collaborator interface (spec.md §6)

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod context;
mod error;
mod event;
pub mod version;

pub use context::Context;
pub use error::{Error, ExitCode, Result};
pub use event::{Event, EventSink, MessageLevel, NullEventSink};
pub use version::{PkgVersion, cmp as version_cmp};

/// Global allocator, matching the teacher's performance-oriented default.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
