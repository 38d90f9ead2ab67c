//! Error kinds for the resolution core and their exit-code mapping.
//!
//! Each variant corresponds to a row of spec.md §7; `Error::exit_code`
//! deterministically maps every variant onto one of the exit codes the
//! orchestrator surfaces to callers (spec.md §6).

use thiserror::Error;

/// Exit codes surfaced to callers by the orchestrator, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    End = 1,
    Warn = 2,
    Fatal = 3,
    RequiredBy = 4,
    Installed = 5,
    Locked = 6,
    Conflict = 7,
    NotInstalled = 8,
    Cancel = 9,
    UpToDate = 10,
    Vulnerable = 11,
    Dependency = 12,
    SchemaTooOld = 13,
    SchemaTooNew = 14,
    EnoAccess = 15,
    Again = 16,
    NotFound = 17,
}

impl ExitCode {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Errors produced by the resolution core.
#[derive(Debug, Error)]
pub enum Error {
    /// A version or uid string failed to parse.
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    /// A uid or package name was syntactically invalid.
    #[error("invalid package identifier: {input}")]
    InvalidUid { input: String },

    /// Digest could not be computed for a package being added to the universe.
    #[error("failed to compute digest for {uid}: {reason}")]
    DigestFailed { uid: String, reason: String },

    /// The named package is locked and cannot be the new side of an
    /// install/upgrade, or a locked rdep blocks a delete request.
    #[error("{uid} is locked")]
    Locked { uid: String },

    /// A dependency target has no candidate in the universe and
    /// `force_missing` was not set.
    #[error("{uid} has missing dependency {dep}")]
    MissingDep { uid: String, dep: String },

    /// Conflict discovery found path/direct collisions after the retry
    /// budget for re-solving was exhausted.
    #[error("{count} unresolved package conflict(s)")]
    Conflict { count: usize },

    /// The SAT instance was unsatisfiable after exhausting the retry budget.
    #[error("request is unsatisfiable after {attempts} attempt(s)")]
    SatUnsat { attempts: u32 },

    /// The scheduler found a dependency cycle with no upgrade job on it to
    /// split.
    #[error("dependency cycle contains no upgrade job to split")]
    ChainCycle,

    /// A package's metadata could not be loaded/parsed and was dropped from
    /// the universe.
    #[error("corrupt package {uid}: {reason}")]
    CorruptPackage { uid: String, reason: String },

    /// A progress callback requested cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// The solver produced an assignment violating the single-install-per-chain
    /// invariant; this indicates an encoder bug, not a bad request.
    #[error("solver internal error: {0}")]
    SolverInternal(String),

    /// More than one new package from the same uid chain was selected for
    /// install in a single solve.
    #[error("more than one package to install from uid {uid}")]
    AmbiguousInstall { uid: String },

    /// A collaborator (persistent store / fetch transport) reported failure.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl Error {
    /// Map this error onto the exit code the orchestrator should surface.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Locked { .. } => ExitCode::Locked,
            Self::MissingDep { .. } => ExitCode::Dependency,
            Self::Conflict { .. } => ExitCode::Conflict,
            Self::Cancelled => ExitCode::Cancel,
            Self::SatUnsat { .. } | Self::ChainCycle => ExitCode::Fatal,
            Self::InvalidVersion { .. }
            | Self::InvalidUid { .. }
            | Self::DigestFailed { .. }
            | Self::CorruptPackage { .. }
            | Self::SolverInternal(_)
            | Self::AmbiguousInstall { .. }
            | Self::Collaborator(_) => ExitCode::Fatal,
        }
    }
}

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
