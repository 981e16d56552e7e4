//! Error types for the Ferry guest-memory boundary.
//!
//! Organized by subsystem: arena planning and memory access, guest
//! invocation, and asset retrieval. Every error here is terminal for the
//! batch that raised it; nothing is retried internally.

use std::error::Error;
use std::fmt;

use crate::id::{MemoryGeneration, SlotId};

/// Errors from layout planning, memory growth and slot access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A slot was declared, or the arena committed, after it had
    /// already been committed.
    CapacityPlanning {
        /// The operation that was attempted.
        operation: &'static str,
    },
    /// A byte range fell outside the slot, view or memory it addressed.
    /// No memory was touched.
    OutOfBounds {
        /// Start of the requested range, relative to the region.
        offset: usize,
        /// Length of the requested range in bytes.
        len: usize,
        /// Size of the region in bytes.
        limit: usize,
    },
    /// The guest memory could not be grown to the required size.
    GrowthFailure {
        /// Bytes the memory needed to hold.
        requested: usize,
        /// Bytes the memory held when growth failed.
        capacity: usize,
        /// Why the growth was refused.
        reason: String,
    },
    /// The layout does not fit in a 32-bit guest address space.
    AddressSpaceExhausted {
        /// End address (exclusive) the layout would have needed.
        requested: u64,
    },
    /// A slot declaration was malformed (bad width or alignment).
    InvalidSlot {
        /// Description of the problem.
        reason: String,
    },
    /// A scalar of the wrong width was read from or written to a slot.
    WidthMismatch {
        /// Element width of the slot in bytes.
        expected: u32,
        /// Width of the requested scalar type in bytes.
        actual: u32,
    },
    /// A slot descriptor that does not belong to this layout.
    UnknownSlot {
        /// The unrecognised slot.
        slot: SlotId,
    },
    /// A result view was read after the memory it points into had grown.
    StaleView {
        /// Generation captured when the view was built.
        captured: MemoryGeneration,
        /// Generation of the memory now.
        current: MemoryGeneration,
    },
    /// Arena configuration is invalid.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityPlanning { operation } => {
                write!(f, "{operation} called after the layout was committed")
            }
            Self::OutOfBounds { offset, len, limit } => {
                write!(
                    f,
                    "access out of bounds: {len} bytes at offset {offset}, region is {limit} bytes"
                )
            }
            Self::GrowthFailure {
                requested,
                capacity,
                reason,
            } => {
                write!(
                    f,
                    "cannot grow guest memory from {capacity} to {requested} bytes: {reason}"
                )
            }
            Self::AddressSpaceExhausted { requested } => {
                write!(f, "layout needs {requested} bytes, beyond the 32-bit address space")
            }
            Self::InvalidSlot { reason } => write!(f, "invalid slot: {reason}"),
            Self::WidthMismatch { expected, actual } => {
                write!(
                    f,
                    "scalar width mismatch: slot holds {expected}-byte elements, got {actual}-byte type"
                )
            }
            Self::UnknownSlot { slot } => write!(f, "slot {slot} is not part of this layout"),
            Self::StaleView { captured, current } => {
                write!(
                    f,
                    "stale view: built at memory generation {captured}, memory is now at {current}"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}

/// Errors from instantiating or calling into a guest module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuestError {
    /// The module failed to compile or instantiate.
    Instantiation {
        /// Description of the failure, including its context chain.
        reason: String,
    },
    /// A required export is absent or has the wrong kind.
    MissingExport {
        /// Name of the export.
        name: String,
    },
    /// The number of arguments does not match the export's signature.
    SignatureMismatch {
        /// Name of the export.
        export: String,
        /// Parameters the export declares.
        expected: usize,
        /// Arguments supplied after flattening.
        actual: usize,
    },
    /// The export's results do not match what the call expects.
    ResultMismatch {
        /// Name of the export.
        export: String,
        /// Results the call expects.
        expected: usize,
        /// Results the export declares.
        actual: usize,
    },
    /// A parameter or result of the export is not an `i32`.
    TypeMismatch {
        /// Name of the export.
        export: String,
        /// `"parameter"` or `"result"`.
        position: &'static str,
        /// Index of the offending parameter or result.
        index: usize,
        /// The declared type.
        found: String,
    },
    /// The guest trapped or otherwise faulted during a call. The
    /// instance is poisoned afterwards.
    GuestTrap {
        /// The export that was running.
        export: String,
        /// Trap description reported by the runtime.
        reason: String,
    },
    /// The instance faulted earlier and must not be used again.
    Poisoned {
        /// The export whose fault poisoned the instance.
        export: String,
    },
    /// The guest returned the null address where a result was expected.
    NullResult {
        /// The export that returned null.
        export: String,
    },
    /// An arena or memory operation failed while preparing or reading
    /// a guest call.
    Arena(ArenaError),
}

impl fmt::Display for GuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instantiation { reason } => write!(f, "guest instantiation failed: {reason}"),
            Self::MissingExport { name } => write!(f, "guest export '{name}' not found"),
            Self::SignatureMismatch {
                export,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "guest export '{export}' takes {expected} arguments, {actual} supplied"
                )
            }
            Self::ResultMismatch {
                export,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "guest export '{export}' returns {actual} values, expected {expected}"
                )
            }
            Self::TypeMismatch {
                export,
                position,
                index,
                found,
            } => {
                write!(
                    f,
                    "guest export '{export}' {position} {index} is {found}, expected i32"
                )
            }
            Self::GuestTrap { export, reason } => {
                write!(f, "guest trapped in '{export}': {reason}")
            }
            Self::Poisoned { export } => {
                write!(f, "guest instance poisoned by an earlier fault in '{export}'")
            }
            Self::NullResult { export } => {
                write!(f, "guest export '{export}' returned a null address")
            }
            Self::Arena(e) => write!(f, "{e}"),
        }
    }
}

impl Error for GuestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for GuestError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

/// Errors from fetching the module binary or the encoded input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetError {
    /// The asset does not exist.
    NotFound {
        /// Name the asset was requested under.
        name: String,
    },
    /// The asset exists but could not be retrieved.
    Transport {
        /// Name the asset was requested under.
        name: String,
        /// Description of the transport failure.
        reason: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "asset '{name}' not found"),
            Self::Transport { name, reason } => {
                write!(f, "failed to fetch asset '{name}': {reason}")
            }
        }
    }
}

impl Error for AssetError {}
