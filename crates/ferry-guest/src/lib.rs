//! Wasmtime-backed guest instances and the typed call adapter.
//!
//! A [`GuestInstance`] compiles and instantiates one guest module, lends
//! out its linear memory as an [`InstanceMemory`] for arena work, and
//! calls its exports with [`CallArg`]s built from typed handles.
//!
//! A trap in any call poisons the instance: every later call or memory
//! borrow fails with [`GuestError::Poisoned`](ferry_core::GuestError::Poisoned).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod call;
pub mod config;
pub mod instance;

pub use call::CallArg;
pub use config::GuestConfig;
pub use instance::{GuestInstance, InstanceMemory};
