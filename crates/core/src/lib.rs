//! Core descriptor types and errors for the `fdrill` application.
//!
//! This crate establishes the ownership model everything else builds on: a
//! descriptor is held by exactly one [`ScopedFd`], ownership moves rather
//! than copies, and the descriptor is released exactly once.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing all possible failure modes for predictable error handling.
//! - **`fd`**: The `ScopedFd` owning handle, the `Fd` identifier newtype, and
//!   `PipePair` for opening both ends of a pipe under scoped ownership.
//! - **`pipes`**: The `PipeOps` backend trait and its operating-system
//!   implementation.

pub mod errors;
pub mod fd;
pub mod pipes;

pub use self::{
    errors::{Error, Result},
    fd::{Fd, PipePair, ScopedFd},
    pipes::PipeOps,
};

#[cfg(unix)]
pub use self::pipes::SystemPipeOps;
