//! Scoped ownership of raw file descriptors.
//!
//! [`ScopedFd`] is the single owner of one open descriptor. Ownership moves,
//! it never copies, and the descriptor is released exactly once no matter
//! which path the value leaves scope by. The release contract is asymmetric:
//! [`ScopedFd::close`] reports failure to the caller, while dropping a still
//! open handle releases it quietly and never escalates.

use std::fmt;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::pipes::PipeOps;

/// A raw descriptor value as handed out by the backend.
///
/// This is an identifier, not an owner. [`ScopedFd`] holds the release
/// obligation; `Fd` is what gets logged, compared, and passed to the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(i32);

impl Fd {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning handle for one descriptor, bound to the backend that minted it.
///
/// The handle is move-only. Moving transfers the release obligation to the
/// destination and leaves nothing behind to release twice; assigning over
/// an occupied binding drops the previous handle first, so the overwritten
/// descriptor is still released exactly once, through the drop path. A
/// caller that must observe that release's outcome calls [`close`] before
/// assigning.
///
/// There are two ways out:
///
/// - [`close`](Self::close) releases now and returns the backend's verdict.
/// - Dropping a still open handle releases it and logs any failure instead
///   of returning it. Drop runs during unwinding, where raising a second
///   failure would abort the process or mask the one already propagating,
///   so it must never escalate.
///
/// [`close`]: Self::close
pub struct ScopedFd {
    fd: Option<Fd>,
    ops: Arc<dyn PipeOps>,
}

impl ScopedFd {
    /// Take ownership of `fd`, to be released through `ops`.
    ///
    /// Wraps without validating; nothing is acquired here.
    #[must_use]
    pub fn new(ops: Arc<dyn PipeOps>, fd: Fd) -> Self {
        Self { fd: Some(fd), ops }
    }

    /// A handle owning nothing. Closing or dropping it is a no-op.
    #[must_use]
    pub fn empty(ops: Arc<dyn PipeOps>) -> Self {
        Self { fd: None, ops }
    }

    /// The descriptor currently owned, if any. Ownership stays put.
    #[must_use]
    pub fn fd(&self) -> Option<Fd> {
        self.fd
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// Give up ownership without releasing. The caller takes over the
    /// release obligation; this handle is empty afterwards.
    #[must_use]
    pub fn take(&mut self) -> Option<Fd> {
        self.fd.take()
    }

    /// Release now and report the backend's verdict.
    ///
    /// The handle is empty afterwards even when the backend reports
    /// failure; the attempt consumes the obligation either way. Closing an
    /// empty handle succeeds without touching the backend.
    pub fn close(&mut self) -> Result<()> {
        match self.fd.take() {
            Some(fd) => {
                tracing::debug!(%fd, "closing descriptor");
                self.ops
                    .close(fd)
                    .map_err(|source| Error::close_failed(fd, source))
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ScopedFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedFd").field("fd", &self.fd).finish()
    }
}

impl Drop for ScopedFd {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            tracing::debug!(%fd, "closing descriptor on drop");
            // Drop may be running during unwinding. A release failure here
            // is unactionable, so record it and move on.
            if let Err(error) = self.ops.close(fd) {
                tracing::warn!(%fd, %error, "close failed during drop");
            }
        }
    }
}

/// Both ends of a freshly opened pipe, each under scoped ownership.
///
/// Deliberately not `Drop` itself: the ends are independent owners and are
/// routinely moved out one at a time.
#[derive(Debug)]
pub struct PipePair {
    pub read: ScopedFd,
    pub write: ScopedFd,
}

impl PipePair {
    /// Open a pipe through `ops` and wrap both ends.
    ///
    /// Creation is atomic: the backend either produces both connected
    /// descriptors or fails as a whole, so a returned error never leaks
    /// an end.
    pub fn open(ops: Arc<dyn PipeOps>) -> Result<Self> {
        let (read, write) = ops
            .open_pair()
            .map_err(|source| Error::operation_failed("pipe", source))?;
        Ok(Self {
            read: ScopedFd::new(Arc::clone(&ops), read),
            write: ScopedFd::new(ops, write),
        })
    }
}
