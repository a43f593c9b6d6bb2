//! Descriptor primitives behind a trait seam.

use std::io;

use crate::fd::Fd;

/// Trait for the descriptor primitives a handle runs against.
/// This abstraction allows for testing without mocking by providing
/// different implementations for production and simulated environments.
pub trait PipeOps: Send + Sync {
    /// Open a connected pipe and return its (read, write) descriptors.
    ///
    /// Must be atomic: an implementation that fails partway is responsible
    /// for leaving nothing open before returning the error.
    fn open_pair(&self) -> io::Result<(Fd, Fd)>;

    /// Release one descriptor.
    ///
    /// Must be called exactly once per descriptor; the attempt consumes it
    /// whether it succeeds or not. [`crate::ScopedFd`] exists to uphold
    /// that contract.
    fn close(&self, fd: Fd) -> io::Result<()>;
}

/// Production implementation backed by the operating system.
#[cfg(unix)]
pub struct SystemPipeOps;

#[cfg(unix)]
impl SystemPipeOps {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl Default for SystemPipeOps {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl PipeOps for SystemPipeOps {
    fn open_pair(&self) -> io::Result<(Fd, Fd)> {
        let mut fds = [0i32; 2];
        // SAFETY: fds is a valid out-buffer for two descriptors.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        let read = Fd::from_raw(fds[0]);
        let write = Fd::from_raw(fds[1]);

        for fd in [read, write] {
            // F_SETFD returns a value other than -1 on success.
            let rc = unsafe { libc::fcntl(fd.as_raw(), libc::F_SETFD, libc::FD_CLOEXEC) };
            if rc == -1 {
                let source = io::Error::last_os_error();
                // Keep creation atomic: close both ends before reporting.
                unsafe {
                    libc::close(read.as_raw());
                    libc::close(write.as_raw());
                }
                return Err(source);
            }
        }

        Ok((read, write))
    }

    fn close(&self, fd: Fd) -> io::Result<()> {
        // SAFETY: the handle layer hands each descriptor here exactly once.
        let rc = unsafe { libc::close(fd.as_raw()) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Scripted in-memory implementation for this crate's own unit tests.
/// This provides deterministic behavior without touching the real
/// descriptor table.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{HashMap, HashSet};
    use std::io;
    use std::sync::Mutex;

    use crate::fd::Fd;
    use crate::pipes::PipeOps;

    #[derive(Default)]
    struct FakeState {
        next_fd: i32,
        open: HashSet<i32>,
        closes: HashMap<i32, usize>,
        failing_closes: HashSet<i32>,
        fail_next_open: bool,
    }

    pub struct FakePipeOps {
        state: Mutex<FakeState>,
    }

    impl FakePipeOps {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(FakeState {
                    // Descriptors 0..=2 belong to stdio.
                    next_fd: 3,
                    ..FakeState::default()
                }),
            }
        }

        /// Arm the next `open_pair` call to fail without minting anything.
        pub fn fail_next_open(&self) {
            self.lock().fail_next_open = true;
        }

        /// Arm every close of `fd` to fail. The attempt still consumes the
        /// descriptor, as for the real primitive.
        pub fn fail_close(&self, fd: Fd) {
            self.lock().failing_closes.insert(fd.as_raw());
        }

        /// How many close attempts `fd` has received, failed ones included.
        pub fn close_count(&self, fd: Fd) -> usize {
            self.lock().closes.get(&fd.as_raw()).copied().unwrap_or(0)
        }

        /// How many descriptors are currently open.
        pub fn open_count(&self) -> usize {
            self.lock().open.len()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
            self.state.lock().expect("fake pipe state poisoned")
        }
    }

    impl PipeOps for FakePipeOps {
        fn open_pair(&self) -> io::Result<(Fd, Fd)> {
            let mut state = self.lock();
            if state.fail_next_open {
                state.fail_next_open = false;
                // EMFILE: the descriptor table is full.
                return Err(io::Error::from_raw_os_error(24));
            }
            let read = Fd::from_raw(state.next_fd);
            let write = Fd::from_raw(state.next_fd + 1);
            state.next_fd += 2;
            state.open.insert(read.as_raw());
            state.open.insert(write.as_raw());
            Ok((read, write))
        }

        fn close(&self, fd: Fd) -> io::Result<()> {
            let mut state = self.lock();
            *state.closes.entry(fd.as_raw()).or_insert(0) += 1;
            state.open.remove(&fd.as_raw());
            if state.failing_closes.contains(&fd.as_raw()) {
                // EIO: the backend failed while releasing.
                return Err(io::Error::from_raw_os_error(5));
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn mints_distinct_ascending_pairs() {
            let ops = FakePipeOps::new();
            let (r1, w1) = ops.open_pair().unwrap();
            let (r2, w2) = ops.open_pair().unwrap();
            assert_eq!(
                vec![r1.as_raw(), w1.as_raw(), r2.as_raw(), w2.as_raw()],
                vec![3, 4, 5, 6]
            );
            assert_eq!(ops.open_count(), 4);
        }

        #[test]
        fn failed_open_mints_nothing() {
            let ops = FakePipeOps::new();
            ops.fail_next_open();
            assert!(ops.open_pair().is_err());
            assert_eq!(ops.open_count(), 0);

            // Only the next call was armed.
            let (read, _) = ops.open_pair().unwrap();
            assert_eq!(read.as_raw(), 3);
        }

        #[test]
        fn failed_close_still_consumes_the_descriptor() {
            let ops = FakePipeOps::new();
            let (read, _) = ops.open_pair().unwrap();
            ops.fail_close(read);
            assert!(ops.close(read).is_err());
            assert_eq!(ops.close_count(read), 1);
            assert_eq!(ops.open_count(), 1);
        }
    }
}
