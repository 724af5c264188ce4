//! Platform capabilities used while supervising a child
//!
//! - Linux: children get `PR_SET_PDEATHSIG = SIGTERM`, so they are asked to stop if the
//!   host dies without cleaning up. SIGTERM rather than SIGKILL gives containerized
//!   tools a chance to tear their containers down.
//! - Unix: graceful termination is SIGTERM.
//! - Elsewhere: neither capability exists; shutdown goes straight to a forceful kill.

use std::io;

use tokio::process::{Child, Command};

/// Strategy for the platform-specific parts of process supervision
pub trait Platform: Send + Sync {
    /// Adjust `cmd` before it is spawned
    fn configure(&self, cmd: &mut Command);

    /// Whether [`terminate`](Platform::terminate) can ask a child to exit
    fn supports_graceful_termination(&self) -> bool;

    /// Ask `child` to exit (SIGTERM-equivalent)
    fn terminate(&self, child: &Child) -> io::Result<()>;
}

/// Platform behavior of the host the binary was built for
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePlatform;

impl NativePlatform {
    /// Whether children can be tied to the host's lifetime
    pub fn supports_parent_death_signal(&self) -> bool {
        cfg!(target_os = "linux")
    }
}

impl Platform for NativePlatform {
    fn configure(&self, cmd: &mut Command) {
        if !self.supports_parent_death_signal() {
            return;
        }

        #[cfg(target_os = "linux")]
        {
            let parent = nix::unistd::getpid();
            // SAFETY: the hook only issues prctl(2) and getppid(2), both
            // async-signal-safe, and builds its error without allocating.
            unsafe {
                cmd.pre_exec(move || {
                    nix::sys::prctl::set_pdeathsig(nix::sys::signal::Signal::SIGTERM)
                        .map_err(io::Error::from)?;
                    ensure_parent(parent)
                });
            }
        }

        #[cfg(not(target_os = "linux"))]
        let _ = cmd;
    }

    fn supports_graceful_termination(&self) -> bool {
        cfg!(unix)
    }

    fn terminate(&self, child: &Child) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = child.id().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "process has already been reaped")
            })?;
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
        }

        #[cfg(not(unix))]
        {
            let _ = child;
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "graceful termination is not supported on this platform",
            ))
        }
    }
}

/// Fails when the process that spawned us is gone.
///
/// The death signal only covers a parent exiting after `prctl`; one that died
/// between fork and `prctl` has already reparented us, so exec is aborted.
#[cfg(target_os = "linux")]
fn ensure_parent(parent: nix::unistd::Pid) -> io::Result<()> {
    if nix::unistd::getppid() == parent {
        Ok(())
    } else {
        Err(io::Error::from(nix::errno::Errno::ESRCH))
    }
}
