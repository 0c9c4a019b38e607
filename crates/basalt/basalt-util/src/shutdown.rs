//! Cooperative shutdown flag driven by SIGINT/SIGTERM.
//!
//! Every process loop polls `ShutdownFlag::is_set` instead of blocking
//! indefinitely, so a signal drains the loop at the next iteration: stop
//! accepting connections, let in-flight frames finish, release resources.

use std::sync::atomic::{AtomicBool, Ordering};

static REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    REQUESTED.store(true, Ordering::SeqCst);
}

/// Process-wide shutdown request flag.
///
/// `install()` registers the handler for SIGINT and SIGTERM; afterwards any
/// clone of the flag observes the request. Signal-safe: the handler only
/// performs an atomic store.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShutdownFlag;

impl ShutdownFlag {
    pub fn install() -> Self {
        let handler = on_signal as extern "C" fn(libc::c_int);
        unsafe {
            libc::signal(libc::SIGINT, handler as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
        }
        Self
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        REQUESTED.load(Ordering::SeqCst)
    }

    /// Request shutdown from within the process (e.g. on a SHUTDOWN message).
    pub fn request(&self) {
        REQUESTED.store(true, Ordering::SeqCst);
    }
}
