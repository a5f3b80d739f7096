//! SIGTERM/SIGINT handling.
//!
//! The C handlers only store the signal number into a static atomic; the
//! poll loop checks it between iterations and stops gracefully so KILL can
//! be returned to idle before exit.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);
static SIGNAL_COUNT: AtomicU32 = AtomicU32::new(0);

/// Signals that request a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM
    Terminate,
    /// SIGINT (Ctrl+C)
    Interrupt,
}

impl SignalKind {
    #[cfg(unix)]
    fn from_raw(signum: i32) -> Option<Self> {
        match signum {
            libc::SIGTERM => Some(SignalKind::Terminate),
            libc::SIGINT => Some(SignalKind::Interrupt),
            _ => None,
        }
    }

    #[cfg(not(unix))]
    fn from_raw(_signum: i32) -> Option<Self> {
        None
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Terminate => write!(f, "SIGTERM"),
            SignalKind::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Stop request flag fed by signals or by the daemon itself.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    manual: Arc<AtomicBool>,
    installed: bool,
}

impl ShutdownSignal {
    /// Register the SIGTERM and SIGINT handlers.
    ///
    /// On non-Unix targets only manual requests are supported.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        register_handlers()?;

        Ok(Self {
            manual: Arc::new(AtomicBool::new(false)),
            installed: cfg!(unix),
        })
    }

    /// A flag that ignores process signals.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Whether a stop has been requested.
    #[inline]
    pub fn requested(&self) -> bool {
        self.manual.load(Ordering::Relaxed) || self.received().is_some()
    }

    /// The signal that requested the stop, if any.
    pub fn received(&self) -> Option<SignalKind> {
        if !self.installed {
            return None;
        }
        SignalKind::from_raw(LAST_SIGNAL.load(Ordering::Relaxed))
    }

    /// Number of stop signals delivered to the process.
    pub fn signal_count(&self) -> u32 {
        if self.installed {
            SIGNAL_COUNT.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// Request a stop from inside the process.
    pub fn request(&self) {
        info!("Stop requested");
        self.manual.store(true, Ordering::Relaxed);
    }
}

#[cfg(unix)]
extern "C" fn on_stop_signal(signum: libc::c_int) {
    LAST_SIGNAL.store(signum, Ordering::Relaxed);
    SIGNAL_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn register_handlers() -> std::io::Result<()> {
    for signum in [libc::SIGTERM, libc::SIGINT] {
        // SAFETY: the handler only touches atomics, which is async-signal-safe
        let previous = unsafe {
            libc::signal(signum, on_stop_signal as extern "C" fn(libc::c_int) as libc::sighandler_t)
        };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }
    debug!("SIGTERM/SIGINT handlers registered");
    Ok(())
}
