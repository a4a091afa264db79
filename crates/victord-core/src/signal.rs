//! Process-wide terminate flag. SIGINT, SIGTERM, and SIGHUP all mean "exit
//! the loop at the start of the next iteration". The signal handler itself
//! touches nothing but this one flag.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use signal_hook::{
    consts::{SIGHUP, SIGINT, SIGTERM},
    flag,
};

/// Shared handle to the terminate flag, cheaply cloned into the reactor.
#[derive(Debug, Clone)]
pub struct Terminator {
    flag: Arc<AtomicBool>,
}

impl Terminator {
    /// Register SIGINT, SIGTERM, and SIGHUP handlers that set the returned
    /// flag. The handlers do no other work, keeping them async-signal-safe.
    ///
    /// # Errors
    ///
    /// Propagates any failure from `sigaction` registration.
    pub fn install() -> std::io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        flag::register(SIGINT, Arc::clone(&flag))?;
        flag::register(SIGTERM, Arc::clone(&flag))?;
        flag::register(SIGHUP, Arc::clone(&flag))?;
        Ok(Self { flag })
    }

    /// True once a shutdown signal has been received.
    #[must_use]
    pub fn should_terminate(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Handle to the raw flag, for tests that want to simulate a signal
    /// without actually raising one.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Build a terminator with no signal handlers registered, driven purely
    /// by [`Terminator::flag`]. For integration tests that want to stop a
    /// reactor deterministically instead of racing a real signal.
    #[must_use]
    pub fn for_testing() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn fresh_terminator_does_not_request_shutdown() {
        let terminator = Terminator::install().unwrap();
        assert!(!terminator.should_terminate());
    }

    #[test]
    fn setting_the_flag_is_observed_through_the_handle() {
        let terminator = Terminator::install().unwrap();
        terminator.flag().store(true, Ordering::SeqCst);
        assert!(terminator.should_terminate());
    }
}
