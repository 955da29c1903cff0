//! SIGINT/SIGTERM handling.
//!
//! The handler only flips a flag; a watcher thread forwards it to the
//! run's cancel handle, which stops the running tool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use ddp_core::orchestrator::CancelHandle;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_signal(_sig: i32) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handlers() {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        if let Err(e) = signal::sigaction(Signal::SIGINT, &action) {
            tracing::warn!("Could not install SIGINT handler: {}", e);
        }
        if let Err(e) = signal::sigaction(Signal::SIGTERM, &action) {
            tracing::warn!("Could not install SIGTERM handler: {}", e);
        }
    }
}

#[cfg(not(unix))]
fn install_handlers() {}

/// Cancel `handle` when the process is interrupted.
pub fn install(handle: CancelHandle) {
    install_handlers();
    let spawned = thread::Builder::new()
        .name("signal-watch".into())
        .spawn(move || loop {
            if INTERRUPTED.load(Ordering::SeqCst) {
                tracing::warn!("Interrupted, cancelling");
                handle.cancel();
                return;
            }
            thread::sleep(Duration::from_millis(100));
        });
    if let Err(e) = spawned {
        tracing::warn!("Could not start signal watcher: {}", e);
    }
}
