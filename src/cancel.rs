use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use anyhow::{Context, Result};
use log::*;
use thiserror::Error;

// How often blocking waits look at the token
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Returned by any operation abandoned because the user pressed Ctrl+C.
#[derive(Debug, Error)]
#[error("interrupted by user")]
pub struct Cancelled;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Flip `token` when the process receives an interrupt.
///
/// The listener runs on its own thread with a single-threaded runtime, so the
/// rest of the program stays blocking. The handler is installed before this
/// returns.
pub fn cancel_on_interrupt(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .with_context(||"Unable to build signal runtime")?;
    #[cfg(unix)]
    let mut interrupt = {
        let _guard = runtime.enter();
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .with_context(||"Unable to listen for interrupt")?
    };
    std::thread::Builder::new()
        .name("interrupt".to_owned())
        .spawn(move || {
            #[cfg(unix)]
            let received = runtime.block_on(interrupt.recv()).is_some();
            #[cfg(not(unix))]
            let received = match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Unable to listen for interrupt: {}", e);
                    false
                },
            };
            if received {
                debug!("Received interrupt");
                token.cancel();
            }
        })
        .with_context(||"Unable to start interrupt listener")?;
    Ok(())
}
