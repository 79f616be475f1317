//! Ctrl-C handling
//!
//! The first interrupt only raises a flag: the running tool is killed, the
//! current source cleans up its temporary files and the run stops without
//! notifying anyone. A second interrupt exits on the spot.

use std::io;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Exit status after an interrupt (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shared interrupt flag
#[derive(Debug, Clone)]
pub struct Interrupt {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    /// A flag that only fires through [`Interrupt::trigger`]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Listen for Ctrl-C on a background thread
    ///
    /// The handler is registered before this returns, so the default
    /// termination no longer applies afterwards.
    pub fn install() -> io::Result<Self> {
        let interrupt = Self::new();
        let handle = interrupt.clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut signals = {
            let _guard = runtime.enter();
            listen()?
        };

        std::thread::Builder::new()
            .name("interrupt".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while signals.recv().await.is_some() {
                        if handle.is_triggered() {
                            std::process::exit(INTERRUPTED_EXIT_CODE);
                        }
                        info!("Interrupted, stopping after cleanup (interrupt again to exit immediately)");
                        handle.trigger();
                    }
                })
            })?;

        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the flag is raised
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as self
        let _ = receiver.wait_for(|raised| *raised).await;
    }
}

#[cfg(unix)]
fn listen() -> io::Result<tokio::signal::unix::Signal> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
}

#[cfg(windows)]
fn listen() -> io::Result<tokio::signal::windows::CtrlC> {
    tokio::signal::windows::ctrl_c()
}
