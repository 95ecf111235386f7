//! OS signal to control signal bridge.

use suiteflow_core::ControlHandle;
use tracing::{info, warn};

/// What the n-th Ctrl-C asks for: the first drains, any later one aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    Drain,
    Abort,
}

pub fn action_for(interrupts: u32) -> InterruptAction {
    if interrupts <= 1 {
        InterruptAction::Drain
    } else {
        InterruptAction::Abort
    }
}

/// Forward Ctrl-C to the controller until it stops listening.
pub fn spawn_ctrl_c_bridge(handle: ControlHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interrupts = 0u32;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for ctrl-c");
                return;
            }
            interrupts += 1;
            let sent = match action_for(interrupts) {
                InterruptAction::Drain => {
                    info!("interrupt: draining (press ctrl-c again to abort)");
                    eprintln!("draining: waiting for in-flight units; ctrl-c again to abort");
                    handle.drain().await
                }
                InterruptAction::Abort => {
                    info!("interrupt: aborting");
                    handle.abort().await
                }
            };
            if sent.is_err() {
                return;
            }
        }
    })
}
