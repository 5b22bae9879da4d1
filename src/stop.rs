use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::error::{ThruError, ThruResult};

/// Shared request to end a run early. The loops poll it between device
/// calls, so a run ends within one read or write timeout and the link is
/// still closed and the summary still printed.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag raised on Ctrl-C or SIGTERM
    pub fn on_termination() -> ThruResult<Self> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            info!("Termination requested, finishing current transfer");
            handler_flag.raise();
        })
        .map_err(|e| ThruError::Setup(format!("Failed to install termination handler: {}", e)))?;

        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
