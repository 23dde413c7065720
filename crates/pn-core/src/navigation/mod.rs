//! Page navigation: modes, options, event payloads, and the engine

use serde::{Deserialize, Serialize};

mod engine;
mod history;
mod observer;

pub use engine::NavigationEngine;
pub use history::HistoryStacks;
pub use observer::{NavigationDecision, NavigationObserver};

use crate::entry::{NavParameter, PageTypeId};
use crate::transition::PageTransition;

/// How a committed navigation mutates the history stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationMode {
    /// Fresh navigation to a new entry; clears the forward stack
    New,
    /// Return to the most recent back-stack entry
    Back,
    /// Advance to the most recent forward-stack entry
    Forward,
    /// Re-display the current entry without touching the stacks
    Refresh,
}

/// Per-request options for `navigate_with_options`
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Record this navigation in history; also gated by the ambient
    /// stack-enabled flag
    pub enroll_in_history: bool,

    /// Transition override for this request
    pub transition: Option<PageTransition>,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            enroll_in_history: true,
            transition: None,
        }
    }
}

/// Payload carried by every navigation notification
#[derive(Debug, Clone)]
pub struct NavigationEventArgs {
    pub mode: NavigationMode,
    pub transition: Option<PageTransition>,
    pub parameter: NavParameter,
    pub source_type: PageTypeId,
}
