//! Error types for navigation operations

use thiserror::Error;

use crate::entry::PageTypeId;

/// Errors raised by navigation attempts and state operations.
///
/// Anything arising inside a navigation attempt is reported through the
/// `on_navigation_failed` notification and never propagates out of the
/// `navigate*` calls; state operations return these synchronously.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("no page could be produced for '{0}'")]
    Resolution(PageTypeId),

    #[error("page type '{0}' is already cached")]
    DuplicateCacheEntry(PageTypeId),

    #[error("navigation stack is disabled")]
    StackDisabled,

    #[error("malformed navigation state: {0}")]
    MalformedState(String),

    #[error("parameter for '{0}' has no text form")]
    UnsupportedParameter(PageTypeId),

    #[error("page factory error: {0}")]
    Factory(#[from] anyhow::Error),
}
