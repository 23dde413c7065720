//! Navigation configuration surface

use serde::{Deserialize, Serialize};

use crate::transition::PageTransition;

/// Host-tunable settings for the navigation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Page cache capacity; the back stack shares this bound. 0 disables
    /// caching entirely.
    pub cache_capacity: usize,

    /// Whether back/forward history is recorded at all. Turning this off
    /// clears both stacks and the cache.
    pub stack_enabled: bool,

    /// Transition used when an entry carries none
    pub default_transition: PageTransition,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10,
            stack_enabled: true,
            default_transition: PageTransition::Entrance,
        }
    }
}
