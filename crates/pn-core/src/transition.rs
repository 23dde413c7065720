//! Transition descriptors handed to the presentation layer

use serde::{Deserialize, Serialize};

/// Direction a slide transition enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideDirection {
    FromLeft,
    FromRight,
    FromBottom,
}

/// Animation descriptor invoked when a page is displayed.
///
/// The engine only hands the descriptor to the presentation layer; it never
/// runs or awaits the animation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PageTransition {
    /// Built-in entrance animation, the fallback when an entry carries none
    #[default]
    Entrance,
    /// Drill-in animation for master/detail style navigation
    DrillIn,
    /// Directional slide
    Slide(SlideDirection),
    /// Skip animation entirely
    Suppress,
}
