use tracing::trace;

use crate::domain::SCROLL_LOOKAHEAD;

/// Geometry of the scrolled content, in any consistent unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSignal {
    pub offset: usize,
    pub viewport: usize,
    pub content: usize,
}

/// Decides when the viewer is close enough to the end of the content to
/// ask for the next page.
#[derive(Debug, Clone, Copy)]
pub struct ScrollTrigger {
    lookahead: usize,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(SCROLL_LOOKAHEAD)
    }
}

impl ScrollTrigger {
    pub fn new(lookahead: usize) -> Self {
        Self { lookahead }
    }

    pub fn should_advance(&self, signal: ScrollSignal, exhausted: bool) -> bool {
        if exhausted {
            return false;
        }
        let reached = signal.offset + signal.viewport >= signal.content.saturating_sub(self.lookahead);
        if reached {
            trace!("Scroll threshold reached: {:?}", signal);
        }
        reached
    }
}
