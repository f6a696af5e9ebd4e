//! Trading signal emitted once per period.

use std::fmt;

/// `Hold` is an explicit do-nothing decision from a pointwise strategy.
/// `None` means an edge-triggered strategy had nothing to say this period
/// (or a strategy is still warming up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    None,
}

impl Signal {
    pub fn is_directional(self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
            Signal::None => "NONE",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
