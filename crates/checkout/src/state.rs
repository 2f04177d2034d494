//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout run in its lifecycle.
///
/// State transitions:
/// ```text
/// Validating ──► OrderCreated ──► StockReducing ──┬──► Completed
///                                                 └──► Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// The cart snapshot is being validated against live stock.
    #[default]
    Validating,

    /// The order header and lines exist; no stock has moved yet.
    OrderCreated,

    /// Stock is being reduced one line at a time.
    StockReducing,

    /// Every line was reduced and the cart was cleared (terminal state).
    Completed,

    /// A reduce failed and compensation ran (terminal state).
    Aborted,
}

impl CheckoutState {
    /// Returns true if a failure in this state requires compensation.
    pub fn needs_compensation(&self) -> bool {
        matches!(
            self,
            CheckoutState::OrderCreated | CheckoutState::StockReducing
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Validating => "Validating",
            CheckoutState::OrderCreated => "OrderCreated",
            CheckoutState::StockReducing => "StockReducing",
            CheckoutState::Completed => "Completed",
            CheckoutState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
