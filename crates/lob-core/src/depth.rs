//! Aggregated per-level depth snapshot.

use crate::types::{Price, Quantity};

/// Total resting quantity at one price.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

/// Value-typed view of both book sides, best price first.
///
/// This is a fresh copy; it never borrows engine-internal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Depth {
    pub bids: Vec<LevelInfo>,
    pub asks: Vec<LevelInfo>,
}

impl Depth {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }
}
