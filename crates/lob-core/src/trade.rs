//! Trade records emitted by the crossing loop.

use crate::types::{OrderId, Price, Quantity};

/// One leg of a trade.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TradeLeg {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// A match between a resting order and an aggressor.
///
/// Both legs carry the same quantity and the same execution price: the
/// maker's. When the top of book crosses, price-time priority means the
/// older party's price prevails.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trade {
    pub bid: TradeLeg,
    pub ask: TradeLeg,
}

impl Trade {
    pub fn new(bid: TradeLeg, ask: TradeLeg) -> Self {
        Trade { bid, ask }
    }

    /// Quantity exchanged; identical on both legs.
    pub fn quantity(&self) -> Quantity {
        self.bid.quantity
    }
}

pub type Trades = Vec<Trade>;
