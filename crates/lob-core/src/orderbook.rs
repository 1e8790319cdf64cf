//! Single-instrument order book with price-time priority matching.
//!
//! Admission, time-in-force policy, the crossing loop, cancel, modify,
//! and depth snapshots. This type is the unsynchronized core; [`crate::Engine`]
//! wraps it in a mutex and runs the expiry worker against it.

use tracing::{debug, error, trace};

use crate::book::Book;
use crate::depth::{Depth, LevelInfo};
use crate::error::OrderbookError;
use crate::order::{Order, OrderModify};
use crate::order_type::OrderType;
use crate::side::Side;
use crate::trade::{Trade, TradeLeg, Trades};
use crate::types::{OrderId, Price, Quantity};

/// Order book for one instrument.
#[derive(Debug, Default)]
pub struct Orderbook {
    book: Book,
    halted: bool,
}

impl Orderbook {
    pub fn new() -> Self {
        Orderbook::default()
    }

    /// Admit an order and run the crossing loop to quiescence.
    ///
    /// Market orders are repriced to the far end of the opposite book and
    /// converted to `GoodTillCancel` before matching; fill-and-kill and
    /// fill-or-kill orders are rejected up front when their time-in-force
    /// cannot be honored. Returns the trades produced, possibly empty.
    pub fn add_order(&mut self, mut order: Order) -> Result<Trades, OrderbookError> {
        self.check_halted()?;

        let order_id = order.order_id();
        if self.book.contains(order_id) {
            return Err(OrderbookError::DuplicateOrderId(order_id));
        }

        if order.order_type() == OrderType::Market {
            match self.book.worst(order.side().opposite()) {
                Some(far_price) => order.to_good_till_cancel(far_price),
                None => return Err(OrderbookError::MarketUnfillable(order_id)),
            }
        }

        match order.order_type() {
            OrderType::FillAndKill if !self.can_match(order.side(), order.price()) => {
                return Err(OrderbookError::FillAndKillNotMarketable(order_id));
            }
            OrderType::FillOrKill
                if !self.can_fully_fill(order.side(), order.price(), order.remaining_quantity()) =>
            {
                return Err(OrderbookError::FillOrKillNotFillable(order_id));
            }
            _ => {}
        }

        debug!(
            order_id,
            side = ?order.side(),
            price = order.price(),
            quantity = order.remaining_quantity(),
            "order admitted"
        );
        self.book.push_back(order);

        match self.match_orders() {
            Ok(trades) => Ok(trades),
            Err(e) => {
                self.halted = true;
                error!(error = %e, "halting order book");
                Err(e)
            }
        }
    }

    /// Cancel a resting order by id.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<(), OrderbookError> {
        let handle = self
            .book
            .handle(order_id)
            .ok_or(OrderbookError::UnknownOrderId(order_id))?;
        self.book.remove(handle);
        debug!(order_id, "order canceled");
        Ok(())
    }

    /// Cancel several orders. Stops at the first failure without undoing
    /// earlier cancels; atomicity is per id, not per batch.
    pub fn cancel_orders(&mut self, order_ids: &[OrderId]) -> Result<(), OrderbookError> {
        for &order_id in order_ids {
            self.cancel_order(order_id)?;
        }
        Ok(())
    }

    /// Replace a resting order: cancel it, then re-admit under the same
    /// id with the new side, price and quantity but the original
    /// time-in-force. The replacement joins the tail of its level, so
    /// time priority is lost.
    pub fn modify_order(&mut self, modify: OrderModify) -> Result<Trades, OrderbookError> {
        self.check_halted()?;

        let order_type = self
            .book
            .get(modify.order_id)
            .map(|order| order.order_type())
            .ok_or(OrderbookError::UnknownOrderId(modify.order_id))?;
        self.cancel_order(modify.order_id)?;
        self.add_order(modify.to_order(order_type))
    }

    /// Aggregated per-level view of both sides, best price first.
    pub fn snapshot(&self) -> Depth {
        let collect = |side| -> Vec<LevelInfo> {
            self.book
                .aggregated_levels(side)
                .map(|(price, quantity)| LevelInfo { price, quantity })
                .collect()
        };
        Depth {
            bids: collect(Side::Buy),
            asks: collect(Side::Sell),
        }
    }

    /// Number of resting orders.
    pub fn size(&self) -> usize {
        self.book.len()
    }

    /// The remaining state of a resting order, if the id is live.
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.book.get(order_id)
    }

    /// Ids of all resting good-for-day orders.
    pub fn good_for_day_ids(&self) -> Vec<OrderId> {
        self.book.good_for_day_ids()
    }

    /// True iff an aggressor on `side` at `price` would match the
    /// opposite top of book.
    pub fn can_match(&self, side: Side, price: Price) -> bool {
        match self.book.best(side.opposite()) {
            None => false,
            Some((best, _)) => match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            },
        }
    }

    /// True iff `quantity` is immediately available on the opposite side
    /// at prices at least as favorable as `price`. Pure read.
    pub fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        let mut available: u64 = 0;
        for (level_price, level_quantity) in self.book.aggregated_levels(side.opposite()) {
            let eligible = match side {
                Side::Buy => price >= level_price,
                Side::Sell => price <= level_price,
            };
            if !eligible {
                break;
            }
            available += u64::from(level_quantity);
            if available >= u64::from(quantity) {
                return true;
            }
        }
        false
    }

    /// Audit hook: walk the book and verify its structural invariants.
    pub fn check_invariants(&self) -> Result<(), OrderbookError> {
        self.book
            .check_invariants()
            .map_err(OrderbookError::InternalInvariant)?;
        if let (Some((bid, _)), Some((ask, _))) =
            (self.book.best(Side::Buy), self.book.best(Side::Sell))
        {
            if bid >= ask {
                return Err(OrderbookError::InternalInvariant(format!(
                    "book rests crossed: best bid {bid} >= best ask {ask}"
                )));
            }
        }
        Ok(())
    }

    /// Match the best bid and ask fronts until the top of book no longer
    /// crosses, then cancel any immediate-or-cancel residual.
    fn match_orders(&mut self) -> Result<Trades, OrderbookError> {
        let mut trades = Trades::new();

        loop {
            let Some((bid_price, bid_handle)) = self.book.best(Side::Buy) else {
                break;
            };
            let Some((ask_price, ask_handle)) = self.book.best(Side::Sell) else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            let bid_id = self.book.order(bid_handle).order_id();
            let ask_id = self.book.order(ask_handle).order_id();
            let quantity = self
                .book
                .order(bid_handle)
                .remaining_quantity()
                .min(self.book.order(ask_handle).remaining_quantity());

            // The older leg is the maker; its price is the execution price.
            let maker_price = if self.book.seq(bid_handle) < self.book.seq(ask_handle) {
                bid_price
            } else {
                ask_price
            };

            self.book.order_mut(bid_handle).fill(quantity)?;
            self.book.order_mut(ask_handle).fill(quantity)?;

            trace!(bid_id, ask_id, price = maker_price, quantity, "trade");
            trades.push(Trade::new(
                TradeLeg {
                    order_id: bid_id,
                    price: maker_price,
                    quantity,
                },
                TradeLeg {
                    order_id: ask_id,
                    price: maker_price,
                    quantity,
                },
            ));

            if self.book.order(bid_handle).is_filled() {
                self.book.remove(bid_handle);
            }
            if self.book.order(ask_handle).is_filled() {
                self.book.remove(ask_handle);
            }
        }

        // A fill-and-kill order never rests across calls, so a surviving
        // one is this call's aggressor sitting alone at its level head.
        for side in [Side::Buy, Side::Sell] {
            if let Some((_, handle)) = self.book.best(side) {
                if self.book.order(handle).order_type() == OrderType::FillAndKill {
                    let order = self.book.remove(handle);
                    debug!(
                        order_id = order.order_id(),
                        "fill-and-kill residual canceled"
                    );
                }
            }
        }

        Ok(trades)
    }

    fn check_halted(&self) -> Result<(), OrderbookError> {
        if self.halted {
            return Err(OrderbookError::InternalInvariant(
                "order book halted by a previous invariant violation".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gtc(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
        Order::new(OrderType::GoodTillCancel, order_id, side, price, quantity)
    }

    #[test]
    fn can_match_requires_a_favorable_opposite_top() {
        let mut book = Orderbook::new();
        assert!(!book.can_match(Side::Buy, 100));
        book.add_order(gtc(1, Side::Sell, 100, 5)).unwrap();
        assert!(book.can_match(Side::Buy, 100));
        assert!(book.can_match(Side::Buy, 101));
        assert!(!book.can_match(Side::Buy, 99));
        assert!(!book.can_match(Side::Sell, 101));
    }

    #[test]
    fn can_fully_fill_sums_only_eligible_levels() {
        let mut book = Orderbook::new();
        book.add_order(gtc(1, Side::Sell, 100, 3)).unwrap();
        book.add_order(gtc(2, Side::Sell, 101, 3)).unwrap();
        book.add_order(gtc(3, Side::Sell, 105, 50)).unwrap();

        assert!(book.can_fully_fill(Side::Buy, 101, 6));
        assert!(!book.can_fully_fill(Side::Buy, 101, 7));
        assert!(book.can_fully_fill(Side::Buy, 105, 7));
        assert!(!book.can_fully_fill(Side::Buy, 99, 1));
    }

    #[test]
    fn duplicate_ids_are_rejected_while_live() {
        let mut book = Orderbook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5)).unwrap();
        assert_eq!(
            book.add_order(gtc(1, Side::Buy, 99, 5)),
            Err(OrderbookError::DuplicateOrderId(1))
        );

        // Fully filled ids may be reused.
        book.add_order(gtc(2, Side::Sell, 100, 5)).unwrap();
        assert_eq!(book.size(), 0);
        book.add_order(gtc(1, Side::Buy, 100, 5)).unwrap();
        assert_eq!(book.size(), 1);
    }

    #[test]
    fn market_order_is_rejected_against_an_empty_book() {
        let mut book = Orderbook::new();
        assert_eq!(
            book.add_order(Order::market(1, Side::Buy, 5)),
            Err(OrderbookError::MarketUnfillable(1))
        );
        assert_eq!(book.size(), 0);
    }

    #[test]
    fn market_residual_rests_as_good_till_cancel_at_the_far_price() {
        let mut book = Orderbook::new();
        book.add_order(gtc(1, Side::Sell, 100, 5)).unwrap();
        book.add_order(gtc(2, Side::Sell, 110, 5)).unwrap();

        let trades = book.add_order(Order::market(3, Side::Buy, 12)).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(book.size(), 1);

        let residual = book.get(3).unwrap();
        assert_eq!(residual.order_type(), OrderType::GoodTillCancel);
        assert_eq!(residual.price(), 110);
        assert_eq!(residual.remaining_quantity(), 2);
    }

    #[test]
    fn crossing_sweeps_multiple_levels_at_maker_prices() {
        let mut book = Orderbook::new();
        book.add_order(gtc(1, Side::Sell, 100, 2)).unwrap();
        book.add_order(gtc(2, Side::Sell, 101, 2)).unwrap();

        let trades = book.add_order(gtc(3, Side::Buy, 105, 4)).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].bid.price, 100);
        assert_eq!(trades[0].ask.price, 100);
        assert_eq!(trades[1].bid.price, 101);
        assert_eq!(trades[1].ask.price, 101);
        assert_eq!(book.size(), 0);
    }
}
