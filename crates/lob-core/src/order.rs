//! Order and modify-request records.
//!
//! An [`Order`] is immutable at rest except for its remaining quantity,
//! which only the crossing loop touches. Once admitted, the engine owns
//! the order exclusively; callers keep the id.

use crate::error::OrderbookError;
use crate::order_type::OrderType;
use crate::side::Side;
use crate::types::{OrderId, Price, Quantity};

/// A single order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    order_type: OrderType,
    order_id: OrderId,
    side: Side,
    price: Price,
    initial_quantity: Quantity,
    remaining_quantity: Quantity,
}

impl Order {
    /// Create an order with an explicit limit price.
    pub fn new(
        order_type: OrderType,
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Order {
            order_type,
            order_id,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    /// Create a market order. The price is assigned at admission, when
    /// the order is repriced to the far end of the opposite book.
    pub fn market(order_id: OrderId, side: Side, quantity: Quantity) -> Self {
        Order::new(OrderType::Market, order_id, side, 0, quantity)
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Reduce the remaining quantity by `quantity`.
    ///
    /// Overfilling is not a caller error but a broken engine invariant;
    /// the book latches into a halted state when it observes one.
    pub(crate) fn fill(&mut self, quantity: Quantity) -> Result<(), OrderbookError> {
        if quantity > self.remaining_quantity {
            return Err(OrderbookError::InternalInvariant(format!(
                "order {} filled for {} with only {} remaining",
                self.order_id, quantity, self.remaining_quantity
            )));
        }
        self.remaining_quantity -= quantity;
        Ok(())
    }

    /// Reprice a market order and convert it to `GoodTillCancel` so any
    /// residual rests under normal queue-position rules.
    pub(crate) fn to_good_till_cancel(&mut self, price: Price) {
        debug_assert_eq!(self.order_type, OrderType::Market);
        self.price = price;
        self.order_type = OrderType::GoodTillCancel;
    }
}

/// Replacement request for a resting order: same id, new side, price and
/// quantity. Applied as cancel-then-re-add, so the order loses its queue
/// position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderModify {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderModify {
    pub fn new(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        OrderModify {
            order_id,
            side,
            price,
            quantity,
        }
    }

    /// Build the replacement order, keeping the original time-in-force.
    pub(crate) fn to_order(self, order_type: OrderType) -> Order {
        Order::new(
            order_type,
            self.order_id,
            self.side,
            self.price,
            self.quantity,
        )
    }
}
