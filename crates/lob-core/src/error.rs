//! Error taxonomy for the order book engine.

use thiserror::Error;

use crate::types::OrderId;

/// Errors returned by order book operations.
///
/// Every variant leaves the book unchanged, except `InternalInvariant`,
/// which also latches the book into a halted state: once an invariant is
/// observed broken, no further orders are accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderbookError {
    #[error("order {0} already exists")]
    DuplicateOrderId(OrderId),

    #[error("order {0} not found")]
    UnknownOrderId(OrderId),

    #[error("market order {0} has no opposite liquidity")]
    MarketUnfillable(OrderId),

    #[error("fill-and-kill order {0} cannot match at submission")]
    FillAndKillNotMarketable(OrderId),

    #[error("fill-or-kill order {0} cannot be fully filled")]
    FillOrKillNotFillable(OrderId),

    #[error("invariant violation: {0}")]
    InternalInvariant(String),
}

/// Fatal expiry-worker errors, surfaced from [`crate::Engine::start`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpiryError {
    #[error("time zone {0:?} is not in the bundled tz database")]
    TimezoneUnavailable(String),

    #[error("failed to spawn expiry worker: {0}")]
    WorkerSpawn(String),
}
