//! lob-core
//!
//! Single-instrument limit order book matching engine:
//! - dual price-ordered books (bids descending, asks ascending)
//! - FIFO time priority within each price level
//! - time-in-force policies: GTC, FAK (IOC), FOK, GFD, market
//! - thread-safe facade with a daily good-for-day expiry worker
//!
//! [`Orderbook`] is the unsynchronized core; [`Engine`] wraps it in a
//! mutex, serializes all public operations, and owns the expiry worker.

mod book;

pub mod depth;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod order;
pub mod order_type;
pub mod orderbook;
pub mod side;
pub mod trade;
pub mod types;

pub use depth::{Depth, LevelInfo};
pub use engine::Engine;
pub use error::{ExpiryError, OrderbookError};
pub use expiry::EngineConfig;
pub use order::{Order, OrderModify};
pub use order_type::OrderType;
pub use orderbook::Orderbook;
pub use side::Side;
pub use trade::{Trade, TradeLeg, Trades};
pub use types::{OrderId, Price, Quantity};
