//! Numeric aliases shared across the engine.
//!
//! The widths are part of the public contract: prices are signed 32-bit
//! integer ticks (negative ticks are legal, e.g. for calendar spreads),
//! quantities are unsigned 32-bit, order ids are unsigned 64-bit.

/// Price in integer ticks.
pub type Price = i32;

/// Order quantity.
pub type Quantity = u32;

/// Caller-assigned order identifier, unique among live orders.
pub type OrderId = u64;
