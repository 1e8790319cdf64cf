//! lob-protocol
//!
//! Line-oriented text codec for driving the order book engine from
//! recorded sessions. Purely logical: parsing and formatting only, no
//! I/O and no engine state.

pub mod csv;

pub use csv::{
    format_depth, format_error, format_trade, order_type_from_token, order_type_token, parse_line,
    Command,
};
