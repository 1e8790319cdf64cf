//! Comma-separated session codec.
//!
//! Input format (lines → [`Command`]):
//!
//! - Add order:
//!   `A, orderId(u64), side(B|S), type(GTC|FAK|FOK|GFD|MKT), price(i32), qty(u32)`
//!   The price token is ignored for `MKT` (`-` by convention).
//!
//! - Cancel:
//!   `C, orderId`
//!
//! - Modify:
//!   `M, orderId, side(B|S), price(i32), qty(u32)`
//!
//! - Depth snapshot:
//!   `Q`
//!
//! Output format:
//!
//! - Trade:
//!   `T, bidOrderId, bidPrice, askOrderId, askPrice, qty`
//!
//! - Depth level (bids first, best price first):
//!   `D, side(B|S), price, qty`
//!
//! - Rejected command:
//!   `E, <error message>`
//!
//! Blank lines and `#` comments parse to `None`, as do malformed lines;
//! replay tools skip them.

use lob_core::{Depth, Order, OrderId, OrderModify, OrderType, OrderbookError, Side, Trade};

/// A parsed session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(Order),
    Cancel(OrderId),
    Modify(OrderModify),
    Snapshot,
}

/// Parse a single line into a [`Command`].
///
/// Returns `None` for blank lines, comments (starting with `#`), and
/// lines that do not parse.
pub fn parse_line(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let tokens = split_and_trim(trimmed, ',');
    match tokens.first().map(String::as_str) {
        Some("A") => parse_add(&tokens),
        Some("C") => parse_cancel(&tokens),
        Some("M") => parse_modify(&tokens),
        Some("Q") if tokens.len() == 1 => Some(Command::Snapshot),
        _ => None,
    }
}

fn parse_add(tokens: &[String]) -> Option<Command> {
    // A, orderId, side, type, price, qty
    if tokens.len() != 6 {
        return None;
    }

    let order_id = tokens[1].parse::<OrderId>().ok()?;
    let side = Side::from_char(tokens[2].chars().next()?)?;
    let order_type = order_type_from_token(&tokens[3])?;
    let quantity = tokens[5].parse::<u32>().ok()?;
    if quantity == 0 {
        return None;
    }

    let order = if order_type == OrderType::Market {
        Order::market(order_id, side, quantity)
    } else {
        let price = tokens[4].parse::<i32>().ok()?;
        Order::new(order_type, order_id, side, price, quantity)
    };
    Some(Command::Add(order))
}

fn parse_cancel(tokens: &[String]) -> Option<Command> {
    // C, orderId
    if tokens.len() != 2 {
        return None;
    }
    let order_id = tokens[1].parse::<OrderId>().ok()?;
    Some(Command::Cancel(order_id))
}

fn parse_modify(tokens: &[String]) -> Option<Command> {
    // M, orderId, side, price, qty
    if tokens.len() != 5 {
        return None;
    }

    let order_id = tokens[1].parse::<OrderId>().ok()?;
    let side = Side::from_char(tokens[2].chars().next()?)?;
    let price = tokens[3].parse::<i32>().ok()?;
    let quantity = tokens[4].parse::<u32>().ok()?;
    if quantity == 0 {
        return None;
    }
    Some(Command::Modify(OrderModify::new(
        order_id, side, price, quantity,
    )))
}

/// Token for a time-in-force, as accepted by [`parse_line`].
pub fn order_type_token(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::GoodTillCancel => "GTC",
        OrderType::FillAndKill => "FAK",
        OrderType::FillOrKill => "FOK",
        OrderType::GoodForDay => "GFD",
        OrderType::Market => "MKT",
    }
}

pub fn order_type_from_token(token: &str) -> Option<OrderType> {
    match token {
        "GTC" => Some(OrderType::GoodTillCancel),
        "FAK" => Some(OrderType::FillAndKill),
        "FOK" => Some(OrderType::FillOrKill),
        "GFD" => Some(OrderType::GoodForDay),
        "MKT" => Some(OrderType::Market),
        _ => None,
    }
}

/// Format a trade as a `T` line.
pub fn format_trade(trade: &Trade) -> String {
    format!(
        "T, {}, {}, {}, {}, {}",
        trade.bid.order_id,
        trade.bid.price,
        trade.ask.order_id,
        trade.ask.price,
        trade.quantity()
    )
}

/// Format a depth snapshot as `D` lines, bids before asks, best first.
pub fn format_depth(depth: &Depth) -> Vec<String> {
    let mut lines = Vec::with_capacity(depth.bids.len() + depth.asks.len());
    for level in &depth.bids {
        lines.push(format!("D, B, {}, {}", level.price, level.quantity));
    }
    for level in &depth.asks {
        lines.push(format!("D, S, {}, {}", level.price, level.quantity));
    }
    lines
}

/// Format a rejected command as an `E` line.
pub fn format_error(error: &OrderbookError) -> String {
    format!("E, {error}")
}

fn split_and_trim(s: &str, delimiter: char) -> Vec<String> {
    s.split(delimiter)
        .map(|token| token.trim().to_string())
        .collect()
}
