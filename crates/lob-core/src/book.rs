//! Book storage: price levels, FIFO queues, and the order arena.
//!
//! Resting orders live in a [`slab::Slab`] arena; each node carries
//! intrusive prev/next links forming the FIFO queue of its price level.
//! Levels are keyed by price in one `BTreeMap` per side (bids read
//! best-to-worst via `next_back`, asks via `next`). A separate id index
//! gives O(1) lookup for cancel and modify. A handle is a plain slab key
//! and stays valid until its node is removed.
//!
//! Every node also carries an arrival sequence number. FIFO order within
//! a level is structural; the sequence number settles which of two
//! crossing orders arrived first across levels, which decides the maker.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

use slab::Slab;

use crate::order::Order;
use crate::order_type::OrderType;
use crate::side::Side;
use crate::types::{OrderId, Price, Quantity};

/// Stable handle to a resting order node.
pub(crate) type Handle = usize;

fn to_nz(handle: Handle) -> NonZeroUsize {
    NonZeroUsize::new(handle + 1).unwrap()
}

fn from_nz(nz: NonZeroUsize) -> Handle {
    nz.get() - 1
}

#[derive(Debug)]
struct Node {
    order: Order,
    seq: u64,
    prev: Option<NonZeroUsize>,
    next: Option<NonZeroUsize>,
}

/// FIFO queue of resting orders at one price.
#[derive(Debug, Default)]
pub(crate) struct Level {
    head: Option<NonZeroUsize>,
    tail: Option<NonZeroUsize>,
    len: usize,
}

impl Level {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn front(&self) -> Option<Handle> {
        self.head.map(from_nz)
    }
}

/// FIFO iterator over the handles of one level.
struct LevelIter<'a> {
    arena: &'a Slab<Node>,
    cur: Option<NonZeroUsize>,
}

impl Iterator for LevelIter<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let nz = self.cur?;
        let handle = from_nz(nz);
        self.cur = self.arena[handle].next;
        Some(handle)
    }
}

/// Two-sided storage: price levels, the node arena, and the id index.
#[derive(Debug, Default)]
pub(crate) struct Book {
    bids: BTreeMap<Price, Level>,
    asks: BTreeMap<Price, Level>,
    arena: Slab<Node>,
    index: HashMap<OrderId, Handle>,
    next_seq: u64,
}

impl Book {
    pub fn new() -> Self {
        Book::default()
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    pub fn handle(&self, order_id: OrderId) -> Option<Handle> {
        self.index.get(&order_id).copied()
    }

    pub fn order(&self, handle: Handle) -> &Order {
        &self.arena[handle].order
    }

    pub fn order_mut(&mut self, handle: Handle) -> &mut Order {
        &mut self.arena[handle].order
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.handle(order_id).map(|handle| self.order(handle))
    }

    /// Arrival sequence of a resting order; smaller arrived earlier.
    pub fn seq(&self, handle: Handle) -> u64 {
        self.arena[handle].seq
    }

    /// Best price and front handle of a side: highest bid, lowest ask.
    pub fn best(&self, side: Side) -> Option<(Price, Handle)> {
        let (price, level) = match side {
            Side::Buy => self.bids.iter().next_back()?,
            Side::Sell => self.asks.iter().next()?,
        };
        Some((*price, level.front()?))
    }

    /// Opposite extreme of [`Book::best`]: lowest bid, highest ask. Used
    /// to reprice market orders so they cross every resting level.
    pub fn worst(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.bids.keys().next().copied(),
            Side::Sell => self.asks.keys().next_back().copied(),
        }
    }

    /// Levels of one side, best price first, with their aggregate
    /// remaining quantity.
    pub fn aggregated_levels(
        &self,
        side: Side,
    ) -> Box<dyn Iterator<Item = (Price, Quantity)> + '_> {
        let sum = move |(price, level): (&Price, &Level)| (*price, self.level_quantity(level));
        match side {
            Side::Buy => Box::new(self.bids.iter().rev().map(sum)),
            Side::Sell => Box::new(self.asks.iter().map(sum)),
        }
    }

    /// Ids of all resting good-for-day orders, in no particular order.
    pub fn good_for_day_ids(&self) -> Vec<OrderId> {
        self.index
            .iter()
            .filter(|&(_, &handle)| self.arena[handle].order.order_type() == OrderType::GoodForDay)
            .map(|(&order_id, _)| order_id)
            .collect()
    }

    /// Append an order to the tail of its price level, creating the
    /// level if absent, and index it. The caller has already checked the
    /// id is not live.
    pub fn push_back(&mut self, order: Order) -> Handle {
        let side = order.side();
        let price = order.price();
        let order_id = order.order_id();

        let seq = self.next_seq;
        self.next_seq += 1;

        let handle = self.arena.insert(Node {
            order,
            seq,
            prev: None,
            next: None,
        });
        let handle_nz = to_nz(handle);

        let prev_tail = {
            let level = self.levels_mut(side).entry(price).or_default();
            let prev_tail = level.tail;
            level.tail = Some(handle_nz);
            if prev_tail.is_none() {
                level.head = Some(handle_nz);
            }
            level.len += 1;
            prev_tail
        };

        if let Some(tail) = prev_tail {
            self.arena[from_nz(tail)].next = Some(handle_nz);
        }
        self.arena[handle].prev = prev_tail;

        self.index.insert(order_id, handle);
        handle
    }

    /// Unlink a node from its level, drop the level if it emptied, and
    /// remove the node from the index and arena. Returns the order.
    pub fn remove(&mut self, handle: Handle) -> Order {
        let (side, price, order_id, prev, next) = {
            let node = &self.arena[handle];
            (
                node.order.side(),
                node.order.price(),
                node.order.order_id(),
                node.prev,
                node.next,
            )
        };

        if let Some(prev) = prev {
            self.arena[from_nz(prev)].next = next;
        }
        if let Some(next) = next {
            self.arena[from_nz(next)].prev = prev;
        }

        let mut drop_level = false;
        if let Some(level) = self.levels_mut(side).get_mut(&price) {
            if prev.is_none() {
                level.head = next;
            }
            if next.is_none() {
                level.tail = prev;
            }
            level.len -= 1;
            drop_level = level.is_empty();
        }
        if drop_level {
            self.levels_mut(side).remove(&price);
        }

        self.index.remove(&order_id);
        self.arena.remove(handle).order
    }

    /// Walk the book checking the structural invariants: queue and index
    /// agree, no empty level keys, no market or fully-filled order at
    /// rest, arrival order within each level. Returns the first problem
    /// found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut queued = 0usize;
        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for (&price, level) in levels {
                if level.is_empty() {
                    return Err(format!("empty level at {price:?} on {side:?}"));
                }
                let mut walked = 0usize;
                let mut last_seq = None;
                for handle in (LevelIter {
                    arena: &self.arena,
                    cur: level.head,
                }) {
                    let node = &self.arena[handle];
                    let order = &node.order;
                    if order.side() != side || order.price() != price {
                        return Err(format!("order {} linked to the wrong level", order.order_id()));
                    }
                    if order.order_type() == OrderType::Market {
                        return Err(format!("market order {} at rest", order.order_id()));
                    }
                    if order.is_filled() || order.remaining_quantity() > order.initial_quantity() {
                        return Err(format!("order {} rests with bad quantity", order.order_id()));
                    }
                    if self.index.get(&order.order_id()) != Some(&handle) {
                        return Err(format!("order {} missing from the index", order.order_id()));
                    }
                    if let Some(last) = last_seq {
                        if node.seq <= last {
                            return Err(format!("level {price:?} out of arrival order"));
                        }
                    }
                    last_seq = Some(node.seq);
                    walked += 1;
                }
                if walked != level.len() {
                    return Err(format!("level {price:?} length {} != walked {walked}", level.len()));
                }
                queued += walked;
            }
        }
        if queued != self.index.len() {
            return Err(format!(
                "queued orders {queued} != indexed orders {}",
                self.index.len()
            ));
        }
        Ok(())
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Price, Level> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn level_quantity(&self, level: &Level) -> Quantity {
        LevelIter {
            arena: &self.arena,
            cur: level.head,
        }
        .map(|handle| self.arena[handle].order.remaining_quantity())
        .sum()
    }
}
