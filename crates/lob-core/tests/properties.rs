//! Property tests: random operation sequences against a mirror model.
//!
//! The mirror tracks, per live order, its initial quantity and the
//! quantity filled through emitted trades. Comparing it against the book
//! after every operation checks conservation (fills never appear or
//! vanish), membership (size agrees), and the structural invariants.

use std::collections::HashMap;

use proptest::prelude::*;

use lob_core::{Order, OrderModify, OrderType, Orderbook, Side, Trades};

#[derive(Debug, Clone)]
enum Op {
    Add {
        order_type: OrderType,
        order_id: u64,
        side: Side,
        price: i32,
        quantity: u32,
    },
    Cancel {
        order_id: u64,
    },
    Modify {
        order_id: u64,
        side: Side,
        price: i32,
        quantity: u32,
    },
}

#[derive(Debug)]
struct Record {
    order_type: OrderType,
    initial: u32,
    filled: u32,
}

fn order_type_strategy() -> impl Strategy<Value = OrderType> {
    prop_oneof![
        4 => Just(OrderType::GoodTillCancel),
        2 => Just(OrderType::GoodForDay),
        1 => Just(OrderType::FillAndKill),
        1 => Just(OrderType::FillOrKill),
        1 => Just(OrderType::Market),
    ]
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (
            order_type_strategy(),
            0u64..25,
            side_strategy(),
            -5i32..=15,
            1u32..=30,
        )
            .prop_map(|(order_type, order_id, side, price, quantity)| Op::Add {
                order_type,
                order_id,
                side,
                price,
                quantity,
            }),
        2 => (0u64..25).prop_map(|order_id| Op::Cancel { order_id }),
        1 => (0u64..25, side_strategy(), -5i32..=15, 1u32..=30).prop_map(
            |(order_id, side, price, quantity)| Op::Modify {
                order_id,
                side,
                price,
                quantity,
            }
        ),
    ]
}

/// Apply emitted trades to the mirror, dropping records that filled.
fn apply_trades(records: &mut HashMap<u64, Record>, trades: &Trades) {
    for trade in trades {
        for leg in [trade.bid, trade.ask] {
            let record = records
                .get_mut(&leg.order_id)
                .expect("trade names an order the mirror does not know");
            record.filled += leg.quantity;
            assert!(record.filled <= record.initial, "order overfilled");
            if record.filled == record.initial {
                records.remove(&leg.order_id);
            }
        }
    }
}

fn check_against_mirror(book: &Orderbook, records: &HashMap<u64, Record>) {
    book.check_invariants().unwrap();
    assert_eq!(book.size(), records.len());
    for (&order_id, record) in records {
        let resting = book
            .get(order_id)
            .expect("mirror believes a missing order is live");
        assert_eq!(
            resting.remaining_quantity(),
            record.initial - record.filled,
            "conservation broken for order {order_id}"
        );
    }
}

proptest! {
    #[test]
    fn random_sessions_preserve_the_invariants(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut book = Orderbook::new();
        let mut records: HashMap<u64, Record> = HashMap::new();

        for op in ops {
            match op {
                Op::Add { order_type, order_id, side, price, quantity } => {
                    let order = if order_type == OrderType::Market {
                        Order::market(order_id, side, quantity)
                    } else {
                        Order::new(order_type, order_id, side, price, quantity)
                    };
                    if let Ok(trades) = book.add_order(order) {
                        records.insert(order_id, Record { order_type, initial: quantity, filled: 0 });
                        apply_trades(&mut records, &trades);
                        match order_type {
                            // An IOC residual is canceled at quiescence.
                            OrderType::FillAndKill => { records.remove(&order_id); }
                            // A FOK that was admitted must have filled completely.
                            OrderType::FillOrKill => prop_assert!(!records.contains_key(&order_id)),
                            // A market residual rests as GTC.
                            OrderType::Market => {
                                if let Some(record) = records.get_mut(&order_id) {
                                    record.order_type = OrderType::GoodTillCancel;
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Op::Cancel { order_id } => {
                    match book.cancel_order(order_id) {
                        Ok(()) => { prop_assert!(records.remove(&order_id).is_some()); }
                        Err(_) => prop_assert!(!records.contains_key(&order_id)),
                    }
                }
                Op::Modify { order_id, side, price, quantity } => {
                    let order_type = records.get(&order_id).map(|record| record.order_type);
                    match book.modify_order(OrderModify::new(order_id, side, price, quantity)) {
                        Ok(trades) => {
                            let order_type = order_type.expect("modify succeeded on unknown id");
                            records.insert(order_id, Record { order_type, initial: quantity, filled: 0 });
                            apply_trades(&mut records, &trades);
                        }
                        Err(_) => prop_assert!(!records.contains_key(&order_id)),
                    }
                }
            }
            check_against_mirror(&book, &records);
        }
    }

    #[test]
    fn add_then_cancel_is_a_no_op(
        resting in prop::collection::vec(
            (side_strategy(), 1u32..=20, any::<bool>()),
            0..30,
        ),
        probe_side in side_strategy(),
        probe_quantity in 1u32..=20,
        probe_offset in 0i32..9,
    ) {
        let mut book = Orderbook::new();
        // Bids stay at or below 99 and asks at or above 101, so nothing
        // crosses and the book under test is exactly what was admitted.
        for (order_id, (side, quantity, near)) in resting.iter().enumerate() {
            let price = match side {
                Side::Buy => if *near { 99 } else { 95 },
                Side::Sell => if *near { 101 } else { 105 },
            };
            book.add_order(Order::new(
                OrderType::GoodTillCancel,
                order_id as u64,
                *side,
                price,
                *quantity,
            )).unwrap();
        }

        let before_depth = book.snapshot();
        let before_size = book.size();

        let price = match probe_side {
            Side::Buy => 91 + probe_offset,
            Side::Sell => 101 + probe_offset,
        };
        book.add_order(Order::new(
            OrderType::GoodTillCancel,
            1_000_000,
            probe_side,
            price,
            probe_quantity,
        )).unwrap();
        book.cancel_order(1_000_000).unwrap();

        prop_assert_eq!(book.snapshot(), before_depth);
        prop_assert_eq!(book.size(), before_size);
        book.check_invariants().unwrap();
    }

    #[test]
    fn fifo_fills_the_older_order_first(
        first_quantity in 2u32..50,
        second_quantity in 1u32..50,
        taken in 1u32..50,
    ) {
        prop_assume!(taken < first_quantity);

        let mut book = Orderbook::new();
        book.add_order(Order::new(OrderType::GoodTillCancel, 1, Side::Buy, 100, first_quantity)).unwrap();
        book.add_order(Order::new(OrderType::GoodTillCancel, 2, Side::Buy, 100, second_quantity)).unwrap();

        let trades = book.add_order(Order::new(
            OrderType::GoodTillCancel,
            3,
            Side::Sell,
            100,
            taken,
        )).unwrap();

        prop_assert_eq!(trades.len(), 1);
        prop_assert_eq!(trades[0].bid.order_id, 1);
        prop_assert_eq!(trades[0].quantity(), taken);
        prop_assert_eq!(
            book.get(1).unwrap().remaining_quantity(),
            first_quantity - taken
        );
        prop_assert_eq!(book.get(2).unwrap().remaining_quantity(), second_quantity);
    }
}
