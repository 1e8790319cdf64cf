//! Engine facade: lock discipline, worker lifecycle, expiry sweep.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Timelike, Utc};

use lob_core::{Engine, EngineConfig, ExpiryError, Order, OrderType, Side};

fn gtc(order_id: u64, side: Side, price: i32, quantity: u32) -> Order {
    Order::new(OrderType::GoodTillCancel, order_id, side, price, quantity)
}

#[test]
fn start_rejects_an_unknown_time_zone() {
    let mut engine = Engine::with_config(EngineConfig {
        expiry_zone: "Not/AZone".to_string(),
        ..EngineConfig::default()
    });
    assert_eq!(
        engine.start(),
        Err(ExpiryError::TimezoneUnavailable("Not/AZone".to_string()))
    );
}

#[test]
fn shutdown_interrupts_a_sleeping_worker() {
    let mut engine = Engine::new();
    engine.start().unwrap();
    // The next session close is hours away; shutdown must not wait for it.
    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    engine.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn operations_are_serialized_across_threads() {
    let engine = Arc::new(Engine::new());

    let mut handles = Vec::new();
    for worker in 0..4u64 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100u64 {
                let order_id = worker * 1_000 + i;
                let (side, price) = if worker % 2 == 0 {
                    (Side::Buy, 90 + (i % 5) as i32)
                } else {
                    (Side::Sell, 106 + (i % 5) as i32)
                };
                engine.add_order(gtc(order_id, side, price, 1)).unwrap();
            }
            for i in (0..100u64).step_by(2) {
                engine.cancel_order(worker * 1_000 + i).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.size(), 200);
    engine.check_invariants().unwrap();
}

#[test]
fn good_for_day_orders_expire_at_the_session_close() {
    // Schedule the close a moment from now, in a fixed zone so the
    // arithmetic is exact. Skip past midnight first if needed: a close
    // time that wraps the day boundary would land tomorrow.
    loop {
        let now = Utc::now();
        if now.hour() == 23 && now.minute() == 59 && now.second() >= 55 {
            thread::sleep(Duration::from_secs(6));
        } else {
            break;
        }
    }

    let close = (Utc::now() + chrono::Duration::seconds(2)).time();
    let mut engine = Engine::with_config(EngineConfig {
        expiry_zone: "UTC".to_string(),
        expiry_time: close,
    });
    engine.start().unwrap();

    engine
        .add_order(Order::new(OrderType::GoodForDay, 1, Side::Buy, 100, 5))
        .unwrap();
    engine
        .add_order(Order::new(OrderType::GoodForDay, 2, Side::Sell, 110, 5))
        .unwrap();
    engine.add_order(gtc(3, Side::Buy, 99, 5)).unwrap();
    assert_eq!(engine.size(), 3);

    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.size() != 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }

    // Only the good-till-cancel order survives the sweep.
    assert_eq!(engine.size(), 1);
    assert_eq!(engine.snapshot().bids.len(), 1);
    engine.check_invariants().unwrap();
    engine.shutdown();
}
