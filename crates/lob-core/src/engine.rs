//! Thread-safe engine facade and expiry worker lifecycle.
//!
//! All book state sits behind a single mutex; every public operation
//! acquires it on entry and releases it on return, so operations are
//! totally ordered by lock acquisition. The expiry worker shares the
//! same mutex, never holds it across a sleep, and never re-enters it:
//! it collects the expiring ids under one acquisition and cancels them
//! under a second.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::depth::Depth;
use crate::error::{ExpiryError, OrderbookError};
use crate::expiry::{EngineConfig, ExpirySchedule};
use crate::order::{Order, OrderModify};
use crate::orderbook::Orderbook;
use crate::trade::Trades;
use crate::types::OrderId;

/// Extra delay past the session-close boundary so the sweep never races
/// the minute edge.
const WAKE_SLACK_MS: i64 = 100;

/// Matching engine for one instrument, safe to share across threads.
pub struct Engine {
    shared: Arc<Shared>,
    config: EngineConfig,
    worker: Option<JoinHandle<()>>,
}

struct Shared {
    book: Mutex<Orderbook>,
    /// Shutdown flag and condvar the worker sleeps on, so `shutdown`
    /// interrupts a wait that would otherwise last until session close.
    stopping: Mutex<bool>,
    wake: Condvar,
}

impl Engine {
    /// Construct an empty engine with the default expiry schedule
    /// (16:00 America/New_York). The worker is not started.
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            shared: Arc::new(Shared {
                book: Mutex::new(Orderbook::new()),
                stopping: Mutex::new(false),
                wake: Condvar::new(),
            }),
            config,
            worker: None,
        }
    }

    /// Start the expiry worker. The configured time zone is resolved
    /// here, before the thread spawns, so an unresolvable zone reaches
    /// the host synchronously instead of dying inside the worker.
    /// Idempotent while the worker is running.
    pub fn start(&mut self) -> Result<(), ExpiryError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let schedule = ExpirySchedule::from_config(&self.config)?;
        *self.shared.stopping.lock() = false;

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("lob-expiry".to_string())
            .spawn(move || run_expiry_worker(&shared, schedule))
            .map_err(|e| ExpiryError::WorkerSpawn(e.to_string()))?;
        self.worker = Some(handle);
        info!(zone = %self.config.expiry_zone, "expiry worker started");
        Ok(())
    }

    /// Signal the worker and join it. Safe to call without `start`;
    /// called from `Drop` as well.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        *self.shared.stopping.lock() = true;
        self.shared.wake.notify_all();
        if handle.join().is_err() {
            warn!("expiry worker panicked");
        }
    }

    pub fn add_order(&self, order: Order) -> Result<Trades, OrderbookError> {
        self.shared.book.lock().add_order(order)
    }

    pub fn cancel_order(&self, order_id: OrderId) -> Result<(), OrderbookError> {
        self.shared.book.lock().cancel_order(order_id)
    }

    pub fn cancel_orders(&self, order_ids: &[OrderId]) -> Result<(), OrderbookError> {
        self.shared.book.lock().cancel_orders(order_ids)
    }

    pub fn modify_order(&self, modify: OrderModify) -> Result<Trades, OrderbookError> {
        self.shared.book.lock().modify_order(modify)
    }

    pub fn snapshot(&self) -> Depth {
        self.shared.book.lock().snapshot()
    }

    pub fn size(&self) -> usize {
        self.shared.book.lock().size()
    }

    /// Audit hook: verify the book's structural invariants.
    pub fn check_invariants(&self) -> Result<(), OrderbookError> {
        self.shared.book.lock().check_invariants()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_expiry_worker(shared: &Shared, schedule: ExpirySchedule) {
    loop {
        let target = schedule.next_from(Utc::now()) + Duration::milliseconds(WAKE_SLACK_MS);
        debug!(%target, "expiry worker sleeping until session close");

        {
            let mut stopping = shared.stopping.lock();
            loop {
                if *stopping {
                    info!("expiry worker stopping");
                    return;
                }
                let now = Utc::now();
                if now >= target {
                    break;
                }
                let wait = (target - now).to_std().unwrap_or(StdDuration::ZERO);
                let _ = shared.wake.wait_for(&mut stopping, wait);
            }
        }

        // Collect under one lock acquisition, cancel under another; an
        // id canceled by a caller in between is a benign race.
        let expired = shared.book.lock().good_for_day_ids();
        let mut swept = 0usize;
        if !expired.is_empty() {
            let mut book = shared.book.lock();
            for order_id in expired {
                match book.cancel_order(order_id) {
                    Ok(()) => swept += 1,
                    Err(OrderbookError::UnknownOrderId(_)) => {}
                    Err(e) => warn!(order_id, error = %e, "good-for-day cancel failed"),
                }
            }
        }
        info!(swept, "good-for-day expiry sweep complete");
    }
}
