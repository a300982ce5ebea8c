//! Process-wide request rate governor
//!
//! Every outbound request, from the walker and from every enrichment task,
//! waits for one tick of a shared interval. One tick admits exactly one
//! caller, so request starts are serialized globally: with N concurrent
//! callers each one sees roughly 1/N of the nominal rate.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Shared ticking gate bounding request frequency
#[derive(Debug)]
pub struct RateGovernor {
    /// None when throttling is disabled
    ticker: Option<Mutex<Interval>>,
}

impl RateGovernor {
    /// Creates a governor admitting one caller per `pause_ms` milliseconds
    ///
    /// A pause of zero disables throttling; `acquire` then never waits.
    /// The first admission happens one full period after construction.
    /// A non-zero pause must be configured from within a Tokio runtime.
    pub fn new(pause_ms: u64) -> Self {
        if pause_ms == 0 {
            tracing::debug!("Rate governor disabled");
            return Self { ticker: None };
        }

        let pause = Duration::from_millis(pause_ms);
        let mut ticker = time::interval_at(Instant::now() + pause, pause);
        // A late caller consumes the overdue tick, and the next one is a
        // full period later, keeping consecutive admissions >= pause apart.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!("Rate governor set to one request per {:?}", pause);

        Self {
            ticker: Some(Mutex::new(ticker)),
        }
    }

    /// Returns a governor that never throttles
    pub fn unthrottled() -> Self {
        Self::new(0)
    }

    /// Returns true if `acquire` can block
    pub fn is_enabled(&self) -> bool {
        self.ticker.is_some()
    }

    /// Waits until the calling task may start one request
    ///
    /// Waiters queue on a fair mutex, so admission is roughly FIFO.
    pub async fn acquire(&self) {
        let Some(ticker) = &self.ticker else {
            return;
        };

        tracing::trace!("Waiting for rate governor tick");
        let mut ticker = ticker.lock().await;
        ticker.tick().await;
        tracing::trace!("Rate governor admitted request");
    }
}
