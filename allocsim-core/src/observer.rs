//! Session observers: hooks for tracing what the replay loop does.

use crate::domain::{SimulationEvent, Timestamp};
use crate::trading::TargetAllocation;
use chrono::NaiveDate;

/// Callbacks invoked by the session; every method defaults to a no-op.
pub trait SessionObserver: Send {
    fn on_run_started(&mut self, _start: Timestamp, _end: Timestamp) {}

    fn on_event(&mut self, _event: &SimulationEvent) {}

    fn on_rebalance(&mut self, _ts: Timestamp, _allocations: &[TargetAllocation]) {}

    fn on_equity_recorded(&mut self, _date: NaiveDate, _equity: f64) {}

    fn on_run_finished(&mut self, _equity_points: usize, _rebalances: usize) {}
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// Emits `tracing` events: lifecycle at `info`, per-event detail at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_run_started(&mut self, start: Timestamp, end: Timestamp) {
        tracing::info!(%start, %end, "beginning backtest simulation");
    }

    fn on_event(&mut self, event: &SimulationEvent) {
        tracing::debug!(ts = %event.timestamp, kind = %event.event_type, "event");
    }

    fn on_rebalance(&mut self, ts: Timestamp, allocations: &[TargetAllocation]) {
        tracing::debug!(%ts, records = allocations.len(), "trading logic and rebalance");
    }

    fn on_equity_recorded(&mut self, date: NaiveDate, equity: f64) {
        tracing::trace!(%date, equity, "equity recorded");
    }

    fn on_run_finished(&mut self, equity_points: usize, rebalances: usize) {
        tracing::info!(equity_points, rebalances, "ending backtest simulation");
    }
}
