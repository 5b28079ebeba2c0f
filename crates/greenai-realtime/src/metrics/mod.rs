//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Total connections established
    connections_total: AtomicU64,
    /// Connections currently registered
    connections_active: AtomicU64,
    /// Total messages enqueued to clients
    messages_sent: AtomicU64,
    /// Total messages received from clients
    messages_received: AtomicU64,
    /// Notifications delivered to at least one live connection
    notifications_live: AtomicU64,
    /// Notifications handed to the offline push path
    notifications_pushed: AtomicU64,
    /// Inbound events rejected by the rate limiter
    events_rate_limited: AtomicU64,
    /// Connections closed by the inactivity reaper
    connections_reaped: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn connection_closed(&self) {
        // Saturating: a shutdown race must not wrap the gauge.
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Record `count` messages enqueued to clients
    pub fn messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a message received from a client
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a live notification delivery
    pub fn notification_live(&self) {
        self.notifications_live.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an offline push attempt
    pub fn notification_pushed(&self) {
        self.notifications_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate-limited inbound event
    pub fn event_rate_limited(&self) {
        self.events_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed for inactivity
    pub fn connection_reaped(&self) {
        self.connections_reaped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            notifications_live: self.notifications_live.load(Ordering::Relaxed),
            notifications_pushed: self.notifications_pushed.load(Ordering::Relaxed),
            events_rate_limited: self.events_rate_limited.load(Ordering::Relaxed),
            connections_reaped: self.connections_reaped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Total messages sent
    pub messages_sent: u64,
    /// Total messages received
    pub messages_received: u64,
    /// Notifications delivered live
    pub notifications_live: u64,
    /// Notifications sent to the push path
    pub notifications_pushed: u64,
    /// Inbound events dropped by rate limiting
    pub events_rate_limited: u64,
    /// Connections closed for inactivity
    pub connections_reaped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_gauge_never_wraps() {
        let metrics = RealtimeMetrics::new();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.connection_closed();
        let snap = metrics.snapshot();
        assert_eq!(snap.connections_total, 1);
        assert_eq!(snap.connections_active, 0);
    }
}
