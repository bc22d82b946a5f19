//! Observability and Metrics
//!
//! Counters for monitoring a session: connections, handshakes, traffic and
//! inbound frame health.
//!
//! Uses atomic counters so a snapshot can be read from another task while the
//! session keeps running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for one session
#[derive(Debug)]
pub struct Metrics {
    /// Transports attached
    pub connections_total: AtomicU64,
    /// Transports currently open
    pub connections_active: AtomicU64,
    /// Handshakes issued
    pub handshakes_total: AtomicU64,
    /// Total messages sent
    pub messages_sent: AtomicU64,
    /// Total messages received
    pub messages_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Sends dropped because no transport was open
    pub sends_dropped: AtomicU64,
    /// Inbound frames that could not be decoded
    pub malformed_frames: AtomicU64,
    /// Inbound frames with a bad checksum
    pub checksum_failures: AtomicU64,
    /// Inbound packets carrying an application error
    pub application_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            handshakes_total: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            sends_dropped: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            checksum_failures: AtomicU64::new(0),
            application_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a transport being attached
    pub fn connection_attempt(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport reporting open
    pub fn connection_established(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an open transport closing
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a handshake being issued
    pub fn handshake_sent(&self) {
        self.handshakes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message sent
    pub fn message_sent(&self, byte_count: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a message received
    pub fn message_received(&self, byte_count: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a send dropped while closed
    pub fn send_dropped(&self) {
        self.sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an undecodable inbound frame
    pub fn malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound checksum mismatch
    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound application error
    pub fn application_error(&self) {
        self.application_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            handshakes_total: self.handshakes_total.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            sends_dropped: self.sends_dropped.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            application_errors: self.application_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            handshakes_total = snapshot.handshakes_total,
            messages_sent = snapshot.messages_sent,
            messages_received = snapshot.messages_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            sends_dropped = snapshot.sends_dropped,
            malformed_frames = snapshot.malformed_frames,
            checksum_failures = snapshot.checksum_failures,
            application_errors = snapshot.application_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Session metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub handshakes_total: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub sends_dropped: u64,
    pub malformed_frames: u64,
    pub checksum_failures: u64,
    pub application_errors: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.connection_attempt();
        metrics.connection_established();
        metrics.message_sent(10);
        metrics.message_sent(6);
        metrics.message_received(8);
        metrics.send_dropped();
        metrics.connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_total, 1);
        assert_eq!(snapshot.connections_active, 0);
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.bytes_sent, 16);
        assert_eq!(snapshot.bytes_received, 8);
        assert_eq!(snapshot.sends_dropped, 1);
    }
}
