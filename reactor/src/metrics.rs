//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reactor metrics
//!
//! Every update is mirrored to the `metrics` facade so an installed recorder
//! sees the same numbers the local counters hold.

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free counters shared by the reactor and its channels
#[derive(Debug)]
pub struct ReactorMetrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    closed_connections: AtomicU64,
    rejected_connections: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    frames_received: AtomicU64,
    requests_sent: AtomicU64,
    channel_errors: AtomicU64,
    total_connection_duration_ns: AtomicU64,
    started_at: Instant,
}

impl Default for ReactorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            closed_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            channel_errors: AtomicU64::new(0),
            total_connection_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    /// Record a new connection being opened
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        counter!("vimoir.connections.total").increment(1);
        gauge!("vimoir.connections.active").increment(1.0);
    }

    /// Record a connection being closed
    pub fn connection_closed(&self, duration: Duration) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.closed_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connection_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        gauge!("vimoir.connections.active").decrement(1.0);
    }

    /// Record a peer turned away by the single session policy
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
        counter!("vimoir.connections.rejected").increment(1);
    }

    /// Get the current number of active connections
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the total number of connections since start
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    // Throughput tracking

    /// Record bytes sent
    pub fn bytes_sent(&self, count: u64) {
        self.bytes_sent.fetch_add(count, Ordering::Relaxed);
        counter!("vimoir.bytes.sent").increment(count);
    }

    /// Record bytes received
    pub fn bytes_received(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
        counter!("vimoir.bytes.received").increment(count);
    }

    /// Record complete frames received
    pub fn frames_received(&self, count: u64) {
        self.frames_received.fetch_add(count, Ordering::Relaxed);
        counter!("vimoir.frames.received").increment(count);
    }

    /// Record an outbound request
    pub fn request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        counter!("vimoir.requests.sent").increment(1);
    }

    /// Record a channel closed because of an error
    pub fn channel_error(&self) {
        self.channel_errors.fetch_add(1, Ordering::Relaxed);
        counter!("vimoir.channel.errors").increment(1);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            channel_errors: self.channel_errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_connection_duration: self.average_connection_duration(),
        }
    }

    fn average_connection_duration(&self) -> Duration {
        let closed = self.closed_connections.load(Ordering::Relaxed);
        if closed == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_connection_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / closed)
    }
}

/// A snapshot of reactor metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Connections accepted or established since start
    pub total_connections: u64,
    /// Currently open connections
    pub active_connections: u64,
    /// Peers rejected by the single session policy
    pub rejected_connections: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total frames received
    pub frames_received: u64,
    /// Total requests sent
    pub requests_sent: u64,
    /// Channels closed after an error
    pub channel_errors: u64,
    /// Time since the metrics were created
    pub uptime: Duration,
    /// Average lifetime of a closed connection
    pub avg_connection_duration: Duration,
}
