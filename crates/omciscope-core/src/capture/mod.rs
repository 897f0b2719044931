//! Capture pipeline: context, counters and the packet ring.
//!
//! All mutable pipeline state lives in an explicit [`CaptureContext`] handle
//! created by the embedding application and shared across the offline
//! scanner, the live sniffer and the control surface. Tests build their own
//! contexts.

mod live;
mod offline;
mod ring;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::omci::MessageRecord;

pub use ring::{CapturedPacket, PacketEntry, PacketRing};

/// Errors raised by capture drivers and the ring exporter.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture error: {0}")]
    Pcap(#[from] pcap::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sniffer already running")]
    AlreadyRunning,
}

/// Shared pipeline counters. Written by the capture task, read by anyone;
/// reset only through [`CaptureStats::reset`].
#[derive(Debug, Default)]
pub struct CaptureStats {
    total_packets: AtomicU64,
    seen_packets: AtomicU64,
    omci_messages: AtomicU64,
    decoding_errors: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_packets: u64,
    pub seen_packets: u64,
    pub omci_messages: u64,
    pub decoding_errors: u64,
}

impl CaptureStats {
    pub fn note_total_packet(&self) {
        self.total_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_seen_packet(&self) {
        self.seen_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the message number assigned to the new record.
    pub fn note_omci_message(&self) -> u64 {
        self.omci_messages.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn note_decoding_error(&self) {
        self.decoding_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_packets: self.total_packets.load(Ordering::Relaxed),
            seen_packets: self.seen_packets.load(Ordering::Relaxed),
            omci_messages: self.omci_messages.load(Ordering::Relaxed),
            decoding_errors: self.decoding_errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total_packets.store(0, Ordering::Relaxed);
        self.seen_packets.store(0, Ordering::Relaxed);
        self.omci_messages.store(0, Ordering::Relaxed);
        self.decoding_errors.store(0, Ordering::Relaxed);
    }
}

/// Live-sniffer bookkeeping behind the context.
#[derive(Default)]
struct LiveState {
    stop: Option<Arc<std::sync::atomic::AtomicBool>>,
    handle: Option<std::thread::JoinHandle<()>>,
    receiver: Option<mpsc::Receiver<MessageRecord>>,
}

/// Handle tying together configuration, counters, the packet ring and the
/// live sniffer. Created once in `main` and threaded through the pipeline.
pub struct CaptureContext {
    config: RwLock<Config>,
    stats: CaptureStats,
    ring: Mutex<PacketRing>,
    live: Mutex<LiveState>,
}

impl CaptureContext {
    pub fn new(config: Config) -> Self {
        let capacity = config.buffer_capacity();
        Self {
            config: RwLock::new(config),
            stats: CaptureStats::default(),
            ring: Mutex::new(PacketRing::new(capacity)),
            live: Mutex::new(LiveState::default()),
        }
    }

    pub fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_config(&self, config: Config) {
        let capacity = config.buffer_capacity();
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.ring().set_capacity(capacity);
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn ring_len(&self) -> usize {
        self.ring().len()
    }

    pub fn clear_ring(&self) {
        self.ring().clear();
    }

    /// Drain whatever the live queue currently holds, without blocking.
    pub fn drain_live(&self) -> Vec<MessageRecord> {
        let mut live = self.live();
        let Some(receiver) = live.receiver.as_mut() else {
            return Vec::new();
        };
        let mut records = Vec::new();
        while let Ok(record) = receiver.try_recv() {
            records.push(record);
        }
        records
    }

    /// Hand the live queue to a streaming consumer. Single-consumer: the
    /// receiver moves out and subsequent drains yield nothing until the
    /// sniffer is restarted.
    pub fn live_stream(&self) -> Option<tokio_stream::wrappers::ReceiverStream<MessageRecord>> {
        self.live()
            .receiver
            .take()
            .map(tokio_stream::wrappers::ReceiverStream::new)
    }

    fn ring(&self) -> MutexGuard<'_, PacketRing> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self) -> MutexGuard<'_, LiveState> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_stats(&self) {
        let snapshot = self.stats.snapshot();
        info!(
            total_packets = snapshot.total_packets,
            seen_packets = snapshot.seen_packets,
            omci_messages = snapshot.omci_messages,
            decoding_errors = snapshot.decoding_errors,
            "capture statistics"
        );
    }
}

/// Capture timestamp in the local timezone when it can be determined.
fn packet_timestamp(header: &pcap::PacketHeader) -> OffsetDateTime {
    let base = OffsetDateTime::from_unix_timestamp(header.ts.tv_sec as i64)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::microseconds(header.ts.tv_usec as i64);
    base.to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

#[cfg(test)]
mod tests {
    use super::{CaptureContext, CaptureStats};
    use crate::config::Config;

    #[test]
    fn stats_reset() {
        let stats = CaptureStats::default();
        stats.note_total_packet();
        stats.note_seen_packet();
        assert_eq!(stats.note_omci_message(), 1);
        assert_eq!(stats.note_omci_message(), 2);
        stats.note_decoding_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_packets, 1);
        assert_eq!(snapshot.omci_messages, 2);

        stats.reset();
        assert_eq!(stats.snapshot().omci_messages, 0);
    }

    #[test]
    fn context_applies_buffer_coercion() {
        let ctx = CaptureContext::new(Config {
            buffer: 0,
            ..Config::default()
        });
        assert_eq!(ctx.config().buffer_capacity(), 10000);
    }

    #[test]
    fn drain_without_sniffer_is_empty() {
        let ctx = CaptureContext::new(Config::default());
        assert!(ctx.drain_live().is_empty());
        assert!(ctx.live_stream().is_none());
    }

    #[test]
    fn context_reset_and_reconfigure() {
        let ctx = CaptureContext::new(Config::default());
        ctx.stats().note_total_packet();
        ctx.reset_stats();
        assert_eq!(ctx.stats_snapshot().total_packets, 0);

        ctx.clear_ring();
        assert_eq!(ctx.ring_len(), 0);

        ctx.set_config(Config {
            buffer: 32,
            ..Config::default()
        });
        assert_eq!(ctx.config().buffer, 32);
    }
}
