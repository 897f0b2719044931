//! Live sniffing on a network interface.
//!
//! One capture thread reads packets, feeds the extractor and publishes the
//! resulting records onto a bounded queue. The queue blocks the capture
//! thread when full, which backpressures the interface read loop. The read
//! handle runs with a short timeout so the stop flag is observed promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use pcap::{Active, Capture, Linktype};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::extract;
use crate::omci::{Decoder, MessageRecord};
use crate::schema;

use super::ring::{CapturedPacket, PacketEntry};
use super::{packet_timestamp, CaptureContext, CaptureError};

const SNAPLEN: i32 = 1600;
const READ_TIMEOUT_MS: i32 = 500;

impl CaptureContext {
    /// Open the configured interface in promiscuous mode and start the
    /// capture thread. Fails when a sniffer is already running.
    pub fn start_sniffer(self: &Arc<Self>) -> Result<(), CaptureError> {
        let mut live = self.live();
        if live.handle.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let config = self.config();
        let mut capture = Capture::from_device(config.interface.as_str())?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .open()?;
        capture.filter(&config.filter, true)?;
        let linktype = capture.get_datalink();

        let capacity = config.buffer_capacity();
        {
            let mut ring = self.ring();
            ring.set_capacity(capacity);
            ring.set_linktype(linktype);
        }

        let (sender, receiver) = mpsc::channel(capacity);
        let stop = Arc::new(AtomicBool::new(false));

        let ctx = Arc::clone(self);
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("omci-sniffer".to_string())
            .spawn(move || ctx.sniff_loop(capture, linktype, stop_flag, sender))?;

        info!(interface = %config.interface, filter = %config.filter, "sniffer started");
        live.stop = Some(stop);
        live.handle = Some(handle);
        live.receiver = Some(receiver);
        Ok(())
    }

    /// Stop the capture thread and close the record queue. Queued records
    /// that nobody consumed are discarded.
    pub fn stop_sniffer(&self) {
        let (stop, handle) = {
            let mut live = self.live();
            (live.stop.take(), live.handle.take())
        };

        let Some(handle) = handle else {
            return;
        };
        if let Some(stop) = stop {
            stop.store(true, Ordering::Relaxed);
        }
        // Frees a sender blocked on a full queue when no consumer is
        // attached, so the join below cannot stall.
        let _ = self.drain_live();
        let _ = handle.join();
        info!("sniffer stopped");
    }

    fn sniff_loop(
        &self,
        mut capture: Capture<Active>,
        linktype: Linktype,
        stop: Arc<AtomicBool>,
        sender: mpsc::Sender<MessageRecord>,
    ) {
        let decoder = Decoder::new(schema::registry(), self.stats());

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let packet = match capture.next_packet() {
                Ok(packet) => packet,
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(err) => {
                    warn!(%err, "live capture terminated");
                    break;
                }
            };

            let timestamp = packet_timestamp(packet.header);
            let records = extract::process_packet(
                &decoder,
                self.stats(),
                linktype,
                Some(timestamp),
                packet.data,
            );
            self.stats().note_total_packet();

            if records.is_empty() {
                continue;
            }

            self.ring().push(PacketEntry {
                packet: CapturedPacket {
                    header: *packet.header,
                    data: packet.data.to_vec(),
                },
                records: records.clone(),
            });

            for record in records {
                // Bounded queue: a full queue blocks here and throttles the
                // read loop. A dropped receiver ends the capture.
                if sender.blocking_send(record).is_err() {
                    self.log_stats();
                    return;
                }
            }
        }

        self.log_stats();
    }
}
