//! Offline scanning of saved captures and ring-buffer export.

use std::path::{Path, PathBuf};
use std::time::Instant;

use pcap::Capture;
use time::OffsetDateTime;
use tracing::info;

use crate::config::Config;
use crate::extract;
use crate::omci::{Decoder, MessageRecord};
use crate::schema;

use super::ring::{CapturedPacket, PacketEntry};
use super::{packet_timestamp, CaptureContext, CaptureError};

/// Capture files re-scanned in a loop by the benchmark mode.
const PERF_EVAL_SUFFIX: &str = "perfeval.pcap";

/// Apply the default name and the `.pcap` suffix rule.
fn normalize_pcap_name(filename: &str) -> String {
    let name = if filename.is_empty() {
        "testfile.pcap"
    } else {
        filename
    };
    if name.ends_with(".pcap") {
        name.to_string()
    } else {
        format!("{name}.pcap")
    }
}

impl CaptureContext {
    /// Scan a capture under the configured pcap directory and return every
    /// decoded record. Matching packets are also appended to the ring.
    ///
    /// The sentinel name `perfeval.pcap` switches to benchmark mode: the
    /// file is re-opened and re-scanned until the record list reaches the
    /// buffer capacity, and the elapsed wall time is logged.
    pub fn scan_file(&self, filename: &str) -> Result<Vec<MessageRecord>, CaptureError> {
        let config = self.config();
        let name = normalize_pcap_name(filename);
        let path = config.pcap_dir.join(&name);

        self.ring().set_capacity(config.buffer_capacity());

        let mut records = Vec::new();
        if !name.ends_with(PERF_EVAL_SUFFIX) {
            self.scan_once(&path, &config, None, &mut records)?;
        } else {
            let capacity = config.buffer_capacity();
            let started = Instant::now();
            while records.len() < capacity {
                self.scan_once(&path, &config, Some(capacity), &mut records)?;
            }
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                records = records.len(),
                "processed packets"
            );
        }

        self.log_stats();
        Ok(records)
    }

    fn scan_once(
        &self,
        path: &Path,
        config: &Config,
        limit: Option<usize>,
        out: &mut Vec<MessageRecord>,
    ) -> Result<(), CaptureError> {
        let mut capture = Capture::from_file(path)?;
        capture.filter(&config.filter, true)?;
        let linktype = capture.get_datalink();
        self.ring().set_linktype(linktype);

        let decoder = Decoder::new(schema::registry(), self.stats());
        loop {
            let packet = match capture.next_packet() {
                Ok(packet) => packet,
                Err(pcap::Error::NoMorePackets) => break,
                Err(err) => return Err(err.into()),
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

            if !records.is_empty() {
                self.ring().push(PacketEntry {
                    packet: CapturedPacket {
                        header: *packet.header,
                        data: packet.data.to_vec(),
                    },
                    records: records.clone(),
                });
                out.extend(records);
            }

            if let Some(limit) = limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Write the ring's packets to a capture file under the pcap directory.
    /// Returns the number of packets written and the path, or `(0, "")`
    /// when the ring is empty.
    pub fn export_ring(&self, filename: &str) -> Result<(usize, String), CaptureError> {
        let config = self.config();
        let path = export_path(&config, filename);

        let ring = self.ring();
        if ring.is_empty() {
            return Ok((0, String::new()));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let dead = Capture::dead(ring.linktype())?;
        let mut savefile = dead.savefile(&path)?;
        let mut written = 0usize;
        for entry in ring.entries() {
            savefile.write(&pcap::Packet::new(
                &entry.packet.header,
                &entry.packet.data,
            ));
            written += 1;
        }
        savefile.flush()?;

        Ok((written, path.display().to_string()))
    }

    /// Snapshot of the ring for consumers that need packets and records
    /// together.
    pub fn ring_snapshot(&self) -> Vec<PacketEntry> {
        self.ring().entries().cloned().collect()
    }
}

fn export_path(config: &Config, filename: &str) -> PathBuf {
    let name = if filename.is_empty() {
        format!("pcap{}.pcap", OffsetDateTime::now_utc().unix_timestamp())
    } else {
        normalize_pcap_name(filename)
    };
    config.pcap_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::normalize_pcap_name;

    #[test]
    fn normalize_applies_default_and_suffix() {
        assert_eq!(normalize_pcap_name(""), "testfile.pcap");
        assert_eq!(normalize_pcap_name("trace"), "trace.pcap");
        assert_eq!(normalize_pcap_name("trace.pcap"), "trace.pcap");
    }
}
