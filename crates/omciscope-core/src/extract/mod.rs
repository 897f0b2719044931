//! OMCI extraction from captured TCP payloads.
//!
//! The OpenOLT transport carries OMCI frames in two encodings inside the
//! same gRPC stream: OLT-originated requests travel as an ASCII-hex string
//! field, ONU-originated responses as raw frame bytes. Rather than
//! reimplement the gRPC framing, the extractor scans each payload for the
//! baseline trailer in both views and hands every candidate window to the
//! decoder. The heuristic favours recall: the same frame appearing in both
//! views is emitted twice on purpose, and downstream consumers deduplicate
//! by transaction id, timestamp and contents.

pub mod error;
pub mod tcp;

use pcap::Linktype;
use time::OffsetDateTime;

use crate::capture::CaptureStats;
use crate::omci::{layout, Decoder, MessageRecord};

pub use tcp::{parse_tcp_packet, TcpPacket};

/// Coarse lower bound on gRPC-framed payloads worth scanning.
pub const MIN_PAYLOAD_LEN: usize = 60;

/// Minimum trailer offset for a text-view candidate: 80 hex chars of frame
/// plus the 11-byte request prefix carrying interface and ONU ids.
const TEXT_VIEW_MIN_INDEX: usize = 91;
/// Minimum trailer offset for a hex-view candidate: 80 hex chars of frame
/// plus 22 hex chars of response prefix.
const HEX_VIEW_MIN_INDEX: usize = 102;

/// All offsets of the frame trailer in `haystack`, overlapping matches
/// included (the search advances one position per hit).
fn marker_offsets(haystack: &[u8]) -> Vec<usize> {
    let marker: &[u8] = &layout::TRAILER_HEX[..];
    let mut offsets = Vec::new();
    let mut start = 0usize;
    while start + marker.len() <= haystack.len() {
        match haystack[start..]
            .windows(marker.len())
            .position(|window| window == marker)
        {
            Some(pos) => {
                offsets.push(start + pos);
                start += pos + 1;
            }
            None => break,
        }
    }
    offsets
}

fn strip_leading_zero(text: &str) -> String {
    match text.strip_prefix('0') {
        Some(stripped) => stripped.to_string(),
        None => text.to_string(),
    }
}

/// Process one captured packet: slice to TCP, apply the length cut, scan
/// both payload views and decode every surviving candidate. Records are
/// stamped with the packet timestamp and endpoints.
pub fn process_packet(
    decoder: &Decoder<'_>,
    stats: &CaptureStats,
    linktype: Linktype,
    timestamp: Option<OffsetDateTime>,
    data: &[u8],
) -> Vec<MessageRecord> {
    let tcp = match parse_tcp_packet(linktype, data) {
        Ok(Some(tcp)) => tcp,
        Ok(None) | Err(_) => return Vec::new(),
    };

    if tcp.payload.len() < MIN_PAYLOAD_LEN {
        return Vec::new();
    }
    stats.note_seen_packet();

    let source = format!("{}:{}", tcp.src_ip, tcp.src_port);
    let destination = format!("{}:{}", tcp.dst_ip, tcp.dst_port);
    let mut records = Vec::new();

    // Text view: the payload bytes already are the frame's hex form.
    let payload = tcp.payload;
    for idx in marker_offsets(payload) {
        if idx < TEXT_VIEW_MIN_INDEX {
            continue;
        }
        let Some(window) = payload.get(idx - 80..idx + 8) else {
            continue;
        };
        if !window.iter().all(u8::is_ascii) {
            continue;
        }
        let Ok(candidate) = std::str::from_utf8(window) else {
            continue;
        };
        if let Some(mut record) = decoder.decode_hex(candidate) {
            record.interface_id = strip_leading_zero(&hex::encode([payload[idx - 91]]));
            record.onu_id = strip_leading_zero(&hex::encode([payload[idx - 86]]));
            record.timestamp = timestamp;
            record.source = source.clone();
            record.destination = destination.clone();
            records.push(record);
        }
    }

    // Hex view: raw frame bytes become hex by re-encoding the payload.
    let hex_payload = hex::encode(payload);
    let hex_bytes = hex_payload.as_bytes();
    for idx in marker_offsets(hex_bytes) {
        if idx < HEX_VIEW_MIN_INDEX {
            continue;
        }
        // Keep the CRC when the window holds a full 48-byte response.
        let end = if idx + 16 <= hex_payload.len() {
            idx + 16
        } else {
            idx + 8
        };
        let candidate = &hex_payload[idx - 80..end];
        if let Some(mut record) = decoder.decode_hex(candidate) {
            record.interface_id = strip_leading_zero(&hex_payload[idx - 102..idx - 100]);
            record.onu_id = strip_leading_zero(&hex_payload[idx - 92..idx - 90]);
            record.timestamp = timestamp;
            record.source = source.clone();
            record.destination = destination.clone();
            records.push(record);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::{marker_offsets, process_packet, strip_leading_zero, MIN_PAYLOAD_LEN};
    use crate::capture::CaptureStats;
    use crate::omci::{builder, Decoder, MessageType};
    use crate::schema::registry;
    use etherparse::PacketBuilder;
    use pcap::Linktype;

    fn tcp_packet(payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 0, 1], [192, 168, 0, 2], 64)
            .tcp(9191, 40000, 1, 1024);
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, payload).unwrap();
        packet
    }

    /// 11-byte request prefix placing interface id at the first byte and
    /// ONU id five bytes before the frame start.
    fn request_prefix(interface: u8, onu: u8) -> Vec<u8> {
        let mut prefix = vec![0u8; 11];
        prefix[0] = interface;
        prefix[5] = onu;
        prefix
    }

    #[test]
    fn marker_offsets_overlapping_scan() {
        let haystack = b"..0000002800000028..";
        assert_eq!(marker_offsets(haystack), vec![2, 10]);
        assert_eq!(marker_offsets(b"000000028"), vec![1]);
        assert_eq!(marker_offsets(b"no marker"), Vec::<usize>::new());
    }

    #[test]
    fn strip_single_leading_zero() {
        assert_eq!(strip_leading_zero("01"), "1");
        assert_eq!(strip_leading_zero("00"), "0");
        assert_eq!(strip_leading_zero("1f"), "1f");
    }

    #[test]
    fn extract_text_view_request() {
        let stats = CaptureStats::default();
        let decoder = Decoder::new(registry(), &stats);

        let frame_hex = builder::get_request(registry(), 0x0101, 0, 256).unwrap();
        let mut payload = request_prefix(0x01, 0x02);
        payload.extend_from_slice(frame_hex.as_bytes());
        assert!(payload.len() >= MIN_PAYLOAD_LEN);

        let packet = tcp_packet(&payload);
        let records = process_packet(&decoder, &stats, Linktype::ETHERNET, None, &packet);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.message_type, MessageType::GetRequest);
        assert_eq!(record.interface_id, "1");
        assert_eq!(record.onu_id, "2");
        assert_eq!(record.source, "192.168.0.1:9191");
        assert_eq!(record.destination, "192.168.0.2:40000");
        assert_eq!(stats.snapshot().seen_packets, 1);
    }

    #[test]
    fn extract_hex_view_response_with_crc() {
        let stats = CaptureStats::default();
        let decoder = Decoder::new(registry(), &stats);

        // Raw response bytes: 44-byte frame plus CRC, preceded by 12 bytes
        // of transport prefix so the payload clears the length cut.
        let frame_hex = builder::mib_reset_request(0x0007).unwrap();
        let mut frame = hex::decode(&frame_hex).unwrap();
        frame[2] = 0x2F; // flip to MibResetResponse, contents already zero
        frame.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut payload = vec![0u8; 12];
        payload[1] = 0x03; // interface id, 102 hex chars before the trailer
        payload[6] = 0x04; // onu id
        payload.extend_from_slice(&frame);
        assert_eq!(payload.len(), MIN_PAYLOAD_LEN);

        let packet = tcp_packet(&payload);
        let records = process_packet(&decoder, &stats, Linktype::ETHERNET, None, &packet);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.message_type, MessageType::MibResetResponse);
        assert_eq!(record.interface_id, "3");
        assert_eq!(record.onu_id, "4");
    }

    #[test]
    fn extract_emits_duplicates_across_views() {
        let stats = CaptureStats::default();
        let decoder = Decoder::new(registry(), &stats);

        // Same frame once as ASCII hex and once as raw bytes in a single
        // payload: the recall-first scan reports it from both views.
        let frame_hex = builder::get_request(registry(), 0x0101, 0, 2).unwrap();
        let mut payload = request_prefix(0x01, 0x02);
        payload.extend_from_slice(frame_hex.as_bytes());
        payload.extend_from_slice(&hex::decode(&frame_hex).unwrap());

        let packet = tcp_packet(&payload);
        let records = process_packet(&decoder, &stats, Linktype::ETHERNET, None, &packet);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].transaction_id, records[1].transaction_id);
        assert_eq!(stats.snapshot().omci_messages, 2);
    }

    #[test]
    fn short_payload_is_skipped() {
        let stats = CaptureStats::default();
        let decoder = Decoder::new(registry(), &stats);

        let packet = tcp_packet(&[0u8; MIN_PAYLOAD_LEN - 1]);
        let records = process_packet(&decoder, &stats, Linktype::ETHERNET, None, &packet);

        assert!(records.is_empty());
        assert_eq!(stats.snapshot().seen_packets, 0);
    }

    #[test]
    fn non_tcp_packet_is_skipped() {
        let stats = CaptureStats::default();
        let decoder = Decoder::new(registry(), &stats);

        let builder = PacketBuilder::ethernet2([1, 1, 1, 1, 1, 1], [2, 2, 2, 2, 2, 2])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(9191, 9191);
        let payload = [0u8; 80];
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();

        let records = process_packet(&decoder, &stats, Linktype::ETHERNET, None, &packet);
        assert!(records.is_empty());
    }
}
