//! Stress workloads: MIB upload sequences and Get floods.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::omci::{builder, layout, OmciError};
use crate::schema;

use super::openolt::{OmciMsg, OpenoltClient};
use super::{send_omci, InjectionRequest, INJECTED_OK};

const NO_COMMANDS: &str = "No. commands is 0!";
/// Usable transaction-id space partitioned across parallel clients.
const TID_SPACE: u32 = 65000;

/// Per-client stress outcome collected by the multi-client aggregator.
#[derive(Debug, Clone, Copy)]
pub(super) struct StressSample {
    pub count: u64,
    pub mps: f64,
}

/// Pre-build the Get flood against ONU Data. Transaction ids are the
/// contiguous run starting at `tid`; the reserved id 0 is skipped and the
/// run extended by one so the frame count is preserved.
fn build_stress_frames(tid: u16, commands: u32) -> Result<Vec<String>, OmciError> {
    let registry = schema::registry();
    let mut frames = Vec::with_capacity(commands as usize);
    let mut commands = commands;
    let mut i = 0u32;
    while i < commands {
        let mut next = tid.wrapping_add(i as u16);
        if next == layout::RESERVED_TID {
            i += 1;
            commands += 1;
            next = tid.wrapping_add(i as u16);
        }
        frames.push(builder::get_request(
            registry,
            next,
            0,
            layout::ONU_DATA_CLASS_ID,
        )?);
        i += 1;
    }
    Ok(frames)
}

/// Serial MIB upload: `commands` MibUploadNext frames with consecutive
/// transaction ids and sequence numbers. Returns the last send's result.
pub(super) async fn run_mib_upload(
    client: &mut OpenoltClient,
    request: &InjectionRequest,
) -> String {
    let mut result = NO_COMMANDS.to_string();
    for i in 0..request.commands {
        let built = builder::mib_upload_next_request(request.tid.wrapping_add(i as u16), i as u16);
        result = send_omci(client, request, None, built).await;
    }
    result
}

/// Single-client stress run. Frames are pre-built, then sent serially until
/// the command count is exhausted or the wall clock passes `timeout_s`.
/// Send failures replace the running result but never abort the run.
pub(super) async fn run_single(
    client: &mut OpenoltClient,
    request: &InjectionRequest,
    sink: Option<mpsc::Sender<StressSample>>,
) -> String {
    if request.commands == 0 {
        return NO_COMMANDS.to_string();
    }

    let frames = match build_stress_frames(request.tid, request.commands) {
        Ok(frames) => frames,
        Err(err) => return err.to_string(),
    };

    let started = Instant::now();
    let mut counter = 0u64;
    let mut result = String::new();

    for frame_hex in frames {
        let msg = OmciMsg {
            intf_id: request.intf_id,
            onu_id: request.onu_id,
            pkt: frame_hex.into_bytes(),
        };
        result = match client.omci_msg_out(tonic::Request::new(msg)).await {
            Ok(_) => INJECTED_OK.to_string(),
            Err(status) => status.to_string(),
        };

        counter += 1;
        if started.elapsed().as_secs_f64() > request.timeout_s as f64 {
            break;
        }
    }
    debug!(last_result = %result, "stress run finished");

    let elapsed = started.elapsed().as_secs_f64();
    let mps = counter as f64 / elapsed;
    if let Some(sink) = sink {
        let _ = sink.send(StressSample { count: counter, mps }).await;
    }

    format!("Injected {counter} messages in {elapsed:.3} seconds! ({mps:.3} msg/s)")
}

/// Multi-client stress run. The transaction-id space is partitioned across
/// `processes` clients (parsed from the attributes field), each with its
/// own channel; the aggregate sums counts and per-client throughput.
pub(super) async fn run_multi(request: &InjectionRequest) -> String {
    let processes: u32 = match request.attributes.trim().parse() {
        Ok(processes) => processes,
        Err(err) => return format!("PROCESSES ERROR: {err}"),
    };
    if processes == 0 || processes > TID_SPACE {
        return "Bad number of clients!".to_string();
    }

    let tid_interval = (TID_SPACE / processes) as u16;
    let (sender, mut receiver) = mpsc::channel(processes as usize);
    let started = Instant::now();

    for k in 0..processes {
        let mut client = match OpenoltClient::connect(&request.olt).await {
            Ok(client) => client,
            Err(err) => {
                warn!(%err, "stress client connect failed");
                return err.to_string();
            }
        };

        let mut sub = request.clone();
        sub.tid = request
            .tid
            .wrapping_add((k as u16).wrapping_mul(tid_interval));
        let sender = sender.clone();
        tokio::spawn(async move {
            run_single(&mut client, &sub, Some(sender)).await;
        });
    }
    drop(sender);

    // Unordered fan-in; ends once every client reported (or died early).
    let mut total_count = 0u64;
    let mut total_mps = 0f64;
    while let Some(sample) = receiver.recv().await {
        total_count += sample.count;
        total_mps += sample.mps;
    }

    let elapsed = started.elapsed().as_secs_f64();
    format!("Injected {total_count} messages in {elapsed:.3} seconds! ({total_mps:.3} msg/s)")
}

#[cfg(test)]
mod tests {
    use super::build_stress_frames;

    fn tid_of(frame_hex: &str) -> u16 {
        let bytes = hex::decode(frame_hex).unwrap();
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    #[test]
    fn stress_frames_skip_reserved_tid() {
        let frames = build_stress_frames(0xFFFB, 10).unwrap();
        let tids: Vec<u16> = frames.iter().map(|f| tid_of(f)).collect();
        assert_eq!(
            tids,
            [0xFFFB, 0xFFFC, 0xFFFD, 0xFFFE, 0xFFFF, 0x0001, 0x0002, 0x0003, 0x0004, 0x0005]
        );
    }

    #[test]
    fn stress_frames_preserve_count() {
        for (tid, commands) in [(1u16, 7u32), (0xFFFE, 5), (42, 1)] {
            let frames = build_stress_frames(tid, commands).unwrap();
            assert_eq!(frames.len(), commands as usize);
            assert!(frames.iter().all(|f| tid_of(f) != 0));
        }
    }

    #[test]
    fn stress_frames_are_contiguous_modulo_skip() {
        let frames = build_stress_frames(10, 4).unwrap();
        let tids: Vec<u16> = frames.iter().map(|f| tid_of(f)).collect();
        assert_eq!(tids, [10, 11, 12, 13]);
    }
}
