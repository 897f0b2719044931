//! OMCI and OpenOLT injection.
//!
//! Single entry point [`inject`]: build the requested frame (or control
//! RPC), open a plaintext channel to the OLT and dispatch. The result is
//! always a human-readable string; builder failures are surfaced with an
//! `ERROR:` prefix and never reach the wire.

pub mod openolt;
mod stress;

use std::time::Duration;

use tonic::Request;
use tracing::warn;

use crate::omci::{builder, OmciError};
use crate::schema;

use openolt::{Empty, OmciMsg, Onu, OpenoltClient};

/// Result string for a delivered `OmciMsgOut` (the RPC has no payload).
pub const INJECTED_OK: &str = "OMCI message injected!";

/// Supported injection types, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    OltGetOnuInfo,
    OltGetOnuStatistics,
    OltGetDeviceInfo,
    OmciSetAllocId,
    OmciSetAdminState0,
    OmciGetRequest,
    OmciSetRequest,
    OmciCreateRequest,
    OmciDeleteRequest,
    OmciMibResetRequest,
    OmciMibUploadRequest,
    OmciMibUploadProcess,
    OmciRebootRequest,
    OmciGetAllAlarmsRequest,
    OmciCustomMessage,
    OmciStresstest,
    OmciStresstestMulti,
}

impl InjectionKind {
    /// Map a control-surface type string onto a kind. `None` means the
    /// caller should answer `Unknown Injection`.
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name {
            "OLT_GetOnuInfo" => Self::OltGetOnuInfo,
            "OLT_GetOnuStatistics" => Self::OltGetOnuStatistics,
            "OLT_GetDeviceInfo" => Self::OltGetDeviceInfo,
            "OMCI_SetAllocId" => Self::OmciSetAllocId,
            "OMCI_SetAdminState0" => Self::OmciSetAdminState0,
            "OMCI_GetRequest" => Self::OmciGetRequest,
            "OMCI_SetRequest" => Self::OmciSetRequest,
            "OMCI_CreateRequest" => Self::OmciCreateRequest,
            "OMCI_DeleteRequest" => Self::OmciDeleteRequest,
            "OMCI_MibResetRequest" => Self::OmciMibResetRequest,
            "OMCI_MIBUploadRequest" => Self::OmciMibUploadRequest,
            "OMCI_MIBUploadProcess" => Self::OmciMibUploadProcess,
            "OMCI_RebootRequest" => Self::OmciRebootRequest,
            "OMCI_GetAllAlarmsRequest" => Self::OmciGetAllAlarmsRequest,
            "OMCI_CustomMessage" => Self::OmciCustomMessage,
            "OMCI_Stresstest" => Self::OmciStresstest,
            "OMCI_StresstestMulti" => Self::OmciStresstestMulti,
            _ => return None,
        };
        Some(kind)
    }
}

/// Parameters shared by every injection type. Unused fields are ignored by
/// the kinds that do not need them.
#[derive(Debug, Clone, Default)]
pub struct InjectionRequest {
    /// OLT agent address, `host:port`.
    pub olt: String,
    /// Per-call deadline in seconds; also the wall-clock budget of stress
    /// runs.
    pub timeout_s: u64,
    pub intf_id: u32,
    pub onu_id: u32,
    pub tid: u16,
    pub instance_id: u16,
    pub class_id: u16,
    pub commands: u32,
    /// Attribute text for Set/Create; client count for the multi-client
    /// stress test.
    pub attributes: String,
    /// Caller-supplied hex frame for custom messages.
    pub message: String,
}

/// Dispatch one injection and render the outcome as text.
pub async fn inject(kind: InjectionKind, request: &InjectionRequest) -> String {
    // The multi-client stress test opens one channel per client itself.
    if kind == InjectionKind::OmciStresstestMulti {
        return stress::run_multi(request).await;
    }

    let mut client = match OpenoltClient::connect(&request.olt).await {
        Ok(client) => client,
        Err(err) => {
            warn!(%err, olt = %request.olt, "client connect failed");
            return err.to_string();
        }
    };

    let registry = schema::registry();
    let deadline = Duration::from_secs(request.timeout_s);

    match kind {
        InjectionKind::OltGetOnuInfo => {
            let rpc = with_deadline(
                Onu {
                    intf_id: request.intf_id,
                    onu_id: request.onu_id,
                },
                deadline,
            );
            match client.get_onu_info(rpc).await {
                Ok(response) => format!("{response:?}"),
                Err(status) => status.to_string(),
            }
        }
        InjectionKind::OltGetOnuStatistics => {
            let rpc = with_deadline(
                Onu {
                    intf_id: request.intf_id,
                    onu_id: request.onu_id,
                },
                deadline,
            );
            match client.get_onu_statistics(rpc).await {
                Ok(response) => format!("{response:?}"),
                Err(status) => status.to_string(),
            }
        }
        InjectionKind::OltGetDeviceInfo => {
            match client.get_device_info(with_deadline(Empty {}, deadline)).await {
                Ok(response) => format!("{response:?}"),
                Err(status) => status.to_string(),
            }
        }
        InjectionKind::OmciSetAllocId => {
            let built = builder::set_alloc_id(request.tid, request.instance_id);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciSetAdminState0 => {
            let built = builder::set_admin_state0(request.tid);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciGetRequest => {
            let built =
                builder::get_request(registry, request.tid, request.instance_id, request.class_id);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciSetRequest => {
            let built = builder::set_request(
                registry,
                request.tid,
                request.instance_id,
                request.class_id,
                &request.attributes,
            );
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciCreateRequest => {
            let built = builder::create_request(
                registry,
                request.tid,
                request.instance_id,
                request.class_id,
                &request.attributes,
            );
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciDeleteRequest => {
            let built = builder::delete_request(request.tid, request.instance_id, request.class_id);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciMibResetRequest => {
            let built = builder::mib_reset_request(request.tid);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciMibUploadRequest => {
            let built = builder::mib_upload_request(request.tid);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciMibUploadProcess => stress::run_mib_upload(&mut client, request).await,
        InjectionKind::OmciRebootRequest => {
            let built = builder::reboot_request(request.tid);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciGetAllAlarmsRequest => {
            let built = builder::get_all_alarms_request(request.tid);
            send_omci(&mut client, request, Some(deadline), built).await
        }
        InjectionKind::OmciCustomMessage => {
            send_omci(
                &mut client,
                request,
                Some(deadline),
                Ok(request.message.clone()),
            )
            .await
        }
        InjectionKind::OmciStresstest => stress::run_single(&mut client, request, None).await,
        InjectionKind::OmciStresstestMulti => stress::run_multi(request).await,
    }
}

fn with_deadline<T>(message: T, deadline: Duration) -> Request<T> {
    let mut request = Request::new(message);
    request.set_timeout(deadline);
    request
}

/// Deliver one built frame over `OmciMsgOut`. Builder failures short-circuit
/// with the `ERROR:` prefix; RPC failures come back as the status text.
async fn send_omci(
    client: &mut OpenoltClient,
    request: &InjectionRequest,
    deadline: Option<Duration>,
    built: Result<String, OmciError>,
) -> String {
    let frame_hex = match built {
        Ok(frame_hex) => frame_hex,
        Err(err) => return format!("ERROR: {err}"),
    };

    let msg = OmciMsg {
        intf_id: request.intf_id,
        onu_id: request.onu_id,
        pkt: frame_hex.into_bytes(),
    };
    let mut rpc = Request::new(msg);
    if let Some(deadline) = deadline {
        rpc.set_timeout(deadline);
    }

    match client.omci_msg_out(rpc).await {
        Ok(_) => INJECTED_OK.to_string(),
        Err(status) => status.to_string(),
    }
}
