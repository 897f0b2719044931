//! Hand-written OpenOLT protocol subset and gRPC client.
//!
//! Only the messages and unary calls the injector needs are modelled; the
//! structs carry `prost` derives directly instead of going through
//! build-time codegen.

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Onu {
    #[prost(fixed32, tag = "1")]
    pub intf_id: u32,
    #[prost(fixed32, tag = "2")]
    pub onu_id: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OmciMsg {
    #[prost(fixed32, tag = "1")]
    pub intf_id: u32,
    #[prost(fixed32, tag = "2")]
    pub onu_id: u32,
    /// ASCII-hex frame bytes, as the agent expects them.
    #[prost(bytes = "vec", tag = "3")]
    pub pkt: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OnuState {
    Unknown = 0,
    Active = 1,
    Inactive = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OnuInfo {
    #[prost(enumeration = "OnuState", tag = "5")]
    pub state: i32,
    #[prost(enumeration = "OnuState", tag = "6")]
    pub losi: i32,
    #[prost(enumeration = "OnuState", tag = "7")]
    pub lofi: i32,
    #[prost(enumeration = "OnuState", tag = "8")]
    pub loami: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OnuStatistics {
    #[prost(uint64, tag = "1")]
    pub rx_bytes: u64,
    #[prost(uint64, tag = "2")]
    pub rx_packets: u64,
    #[prost(uint64, tag = "3")]
    pub rx_ucast_packets: u64,
    #[prost(uint64, tag = "4")]
    pub rx_mcast_packets: u64,
    #[prost(uint64, tag = "5")]
    pub rx_bcast_packets: u64,
    #[prost(uint64, tag = "6")]
    pub rx_error_packets: u64,
    #[prost(uint64, tag = "7")]
    pub tx_bytes: u64,
    #[prost(uint64, tag = "8")]
    pub tx_packets: u64,
    #[prost(uint64, tag = "9")]
    pub tx_ucast_packets: u64,
    #[prost(uint64, tag = "10")]
    pub tx_mcast_packets: u64,
    #[prost(uint64, tag = "11")]
    pub tx_bcast_packets: u64,
    #[prost(uint64, tag = "12")]
    pub tx_error_packets: u64,
    #[prost(uint64, tag = "13")]
    pub rx_crc_errors: u64,
    #[prost(uint64, tag = "14")]
    pub bip_errors: u64,
    #[prost(fixed32, tag = "15")]
    pub timestamp: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceInfo {
    #[prost(string, tag = "1")]
    pub vendor: String,
    #[prost(string, tag = "2")]
    pub model: String,
    #[prost(string, tag = "3")]
    pub hardware_version: String,
    #[prost(string, tag = "4")]
    pub firmware_version: String,
    #[prost(string, tag = "5")]
    pub technology: String,
    #[prost(fixed32, tag = "6")]
    pub onu_id_start: u32,
    #[prost(fixed32, tag = "7")]
    pub onu_id_end: u32,
    #[prost(fixed32, tag = "12")]
    pub pon_ports: u32,
    #[prost(string, tag = "16")]
    pub device_id: String,
    #[prost(string, tag = "17")]
    pub device_serial_number: String,
}

/// Unary client over a plaintext channel to an OLT's OpenOLT agent.
pub struct OpenoltClient {
    inner: tonic::client::Grpc<Channel>,
}

impl OpenoltClient {
    /// Connect to `addr` (`host:port`) without transport security.
    pub async fn connect(addr: &str) -> Result<Self, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))?;
        Ok(Self::new(endpoint.connect().await?))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn get_onu_info(&mut self, request: Request<Onu>) -> Result<OnuInfo, Status> {
        self.unary(request, "/openolt.Openolt/GetOnuInfo").await
    }

    pub async fn get_onu_statistics(
        &mut self,
        request: Request<Onu>,
    ) -> Result<OnuStatistics, Status> {
        self.unary(request, "/openolt.Openolt/GetOnuStatistics")
            .await
    }

    pub async fn get_device_info(&mut self, request: Request<Empty>) -> Result<DeviceInfo, Status> {
        self.unary(request, "/openolt.Openolt/GetDeviceInfo").await
    }

    /// OMCI passthrough; the reply carries no payload.
    pub async fn omci_msg_out(&mut self, request: Request<OmciMsg>) -> Result<Empty, Status> {
        self.unary(request, "/openolt.Openolt/OmciMsgOut").await
    }

    async fn unary<Req, Resp>(
        &mut self,
        request: Request<Req>,
        path: &'static str,
    ) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|err| Status::unknown(format!("service was not ready: {err}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(path);
        Ok(self.inner.unary(request, path, codec).await?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::OmciMsg;

    #[test]
    fn omci_msg_round_trips_through_protobuf() {
        let msg = OmciMsg {
            intf_id: 1,
            onu_id: 2,
            pkt: b"0001490a".to_vec(),
        };
        let bytes = msg.encode_to_vec();
        let decoded = OmciMsg::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }
}
