use std::net::IpAddr;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap::Linktype;

use super::error::TcpError;

/// DLT_RAW: packets start at the IP header.
const LINKTYPE_RAW: Linktype = Linktype(101);

/// Parsed TCP segment with source/destination endpoints.
pub struct TcpPacket<'a> {
    pub src_ip: IpAddr,
    pub src_port: u16,
    pub dst_ip: IpAddr,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

/// Parse a TCP segment from a link-layer frame.
///
/// Returns `Ok(None)` when the packet is not TCP or the linktype is not
/// handled.
pub fn parse_tcp_packet(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<TcpPacket<'_>>, TcpError> {
    let sliced = if linktype == Linktype::ETHERNET {
        SlicedPacket::from_ethernet(data).map_err(|e| TcpError::Slice(e.to_string()))?
    } else if linktype == LINKTYPE_RAW {
        SlicedPacket::from_ip(data).map_err(|e| TcpError::Slice(e.to_string()))?
    } else {
        return Ok(None);
    };

    let net = sliced.net.ok_or(TcpError::MissingNetworkLayer)?;
    let transport = match sliced.transport {
        Some(transport) => transport,
        None => return Ok(None),
    };
    let tcp = match transport {
        TransportSlice::Tcp(tcp) => tcp,
        _ => return Ok(None),
    };

    let (src_ip, dst_ip) = match net {
        NetSlice::Ipv4(ref ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ref ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
    };

    Ok(Some(TcpPacket {
        src_ip,
        src_port: tcp.source_port(),
        dst_ip,
        dst_port: tcp.destination_port(),
        payload: tcp.payload(),
    }))
}

#[cfg(test)]
mod tests {
    use super::parse_tcp_packet;
    use crate::extract::error::TcpError;
    use etherparse::PacketBuilder;
    use pcap::Linktype;

    #[test]
    fn parse_tcp_ok() {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 0, 1], [192, 168, 0, 2], 64)
            .tcp(9191, 40000, 1, 1024);
        let payload = [1, 2, 3, 4];
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();

        let parsed = parse_tcp_packet(Linktype::ETHERNET, &packet).unwrap();
        let parsed = parsed.unwrap();
        assert_eq!(parsed.src_port, 9191);
        assert_eq!(parsed.dst_port, 40000);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn parse_non_tcp() {
        let builder = PacketBuilder::ethernet2([1, 1, 1, 1, 1, 1], [2, 2, 2, 2, 2, 2])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(9191, 9191);
        let payload = [0u8; 4];
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();

        let parsed = parse_tcp_packet(Linktype::ETHERNET, &packet).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_slice_error() {
        let result = parse_tcp_packet(Linktype::ETHERNET, &[]);
        assert!(matches!(result, Err(TcpError::Slice(_))));
    }
}
