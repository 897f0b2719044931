use std::collections::VecDeque;

use pcap::{Linktype, PacketHeader};

use crate::omci::MessageRecord;

/// Raw packet bytes plus the capture header needed to re-write them.
#[derive(Clone)]
pub struct CapturedPacket {
    pub header: PacketHeader,
    pub data: Vec<u8>,
}

/// One ring entry: a packet and every record decoded out of it.
#[derive(Clone)]
pub struct PacketEntry {
    pub packet: CapturedPacket,
    pub records: Vec<MessageRecord>,
}

/// Bounded FIFO of packets that produced OMCI records. The oldest entry is
/// evicted once the configured capacity is reached.
pub struct PacketRing {
    entries: VecDeque<PacketEntry>,
    capacity: usize,
    linktype: Linktype,
}

impl PacketRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            linktype: Linktype::ETHERNET,
        }
    }

    pub fn push(&mut self, entry: PacketEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Capacity changes apply to subsequent pushes; existing overflow is
    /// trimmed immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn set_linktype(&mut self, linktype: Linktype) {
        self.linktype = linktype;
    }

    pub fn linktype(&self) -> Linktype {
        self.linktype
    }

    pub fn entries(&self) -> impl Iterator<Item = &PacketEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{CapturedPacket, PacketEntry, PacketRing};

    fn entry(tag: u8) -> PacketEntry {
        let header = pcap::PacketHeader {
            ts: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            caplen: 1,
            len: 1,
        };
        PacketEntry {
            packet: CapturedPacket {
                header,
                data: vec![tag],
            },
            records: Vec::new(),
        }
    }

    #[test]
    fn ring_evicts_oldest_first() {
        let mut ring = PacketRing::new(2);
        ring.push(entry(1));
        ring.push(entry(2));
        ring.push(entry(3));

        assert_eq!(ring.len(), 2);
        let tags: Vec<u8> = ring.entries().map(|e| e.packet.data[0]).collect();
        assert_eq!(tags, [2, 3]);
    }

    #[test]
    fn ring_never_exceeds_capacity() {
        let mut ring = PacketRing::new(4);
        for i in 0..32 {
            ring.push(entry(i));
            assert!(ring.len() <= 4);
        }
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn shrinking_capacity_trims_front() {
        let mut ring = PacketRing::new(4);
        for i in 0..4 {
            ring.push(entry(i));
        }
        ring.set_capacity(2);
        let tags: Vec<u8> = ring.entries().map(|e| e.packet.data[0]).collect();
        assert_eq!(tags, [2, 3]);
    }
}
