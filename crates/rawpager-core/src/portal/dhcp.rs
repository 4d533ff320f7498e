//! Minimal DHCPv4 server for the setup access point.
//!
//! Hands out addresses from a small pool right after the portal address and
//! names the portal as router and DNS server.

use log::{debug, info, warn};

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;
pub const LEASE_SECS: u32 = 2 * 60 * 60;
pub const POOL_SIZE: usize = 8;
/// Host part of the first leased address.
pub const POOL_START: u8 = 2;

/// BOOTP replies are padded to this length.
pub const MIN_REPLY_LEN: usize = 300;

const OP_REQUEST: u8 = 1;
const OP_REPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const OPTIONS_OFFSET: usize = 240;

const OPT_PAD: u8 = 0;
const OPT_SUBNET_MASK: u8 = 1;
const OPT_ROUTER: u8 = 3;
const OPT_DNS: u8 = 6;
const OPT_REQUESTED_IP: u8 = 50;
const OPT_LEASE_TIME: u8 = 51;
const OPT_MESSAGE_TYPE: u8 = 53;
const OPT_SERVER_ID: u8 = 54;
const OPT_END: u8 = 255;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
}

impl MessageType {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Discover,
            2 => Self::Offer,
            3 => Self::Request,
            4 => Self::Decline,
            5 => Self::Ack,
            6 => Self::Nak,
            7 => Self::Release,
            8 => Self::Inform,
            _ => return None,
        })
    }

    const fn code(self) -> u8 {
        match self {
            Self::Discover => 1,
            Self::Offer => 2,
            Self::Request => 3,
            Self::Decline => 4,
            Self::Ack => 5,
            Self::Nak => 6,
            Self::Release => 7,
            Self::Inform => 8,
        }
    }
}

/// Fields of a client message the server acts on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ClientMessage {
    kind: MessageType,
    mac: [u8; 6],
    requested: Option<[u8; 4]>,
    server_id: Option<[u8; 4]>,
}

fn parse_client_message(packet: &[u8]) -> Option<ClientMessage> {
    if packet.len() < OPTIONS_OFFSET
        || packet[0] != OP_REQUEST
        || packet[1] != HTYPE_ETHERNET
        || packet[2] != 6
        || packet[236..240] != MAGIC_COOKIE
    {
        return None;
    }

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&packet[28..34]);

    let mut kind = None;
    let mut requested = None;
    let mut server_id = None;
    let ciaddr = [packet[12], packet[13], packet[14], packet[15]];

    let mut offset = OPTIONS_OFFSET;
    while offset < packet.len() {
        let code = packet[offset];
        if code == OPT_END {
            break;
        }
        if code == OPT_PAD {
            offset += 1;
            continue;
        }
        let len = usize::from(*packet.get(offset + 1)?);
        let value = packet.get(offset + 2..offset + 2 + len)?;
        match (code, value) {
            (OPT_MESSAGE_TYPE, [kind_code]) => kind = MessageType::from_code(*kind_code),
            (OPT_REQUESTED_IP, [a, b, c, d]) => requested = Some([*a, *b, *c, *d]),
            (OPT_SERVER_ID, [a, b, c, d]) => server_id = Some([*a, *b, *c, *d]),
            _ => {}
        }
        offset += 2 + len;
    }

    if requested.is_none() && ciaddr != [0; 4] {
        requested = Some(ciaddr);
    }

    Some(ClientMessage {
        kind: kind?,
        mac,
        requested,
        server_id,
    })
}

pub struct DhcpServer {
    server: [u8; 4],
    leases: [Option<[u8; 6]>; POOL_SIZE],
}

impl DhcpServer {
    pub const fn new(server: [u8; 4]) -> Self {
        Self {
            server,
            leases: [None; POOL_SIZE],
        }
    }

    pub fn leased_count(&self) -> usize {
        self.leases.iter().filter(|lease| lease.is_some()).count()
    }

    /// Handles one client packet, writing any reply into `out`.
    ///
    /// Replies go to the broadcast address on [`CLIENT_PORT`].
    pub fn handle(&mut self, packet: &[u8], out: &mut [u8]) -> Option<usize> {
        let message = parse_client_message(packet)?;

        match message.kind {
            MessageType::Discover => {
                let Some(slot) = self.slot_for(message.mac) else {
                    warn!("dhcp: pool exhausted, ignoring discover");
                    return None;
                };
                debug!("dhcp: offer slot={}", slot);
                self.write_reply(packet, MessageType::Offer, Some(self.address_of(slot)), out)
            }
            MessageType::Request => {
                if message.server_id.is_some_and(|id| id != self.server) {
                    // The client picked another server's offer.
                    self.release(message.mac);
                    return None;
                }

                let granted = self.grant(message.mac, message.requested);
                match granted {
                    Some(address) => {
                        info!(
                            "dhcp: lease {}.{}.{}.{}",
                            address[0], address[1], address[2], address[3]
                        );
                        self.write_reply(packet, MessageType::Ack, Some(address), out)
                    }
                    None => self.write_reply(packet, MessageType::Nak, None, out),
                }
            }
            MessageType::Release | MessageType::Decline => {
                self.release(message.mac);
                None
            }
            _ => None,
        }
    }

    fn address_of(&self, slot: usize) -> [u8; 4] {
        let mut address = self.server;
        address[3] = POOL_START + slot as u8;
        address
    }

    fn slot_of(&self, address: [u8; 4]) -> Option<usize> {
        if address[..3] != self.server[..3] || address[3] < POOL_START {
            return None;
        }
        let slot = usize::from(address[3] - POOL_START);
        (slot < POOL_SIZE).then_some(slot)
    }

    /// Existing lease for `mac`, else the first free slot.
    fn slot_for(&self, mac: [u8; 6]) -> Option<usize> {
        self.leases
            .iter()
            .position(|lease| *lease == Some(mac))
            .or_else(|| self.leases.iter().position(Option::is_none))
    }

    fn grant(&mut self, mac: [u8; 6], requested: Option<[u8; 4]>) -> Option<[u8; 4]> {
        let slot = match requested {
            Some(address) => {
                let slot = self.slot_of(address)?;
                match self.leases[slot] {
                    Some(owner) if owner != mac => return None,
                    _ => slot,
                }
            }
            None => self.slot_for(mac)?,
        };

        self.release(mac);
        self.leases[slot] = Some(mac);
        Some(self.address_of(slot))
    }

    fn release(&mut self, mac: [u8; 6]) {
        for lease in self.leases.iter_mut() {
            if *lease == Some(mac) {
                *lease = None;
            }
        }
    }

    fn write_reply(
        &self,
        request: &[u8],
        kind: MessageType,
        your_address: Option<[u8; 4]>,
        out: &mut [u8],
    ) -> Option<usize> {
        let reply = out.get_mut(..MIN_REPLY_LEN)?;
        reply.fill(0);

        reply[0] = OP_REPLY;
        reply[1] = HTYPE_ETHERNET;
        reply[2] = 6;
        // xid, secs, flags
        reply[4..12].copy_from_slice(&request[4..12]);
        if let Some(address) = your_address {
            reply[16..20].copy_from_slice(&address);
        }
        reply[20..24].copy_from_slice(&self.server);
        // giaddr, chaddr
        reply[24..44].copy_from_slice(&request[24..44]);
        reply[236..240].copy_from_slice(&MAGIC_COOKIE);

        let mut options = OptionWriter {
            buf: &mut reply[OPTIONS_OFFSET..],
            len: 0,
        };
        options.put(OPT_MESSAGE_TYPE, &[kind.code()]);
        options.put(OPT_SERVER_ID, &self.server);
        if kind != MessageType::Nak {
            options.put(OPT_LEASE_TIME, &LEASE_SECS.to_be_bytes());
            options.put(OPT_SUBNET_MASK, &[255, 255, 255, 0]);
            options.put(OPT_ROUTER, &self.server);
            options.put(OPT_DNS, &self.server);
        }
        options.put(OPT_END, &[]);

        Some(MIN_REPLY_LEN)
    }
}

struct OptionWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl OptionWriter<'_> {
    fn put(&mut self, code: u8, value: &[u8]) {
        self.buf[self.len] = code;
        self.len += 1;
        if code == OPT_END {
            return;
        }
        self.buf[self.len] = value.len() as u8;
        self.buf[self.len + 1..self.len + 1 + value.len()].copy_from_slice(value);
        self.len += 1 + value.len();
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    const SERVER: [u8; 4] = [192, 168, 4, 1];

    fn client(kind: u8, mac: u8, extra: &[(u8, &[u8])]) -> Vec<u8> {
        let mut packet = alloc::vec![0u8; OPTIONS_OFFSET];
        packet[0] = OP_REQUEST;
        packet[1] = HTYPE_ETHERNET;
        packet[2] = 6;
        packet[4..8].copy_from_slice(&[1, 2, 3, 4]);
        packet[28..34].copy_from_slice(&[0x02, 0, 0, 0, 0, mac]);
        packet[236..240].copy_from_slice(&MAGIC_COOKIE);
        packet.extend_from_slice(&[OPT_MESSAGE_TYPE, 1, kind]);
        for (code, value) in extra {
            packet.push(*code);
            packet.push(value.len() as u8);
            packet.extend_from_slice(value);
        }
        packet.push(OPT_END);
        packet
    }

    fn reply_type(reply: &[u8]) -> u8 {
        assert_eq!(&reply[OPTIONS_OFFSET..OPTIONS_OFFSET + 2], &[OPT_MESSAGE_TYPE, 1]);
        reply[OPTIONS_OFFSET + 2]
    }

    #[test]
    fn discover_then_request_leases_first_address() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];

        let len = server.handle(&client(1, 7, &[]), &mut out).unwrap();
        assert_eq!(len, MIN_REPLY_LEN);
        assert_eq!(out[0], OP_REPLY);
        assert_eq!(&out[4..8], &[1, 2, 3, 4]);
        assert_eq!(&out[16..20], &[192, 168, 4, 2]);
        assert_eq!(reply_type(&out), 2);
        assert_eq!(server.leased_count(), 0);

        let request = client(3, 7, &[(OPT_REQUESTED_IP, &[192, 168, 4, 2]), (OPT_SERVER_ID, &SERVER)]);
        server.handle(&request, &mut out).unwrap();
        assert_eq!(reply_type(&out), 5);
        assert_eq!(&out[16..20], &[192, 168, 4, 2]);
        assert_eq!(server.leased_count(), 1);
    }

    #[test]
    fn ack_carries_router_and_dns() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];
        server.handle(&client(3, 1, &[]), &mut out).unwrap();

        let options = &out[OPTIONS_OFFSET..MIN_REPLY_LEN];
        let has = |needle: &[u8]| options.windows(needle.len()).any(|window| window == needle);
        assert!(has(&[OPT_ROUTER, 4, 192, 168, 4, 1]));
        assert!(has(&[OPT_DNS, 4, 192, 168, 4, 1]));
        assert!(has(&[OPT_SUBNET_MASK, 4, 255, 255, 255, 0]));
    }

    #[test]
    fn foreign_or_taken_addresses_are_refused() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];

        let taken = client(3, 1, &[(OPT_REQUESTED_IP, &[192, 168, 4, 2])]);
        server.handle(&taken, &mut out).unwrap();

        let other = client(3, 2, &[(OPT_REQUESTED_IP, &[192, 168, 4, 2])]);
        server.handle(&other, &mut out).unwrap();
        assert_eq!(reply_type(&out), 6);

        let foreign = client(3, 2, &[(OPT_REQUESTED_IP, &[10, 0, 0, 9])]);
        server.handle(&foreign, &mut out).unwrap();
        assert_eq!(reply_type(&out), 6);
    }

    #[test]
    fn request_for_other_server_is_ignored() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];
        let request = client(3, 1, &[(OPT_SERVER_ID, &[192, 168, 4, 99])]);
        assert_eq!(server.handle(&request, &mut out), None);
    }

    #[test]
    fn release_frees_the_slot_and_pool_can_exhaust() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];
        for mac in 0..POOL_SIZE as u8 {
            server.handle(&client(3, mac, &[]), &mut out).unwrap();
        }
        assert_eq!(server.leased_count(), POOL_SIZE);
        assert_eq!(server.handle(&client(1, 200, &[]), &mut out), None);

        assert_eq!(server.handle(&client(7, 0, &[]), &mut out), None);
        assert_eq!(server.leased_count(), POOL_SIZE - 1);
        assert!(server.handle(&client(1, 200, &[]), &mut out).is_some());
    }

    #[test]
    fn rejects_non_bootp_packets() {
        let mut server = DhcpServer::new(SERVER);
        let mut out = [0u8; 576];
        let mut packet = client(1, 1, &[]);
        packet[236] = 0;
        assert_eq!(server.handle(&packet, &mut out), None);
        assert_eq!(server.handle(&[0u8; 10], &mut out), None);
    }
}
