//! SNTP packet codec and the uptime-anchored wall clock.

pub const NTP_PORT: u16 = 123;
pub const NTP_PACKET_LEN: usize = 48;
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
/// Era 0 timestamps below this are taken to be in era 1 (after 2036-02-07).
const ERA_PIVOT: u32 = 0x8000_0000;
const TRANSMIT_TIMESTAMP: usize = 40;

const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const VERSION: u8 = 4;
const LEAP_UNSYNCHRONIZED: u8 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SntpError {
    Truncated,
    NotServerReply,
    /// Stratum 0: the server asked us to back off.
    KissOfDeath,
    Unsynchronized,
}

/// Client request: LI 0, version 4, mode 3, everything else zero.
pub const fn sntp_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet
}

/// Extracts the server transmit time as Unix seconds.
pub fn parse_sntp_reply(packet: &[u8]) -> Result<u64, SntpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(SntpError::Truncated);
    }

    let leap = packet[0] >> 6;
    let mode = packet[0] & 0x07;
    let stratum = packet[1];

    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(SntpError::NotServerReply);
    }
    if stratum == 0 {
        return Err(SntpError::KissOfDeath);
    }
    if leap == LEAP_UNSYNCHRONIZED {
        return Err(SntpError::Unsynchronized);
    }

    let seconds = u32::from_be_bytes([
        packet[TRANSMIT_TIMESTAMP],
        packet[TRANSMIT_TIMESTAMP + 1],
        packet[TRANSMIT_TIMESTAMP + 2],
        packet[TRANSMIT_TIMESTAMP + 3],
    ]);
    if seconds == 0 {
        return Err(SntpError::Unsynchronized);
    }

    let since_1900 = if seconds < ERA_PIVOT {
        u64::from(seconds) + (1u64 << 32)
    } else {
        u64::from(seconds)
    };
    Ok(since_1900 - NTP_UNIX_OFFSET)
}

/// Unix time anchored to a monotonic uptime reading.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WallClock {
    anchor: Option<(u64, u64)>,
}

impl WallClock {
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    pub fn sync(&mut self, unix_secs: u64, now_ms: u64) {
        self.anchor = Some((unix_secs, now_ms));
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn unix_secs(&self, now_ms: u64) -> Option<u64> {
        let (unix_secs, at_ms) = self.anchor?;
        Some(unix_secs + now_ms.saturating_sub(at_ms) / 1_000)
    }
}
