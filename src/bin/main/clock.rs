use embassy_net::{
    Stack,
    dns::{self, DnsQueryType},
    udp::{PacketMetadata, RecvError, SendError, UdpSocket},
};
use embassy_time::{Duration, Timer, WithTimeout};
use esp_hal::time::Instant;
use log::{info, warn};
use rawpager_core::clock::{
    DEFAULT_NTP_SERVER, NTP_PACKET_LEN, NTP_PORT, SntpError, parse_sntp_reply, sntp_request,
};
use rawpager_hal_esp32::network::TimeSyncHandle;

const SNTP_LOCAL_PORT: u16 = 40_123;
const SNTP_RESYNC_SECS: u64 = 6 * 60 * 60;
const SNTP_RETRY_SECS: u64 = 30;
const SNTP_REPLY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
enum SyncError {
    Dns(dns::Error),
    NoAddress,
    Send(SendError),
    Recv(RecvError),
    Timeout,
    Reply(SntpError),
}

/// Publishes wall-clock time once the station has an address.
pub(super) async fn sntp_loop(
    stack: Stack<'_>,
    time_sync: &'static TimeSyncHandle,
    uptime: Instant,
) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buffer = [0u8; 256];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    if let Err(err) = socket.bind(SNTP_LOCAL_PORT) {
        warn!("sntp bind failed port={} err={:?}; clock disabled", SNTP_LOCAL_PORT, err);
        loop {
            Timer::after_secs(SNTP_RESYNC_SECS).await;
        }
    }

    loop {
        stack.wait_config_up().await;

        match sync_once(stack, &socket).await {
            Ok(unix_secs) => {
                time_sync.publish(unix_secs, uptime.elapsed().as_millis());
                info!(
                    "sntp synced unix_secs={} next_in_s={}",
                    unix_secs, SNTP_RESYNC_SECS
                );
                Timer::after_secs(SNTP_RESYNC_SECS).await;
            }
            Err(err) => {
                warn!("sntp sync failed: {:?}; retrying in {}s", err, SNTP_RETRY_SECS);
                Timer::after_secs(SNTP_RETRY_SECS).await;
            }
        }
    }
}

async fn sync_once(stack: Stack<'_>, socket: &UdpSocket<'_>) -> Result<u64, SyncError> {
    let addresses = stack
        .dns_query(DEFAULT_NTP_SERVER, DnsQueryType::A)
        .await
        .map_err(SyncError::Dns)?;
    let server = *addresses.first().ok_or(SyncError::NoAddress)?;

    socket
        .send_to(&sntp_request(), (server, NTP_PORT))
        .await
        .map_err(SyncError::Send)?;

    let mut reply = [0u8; NTP_PACKET_LEN];
    let (len, _) = socket
        .recv_from(&mut reply)
        .with_timeout(Duration::from_millis(SNTP_REPLY_TIMEOUT_MS))
        .await
        .map_err(|_| SyncError::Timeout)?
        .map_err(SyncError::Recv)?;

    parse_sntp_reply(&reply[..len]).map_err(SyncError::Reply)
}
