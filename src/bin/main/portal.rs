use embassy_futures::select::{Either, Either3, select, select3};
use embassy_net::{
    IpListenEndpoint, Ipv4Address, Ipv4Cidr, Stack, StackResources, StaticConfigV4,
    tcp::TcpSocket,
    udp::{PacketMetadata, UdpSocket},
};
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use esp_radio::wifi::{AccessPointConfig, AuthMethod, ModeConfig, WifiController, WifiDevice};
use log::{debug, info, warn};
use rawpager_core::{
    portal::{
        HTTP_PORT, MAX_REQUEST_BYTES, PORTAL_ADDRESS, PORTAL_PREFIX_LEN, PORTAL_SSID,
        PortalOutcome, PortalSession, RequestError, Response, dhcp, dns, parse_request,
    },
    settings::PagerSettings,
};
use static_cell::StaticCell;

const HTTP_TIMEOUT_SECS: u64 = 10;
const HTTP_TX_BYTES: usize = 2_048;
const UDP_PACKET_BYTES: usize = 576;

static PORTAL_NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

#[derive(Debug)]
pub(super) enum PortalError {
    Wifi(esp_radio::wifi::WifiError),
}

/// Runs the setup access point until the user saves or keeps settings.
///
/// The radio is stopped again on return so the caller can switch it to
/// station mode.
pub(super) async fn run_portal(
    wifi_controller: &mut WifiController<'_>,
    device: WifiDevice<'_>,
    current: Option<PagerSettings>,
    seed: u64,
) -> Result<PortalOutcome, PortalError> {
    let ap_config = AccessPointConfig::default()
        .with_ssid(PORTAL_SSID.into())
        .with_auth_method(AuthMethod::None);
    wifi_controller
        .set_config(&ModeConfig::AccessPoint(ap_config))
        .map_err(PortalError::Wifi)?;
    wifi_controller
        .start_async()
        .await
        .map_err(PortalError::Wifi)?;

    let net_config = embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::from(PORTAL_ADDRESS), PORTAL_PREFIX_LEN),
        gateway: None,
        dns_servers: Default::default(),
    });
    let (stack, mut runner) = embassy_net::new(
        device,
        net_config,
        PORTAL_NET_RESOURCES.init(StackResources::<4>::new()),
        seed,
    );
    info!(
        "portal: access point ssid={} address={}",
        PORTAL_SSID,
        Ipv4Address::from(PORTAL_ADDRESS)
    );

    let mut session = PortalSession::new(current);
    let outcome = match select(
        runner.run(),
        select3(
            http_server(stack, &mut session),
            dns_responder(stack),
            dhcp_responder(stack),
        ),
    )
    .await
    {
        Either::Second(Either3::First(outcome)) => outcome,
        // The runner and both responders never return.
        _ => unreachable!(),
    };

    if let Err(err) = wifi_controller.stop_async().await {
        warn!("portal: access point stop failed: {:?}", err);
    }
    Ok(outcome)
}

async fn http_server(stack: Stack<'_>, session: &mut PortalSession) -> PortalOutcome {
    let mut rx_buffer = [0u8; MAX_REQUEST_BYTES];
    let mut tx_buffer = [0u8; HTTP_TX_BYTES];
    let mut request = [0u8; MAX_REQUEST_BYTES];

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)));

        if let Err(err) = socket
            .accept(IpListenEndpoint {
                addr: None,
                port: HTTP_PORT,
            })
            .await
        {
            debug!("portal: http accept failed: {:?}", err);
            Timer::after_millis(200).await;
            continue;
        }

        let response = read_and_answer(&mut socket, &mut request, session).await;
        if let Some(response) = response {
            let _ = socket.write_all(response.head().as_bytes()).await;
            let _ = socket.write_all(response.body.as_bytes()).await;
            let _ = socket.flush().await;
        }

        Timer::after_millis(50).await;
        socket.close();
        Timer::after_millis(50).await;
        socket.abort();

        if let Some(outcome) = session.take_outcome() {
            info!("portal: finished outcome={}", outcome_label(&outcome));
            return outcome;
        }
    }
}

async fn read_and_answer(
    socket: &mut TcpSocket<'_>,
    request: &mut [u8; MAX_REQUEST_BYTES],
    session: &mut PortalSession,
) -> Option<Response> {
    let mut len = 0usize;
    loop {
        let read = match socket.read(&mut request[len..]).await {
            Ok(0) => {
                debug!("portal: client closed after {} bytes", len);
                return None;
            }
            Ok(read) => read,
            Err(err) => {
                debug!("portal: http read failed: {:?}", err);
                return None;
            }
        };
        len += read;

        match parse_request(&request[..len]) {
            Ok(parsed) => {
                info!("portal: {:?} {}", parsed.method, parsed.path);
                return Some(session.handle(&parsed));
            }
            Err(RequestError::Incomplete) if len < request.len() => {}
            Err(err) => {
                warn!("portal: rejecting request bytes={} err={:?}", len, err);
                return Some(Response::for_error(err));
            }
        }
    }
}

async fn dns_responder(stack: Stack<'_>) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 1_024];
    let mut tx_buffer = [0u8; 1_024];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if let Err(err) = socket.bind(dns::DNS_PORT) {
        warn!("portal: dns bind failed: {:?}", err);
        park().await;
    }

    let mut query = [0u8; UDP_PACKET_BYTES];
    let mut reply = [0u8; UDP_PACKET_BYTES];
    loop {
        let (len, meta) = match socket.recv_from(&mut query).await {
            Ok(received) => received,
            Err(err) => {
                debug!("portal: dns recv failed: {:?}", err);
                continue;
            }
        };

        if let Some(reply_len) = dns::answer(&query[..len], PORTAL_ADDRESS, &mut reply)
            && let Err(err) = socket.send_to(&reply[..reply_len], meta).await
        {
            debug!("portal: dns send failed: {:?}", err);
        }
    }
}

async fn dhcp_responder(stack: Stack<'_>) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 2_048];
    let mut tx_buffer = [0u8; 2_048];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if let Err(err) = socket.bind(dhcp::SERVER_PORT) {
        warn!("portal: dhcp bind failed: {:?}", err);
        park().await;
    }

    let mut server = dhcp::DhcpServer::new(PORTAL_ADDRESS);
    let mut packet = [0u8; UDP_PACKET_BYTES];
    let mut reply = [0u8; UDP_PACKET_BYTES];
    loop {
        let len = match socket.recv_from(&mut packet).await {
            Ok((len, _)) => len,
            Err(err) => {
                debug!("portal: dhcp recv failed: {:?}", err);
                continue;
            }
        };

        if let Some(reply_len) = server.handle(&packet[..len], &mut reply) {
            if let Err(err) = socket
                .send_to(&reply[..reply_len], (Ipv4Address::BROADCAST, dhcp::CLIENT_PORT))
                .await
            {
                debug!("portal: dhcp send failed: {:?}", err);
            }
            debug!("portal: dhcp leases={}", server.leased_count());
        }
    }
}

async fn park() -> ! {
    loop {
        Timer::after_secs(60).await;
    }
}

fn outcome_label(outcome: &PortalOutcome) -> &'static str {
    match outcome {
        PortalOutcome::Saved(_) => "saved",
        PortalOutcome::KeepCurrent => "keep_current",
    }
}
