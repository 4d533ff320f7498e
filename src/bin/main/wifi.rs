use embassy_net::Stack;
use embassy_time::{Duration, Timer, WithTimeout};
use esp_radio::wifi::{WifiController, WifiError};
use log::{info, warn};
use rawpager_hal_esp32::network::ConnectivityHandle;

const BACKOFF_FLOOR_SECS: u64 = 2;
const BACKOFF_CEILING_SECS: u64 = 120;
const LINK_WATCH_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;

/// Exponential retry delay: 2, 4, 8 ... capped at two minutes.
struct Backoff {
    failures: u32,
}

impl Backoff {
    const fn new() -> Self {
        Self { failures: 0 }
    }

    fn delay_secs(&self) -> u64 {
        let doublings = self.failures.min(6);
        (BACKOFF_FLOOR_SECS << doublings).min(BACKOFF_CEILING_SECS)
    }

    fn reset(&mut self) {
        self.failures = 0;
    }

    async fn wait(&mut self) {
        let delay_secs = self.delay_secs();
        self.failures = self.failures.saturating_add(1);
        info!(
            "wifi: next attempt in {}s failures={}",
            delay_secs, self.failures
        );
        Timer::after_secs(delay_secs).await;
    }
}

#[derive(Debug)]
enum LinkFault {
    Start(WifiError),
    Associate(WifiError),
    DhcpTimeout,
}

async fn bring_up(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
) -> Result<(), LinkFault> {
    if !wifi_controller.is_started().unwrap_or(false) {
        wifi_controller.start_async().await.map_err(LinkFault::Start)?;
    }
    wifi_controller
        .connect_async()
        .await
        .map_err(LinkFault::Associate)?;
    stack
        .wait_config_up()
        .with_timeout(Duration::from_secs(DHCP_TIMEOUT_SECS))
        .await
        .map_err(|_| LinkFault::DhcpTimeout)
}

/// Returns once the association, the link or the lease goes away.
async fn watch_link(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    connectivity: &ConnectivityHandle,
) {
    loop {
        let link_up = stack.is_link_up();
        let has_ipv4 = stack.config_v4().is_some();
        let associated = matches!(wifi_controller.is_connected(), Ok(true));
        connectivity.update_link_ip(link_up, has_ipv4);

        if !(link_up && has_ipv4 && associated) {
            info!(
                "wifi: lost link_up={} has_ipv4={} associated={}",
                link_up, has_ipv4, associated
            );
            return;
        }
        Timer::after_millis(LINK_WATCH_INTERVAL_MS).await;
    }
}

/// Keeps the station online and mirrors its state into `connectivity`.
///
/// Failures before an address is obtained are reported as `Failed`, which
/// the status line turns into a message naming the network.
pub(super) async fn wifi_connection_loop(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    connectivity: &'static ConnectivityHandle,
) -> ! {
    let mut backoff = Backoff::new();

    loop {
        connectivity.mark_connecting();

        if let Err(fault) = bring_up(wifi_controller, stack).await {
            warn!("wifi: bring-up failed: {:?}", fault);
            connectivity.mark_failed();
            if !matches!(fault, LinkFault::Start(_)) {
                let _ = wifi_controller.disconnect_async().await;
            }
            backoff.wait().await;
            continue;
        }

        if let Some(config) = stack.config_v4() {
            info!("wifi: online address={}", config.address);
        }
        connectivity.update_link_ip(stack.is_link_up(), stack.config_v4().is_some());
        backoff.reset();

        watch_link(wifi_controller, stack, connectivity).await;

        connectivity.mark_disconnected();
        let _ = wifi_controller.disconnect_async().await;
        backoff.wait().await;
    }
}

