#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

extern crate alloc;

use core::fmt::{Debug, Write as _};

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::Timer;
use embedded_graphics::{pixelcolor::Rgb565, prelude::DrawTarget, prelude::OriginDimensions};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    rng::Rng,
    spi::master::Spi,
    time::{Instant, Rate},
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ClientConfig, ModeConfig};
use heapless::String as HeaplessString;
use ili9341::{Config as PanelConfig, Orientation};
use log::{LevelFilter, info, warn};
use rawpager_core::{
    app::{PagerApp, PagerConfig, Status, TickResult},
    input::{ButtonTiming, InputProvider, TouchCalibration},
    portal::{PORTAL_ADDRESS, PORTAL_SSID, PortalOutcome},
    render::Screen,
    settings::SettingsStore,
};
use rawpager_hal_esp32::{
    input::{
        cyd::CydInput,
        xpt2046::{TouchConfig, Xpt2046},
    },
    network::{ConnectivityHandle, ConnectivitySnapshot, ConnectivityState, TimeSyncHandle},
    platform::display::CydDisplay,
    render::{ScreenRenderer, pager::PagerRenderer},
    storage::flash_settings::FlashSettingsStore,
};
use static_cell::{ConstStaticCell, StaticCell};

use fetch::{FetchBuffers, FetchTcpState};

#[path = "main/clock.rs"]
mod clock;
#[path = "main/fetch.rs"]
mod fetch;
#[path = "main/portal.rs"]
mod portal;
#[path = "main/wifi.rs"]
mod wifi;

const DISPLAY_SPI_HZ: u32 = 40_000_000;
const TOUCH_SPI_HZ: u32 = 2_000_000;
const BOOT_WINDOW_POLLS: u32 = 30;
const BOOT_WINDOW_POLL_MS: u64 = 100;
const BOOT_RELEASE_POLL_MS: u64 = 20;
const UI_POLL_INTERVAL_MS: u64 = 10;

static CONNECTIVITY: ConnectivityHandle = ConnectivityHandle::new();
static TIME_SYNC: TimeSyncHandle = TimeSyncHandle::new();
static NET_RESOURCES: StaticCell<StackResources<6>> = StaticCell::new();
static FETCH_TCP_STATE: StaticCell<FetchTcpState> = StaticCell::new();
static FETCH_BUFFERS: ConstStaticCell<FetchBuffers> = ConstStaticCell::new(FetchBuffers::new());

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn random_seed(rng: &Rng) -> u64 {
    (rng.random() as u64) << 32 | rng.random() as u64
}

/// Mirrors the station state onto the status line.
///
/// A healthy link does not replace a document status such as the URL or a
/// fetch failure; only a lost or failing link does.
fn apply_connectivity<IN>(app: &mut PagerApp<IN>, connectivity: ConnectivitySnapshot)
where
    IN: InputProvider,
{
    let status = match connectivity.state {
        ConnectivityState::Failed => Status::WifiFailed,
        ConnectivityState::Connected => Status::Connected,
        ConnectivityState::Disconnected
        | ConnectivityState::Connecting
        | ConnectivityState::LinkUpNoIp => Status::Connecting,
    };

    if status == Status::Connected
        && !matches!(
            app.status(),
            Status::BootWindow | Status::Connecting | Status::WifiFailed
        )
    {
        return;
    }
    app.set_status(status);
}

fn log_display_fault<E: Debug>(result: Result<(), E>, display_fault_logged: &mut bool) {
    if let Err(err) = result
        && !*display_fault_logged
    {
        esp_println::println!("display: draw failed");
        warn!("display draw failed: {:?}", err);
        *display_fault_logged = true;
    }
}

/// Draws whatever the app marked dirty since the last frame.
fn present<IN, D>(
    app: &mut PagerApp<IN>,
    renderer: &mut PagerRenderer,
    display: &mut D,
    display_fault_logged: &mut bool,
) where
    IN: InputProvider,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    if app.take_render() != TickResult::RenderRequested {
        return;
    }
    draw_current(app, renderer, display, display_fault_logged);
}

fn draw_current<IN, D>(
    app: &PagerApp<IN>,
    renderer: &mut PagerRenderer,
    display: &mut D,
    display_fault_logged: &mut bool,
) where
    IN: InputProvider,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    let mut drawn = Ok(());
    app.with_screen(|screen| drawn = renderer.render(screen, display));
    log_display_fault(drawn, display_fault_logged);
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: rawpager starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator; the document and the TLS session use it too.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    let uptime = Instant::now();
    let rng = Rng::new();

    // Display wiring on the CYD:
    // SCK=GPIO14 MOSI=GPIO13 CS=GPIO15 DC=GPIO2 BL=GPIO21
    let panel_config = PanelConfig {
        spi_hz: DISPLAY_SPI_HZ,
        ..PanelConfig::default()
    }
    .with_orientation(Orientation::Landscape);
    let display_spi = Spi::new(
        peripherals.SPI2,
        esp_hal::spi::master::Config::default()
            .with_frequency(Rate::from_hz(panel_config.spi_hz))
            .with_mode(esp_hal::spi::Mode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO14)
    .with_mosi(peripherals.GPIO13);
    let display_cs = Output::new(peripherals.GPIO15, Level::High, OutputConfig::default());
    let display_dc = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let backlight = Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default());
    let display_device = ExclusiveDevice::new(display_spi, display_cs, Delay::new()).unwrap();

    let mut delay = Delay::new();
    let mut display = CydDisplay::new(display_device, display_dc, backlight, panel_config);
    let mut display_fault_logged = false;
    esp_println::println!("display: init begin (SCK=14 MOSI=13 CS=15 DC=2 BL=21)");
    if let Err(err) = display.initialize(&mut delay) {
        esp_println::println!("display: initialize failed");
        warn!("display initialize failed: {:?}", err);
        display_fault_logged = true;
    } else {
        esp_println::println!("display: initialize ok");
    }

    // Touch controller on its own bus:
    // CLK=GPIO25 MOSI=GPIO32 MISO=GPIO39 CS=GPIO33 IRQ=GPIO36
    let touch_spi = Spi::new(
        peripherals.SPI3,
        esp_hal::spi::master::Config::default()
            .with_frequency(Rate::from_hz(TOUCH_SPI_HZ))
            .with_mode(esp_hal::spi::Mode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO25)
    .with_mosi(peripherals.GPIO32)
    .with_miso(peripherals.GPIO39);
    let touch_cs = Output::new(peripherals.GPIO33, Level::High, OutputConfig::default());
    let touch_device = ExclusiveDevice::new(touch_spi, touch_cs, Delay::new()).unwrap();
    let touch_irq = Input::new(peripherals.GPIO36, InputConfig::default());
    let boot_button = Input::new(peripherals.GPIO0, InputConfig::default().with_pull(Pull::Up));

    let size = display.size();
    let input = CydInput::new(
        Xpt2046::new(touch_device, touch_irq, TouchConfig::default()),
        boot_button,
        TouchCalibration::default().with_width(size.width as u16),
        ButtonTiming::default(),
    );

    let mut settings_store = match FlashSettingsStore::new() {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("settings storage unavailable ({:?}); changes will be volatile", err);
            None
        }
    };
    let stored_settings = match settings_store.as_mut().map(|store| store.load()) {
        Some(Ok(Some(saved))) => {
            info!(
                "settings restored from flash ssid={} url={}",
                saved.ssid, saved.source_url
            );
            Some(saved)
        }
        Some(Ok(None)) => {
            info!("no saved settings in flash");
            None
        }
        Some(Err(err)) => {
            warn!("failed to read saved settings ({:?}); using defaults", err);
            None
        }
        None => None,
    };

    let pager_config = PagerConfig {
        surface_width: size.width as u16,
        surface_height: size.height as u16,
        ..PagerConfig::default()
    };
    let mut app = PagerApp::new(input, stored_settings.clone().unwrap_or_default(), pager_config);
    let mut renderer = PagerRenderer::new();

    // Boot window: holding BOOT here opens the setup portal.
    app.set_status(Status::BootWindow);
    present(&mut app, &mut renderer, &mut display, &mut display_fault_logged);
    let mut boot_held = false;
    for _ in 0..BOOT_WINDOW_POLLS {
        if app.input_mut().button_held().unwrap_or(false) {
            boot_held = true;
            break;
        }
        Timer::after_millis(BOOT_WINDOW_POLL_MS).await;
    }
    if boot_held {
        info!("boot: BOOT held, waiting for release");
        while app.input_mut().button_held().unwrap_or(false) {
            Timer::after_millis(BOOT_RELEASE_POLL_MS).await;
        }
    }

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            warn!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                warn!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    if boot_held || !app.settings().has_credentials() {
        info!(
            "portal: entering (boot_held={} configured={})",
            boot_held,
            app.settings().has_credentials()
        );
        let mut address: HeaplessString<16> = HeaplessString::new();
        let [a, b, c, d] = PORTAL_ADDRESS;
        let _ = write!(address, "{}.{}.{}.{}", a, b, c, d);
        let drawn = renderer.render(
            Screen::Setup {
                access_point: PORTAL_SSID,
                address: address.as_str(),
                has_settings: stored_settings
                    .as_ref()
                    .is_some_and(|settings| settings.has_credentials()),
            },
            &mut display,
        );
        log_display_fault(drawn, &mut display_fault_logged);

        match portal::run_portal(
            &mut wifi_controller,
            interfaces.ap,
            stored_settings,
            random_seed(&rng),
        )
        .await
        {
            Ok(PortalOutcome::Saved(settings)) => {
                match settings_store.as_mut().map(|store| store.save(&settings)) {
                    Some(Ok(())) => info!("portal: settings saved to flash"),
                    Some(Err(err)) => warn!("portal: settings save failed: {:?}", err),
                    None => warn!("portal: no settings storage; settings kept until reboot"),
                }
                app.apply_settings(settings);
            }
            Ok(PortalOutcome::KeepCurrent) => info!("portal: keeping current settings"),
            Err(err) => {
                warn!("portal failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        }
    }

    let client_config = ClientConfig::default()
        .with_ssid(app.settings().ssid.as_str().into())
        .with_password(app.settings().password.as_str().into());
    if let Err(err) = wifi_controller.set_config(&ModeConfig::Client(client_config)) {
        warn!("wifi mode config failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(StackResources::<6>::new()),
        random_seed(&rng),
    );

    let fetch_tcp_state = FETCH_TCP_STATE.init(FetchTcpState::new());
    let fetch_buffers = FETCH_BUFFERS.take();

    info!(
        "Pager started: surface={}x{} url={} refresh_due_ms={:?}",
        size.width,
        size.height,
        app.settings().source_url,
        app.next_refresh_ms()
    );
    info!("Touch pins: CLK=GPIO25 MOSI=GPIO32 MISO=GPIO39 CS=GPIO33 IRQ=GPIO36");
    info!("Button pin: BOOT=GPIO0");

    CONNECTIVITY.mark_connecting();

    let net_future = net_runner.run();
    let wifi_future = wifi::wifi_connection_loop(&mut wifi_controller, stack, &CONNECTIVITY);
    let sntp_future = clock::sntp_loop(stack, &TIME_SYNC, uptime);
    let ui_future = async {
        let mut last_connectivity_revision = u32::MAX;
        let mut last_time_revision = 0u32;
        let mut last_input_faults = 0u32;

        loop {
            let now_ms = uptime.elapsed().as_millis();
            let connectivity = CONNECTIVITY.snapshot();
            if connectivity.revision != last_connectivity_revision {
                apply_connectivity(&mut app, connectivity);
                last_connectivity_revision = connectivity.revision;
            }

            if let Some(sync) = TIME_SYNC.newer_than(last_time_revision) {
                app.sync_clock(sync.unix_secs, sync.at_ms);
                last_time_revision = sync.revision;
            }

            if app.tick(now_ms) == TickResult::RenderRequested {
                draw_current(&app, &mut renderer, &mut display, &mut display_fault_logged);
            }

            if app.input_faults() != last_input_faults {
                last_input_faults = app.input_faults();
                warn!("input faults total={}", last_input_faults);
            }

            if connectivity.is_online()
                && let Some(request) = app.take_refresh_request(now_ms)
            {
                // Show "Fetching..." before the loop blocks on the network.
                present(&mut app, &mut renderer, &mut display, &mut display_fault_logged);
                let result = fetch::fetch_text(
                    stack,
                    fetch_tcp_state,
                    fetch_buffers,
                    random_seed(&rng),
                    request.url.as_str(),
                )
                .await;
                app.complete_refresh(result, uptime.elapsed().as_millis());
                present(&mut app, &mut renderer, &mut display, &mut display_fault_logged);
            }

            Timer::after_millis(UI_POLL_INTERVAL_MS).await;
        }
    };

    let _ = embassy_futures::join::join4(net_future, wifi_future, sntp_future, ui_future).await;
    unreachable!()
}
