#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use alloc::boxed::Box;
use alloc::vec;
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::TcpClient;
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::Controller;
use log::{error, info};
use static_cell::StaticCell;
use vane_core::{
    ConnectivityManager, PowerCycleController, SettingsStore, WakeCycle, WeatherClient,
};
use vane_firmware::app_state::{PanelPins, init_flash, init_panel, init_rtc};
use vane_firmware::flash_settings::FlashSettings;
use vane_firmware::https::{
    HttpsTransport, RESPONSE_BUFFER_LEN, TLS_READ_BUFFER_LEN, TLS_WRITE_BUFFER_LEN, TcpState,
};
use vane_firmware::portal::{CaptivePortal, access_point_config};
use vane_firmware::sleep::RtcDeepSleep;
use vane_firmware::sntp::SntpClock;
use vane_firmware::wifi::{SharedWifi, StationLink, net_task};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    vane_firmware::sleep::sleep_after_panic()
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Leak a zeroed heap buffer for the lifetime of this wake
fn leak_buffer(len: usize) -> &'static mut [u8] {
    Box::leak(vec![0u8; len].into_boxed_slice())
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!(
        "vane {} awake, cause {:?}",
        env!("CARGO_PKG_VERSION"),
        esp_hal::rtc_cntl::wakeup_cause()
    );

    let rtc = init_rtc(peripherals.LPWR);
    let flash = init_flash(peripherals.FLASH);

    // ==================== Display ====================
    let renderer = init_panel(
        peripherals.SPI2,
        PanelPins {
            sck: peripherals.GPIO12.into(),
            mosi: peripherals.GPIO11.into(),
            cs: peripherals.GPIO10.into(),
            dc: peripherals.GPIO9.into(),
            rst: peripherals.GPIO8.into(),
            busy: peripherals.GPIO7.into(),
        },
    )
    .inspect_err(|e| error!("E-paper panel unavailable, continuing without it: {}", e))
    .ok();

    // ==================== WiFi ====================
    static RADIO: StaticCell<Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (controller, interfaces) = esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
        .expect("Failed to initialize Wi-Fi controller");

    static WIFI: StaticCell<SharedWifi> = StaticCell::new();
    let wifi = WIFI.init(Mutex::new(controller));

    let rng = Rng::new();
    let seed = u64::from(rng.random()) << 32 | u64::from(rng.random());

    static STA_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (sta_stack, sta_runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STA_RESOURCES.init(StackResources::new()),
        seed,
    );

    static AP_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (ap_stack, ap_runner) = embassy_net::new(
        interfaces.ap,
        access_point_config(),
        AP_RESOURCES.init(StackResources::new()),
        seed.rotate_left(17),
    );

    for runner in [sta_runner, ap_runner] {
        match net_task(runner) {
            Ok(token) => spawner.spawn(token),
            Err(e) => error!("Network task could not be spawned: {:?}", e),
        }
    }

    // ==================== HTTPS ====================
    static TCP_STATE: StaticCell<TcpState> = StaticCell::new();
    let tcp = TcpClient::new(sta_stack, TCP_STATE.init(TcpState::new()));
    let dns = DnsSocket::new(sta_stack);
    let https = HttpsTransport::new(
        &tcp,
        &dns,
        leak_buffer(TLS_READ_BUFFER_LEN),
        leak_buffer(TLS_WRITE_BUFFER_LEN),
        leak_buffer(RESPONSE_BUFFER_LEN),
    );

    // ==================== Wake cycle ====================
    let cycle = WakeCycle::new(
        SettingsStore::new(FlashSettings::new(flash)),
        ConnectivityManager::new(
            StationLink::new(wifi, sta_stack, flash),
            CaptivePortal::new(wifi, ap_stack, sta_stack, flash, spawner),
        ),
        SntpClock::new(sta_stack, rtc),
        Delay,
        WeatherClient::new(https),
        renderer,
    );

    let mut power = PowerCycleController::new(RtcDeepSleep::new(rtc));
    cycle.run_to_sleep(&mut power).await
}
