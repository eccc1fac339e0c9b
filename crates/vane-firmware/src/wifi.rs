//! Station-mode WiFi
//!
//! One `WifiController` drives both the station link and the setup portal's
//! access point, so it lives behind an async mutex shared by the two.

use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use log::{info, warn};
use vane_core::connectivity::{LinkError, NetworkLink};

use crate::flash_settings::SharedFlash;
use crate::wifi_secrets::WifiCredentials;

/// Bound on association plus DHCP
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(20);

pub type SharedWifi = Mutex<NoopRawMutex, WifiController<'static>>;

/// Runs an `embassy-net` stack. One instance each for station and AP.
#[embassy_executor::task(pool_size = 2)]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Wait until the stack has link and an IPv4 address.
pub async fn wait_for_ip(stack: Stack<'static>) {
    while !stack.is_link_up() {
        Timer::after(Duration::from_millis(500)).await;
    }

    loop {
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
            return;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Reconfigure the radio as a station and associate with `credentials`.
pub async fn join(
    controller: &mut WifiController<'static>,
    credentials: &WifiCredentials,
) -> Result<(), LinkError> {
    if matches!(controller.is_started(), Ok(true)) {
        if let Err(e) = controller.stop_async().await {
            warn!("WiFi stop before join failed: {:?}", e);
        }
    }

    let config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(credentials.ssid.as_str().into())
            .with_password(credentials.password.as_str().into()),
    );
    controller.set_config(&config).map_err(|e| {
        warn!("WiFi station config rejected: {:?}", e);
        LinkError::Association
    })?;
    controller.start_async().await.map_err(|e| {
        warn!("WiFi start failed: {:?}", e);
        LinkError::Association
    })?;

    info!("Connecting to {}...", credentials.ssid);
    controller.connect_async().await.map_err(|e| {
        warn!("Failed to connect to {}: {:?}", credentials.ssid, e);
        LinkError::Association
    })
}

/// Join and wait for DHCP, bounded by [`JOIN_TIMEOUT`].
pub async fn join_with_address(
    wifi: &SharedWifi,
    stack: Stack<'static>,
    credentials: &WifiCredentials,
) -> Result<(), LinkError> {
    let attempt = async {
        join(&mut *wifi.lock().await, credentials).await?;
        wait_for_ip(stack).await;
        Ok(())
    };

    with_timeout(JOIN_TIMEOUT, attempt)
        .await
        .unwrap_or(Err(LinkError::NoAddress))
}

/// [`NetworkLink`] over the station interface
pub struct StationLink {
    wifi: &'static SharedWifi,
    stack: Stack<'static>,
    flash: &'static SharedFlash,
}

impl StationLink {
    pub fn new(wifi: &'static SharedWifi, stack: Stack<'static>, flash: &'static SharedFlash) -> Self {
        Self { wifi, stack, flash }
    }
}

impl NetworkLink for StationLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        let credentials = WifiCredentials::load(self.flash)
            .await
            .ok_or(LinkError::NoCredentials)?;

        join_with_address(self.wifi, self.stack, &credentials).await
    }
}
