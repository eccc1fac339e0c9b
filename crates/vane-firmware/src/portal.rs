//! Setup portal: soft access point, DHCP server and an HTTP form
//!
//! The radio is switched to access-point mode as `EPD-Setup` at
//! 192.168.4.1. A phone joining it gets an address from the DHCP task and
//! browses to the form. On submit the radio goes back to station mode and
//! tries the new credentials; if that fails the access point comes back with
//! a notice on the page.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use alloc::format;
use edge_dhcp::io::{self as dhcp_io, DEFAULT_SERVER_PORT};
use edge_dhcp::server::{Server, ServerOptions};
use edge_nal::UdpBind;
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::{Ipv4Cidr, Stack, StaticConfigV4};
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use esp_radio::wifi::{AccessPointConfig, ModeConfig};
use log::{error, info, warn};
use vane_core::connectivity::{
    PORTAL_AP_NAME, PortalError, PortalForm, PortalSubmission, ProvisioningPortal,
};
use vane_core::portal_form::{FormFields, RequestLine, SAVE_PATH, render_page};

use crate::flash_settings::SharedFlash;
use crate::wifi::{SharedWifi, join_with_address};
use crate::wifi_secrets::WifiCredentials;

pub const PORTAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
const HTTP_PORT: u16 = 80;
const REQUEST_HEAD_MAX: usize = 1024;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

const SAVED_PAGE: &str = "<!DOCTYPE html><html><body><h2>Saved</h2>\
    <p>The display is joining your network. If it cannot, this page will be \
    back shortly.</p></body></html>";

/// Static addressing for the access-point interface
pub fn access_point_config() -> embassy_net::Config {
    embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(PORTAL_IP, 24),
        gateway: Some(PORTAL_IP),
        dns_servers: Default::default(),
    })
}

#[embassy_executor::task]
async fn dhcp_task(stack: Stack<'static>) {
    let mut buf = [0u8; 1500];
    let mut gateways = [Ipv4Addr::UNSPECIFIED];
    let buffers = UdpBuffers::<3, 1024, 1024, 10>::new();
    let udp = Udp::new(stack, &buffers);

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_SERVER_PORT));
    let mut socket = match udp.bind(bind_addr).await {
        Ok(socket) => socket,
        Err(e) => {
            error!("DHCP server could not bind: {:?}", e);
            return;
        }
    };

    loop {
        if let Err(e) = dhcp_io::server::run(
            &mut Server::<_, 16>::new_with_et(PORTAL_IP),
            &ServerOptions::new(PORTAL_IP, Some(&mut gateways)),
            &mut socket,
            &mut buf,
        )
        .await
        {
            warn!("DHCP server error: {:?}", e);
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Read until the end of the request head or until `buf` is full.
async fn read_head<'b>(socket: &mut TcpSocket<'_>, buf: &'b mut [u8]) -> Option<&'b str> {
    let mut len = 0;
    while len < buf.len() {
        match socket.read(&mut buf[len..]).await {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) => {
                warn!("Portal read error: {:?}", e);
                return None;
            }
        }
        if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    core::str::from_utf8(&buf[..len]).ok()
}

async fn respond(socket: &mut TcpSocket<'_>, status: &str, body: &str) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );

    let written = async {
        socket.write_all(head.as_bytes()).await?;
        socket.write_all(body.as_bytes()).await?;
        socket.flush().await
    };
    if let Err(e) = written.await {
        warn!("Portal write error: {:?}", e);
    }
}

/// [`ProvisioningPortal`] on the soft access point
pub struct CaptivePortal {
    wifi: &'static SharedWifi,
    ap_stack: Stack<'static>,
    sta_stack: Stack<'static>,
    flash: &'static SharedFlash,
    spawner: Spawner,
    dhcp_running: bool,
}

impl CaptivePortal {
    pub fn new(
        wifi: &'static SharedWifi,
        ap_stack: Stack<'static>,
        sta_stack: Stack<'static>,
        flash: &'static SharedFlash,
        spawner: Spawner,
    ) -> Self {
        Self {
            wifi,
            ap_stack,
            sta_stack,
            flash,
            spawner,
            dhcp_running: false,
        }
    }

    async fn open_access_point(&mut self) -> Result<(), PortalError> {
        let mut controller = self.wifi.lock().await;

        if matches!(controller.is_started(), Ok(true)) {
            if let Err(e) = controller.stop_async().await {
                warn!("WiFi stop before portal failed: {:?}", e);
            }
        }

        let config =
            ModeConfig::AccessPoint(AccessPointConfig::default().with_ssid(PORTAL_AP_NAME.into()));
        controller.set_config(&config).map_err(|e| {
            error!("Access point config rejected: {:?}", e);
            PortalError::Start
        })?;
        controller.start_async().await.map_err(|e| {
            error!("Access point start failed: {:?}", e);
            PortalError::Start
        })?;
        drop(controller);

        if !self.dhcp_running {
            match dhcp_task(self.ap_stack) {
                Ok(token) => {
                    self.spawner.spawn(token);
                    self.dhcp_running = true;
                }
                Err(e) => {
                    error!("DHCP task could not be spawned: {:?}", e);
                    return Err(PortalError::Start);
                }
            }
        }

        info!("Portal open: join '{}' and browse to http://{}/", PORTAL_AP_NAME, PORTAL_IP);
        Ok(())
    }

    /// Serve the form until a submission arrives.
    async fn next_submission(&mut self, form: &PortalForm, notice: Option<&str>) -> FormFields {
        let mut rx = [0u8; 1024];
        let mut tx = [0u8; 2048];
        let mut request = [0u8; REQUEST_HEAD_MAX];

        loop {
            let mut socket = TcpSocket::new(self.ap_stack, &mut rx, &mut tx);
            socket.set_timeout(Some(SOCKET_TIMEOUT));

            if let Err(e) = socket.accept(HTTP_PORT).await {
                warn!("Portal accept failed: {:?}", e);
                continue;
            }

            let submission = match read_head(&mut socket, &mut request).await.and_then(RequestLine::parse) {
                Some(line) if line.path == SAVE_PATH => {
                    respond(&mut socket, "200 OK", SAVED_PAGE).await;
                    Some(FormFields::from_query(line.query.unwrap_or("")))
                }
                Some(_) => {
                    respond(&mut socket, "200 OK", &render_page(form, notice)).await;
                    None
                }
                None => {
                    respond(&mut socket, "400 Bad Request", "").await;
                    None
                }
            };

            socket.close();
            // Let the FIN go out before the radio changes mode
            Timer::after(Duration::from_millis(100)).await;

            if let Some(fields) = submission {
                return fields;
            }
        }
    }
}

impl ProvisioningPortal for CaptivePortal {
    async fn serve(&mut self, form: &PortalForm) -> Result<PortalSubmission, PortalError> {
        self.open_access_point().await?;
        let mut notice = None;

        loop {
            let fields = self.next_submission(form, notice).await;

            if let Err(e) = fields.check_credentials() {
                warn!("Portal submission rejected: {}", e);
                notice = Some(e.notice());
                continue;
            }
            let Some(credentials) = WifiCredentials::new(fields.ssid(), &fields.password) else {
                continue;
            };

            info!("Portal submission received, trying {}", credentials.ssid);
            match join_with_address(self.wifi, self.sta_stack, &credentials).await {
                Ok(()) => {
                    if let Err(e) = credentials.save(self.flash).await {
                        error!("Failed to persist WiFi credentials: {}", e);
                    }
                    return Ok(fields.submission());
                }
                Err(e) => {
                    warn!("Submitted network did not connect: {}", e);
                    notice = Some("Could not join that network, check the name and password");
                    self.open_access_point().await?;
                }
            }
        }
    }
}
