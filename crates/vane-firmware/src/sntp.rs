//! SNTP client with the RTC as wall clock
//!
//! One request per sync: resolve the pool, send a client-mode packet, take
//! the server's transmit timestamp and write it into the RTC. The RTC keeps
//! counting between polls, so `now_unix` is a plain register read.

use core::cell::RefCell;

use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, with_timeout};
use esp_hal::rtc_cntl::Rtc;
use log::{debug, info, warn};
use vane_core::time_sync::{ClockError, NetworkClock, Timestamp};

pub const NTP_SERVER: &str = "pool.ntp.org";
const NTP_PORT: u16 = 123;
const LOCAL_PORT: u16 = 50123;
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

const PACKET_LEN: usize = 48;

/// The RTC is shared with deep sleep.
pub type SharedRtc = RefCell<Rtc<'static>>;

/// LI = 0, VN = 4, Mode = 3 (client)
fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0b00_100_011;
    packet
}

/// Unix seconds from a server reply, `None` for short or unsynchronized replies
pub fn unix_from_reply(reply: &[u8]) -> Option<u64> {
    if reply.len() < PACKET_LEN {
        return None;
    }
    // Stratum 0 is a kiss-of-death packet
    if reply[1] == 0 {
        return None;
    }
    let secs = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]);
    Timestamp::from_ntp_seconds(secs).map(Timestamp::as_unix_secs)
}

pub struct SntpClock {
    stack: Stack<'static>,
    rtc: &'static SharedRtc,
}

impl SntpClock {
    pub fn new(stack: Stack<'static>, rtc: &'static SharedRtc) -> Self {
        Self { stack, rtc }
    }

    async fn query(&self) -> Option<u64> {
        let server = match self.stack.dns_query(NTP_SERVER, DnsQueryType::A).await {
            Ok(addrs) => *addrs.first()?,
            Err(e) => {
                warn!("DNS lookup of {} failed: {:?}", NTP_SERVER, e);
                return None;
            }
        };

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buf = [0u8; 128];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buf = [0u8; 128];
        let mut socket = UdpSocket::new(self.stack, &mut rx_meta, &mut rx_buf, &mut tx_meta, &mut tx_buf);

        if let Err(e) = socket.bind(LOCAL_PORT) {
            warn!("SNTP bind failed: {:?}", e);
            return None;
        }

        if let Err(e) = socket.send_to(&request_packet(), (server, NTP_PORT)).await {
            warn!("SNTP send failed: {:?}", e);
            return None;
        }

        let mut reply = [0u8; PACKET_LEN];
        match with_timeout(REPLY_TIMEOUT, socket.recv_from(&mut reply)).await {
            Ok(Ok((len, _))) => unix_from_reply(&reply[..len]),
            Ok(Err(e)) => {
                warn!("SNTP receive failed: {:?}", e);
                None
            }
            Err(_) => {
                warn!("No SNTP reply from {}", server);
                None
            }
        }
    }
}

impl NetworkClock for SntpClock {
    async fn start_sync(&mut self) -> Result<(), ClockError> {
        let unix = self.query().await.ok_or(ClockError::StartFailed)?;
        self.rtc.borrow_mut().set_current_time_us(unix * 1_000_000);
        info!("RTC set from {} to {}", NTP_SERVER, unix);
        Ok(())
    }

    fn now_unix(&mut self) -> u64 {
        let secs = self.rtc.borrow().current_time_us() / 1_000_000;
        debug!("RTC reads {}", secs);
        secs
    }
}
