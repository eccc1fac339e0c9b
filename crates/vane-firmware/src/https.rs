//! HTTPS transport for the weather API
//!
//! `reqwless` over `embassy-net` with `embedded-tls`. Certificates are not
//! verified; the device has no trust store.

use alloc::vec::Vec;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use esp_hal::rng::Rng;
use log::{debug, warn};
use reqwless::client::{HttpClient as ReqwlessClient, TlsConfig, TlsVerify};
use reqwless::request::{Method, RequestBuilder};
use vane_core::weather::{HttpClient, HttpResponse, TransportError};

/// TLS record buffer; a full record is 16 KiB plus overhead
pub const TLS_READ_BUFFER_LEN: usize = 16_640;
pub const TLS_WRITE_BUFFER_LEN: usize = 4096;
/// Response head and body must fit here
pub const RESPONSE_BUFFER_LEN: usize = 8192;

pub type TcpState = TcpClientState<1, 4096, 4096>;
pub type Tcp<'a> = TcpClient<'a, 1, 4096, 4096>;

fn transport_error(e: reqwless::Error) -> TransportError {
    warn!("HTTP request failed: {:?}", e);
    match e {
        reqwless::Error::Dns => TransportError::Dns,
        reqwless::Error::Tls(_) => TransportError::Tls,
        reqwless::Error::Network(_) => TransportError::Io,
        reqwless::Error::BufferTooSmall => TransportError::BodyTooLarge,
        _ => TransportError::Connect,
    }
}

pub struct HttpsTransport<'a> {
    tcp: &'a Tcp<'a>,
    dns: &'a DnsSocket<'a>,
    tls_read: &'a mut [u8],
    tls_write: &'a mut [u8],
    response: &'a mut [u8],
    rng: Rng,
}

impl<'a> HttpsTransport<'a> {
    pub fn new(
        tcp: &'a Tcp<'a>,
        dns: &'a DnsSocket<'a>,
        tls_read: &'a mut [u8],
        tls_write: &'a mut [u8],
        response: &'a mut [u8],
    ) -> Self {
        Self {
            tcp,
            dns,
            tls_read,
            tls_write,
            response,
            rng: Rng::new(),
        }
    }

    fn tls_seed(&self) -> u64 {
        u64::from(self.rng.random()) << 32 | u64::from(self.rng.random())
    }
}

impl HttpClient for HttpsTransport<'_> {
    async fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        let tls = TlsConfig::new(
            self.tls_seed(),
            &mut *self.tls_read,
            &mut *self.tls_write,
            TlsVerify::None,
        );
        let mut client = ReqwlessClient::new_with_tls(self.tcp, self.dns, tls);

        let mut request = client
            .request(Method::GET, url)
            .await
            .map_err(transport_error)?
            .headers(&[("Accept", "application/json")]);
        let response = request
            .send(&mut *self.response)
            .await
            .map_err(transport_error)?;

        let status = response.status.0;
        let body: Vec<u8> = response
            .body()
            .read_to_end()
            .await
            .map_err(transport_error)?
            .to_vec();

        debug!("HTTP {} with {} byte body", status, body.len());
        Ok(HttpResponse { status, body })
    }
}
