use core::fmt::Write as _;
use core::future::Future;

use alloc::string::String;
use alloc::vec::Vec;
use embassy_time::{Duration, with_timeout};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use super::payload::{parse_current, parse_forecast};
use super::snapshot::{ForecastSnapshot, WeatherSnapshot};
use crate::config::Settings;
use crate::time_sync::Timestamp;

pub const API_HOST: &str = "api.openweathermap.org";
const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";

/// Periods requested from the forecast endpoint; only the first is shown
pub const FORECAST_PERIODS: u8 = 2;

/// Upper bound on a single request, so a hung transport cannot keep the
/// device awake past its sleep
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Raw HTTP response as returned by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("DNS lookup failed")]
    Dns,
    #[error("connection failed")]
    Connect,
    #[error("TLS handshake failed")]
    Tls,
    #[error("I/O error")]
    Io,
    #[error("response body too large")]
    BodyTooLarge,
}

/// HTTPS transport collaborator
pub trait HttpClient {
    /// Issue one GET request and return the full response.
    fn get(&mut self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>>;
}

impl<T: HttpClient> HttpClient for &mut T {
    async fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url).await
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(TransportError),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("malformed payload")]
    Parse,
    #[error("payload missing {0}")]
    MissingField(&'static str),
    #[error("no API key configured")]
    NoApiKey,
    #[error("request timed out")]
    Timeout,
}

/// Client for the current-conditions and forecast endpoints.
///
/// Each fetch is exactly one request with no retry; the next scheduled wake
/// is the retry.
pub struct WeatherClient<H> {
    http: H,
    timeout: Duration,
}

impl<H: HttpClient> WeatherClient<H> {
    pub fn new(http: H) -> Self {
        Self {
            http,
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch_current(
        &mut self,
        settings: &Settings,
        now: Option<Timestamp>,
    ) -> Result<WeatherSnapshot, FetchError> {
        let url = build_url(CURRENT_PATH, settings, None)?;
        let body = self.get(&url).await?;
        let snapshot = parse_current(&body, now)?;

        info!(
            "Weather: {:?} (min {:?} max {:?}) id={:?} main={}",
            snapshot.temp, snapshot.temp_min, snapshot.temp_max, snapshot.weather_id, snapshot.main
        );
        Ok(snapshot)
    }

    pub async fn fetch_forecast(&mut self, settings: &Settings) -> Result<ForecastSnapshot, FetchError> {
        let url = build_url(FORECAST_PATH, settings, Some(FORECAST_PERIODS))?;
        let body = self.get(&url).await?;
        let snapshot = parse_forecast(&body)?;

        info!(
            "Forecast: min {:?} max {:?} id={:?} main={}",
            snapshot.temp_min, snapshot.temp_max, snapshot.weather_id, snapshot.main
        );
        Ok(snapshot)
    }

    async fn get(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = with_timeout(self.timeout, self.http.get(url))
            .await
            .map_err(|_| {
                warn!("HTTP GET timed out after {}ms", self.timeout.as_millis());
                FetchError::Timeout
            })?
            .map_err(|e| {
                warn!("HTTP GET failed: {}", e);
                FetchError::Network(e)
            })?;

        debug!("HTTP GET code: {}", response.status);
        if response.status != 200 {
            warn!(
                "HTTP GET failed, code={} body={}",
                response.status,
                core::str::from_utf8(&response.body).unwrap_or("<binary>")
            );
            return Err(FetchError::HttpStatus(response.status));
        }

        Ok(response.body)
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn into_inner(self) -> H {
        self.http
    }
}

fn build_url(path: &str, settings: &Settings, periods: Option<u8>) -> Result<String, FetchError> {
    if !settings.has_api_key() {
        warn!("No OpenWeather API key stored; open the setup portal to set it");
        return Err(FetchError::NoApiKey);
    }

    let mut url = String::with_capacity(160);
    // Writing into a String cannot fail
    let _ = write!(
        url,
        "https://{}{}?q={}&appid={}&units={}",
        API_HOST,
        path,
        query_value(&settings.city),
        query_value(&settings.api_key),
        settings.units.as_query()
    );
    if let Some(cnt) = periods {
        let _ = write!(url, "&cnt={}", cnt);
    }

    debug!("GET https://{}{}?q={} units={}", API_HOST, path, settings.city, settings.units.as_query());
    Ok(url)
}

/// Percent-encode a query parameter value.
///
/// Spaces become `%20`; the `,` separating city and country code is kept.
pub fn query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}
