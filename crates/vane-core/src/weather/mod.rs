//! OpenWeather current-conditions and forecast queries

mod client;
mod payload;
mod snapshot;

pub use client::{
    FETCH_TIMEOUT, FORECAST_PERIODS, FetchError, HttpClient, HttpResponse, TransportError,
    WeatherClient, query_value,
};
pub use snapshot::{ForecastSnapshot, WeatherSnapshot};
