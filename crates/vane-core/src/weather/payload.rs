//! Response payload parsing
//!
//! The JSON is first decoded into permissive mirror types where every field
//! is optional, then validated. That split keeps "not JSON / wrong types"
//! ([`FetchError::Parse`]) apart from "valid JSON without a field we need"
//! ([`FetchError::MissingField`]).

use alloc::string::String;
use alloc::vec::Vec;
use log::warn;
use serde::Deserialize;

use super::client::FetchError;
use super::snapshot::{ForecastSnapshot, WeatherSnapshot};
use crate::time_sync::Timestamp;

#[derive(Deserialize, Debug, Default)]
struct MainBlock {
    temp: Option<f32>,
    temp_min: Option<f32>,
    temp_max: Option<f32>,
    feels_like: Option<f32>,
}

#[derive(Deserialize, Debug)]
struct ConditionBlock {
    id: Option<i32>,
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CurrentPayload {
    main: Option<MainBlock>,
    weather: Option<Vec<ConditionBlock>>,
}

#[derive(Deserialize, Debug)]
struct ForecastEntry {
    main: Option<MainBlock>,
    weather: Option<Vec<ConditionBlock>>,
}

#[derive(Deserialize, Debug)]
struct ForecastPayload {
    list: Option<Vec<ForecastEntry>>,
}

/// Take the first condition, which must carry a numeric id
fn first_condition(
    weather: Option<Vec<ConditionBlock>>,
    path: &'static str,
    id_path: &'static str,
) -> Result<(i32, ConditionBlock), FetchError> {
    let condition = weather
        .and_then(|list| list.into_iter().next())
        .ok_or(FetchError::MissingField(path))?;
    let id = condition.id.ok_or(FetchError::MissingField(id_path))?;
    Ok((id, condition))
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Weather payload malformed: {}", e);
        FetchError::Parse
    })
}

pub(super) fn parse_current(
    body: &[u8],
    timestamp: Option<Timestamp>,
) -> Result<WeatherSnapshot, FetchError> {
    let payload: CurrentPayload = decode(body)?;

    let (id, condition) = first_condition(payload.weather, "weather[0]", "weather[0].id")?;
    let main = payload.main.unwrap_or_default();

    Ok(WeatherSnapshot {
        temp: main.temp,
        temp_min: main.temp_min,
        temp_max: main.temp_max,
        feels_like: main.feels_like,
        weather_id: Some(id),
        main: condition.main.unwrap_or_default(),
        description: condition.description.unwrap_or_default(),
        icon_code: condition.icon.unwrap_or_default(),
        timestamp,
    })
}

pub(super) fn parse_forecast(body: &[u8]) -> Result<ForecastSnapshot, FetchError> {
    let payload: ForecastPayload = decode(body)?;

    let entry = payload
        .list
        .and_then(|list| list.into_iter().next())
        .ok_or(FetchError::MissingField("list[0]"))?;

    let (id, condition) =
        first_condition(entry.weather, "list[0].weather[0]", "list[0].weather[0].id")?;
    let main = entry.main.unwrap_or_default();

    Ok(ForecastSnapshot {
        temp_min: main.temp_min,
        temp_max: main.temp_max,
        weather_id: Some(id),
        main: condition.main.unwrap_or_default(),
        icon_code: condition.icon.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "coord": {"lon": 34.79, "lat": 31.25},
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
        "main": {"temp": -3.5, "feels_like": -7.25, "temp_min": -4.0, "temp_max": 0.5, "pressure": 1012},
        "name": "Beersheba"
    }"#;

    #[test]
    fn current_copies_values_verbatim() {
        let ts = Timestamp::from_unix_secs(1_760_000_000);
        let snap = parse_current(CURRENT.as_bytes(), Some(ts)).unwrap();

        assert_eq!(snap.temp, Some(-3.5));
        assert_eq!(snap.feels_like, Some(-7.25));
        assert_eq!(snap.temp_min, Some(-4.0));
        assert_eq!(snap.temp_max, Some(0.5));
        assert_eq!(snap.weather_id, Some(802));
        assert_eq!(snap.main, "Clouds");
        assert_eq!(snap.description, "scattered clouds");
        assert_eq!(snap.icon_code, "03d");
        assert_eq!(snap.timestamp, Some(ts));
    }

    #[test]
    fn missing_id_is_missing_field() {
        let body = r#"{"weather":[{"main":"Rain","description":"light rain","icon":"10d"}],
                       "main":{"temp":12.0}}"#;
        assert_eq!(
            parse_current(body.as_bytes(), None),
            Err(FetchError::MissingField("weather[0].id"))
        );
    }

    #[test]
    fn empty_weather_array_is_missing_field() {
        let body = r#"{"weather":[],"main":{"temp":12.0}}"#;
        assert_eq!(
            parse_current(body.as_bytes(), None),
            Err(FetchError::MissingField("weather[0]"))
        );
    }

    #[test]
    fn absent_temperatures_stay_unknown() {
        let body = r#"{"weather":[{"id":800}],"main":{"temp":null}}"#;
        let snap = parse_current(body.as_bytes(), None).unwrap();
        assert_eq!(snap.temp, None);
        assert_eq!(snap.temp_min, None);
        assert_eq!(snap.feels_like, None);
        assert_eq!(snap.main, "");
        assert_eq!(snap.icon_code, "");
        assert_eq!(snap.timestamp, None);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert_eq!(parse_current(b"{\"weather\": [", None), Err(FetchError::Parse));
        assert_eq!(parse_current(b"<html>502</html>", None), Err(FetchError::Parse));
        let wrong_type = r#"{"weather":[{"id":"eight hundred"}]}"#;
        assert_eq!(parse_current(wrong_type.as_bytes(), None), Err(FetchError::Parse));
    }

    #[test]
    fn forecast_uses_first_period_only() {
        let body = r#"{"cod":"200","cnt":2,"list":[
            {"main":{"temp_min":3.25,"temp_max":9.5},"weather":[{"id":500,"main":"Rain","icon":"10n"}]},
            {"main":{"temp_min":1.0,"temp_max":2.0},"weather":[{"id":800,"main":"Clear","icon":"01n"}]}
        ]}"#;
        let snap = parse_forecast(body.as_bytes()).unwrap();
        assert_eq!(snap.temp_min, Some(3.25));
        assert_eq!(snap.temp_max, Some(9.5));
        assert_eq!(snap.weather_id, Some(500));
        assert_eq!(snap.main, "Rain");
        assert_eq!(snap.icon_code, "10n");
    }

    #[test]
    fn empty_forecast_list_is_missing_field() {
        assert_eq!(
            parse_forecast(br#"{"cod":"200","cnt":0,"list":[]}"#),
            Err(FetchError::MissingField("list[0]"))
        );
        assert_eq!(
            parse_forecast(br#"{"cod":"200"}"#),
            Err(FetchError::MissingField("list[0]"))
        );
    }

    #[test]
    fn forecast_entry_without_id_is_missing_field() {
        let body = r#"{"list":[{"main":{"temp_min":1.0},"weather":[{"main":"Snow"}]}]}"#;
        assert_eq!(
            parse_forecast(body.as_bytes()),
            Err(FetchError::MissingField("list[0].weather[0].id"))
        );
    }
}
