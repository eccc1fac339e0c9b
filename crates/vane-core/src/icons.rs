//! Icon family resolution
//!
//! Every view that shows a weather icon resolves it through the same
//! three-tier chain, stopping at the first tier that matches:
//!
//! 1. the two-character prefix of the OpenWeather icon code,
//! 2. the numeric condition id range,
//! 3. the `main` condition text (case-sensitive), defaulting to mist.
//!
//! Scattered clouds (`03x`) deliberately resolve to the snow family.

/// Abstract icon category handed to the drawing code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFamily {
    Clear,
    FewClouds,
    Clouds,
    BrokenClouds,
    ShowerRain,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
}

/// Icon code prefix table
const PREFIX_TABLE: [(&str, IconFamily); 9] = [
    ("01", IconFamily::Clear),
    ("02", IconFamily::FewClouds),
    ("03", IconFamily::Snow),
    ("04", IconFamily::BrokenClouds),
    ("09", IconFamily::ShowerRain),
    ("10", IconFamily::Rain),
    ("11", IconFamily::Thunderstorm),
    ("13", IconFamily::Snow),
    ("50", IconFamily::Mist),
];

/// Condition text table, matched exactly
const MAIN_TABLE: [(&str, IconFamily); 6] = [
    ("Clear", IconFamily::Clear),
    ("Clouds", IconFamily::Clouds),
    ("Rain", IconFamily::Rain),
    ("Drizzle", IconFamily::Rain),
    ("Thunderstorm", IconFamily::Thunderstorm),
    ("Snow", IconFamily::Snow),
];

impl IconFamily {
    /// Resolve the icon family for a condition.
    pub fn resolve(icon_code: &str, weather_id: Option<i32>, main: &str) -> Self {
        Self::from_icon_code(icon_code)
            .or_else(|| weather_id.and_then(Self::from_weather_id))
            .unwrap_or_else(|| Self::from_main(main))
    }

    /// Tier 1: two-character icon code prefix
    pub fn from_icon_code(icon_code: &str) -> Option<Self> {
        let prefix = icon_code.get(..2)?;
        PREFIX_TABLE
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, family)| *family)
    }

    /// Tier 2: OpenWeather condition id groups
    pub const fn from_weather_id(id: i32) -> Option<Self> {
        match id {
            200..=299 => Some(Self::Thunderstorm),
            300..=599 => Some(Self::Rain),
            600..=699 => Some(Self::Snow),
            700..=799 => Some(Self::Mist),
            800 => Some(Self::Clear),
            801..=899 => Some(Self::Clouds),
            _ => None,
        }
    }

    /// Tier 3: condition text, mist when nothing matches
    pub fn from_main(main: &str) -> Self {
        MAIN_TABLE
            .iter()
            .find(|(text, _)| *text == main)
            .map(|(_, family)| *family)
            .unwrap_or(Self::Mist)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::FewClouds => "few-clouds",
            Self::Clouds => "clouds",
            Self::BrokenClouds => "broken-clouds",
            Self::ShowerRain => "shower-rain",
            Self::Rain => "rain",
            Self::Thunderstorm => "thunderstorm",
            Self::Snow => "snow",
            Self::Mist => "mist",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scattered_clouds_resolve_to_snow() {
        assert_eq!(IconFamily::resolve("03d", Some(802), "Clouds"), IconFamily::Snow);
        assert_eq!(IconFamily::resolve("03n", None, ""), IconFamily::Snow);
    }

    #[test]
    fn prefix_table() {
        let cases = [
            ("01d", IconFamily::Clear),
            ("02n", IconFamily::FewClouds),
            ("04d", IconFamily::BrokenClouds),
            ("09d", IconFamily::ShowerRain),
            ("10n", IconFamily::Rain),
            ("11d", IconFamily::Thunderstorm),
            ("13d", IconFamily::Snow),
            ("50n", IconFamily::Mist),
        ];
        for (code, family) in cases {
            assert_eq!(IconFamily::from_icon_code(code), Some(family), "{code}");
        }
    }

    #[test]
    fn prefix_wins_over_id_and_text() {
        assert_eq!(IconFamily::resolve("01d", Some(501), "Rain"), IconFamily::Clear);
    }

    #[test]
    fn unknown_or_short_code_falls_back_to_id() {
        assert_eq!(IconFamily::resolve("", Some(211), "Clear"), IconFamily::Thunderstorm);
        assert_eq!(IconFamily::resolve("7", Some(300), ""), IconFamily::Rain);
        assert_eq!(IconFamily::resolve("99d", Some(599), ""), IconFamily::Rain);
        assert_eq!(IconFamily::resolve("zz", Some(600), ""), IconFamily::Snow);
        assert_eq!(IconFamily::resolve("", Some(781), ""), IconFamily::Mist);
        assert_eq!(IconFamily::resolve("", Some(800), ""), IconFamily::Clear);
        assert_eq!(IconFamily::resolve("", Some(801), ""), IconFamily::Clouds);
        assert_eq!(IconFamily::resolve("", Some(899), ""), IconFamily::Clouds);
    }

    #[test]
    fn id_out_of_range_falls_back_to_text() {
        assert_eq!(IconFamily::resolve("", Some(900), "Snow"), IconFamily::Snow);
        assert_eq!(IconFamily::resolve("", Some(199), "Drizzle"), IconFamily::Rain);
        assert_eq!(IconFamily::resolve("", None, "Clouds"), IconFamily::Clouds);
        assert_eq!(IconFamily::resolve("", None, "Thunderstorm"), IconFamily::Thunderstorm);
        assert_eq!(IconFamily::resolve("", None, "Clear"), IconFamily::Clear);
    }

    #[test]
    fn text_match_is_case_sensitive_with_mist_default() {
        assert_eq!(IconFamily::resolve("", None, "clear"), IconFamily::Mist);
        assert_eq!(IconFamily::resolve("", None, "Haze"), IconFamily::Mist);
        assert_eq!(IconFamily::resolve("", None, ""), IconFamily::Mist);
    }

    #[test]
    fn multibyte_code_does_not_panic() {
        assert_eq!(IconFamily::from_icon_code("é1"), None);
    }
}
