//! Setup portal form: page markup and submission decoding
//!
//! The portal serves a single HTML form over plain HTTP. Submissions arrive
//! as an `application/x-www-form-urlencoded` query on `GET /save`.

use core::fmt::Write as _;

use alloc::string::String;
use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::connectivity::{PortalForm, PortalSubmission};

/// Path the form submits to
pub const SAVE_PATH: &str = "/save";

/// 802.11 limits, in bytes
pub const SSID_MAX_LEN: usize = 32;
pub const PASSWORD_MAX_LEN: usize = 64;

/// Why submitted WiFi credentials cannot be used
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("network name is empty")]
    MissingSsid,
    #[error("network name is longer than {} bytes", SSID_MAX_LEN)]
    SsidTooLong,
    #[error("password is longer than {} bytes", PASSWORD_MAX_LEN)]
    PasswordTooLong,
}

impl CredentialsError {
    /// Text shown above the form after a rejected submission
    pub const fn notice(self) -> &'static str {
        match self {
            Self::MissingSsid => "Enter a network name",
            Self::SsidTooLong => "Network name is too long (32 characters at most)",
            Self::PasswordTooLong => "Password is too long (64 characters at most)",
        }
    }
}

/// Values from one form submission, still untrimmed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormFields {
    pub ssid: String,
    pub password: String,
    pub api_key: String,
    pub city: String,
}

impl FormFields {
    /// Decode an urlencoded query string. Unknown keys are ignored and the
    /// last occurrence of a repeated key wins.
    pub fn from_query(query: &str) -> Self {
        let mut fields = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = url_decode(value);
            match key {
                "ssid" => fields.ssid = value,
                "pass" => fields.password = value,
                "apikey" => fields.api_key = value,
                "city" => fields.city = value,
                _ => {}
            }
        }
        fields
    }

    /// Network name with surrounding whitespace removed
    pub fn ssid(&self) -> &str {
        self.ssid.trim()
    }

    pub fn check_credentials(&self) -> Result<(), CredentialsError> {
        let ssid = self.ssid();
        if ssid.is_empty() {
            Err(CredentialsError::MissingSsid)
        } else if ssid.len() > SSID_MAX_LEN {
            Err(CredentialsError::SsidTooLong)
        } else if self.password.len() > PASSWORD_MAX_LEN {
            Err(CredentialsError::PasswordTooLong)
        } else {
            Ok(())
        }
    }

    /// The part of the submission the settings care about
    pub fn submission(&self) -> PortalSubmission {
        PortalSubmission {
            api_key: self.api_key.clone(),
            city: self.city.clone(),
        }
    }
}

/// Method, path and optional query from an HTTP request head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl<'a> RequestLine<'a> {
    pub fn parse(head: &'a str) -> Option<Self> {
        let line = head.lines().next()?;
        let mut parts = line.split(' ');
        let method = parts.next().filter(|m| !m.is_empty())?;
        let target = parts.next()?;
        parts.next().filter(|v| v.starts_with("HTTP/"))?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Some(Self { method, path, query })
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode `+` and `%XX` escapes. Malformed escapes are kept literally and
/// invalid UTF-8 is replaced.
pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Escape text for use inside an HTML attribute value
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Render the setup page, pre-filled with the stored API key and city.
///
/// `notice` is shown above the form, e.g. after a failed join attempt.
pub fn render_page(form: &PortalForm, notice: Option<&str>) -> String {
    let mut page = String::with_capacity(1024);
    page.push_str(
        "<!DOCTYPE html><html><head><meta name=\"viewport\" content=\"width=device-width\">\
         <title>Weather display setup</title></head><body><h2>Weather display setup</h2>",
    );

    if let Some(notice) = notice {
        page.push_str("<p><b>");
        push_escaped(&mut page, notice);
        page.push_str("</b></p>");
    }

    let _ = write!(page, "<form method=\"get\" action=\"{}\">", SAVE_PATH);
    page.push_str(
        "<p>WiFi network<br><input name=\"ssid\" maxlength=\"32\"></p>\
         <p>WiFi password<br><input name=\"pass\" type=\"password\" maxlength=\"64\"></p>\
         <p>OpenWeather API key<br><input name=\"apikey\" maxlength=\"64\" value=\"",
    );
    push_escaped(&mut page, &form.api_key);
    page.push_str("\"></p><p>City<br><input name=\"city\" maxlength=\"64\" value=\"");
    push_escaped(&mut page, &form.city);
    page.push_str("\"></p><p><button type=\"submit\">Save</button></p></form></body></html>");
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::FromTruncated;
    use crate::config::FieldString;

    #[test]
    fn decodes_submission() {
        let fields = FormFields::from_query("ssid=Home+Net&pass=p%40ss%26word&apikey=abc123&city=Beer+Sheva%2CIL");
        assert_eq!(fields.ssid, "Home Net");
        assert_eq!(fields.password, "p@ss&word");
        assert_eq!(fields.api_key, "abc123");
        assert_eq!(fields.city, "Beer Sheva,IL");
    }

    #[test]
    fn missing_fields_are_empty() {
        let fields = FormFields::from_query("ssid=x&unknown=1&apikey");
        assert_eq!(fields.ssid, "x");
        assert_eq!(fields.api_key, "");
        assert_eq!(fields.city, "");
        assert_eq!(fields.submission(), PortalSubmission::default());
    }

    #[test]
    fn rejected_credentials_name_the_field() {
        let long_ssid = "s".repeat(SSID_MAX_LEN + 1);
        let long_pass = "p".repeat(PASSWORD_MAX_LEN + 1);

        let fields = |ssid: &str, pass: &str| FormFields {
            ssid: ssid.into(),
            password: pass.into(),
            ..FormFields::default()
        };

        assert_eq!(fields("  ", "pw").check_credentials(), Err(CredentialsError::MissingSsid));
        assert_eq!(fields(&long_ssid, "pw").check_credentials(), Err(CredentialsError::SsidTooLong));
        assert_eq!(
            fields("Home", &long_pass).check_credentials(),
            Err(CredentialsError::PasswordTooLong)
        );
        assert!(CredentialsError::PasswordTooLong.notice().starts_with("Password"));

        let at_limit = fields(&format!(" {} ", "s".repeat(SSID_MAX_LEN)), &"p".repeat(PASSWORD_MAX_LEN));
        assert_eq!(at_limit.check_credentials(), Ok(()));
        assert_eq!(at_limit.ssid().len(), SSID_MAX_LEN);
        assert_eq!(fields("Open", "").check_credentials(), Ok(()));
    }

    #[test]
    fn malformed_escapes_are_kept() {
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
        assert_eq!(url_decode("%4"), "%4");
        assert_eq!(url_decode("S%C3%A3o"), "São");
    }

    #[test]
    fn request_line() {
        let head = "GET /save?ssid=a&city=b HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n";
        assert_eq!(
            RequestLine::parse(head),
            Some(RequestLine { method: "GET", path: "/save", query: Some("ssid=a&city=b") })
        );
        assert_eq!(
            RequestLine::parse("GET / HTTP/1.0\r\n"),
            Some(RequestLine { method: "GET", path: "/", query: None })
        );
        assert_eq!(RequestLine::parse("garbage"), None);
    }

    #[test]
    fn page_escapes_prefilled_values() {
        let form = PortalForm {
            api_key: FieldString::from_truncated("k\"ey"),
            city: FieldString::from_truncated("<Tel Aviv>"),
        };
        let page = render_page(&form, Some("Could not join 'Home'"));
        assert!(page.contains("value=\"k&quot;ey\""));
        assert!(page.contains("value=\"&lt;Tel Aviv&gt;\""));
        assert!(page.contains("Could not join &#39;Home&#39;"));
        assert!(page.contains("action=\"/save\""));
    }
}
