//! Wake-cycle state shared by the duty-cycle components

/// Phase of a single wake cycle.
///
/// A wake always starts at [`WakePhase::Boot`] and ends at
/// [`WakePhase::Sleeping`]; there is no way back from `Sleeping` on the same
/// execution path. The next wake is a fresh boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePhase {
    Boot,
    Connecting,
    SyncingTime,
    Fetching,
    Rendering,
    Sleeping,
}

impl WakePhase {
    /// Short label used in log lines
    pub const fn label(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Connecting => "connecting",
            Self::SyncingTime => "syncing-time",
            Self::Fetching => "fetching",
            Self::Rendering => "rendering",
            Self::Sleeping => "sleeping",
        }
    }
}

/// Build a bounded string from a longer value, keeping as many whole
/// characters as fit.
pub trait FromTruncated<T> {
    fn from_truncated(value: T) -> Self;
}

impl<'a, const N: usize> FromTruncated<&'a str> for heapless::String<N> {
    fn from_truncated(value: &'a str) -> Self {
        let mut out = heapless::String::new();
        for c in value.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        // 'é' is two bytes; only one fits after "abc" in 4 bytes
        let s: heapless::String<4> = FromTruncated::from_truncated("abcé");
        assert_eq!(s.as_str(), "abc");

        let s: heapless::String<8> = FromTruncated::from_truncated("abcé");
        assert_eq!(s.as_str(), "abcé");
    }
}
