//! Parse the unsolicited status lines sent by a TiVo box.
//!
//! The box announces the currently tuned channel with `CH_STATUS <digits> ...` and reports tuning
//! problems with `CH_FAILED <reason>`. A message may carry several CR/LF-separated lines; the first
//! marker found wins.

use std::fmt;

const CHANNEL_STATUS_MARKER: &str = "CH_STATUS ";
const CHANNEL_FAILED_MARKER: &str = "CH_FAILED ";

/// Failure code sent by the box when it is not showing live TV (e.g. a menu or recording is on
/// screen). This is not an error condition.
pub const NO_LIVE_FAILURE: &str = "NO_LIVE";

/// The result of parsing a raw status message from the box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxStatus {
    /// The box is tuned to the given channel number.
    Channel(u16),
    /// The box reported a failure code.
    Failed(String),
    /// No recognisable status was found (including an empty message).
    NoMatch,
}

impl BoxStatus {
    /// Whether this status should cause the connection to the box to be dropped.
    ///
    /// Every failure code other than [`NO_LIVE_FAILURE`] means the box is in a state we can't
    /// recover from over the current connection.
    pub fn requires_disconnect(&self) -> bool {
        matches!(self, BoxStatus::Failed(code) if code != NO_LIVE_FAILURE)
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoxStatus::Channel(id) => write!(f, "Channel({})", id),
            BoxStatus::Failed(code) => write!(f, "Failed({})", code),
            BoxStatus::NoMatch => write!(f, "NoMatch"),
        }
    }
}

/// Parse a raw message received from the box.
pub fn parse_status(message: &str) -> BoxStatus {
    if let Some(digits) = token_after(message, CHANNEL_STATUS_MARKER, |c| c.is_ascii_digit()) {
        // More digits than a u16 can hold is not a channel we know about
        if let Ok(channel_id) = digits.parse::<u16>() {
            return BoxStatus::Channel(channel_id);
        }
    }

    match token_after(message, CHANNEL_FAILED_MARKER, |c| {
        c.is_alphanumeric() || c == '_'
    }) {
        Some(code) => BoxStatus::Failed(code.to_string()),
        None => BoxStatus::NoMatch,
    }
}

/// Find the first occurrence of `marker` which is immediately followed by at least one character
/// accepted by `accept`, returning the run of accepted characters.
fn token_after<'a>(message: &'a str, marker: &str, accept: impl Fn(char) -> bool) -> Option<&'a str> {
    let mut search_from = 0;

    while let Some(found) = message[search_from..].find(marker) {
        let token_start = search_from + found + marker.len();
        let remainder = &message[token_start..];
        let token_len = remainder
            .char_indices()
            .find(|(_, c)| !accept(*c))
            .map(|(idx, _)| idx)
            .unwrap_or(remainder.len());

        if token_len > 0 {
            return Some(&remainder[..token_len]);
        }

        search_from = token_start;
    }

    None
}

// ================================================================================================
// Tests

#[cfg(test)]
mod tests {
    use super::{parse_status, BoxStatus};

    #[test]
    fn channel_status() {
        assert_eq!(parse_status("CH_STATUS 105"), BoxStatus::Channel(105));
        assert_eq!(
            parse_status("CH_STATUS 0101 LOCAL\r\n"),
            BoxStatus::Channel(101)
        );
    }

    #[test]
    fn failure_status() {
        assert_eq!(
            parse_status("CH_FAILED NO_LIVE"),
            BoxStatus::Failed("NO_LIVE".into())
        );
        assert_eq!(
            parse_status("CH_FAILED SIGNAL_LOST\r"),
            BoxStatus::Failed("SIGNAL_LOST".into())
        );
    }

    #[test]
    fn channel_status_takes_precedence_over_failure() {
        assert_eq!(
            parse_status("CH_FAILED NO_LIVE\r\nCH_STATUS 0501 REMOTE\r\n"),
            BoxStatus::Channel(501)
        );
    }

    #[test]
    fn first_channel_status_wins() {
        assert_eq!(
            parse_status("CH_STATUS 0101 LOCAL\r\nCH_STATUS 0108 LOCAL\r\n"),
            BoxStatus::Channel(101)
        );
    }

    #[test]
    fn no_match() {
        assert_eq!(parse_status(""), BoxStatus::NoMatch);
        assert_eq!(parse_status("INVALID_COMMAND"), BoxStatus::NoMatch);
        assert_eq!(parse_status("CH_STATUS LOCAL"), BoxStatus::NoMatch);
        assert_eq!(parse_status("CH_FAILED "), BoxStatus::NoMatch);
    }

    #[test]
    fn marker_without_token_is_skipped() {
        assert_eq!(
            parse_status("CH_STATUS \r\nCH_STATUS 0202"),
            BoxStatus::Channel(202)
        );
    }

    #[test]
    fn disconnect_policy() {
        assert!(!parse_status("CH_FAILED NO_LIVE").requires_disconnect());
        assert!(parse_status("CH_FAILED SIGNAL_LOST").requires_disconnect());
        assert!(!parse_status("CH_STATUS 0101").requires_disconnect());
        assert!(!parse_status("").requires_disconnect());
    }

    #[test]
    fn box_status_display() {
        assert_eq!(BoxStatus::Channel(101).to_string(), "Channel(101)");
        assert_eq!(
            BoxStatus::Failed("NO_LIVE".into()).to_string(),
            "Failed(NO_LIVE)"
        );
        assert_eq!(BoxStatus::NoMatch.to_string(), "NoMatch");
    }
}
