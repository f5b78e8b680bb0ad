//! Helper functions for deriving display values from guide data.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

use crate::guide::{GuideChannel, ProgramListing};

/// Image urls containing this are static logos, which don't need cache busting.
const STATIC_LOGO_MARKER: &str = "Channel_Logos";

/// Build the series title for a program, e.g. `Drama S 2, Ep 5: The Return 19:00 - 20:30`.
///
/// Start and end times are shown in the given time zone.
pub(crate) fn series_title<Tz: TimeZone>(listing: &ProgramListing, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut title = listing.title.clone();

    if let (Some(season), Some(episode)) = (&listing.series_number, &listing.episode_number) {
        title.push_str(&format!(" S {}, Ep {}", season, episode));
    }

    if let Some(episode_title) = &listing.episode_title {
        title.push_str(&format!(": {}", episode_title));
    }

    title.push_str(&format!(
        " {} - {}",
        listing.start_time.with_timezone(tz).format("%H:%M"),
        listing.end_time.with_timezone(tz).format("%H:%M")
    ));

    title
}

/// Append a cache-busting timestamp to an image url, so that live previews are always reloaded.
///
/// Urls which already have a query, and static channel logos, are returned unchanged.
pub(crate) fn cache_busted_image_url(url: &str, now: DateTime<Utc>) -> String {
    if url.contains('?') || url.contains(STATIC_LOGO_MARKER) {
        url.to_string()
    } else {
        format!("{}?{}", url, now.timestamp())
    }
}

/// Pick the artwork to show for the current channel.
///
/// Prefers the guide's live preview, then the guide's logo. Without a guide channel, the logo
/// configured for the channel is used.
pub(crate) fn media_image_url(
    guide_channel: Option<&GuideChannel>,
    configured_logo: Option<&str>,
    now: DateTime<Utc>,
) -> Option<String> {
    match guide_channel {
        Some(guide_channel) => guide_channel
            .preview_url
            .as_deref()
            .or(guide_channel.logo_url.as_deref())
            .map(|url| cache_busted_image_url(url, now)),
        None => configured_logo
            .filter(|logo| !logo.is_empty())
            .map(|logo| logo.to_string()),
    }
}

/// Seconds between the start of a program and `now`.
pub(crate) fn media_position(listing: &ProgramListing, now: DateTime<Utc>) -> i64 {
    (now - listing.start_time).num_seconds()
}

// ================================================================================================
// Tests
