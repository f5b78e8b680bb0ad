//! Program guide.
//!
//! Channel metadata and program listings come from the Virgin Media (Horizon) web guide API. The
//! [`GuideCache`] holds what's been fetched so far and is shared between every managed box; the
//! API itself sits behind the [`GuideFetcher`] trait.

use chrono::{DateTime, Duration, Utc};

pub use api::{
    ApiChannel, ApiListing, ApiProgram, ChannelsResponse, GuideFetcher, HttpGuideFetcher,
    ListingsResponse, Station, StationImage, StationSchedule, GUIDE_BASE_URL,
};
pub use cache::GuideCache;

mod api;
mod cache;

/// Problems fetching guide data.
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("guide request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid guide url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("channel {0} is not in the guide")]
    UnknownChannel(u16),
    #[error("listings window of {0} hours is out of range")]
    InvalidWindow(u32),
}

/// Guide metadata for a single channel number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideChannel {
    pub channel_number: u16,
    /// Station id used to request listings.
    pub station_id: String,
    pub title: String,
    /// Live still of what's currently showing.
    pub preview_url: Option<String>,
    pub logo_url: Option<String>,
}

impl GuideChannel {
    /// Copy of this channel for another channel number, with a suffix added to the title.
    fn derive(&self, channel_number: u16, title_suffix: &str) -> GuideChannel {
        GuideChannel {
            channel_number,
            title: format!("{}{}", self.title, title_suffix),
            ..self.clone()
        }
    }
}

/// A single program in a channel's listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramListing {
    pub title: String,
    pub description: Option<String>,
    pub program_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Medium reported by the guide, e.g. `TV` or `Movie`.
    pub program_type: Option<String>,
    pub episode_title: Option<String>,
    pub episode_number: Option<String>,
    pub series_number: Option<String>,
}

impl ProgramListing {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn is_showing_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// Cached listings for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelListings {
    /// Listings are fetched again once this time is reached.
    pub next_refresh: DateTime<Utc>,
    /// Programs ordered by start time.
    pub listings: Vec<ProgramListing>,
}

impl ChannelListings {
    /// Copy of these listings with every program moved by `offset`.
    pub fn shifted(&self, offset: Duration) -> ChannelListings {
        ChannelListings {
            next_refresh: self.next_refresh,
            listings: self
                .listings
                .iter()
                .map(|listing| ProgramListing {
                    start_time: listing.start_time + offset,
                    end_time: listing.end_time + offset,
                    ..listing.clone()
                })
                .collect(),
        }
    }

    pub fn program_at(&self, at: DateTime<Utc>) -> Option<&ProgramListing> {
        self.listings.iter().find(|listing| listing.is_showing_at(at))
    }
}

#[cfg(test)]
pub(crate) use cache::tests;
