use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use tokio::sync::RwLock;

use crate::channels::ChannelDirectory;
use crate::config::GuideSettings;

use super::{ChannelListings, GuideChannel, GuideError, GuideFetcher, ProgramListing};

/// How far back the listings window starts.
const LISTINGS_LOOK_BACK_HOURS: i64 = 6;
/// How far +1 channels run behind their base channel.
const PLUS_ONE_OFFSET_HOURS: i64 = 1;
/// Wait before asking again for listings after a failed or empty fetch.
const LISTINGS_RETRY_MINUTES: i64 = 5;

/// Process-wide cache of guide channels and listings.
///
/// Channels are fetched once and kept until [`clear`](Self::clear) is called. Listings are
/// fetched per SD channel and kept until the last program in the fetched window has ended. The HD
/// version of a channel shares the SD listings, while the +1 version gets its own copy shifted by
/// an hour.
///
/// A failed or empty listings fetch isn't retried for a few minutes, so a guide outage doesn't
/// cost a request on every poll.
///
/// Population is check-then-fetch without holding a lock across the fetch, so concurrent callers
/// may fetch the same data twice. The last write wins.
pub struct GuideCache {
    directory: Arc<ChannelDirectory>,
    settings: GuideSettings,
    fetcher: Arc<dyn GuideFetcher>,
    channels: RwLock<HashMap<u16, GuideChannel>>,
    listings: RwLock<HashMap<u16, Arc<ChannelListings>>>,
    retry_after: RwLock<HashMap<u16, DateTime<Utc>>>,
}

impl GuideCache {
    pub fn new(
        directory: Arc<ChannelDirectory>,
        settings: GuideSettings,
        fetcher: Arc<dyn GuideFetcher>,
    ) -> Self {
        GuideCache {
            directory,
            settings,
            fetcher,
            channels: RwLock::new(HashMap::new()),
            listings: RwLock::new(HashMap::new()),
            retry_after: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enable_guide
    }

    /// Fetch the guide channels, unless they've already been fetched.
    ///
    /// Guide channels are also created for the HD and +1 versions of every fetched channel. A
    /// failed fetch leaves the cache empty.
    pub async fn ensure_channels_loaded(&self) -> Result<(), GuideError> {
        if !self.channels.read().await.is_empty() {
            debug!("Guide channels already populated");
            return Ok(());
        }

        debug!("Retrieving guide channels");

        let response = self.fetcher.fetch_channels().await?;
        let mut channels = HashMap::new();

        for api_channel in &response.channels {
            let (Ok(channel_number), Some(station)) = (
                u16::try_from(api_channel.channel_number),
                api_channel.station(),
            ) else {
                continue;
            };

            let guide_channel = GuideChannel {
                channel_number,
                station_id: station.id.clone(),
                title: station.title.clone(),
                preview_url: station.preview_url(),
                logo_url: station.logo_url(),
            };

            if let Some(hd_channel) = self.directory.hd_channel(channel_number) {
                channels.insert(hd_channel, guide_channel.derive(hd_channel, " HD"));
                debug!("Copied channel [{channel_number}] to HD channel [{hd_channel}]");
            }

            if let Some(plus_one_channel) = self.directory.plus_one_channel(channel_number) {
                let mut plus_one = guide_channel.derive(plus_one_channel, " +1");
                // The preview still is of the live channel, not the +1
                plus_one.preview_url = None;

                channels.insert(plus_one_channel, plus_one);
                debug!("Copied channel [{channel_number}] to +1 channel [{plus_one_channel}]");
            }

            channels.entry(channel_number).or_insert(guide_channel);
        }

        debug!("Retrieved {} guide channels", channels.len());
        *self.channels.write().await = channels;

        Ok(())
    }

    /// Make sure the listings for `channel_id` are current.
    pub async fn ensure_listings_loaded(&self, channel_id: u16) -> Result<(), GuideError> {
        self.ensure_listings_loaded_at(channel_id, Utc::now()).await
    }

    /// Make sure the listings for `channel_id` are current as of `now`.
    ///
    /// Listings are cached against the SD channel. A failed fetch keeps whatever was cached
    /// before, and holds off further fetches for that channel for a few minutes.
    pub async fn ensure_listings_loaded_at(
        &self,
        channel_id: u16,
        now: DateTime<Utc>,
    ) -> Result<(), GuideError> {
        let sd_channel = self.directory.sd_channel(channel_id);

        if let Some(cached) = self.listings.read().await.get(&sd_channel) {
            if now < cached.next_refresh {
                return Ok(());
            }
        }

        if self
            .retry_after
            .read()
            .await
            .get(&sd_channel)
            .is_some_and(|retry_after| now < *retry_after)
        {
            debug!("Holding off on listings for channel {sd_channel}");
            return Ok(());
        }

        let station_id = self
            .channels
            .read()
            .await
            .get(&sd_channel)
            .map(|channel| channel.station_id.clone())
            .ok_or(GuideError::UnknownChannel(sd_channel))?;

        let retry_at = now + Duration::minutes(LISTINGS_RETRY_MINUTES);

        let start = now - Duration::hours(LISTINGS_LOOK_BACK_HOURS);
        let end = start
            .checked_add_signed(Duration::hours(i64::from(self.settings.picture_refresh)))
            .ok_or(GuideError::InvalidWindow(self.settings.picture_refresh))?;

        debug!("Retrieving guide for channel {sd_channel} (station {station_id})");

        let response = match self.fetcher.fetch_listings(station_id, start, end).await {
            Ok(response) => response,
            Err(e) => {
                self.retry_after.write().await.insert(sd_channel, retry_at);
                return Err(e);
            }
        };

        let listings: Vec<ProgramListing> = response
            .listings
            .iter()
            .filter_map(|listing| {
                let program_listing = listing.to_program_listing();
                if program_listing.is_none() {
                    warn!("Ignoring listing with invalid times for channel {sd_channel}");
                }
                program_listing
            })
            .collect();

        let next_refresh = listings
            .last()
            .map(|listing| listing.end_time)
            .unwrap_or(retry_at);

        debug!(
            "Next refresh for channel [{sd_channel}]: {}",
            next_refresh.format("%Y-%m-%d %H:%M")
        );

        let channel_listings = Arc::new(ChannelListings {
            next_refresh,
            listings,
        });

        let mut cache = self.listings.write().await;

        if let Some(hd_channel) = self.directory.hd_channel(sd_channel) {
            cache.insert(hd_channel, Arc::clone(&channel_listings));
        }

        if let Some(plus_one_channel) = self.directory.plus_one_channel(sd_channel) {
            let plus_one_listings =
                Arc::new(channel_listings.shifted(Duration::hours(PLUS_ONE_OFFSET_HOURS)));

            if let Some(plus_one_hd_channel) = self.directory.hd_channel(plus_one_channel) {
                cache.insert(plus_one_hd_channel, Arc::clone(&plus_one_listings));
            }

            cache.insert(plus_one_channel, plus_one_listings);
        }

        cache.insert(sd_channel, channel_listings);
        self.retry_after.write().await.remove(&sd_channel);

        Ok(())
    }

    /// Guide channel for a channel number.
    pub async fn lookup(&self, channel_number: u16) -> Option<GuideChannel> {
        self.channels.read().await.get(&channel_number).cloned()
    }

    /// Cached listings for a channel number.
    pub async fn listings(&self, channel_number: u16) -> Option<Arc<ChannelListings>> {
        self.listings.read().await.get(&channel_number).cloned()
    }

    /// The program showing on `channel_number` at the given time, if any.
    pub async fn current_program(
        &self,
        channel_number: u16,
        at: DateTime<Utc>,
    ) -> Option<ProgramListing> {
        self.listings
            .read()
            .await
            .get(&channel_number)
            .and_then(|listings| listings.program_at(at).cloned())
    }

    /// Forget all guide channels and listings.
    pub async fn clear(&self) {
        self.channels.write().await.clear();
        self.listings.write().await.clear();
        self.retry_after.write().await.clear();
    }
}

// ================================================================================================
// Tests
