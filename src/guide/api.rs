//! Virgin Media web guide API payloads and client.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::{form_urlencoded, Url};

use super::{GuideError, ProgramListing};

/// Base url of the guide API. Must end with a `/`.
pub const GUIDE_BASE_URL: &str = "https://web-api-pepper.horizon.tv/oesp/api/GB/eng/web/";

const GUIDE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const GUIDE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/41.0.2228.0 Safari/537.36";

const PREVIEW_ASSET_TYPE: &str = "imageStream";
const LOGO_ASSET_TYPE: &str = "station-logo-large";

// ------------------------------------------------------------------------------------------------
// Channels

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsResponse {
    #[serde(default)]
    pub channels: Vec<ApiChannel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChannel {
    pub channel_number: u32,
    #[serde(default)]
    pub station_schedules: Vec<StationSchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationSchedule {
    pub station: Station,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<StationImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationImage {
    pub asset_type: String,
    pub url: String,
}

impl ApiChannel {
    /// The station currently broadcasting on this channel.
    pub fn station(&self) -> Option<&Station> {
        self.station_schedules.first().map(|schedule| &schedule.station)
    }
}

impl Station {
    fn image_url(&self, asset_type: &str) -> Option<String> {
        self.images
            .iter()
            .find(|image| image.asset_type == asset_type)
            .map(|image| image.url.clone())
    }

    pub fn preview_url(&self) -> Option<String> {
        self.image_url(PREVIEW_ASSET_TYPE)
    }

    pub fn logo_url(&self) -> Option<String> {
        self.image_url(LOGO_ASSET_TYPE)
    }
}

// ------------------------------------------------------------------------------------------------
// Listings

#[derive(Debug, Clone, Deserialize)]
pub struct ListingsResponse {
    #[serde(default)]
    pub listings: Vec<ApiListing>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListing {
    /// Milliseconds since the epoch.
    pub start_time: i64,
    /// Milliseconds since the epoch.
    pub end_time: i64,
    pub station_id: String,
    pub program: ApiProgram,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProgram {
    pub title: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub medium: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub series_episode_number: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub series_number: Option<String>,
    pub secondary_title: Option<String>,
}

/// Episode and series numbers turn up as both strings and numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    })
}

impl ApiListing {
    /// Convert to a [`ProgramListing`]. Returns `None` if the listing times are out of range.
    pub fn to_program_listing(&self) -> Option<ProgramListing> {
        let start_time = Utc.timestamp_millis_opt(self.start_time).single()?;
        let end_time = Utc.timestamp_millis_opt(self.end_time).single()?;

        let program = &self.program;

        // Episode details are only meaningful as a pair
        let (episode_number, series_number) =
            match (&program.series_episode_number, &program.series_number) {
                (Some(episode), Some(series)) => (Some(episode.clone()), Some(series.clone())),
                _ => (None, None),
            };

        Some(ProgramListing {
            title: program.title.clone(),
            description: program
                .description
                .clone()
                .or_else(|| program.long_description.clone()),
            program_id: self.station_id.clone(),
            start_time,
            end_time,
            program_type: program.medium.clone(),
            episode_title: program.secondary_title.clone(),
            episode_number,
            series_number,
        })
    }
}

// ================================================================================================
// Fetchers

/// Source of guide data.
pub trait GuideFetcher: Send + Sync {
    fn fetch_channels(&self) -> BoxFuture<'_, Result<ChannelsResponse, GuideError>>;

    /// Fetch the listings for a station which start within the given window.
    fn fetch_listings(
        &self,
        station_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<ListingsResponse, GuideError>>;
}

/// [`GuideFetcher`] which talks to the guide API over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpGuideFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGuideFetcher {
    pub fn new() -> Result<Self, GuideError> {
        HttpGuideFetcher::with_base_url(GUIDE_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, GuideError> {
        let client = reqwest::Client::builder()
            .timeout(GUIDE_REQUEST_TIMEOUT)
            .user_agent(GUIDE_USER_AGENT)
            .build()?;

        Ok(HttpGuideFetcher {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn channels_url(&self) -> Result<Url, GuideError> {
        Ok(self.base_url.join("channels")?)
    }

    fn listings_url(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Url, GuideError> {
        let mut url = self.base_url.join("listings")?;

        // The time range separator must stay a literal `~`, so only the station id is encoded
        let station_id: String = form_urlencoded::byte_serialize(station_id.as_bytes()).collect();

        url.set_query(Some(&format!(
            "byStationId={}&byStartTime={}~{}&sort=startTime",
            station_id,
            start.timestamp_millis(),
            end.timestamp_millis()
        )));

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GuideError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

impl GuideFetcher for HttpGuideFetcher {
    fn fetch_channels(&self) -> BoxFuture<'_, Result<ChannelsResponse, GuideError>> {
        async move {
            let url = self.channels_url()?;
            self.get_json(url).await
        }
        .boxed()
    }

    fn fetch_listings(
        &self,
        station_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<ListingsResponse, GuideError>> {
        async move {
            let url = self.listings_url(&station_id, start, end)?;
            self.get_json(url).await
        }
        .boxed()
    }
}

// ================================================================================================
// Tests
