/// Current state of the channel and program showing on the managed TiVo box.
///
/// Everything is `None` until the box has reported a channel (and, for the media fields, until
/// the guide has a program for that channel).
#[derive(Debug, Default, Clone, PartialEq, Hash)]
pub struct TivoState {
    /// Name of the channel currently showing.
    pub source: Option<String>,
    pub channel_id: Option<u16>,
    /// Guide title of the channel currently showing.
    pub guide_channel_title: Option<String>,
    /// The channel name (the program is in `media_series_title`).
    pub media_title: Option<String>,
    pub media_series_title: Option<String>,
    pub media_content_type: Option<String>,
    pub media_image_url: Option<String>,
    /// Seconds since the current program started.
    pub media_position: Option<i64>,
    /// Length of the current program in seconds.
    pub media_duration: Option<i64>,
}

/// Static details of the managed TiVo box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TivoInfo {
    pub tivo_id: u8,
    pub name: String,
    pub host: String,
    pub unique_id: String,
}

// ================================================================================================
// Tests
