use std::time::Duration;

/// Port the TiVo remote control protocol listens on.
pub const TIVO_PORT: u16 = 31339;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings to use when talking to a TiVo box. Can be created with [`ConnectionSettingsBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub port: u16,
    /// Retune to a channel's HD version whenever the box reports the SD version.
    pub force_hd: bool,
    /// How often the manager polls the box for its status.
    pub poll_interval: Duration,
    /// Timeout applied to every connect, read, and write on the box connection.
    pub io_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettingsBuilder::new().build()
    }
}

/// Build a [`ConnectionSettings`] instance.
///
/// Examples:
/// ```
/// use std::time::Duration;
///
/// use virgin_tivo::ConnectionSettingsBuilder;
///
/// // Default connection settings
/// ConnectionSettingsBuilder::default();
///
/// // Connection settings with overrides
/// ConnectionSettingsBuilder::new()
///     .with_force_hd()
///     .with_poll_interval(Duration::from_secs(5))
///     .build();
/// ```
pub struct ConnectionSettingsBuilder {
    port: u16,
    force_hd: bool,
    poll_interval: Duration,
    io_timeout: Duration,
}

impl Default for ConnectionSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSettingsBuilder {
    pub fn new() -> Self {
        Self {
            port: TIVO_PORT,
            force_hd: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_force_hd(mut self) -> Self {
        self.force_hd = true;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn build(&mut self) -> ConnectionSettings {
        ConnectionSettings {
            port: self.port,
            force_hd: self.force_hd,
            poll_interval: self.poll_interval,
            io_timeout: self.io_timeout,
        }
    }
}

// ================================================================================================
// Tests
