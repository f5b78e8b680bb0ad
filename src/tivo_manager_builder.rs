use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc::Receiver;

use crate::channels::ChannelDirectory;
use crate::config::TivoDevice;
use crate::guide::GuideCache;
use crate::{ConnectionSettings, ManagerMessage, ManagerOutputMessage, TivoManager};

/// Build a [`TivoManager`] instance.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use tokio::sync::mpsc;
/// use virgin_tivo::{
///     ChannelDirectory, ChannelEntry, ConnectionSettings, ConnectionSettingsBuilder, TivoDevice,
///     TivoManagerBuilder,
/// };
///
/// let channels = ChannelDirectory::new(vec![ChannelEntry::new(101, "BBC One")]).unwrap();
/// let device = TivoDevice {
///     tivo_id: 1,
///     host: "192.168.1.50".into(),
///     name: "Living Room".into(),
///     settings: ConnectionSettings::default(),
/// };
///
/// let (to_manager_tx, to_manager_rx) = mpsc::channel(32);
///
/// let (mut manager, mut from_manager_rx) =
///     TivoManagerBuilder::new(&device, Arc::new(channels), to_manager_rx)
///         .with_settings(
///             ConnectionSettingsBuilder::new()
///                 .with_poll_interval(Duration::from_secs(5))
///                 .build(),
///         )
///         .build();
/// ```
pub struct TivoManagerBuilder {
    device: TivoDevice,
    directory: Arc<ChannelDirectory>,
    guide: Option<Arc<GuideCache>>,
    command_receiver: Receiver<ManagerMessage>,
}

impl TivoManagerBuilder {
    pub fn new(
        device: &TivoDevice,
        directory: Arc<ChannelDirectory>,
        command_receiver: Receiver<ManagerMessage>,
    ) -> Self {
        debug!("Builder is preparing a TivoManager for {}", device.name);

        TivoManagerBuilder {
            device: device.clone(),
            directory,
            guide: None,
            command_receiver,
        }
    }

    /// Use the given (usually shared) guide cache for channel and program details.
    pub fn with_guide(mut self, guide: Arc<GuideCache>) -> Self {
        debug!("Builder is adding a program guide");

        self.guide = Some(guide);
        self
    }

    /// Override the connection settings configured for the box.
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        debug!("Builder is overriding connection settings: {:?}", settings);

        self.device.settings = settings;
        self
    }

    pub fn build(self) -> (TivoManager, Receiver<ManagerOutputMessage>) {
        let (mut manager, out_channel) =
            TivoManager::new(&self.device, self.directory, self.command_receiver);
        manager.guide = self.guide;

        (manager, out_channel)
    }
}
