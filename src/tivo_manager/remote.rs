use std::time::Duration;

use log::{debug, info, warn};
use tokio::select;
use tokio::time::sleep;

use super::TivoManager;
use crate::channels::ChannelDirectory;
use crate::commands::search_keystrokes;
use crate::connection::{ConnectionError, TivoConnection};
use crate::{ManagerError, ManagerOutputMessage, TivoCommand};

/// Time for the search screen to open before typing into it.
const SEARCH_SCREEN_DELAY: Duration = Duration::from_millis(500);
/// Time for search results to appear before selecting the first one.
const SEARCH_RESULTS_DELAY: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// Remote control conveniences built on top of channel selection and raw commands.
// ------------------------------------------------------------------------------------------------

impl TivoManager {
    /// Go from the current channel to its +1 channel.
    pub(crate) async fn previous_channel(&mut self) {
        let target = self
            .selected_channel
            .and_then(|current| plus_one_target(&self.directory, current));

        self.select_channel_id(target).await;
    }

    /// Go from the current +1 channel back to its base channel.
    pub(crate) async fn next_channel(&mut self) {
        let target = self
            .selected_channel
            .and_then(|current| base_channel_target(&self.directory, current));

        self.select_channel_id(target).await;
    }

    /// Go back to the channel showing before the current one.
    pub(crate) async fn last_channel(&mut self) {
        match self.last_channel_name.clone() {
            Some(last_channel_name) => self.select_source(&last_channel_name).await,
            None => debug!("{}: no last channel to return to", self.info.name),
        }
    }

    async fn select_channel_id(&mut self, channel_id: Option<u16>) {
        let Some(name) = channel_id
            .and_then(|channel_id| self.directory.name_for_id(channel_id))
            .map(|name| name.to_string())
        else {
            debug!("{}: no channel to move to", self.info.name);
            return;
        };

        self.select_source(&name).await;
    }

    /// Search for `text` using the box's search screen.
    ///
    /// The key presses are spread out over a couple of seconds, so the search runs on its own
    /// task.
    pub(crate) fn search(&self, text: String) {
        let connection = self.connection.clone();
        let output_tx = self.output_tx.clone();
        let cancel_token = self.cancel_token.clone();
        let name = self.info.name.clone();

        self.task_tracker.spawn(async move {
            select! {
                result = type_search(&connection, &text) => {
                    match result {
                        Ok(()) => info!("{}: searched for [{}]", name, text),
                        Err(e) => {
                            warn!("{}: search for [{}] failed: {}", name, text, e);

                            let _ = TivoManager::send_out_with_sender(
                                &output_tx,
                                ManagerOutputMessage::Error(ManagerError::Connection(format!(
                                    "Search failed: {e}"
                                ))),
                            )
                            .await;
                        }
                    }
                }

                _ = cancel_token.cancelled() => {
                    debug!("{}: search cancelled", name);
                }
            }
        });
    }
}

/// Open the search screen, type `text`, and select the first result.
async fn type_search(connection: &TivoConnection, text: &str) -> Result<(), ConnectionError> {
    connection.connect().await?;

    connection
        .send(&String::from(TivoCommand::Teleport("SEARCH".into())))
        .await?;
    sleep(SEARCH_SCREEN_DELAY).await;

    connection.send(&search_keystrokes(text)).await?;
    sleep(SEARCH_RESULTS_DELAY).await;

    connection
        .send(&String::from(TivoCommand::Keyboard("SELECT".into())))
        .await
}

/// The +1 channel to move to from `current`, which may be a base channel or its HD version.
fn plus_one_target(directory: &ChannelDirectory, current: u16) -> Option<u16> {
    directory.plus_one_channel(current).or_else(|| {
        directory
            .hd_base(current)
            .and_then(|base| directory.plus_one_channel(base))
    })
}

/// The base channel to move to from `current`, which may be a +1 channel or its HD version.
fn base_channel_target(directory: &ChannelDirectory, current: u16) -> Option<u16> {
    let channel = directory.hd_base(current).unwrap_or(current);

    directory
        .is_plus_one_channel(channel)
        .then(|| directory.sd_channel(channel))
}

// ================================================================================================
// Tests
