use chrono::{Local, Utc};
use log::{debug, info, warn};

use super::TivoManager;
use crate::connection::{ConnectOutcome, ConnectionError};
use crate::helpers::{media_image_url, media_position, series_title};
use crate::state_machine::{Input, Output};
use crate::status::{parse_status, BoxStatus};
use crate::{ManagerError, ManagerOutputMessage, TivoCommand, TivoState};

const MEDIA_CONTENT_TYPE_TV_SHOW: &str = "tvshow";

// ------------------------------------------------------------------------------------------------
// Orchestration between the Manager, the box connection, the state machine, and the guide.
//
// These functions are invoked as a result of:
//
//  * A received `ManagerMessage` from the caller.
//  * The poll interval elapsing.
// ------------------------------------------------------------------------------------------------

impl TivoManager {
    /// Fetch the guide channels. A failure leaves the manager running without guide details.
    pub(crate) async fn load_guide_channels(&mut self) {
        let Some(guide) = self.guide.clone().filter(|guide| guide.is_enabled()) else {
            return;
        };

        if let Err(e) = guide.ensure_channels_loaded().await {
            warn!(
                "{}: could not load guide channels, continuing without guide: {}",
                self.info.name, e
            );

            let _ = self
                .send_out(ManagerOutputMessage::Error(ManagerError::Guide(
                    e.to_string(),
                )))
                .await;
        }
    }

    /// Poll the box for its current status, and update the channel and program details to match.
    ///
    /// Only status messages which haven't been seen before can trigger channel changes (HD
    /// forcing and external input switching), so a change is never requested twice for the same
    /// status message.
    pub(crate) async fn poll(&mut self) {
        match self.connection.connect().await {
            Ok(ConnectOutcome::Alive) => debug!("{}: no new status from box", self.info.name),
            Ok(ConnectOutcome::NewData) => debug!("{}: received status from box", self.info.name),
            Err(e) => {
                if e.is_transient() {
                    debug!("{}: {} on connection, will retry", self.info.name, e);
                } else {
                    warn!("{}: {}, will retry", self.info.name, e);
                }

                self.consume_fsm_input(Input::ConnectionLost).await;
                return;
            }
        }

        self.consume_fsm_input(Input::StatusConfirmed).await;

        let (message, seq) = self.connection.last_message().await;
        let is_new_message = seq != self.last_processed_seq;
        self.last_processed_seq = seq;

        if is_new_message {
            match parse_status(&message) {
                BoxStatus::Channel(channel_id) => self.handle_channel_status(channel_id).await,
                status @ BoxStatus::Failed(_) => self.handle_failure_status(status).await,
                BoxStatus::NoMatch => debug!("{}: not on live TV", self.info.name),
            }
        }

        self.refresh_listings().await;
        self.update_tivo_state().await;
    }

    /// Act on the box reporting that it's tuned to `channel_id`.
    async fn handle_channel_status(&mut self, channel_id: u16) {
        let mut channel_id = channel_id;

        if self.selected_channel.is_some_and(|selected| selected != channel_id) {
            debug!("{}: changing to channel [{}]", self.info.name, channel_id);
        }

        if let Some(automation) = self.directory.automation(channel_id).cloned() {
            debug!(
                "{}: switcher source triggered {},{},{}",
                self.info.name, channel_id, automation.source, automation.target
            );

            let _ = self
                .send_out(ManagerOutputMessage::SwitchInput {
                    target: automation.target,
                    source: automation.source,
                })
                .await;

            // Keep showing the channel from before the switch
            if let Some(selected) = self.selected_channel {
                debug!("{}: reset channel back to [{}]", self.info.name, selected);

                channel_id = self.directory.hd_preferred(selected);
                self.tune_or_report(channel_id).await;
            }
        }

        if self.settings.force_hd {
            if let Some(hd_channel) = self.directory.hd_channel(channel_id) {
                debug!("{}: forcing HD channel [{}]", self.info.name, hd_channel);

                channel_id = hd_channel;
                self.tune_or_report(channel_id).await;
            }
        }

        self.set_selected_channel(Some(channel_id));

        self.guide_channel = match &self.guide {
            Some(guide) => guide.lookup(channel_id).await,
            None => None,
        };

        match &self.guide_channel {
            Some(_) => debug!("{}: guide found for channel {}", self.info.name, channel_id),
            None => debug!("{}: no guide found for channel {}", self.info.name, channel_id),
        }
    }

    /// Act on the box reporting a failure. Anything other than "not on live TV" drops the
    /// connection, which is re-established on the next poll.
    async fn handle_failure_status(&mut self, status: BoxStatus) {
        warn!("{}: failure message is [{}]", self.info.name, status);

        if status.requires_disconnect() {
            self.connection.disconnect();

            let _ = self
                .send_out(ManagerOutputMessage::Error(ManagerError::Protocol(format!(
                    "Box reported {}",
                    status
                ))))
                .await;
        }
    }

    /// Make sure the guide has listings for the channel showing.
    async fn refresh_listings(&mut self) {
        let (Some(guide), Some(guide_channel)) = (&self.guide, &self.guide_channel) else {
            return;
        };

        if let Err(e) = guide
            .ensure_listings_loaded(guide_channel.channel_number)
            .await
        {
            warn!("{}: error getting listings: {}", self.info.name, e);
        }
    }

    /// Rebuild the outbound state from the current channel and guide details.
    pub(crate) async fn update_tivo_state(&mut self) {
        let now = Utc::now();

        let program = match (&self.guide, &self.guide_channel) {
            (Some(guide), Some(guide_channel)) => {
                guide
                    .current_program(guide_channel.channel_number, now)
                    .await
            }
            _ => None,
        };

        let media_image_url = self.selected_channel.and_then(|channel_id| {
            media_image_url(
                self.guide_channel.as_ref(),
                self.directory.logo_url(channel_id),
                now,
            )
        });

        let tivo_state = TivoState {
            source: self.selected_name.clone(),
            channel_id: self.selected_channel,
            guide_channel_title: self
                .guide_channel
                .as_ref()
                .map(|guide_channel| guide_channel.title.clone()),
            media_title: self.selected_name.clone(),
            media_series_title: program
                .as_ref()
                .map(|program| series_title(program, &Local)),
            media_content_type: program
                .as_ref()
                .map(|_| MEDIA_CONTENT_TYPE_TV_SHOW.to_string()),
            media_image_url,
            media_position: program
                .as_ref()
                .map(|program| media_position(program, now)),
            media_duration: program
                .as_ref()
                .map(|program| program.duration().num_seconds()),
        };

        self.set_tivo_state(tivo_state).await;
    }

    /// Tune to a channel, with the box's preference for the channel's HD version.
    ///
    /// Unknown channel names are ignored. The selected channel isn't updated here; the box
    /// reports the new channel on the next poll.
    pub(crate) async fn select_source(&mut self, name: &str) {
        let Some(channel_id) = self.directory.id_for_name(name) else {
            debug!("{}: ignoring unknown channel [{}]", self.info.name, name);
            return;
        };

        let tune_channel = self.directory.hd_preferred(channel_id);
        if tune_channel != channel_id {
            debug!(
                "{}: automatically switching to HD channel",
                self.info.name
            );
        }

        self.tune_or_report(tune_channel).await;
    }

    /// Send a channel change to the box, reporting any failure to the caller.
    async fn tune_or_report(&mut self, channel_id: u16) {
        info!("{}: setting channel to [{}]", self.info.name, channel_id);

        if let Err(e) = self.send_to_box(TivoCommand::SetChannel(channel_id)).await {
            let _ = self
                .send_out(ManagerOutputMessage::Error(ManagerError::Connection(
                    format!("Could not change channel to {}: {}", channel_id, e),
                )))
                .await;
        }
    }

    /// Send a command to the box, reporting any failure to the caller.
    pub(crate) async fn send_command(&mut self, command: TivoCommand) {
        if let Err(e) = self.send_to_box(command.clone()).await {
            let _ = self
                .send_out(ManagerOutputMessage::Error(ManagerError::Connection(
                    format!("Could not send {}: {}", command, e),
                )))
                .await;
        }
    }

    /// Connect to the box (if not already connected) and send it a command.
    async fn send_to_box(&mut self, command: TivoCommand) -> Result<(), ConnectionError> {
        let payload: String = command.into();

        let result = match self.connection.connect().await {
            Ok(_) => self.connection.send(&payload).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if e.is_transient() {
                warn!("{}: connection timed out", self.info.name);
            } else {
                warn!(
                    "{}: could not send [{}]: {}",
                    self.info.name,
                    payload.trim_end(),
                    e
                );
            }
        }

        result
    }

    /// Pass an input to the state machine, sending any resulting command to the box.
    pub(crate) async fn consume_fsm_input(&mut self, input: Input) {
        let entry_state = *self.fsm.state();

        match self.fsm.consume(&input) {
            Ok(fsm_output) => {
                let exit_state = *self.fsm.state();

                if entry_state != exit_state || fsm_output.is_some() {
                    debug!(
                        "{}: FSM acting on input [{:?}]: {:?} -> {:?}, with output [{:?}]",
                        self.info.name, &input, entry_state, exit_state, &fsm_output
                    );
                }

                self.set_power_state(exit_state).await;

                if let Some(Output::SendCommand(command)) = fsm_output {
                    self.send_command(command).await;
                }
            }
            Err(_) => {
                let msg = format!("Cannot act on {:?} while box is {}", &input, entry_state);
                warn!("{}: {}", self.info.name, &msg);

                let _ = self
                    .send_out(ManagerOutputMessage::Error(ManagerError::Action(msg)))
                    .await;
            }
        }
    }
}
