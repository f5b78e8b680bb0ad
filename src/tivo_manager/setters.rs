use log::debug;

use crate::{PowerState, TivoState};

use super::TivoManager;

// ------------------------------------------------------------------------------------------------
// Various TivoManager state setters.
// ------------------------------------------------------------------------------------------------

impl TivoManager {
    /// Update the power state and announce the change to the caller.
    pub(crate) async fn set_power_state(&mut self, power_state: PowerState) {
        if power_state == self.power_state {
            return;
        }

        debug!(
            "{}: power state {} -> {}",
            self.info.name, self.power_state, power_state
        );

        self.power_state = power_state;
        self.emit_power_state().await;
    }

    /// Update the channel/program state and announce the change to the caller.
    pub(crate) async fn set_tivo_state(&mut self, tivo_state: TivoState) {
        if tivo_state == self.tivo_state {
            return;
        }

        self.tivo_state = tivo_state;
        self.emit_tivo_state().await;
    }

    /// Record the channel now showing, remembering the one showing before it.
    pub(crate) fn set_selected_channel(&mut self, channel_id: Option<u16>) {
        let name = channel_id
            .and_then(|channel_id| self.directory.name_for_id(channel_id))
            .map(|name| name.to_string());

        if name.is_some() && name != self.selected_name && self.selected_name.is_some() {
            self.last_channel_name = self.selected_name.clone();
        }

        self.selected_name = name;
        self.selected_channel = match self.selected_name {
            Some(_) => channel_id,
            None => None,
        };
    }
}
