use crate::ManagerOutputMessage;

use super::TivoManager;

// ------------------------------------------------------------------------------------------------
// Emit various ManagerOutputMessages to the caller.
// ------------------------------------------------------------------------------------------------

impl TivoManager {
    /// Emit all current manager and box details to the caller.
    pub(crate) async fn emit_all_state(&mut self) {
        self.emit_tivo_info().await;
        self.emit_power_state().await;
        self.emit_source_list().await;
        self.emit_tivo_state().await;
    }

    /// Send the static `TivoInfo` to the caller.
    pub(crate) async fn emit_tivo_info(&mut self) {
        let _ = self
            .send_out(ManagerOutputMessage::TivoInfo(self.info.clone()))
            .await;
    }

    /// Send the current `PowerState` to the caller.
    pub(crate) async fn emit_power_state(&mut self) {
        let _ = self
            .send_out(ManagerOutputMessage::PowerState(self.power_state))
            .await;
    }

    /// Send the list of selectable channel names to the caller.
    pub(crate) async fn emit_source_list(&mut self) {
        let _ = self
            .send_out(ManagerOutputMessage::SourceList(
                self.directory.source_list().to_vec(),
            ))
            .await;
    }

    /// Send the current `TivoState` to the caller.
    pub(crate) async fn emit_tivo_state(&mut self) {
        let _ = self
            .send_out(ManagerOutputMessage::TivoState(self.tivo_state.clone()))
            .await;
    }
}
