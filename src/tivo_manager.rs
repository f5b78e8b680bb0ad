mod message_senders;
mod orchestration;
mod out_emitters;
mod remote;
mod setters;

use std::sync::Arc;

use log::{debug, info};
use rust_fsm::StateMachine;
use tokio::select;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use crate::commands::TivoCommand;
pub use crate::connection_settings::ConnectionSettings;
pub use crate::state::{TivoInfo, TivoState};
pub use crate::state_machine::State as PowerState;

use crate::channels::ChannelDirectory;
use crate::config::TivoDevice;
use crate::connection::TivoConnection;
use crate::guide::{GuideCache, GuideChannel};
use crate::state_machine::{Input, TivoStateMachine};

#[cfg(doc)]
use crate::TivoManagerBuilder;

// CHANNEL MESSAGES -------------------------------------------------------------------------------

/// Messages sent from the caller to the [`TivoManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerMessage {
    /// Request sending of all currently-known manager and box state as instances of
    /// `ManagerOutputMessage`.
    EmitAllState,
    /// Go back to the channel showing before the current one.
    LastChannel,
    /// Go from a +1 channel back to its base channel.
    NextChannel,
    Pause,
    Play,
    /// Poll the box now rather than waiting for the next poll interval.
    Poll,
    /// Go from a channel to its +1 channel.
    PreviousChannel,
    /// Open the search screen and type the given text.
    Search(String),
    /// Tune to the channel with the given name. Unknown names are ignored.
    SelectSource(String),
    /// Send the given [`TivoCommand`] to the box.
    SendCommand(TivoCommand),
    /// Shut down the [`TivoManager`]. Disconnects from the box and stops the manager task.
    ShutDown,
    Stop,
    TurnOff,
    TurnOn,
}

/// Messages sent from the [`TivoManager`] back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerOutputMessage {
    /// A [`TivoManager`] error occurred.
    Error(ManagerError),
    /// Power/playback state of the box.
    PowerState(PowerState),
    /// Names of the channels which can be selected, ordered by channel number.
    SourceList(Vec<String>),
    /// The box has tuned to a channel which needs an external device (such as an AV switcher)
    /// to be switched to the given source.
    SwitchInput { target: String, source: String },
    /// Static details of the managed box.
    TivoInfo(TivoInfo),
    /// Current channel and program details.
    TivoState(TivoState),
}

// ================================================================================================
// Additional structs

/// Errors sent from the [`TivoManager`] back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManagerError {
    /// An attempt to act on a received [`ManagerMessage`] was not possible. For example, asking a
    /// box which is off to pause.
    Action(String),
    /// An error occurred with the connection to the box.
    Connection(String),
    /// The program guide could not be retrieved.
    Guide(String),
    /// The box reported a failure.
    Protocol(String),
}

// ================================================================================================
// TivoManager
//
// Design notes:
//
//  - The manager expects to be run once by the caller, and to run until shut down.
//  - All input from the caller is received over a receiver channel.
//  - All output to the caller is sent over a sender channel.
//  - The box is polled on an interval. Each poll reads whatever the box has sent since the last
//    poll (reconnecting if needed) and derives the current channel from it.
//  - The box only reports the channel it's tuned to. Everything else (channel name, HD and +1
//    versions, program details, artwork) is looked up from the channel directory and the guide.
//  - Commands to the box are fire-and-forget. The result of a channel change is seen on the
//    next poll, not when the command is sent.
//  - Power and playback state is governed by a state machine. Polls confirm (or deny) that the
//    box is on; play/pause/stop/standby requests move between states and emit the IR command to
//    send.
//  - Long-running command sequences (search) run on their own tasks, sharing the connection.
// ================================================================================================

/// Manage a single TiVo box.
///
/// The interface to `TivoManager` (after instantiation with [`TivoManager::new()`] or
/// [`TivoManagerBuilder`], and running with [`TivoManager::run()`]) is mostly contained to the
/// sending and receiving of [`ManagerMessage`] and [`ManagerOutputMessage`].
pub struct TivoManager {
    info: TivoInfo,
    settings: ConnectionSettings,
    directory: Arc<ChannelDirectory>,
    pub(crate) guide: Option<Arc<GuideCache>>,
    connection: TivoConnection,
    fsm: StateMachine<TivoStateMachine>,

    // Box state
    power_state: PowerState,
    tivo_state: TivoState,
    selected_channel: Option<u16>,
    selected_name: Option<String>,
    guide_channel: Option<GuideChannel>,
    last_channel_name: Option<String>, // Channel showing before the current one
    last_processed_seq: u64,           // Sequence number of the last box message acted on

    // Manager in/out channels
    command_rx: Receiver<ManagerMessage>, // Receives ManagerMessage from the caller
    output_tx: Sender<ManagerOutputMessage>, // Sends ManagerOutputMessage back to the caller

    // Spawned command tasks
    task_tracker: TaskTracker,
    cancel_token: CancellationToken,
}

/// Usage example:
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tokio::sync::mpsc;
/// use virgin_tivo::{ChannelDirectory, ChannelEntry, ConnectionSettings, TivoDevice, TivoManager};
///
/// #[tokio::main]
/// async fn main() {
///     let channels = ChannelDirectory::new(vec![ChannelEntry::new(101, "BBC One")]).unwrap();
///     let device = TivoDevice {
///         tivo_id: 1,
///         host: "192.168.1.50".into(),
///         name: "Living Room".into(),
///         settings: ConnectionSettings::default(),
///     };
///
///     let (to_manager, to_manager_rx) = mpsc::channel(32);
///     let (mut manager, mut from_manager) =
///         TivoManager::new(&device, Arc::new(channels), to_manager_rx);
///
///     // Start a task to receive `ManagerOutputMessage` messages on `from_manager`
///     // Start a task to send `ManagerMessage` messages on `to_manager`
///
///     manager.run().await;
/// }
/// ```
impl TivoManager {
    /// Creates a `TivoManager` instance for the given box.
    ///
    /// Expects to be given a tokio mpsc `Receiver` of [`ManagerMessage`]s from the caller. Returns
    /// a tuple of itself and a `Receiver` of [`ManagerOutputMessage`]s back to the caller.
    ///
    /// Use [`TivoManagerBuilder`] to add a program guide or override the connection settings.
    pub fn new(
        device: &TivoDevice,
        directory: Arc<ChannelDirectory>,
        command_rx: Receiver<ManagerMessage>,
    ) -> (TivoManager, Receiver<ManagerOutputMessage>) {
        let (output_tx, manager_channel_rx) = channel(32);

        let connection = TivoConnection::new(
            &device.name,
            &device.host,
            device.settings.port,
            device.settings.io_timeout,
        );

        let manager = TivoManager {
            info: TivoInfo {
                tivo_id: device.tivo_id,
                name: device.name.clone(),
                host: device.host.clone(),
                unique_id: device.unique_id(),
            },
            settings: device.settings.clone(),
            directory,
            guide: None,
            connection,
            fsm: StateMachine::new(),
            power_state: PowerState::Off,
            tivo_state: TivoState::default(),
            selected_channel: None,
            selected_name: None,
            guide_channel: None,
            last_channel_name: None,
            last_processed_seq: 0,
            command_rx,
            output_tx,
            task_tracker: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
        };

        (manager, manager_channel_rx)
    }

    pub fn info(&self) -> &TivoInfo {
        &self.info
    }

    /// Run the manager.
    ///
    /// 1. Loads the guide channels (if a guide is available).
    /// 2. Announces the box details, source list, and current state.
    /// 3. Loops until shut down (or the caller's channel closes), doing the following:
    ///     * Accepting (and acting on) `ManagerMessage` messages from the caller.
    ///     * Polling the box for its current channel on every poll interval.
    pub async fn run(&mut self) {
        info!("{}: manager starting up", self.info.name);

        self.load_guide_channels().await;
        self.emit_all_state().await;

        // The first tick completes immediately, so the box is polled straight away
        let mut poll_interval = interval(self.settings.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                // FROM THE CALLER ----------------------------------------------------------------

                manager_msg = self.command_rx.recv() => {
                    let Some(manager_msg) = manager_msg else {
                        info!("{}: command channel closed", self.info.name);
                        break;
                    };

                    debug!("{}: received {:?}", self.info.name, &manager_msg);

                    match manager_msg {
                        ManagerMessage::EmitAllState => self.emit_all_state().await,
                        ManagerMessage::LastChannel => self.last_channel().await,
                        ManagerMessage::NextChannel => self.next_channel().await,
                        ManagerMessage::Pause => self.consume_fsm_input(Input::Pause).await,
                        ManagerMessage::Play => self.consume_fsm_input(Input::Play).await,
                        ManagerMessage::Poll => self.poll().await,
                        ManagerMessage::PreviousChannel => self.previous_channel().await,
                        ManagerMessage::Search(text) => self.search(text),
                        ManagerMessage::SelectSource(name) => self.select_source(&name).await,
                        ManagerMessage::SendCommand(command) => self.send_command(command).await,
                        ManagerMessage::ShutDown => {
                            info!("{}: manager shutting down", self.info.name);
                            break;
                        }
                        ManagerMessage::Stop => self.consume_fsm_input(Input::Stop).await,
                        ManagerMessage::TurnOff => self.consume_fsm_input(Input::TurnOff).await,
                        ManagerMessage::TurnOn => self.consume_fsm_input(Input::TurnOn).await,
                    }
                }

                // POLL THE BOX -------------------------------------------------------------------

                _ = poll_interval.tick() => {
                    self.poll().await;
                }
            }
        }

        self.cancel_token.cancel();
        self.task_tracker.close();

        info!("{}: waiting for tasks to shut down", self.info.name);
        self.task_tracker.wait().await;

        self.connection.disconnect();

        info!("{}: manager shut down successfully", self.info.name);
    }
}

// ================================================================================================
// Tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc::{self, Receiver, Sender};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::{
        ManagerError, ManagerMessage, ManagerOutputMessage, PowerState, TivoManager, TivoState,
    };
    use crate::channels::tests::test_directory;
    use crate::guide::tests::test_guide_cache;
    use crate::guide::GuideCache;
    use crate::{ConnectionSettingsBuilder, TivoDevice, TivoManagerBuilder};

    const WAIT: Duration = Duration::from_secs(5);

    fn test_device(port: u16, force_hd: bool) -> TivoDevice {
        let mut settings_builder = ConnectionSettingsBuilder::new()
            .with_port(port)
            .with_poll_interval(Duration::from_secs(3600))
            .with_io_timeout(Duration::from_millis(200));

        if force_hd {
            settings_builder = settings_builder.with_force_hd();
        }

        TivoDevice {
            tivo_id: 1,
            host: "127.0.0.1".into(),
            name: "Test TiVo".into(),
            settings: settings_builder.build(),
        }
    }

    fn start_manager(
        device: &TivoDevice,
    ) -> (
        Sender<ManagerMessage>,
        Receiver<ManagerOutputMessage>,
        JoinHandle<()>,
    ) {
        let (guide, _) = test_guide_cache();

        start_manager_with_guide(device, guide)
    }

    fn start_manager_with_guide(
        device: &TivoDevice,
        guide: Arc<GuideCache>,
    ) -> (
        Sender<ManagerMessage>,
        Receiver<ManagerOutputMessage>,
        JoinHandle<()>,
    ) {
        let _ = env_logger::builder().is_test(true).try_init();

        let (to_manager, to_manager_rx) = mpsc::channel(32);
        let (mut manager, from_manager) =
            TivoManagerBuilder::new(device, Arc::new(test_directory()), to_manager_rx)
                .with_guide(guide)
                .build();

        let handle = tokio::spawn(async move { manager.run().await });

        (to_manager, from_manager, handle)
    }

    async fn fake_box() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        (listener, port)
    }

    async fn read_command(socket: &mut TcpStream) -> String {
        let mut buffer = [0u8; 256];
        let bytes_read = socket.read(&mut buffer).await.unwrap();

        String::from_utf8_lossy(&buffer[..bytes_read]).into_owned()
    }

    /// Wait for the first output message matching `predicate`.
    async fn wait_for<F>(rx: &mut Receiver<ManagerOutputMessage>, predicate: F) -> ManagerOutputMessage
    where
        F: Fn(&ManagerOutputMessage) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let message = rx.recv().await.unwrap();
                if predicate(&message) {
                    return message;
                }
            }
        })
        .await
        .unwrap()
    }

    async fn wait_for_state<F>(rx: &mut Receiver<ManagerOutputMessage>, predicate: F) -> TivoState
    where
        F: Fn(&TivoState) -> bool,
    {
        match wait_for(rx, |message| {
            matches!(message, ManagerOutputMessage::TivoState(state) if predicate(state))
        })
        .await
        {
            ManagerOutputMessage::TivoState(state) => state,
            _ => unreachable!(),
        }
    }

    async fn shut_down(to_manager: Sender<ManagerMessage>, handle: JoinHandle<()>) {
        to_manager.send(ManagerMessage::ShutDown).await.unwrap();
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn emits_source_list_on_startup() {
        let (_listener, port) = fake_box().await;
        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        let source_list = wait_for(&mut from_manager, |message| {
            matches!(message, ManagerOutputMessage::SourceList(_))
        })
        .await;

        assert_eq!(
            source_list,
            ManagerOutputMessage::SourceList(vec![
                "BBC One".into(),
                "Channel 4".into(),
                "Channel 4 +1".into(),
                "Liverpool TV".into(),
                "Games Console".into(),
            ])
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn force_hd_retunes_to_hd_channel() {
        let (listener, port) = fake_box().await;
        let (command_tx, command_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0101 LOCAL\r\n").await.unwrap();

            let _ = command_tx.send(read_command(&mut socket).await);
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, true));

        let state = wait_for_state(&mut from_manager, |state| state.channel_id.is_some()).await;

        assert_eq!(
            timeout(WAIT, command_rx).await.unwrap().unwrap(),
            "SETCH 108\r"
        );
        assert_eq!(state.channel_id, Some(108));
        assert_eq!(state.source.as_deref(), Some("BBC One HD"));
        assert_eq!(state.guide_channel_title.as_deref(), Some("BBC One HD"));
        assert_eq!(
            state.media_image_url.as_deref().map(|url| url.split('?').next()),
            Some(Some("https://img.example/bbc_one.jpg"))
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn select_source_sends_channel_change() {
        let (listener, port) = fake_box().await;
        let (command_tx, command_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0105 LOCAL\r\n").await.unwrap();

            let _ = command_tx.send(read_command(&mut socket).await);
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        let state = wait_for_state(&mut from_manager, |state| state.channel_id.is_some()).await;
        assert_eq!(state.source.as_deref(), Some("Channel 4"));

        // Unknown channels are ignored
        to_manager
            .send(ManagerMessage::SelectSource("Unknown".into()))
            .await
            .unwrap();
        to_manager
            .send(ManagerMessage::SelectSource("Liverpool TV".into()))
            .await
            .unwrap();

        assert_eq!(
            timeout(WAIT, command_rx).await.unwrap().unwrap(),
            "SETCH 159\r"
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn automation_switches_input_and_restores_channel() {
        let (listener, port) = fake_box().await;
        let (console_tx, console_rx) = oneshot::channel::<()>();
        let (command_tx, command_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0159 LOCAL\r\n").await.unwrap();

            let _ = console_rx.await;
            socket.write_all(b"CH_STATUS 0400 LOCAL\r\n").await.unwrap();

            let _ = command_tx.send(read_command(&mut socket).await);
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        wait_for_state(&mut from_manager, |state| state.channel_id == Some(159)).await;

        console_tx.send(()).unwrap();
        to_manager.send(ManagerMessage::Poll).await.unwrap();

        assert_eq!(
            wait_for(&mut from_manager, |message| {
                matches!(message, ManagerOutputMessage::SwitchInput { .. })
            })
            .await,
            ManagerOutputMessage::SwitchInput {
                target: "media_player.switcher".into(),
                source: "HDMI 2".into(),
            }
        );

        assert_eq!(
            timeout(WAIT, command_rx).await.unwrap().unwrap(),
            "SETCH 159\r"
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn transport_controls() {
        let (listener, port) = fake_box().await;
        let (command_tx, command_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0159 LOCAL\r\n").await.unwrap();

            let _ = command_tx.send(read_command(&mut socket).await);
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        wait_for(&mut from_manager, |message| {
            message == &ManagerOutputMessage::PowerState(PowerState::Playing)
        })
        .await;

        to_manager.send(ManagerMessage::Pause).await.unwrap();

        wait_for(&mut from_manager, |message| {
            message == &ManagerOutputMessage::PowerState(PowerState::Paused)
        })
        .await;
        assert_eq!(
            timeout(WAIT, command_rx).await.unwrap().unwrap(),
            "IRCODE PAUSE\r"
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn failure_status_drops_connection() {
        let (listener, port) = fake_box().await;

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_FAILED SIGNAL_LOST\r\n").await.unwrap();
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        assert_eq!(
            wait_for(&mut from_manager, |message| {
                matches!(message, ManagerOutputMessage::Error(ManagerError::Protocol(_)))
            })
            .await,
            ManagerOutputMessage::Error(ManagerError::Protocol(
                "Box reported Failed(SIGNAL_LOST)".into()
            ))
        );

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn no_live_status_keeps_connection() {
        let (listener, port) = fake_box().await;
        let (live_tx, live_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_FAILED NO_LIVE\r\n").await.unwrap();

            // Only reachable over the original connection
            let _ = live_rx.await;
            socket.write_all(b"CH_STATUS 0159 LOCAL\r\n").await.unwrap();
            tokio::time::sleep(WAIT).await;
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        wait_for(&mut from_manager, |message| {
            message == &ManagerOutputMessage::PowerState(PowerState::Playing)
        })
        .await;

        live_tx.send(()).unwrap();
        to_manager.send(ManagerMessage::Poll).await.unwrap();

        let message = wait_for(&mut from_manager, |message| match message {
            ManagerOutputMessage::Error(_) => true,
            ManagerOutputMessage::TivoState(state) => state.channel_id.is_some(),
            _ => false,
        })
        .await;

        match message {
            ManagerOutputMessage::TivoState(state) => {
                assert_eq!(state.channel_id, Some(159));
                assert_eq!(state.source.as_deref(), Some("Liverpool TV"));
            }
            other => panic!("unexpected {other:?}"),
        }

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn guide_failure_leaves_manager_running_without_guide() {
        let (listener, port) = fake_box().await;

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0101 LOCAL\r\n").await.unwrap();
            tokio::time::sleep(WAIT).await;
        });

        let (guide, fetcher) = test_guide_cache();
        fetcher.fail.store(true, Ordering::SeqCst);

        let (to_manager, mut from_manager, handle) =
            start_manager_with_guide(&test_device(port, false), guide);

        assert!(matches!(
            wait_for(&mut from_manager, |message| {
                matches!(message, ManagerOutputMessage::Error(_))
            })
            .await,
            ManagerOutputMessage::Error(ManagerError::Guide(_))
        ));

        let state = wait_for_state(&mut from_manager, |state| state.channel_id.is_some()).await;

        assert_eq!(state.channel_id, Some(101));
        assert_eq!(state.source.as_deref(), Some("BBC One"));
        assert_eq!(state.guide_channel_title, None);
        assert_eq!(state.media_series_title, None);
        // Falls back to the configured logo
        assert_eq!(
            state.media_image_url.as_deref(),
            Some("http://logos.example/bbc_one.png")
        );
        assert_eq!(fetcher.listing_fetches.load(Ordering::SeqCst), 0);

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn lost_connection_keeps_last_channel() {
        let (listener, port) = fake_box().await;
        let (unplug_tx, unplug_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0101 LOCAL\r\n").await.unwrap();

            let _ = unplug_rx.await;
            drop(socket);
            drop(listener);
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        let state = wait_for_state(&mut from_manager, |state| state.channel_id.is_some()).await;
        assert_eq!(state.channel_id, Some(101));

        unplug_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        to_manager.send(ManagerMessage::Poll).await.unwrap();

        wait_for(&mut from_manager, |message| {
            message == &ManagerOutputMessage::PowerState(PowerState::Off)
        })
        .await;

        to_manager.send(ManagerMessage::EmitAllState).await.unwrap();
        let kept_state = wait_for_state(&mut from_manager, |_| true).await;

        assert_eq!(kept_state, state);

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn failed_hd_retune_is_reported() {
        let (listener, port) = fake_box().await;

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CH_STATUS 0101 LOCAL\r\n").await.unwrap();
            drop(socket);
            drop(listener);
        });

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, true));

        let error = wait_for(&mut from_manager, |message| {
            matches!(message, ManagerOutputMessage::Error(_))
        })
        .await;

        match error {
            ManagerOutputMessage::Error(ManagerError::Connection(msg)) => {
                assert!(msg.starts_with("Could not change channel to 108"), "{msg}")
            }
            other => panic!("unexpected {other:?}"),
        }

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn unreachable_box_stays_off() {
        let (listener, port) = fake_box().await;
        drop(listener);

        let (to_manager, mut from_manager, handle) = start_manager(&test_device(port, false));

        to_manager.send(ManagerMessage::Play).await.unwrap();

        let error = wait_for(&mut from_manager, |message| {
            matches!(message, ManagerOutputMessage::Error(ManagerError::Action(_)))
        })
        .await;
        assert!(matches!(
            error,
            ManagerOutputMessage::Error(ManagerError::Action(_))
        ));

        shut_down(to_manager, handle).await;
    }

    #[tokio::test]
    async fn closed_command_channel_stops_manager() {
        let (_listener, port) = fake_box().await;
        let (to_manager, _from_manager, handle) = start_manager(&test_device(port, false));

        drop(to_manager);
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[test]
    fn manager_info() {
        let (_to_manager, to_manager_rx) = mpsc::channel(32);
        let (manager, _) = TivoManager::new(
            &test_device(31339, false),
            Arc::new(test_directory()),
            to_manager_rx,
        );

        assert_eq!(manager.info().unique_id, "127.0.0.1-1");
        assert_eq!(manager.info().name, "Test TiVo");
    }
}
