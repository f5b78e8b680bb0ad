/*!
Asynchronous control manager for Virgin Media TiVo boxes.

[`TivoManager`] manages an asynchronous interface to a Virgin Media TiVo set-top box over the
box's TCP remote control protocol (port `31339`).

## Features

* Connect to boxes by host, with automatic reconnects.
* Track the channel the box is tuned to.
* Channel directory with HD and +1 pairings, hidden channels, and per-channel logos.
* Force boxes onto the HD version of a channel.
* Switch an external input (such as an AV switcher) when the box tunes to a trigger channel.
* Program guide lookups (current program, series and episode details, artwork), cached and shared
  between boxes.
* Remote control commands (IR codes, keyboard, teleport, channel changes, standby).
* Search via the box's on-screen keyboard.
* Multiple boxes configured from a single TOML file.

## Overview

A `TivoManager` instance:

1. Polls the box on an interval, reconnecting as required.
2. Accepts [`ManagerMessage`] messages from the caller to:
    * Select a channel by name.
    * Move between a channel and its +1 version, or back to the last channel.
    * Send [`TivoCommand`] messages (e.g. pause) to the box.
    * Turn the box on or off, and play, pause, or stop.
    * Search for a program.
    * Shut down.
3. Sends [`ManagerOutputMessage`] updates back to the caller:
    * On startup:
        * The [`TivoInfo`] (e.g. box name and unique ID).
        * The source list (the names of the channels which can be selected).
    * As required during the lifetime of the manager:
        * The [`PowerState`] of the box.
        * The [`TivoState`] (current channel and program details).
        * Requests to switch an external input ([`ManagerOutputMessage::SwitchInput`]).
    * Any manager, connection, guide, or box errors.

To view the full documentation, clone the repository and run `cargo doc --open`.

Run the example with:

```sh
cargo run --example control -- tivo.toml
```

## Asynchronous

Communication with `TivoManager` is asynchronous. Commands are invoked on the box by sending a
[`ManagerMessage`] to the manager. There is no guarantee that the manager will send an associated
[`ManagerOutputMessage`] back to the caller. The box only reports the channel it's tuned to, so
the result of a channel change is seen after the next poll as a
[`ManagerOutputMessage::TivoState`] update. `TivoState` contains the entire state of the box at
the time the message was sent.

## Configuration

Boxes and channels are usually described in a TOML file, loaded with [`PlatformConfig`] and
checked with [`PlatformConfig::validate()`]:

```
use virgin_tivo::PlatformConfig;

let config = PlatformConfig::from_toml_str(
    r#"
    force_hd = true

    [tivos.1]
    host = "192.168.1.50"
    name = "Living Room"

    [channels.101]
    name = "BBC One"
    hd_channel = 108

    [channels.108]
    name = "BBC One HD"
    show = false
    "#,
)
.unwrap()
.validate()
.unwrap();

assert_eq!(config.tivos.len(), 1);
assert_eq!(config.channels.source_list(), &["BBC One".to_string()]);
```

[`setup_platform()`] then creates one [`TivoManager`] per box, all sharing the channel directory
and a single [`GuideCache`].

## Common usage flow

1. **Load** the configuration.
2. **Set up** the managers with [`setup_platform()`] (or create a single manager with
   [`TivoManager::new()`] or the [`TivoManagerBuilder`]).
3. **Run** each manager on its own task.
4. **Loop** for as long as desired:
    * **Send [`ManagerMessage`] messages** to the manager.
    * **Process [`ManagerOutputMessage`] updates** from the manager.
5. **Shut down** each manager with [`ManagerMessage::ShutDown`].
*/

mod channels;
mod commands;
mod config;
mod connection;
mod connection_settings;
mod guide;
mod helpers;
mod platform;
mod state;
mod state_machine;
mod status;
mod tivo_manager;
mod tivo_manager_builder;

pub use channels::{Automation, ChannelDirectory, ChannelEntry};
pub use config::{
    ChannelConfig, ConfigError, GuideSettings, PlatformConfig, TivoConfig, TivoDevice,
    ValidatedConfig,
};
pub use connection::{ConnectOutcome, ConnectionError, TivoConnection};
pub use connection_settings::{ConnectionSettingsBuilder, TIVO_PORT};
pub use guide::{
    ChannelListings, GuideCache, GuideChannel, GuideError, GuideFetcher, HttpGuideFetcher,
    ProgramListing, GUIDE_BASE_URL,
};
pub use platform::{setup_platform, ManagedTivo};
pub use status::{parse_status, BoxStatus};
pub use tivo_manager::{
    ConnectionSettings, ManagerError, ManagerMessage, ManagerOutputMessage, PowerState,
    TivoCommand, TivoInfo, TivoManager, TivoState,
};
pub use tivo_manager_builder::TivoManagerBuilder;
