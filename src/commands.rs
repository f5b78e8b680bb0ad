//! TiVo remote control commands.
//!
//! Every command is a single line of text terminated by a carriage return. Some conveniences (such
//! as turning the box off) expand to more than one line, which are sent to the box in one write.

use std::fmt;

/// TiVo control commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TivoCommand {
    /// Send an arbitrary IR code (e.g. `GUIDE`, `CHANNELUP`).
    IrCode(String),
    /// Send an arbitrary keyboard key (e.g. `A`, `SPACE`, `SELECT`).
    Keyboard(String),
    /// Jump to a screen (e.g. `TIVO`, `GUIDE`, `SEARCH`).
    Teleport(String),
    /// Tune to a channel number.
    SetChannel(u16),
    /// Make the remote control beep.
    FindRemote,
    /// Go to live TV.
    LiveTv,
    SubtitlesOn,
    SubtitlesOff,
    Play,
    Pause,
    Stop,
    /// Toggle standby. When the box is on this puts it into standby; when in standby it wakes it.
    Standby,
    /// Put the box into standby, regardless of whether the first standby press only shows the
    /// standby prompt.
    StandbyConfirmed,
}

impl fmt::Display for TivoCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TivoCommand::IrCode(val) => write!(f, "IrCode({})", val),
            TivoCommand::Keyboard(val) => write!(f, "Keyboard({})", val),
            TivoCommand::Teleport(val) => write!(f, "Teleport({})", val),
            TivoCommand::SetChannel(val) => write!(f, "SetChannel({})", val),
            variant => write!(f, "{:?}", variant),
        }
    }
}

impl From<TivoCommand> for String {
    fn from(val: TivoCommand) -> Self {
        match val {
            TivoCommand::IrCode(code) => ir_code(&code),
            TivoCommand::Keyboard(key) => format!("KEYBOARD {}\r", key.trim().to_uppercase()),
            TivoCommand::Teleport(screen) => {
                format!("TELEPORT {}\r", screen.trim().to_uppercase())
            }
            TivoCommand::SetChannel(channel_id) => format!("SETCH {}\r", channel_id),
            TivoCommand::FindRemote => ir_code("FIND_REMOTE"),
            TivoCommand::LiveTv => ir_code("LIVETV"),
            TivoCommand::SubtitlesOn => ir_code("CC_ON"),
            TivoCommand::SubtitlesOff => ir_code("CC_OFF"),
            TivoCommand::Play => ir_code("PLAY"),
            TivoCommand::Pause => ir_code("PAUSE"),
            TivoCommand::Stop => ir_code("STOP"),
            TivoCommand::Standby => ir_code("STANDBY"),
            TivoCommand::StandbyConfirmed => format!("{}{}", ir_code("STANDBY"), ir_code("STANDBY")),
        }
    }
}

fn ir_code(code: &str) -> String {
    format!("IRCODE {}\r", code.trim().to_uppercase())
}

/// Build the keyboard lines which type `text` into an on-screen search box.
///
/// Spaces are sent as the `SPACE` key. The sequence finishes by moving right, out of the text
/// entry area and into the results.
pub(crate) fn search_keystrokes(text: &str) -> String {
    let mut keystrokes: String = text
        .chars()
        .map(|character| match character {
            ' ' => String::from(TivoCommand::Keyboard("SPACE".into())),
            other => String::from(TivoCommand::Keyboard(other.to_string())),
        })
        .collect();

    keystrokes.push_str(&String::from(TivoCommand::Keyboard("RIGHT".into())));

    keystrokes
}

// ================================================================================================
// Tests
