//! Defines the state machine for a TiVo box's power and playback state.
//!
//! The box never tells us whether it's playing or paused, so the state is a combination of what
//! the connection tells us (is the box answering at all) and what we've asked it to do:
//!
//! 1. The box is `Off` until it answers a poll with a status message.
//! 2. Once it's answering it's `Playing` (live TV is always playing).
//! 3. Play/pause/stop commands move between `Playing` and `Paused`, sending the matching IR code.
//! 4. Losing the connection, or being turned off, puts the box back to `Off`.

use std::fmt;

use rust_fsm::*;

use crate::TivoCommand;

// ------------------------------------------------------------------------------------------------
// States, Inputs, Outputs

/// Box power and playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not answering (in standby, unplugged, or unreachable).
    Off,
    Playing,
    Paused,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// State machine transition inputs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Input {
    /// A poll reached the box.
    StatusConfirmed,
    /// A poll could not reach the box.
    ConnectionLost,
    Play,
    Pause,
    Stop,
    TurnOn,
    TurnOff,
}

/// State machine transition outputs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Output {
    SendCommand(TivoCommand),
}

// stateDiagram-v2
// [*] --> Off
// Off --> Playing: StatusConfirmed
// Off --> Off: TurnOn [Standby]
//
// Playing --> Playing: StatusConfirmed
// Playing --> Playing: Play [Play]
// Playing --> Playing: Stop [Stop]
// Playing --> Paused: Pause [Pause]
// Playing --> Off: TurnOff [StandbyConfirmed]
// Playing --> Off: ConnectionLost
//
// Paused --> Paused: StatusConfirmed
// Paused --> Playing: Play [Play]
// Paused --> Playing: Stop [Stop]
// Paused --> Paused: Pause [Pause]
// Paused --> Off: TurnOff [StandbyConfirmed]
// Paused --> Off: ConnectionLost

// ================================================================================================
// TivoStateMachine

#[derive(Debug)]
pub(crate) struct TivoStateMachine;

impl StateMachineImpl for TivoStateMachine {
    type Input = Input;
    type State = State;
    type Output = Output;

    const INITIAL_STATE: Self::State = State::Off;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        match (state, input) {
            (_, Input::ConnectionLost) => Some(State::Off),

            // Off
            (State::Off, Input::StatusConfirmed) => Some(State::Playing),
            // Stays off until the next poll confirms the box is answering
            (State::Off, Input::TurnOn) => Some(State::Off),

            // Playing / Paused
            (State::Playing | State::Paused, Input::StatusConfirmed) => Some(*state),
            (State::Playing | State::Paused, Input::Play) => Some(State::Playing),
            (State::Playing | State::Paused, Input::Pause) => Some(State::Paused),
            (State::Playing | State::Paused, Input::Stop) => Some(State::Playing),
            (State::Playing | State::Paused, Input::TurnOff) => Some(State::Off),

            _ => None,
        }
    }

    fn output(state: &Self::State, input: &Self::Input) -> Option<Self::Output> {
        match (state, input) {
            (State::Off, Input::TurnOn) => Some(Output::SendCommand(TivoCommand::Standby)),

            (State::Playing | State::Paused, Input::Play) => {
                Some(Output::SendCommand(TivoCommand::Play))
            }
            (State::Playing | State::Paused, Input::Pause) => {
                Some(Output::SendCommand(TivoCommand::Pause))
            }
            (State::Playing | State::Paused, Input::Stop) => {
                Some(Output::SendCommand(TivoCommand::Stop))
            }
            (State::Playing | State::Paused, Input::TurnOff) => {
                Some(Output::SendCommand(TivoCommand::StandbyConfirmed))
            }

            _ => None,
        }
    }
}

// ================================================================================================
// Tests

#[cfg(test)]
mod tests {
    use rust_fsm::StateMachine;

    use super::{Input, Output, State, TivoStateMachine};
    use crate::TivoCommand;

    #[test]
    fn state_display() {
        assert_eq!(State::Off.to_string(), "Off");
        assert_eq!(State::Playing.to_string(), "Playing");
        assert_eq!(State::Paused.to_string(), "Paused");
    }

    #[test]
    fn status_confirms_box_is_on() {
        let mut fsm: StateMachine<TivoStateMachine> = StateMachine::new();
        assert_eq!(fsm.state(), &State::Off);

        assert_eq!(fsm.consume(&Input::StatusConfirmed).unwrap(), None);
        assert_eq!(fsm.state(), &State::Playing);

        assert_eq!(fsm.consume(&Input::ConnectionLost).unwrap(), None);
        assert_eq!(fsm.state(), &State::Off);
    }

    #[test]
    fn play_pause_stop() {
        let mut fsm: StateMachine<TivoStateMachine> = StateMachine::new();
        fsm.consume(&Input::StatusConfirmed).unwrap();

        assert_eq!(
            fsm.consume(&Input::Pause).unwrap(),
            Some(Output::SendCommand(TivoCommand::Pause))
        );
        assert_eq!(fsm.state(), &State::Paused);

        // Polls don't resume playback
        fsm.consume(&Input::StatusConfirmed).unwrap();
        assert_eq!(fsm.state(), &State::Paused);

        assert_eq!(
            fsm.consume(&Input::Play).unwrap(),
            Some(Output::SendCommand(TivoCommand::Play))
        );
        assert_eq!(fsm.state(), &State::Playing);

        fsm.consume(&Input::Pause).unwrap();
        assert_eq!(
            fsm.consume(&Input::Stop).unwrap(),
            Some(Output::SendCommand(TivoCommand::Stop))
        );
        assert_eq!(fsm.state(), &State::Playing);
    }

    #[test]
    fn turn_on_and_off() {
        let mut fsm: StateMachine<TivoStateMachine> = StateMachine::new();

        assert_eq!(
            fsm.consume(&Input::TurnOn).unwrap(),
            Some(Output::SendCommand(TivoCommand::Standby))
        );
        assert_eq!(fsm.state(), &State::Off);

        fsm.consume(&Input::StatusConfirmed).unwrap();
        assert!(fsm.consume(&Input::TurnOn).is_err());

        assert_eq!(
            fsm.consume(&Input::TurnOff).unwrap(),
            Some(Output::SendCommand(TivoCommand::StandbyConfirmed))
        );
        assert_eq!(fsm.state(), &State::Off);
    }

    #[test]
    fn transport_controls_need_box_on() {
        let mut fsm: StateMachine<TivoStateMachine> = StateMachine::new();

        assert!(fsm.consume(&Input::Play).is_err());
        assert!(fsm.consume(&Input::Pause).is_err());
        assert!(fsm.consume(&Input::Stop).is_err());
        assert!(fsm.consume(&Input::TurnOff).is_err());
        assert_eq!(fsm.state(), &State::Off);
    }
}
