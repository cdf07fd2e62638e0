//! Broadcasts from the switcher and how they update [`DeviceState`].
//!
//! Only mix-effect bank 0 is mirrored into the device state; broadcasts for
//! other banks are decoded but leave the state untouched.

use tracing::{debug, info, trace};

use crate::domain::state::DeviceState;
use crate::protocol::messages::{CommandBlock, CommandName};

/// A recognised broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    /// `PrgI`: `me 00 src_hi src_lo`.
    ProgramInput { me: u8, source: u16 },
    /// `PrvI`: same layout as `PrgI`.
    PreviewInput { me: u8, source: u16 },
    /// `TrPs`: `me in_transition frames_remaining 00 pos_hi pos_lo ..`.
    TransitionPosition {
        me: u8,
        in_transition: bool,
        position: u16,
    },
}

/// What [`apply_command`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Program(u16),
    Preview(u16),
    Transition,
}

/// Decodes a command block.  Returns `None` for names this client does not
/// track and for payloads too short to hold their fields.
pub fn decode_command(block: &CommandBlock<'_>) -> Option<InboundCommand> {
    let p = block.payload;
    match block.name {
        CommandName::PROGRAM_INPUT | CommandName::PREVIEW_INPUT => {
            if p.len() < 4 {
                debug!(command = %block.name, len = p.len(), "input broadcast too short");
                return None;
            }
            let me = p[0];
            let source = u16::from_be_bytes([p[2], p[3]]);
            if block.name == CommandName::PROGRAM_INPUT {
                Some(InboundCommand::ProgramInput { me, source })
            } else {
                Some(InboundCommand::PreviewInput { me, source })
            }
        }
        CommandName::TRANSITION_POSITION => {
            if p.len() < 6 {
                debug!(len = p.len(), "transition position broadcast too short");
                return None;
            }
            Some(InboundCommand::TransitionPosition {
                me: p[0],
                in_transition: p[1] != 0,
                position: u16::from_be_bytes([p[4], p[5]]),
            })
        }
        other => {
            trace!(command = %other, "ignoring untracked command");
            None
        }
    }
}

/// Applies a broadcast to `state`.  Returns `None` when nothing changed.
pub fn apply_command(state: &mut DeviceState, command: &InboundCommand) -> Option<StateChange> {
    match *command {
        InboundCommand::ProgramInput { me: 0, source } => {
            (state.program_input != source).then(|| {
                state.program_input = source;
                info!(source, "program input changed");
                StateChange::Program(source)
            })
        }
        InboundCommand::PreviewInput { me: 0, source } => {
            (state.preview_input != source).then(|| {
                state.preview_input = source;
                info!(source, "preview input changed");
                StateChange::Preview(source)
            })
        }
        InboundCommand::TransitionPosition {
            me: 0,
            in_transition,
            position,
        } => {
            let changed = state.transition_in_progress != in_transition
                || state.transition_position != position;
            changed.then(|| {
                state.transition_in_progress = in_transition;
                state.transition_position = position;
                debug!(in_transition, position, "transition position changed");
                StateChange::Transition
            })
        }
        other => {
            trace!(?other, "broadcast for another mix-effect bank");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block<'a>(name: &[u8; 4], payload: &'a [u8]) -> CommandBlock<'a> {
        CommandBlock {
            name: CommandName(*name),
            payload,
        }
    }

    #[test]
    fn test_decode_program_input() {
        // Arrange
        let b = block(b"PrgI", &[0x00, 0x00, 0x00, 0x05]);

        // Act
        let cmd = decode_command(&b);

        // Assert
        assert_eq!(cmd, Some(InboundCommand::ProgramInput { me: 0, source: 5 }));
    }

    #[test]
    fn test_decode_preview_input_ignores_trailing_bytes() {
        let b = block(b"PrvI", &[0x00, 0x00, 0x0B, 0xC2, 0xFF, 0xFF]);

        assert_eq!(
            decode_command(&b),
            Some(InboundCommand::PreviewInput {
                me: 0,
                source: 3010
            })
        );
    }

    #[test]
    fn test_decode_short_payload_is_ignored() {
        assert_eq!(decode_command(&block(b"PrgI", &[0, 0, 1])), None);
        assert_eq!(decode_command(&block(b"TrPs", &[0, 1, 0, 0, 0x10])), None);
    }

    #[test]
    fn test_decode_unknown_command_is_ignored() {
        assert_eq!(decode_command(&block(b"_ver", &[0, 2, 0, 30])), None);
    }

    #[test]
    fn test_decode_transition_position() {
        let b = block(b"TrPs", &[0x00, 0x01, 0x0A, 0x00, 0x13, 0x88, 0x00, 0x00]);

        assert_eq!(
            decode_command(&b),
            Some(InboundCommand::TransitionPosition {
                me: 0,
                in_transition: true,
                position: 5_000
            })
        );
    }

    #[test]
    fn test_apply_reports_change_only_when_value_differs() {
        // Arrange
        let mut state = DeviceState::default();
        let cmd = InboundCommand::ProgramInput { me: 0, source: 3 };

        // Act
        let first = apply_command(&mut state, &cmd);
        let second = apply_command(&mut state, &cmd);

        // Assert
        assert_eq!(first, Some(StateChange::Program(3)));
        assert_eq!(second, None);
        assert_eq!(state.program_input, 3);
    }

    #[test]
    fn test_apply_ignores_other_mix_effect_banks() {
        let mut state = DeviceState::default();

        let change = apply_command(
            &mut state,
            &InboundCommand::PreviewInput { me: 1, source: 7 },
        );

        assert_eq!(change, None);
        assert_eq!(state, DeviceState::default());
    }

    #[test]
    fn test_apply_transition_updates_both_fields() {
        let mut state = DeviceState::default();

        let change = apply_command(
            &mut state,
            &InboundCommand::TransitionPosition {
                me: 0,
                in_transition: true,
                position: 2_500,
            },
        );

        assert_eq!(change, Some(StateChange::Transition));
        assert!(state.transition_in_progress);
        assert_eq!(state.transition_position, 2_500);
    }
}
