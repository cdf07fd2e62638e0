//! Requests sent to the switcher.
//!
//! Every request travels as one 24-byte packet: a 12-byte header and a
//! single command block holding a 4-character name and a 4-byte payload.
//! Layouts (ME = mix-effect bank index):
//!
//! ```text
//! CPvI / CPgI   me 00 src_hi src_lo
//! DCut / DAut   me 00 00 00
//! FtbA          me 00 00 00
//! FtbC          01 me rate 00
//! CTPs          me 00 pos_hi pos_lo
//! CTPr          me on 00 00
//! ```

use std::fmt;

use crate::protocol::messages::{CommandName, COMMAND_PAYLOAD_SIZE};

/// Fully-travelled transition handle position.
pub const MAX_TRANSITION_POSITION: u16 = 10_000;

/// A request the client can issue to a mix-effect bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundCommand {
    ChangePreviewInput { me: u8, source: u16 },
    ChangeProgramInput { me: u8, source: u16 },
    Cut { me: u8 },
    AutoTransition { me: u8 },
    /// Toggles fade-to-black using the configured rate.
    FadeToBlack { me: u8 },
    FadeToBlackRate { me: u8, frames: u8 },
    /// Clamped to [`MAX_TRANSITION_POSITION`] when encoded.
    TransitionPosition { me: u8, position: u16 },
    PreviewTransition { me: u8, enabled: bool },
}

impl OutboundCommand {
    pub fn name(&self) -> CommandName {
        match self {
            Self::ChangePreviewInput { .. } => CommandName::CHANGE_PREVIEW_INPUT,
            Self::ChangeProgramInput { .. } => CommandName::CHANGE_PROGRAM_INPUT,
            Self::Cut { .. } => CommandName::CUT,
            Self::AutoTransition { .. } => CommandName::AUTO,
            Self::FadeToBlack { .. } => CommandName::FADE_TO_BLACK_AUTO,
            Self::FadeToBlackRate { .. } => CommandName::FADE_TO_BLACK_RATE,
            Self::TransitionPosition { .. } => CommandName::SET_TRANSITION_POSITION,
            Self::PreviewTransition { .. } => CommandName::PREVIEW_TRANSITION,
        }
    }

    pub fn payload(&self) -> [u8; COMMAND_PAYLOAD_SIZE] {
        match *self {
            Self::ChangePreviewInput { me, source } | Self::ChangeProgramInput { me, source } => {
                let [hi, lo] = source.to_be_bytes();
                [me, 0, hi, lo]
            }
            Self::Cut { me } | Self::AutoTransition { me } | Self::FadeToBlack { me } => {
                [me, 0, 0, 0]
            }
            Self::FadeToBlackRate { me, frames } => [0x01, me, frames, 0],
            Self::TransitionPosition { me, position } => {
                let [hi, lo] = position.min(MAX_TRANSITION_POSITION).to_be_bytes();
                [me, 0, hi, lo]
            }
            Self::PreviewTransition { me, enabled } => [me, u8::from(enabled), 0, 0],
        }
    }

    /// The input source this request refers to, if any.
    pub fn source(&self) -> Option<u16> {
        match *self {
            Self::ChangePreviewInput { source, .. } | Self::ChangeProgramInput { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for b in self.payload() {
            write!(f, " {b:02x}")?;
        }
        Ok(())
    }
}
