//! Console use case: operator commands typed one per line.
//!
//! ```text
//! pgm <source>             change program input
//! pvw <source>             change preview input
//! cut                      cut preview to program
//! auto                     run the configured transition
//! ftb                      toggle fade to black
//! ftb-rate <frames>        set fade-to-black rate
//! tbar <0-10000>           move the transition handle
//! preview-trans on|off     enable or disable transition preview
//! info                     print connection diagnostics
//! reconnect                start a fresh session
//! help                     list commands
//! quit                     disconnect and exit
//! ```
//!
//! A `<source>` is a numeric id or one of `black`, `bars`, `color1`,
//! `color2`, `cam<N>`, `mp<N>`.

use atem_core::commands::MAX_TRANSITION_POSITION;
use atem_core::domain::inputs;
use atem_core::{AtemConnection, Clock, EngineError, Transport};
use thiserror::Error;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
commands:
  pgm <source>            change program input
  pvw <source>            change preview input
  cut                     cut preview to program
  auto                    run the configured transition
  ftb                     toggle fade to black
  ftb-rate <frames>       set fade-to-black rate
  tbar <0-10000>          move the transition handle
  preview-trans on|off    enable or disable transition preview
  info                    print connection diagnostics
  reconnect               start a fresh session
  help                    list commands
  quit                    disconnect and exit
sources: <number>, black, bars, color1, color2, cam<N>, mp<N>";

/// Error type for console input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command {0:?} (type 'help')")]
    UnknownCommand(String),
    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: invalid argument {value:?}")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    ProgramInput(u16),
    PreviewInput(u16),
    Cut,
    Auto,
    FadeToBlack,
    FadeToBlackRate(u8),
    TransitionPosition(u16),
    PreviewTransition(bool),
    Info,
    Reconnect,
    Help,
    Quit,
}

/// What the main loop should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// A command packet went out with this id.
    Sent(u16),
    /// Text for the operator.
    Print(String),
    /// A new handshake was started.
    Reconnecting,
    Quit,
}

/// Parses one input line.  Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`ConsoleError`] for unknown commands or bad arguments.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match word.to_ascii_lowercase().as_str() {
        "pgm" | "program" => ConsoleCommand::ProgramInput(source_arg("pgm", arg)?),
        "pvw" | "preview" => ConsoleCommand::PreviewInput(source_arg("pvw", arg)?),
        "cut" => ConsoleCommand::Cut,
        "auto" => ConsoleCommand::Auto,
        "ftb" => ConsoleCommand::FadeToBlack,
        "ftb-rate" => ConsoleCommand::FadeToBlackRate(number_arg("ftb-rate", "frames", arg)?),
        "tbar" => {
            let position: u16 = number_arg("tbar", "position", arg)?;
            if position > MAX_TRANSITION_POSITION {
                return Err(ConsoleError::InvalidArgument {
                    command: "tbar",
                    value: position.to_string(),
                });
            }
            ConsoleCommand::TransitionPosition(position)
        }
        "preview-trans" => {
            let value = arg.ok_or(ConsoleError::MissingArgument {
                command: "preview-trans",
                argument: "on|off",
            })?;
            match value.to_ascii_lowercase().as_str() {
                "on" | "1" | "true" => ConsoleCommand::PreviewTransition(true),
                "off" | "0" | "false" => ConsoleCommand::PreviewTransition(false),
                _ => {
                    return Err(ConsoleError::InvalidArgument {
                        command: "preview-trans",
                        value: value.to_string(),
                    })
                }
            }
        }
        "info" | "status" => ConsoleCommand::Info,
        "reconnect" => ConsoleCommand::Reconnect,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn number_arg<N: std::str::FromStr>(
    command: &'static str,
    argument: &'static str,
    arg: Option<&str>,
) -> Result<N, ConsoleError> {
    let value = arg.ok_or(ConsoleError::MissingArgument { command, argument })?;
    value.parse().map_err(|_| ConsoleError::InvalidArgument {
        command,
        value: value.to_string(),
    })
}

/// Resolves a source name or number to its id.
pub fn parse_source(value: &str) -> Option<u16> {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "black" => return Some(inputs::BLACK),
        "bars" => return Some(inputs::BARS),
        "color1" => return Some(inputs::COLOR_1),
        "color2" => return Some(inputs::COLOR_2),
        _ => {}
    }
    if let Some(n) = lower.strip_prefix("cam") {
        return n.parse().ok().and_then(inputs::camera);
    }
    if let Some(n) = lower.strip_prefix("mp") {
        return n.parse().ok().and_then(inputs::media_player);
    }
    lower.parse().ok()
}

fn source_arg(command: &'static str, arg: Option<&str>) -> Result<u16, ConsoleError> {
    let value = arg.ok_or(ConsoleError::MissingArgument {
        command,
        argument: "source",
    })?;
    parse_source(value).ok_or_else(|| ConsoleError::InvalidArgument {
        command,
        value: value.to_string(),
    })
}

/// Runs `command` against `engine`.
///
/// # Errors
///
/// Returns the engine's error when a switcher command cannot be sent.
pub fn execute<T: Transport, C: Clock>(
    engine: &mut AtemConnection<T, C>,
    command: ConsoleCommand,
) -> Result<ConsoleOutcome, EngineError> {
    let sent = match command {
        ConsoleCommand::ProgramInput(source) => engine.change_program_input(source)?,
        ConsoleCommand::PreviewInput(source) => engine.change_preview_input(source)?,
        ConsoleCommand::Cut => engine.cut()?,
        ConsoleCommand::Auto => engine.auto_transition()?,
        ConsoleCommand::FadeToBlack => engine.fade_to_black()?,
        ConsoleCommand::FadeToBlackRate(frames) => engine.set_fade_to_black_rate(frames)?,
        ConsoleCommand::TransitionPosition(position) => engine.set_transition_position(position)?,
        ConsoleCommand::PreviewTransition(enabled) => engine.set_preview_transition(enabled)?,
        ConsoleCommand::Info => {
            return Ok(ConsoleOutcome::Print(format!(
                "atem-core {}\n{}",
                atem_core::VERSION,
                engine.connection_info()
            )))
        }
        ConsoleCommand::Reconnect => {
            engine.connect()?;
            return Ok(ConsoleOutcome::Reconnecting);
        }
        ConsoleCommand::Help => return Ok(ConsoleOutcome::Print(HELP.to_string())),
        ConsoleCommand::Quit => return Ok(ConsoleOutcome::Quit),
    };
    Ok(ConsoleOutcome::Sent(sent))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use atem_core::protocol::messages::{PacketFlags, PacketHeader};
    use atem_core::transport::ManualClock;
    use atem_core::{ConnectionState, EngineConfig, TransportError};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeSwitcher {
        sent: Vec<Vec<u8>>,
        inbox: VecDeque<Vec<u8>>,
    }

    impl Transport for FakeSwitcher {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }

        fn try_receive(&mut self) -> Option<Vec<u8>> {
            self.inbox.pop_front()
        }
    }

    fn connected_engine() -> AtemConnection<FakeSwitcher, ManualClock> {
        let mut engine =
            AtemConnection::new(FakeSwitcher::default(), ManualClock::new(0), EngineConfig::default());
        engine.connect().expect("connect");
        let reply = PacketHeader {
            flags: PacketFlags::from_bits(PacketFlags::NEW_SESSION_ID),
            length: 12,
            session_id: 0x8001,
            packet_id: 1,
            ..PacketHeader::default()
        };
        engine.transport_mut().inbox.push_back(reply.encode().to_vec());
        engine.tick();
        engine.transport_mut().sent.clear();
        engine
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_input_commands_with_numbers_and_names() {
        // Arrange / Act / Assert
        assert_eq!(parse_command("pgm 2"), Ok(Some(ConsoleCommand::ProgramInput(2))));
        assert_eq!(parse_command("PVW cam4"), Ok(Some(ConsoleCommand::PreviewInput(4))));
        assert_eq!(parse_command("pgm bars"), Ok(Some(ConsoleCommand::ProgramInput(1000))));
        assert_eq!(parse_command("pvw mp2"), Ok(Some(ConsoleCommand::PreviewInput(3020))));
    }

    #[test]
    fn test_parse_blank_line_is_none() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("cut"), Ok(Some(ConsoleCommand::Cut)));
        assert_eq!(parse_command("auto"), Ok(Some(ConsoleCommand::Auto)));
        assert_eq!(parse_command("ftb"), Ok(Some(ConsoleCommand::FadeToBlack)));
        assert_eq!(parse_command("info"), Ok(Some(ConsoleCommand::Info)));
        assert_eq!(parse_command("quit"), Ok(Some(ConsoleCommand::Quit)));
    }

    #[test]
    fn test_parse_numeric_arguments() {
        assert_eq!(parse_command("ftb-rate 25"), Ok(Some(ConsoleCommand::FadeToBlackRate(25))));
        assert_eq!(
            parse_command("tbar 10000"),
            Ok(Some(ConsoleCommand::TransitionPosition(10_000)))
        );
        assert_eq!(
            parse_command("preview-trans on"),
            Ok(Some(ConsoleCommand::PreviewTransition(true)))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command("dance"),
            Err(ConsoleError::UnknownCommand("dance".to_string()))
        );
        assert_eq!(
            parse_command("pgm"),
            Err(ConsoleError::MissingArgument {
                command: "pgm",
                argument: "source"
            })
        );
        assert_eq!(
            parse_command("tbar 10001"),
            Err(ConsoleError::InvalidArgument {
                command: "tbar",
                value: "10001".to_string()
            })
        );
        assert!(matches!(
            parse_command("ftb-rate 300"),
            Err(ConsoleError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse_command("pvw cam99"),
            Err(ConsoleError::InvalidArgument { .. })
        ));
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    #[test]
    fn test_execute_sends_command_packet() {
        // Arrange
        let mut engine = connected_engine();

        // Act
        let outcome = execute(&mut engine, ConsoleCommand::PreviewInput(2)).expect("execute");

        // Assert
        assert_eq!(outcome, ConsoleOutcome::Sent(1));
        let sent = &engine.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][16..20], b"CPvI");
    }

    #[test]
    fn test_execute_reports_not_connected() {
        let mut engine =
            AtemConnection::new(FakeSwitcher::default(), ManualClock::new(0), EngineConfig::default());

        let result = execute(&mut engine, ConsoleCommand::Cut);

        assert!(matches!(result, Err(EngineError::NotConnected { .. })));
    }

    #[test]
    fn test_execute_info_prints_diagnostics() {
        let mut engine = connected_engine();

        let outcome = execute(&mut engine, ConsoleCommand::Info).expect("info");

        match outcome {
            ConsoleOutcome::Print(text) => {
                assert!(text.contains("0x8001"));
                assert!(text.contains(atem_core::VERSION));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(engine.transport().sent.is_empty());
    }

    #[test]
    fn test_execute_reconnect_restarts_handshake() {
        let mut engine = connected_engine();

        let outcome = execute(&mut engine, ConsoleCommand::Reconnect).expect("reconnect");

        assert_eq!(outcome, ConsoleOutcome::Reconnecting);
        assert_eq!(engine.connection_state(), ConnectionState::Connecting);
        assert_eq!(engine.transport().sent[0].len(), 20);
    }

    #[test]
    fn test_execute_quit_sends_nothing() {
        let mut engine = connected_engine();

        let outcome = execute(&mut engine, ConsoleCommand::Quit).expect("quit");

        assert_eq!(outcome, ConsoleOutcome::Quit);
        assert!(engine.transport().sent.is_empty());
    }
}
