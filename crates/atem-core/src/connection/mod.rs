//! The connection engine: handshake state machine and tick loop.
//!
//! # How a session runs (for beginners)
//!
//! ```text
//! connect()  ──▶ hello (20 bytes)              state = Connecting
//!            ◀── reply with NewSessionId flag  state = Connected, session id adopted
//!            ──▶ ACK
//!            ◀── state broadcasts (PrgI, PrvI, TrPs, ...)   each ACKed
//!            ──▶ heartbeat after 500 ms of silence
//!            ──▶ commands (CPvI, DCut, ...)
//! ```
//!
//! The engine never blocks and owns no timers.  The host calls
//! [`AtemConnection::tick`] roughly every 10 ms.  Each tick:
//!
//! 1. reads at most one datagram and processes it completely,
//! 2. sends a heartbeat if one is due,
//! 3. checks the handshake and receive timeouts,
//! 4. fires a single `on_state_changed` if any device state changed.
//!
//! Notifications go to the [`EventSink`] supplied by the host and are
//! delivered synchronously from inside these calls.

pub mod info;

use tracing::{debug, error, info, trace, warn};

use crate::commands::{apply_command, decode_command, OutboundCommand, StateChange};
use crate::config::EngineConfig;
use crate::domain::inputs::SourceValidator;
use crate::domain::state::{ConnectionState, DeviceState};
use crate::error::EngineError;
use crate::events::{EventSink, NullSink};
use crate::protocol::codec::{decode_packet, hex, DecodedPacket};
use crate::reliability::{ReliabilityLayer, SessionContext};
use crate::transport::{Clock, Transport};

pub use info::ConnectionInfo;

/// Mix-effect bank targeted by the convenience command methods.
pub const DEFAULT_ME: u8 = 0;

/// One client session with one switcher.
///
/// Create one per switcher, call [`connect`](Self::connect) once, then keep
/// calling [`tick`](Self::tick).  A fresh `connect` after an error starts a
/// brand-new session.
pub struct AtemConnection<T, C> {
    transport: T,
    clock: C,
    config: EngineConfig,
    state: ConnectionState,
    reliability: ReliabilityLayer,
    device: DeviceState,
    dirty: bool,
    connect_started_ms: u64,
    events: Box<dyn EventSink>,
    validator: Option<Box<dyn SourceValidator>>,
}

impl<T: Transport, C: Clock> AtemConnection<T, C> {
    pub fn new(transport: T, clock: C, config: EngineConfig) -> Self {
        Self {
            transport,
            clock,
            reliability: ReliabilityLayer::new(&config),
            config,
            state: ConnectionState::Disconnected,
            device: DeviceState::default(),
            dirty: false,
            connect_started_ms: 0,
            events: Box::new(NullSink),
            validator: None,
        }
    }

    /// Routes notifications to `sink`.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Box::new(sink);
        self
    }

    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.events = Box::new(sink);
    }

    /// Installs an advisory validator.  Unknown sources are logged, never
    /// refused.
    pub fn with_source_validator(mut self, validator: impl SourceValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Device state as last reported by the switcher.
    pub fn state(&self) -> &DeviceState {
        &self.device
    }

    pub fn session(&self) -> &SessionContext {
        self.reliability.session()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        let session = self.reliability.session();
        ConnectionInfo {
            state: self.state,
            session_id: session.session_id,
            local_packet_id: session.local_packet_id(),
            remote_packet_id: session.remote_packet_id,
            last_acked_by_device: session.last_acked_by_device,
            retained_packets: self.reliability.history().len(),
            program_input: self.device.program_input,
            preview_input: self.device.preview_input,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts a new session by sending the hello packet.
    ///
    /// On success the engine is `Connecting`; the handshake completes inside
    /// a later [`tick`](Self::tick).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HandshakeFailed`] if the hello could not be
    /// sent.  The engine is then in the `Error` state.
    pub fn connect(&mut self) -> Result<(), EngineError> {
        let now = self.clock.now_ms();
        self.reliability.reset(now);
        self.device = DeviceState::default();
        self.dirty = false;
        self.connect_started_ms = now;

        info!(session_id = self.config.initial_session_id, "connecting to switcher");
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.reliability.send_hello(&mut self.transport, now) {
            error!(error = %e, "failed to send hello");
            self.set_state(ConnectionState::Error);
            return Err(EngineError::HandshakeFailed(e));
        }
        Ok(())
    }

    /// Ends the session and releases the transport.
    ///
    /// Valid from any state.  A `Disconnected` notification is raised when
    /// the engine was Connecting, Connected or in Error, and never when it
    /// was already disconnected.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!("disconnecting from switcher");
            self.set_state(ConnectionState::Disconnected);
        }
        self.transport.close();
    }

    /// Runs one cooperative step of the engine.  Never blocks.
    pub fn tick(&mut self) {
        if let Some(datagram) = self.transport.try_receive() {
            let now = self.clock.now_ms();
            self.process_datagram(&datagram, now);
        }

        let now = self.clock.now_ms();

        if self.state == ConnectionState::Connected && self.reliability.heartbeat_due(now) {
            if let Err(e) = self.reliability.send_heartbeat(&mut self.transport, now) {
                warn!(error = %e, "heartbeat send failed");
            }
        }

        self.check_timeouts(now);

        if self.dirty {
            self.dirty = false;
            self.events.on_state_changed();
        }
    }

    fn check_timeouts(&mut self, now: u64) {
        let timeout = self.config.connection_timeout_ms;
        match self.state {
            ConnectionState::Connecting if now.saturating_sub(self.connect_started_ms) > timeout => {
                error!(timeout_ms = timeout, "no handshake reply from switcher");
                self.set_state(ConnectionState::Error);
            }
            ConnectionState::Connected => {
                let silence = now.saturating_sub(self.reliability.session().last_received_ms);
                if silence > timeout {
                    error!(silence_ms = silence, timeout_ms = timeout, "connection timed out");
                    self.set_state(ConnectionState::Error);
                }
            }
            _ => {}
        }
    }

    fn set_state(&mut self, new: ConnectionState) {
        if self.state != new {
            debug!(from = %self.state, to = %new, "connection state change");
            self.state = new;
            self.events.on_connection_state_changed(new);
        }
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    fn process_datagram(&mut self, bytes: &[u8], now: u64) {
        trace!(len = bytes.len(), bytes = %hex(bytes), "recv");

        let packet = match decode_packet(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "dropping undecodable datagram");
                return;
            }
        };

        match self.state {
            ConnectionState::Connecting => self.process_handshake(&packet, now),
            ConnectionState::Connected => self.process_connected(&packet, now),
            ConnectionState::Disconnected | ConnectionState::Error => {
                trace!(state = %self.state, "ignoring datagram while not in a session");
            }
        }
    }

    fn process_handshake(&mut self, packet: &DecodedPacket<'_>, now: u64) {
        let header = &packet.header;
        if !header.flags.new_session_id() {
            debug!(flags = %header.flags, "waiting for session assignment; packet ignored");
            return;
        }

        self.reliability.adopt_session(header.session_id);
        self.reliability.note_received(header.packet_id, now);
        info!("switcher assigned session 0x{:04X}", header.session_id);
        self.set_state(ConnectionState::Connected);

        if header.packet_id != 0 {
            if let Err(e) = self
                .reliability
                .send_ack(&mut self.transport, header.packet_id, now)
            {
                warn!(error = %e, "failed to acknowledge handshake");
            }
        }
    }

    fn process_connected(&mut self, packet: &DecodedPacket<'_>, now: u64) {
        let header = &packet.header;

        if header.session_id != self.reliability.session().session_id {
            info!(
                "switcher changed session id 0x{:04X} -> 0x{:04X}",
                self.reliability.session().session_id,
                header.session_id
            );
            self.reliability.adopt_session(header.session_id);
        }

        self.reliability.note_received(header.packet_id, now);

        if header.flags.ack_reply() {
            self.reliability.note_acked(header.ack_id);
        }

        // The retransmit reply already acknowledges this packet, so the
        // regular ACK is skipped but any command blocks are still applied.
        let retransmit = header.flags.retransmit_request();
        if retransmit {
            info!(
                from_id = header.retransmit_from,
                "switcher requested retransmission"
            );
            if let Err(e) = self.reliability.handle_retransmit_request(
                &mut self.transport,
                header.retransmit_from,
                header.packet_id,
                now,
            ) {
                warn!(error = %e, "retransmission incomplete");
            }
        }

        if !retransmit && (packet.has_body() || header.flags.ack_request()) {
            if let Err(e) = self
                .reliability
                .send_ack(&mut self.transport, header.packet_id, now)
            {
                warn!(error = %e, "ack send failed");
            }
        }

        for block in packet.commands() {
            let block = match block {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "discarding rest of packet body");
                    break;
                }
            };
            let Some(command) = decode_command(&block) else {
                continue;
            };
            if let Some(change) = apply_command(&mut self.device, &command) {
                self.dirty = true;
                match change {
                    StateChange::Program(source) => self.events.on_program_input_changed(source),
                    StateChange::Preview(source) => self.events.on_preview_input_changed(source),
                    StateChange::Transition => {}
                }
            }
        }
    }

    // ── Outbound commands ─────────────────────────────────────────────────────

    /// Sends one command.  Returns the packet id it was sent with.
    ///
    /// Device state is not touched; it changes only when the switcher
    /// broadcasts the result.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotConnected`] outside the `Connected` state.  Nothing
    ///   is queued.
    /// - [`EngineError::Transport`] if the datagram could not be sent.  It is
    ///   still kept for retransmission.
    pub fn send_command(&mut self, command: OutboundCommand) -> Result<u16, EngineError> {
        if self.state != ConnectionState::Connected {
            warn!(%command, state = %self.state, "command rejected: not connected");
            return Err(EngineError::NotConnected { state: self.state });
        }

        if let (Some(source), Some(validator)) = (command.source(), self.validator.as_ref()) {
            if !validator.is_valid_source(source) {
                warn!(source, "source is not known for this model; sending anyway");
            }
        }

        let now = self.clock.now_ms();
        let id = self.reliability.send_command(
            &mut self.transport,
            command.name(),
            command.payload(),
            now,
        )?;
        info!(%command, packet_id = id, "command sent");
        Ok(id)
    }

    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn change_preview_input(&mut self, source: u16) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::ChangePreviewInput {
            me: DEFAULT_ME,
            source,
        })
    }

    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn change_program_input(&mut self, source: u16) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::ChangeProgramInput {
            me: DEFAULT_ME,
            source,
        })
    }

    /// Swaps program and preview immediately.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn cut(&mut self) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::Cut { me: DEFAULT_ME })
    }

    /// Runs the configured transition.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn auto_transition(&mut self) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::AutoTransition { me: DEFAULT_ME })
    }

    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn fade_to_black(&mut self) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::FadeToBlack { me: DEFAULT_ME })
    }

    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn set_fade_to_black_rate(&mut self, frames: u8) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::FadeToBlackRate {
            me: DEFAULT_ME,
            frames,
        })
    }

    /// Moves the transition handle; `position` is clamped to 0..=10000.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn set_transition_position(&mut self, position: u16) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::TransitionPosition {
            me: DEFAULT_ME,
            position,
        })
    }

    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub fn set_preview_transition(&mut self, enabled: bool) -> Result<u16, EngineError> {
        self.send_command(OutboundCommand::PreviewTransition {
            me: DEFAULT_ME,
            enabled,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
