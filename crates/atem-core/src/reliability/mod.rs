//! Reliability layer: sequence tracking, acknowledgments, heartbeats and
//! retransmission on request.
//!
//! # How reliability works over UDP (for beginners)
//!
//! UDP delivers datagrams at most once and in no particular order.  The
//! switcher protocol adds just enough on top to make control traffic
//! dependable:
//!
//! 1. Every packet the client wants confirmed carries the *AckRequest* flag
//!    and a fresh 16-bit packet id.  A copy is kept in an
//!    [`OutgoingHistory`] in case the switcher asks for it again.
//! 2. Every packet the switcher sends with a body (or with AckRequest) is
//!    answered with a header-only *ACK* naming its packet id.  ACKs are
//!    never stored and never consume a packet id.
//! 3. When nothing has been sent for a while, a header-only *heartbeat*
//!    keeps the session alive.
//! 4. When the switcher notices a gap it sends a *RetransmitRequest* naming
//!    the first id it is missing.  The client replays that packet and every
//!    later one still in the history, oldest first, then ACKs the request.
//!
//! The layer never touches sockets or clocks directly: callers pass in the
//! [`Transport`] and the current time for every operation.

pub mod history;

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::protocol::codec::{
    build_ack_packet, build_command_packet, build_heartbeat_packet, build_hello_packet, hex,
};
use crate::protocol::messages::CommandName;
use crate::protocol::sequence::{is_newer, SequenceCounter};
use crate::transport::{Transport, TransportError};

pub use history::{OutgoingHistory, OutgoingPacketRecord};

/// Per-connection protocol bookkeeping.
///
/// Lives from one `connect` until the next; every field is reset when a new
/// connection attempt starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Session id assigned by the switcher (a placeholder until then).
    pub session_id: u16,
    local: SequenceCounter,
    /// Highest packet id seen from the switcher.
    pub remote_packet_id: u16,
    /// Most recent local packet id the switcher has acknowledged.
    pub last_acked_by_device: Option<u16>,
    pub last_sent_ms: u64,
    pub last_received_ms: u64,
}

impl SessionContext {
    fn new(session_id: u16, now_ms: u64) -> Self {
        Self {
            session_id,
            local: SequenceCounter::new(),
            remote_packet_id: 0,
            last_acked_by_device: None,
            last_sent_ms: now_ms,
            last_received_ms: now_ms,
        }
    }

    /// The id the next reliable packet will carry.
    pub fn local_packet_id(&self) -> u16 {
        self.local.current()
    }
}

/// Result of servicing a retransmit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitReport {
    /// Number of stored packets that were sent again.
    pub resent: usize,
    /// Whether the requested starting packet was still in the history.
    pub start_retained: bool,
}

/// Sequence counters, timers and send history for one connection.
#[derive(Debug, Clone)]
pub struct ReliabilityLayer {
    session: SessionContext,
    history: OutgoingHistory,
    initial_session_id: u16,
    heartbeat_interval_ms: u64,
}

impl ReliabilityLayer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            session: SessionContext::new(config.initial_session_id, 0),
            history: OutgoingHistory::with_capacity(config.history_capacity),
            initial_session_id: config.initial_session_id,
            heartbeat_interval_ms: config.heartbeat_interval_ms,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn history(&self) -> &OutgoingHistory {
        &self.history
    }

    /// Starts a fresh session: placeholder session id, counters at zero,
    /// empty history.
    pub fn reset(&mut self, now_ms: u64) {
        self.session = SessionContext::new(self.initial_session_id, now_ms);
        self.history.clear();
    }

    /// Replaces the session id.  Returns `true` if it changed.
    pub fn adopt_session(&mut self, session_id: u16) -> bool {
        let changed = self.session.session_id != session_id;
        self.session.session_id = session_id;
        changed
    }

    /// Records receipt of a packet from the switcher.
    ///
    /// Any packet refreshes the receive time.  Packet id 0 carries no
    /// sequence number (bare ACK replies use it) and never moves the
    /// remote id.
    pub fn note_received(&mut self, packet_id: u16, now_ms: u64) {
        self.session.last_received_ms = now_ms;
        if packet_id != 0 && is_newer(packet_id, self.session.remote_packet_id) {
            self.session.remote_packet_id = packet_id;
        }
    }

    /// Records that the switcher acknowledged one of our packets.
    pub fn note_acked(&mut self, packet_id: u16) {
        trace!(packet_id, "switcher acknowledged packet");
        self.session.last_acked_by_device = Some(packet_id);
    }

    /// Sends the handshake packet.  It is not stored for retransmission; the
    /// first reliable packet after it carries id 1.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the hello could not be sent.
    pub fn send_hello<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now_ms: u64,
    ) -> Result<(), TransportError> {
        let bytes = build_hello_packet();
        trace!(bytes = %hex(&bytes), "sending hello");
        self.session.last_sent_ms = now_ms;
        transport.send(&bytes)?;
        self.session.local = SequenceCounter::starting_at(1);
        Ok(())
    }

    /// Sends a header-only acknowledgment of `acked_id`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the ACK could not be sent.
    pub fn send_ack<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        acked_id: u16,
        now_ms: u64,
    ) -> Result<(), TransportError> {
        let bytes = build_ack_packet(self.session.session_id, acked_id);
        debug!(acked_id, "sending ack");
        trace!(bytes = %hex(&bytes), "ack bytes");
        self.session.last_sent_ms = now_ms;
        transport.send(&bytes)
    }

    /// Returns `true` when nothing has been sent for a full heartbeat
    /// interval.
    pub fn heartbeat_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.session.last_sent_ms) >= self.heartbeat_interval_ms
    }

    /// Sends a keep-alive carrying the next packet id.  Returns that id.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the send failed.  The packet is
    /// stored and the id consumed either way.
    pub fn send_heartbeat<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now_ms: u64,
    ) -> Result<u16, TransportError> {
        let packet_id = self.session.local.next();
        let bytes = build_heartbeat_packet(self.session.session_id, packet_id);
        debug!(packet_id, "sending heartbeat");
        self.store_and_send(transport, packet_id, bytes, now_ms)
    }

    /// Sends a 24-byte command packet carrying the next packet id.  Returns
    /// that id.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the send failed.  The packet is
    /// stored and the id consumed either way, so a later retransmit request
    /// can still recover it.
    pub fn send_command<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        name: CommandName,
        payload: [u8; 4],
        now_ms: u64,
    ) -> Result<u16, TransportError> {
        let packet_id = self.session.local.next();
        let bytes = build_command_packet(self.session.session_id, packet_id, name, payload);
        debug!(packet_id, command = %name, "sending command");
        self.store_and_send(transport, packet_id, bytes, now_ms)
    }

    fn store_and_send<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        packet_id: u16,
        bytes: Vec<u8>,
        now_ms: u64,
    ) -> Result<u16, TransportError> {
        trace!(packet_id, bytes = %hex(&bytes), "send");
        let result = transport.send(&bytes);
        self.history.push(packet_id, bytes, now_ms);
        self.session.last_sent_ms = now_ms;
        result.map(|()| packet_id)
    }

    /// Replays every retained packet from `from_id` onwards, oldest first,
    /// then acknowledges `request_id`.
    ///
    /// A starting packet that has already been evicted is reported with a
    /// warning; later packets that are still retained are replayed and the
    /// ACK is sent regardless.
    ///
    /// # Errors
    ///
    /// Returns the first transport error.  Replay continues past failed
    /// sends and the ACK is always attempted.
    pub fn handle_retransmit_request<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        from_id: u16,
        request_id: u16,
        now_ms: u64,
    ) -> Result<RetransmitReport, TransportError> {
        let start_retained = self.history.contains(from_id);
        if !start_retained {
            warn!(
                from_id,
                retained = self.history.len(),
                "retransmit requested for a packet no longer in history"
            );
        }

        let mut first_error = None;
        let mut resent = 0;
        for record in self.history.records_from(from_id) {
            debug!(packet_id = record.packet_id, "retransmitting");
            match transport.send(&record.bytes) {
                Ok(()) => resent += 1,
                Err(e) => {
                    warn!(packet_id = record.packet_id, error = %e, "retransmit send failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if resent > 0 {
            self.session.last_sent_ms = now_ms;
        }

        let ack = self.send_ack(transport, request_id, now_ms);
        match (first_error, ack) {
            (Some(e), _) | (None, Err(e)) => Err(e),
            (None, Ok(())) => Ok(RetransmitReport {
                resent,
                start_retained,
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::decode_header;
    use crate::transport::MockTransport;

    /// Transport that records every datagram.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<Vec<u8>>,
    }

    impl Transport for Recorder {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }

        fn try_receive(&mut self) -> Option<Vec<u8>> {
            None
        }
    }

    fn connected_layer(recorder: &mut Recorder) -> ReliabilityLayer {
        let mut layer = ReliabilityLayer::new(&EngineConfig::default());
        layer.reset(0);
        layer.send_hello(recorder, 0).expect("hello");
        layer.adopt_session(0xBEEF);
        recorder.sent.clear();
        layer
    }

    fn packet_id(bytes: &[u8]) -> u16 {
        decode_header(bytes).expect("header").packet_id
    }

    #[test]
    fn test_hello_is_not_stored_and_next_id_is_one() {
        // Arrange
        let mut recorder = Recorder::default();
        let mut layer = ReliabilityLayer::new(&EngineConfig::default());

        // Act
        layer.send_hello(&mut recorder, 0).expect("hello");

        // Assert
        assert_eq!(recorder.sent.len(), 1);
        assert_eq!(recorder.sent[0].len(), 20);
        assert!(layer.history().is_empty());
        assert_eq!(layer.session().local_packet_id(), 1);
    }

    #[test]
    fn test_ack_does_not_consume_id_or_get_stored() {
        let mut recorder = Recorder::default();
        let mut layer = connected_layer(&mut recorder);

        layer.send_ack(&mut recorder, 42, 10).expect("ack");

        let header = decode_header(&recorder.sent[0]).expect("header");
        assert!(header.flags.ack_reply());
        assert_eq!(header.ack_id, 42);
        assert_eq!(header.session_id, 0xBEEF);
        assert_eq!(layer.session().local_packet_id(), 1);
        assert!(layer.history().is_empty());
    }

    #[test]
    fn test_heartbeat_due_after_interval_of_silence() {
        let mut recorder = Recorder::default();
        let layer = connected_layer(&mut recorder);

        assert!(!layer.heartbeat_due(499));
        assert!(layer.heartbeat_due(500));
    }

    #[test]
    fn test_heartbeat_consumes_id_and_is_stored() {
        let mut recorder = Recorder::default();
        let mut layer = connected_layer(&mut recorder);

        let id = layer.send_heartbeat(&mut recorder, 500).expect("heartbeat");

        assert_eq!(id, 1);
        assert_eq!(recorder.sent[0].len(), 12);
        assert_eq!(packet_id(&recorder.sent[0]), 1);
        assert_eq!(layer.session().local_packet_id(), 2);
        assert!(layer.history().contains(1));
        assert!(!layer.heartbeat_due(999));
    }

    #[test]
    fn test_retransmit_replays_in_send_order_then_acks() {
        // Arrange – history holds ids 1..=4
        let mut recorder = Recorder::default();
        let mut layer = connected_layer(&mut recorder);
        for _ in 0..4 {
            layer
                .send_command(&mut recorder, CommandName::CUT, [0; 4], 0)
                .expect("cut");
        }
        recorder.sent.clear();

        // Act
        let report = layer
            .handle_retransmit_request(&mut recorder, 2, 77, 100)
            .expect("retransmit");

        // Assert
        let ids: Vec<u16> = recorder.sent[..3].iter().map(|b| packet_id(b)).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        let ack = decode_header(&recorder.sent[3]).expect("ack header");
        assert!(ack.flags.ack_reply());
        assert_eq!(ack.ack_id, 77);
        assert_eq!(recorder.sent.len(), 4);
        assert_eq!(
            report,
            RetransmitReport {
                resent: 3,
                start_retained: true
            }
        );
    }

    #[test]
    fn test_retransmit_of_evicted_packet_still_acks() {
        let mut recorder = Recorder::default();
        let mut layer = ReliabilityLayer::new(&EngineConfig {
            history_capacity: 2,
            ..EngineConfig::default()
        });
        layer.send_hello(&mut recorder, 0).expect("hello");
        for _ in 0..3 {
            layer
                .send_command(&mut recorder, CommandName::AUTO, [0; 4], 0)
                .expect("auto");
        }
        recorder.sent.clear();

        let report = layer
            .handle_retransmit_request(&mut recorder, 1, 9, 0)
            .expect("retransmit");

        assert!(!report.start_retained);
        assert_eq!(report.resent, 2);
        assert_eq!(recorder.sent.len(), 3);
        assert!(decode_header(&recorder.sent[2]).expect("ack").flags.ack_reply());
    }

    #[test]
    fn test_note_received_keeps_highest_remote_id() {
        let mut layer = ReliabilityLayer::new(&EngineConfig::default());

        layer.note_received(7, 10);
        layer.note_received(3, 20);

        assert_eq!(layer.session().remote_packet_id, 7);
        assert_eq!(layer.session().last_received_ms, 20);
    }

    #[test]
    fn test_note_received_ignores_unsequenced_packets_past_half_range() {
        // Arrange
        let mut layer = ReliabilityLayer::new(&EngineConfig::default());
        layer.note_received(0x9000, 10);

        // Act
        layer.note_received(0, 30);

        // Assert
        assert_eq!(layer.session().remote_packet_id, 0x9000);
        assert_eq!(layer.session().last_received_ms, 30);
    }

    #[test]
    fn test_failed_command_send_is_still_stored() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError::Closed));
        let mut layer = ReliabilityLayer::new(&EngineConfig::default());

        // Act
        let result = layer.send_command(&mut transport, CommandName::CUT, [0; 4], 0);

        // Assert
        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(layer.history().contains(0));
        assert_eq!(layer.session().local_packet_id(), 1);
    }

    #[test]
    fn test_reset_restores_placeholder_session() {
        let mut recorder = Recorder::default();
        let mut layer = connected_layer(&mut recorder);
        layer
            .send_command(&mut recorder, CommandName::CUT, [0; 4], 0)
            .expect("cut");

        layer.reset(1_000);

        assert_eq!(layer.session().session_id, 0x53AB);
        assert_eq!(layer.session().local_packet_id(), 0);
        assert!(layer.history().is_empty());
        assert_eq!(layer.session().last_received_ms, 1_000);
    }
}
