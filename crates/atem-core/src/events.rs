//! Notifications delivered from the engine to the application.
//!
//! The engine calls an [`EventSink`] synchronously from inside `tick` (and
//! from `connect`/`disconnect`).  Sinks must return quickly; anything slow
//! belongs on the other side of a channel.
//!
//! Three ready-made sinks are provided:
//!
//! - [`NullSink`] ignores everything.
//! - [`EventHandlers`] holds optional closures, one per notification.
//! - `std::sync::mpsc::Sender<AtemEvent>` forwards every notification as an
//!   [`AtemEvent`] value.

use std::sync::mpsc;

use crate::domain::state::ConnectionState;

/// A notification in value form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtemEvent {
    ConnectionStateChanged(ConnectionState),
    ProgramInputChanged(u16),
    PreviewInputChanged(u16),
    /// Fired at most once per tick, after all of that tick's updates.
    StateChanged,
}

/// Receiver of engine notifications.  Every method defaults to a no-op.
pub trait EventSink {
    fn on_connection_state_changed(&mut self, _state: ConnectionState) {}
    fn on_program_input_changed(&mut self, _source: u16) {}
    fn on_preview_input_changed(&mut self, _source: u16) {}
    fn on_state_changed(&mut self) {}
}

/// Sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

impl EventSink for mpsc::Sender<AtemEvent> {
    fn on_connection_state_changed(&mut self, state: ConnectionState) {
        let _ = self.send(AtemEvent::ConnectionStateChanged(state));
    }

    fn on_program_input_changed(&mut self, source: u16) {
        let _ = self.send(AtemEvent::ProgramInputChanged(source));
    }

    fn on_preview_input_changed(&mut self, source: u16) {
        let _ = self.send(AtemEvent::PreviewInputChanged(source));
    }

    fn on_state_changed(&mut self) {
        let _ = self.send(AtemEvent::StateChanged);
    }
}

type Handler<T> = Option<Box<dyn FnMut(T)>>;

/// A set of optional callback closures.
///
/// # Examples
///
/// ```rust
/// use atem_core::events::{EventHandlers, EventSink};
///
/// let mut handlers = EventHandlers::new()
///     .on_program_input_changed(|source| println!("program is now {source}"));
/// EventSink::on_program_input_changed(&mut handlers, 2);
/// ```
#[derive(Default)]
pub struct EventHandlers {
    connection: Handler<ConnectionState>,
    program: Handler<u16>,
    preview: Handler<u16>,
    state: Option<Box<dyn FnMut()>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connection_state_changed(mut self, f: impl FnMut(ConnectionState) + 'static) -> Self {
        self.connection = Some(Box::new(f));
        self
    }

    pub fn on_program_input_changed(mut self, f: impl FnMut(u16) + 'static) -> Self {
        self.program = Some(Box::new(f));
        self
    }

    pub fn on_preview_input_changed(mut self, f: impl FnMut(u16) + 'static) -> Self {
        self.preview = Some(Box::new(f));
        self
    }

    pub fn on_state_changed(mut self, f: impl FnMut() + 'static) -> Self {
        self.state = Some(Box::new(f));
        self
    }
}

impl EventSink for EventHandlers {
    fn on_connection_state_changed(&mut self, state: ConnectionState) {
        if let Some(f) = self.connection.as_mut() {
            f(state);
        }
    }

    fn on_program_input_changed(&mut self, source: u16) {
        if let Some(f) = self.program.as_mut() {
            f(source);
        }
    }

    fn on_preview_input_changed(&mut self, source: u16) {
        if let Some(f) = self.preview.as_mut() {
            f(source);
        }
    }

    fn on_state_changed(&mut self) {
        if let Some(f) = self.state.as_mut() {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_handlers_invoke_registered_closures() {
        // Arrange
        let seen = Rc::new(RefCell::new(Vec::new()));
        let program_seen = Rc::clone(&seen);
        let state_seen = Rc::clone(&seen);
        let mut handlers = EventHandlers::new()
            .on_program_input_changed(move |s| {
                program_seen.borrow_mut().push(AtemEvent::ProgramInputChanged(s))
            })
            .on_state_changed(move || state_seen.borrow_mut().push(AtemEvent::StateChanged));

        // Act
        EventSink::on_program_input_changed(&mut handlers, 4);
        EventSink::on_preview_input_changed(&mut handlers, 5); // not registered
        EventSink::on_state_changed(&mut handlers);

        // Assert
        assert_eq!(
            *seen.borrow(),
            vec![AtemEvent::ProgramInputChanged(4), AtemEvent::StateChanged]
        );
    }

    #[test]
    fn test_channel_sender_forwards_events() {
        let (mut tx, rx) = mpsc::channel();

        tx.on_connection_state_changed(ConnectionState::Connected);
        tx.on_preview_input_changed(2);

        let events: Vec<AtemEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                AtemEvent::ConnectionStateChanged(ConnectionState::Connected),
                AtemEvent::PreviewInputChanged(2),
            ]
        );
    }

    #[test]
    fn test_channel_sender_ignores_dropped_receiver() {
        let (mut tx, rx) = mpsc::channel::<AtemEvent>();
        drop(rx);
        tx.on_state_changed(); // must not panic
    }
}
