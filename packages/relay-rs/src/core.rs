//! Core types for the relay coordination layer.
//!
//! # Overview
//!
//! Every asynchronous operation ends in a [`DataState`]: an immutable envelope
//! carrying an optional view-state payload, an optional [`StateMessage`] for the
//! user, and the [`StateEvent`] that triggered the work.
//!
//! Event identity is by [`StateEvent::event_name`]. Two events with the same
//! name are the same event for deduplication purposes, whatever arguments
//! they carry.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A named trigger for one asynchronous operation.
///
/// # Example
///
/// ```ignore
/// enum ListEvent {
///     Delete { id: String },
///     Search { query: String },
/// }
///
/// impl StateEvent for ListEvent {
///     fn event_name(&self) -> Cow<'static, str> {
///         match self {
///             ListEvent::Delete { .. } => "DeleteEvent".into(),
///             ListEvent::Search { .. } => "SearchEvent".into(),
///         }
///     }
///
///     fn error_info(&self) -> String {
///         match self {
///             ListEvent::Delete { .. } => "Error deleting.".into(),
///             ListEvent::Search { .. } => "Error searching.".into(),
///         }
///     }
/// }
/// ```
pub trait StateEvent: Send + Sync + 'static {
    /// Identity of the event. Deduplication compares names only.
    fn event_name(&self) -> Cow<'static, str>;

    /// Prefix used when a failure message is built for this event.
    fn error_info(&self) -> String;

    /// Whether a progress indicator should be shown while this event is active.
    fn should_display_progress_bar(&self) -> bool {
        true
    }
}

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UiComponentType {
    /// Not displayed; the message is still queued for bookkeeping.
    #[default]
    None,
    /// Transient notification.
    Toast,
    /// Modal dialog that must be dismissed.
    Dialog,
}

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Success,
    Error,
    Info,
    #[default]
    None,
}

/// User-facing text plus how to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub message: Option<String>,
    pub ui_component_type: UiComponentType,
    pub message_type: MessageType,
}

impl Response {
    pub fn new(
        message: impl Into<String>,
        ui_component_type: UiComponentType,
        message_type: MessageType,
    ) -> Self {
        Self {
            message: Some(message.into()),
            ui_component_type,
            message_type,
        }
    }

    pub fn success(message: impl Into<String>, ui_component_type: UiComponentType) -> Self {
        Self::new(message, ui_component_type, MessageType::Success)
    }

    pub fn error(message: impl Into<String>, ui_component_type: UiComponentType) -> Self {
        Self::new(message, ui_component_type, MessageType::Error)
    }
}

/// A message waiting in the [`MessageQueue`](crate::MessageQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    pub response: Response,
}

impl StateMessage {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    /// Message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.response.message.as_deref()
    }
}

impl From<Response> for StateMessage {
    fn from(response: Response) -> Self {
        Self::new(response)
    }
}

/// Outcome of one asynchronous operation.
///
/// Fields are private: an envelope is immutable once built.
pub struct DataState<V> {
    data: Option<V>,
    state_message: Option<StateMessage>,
    state_event: Option<Arc<dyn StateEvent>>,
}

impl<V> DataState<V> {
    /// Build an envelope from its three parts.
    pub fn new(
        data: Option<V>,
        state_message: Option<StateMessage>,
        state_event: Option<Arc<dyn StateEvent>>,
    ) -> Self {
        Self {
            data,
            state_message,
            state_event,
        }
    }

    /// Successful outcome, optionally with a payload and a message.
    pub fn data(
        response: Option<Response>,
        data: Option<V>,
        state_event: Option<Arc<dyn StateEvent>>,
    ) -> Self {
        Self::new(data, response.map(StateMessage::new), state_event)
    }

    /// Failed outcome: message only, no payload.
    pub fn error(response: Response, state_event: Option<Arc<dyn StateEvent>>) -> Self {
        Self::new(None, Some(StateMessage::new(response)), state_event)
    }

    /// Message with no event attached (e.g. validation feedback raised by the UI).
    pub fn message(response: Response) -> Self {
        Self::new(None, Some(StateMessage::new(response)), None)
    }

    pub fn payload(&self) -> Option<&V> {
        self.data.as_ref()
    }

    pub fn state_message(&self) -> Option<&StateMessage> {
        self.state_message.as_ref()
    }

    pub fn state_event(&self) -> Option<&Arc<dyn StateEvent>> {
        self.state_event.as_ref()
    }

    /// Message text, if any.
    pub fn message_text(&self) -> Option<&str> {
        self.state_message.as_ref().and_then(StateMessage::text)
    }

    /// True if no field is populated. Empty envelopes are never delivered.
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.state_message.is_none() && self.state_event.is_none()
    }

    /// Split into parts for the consumption loop.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<V>,
        Option<StateMessage>,
        Option<Arc<dyn StateEvent>>,
    ) {
        (self.data, self.state_message, self.state_event)
    }
}

impl<V: fmt::Debug> fmt::Debug for DataState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataState")
            .field("data", &self.data)
            .field("state_message", &self.state_message)
            .field(
                "state_event",
                &self.state_event.as_ref().map(|e| e.event_name()),
            )
            .finish()
    }
}
