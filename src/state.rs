use crate::catalogue::ServiceDescriptor;
use crate::codec::CodecRegistry;
use crate::error::{CodecError, ErrorKind};
use crate::{CharacteristicId, PeripheralHandle, ServiceId};

/// Displayed for characteristics that have not produced a value yet
pub const UNSET_VALUE: &str = "—";

/// Lifecycle of the single session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No peripheral
    #[default]
    Idle,
    /// Waiting for the link to come up
    Connecting(PeripheralHandle),
    /// Link up, waiting for the service list
    DiscoveringServices(PeripheralHandle),
    /// A known service was found; reads, writes and notifications are allowed
    Active(ActiveSession),
    /// Tearing the link down
    Disconnecting(PeripheralHandle),
}

impl SessionState {
    /// The peripheral this state refers to
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        match self {
            SessionState::Idle => None,
            SessionState::Connecting(p) | SessionState::DiscoveringServices(p) | SessionState::Disconnecting(p) => {
                Some(p)
            }
            SessionState::Active(active) => Some(&active.peripheral),
        }
    }

    /// `true` in [`SessionState::Idle`]
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            SessionState::Active(active) => Some(active),
            _ => None,
        }
    }

    /// One `"<label>: <value>"` line per characteristic of the active service, in catalogue order. Empty when
    /// no session is active.
    pub fn render_lines(&self) -> Vec<String> {
        self.active()
            .map(|active| {
                active
                    .values()
                    .iter()
                    .map(|x| format!("{}: {}", x.label, x.value))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting(_) => "connecting",
            SessionState::DiscoveringServices(_) => "discovering services",
            SessionState::Active(_) => "active",
            SessionState::Disconnecting(_) => "disconnecting",
        }
    }
}

/// Last known value of one characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicValue {
    /// The characteristic
    pub id: CharacteristicId,
    /// Human readable name
    pub label: &'static str,
    /// Decoded value, or [`UNSET_VALUE`]
    pub value: String,
}

/// Data of [`SessionState::Active`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    /// The connected peripheral
    pub peripheral: PeripheralHandle,
    /// The catalogue service that was matched
    pub service: ServiceId,
    /// Label of the matched service
    pub label: &'static str,
    values: Vec<CharacteristicValue>,
}

impl ActiveSession {
    pub(crate) fn new(peripheral: PeripheralHandle, service: &ServiceDescriptor, registry: &CodecRegistry) -> Self {
        let values = service
            .characteristics()
            .iter()
            .map(|&id| CharacteristicValue {
                id,
                label: registry.get(&id).map(|x| x.label()).unwrap_or_default(),
                value: UNSET_VALUE.to_owned(),
            })
            .collect();

        ActiveSession {
            peripheral,
            service: service.id(),
            label: service.label(),
            values,
        }
    }

    /// Values of every characteristic of the service, in catalogue order
    pub fn values(&self) -> &[CharacteristicValue] {
        &self.values
    }

    /// The last known value of `id`, or `None` if `id` is not part of the service
    pub fn value(&self, id: &CharacteristicId) -> Option<&str> {
        self.values.iter().find(|x| x.id == *id).map(|x| x.value.as_str())
    }

    /// Whether `id` is part of the active service
    pub fn contains(&self, id: &CharacteristicId) -> bool {
        self.values.iter().any(|x| x.id == *id)
    }

    pub(crate) fn set(&mut self, id: &CharacteristicId, value: String) -> bool {
        match self.values.iter_mut().find(|x| x.id == *id) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }
}

/// Notifications published by a [`Session`][crate::Session]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved to a new state
    StateChanged(SessionState),
    /// A characteristic produced a new value
    ValueUpdated {
        /// The characteristic
        characteristic: CharacteristicId,
        /// The decoded value
        value: String,
    },
    /// A payload could not be decoded; the previous value was kept
    DecodeFailed {
        /// The characteristic
        characteristic: CharacteristicId,
        /// Why decoding failed
        error: CodecError,
    },
    /// A queued read was refused by the transport and dropped
    ReadRejected {
        /// The characteristic
        characteristic: CharacteristicId,
        /// What the transport reported
        error: ErrorKind,
    },
    /// The peripheral was dropped because it exposed no known service or never became usable
    InvalidDevice(PeripheralHandle),
}
