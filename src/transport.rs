//! The capability surface a platform BLE binding provides to a [`Session`][crate::Session].
//!
//! Requests go from the session to the binding through [`Transport`]. Everything the binding observes afterwards
//! (link changes, discovery results, characteristic values) comes back as a [`TransportEvent`] pushed through the
//! ordered channel created by [`channel`].

use smallvec::SmallVec;

use crate::{CharacteristicId, PeripheralHandle, Result, ServiceId};

/// GATT client operations of a platform binding.
///
/// Every method only submits a request and reports whether it was accepted; the outcome arrives later as a
/// [`TransportEvent`]. Implementations must not call back into the session from inside these methods.
pub trait Transport: Send + Sync {
    /// Starts connecting. Progress is reported with [`LinkEvent`]s.
    fn connect(&self, peripheral: &PeripheralHandle) -> Result<()>;

    /// Tears the link down. A [`LinkEvent::Lost`] may or may not follow.
    fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<()>;

    /// Starts primary service discovery, answered with [`TransportEvent::ServicesDiscovered`].
    fn discover_services(&self, peripheral: &PeripheralHandle) -> Result<()>;

    /// Starts a read, answered with a [`TransportEvent::Value`] of origin [`ValueOrigin::Read`].
    fn read_characteristic(&self, peripheral: &PeripheralHandle, characteristic: CharacteristicId) -> Result<()>;

    /// Starts a write with response.
    fn write_characteristic(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: CharacteristicId,
        value: &[u8],
    ) -> Result<()>;

    /// Enables or disables notifications, writing the client characteristic configuration descriptor as needed.
    fn set_notify(&self, peripheral: &PeripheralHandle, characteristic: CharacteristicId, enabled: bool) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn connect(&self, peripheral: &PeripheralHandle) -> Result<()> {
        (**self).connect(peripheral)
    }

    fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<()> {
        (**self).disconnect(peripheral)
    }

    fn discover_services(&self, peripheral: &PeripheralHandle) -> Result<()> {
        (**self).discover_services(peripheral)
    }

    fn read_characteristic(&self, peripheral: &PeripheralHandle, characteristic: CharacteristicId) -> Result<()> {
        (**self).read_characteristic(peripheral, characteristic)
    }

    fn write_characteristic(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: CharacteristicId,
        value: &[u8],
    ) -> Result<()> {
        (**self).write_characteristic(peripheral, characteristic, value)
    }

    fn set_notify(&self, peripheral: &PeripheralHandle, characteristic: CharacteristicId, enabled: bool) -> Result<()> {
        (**self).set_notify(peripheral, characteristic, enabled)
    }
}

/// Link layer state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkEvent {
    /// The link is up and service discovery may start
    Established,
    /// The link went down, whether requested or not
    Lost,
}

/// Whether a value answers a read request or was pushed by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueOrigin {
    /// Completion of a [`Transport::read_characteristic`] request
    Read,
    /// Notification or indication
    Notification,
}

/// A service found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    /// The service UUID
    pub id: ServiceId,
    /// The characteristics found in the service
    pub characteristics: SmallVec<[CharacteristicId; 4]>,
}

impl DiscoveredService {
    /// Creates a discovery record
    pub fn new(id: ServiceId, characteristics: impl IntoIterator<Item = CharacteristicId>) -> Self {
        DiscoveredService {
            id,
            characteristics: characteristics.into_iter().collect(),
        }
    }
}

/// Everything a binding reports back to the session, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link changed state
    Link(LinkEvent),
    /// Service discovery finished
    ServicesDiscovered(Vec<DiscoveredService>),
    /// A characteristic value arrived
    Value {
        /// The characteristic the value belongs to
        characteristic: CharacteristicId,
        /// Raw payload
        value: Vec<u8>,
        /// Read completion or notification
        origin: ValueOrigin,
    },
}

/// Sending half handed to the platform binding
pub type EventSender = async_channel::Sender<TransportEvent>;

/// Receiving half consumed by [`Session::run`][crate::Session::run]
pub type EventReceiver = async_channel::Receiver<TransportEvent>;

/// Creates the ordered event channel between a binding and a session.
pub fn channel() -> (EventSender, EventReceiver) {
    async_channel::unbounded()
}
