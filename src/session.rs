use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_broadcast::{InactiveReceiver, Sender};
use futures_core::Stream;
use futures_lite::{FutureExt, StreamExt};
use futures_timer::Delay;
use tracing::{debug, info, warn};

use crate::catalogue::ServiceCatalogue;
use crate::codec::{CharacteristicDescriptor, CodecRegistry};
use crate::error::SessionError;
use crate::queue::ReadQueue;
use crate::state::{ActiveSession, SessionEvent, SessionState};
use crate::transport::{DiscoveredService, LinkEvent, Transport, TransportEvent, ValueOrigin};
use crate::{CharacteristicId, PeripheralHandle, Result, SessionConfig};

struct Inner {
    state: SessionState,
    pending_connect: Option<PeripheralHandle>,
    reads: ReadQueue,
    notifying: HashSet<CharacteristicId>,
}

/// A connection to one peripheral of the service catalogue.
///
/// The session owns all connection state. Caller operations and transport events are serialized through a
/// single lock, so a `Session` can be shared (e.g. in an `Arc`) between the UI, the task draining the transport's
/// event channel with [`Session::run`], and anything else.
///
/// No method blocks waiting for the peripheral: operations return once the transport has accepted the request
/// and their results are published as [`SessionEvent`]s.
pub struct Session<T: Transport> {
    transport: T,
    registry: CodecRegistry,
    catalogue: ServiceCatalogue,
    config: SessionConfig,
    inner: Mutex<Inner>,
    events: Sender<SessionEvent>,
    _events_keepalive: InactiveReceiver<SessionEvent>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.lock().state)
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Transport> Session<T> {
    /// Creates an idle session over the standard weather/light catalogue.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self> {
        let registry = CodecRegistry::standard();
        let catalogue = ServiceCatalogue::standard(&registry)?;
        Ok(Self::with_catalogue(transport, registry, catalogue, config))
    }

    /// Creates an idle session over a custom catalogue. `catalogue` must have been validated against `registry`.
    pub fn with_catalogue(
        transport: T,
        registry: CodecRegistry,
        catalogue: ServiceCatalogue,
        config: SessionConfig,
    ) -> Self {
        let (mut events, receiver) = async_broadcast::broadcast(config.event_capacity.max(1));
        events.set_overflow(true);

        Session {
            transport,
            registry,
            catalogue,
            config,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                pending_connect: None,
                reads: ReadQueue::new(),
                notifying: HashSet::new(),
            }),
            events,
            _events_keepalive: receiver.deactivate(),
        }
    }

    /// The transport this session drives
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The codecs used to interpret values
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// The services this session accepts
    pub fn catalogue(&self) -> &ServiceCatalogue {
        &self.catalogue
    }

    /// A snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// The peripheral a connection attempt is in progress for, if any
    pub fn pending_connect(&self) -> Option<PeripheralHandle> {
        self.lock().pending_connect.clone()
    }

    /// Number of reads outstanding or waiting on the transport
    pub fn pending_reads(&self) -> usize {
        self.lock().reads.len()
    }

    /// Subscribes to the session's events. Only events published after this call are received. A subscriber that
    /// falls more than [`SessionConfig::event_capacity`] events behind loses the oldest ones.
    pub fn events(&self) -> impl Stream<Item = SessionEvent> + Send + Unpin + 'static {
        self.events.new_receiver()
    }

    /// Starts connecting to `peripheral`.
    ///
    /// Only one peripheral is handled at a time: this fails without touching the transport unless the session is
    /// idle.
    pub fn connect(&self, peripheral: PeripheralHandle) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Idle if inner.pending_connect.is_none() => {}
            SessionState::Idle | SessionState::Connecting(_) | SessionState::DiscoveringServices(_) => {
                return Err(SessionError::AlreadyConnecting)
            }
            SessionState::Active(_) | SessionState::Disconnecting(_) => return Err(SessionError::AlreadyConnected),
        }

        if let Err(err) = self.transport.connect(&peripheral) {
            warn!("transport refused to connect to {}: {}", peripheral, err);
            return Err(err.into());
        }

        info!("connecting to {}", peripheral);
        inner.pending_connect = Some(peripheral.clone());
        self.transition(&mut inner, SessionState::Connecting(peripheral));
        Ok(())
    }

    /// Connects to `peripheral` and waits until the session is active.
    ///
    /// If the session is not active after `timeout` (or [`SessionConfig::connect_timeout`] when `None`), the
    /// attempt is abandoned: the session disconnects and [`SessionError::InvalidDevice`] is returned. Transport
    /// events must be processed concurrently, e.g. by [`Session::run`].
    pub async fn connect_with_timeout(
        &self,
        peripheral: PeripheralHandle,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        let timeout = timeout.unwrap_or(self.config.connect_timeout);
        let mut events = self.events();
        self.connect(peripheral.clone())?;

        let outcome = async {
            while let Some(event) = events.next().await {
                match event {
                    SessionEvent::StateChanged(SessionState::Active(_)) => return Some(Ok(())),
                    SessionEvent::StateChanged(SessionState::Idle) | SessionEvent::InvalidDevice(_) => {
                        return Some(Err(SessionError::InvalidDevice))
                    }
                    _ => {}
                }
            }
            None
        }
        .or(async {
            Delay::new(timeout).await;
            None
        })
        .await;

        match outcome {
            Some(res) => res,
            None => self.abandon_connect(&peripheral, timeout),
        }
    }

    fn abandon_connect(&self, peripheral: &PeripheralHandle, timeout: Duration) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &inner.state {
            SessionState::Active(active) if active.peripheral == *peripheral => return Ok(()),
            SessionState::Connecting(p) | SessionState::DiscoveringServices(p) if p == peripheral => {}
            // someone else already ended this attempt
            _ => return Err(SessionError::InvalidDevice),
        }

        warn!("{} did not become usable within {:?}", peripheral, timeout);
        self.teardown(&mut inner, peripheral.clone());
        self.publish(SessionEvent::InvalidDevice(peripheral.clone()));
        Err(SessionError::InvalidDevice)
    }

    /// Ends the session or connection attempt. Safe in every state; the session is idle afterwards and every
    /// pending read is discarded.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        inner.pending_connect = None;
        match inner.state.peripheral().cloned() {
            Some(peripheral) => {
                info!("disconnecting from {}", peripheral);
                self.teardown(&mut inner, peripheral);
            }
            None => self.transition(&mut inner, SessionState::Idle),
        }
    }

    fn teardown(&self, inner: &mut Inner, peripheral: PeripheralHandle) {
        self.transition(inner, SessionState::Disconnecting(peripheral.clone()));
        if let Err(err) = self.transport.disconnect(&peripheral) {
            warn!("transport refused to disconnect from {}: {}", peripheral, err);
        }
        inner.pending_connect = None;
        self.transition(inner, SessionState::Idle);
    }

    /// Requests the current value of `id`. The value arrives as [`SessionEvent::ValueUpdated`].
    ///
    /// Reads are issued one at a time; a read requested while another is outstanding is queued.
    pub fn read(&self, id: CharacteristicId) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let Inner { state, reads, .. } = &mut *inner;
        let active = active(state)?;
        let descriptor = self.descriptor_in(active, &id)?;
        if !descriptor.supports_read() {
            return Err(SessionError::UnsupportedOperation);
        }

        let peripheral = &active.peripheral;
        reads
            .enqueue(id, |id| self.transport.read_characteristic(peripheral, id))
            .map_err(|err| {
                warn!("transport refused read of {}: {}", id, err);
                err.into()
            })
    }

    /// Requests the value of every readable characteristic of the active service, in catalogue order.
    pub fn read_all(&self) -> Result<(), SessionError> {
        let ids: Vec<CharacteristicId> = {
            let inner = self.lock();
            let active = active(&inner.state)?;
            active
                .values()
                .iter()
                .map(|x| x.id)
                .filter(|id| self.registry.get(id).is_some_and(|x| x.supports_read()))
                .collect()
        };

        for id in ids {
            self.read(id)?;
        }
        Ok(())
    }

    /// Encodes `text` and writes it to `id`.
    ///
    /// The stored value is not changed; the peripheral's new value is observed through a read or a notification.
    pub fn write(&self, id: CharacteristicId, text: &str) -> Result<(), SessionError> {
        let inner = self.lock();
        let active = active(&inner.state)?;
        let descriptor = self.descriptor_in(active, &id)?;
        if !descriptor.supports_write() {
            return Err(SessionError::UnsupportedOperation);
        }

        let value = descriptor.encode(text)?;
        debug!("writing {:02x?} to {}", value, descriptor.label());
        self.transport
            .write_characteristic(&active.peripheral, id, &value)
            .map_err(|err| {
                warn!("transport refused write to {}: {}", id, err);
                err.into()
            })
    }

    /// Subscribes to or unsubscribes from value pushes of `id`.
    pub fn set_notifications(&self, id: CharacteristicId, enabled: bool) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let Inner { state, notifying, .. } = &mut *inner;
        let active = active(state)?;
        let descriptor = self.descriptor_in(active, &id)?;
        if !descriptor.supports_notify() {
            return Err(SessionError::UnsupportedOperation);
        }

        self.transport
            .set_notify(&active.peripheral, id, enabled)
            .map_err(|err| {
                warn!("transport refused to set notifications of {}: {}", id, err);
                SessionError::from(err)
            })?;

        debug!("notifications of {} {}", descriptor.label(), if enabled { "on" } else { "off" });
        if enabled {
            let _ = notifying.insert(id);
        } else {
            let _ = notifying.remove(&id);
        }
        Ok(())
    }

    /// Whether notifications of `id` are enabled in the current session
    pub fn is_notifying(&self, id: &CharacteristicId) -> bool {
        self.lock().notifying.contains(id)
    }

    /// Applies a value delivered by the transport.
    ///
    /// A payload that fails to decode leaves the stored value untouched and is reported as
    /// [`SessionEvent::DecodeFailed`]. A read completion always advances the read queue, whether or not decoding
    /// succeeded.
    pub fn on_value_received(&self, id: CharacteristicId, bytes: &[u8], origin: ValueOrigin) {
        let mut inner = self.lock();
        self.apply_value(&mut inner, id, bytes, origin);
    }

    /// Processes one transport event.
    pub fn handle_event(&self, event: TransportEvent) {
        let mut inner = self.lock();
        match event {
            TransportEvent::Link(LinkEvent::Established) => self.on_link_established(&mut inner),
            TransportEvent::Link(LinkEvent::Lost) => self.on_link_lost(&mut inner),
            TransportEvent::ServicesDiscovered(services) => self.on_services_discovered(&mut inner, &services),
            TransportEvent::Value {
                characteristic,
                value,
                origin,
            } => self.apply_value(&mut inner, characteristic, &value, origin),
        }
    }

    /// Processes transport events in arrival order until the stream ends.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = TransportEvent>,
    {
        futures_lite::pin!(events);
        while let Some(event) = events.next().await {
            self.handle_event(event);
        }
        debug!("transport event stream ended");
    }

    fn on_link_established(&self, inner: &mut Inner) {
        let SessionState::Connecting(peripheral) = &inner.state else {
            debug!("ignoring link establishment while {}", inner.state.name());
            return;
        };

        let peripheral = peripheral.clone();
        if let Err(err) = self.transport.discover_services(&peripheral) {
            warn!("transport refused service discovery on {}: {}", peripheral, err);
            self.teardown(inner, peripheral.clone());
            self.publish(SessionEvent::InvalidDevice(peripheral));
            return;
        }

        self.transition(inner, SessionState::DiscoveringServices(peripheral));
    }

    fn on_link_lost(&self, inner: &mut Inner) {
        inner.pending_connect = None;
        let lost = match &inner.state {
            SessionState::Idle => None,
            SessionState::Connecting(p) | SessionState::DiscoveringServices(p) => {
                let p = p.clone();
                warn!("lost {} before it became usable", p);
                Some(p)
            }
            state => {
                info!("link to {:?} lost", state.peripheral());
                None
            }
        };

        self.transition(inner, SessionState::Idle);
        if let Some(peripheral) = lost {
            self.publish(SessionEvent::InvalidDevice(peripheral));
        }
    }

    fn on_services_discovered(&self, inner: &mut Inner, services: &[DiscoveredService]) {
        let SessionState::DiscoveringServices(peripheral) = &inner.state else {
            debug!("ignoring discovery result while {}", inner.state.name());
            return;
        };
        let peripheral = peripheral.clone();

        match self.catalogue.first_match(services) {
            Some(service) => {
                info!("{} exposes {}", peripheral, service.label());
                inner.pending_connect = None;
                let active = ActiveSession::new(peripheral, service, &self.registry);
                self.transition(inner, SessionState::Active(active));
            }
            None => {
                warn!("{} exposes no known service", peripheral);
                self.teardown(inner, peripheral.clone());
                self.publish(SessionEvent::InvalidDevice(peripheral));
            }
        }
    }

    fn apply_value(&self, inner: &mut Inner, id: CharacteristicId, bytes: &[u8], origin: ValueOrigin) {
        let Inner { state, reads, .. } = inner;
        let state_name = state.name();
        let SessionState::Active(active) = state else {
            debug!("dropping value of {} while {}", id, state_name);
            return;
        };

        if !active.contains(&id) {
            warn!("dropping value of {} which is not part of {}", id, active.label);
        } else {
            match self.registry.decode(&id, bytes) {
                Ok(value) => {
                    let _ = active.set(&id, value.clone());
                    self.publish(SessionEvent::ValueUpdated {
                        characteristic: id,
                        value,
                    });
                }
                Err(error) => {
                    warn!("failed to decode {} from {:02x?}: {}", id, bytes, error);
                    self.publish(SessionEvent::DecodeFailed {
                        characteristic: id,
                        error,
                    });
                }
            }
        }

        if origin == ValueOrigin::Read {
            if reads.in_flight() != Some(id) {
                debug!("read completion of {} does not match head {:?}", id, reads.in_flight());
            }
            let peripheral = &active.peripheral;
            let advance = reads.on_read_completed(|next| self.transport.read_characteristic(peripheral, next));
            for (characteristic, err) in advance.rejected {
                self.publish(SessionEvent::ReadRejected {
                    characteristic,
                    error: err.kind(),
                });
            }
        }
    }

    fn descriptor_in(
        &self,
        active: &ActiveSession,
        id: &CharacteristicId,
    ) -> Result<&CharacteristicDescriptor, SessionError> {
        if !active.contains(id) {
            return Err(SessionError::UnsupportedOperation);
        }
        self.registry.get(id).ok_or(SessionError::UnsupportedOperation)
    }

    fn transition(&self, inner: &mut Inner, state: SessionState) {
        if inner.state == state {
            return;
        }
        if !matches!(state, SessionState::Active(_)) {
            inner.reads.reset();
            inner.notifying.clear();
        }

        info!("session {} -> {}", inner.state.name(), state.name());
        inner.state = state;
        self.publish(SessionEvent::StateChanged(inner.state.clone()));
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is not an error
        let _ = self.events.try_broadcast(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn active(state: &SessionState) -> Result<&ActiveSession, SessionError> {
    state.active().ok_or(SessionError::NotConnected)
}
