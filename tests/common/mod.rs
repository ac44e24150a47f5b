#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use blesense::error::ErrorKind;
use blesense::transport::{DiscoveredService, LinkEvent, Transport, TransportEvent, ValueOrigin};
use blesense::{btuuid, CharacteristicId, Error, PeripheralHandle, Result, ServiceId, Session, SessionConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(PeripheralHandle),
    Disconnect(PeripheralHandle),
    DiscoverServices(PeripheralHandle),
    Read(CharacteristicId),
    Write(CharacteristicId, Vec<u8>),
    SetNotify(CharacteristicId, bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Connect,
    Discover,
    Read,
    Write,
    SetNotify,
}

/// Records every request and accepts all of them unless told otherwise.
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    refused: Mutex<HashSet<Op>>,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<CharacteristicId> {
        self.calls()
            .into_iter()
            .filter_map(|x| match x {
                Call::Read(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn refuse(&self, op: Op) {
        let _ = self.refused.lock().unwrap().insert(op);
    }

    pub fn accept(&self, op: Op) {
        let _ = self.refused.lock().unwrap().remove(&op);
    }

    fn record(&self, op: Option<Op>, call: Call) -> Result<()> {
        if op.is_some_and(|op| self.refused.lock().unwrap().contains(&op)) {
            return Err(Error::new(ErrorKind::Busy, None, "refused by mock"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Transport for MockTransport {
    fn connect(&self, peripheral: &PeripheralHandle) -> Result<()> {
        self.record(Some(Op::Connect), Call::Connect(peripheral.clone()))
    }

    fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<()> {
        self.record(None, Call::Disconnect(peripheral.clone()))
    }

    fn discover_services(&self, peripheral: &PeripheralHandle) -> Result<()> {
        self.record(Some(Op::Discover), Call::DiscoverServices(peripheral.clone()))
    }

    fn read_characteristic(&self, _peripheral: &PeripheralHandle, characteristic: CharacteristicId) -> Result<()> {
        self.record(Some(Op::Read), Call::Read(characteristic))
    }

    fn write_characteristic(
        &self,
        _peripheral: &PeripheralHandle,
        characteristic: CharacteristicId,
        value: &[u8],
    ) -> Result<()> {
        self.record(Some(Op::Write), Call::Write(characteristic, value.to_vec()))
    }

    fn set_notify(&self, _peripheral: &PeripheralHandle, characteristic: CharacteristicId, enabled: bool) -> Result<()> {
        self.record(Some(Op::SetNotify), Call::SetNotify(characteristic, enabled))
    }
}

pub fn init_tracing() {
    use tracing::metadata::LevelFilter;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();
}

pub fn temperature() -> CharacteristicId {
    CharacteristicId::new(btuuid::characteristics::TEMPERATURE_MEASUREMENT)
}

pub fn humidity() -> CharacteristicId {
    CharacteristicId::new(btuuid::characteristics::HUMIDITY)
}

pub fn intensity() -> CharacteristicId {
    CharacteristicId::new(btuuid::characteristics::INTENSITY)
}

pub fn weather_service() -> DiscoveredService {
    DiscoveredService::new(ServiceId::new(btuuid::services::IPVS_WEATHER), [temperature(), humidity()])
}

pub fn light_service() -> DiscoveredService {
    DiscoveredService::new(ServiceId::new(btuuid::services::IPVS_LIGHT), [intensity()])
}

pub fn generic_access() -> DiscoveredService {
    DiscoveredService::new(ServiceId::new(btuuid::bluetooth_uuid_from_u16(0x1800)), [])
}

pub fn peripheral() -> PeripheralHandle {
    PeripheralHandle::new("AB:CD:EF:01:23:45")
}

pub fn new_session() -> Session<Arc<MockTransport>> {
    init_tracing();
    Session::new(Arc::new(MockTransport::default()), SessionConfig::default()).unwrap()
}

/// Drives a fresh session to `Active` on the given discovery result.
pub fn active_session(services: Vec<DiscoveredService>) -> Session<Arc<MockTransport>> {
    let session = new_session();
    session.connect(peripheral()).unwrap();
    session.handle_event(TransportEvent::Link(LinkEvent::Established));
    session.handle_event(TransportEvent::ServicesDiscovered(services));
    assert!(session.state().active().is_some(), "session did not become active");
    session.transport().clear();
    session
}

pub fn read_completed(id: CharacteristicId, value: &[u8]) -> TransportEvent {
    TransportEvent::Value {
        characteristic: id,
        value: value.to_vec(),
        origin: ValueOrigin::Read,
    }
}

pub fn notified(id: CharacteristicId, value: &[u8]) -> TransportEvent {
    TransportEvent::Value {
        characteristic: id,
        value: value.to_vec(),
        origin: ValueOrigin::Notification,
    }
}
