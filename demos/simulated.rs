use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blesense::error::ErrorKind;
use blesense::transport::{self, DiscoveredService, EventSender, LinkEvent, Transport, TransportEvent, ValueOrigin};
use blesense::{btuuid, CharacteristicId, PeripheralHandle, Result, ServiceId, Session, SessionConfig, SessionEvent};
use futures_lite::StreamExt;
use tracing::{info, metadata::LevelFilter, warn};

const TEMPERATURE: CharacteristicId = CharacteristicId::new(btuuid::characteristics::TEMPERATURE_MEASUREMENT);
const HUMIDITY: CharacteristicId = CharacteristicId::new(btuuid::characteristics::HUMIDITY);

/// A weather station that answers from memory instead of over the air
struct SimulatedWeatherStation {
    events: EventSender,
    connected: AtomicBool,
    notifying: AtomicBool,
    // tenths of a degree
    temperature: AtomicU32,
}

impl SimulatedWeatherStation {
    fn push(&self, event: TransportEvent) -> Result<()> {
        self.events
            .try_send(event)
            .map_err(|_| blesense::Error::new(ErrorKind::NotConnected, None, "event channel closed"))
    }

    fn temperature_payload(&self) -> Vec<u8> {
        let mantissa = self.temperature.load(Ordering::Relaxed).to_le_bytes();
        vec![0x00, mantissa[0], mantissa[1], mantissa[2], 0xff]
    }

    fn tick(&self) -> Result<()> {
        let _ = self.temperature.fetch_add(3, Ordering::Relaxed);
        if self.notifying.load(Ordering::Relaxed) {
            self.push(TransportEvent::Value {
                characteristic: TEMPERATURE,
                value: self.temperature_payload(),
                origin: ValueOrigin::Notification,
            })?;
        }
        Ok(())
    }

    fn require_link(&self) -> Result<()> {
        if self.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(ErrorKind::NotConnected.into())
        }
    }
}

impl Transport for SimulatedWeatherStation {
    fn connect(&self, _peripheral: &PeripheralHandle) -> Result<()> {
        self.connected.store(true, Ordering::Relaxed);
        self.push(TransportEvent::Link(LinkEvent::Established))
    }

    fn disconnect(&self, _peripheral: &PeripheralHandle) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        self.notifying.store(false, Ordering::Relaxed);
        self.push(TransportEvent::Link(LinkEvent::Lost))
    }

    fn discover_services(&self, _peripheral: &PeripheralHandle) -> Result<()> {
        self.require_link()?;
        self.push(TransportEvent::ServicesDiscovered(vec![
            DiscoveredService::new(ServiceId::new(btuuid::bluetooth_uuid_from_u16(0x1800)), []),
            DiscoveredService::new(ServiceId::new(btuuid::services::IPVS_WEATHER), [TEMPERATURE, HUMIDITY]),
        ]))
    }

    fn read_characteristic(&self, _peripheral: &PeripheralHandle, characteristic: CharacteristicId) -> Result<()> {
        self.require_link()?;
        let value = if characteristic == TEMPERATURE {
            self.temperature_payload()
        } else if characteristic == HUMIDITY {
            4_321u16.to_le_bytes().to_vec()
        } else {
            return Err(ErrorKind::NotFound.into());
        };
        self.push(TransportEvent::Value {
            characteristic,
            value,
            origin: ValueOrigin::Read,
        })
    }

    fn write_characteristic(&self, _peripheral: &PeripheralHandle, _: CharacteristicId, _: &[u8]) -> Result<()> {
        Err(ErrorKind::NotSupported.into())
    }

    fn set_notify(&self, _peripheral: &PeripheralHandle, characteristic: CharacteristicId, enabled: bool) -> Result<()> {
        self.require_link()?;
        if characteristic != TEMPERATURE {
            return Err(ErrorKind::NotSupported.into());
        }
        self.notifying.store(enabled, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let (sender, receiver) = transport::channel();
    let station = Arc::new(SimulatedWeatherStation {
        events: sender,
        connected: AtomicBool::new(false),
        notifying: AtomicBool::new(false),
        temperature: AtomicU32::new(215),
    });

    let session = Arc::new(Session::new(station.clone(), SessionConfig::default())?);
    let pump = session.clone();
    let _ = tokio::spawn(async move { pump.run(receiver).await });

    let mut updates = session.events();
    let printer = tokio::spawn(async move {
        while let Some(event) = updates.next().await {
            match event {
                SessionEvent::ValueUpdated { characteristic, value } => info!("{} = {}", characteristic, value),
                SessionEvent::DecodeFailed { characteristic, error } => warn!("{}: {}", characteristic, error),
                SessionEvent::InvalidDevice(peripheral) => warn!("{} is not a supported device", peripheral),
                _ => {}
            }
        }
    });

    session
        .connect_with_timeout(PeripheralHandle::new("SIM:WE:AT:HE:R0:01"), None)
        .await?;
    info!("connected!");

    session.read_all()?;
    session.set_notifications(TEMPERATURE, true)?;

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        station.tick()?;
    }

    for line in session.state().render_lines() {
        info!("{}", line);
    }

    session.disconnect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();
    info!("done");

    Ok(())
}
