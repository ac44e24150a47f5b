//! The fixed set of services a session will accept.

use smallvec::SmallVec;
use tracing::debug;

use crate::btuuid::{characteristics, services};
use crate::codec::CodecRegistry;
use crate::error::ErrorKind;
use crate::transport::DiscoveredService;
use crate::{CharacteristicId, Error, Result, ServiceId, Uuid};

/// A known GATT service and the characteristics the session exposes for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    id: ServiceId,
    label: &'static str,
    characteristics: SmallVec<[CharacteristicId; 4]>,
}

impl ServiceDescriptor {
    /// Creates a descriptor. Characteristic order is preserved for display and for [`Session::read_all`].
    ///
    /// [`Session::read_all`]: crate::Session::read_all
    pub fn new(id: ServiceId, label: &'static str, characteristics: impl IntoIterator<Item = CharacteristicId>) -> Self {
        ServiceDescriptor {
            id,
            label,
            characteristics: characteristics.into_iter().collect(),
        }
    }

    /// The service UUID
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Characteristics in declaration order
    pub fn characteristics(&self) -> &[CharacteristicId] {
        &self.characteristics
    }

    /// Whether `id` belongs to this service
    pub fn contains(&self, id: &CharacteristicId) -> bool {
        self.characteristics.contains(id)
    }
}

/// Ordered, validated list of [`ServiceDescriptor`]s.
///
/// Order matters: when a peripheral exposes several known services, the one listed first here is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalogue {
    services: Vec<ServiceDescriptor>,
}

impl ServiceCatalogue {
    /// Builds a catalogue, checking that service ids are unique, that no service lists a characteristic twice and
    /// that every characteristic is known to `registry`.
    pub fn new(services: impl IntoIterator<Item = ServiceDescriptor>, registry: &CodecRegistry) -> Result<Self> {
        let services: Vec<ServiceDescriptor> = services.into_iter().collect();

        for (i, service) in services.iter().enumerate() {
            if services[..i].iter().any(|x| x.id == service.id) {
                return Err(invalid(format!("service {} listed twice", service.id)));
            }
            for (j, id) in service.characteristics.iter().enumerate() {
                if service.characteristics[..j].contains(id) {
                    return Err(invalid(format!(
                        "characteristic {} listed twice in service {}",
                        id, service.label
                    )));
                }
                if !registry.contains(id) {
                    return Err(invalid(format!(
                        "characteristic {} of service {} has no codec",
                        id, service.label
                    )));
                }
            }
        }

        Ok(ServiceCatalogue { services })
    }

    /// The weather and light services, in that order
    pub fn standard(registry: &CodecRegistry) -> Result<Self> {
        ServiceCatalogue::new(
            [
                ServiceDescriptor::new(
                    ServiceId::new(services::IPVS_WEATHER),
                    "IPVSWeather",
                    [
                        CharacteristicId::new(characteristics::TEMPERATURE_MEASUREMENT),
                        CharacteristicId::new(characteristics::HUMIDITY),
                    ],
                ),
                ServiceDescriptor::new(
                    ServiceId::new(services::IPVS_LIGHT),
                    "IPVSLight",
                    [CharacteristicId::new(characteristics::INTENSITY)],
                ),
            ],
            registry,
        )
    }

    /// Looks up a service by id
    pub fn get(&self, id: &ServiceId) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|x| x.id == *id)
    }

    /// Services in catalogue order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> + '_ {
        self.services.iter()
    }

    /// Returns the first catalogue entry (in catalogue order, not discovery order) present in `discovered`.
    pub fn first_match(&self, discovered: &[DiscoveredService]) -> Option<&ServiceDescriptor> {
        let found = self
            .services
            .iter()
            .find(|service| discovered.iter().any(|x| x.id == service.id));
        debug!(
            "discovered {} services, matched {:?}",
            discovered.len(),
            found.map(|x| x.label)
        );
        found
    }

    /// Returns the first catalogue entry among the service UUIDs of an advertisement, so a caller can skip
    /// peripherals that cannot become active before connecting to them.
    pub fn match_advertised(&self, advertised: &[Uuid]) -> Option<&ServiceDescriptor> {
        self.services
            .iter()
            .find(|service| advertised.contains(&service.id.uuid()))
    }
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidParameter, None, message)
}
