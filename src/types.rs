use crate::btuuid::BluetoothUuidExt;
use crate::Uuid;

/// Identifies a GATT characteristic by its UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicId(Uuid);

/// Identifies a GATT service by its UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceId(Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            /// Wraps `uuid`
            pub const fn new(uuid: Uuid) -> Self {
                $name(uuid)
            }

            /// The wrapped [`Uuid`]
            pub const fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                $name(uuid)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.0.try_to_u16() {
                    Some(short) => write!(f, "{short:#06x}"),
                    None => std::fmt::Display::fmt(&self.0, f),
                }
            }
        }
    };
}

uuid_id!(CharacteristicId);
uuid_id!(ServiceId);

/// Opaque handle of a discovered peripheral, as handed out by the platform binding.
///
/// On Android and Linux it usually contains the Bluetooth address in the format `AB:CD:EF:01:23:45`; on Apple
/// platforms it is the CoreBluetooth peripheral identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeripheralHandle(String);

impl PeripheralHandle {
    /// Creates a handle from the platform's identifier
    pub fn new(id: impl Into<String>) -> Self {
        PeripheralHandle(id.into())
    }

    /// The platform's identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for PeripheralHandle {
    fn from(id: &str) -> Self {
        PeripheralHandle::new(id)
    }
}
