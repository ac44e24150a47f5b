//! `Uuid` extensions for Bluetooth UUIDs and the UUIDs of the supported peripherals

use uuid::Uuid;

/// This is the Bluetooth Base UUID. It is used with 16-bit and 32-bit UUIDs
/// [defined](https://www.bluetooth.com/specifications/assigned-numbers/) by the Bluetooth SIG.
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Const function to create a 16-bit Bluetooth UUID
pub const fn bluetooth_uuid_from_u16(uuid: u16) -> Uuid {
    Uuid::from_u128(((uuid as u128) << 96) | BLUETOOTH_BASE_UUID)
}

/// Extension trait for [uuid::Uuid] with helper methods for dealing with Bluetooth 16-bit UUIDs
pub trait BluetoothUuidExt: private::Sealed {
    /// Creates a 16-bit Bluetooth UUID
    fn from_u16(uuid: u16) -> Self;

    /// Returns `true` if self is a valid 16-bit Bluetooth UUID
    fn is_u16_uuid(&self) -> bool;

    /// Tries to convert self into a 16-bit Bluetooth UUID
    fn try_to_u16(&self) -> Option<u16>;
}

impl BluetoothUuidExt for Uuid {
    fn from_u16(uuid: u16) -> Self {
        bluetooth_uuid_from_u16(uuid)
    }

    fn is_u16_uuid(&self) -> bool {
        let u = self.as_u128();
        (u & ((1 << 96) - 1)) == BLUETOOTH_BASE_UUID && (((u >> 96) as u32) & 0xffff0000) == 0
    }

    fn try_to_u16(&self) -> Option<u16> {
        let u = self.as_u128();
        self.is_u16_uuid().then(|| (u >> 96) as u16)
    }
}

mod private {
    use uuid::Uuid;

    pub trait Sealed {}

    impl Sealed for Uuid {}
}

/// GATT service UUIDs of the supported peripherals
pub mod services {
    use uuid::Uuid;

    /// Light service exposing the intensity actuator
    pub const IPVS_LIGHT: Uuid = Uuid::from_u128(0x00000001_0000_0000_fdfd_fdfdfdfdfdfd);
    /// Weather service exposing temperature and humidity
    pub const IPVS_WEATHER: Uuid = Uuid::from_u128(0x00000002_0000_0000_fdfd_fdfdfdfdfdfd);
}

/// GATT characteristic UUIDs of the supported peripherals
pub mod characteristics {
    use uuid::Uuid;

    use super::bluetooth_uuid_from_u16;

    /// SIG Temperature Measurement (IEEE-11073 FLOAT payload)
    pub const TEMPERATURE_MEASUREMENT: Uuid = bluetooth_uuid_from_u16(0x2A1C);
    /// SIG Humidity (uint16, 0.01 %)
    pub const HUMIDITY: Uuid = bluetooth_uuid_from_u16(0x2A6F);
    /// Vendor light intensity (uint16)
    pub const INTENSITY: Uuid = Uuid::from_u128(0x10000001_0000_0000_fdfd_fdfdfdfdfdfd);
}
