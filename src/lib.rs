#![warn(missing_docs)]

//! Blesense is the session layer between a platform [Bluetooth Low Energy] (BLE) binding and an application that
//! talks to a small, fixed catalogue of sensor and actuator peripherals: a weather station exposing temperature and
//! humidity, and a light exposing a writable intensity.
//!
//! [Bluetooth Low Energy]: https://www.bluetooth.com/specifications/specs/
//!
//! The crate does not scan, pair, or talk to the radio. It drives a [`Transport`][transport::Transport]
//! implemented on top of the platform's GATT client and receives everything the platform observes as
//! [`TransportEvent`][transport::TransportEvent]s through one ordered channel.
//!
//! # Usage
//!
//! ```rust,no_run
//!# use std::sync::Arc;
//!# use blesense::transport::{self, Transport};
//!# use blesense::{btuuid, CharacteristicId, PeripheralHandle, Session, SessionConfig};
//!# async fn example(platform: impl Transport + 'static, events: transport::EventReceiver) -> Result<(), Box<dyn std::error::Error>> {
//!let session = Arc::new(Session::new(platform, SessionConfig::default())?);
//!
//!// the platform binding pushes link, discovery and value events into `events`
//!let pump = session.clone();
//!std::thread::spawn(move || futures_lite::future::block_on(pump.run(events)));
//!
//!session
//!    .connect_with_timeout(PeripheralHandle::new("AB:CD:EF:01:23:45"), None)
//!    .await?;
//!session.read(CharacteristicId::new(btuuid::characteristics::TEMPERATURE_MEASUREMENT))?;
//!#    Ok(())
//!# }
//! ```
//!
//! # Overview
//!
//! - [`codec`]: the [`CodecRegistry`] converting raw payloads to display strings and back, including the
//!   IEEE-11073 FLOAT used by the SIG Temperature Measurement characteristic.
//! - [`catalogue`]: the [`ServiceCatalogue`] of services a session accepts, checked against the registry when it is
//!   built.
//! - [`queue`]: the [`ReadQueue`][queue::ReadQueue] that keeps at most one read outstanding on the transport.
//! - [`Session`]: the connection state machine. It gates reads, writes and notification changes on the current
//!   [`SessionState`] and publishes [`SessionEvent`]s.
//!
//! # Concurrency
//!
//! A `Session` serializes every caller operation and every transport event through one lock, so it can be shared
//! freely. Transports must report results through the event channel rather than calling back into the session from
//! inside a [`Transport`][transport::Transport] method.
//!
//! # Feature flags
//!
//! The `serde` feature is available to enable serializing/deserializing identifiers and [`SessionConfig`].

pub mod btuuid;
pub mod catalogue;
pub mod codec;
mod config;
pub mod error;
pub mod queue;
mod session;
mod state;
pub mod transport;
mod types;

pub use btuuid::BluetoothUuidExt;
pub use catalogue::{ServiceCatalogue, ServiceDescriptor};
pub use codec::{CharacteristicDescriptor, CodecRegistry};
pub use config::{SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_EVENT_CAPACITY};
pub use error::{CodecError, Error, SessionError};
pub use session::Session;
pub use state::{ActiveSession, CharacteristicValue, SessionEvent, SessionState, UNSET_VALUE};
pub use types::{CharacteristicId, PeripheralHandle, ServiceId};
pub use uuid::Uuid;

/// Convenience alias for a result with [`Error`]
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// GATT characteristic properties as defined in the Bluetooth Core Specification, Vol 3, Part G, §3.3.1.1.
/// Extended properties are also included as defined in §3.3.3.1.
#[allow(missing_docs)]
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacteristicProperties {
    pub broadcast: bool,
    pub read: bool,
    pub write_without_response: bool,
    pub write: bool,
    pub notify: bool,
    pub indicate: bool,
    pub authenticated_signed_writes: bool,
    pub extended_properties: bool,
    pub reliable_write: bool,
    pub writable_auxiliaries: bool,
}

impl CharacteristicProperties {
    /// Readable sensor value that can also be pushed
    pub const READ_NOTIFY: Self = Self::from_bits((1 << 1) | (1 << 4));

    /// Readable and writable value
    pub const READ_WRITE: Self = Self::from_bits((1 << 1) | (1 << 3));

    /// Raw transmutation from [`u32`].
    ///
    /// Extended properties are in the upper bits.
    pub const fn from_bits(bits: u32) -> Self {
        CharacteristicProperties {
            broadcast: (bits & (1 << 0)) != 0,
            read: (bits & (1 << 1)) != 0,
            write_without_response: (bits & (1 << 2)) != 0,
            write: (bits & (1 << 3)) != 0,
            notify: (bits & (1 << 4)) != 0,
            indicate: (bits & (1 << 5)) != 0,
            authenticated_signed_writes: (bits & (1 << 6)) != 0,
            extended_properties: (bits & (1 << 7)) != 0,
            reliable_write: (bits & (1 << 8)) != 0,
            writable_auxiliaries: (bits & (1 << 9)) != 0,
        }
    }
}
