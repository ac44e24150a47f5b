//! Characteristic codecs: conversion between raw GATT payloads and display strings.

use std::collections::HashMap;

use tracing::trace;

use crate::btuuid::characteristics;
use crate::error::{CodecError, ErrorKind};
use crate::{CharacteristicId, CharacteristicProperties, Error, Result};

pub mod ieee11073;

/// Decodes a raw payload into its display string
pub type DecodeFn = fn(&[u8]) -> Result<String, CodecError>;

/// Encodes user input into a raw payload
pub type EncodeFn = fn(&str) -> Result<Vec<u8>, CodecError>;

/// Identity, capabilities and codec of one characteristic
#[derive(Debug, Clone, Copy)]
pub struct CharacteristicDescriptor {
    id: CharacteristicId,
    label: &'static str,
    properties: CharacteristicProperties,
    decode: DecodeFn,
    encode: Option<EncodeFn>,
}

impl CharacteristicDescriptor {
    /// Creates a read-only descriptor. Use [`with_encoder`][Self::with_encoder] to make it writable.
    pub const fn new(
        id: CharacteristicId,
        label: &'static str,
        properties: CharacteristicProperties,
        decode: DecodeFn,
    ) -> Self {
        CharacteristicDescriptor {
            id,
            label,
            properties,
            decode,
            encode: None,
        }
    }

    /// Attaches an encoder
    pub const fn with_encoder(mut self, encode: EncodeFn) -> Self {
        self.encode = Some(encode);
        self
    }

    /// The characteristic this descriptor applies to
    pub fn id(&self) -> CharacteristicId {
        self.id
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Declared GATT properties
    pub fn properties(&self) -> CharacteristicProperties {
        self.properties
    }

    /// Whether reads are allowed
    pub fn supports_read(&self) -> bool {
        self.properties.read
    }

    /// Writable characteristics must both declare the property and carry an encoder.
    pub fn supports_write(&self) -> bool {
        (self.properties.write || self.properties.write_without_response) && self.encode.is_some()
    }

    /// Whether notifications or indications can be enabled
    pub fn supports_notify(&self) -> bool {
        self.properties.notify || self.properties.indicate
    }

    /// Decodes `bytes` with this characteristic's wire format
    pub fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        (self.decode)(bytes)
    }

    /// Encodes `text` with this characteristic's wire format
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let encode = self.encode.ok_or(CodecError::WriteUnsupported)?;
        encode(text)
    }
}

/// Table of every characteristic the crate knows how to interpret.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    descriptors: Vec<CharacteristicDescriptor>,
    index: HashMap<CharacteristicId, usize>,
}

impl CodecRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of the supported weather and light peripherals
    pub fn standard() -> Self {
        let descriptors = vec![
            CharacteristicDescriptor::new(
                CharacteristicId::new(characteristics::TEMPERATURE_MEASUREMENT),
                "Temperature",
                CharacteristicProperties::READ_NOTIFY,
                decode_temperature,
            ),
            CharacteristicDescriptor::new(
                CharacteristicId::new(characteristics::HUMIDITY),
                "Humidity",
                CharacteristicProperties::READ_NOTIFY,
                decode_humidity,
            ),
            CharacteristicDescriptor::new(
                CharacteristicId::new(characteristics::INTENSITY),
                "Intensity",
                CharacteristicProperties::READ_WRITE,
                decode_intensity,
            )
            .with_encoder(encode_intensity),
        ];
        let index = descriptors.iter().enumerate().map(|(i, x)| (x.id, i)).collect();
        CodecRegistry { descriptors, index }
    }

    /// Adds `descriptor`. Fails if its id is already registered.
    pub fn register(&mut self, descriptor: CharacteristicDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.id) {
            return Err(Error::new(
                ErrorKind::InvalidParameter,
                None,
                format!("characteristic {} registered twice", descriptor.id),
            ));
        }
        let _ = self.index.insert(descriptor.id, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// The descriptor registered for `id`
    pub fn get(&self, id: &CharacteristicId) -> Option<&CharacteristicDescriptor> {
        self.index.get(id).map(|&i| &self.descriptors[i])
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &CharacteristicId) -> bool {
        self.index.contains_key(id)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CharacteristicDescriptor> + '_ {
        self.descriptors.iter()
    }

    /// Decodes a payload received for `id`
    pub fn decode(&self, id: &CharacteristicId, bytes: &[u8]) -> Result<String, CodecError> {
        let descriptor = self.get(id).ok_or(CodecError::UnknownCharacteristic)?;
        let res = descriptor.decode(bytes);
        trace!("decoded {} {:02x?}: {:?}", descriptor.label, bytes, res);
        res
    }

    /// Encodes user input for a write to `id`
    pub fn encode(&self, id: &CharacteristicId, text: &str) -> Result<Vec<u8>, CodecError> {
        self.get(id).ok_or(CodecError::UnknownCharacteristic)?.encode(text)
    }
}

/// Reads the first two octets of `bytes`, zero-padded to a little-endian `u32`.
fn le_u16_payload(bytes: &[u8]) -> Result<u32, CodecError> {
    match *bytes {
        [lo, hi, ..] => Ok(u32::from_le_bytes([lo, hi, 0, 0])),
        _ => Err(CodecError::MalformedPayload),
    }
}

/// Temperature Measurement: a flags octet followed by an IEEE-11073 FLOAT in degrees Celsius.
pub fn decode_temperature(bytes: &[u8]) -> Result<String, CodecError> {
    let payload = bytes.get(1..).ok_or(CodecError::MalformedPayload)?;
    let float = ieee11073::Float::from_le_bytes(payload).ok_or(CodecError::MalformedPayload)?;
    Ok(format!("{:?}°C", float.to_f64()))
}

/// Humidity in hundredths of a percent, rendered with two decimals.
pub fn decode_humidity(bytes: &[u8]) -> Result<String, CodecError> {
    let n = le_u16_payload(bytes)?;
    Ok(format!("{}.{:02}%", n / 100, n % 100))
}

/// Intensity as a plain integer.
pub fn decode_intensity(bytes: &[u8]) -> Result<String, CodecError> {
    le_u16_payload(bytes).map(|n| n.to_string())
}

/// Parses a plain decimal integer no larger than `0xFFFF` and emits it as two little-endian octets.
///
/// Only ASCII digits are accepted: no sign, whitespace or separators.
pub fn encode_intensity(text: &str) -> Result<Vec<u8>, CodecError> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidValue);
    }
    let n: u32 = text.parse().map_err(|_| CodecError::InvalidValue)?;
    let n = u16::try_from(n).map_err(|_| CodecError::InvalidValue)?;
    Ok(n.to_le_bytes().to_vec())
}
