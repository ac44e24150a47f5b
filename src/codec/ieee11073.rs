//! IEEE-11073 20601 32-bit FLOAT, as carried by the SIG Temperature Measurement characteristic.
//!
//! The wire word is little-endian: a 24-bit two's-complement mantissa followed by a signed 8-bit base-10 exponent.

/// Length in octets of one FLOAT value
pub const FLOAT_LEN: usize = 4;

const MANTISSA_SIGN_BIT: u32 = 1 << 23;
const MANTISSA_SIGN_EXTENSION: u32 = 0xff00_0000;

// largest n with 10^n exactly representable
const MAX_EXACT_POW10: i32 = 22;

/// A decoded FLOAT: `mantissa × 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Float {
    /// Sign-extended 24-bit mantissa
    pub mantissa: i32,
    /// Base-10 exponent
    pub exponent: i8,
}

impl Float {
    /// Parses the first [`FLOAT_LEN`] octets of `bytes`. Returns `None` if fewer are available.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        let &[b0, b1, b2, exp, ..] = bytes else {
            return None;
        };

        let mut raw = u32::from_le_bytes([b0, b1, b2, 0]);
        if raw & MANTISSA_SIGN_BIT != 0 {
            raw |= MANTISSA_SIGN_EXTENSION;
        }

        Some(Float {
            mantissa: raw as i32,
            exponent: exp as i8,
        })
    }

    /// The scaled value, rounded to the nearest `f64`.
    ///
    /// Powers of ten up to `1e22` are exact in `f64`, so within that range one multiplication or division rounds
    /// once. Larger magnitudes go through the decimal parser, which rounds correctly for any exponent.
    pub fn to_f64(self) -> f64 {
        let mantissa = f64::from(self.mantissa);
        let exponent = i32::from(self.exponent);
        if exponent.abs() <= MAX_EXACT_POW10 {
            if exponent < 0 {
                mantissa / 10f64.powi(-exponent)
            } else {
                mantissa * 10f64.powi(exponent)
            }
        } else {
            format!("{}e{}", self.mantissa, self.exponent)
                .parse()
                .unwrap_or_else(|_| mantissa * 10f64.powi(exponent))
        }
    }
}
