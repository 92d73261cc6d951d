// src/hardware/sfloat.rs - Health Thermometer temperature measurement codec
//
// Payload layout: flags byte (bit 0 clear = Celsius), then a 32-bit
// IEEE-11073 FLOAT: 24-bit little-endian signed mantissa, 8-bit signed
// base-10 exponent.
use thiserror::Error;

pub const PAYLOAD_LEN: usize = 5;

const EXPONENT: i8 = -2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SfloatError {
    #[error("Measurement payload too short: {0} bytes, need {PAYLOAD_LEN}")]
    TooShort(usize),
}

/// Encode a Celsius temperature with two decimal places.
pub fn encode(temp_c: f32) -> [u8; PAYLOAD_LEN] {
    let mantissa = (temp_c * 100.0).round() as i32;
    [
        0x00,
        (mantissa & 0xFF) as u8,
        ((mantissa >> 8) & 0xFF) as u8,
        ((mantissa >> 16) & 0xFF) as u8,
        EXPONENT as u8,
    ]
}

pub fn decode(data: &[u8]) -> Result<f32, SfloatError> {
    if data.len() < PAYLOAD_LEN {
        return Err(SfloatError::TooShort(data.len()));
    }
    let raw = i32::from(data[1]) | (i32::from(data[2]) << 8) | (i32::from(data[3]) << 16);
    // Sign-extend the 24-bit mantissa.
    let mantissa = (raw << 8) >> 8;
    let exponent = data[4] as i8;
    Ok(mantissa as f32 * 10f32.powi(i32::from(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        // 23.45 -> mantissa 2345 = 0x000929
        assert_eq!(encode(23.45), [0x00, 0x29, 0x09, 0x00, 0xFE]);
    }

    #[test]
    fn test_decode_encoded_temperature() {
        let decoded = decode(&encode(23.45)).unwrap();
        assert!((decoded - 23.45).abs() < 1e-4);
    }

    #[test]
    fn test_decode_negative_mantissa() {
        let decoded = decode(&encode(-12.5)).unwrap();
        assert!((decoded + 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_positive_exponent() {
        // mantissa 3, exponent +1
        let decoded = decode(&[0x00, 0x03, 0x00, 0x00, 0x01]).unwrap();
        assert!((decoded - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_short_payload() {
        assert_eq!(decode(&[0x00, 0x01, 0x02]), Err(SfloatError::TooShort(3)));
    }
}
