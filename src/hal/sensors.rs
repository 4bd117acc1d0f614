//! Environment sensing for device management.
//!
//! The modem library has no error channel for these getters, so failures and
//! missing sensors map onto fixed sentinel values.

use std::fmt;

/// Battery level reported when no reading is available.
pub const BATTERY_UNKNOWN: u8 = 0;

/// Temperature reported when no reading is available.
pub const TEMPERATURE_UNKNOWN: i8 = -128;

/// Voltage reported when no reading is available.
pub const VOLTAGE_UNKNOWN: u8 = 0;

/// Voltage step used by the modem library (1/50 V).
pub const VOLTAGE_STEP_MV: u32 = 20;

/// Sensor read failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The application does not provide this reading.
    Unsupported,
    /// The reading failed.
    ReadFailed(String),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "sensor not supported"),
            Self::ReadFailed(e) => write!(f, "sensor read failed: {}", e),
        }
    }
}

impl std::error::Error for SensorError {}

/// Application supplied environment readings.
///
/// Every method defaults to [`SensorError::Unsupported`]; implement the ones
/// the board can measure.
pub trait EnvironmentSensors: Send {
    /// Battery level in per mille (0 = empty, 1000 = full).
    fn battery_level(&mut self) -> Result<u32, SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Temperature in degrees Celsius.
    fn temperature(&mut self) -> Result<i32, SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Supply voltage in millivolts.
    fn voltage_mv(&mut self) -> Result<u32, SensorError> {
        Err(SensorError::Unsupported)
    }
}

/// Board without environment sensors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensors;

impl EnvironmentSensors for NoSensors {}

/// Scale a per mille battery reading onto 0..=255.
pub fn scale_battery(per_mille: u32) -> u8 {
    if per_mille > 1000 {
        return 255;
    }
    // round(per_mille * 0.255) in integer arithmetic
    ((per_mille * 255 + 500) / 1000) as u8
}

/// Clamp a temperature onto the signed 8-bit range.
pub fn clamp_temperature(celsius: i32) -> i8 {
    celsius.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Convert millivolts into 20 mV steps, saturating at 255.
pub fn scale_voltage(millivolts: u32) -> u8 {
    (millivolts / VOLTAGE_STEP_MV).min(255) as u8
}

pub(crate) fn battery_or_sentinel(reading: Result<u32, SensorError>) -> u8 {
    reading.map(scale_battery).unwrap_or(BATTERY_UNKNOWN)
}

pub(crate) fn temperature_or_sentinel(reading: Result<i32, SensorError>) -> i8 {
    reading.map(clamp_temperature).unwrap_or(TEMPERATURE_UNKNOWN)
}

pub(crate) fn voltage_or_sentinel(reading: Result<u32, SensorError>) -> u8 {
    reading.map(scale_voltage).unwrap_or(VOLTAGE_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_scaling() {
        assert_eq!(scale_battery(0), 0);
        assert_eq!(scale_battery(1), 0);
        assert_eq!(scale_battery(2), 1);
        assert_eq!(scale_battery(500), 128);
        assert_eq!(scale_battery(1000), 255);
        assert_eq!(scale_battery(1001), 255);
        assert_eq!(scale_battery(u32::MAX), 255);
    }

    #[test]
    fn test_battery_scaling_matches_rounding() {
        for b in 0..=1000u32 {
            let expected = (b as f64 * 0.255).round() as u8;
            assert_eq!(scale_battery(b), expected, "battery {}", b);
        }
    }

    #[test]
    fn test_temperature_clamping() {
        assert_eq!(clamp_temperature(25), 25);
        assert_eq!(clamp_temperature(-40), -40);
        assert_eq!(clamp_temperature(127), 127);
        assert_eq!(clamp_temperature(128), 127);
        assert_eq!(clamp_temperature(-129), -128);
        assert_eq!(clamp_temperature(i32::MIN), -128);
        assert_eq!(clamp_temperature(i32::MAX), 127);
    }

    #[test]
    fn test_voltage_scaling() {
        assert_eq!(scale_voltage(0), 0);
        assert_eq!(scale_voltage(19), 0);
        assert_eq!(scale_voltage(3300), 165);
        assert_eq!(scale_voltage(5100), 255);
        assert_eq!(scale_voltage(6000), 255);
        assert_eq!(scale_voltage(u32::MAX), 255);
    }

    #[test]
    fn test_sentinels_on_error() {
        let mut sensors = NoSensors;
        assert_eq!(battery_or_sentinel(sensors.battery_level()), 0);
        assert_eq!(temperature_or_sentinel(sensors.temperature()), -128);
        assert_eq!(voltage_or_sentinel(sensors.voltage_mv()), 0);

        let failed = Err(SensorError::ReadFailed("i2c nack".into()));
        assert_eq!(temperature_or_sentinel(failed), -128);
    }
}
