//! Register addresses, bit fields and conversion math for the LTC2943
//!
//! This module defines all register addresses, control/status bit fields and
//! the raw-to-engineering-unit conversions for the LTC2943 coulomb counter.
//! All multi-byte registers are 16-bit big-endian.

/// Status register - Latched alert flags
pub const LTC2943_STATUS: u8 = 0x00;

/// Control register - ADC mode, prescaler, ALCC pin configuration, shutdown
pub const LTC2943_CONTROL: u8 = 0x01;

/// Accumulated charge register (MSB) - 16-bit coulomb counter value
pub const LTC2943_ACCUM_CHARGE_MSB: u8 = 0x02;

/// Charge threshold high register (MSB) - Alert when the accumulator exceeds this
pub const LTC2943_CHARGE_THRESHOLD_HIGH_MSB: u8 = 0x04;

/// Charge threshold low register (MSB) - Alert when the accumulator falls below this
pub const LTC2943_CHARGE_THRESHOLD_LOW_MSB: u8 = 0x06;

/// Voltage register (MSB) - Latest battery voltage ADC result
pub const LTC2943_VOLTAGE_MSB: u8 = 0x08;

/// Voltage threshold high register (MSB)
pub const LTC2943_VOLTAGE_THRESHOLD_HIGH_MSB: u8 = 0x0A;

/// Voltage threshold low register (MSB)
pub const LTC2943_VOLTAGE_THRESHOLD_LOW_MSB: u8 = 0x0C;

/// Current register (MSB) - Latest sense-resistor current ADC result
pub const LTC2943_CURRENT_MSB: u8 = 0x0E;

/// Current threshold high register (MSB)
pub const LTC2943_CURRENT_THRESHOLD_HIGH_MSB: u8 = 0x10;

/// Current threshold low register (MSB)
pub const LTC2943_CURRENT_THRESHOLD_LOW_MSB: u8 = 0x12;

/// Temperature register (MSB) - Latest die temperature ADC result
pub const LTC2943_TEMPERATURE_MSB: u8 = 0x14;

/// Temperature threshold high register - Single byte, compared against the
/// temperature MSB
pub const LTC2943_TEMPERATURE_THRESHOLD_HIGH: u8 = 0x16;

/// Temperature threshold low register - Single byte, compared against the
/// temperature MSB
pub const LTC2943_TEMPERATURE_THRESHOLD_LOW: u8 = 0x17;

/// Default 7-bit I2C address
pub const LTC2943_SLAVE_ADDRESS: u8 = 0x64;

/// Fixed SMBus Alert Response Address shared by the device family
pub const LTC2943_ALERT_RESPONSE_ADDRESS: u8 = 0x0C;

/// A sub-byte field of an 8-bit register, described as
/// (register, bit offset, bit width).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    /// Register address containing the field
    pub register: u8,
    /// Offset of the least significant bit
    pub offset: u8,
    /// Width of the field in bits
    pub width: u8,
}

impl BitField {
    /// Create a new bit field descriptor
    pub const fn new(register: u8, offset: u8, width: u8) -> Self {
        Self {
            register,
            offset,
            width,
        }
    }

    /// Mask for the field value before shifting (e.g. `0b11` for a 2-bit field)
    pub const fn value_mask(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// Mask for the field within its register byte
    pub const fn register_mask(&self) -> u8 {
        self.value_mask() << self.offset
    }
}

/// ADC mode field - control register bits 7:6
pub const FIELD_ADC_MODE: BitField = BitField::new(LTC2943_CONTROL, 6, 2);

/// Prescaler field - control register bits 5:3
pub const FIELD_PRESCALER: BitField = BitField::new(LTC2943_CONTROL, 3, 3);

/// ALCC pin configuration field - control register bits 2:1
pub const FIELD_ALCC_MODE: BitField = BitField::new(LTC2943_CONTROL, 1, 2);

/// Shutdown field - control register bit 0
pub const FIELD_SHUTDOWN: BitField = BitField::new(LTC2943_CONTROL, 0, 1);

// Status register bit positions
pub const STATUS_BIT_UNDERVOLTAGE_LOCKOUT: u8 = 0;
pub const STATUS_BIT_VOLTAGE_ALERT: u8 = 1;
pub const STATUS_BIT_CHARGE_ALERT_LOW: u8 = 2;
pub const STATUS_BIT_CHARGE_ALERT_HIGH: u8 = 3;
pub const STATUS_BIT_TEMPERATURE_ALERT: u8 = 4;
pub const STATUS_BIT_ACCUM_CHARGE_OVERFLOW: u8 = 5;
pub const STATUS_BIT_CURRENT_ALERT: u8 = 6;

/// Accumulator value written by a charge reset, the "battery full" sentinel
pub const LTC2943_CHARGE_FULL: u16 = 0xFFFF;

// Conversion constants
/// Full-scale battery voltage in volts
pub const LTC2943_FULLSCALE_VOLTAGE: f32 = 23.6;
/// Temperature span in kelvin across the 16-bit range
pub const LTC2943_TEMPERATURE_SPAN: f32 = 510.0;
/// Offset from kelvin to degrees Celsius
pub const LTC2943_KELVIN_OFFSET: f32 = 273.15;
/// Full-scale sense voltage in volts (±60 mV)
pub const LTC2943_FULLSCALE_SENSE_VOLTAGE: f32 = 0.06;
/// Default sense resistance in ohms
pub const LTC2943_DEFAULT_SENSE_RESISTANCE: f32 = 0.002;

/// Convert a raw 16-bit voltage register value to volts
#[inline]
pub fn voltage_from_raw(raw: u16) -> f32 {
    LTC2943_FULLSCALE_VOLTAGE * raw as f32 / 65535.0
}

/// Convert volts to the nearest raw 16-bit register value, saturating at the
/// register range
#[inline]
pub fn raw_from_voltage(volts: f32) -> u16 {
    (volts / LTC2943_FULLSCALE_VOLTAGE * 65535.0 + 0.5) as u16
}

/// Convert a raw 16-bit temperature register value to degrees Celsius
#[inline]
pub fn temperature_from_raw(raw: u16) -> f32 {
    LTC2943_TEMPERATURE_SPAN * raw as f32 / 65535.0 - LTC2943_KELVIN_OFFSET
}

/// Convert degrees Celsius to the nearest raw 16-bit register value,
/// saturating at the register range
#[inline]
pub fn raw_from_temperature(celsius: f32) -> u16 {
    ((celsius + LTC2943_KELVIN_OFFSET) / LTC2943_TEMPERATURE_SPAN * 65535.0 + 0.5) as u16
}

/// Convert a raw 8-bit temperature threshold value to degrees Celsius.
///
/// The threshold registers are one byte wide and compare against the
/// temperature MSB only.
#[inline]
pub fn temperature_from_raw_threshold(raw: u8) -> f32 {
    LTC2943_TEMPERATURE_SPAN * raw as f32 / 255.0 - LTC2943_KELVIN_OFFSET
}

/// Convert degrees Celsius to the nearest raw 8-bit threshold value,
/// saturating at the register range
#[inline]
pub fn raw_threshold_from_temperature(celsius: f32) -> u8 {
    ((celsius + LTC2943_KELVIN_OFFSET) / LTC2943_TEMPERATURE_SPAN * 255.0 + 0.5) as u8
}

/// Convert a raw 16-bit current register value to amps.
///
/// The register is centered at 0x7FFF; full scale is ±60 mV across the sense
/// resistor.
#[inline]
pub fn current_from_raw(raw: u16, sense_resistance: f32) -> f32 {
    (LTC2943_FULLSCALE_SENSE_VOLTAGE / sense_resistance) * (raw as f32 - 32767.0) / 32767.0
}

/// Convert amps to the nearest raw 16-bit register value, saturating at the
/// register range
#[inline]
pub fn raw_from_current(amps: f32, sense_resistance: f32) -> u16 {
    let full_scale = LTC2943_FULLSCALE_SENSE_VOLTAGE / sense_resistance;
    (amps / full_scale * 32767.0 + 32767.0 + 0.5) as u16
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    const R_SENSE: f32 = LTC2943_DEFAULT_SENSE_RESISTANCE;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    #[test]
    fn voltage_endpoints() {
        assert_close(voltage_from_raw(0), 0.0);
        assert_close(voltage_from_raw(0xFFFF), 23.6);
    }

    #[test]
    fn voltage_is_monotonic() {
        let mut prev = voltage_from_raw(0);
        for raw in (0..=0xFFFFu16).step_by(257) {
            let v = voltage_from_raw(raw);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn voltage_round_trip_is_stable() {
        for volts in [0.0, 0.1, 3.3, 4.2, 11.8, 16.0, 23.6] {
            let raw = raw_from_voltage(volts);
            assert_eq!(raw_from_voltage(voltage_from_raw(raw)), raw);
        }
    }

    #[test]
    fn voltage_raw_saturates() {
        assert_eq!(raw_from_voltage(-1.0), 0);
        assert_eq!(raw_from_voltage(100.0), 0xFFFF);
    }

    #[test]
    fn temperature_endpoints() {
        assert_close(temperature_from_raw(0), -273.15);
        assert_close(temperature_from_raw(0xFFFF), 236.85);
    }

    #[test]
    fn temperature_threshold_endpoints() {
        assert_close(temperature_from_raw_threshold(0), -273.15);
        assert_close(temperature_from_raw_threshold(0xFF), 236.85);
    }

    #[test]
    fn temperature_round_trip_is_stable() {
        for celsius in [-40.0, 0.0, 25.0, 85.0, 125.0] {
            let raw = raw_from_temperature(celsius);
            assert_eq!(raw_from_temperature(temperature_from_raw(raw)), raw);

            let raw8 = raw_threshold_from_temperature(celsius);
            assert_eq!(
                raw_threshold_from_temperature(temperature_from_raw_threshold(raw8)),
                raw8
            );
        }
    }

    #[test]
    fn current_is_zero_at_midscale() {
        assert_close(current_from_raw(0x7FFF, R_SENSE), 0.0);
    }

    #[test]
    fn current_endpoints() {
        assert_close(current_from_raw(0xFFFE, R_SENSE), 30.0);
        assert_close(current_from_raw(0, R_SENSE), -30.0);
    }

    #[test]
    fn current_is_monotonic() {
        let mut prev = current_from_raw(0, R_SENSE);
        for raw in (0..=0xFFFFu16).step_by(123) {
            let a = current_from_raw(raw, R_SENSE);
            assert!(a >= prev);
            prev = a;
        }
    }

    #[test]
    fn current_round_trip_is_stable() {
        for amps in [-30.0, -1.5, 0.0, 0.25, 10.0, 30.0] {
            let raw = raw_from_current(amps, R_SENSE);
            assert_eq!(
                raw_from_current(current_from_raw(raw, R_SENSE), R_SENSE),
                raw
            );
        }
    }

    #[test]
    fn current_scales_with_sense_resistance() {
        // Halving the sense resistor doubles the full-scale current.
        assert_close(current_from_raw(0xFFFE, 0.001), 60.0);
    }

    #[test]
    fn bit_field_masks() {
        assert_eq!(FIELD_ADC_MODE.value_mask(), 0b11);
        assert_eq!(FIELD_ADC_MODE.register_mask(), 0b1100_0000);
        assert_eq!(FIELD_PRESCALER.register_mask(), 0b0011_1000);
        assert_eq!(FIELD_ALCC_MODE.register_mask(), 0b0000_0110);
        assert_eq!(FIELD_SHUTDOWN.register_mask(), 0b0000_0001);
    }
}
