//! Type definitions and enumerations for LTC2943 configuration
//!
//! This module provides strongly-typed enumerations for the control register
//! fields and a decoded view of the status register. Discriminants match the
//! datasheet encoding.

use crate::registers::*;

/// ADC operating mode (control register bits 7:6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcMode {
    /// ADC off
    Sleep = 0b00,
    /// Single voltage, current and temperature conversion, then sleep
    Manual = 0b01,
    /// Voltage, current and temperature conversion every 10 seconds
    Scan = 0b10,
    /// Continuous conversion
    Automatic = 0b11,
}

impl AdcMode {
    /// Decode from the raw 2-bit field value
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => AdcMode::Manual,
            0b10 => AdcMode::Scan,
            0b11 => AdcMode::Automatic,
            _ => AdcMode::Sleep,
        }
    }

    /// Raw 2-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Coulomb counter prescaler M (control register bits 5:3)
///
/// Scales how many charge quanta accumulate per count of the
/// accumulated-charge register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    M1 = 0b000,
    M4 = 0b001,
    M16 = 0b010,
    M64 = 0b011,
    M256 = 0b100,
    M1024 = 0b101,
    M4096 = 0b110,
}

impl Prescaler {
    /// Decode from the raw 3-bit field value.
    ///
    /// The reserved encoding 0b111 also selects M = 4096 on this device.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Prescaler::M1,
            0b001 => Prescaler::M4,
            0b010 => Prescaler::M16,
            0b011 => Prescaler::M64,
            0b100 => Prescaler::M256,
            0b101 => Prescaler::M1024,
            _ => Prescaler::M4096,
        }
    }

    /// Raw 3-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// The prescaler ratio M
    pub const fn ratio(self) -> u16 {
        match self {
            Prescaler::M1 => 1,
            Prescaler::M4 => 4,
            Prescaler::M16 => 16,
            Prescaler::M64 => 64,
            Prescaler::M256 => 256,
            Prescaler::M1024 => 1024,
            Prescaler::M4096 => 4096,
        }
    }
}

/// AL#/CC# pin configuration (control register bits 2:1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AlccMode {
    /// Pin disabled
    Disabled = 0b00,
    /// Pin driven low when the accumulator reaches the charge-complete value
    ChargeComplete = 0b01,
    /// Pin pulls the shared alert line low on any alert condition
    Alert = 0b10,
}

impl AlccMode {
    /// Decode from the raw 2-bit field value.
    ///
    /// The encoding 0b11 is not allowed on this device and decodes as
    /// `Disabled`.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => AlccMode::ChargeComplete,
            0b10 => AlccMode::Alert,
            _ => AlccMode::Disabled,
        }
    }

    /// Raw 2-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Decoded status register flags
///
/// Each flag is an independent bit of the status byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// The part has been power cycled or VCC dropped below the UVLO level
    pub undervoltage_lockout: bool,
    /// Voltage outside the configured threshold window
    pub voltage_alert: bool,
    /// Accumulated charge fell below the low threshold
    pub charge_alert_low: bool,
    /// Accumulated charge exceeded the high threshold
    pub charge_alert_high: bool,
    /// Temperature outside the configured threshold window
    pub temperature_alert: bool,
    /// The accumulated-charge register overflowed or underflowed
    pub accumulated_charge_overflow: bool,
    /// Current outside the configured threshold window
    pub current_alert: bool,
}

impl Status {
    /// Decode the raw status register byte
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            undervoltage_lockout: bits & (1 << STATUS_BIT_UNDERVOLTAGE_LOCKOUT) != 0,
            voltage_alert: bits & (1 << STATUS_BIT_VOLTAGE_ALERT) != 0,
            charge_alert_low: bits & (1 << STATUS_BIT_CHARGE_ALERT_LOW) != 0,
            charge_alert_high: bits & (1 << STATUS_BIT_CHARGE_ALERT_HIGH) != 0,
            temperature_alert: bits & (1 << STATUS_BIT_TEMPERATURE_ALERT) != 0,
            accumulated_charge_overflow: bits & (1 << STATUS_BIT_ACCUM_CHARGE_OVERFLOW) != 0,
            current_alert: bits & (1 << STATUS_BIT_CURRENT_ALERT) != 0,
        }
    }

    /// True if any alert flag is set
    pub const fn any_alert(&self) -> bool {
        self.undervoltage_lockout
            || self.voltage_alert
            || self.charge_alert_low
            || self.charge_alert_high
            || self.temperature_alert
            || self.accumulated_charge_overflow
            || self.current_alert
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn adc_mode_round_trip() {
        for mode in [
            AdcMode::Sleep,
            AdcMode::Manual,
            AdcMode::Scan,
            AdcMode::Automatic,
        ] {
            assert_eq!(AdcMode::from_bits(mode.bits()), mode);
        }
    }

    #[test]
    fn prescaler_round_trip() {
        for prescaler in [
            Prescaler::M1,
            Prescaler::M4,
            Prescaler::M16,
            Prescaler::M64,
            Prescaler::M256,
            Prescaler::M1024,
            Prescaler::M4096,
        ] {
            assert_eq!(Prescaler::from_bits(prescaler.bits()), prescaler);
        }
    }

    #[test]
    fn prescaler_reserved_encoding_selects_m4096() {
        assert_eq!(Prescaler::from_bits(0b111), Prescaler::M4096);
    }

    #[test]
    fn alcc_reserved_encoding_decodes_as_disabled() {
        assert_eq!(AlccMode::from_bits(0b11), AlccMode::Disabled);
    }

    #[test]
    fn status_decodes_independent_bits() {
        let status = Status::from_bits(0b0101_0010);
        assert!(status.current_alert);
        assert!(status.temperature_alert);
        assert!(status.voltage_alert);
        assert!(!status.undervoltage_lockout);
        assert!(!status.charge_alert_low);
        assert!(!status.charge_alert_high);
        assert!(!status.accumulated_charge_overflow);
        assert!(status.any_alert());

        assert_eq!(Status::from_bits(0), Status::default());
        assert!(!Status::from_bits(0).any_alert());
    }
}
