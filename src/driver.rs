//! Synchronous LTC2943 driver implementation

use crate::{error::Error, registers::*, types::*};
use embedded_hal::i2c::I2c;

/// LTC2943 coulomb counter driver
///
/// Holds the I2C bus handle, the 7-bit device address and the sense
/// resistance used for current conversions. No register state is cached;
/// every accessor issues a fresh bus transaction.
pub struct Ltc2943<I> {
    i2c: I,
    addr: u8,
    sense_resistance: f32,
}

impl<I> Ltc2943<I>
where
    I: I2c,
{
    /// Create a new LTC2943 driver instance
    ///
    /// Uses the default device address (0x64) and the default 2 mΩ sense
    /// resistor.
    ///
    /// # Example
    /// ```no_run
    /// # use ltc2943::Ltc2943;
    /// # use embedded_hal::i2c::I2c;
    /// # fn example<I: I2c>(i2c: I) {
    /// let gauge = Ltc2943::new(i2c);
    /// # }
    /// ```
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, LTC2943_SLAVE_ADDRESS)
    }

    /// Create a new LTC2943 driver instance with a custom I2C address
    pub fn with_address(i2c: I, addr: u8) -> Self {
        Self::with_sense_resistor(i2c, addr, LTC2943_DEFAULT_SENSE_RESISTANCE)
    }

    /// Create a new LTC2943 driver instance with a custom I2C address and
    /// sense resistance in ohms
    pub fn with_sense_resistor(i2c: I, addr: u8, sense_resistance: f32) -> Self {
        Self {
            i2c,
            addr,
            sense_resistance,
        }
    }

    // ========================================
    // Low-level I2C operations
    // ========================================

    /// Read a single register
    fn read_register(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Write a single register
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c.write(self.addr, &[reg, value]).map_err(Error::I2c)
    }

    /// Read a 16-bit big-endian register pair starting at `reg`
    fn read_register_u16(&mut self, reg: u8) -> Result<u16, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a 16-bit big-endian register pair starting at `reg`
    fn write_register_u16(&mut self, reg: u8, value: u16) -> Result<(), Error<I::Error>> {
        let bytes = value.to_be_bytes();
        self.i2c
            .write(self.addr, &[reg, bytes[0], bytes[1]])
            .map_err(Error::I2c)
    }

    /// Extract a bit field from its register
    fn read_field(&mut self, field: BitField) -> Result<u8, Error<I::Error>> {
        let byte = self.read_register(field.register)?;
        Ok((byte >> field.offset) & field.value_mask())
    }

    /// Splice a bit field value into its register, leaving sibling fields
    /// untouched.
    ///
    /// Values wider than the field are rejected rather than silently masked.
    fn write_field(&mut self, field: BitField, value: u8) -> Result<(), Error<I::Error>> {
        if value & !field.value_mask() != 0 {
            return Err(Error::InvalidFieldValue);
        }
        let byte = self.read_register(field.register)?;
        let byte = (byte & !field.register_mask()) | (value << field.offset);
        self.write_register(field.register, byte)
    }

    // ========================================
    // Status
    // ========================================

    /// Read and decode the status register
    pub fn get_status(&mut self) -> Result<Status, Error<I::Error>> {
        let bits = self.read_register(LTC2943_STATUS)?;
        Ok(Status::from_bits(bits))
    }

    // ========================================
    // Control register fields
    // ========================================

    /// Get the ADC operating mode
    pub fn get_adc_mode(&mut self) -> Result<AdcMode, Error<I::Error>> {
        let bits = self.read_field(FIELD_ADC_MODE)?;
        Ok(AdcMode::from_bits(bits))
    }

    /// Set the ADC operating mode
    pub fn set_adc_mode(&mut self, mode: AdcMode) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_ADC_MODE, mode.bits())
    }

    /// Get the coulomb counter prescaler
    pub fn get_prescaler(&mut self) -> Result<Prescaler, Error<I::Error>> {
        let bits = self.read_field(FIELD_PRESCALER)?;
        Ok(Prescaler::from_bits(bits))
    }

    /// Set the coulomb counter prescaler
    pub fn set_prescaler(&mut self, prescaler: Prescaler) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_PRESCALER, prescaler.bits())
    }

    /// Get the AL#/CC# pin configuration
    pub fn get_alcc_mode(&mut self) -> Result<AlccMode, Error<I::Error>> {
        let bits = self.read_field(FIELD_ALCC_MODE)?;
        Ok(AlccMode::from_bits(bits))
    }

    /// Set the AL#/CC# pin configuration
    pub fn set_alcc_mode(&mut self, mode: AlccMode) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_ALCC_MODE, mode.bits())
    }

    /// Check whether the analog section is shut down
    pub fn is_shutdown(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.read_field(FIELD_SHUTDOWN)? != 0)
    }

    /// Shut down the analog section
    pub fn enable_shutdown(&mut self) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_SHUTDOWN, 1)
    }

    /// Resume the analog section
    pub fn disable_shutdown(&mut self) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_SHUTDOWN, 0)
    }

    // ========================================
    // Measurements
    // ========================================

    /// Get the battery voltage in volts
    pub fn get_voltage(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_VOLTAGE_MSB)?;
        Ok(voltage_from_raw(raw))
    }

    /// Get the sense-resistor current in amps.
    ///
    /// Positive values indicate charging, negative values discharging.
    pub fn get_current(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_CURRENT_MSB)?;
        Ok(current_from_raw(raw, self.sense_resistance))
    }

    /// Get the die temperature in degrees Celsius
    pub fn get_temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_TEMPERATURE_MSB)?;
        Ok(temperature_from_raw(raw))
    }

    // ========================================
    // Alert thresholds
    // ========================================

    /// Get the charge alert thresholds as raw (low, high) accumulator counts
    pub fn get_charge_thresholds(&mut self) -> Result<(u16, u16), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_CHARGE_THRESHOLD_LOW_MSB)?;
        let high = self.read_register_u16(LTC2943_CHARGE_THRESHOLD_HIGH_MSB)?;
        Ok((low, high))
    }

    /// Set the charge alert thresholds as raw (low, high) accumulator counts
    pub fn set_charge_thresholds(&mut self, low: u16, high: u16) -> Result<(), Error<I::Error>> {
        self.write_register_u16(LTC2943_CHARGE_THRESHOLD_LOW_MSB, low)?;
        self.write_register_u16(LTC2943_CHARGE_THRESHOLD_HIGH_MSB, high)
    }

    /// Get the voltage alert thresholds as (low, high) volts
    pub fn get_voltage_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_VOLTAGE_THRESHOLD_LOW_MSB)?;
        let high = self.read_register_u16(LTC2943_VOLTAGE_THRESHOLD_HIGH_MSB)?;
        Ok((voltage_from_raw(low), voltage_from_raw(high)))
    }

    /// Set the voltage alert thresholds as (low, high) volts
    pub fn set_voltage_thresholds(&mut self, low: f32, high: f32) -> Result<(), Error<I::Error>> {
        self.write_register_u16(LTC2943_VOLTAGE_THRESHOLD_LOW_MSB, raw_from_voltage(low))?;
        self.write_register_u16(LTC2943_VOLTAGE_THRESHOLD_HIGH_MSB, raw_from_voltage(high))
    }

    /// Get the current alert thresholds as (low, high) amps
    pub fn get_current_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_CURRENT_THRESHOLD_LOW_MSB)?;
        let high = self.read_register_u16(LTC2943_CURRENT_THRESHOLD_HIGH_MSB)?;
        Ok((
            current_from_raw(low, self.sense_resistance),
            current_from_raw(high, self.sense_resistance),
        ))
    }

    /// Set the current alert thresholds as (low, high) amps
    pub fn set_current_thresholds(&mut self, low: f32, high: f32) -> Result<(), Error<I::Error>> {
        self.write_register_u16(
            LTC2943_CURRENT_THRESHOLD_LOW_MSB,
            raw_from_current(low, self.sense_resistance),
        )?;
        self.write_register_u16(
            LTC2943_CURRENT_THRESHOLD_HIGH_MSB,
            raw_from_current(high, self.sense_resistance),
        )
    }

    /// Get the temperature alert thresholds as (low, high) degrees Celsius.
    ///
    /// The threshold registers are one byte wide, so the resolution is 2 °C.
    pub fn get_temperature_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register(LTC2943_TEMPERATURE_THRESHOLD_LOW)?;
        let high = self.read_register(LTC2943_TEMPERATURE_THRESHOLD_HIGH)?;
        Ok((
            temperature_from_raw_threshold(low),
            temperature_from_raw_threshold(high),
        ))
    }

    /// Set the temperature alert thresholds as (low, high) degrees Celsius
    pub fn set_temperature_thresholds(&mut self, low: f32, high: f32) -> Result<(), Error<I::Error>> {
        self.write_register(
            LTC2943_TEMPERATURE_THRESHOLD_LOW,
            raw_threshold_from_temperature(low),
        )?;
        self.write_register(
            LTC2943_TEMPERATURE_THRESHOLD_HIGH,
            raw_threshold_from_temperature(high),
        )
    }

    // ========================================
    // Accumulated charge
    // ========================================

    /// Get the raw accumulated charge counter
    pub fn get_accumulated_charge(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_register_u16(LTC2943_ACCUM_CHARGE_MSB)
    }

    /// Set the raw accumulated charge counter.
    ///
    /// The analog section must be halted while the accumulator is rewritten:
    /// shutdown is asserted, the 16-bit register written, then shutdown is
    /// cleared. The clear runs on every exit path, so a failed accumulator
    /// write never leaves the device halted.
    pub fn set_accumulated_charge(&mut self, raw: u16) -> Result<(), Error<I::Error>> {
        self.enable_shutdown()?;
        let written = self.write_register_u16(LTC2943_ACCUM_CHARGE_MSB, raw);
        let resumed = self.disable_shutdown();
        written?;
        resumed
    }

    /// Reset the accumulated charge counter to the "battery full" sentinel
    /// (0xFFFF)
    pub fn reset_accumulated_charge(&mut self) -> Result<(), Error<I::Error>> {
        self.set_accumulated_charge(LTC2943_CHARGE_FULL)
    }

    // ========================================
    // Alert response
    // ========================================

    /// Query the SMBus Alert Response Address to find which device is pulling
    /// the shared alert line low.
    ///
    /// Returns the 7-bit address of the responding device, or 0 if no device
    /// responds. Transport errors are swallowed: the ARA may legitimately
    /// have no responder.
    pub fn get_alert_responder(&mut self) -> u8 {
        let mut buf = [0u8];
        match self.i2c.read(LTC2943_ALERT_RESPONSE_ADDRESS, &mut buf) {
            Ok(()) => buf[0] >> 1,
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Nack;

    impl i2c::Error for Nack {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        }
    }

    /// Register-backed fake bus with an auto-incrementing register pointer,
    /// optional write failure injection and a configurable ARA responder.
    struct SimBus {
        regs: [u8; 0x18],
        pointer: usize,
        nack_register: Option<u8>,
        ara_response: Option<u8>,
    }

    impl SimBus {
        fn new() -> Self {
            Self {
                regs: [0; 0x18],
                pointer: 0,
                nack_register: None,
                ara_response: None,
            }
        }
    }

    impl ErrorType for SimBus {
        type Error = Nack;
    }

    impl i2c::I2c for SimBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Nack> {
            if address == LTC2943_ALERT_RESPONSE_ADDRESS {
                let Some(response) = self.ara_response else {
                    return Err(Nack);
                };
                for op in operations {
                    if let Operation::Read(buf) = op {
                        for byte in buf.iter_mut() {
                            *byte = response;
                        }
                    }
                }
                return Ok(());
            }

            if address != LTC2943_SLAVE_ADDRESS {
                return Err(Nack);
            }

            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        let (reg, data) = bytes.split_first().ok_or(Nack)?;
                        self.pointer = *reg as usize;
                        for byte in data {
                            if self.nack_register == Some(self.pointer as u8) {
                                return Err(Nack);
                            }
                            self.regs[self.pointer] = *byte;
                            self.pointer += 1;
                        }
                    }
                    Operation::Read(buf) => {
                        for byte in buf.iter_mut() {
                            *byte = self.regs[self.pointer];
                            self.pointer += 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn assert_close(a: f32, b: f32, tolerance: f32) {
        assert!((a - b).abs() < tolerance, "{} != {}", a, b);
    }

    #[test]
    fn field_writes_preserve_sibling_fields() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_prescaler(Prescaler::M256).unwrap();
        gauge.set_alcc_mode(AlccMode::Alert).unwrap();
        gauge.set_adc_mode(AdcMode::Automatic).unwrap();

        assert_eq!(gauge.get_adc_mode().unwrap(), AdcMode::Automatic);
        assert_eq!(gauge.get_prescaler().unwrap(), Prescaler::M256);
        assert_eq!(gauge.get_alcc_mode().unwrap(), AlccMode::Alert);
        assert!(!gauge.is_shutdown().unwrap());
    }

    #[test]
    fn oversized_field_value_is_rejected() {
        let mut gauge = Ltc2943::new(SimBus::new());

        assert_eq!(
            gauge.write_field(FIELD_ADC_MODE, 0b100),
            Err(Error::InvalidFieldValue)
        );
        // Nothing was written.
        assert_eq!(gauge.get_adc_mode().unwrap(), AdcMode::Sleep);
    }

    #[test]
    fn status_flags_decode() {
        let mut bus = SimBus::new();
        bus.regs[LTC2943_STATUS as usize] = 0b0010_0001;
        let mut gauge = Ltc2943::new(bus);

        let status = gauge.get_status().unwrap();
        assert!(status.undervoltage_lockout);
        assert!(status.accumulated_charge_overflow);
        assert!(!status.voltage_alert);
        assert!(!status.current_alert);
        assert!(status.any_alert());
    }

    #[test]
    fn reads_measurements_in_engineering_units() {
        let mut bus = SimBus::new();
        bus.regs[LTC2943_VOLTAGE_MSB as usize] = 0xFF;
        bus.regs[LTC2943_VOLTAGE_MSB as usize + 1] = 0xFF;
        bus.regs[LTC2943_CURRENT_MSB as usize] = 0x7F;
        bus.regs[LTC2943_CURRENT_MSB as usize + 1] = 0xFF;
        bus.regs[LTC2943_TEMPERATURE_MSB as usize] = 0x00;
        bus.regs[LTC2943_TEMPERATURE_MSB as usize + 1] = 0x00;
        let mut gauge = Ltc2943::new(bus);

        assert_close(gauge.get_voltage().unwrap(), 23.6, 1e-3);
        assert_close(gauge.get_current().unwrap(), 0.0, 1e-3);
        assert_close(gauge.get_temperature().unwrap(), -273.15, 1e-3);
    }

    #[test]
    fn accumulated_charge_round_trip_resumes_gauging() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_accumulated_charge(0x1234).unwrap();

        assert_eq!(gauge.get_accumulated_charge().unwrap(), 0x1234);
        assert!(!gauge.is_shutdown().unwrap());
    }

    #[test]
    fn failed_accumulator_write_still_resumes_gauging() {
        let mut bus = SimBus::new();
        bus.regs[LTC2943_ACCUM_CHARGE_MSB as usize] = 0xAB;
        bus.regs[LTC2943_ACCUM_CHARGE_MSB as usize + 1] = 0xCD;
        bus.nack_register = Some(LTC2943_ACCUM_CHARGE_MSB);
        let mut gauge = Ltc2943::new(bus);

        assert_eq!(gauge.set_accumulated_charge(0x1234), Err(Error::I2c(Nack)));

        // Shutdown was cleared despite the failure and the accumulator is
        // untouched.
        assert!(!gauge.is_shutdown().unwrap());
        assert_eq!(gauge.get_accumulated_charge().unwrap(), 0xABCD);
    }

    #[test]
    fn reset_writes_full_sentinel() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.reset_accumulated_charge().unwrap();

        assert_eq!(gauge.get_accumulated_charge().unwrap(), 0xFFFF);
        assert!(!gauge.is_shutdown().unwrap());
    }

    #[test]
    fn charge_thresholds_round_trip() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_charge_thresholds(0x1000, 0xF000).unwrap();
        assert_eq!(gauge.get_charge_thresholds().unwrap(), (0x1000, 0xF000));
    }

    #[test]
    fn voltage_thresholds_round_trip() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_voltage_thresholds(3.0, 4.2).unwrap();
        let (low, high) = gauge.get_voltage_thresholds().unwrap();
        assert_close(low, 3.0, 1e-3);
        assert_close(high, 4.2, 1e-3);
    }

    #[test]
    fn current_thresholds_round_trip() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_current_thresholds(-5.0, 5.0).unwrap();
        let (low, high) = gauge.get_current_thresholds().unwrap();
        assert_close(low, -5.0, 0.01);
        assert_close(high, 5.0, 0.01);
    }

    #[test]
    fn temperature_thresholds_round_trip() {
        let mut gauge = Ltc2943::new(SimBus::new());

        gauge.set_temperature_thresholds(0.0, 85.0).unwrap();
        let (low, high) = gauge.get_temperature_thresholds().unwrap();
        // 8-bit threshold registers quantize to 2 °C steps.
        assert_close(low, 0.0, 1.0);
        assert_close(high, 85.0, 1.0);
    }

    #[test]
    fn alert_responder_is_decoded() {
        let mut bus = SimBus::new();
        bus.ara_response = Some(LTC2943_SLAVE_ADDRESS << 1);
        let mut gauge = Ltc2943::new(bus);

        assert_eq!(gauge.get_alert_responder(), LTC2943_SLAVE_ADDRESS);
    }

    #[test]
    fn alert_responder_nack_returns_zero() {
        let mut gauge = Ltc2943::new(SimBus::new());

        assert_eq!(gauge.get_alert_responder(), 0);
    }
}
