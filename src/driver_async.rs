//! Async LTC2943 driver implementation

use crate::{error::Error, registers::*, types::*};

#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

/// Async LTC2943 coulomb counter driver
///
/// Mirrors the synchronous [`Ltc2943`](crate::Ltc2943) API with async/await
/// support when the `async` feature is enabled.
///
/// # Example
/// ```no_run
/// # #[cfg(feature = "async")]
/// # async fn example<I: embedded_hal_async::i2c::I2c>(i2c: I) -> Result<(), ltc2943::Error<I::Error>> {
/// use ltc2943::AsyncLtc2943;
///
/// let mut gauge = AsyncLtc2943::new(i2c);
///
/// let voltage = gauge.get_voltage().await?;
/// let charge = gauge.get_accumulated_charge().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async")]
pub struct AsyncLtc2943<I> {
    i2c: I,
    addr: u8,
    sense_resistance: f32,
}

#[cfg(feature = "async")]
impl<I> AsyncLtc2943<I>
where
    I: AsyncI2c,
{
    /// Create a new async LTC2943 driver instance
    ///
    /// Uses the default device address (0x64) and the default 2 mΩ sense
    /// resistor.
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, LTC2943_SLAVE_ADDRESS)
    }

    /// Create a new async LTC2943 driver instance with a custom I2C address
    pub fn with_address(i2c: I, addr: u8) -> Self {
        Self::with_sense_resistor(i2c, addr, LTC2943_DEFAULT_SENSE_RESISTANCE)
    }

    /// Create a new async LTC2943 driver instance with a custom I2C address
    /// and sense resistance in ohms
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
    async fn read_register(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Write a single register
    async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c
            .write(self.addr, &[reg, value])
            .await
            .map_err(Error::I2c)
    }

    /// Read a 16-bit big-endian register pair starting at `reg`
    async fn read_register_u16(&mut self, reg: u8) -> Result<u16, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a 16-bit big-endian register pair starting at `reg`
    async fn write_register_u16(&mut self, reg: u8, value: u16) -> Result<(), Error<I::Error>> {
        let bytes = value.to_be_bytes();
        self.i2c
            .write(self.addr, &[reg, bytes[0], bytes[1]])
            .await
            .map_err(Error::I2c)
    }

    /// Extract a bit field from its register
    async fn read_field(&mut self, field: BitField) -> Result<u8, Error<I::Error>> {
        let byte = self.read_register(field.register).await?;
        Ok((byte >> field.offset) & field.value_mask())
    }

    /// Splice a bit field value into its register, leaving sibling fields
    /// untouched.
    ///
    /// Values wider than the field are rejected rather than silently masked.
    async fn write_field(&mut self, field: BitField, value: u8) -> Result<(), Error<I::Error>> {
        if value & !field.value_mask() != 0 {
            return Err(Error::InvalidFieldValue);
        }
        let byte = self.read_register(field.register).await?;
        let byte = (byte & !field.register_mask()) | (value << field.offset);
        self.write_register(field.register, byte).await
    }

    // ========================================
    // Status
    // ========================================

    /// Read and decode the status register
    pub async fn get_status(&mut self) -> Result<Status, Error<I::Error>> {
        let bits = self.read_register(LTC2943_STATUS).await?;
        Ok(Status::from_bits(bits))
    }

    // ========================================
    // Control register fields
    // ========================================

    /// Get the ADC operating mode
    pub async fn get_adc_mode(&mut self) -> Result<AdcMode, Error<I::Error>> {
        let bits = self.read_field(FIELD_ADC_MODE).await?;
        Ok(AdcMode::from_bits(bits))
    }

    /// Set the ADC operating mode
    pub async fn set_adc_mode(&mut self, mode: AdcMode) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_ADC_MODE, mode.bits()).await
    }

    /// Get the coulomb counter prescaler
    pub async fn get_prescaler(&mut self) -> Result<Prescaler, Error<I::Error>> {
        let bits = self.read_field(FIELD_PRESCALER).await?;
        Ok(Prescaler::from_bits(bits))
    }

    /// Set the coulomb counter prescaler
    pub async fn set_prescaler(&mut self, prescaler: Prescaler) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_PRESCALER, prescaler.bits()).await
    }

    /// Get the AL#/CC# pin configuration
    pub async fn get_alcc_mode(&mut self) -> Result<AlccMode, Error<I::Error>> {
        let bits = self.read_field(FIELD_ALCC_MODE).await?;
        Ok(AlccMode::from_bits(bits))
    }

    /// Set the AL#/CC# pin configuration
    pub async fn set_alcc_mode(&mut self, mode: AlccMode) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_ALCC_MODE, mode.bits()).await
    }

    /// Check whether the analog section is shut down
    pub async fn is_shutdown(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.read_field(FIELD_SHUTDOWN).await? != 0)
    }

    /// Shut down the analog section
    pub async fn enable_shutdown(&mut self) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_SHUTDOWN, 1).await
    }

    /// Resume the analog section
    pub async fn disable_shutdown(&mut self) -> Result<(), Error<I::Error>> {
        self.write_field(FIELD_SHUTDOWN, 0).await
    }

    // ========================================
    // Measurements
    // ========================================

    /// Get the battery voltage in volts
    pub async fn get_voltage(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_VOLTAGE_MSB).await?;
        Ok(voltage_from_raw(raw))
    }

    /// Get the sense-resistor current in amps.
    ///
    /// Positive values indicate charging, negative values discharging.
    pub async fn get_current(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_CURRENT_MSB).await?;
        Ok(current_from_raw(raw, self.sense_resistance))
    }

    /// Get the die temperature in degrees Celsius
    pub async fn get_temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_register_u16(LTC2943_TEMPERATURE_MSB).await?;
        Ok(temperature_from_raw(raw))
    }

    // ========================================
    // Alert thresholds
    // ========================================

    /// Get the charge alert thresholds as raw (low, high) accumulator counts
    pub async fn get_charge_thresholds(&mut self) -> Result<(u16, u16), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_CHARGE_THRESHOLD_LOW_MSB).await?;
        let high = self.read_register_u16(LTC2943_CHARGE_THRESHOLD_HIGH_MSB).await?;
        Ok((low, high))
    }

    /// Set the charge alert thresholds as raw (low, high) accumulator counts
    pub async fn set_charge_thresholds(
        &mut self,
        low: u16,
        high: u16,
    ) -> Result<(), Error<I::Error>> {
        self.write_register_u16(LTC2943_CHARGE_THRESHOLD_LOW_MSB, low)
            .await?;
        self.write_register_u16(LTC2943_CHARGE_THRESHOLD_HIGH_MSB, high)
            .await
    }

    /// Get the voltage alert thresholds as (low, high) volts
    pub async fn get_voltage_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_VOLTAGE_THRESHOLD_LOW_MSB).await?;
        let high = self
            .read_register_u16(LTC2943_VOLTAGE_THRESHOLD_HIGH_MSB)
            .await?;
        Ok((voltage_from_raw(low), voltage_from_raw(high)))
    }

    /// Set the voltage alert thresholds as (low, high) volts
    pub async fn set_voltage_thresholds(
        &mut self,
        low: f32,
        high: f32,
    ) -> Result<(), Error<I::Error>> {
        self.write_register_u16(LTC2943_VOLTAGE_THRESHOLD_LOW_MSB, raw_from_voltage(low))
            .await?;
        self.write_register_u16(LTC2943_VOLTAGE_THRESHOLD_HIGH_MSB, raw_from_voltage(high))
            .await
    }

    /// Get the current alert thresholds as (low, high) amps
    pub async fn get_current_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register_u16(LTC2943_CURRENT_THRESHOLD_LOW_MSB).await?;
        let high = self
            .read_register_u16(LTC2943_CURRENT_THRESHOLD_HIGH_MSB)
            .await?;
        Ok((
            current_from_raw(low, self.sense_resistance),
            current_from_raw(high, self.sense_resistance),
        ))
    }

    /// Set the current alert thresholds as (low, high) amps
    pub async fn set_current_thresholds(
        &mut self,
        low: f32,
        high: f32,
    ) -> Result<(), Error<I::Error>> {
        self.write_register_u16(
            LTC2943_CURRENT_THRESHOLD_LOW_MSB,
            raw_from_current(low, self.sense_resistance),
        )
        .await?;
        self.write_register_u16(
            LTC2943_CURRENT_THRESHOLD_HIGH_MSB,
            raw_from_current(high, self.sense_resistance),
        )
        .await
    }

    /// Get the temperature alert thresholds as (low, high) degrees Celsius.
    ///
    /// The threshold registers are one byte wide, so the resolution is 2 °C.
    pub async fn get_temperature_thresholds(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        let low = self.read_register(LTC2943_TEMPERATURE_THRESHOLD_LOW).await?;
        let high = self.read_register(LTC2943_TEMPERATURE_THRESHOLD_HIGH).await?;
        Ok((
            temperature_from_raw_threshold(low),
            temperature_from_raw_threshold(high),
        ))
    }

    /// Set the temperature alert thresholds as (low, high) degrees Celsius
    pub async fn set_temperature_thresholds(
        &mut self,
        low: f32,
        high: f32,
    ) -> Result<(), Error<I::Error>> {
        self.write_register(
            LTC2943_TEMPERATURE_THRESHOLD_LOW,
            raw_threshold_from_temperature(low),
        )
        .await?;
        self.write_register(
            LTC2943_TEMPERATURE_THRESHOLD_HIGH,
            raw_threshold_from_temperature(high),
        )
        .await
    }

    // ========================================
    // Accumulated charge
    // ========================================

    /// Get the raw accumulated charge counter
    pub async fn get_accumulated_charge(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_register_u16(LTC2943_ACCUM_CHARGE_MSB).await
    }

    /// Set the raw accumulated charge counter.
    ///
    /// The analog section must be halted while the accumulator is rewritten:
    /// shutdown is asserted, the 16-bit register written, then shutdown is
    /// cleared. The clear runs on every exit path, so a failed accumulator
    /// write never leaves the device halted.
    pub async fn set_accumulated_charge(&mut self, raw: u16) -> Result<(), Error<I::Error>> {
        self.enable_shutdown().await?;
        let written = self.write_register_u16(LTC2943_ACCUM_CHARGE_MSB, raw).await;
        let resumed = self.disable_shutdown().await;
        written?;
        resumed
    }

    /// Reset the accumulated charge counter to the "battery full" sentinel
    /// (0xFFFF)
    pub async fn reset_accumulated_charge(&mut self) -> Result<(), Error<I::Error>> {
        self.set_accumulated_charge(LTC2943_CHARGE_FULL).await
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
    pub async fn get_alert_responder(&mut self) -> u8 {
        let mut buf = [0u8];
        match self.i2c.read(LTC2943_ALERT_RESPONSE_ADDRESS, &mut buf).await {
            Ok(()) => buf[0] >> 1,
            Err(_) => 0,
        }
    }
}
