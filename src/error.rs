//! Error types for LTC2943 operations
//!
//! This module defines the error types that can occur when using the LTC2943 driver.

/// Error types for LTC2943 operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// Value does not fit the target register bit field
    InvalidFieldValue,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2c(error)
    }
}
