#![no_std]
//! # LTC2943 Battery Gas Gauge Driver
//!
//! This crate provides an embedded driver for the LTC2943 multicell battery
//! gas gauge / coulomb counter. It supports:
//! - Battery voltage, current and die temperature measurement
//! - Accumulated charge readout, rewrite and reset
//! - Configurable charge/voltage/current/temperature alert thresholds
//! - ADC mode, prescaler and AL#/CC# pin configuration
//! - SMBus Alert Response Address queries
//!
//! ## Example
//!
//! ```no_run
//! use ltc2943::{AdcMode, Error, Ltc2943, Prescaler};
//! # use embedded_hal::i2c::I2c;
//! # fn example<I: I2c>(i2c: I) -> Result<(), Error<I::Error>> {
//! let mut gauge = Ltc2943::new(i2c);
//!
//! // Continuous conversion with the prescaler matched to the pack size
//! gauge.set_prescaler(Prescaler::M256)?;
//! gauge.set_adc_mode(AdcMode::Automatic)?;
//!
//! // Start counting from "full"
//! gauge.reset_accumulated_charge()?;
//!
//! let voltage = gauge.get_voltage()?;
//! let current = gauge.get_current()?;
//! let charge = gauge.get_accumulated_charge()?;
//!
//! let status = gauge.get_status()?;
//! if status.any_alert() {
//!     // ... handle alerts
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Support
//!
//! When the `async` feature is enabled, the crate provides `AsyncLtc2943`
//! with the same API but async/await support:
//!
//! ```no_run
//! # #[cfg(feature = "async")]
//! # async fn example<I: embedded_hal_async::i2c::I2c>(i2c: I) -> Result<(), ltc2943::Error<I::Error>> {
//! use ltc2943::AsyncLtc2943;
//!
//! let mut gauge = AsyncLtc2943::new(i2c);
//! let voltage = gauge.get_voltage().await?;
//! # Ok(())
//! # }
//! ```

mod driver;
#[cfg(feature = "async")]
mod driver_async;
mod error;
mod registers;
mod types;

// Re-export main types
pub use driver::Ltc2943;
#[cfg(feature = "async")]
pub use driver_async::AsyncLtc2943;
pub use error::Error;
pub use registers::*;
pub use types::*;
