//! Monitor and control NPBC pellet burner controllers via their serial interface.
//!
//! # Overview
//!
//! The `npbc` crate implements the request/response protocol spoken by NPBC
//! burner controllers. It offers an asynchronous, platform-agnostic API
//! that can be shared by several tasks at once, such as a periodic telemetry
//! poll, a scheduler and user-triggered settings changes.
//!
//! Depending on your needs, you can:
//!
//! - Use a [`Controller`] to query the burner status and change its settings.
//! - Send individual [`Command`]s through [`Controller::send`].
//! - Work directly with the wire format using [`Frame`].
//!
//! # Getting started
//!
//! The controller exposes a UART configured as follows:
//!
//! - **Baud rate:** 9600
//! - **Parity:** None
//! - **Data bits:** 8
//! - **Stop bits:** 1
//!
//! Any port implementing [`Read`](embedded_io_async::Read),
//! [`Write`](embedded_io_async::Write) and [`ReadReady`](embedded_io::ReadReady)
//! can be used, together with a [`DelayNs`](embedded_hal_async::delay::DelayNs)
//! implementation for the settle time after each request.
//!
//! If you enable the `native-serial` feature, you can obtain a compatible
//! serial port instance using `serial::open` and a Tokio-based delay
//! using `serial::TokioDelay`.
//!
//! # Examples
//!
//! ## Querying the burner status
//!
//! ```no_run
//! use npbc::{
//!     Controller,
//!     embassy_sync::blocking_mutex::raw::NoopRawMutex,
//!     embedded_hal_async::delay::DelayNs,
//!     embedded_io::ReadReady,
//!     embedded_io_async::{Read, Write},
//! };
//!
//! async fn example(port: impl Read + Write + ReadReady, delay: impl DelayNs) {
//!     let controller = Controller::<NoopRawMutex, _, _>::new(port, delay);
//!
//!     if let Some(status) = controller.query_status().await {
//!         println!("Boiler temperature: {}", status.boiler_temperature);
//!     }
//!
//!     if !controller.set_mode_and_priority(0, 0).await {
//!         println!("Burner did not acknowledge standby");
//!     }
//! }
//! ```
//!
//! ## Working with frames
//!
//! ```
//! use npbc::{Command, Frame};
//!
//! let request = Command::GeneralStatusQuery.request();
//!
//! assert_eq!(request, [0x5a, 0x5a, 0x02, 0x01, 0xfd]);
//! assert_eq!(Frame::decode(&request), Ok(Frame::new(0x01, Vec::new())));
//! ```
//!
//! # Protocol details
//!
//! Each exchange consists of one request frame followed by a fixed settle time
//! of 500 ms, after which the controller's reply is expected to be buffered
//! by the port. Only one exchange can be in progress at any time.
//! See the [`frame`] module for the wire format.

#![no_std]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod command;
pub mod controller;
pub mod frame;
pub mod status;

#[cfg(feature = "native-serial")]
#[cfg_attr(docsrs, doc(cfg(feature = "native-serial")))]
pub mod serial;

pub use command::{Command, Reply};
pub use controller::Controller;
pub use frame::{DecodeError, Frame};
pub use status::{Alarm, BurnerStatus, Mode, Output, PowerLevel, Priority, StatusRecord};

pub use embassy_sync;
pub use embedded_hal_async;
pub use embedded_io;
pub use embedded_io_async;

use core::fmt::{Display, Formatter};

/// Baud rate of the controller's serial interface.
pub const BAUD_RATE: u32 = 9600;

/// A specialized [`Result`] type for [`Controller`] operations.
///
/// Uses [`Error<E>`] as the error variant, which can include port-specific errors.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error type for [`Controller`] operations.
///
/// The generic parameter `E` allows the error type to carry a port-specific error.
///
/// This enum is marked `#[non_exhaustive]` to allow for future variants.
#[non_exhaustive]
#[derive(PartialEq, Eq, Debug)]
pub enum Error<E> {
    /// The reply is too short or does not start with the frame header.
    MalformedHeader,
    /// The reply length does not match its length byte.
    LengthMismatch,
    /// The reply has an incorrect checksum.
    ChecksumMismatch,
    /// The reply payload is too short for the requested command.
    TooShortPayload,
    /// The controller did not reply within the settle time.
    NoResponse,
    /// A port-specific input/output error.
    Io(E),
}

impl<E: core::error::Error> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "malformed header"),
            Self::LengthMismatch => write!(f, "length mismatch"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::TooShortPayload => write!(f, "payload too short"),
            Self::NoResponse => write!(f, "no response"),
            Self::Io(err) => write!(f, "input/output error: {err}"),
        }
    }
}

impl<E: core::error::Error> core::error::Error for Error<E> {}

impl<E> From<DecodeError> for Error<E> {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MalformedHeader => Self::MalformedHeader,
            DecodeError::LengthMismatch => Self::LengthMismatch,
            DecodeError::ChecksumMismatch => Self::ChecksumMismatch,
        }
    }
}
