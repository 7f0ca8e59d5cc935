//! Commands understood by the controller.
//!
//! A [`Command`] builds its request frame and interprets the matching reply.
//! Commands are one-shot: interpreting a reply consumes the command.

use crate::{
    Error,
    frame::Frame,
    status::{STATUS_PAYLOAD_LEN, StatusRecord},
};
use alloc::{vec, vec::Vec};
use log::trace;

const ID_GENERAL_STATUS_QUERY: u8 = 0x01;
const ID_SET_MODE_AND_PRIORITY: u8 = 0x03;
const ID_RESET_WORK_TIME_COUNTER: u8 = 0x09;

/// Request sent to the controller.
#[derive(PartialEq, Eq, Debug)]
pub enum Command {
    /// Queries the general status, answered with a [`StatusRecord`].
    GeneralStatusQuery,
    /// Resets the accumulated feeder work time counter.
    ResetWorkTimeCounter,
    /// Sets the operating mode and heating circuit priority.
    ///
    /// See [`Mode`](crate::Mode) and [`Priority`](crate::Priority) for known values.
    SetModeAndPriority {
        /// Raw operating mode.
        mode: u8,
        /// Raw heating circuit priority.
        priority: u8,
    },
}

/// Interpreted reply to a [`Command`].
#[derive(PartialEq, Eq, Debug)]
pub enum Reply {
    /// Decoded general status.
    Status(StatusRecord),
    /// The controller accepted the command.
    Acknowledged,
}

impl Reply {
    /// Returns the status record, if this is a status reply.
    #[must_use]
    pub fn into_status(self) -> Option<StatusRecord> {
        match self {
            Self::Status(rec) => Some(rec),
            Self::Acknowledged => None,
        }
    }
}

impl Command {
    /// Returns the command identifier.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::GeneralStatusQuery => ID_GENERAL_STATUS_QUERY,
            Self::ResetWorkTimeCounter => ID_RESET_WORK_TIME_COUNTER,
            Self::SetModeAndPriority { .. } => ID_SET_MODE_AND_PRIORITY,
        }
    }

    /// Returns the request payload.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match *self {
            Self::GeneralStatusQuery | Self::ResetWorkTimeCounter => Vec::new(),
            Self::SetModeAndPriority { mode, priority } => vec![mode, priority],
        }
    }

    /// Returns the encoded request frame.
    #[must_use]
    pub fn request(&self) -> Vec<u8> {
        Frame::new(self.id(), self.payload()).encode()
    }

    /// Interprets a verified reply frame.
    ///
    /// # Errors
    ///
    /// - [`Error::TooShortPayload`] if a status reply is shorter than
    ///   [`STATUS_PAYLOAD_LEN`] bytes.
    pub fn interpret<E>(self, frame: &Frame) -> Result<Reply, Error<E>> {
        trace!("Interpreting reply to {self:?}: {frame:02x?}");

        match self {
            Self::GeneralStatusQuery => {
                let payload = frame
                    .payload
                    .first_chunk::<STATUS_PAYLOAD_LEN>()
                    .ok_or(Error::TooShortPayload)?;

                Ok(Reply::Status(StatusRecord::decode(payload)))
            }
            Self::ResetWorkTimeCounter | Self::SetModeAndPriority { .. } => Ok(Reply::Acknowledged),
        }
    }
}
