//! Exclusive access to the controller's serial channel.
//!
//! A [`Controller`] owns the port and serializes all exchanges on it.
//! It can be shared by reference between tasks: while one task waits for a reply,
//! all others queue behind it without interleaving bytes on the wire.

use crate::{
    Command, Error, Reply, Result, StatusRecord,
    frame::{Frame, MAX_FRAME_LEN},
};
use alloc::vec::Vec;
use embassy_sync::{blocking_mutex::raw::RawMutex, mutex::Mutex};
use embedded_hal_async::delay::DelayNs;
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};
use log::{debug, trace, warn};

/// Time to wait for a reply after sending a request.
pub const SETTLE_TIME_MS: u32 = 500;

// Size of a single port read
const READ_CHUNK_SIZE: usize = 64;

/// Port and delay, only accessible while holding the channel lock.
struct Link<P, D> {
    port: P,
    delay: D,
}

impl<P: Read + Write + ReadReady, D: DelayNs> Link<P, D> {
    /// Performs a single request/response exchange.
    async fn exchange(&mut self, cmd: Command) -> Result<Reply, P::Error> {
        let stale = self.read_available().await?;

        if !stale.is_empty() {
            debug!("Discarding stale input: {stale:02x?}");
        }

        let req = cmd.request();

        trace!("Write to port: {req:02x?}");
        self.port.write_all(&req).await.map_err(Error::Io)?;
        self.port.flush().await.map_err(Error::Io)?;

        // Reply is expected to be fully buffered afterwards
        self.delay.delay_ms(SETTLE_TIME_MS).await;

        let resp = self.read_available().await?;

        if resp.is_empty() {
            debug!("No response to command {:#04x}", cmd.id());

            return Err(Error::NoResponse);
        }

        trace!("Read from port: {resp:02x?}");

        let frame = Frame::decode(&resp).inspect_err(|err| {
            debug!("Discarding invalid response to command {:#04x}: {err}", cmd.id());
        })?;

        cmd.interpret(&frame)
    }

    /// Reads all bytes currently buffered by the port, up to roughly one frame.
    async fn read_available(&mut self) -> Result<Vec<u8>, P::Error> {
        let mut buf = Vec::new();
        let mut chunk = [0x00; READ_CHUNK_SIZE];

        while buf.len() <= MAX_FRAME_LEN && self.port.read_ready().map_err(Error::Io)? {
            let len = self.port.read(&mut chunk).await.map_err(Error::Io)?;

            if len == 0 {
                break;
            }

            buf.extend_from_slice(&chunk[..len]);
        }

        Ok(buf)
    }
}

/// Serialized access to an NPBC burner controller.
///
/// Requires a port that implements [`Read`], [`Write`] and [`ReadReady`]
/// and a delay that implements [`DelayNs`].
/// The raw mutex type `M` determines whether the controller can be shared
/// between executors or interrupt priorities; on a single executor,
/// [`NoopRawMutex`](embassy_sync::blocking_mutex::raw::NoopRawMutex) suffices.
///
/// Every operation holds the channel for exactly one request and its settle time.
/// There is no retry: failures are returned to the caller, which may simply
/// try again in its next cycle.
pub struct Controller<M: RawMutex, P, D> {
    link: Mutex<M, Link<P, D>>,
}

impl<M: RawMutex, P: Read + Write + ReadReady, D: DelayNs> Controller<M, P, D> {
    /// Constructs a new controller.
    pub fn new(port: P, delay: D) -> Self {
        Self {
            link: Mutex::new(Link { port, delay }),
        }
    }

    /// Consumes the controller, returning the port and delay.
    pub fn into_parts(self) -> (P, D) {
        let link = self.link.into_inner();

        (link.port, link.delay)
    }

    /// Sends a command and waits for the controller's reply.
    ///
    /// Waits for exclusive access to the channel first.
    ///
    /// # Errors
    ///
    /// - [`Error::NoResponse`] if nothing was received within the settle time.
    /// - [`Error::MalformedHeader`], [`Error::LengthMismatch`] or
    ///   [`Error::ChecksumMismatch`] if the reply failed verification.
    /// - [`Error::TooShortPayload`] if a status reply is incomplete.
    /// - [`Error::Io`] for port errors.
    pub async fn send(&self, cmd: Command) -> Result<Reply, P::Error> {
        self.link.lock().await.exchange(cmd).await
    }

    /// Queries the general status of the burner.
    ///
    /// If the status reports accumulated feeder work time, the counter is reset
    /// right away, without releasing the channel in between.
    /// A failed reset is logged but does not affect the returned status.
    ///
    /// Returns `None` if the status is unavailable.
    pub async fn query_status(&self) -> Option<StatusRecord> {
        let mut link = self.link.lock().await;

        let rec = match link.exchange(Command::GeneralStatusQuery).await {
            Ok(Reply::Status(rec)) => rec,
            Ok(reply) => {
                warn!("Unexpected reply to status query: {reply:?}");

                return None;
            }
            Err(err) => {
                warn!("Failed to query status: {err}");

                return None;
            }
        };

        if rec.feeder_work_time > 0 {
            debug!("Resetting feeder work time: {}", rec.feeder_work_time);

            if let Err(err) = link.exchange(Command::ResetWorkTimeCounter).await {
                warn!("Failed to reset feeder work time: {err}");
            }
        }

        Some(rec)
    }

    /// Sets the burner's operating mode and heating circuit priority.
    ///
    /// Returns whether the controller acknowledged the change.
    pub async fn set_mode_and_priority(&self, mode: u8, priority: u8) -> bool {
        match self
            .send(Command::SetModeAndPriority { mode, priority })
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!("Failed to set mode {mode} and priority {priority}: {err}");

                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        status::{Output, STATUS_PAYLOAD_LEN},
        tests::{Event, MockDelay, MockPort, init_logger},
    };
    use alloc::{vec, vec::Vec};
    use core::convert::Infallible;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type TestController = Controller<NoopRawMutex, MockPort, MockDelay>;

    const STATUS_REQUEST: [u8; 5] = [0x5a, 0x5a, 0x02, 0x01, 0xfd];
    const RESET_REQUEST: [u8; 5] = [0x5a, 0x5a, 0x02, 0x09, 0xf5];

    fn status_reply(work_time: u8) -> Vec<u8> {
        let mut payload = vec![0x00; STATUS_PAYLOAD_LEN];

        payload[8] = 0x01;
        payload[9] = 0x02;
        payload[17] = 63;
        payload[21] = 0b0001_0110;
        payload[27] = work_time;

        Frame::new(0x01, payload).encode()
    }

    fn ack_reply(id: u8) -> Vec<u8> {
        Frame::new(id, Vec::new()).encode()
    }

    fn corrupt(mut data: Vec<u8>) -> Vec<u8> {
        if let Some(last) = data.last_mut() {
            *last ^= 0x01;
        }

        data
    }

    #[tokio::test]
    async fn send_status_query() -> crate::Result<(), Infallible> {
        init_logger();

        let ctrl = TestController::new(MockPort::new([Some(status_reply(0))]), MockDelay::default());
        let reply = ctrl.send(Command::GeneralStatusQuery).await?;
        let Some(rec) = reply.into_status() else {
            panic!("reply should contain status");
        };

        assert_eq!(rec.mode, 1, "mode should be correct");
        assert_eq!(rec.boiler_temperature, 63, "temperature should be correct");
        assert_eq!(
            rec.outputs,
            Output::Heater | Output::DhwPump | Output::BoilerFeed,
            "outputs should be correct"
        );

        let (port, delay) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [STATUS_REQUEST.as_slice()],
            "written frames should be correct"
        );
        assert_eq!(
            delay.total_ns,
            u64::from(SETTLE_TIME_MS) * 1_000_000,
            "settle time should be correct"
        );

        Ok(())
    }

    #[tokio::test]
    async fn error_no_response() -> crate::Result<(), Infallible> {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([None, Some(ack_reply(0x09))]),
            MockDelay::default(),
        );
        let res = ctrl.send(Command::GeneralStatusQuery).await;

        assert_eq!(
            res,
            Err(Error::NoResponse),
            "result should be no response error"
        );

        // Channel must be released after the failure
        let reply = ctrl.send(Command::ResetWorkTimeCounter).await?;

        assert_eq!(reply, Reply::Acknowledged, "reply should be acknowledgement");

        let (port, delay) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [STATUS_REQUEST.as_slice(), RESET_REQUEST.as_slice()],
            "written frames should be correct"
        );
        assert_eq!(
            delay.total_ns,
            2 * u64::from(SETTLE_TIME_MS) * 1_000_000,
            "settle time should elapse for both exchanges"
        );

        Ok(())
    }

    #[tokio::test]
    async fn error_invalid_reply() {
        init_logger();

        let short = vec![0x00; STATUS_PAYLOAD_LEN - 1];
        let ctrl = TestController::new(
            MockPort::new([
                Some(corrupt(status_reply(0))),
                Some(vec![0x5a, 0x5b, 0x02, 0x01, 0xfd]),
                Some(status_reply(0)[..20].to_vec()),
                Some(Frame::new(0x01, short).encode()),
            ]),
            MockDelay::default(),
        );

        for expected in [
            Error::ChecksumMismatch,
            Error::MalformedHeader,
            Error::LengthMismatch,
            Error::TooShortPayload,
        ] {
            assert_eq!(
                ctrl.send(Command::GeneralStatusQuery).await,
                Err(expected),
                "result should be an error"
            );
        }

        let (port, _) = ctrl.into_parts();

        assert_eq!(port.writes().len(), 4, "every request should be sent once");
    }

    #[tokio::test]
    async fn discard_stale_input() -> crate::Result<(), Infallible> {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([Some(ack_reply(0x03))]).with_pending_input(&[0x5a, 0x00, 0x13]),
            MockDelay::default(),
        );
        let reply = ctrl
            .send(Command::SetModeAndPriority {
                mode: 0x01,
                priority: 0x00,
            })
            .await?;

        assert_eq!(reply, Reply::Acknowledged, "reply should be acknowledgement");

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.events.first(),
            Some(&Event::Read(vec![0x5a, 0x00, 0x13])),
            "stale input should be read before writing"
        );

        Ok(())
    }

    #[tokio::test]
    async fn query_status_resets_work_time() {
        init_logger();

        // Reset is not answered
        let ctrl = TestController::new(
            MockPort::new([Some(status_reply(5)), None]),
            MockDelay::default(),
        );
        let rec = ctrl.query_status().await;

        assert_eq!(
            rec.map(|rec| rec.feeder_work_time),
            Some(5),
            "status should be returned"
        );

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [STATUS_REQUEST.as_slice(), RESET_REQUEST.as_slice()],
            "work time counter should be reset"
        );
    }

    #[tokio::test]
    async fn query_status_without_work_time() {
        init_logger();

        let ctrl = TestController::new(MockPort::new([Some(status_reply(0))]), MockDelay::default());

        assert!(
            ctrl.query_status().await.is_some(),
            "status should be returned"
        );

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [STATUS_REQUEST.as_slice()],
            "work time counter should not be reset"
        );
    }

    #[tokio::test]
    async fn query_status_unavailable() {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([None, Some(corrupt(status_reply(5)))]),
            MockDelay::default(),
        );

        assert_eq!(ctrl.query_status().await, None, "status should be unavailable");
        assert_eq!(ctrl.query_status().await, None, "status should be unavailable");

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [STATUS_REQUEST.as_slice(), STATUS_REQUEST.as_slice()],
            "work time counter should not be reset"
        );
    }

    #[tokio::test]
    async fn set_mode_and_priority() {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([Some(ack_reply(0x03)), None]),
            MockDelay::default(),
        );

        assert!(
            ctrl.set_mode_and_priority(0x01, 0x02).await,
            "change should be acknowledged"
        );
        assert!(
            !ctrl.set_mode_and_priority(0x00, 0x00).await,
            "change should not be acknowledged"
        );

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [
                [0x5a, 0x5a, 0x04, 0x03, 0x02, 0x04, 0xf8].as_slice(),
                [0x5a, 0x5a, 0x04, 0x03, 0x01, 0x02, 0xfb].as_slice(),
            ],
            "written frames should be correct"
        );
    }

    #[tokio::test]
    async fn exchanges_do_not_interleave() {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([Some(status_reply(0)), Some(ack_reply(0x03))]),
            MockDelay::default(),
        );
        let (status, ack) = tokio::join!(
            ctrl.send(Command::GeneralStatusQuery),
            ctrl.send(Command::SetModeAndPriority {
                mode: 0x00,
                priority: 0x01,
            }),
        );

        assert!(
            matches!(status, Ok(Reply::Status(_))),
            "status query should succeed"
        );
        assert_eq!(ack, Ok(Reply::Acknowledged), "settings change should succeed");

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.events,
            [
                Event::Write(STATUS_REQUEST.to_vec()),
                Event::Read(status_reply(0)),
                Event::Write(vec![0x5a, 0x5a, 0x04, 0x03, 0x01, 0x03, 0xfa]),
                Event::Read(ack_reply(0x03)),
            ],
            "second exchange should start after the first one completed"
        );
    }

    #[tokio::test]
    async fn work_time_reset_precedes_other_callers() {
        init_logger();

        let ctrl = TestController::new(
            MockPort::new([
                Some(status_reply(5)),
                Some(ack_reply(0x09)),
                Some(ack_reply(0x03)),
            ]),
            MockDelay::default(),
        );
        let (rec, ack) = tokio::join!(
            ctrl.query_status(),
            ctrl.set_mode_and_priority(0x02, 0x03),
        );

        assert!(rec.is_some(), "status should be returned");
        assert!(ack, "change should be acknowledged");

        let (port, _) = ctrl.into_parts();

        assert_eq!(
            port.writes(),
            [
                STATUS_REQUEST.as_slice(),
                RESET_REQUEST.as_slice(),
                [0x5a, 0x5a, 0x04, 0x03, 0x03, 0x05, 0xf6].as_slice(),
            ],
            "reset should be sent before the settings change"
        );
    }
}
