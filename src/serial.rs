//! Native asynchronous serial port support for [`Controller`](crate::Controller).
//!
//! Uses the [`serial2-tokio`](https://crates.io/crates/serial2-tokio) crate.

extern crate std;

use crate::{BAUD_RATE, Error};
use alloc::collections::vec_deque::VecDeque;
use core::time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_io::{ErrorType, ReadReady};
use embedded_io_adapters::tokio_1::FromTokio;
use embedded_io_async::{Read, Write};
use futures::FutureExt;
use serial2_tokio::{CharSize, FlowControl, Parity, SerialPort, Settings, StopBits};
use tokio::io::{AsyncRead, AsyncWrite};

// Bytes fetched while polling for available input
const POLL_SIZE: usize = 64;

/// Serial port implementing [`Read`], [`Write`] and [`ReadReady`].
///
/// Wraps any Tokio byte stream, a [`SerialPort`] by default.
/// Input received while checking for readiness is buffered
/// and returned by subsequent reads.
pub struct Port<T = SerialPort> {
    inner: FromTokio<T>,
    pending: VecDeque<u8>,
}

impl<T> Port<T> {
    /// Wraps a Tokio byte stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner: FromTokio::new(inner),
            pending: VecDeque::new(),
        }
    }
}

/// Port-specific error type to be used as `E` for the generic [`Error<E>`] type.
pub type PortError = <Port as ErrorType>::Error;

impl<T> ErrorType for Port<T> {
    type Error = std::io::Error;
}

impl<T: AsyncRead + Unpin> Read for Port<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.pending.is_empty() {
            return self.inner.read(buf).await;
        }

        let len = buf.len().min(self.pending.len());

        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..len)) {
            *dst = src;
        }

        Ok(len)
    }
}

impl<T: AsyncWrite + Unpin> Write for Port<T> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.inner.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().await
    }
}

impl<T: AsyncRead + Unpin> ReadReady for Port<T> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        let mut buf = [0x00; POLL_SIZE];

        // Single poll, never waits for input
        match self.inner.read(&mut buf).now_or_never() {
            Some(Ok(len)) => {
                self.pending.extend(&buf[..len]);

                Ok(len > 0)
            }
            Some(Err(err)) => Err(err),
            None => Ok(false),
        }
    }
}

/// Delay backed by the Tokio timer.
#[derive(Default, Copy, Clone, Debug)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(ns.into())).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        tokio::time::sleep(Duration::from_millis(ms.into())).await;
    }
}

/// Opens a native serial port at the given path.
///
/// The port is configured for 9600 baud, 8 data bits, no parity and 1 stop bit.
/// Returns a [`Port`] that can be passed to [`Controller::new`](crate::Controller::new).
pub fn open(path: &str) -> Result<Port, Error<PortError>> {
    let port = SerialPort::open(path, |mut settings: Settings| {
        settings.set_raw();
        settings.set_baud_rate(BAUD_RATE)?;
        settings.set_char_size(CharSize::Bits8);
        settings.set_parity(Parity::None);
        settings.set_stop_bits(StopBits::One);
        settings.set_flow_control(FlowControl::None);

        Ok(settings)
    })
    .map_err(Error::Io)?;

    port.discard_buffers().map_err(Error::Io)?;

    Ok(Port::new(port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    fn connect() -> (Port<DuplexStream>, DuplexStream) {
        let (local, remote) = duplex(POLL_SIZE);

        (Port::new(local), remote)
    }

    #[tokio::test]
    async fn read_ready_buffers_input() -> Result<(), PortError> {
        let (mut port, mut remote) = connect();

        assert!(!port.read_ready()?, "port should not be ready without input");

        AsyncWriteExt::write_all(&mut remote, &[0x5a, 0x5a, 0x02]).await?;

        assert!(port.read_ready()?, "port should be ready with input");
        assert!(
            port.read_ready()?,
            "port should stay ready while input is buffered"
        );

        let mut buf = [0x00; 8];
        let len = Read::read(&mut port, &mut buf).await?;

        assert_eq!(
            buf[..len],
            [0x5a, 0x5a, 0x02],
            "buffered input should be returned by read"
        );
        assert!(!port.read_ready()?, "port should not be ready after read");

        Ok(())
    }

    #[tokio::test]
    async fn read_and_write_pass_through() -> Result<(), PortError> {
        let (mut port, mut remote) = connect();

        Write::write_all(&mut port, &[0x5a, 0x5a, 0x02, 0x01, 0xfd]).await?;
        Write::flush(&mut port).await?;

        let mut req = [0x00; 5];

        AsyncReadExt::read_exact(&mut remote, &mut req).await?;

        assert_eq!(
            req,
            [0x5a, 0x5a, 0x02, 0x01, 0xfd],
            "written data should reach the other end"
        );

        AsyncWriteExt::write_all(&mut remote, &[0x13, 0x37]).await?;

        let mut buf = [0x00; 2];
        let len = Read::read(&mut port, &mut buf).await?;

        assert_eq!(buf[..len], [0x13, 0x37], "read should return incoming data");

        Ok(())
    }
}
