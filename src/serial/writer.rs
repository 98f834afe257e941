//! Asynchronous DSM frame writer
//!
//! The receive loop runs on a blocking thread and must never wait on the
//! UART. [`SerialOutput`] hands each frame to a tokio task over a one-slot
//! channel and raises a busy flag; the task clears the flag once the frame
//! has been written and flushed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::port_trait::SerialPortIO;
use crate::dsm::protocol::OutputFrame;
use crate::dsm::scheduler::OutputTransport;
use crate::error::{Result, RxError};

/// Loop-side handle of the DSM writer
#[derive(Debug)]
pub struct SerialOutput {
    busy: Arc<AtomicBool>,
    frames: mpsc::Sender<OutputFrame>,
}

impl OutputTransport for SerialOutput {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn send(&mut self, frame: OutputFrame) -> Result<()> {
        debug_assert!(!self.is_busy(), "send() while a frame is in flight");
        self.busy.store(true, Ordering::Release);
        self.frames.try_send(frame).map_err(|e| {
            self.busy.store(false, Ordering::Release);
            RxError::Serial(format!("DSM writer unavailable: {}", e))
        })
    }
}

/// Spawn the writer task on the current runtime
///
/// The task ends when the [`SerialOutput`] is dropped. Write failures are
/// logged and the frame is dropped; the next cadence tick sends a fresh one.
pub fn spawn_writer<P>(port: P) -> (SerialOutput, JoinHandle<u64>)
where
    P: SerialPortIO + 'static,
{
    let busy = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(write_frames(port, rx, busy.clone()));
    (SerialOutput { busy, frames: tx }, handle)
}

/// Returns the number of frames written
async fn write_frames<P: SerialPortIO>(
    mut port: P,
    mut frames: mpsc::Receiver<OutputFrame>,
    busy: Arc<AtomicBool>,
) -> u64 {
    let mut written: u64 = 0;

    while let Some(frame) = frames.recv().await {
        match write_frame(&mut port, &frame).await {
            Ok(()) => written += 1,
            Err(e) => warn!("Failed to write DSM frame: {}", e),
        }
        busy.store(false, Ordering::Release);
    }

    debug!("DSM writer stopped after {} frames", written);
    written
}

async fn write_frame<P: SerialPortIO>(port: &mut P, frame: &OutputFrame) -> Result<()> {
    port.write_all(frame.as_bytes())
        .await
        .map_err(|e| RxError::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| RxError::Serial(format!("Failed to flush serial port: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsm::encoder::encode_frame;
    use crate::dsm::protocol::Resolution;
    use crate::serial::port_trait::mocks::MockSerialPort;
    use std::io;

    #[tokio::test]
    async fn test_frame_reaches_port_and_clears_busy() {
        let port = MockSerialPort::new();
        let (mut output, handle) = spawn_writer(port.clone());
        let frame = encode_frame(&[1500; 7], Resolution::TenBit);

        assert!(!output.is_busy());
        output.send(frame).unwrap();
        assert!(output.is_busy(), "busy until the writer has run");

        let busy = output.busy.clone();
        drop(output);
        assert_eq!(handle.await.unwrap(), 1);

        assert!(!busy.load(Ordering::Acquire));
        assert_eq!(port.get_written_data(), vec![frame.as_bytes().to_vec()]);
    }

    #[tokio::test]
    async fn test_write_error_still_clears_busy() {
        let port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);
        let (mut output, handle) = spawn_writer(port.clone());

        output.send(encode_frame(&[1000; 7], Resolution::TenBit)).unwrap();
        let busy = output.busy.clone();
        drop(output);

        assert_eq!(handle.await.unwrap(), 0);
        assert!(!busy.load(Ordering::Acquire));
        assert!(port.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_flush_error_counts_as_failed_frame() {
        let port = MockSerialPort::new();
        port.set_flush_error(io::ErrorKind::TimedOut);
        let (mut output, handle) = spawn_writer(port);

        output.send(encode_frame(&[1000; 7], Resolution::TenBit)).unwrap();
        drop(output);
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sequential_frames_in_order() {
        let port = MockSerialPort::new();
        let (mut output, handle) = spawn_writer(port.clone());
        let first = encode_frame(&[1000; 7], Resolution::TenBit);
        let second = encode_frame(&[2000; 7], Resolution::TenBit);

        output.send(first).unwrap();
        while output.is_busy() {
            tokio::task::yield_now().await;
        }
        output.send(second).unwrap();
        drop(output);

        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(
            port.get_written_data(),
            vec![first.as_bytes().to_vec(), second.as_bytes().to_vec()]
        );
    }

    #[tokio::test]
    async fn test_send_after_writer_gone_fails() {
        let (mut output, handle) = spawn_writer(MockSerialPort::new());
        handle.abort();
        let _ = handle.await;

        let result = output.send(encode_frame(&[1500; 7], Resolution::TenBit));
        assert!(matches!(result, Err(RxError::Serial(_))));
        assert!(!output.is_busy());
    }

    #[test]
    fn test_writer_runs_on_plain_runtime() {
        tokio_test::block_on(async {
            let port = MockSerialPort::new();
            let (mut output, handle) = spawn_writer(port.clone());
            output.send(encode_frame(&[1500; 7], Resolution::ElevenBit)).unwrap();
            drop(output);
            assert_eq!(handle.await.unwrap(), 1);
        });
    }
}
