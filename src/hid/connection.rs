//! Connection to a single gamepad device. A blocking reader thread polls
//! the device and forwards each report, in order, over a bounded channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hidapi::{HidApi, HidDevice, HidError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::hid::HidDescriptor;

/// Size of the buffer a single report is read into
const REPORT_BUFFER_SIZE: usize = 256;
/// Per-read timeout so the reader observes a stop request promptly
const READ_TIMEOUT_MS: i32 = 250;
/// How long to wait for the reader thread to acknowledge a stop request
const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);
/// Size of the report channel between the reader thread and the consumer
const CHANNEL_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Device error: {0}")]
    Hid(#[from] HidError),
    #[error("Connection is not open")]
    NotOpen,
    #[error("Reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Lifecycle state of a [Connection]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Connection to a single HID gamepad. While open, a reader thread polls
/// the device with a bounded timeout and forwards every non-empty report;
/// device disappearance is translated into a single empty report that
/// signals the end of the stream.
pub struct Connection {
    descriptor: HidDescriptor,
    state: ConnectionState,
    rx: Option<mpsc::Receiver<Vec<u8>>>,
    stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<HidError>>>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(descriptor: HidDescriptor) -> Self {
        Self {
            descriptor,
            state: ConnectionState::Closed,
            rx: None,
            stop: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Opens the device and starts the reader thread. An open failure is
    /// reported to the caller and leaves the connection closed; it is not
    /// retried here.
    pub async fn open(&mut self) -> Result<(), ConnectionError> {
        self.state = ConnectionState::Opening;
        let path = self.descriptor.path.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<HidDevice, HidError> {
            let api = HidApi::new()?;
            api.open_path(&path)
        })
        .await;

        // Any open failure leaves the connection closed
        let device = match result {
            Ok(Ok(device)) => device,
            Ok(Err(err)) => {
                self.state = ConnectionState::Closed;
                return Err(err.into());
            }
            Err(err) => {
                self.state = ConnectionState::Closed;
                return Err(err.into());
            }
        };

        let (tx, rx) = mpsc::channel(CHANNEL_SIZE);
        self.rx = Some(rx);
        self.stop = Arc::new(AtomicBool::new(false));
        self.failure = Arc::new(Mutex::new(None));

        let stop = self.stop.clone();
        let failure = self.failure.clone();
        self.task = Some(tokio::task::spawn_blocking(move || {
            reader_loop(device, tx, stop, failure);
        }));

        log::debug!("Opened connection to {}", self.descriptor);
        self.state = ConnectionState::Open;

        Ok(())
    }

    /// Receives the next report from the device. An empty report means the
    /// device disappeared and the stream has ended; any other read failure
    /// surfaces as an error and ends the connection attempt.
    pub async fn read(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(ConnectionError::NotOpen);
        };

        match rx.recv().await {
            Some(report) => Ok(report),
            None => {
                // The reader thread is gone; figure out why
                let failure = self.failure.lock().ok().and_then(|mut slot| slot.take());
                match failure {
                    Some(err) => Err(ConnectionError::Hid(err)),
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    /// Signals the reader thread to stop and waits for it, bounded by a
    /// timeout. Exceeding the timeout only logs a warning; the thread will
    /// exit on its own once its current read times out.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closing;
        self.stop.store(true, Ordering::Relaxed);

        if let Some(task) = self.task.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                log::warn!(
                    "Timed out waiting for the reader thread of {} to stop",
                    self.descriptor
                );
            }
        }

        self.rx = None;
        self.state = ConnectionState::Closed;
        log::debug!("Closed connection to {}", self.descriptor);
    }
}

/// Main loop of the reader thread
fn reader_loop(
    device: HidDevice,
    tx: mpsc::Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<HidError>>>,
) {
    let mut buf = [0u8; REPORT_BUFFER_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match device.read_timeout(&mut buf, READ_TIMEOUT_MS) {
            // Timed out without data; check the stop flag and poll again
            Ok(0) => continue,
            Ok(len) => {
                if tx.blocking_send(buf[..len].to_vec()).is_err() {
                    // Consumer is gone
                    break;
                }
            }
            Err(err) if is_disconnect_error(&err) => {
                log::debug!("Device disappeared: {err}");
                let _ = tx.blocking_send(Vec::new());
                break;
            }
            Err(err) => {
                log::debug!("Read failed: {err}");
                if let Ok(mut slot) = failure.lock() {
                    *slot = Some(err);
                }
                break;
            }
        }
    }
}

/// Returns whether the given read error means the device disappeared, as
/// opposed to some other I/O failure. hidapi only exposes the platform
/// error string, so this goes by the messages the backends produce when
/// the device node is gone.
pub(crate) fn is_disconnect_error(err: &HidError) -> bool {
    match err {
        HidError::HidApiError { message } => {
            let message = message.to_lowercase();
            message.contains("read error")
                || message.contains("no such device")
                || message.contains("disconnect")
        }
        _ => false,
    }
}
