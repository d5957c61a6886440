//! Orchestration: scan for a supported gamepad, decode its reports into
//! channel values and publish them until the device disappears.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::decode::{channel_count, ChannelMap};
use crate::hid::connection::Connection;
use crate::hid::scanner::Scanner;
use crate::hid::HidDescriptor;
use crate::rules::RuleSet;

/// Size of the broadcast channel used to publish decoded channel arrays
const BUFFER_SIZE: usize = 64;

/// Scans for supported gamepads and runs the decode loop for the first one
/// found. Only one device connection is active at a time; when it ends,
/// scanning resumes.
pub struct Manager {
    scanner: Scanner,
    scan_interval: Duration,
    tx: broadcast::Sender<Vec<i32>>,
}

impl Manager {
    pub fn new(rules: Arc<RuleSet>, scan_interval: Duration) -> Self {
        let (tx, _) = broadcast::channel(BUFFER_SIZE);
        Self {
            scanner: Scanner::new(rules),
            scan_interval,
            tx,
        }
    }

    /// Returns a receiver for decoded channel value arrays. One array is
    /// published per decoded report.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<i32>> {
        self.tx.subscribe()
    }

    /// Runs the scan/decode loop forever. Errors from a single device
    /// session end that session only; scanning resumes afterwards.
    pub async fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            match self.scanner.scan().await {
                Ok(Some((descriptor, channel_map))) => {
                    if let Err(e) = self.handle_device(descriptor, channel_map).await {
                        log::error!("Gamepad session ended with an error: {e}");
                    }
                }
                Ok(None) => {
                    log::trace!("No supported devices found");
                }
                Err(e) => {
                    log::error!("Unable to scan for devices: {e}");
                }
            }

            tokio::time::sleep(self.scan_interval).await;
        }
    }

    /// Decodes reports from a single device until it disappears
    async fn handle_device(
        &mut self,
        descriptor: HidDescriptor,
        channel_map: ChannelMap,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        log::info!("Using '{descriptor}' as virtual RC");

        let mut connection = Connection::new(descriptor.clone());
        connection.open().await?;

        let result = self.decode_loop(&mut connection, &channel_map).await;
        connection.close().await;

        log::info!("'{descriptor}' disconnected");
        result
    }

    /// Reads reports one at a time and applies the channel map to each,
    /// publishing a snapshot of the channel array after every report.
    /// Terminates when an empty report signals the end of the stream.
    async fn decode_loop(
        &mut self,
        connection: &mut Connection,
        channel_map: &ChannelMap,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut channels = vec![0i32; channel_count(channel_map)];

        loop {
            let report = connection.read().await?;
            if report.is_empty() {
                return Ok(());
            }

            // Definitions are applied in declaration order; later ones
            // targeting the same channel win
            for definition in channel_map.iter() {
                definition.update(&mut channels, &report);
            }

            // Ignore send errors; nobody may be listening yet
            let _ = self.tx.send(channels.clone());
        }
    }
}
