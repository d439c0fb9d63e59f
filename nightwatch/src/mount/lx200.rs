//! LX200 protocol engine (§4.A).
//!
//! Owns the single logical connection to the mount controller and
//! serializes every command exchange through one mutex gate, so request k
//! always completes (response or timeout) before request k+1 is written.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::constants::mount as mount_consts;
use crate::coords::{format_dec, format_ra, parse_dec, parse_ra};
use crate::database::{Database, MountCommandRecord};
use crate::errors::{ConnectionError, DeviceTimeout, ProtocolError};
use crate::mount::transport::{MountTransport, SerialMountTransport, TcpMountTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PierSide {
    East,
    West,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrackingRate {
    Sidereal,
    Lunar,
    Solar,
    King,
}

impl TrackingRate {
    fn opcode(self) -> &'static str {
        match self {
            TrackingRate::Sidereal => "TQ",
            TrackingRate::Lunar => "TL",
            TrackingRate::Solar => "TS",
            TrackingRate::King => "TK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Faulted,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MountStatus {
    pub ra_hours: f64,
    pub dec_deg: f64,
    pub is_tracking: bool,
    pub is_slewing: bool,
    pub is_parked: bool,
    pub pier_side: PierSide,
}

#[derive(Debug, Clone)]
pub enum MountConnection {
    Tcp { host: String, port: u16 },
    Serial { path: String, baud_rate: u32 },
}

impl Default for MountConnection {
    fn default() -> Self {
        MountConnection::Tcp {
            host: "192.168.1.100".to_string(),
            port: mount_consts::DEFAULT_TCP_PORT,
        }
    }
}

/// Serializes every exchange with the controller behind a single gate.
pub struct MountEngine {
    connection: MountConnection,
    transport: Mutex<Option<Box<dyn MountTransport>>>,
    state: Mutex<ConnectionState>,
    consecutive_write_timeouts: AtomicU32,
    database: OnceLock<Arc<Database>>,
}

impl MountEngine {
    pub fn new(connection: MountConnection) -> Self {
        Self {
            connection,
            transport: Mutex::new(None),
            state: Mutex::new(ConnectionState::Closed),
            consecutive_write_timeouts: AtomicU32::new(0),
            database: OnceLock::new(),
        }
    }

    /// Attaches the operational history database so every command passing
    /// through `send_command` gets logged. Set once, after the database
    /// itself is opened during startup.
    pub fn set_database(&self, database: Arc<Database>) {
        let _ = self.database.set(database);
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// Attempts the transport. On failure the state returns to `Closed` and
    /// the cause is surfaced; the engine never auto-reconnects.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        *self.state.lock().await = ConnectionState::Connecting;
        let opened: Result<Box<dyn MountTransport>, ConnectionError> = match &self.connection {
            MountConnection::Tcp { host, port } => {
                TcpMountTransport::connect(host, *port)
                    .await
                    .map(|t| Box::new(t) as Box<dyn MountTransport>)
            }
            MountConnection::Serial { path, baud_rate } => {
                SerialMountTransport::open(path, *baud_rate)
                    .map(|t| Box::new(t) as Box<dyn MountTransport>)
            }
        };

        match opened {
            Ok(transport) => {
                *self.transport.lock().await = Some(transport);
                *self.state.lock().await = ConnectionState::Open;
                self.consecutive_write_timeouts.store(0, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => {
                *self.state.lock().await = ConnectionState::Closed;
                Err(err)
            }
        }
    }

    pub async fn disconnect(&self) {
        *self.transport.lock().await = None;
        *self.state.lock().await = ConnectionState::Closed;
    }

    fn target_label(&self) -> String {
        match &self.connection {
            MountConnection::Tcp { host, port } => format!("{host}:{port}"),
            MountConnection::Serial { path, .. } => path.clone(),
        }
    }

    /// Sends `opcode` (without the leading `:` or trailing `#`) and returns
    /// the response payload with framing stripped. This is the single gate
    /// through which every command, base or OnStepX extension, passes.
    pub async fn send_command(&self, opcode: &str) -> Result<String, crate::errors::NightwatchError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or_else(|| ConnectionError::Faulted {
            target: self.target_label(),
        })?;

        let frame = format!(":{opcode}{}", mount_consts::TERMINATOR as char);
        if let Err(err) = transport.write_all(frame.as_bytes()).await {
            self.fault().await;
            self.record_command(opcode, false).await;
            return Err(err.into());
        }

        let raw = transport
            .read_until(mount_consts::TERMINATOR, mount_consts::COMMAND_TIMEOUT)
            .await;
        let bytes = match raw {
            Ok(bytes) => bytes,
            Err(err) => {
                self.fault().await;
                self.record_command(opcode, false).await;
                return Err(err.into());
            }
        };

        if bytes.is_empty() || *bytes.last().unwrap() != mount_consts::TERMINATOR {
            let timeouts = self.consecutive_write_timeouts.fetch_add(1, Ordering::SeqCst) + 1;
            if timeouts >= 2 {
                drop(guard);
                self.fault().await;
            }
            self.record_command(opcode, false).await;
            return Err(DeviceTimeout {
                device: "mount".to_string(),
                operation: opcode.to_string(),
                elapsed_ms: mount_consts::COMMAND_TIMEOUT.as_millis() as u64,
            }
            .into());
        }
        self.consecutive_write_timeouts.store(0, Ordering::SeqCst);

        let payload = String::from_utf8_lossy(&bytes[..bytes.len() - 1]).to_string();
        self.record_command(opcode, true).await;
        Ok(payload)
    }

    async fn record_command(&self, opcode: &str, ok: bool) {
        if let Some(database) = self.database.get() {
            let _ = database
                .record_mount_command(&MountCommandRecord {
                    at: chrono::Utc::now(),
                    opcode: opcode.to_string(),
                    ok,
                })
                .await;
        }
    }

    async fn fault(&self) {
        *self.state.lock().await = ConnectionState::Faulted;
    }

    pub async fn query_position(&self) -> Result<(f64, f64), crate::errors::NightwatchError> {
        let ra = self.send_command("GR").await?;
        let dec = self.send_command("GD").await?;
        let ra_hours = parse_ra(&ra)?;
        let dec_deg = parse_dec(&dec)?;
        Ok((ra_hours, dec_deg))
    }

    pub async fn set_target(
        &self,
        ra_hours: f64,
        dec_deg: f64,
    ) -> Result<(), crate::errors::NightwatchError> {
        let ra_ack = self.send_command(&format!("Sr{}", format_ra(ra_hours))).await?;
        if ra_ack != "1" {
            return Err(ProtocolError {
                context: "set_target".to_string(),
                reason: format!("controller rejected target RA (got '{ra_ack}')"),
            }
            .into());
        }
        let dec_ack = self.send_command(&format!("Sd{}", format_dec(dec_deg))).await?;
        if dec_ack != "1" {
            return Err(ProtocolError {
                context: "set_target".to_string(),
                reason: format!("controller rejected target Dec (got '{dec_ack}')"),
            }
            .into());
        }
        Ok(())
    }

    pub async fn slew(&self) -> Result<(), crate::errors::NightwatchError> {
        let ack = self.send_command("MS").await?;
        if ack != "0" {
            return Err(ProtocolError {
                context: "slew".to_string(),
                reason: format!("controller refused slew (got '{ack}')"),
            }
            .into());
        }
        Ok(())
    }

    pub async fn sync(&self, ra_hours: f64, dec_deg: f64) -> Result<(), crate::errors::NightwatchError> {
        self.send_command(&format!("Sr{}", format_ra(ra_hours))).await?;
        self.send_command(&format!("Sd{}", format_dec(dec_deg))).await?;
        self.send_command("CM").await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), crate::errors::NightwatchError> {
        self.fire_and_forget("Q").await
    }

    pub async fn stop_axis(&self, axis: char) -> Result<(), crate::errors::NightwatchError> {
        self.fire_and_forget(&format!("Q{axis}")).await
    }

    /// Sends a no-reply opcode (§6: `Q`, `Qn/Qs/Qe/Qw`). The controller
    /// never sends a terminator for these, so this writes under the same
    /// gate as `send_command` but returns immediately after the write
    /// instead of waiting out the command timeout for a reply that will
    /// never arrive.
    async fn fire_and_forget(&self, opcode: &str) -> Result<(), crate::errors::NightwatchError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or_else(|| ConnectionError::Faulted {
            target: self.target_label(),
        })?;

        let frame = format!(":{opcode}{}", mount_consts::TERMINATOR as char);
        let result = transport.write_all(frame.as_bytes()).await;
        drop(guard);

        match result {
            Ok(()) => {
                self.record_command(opcode, true).await;
                Ok(())
            }
            Err(err) => {
                self.fault().await;
                self.record_command(opcode, false).await;
                Err(err.into())
            }
        }
    }

    pub async fn park(&self) -> Result<bool, crate::errors::NightwatchError> {
        Ok(self.send_command("hP").await? == "1")
    }

    pub async fn unpark(&self) -> Result<bool, crate::errors::NightwatchError> {
        Ok(self.send_command("hR").await? == "1")
    }

    pub async fn home(&self) -> Result<bool, crate::errors::NightwatchError> {
        Ok(self.send_command("hC").await? == "1")
    }

    pub async fn start_tracking(&self) -> Result<bool, crate::errors::NightwatchError> {
        Ok(self.send_command("Te").await? == "1")
    }

    pub async fn stop_tracking(&self) -> Result<bool, crate::errors::NightwatchError> {
        Ok(self.send_command("Td").await? == "1")
    }

    pub async fn set_tracking_rate(
        &self,
        rate: TrackingRate,
    ) -> Result<(), crate::errors::NightwatchError> {
        self.send_command(rate.opcode()).await?;
        Ok(())
    }

    /// Composite status: fails as *protocol* if any required field cannot
    /// be parsed out of the controller's responses.
    pub async fn get_status(&self) -> Result<MountStatus, crate::errors::NightwatchError> {
        let (ra_hours, dec_deg) = self.query_position().await?;

        let pier_raw = self.send_command("Gm").await?;
        let pier_side = match pier_raw.as_str() {
            "E" => PierSide::East,
            "W" => PierSide::West,
            _ => PierSide::Unknown,
        };

        let tracking_raw = self.send_command("GW").await?;
        let mut chars = tracking_raw.chars();
        let is_tracking = chars.next() == Some('T');
        let is_slewing = chars.next() == Some('S');

        let parked_raw = self.send_command("GU").await?;
        let is_parked = parked_raw.contains('P');

        Ok(MountStatus {
            ra_hours,
            dec_deg,
            is_tracking,
            is_slewing,
            is_parked,
            pier_side,
        })
    }
}

#[allow(dead_code)]
fn default_command_timeout() -> Duration {
    mount_consts::COMMAND_TIMEOUT
}

#[cfg(test)]
impl MountEngine {
    pub(crate) async fn transport_for_test(
        &self,
    ) -> tokio::sync::MutexGuard<'_, Option<Box<dyn MountTransport>>> {
        self.transport.lock().await
    }

    pub(crate) async fn state_for_test(&self) -> tokio::sync::MutexGuard<'_, ConnectionState> {
        self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::transport::MountTransport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct ScriptedTransport {
        replies: StdMutex<VecDeque<Vec<u8>>>,
        sent: StdMutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: StdMutex::new(replies.into_iter().map(|r| r.as_bytes().to_vec()).collect()),
                sent: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MountTransport for ScriptedTransport {
        async fn write_all(&mut self, buf: &[u8]) -> Result<(), ConnectionError> {
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(buf).to_string());
            Ok(())
        }

        async fn read_until(
            &mut self,
            _terminator: u8,
            _timeout_after: Duration,
        ) -> Result<Vec<u8>, ConnectionError> {
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    async fn engine_with(replies: Vec<&str>) -> MountEngine {
        let engine = MountEngine::new(MountConnection::default());
        *engine.transport.lock().await = Some(Box::new(ScriptedTransport::new(replies)));
        *engine.state.lock().await = ConnectionState::Open;
        engine
    }

    #[tokio::test]
    async fn query_position_parses_both_fields() {
        let engine = engine_with(vec!["00:42:45#", "+41*16:09#"]).await;
        let (ra, dec) = engine.query_position().await.unwrap();
        assert!((ra - 0.7125).abs() < 1e-3);
        assert!((dec - 41.2692).abs() < 1e-3);
    }

    #[tokio::test]
    async fn set_target_fails_when_controller_rejects_ra() {
        let engine = engine_with(vec!["0#"]).await;
        let result = engine.set_target(0.7125, 41.2692).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn slew_succeeds_on_zero_ack() {
        let engine = engine_with(vec!["0#"]).await;
        assert!(engine.slew().await.is_ok());
    }

    #[tokio::test]
    async fn get_status_composes_four_queries() {
        let engine = engine_with(vec![
            "00:42:45#",
            "+41*16:09#",
            "E#",
            "TS#",
            "#",
        ])
        .await;
        let status = engine.get_status().await.unwrap();
        assert_eq!(status.pier_side, PierSide::East);
        assert!(status.is_tracking);
        assert!(status.is_slewing);
        assert!(!status.is_parked);
    }

    #[tokio::test]
    async fn missing_terminator_is_a_timeout_not_a_panic() {
        let engine = engine_with(vec!["no terminator here"]).await;
        let result = engine.send_command("GR").await;
        assert!(result.is_err());
    }
}
