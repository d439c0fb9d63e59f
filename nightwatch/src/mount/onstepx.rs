//! OnStepX extension opcodes (§4.A ADDED, §6).
//!
//! PEC and driver-diagnostics commands ride the same `MountEngine::send_command`
//! gate as the base LX200 set; there is no separate connection or lock.

use crate::errors::NightwatchError;
use crate::mount::lx200::MountEngine;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PecStatus {
    pub recording: bool,
    pub playing: bool,
    pub ready: bool,
    pub index_detected: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DriverFault {
    pub raw: String,
    pub overtemperature: bool,
    pub stallguard: bool,
}

/// Thin extension layer over a `MountEngine`, mirroring the original
/// `OnStepXExtended(LX200Client)` subclass relationship as composition:
/// this holds a reference to the engine rather than inheriting from it.
pub struct OnStepXExtended<'a> {
    engine: &'a MountEngine,
}

impl<'a> OnStepXExtended<'a> {
    pub fn new(engine: &'a MountEngine) -> Self {
        Self { engine }
    }

    pub async fn pec_enable(&self) -> Result<(), NightwatchError> {
        self.engine.send_command("$QZ+").await?;
        Ok(())
    }

    pub async fn pec_disable(&self) -> Result<(), NightwatchError> {
        self.engine.send_command("$QZ-").await?;
        Ok(())
    }

    pub async fn pec_record(&self) -> Result<(), NightwatchError> {
        self.engine.send_command("$QZ/").await?;
        Ok(())
    }

    pub async fn pec_status(&self) -> Result<PecStatus, NightwatchError> {
        let raw = self.engine.send_command("$QZ?").await?;
        Ok(PecStatus {
            recording: raw.contains('R'),
            playing: raw.contains('P'),
            ready: !raw.contains('R') && !raw.contains('P'),
            index_detected: raw.contains('I'),
        })
    }

    pub async fn driver_diagnostics(&self) -> Result<DriverFault, NightwatchError> {
        let raw = self.engine.send_command("GXEE").await?;
        Ok(DriverFault {
            overtemperature: raw.contains('O'),
            stallguard: raw.contains('S'),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::lx200::{ConnectionState, MountConnection};
    use crate::mount::transport::MountTransport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct ScriptedTransport {
        replies: StdMutex<VecDeque<Vec<u8>>>,
    }

    #[async_trait]
    impl MountTransport for ScriptedTransport {
        async fn write_all(&mut self, _buf: &[u8]) -> Result<(), crate::errors::ConnectionError> {
            Ok(())
        }

        async fn read_until(
            &mut self,
            _terminator: u8,
            _timeout_after: Duration,
        ) -> Result<Vec<u8>, crate::errors::ConnectionError> {
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn pec_status_parses_ready_when_idle() {
        let engine = MountEngine::new(MountConnection::default());
        *engine.transport_for_test().await = Some(Box::new(ScriptedTransport {
            replies: StdMutex::new(VecDeque::from(vec![b"Ir#".to_vec()])),
        }) as Box<dyn MountTransport>);
        *engine.state_for_test().await = ConnectionState::Open;

        let ext = OnStepXExtended::new(&engine);
        let status = ext.pec_status().await.unwrap();
        assert!(status.ready);
        assert!(status.index_detected);
    }
}
