use alloy_primitives::Address;
use quorum_contracts::IRolesAuth;
use tracing::info;

use crate::{
    BridgeError, Result,
    roles::{ADMIN_ROLE, RolesAuth},
};

/// Admin-controlled kill switch. Each component embeds its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseGate {
    paused: bool,
}

impl PauseGate {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            Err(BridgeError::ServicePaused)
        } else {
            Ok(())
        }
    }

    pub fn set_pause(
        &mut self,
        roles: &RolesAuth,
        msg_sender: Address,
        call: IRolesAuth::setPauseCall,
    ) -> Result<IRolesAuth::PauseStateUpdate> {
        roles.check_role(*ADMIN_ROLE, msg_sender)?;
        self.paused = call.paused;
        info!(updater = %msg_sender, paused = call.paused, "pause state updated");
        Ok(IRolesAuth::PauseStateUpdate {
            updater: msg_sender,
            isPaused: call.paused,
        })
    }
}
