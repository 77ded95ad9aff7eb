use std::{collections::HashMap, sync::LazyLock};

use alloy_primitives::{Address, B256, keccak256};
use indexmap::IndexSet;
use quorum_contracts::IRolesAuth;
use tracing::info;

use crate::{BridgeError, Result};

/// May grant and revoke roles, pause, and manage validators.
pub static ADMIN_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256(b"ADMIN_ROLE"));
/// May change the registry's fee configuration.
pub static FEE_MANAGER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256(b"FEE_MANAGER_ROLE"));
/// Membership of the executor's validator set.
pub static VALIDATOR_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256(b"VALIDATOR_ROLE"));

/// Capability to account mapping. There is no role hierarchy: only [`ADMIN_ROLE`] holders may
/// grant or revoke any role, including the admin role itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolesAuth {
    members: HashMap<B256, IndexSet<Address>>,
}

impl RolesAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: B256, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|members| members.contains(&account))
    }

    pub fn check_role(&self, role: B256, account: Address) -> Result<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(BridgeError::access_denied(role, account))
        }
    }

    /// Accounts holding `role`, in the order they were granted it.
    pub fn members(&self, role: B256) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }

    /// Grants without a capability check. Returns whether membership changed.
    pub(crate) fn grant_role_internal(&mut self, role: B256, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    fn revoke_role_internal(&mut self, role: B256, account: Address) -> bool {
        self.members
            .get_mut(&role)
            .is_some_and(|members| members.shift_remove(&account))
    }

    /// Grants `call.role` to `call.account`. Emits nothing if the account already held it.
    pub fn grant_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::grantRoleCall,
    ) -> Result<Option<IRolesAuth::RoleMembershipUpdated>> {
        self.check_role(*ADMIN_ROLE, msg_sender)?;
        Ok(self.grant_role_internal(call.role, call.account).then(|| {
            info!(role = %call.role, account = %call.account, sender = %msg_sender, "role granted");
            IRolesAuth::RoleMembershipUpdated {
                role: call.role,
                account: call.account,
                sender: msg_sender,
                hasRole: true,
            }
        }))
    }

    pub fn revoke_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::revokeRoleCall,
    ) -> Result<Option<IRolesAuth::RoleMembershipUpdated>> {
        self.check_role(*ADMIN_ROLE, msg_sender)?;
        Ok(self.revoke_role_internal(call.role, call.account).then(|| {
            info!(role = %call.role, account = %call.account, sender = %msg_sender, "role revoked");
            IRolesAuth::RoleMembershipUpdated {
                role: call.role,
                account: call.account,
                sender: msg_sender,
                hasRole: false,
            }
        }))
    }

    /// Drops one of the caller's own roles. Never requires a capability.
    pub fn renounce_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::renounceRoleCall,
    ) -> Option<IRolesAuth::RoleMembershipUpdated> {
        self.revoke_role_internal(call.role, msg_sender).then(|| {
            info!(role = %call.role, account = %msg_sender, "role renounced");
            IRolesAuth::RoleMembershipUpdated {
                role: call.role,
                account: msg_sender,
                sender: msg_sender,
                hasRole: false,
            }
        })
    }
}
