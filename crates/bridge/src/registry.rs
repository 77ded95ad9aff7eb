use alloy_primitives::{Address, B256, U256};
use quorum_contracts::{IMessageRegistry, IRolesAuth};
use quorum_primitives::Message;
use tracing::{debug, info};

use crate::{
    BridgeError, InvalidInput, Result,
    host::Host,
    pause::PauseGate,
    roles::{ADMIN_ROLE, FEE_MANAGER_ROLE, RolesAuth},
    storage::{Checkpointed, EventLog, atomic, atomic_local, contract_events},
};

contract_events! {
    /// Everything the registry emits.
    pub enum RegistryEvent {
        RequestForSignature(IMessageRegistry::RequestForSignature),
        NewFees(IMessageRegistry::NewFees),
        NewFeeReceiver(IMessageRegistry::NewFeeReceiver),
        PauseStateUpdate(IRolesAuth::PauseStateUpdate),
        RoleMembershipUpdated(IRolesAuth::RoleMembershipUpdated),
    }
}

/// Home-chain side of the bridge.
///
/// Assigns every request the next sequential id, commits to it with the canonical message hash
/// and announces it with `RequestForSignature`. An optional flat fee in a fungible token is
/// pulled from the caller on every request.
#[derive(Debug)]
pub struct MessageRegistry {
    address: Address,
    home_chain_id: u64,
    // indexed by id
    messages: Vec<Message>,
    fee_token: Address,
    fees: U256,
    fee_receiver: Address,
    roles: RolesAuth,
    pause: PauseGate,
    events: EventLog<RegistryEvent>,
}

impl MessageRegistry {
    /// Creates a registry with fees disabled. `owner` receives the admin and fee manager roles.
    pub fn new(address: Address, home_chain_id: u64, owner: Address) -> Self {
        let mut roles = RolesAuth::new();
        roles.grant_role_internal(*ADMIN_ROLE, owner);
        roles.grant_role_internal(*FEE_MANAGER_ROLE, owner);

        Self {
            address,
            home_chain_id,
            messages: Vec::new(),
            fee_token: Address::ZERO,
            fees: U256::ZERO,
            fee_receiver: Address::ZERO,
            roles,
            pause: PauseGate::default(),
            events: EventLog::default(),
        }
    }

    /// Registers a request for execution on `call.foreignChainId` and returns its id.
    pub fn send_message<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        msg_sender: Address,
        call: IMessageRegistry::sendMessageCall,
    ) -> Result<U256> {
        atomic(self, host, |this, host| {
            this.register(host, msg_sender, call)
        })
    }

    fn register<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        msg_sender: Address,
        call: IMessageRegistry::sendMessageCall,
    ) -> Result<U256> {
        self.pause.ensure_not_paused()?;
        if call.targetAddress.is_zero() {
            return Err(InvalidInput::ZeroTarget.into());
        }

        if self.fees_enabled() {
            let allowance = host.allowance(self.fee_token, msg_sender, self.address);
            if allowance < self.fees {
                debug!(%msg_sender, %allowance, fees = %self.fees, "fee approval missing");
                return Err(BridgeError::FeeApprovalMissing {
                    allowance,
                    required: self.fees,
                });
            }
        }

        let id = self.next_id();
        let message = Message::new(
            id,
            msg_sender,
            call.targetAddress,
            call.data,
            call.value,
            self.home_chain_id,
            call.foreignChainId,
        );
        let request = IMessageRegistry::RequestForSignature::from(&message);
        self.events.emit(request);
        let hash = message.hash;
        self.messages.push(message);

        if self.fees_enabled() {
            host.transfer_from(
                self.fee_token,
                self.address,
                msg_sender,
                self.fee_receiver,
                self.fees,
            )
            .map_err(|source| BridgeError::FeeTransferFailed {
                token: self.fee_token,
                from: msg_sender,
                amount: self.fees,
                source,
            })?;
        }

        info!(
            %id,
            sender = %msg_sender,
            target_address = %call.targetAddress,
            foreign_chain_id = call.foreignChainId,
            %hash,
            "message registered"
        );
        Ok(id)
    }

    /// Configures the flat fee. A zero token with a zero amount disables fees.
    pub fn set_fees(
        &mut self,
        msg_sender: Address,
        call: IMessageRegistry::setFeesCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*FEE_MANAGER_ROLE, msg_sender)?;
            if call.token.is_zero() != call.amount.is_zero() {
                return Err(InvalidInput::InconsistentFees {
                    token: call.token,
                    amount: call.amount,
                }
                .into());
            }

            this.fee_token = call.token;
            this.fees = call.amount;
            this.events.emit(IMessageRegistry::NewFees {
                token: call.token,
                amount: call.amount,
            });
            info!(token = %call.token, amount = %call.amount, "fees updated");
            Ok(())
        })
    }

    pub fn set_fee_receiver(
        &mut self,
        msg_sender: Address,
        call: IMessageRegistry::setFeeReceiverCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*FEE_MANAGER_ROLE, msg_sender)?;
            if call.receiver.is_zero() {
                return Err(InvalidInput::ZeroFeeReceiver.into());
            }

            let old = std::mem::replace(&mut this.fee_receiver, call.receiver);
            this.events.emit(IMessageRegistry::NewFeeReceiver {
                oldFeeReceiver: old,
                newFeeReceiver: call.receiver,
            });
            info!(old = %old, new = %call.receiver, "fee receiver updated");
            Ok(())
        })
    }

    pub fn set_pause(&mut self, msg_sender: Address, call: IRolesAuth::setPauseCall) -> Result<()> {
        atomic_local(self, |this| {
            let event = this.pause.set_pause(&this.roles, msg_sender, call)?;
            this.events.emit(event);
            Ok(())
        })
    }

    pub fn grant_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::grantRoleCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            if let Some(event) = this.roles.grant_role(msg_sender, call)? {
                this.events.emit(event);
            }
            Ok(())
        })
    }

    pub fn revoke_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::revokeRoleCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            if let Some(event) = this.roles.revoke_role(msg_sender, call)? {
                this.events.emit(event);
            }
            Ok(())
        })
    }

    pub fn renounce_role(&mut self, msg_sender: Address, call: IRolesAuth::renounceRoleCall) {
        if let Some(event) = self.roles.renounce_role(msg_sender, call) {
            self.events.emit(event);
        }
    }

    pub fn get_message(&self, id: U256) -> Option<&Message> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.messages.get(index))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn next_id(&self) -> U256 {
        U256::from(self.messages.len())
    }

    pub fn fees_enabled(&self) -> bool {
        !self.fee_token.is_zero() && !self.fees.is_zero()
    }

    pub fn fee_token(&self) -> Address {
        self.fee_token
    }

    pub fn fees(&self) -> U256 {
        self.fees
    }

    pub fn fee_receiver(&self) -> Address {
        self.fee_receiver
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn has_role(&self, role: B256, account: Address) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn home_chain_id(&self) -> u64 {
        self.home_chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn events(&self) -> &[RegistryEvent] {
        self.events.as_slice()
    }

    /// Drains the event log, e.g. for a relayer that has consumed it.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.events.take()
    }
}

/// Roles, pause state and fee settings are only written after their last fallible check, so
/// the append-only parts are all that can need undoing.
impl Checkpointed for MessageRegistry {
    type Checkpoint = (usize, usize);

    fn checkpoint(&self) -> Self::Checkpoint {
        (self.messages.len(), self.events.checkpoint())
    }

    fn revert_to(&mut self, (messages, events): Self::Checkpoint) {
        self.messages.truncate(messages);
        self.events.revert_to(events);
    }
}
