use std::collections::HashMap;

use alloy_primitives::{Address, B256, Bytes, U256};
use indexmap::IndexMap;
use quorum_contracts::{IMessageExecutor, IRolesAuth};
use quorum_primitives::{
    DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, Eip712Domain, Message, bridge_domain,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    BridgeError, InvalidInput, Result,
    host::{CallFrame, Host},
    pause::PauseGate,
    roles::{ADMIN_ROLE, RolesAuth, VALIDATOR_ROLE},
    storage::{Checkpointed, EventLog, atomic, atomic_local, contract_events},
    validator_set::{Quorum, ValidatorSet},
    verifier::SignatureVerifier,
};

contract_events! {
    /// Everything the executor emits.
    pub enum ExecutorEvent {
        MessageExecuted(IMessageExecutor::MessageExecuted),
        MessageFailed(IMessageExecutor::MessageFailed),
        NewQuorumRatio(IMessageExecutor::NewQuorumRatio),
        NewRequiredSignatures(IMessageExecutor::NewRequiredSignatures),
        ValidatorsAdded(IMessageExecutor::ValidatorsAdded),
        ValidatorsRemoved(IMessageExecutor::ValidatorsRemoved),
        PauseStateUpdate(IRolesAuth::PauseStateUpdate),
        RoleMembershipUpdated(IRolesAuth::RoleMembershipUpdated),
    }
}

/// Construction parameters for a [`MessageExecutor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Receives the admin role.
    pub owner: Address,
    pub validators: Vec<Address>,
    pub quorum: Quorum,
    pub domain_name: String,
    pub domain_version: String,
    /// Only the original sender of a message may submit it for execution.
    pub sender_only: bool,
}

impl ExecutorConfig {
    pub fn new(owner: Address, validators: Vec<Address>, quorum: Quorum) -> Self {
        Self {
            owner,
            validators,
            quorum,
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            domain_version: DEFAULT_DOMAIN_VERSION.to_string(),
            sender_only: false,
        }
    }

    pub fn with_sender_only(mut self, sender_only: bool) -> Self {
        self.sender_only = sender_only;
        self
    }
}

/// Proof that a message ran: the validators whose signatures carried it and the message itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub validators: Vec<Address>,
    pub message: Message,
}

/// Result of an accepted `execute_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The target call succeeded and the message is now terminal.
    Executed {
        validators: Vec<Address>,
        output: Bytes,
    },
    /// The target call reverted without value attached. The message stays retryable.
    Failed { reason: Bytes },
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MessageStatus {
    Pending,
    Failed { attempts: u32 },
    Executed,
}

/// Foreign-chain side of the bridge.
///
/// A message moves from pending to executed exactly once, after a quorum of validators signed
/// it. A target call that reverts with no value attached is a soft failure: it is logged and
/// counted but the message stays pending. With value attached the whole call is rejected.
#[derive(Debug)]
pub struct MessageExecutor {
    address: Address,
    chain_id: u64,
    domain: Eip712Domain,
    sender_only: bool,
    validators: ValidatorSet,
    roles: RolesAuth,
    pause: PauseGate,
    records: IndexMap<U256, ExecutionRecord>,
    failures: HashMap<U256, u32>,
    events: EventLog<ExecutorEvent>,
}

impl MessageExecutor {
    pub fn new(address: Address, chain_id: u64, config: ExecutorConfig) -> Result<Self> {
        let validators = ValidatorSet::new(config.validators, config.quorum)?;
        let mut roles = RolesAuth::new();
        roles.grant_role_internal(*ADMIN_ROLE, config.owner);

        info!(
            %address,
            chain_id,
            validators = validators.len(),
            quorum = %validators.quorum(),
            sender_only = config.sender_only,
            "executor initialized"
        );

        Ok(Self {
            address,
            chain_id,
            domain: bridge_domain(
                config.domain_name,
                config.domain_version,
                chain_id,
                address,
            ),
            sender_only: config.sender_only,
            validators,
            roles,
            pause: PauseGate::default(),
            records: IndexMap::new(),
            failures: HashMap::new(),
            events: EventLog::default(),
        })
    }

    /// Executes `message` if it carries a quorum of validator signatures.
    ///
    /// `attached_value` is moved from `msg_sender` to the executor and must equal
    /// `message.value`, which is then forwarded to the target.
    pub fn execute_message<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        msg_sender: Address,
        attached_value: U256,
        signatures: &[Bytes],
        message: &Message,
    ) -> Result<ExecutionOutcome> {
        atomic(self, host, |this, host| {
            this.execute(host, msg_sender, attached_value, signatures, message)
        })
    }

    fn execute<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        msg_sender: Address,
        attached_value: U256,
        signatures: &[Bytes],
        message: &Message,
    ) -> Result<ExecutionOutcome> {
        self.pause.ensure_not_paused()?;
        let id = message.id;
        if self.records.contains_key(&id) {
            return Err(BridgeError::AlreadyExecuted(id));
        }
        self.check_policy(msg_sender, message)?;

        let validators = SignatureVerifier::new(&self.domain, &self.validators)
            .check_quorum(signatures, message)?;

        if attached_value != message.value {
            return Err(BridgeError::ValueMismatch {
                attached: attached_value,
                expected: message.value,
            });
        }
        host.transfer(msg_sender, self.address, attached_value)?;

        let frame = CallFrame {
            caller: self.address,
            target: message.target_address,
            data: &message.data,
            value: message.value,
        };
        match host.call(frame) {
            Ok(output) => {
                self.events.emit(IMessageExecutor::MessageExecuted {
                    validators: validators.clone(),
                    sender: message.sender,
                    targetAddress: message.target_address,
                    data: message.data.clone(),
                    value: message.value,
                    id,
                    homeChainId: message.home_chain_id,
                    foreignChainId: message.foreign_chain_id,
                    hash: message.hash,
                });
                let record = ExecutionRecord {
                    validators: validators.clone(),
                    message: message.clone(),
                };
                self.records.insert(id, record);
                info!(
                    %id,
                    hash = %message.hash,
                    signers = validators.len(),
                    "message executed"
                );
                Ok(ExecutionOutcome::Executed { validators, output })
            }
            Err(revert) if message.value.is_zero() => {
                self.events.emit(IMessageExecutor::MessageFailed {
                    sender: message.sender,
                    targetAddress: message.target_address,
                    data: message.data.clone(),
                    value: message.value,
                    id,
                    homeChainId: message.home_chain_id,
                    foreignChainId: message.foreign_chain_id,
                    hash: message.hash,
                    reason: revert.reason.clone(),
                });
                let attempts = self.failures.entry(id).or_default();
                *attempts = attempts.saturating_add(1);
                warn!(
                    %id,
                    attempts = *attempts,
                    %revert,
                    "target call failed, message stays pending"
                );
                Ok(ExecutionOutcome::Failed {
                    reason: revert.reason,
                })
            }
            Err(revert) => {
                debug!(%id, value = %message.value, %revert, "target call with value reverted");
                Err(BridgeError::ExecutionReverted {
                    id,
                    value: message.value,
                    reason: revert.reason,
                })
            }
        }
    }

    fn check_policy(&self, msg_sender: Address, message: &Message) -> Result<()> {
        if message.foreign_chain_id != self.chain_id {
            return Err(InvalidInput::WrongDestination {
                expected: self.chain_id,
                actual: message.foreign_chain_id,
            }
            .into());
        }

        let expected = message.compute_hash();
        if expected != message.hash {
            return Err(InvalidInput::HashMismatch {
                expected,
                actual: message.hash,
            }
            .into());
        }

        if self.sender_only && msg_sender != message.sender {
            return Err(BridgeError::OnlyOriginalSender {
                sender: message.sender,
                caller: msg_sender,
            });
        }
        Ok(())
    }

    pub fn add_validators(
        &mut self,
        msg_sender: Address,
        call: IMessageExecutor::addValidatorsCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*ADMIN_ROLE, msg_sender)?;
            this.validators.add_validators(&call.validators)?;
            info!(
                added = call.validators.len(),
                total = this.validators.len(),
                required = this.validators.required_signatures(),
                "validators added"
            );
            this.events.emit(IMessageExecutor::ValidatorsAdded {
                validators: call.validators,
            });
            Ok(())
        })
    }

    pub fn remove_validators(
        &mut self,
        msg_sender: Address,
        call: IMessageExecutor::removeValidatorsCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*ADMIN_ROLE, msg_sender)?;
            this.validators.remove_validators(&call.validators)?;
            info!(
                removed = call.validators.len(),
                total = this.validators.len(),
                required = this.validators.required_signatures(),
                "validators removed"
            );
            this.events.emit(IMessageExecutor::ValidatorsRemoved {
                validators: call.validators,
            });
            Ok(())
        })
    }

    pub fn set_quorum_ratio(
        &mut self,
        msg_sender: Address,
        call: IMessageExecutor::setQuorumRatioCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*ADMIN_ROLE, msg_sender)?;
            let len = this.validators.len();
            let previous = this.validators.set_quorum(Quorum::Ratio {
                numerator: call.numerator,
                denominator: call.denominator,
            })?;
            let (old_numerator, old_denominator) = previous.as_ratio(len);
            info!(
                quorum = %this.validators.quorum(),
                required = this.validators.required_signatures(),
                "quorum ratio updated"
            );
            this.events.emit(IMessageExecutor::NewQuorumRatio {
                oldNumerator: old_numerator,
                oldDenominator: old_denominator,
                newNumerator: call.numerator,
                newDenominator: call.denominator,
            });
            Ok(())
        })
    }

    pub fn set_required_signatures(
        &mut self,
        msg_sender: Address,
        call: IMessageExecutor::setRequiredSignaturesCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            this.roles.check_role(*ADMIN_ROLE, msg_sender)?;
            let old = this.validators.required_signatures() as u64;
            this.validators.set_quorum(Quorum::Fixed(call.required))?;
            info!(old, new = call.required, "required signatures updated");
            this.events.emit(IMessageExecutor::NewRequiredSignatures {
                oldRequired: old,
                newRequired: call.required,
            });
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

    /// Granting [`VALIDATOR_ROLE`] adds the account to the validator set.
    pub fn grant_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::grantRoleCall,
    ) -> Result<()> {
        if call.role == *VALIDATOR_ROLE {
            let add = IMessageExecutor::addValidatorsCall {
                validators: vec![call.account],
            };
            return self.add_validators(msg_sender, add);
        }
        atomic_local(self, |this| {
            if let Some(event) = this.roles.grant_role(msg_sender, call)? {
                this.events.emit(event);
            }
            Ok(())
        })
    }

    /// Revoking [`VALIDATOR_ROLE`] removes the account from the validator set.
    pub fn revoke_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::revokeRoleCall,
    ) -> Result<()> {
        if call.role == *VALIDATOR_ROLE {
            let remove = IMessageExecutor::removeValidatorsCall {
                validators: vec![call.account],
            };
            return self.remove_validators(msg_sender, remove);
        }
        atomic_local(self, |this| {
            if let Some(event) = this.roles.revoke_role(msg_sender, call)? {
                this.events.emit(event);
            }
            Ok(())
        })
    }

    /// A validator renouncing its role leaves the set, subject to the quorum guard. Renouncing
    /// [`VALIDATOR_ROLE`] without being a validator changes nothing.
    pub fn renounce_role(
        &mut self,
        msg_sender: Address,
        call: IRolesAuth::renounceRoleCall,
    ) -> Result<()> {
        atomic_local(self, |this| {
            if call.role != *VALIDATOR_ROLE {
                if let Some(event) = this.roles.renounce_role(msg_sender, call) {
                    this.events.emit(event);
                }
            } else if this.validators.contains(&msg_sender) {
                this.validators.remove_validators(&[msg_sender])?;
                this.events.emit(IMessageExecutor::ValidatorsRemoved {
                    validators: vec![msg_sender],
                });
                info!(validator = %msg_sender, "validator renounced");
            }
            Ok(())
        })
    }

    /// The record of an executed message.
    pub fn get_message(&self, id: U256) -> Option<&ExecutionRecord> {
        self.records.get(&id)
    }

    pub fn is_executed(&self, id: U256) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of soft failures seen for `id`.
    pub fn failed_attempts(&self, id: U256) -> u32 {
        self.failures.get(&id).copied().unwrap_or_default()
    }

    pub fn status(&self, id: U256) -> MessageStatus {
        if self.is_executed(id) {
            MessageStatus::Executed
        } else {
            match self.failed_attempts(id) {
                0 => MessageStatus::Pending,
                attempts => MessageStatus::Failed { attempts },
            }
        }
    }

    /// Records in the order their executions completed.
    pub fn records(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.values()
    }

    pub fn required_signatures(&self) -> usize {
        self.validators.required_signatures()
    }

    pub fn is_validator(&self, account: &Address) -> bool {
        self.validators.contains(account)
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn quorum(&self) -> Quorum {
        self.validators.quorum()
    }

    /// The EIP-712 domain validators sign under.
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn sender_only(&self) -> bool {
        self.sender_only
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn has_role(&self, role: B256, account: Address) -> bool {
        if role == *VALIDATOR_ROLE {
            return self.validators.contains(&account);
        }
        self.roles.has_role(role, account)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn events(&self) -> &[ExecutorEvent] {
        self.events.as_slice()
    }

    pub fn take_events(&mut self) -> Vec<ExecutorEvent> {
        self.events.take()
    }
}

/// Soft-failure counters are written only on a path that returns `Ok`, and validator, role and
/// pause changes come after their last check, so records and events are what can need undoing.
impl Checkpointed for MessageExecutor {
    type Checkpoint = (usize, usize);

    fn checkpoint(&self) -> Self::Checkpoint {
        (self.records.len(), self.events.checkpoint())
    }

    fn revert_to(&mut self, (records, events): Self::Checkpoint) {
        self.records.truncate(records);
        self.events.revert_to(events);
    }
}
