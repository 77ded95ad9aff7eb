use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolError;
use quorum_contracts::{IMessageExecutor, IMessageRegistry, IRolesAuth};

use crate::{host::HostError, validator_set::Quorum};

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Coarse classification of a [`BridgeError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    InvalidInput,
    ServicePaused,
    AlreadyExecuted,
    QuorumNotMet,
    ValueMismatch,
    ExecutionFailure,
}

/// Argument or state checks that reject a call before any effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("target address must not be zero")]
    ZeroTarget,
    #[error("fee token {token} and amount {amount} must be both zero or both non-zero")]
    InconsistentFees { token: Address, amount: U256 },
    #[error("fee receiver must not be zero")]
    ZeroFeeReceiver,
    #[error("validator must not be the zero address")]
    ZeroValidator,
    #[error("validator {0} is already registered")]
    DuplicateValidator(Address),
    #[error("validator {0} is not registered")]
    UnknownValidator(Address),
    #[error("message is destined for chain {actual}, this executor serves chain {expected}")]
    WrongDestination { expected: u64, actual: u64 },
    #[error("message hash {actual} does not match recomputed hash {expected}")]
    HashMismatch { expected: B256, actual: B256 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("account {account} lacks role {role}")]
    AccessDenied { role: B256, account: Address },

    #[error("only the original sender {sender} may execute this message, caller was {caller}")]
    OnlyOriginalSender { sender: Address, caller: Address },

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("service is paused")]
    ServicePaused,

    #[error("message {0} was already executed")]
    AlreadyExecuted(U256),

    #[error("quorum not met: {signed} valid signatures, {required} required")]
    QuorumNotMet { signed: usize, required: usize },

    #[error("attached value {attached} does not match message value {expected}")]
    ValueMismatch { attached: U256, expected: U256 },

    #[error("call for message {id} carrying value {value} reverted")]
    ExecutionReverted {
        id: U256,
        value: U256,
        reason: Bytes,
    },

    #[error("fee allowance {allowance} is below the required {required}")]
    FeeApprovalMissing { allowance: U256, required: U256 },

    #[error("collecting fee of {amount} {token} from {from} failed: {source}")]
    FeeTransferFailed {
        token: Address,
        from: Address,
        amount: U256,
        source: HostError,
    },

    #[error("removal leaves {remaining} validators, {required} signatures are required")]
    QuorumUnderflow { remaining: usize, required: usize },

    #[error("quorum {quorum} is not satisfiable by {validators} validators")]
    InvalidRatio { quorum: Quorum, validators: usize },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccessDenied { .. } | Self::OnlyOriginalSender { .. } => ErrorKind::AccessDenied,
            Self::InvalidInput(_)
            | Self::FeeApprovalMissing { .. }
            | Self::FeeTransferFailed { .. }
            | Self::QuorumUnderflow { .. }
            | Self::InvalidRatio { .. } => ErrorKind::InvalidInput,
            Self::ServicePaused => ErrorKind::ServicePaused,
            Self::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            Self::QuorumNotMet { .. } => ErrorKind::QuorumNotMet,
            Self::ValueMismatch { .. } => ErrorKind::ValueMismatch,
            Self::ExecutionReverted { .. } | Self::Host(_) => ErrorKind::ExecutionFailure,
        }
    }

    pub fn access_denied(role: B256, account: Address) -> Self {
        Self::AccessDenied { role, account }
    }

    /// ABI-encoded custom error, as a contract would return it in revert data.
    pub fn abi_revert_data(&self) -> Bytes {
        let encoded = match self {
            Self::AccessDenied { role, account } => IRolesAuth::Unauthorized {
                role: *role,
                account: *account,
            }
            .abi_encode(),
            Self::OnlyOriginalSender { sender, caller } => IMessageExecutor::OnlyOriginalSender {
                sender: *sender,
                caller: *caller,
            }
            .abi_encode(),
            Self::InvalidInput(input) => input.abi_encode(),
            Self::ServicePaused => IRolesAuth::ServicePaused {}.abi_encode(),
            Self::AlreadyExecuted(id) => IMessageExecutor::AlreadyExecuted { id: *id }.abi_encode(),
            Self::QuorumNotMet { signed, required } => IMessageExecutor::QuorumNotMet {
                signed: U256::from(*signed),
                required: U256::from(*required),
            }
            .abi_encode(),
            Self::ValueMismatch { attached, expected } => IMessageExecutor::ValueMismatch {
                attached: *attached,
                expected: *expected,
            }
            .abi_encode(),
            Self::ExecutionReverted { id, value, reason } => IMessageExecutor::ExecutionReverted {
                id: *id,
                value: *value,
                reason: reason.clone(),
            }
            .abi_encode(),
            Self::FeeApprovalMissing {
                allowance,
                required,
            } => IMessageRegistry::FeeApprovalMissing {
                allowance: *allowance,
                required: *required,
            }
            .abi_encode(),
            Self::FeeTransferFailed {
                token,
                from,
                amount,
                ..
            } => IMessageRegistry::FeeTransferFailed {
                token: *token,
                from: *from,
                amount: *amount,
            }
            .abi_encode(),
            Self::QuorumUnderflow {
                remaining,
                required,
            } => IMessageExecutor::QuorumUnderflow {
                remaining: U256::from(*remaining),
                required: U256::from(*required),
            }
            .abi_encode(),
            Self::InvalidRatio { quorum, validators } => {
                let (numerator, denominator) = quorum.as_ratio(*validators);
                IMessageExecutor::InvalidRatio {
                    numerator,
                    denominator,
                    validators: U256::from(*validators),
                }
                .abi_encode()
            }
            Self::Host(err) => alloy_sol_types::Revert {
                reason: err.to_string(),
            }
            .abi_encode(),
        };
        encoded.into()
    }
}

impl InvalidInput {
    fn abi_encode(&self) -> Vec<u8> {
        match self {
            Self::ZeroTarget => IMessageRegistry::InvalidTargetAddress {}.abi_encode(),
            Self::InconsistentFees { token, amount } => IMessageRegistry::InconsistentFees {
                token: *token,
                amount: *amount,
            }
            .abi_encode(),
            Self::ZeroFeeReceiver => IMessageRegistry::InvalidFeeReceiver {}.abi_encode(),
            Self::ZeroValidator => IMessageExecutor::InvalidValidator {
                validator: Address::ZERO,
            }
            .abi_encode(),
            Self::DuplicateValidator(validator) | Self::UnknownValidator(validator) => {
                IMessageExecutor::InvalidValidator {
                    validator: *validator,
                }
                .abi_encode()
            }
            Self::WrongDestination { expected, actual } => IMessageExecutor::WrongDestination {
                expected: *expected,
                actual: *actual,
            }
            .abi_encode(),
            Self::HashMismatch { expected, actual } => IMessageExecutor::HashMismatch {
                expected: *expected,
                actual: *actual,
            }
            .abi_encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolInterface;
    use quorum_contracts::IMessageExecutor::IMessageExecutorErrors;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(BridgeError::ServicePaused.kind(), ErrorKind::ServicePaused);
        assert_eq!(
            BridgeError::from(InvalidInput::ZeroTarget).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            BridgeError::QuorumUnderflow {
                remaining: 1,
                required: 2,
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            BridgeError::OnlyOriginalSender {
                sender: Address::ZERO,
                caller: Address::ZERO,
            }
            .kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            BridgeError::ExecutionReverted {
                id: U256::ZERO,
                value: U256::from(1),
                reason: Bytes::new(),
            }
            .kind(),
            ErrorKind::ExecutionFailure
        );
    }

    #[test]
    fn revert_data_decodes_as_custom_error() -> eyre::Result<()> {
        let err = BridgeError::QuorumNotMet {
            signed: 2,
            required: 3,
        };
        let decoded = IMessageExecutorErrors::abi_decode(&err.abi_revert_data())?;
        assert_eq!(
            decoded,
            IMessageExecutorErrors::QuorumNotMet(IMessageExecutor::QuorumNotMet {
                signed: U256::from(2),
                required: U256::from(3),
            })
        );

        let err = BridgeError::from(InvalidInput::DuplicateValidator(Address::repeat_byte(7)));
        let decoded = IMessageExecutorErrors::abi_decode(&err.abi_revert_data())?;
        assert_eq!(
            decoded,
            IMessageExecutorErrors::InvalidValidator(IMessageExecutor::InvalidValidator {
                validator: Address::repeat_byte(7),
            })
        );
        Ok(())
    }

    #[test]
    fn host_errors_encode_as_revert_string() -> eyre::Result<()> {
        let err = BridgeError::Host(HostError::UnknownToken(Address::ZERO));
        let revert = alloy_sol_types::Revert::abi_decode(&err.abi_revert_data())?;
        assert_eq!(revert.reason, err.to_string());
        Ok(())
    }
}
