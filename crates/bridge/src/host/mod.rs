//! The ledger a bridge component runs against.
//!
//! Registry and executor never touch balances or targets directly. They go through [`Host`],
//! which also exposes a checkpoint journal so a rejected operation can be undone as a whole.

use std::{any::Any, fmt};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolError;

pub mod memory;

pub use memory::InMemoryHost;

/// Native value, fungible tokens and callable targets on a single chain.
pub trait Host {
    fn chain_id(&self) -> u64;

    fn balance(&self, account: Address) -> U256;

    /// Moves native value. A zero amount always succeeds.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), HostError>;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    /// ERC-20 style `transferFrom` executed by `spender`.
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    /// Calls `frame.target`, forwarding `frame.value` from the caller.
    ///
    /// On `Err` every effect of the call, including the value transfer, has been undone.
    fn call(&mut self, frame: CallFrame<'_>) -> Result<Bytes, Revert>;

    fn checkpoint(&mut self) -> Checkpoint;

    fn commit(&mut self, checkpoint: Checkpoint);

    /// Undoes every change made since `checkpoint` was taken.
    fn revert(&mut self, checkpoint: Checkpoint);
}

#[derive(Debug, Clone, Copy)]
pub struct CallFrame<'a> {
    pub caller: Address,
    pub target: Address,
    pub data: &'a [u8],
    pub value: U256,
}

/// What a [`CallTarget`] sees of the call that reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: U256,
}

/// Business logic deployed at an address.
///
/// A target that returns `Err` must leave its own state as it found it.
pub trait CallTarget: Any + fmt::Debug {
    fn call(&mut self, ctx: CallContext, data: &[u8]) -> Result<Bytes, Revert>;
}

/// Revert data returned by a failed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revert {
    pub reason: Bytes,
}

impl Revert {
    /// A Solidity `Error(string)` revert.
    pub fn message(reason: impl Into<String>) -> Self {
        Self::custom(alloy_sol_types::Revert {
            reason: reason.into(),
        })
    }

    pub fn custom<E: SolError>(error: E) -> Self {
        Self {
            reason: error.abi_encode().into(),
        }
    }

    /// The string carried by an `Error(string)` revert, if that is what this is.
    pub fn decoded_message(&self) -> Option<String> {
        alloy_sol_types::Revert::abi_decode(&self.reason)
            .ok()
            .map(|revert| revert.reason)
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decoded_message() {
            Some(message) => write!(f, "reverted: {message}"),
            None => write!(f, "reverted with {}", self.reason),
        }
    }
}

/// Ledger-level failures outside any business logic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("{account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: U256,
        required: U256,
    },
    #[error("{spender} may spend {available} of {owner}'s tokens, needs {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: U256,
        required: U256,
    },
    #[error("no token deployed at {0}")]
    UnknownToken(Address),
    #[error("cannot transfer to the zero address")]
    ZeroReceiver,
    #[error("balance overflow for {0}")]
    Overflow(Address),
}

/// Opaque handle to a point in the host journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    pub(crate) journal_len: usize,
    pub(crate) depth: usize,
}
