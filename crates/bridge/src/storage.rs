//! Transactional boundary for contract operations.
//!
//! Contract state in this crate is either append-only (message logs, execution records, events)
//! or written as the last step of an operation. A [`Checkpointed`] contract snapshots the lengths
//! of its append-only parts; [`atomic`] pairs that with a host checkpoint and restores both when
//! the operation fails.

use crate::{Result, host::Host};

/// State that can be rolled back to an earlier point.
pub trait Checkpointed {
    type Checkpoint;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn revert_to(&mut self, checkpoint: Self::Checkpoint);
}

/// Runs `op` against `contract` and `host`, committing on `Ok` and undoing both on `Err`.
pub fn atomic<C, H, T, F>(contract: &mut C, host: &mut H, op: F) -> Result<T>
where
    C: Checkpointed + ?Sized,
    H: Host + ?Sized,
    F: FnOnce(&mut C, &mut H) -> Result<T>,
{
    let local = contract.checkpoint();
    let journal = host.checkpoint();
    match op(contract, host) {
        Ok(value) => {
            host.commit(journal);
            Ok(value)
        }
        Err(err) => {
            host.revert(journal);
            contract.revert_to(local);
            Err(err)
        }
    }
}

/// [`atomic`] for operations that never touch the host.
pub fn atomic_local<C, T, F>(contract: &mut C, op: F) -> Result<T>
where
    C: Checkpointed + ?Sized,
    F: FnOnce(&mut C) -> Result<T>,
{
    let local = contract.checkpoint();
    op(contract).inspect_err(|_| contract.revert_to(local))
}

/// Append-only list of events emitted by a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog<E> {
    events: Vec<E>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventLog<E> {
    pub fn emit(&mut self, event: impl Into<E>) {
        self.events.push(event.into());
    }

    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&E> {
        self.events.last()
    }

    /// Hands every event emitted so far to the caller, leaving the log empty.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}

impl<E> Checkpointed for EventLog<E> {
    type Checkpoint = usize;

    fn checkpoint(&self) -> usize {
        self.events.len()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        self.events.truncate(checkpoint);
    }
}

/// Declares a contract's event enum over `sol!` event types.
macro_rules! contract_events {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident($ty:ty)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $($variant($ty)),+
        }

        $(
            impl From<$ty> for $name {
                fn from(event: $ty) -> Self {
                    Self::$variant(event)
                }
            }
        )+

        impl ::alloy_primitives::IntoLogData for $name {
            fn to_log_data(&self) -> ::alloy_primitives::LogData {
                match self {
                    $(
                        Self::$variant(event) => {
                            ::alloy_primitives::IntoLogData::to_log_data(event)
                        }
                    )+
                }
            }

            fn into_log_data(self) -> ::alloy_primitives::LogData {
                match self {
                    $(
                        Self::$variant(event) => {
                            ::alloy_primitives::IntoLogData::into_log_data(event)
                        }
                    )+
                }
            }
        }
    };
}

pub(crate) use contract_events;
