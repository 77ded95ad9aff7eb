use std::{any::Any, collections::HashMap};

use alloy_primitives::{Address, Bytes, U256};
use tracing::trace;

use super::{CallContext, CallFrame, CallTarget, Checkpoint, Host, HostError, Revert};

#[derive(Debug, Default)]
struct TokenLedger {
    balances: HashMap<Address, U256>,
    // (owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Debug)]
enum JournalEntry {
    Balance { account: Address, previous: U256 },
    TokenBalance {
        token: Address,
        account: Address,
        previous: U256,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        previous: U256,
    },
    TokenDeployed { token: Address },
}

/// A single chain held in memory, with an undo journal for nested checkpoints.
///
/// Calling an address that has no registered [`CallTarget`] behaves like calling an account
/// without code: the value moves and the call succeeds with empty output.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    chain_id: u64,
    balances: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenLedger>,
    targets: HashMap<Address, Box<dyn CallTarget>>,
    journal: Vec<JournalEntry>,
    depth: usize,
}

impl InMemoryHost {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Credits native value out of thin air.
    pub fn fund(&mut self, account: Address, amount: U256) {
        let previous = self.balance(account);
        self.set_balance(account, previous.saturating_add(amount));
    }

    pub fn deploy_token(&mut self, token: Address) {
        if !self.tokens.contains_key(&token) {
            self.tokens.insert(token, TokenLedger::default());
            self.record(JournalEntry::TokenDeployed { token });
        }
    }

    pub fn mint_token(
        &mut self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let previous = self.token_balance(token, to);
        let updated = previous.checked_add(amount).ok_or(HostError::Overflow(to))?;
        self.set_token_balance(token, to, updated)
    }

    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let ledger = self
            .tokens
            .get_mut(&token)
            .ok_or(HostError::UnknownToken(token))?;
        let previous = ledger
            .allowances
            .insert((owner, spender), amount)
            .unwrap_or_default();
        self.record(JournalEntry::Allowance {
            token,
            owner,
            spender,
            previous,
        });
        Ok(())
    }

    pub fn token_balance(&self, token: Address, account: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|ledger| ledger.balances.get(&account))
            .copied()
            .unwrap_or_default()
    }

    /// Deploys `target` at `address`, replacing whatever was there.
    pub fn register_target(&mut self, address: Address, target: impl CallTarget) {
        self.targets.insert(address, Box::new(target));
    }

    /// Borrows the concrete target deployed at `address`.
    pub fn target<T: CallTarget>(&self, address: Address) -> Option<&T> {
        let target: &dyn Any = self.targets.get(&address)?.as_ref();
        target.downcast_ref()
    }

    pub fn target_mut<T: CallTarget>(&mut self, address: Address) -> Option<&mut T> {
        let target: &mut dyn Any = self.targets.get_mut(&address)?.as_mut();
        target.downcast_mut()
    }

    fn record(&mut self, entry: JournalEntry) {
        if self.depth > 0 {
            self.journal.push(entry);
        }
    }

    fn set_balance(&mut self, account: Address, amount: U256) {
        let previous = self.balances.insert(account, amount).unwrap_or_default();
        self.record(JournalEntry::Balance { account, previous });
    }

    fn set_token_balance(
        &mut self,
        token: Address,
        account: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let ledger = self
            .tokens
            .get_mut(&token)
            .ok_or(HostError::UnknownToken(token))?;
        let previous = ledger.balances.insert(account, amount).unwrap_or_default();
        self.record(JournalEntry::TokenBalance {
            token,
            account,
            previous,
        });
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance { account, previous } => {
                self.balances.insert(account, previous);
            }
            JournalEntry::TokenBalance {
                token,
                account,
                previous,
            } => {
                if let Some(ledger) = self.tokens.get_mut(&token) {
                    ledger.balances.insert(account, previous);
                }
            }
            JournalEntry::Allowance {
                token,
                owner,
                spender,
                previous,
            } => {
                if let Some(ledger) = self.tokens.get_mut(&token) {
                    ledger.allowances.insert((owner, spender), previous);
                }
            }
            JournalEntry::TokenDeployed { token } => {
                self.tokens.remove(&token);
            }
        }
    }
}

impl Host for InMemoryHost {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), HostError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }

        let available = self.balance(from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            });
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(HostError::Overflow(to))?;

        self.set_balance(from, available - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|ledger| ledger.allowances.get(&(owner, spender)))
            .copied()
            .unwrap_or_default()
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if !self.tokens.contains_key(&token) {
            return Err(HostError::UnknownToken(token));
        }
        if to.is_zero() {
            return Err(HostError::ZeroReceiver);
        }

        let allowance = self.allowance(token, from, spender);
        if allowance < amount {
            return Err(HostError::InsufficientAllowance {
                owner: from,
                spender,
                available: allowance,
                required: amount,
            });
        }
        let available = self.token_balance(token, from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .token_balance(token, to)
            .checked_add(amount)
            .ok_or(HostError::Overflow(to))?;

        self.approve(token, from, spender, allowance - amount)?;
        self.set_token_balance(token, from, available - amount)?;
        self.set_token_balance(token, to, credited)
    }

    fn call(&mut self, frame: CallFrame<'_>) -> Result<Bytes, Revert> {
        let checkpoint = self.checkpoint();

        if let Err(err) = self.transfer(frame.caller, frame.target, frame.value) {
            self.revert(checkpoint);
            return Err(Revert::message(err.to_string()));
        }

        let ctx = CallContext {
            caller: frame.caller,
            value: frame.value,
        };
        let result = match self.targets.get_mut(&frame.target) {
            Some(target) => target.call(ctx, frame.data),
            None => Ok(Bytes::new()),
        };

        trace!(callee = %frame.target, value = %frame.value, ok = result.is_ok(), "host call");
        match &result {
            Ok(_) => self.commit(checkpoint),
            Err(_) => self.revert(checkpoint),
        }
        result
    }

    fn checkpoint(&mut self) -> Checkpoint {
        let checkpoint = Checkpoint {
            journal_len: self.journal.len(),
            depth: self.depth,
        };
        self.depth += 1;
        checkpoint
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.depth = checkpoint.depth;
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn revert(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.journal_len {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.depth = checkpoint.depth;
    }
}
