use alloy_primitives::Address;
use indexmap::IndexSet;
use quorum_primitives::{Eip712Domain, Message, recover_from_hash, signing_hash};
use tracing::debug;

use crate::{BridgeError, Result, validator_set::ValidatorSet};

/// Counts the distinct active validators that signed a message.
///
/// Verification is pure: it reads the validator set and the domain and changes nothing.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier<'a> {
    domain: &'a Eip712Domain,
    validators: &'a ValidatorSet,
}

impl<'a> SignatureVerifier<'a> {
    pub fn new(domain: &'a Eip712Domain, validators: &'a ValidatorSet) -> Self {
        Self { domain, validators }
    }

    /// Recovers every signature and keeps the active validators among the signers.
    ///
    /// The first signature from a validator counts, later ones are dropped. Malformed
    /// signatures and signers outside the set are dropped too. Order is first occurrence.
    pub fn verify<S: AsRef<[u8]>>(&self, signatures: &[S], message: &Message) -> Vec<Address> {
        let hash = signing_hash(self.domain, message);
        let mut signers = IndexSet::with_capacity(signatures.len());

        for (index, signature) in signatures.iter().enumerate() {
            match recover_from_hash(hash, signature.as_ref()) {
                Some(signer) if self.validators.contains(&signer) => {
                    if !signers.insert(signer) {
                        debug!(index, %signer, id = %message.id, "dropping repeated signature");
                    }
                }
                Some(signer) => debug!(
                    index,
                    %signer,
                    id = %message.id,
                    "dropping signature from non-validator"
                ),
                None => debug!(index, id = %message.id, "dropping malformed signature"),
            }
        }

        signers.into_iter().collect()
    }

    /// [`verify`](Self::verify) followed by the acceptance rule.
    pub fn check_quorum<S: AsRef<[u8]>>(
        &self,
        signatures: &[S],
        message: &Message,
    ) -> Result<Vec<Address>> {
        let signers = self.verify(signatures, message);
        let required = self.validators.required_signatures();
        if signers.len() < required {
            return Err(BridgeError::QuorumNotMet {
                signed: signers.len(),
                required,
            });
        }
        Ok(signers)
    }
}
