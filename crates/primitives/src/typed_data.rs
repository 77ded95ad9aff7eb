//! EIP-712 domain and signature helpers for
//! [`ValidateMessage`](quorum_contracts::ValidateMessage).
//!
//! Validators sign the typed-data digest of a message under the executor's domain. Binding the
//! domain to the destination chain id and the executor address keeps a signature from being
//! replayed against another deployment.

use std::borrow::Cow;

use alloy_primitives::{Address, B256, Signature, U256};
use alloy_signer::SignerSync;
use alloy_sol_types::{Eip712Domain, SolStruct};

use crate::Message;

pub const DEFAULT_DOMAIN_NAME: &str = "MessageExecutor";
pub const DEFAULT_DOMAIN_VERSION: &str = "0.0.1";

/// Builds the executor's domain separator input.
pub fn bridge_domain(
    name: impl Into<Cow<'static, str>>,
    version: impl Into<Cow<'static, str>>,
    chain_id: u64,
    verifying_contract: Address,
) -> Eip712Domain {
    Eip712Domain::new(
        Some(name.into()),
        Some(version.into()),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}

/// The digest a validator signs for `message` under `domain`.
pub fn signing_hash(domain: &Eip712Domain, message: &Message) -> B256 {
    message.to_typed().eip712_signing_hash(domain)
}

/// Recovers the signer of `signature` over the typed-data digest of `message`.
///
/// Returns `None` for signatures that are not 65 bytes or do not recover to a point.
pub fn recover_signer(
    domain: &Eip712Domain,
    message: &Message,
    signature: &[u8],
) -> Option<Address> {
    recover_from_hash(signing_hash(domain, message), signature)
}

pub fn recover_from_hash(hash: B256, signature: &[u8]) -> Option<Address> {
    let signature = Signature::try_from(signature).ok()?;
    signature.recover_address_from_prehash(&hash).ok()
}

pub fn sign_message<S>(
    signer: &S,
    domain: &Eip712Domain,
    message: &Message,
) -> alloy_signer::Result<Signature>
where
    S: SignerSync + ?Sized,
{
    signer.sign_hash_sync(&signing_hash(domain, message))
}
