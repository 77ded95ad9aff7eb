//! Core bridge primitives: the relayed [`Message`], its canonical hash, and the EIP-712
//! signing surface validators use to attest to it.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod message;
pub mod typed_data;

pub use message::{Message, message_hash};
pub use typed_data::{
    DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, bridge_domain, recover_from_hash,
    recover_signer, sign_message, signing_hash,
};

pub use alloy_primitives::Signature;
pub use alloy_sol_types::Eip712Domain;
