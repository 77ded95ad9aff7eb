//! Validator-gated cross-chain message bridge.
//!
//! A [`MessageRegistry`] on the home chain numbers and announces requests. Validators sign each
//! request as EIP-712 typed data, and a [`MessageExecutor`] on the foreign chain performs the
//! requested call once a quorum of those signatures is presented.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod executor;
pub mod host;
pub mod pause;
pub mod registry;
pub mod roles;
pub mod storage;
pub mod validator_set;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_util;

pub use error::{BridgeError, ErrorKind, InvalidInput, Result};
pub use executor::{
    ExecutionOutcome, ExecutionRecord, ExecutorConfig, ExecutorEvent, MessageExecutor,
    MessageStatus,
};
pub use registry::{MessageRegistry, RegistryEvent};
pub use roles::{ADMIN_ROLE, FEE_MANAGER_ROLE, VALIDATOR_ROLE};
pub use validator_set::{Quorum, ValidatorSet};
pub use verifier::SignatureVerifier;

pub use quorum_primitives::{DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, Message};
