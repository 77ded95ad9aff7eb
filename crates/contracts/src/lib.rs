//! Solidity ABI definitions for the quorum bridge.
//!
//! The registry lives on the home chain, the executor on the foreign chain. Both share the
//! role and pause surface in [`IRolesAuth`]. Validators sign [`ValidateMessage`] as EIP-712
//! typed data bound to the executor's domain.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod executor;
mod message;
mod registry;
mod roles;

pub use executor::IMessageExecutor;
pub use message::ValidateMessage;
pub use registry::IMessageRegistry;
pub use roles::IRolesAuth;
