//! Definitions to read and write a quorum bridge deployment configuration.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use std::{collections::HashSet, path::Path};

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use quorum_bridge::{BridgeError, ExecutorConfig, Quorum, ValidatorSet};


/// A home registry, a foreign executor and the validators connecting them.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Receives the admin role on both sides, and the fee manager role on the registry.
    pub owner: Address,

    /// Validator signing keys, hex encoded.
    #[serde(with = "crate::_serde::private_keys")]
    pub validators: Vec<PrivateKeySigner>,

    pub home: HomeConfig,

    pub foreign: ForeignConfig,

    pub quorum: QuorumConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct HomeConfig {
    pub chain_id: u64,
    pub registry: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FeeConfig {
    pub token: Address,
    pub amount: U256,
    pub receiver: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ForeignConfig {
    pub chain_id: u64,
    pub executor: Address,
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    #[serde(default = "default_domain_version")]
    pub domain_version: String,
    /// Only the original sender may submit a message for execution.
    #[serde(default)]
    pub sender_only: bool,
}

/// Either an explicit signature count or a fraction of the validator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum QuorumConfig {
    Fixed { required_signatures: u64 },
    Ratio { numerator: u64, denominator: u64 },
}

impl From<QuorumConfig> for Quorum {
    fn from(config: QuorumConfig) -> Self {
        match config {
            QuorumConfig::Fixed {
                required_signatures,
            } => Self::Fixed(required_signatures),
            QuorumConfig::Ratio {
                numerator,
                denominator,
            } => Self::Ratio {
                numerator,
                denominator,
            },
        }
    }
}

fn default_domain_name() -> String {
    quorum_bridge::DEFAULT_DOMAIN_NAME.to_string()
}

fn default_domain_version() -> String {
    quorum_bridge::DEFAULT_DOMAIN_VERSION.to_string()
}

impl Config {
    /// Parses [`Config`] from a toml formatted file at `path` and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file_contents = std::fs::read_to_string(path)?;
        Self::parse(&file_contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        let this: Self = toml::from_str(contents)?;
        this.validate()?;
        Ok(this)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks the parts of the configuration that each component would otherwise reject at
    /// construction time.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.owner.is_zero() {
            return Err(InvalidConfig::ZeroAddress("owner"));
        }
        if self.home.registry.is_zero() {
            return Err(InvalidConfig::ZeroAddress("home.registry"));
        }
        if self.foreign.executor.is_zero() {
            return Err(InvalidConfig::ZeroAddress("foreign.executor"));
        }
        if self.home.chain_id == self.foreign.chain_id {
            return Err(InvalidConfig::SameChain(self.home.chain_id));
        }

        if let Some(fees) = &self.home.fees {
            if fees.token.is_zero() || fees.amount.is_zero() {
                return Err(InvalidConfig::InconsistentFees);
            }
            if fees.receiver.is_zero() {
                return Err(InvalidConfig::ZeroAddress("home.fees.receiver"));
            }
        }

        let mut seen = HashSet::with_capacity(self.validators.len());
        for address in self.validator_addresses() {
            if !seen.insert(address) {
                return Err(InvalidConfig::DuplicateValidator(address));
            }
        }
        ValidatorSet::new(self.validator_addresses(), self.quorum.into())
            .map_err(InvalidConfig::Quorum)?;

        Ok(())
    }

    pub fn validator_addresses(&self) -> Vec<Address> {
        self.validators.iter().map(PrivateKeySigner::address).collect()
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            owner: self.owner,
            validators: self.validator_addresses(),
            quorum: self.quorum.into(),
            domain_name: self.foreign.domain_name.clone(),
            domain_version: self.foreign.domain_version.clone(),
            sender_only: self.foreign.sender_only,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open file for reading")]
    OpenFile(#[from] std::io::Error),
    #[error("failed parsing file contents")]
    Parse(#[from] toml::de::Error),
    #[error("configuration is inconsistent")]
    Invalid(#[from] InvalidConfig),
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidConfig {
    #[error("`{0}` must not be the zero address")]
    ZeroAddress(&'static str),
    #[error("home and foreign chain share chain id {0}")]
    SameChain(u64),
    #[error("fee token and amount must both be set")]
    InconsistentFees,
    #[error("validator {0} is listed twice")]
    DuplicateValidator(Address),
    #[error("quorum cannot be met by the configured validators")]
    Quorum(#[source] BridgeError),
}

mod _serde {
    pub(crate) mod private_keys {
        use alloy_primitives::B256;
        use alloy_signer_local::PrivateKeySigner;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub(crate) fn serialize<S>(
            signers: &[PrivateKeySigner],
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            #[derive(Serialize)]
            struct Intermediate(#[serde(with = "const_hex::serde")] B256);

            signers
                .iter()
                .map(|signer| Intermediate(signer.to_bytes()))
                .collect::<Vec<_>>()
                .serialize(serializer)
        }

        pub(crate) fn deserialize<'de, D>(
            deserializer: D,
        ) -> Result<Vec<PrivateKeySigner>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Intermediate(#[serde(with = "const_hex::serde")] Vec<u8>);

            let keys = Vec::<Intermediate>::deserialize(deserializer)?;
            keys.into_iter()
                .enumerate()
                .map(|(index, Intermediate(bytes))| {
                    PrivateKeySigner::from_slice(&bytes).map_err(|err| {
                        serde::de::Error::custom(format!(
                            "failed decoding validator key #{index} as secp256k1 private key: {err}"
                        ))
                    })
                })
                .collect()
        }
    }
}
