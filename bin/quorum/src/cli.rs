use std::path::PathBuf;

use alloy_primitives::{Address, Bytes, U256, hex};
use alloy_signer_local::PrivateKeySigner;
use eyre::{WrapErr as _, eyre};
use quorum_primitives::{
    DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, Eip712Domain, Message, bridge_domain,
    recover_signer, sign_message, signing_hash,
};

/// Parses command line args, installs the tracing subscriber and runs the selected command.
pub(crate) fn run() -> eyre::Result<()> {
    use clap::Parser as _;

    let args = Args::parse();
    args.run()
}

#[derive(Debug, clap::Parser)]
#[command(author, version, about = "hash, sign and simulate quorum bridge messages")]
struct Args {
    /// Filter directives for tracing events, in `EnvFilter` syntax.
    #[clap(long, value_name = "DIRECTIVE", default_value = "warn,quorum=info")]
    filter_directives: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Prints the canonical message hash and, given `--executor`, the typed-data digest.
    Hash {
        #[command(flatten)]
        message: MessageArgs,
        #[command(flatten)]
        domain: DomainArgs,
    },
    /// Signs a message the way a validator would.
    Sign {
        /// Hex encoded secp256k1 private key.
        #[clap(long, value_name = "HEX")]
        key: PrivateKeySigner,
        #[command(flatten)]
        message: MessageArgs,
        #[command(flatten)]
        domain: DomainArgs,
    },
    /// Recovers the validator address behind a signature.
    Recover {
        #[clap(long, value_name = "HEX")]
        signature: Bytes,
        #[command(flatten)]
        message: MessageArgs,
        #[command(flatten)]
        domain: DomainArgs,
    },
    /// Relays mint requests through an in-memory registry and executor built from a config.
    Simulate {
        #[clap(long, value_name = "FILE")]
        config: PathBuf,
        /// Number of messages to send and execute.
        #[clap(long, default_value_t = 1)]
        messages: usize,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct MessageArgs {
    #[clap(long)]
    id: U256,
    #[clap(long)]
    sender: Address,
    #[clap(long)]
    target: Address,
    #[clap(long, default_value = "0x")]
    data: Bytes,
    #[clap(long, default_value = "0")]
    value: U256,
    #[clap(long)]
    home_chain_id: u64,
    #[clap(long)]
    foreign_chain_id: u64,
}

impl MessageArgs {
    fn into_message(self) -> Message {
        Message::new(
            self.id,
            self.sender,
            self.target,
            self.data,
            self.value,
            self.home_chain_id,
            self.foreign_chain_id,
        )
    }
}

/// The executor deployment whose domain separates signatures.
#[derive(Debug, Clone, clap::Args)]
struct DomainArgs {
    #[clap(long)]
    executor: Option<Address>,
    #[clap(long, default_value = DEFAULT_DOMAIN_NAME)]
    domain_name: String,
    #[clap(long, default_value = DEFAULT_DOMAIN_VERSION)]
    domain_version: String,
}

impl DomainArgs {
    fn domain(&self, chain_id: u64) -> eyre::Result<Eip712Domain> {
        let executor = self
            .executor
            .ok_or_else(|| eyre!("`--executor` is required"))?;
        Ok(bridge_domain(
            self.domain_name.clone(),
            self.domain_version.clone(),
            chain_id,
            executor,
        ))
    }
}

impl Args {
    fn run(self) -> eyre::Result<()> {
        use tracing_subscriber::fmt;
        use tracing_subscriber::prelude::*;

        let env_filter = tracing_subscriber::EnvFilter::builder()
            .parse(&self.filter_directives)
            .wrap_err("failed to parse provided filter directives")?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(env_filter)
            .init();

        match self.command {
            Command::Hash { message, domain } => {
                let message = message.into_message();
                println!("hash: {}", message.hash);
                if domain.executor.is_some() {
                    let domain = domain.domain(message.foreign_chain_id)?;
                    println!("digest: {}", signing_hash(&domain, &message));
                }
            }
            Command::Sign {
                key,
                message,
                domain,
            } => {
                let message = message.into_message();
                let domain = domain.domain(message.foreign_chain_id)?;
                let signature = sign_message(&key, &domain, &message)
                    .wrap_err("failed signing message digest")?;
                tracing::info!(validator = %key.address(), id = %message.id, "signed message");
                println!("{}", hex::encode_prefixed(signature.as_bytes()));
            }
            Command::Recover {
                signature,
                message,
                domain,
            } => {
                let message = message.into_message();
                let domain = domain.domain(message.foreign_chain_id)?;
                let signer = recover_signer(&domain, &message, &signature)
                    .ok_or_else(|| eyre!("signature does not recover to a valid address"))?;
                println!("{signer}");
            }
            Command::Simulate { config, messages } => {
                let config = quorum_config::Config::from_file(&config).wrap_err_with(|| {
                    format!("failed parsing bridge config from `{}`", config.display())
                })?;
                let report = crate::simulate::run(&config, messages)
                    .wrap_err("simulation aborted")?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).wrap_err("failed encoding report")?
                );
            }
        }
        Ok(())
    }
}
