//! End-to-end dry run of a bridge deployment over in-memory chains.

use alloy_primitives::{Address, B256, U256, address};
use eyre::WrapErr as _;
use quorum_bridge::{
    ExecutionOutcome, MessageExecutor, MessageRegistry, MessageStatus,
    host::InMemoryHost,
    test_util::{NFT_ADDRESS, TestNft, ValidatorKeys},
};
use quorum_config::Config;
use quorum_contracts::IMessageRegistry;
use serde::Serialize;

/// Account that requests every simulated mint and relays it.
pub(crate) const SIMULATED_SENDER: Address = address!("0x5e4d000000000000000000000000000000000001");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SimulationReport {
    pub(crate) registry: Address,
    pub(crate) executor: Address,
    pub(crate) validators: Vec<Address>,
    pub(crate) required_signatures: usize,
    pub(crate) fees_collected: U256,
    pub(crate) messages: Vec<MessageReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageReport {
    pub(crate) id: U256,
    pub(crate) hash: B256,
    pub(crate) signers: Vec<Address>,
    pub(crate) status: MessageStatus,
    pub(crate) token_owner: Option<Address>,
}

/// Sends `count` mint requests through a registry built from `config`, signs each with the
/// smallest quorum of configured validators and executes it on the foreign side.
pub(crate) fn run(config: &Config, count: usize) -> eyre::Result<SimulationReport> {
    let mut home = InMemoryHost::new(config.home.chain_id);
    let mut registry =
        MessageRegistry::new(config.home.registry, config.home.chain_id, config.owner);

    if let Some(fees) = &config.home.fees {
        home.deploy_token(fees.token);
        let set_fees = IMessageRegistry::setFeesCall {
            token: fees.token,
            amount: fees.amount,
        };
        registry
            .set_fees(config.owner, set_fees)
            .wrap_err("failed configuring fees")?;
        let set_receiver = IMessageRegistry::setFeeReceiverCall {
            receiver: fees.receiver,
        };
        registry
            .set_fee_receiver(config.owner, set_receiver)
            .wrap_err("failed configuring fee receiver")?;

        let total = fees.amount.saturating_mul(U256::from(count));
        home.mint_token(fees.token, SIMULATED_SENDER, total)?;
        home.approve(fees.token, SIMULATED_SENDER, config.home.registry, total)?;
    }

    let mut foreign = InMemoryHost::new(config.foreign.chain_id);
    foreign.register_target(NFT_ADDRESS, TestNft::default());
    let mut executor = MessageExecutor::new(
        config.foreign.executor,
        config.foreign.chain_id,
        config.executor_config(),
    )
    .wrap_err("failed deploying executor")?;

    let keys = ValidatorKeys::from_signers(config.validators.clone());
    let quorum: Vec<usize> = (0..executor.required_signatures()).collect();

    let mut messages = Vec::with_capacity(count);
    for index in 0..count {
        let token_id = U256::from(index);
        let id = registry
            .send_message(
                &mut home,
                SIMULATED_SENDER,
                IMessageRegistry::sendMessageCall {
                    targetAddress: NFT_ADDRESS,
                    data: TestNft::mint_calldata(SIMULATED_SENDER, token_id),
                    value: U256::ZERO,
                    foreignChainId: config.foreign.chain_id,
                },
            )
            .wrap_err_with(|| format!("failed sending message #{index}"))?;
        let message = registry
            .get_message(id)
            .cloned()
            .ok_or_else(|| eyre::eyre!("registry lost message {id}"))?;

        let signatures = keys
            .sign_with(&quorum, executor.domain(), &message)
            .wrap_err("failed signing message")?;
        let outcome = executor
            .execute_message(
                &mut foreign,
                SIMULATED_SENDER,
                U256::ZERO,
                &signatures,
                &message,
            )
            .wrap_err_with(|| format!("failed executing message {id}"))?;

        let signers = match outcome {
            ExecutionOutcome::Executed { validators, .. } => validators,
            ExecutionOutcome::Failed { reason } => {
                tracing::warn!(%id, %reason, "target call reverted");
                Vec::new()
            }
        };
        let token_owner = foreign
            .target::<TestNft>(NFT_ADDRESS)
            .and_then(|nft| nft.owner_of(token_id));

        tracing::info!(%id, signers = signers.len(), "relayed message");
        messages.push(MessageReport {
            id,
            hash: message.hash,
            signers,
            status: executor.status(id),
            token_owner,
        });
    }

    let fees_collected = config
        .home
        .fees
        .as_ref()
        .map(|fees| home.token_balance(fees.token, fees.receiver))
        .unwrap_or_default();

    Ok(SimulationReport {
        registry: registry.address(),
        executor: executor.address(),
        validators: executor.validators().iter().copied().collect(),
        required_signatures: executor.required_signatures(),
        fees_collected,
        messages,
    })
}
