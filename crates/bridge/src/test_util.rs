//! Fixtures for exercising registry and executor end to end.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, Bytes, U256, address};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolCall, SolInterface, SolValue, sol};
use quorum_contracts::IMessageRegistry;
use quorum_primitives::{Eip712Domain, Message, sign_message};

use crate::{
    ExecutionOutcome, ExecutorConfig, MessageExecutor, MessageRegistry, Quorum, RegistryEvent,
    Result,
    host::{CallContext, CallTarget, InMemoryHost, Revert},
};

pub const REGISTRY_ADDRESS: Address = address!("0x5e6d000000000000000000000000000000000001");
pub const EXECUTOR_ADDRESS: Address = address!("0xe2ec000000000000000000000000000000000001");
pub const NFT_ADDRESS: Address = address!("0x0721000000000000000000000000000000000001");
pub const FEE_TOKEN_ADDRESS: Address = address!("0xfee0000000000000000000000000000000000001");
pub const FEE_RECEIVER: Address = address!("0xfee0000000000000000000000000000000000002");
pub const OWNER: Address = address!("0x00a0000000000000000000000000000000000001");

pub const HOME_CHAIN_ID: u64 = 1337;
pub const FOREIGN_CHAIN_ID: u64 = 31337;

sol! {
    /// A minimal mintable collection used as the foreign-chain target.
    #[sol(all_derives)]
    interface ITestNft {
        function mint(address to, uint256 tokenId) external;
        function mintPayable(address to, uint256 tokenId) external payable;
        function ownerOf(uint256 tokenId) external view returns (address);

        error TokenAlreadyMinted(uint256 tokenId);
        error InvalidReceiver(address receiver);
        error NonexistentToken(uint256 tokenId);
        error NotPayable();
        error PaymentRequired();
    }
}

/// Mint target. `mint` rejects attached value, `mintPayable` requires it, and unknown calldata
/// reverts.
#[derive(Debug, Default)]
pub struct TestNft {
    owners: HashMap<U256, Address>,
    received: U256,
}

impl TestNft {
    pub fn owner_of(&self, token_id: U256) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    /// Total value received through `mintPayable`.
    pub fn received(&self) -> U256 {
        self.received
    }

    /// Mints directly, bypassing the bridge.
    pub fn mint_to(&mut self, to: Address, token_id: U256) -> Result<(), Revert> {
        if to.is_zero() {
            return Err(Revert::custom(ITestNft::InvalidReceiver { receiver: to }));
        }
        if self.owners.contains_key(&token_id) {
            return Err(Revert::custom(ITestNft::TokenAlreadyMinted { tokenId: token_id }));
        }
        self.owners.insert(token_id, to);
        Ok(())
    }

    pub fn mint_calldata(to: Address, token_id: U256) -> Bytes {
        ITestNft::mintCall {
            to,
            tokenId: token_id,
        }
        .abi_encode()
        .into()
    }

    pub fn mint_payable_calldata(to: Address, token_id: U256) -> Bytes {
        ITestNft::mintPayableCall {
            to,
            tokenId: token_id,
        }
        .abi_encode()
        .into()
    }
}

impl CallTarget for TestNft {
    fn call(&mut self, ctx: CallContext, data: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = ITestNft::ITestNftCalls::abi_decode(data) else {
            return Err(Revert::default());
        };

        match call {
            ITestNft::ITestNftCalls::mint(call) => {
                if !ctx.value.is_zero() {
                    return Err(Revert::custom(ITestNft::NotPayable {}));
                }
                self.mint_to(call.to, call.tokenId)?;
            }
            ITestNft::ITestNftCalls::mintPayable(call) => {
                if ctx.value.is_zero() {
                    return Err(Revert::custom(ITestNft::PaymentRequired {}));
                }
                self.mint_to(call.to, call.tokenId)?;
                self.received += ctx.value;
            }
            ITestNft::ITestNftCalls::ownerOf(call) => {
                if !ctx.value.is_zero() {
                    return Err(Revert::custom(ITestNft::NotPayable {}));
                }
                let Some(owner) = self.owner_of(call.tokenId) else {
                    let missing = ITestNft::NonexistentToken {
                        tokenId: call.tokenId,
                    };
                    return Err(Revert::custom(missing));
                };
                return Ok(owner.abi_encode().into());
            }
        }
        Ok(Bytes::new())
    }
}

/// Deterministic validator signing keys.
#[derive(Debug, Clone)]
pub struct ValidatorKeys {
    signers: Vec<PrivateKeySigner>,
}

impl ValidatorKeys {
    /// Derives `count` keys from fixed seeds, so every run sees the same validator addresses.
    pub fn generate(count: usize) -> Self {
        let signers = (0..count)
            .map(|index| {
                let secret = B256::from(U256::from(0x5eed_0000_u64 + index as u64));
                PrivateKeySigner::from_bytes(&secret)
                    .expect("small non-zero scalars are valid secp256k1 keys")
            })
            .collect();
        Self { signers }
    }

    pub fn from_signers(signers: Vec<PrivateKeySigner>) -> Self {
        Self { signers }
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn signer(&self, index: usize) -> &PrivateKeySigner {
        &self.signers[index]
    }

    pub fn address(&self, index: usize) -> Address {
        self.signers[index].address()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(PrivateKeySigner::address).collect()
    }

    /// Signatures from the validators at `indices`, in that order.
    pub fn sign_with(
        &self,
        indices: &[usize],
        domain: &Eip712Domain,
        message: &Message,
    ) -> alloy_signer::Result<Vec<Bytes>> {
        indices
            .iter()
            .map(|&index| {
                sign_message(&self.signers[index], domain, message)
                    .map(|signature| Bytes::copy_from_slice(&signature.as_bytes()))
            })
            .collect()
    }
}

/// A home chain with a registry and a foreign chain with an executor and a [`TestNft`].
#[derive(Debug)]
pub struct BridgeFixture {
    pub home: InMemoryHost,
    pub registry: MessageRegistry,
    pub foreign: InMemoryHost,
    pub executor: MessageExecutor,
    pub keys: ValidatorKeys,
}

impl BridgeFixture {
    pub fn builder() -> BridgeFixtureBuilder {
        BridgeFixtureBuilder::default()
    }

    /// Sends a request from `caller` and returns the message as a relayer would rebuild it
    /// from the `RequestForSignature` event.
    pub fn send(
        &mut self,
        caller: Address,
        target: Address,
        data: Bytes,
        value: U256,
    ) -> Result<Message> {
        let id = self.registry.send_message(
            &mut self.home,
            caller,
            IMessageRegistry::sendMessageCall {
                targetAddress: target,
                data,
                value,
                foreignChainId: self.executor.chain_id(),
            },
        )?;
        Ok(self.observed(id).expect("registered message has an event"))
    }

    /// Requests a zero-value [`TestNft`] mint of `token_id` to `caller`.
    pub fn send_mint(&mut self, caller: Address, token_id: u64) -> Result<Message> {
        let data = TestNft::mint_calldata(caller, U256::from(token_id));
        self.send(caller, NFT_ADDRESS, data, U256::ZERO)
    }

    /// The request with `id`, reconstructed purely from registry events.
    pub fn observed(&self, id: U256) -> Option<Message> {
        self.registry.events().iter().find_map(|event| match event {
            RegistryEvent::RequestForSignature(request) if request.id == id => {
                Some(Message::from(request.clone()))
            }
            _ => None,
        })
    }

    /// Signatures from the validators at `indices` under the executor's domain.
    pub fn sign(&self, indices: &[usize], message: &Message) -> Vec<Bytes> {
        self.keys
            .sign_with(indices, self.executor.domain(), message)
            .expect("local signing does not fail")
    }

    pub fn execute(
        &mut self,
        relayer: Address,
        attached_value: U256,
        signatures: &[Bytes],
        message: &Message,
    ) -> Result<ExecutionOutcome> {
        self.executor.execute_message(
            &mut self.foreign,
            relayer,
            attached_value,
            signatures,
            message,
        )
    }

    pub fn nft(&self) -> &TestNft {
        self.foreign
            .target::<TestNft>(NFT_ADDRESS)
            .expect("fixture deploys the nft")
    }

    pub fn nft_mut(&mut self) -> &mut TestNft {
        self.foreign
            .target_mut::<TestNft>(NFT_ADDRESS)
            .expect("fixture deploys the nft")
    }
}

#[derive(Debug, Clone)]
pub struct BridgeFixtureBuilder {
    validators: usize,
    quorum: Quorum,
    sender_only: bool,
    fees: Option<U256>,
}

impl Default for BridgeFixtureBuilder {
    fn default() -> Self {
        Self {
            validators: 3,
            quorum: Quorum::Fixed(2),
            sender_only: false,
            fees: None,
        }
    }
}

impl BridgeFixtureBuilder {
    pub fn validators(mut self, count: usize) -> Self {
        self.validators = count;
        self
    }

    pub fn quorum(mut self, quorum: Quorum) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn sender_only(mut self, sender_only: bool) -> Self {
        self.sender_only = sender_only;
        self
    }

    /// Charges `amount` of [`FEE_TOKEN_ADDRESS`] per request, paid to [`FEE_RECEIVER`].
    pub fn fees(mut self, amount: U256) -> Self {
        self.fees = Some(amount);
        self
    }

    pub fn build(self) -> Result<BridgeFixture> {
        let keys = ValidatorKeys::generate(self.validators);

        let mut home = InMemoryHost::new(HOME_CHAIN_ID);
        let mut registry = MessageRegistry::new(REGISTRY_ADDRESS, HOME_CHAIN_ID, OWNER);
        if let Some(amount) = self.fees {
            home.deploy_token(FEE_TOKEN_ADDRESS);
            let fees = IMessageRegistry::setFeesCall {
                token: FEE_TOKEN_ADDRESS,
                amount,
            };
            registry.set_fees(OWNER, fees)?;
            let receiver = IMessageRegistry::setFeeReceiverCall {
                receiver: FEE_RECEIVER,
            };
            registry.set_fee_receiver(OWNER, receiver)?;
        }

        let mut foreign = InMemoryHost::new(FOREIGN_CHAIN_ID);
        foreign.register_target(NFT_ADDRESS, TestNft::default());
        let executor = MessageExecutor::new(
            EXECUTOR_ADDRESS,
            FOREIGN_CHAIN_ID,
            ExecutorConfig::new(OWNER, keys.addresses(), self.quorum)
                .with_sender_only(self.sender_only),
        )?;

        Ok(BridgeFixture {
            home,
            registry,
            foreign,
            executor,
            keys,
        })
    }
}
