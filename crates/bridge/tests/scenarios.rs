//! End-to-end flows across a home registry and a foreign executor.

use alloy_primitives::{Address, Bytes, U256};
use quorum_bridge::{
    ADMIN_ROLE, BridgeError, ErrorKind, ExecutionOutcome, ExecutorEvent, FEE_MANAGER_ROLE,
    MessageStatus, Quorum, VALIDATOR_ROLE,
    host::Host as _,
    test_util::{
        BridgeFixture, EXECUTOR_ADDRESS, FEE_RECEIVER, FEE_TOKEN_ADDRESS, NFT_ADDRESS, OWNER,
        REGISTRY_ADDRESS, TestNft,
    },
};
use quorum_contracts::IMessageExecutor;

fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10).pow(U256::from(18))
}

#[test]
fn test_ratio_quorum_boundary() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder()
        .validators(10)
        .quorum(Quorum::Ratio {
            numerator: 3,
            denominator: 9,
        })
        .build()?;
    assert_eq!(fixture.executor.required_signatures(), 3);

    let caller = Address::random();
    let message = fixture.send_mint(caller, 1)?;

    // Test 1: two distinct validators fall short
    let signatures = fixture.sign(&[2, 7], &message);
    let err = fixture
        .execute(Address::random(), U256::ZERO, &signatures, &message)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::QuorumNotMet {
            signed: 2,
            required: 3,
        }
    );
    assert!(
        fixture.executor.events().is_empty(),
        "rejected execution must not emit"
    );

    // Test 2: exactly three succeed
    let signatures = fixture.sign(&[2, 7, 9], &message);
    let outcome = fixture.execute(Address::random(), U256::ZERO, &signatures, &message)?;
    assert!(outcome.is_executed());
    assert_eq!(fixture.nft().owner_of(U256::from(1)), Some(caller));
    Ok(())
}

#[test]
fn test_repeated_signer_never_reaches_quorum() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder()
        .validators(3)
        .quorum(Quorum::Fixed(2))
        .build()?;
    let caller = Address::random();
    let message = fixture.send_mint(caller, 4)?;

    let signatures = fixture.sign(&[0, 0, 0], &message);
    let err = fixture
        .execute(caller, U256::ZERO, &signatures, &message)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::QuorumNotMet {
            signed: 1,
            required: 2,
        }
    );
    assert_eq!(fixture.executor.status(message.id), MessageStatus::Pending);
    Ok(())
}

#[test]
fn test_fee_is_collected_on_send() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().fees(U256::from(10)).build()?;
    let caller = Address::random();
    fixture
        .home
        .mint_token(FEE_TOKEN_ADDRESS, caller, U256::from(10))?;
    fixture
        .home
        .approve(FEE_TOKEN_ADDRESS, caller, REGISTRY_ADDRESS, U256::from(10))?;

    let message = fixture.send_mint(caller, 1)?;

    assert_eq!(message.id, U256::ZERO);
    assert_eq!(
        fixture.home.token_balance(FEE_TOKEN_ADDRESS, caller),
        U256::ZERO
    );
    assert_eq!(
        fixture.home.token_balance(FEE_TOKEN_ADDRESS, FEE_RECEIVER),
        U256::from(10)
    );
    assert_eq!(fixture.registry.get_message(U256::ZERO), Some(&message));

    // the allowance is spent, so a second request is refused and nothing is recorded
    let err = fixture.send_mint(caller, 2).unwrap_err();
    assert_eq!(
        err,
        BridgeError::FeeApprovalMissing {
            allowance: U256::ZERO,
            required: U256::from(10),
        }
    );
    assert_eq!(fixture.registry.next_id(), U256::from(1));
    Ok(())
}

#[test]
fn test_value_to_non_payable_target_is_hard_failure() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().build()?;
    let caller = Address::random();
    fixture.foreign.fund(caller, ether(4));

    let data = TestNft::mint_calldata(caller, U256::from(1));
    let message = fixture.send(caller, NFT_ADDRESS, data, ether(2))?;
    let signatures = fixture.sign(&[0, 1], &message);

    let err = fixture
        .execute(caller, ether(2), &signatures, &message)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    let BridgeError::ExecutionReverted { id, value, .. } = err else {
        panic!("expected ExecutionReverted");
    };
    assert_eq!((id, value), (message.id, ether(2)));

    // nothing moved, nothing logged
    assert_eq!(fixture.foreign.balance(caller), ether(4));
    assert_eq!(fixture.foreign.balance(EXECUTOR_ADDRESS), U256::ZERO);
    assert_eq!(fixture.foreign.balance(NFT_ADDRESS), U256::ZERO);
    assert!(fixture.executor.events().is_empty());
    assert_eq!(fixture.executor.status(message.id), MessageStatus::Pending);
    assert_eq!(fixture.nft().owner_of(U256::from(1)), None);
    Ok(())
}

#[test]
fn test_payable_message_forwards_value() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().build()?;
    let caller = Address::random();
    fixture.foreign.fund(caller, ether(4));

    let data = TestNft::mint_payable_calldata(caller, U256::from(3));
    let message = fixture.send(caller, NFT_ADDRESS, data, ether(2))?;
    let signatures = fixture.sign(&[1, 2], &message);

    fixture.execute(caller, ether(2), &signatures, &message)?;
    assert_eq!(fixture.foreign.balance(caller), ether(2));
    assert_eq!(fixture.foreign.balance(NFT_ADDRESS), ether(2));
    assert_eq!(fixture.foreign.balance(EXECUTOR_ADDRESS), U256::ZERO);
    assert_eq!(fixture.nft().received(), ether(2));
    let record = fixture.executor.get_message(message.id);
    assert_eq!(record.map(|r| r.message.value), Some(ether(2)));
    Ok(())
}

#[test]
fn test_soft_failure_stays_retryable() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().build()?;
    let (caller, alice) = (Address::random(), Address::random());
    fixture
        .nft_mut()
        .mint_to(alice, U256::from(5))
        .map_err(|revert| eyre::eyre!("{revert}"))?;

    let message = fixture.send_mint(caller, 5)?;
    let signatures = fixture.sign(&[0, 1], &message);

    // Test 1: target reverts, the call itself is accepted
    let outcome = fixture.execute(Address::random(), U256::ZERO, &signatures, &message)?;
    let ExecutionOutcome::Failed { reason } = outcome else {
        panic!("expected soft failure");
    };
    assert!(!reason.is_empty());
    assert!(matches!(
        fixture.executor.events().last(),
        Some(ExecutorEvent::MessageFailed(event))
            if event.id == message.id && event.reason == reason
    ));
    assert!(!fixture.executor.is_executed(message.id));
    assert_eq!(
        fixture.executor.status(message.id),
        MessageStatus::Failed { attempts: 1 }
    );

    // Test 2: once the target accepts the call, the same signatures execute it
    fixture
        .foreign
        .register_target(NFT_ADDRESS, TestNft::default());
    let outcome = fixture.execute(Address::random(), U256::ZERO, &signatures, &message)?;
    assert!(outcome.is_executed());
    assert_eq!(fixture.nft().owner_of(U256::from(5)), Some(caller));
    assert_eq!(fixture.executor.status(message.id), MessageStatus::Executed);
    assert_eq!(fixture.executor.failed_attempts(message.id), 1);
    Ok(())
}

#[test]
fn test_unknown_selector_is_soft_failure() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().build()?;
    let caller = Address::random();
    let data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
    let message = fixture.send(caller, NFT_ADDRESS, data, U256::ZERO)?;
    let signatures = fixture.sign(&[0, 2], &message);

    for attempt in 1..=2 {
        let outcome = fixture.execute(caller, U256::ZERO, &signatures, &message)?;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                reason: Bytes::new(),
            }
        );
        assert_eq!(fixture.executor.failed_attempts(message.id), attempt);
    }
    let failures = fixture
        .executor
        .events()
        .iter()
        .filter(|event| matches!(event, ExecutorEvent::MessageFailed(_)))
        .count();
    assert_eq!(failures, 2);
    Ok(())
}

#[test]
fn test_validator_removal_respects_quorum() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder()
        .validators(10)
        .quorum(Quorum::Fixed(6))
        .build()?;
    let all = fixture.keys.addresses();

    let remove = IMessageExecutor::removeValidatorsCall {
        validators: all[1..3].to_vec(),
    };
    fixture.executor.remove_validators(OWNER, remove)?;
    assert_eq!(fixture.executor.validators().len(), 8);

    let before: Vec<_> = fixture.executor.validators().iter().copied().collect();
    let remove = IMessageExecutor::removeValidatorsCall {
        validators: all[3..8].to_vec(),
    };
    let err = fixture
        .executor
        .remove_validators(OWNER, remove)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::QuorumUnderflow {
            remaining: 3,
            required: 6,
        }
    );
    let after: Vec<_> = fixture.executor.validators().iter().copied().collect();
    assert_eq!(after, before);

    // removed validators no longer count
    let caller = Address::random();
    let message = fixture.send_mint(caller, 1)?;
    let signatures = fixture.sign(&[0, 1, 2, 3, 4, 5, 6], &message);
    let err = fixture
        .execute(caller, U256::ZERO, &signatures, &message)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::QuorumNotMet {
            signed: 5,
            required: 6,
        }
    );
    Ok(())
}

#[test]
fn test_exactly_once_across_many_messages() -> eyre::Result<()> {
    let mut fixture = BridgeFixture::builder().build()?;
    let caller = Address::random();
    let messages = (0..5u64)
        .map(|token| fixture.send_mint(caller, token))
        .collect::<Result<Vec<_>, _>>()?;

    // execute out of order, then replay everything
    for index in [3usize, 0, 4, 1, 2] {
        let signatures = fixture.sign(&[0, 1], &messages[index]);
        fixture.execute(caller, U256::ZERO, &signatures, &messages[index])?;
    }
    for message in &messages {
        let signatures = fixture.sign(&[0, 1, 2], message);
        let err = fixture
            .execute(caller, U256::ZERO, &signatures, message)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
    }

    let order: Vec<_> = fixture.executor.records().map(|r| r.message.id).collect();
    assert_eq!(order, [3u64, 0, 4, 1, 2].map(U256::from).to_vec());
    Ok(())
}

#[test]
fn test_owner_holds_admin_on_both_sides() -> eyre::Result<()> {
    let fixture = BridgeFixture::builder().build()?;
    assert!(fixture.registry.has_role(*ADMIN_ROLE, OWNER));
    assert!(fixture.registry.has_role(*FEE_MANAGER_ROLE, OWNER));
    assert!(fixture.executor.has_role(*ADMIN_ROLE, OWNER));
    assert!(!fixture.executor.has_role(*VALIDATOR_ROLE, OWNER));
    Ok(())
}
