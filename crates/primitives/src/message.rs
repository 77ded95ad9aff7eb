use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::SolValue;
use quorum_contracts::{IMessageRegistry, ValidateMessage};
use serde::{Deserialize, Serialize};

/// A cross-chain request as recorded by the registry.
///
/// Messages are created once by `send_message` and never change afterwards. The `hash` field is
/// carried along so relayers and validators can cross-check it; [`Message::has_valid_hash`]
/// tells whether it still commits to the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: U256,
    pub sender: Address,
    pub target_address: Address,
    pub data: Bytes,
    pub value: U256,
    pub home_chain_id: u64,
    pub foreign_chain_id: u64,
    pub hash: B256,
}

impl Message {
    /// Builds a message and fills in its canonical hash.
    pub fn new(
        id: U256,
        sender: Address,
        target_address: Address,
        data: Bytes,
        value: U256,
        home_chain_id: u64,
        foreign_chain_id: u64,
    ) -> Self {
        let hash = message_hash(
            sender,
            target_address,
            &data,
            value,
            id,
            home_chain_id,
            foreign_chain_id,
        );
        Self {
            id,
            sender,
            target_address,
            data,
            value,
            home_chain_id,
            foreign_chain_id,
            hash,
        }
    }

    /// Recomputes the canonical hash from the message fields, ignoring the stored `hash`.
    pub fn compute_hash(&self) -> B256 {
        message_hash(
            self.sender,
            self.target_address,
            &self.data,
            self.value,
            self.id,
            self.home_chain_id,
            self.foreign_chain_id,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// The EIP-712 struct validators sign.
    pub fn to_typed(&self) -> ValidateMessage {
        ValidateMessage::from(self)
    }
}

/// `keccak256` of the standard ABI encoding of
/// `(sender, target, data, value, id, homeChainId, foreignChainId)`.
pub fn message_hash(
    sender: Address,
    target_address: Address,
    data: &[u8],
    value: U256,
    id: U256,
    home_chain_id: u64,
    foreign_chain_id: u64,
) -> B256 {
    let encoded = (
        sender,
        target_address,
        Bytes::copy_from_slice(data),
        value,
        id,
        home_chain_id,
        foreign_chain_id,
    )
        .abi_encode_params();
    keccak256(encoded)
}

impl From<&Message> for ValidateMessage {
    fn from(message: &Message) -> Self {
        Self {
            sender: message.sender,
            targetAddress: message.target_address,
            data: message.data.clone(),
            value: message.value,
            id: message.id,
            homeChainId: message.home_chain_id,
            foreignChainId: message.foreign_chain_id,
            hash: message.hash,
        }
    }
}

impl From<ValidateMessage> for Message {
    fn from(typed: ValidateMessage) -> Self {
        Self {
            id: typed.id,
            sender: typed.sender,
            target_address: typed.targetAddress,
            data: typed.data,
            value: typed.value,
            home_chain_id: typed.homeChainId,
            foreign_chain_id: typed.foreignChainId,
            hash: typed.hash,
        }
    }
}

impl From<IMessageRegistry::RequestForSignature> for Message {
    fn from(event: IMessageRegistry::RequestForSignature) -> Self {
        Self {
            id: event.id,
            sender: event.sender,
            target_address: event.targetAddress,
            data: event.data,
            value: event.value,
            home_chain_id: event.homeChainId,
            foreign_chain_id: event.foreignChainId,
            hash: event.hash,
        }
    }
}

impl From<&Message> for IMessageRegistry::RequestForSignature {
    fn from(message: &Message) -> Self {
        Self {
            sender: message.sender,
            targetAddress: message.target_address,
            data: message.data.clone(),
            value: message.value,
            id: message.id,
            homeChainId: message.home_chain_id,
            foreignChainId: message.foreign_chain_id,
            hash: message.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};
    use alloy_sol_types::SolEvent;
    use proptest::prelude::*;

    fn sample() -> Message {
        Message::new(
            U256::from(7),
            address!("0x00000000000000000000000000000000000000a1"),
            address!("0x00000000000000000000000000000000000000b2"),
            bytes!("deadbeef"),
            U256::from(1_000),
            10,
            20,
        )
    }

    #[test]
    fn hash_is_deterministic() {
        let a = sample();
        let b = sample();
        assert_eq!(a.hash, b.hash);
        assert!(a.has_valid_hash());
        assert_ne!(a.hash, B256::ZERO);
    }

    #[test]
    fn hash_matches_abi_tuple_encoding() {
        let msg = sample();
        let encoded = (
            msg.sender,
            msg.target_address,
            msg.data.clone(),
            msg.value,
            msg.id,
            msg.home_chain_id,
            msg.foreign_chain_id,
        )
            .abi_encode_params();
        // 7 head words plus the length word and one padded word for `data`
        assert_eq!(encoded.len(), 32 * 9);
        assert_eq!(keccak256(&encoded), msg.hash);
    }

    #[test]
    fn tampered_field_invalidates_hash() {
        let mut msg = sample();
        msg.value += U256::from(1);
        assert!(!msg.has_valid_hash());
    }

    #[test]
    fn data_boundary_is_unambiguous() {
        // moving a byte between `data` and a neighbouring field must not collide
        let a = Message::new(
            U256::ZERO,
            Address::ZERO,
            Address::repeat_byte(1),
            bytes!("0001"),
            U256::ZERO,
            1,
            2,
        );
        let b = Message::new(
            U256::ZERO,
            Address::ZERO,
            Address::repeat_byte(1),
            bytes!("00"),
            U256::from(1),
            1,
            2,
        );
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn request_event_round_trips_through_log_data() -> Result<(), alloy_sol_types::Error> {
        let msg = sample();
        let event = IMessageRegistry::RequestForSignature::from(&msg);
        let log = event.encode_log_data();
        let decoded = IMessageRegistry::RequestForSignature::decode_log_data(&log)?;
        assert_eq!(Message::from(decoded), msg);
        Ok(())
    }

    #[test]
    fn serde_uses_camel_case() -> Result<(), serde_json::Error> {
        let msg = sample();
        let json = serde_json::to_value(&msg)?;
        assert!(json.get("targetAddress").is_some());
        assert!(json.get("foreignChainId").is_some());
        let back: Message = serde_json::from_value(json)?;
        assert_eq!(back, msg);
        Ok(())
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        (
            any::<[u8; 32]>(),
            any::<[u8; 20]>(),
            any::<[u8; 20]>(),
            proptest::collection::vec(any::<u8>(), 0..96),
            any::<[u8; 32]>(),
            any::<u64>(),
            any::<u64>(),
        )
            .prop_map(|(id, sender, target, data, value, home, foreign)| {
                Message::new(
                    U256::from_be_bytes(id),
                    Address::from(sender),
                    Address::from(target),
                    Bytes::from(data),
                    U256::from_be_bytes(value),
                    home,
                    foreign,
                )
            })
    }

    proptest! {
        #[test]
        fn every_field_changes_the_hash(
            msg in arb_message(),
            field in 0usize..7,
            flip in 1u8..=255
        ) {
            let mut changed = msg.clone();
            match field {
                0 => changed.id ^= U256::from(flip),
                1 => changed.sender.0.0[19] ^= flip,
                2 => changed.target_address.0.0[19] ^= flip,
                3 => {
                    let mut data = changed.data.to_vec();
                    data.push(flip);
                    changed.data = data.into();
                }
                4 => changed.value ^= U256::from(flip),
                5 => changed.home_chain_id ^= u64::from(flip),
                _ => changed.foreign_chain_id ^= u64::from(flip),
            }
            prop_assert_ne!(changed.compute_hash(), msg.hash);
        }

        #[test]
        fn recomputation_is_stable(msg in arb_message()) {
            prop_assert!(msg.has_valid_hash());
            prop_assert_eq!(msg.compute_hash(), msg.clone().compute_hash());
        }
    }
}
