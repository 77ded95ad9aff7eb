use alloy_sol_types::sol;

sol! {
    /// The typed payload validators sign for every relayed message.
    ///
    /// `hash` commits to every other field; see `quorum_primitives::Message::compute_hash`.
    #[derive(Debug, PartialEq, Eq)]
    struct ValidateMessage {
        address sender;
        address targetAddress;
        bytes data;
        uint256 value;
        uint256 id;
        uint64 homeChainId;
        uint64 foreignChainId;
        bytes32 hash;
    }
}
