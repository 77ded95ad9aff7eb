use alloy_sol_types::sol;

sol! {
    /// Foreign-chain executor gated by a validator quorum.
    #[sol(all_derives)]
    interface IMessageExecutor {
        function addValidators(address[] validators) external;
        function removeValidators(address[] validators) external;
        function setQuorumRatio(uint64 numerator, uint64 denominator) external;
        function setRequiredSignatures(uint64 required) external;
        function requiredSignatures() external view returns (uint256);
        function executedMessages(uint256 id) external view returns (bool);

        event MessageExecuted(
            address[] validators,
            address indexed sender,
            address indexed targetAddress,
            bytes data,
            uint256 value,
            uint256 indexed id,
            uint64 homeChainId,
            uint64 foreignChainId,
            bytes32 hash
        );
        event MessageFailed(
            address indexed sender,
            address indexed targetAddress,
            bytes data,
            uint256 value,
            uint256 indexed id,
            uint64 homeChainId,
            uint64 foreignChainId,
            bytes32 hash,
            bytes reason
        );
        event NewQuorumRatio(
            uint64 oldNumerator,
            uint64 oldDenominator,
            uint64 newNumerator,
            uint64 newDenominator
        );
        event NewRequiredSignatures(uint64 oldRequired, uint64 newRequired);
        event ValidatorsAdded(address[] validators);
        event ValidatorsRemoved(address[] validators);

        error AlreadyExecuted(uint256 id);
        error QuorumNotMet(uint256 signed, uint256 required);
        error ValueMismatch(uint256 attached, uint256 expected);
        error ExecutionReverted(uint256 id, uint256 value, bytes reason);
        error QuorumUnderflow(uint256 remaining, uint256 required);
        error InvalidRatio(uint64 numerator, uint64 denominator, uint256 validators);
        error InvalidValidator(address validator);
        error HashMismatch(bytes32 expected, bytes32 actual);
        error WrongDestination(uint64 expected, uint64 actual);
        error OnlyOriginalSender(address sender, address caller);
    }
}
