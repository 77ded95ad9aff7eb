use alloy_sol_types::sol;

sol! {
    /// Home-chain registry that numbers outbound requests and collects fees.
    #[sol(all_derives)]
    interface IMessageRegistry {
        function sendMessage(
            address targetAddress,
            bytes data,
            uint256 value,
            uint64 foreignChainId
        ) external returns (uint256 id);
        function setFees(address token, uint256 amount) external;
        function setFeeReceiver(address receiver) external;
        function nextId() external view returns (uint256);

        event RequestForSignature(
            address indexed sender,
            address indexed targetAddress,
            bytes data,
            uint256 value,
            uint256 indexed id,
            uint64 homeChainId,
            uint64 foreignChainId,
            bytes32 hash
        );
        event NewFees(address indexed token, uint256 amount);
        event NewFeeReceiver(address indexed oldFeeReceiver, address indexed newFeeReceiver);

        error InvalidTargetAddress();
        error InconsistentFees(address token, uint256 amount);
        error InvalidFeeReceiver();
        error FeeApprovalMissing(uint256 allowance, uint256 required);
        error FeeTransferFailed(address token, address from, uint256 amount);
    }
}
