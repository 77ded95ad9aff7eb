use alloy_sol_types::sol;

sol! {
    /// Capability checks and the pause switch shared by registry and executor.
    #[sol(all_derives)]
    interface IRolesAuth {
        function hasRole(bytes32 role, address account) external view returns (bool);
        function grantRole(bytes32 role, address account) external;
        function revokeRole(bytes32 role, address account) external;
        function renounceRole(bytes32 role) external;
        function setPause(bool paused) external;
        function isPaused() external view returns (bool);

        event RoleMembershipUpdated(
            bytes32 indexed role,
            address indexed account,
            address indexed sender,
            bool hasRole
        );
        event PauseStateUpdate(address indexed updater, bool isPaused);

        error Unauthorized(bytes32 role, address account);
        error ServicePaused();
    }
}
