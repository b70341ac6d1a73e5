//! Contract ABIs used by the chain keeper

use alloy::sol;

sol! {
    /// The prize round contract
    #[sol(rpc)]
    interface IPrizeRounds {
        function currentRoundId() external view returns (uint256);
        function rounds(uint256 id) external view returns (uint256 endTs, bool finalized);
        function claimWindow() external view returns (uint256);
        function finalize(bytes calldata secret) external;
        function rolloverIfExpired(uint256 id) external;
    }

    /// The events emitted by a constant-product pair
    interface IPair {
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );
        event Sync(uint112 reserve0, uint112 reserve1);
    }
}
