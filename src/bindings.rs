//! Solidity contract interface bindings for the USDC token, the protocol
//! messenger, and the home-chain bridge router.

use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    #[allow(clippy::too_many_arguments)]
    interface ITokenMessengerV2 {
        function getMinFeeAmount(uint256 amount) external view returns (uint256);
        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes calldata hookData
        ) external returns (uint64 nonce);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IBridgeRouter {
        function usdc() external view returns (address);
        function feeCollector() external view returns (address);
        function serviceFee() external view returns (uint256);
        function destinationCaller() external view returns (bytes32);
        function tokenMessenger() external view returns (address);
    }
}
