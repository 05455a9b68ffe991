//! EVM-backed [`SourceChain`] implementation.
//!
//! Reads go straight to the chain's RPC endpoint through a read-only
//! provider; writes are encoded to calldata and submitted through the
//! wallet port, which owns signing and network placement.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use crate::bindings::{IBridgeRouter, IERC20, ITokenMessengerV2};
use crate::confirm::{ConfirmError, ConfirmationTracker};
use crate::registry::{ChainContracts, ChainDescriptor};
use crate::transfer::{BurnArgs, ChainError, SourceChain, SourceContext, TransferStep};
use crate::wallet::WalletPort;

/// Where the source-side contract addresses come from.
enum EvmEndpoint {
    /// Home chain; addresses and fee terms are read from the router.
    Home { router: Address },
    /// External chain; addresses are static configuration.
    External {
        usdc: Address,
        token_messenger: Address,
    },
}

/// A connection to one chain, pairing a read provider with the wallet
/// port for writes.
pub struct Evm {
    key: String,
    network_id: u64,
    provider: DynProvider,
    endpoint: EvmEndpoint,
    wallet: Arc<dyn WalletPort>,
    tracker: ConfirmationTracker,
}

impl Evm {
    /// Connects to the chain described by the descriptor.
    pub fn connect(descriptor: &ChainDescriptor, wallet: Arc<dyn WalletPort>) -> Self {
        let provider = ProviderBuilder::new()
            .connect_http(descriptor.rpc_url.clone())
            .erased();

        let endpoint = match descriptor.contracts {
            ChainContracts::Home { router } => EvmEndpoint::Home { router },
            ChainContracts::External {
                usdc,
                token_messenger,
            } => EvmEndpoint::External {
                usdc,
                token_messenger,
            },
        };

        Self {
            key: descriptor.key.clone(),
            network_id: descriptor.network_id,
            tracker: ConfirmationTracker::new(provider.clone()),
            provider,
            endpoint,
            wallet,
        }
    }
}

#[async_trait]
impl SourceChain for Evm {
    fn network_id(&self) -> u64 {
        self.network_id
    }

    fn key(&self) -> &str {
        &self.key
    }

    async fn transfer_context(&self) -> Result<SourceContext, ChainError> {
        match self.endpoint {
            EvmEndpoint::Home { router } => {
                let router = IBridgeRouter::new(router, &self.provider);
                let context = SourceContext {
                    usdc: router.usdc().call().await?,
                    token_messenger: router.tokenMessenger().call().await?,
                    fee_collector: router.feeCollector().call().await?,
                    service_fee: router.serviceFee().call().await?,
                    destination_caller: router.destinationCaller().call().await?,
                };
                debug!(chain = %self.key, ?context, "Resolved router context");
                Ok(context)
            }
            // External chains have no router; the service fee and the
            // destination-caller restriction only apply when leaving home.
            EvmEndpoint::External {
                usdc,
                token_messenger,
            } => Ok(SourceContext {
                usdc,
                token_messenger,
                fee_collector: Address::ZERO,
                service_fee: U256::ZERO,
                destination_caller: alloy::primitives::FixedBytes::ZERO,
            }),
        }
    }

    async fn protocol_min_fee(
        &self,
        messenger: Address,
        amount: U256,
    ) -> Result<U256, ChainError> {
        let messenger = ITokenMessengerV2::new(messenger, &self.provider);
        Ok(messenger.getMinFeeAmount(amount).call().await?)
    }

    async fn usdc_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        let usdc = IERC20::new(token, &self.provider);
        Ok(usdc.balanceOf(owner).call().await?)
    }

    async fn usdc_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let usdc = IERC20::new(token, &self.provider);
        Ok(usdc.allowance(owner, spender).call().await?)
    }

    async fn approve_usdc(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        let tx_hash = self
            .wallet
            .submit(token, Bytes::from(calldata), "approve USDC for burn")
            .await?;
        Ok(tx_hash)
    }

    async fn pay_service_fee(
        &self,
        token: Address,
        collector: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        let calldata = IERC20::transferCall {
            to: collector,
            amount,
        }
        .abi_encode();
        let tx_hash = self
            .wallet
            .submit(token, Bytes::from(calldata), "pay bridge service fee")
            .await?;
        Ok(tx_hash)
    }

    async fn deposit_for_burn(
        &self,
        messenger: Address,
        args: BurnArgs,
    ) -> Result<TxHash, ChainError> {
        let calldata = ITokenMessengerV2::depositForBurnWithHookCall {
            amount: args.amount,
            destinationDomain: args.destination_domain,
            mintRecipient: args.mint_recipient,
            burnToken: args.burn_token,
            destinationCaller: args.destination_caller,
            maxFee: args.max_fee,
            minFinalityThreshold: args.min_finality_threshold,
            hookData: args.hook_data,
        }
        .abi_encode();
        let tx_hash = self
            .wallet
            .submit(messenger, Bytes::from(calldata), "burn USDC for bridging")
            .await?;
        Ok(tx_hash)
    }

    async fn await_inclusion(
        &self,
        tx_hash: TxHash,
        step: TransferStep,
    ) -> Result<(), ConfirmError> {
        self.tracker.await_inclusion(tx_hash, step).await?;
        Ok(())
    }
}
