//! Transfer requests and the ordered on-chain call sequence.
//!
//! The executor drives the approve → service-fee → burn sequence for one
//! validated request. Each step submits through the wallet port, waits for
//! its own receipt, and aborts the whole sequence on failure; nothing is
//! ever retried automatically because fees and allowances can change
//! between attempts. All chain access goes through the [`SourceChain`]
//! port so the sequence is testable without an RPC endpoint.

pub mod evm;

use std::fmt::Display;

use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::confirm::ConfirmError;
use crate::fee::FeeQuote;
use crate::memo::{validate_memo, MemoTooLongError};
use crate::usdc::Usdc;
use crate::wallet::{WalletError, WalletPort};

/// Direction of a bridge transfer relative to the home chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    HomeToExternal,
    ExternalToHome,
}

/// One leg of the transfer sequence, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Approval,
    ServiceFee,
    Burn,
}

impl Display for TransferStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approval => write!(f, "approval"),
            Self::ServiceFee => write!(f, "service fee"),
            Self::Burn => write!(f, "burn"),
        }
    }
}

/// A validated user request to move USDC between two chains.
///
/// Never mutated; a new request supersedes rather than edits an old one.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: String,
    pub destination: String,
    pub amount: Usdc,
    pub recipient: Address,
    pub memo: Option<String>,
    pub direction: Direction,
}

impl TransferRequest {
    /// Builds a request between two chain keys, inferring the direction
    /// from which endpoint is the home chain.
    pub fn between(
        home_key: &str,
        source: impl Into<String>,
        destination: impl Into<String>,
        amount: Usdc,
        recipient: Address,
        memo: Option<String>,
    ) -> Result<Self, ValidationError> {
        let source = source.into();
        let destination = destination.into();

        if source == destination {
            return Err(ValidationError::SameChain { key: source });
        }

        let direction = if source == home_key {
            Direction::HomeToExternal
        } else if destination == home_key {
            Direction::ExternalToHome
        } else {
            return Err(ValidationError::NoHomeEndpoint {
                source_chain: source,
                destination,
                home: home_key.to_string(),
            });
        };

        Ok(Self {
            source,
            destination,
            amount,
            recipient,
            memo,
            direction,
        })
    }

    /// Checks everything that can be checked before any on-chain call.
    pub fn validate(&self, min_transfer: Usdc) -> Result<(), ValidationError> {
        if self.recipient == Address::ZERO {
            return Err(ValidationError::ZeroRecipient);
        }
        if self.amount.is_zero() {
            return Err(ValidationError::ZeroAmount);
        }
        if self.amount < min_transfer {
            return Err(ValidationError::BelowMinimum {
                amount: self.amount,
                minimum: min_transfer,
            });
        }
        if let Some(memo) = &self.memo {
            validate_memo(memo)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("recipient must not be the zero address")]
    ZeroRecipient,
    #[error("transfer amount must be greater than zero")]
    ZeroAmount,
    #[error("amount {amount} USDC is below the minimum transfer of {minimum} USDC")]
    BelowMinimum { amount: Usdc, minimum: Usdc },
    #[error(transparent)]
    Memo(#[from] MemoTooLongError),
    #[error("source and destination are both {key:?}")]
    SameChain { key: String },
    #[error(
        "neither {source_chain:?} nor {destination:?} is the home chain {home:?}; \
         one endpoint of every transfer must be the home chain"
    )]
    NoHomeEndpoint {
        source_chain: String,
        destination: String,
        home: String,
    },
}

/// Source-side contract addresses and fee terms for one transfer.
///
/// On the home chain these come from the router contract; on external
/// chains from static configuration, with no service fee and no
/// destination-caller restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub usdc: Address,
    pub token_messenger: Address,
    pub fee_collector: Address,
    pub service_fee: U256,
    pub destination_caller: FixedBytes<32>,
}

/// Arguments for the burn-with-hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnArgs {
    pub amount: U256,
    pub destination_domain: u32,
    pub mint_recipient: FixedBytes<32>,
    pub burn_token: Address,
    pub destination_caller: FixedBytes<32>,
    pub max_fee: U256,
    pub min_finality_threshold: u32,
    pub hook_data: Bytes,
}

/// Result of a fully confirmed burn sequence.
#[derive(Debug, Clone)]
pub struct ExecutedTransfer {
    pub burn_tx: TxHash,
    pub amount: U256,
    pub max_fee: U256,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "wallet is on network {actual} but the transfer requires network \
         {expected}; the network switch must complete before executing"
    )]
    NetworkMismatch { expected: u64, actual: u64 },
    #[error(
        "balance {balance} is below the required {required} \
         (amount plus service fee)"
    )]
    InsufficientBalance { balance: U256, required: U256 },
    #[error("allowance {allowance} is still below {required} after approval")]
    InsufficientAllowance { allowance: U256, required: U256 },
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Chain access needed by the executor, implemented by
/// [`evm::Evm`] for real chains and by a scripted mock in tests.
#[async_trait]
pub trait SourceChain: Send + Sync {
    /// Network id of the chain this connection targets.
    fn network_id(&self) -> u64;

    /// Logical chain key, for logging.
    fn key(&self) -> &str;

    /// Resolves the source-side addresses and fee terms.
    async fn transfer_context(&self) -> Result<SourceContext, ChainError>;

    /// The protocol's reported minimum fee for this amount.
    async fn protocol_min_fee(&self, messenger: Address, amount: U256)
        -> Result<U256, ChainError>;

    async fn usdc_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn usdc_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn approve_usdc(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError>;

    async fn pay_service_fee(
        &self,
        token: Address,
        collector: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError>;

    async fn deposit_for_burn(
        &self,
        messenger: Address,
        args: BurnArgs,
    ) -> Result<TxHash, ChainError>;

    /// Waits for a submitted transaction's receipt and validates success.
    async fn await_inclusion(&self, tx_hash: TxHash, step: TransferStep)
        -> Result<(), ConfirmError>;
}

/// Pads a 20-byte address into the low-order bytes of a 32-byte value.
///
/// This is the canonical interop format for the destination-chain
/// recipient field and must be byte-exact.
pub fn address_to_bytes32(address: Address) -> FixedBytes<32> {
    FixedBytes::<32>::left_padding_from(address.as_slice())
}

/// Inverse of [`address_to_bytes32`].
pub fn bytes32_to_address(value: FixedBytes<32>) -> Address {
    Address::from_word(value)
}

/// Drives the ordered on-chain call sequence for one transfer.
pub struct TransferExecutor {
    min_finality_threshold: u32,
}

impl TransferExecutor {
    pub fn new(min_finality_threshold: u32) -> Self {
        Self {
            min_finality_threshold,
        }
    }

    /// Executes the approve → service-fee → burn sequence.
    ///
    /// Precondition: the reconciler has already put the wallet on the
    /// source chain; a mismatch here is an error, not a trigger for
    /// another switch. Each step waits for its own receipt before the
    /// next is attempted; any failure aborts the sequence without retry.
    /// An allowance raised before a later step fails stays raised, so a
    /// fresh request does not need to re-approve.
    pub async fn execute(
        &self,
        wallet: &dyn WalletPort,
        chain: &dyn SourceChain,
        context: &SourceContext,
        request: &TransferRequest,
        quote: &FeeQuote,
        hook_data: Bytes,
        destination_domain: u32,
    ) -> Result<ExecutedTransfer, TransferError> {
        let actual = wallet.network_id().await?;
        if actual != chain.network_id() {
            return Err(TransferError::NetworkMismatch {
                expected: chain.network_id(),
                actual,
            });
        }

        let owner = wallet.address();
        let amount = request.amount.0;
        let required = amount + context.service_fee;

        let balance = chain.usdc_balance(context.usdc, owner).await?;
        if balance < required {
            return Err(TransferError::InsufficientBalance { balance, required });
        }

        let allowance = chain
            .usdc_allowance(context.usdc, owner, context.token_messenger)
            .await?;
        debug!(%allowance, %amount, "Checked USDC allowance");

        if allowance < amount {
            // Raise the allowance only when it is actually short; a
            // sufficient allowance issues no approve call at all.
            let tx_hash = chain
                .approve_usdc(context.usdc, context.token_messenger, amount)
                .await?;
            chain.await_inclusion(tx_hash, TransferStep::Approval).await?;

            let raised = chain
                .usdc_allowance(context.usdc, owner, context.token_messenger)
                .await?;
            if raised < amount {
                return Err(TransferError::InsufficientAllowance {
                    allowance: raised,
                    required: amount,
                });
            }
        }

        if !context.service_fee.is_zero() {
            let tx_hash = chain
                .pay_service_fee(context.usdc, context.fee_collector, context.service_fee)
                .await?;
            chain
                .await_inclusion(tx_hash, TransferStep::ServiceFee)
                .await?;
        }

        let args = BurnArgs {
            amount,
            destination_domain,
            mint_recipient: address_to_bytes32(request.recipient),
            burn_token: context.usdc,
            destination_caller: context.destination_caller,
            max_fee: quote.effective_max_fee,
            min_finality_threshold: self.min_finality_threshold,
            hook_data,
        };

        let burn_tx = chain
            .deposit_for_burn(context.token_messenger, args)
            .await?;
        chain.await_inclusion(burn_tx, TransferStep::Burn).await?;

        info!(
            %burn_tx,
            %amount,
            max_fee = %quote.effective_max_fee,
            chain = chain.key(),
            "Burn confirmed"
        );

        Ok(ExecutedTransfer {
            burn_tx,
            amount,
            max_fee: quote.effective_max_fee,
        })
    }
}


#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::mock::{MockChain, MockOp};
    use super::*;
    use crate::fee::FeeQuote;
    use crate::wallet::mock::MockWallet;

    fn usdc(value: &str) -> Usdc {
        value.parse().unwrap()
    }

    fn recipient() -> Address {
        Address::repeat_byte(0x99)
    }

    fn request(direction: Direction) -> TransferRequest {
        let (source, destination) = match direction {
            Direction::HomeToExternal => ("ARC", "BASE_SEPOLIA"),
            Direction::ExternalToHome => ("BASE_SEPOLIA", "ARC"),
        };
        TransferRequest::between(
            "ARC",
            source,
            destination,
            usdc("10.00"),
            recipient(),
            Some("ARC:inv_123".to_string()),
        )
        .unwrap()
    }

    fn quote() -> FeeQuote {
        FeeQuote {
            service_fee: usdc("0.10").0,
            protocol_min_fee: U256::ZERO,
            percentage_fee: usdc("0.50").0,
            effective_max_fee: usdc("0.50").0,
        }
    }

    #[test]
    fn between_infers_home_to_external() {
        let request = TransferRequest::between(
            "ARC",
            "ARC",
            "ETH_SEPOLIA",
            usdc("1"),
            recipient(),
            None,
        )
        .unwrap();
        assert_eq!(request.direction, Direction::HomeToExternal);
    }

    #[test]
    fn between_infers_external_to_home() {
        let request = TransferRequest::between(
            "ARC",
            "ETH_SEPOLIA",
            "ARC",
            usdc("1"),
            recipient(),
            None,
        )
        .unwrap();
        assert_eq!(request.direction, Direction::ExternalToHome);
    }

    #[test]
    fn between_rejects_same_chain() {
        let error =
            TransferRequest::between("ARC", "ARC", "ARC", usdc("1"), recipient(), None)
                .unwrap_err();
        assert!(matches!(error, ValidationError::SameChain { .. }));
    }

    #[test]
    fn between_rejects_two_external_chains() {
        let error = TransferRequest::between(
            "ARC",
            "ETH_SEPOLIA",
            "BASE_SEPOLIA",
            usdc("1"),
            recipient(),
            None,
        )
        .unwrap_err();
        assert!(matches!(error, ValidationError::NoHomeEndpoint { .. }));
    }

    #[test]
    fn validate_rejects_zero_recipient() {
        let mut request = request(Direction::HomeToExternal);
        request.recipient = Address::ZERO;
        assert!(matches!(
            request.validate(Usdc::ZERO),
            Err(ValidationError::ZeroRecipient)
        ));
    }

    #[test]
    fn validate_rejects_amount_below_minimum() {
        let request = request(Direction::HomeToExternal);
        let error = request.validate(usdc("20.00")).unwrap_err();
        assert!(matches!(error, ValidationError::BelowMinimum { .. }));
    }

    #[test]
    fn validate_rejects_oversized_memo() {
        let mut request = request(Direction::HomeToExternal);
        request.memo = Some("x".repeat(129));
        assert!(matches!(
            request.validate(Usdc::ZERO),
            Err(ValidationError::Memo(_))
        ));
    }

    #[tokio::test]
    async fn zero_allowance_issues_exactly_one_approve() {
        let wallet = MockWallet::on_network(5042002);
        let chain = MockChain::home(5042002, usdc("0.10").0);
        let request = request(Direction::HomeToExternal);

        TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                Bytes::new(),
                6,
            )
            .await
            .unwrap();

        let approvals: Vec<_> = chain
            .ops()
            .into_iter()
            .filter(|op| matches!(op, MockOp::Approve { .. }))
            .collect();
        assert_eq!(
            approvals,
            vec![MockOp::Approve {
                spender: chain.context.token_messenger,
                amount: usdc("10.00").0,
            }]
        );
    }

    #[tokio::test]
    async fn sufficient_allowance_issues_no_approve() {
        let wallet = MockWallet::on_network(5042002);
        let chain =
            MockChain::home(5042002, usdc("0.10").0).with_allowance(usdc("15.00").0);
        let request = request(Direction::HomeToExternal);

        TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                Bytes::new(),
                6,
            )
            .await
            .unwrap();

        assert!(!chain
            .ops()
            .iter()
            .any(|op| matches!(op, MockOp::Approve { .. })));
    }

    #[tokio::test]
    async fn home_to_external_runs_steps_in_order() {
        let wallet = MockWallet::on_network(5042002);
        let chain = MockChain::home(5042002, usdc("0.10").0);
        let request = request(Direction::HomeToExternal);
        let hook = Bytes::from_static(b"base:memo");

        let executed = TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                hook.clone(),
                6,
            )
            .await
            .unwrap();

        let ops = chain.ops();
        assert_eq!(ops.len(), 6);
        assert!(matches!(ops[0], MockOp::Approve { .. }));
        assert_eq!(ops[1], MockOp::Confirm(TransferStep::Approval));
        assert_eq!(
            ops[2],
            MockOp::ServiceFee {
                collector: chain.context.fee_collector,
                amount: usdc("0.10").0,
            }
        );
        assert_eq!(ops[3], MockOp::Confirm(TransferStep::ServiceFee));

        let MockOp::Burn(args) = &ops[4] else {
            panic!("expected burn op, got {:?}", ops[4]);
        };
        assert_eq!(args.amount, usdc("10.00").0);
        assert_eq!(args.destination_domain, 6);
        assert_eq!(args.mint_recipient, address_to_bytes32(recipient()));
        assert_eq!(args.burn_token, chain.context.usdc);
        assert_eq!(args.destination_caller, chain.context.destination_caller);
        assert_eq!(args.max_fee, usdc("0.50").0);
        assert_eq!(args.min_finality_threshold, 1000);
        assert_eq!(args.hook_data, hook);

        assert_eq!(ops[5], MockOp::Confirm(TransferStep::Burn));
        assert_eq!(executed.amount, usdc("10.00").0);
    }

    #[tokio::test]
    async fn external_to_home_skips_service_fee_and_caller_restriction() {
        let wallet = MockWallet::on_network(84532);
        let chain = MockChain::external(84532);
        let request = request(Direction::ExternalToHome);
        let quote = FeeQuote {
            service_fee: U256::ZERO,
            ..quote()
        };

        TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote,
                Bytes::new(),
                26,
            )
            .await
            .unwrap();

        let ops = chain.ops();
        assert!(!ops.iter().any(|op| matches!(op, MockOp::ServiceFee { .. })));

        let burn = ops.iter().find_map(|op| match op {
            MockOp::Burn(args) => Some(args.clone()),
            _ => None,
        });
        assert_eq!(burn.unwrap().destination_caller, FixedBytes::ZERO);
    }

    #[tokio::test]
    async fn network_mismatch_aborts_before_any_call() {
        let wallet = MockWallet::on_network(11155111);
        let chain = MockChain::home(5042002, U256::ZERO);
        let request = request(Direction::HomeToExternal);

        let error = TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                Bytes::new(),
                6,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TransferError::NetworkMismatch {
                expected: 5042002,
                actual: 11155111,
            }
        ));
        assert!(chain.ops().is_empty());
    }

    #[tokio::test]
    async fn insufficient_balance_includes_service_fee() {
        let wallet = MockWallet::on_network(5042002);
        // Balance covers the amount but not amount + service fee.
        let chain =
            MockChain::home(5042002, usdc("0.10").0).with_balance(usdc("10.05").0);
        let request = request(Direction::HomeToExternal);

        let error = TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                Bytes::new(),
                6,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TransferError::InsufficientBalance { required, .. }
                if required == usdc("10.10").0
        ));
        assert!(chain.ops().is_empty());
    }

    #[tokio::test]
    async fn service_fee_revert_keeps_allowance_and_skips_burn() {
        let wallet = MockWallet::on_network(5042002);
        let chain = MockChain::home(5042002, usdc("0.10").0)
            .reverting_at(TransferStep::ServiceFee);
        let request = request(Direction::HomeToExternal);

        let error = TransferExecutor::new(1000)
            .execute(
                &wallet,
                &chain,
                &chain.context.clone(),
                &request,
                &quote(),
                Bytes::new(),
                6,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TransferError::Confirm(ConfirmError::Reverted {
                step: TransferStep::ServiceFee,
                ..
            })
        ));

        let ops = chain.ops();
        assert!(!ops.iter().any(|op| matches!(op, MockOp::Burn(_))));
        // The raised allowance survives the failure so a retry does not
        // need to approve again.
        assert_eq!(*chain.allowance.lock().unwrap(), usdc("10.00").0);
    }

    #[test]
    fn address_round_trips_through_bytes32() {
        let address = recipient();
        let word = address_to_bytes32(address);
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], address.as_slice());
        assert_eq!(bytes32_to_address(word), address);
    }

    proptest! {
        #[test]
        fn bytes32_round_trip_is_exact(raw in any::<[u8; 20]>()) {
            let address = Address::from(raw);
            prop_assert_eq!(bytes32_to_address(address_to_bytes32(address)), address);
        }
    }
}
