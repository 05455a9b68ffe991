//! Protocol fee bound computation.
//!
//! A burn call carries a `maxFee` the protocol may deduct on the far side.
//! The bound is resolved from five competing constraints, evaluated in a
//! fixed order: a percentage-of-amount rule, a per-destination floor, an
//! optional global cap, the protocol's own reported minimum (with a
//! configurable buffer against drift between quote and submission), and
//! finally the hard invariant that the fee must stay strictly below the
//! amount being transferred.

use alloy::primitives::U256;
use tracing::debug;

use crate::transfer::Direction;
use crate::usdc::Usdc;

const BPS_DENOMINATOR: u64 = 10_000;

/// Fee rule parameters, supplied by configuration.
#[derive(Debug, Clone)]
pub struct FeeParams {
    /// Percentage rule, in basis points of the transfer amount.
    pub fee_bps: u32,
    /// Minimum fee when the destination is the home chain. Higher than the
    /// external floor because forwarding into the home chain costs more.
    pub floor_to_home: Usdc,
    /// Minimum fee when the destination is an external chain.
    pub floor_to_external: Usdc,
    /// Optional global ceiling on the fee bound.
    pub cap: Option<Usdc>,
    /// Buffer applied on top of the protocol's reported minimum, in basis
    /// points. Guards against the minimum rising between quote and
    /// submission; tunable because no buffer size is guaranteed to be
    /// sufficient.
    pub buffer_bps: u32,
}

impl FeeParams {
    fn floor(&self, direction: Direction) -> U256 {
        match direction {
            // Destination is the home chain.
            Direction::ExternalToHome => self.floor_to_home.0,
            Direction::HomeToExternal => self.floor_to_external.0,
        }
    }
}

/// The resolved fee bound for one transfer attempt. Never persisted;
/// recomputed from scratch on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    /// Flat home-chain service fee, read from the router. Zero for
    /// transfers out of external chains.
    pub service_fee: U256,
    /// The protocol's reported minimum fee for this amount.
    pub protocol_min_fee: U256,
    /// Percentage-rule fee before floors and caps.
    pub percentage_fee: U256,
    /// The max-fee value actually submitted with the burn.
    /// Always strictly less than the transfer amount.
    pub effective_max_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "amount {amount} is too small to carry a valid fee (minimum fee would be \
     {required_fee}); increase the transfer amount"
)]
pub struct FeeConstraintError {
    pub amount: U256,
    pub required_fee: U256,
}

/// Resolves the competing fee constraints into a single bound.
#[derive(Debug, Clone)]
pub struct FeeCalculator {
    params: FeeParams,
}

impl FeeCalculator {
    pub fn new(params: FeeParams) -> Self {
        Self { params }
    }

    /// Computes the fee quote for a transfer.
    ///
    /// `protocol_min` is the messenger contract's reported minimum fee for
    /// this amount; `service_fee` is the router's flat fee (zero when the
    /// source is an external chain). The constraint order matters: later
    /// rules may override earlier ones but never breach the amount bound.
    pub fn quote(
        &self,
        amount: U256,
        direction: Direction,
        protocol_min: U256,
        service_fee: U256,
    ) -> Result<FeeQuote, FeeConstraintError> {
        let percentage_fee =
            amount * U256::from(self.params.fee_bps) / U256::from(BPS_DENOMINATOR);

        let floor = self.params.floor(direction);
        let mut candidate = percentage_fee.max(floor);

        if let Some(cap) = self.params.cap {
            candidate = candidate.min(cap.0);
        }

        if protocol_min > candidate {
            // The protocol minimum is a hard lower bound; submitting less
            // would revert. Buffer it against rising between quote and
            // submission, then re-apply the cap without undercutting the
            // raw minimum.
            let buffered = protocol_min * U256::from(BPS_DENOMINATOR + u64::from(self.params.buffer_bps))
                / U256::from(BPS_DENOMINATOR);

            candidate = buffered;
            if let Some(cap) = self.params.cap {
                candidate = candidate.min(cap.0).max(protocol_min);
            }

            if candidate >= amount {
                return Err(FeeConstraintError {
                    amount,
                    required_fee: candidate,
                });
            }
        }

        // A floor- or cap-driven candidate may still exceed the amount;
        // clamp it to the amount bound rather than failing.
        if candidate >= amount {
            candidate = amount.saturating_sub(U256::from(1u64));
        }

        if candidate >= amount {
            // Only reachable for a zero amount.
            return Err(FeeConstraintError {
                amount,
                required_fee: candidate,
            });
        }

        debug!(
            %amount,
            %percentage_fee,
            %protocol_min,
            effective_max_fee = %candidate,
            "Resolved fee quote"
        );

        Ok(FeeQuote {
            service_fee,
            protocol_min_fee: protocol_min,
            percentage_fee,
            effective_max_fee: candidate,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn usdc(value: &str) -> Usdc {
        value.parse().unwrap()
    }

    fn calculator() -> FeeCalculator {
        FeeCalculator::new(FeeParams {
            fee_bps: 500,
            floor_to_home: usdc("0.50"),
            floor_to_external: usdc("0.20"),
            cap: None,
            buffer_bps: 1_000,
        })
    }

    #[test]
    fn percentage_wins_over_floor() {
        // 10.00 USDC at 5% with a 0.20 floor and a 0.05 protocol minimum.
        let quote = calculator()
            .quote(
                usdc("10.00").0,
                Direction::HomeToExternal,
                usdc("0.05").0,
                U256::ZERO,
            )
            .unwrap();

        assert_eq!(quote.percentage_fee, usdc("0.50").0);
        assert_eq!(quote.effective_max_fee, usdc("0.50").0);
    }

    #[test]
    fn floor_wins_over_small_percentage() {
        // 1.00 USDC at 5% is 0.05, below the 0.20 external floor.
        let quote = calculator()
            .quote(usdc("1.00").0, Direction::HomeToExternal, U256::ZERO, U256::ZERO)
            .unwrap();

        assert_eq!(quote.effective_max_fee, usdc("0.20").0);
    }

    #[test]
    fn home_destination_uses_higher_floor() {
        let quote = calculator()
            .quote(usdc("1.00").0, Direction::ExternalToHome, U256::ZERO, U256::ZERO)
            .unwrap();

        assert_eq!(quote.effective_max_fee, usdc("0.50").0);
    }

    #[test]
    fn buffered_protocol_minimum_exceeding_amount_fails() {
        // 0.30 USDC: candidate starts at max(0.015, 0.20) = 0.20, the
        // protocol minimum of 0.28 bumps it to 0.308 >= 0.30.
        let error = calculator()
            .quote(
                usdc("0.30").0,
                Direction::HomeToExternal,
                usdc("0.28").0,
                U256::ZERO,
            )
            .unwrap_err();

        assert_eq!(error.amount, usdc("0.30").0);
        assert_eq!(error.required_fee, usdc("0.308").0);
    }

    #[test]
    fn protocol_minimum_below_candidate_does_not_bump() {
        let quote = calculator()
            .quote(
                usdc("10.00").0,
                Direction::HomeToExternal,
                usdc("0.40").0,
                U256::ZERO,
            )
            .unwrap();

        assert_eq!(quote.effective_max_fee, usdc("0.50").0);
        assert_eq!(quote.protocol_min_fee, usdc("0.40").0);
    }

    #[test]
    fn protocol_minimum_bump_applies_buffer() {
        let quote = calculator()
            .quote(
                usdc("10.00").0,
                Direction::HomeToExternal,
                usdc("1.00").0,
                U256::ZERO,
            )
            .unwrap();

        // 1.00 * 1.10 = 1.10
        assert_eq!(quote.effective_max_fee, usdc("1.10").0);
    }

    #[test]
    fn cap_clamps_percentage_fee() {
        let calculator = FeeCalculator::new(FeeParams {
            fee_bps: 500,
            floor_to_home: usdc("0.50"),
            floor_to_external: usdc("0.20"),
            cap: Some(usdc("0.30")),
            buffer_bps: 1_000,
        });

        let quote = calculator
            .quote(usdc("10.00").0, Direction::HomeToExternal, U256::ZERO, U256::ZERO)
            .unwrap();

        assert_eq!(quote.percentage_fee, usdc("0.50").0);
        assert_eq!(quote.effective_max_fee, usdc("0.30").0);
    }

    #[test]
    fn cap_never_undercuts_protocol_minimum() {
        let calculator = FeeCalculator::new(FeeParams {
            fee_bps: 500,
            floor_to_home: usdc("0.50"),
            floor_to_external: usdc("0.20"),
            cap: Some(usdc("0.30")),
            buffer_bps: 1_000,
        });

        let quote = calculator
            .quote(
                usdc("10.00").0,
                Direction::HomeToExternal,
                usdc("0.40").0,
                U256::ZERO,
            )
            .unwrap();

        // Buffered minimum 0.44 is capped at 0.30, but the raw protocol
        // minimum 0.40 wins over the cap.
        assert_eq!(quote.effective_max_fee, usdc("0.40").0);
    }

    #[test]
    fn percentage_fee_truncates() {
        // 0.000033 * 5% = 0.00000165, truncated to 0.000001.
        let quote = calculator()
            .quote(
                U256::from(33u64),
                Direction::HomeToExternal,
                U256::ZERO,
                U256::ZERO,
            )
            .unwrap();

        assert_eq!(quote.percentage_fee, U256::from(1u64));
    }

    #[test]
    fn floor_exceeding_amount_clamps_to_amount_bound() {
        // 0.10 USDC with a 0.20 floor and no protocol minimum: the floor
        // is overridden down to amount - 1 micro-unit.
        let quote = calculator()
            .quote(usdc("0.10").0, Direction::HomeToExternal, U256::ZERO, U256::ZERO)
            .unwrap();

        assert_eq!(quote.effective_max_fee, usdc("0.10").0 - U256::from(1u64));
    }

    #[test]
    fn zero_amount_fails() {
        let error = calculator()
            .quote(U256::ZERO, Direction::HomeToExternal, U256::ZERO, U256::ZERO)
            .unwrap_err();
        assert_eq!(error.amount, U256::ZERO);
    }

    #[test]
    fn service_fee_is_carried_through() {
        let quote = calculator()
            .quote(
                usdc("10.00").0,
                Direction::HomeToExternal,
                U256::ZERO,
                usdc("0.10").0,
            )
            .unwrap();
        assert_eq!(quote.service_fee, usdc("0.10").0);
    }

    proptest! {
        #[test]
        fn successful_quotes_stay_below_amount(
            amount_micros in 1u64..=100_000_000_000,
            protocol_min_micros in 0u64..=1_000_000_000,
        ) {
            let result = calculator().quote(
                U256::from(amount_micros),
                Direction::HomeToExternal,
                U256::from(protocol_min_micros),
                U256::ZERO,
            );

            if let Ok(quote) = result {
                prop_assert!(quote.effective_max_fee < U256::from(amount_micros));
            }
        }
    }
}
