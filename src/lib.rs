//! Cross-chain USDC bridge orchestration for the ARC test network.
//!
//! Moves USDC between the home chain and external chains through the
//! protocol's burn-and-mint messenger. The crate validates a transfer
//! request, puts the wallet on the source network, bounds the protocol
//! fee, runs the approve, service-fee, and burn-with-hook sequence, and
//! records the confirmed transfer. The destination-chain mint happens
//! off-system; a transfer is complete here once the burn is confirmed.

mod bindings;
pub mod config;
pub mod confirm;
pub mod fee;
pub mod history;
pub mod memo;
pub mod orchestrator;
pub mod reconcile;
pub mod registry;
pub mod transfer;
pub mod usdc;
pub mod wallet;

pub use config::{setup_tracing, Ctx, Env};
pub use orchestrator::{BridgeError, BridgeOptions, Orchestrator};
pub use usdc::Usdc;
