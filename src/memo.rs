//! Hook payload encoding.
//!
//! Burn calls carry opaque hook bytes delivered alongside the minted funds
//! on the destination chain. The bridge uses them for a base routing
//! payload plus an optional short human-readable memo. Encoding is
//! deterministic and side-effect-free: the memo's UTF-8 bytes are appended
//! after the base payload.

use alloy::primitives::Bytes;

/// Maximum memo length in UTF-8 bytes (not characters).
pub const MAX_MEMO_BYTES: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("memo is {len} bytes, the limit is {MAX_MEMO_BYTES} bytes")]
pub struct MemoTooLongError {
    pub len: usize,
}

/// Validates a memo's byte length without encoding anything.
pub fn validate_memo(memo: &str) -> Result<(), MemoTooLongError> {
    let len = memo.len();
    if len > MAX_MEMO_BYTES {
        return Err(MemoTooLongError { len });
    }
    Ok(())
}

/// Merges the base hook payload with an optional memo.
///
/// An absent or empty memo returns the base payload unchanged.
pub fn encode_hook_data(base: &Bytes, memo: Option<&str>) -> Result<Bytes, MemoTooLongError> {
    let memo = match memo {
        Some(memo) if !memo.is_empty() => memo,
        _ => return Ok(base.clone()),
    };

    validate_memo(memo)?;

    let mut data = Vec::with_capacity(base.len() + memo.len());
    data.extend_from_slice(base);
    data.extend_from_slice(memo.as_bytes());
    Ok(Bytes::from(data))
}
