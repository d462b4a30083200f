// Codec: encode/decode a `BTreeMap<String, Entry>` to/from a self-delimited
// MessagePack byte block.
//
// MessagePack (via rmp-serde) is self-delimiting: a decoder reading exactly
// the encoder's output succeeds without needing an external length prefix,
// which is what lets the mmap region's "first zero byte" convention work --
// the encoded block never needs to be told its own length up front.
//
// `#[serde(deny_unknown_fields)]` on `Entry`/`Value` (see types.rs) gives us
// strict decoding: an on-disk file corrupted in a way that produces
// well-formed-but-wrong-shaped MessagePack is rejected rather than silently
// accepted.

use crate::error::{Result, StoreError};
use crate::types::Entry;
use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(64 * 1024));
}

/// Encode the document map into a fresh byte block.
pub fn encode(map: &BTreeMap<String, Entry>) -> Result<Vec<u8>> {
    SCRATCH.with(|scratch| {
        let mut buf = scratch.borrow_mut();
        buf.clear();
        rmp_serde::encode::write(&mut *buf, map)
            .map_err(|e| StoreError::Codec(format!("encode failed: {e}")))?;
        Ok(buf.clone())
    })
}

/// Decode a byte block produced by `encode` (or a prefix of the mmap region
/// ending exactly at the first zero byte) back into a document map.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, Entry>> {
    if bytes.is_empty() {
        return Ok(BTreeMap::new());
    }
    rmp_serde::from_slice(bytes).map_err(|e| StoreError::Codec(format!("decode failed: {e}")))
}
