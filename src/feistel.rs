//! The stream-cipher method's three-pass masking construction.
//!
//! Both generation and verification run the exact same sequence of three
//! one-pass masks over the nonce and server-id regions of the CID; the
//! construction is its own inverse because each pass XORs a region with a
//! keystream derived from the *other* region's current contents, and
//! running the three passes twice in a row restores the original bytes.

use crate::aes_ecb::Aes128EcbEngine;

/// Builds a 16-octet block from `source` (zero-padded), encrypts it, and
/// XORs the first `target.len()` octets of the result into `target`.
fn one_pass_mask(engine: &Aes128EcbEngine, source: &[u8], target: &mut [u8]) {
    debug_assert!(source.len() <= 16);
    debug_assert!(target.len() <= 16);
    let mut block = [0u8; 16];
    block[..source.len()].copy_from_slice(source);
    engine.encrypt_block(&mut block);
    for (t, b) in target.iter_mut().zip(block.iter()) {
        *t ^= b;
    }
}

/// Applies the three-pass mask to `cid[1..1 + nonce_length + server_id_length]`
/// in place. `cid[0]` (the first octet) is never touched.
pub(crate) fn apply_three_pass_mask(
    engine: &Aes128EcbEngine,
    cid: &mut [u8],
    nonce_length: usize,
    server_id_length: usize,
) {
    let id_offset = 1 + nonce_length;

    let (head, tail) = cid.split_at_mut(id_offset);
    one_pass_mask(engine, &head[1..], &mut tail[..server_id_length]);

    let (head, tail) = cid.split_at_mut(id_offset);
    one_pass_mask(engine, &tail[..server_id_length], &mut head[1..]);

    let (head, tail) = cid.split_at_mut(id_offset);
    one_pass_mask(engine, &head[1..], &mut tail[..server_id_length]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_pass_mask_is_self_inverse() {
        let engine = Aes128EcbEngine::new(&[0x11u8; 16]);
        let nonce_length = 8;
        let server_id_length = 4;
        let original: Vec<u8> = (0u8..13).collect(); // 1 + 8 + 4
        let mut buf = original.clone();

        apply_three_pass_mask(&engine, &mut buf, nonce_length, server_id_length);
        assert_ne!(buf[1..], original[1..]);

        apply_three_pass_mask(&engine, &mut buf, nonce_length, server_id_length);
        assert_eq!(buf, original);
    }
}
