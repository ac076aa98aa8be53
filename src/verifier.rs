//! CID verification: recovers the embedded server id from an observed
//! CID, or the `u64::MAX` sentinel on malformed input. Total: never
//! panics, never returns `Result`.

use crate::aes_ecb::Aes128EcbEngine;
use crate::context::{ContextMethod, LbContext};
use crate::feistel::apply_three_pass_mask;

/// Reassembles a big-endian unsigned integer from `bytes`:
/// `result = sum(byte[i] * 256^(n-1-i))`.
fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn verify_clear(ctx: &LbContext, cid: &[u8]) -> u64 {
    let len = ctx.server_id_bytes.len();
    be_bytes_to_u64(&cid[1..1 + len])
}

fn verify_stream_cipher(ctx: &LbContext, nonce_length: u8, engine: &Aes128EcbEngine, cid: &[u8]) -> u64 {
    let nonce_length = nonce_length as usize;
    let server_id_length = ctx.server_id_bytes.len();
    let id_offset = 1 + nonce_length;

    let mut scratch = cid.to_vec();
    apply_three_pass_mask(engine, &mut scratch, nonce_length, server_id_length);
    be_bytes_to_u64(&scratch[id_offset..id_offset + server_id_length])
}

fn verify_block_cipher(ctx: &LbContext, dec_engine: &Aes128EcbEngine, cid: &[u8]) -> u64 {
    let mut block = [0u8; 16];
    block.copy_from_slice(&cid[1..17]);
    dec_engine.decrypt_block(&mut block);
    be_bytes_to_u64(&block[..ctx.server_id_bytes.len()])
}

/// Recovers the embedded server id from `cid`, or `u64::MAX` if `cid`'s
/// length does not match the context's configured CID length.
pub fn verify(ctx: &LbContext, cid: &[u8]) -> u64 {
    if cid.len() != ctx.cid_length as usize {
        return u64::MAX;
    }
    match &ctx.method {
        ContextMethod::Clear => verify_clear(ctx, cid),
        ContextMethod::StreamCipher { nonce_length, engine } => {
            verify_stream_cipher(ctx, *nonce_length, engine, cid)
        }
        ContextMethod::BlockCipher { dec_engine, .. } => verify_block_cipher(ctx, dec_engine, cid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::context::install;
    use crate::generator::generate;
    use crate::host::InMemoryHost;

    fn install_for(descriptor: &str, host_cid_length: u8) -> std::sync::Arc<LbContext> {
        let config = parse(descriptor).unwrap();
        let mut host = InMemoryHost::new(host_cid_length);
        install(&mut host, config).unwrap()
    }

    #[test]
    fn clear_round_trip() {
        let ctx = install_for("0N5C-2A", 5);
        let mut cid = vec![0u8; 5];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(verify(&ctx, &cid), 0x2A);
    }

    #[test]
    fn stream_cipher_round_trip() {
        let ctx = install_for("0N20S12-1234-000102030405060708090a0b0c0d0e0f", 20);
        let mut cid = vec![0u8; 20];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(verify(&ctx, &cid), 0x1234);
        // nonce and ciphertext regions both changed from their all-zero prefill.
        assert!(cid[1..13].iter().any(|&b| b != 0));
        assert!(cid[13..15].iter().any(|&b| b != 0));
    }

    #[test]
    fn block_cipher_round_trip() {
        let ctx = install_for("0N17B-AA-000102030405060708090a0b0c0d0e0f", 17);
        let mut cid = vec![0u8; 17];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(verify(&ctx, &cid), 0xAA);
    }

    #[test]
    fn length_mismatch_returns_sentinel() {
        let ctx = install_for("0N10C-2A", 10);
        assert_eq!(verify(&ctx, &[0u8; 9]), u64::MAX);
        assert_eq!(verify(&ctx, &[0u8; 11]), u64::MAX);
    }

    #[test]
    fn random_prefill_round_trips_for_every_method() {
        let descriptors = [
            "0N5C-2A",
            "0N20S12-1234-000102030405060708090a0b0c0d0e0f",
            "0N17B-AA-000102030405060708090a0b0c0d0e0f",
        ];
        // a handful of distinct "host-filled" patterns standing in for
        // arbitrary nonce / for-server-use bytes.
        let fills: [u8; 4] = [0x00, 0xFF, 0x5A, 0xA5];
        for descriptor in descriptors {
            let config = parse(descriptor).unwrap();
            let expected = config.server_id_value;
            let cid_length = config.cid_length;
            for fill in fills {
                let ctx = install_for(descriptor, cid_length);
                let mut cid = vec![fill; cid_length as usize];
                generate(&ctx, &[], &[], &mut cid);
                assert_eq!(verify(&ctx, &cid), expected);
            }
        }
    }
}
