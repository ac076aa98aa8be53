//! CID generation: given a pre-filled CID buffer (nonce / "for server
//! use" bytes already in place), overwrites the server-id bytes and, for
//! the encrypted methods, masks or encrypts in place.

use crate::aes_ecb::Aes128EcbEngine;
use crate::context::{ContextMethod, LbContext};
use crate::feistel::apply_three_pass_mask;

/// Writes `cid[0]`. The first octet is host-visible metadata, never
/// encrypted and never inspected during verification.
fn write_first_octet(ctx: &LbContext, cid: &mut [u8]) {
    cid[0] = if ctx.first_byte_encodes_length {
        (ctx.rotation_bits << 6) | (ctx.cid_length - 1)
    } else {
        (ctx.rotation_bits << 6) | (cid[0] & 0x3F)
    };
}

fn generate_clear(ctx: &LbContext, cid: &mut [u8]) {
    write_first_octet(ctx, cid);
    let len = ctx.server_id_bytes.len();
    cid[1..1 + len].copy_from_slice(&ctx.server_id_bytes);
}

fn generate_stream_cipher(ctx: &LbContext, nonce_length: u8, engine: &Aes128EcbEngine, cid: &mut [u8]) {
    write_first_octet(ctx, cid);
    let nonce_length = nonce_length as usize;
    let server_id_length = ctx.server_id_bytes.len();
    let id_offset = 1 + nonce_length;
    cid[id_offset..id_offset + server_id_length].copy_from_slice(&ctx.server_id_bytes);
    apply_three_pass_mask(engine, cid, nonce_length, server_id_length);
}

fn generate_block_cipher(ctx: &LbContext, enc_engine: &Aes128EcbEngine, cid: &mut [u8]) {
    write_first_octet(ctx, cid);
    let len = ctx.server_id_bytes.len();
    cid[1..1 + len].copy_from_slice(&ctx.server_id_bytes);
    let mut block = [0u8; 16];
    block.copy_from_slice(&cid[1..17]);
    enc_engine.encrypt_block(&mut block);
    cid[1..17].copy_from_slice(&block);
}

/// Overwrites the non-host-owned regions of `cid` in place. `cid_local`
/// and `cid_remote` are part of the signature to match the host's
/// callback shape but are not used by this codec.
///
/// `cid` must be exactly `ctx.cid_length()` octets, pre-filled by the
/// host with the nonce / "for server use" bytes the method needs.
pub fn generate(ctx: &LbContext, _cid_local: &[u8], _cid_remote: &[u8], cid: &mut [u8]) {
    debug_assert_eq!(cid.len(), ctx.cid_length as usize);
    match &ctx.method {
        ContextMethod::Clear => generate_clear(ctx, cid),
        ContextMethod::StreamCipher { nonce_length, engine } => {
            generate_stream_cipher(ctx, *nonce_length, engine, cid)
        }
        ContextMethod::BlockCipher { enc_engine, .. } => generate_block_cipher(ctx, enc_engine, cid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::context::install;
    use crate::host::InMemoryHost;

    fn install_for(descriptor: &str, host_cid_length: u8) -> std::sync::Arc<LbContext> {
        let config = parse(descriptor).unwrap();
        let mut host = InMemoryHost::new(host_cid_length);
        install(&mut host, config).unwrap()
    }

    #[test]
    fn first_octet_carries_rotation_bits() {
        let ctx = install_for("2N5C-2A", 5);
        let mut cid = vec![0u8; 5];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(cid[0] >> 6, 2);
    }

    #[test]
    fn first_octet_encodes_length_when_requested() {
        let ctx = install_for("1Y5C-07", 5);
        let mut cid = vec![0u8; 5];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(cid[0], (1 << 6) | (5 - 1));
    }

    #[test]
    fn generation_is_idempotent() {
        let ctx = install_for("0N20S12-1234-000102030405060708090a0b0c0d0e0f", 20);
        let mut a = vec![0u8; 20];
        let mut b = vec![0u8; 20];
        generate(&ctx, &[], &[], &mut a);
        generate(&ctx, &[], &[], &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn clear_5_octet_cid_writes_first_octet_and_server_id() {
        let ctx = install_for("0N5C-2A", 5);
        let mut cid = vec![0u8, 0, 0, 0, 0];
        generate(&ctx, &[], &[], &mut cid);
        assert_eq!(cid[0], 0x00);
        assert_eq!(cid[1], 0x2A);
    }

    #[test]
    fn block_cipher_writes_encrypted_block_matching_raw_aes() {
        let key_hex = "000102030405060708090a0b0c0d0e0f";
        let ctx = install_for(&format!("0N17B-AA-{key_hex}"), 17);
        let mut cid = vec![0u8; 17];
        generate(&ctx, &[], &[], &mut cid);

        let mut key = [0u8; 16];
        hex::decode_to_slice(key_hex, &mut key).unwrap();
        let engine = Aes128EcbEngine::new(&key);
        let mut expected = [0u8; 16];
        expected[0] = 0xAA;
        engine.encrypt_block(&mut expected);
        assert_eq!(&cid[1..17], &expected[..]);
    }
}
