//! The AES-128 single-block primitive the codec uses as a keyed
//! pseudo-random permutation. Only ECB-style one-block-at-a-time
//! encrypt/decrypt is needed -- there is no mode of operation here, the
//! codec itself supplies the chaining (see [`crate::feistel`]).

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

/// Owns a key schedule for one 16-octet AES-128 key and applies the
/// single-block transform in place.
pub(crate) struct Aes128EcbEngine {
    cipher: Aes128,
}

impl Aes128EcbEngine {
    pub(crate) fn new(key: &[u8; 16]) -> Self {
        Aes128EcbEngine {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        }
    }

    /// Encrypts `block` in place.
    pub(crate) fn encrypt_block(&self, block: &mut [u8; 16]) {
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(block));
    }

    /// Decrypts `block` in place.
    pub(crate) fn decrypt_block(&self, block: &mut [u8; 16]) {
        self.cipher
            .decrypt_block(GenericArray::from_mut_slice(block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [0x2bu8, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c];
        let engine = Aes128EcbEngine::new(&key);
        let original = [0u8; 16];
        let mut block = original;
        engine.encrypt_block(&mut block);
        assert_ne!(block, original);
        engine.decrypt_block(&mut block);
        assert_eq!(block, original);
    }

    #[test]
    fn encryption_is_deterministic() {
        let key = [0x42u8; 16];
        let engine = Aes128EcbEngine::new(&key);
        let mut a = [7u8; 16];
        let mut b = [7u8; 16];
        engine.encrypt_block(&mut a);
        engine.encrypt_block(&mut b);
        assert_eq!(a, b);
    }
}
