//! Parses the compact ASCII configuration descriptor into a validated
//! [`LbConfig`].
//!
//! Grammar (no whitespace tolerated):
//!
//! ```text
//! <rot>      ::= '0'|'1'|'2'|'3'
//! <len_enc>  ::= 'Y'|'y'|'N'|'n'
//! <cid_len>  ::= DIGIT*                   -- decimal, may be empty (=> 0)
//! <method>   ::= 'C'|'c' | 'S'|'s' <nonce_len> | 'B'|'b'
//! <nonce_len>::= DIGIT*                   -- decimal (StreamCipher only)
//!              '-' <server_id_hex>        -- 2..16 hex digits
//!              [ '-' <key_hex> ]          -- exactly 32 hex digits
//! ```
//!
//! Any violation of the grammar, or of the length invariants that are
//! known at parse time, yields the single flat [`ConfigError::Malformed`].

use std::fmt;

use thiserror::Error;

/// A validated QUIC-LB configuration, produced by [`parse`].
///
/// `method` is modelled as a tagged sum carrying only the fields each
/// encoding needs, rather than a flat struct with fields that are unused
/// by some methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbConfig {
    /// Written into the top two bits of the CID's first octet.
    pub rotation_bits: u8,
    /// If set, the first octet's low six bits also encode `cid_length - 1`.
    pub first_byte_encodes_length: bool,
    /// Total CID length in octets. `0` means "inherit from host".
    pub cid_length: u8,
    /// The encoding method and its method-specific parameters.
    pub method: Method,
    /// Number of octets the server id occupies within the CID.
    pub server_id_length: u8,
    /// The server id value, serialised big-endian into `server_id_length` octets.
    pub server_id_value: u64,
}

/// The three QUIC-LB encodings, carrying only the fields each one needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Clear,
    StreamCipher { nonce_length: u8, key: [u8; 16] },
    BlockCipher { key: [u8; 16] },
}

impl Method {
    fn letter(&self) -> char {
        match self {
            Method::Clear => 'C',
            Method::StreamCipher { .. } => 'S',
            Method::BlockCipher { .. } => 'B',
        }
    }

    fn key(&self) -> Option<&[u8; 16]> {
        match self {
            Method::Clear => None,
            Method::StreamCipher { key, .. } => Some(key),
            Method::BlockCipher { key } => Some(key),
        }
    }
}

/// A single, flat parsing failure: any grammar or invariant violation
/// collapses to this one variant.
///
/// `reason` is a fixed, human-readable diagnostic meant for logs; callers
/// are not expected to match on it, only on the variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Malformed(&'static str),
}

impl LbConfig {
    /// Checks that the configured server-id, nonce, and CID lengths are
    /// mutually consistent for the chosen method.
    ///
    /// `effective_cid_length` is `None` when `cid_length == 0` ("inherit
    /// from host") and the actual length is not yet known; in that case
    /// only the method- and server-id-local invariants are checked, and
    /// the CID-length-dependent ones are deferred to [`crate::context::install`],
    /// which knows the effective length and raises
    /// [`crate::context::InstallError::InconsistentLengths`] instead.
    pub(crate) fn check_invariants(&self, effective_cid_length: Option<u8>) -> Result<(), &'static str> {
        if self.server_id_length == 0 || self.server_id_length > 16 {
            return Err("server id length must be 1..=16 octets");
        }

        let value_shift = u32::from(self.server_id_length) * 8;
        if value_shift < 64 && (self.server_id_value >> value_shift) != 0 {
            return Err("server id value does not fit in server id length");
        }

        let min_cid_length: usize = match &self.method {
            Method::Clear => 1 + self.server_id_length as usize,
            Method::StreamCipher { nonce_length, .. } => {
                if !(8..=16).contains(nonce_length) {
                    return Err("stream cipher nonce length must be 8..=16 octets");
                }
                1 + *nonce_length as usize + self.server_id_length as usize
            }
            Method::BlockCipher { .. } => {
                if self.server_id_length > 15 {
                    return Err("block cipher server id length must be <= 15 octets");
                }
                17
            }
        };

        if let Some(cid_length) = effective_cid_length {
            if cid_length > 20 {
                return Err("cid length exceeds the QUIC maximum of 20 octets");
            }
            if (cid_length as usize) < min_cid_length {
                return Err("cid length too short for the configured method and server id length");
            }
        }

        Ok(())
    }
}

impl fmt::Display for LbConfig {
    /// Renders the canonical descriptor string for this configuration.
    /// `parse(&config.to_string()) == Ok(config)` for every valid config.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.rotation_bits,
            if self.first_byte_encodes_length { 'Y' } else { 'N' }
        )?;
        if self.cid_length != 0 {
            write!(f, "{}", self.cid_length)?;
        }
        write!(f, "{}", self.method.letter())?;
        if let Method::StreamCipher { nonce_length, .. } = &self.method {
            write!(f, "{}", nonce_length)?;
        }
        let server_id_hex = hex::encode(be_bytes(self.server_id_value, self.server_id_length));
        write!(f, "-{}", server_id_hex)?;
        if let Some(key) = self.method.key() {
            write!(f, "-{}", hex::encode(key))?;
        }
        Ok(())
    }
}

/// Serialises `value` big-endian into exactly `length` octets (zero-padded
/// on the left if `length` exceeds the 8 octets a `u64` can hold).
pub(crate) fn be_bytes(value: u64, length: u8) -> Vec<u8> {
    let length = length as usize;
    let mut out = vec![0u8; length];
    let value_bytes = value.to_be_bytes();
    if length <= value_bytes.len() {
        out.copy_from_slice(&value_bytes[value_bytes.len() - length..]);
    } else {
        out[length - value_bytes.len()..].copy_from_slice(&value_bytes);
    }
    out
}

/// Parses a QUIC-LB configuration descriptor, e.g.
/// `"0Y10S8-31-0123456789abcdeffedcba9876543210"`.
pub fn parse(descriptor: &str) -> Result<LbConfig, ConfigError> {
    parse_inner(descriptor).map_err(|err| {
        log::warn!("rejected quic-lb configuration descriptor: {err}");
        err
    })
}

fn parse_inner(descriptor: &str) -> Result<LbConfig, ConfigError> {
    let bytes = descriptor.as_bytes();
    let mut pos = 0usize;

    let rotation_bits = match bytes.first() {
        Some(b @ b'0'..=b'3') => b - b'0',
        _ => return Err(ConfigError::Malformed("missing or invalid rotation digit")),
    };
    pos += 1;

    let first_byte_encodes_length = match bytes.get(pos) {
        Some(b'Y') | Some(b'y') => true,
        Some(b'N') | Some(b'n') => false,
        _ => return Err(ConfigError::Malformed("length-encoding flag must be one of Y/y/N/n")),
    };
    pos += 1;

    let digits_start = pos;
    while matches!(bytes.get(pos), Some(b) if b.is_ascii_digit()) {
        pos += 1;
    }
    let cid_length: u8 = parse_decimal(&descriptor[digits_start..pos], 0, "cid length out of range")?;

    let method_letter = *bytes
        .get(pos)
        .ok_or(ConfigError::Malformed("missing method letter"))?;
    pos += 1;

    enum MethodTag {
        Clear,
        StreamCipher,
        BlockCipher,
    }
    let tag = match method_letter {
        b'C' | b'c' => MethodTag::Clear,
        b'S' | b's' => MethodTag::StreamCipher,
        b'B' | b'b' => MethodTag::BlockCipher,
        _ => return Err(ConfigError::Malformed("method must be one of C/c/S/s/B/b")),
    };

    let nonce_length = if matches!(tag, MethodTag::StreamCipher) {
        let start = pos;
        while matches!(bytes.get(pos), Some(b) if b.is_ascii_digit()) {
            pos += 1;
        }
        if pos == start {
            return Err(ConfigError::Malformed("stream cipher method requires a nonce length"));
        }
        Some(parse_decimal(&descriptor[start..pos], 8, "nonce length out of range")?)
    } else {
        None
    };

    if bytes.get(pos) != Some(&b'-') {
        return Err(ConfigError::Malformed("expected '-' before server id"));
    }
    pos += 1;

    let hex_start = pos;
    while matches!(bytes.get(pos), Some(b) if b.is_ascii_hexdigit()) {
        pos += 1;
    }
    let server_id_hex = &descriptor[hex_start..pos];
    if server_id_hex.is_empty() || server_id_hex.len() % 2 != 0 || server_id_hex.len() > 16 {
        return Err(ConfigError::Malformed("server id must be 2..=16 hex digits"));
    }
    let server_id_length = (server_id_hex.len() / 2) as u8;
    let server_id_value = u64::from_str_radix(server_id_hex, 16)
        .map_err(|_| ConfigError::Malformed("server id is not valid hex"))?;

    let key = if bytes.get(pos) == Some(&b'-') {
        pos += 1;
        let key_start = pos;
        while matches!(bytes.get(pos), Some(b) if b.is_ascii_hexdigit()) {
            pos += 1;
        }
        let key_hex = &descriptor[key_start..pos];
        if key_hex.len() != 32 {
            return Err(ConfigError::Malformed("key must be exactly 32 hex digits"));
        }
        let mut key = [0u8; 16];
        hex::decode_to_slice(key_hex, &mut key)
            .map_err(|_| ConfigError::Malformed("key is not valid hex"))?;
        Some(key)
    } else {
        None
    };

    if pos != bytes.len() {
        return Err(ConfigError::Malformed("trailing characters after configuration"));
    }

    let method = match tag {
        MethodTag::Clear => Method::Clear,
        MethodTag::StreamCipher => Method::StreamCipher {
            nonce_length: nonce_length.expect("stream cipher nonce length parsed above"),
            key: key.ok_or(ConfigError::Malformed("stream cipher method requires a key"))?,
        },
        MethodTag::BlockCipher => Method::BlockCipher {
            key: key.ok_or(ConfigError::Malformed("block cipher method requires a key"))?,
        },
    };

    let config = LbConfig {
        rotation_bits,
        first_byte_encodes_length,
        cid_length,
        method,
        server_id_length,
        server_id_value,
    };

    let effective_cid_length = if config.cid_length != 0 {
        Some(config.cid_length)
    } else {
        None
    };
    config
        .check_invariants(effective_cid_length)
        .map_err(ConfigError::Malformed)?;

    Ok(config)
}

fn parse_decimal(digits: &str, default_if_empty: u8, reason: &'static str) -> Result<u8, ConfigError> {
    if digits.is_empty() {
        return Ok(default_if_empty);
    }
    digits.parse::<u8>().map_err(|_| ConfigError::Malformed(reason))
}
