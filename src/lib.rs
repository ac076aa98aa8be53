//! A QUIC-LB compatible connection ID codec.
//!
//! A QUIC server that sits behind a layer-4 load balancer embeds a *server
//! identifier* inside the connection IDs it hands out, so that packets
//! arriving from the same client on a different 5-tuple (after NAT
//! rebinding or connection migration) can still be routed back to the
//! server that owns the connection, without the load balancer needing to
//! inspect the QUIC handshake. This crate implements the three CID
//! encodings sketched in the IETF "QUIC-LB" draft -- clear, stream-cipher
//! obfuscated, and block-cipher encrypted -- along with their inverse
//! (server-id recovery) operations.
//!
//! The surrounding QUIC transport stack (packet framing, the handshake,
//! retry tokens, I/O) is not this crate's concern: [`generate`] and
//! [`verify`] are pure, synchronous functions over a [`LbContext`] and a
//! caller-owned CID buffer. The [`CidCodecHost`] trait models the minimal
//! slice of the surrounding stack this crate needs to talk to in order to
//! install and uninstall itself.
//!
//! ```
//! use quic_lb::{config, context, host::InMemoryHost};
//!
//! let parsed = config::parse("0Y10S8-31-0123456789abcdeffedcba9876543210").unwrap();
//! let mut host = InMemoryHost::new(parsed.cid_length);
//! let ctx = context::install(&mut host, parsed).unwrap();
//!
//! let mut cid = vec![0u8; ctx.cid_length() as usize];
//! ctx.generate(&[], &[], &mut cid);
//! assert_eq!(ctx.verify(&cid), 0x31);
//! ```

pub mod config;
pub mod context;
pub mod generator;
pub mod host;
pub mod verifier;

mod aes_ecb;
mod feistel;

pub use config::{ConfigError, LbConfig, Method};
pub use context::{install, uninstall, CidCodec, CidCodecHost, CodecHandle, InstallError, LbContext};
pub use generator::generate;
pub use verifier::verify;
