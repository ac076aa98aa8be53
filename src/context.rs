//! Installed context: owns the parsed configuration plus any live AES
//! handles, and the `install`/`uninstall` lifecycle that publishes and
//! retires it on a host.
//!
//! The host does not hold a raw function pointer plus an opaque `void*`;
//! it holds one implementation of the small [`CidCodec`] trait, chosen by
//! dependency injection through [`install`].

use std::sync::Arc;

use thiserror::Error;

use crate::aes_ecb::Aes128EcbEngine;
use crate::config::{be_bytes, LbConfig, Method};
use crate::{generator, verifier};

/// The live, per-method state an installed context needs. Mirrors
/// [`Method`] but carries AES key schedules instead of raw key bytes.
pub(crate) enum ContextMethod {
    Clear,
    StreamCipher {
        nonce_length: u8,
        engine: Aes128EcbEngine,
    },
    BlockCipher {
        enc_engine: Aes128EcbEngine,
        dec_engine: Aes128EcbEngine,
    },
}

/// An installed, immutable QUIC-LB codec context.
///
/// Read-only after construction: generation and verification never
/// mutate it, so it is safe to share behind an `Arc` across threads (spec
/// §5 -- no internal mutex is needed because there is nothing to
/// synchronize).
pub struct LbContext {
    pub(crate) rotation_bits: u8,
    pub(crate) first_byte_encodes_length: bool,
    pub(crate) cid_length: u8,
    pub(crate) server_id_bytes: Vec<u8>,
    pub(crate) method: ContextMethod,
}

impl std::fmt::Debug for LbContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LbContext")
            .field("rotation_bits", &self.rotation_bits)
            .field("first_byte_encodes_length", &self.first_byte_encodes_length)
            .field("cid_length", &self.cid_length)
            .field("server_id_length", &self.server_id_bytes.len())
            .finish()
    }
}

impl LbContext {
    fn build(config: &LbConfig, cid_length: u8) -> LbContext {
        let server_id_bytes = be_bytes(config.server_id_value, config.server_id_length);
        let method = match &config.method {
            Method::Clear => ContextMethod::Clear,
            Method::StreamCipher { nonce_length, key } => ContextMethod::StreamCipher {
                nonce_length: *nonce_length,
                engine: Aes128EcbEngine::new(key),
            },
            Method::BlockCipher { key } => ContextMethod::BlockCipher {
                enc_engine: Aes128EcbEngine::new(key),
                dec_engine: Aes128EcbEngine::new(key),
            },
        };
        LbContext {
            rotation_bits: config.rotation_bits,
            first_byte_encodes_length: config.first_byte_encodes_length,
            cid_length,
            server_id_bytes,
            method,
        }
    }

    /// The CID length this context was installed with (the host's length
    /// when `cid_length` was configured as `0`).
    pub fn cid_length(&self) -> u8 {
        self.cid_length
    }
}

/// Generation and verification as a single object a host can hold by
/// dependency injection instead of a raw function pointer plus context.
pub trait CidCodec: Send + Sync {
    /// Fills in the server-id (and, for encrypted methods, masks or
    /// encrypts) the non-host-owned regions of `cid` in place. `cid` must
    /// be exactly `cid_length()` octets, pre-filled by the host with
    /// nonce / "for server use" bytes.
    fn generate(&self, cid_local: &[u8], cid_remote: &[u8], cid: &mut [u8]);

    /// Recovers the embedded server id, or `u64::MAX` if `cid`'s length
    /// does not match `cid_length()`.
    fn verify(&self, cid: &[u8]) -> u64;

    /// The CID length this codec was installed with.
    fn cid_length(&self) -> u8;
}

impl CidCodec for LbContext {
    fn generate(&self, cid_local: &[u8], cid_remote: &[u8], cid: &mut [u8]) {
        generator::generate(self, cid_local, cid_remote, cid)
    }

    fn verify(&self, cid: &[u8]) -> u64 {
        verifier::verify(self, cid)
    }

    fn cid_length(&self) -> u8 {
        self.cid_length
    }
}

/// Opaque identity of one `install` call, used by [`uninstall`] to confirm
/// the callback currently registered on the host is the one being torn
/// down: tearing down a stale or foreign handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecHandle(usize);

fn handle_for(ctx: &Arc<LbContext>) -> CodecHandle {
    CodecHandle(Arc::as_ptr(ctx) as *const () as usize)
}

/// Models the minimal slice of the surrounding QUIC stack this crate
/// needs: the host's current CID length, whether a codec is already
/// registered, and whether any connection already exists with a CID
/// length other than the one about to be installed.
pub trait CidCodecHost {
    /// The host's current CID length (used to resolve `cid_length == 0`,
    /// i.e. "inherit from host").
    fn cid_length(&self) -> u8;

    /// Updates the host's CID length. Called by `install` once the
    /// effective length has been determined.
    fn set_cid_length(&mut self, cid_length: u8);

    /// The handle of the codec currently registered, if any.
    fn installed_handle(&self) -> Option<CodecHandle>;

    /// Registers `codec` as the active CID-generation callback.
    fn install_codec(&mut self, handle: CodecHandle, codec: Arc<dyn CidCodec>);

    /// Clears the active CID-generation callback.
    fn clear_codec(&mut self);

    /// Whether any existing connection uses a CID length other than `cid_length`.
    fn has_connections_with_other_cid_length(&self, cid_length: u8) -> bool;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    /// The configured lengths (CID / nonce / server id) are mutually
    /// inconsistent once the effective CID length is known.
    #[error("inconsistent lengths: {0}")]
    InconsistentLengths(&'static str),

    /// The host already has connections or a callback that conflicts
    /// with this installation.
    #[error("incompatible host state: {0}")]
    IncompatibleHostState(&'static str),

    /// AES key-schedule setup failed.
    ///
    /// Unreachable with the current fixed-size AES-128 key type (key
    /// setup from a `[u8; 16]` cannot fail); kept in the taxonomy since a
    /// future pluggable crypto backend could raise it.
    #[error("crypto initialization failed: {0}")]
    CryptoInitFailure(&'static str),
}

/// Validates `config`, builds an [`LbContext`], and registers it on
/// `host` as the active CID-generation callback.
pub fn install<H: CidCodecHost>(host: &mut H, config: LbConfig) -> Result<Arc<LbContext>, InstallError> {
    if host.installed_handle().is_some() {
        return Err(InstallError::IncompatibleHostState(
            "a different CID-generation callback is already registered",
        ));
    }

    let effective_cid_length = if config.cid_length != 0 {
        config.cid_length
    } else {
        host.cid_length()
    };

    if host.has_connections_with_other_cid_length(effective_cid_length) {
        return Err(InstallError::IncompatibleHostState(
            "a connection already exists with a different cid length",
        ));
    }

    config
        .check_invariants(Some(effective_cid_length))
        .map_err(InstallError::InconsistentLengths)?;

    let ctx = Arc::new(LbContext::build(&config, effective_cid_length));
    let handle = handle_for(&ctx);

    host.set_cid_length(effective_cid_length);
    host.install_codec(handle, ctx.clone());

    log::info!(
        "installed quic-lb codec: cid_length={} server_id_length={}",
        effective_cid_length,
        config.server_id_length
    );

    Ok(ctx)
}

/// Tears down `installed` if it is still the codec registered on `host`;
/// a no-op otherwise.
pub fn uninstall<H: CidCodecHost>(host: &mut H, installed: &Arc<LbContext>) {
    if host.installed_handle() != Some(handle_for(installed)) {
        return;
    }
    host.clear_codec();
    log::info!("uninstalled quic-lb codec: cid_length={}", installed.cid_length);
}
