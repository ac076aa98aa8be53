//! A minimal in-memory [`CidCodecHost`] implementation.
//!
//! This crate does not ship a real QUIC transport stack -- the
//! install/uninstall lifecycle needs something implementing
//! [`CidCodecHost`] to exercise it end to end. `InMemoryHost` is that
//! something: a small stand-in used by the demo CLI and by this crate's
//! own tests.

use std::sync::Arc;

use crate::context::{CidCodec, CidCodecHost, CodecHandle};

/// A host that only tracks what this crate's lifecycle rules need: the
/// current CID length, the installed codec (if any), and the CID lengths
/// of any "live" connections.
pub struct InMemoryHost {
    cid_length: u8,
    installed: Option<(CodecHandle, Arc<dyn CidCodec>)>,
    connection_cid_lengths: Vec<u8>,
}

impl InMemoryHost {
    pub fn new(initial_cid_length: u8) -> Self {
        InMemoryHost {
            cid_length: initial_cid_length,
            installed: None,
            connection_cid_lengths: Vec::new(),
        }
    }

    /// Records a "live" connection using `cid_length`, for
    /// [`CidCodecHost::has_connections_with_other_cid_length`].
    pub fn add_connection(&mut self, cid_length: u8) {
        self.connection_cid_lengths.push(cid_length);
    }

    /// The currently installed codec, if any.
    pub fn codec(&self) -> Option<&Arc<dyn CidCodec>> {
        self.installed.as_ref().map(|(_, codec)| codec)
    }
}

impl CidCodecHost for InMemoryHost {
    fn cid_length(&self) -> u8 {
        self.cid_length
    }

    fn set_cid_length(&mut self, cid_length: u8) {
        self.cid_length = cid_length;
    }

    fn installed_handle(&self) -> Option<CodecHandle> {
        self.installed.as_ref().map(|(handle, _)| *handle)
    }

    fn install_codec(&mut self, handle: CodecHandle, codec: Arc<dyn CidCodec>) {
        self.installed = Some((handle, codec));
    }

    fn clear_codec(&mut self) {
        self.installed = None;
    }

    fn has_connections_with_other_cid_length(&self, cid_length: u8) -> bool {
        self.connection_cid_lengths.iter().any(|&len| len != cid_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::context::install;

    #[test]
    fn codec_is_accessible_after_install() {
        let mut host = InMemoryHost::new(5);
        let ctx = install(&mut host, parse("0N5C-2A").unwrap()).unwrap();
        let codec = host.codec().expect("codec installed");
        assert_eq!(codec.cid_length(), ctx.cid_length());
        let mut cid = vec![0u8; 5];
        codec.generate(&[], &[], &mut cid);
        assert_eq!(codec.verify(&cid), 0x2A);
    }
}
