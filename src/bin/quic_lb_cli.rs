//! Demo/debugging CLI for the QUIC-LB codec.
//!
//! Not part of the codec's public contract and keeps no persisted state --
//! just a small operator-facing tool for hand-checking a configuration
//! descriptor against a captured CID.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use quic_lb::context::install;
use quic_lb::host::InMemoryHost;
use quic_lb::{config, CidCodec};

#[derive(Parser)]
#[command(name = "quic-lb", about = "QUIC-LB connection ID codec inspector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a CID from a hex-encoded prefilled buffer.
    Generate {
        /// Configuration descriptor, e.g. "0Y10S8-31-0123...3210".
        descriptor: String,
        /// Hex-encoded prefilled CID octets (nonce / "for server use" bytes).
        prefilled_cid_hex: String,
    },
    /// Recover the server id embedded in an observed CID.
    Verify {
        /// Configuration descriptor, e.g. "0Y10S8-31-0123...3210".
        descriptor: String,
        /// Hex-encoded observed CID.
        cid_hex: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            descriptor,
            prefilled_cid_hex,
        } => {
            let config = config::parse(&descriptor).context("invalid configuration descriptor")?;
            let mut host = InMemoryHost::new(config.cid_length);
            let ctx = install(&mut host, config).context("failed to install configuration")?;

            let mut cid = hex::decode(&prefilled_cid_hex).context("prefilled cid must be hex")?;
            if cid.len() != ctx.cid_length() as usize {
                bail!(
                    "prefilled cid length {} does not match configured cid length {}",
                    cid.len(),
                    ctx.cid_length()
                );
            }
            ctx.generate(&[], &[], &mut cid);
            println!("{}", hex::encode(&cid));
        }
        Command::Verify { descriptor, cid_hex } => {
            let config = config::parse(&descriptor).context("invalid configuration descriptor")?;
            let mut host = InMemoryHost::new(config.cid_length);
            let ctx = install(&mut host, config).context("failed to install configuration")?;

            let cid = hex::decode(&cid_hex).context("cid must be hex")?;
            let server_id = ctx.verify(&cid);
            if server_id == u64::MAX {
                println!("no match (length mismatch)");
            } else {
                println!("{server_id:X}");
            }
        }
    }

    Ok(())
}
