//! # rcpt CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rcpt_cli::inspect::{run_hash, run_verify, HashArgs, VerifyArgs};
use rcpt_cli::keys::{run_keygen, KeygenArgs};

/// Signed receipt toolchain: keys, canonical hashes and offline verification.
#[derive(Parser, Debug)]
#[command(name = "rcpt", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an ES256 signing key.
    Keygen(KeygenArgs),

    /// Print the canonical form and SHA-256 of a JSON document.
    Hash(HashArgs),

    /// Verify a receipt token against a JWKS.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Hash(args) => run_hash(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keygen_with_kid() {
        let cli = Cli::try_parse_from(["rcpt", "keygen", "--kid", "k1"]).unwrap();
        match cli.command {
            Commands::Keygen(args) => {
                assert_eq!(args.kid.as_deref(), Some("k1"));
                assert!(args.output.is_none());
                assert_eq!(args.prefix, "receipt-signing");
            }
            other => panic!("expected keygen, got {other:?}"),
        }
    }

    #[test]
    fn parse_verify_requires_jwks() {
        assert!(Cli::try_parse_from(["rcpt", "verify", "a.b.c"]).is_err());
        let cli =
            Cli::try_parse_from(["rcpt", "-v", "verify", "--jwks", "k.json", "a.b.c"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Verify(ref a) if a.token == "a.b.c"));
    }

    #[test]
    fn parse_hash() {
        let cli = Cli::try_parse_from(["rcpt", "hash", "doc.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Hash(ref a) if a.file.ends_with("doc.json")));
    }
}
