//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use common::wire::JsonFormat;

/// Encrypt and decrypt table entities.
///
/// Entities are read as JSON (one object, or an array of objects) from
/// `--input` or stdin, and written to stdout. The key-encryption key is read
/// from `TABLECRYPT_KEK_ID` and `TABLECRYPT_KEK_BASE64`.
#[derive(Debug, Parser)]
#[command(name = "tablecrypt", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt the properties an OpenAPI schema marks `x-encrypt: true`.
    Encrypt(EncryptArgs),
    /// Decrypt and validate entities.
    Decrypt(DecryptArgs),
}

#[derive(Debug, Args)]
pub struct EncryptArgs {
    /// OpenAPI document (YAML or JSON) describing the entity type.
    #[arg(long)]
    pub schema: PathBuf,

    /// Entity type in the document's `components/schemas`. Defaults to the
    /// schema file name without its extension.
    #[arg(long)]
    pub entity_type: Option<String>,

    /// Input file. Reads stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output payload format.
    #[arg(long, value_enum, default_value_t = Format::Full)]
    pub format: Format,
}

#[derive(Debug, Args)]
pub struct DecryptArgs {
    /// OpenAPI document used to restore property types.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Entity type in the schema document.
    #[arg(long, requires = "schema")]
    pub entity_type: Option<String>,

    /// Input file. Reads stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output payload format.
    #[arg(long, value_enum, default_value_t = Format::Full)]
    pub format: Format,
}

/// JSON payload flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Type annotations on every property that needs one.
    Full,
    /// No type annotations.
    #[value(name = "none")]
    Bare,
}

impl From<Format> for JsonFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Full => JsonFormat::FullMetadata,
            Format::Bare => JsonFormat::NoMetadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_encrypt() {
        let cli = Cli::try_parse_from([
            "tablecrypt",
            "encrypt",
            "--schema",
            "customers.yaml",
            "--entity-type",
            "Customer",
            "--format",
            "none",
        ])
        .unwrap();
        let Command::Encrypt(args) = cli.command else {
            panic!("expected encrypt");
        };
        assert_eq!(args.entity_type.as_deref(), Some("Customer"));
        assert_eq!(args.format, Format::Bare);
        assert!(args.input.is_none());
    }

    #[test]
    fn decrypt_entity_type_requires_schema() {
        assert!(Cli::try_parse_from(["tablecrypt", "decrypt", "--entity-type", "Customer"]).is_err());
        assert!(Cli::try_parse_from(["tablecrypt", "decrypt"]).is_ok());
    }
}
