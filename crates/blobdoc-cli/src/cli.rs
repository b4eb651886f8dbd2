use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobdoc",
    about = "Document store with asynchronously maintained field indexes",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the blobs
    #[arg(long, global = true, default_value = ".blobdoc")]
    pub root: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a document, replacing any previous content
    Put(PutArgs),
    /// Print a document
    Get(AddressArgs),
    /// Delete a document
    Delete(AddressArgs),
    /// Declare a field indexed and backfill it
    EnsureIndex(EnsureIndexArgs),
    /// List the indexed fields of a collection
    Indexes(CollectionArgs),
    /// List raw backend keys under a prefix
    Keys(KeysArgs),
}

#[derive(Args)]
pub struct AddressArgs {
    pub collection: String,
    pub id: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub collection: String,
    pub id: String,
    /// Document payload
    pub payload: String,
    #[arg(long, default_value = "application/json")]
    pub content_type: String,
}

#[derive(Args)]
pub struct EnsureIndexArgs {
    pub collection: String,
    pub field: String,
}

#[derive(Args)]
pub struct CollectionArgs {
    pub collection: String,
}

#[derive(Args)]
pub struct KeysArgs {
    #[arg(default_value = "")]
    pub prefix: String,
}
