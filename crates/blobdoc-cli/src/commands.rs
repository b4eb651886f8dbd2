use std::sync::Arc;

use anyhow::Context;
use blobdoc_backend::{BlobBackend, FsBlobBackend};
use blobdoc_store::{DocumentStore, EnsureOutcome, MaintenanceFault, StoreConfig};
use colored::Colorize;
use tokio::sync::broadcast;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let backend = Arc::new(
        FsBlobBackend::open(&cli.root)
            .with_context(|| format!("opening store at {}", cli.root.display()))?,
    );
    let store = DocumentStore::new(backend.clone(), config)?;

    match cli.command {
        Command::Put(args) => cmd_put(store, args).await,
        Command::Get(args) => cmd_get(&store, args).await,
        Command::Delete(args) => cmd_delete(store, args).await,
        Command::EnsureIndex(args) => cmd_ensure_index(store, args).await,
        Command::Indexes(args) => cmd_indexes(&store, args).await,
        Command::Keys(args) => cmd_keys(backend.as_ref(), args).await,
    }
}

/// Drain maintenance and print whatever faults it reported.
async fn finish(store: DocumentStore, mut faults: broadcast::Receiver<MaintenanceFault>) {
    store.shutdown().await;
    while let Ok(fault) = faults.try_recv() {
        println!("  {} {}", "index fault:".yellow(), fault);
    }
}

async fn cmd_put(store: DocumentStore, args: PutArgs) -> anyhow::Result<()> {
    let faults = store.subscribe_faults();
    store
        .put(&args.collection, &args.id, &args.content_type, args.payload.into_bytes())
        .await?;
    println!(
        "{} Stored {}/{}",
        "✓".green().bold(),
        args.collection.cyan(),
        args.id.yellow()
    );
    finish(store, faults).await;
    Ok(())
}

async fn cmd_get(store: &DocumentStore, args: AddressArgs) -> anyhow::Result<()> {
    match store.get(&args.collection, &args.id).await? {
        Some(doc) => {
            println!("{} {}", "content-type:".dimmed(), doc.content_type);
            match doc.as_str() {
                Some(text) => println!("{text}"),
                None => println!("<{} bytes of binary data>", doc.data.len()),
            }
        }
        None => println!("{} {}/{} not found", "✗".red(), args.collection, args.id),
    }
    Ok(())
}

async fn cmd_delete(store: DocumentStore, args: AddressArgs) -> anyhow::Result<()> {
    let faults = store.subscribe_faults();
    store.delete(&args.collection, &args.id).await?;
    println!(
        "{} Deleted {}/{}",
        "✓".green().bold(),
        args.collection.cyan(),
        args.id.yellow()
    );
    finish(store, faults).await;
    Ok(())
}

async fn cmd_ensure_index(store: DocumentStore, args: EnsureIndexArgs) -> anyhow::Result<()> {
    let outcome = store.ensure_indexed(&args.collection, &args.field).await?;
    let target = format!("{}.{}", args.collection, args.field);
    match outcome {
        EnsureOutcome::AlreadyIndexed => {
            println!("{} {} already indexed", "✓".green(), target.cyan());
        }
        EnsureOutcome::Created(report) | EnsureOutcome::Resumed(report) => {
            println!("{} Indexed {}", "✓".green().bold(), target.cyan());
            println!("  Pages: {}", report.pages);
            println!("  Documents scanned: {}", report.documents_scanned);
            println!("  Markers written: {}", report.markers_written.to_string().bold());
        }
    }
    store.shutdown().await;
    Ok(())
}

async fn cmd_indexes(store: &DocumentStore, args: CollectionArgs) -> anyhow::Result<()> {
    let fields = store.indexed_fields(&args.collection).await?;
    if fields.is_empty() {
        println!("No indexed fields on {}.", args.collection.cyan());
    }
    for field in fields.iter() {
        println!("  {}", field.yellow());
    }
    Ok(())
}

async fn cmd_keys(backend: &dyn BlobBackend, args: KeysArgs) -> anyhow::Result<()> {
    for key in backend.list_all(&args.prefix).await? {
        println!("{key}");
    }
    Ok(())
}
