// demos/bof_run.rs
//
// Small CLI that loads a COFF object file and runs one of its entry points,
// printing whatever it writes through BeaconOutput/BeaconPrintf to stdout.

use std::fs;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a Beacon Object File in-process", long_about = None)]
struct Args {
    /// Path to the compiled .o/.obj file
    object_path: String,

    /// Entry point to invoke
    #[arg(short, long, default_value = "go")]
    entry: String,

    /// Arguments to pack and pass to the entry point, each prefixed with
    /// b/i/s/z/Z (see `pack_args --help`)
    #[arg(short, long)]
    arg: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let object_bytes = fs::read(&args.object_path)?;

    let token_refs: Vec<&str> = args.arg.iter().map(String::as_str).collect();
    let packed = bof_loader::pack_args(&token_refs)?;

    let outcome = bof_loader::load_with_method(&object_bytes, &args.entry, &packed).await?;
    print!("{}", outcome.text());

    if let Some(fault) = outcome.fault {
        anyhow::bail!("entry point faulted: {fault}");
    }

    Ok(())
}
