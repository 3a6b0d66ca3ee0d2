// demos/pack_args.rs
//
// Packs a list of typed argument tokens into the wire format entry points
// parse with BeaconDataParse, and prints the resulting bytes as hex. Useful
// for building an argument blob to feed `bof_run --arg`.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pack BOF entry-point arguments", long_about = None)]
struct Args {
    /// Tokens to pack, each prefixed with b (hex binary), i (u32), s (u16),
    /// z (ANSI string), or Z (wide string), e.g. `i1234 zhello`
    #[arg(required = true)]
    tokens: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let token_refs: Vec<&str> = args.tokens.iter().map(String::as_str).collect();
    let packed = bof_loader::pack_args(&token_refs)?;

    let hex: String = packed.iter().map(|b| format!("{b:02x}")).collect();
    println!("{hex}");
    Ok(())
}
