#![forbid(unsafe_code)]

mod cli;
mod commands;
mod startup;

use anyhow::Result;

use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    let output = cli.output;

    if let Some(Command::Version) = cli.command {
        println!("netladder {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = startup::init(&cli)?;

    match cli.command_or_default() {
        Command::Version => Ok(()),
        Command::Check => commands::cmd_check(&ctx, output),
        Command::Zone { name } => commands::cmd_zone(&ctx, &name, output),
        Command::Edge { name } => commands::cmd_edge(&ctx, &name, output),
        Command::Compile { out, metrics_out } => {
            commands::cmd_compile(&ctx, out.as_deref(), metrics_out.as_deref(), output)
        }
    }
}
