//! Ceres CLI — EVM bytecode decompiler.

use anyhow::{Context, Result};
use ceres::decompiler::{Decompiler, DecompilerConfig, ExplorationOrder};
use ceres::loader::Bytecode;
use clap::{Parser, ValueEnum};
use std::io::{IsTerminal, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full decompilation as JSON.
    Json,
    /// ABI only.
    Abi,
    /// Disassembly listing.
    Asm,
    /// Function signatures found in the code.
    Functions,
    /// Event signatures found in the code.
    Events,
}

#[derive(Parser, Debug)]
#[command(name = "ceres", version, about = "EVM bytecode decompiler")]
struct Cli {
    /// Bytecode as a hex string (with or without 0x prefix).
    #[arg(value_name = "BYTECODE")]
    bytecode: Option<String>,

    /// Read bytecode from a file instead.
    #[arg(short = 'f', long)]
    file: Option<String>,

    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Deepest fork layer explored.
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Total forks allowed.
    #[arg(long, default_value_t = 4096)]
    max_forks: usize,

    /// Total interpreted instructions allowed.
    #[arg(long, default_value_t = 200_000)]
    max_steps: usize,

    /// Execution timeout in seconds (0 disables).
    #[arg(short = 't', long, default_value_t = 60)]
    timeout: u64,

    /// Explore the fall-through edge of a branch before the jump.
    #[arg(long)]
    fallthrough_first: bool,

    /// Print whether MNEMONIC occurs in reachable code, then exit.
    #[arg(long, value_name = "MNEMONIC")]
    contains: Option<String>,
}

fn read_input(cli: &Cli) -> Result<String> {
    let hex_code = if let Some(ref path) = cli.file {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    } else if let Some(ref code) = cli.bytecode {
        code.clone()
    } else if std::io::stdin().is_terminal() {
        anyhow::bail!("no bytecode provided: pass it as an argument, via -f, or pipe to stdin");
    } else {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    };
    Ok(hex_code.trim().to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let hex_code = read_input(&cli)?;
    if hex_code.is_empty() {
        anyhow::bail!("empty bytecode");
    }
    let bytecode = Bytecode::from_hex(&hex_code).context("failed to load bytecode")?;

    let config = DecompilerConfig {
        max_depth: cli.max_depth,
        max_forks: cli.max_forks,
        max_steps: cli.max_steps,
        timeout_secs: cli.timeout,
        order: if cli.fallthrough_first {
            ExplorationOrder::FallthroughFirst
        } else {
            ExplorationOrder::TakenFirst
        },
        ..Default::default()
    };
    let mut decompiler = Decompiler::new(bytecode).with_config(config);

    if let Some(ref mnemonic) = cli.contains {
        println!("{}", decompiler.contains_opcode(mnemonic.as_str())?);
        return Ok(());
    }

    match cli.format {
        OutputFormat::Asm => println!("{}", decompiler.disassemble().join("\n")),
        OutputFormat::Functions => {
            for signature in decompiler.functions() {
                println!("{signature}");
            }
        }
        OutputFormat::Events => {
            for signature in decompiler.events() {
                println!("{signature}");
            }
        }
        OutputFormat::Abi => {
            let abi = decompiler.abi().context("decompilation failed")?;
            println!("{}", serde_json::to_string_pretty(&abi).context("serialise to JSON")?);
        }
        OutputFormat::Json => {
            let result = decompiler.decompile().context("decompilation failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&result.to_json()).context("serialise to JSON")?
            );
        }
    }

    Ok(())
}
