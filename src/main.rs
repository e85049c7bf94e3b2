use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paper_registry::{
    ledger::LedgerSnapshot, CommercialPaperContract, ContractCall, MemoryLedger,
};

/// Drives the registry contract against a ledger kept in a local file.
#[derive(Parser, Debug)]
#[command(name = "paper-registry", version, about, long_about = None)]
struct Cli {
    /// World-state snapshot file; created on first write
    #[arg(
        long,
        global = true,
        env = "PAPER_REGISTRY_STATE",
        default_value = "registry-state.json"
    )]
    state: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(short = 'l', long, global = true, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open (or reset) the default market
    Setup,
    /// Create or overwrite a commercial paper
    CreatePaper {
        cusip: String,
        maturity: String,
        par: String,
    },
    /// List papers on a market at a discount
    #[command(allow_negative_numbers = true)]
    ListOnMarket {
        market_id: String,
        discount: String,
        papers: Vec<String>,
    },
    /// Print a market as stored
    RetrieveMarket { market_id: String },
    /// Call a contract function by name, e.g. `invoke CreatePaper P1 30 100`
    Invoke {
        function: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the height and state root of the snapshot file
    StateRoot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut ledger = load_ledger(&cli.state)?;
    let call = match cli.command {
        Command::StateRoot => {
            println!("height {}", ledger.height());
            println!("root   {}", hex::encode(ledger.state_root()));
            return Ok(());
        }
        Command::Setup => ContractCall::Setup,
        Command::CreatePaper {
            cusip,
            maturity,
            par,
        } => ContractCall::CreatePaper {
            cusip,
            maturity,
            par,
        },
        Command::ListOnMarket {
            market_id,
            discount,
            papers,
        } => ContractCall::ListOnMarket {
            market_id,
            discount,
            papers_to_list: papers,
        },
        Command::RetrieveMarket { market_id } => ContractCall::RetrieveMarket { market_id },
        Command::Invoke { function, args } => ContractCall::from_args(&function, &args)?,
    };

    let contract = CommercialPaperContract::new();
    let tx_id = format!("tx-{}", ledger.height() + 1);
    let function = call.function();
    let payload = if call.is_query() {
        ledger.evaluate(&tx_id, function, |ctx| contract.invoke(ctx, call))?
    } else {
        let payload = ledger.submit(&tx_id, function, |ctx| contract.invoke(ctx, call))?;
        save_ledger(&cli.state, &ledger)?;
        payload
    };
    if let Some(text) = payload {
        println!("{text}");
    }
    Ok(())
}

fn load_ledger(path: &Path) -> Result<MemoryLedger> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no snapshot yet, starting empty");
        return Ok(MemoryLedger::new());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse snapshot {}", path.display()))?;
    MemoryLedger::restore(snapshot).with_context(|| format!("restore {}", path.display()))
}

fn save_ledger(path: &Path, ledger: &MemoryLedger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("mkdir {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(&ledger.snapshot())?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    tracing::debug!(path = %path.display(), height = ledger.height(), "snapshot saved");
    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_discount_parses_as_positional() {
        let cli = Cli::parse_from(["paper-registry", "list-on-market", "M1", "-3", "P1", "P2"]);
        match cli.command {
            Command::ListOnMarket {
                market_id,
                discount,
                papers,
            } => {
                assert_eq!(market_id, "M1");
                assert_eq!(discount, "-3");
                assert_eq!(papers, vec!["P1", "P2"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn state_file_defaults() {
        let cli = Cli::parse_from(["paper-registry", "setup"]);
        if std::env::var_os("PAPER_REGISTRY_STATE").is_none() {
            assert_eq!(cli.state, PathBuf::from("registry-state.json"));
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn snapshot_file_round_trips() {
        let dir = std::env::temp_dir().join(format!("paper-registry-{}", std::process::id()));
        let path = dir.join("state.json");
        let mut ledger = MemoryLedger::new();
        let contract = CommercialPaperContract::new();
        ledger
            .submit("tx-1", "Setup", |ctx| contract.setup(ctx))
            .unwrap();
        save_ledger(&path, &ledger).unwrap();
        let loaded = load_ledger(&path).unwrap();
        assert_eq!(loaded.state_root(), ledger.state_root());
        assert_eq!(loaded.height(), 1);
        fs::remove_dir_all(&dir).ok();
    }
}
