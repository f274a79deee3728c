use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::B256;
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use ledger_analysis::{balance_deltas, format_eth, net_balance_changes, ommer_coinbases, FullBlock};
use ledger_data::blocks::load_bundles;
use ledger_data::{BalanceDelta, BlockBundle, BlockTrace, ContractCreated, LedgerConfig, TraceStrategy};
use ledger_trace::trace_block;
use tokio::sync::Semaphore;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AppContext {
    config: LedgerConfig,
}

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Trace Ethereum blocks into contract events, token classifications and balance ledgers")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// JSON configuration file (falls back to LEDGER_CONFIG, then mainnet defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trace block bundles and print their balance delta ledgers.
    Trace(TraceArgs),
    /// Print every contract created in a block with its classification.
    Classify(ClassifyArgs),
    /// Print per-account net balance changes of a block.
    Ledger(LedgerArgs),
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Block bundle JSON files.
    #[arg(long = "bundle", required = true)]
    bundles: Vec<PathBuf>,

    /// Trace interpretation strategy: flat or replay.
    #[arg(long)]
    strategy: Option<String>,

    /// Also print TOKEN_TRANSFER deltas.
    #[arg(long)]
    tokens: bool,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,

    /// Blocks traced in parallel.
    #[arg(long, default_value_t = 4)]
    jobs: usize,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    #[arg(long)]
    bundle: PathBuf,

    #[arg(long)]
    strategy: Option<String>,

    #[arg(long, default_value = "table")]
    output: String,
}

#[derive(Args, Debug)]
struct LedgerArgs {
    #[arg(long)]
    bundle: PathBuf,

    #[arg(long)]
    strategy: Option<String>,

    #[arg(long, default_value = "table")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let config_path = cli
        .config
        .or_else(|| std::env::var_os("LEDGER_CONFIG").map(PathBuf::from));
    let config = match config_path {
        Some(path) => LedgerConfig::from_file(&path)?,
        None => LedgerConfig::default(),
    };
    let ctx = AppContext { config };

    match cli.command {
        Commands::Trace(args) => handle_trace(&ctx, args).await,
        Commands::Classify(args) => handle_classify(&ctx, args).await,
        Commands::Ledger(args) => handle_ledger(&ctx, args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn resolve_strategy(ctx: &AppContext, arg: Option<&str>) -> Result<TraceStrategy> {
    match arg {
        Some(raw) => raw.parse(),
        None => Ok(ctx.config.strategy),
    }
}

fn check_output(output: &str) -> Result<()> {
    match output {
        "table" | "json" => Ok(()),
        other => Err(eyre!("invalid --output '{other}', expected table|json")),
    }
}

/// Traces every bundle on the blocking pool, at most `jobs` at a time.
///
/// Results keep the order of `bundles`.
async fn trace_all(
    ctx: &AppContext,
    bundles: Vec<BlockBundle>,
    strategy: TraceStrategy,
    jobs: usize,
) -> Result<Vec<(BlockBundle, BlockTrace)>> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let config = Arc::new(ctx.config.clone());

    let pb = ProgressBar::new(bundles.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks")
            .wrap_err("failed to create progress style")?
            .progress_chars("#>-"),
    );

    let mut handles = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .wrap_err("trace semaphore closed")?;
        let config = config.clone();
        let pb = pb.clone();
        let block_number = bundle.header.number;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = trace_block(&bundle, &config, strategy);
            pb.inc(1);
            result.map(|trace| (bundle, trace))
        });
        handles.push((block_number, handle));
    }

    let mut traced = Vec::with_capacity(handles.len());
    for (block_number, handle) in handles {
        let result = handle
            .await
            .wrap_err_with(|| format!("trace task for block {block_number} failed"))?;
        traced.push(result.wrap_err_with(|| format!("failed to trace block {block_number}"))?);
    }

    pb.finish_with_message("traced");
    Ok(traced)
}

async fn trace_one(ctx: &AppContext, bundle: PathBuf, strategy: Option<&str>) -> Result<(BlockBundle, BlockTrace)> {
    let strategy = resolve_strategy(ctx, strategy)?;
    let bundles = load_bundles(&[bundle], 1).await?;
    trace_all(ctx, bundles, strategy, 1)
        .await?
        .pop()
        .ok_or_else(|| eyre!("no block traced"))
}

async fn handle_trace(ctx: &AppContext, args: TraceArgs) -> Result<()> {
    check_output(&args.output)?;
    let strategy = resolve_strategy(ctx, args.strategy.as_deref())?;

    let bundles = load_bundles(&args.bundles, args.jobs).await?;
    let traced = trace_all(ctx, bundles, strategy, args.jobs).await?;

    let mut blocks = Vec::with_capacity(traced.len());
    for (bundle, trace) in traced {
        let block = FullBlock::assemble(&bundle, trace)
            .wrap_err_with(|| format!("failed to assemble block {}", bundle.header.number))?;
        blocks.push(block);
    }

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&blocks).wrap_err("failed to serialize JSON")?;
        println!("{json}");
    } else {
        for block in &blocks {
            println!(
                "\n=== Block {} ({}) ===",
                block.header.number, block.header.hash
            );
            println!(
                "Transactions: {}, Touched accounts: {}, Total fees: {}\n",
                block.trace.transaction_traces.len(),
                block.touched_accounts.len(),
                format_eth(block.trace.total_fees)
            );
            print_delta_table(&block.balance_deltas);
            if args.tokens {
                println!("Token transfers:");
                print_delta_table(&block.token_deltas);
            }
        }
    }

    info!(
        blocks = blocks.len(),
        strategy = ?strategy,
        "trace command completed"
    );
    Ok(())
}

async fn handle_classify(ctx: &AppContext, args: ClassifyArgs) -> Result<()> {
    check_output(&args.output)?;
    let (bundle, trace) = trace_one(ctx, args.bundle, args.strategy.as_deref()).await?;

    let created: Vec<&ContractCreated> = trace
        .transaction_traces
        .iter()
        .flat_map(|tx| tx.contracts_created.iter())
        .collect();

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&created).wrap_err("failed to serialize JSON")?;
        println!("{json}");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec![
            "Contract",
            "Tx Hash (truncated)",
            "Type",
            "Capabilities",
            "Name",
            "Symbol",
            "Decimals",
            "Total Supply",
        ]);

        for contract in &created {
            let metadata = contract.metadata.clone().unwrap_or_default();
            let capabilities = contract
                .capabilities
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            table.add_row(vec![
                contract.contract_address.to_string(),
                contract.transaction_hash.map(short_hash).unwrap_or_default(),
                contract
                    .contract_type
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                capabilities,
                metadata.name.unwrap_or_default(),
                metadata.symbol.unwrap_or_default(),
                metadata.decimals.map(|d| d.to_string()).unwrap_or_default(),
                metadata
                    .total_supply
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            ]);
        }

        println!("{}\n", table);
    }

    info!(
        block_number = bundle.header.number,
        contracts = created.len(),
        "classify command completed"
    );
    Ok(())
}

async fn handle_ledger(ctx: &AppContext, args: LedgerArgs) -> Result<()> {
    check_output(&args.output)?;
    let (bundle, trace) = trace_one(ctx, args.bundle, args.strategy.as_deref()).await?;

    let deltas = balance_deltas(&trace, &ommer_coinbases(&bundle.ommers));
    let ledgers = net_balance_changes(&deltas);

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&ledgers).wrap_err("failed to serialize JSON")?;
        println!("{json}");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Account", "Credited", "Debited", "Net"]);

        for (account, ledger) in &ledgers {
            table.add_row(vec![
                account.to_string(),
                format_eth(ledger.credited),
                format_eth(ledger.debited),
                ledger.change().to_string(),
            ]);
        }

        println!("{}\n", table);
    }

    info!(
        block_number = bundle.header.number,
        accounts = ledgers.len(),
        deltas = deltas.len(),
        "ledger command completed"
    );
    Ok(())
}

fn print_delta_table(deltas: &[BalanceDelta]) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Type", "Tx", "PC", "From", "To", "Amount", "Token", "Token Id",
    ]);

    for delta in deltas {
        let amount = delta.amount.unwrap_or_default();
        let amount = if delta.delta_type.is_native() {
            format_eth(amount)
        } else {
            amount.to_string()
        };

        table.add_row(vec![
            delta.delta_type.to_string(),
            delta
                .transaction_index
                .map(|index| index.to_string())
                .unwrap_or_default(),
            delta.pc.to_string(),
            delta.from.map(|a| a.to_string()).unwrap_or_default(),
            delta.to.map(|a| a.to_string()).unwrap_or_default(),
            amount,
            delta
                .contract_address
                .map(|a| a.to_string())
                .unwrap_or_default(),
            delta.token_id.map(|id| id.to_string()).unwrap_or_default(),
        ]);
    }

    println!("{}\n", table);
}

fn short_hash(hash: B256) -> String {
    let hex = hash.to_string();
    format!("{}...{}", &hex[2..8], &hex[hex.len() - 4..])
}
