//! stakechat - chat with a staking agent from the terminal

mod commands;
mod config;

use alloy_primitives::Address;
use clap::Parser;
use stakechat_agent::{Orchestrator, RpcWallet, SessionEvent, SimulatedWallet, Wallet};
use stakechat_ai::{HttpAgentClient, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// stakechat - stake, withdraw and claim by talking to an agent
#[derive(Parser, Debug)]
#[command(name = "stakechat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Send a single prompt, wait for any stake it starts, then exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Use an in-process simulated wallet instead of a JSON-RPC node
    #[arg(long)]
    dry_run: bool,

    /// JSON-RPC endpoint of the node holding the account
    #[arg(long)]
    rpc_url: Option<String>,

    /// Account to send transactions from
    #[arg(long)]
    address: Option<Address>,

    /// Config file (default: <config dir>/stakechat/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Sender for dry runs when no address is configured
const DRY_RUN_ADDRESS: Address = Address::repeat_byte(0x5a);

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stakechat=debug")
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(config::Config::config_path);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init(&config_path) {
            Ok(()) => {
                println!("Config file created at: {}", config_path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load(&config_path);

    let Some(api_key) = cfg.api_key() else {
        eprintln!("Error: No agent API key found");
        eprintln!();
        eprintln!(
            "Set it with: export {}=your-key",
            stakechat_ai::client::API_KEY_ENV
        );
        eprintln!("Or add it to the config file: stakechat --init-config");
        std::process::exit(1);
    };

    let http = reqwest::Client::builder()
        .timeout(cfg.agent_timeout())
        .build()?;
    let agent = Arc::new(
        HttpAgentClient::new(api_key)
            .with_endpoint(cfg.endpoint())
            .with_http_client(http),
    );
    let (wallet, simulated) = build_wallet(&args, &cfg);
    tracing::debug!(endpoint = agent.endpoint(), "agent client ready");

    let orchestrator = Orchestrator::new(cfg.orchestrator_config(), agent, wallet);

    let result = match args.command {
        Some(command) => run_command(&orchestrator, &command).await,
        None => run_interactive(&orchestrator).await,
    };
    if let Some(simulated) = simulated {
        eprintln!("{}", dry_run_summary(&simulated));
    }
    result
}

/// Build the wallet; dry runs also hand back the simulated chain for reporting
fn build_wallet(
    args: &Args,
    cfg: &config::Config,
) -> (Arc<dyn Wallet>, Option<Arc<SimulatedWallet>>) {
    let address = args.address.or(cfg.wallet.address);
    if args.dry_run {
        tracing::info!("dry run: using simulated wallet");
        let simulated = Arc::new(SimulatedWallet::new(Some(address.unwrap_or(DRY_RUN_ADDRESS))));
        return (simulated.clone(), Some(simulated));
    }
    if address.is_none() {
        tracing::warn!("no sending address configured; transactions will be refused");
    }
    let rpc_url = args.rpc_url.as_deref().unwrap_or(cfg.rpc_url());
    let wallet = RpcWallet::new(rpc_url, address).with_poll_interval(cfg.poll_interval());
    tracing::info!(rpc_url = wallet.rpc_url(), "using JSON-RPC wallet");
    (Arc::new(wallet), None)
}

/// One line per simulated transaction, then the final block height
fn dry_run_summary(wallet: &SimulatedWallet) -> String {
    let txs = wallet.transactions();
    let mut lines = vec![format!("Dry run: {} simulated transaction(s)", txs.len())];
    lines.extend(
        txs.iter()
            .map(|tx| format!("  block {}: {} ({})", tx.block_number, tx.call, tx.tx_hash)),
    );
    lines.push(format!("Simulated chain at block {}", wallet.block_number()));
    lines.join("\n")
}

fn spawn_printer(mut receiver: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::TurnAppended { turn } if turn.sender() == Sender::Assistant => {
            println!("{}", turn.content());
        }
        SessionEvent::TransactionSubmitted { kind, tx_hash } => {
            eprintln!("[{} submitted: {}]", kind.label(), tx_hash);
        }
        SessionEvent::ApprovalConfirmed {
            tx_hash,
            block_number,
        } => {
            eprintln!("[approval {} confirmed in block {}]", tx_hash, block_number);
        }
        SessionEvent::Error { message } => {
            tracing::debug!(message, "session error");
        }
        _ => {}
    }
}

/// Tear down the session, telling the user about an abandoned stake
fn shutdown(orchestrator: &Orchestrator) {
    if let Some(pending) = orchestrator.teardown() {
        eprintln!(
            "Stake of {} {} abandoned: approval {} was submitted but the stake was not.",
            pending.amount,
            orchestrator.config().contracts.token_symbol,
            pending.approval_tx
        );
    }
}

async fn run_command(orchestrator: &Orchestrator, command: &str) -> anyhow::Result<()> {
    println!("stakechat> {}", command);
    println!();

    let printer = spawn_printer(orchestrator.subscribe());

    orchestrator.submit(command).await?;

    let limit = orchestrator.config().confirmation_timeout + Duration::from_secs(5);
    if !orchestrator.handle().wait_for_idle_timeout(limit).await {
        eprintln!("Gave up waiting for the pending stake.");
    }
    shutdown(orchestrator);

    // Wait a bit for final events
    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();

    Ok(())
}

async fn run_interactive(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    use std::io::{self, Write};

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let wallet = orchestrator
            .wallet_address()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "no wallet".to_string());
        eprintln!(
            "stakechat ({}) on chain {}. Type /help for commands.",
            wallet,
            orchestrator.config().contracts.chain_id
        );
        eprintln!();
    }

    let printer = spawn_printer(orchestrator.subscribe());

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input, orchestrator) {
            match result {
                commands::CommandResult::Exit => break,
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        if let Err(e) = orchestrator.submit(input).await {
            eprintln!("Error: {}", e);
        }
    }

    shutdown(orchestrator);
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}
