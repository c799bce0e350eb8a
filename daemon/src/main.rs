//! Coffer daemon: synchronise and watch a wallet against a ledger node.

mod config;

use clap::Parser;
use coffer_ledger_client::{HttpLedgerClient, TransactionQuery};
use coffer_types::Address;
use coffer_utils::LogFormat;
use coffer_wallet_core::{
    IdentitySync, ImportMethod, PendingTransaction, Wallet, WalletError, WalletTransactions,
};
use config::DaemonConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "coffer-daemon", about = "Wallet synchronisation daemon")]
struct Cli {
    /// Ledger node API base URL. Overrides the config file.
    #[arg(long, env = "COFFER_NODE_URL")]
    node_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "COFFER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "COFFER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "COFFER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Wallet operations.
    #[command(name = "wallet")]
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(clap::Subcommand)]
enum WalletAction {
    /// Synchronise identity, votes, tokens and multi-signature participants.
    Sync {
        #[arg(long)]
        address: String,
    },
    /// List confirmed transactions.
    Transactions {
        #[arg(long)]
        address: String,
        #[arg(long, value_enum, default_value_t = Direction::All)]
        direction: Direction,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value_t = 25)]
        limit: u32,
    },
    /// Watch pending transactions until Ctrl-C.
    Pending {
        #[arg(long)]
        address: String,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Direction {
    All,
    Sent,
    Received,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(url) = cli.node_url {
        config.node_url = url;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    coffer_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Wallet { action } => match action {
            WalletAction::Sync { address } => {
                let wallet = open_wallet(&config, address)?;
                sync(&wallet).await?;
            }
            WalletAction::Transactions {
                address,
                direction,
                page,
                limit,
            } => {
                let wallet = open_wallet(&config, address)?;
                report_identity(wallet.synchroniser().identity().await?);
                list_transactions(&wallet, direction, page, limit).await?;
            }
            WalletAction::Pending { address } => {
                let wallet = open_wallet(&config, address)?;
                report_identity(wallet.synchroniser().identity().await?);
                watch_pending(&config, wallet).await?;
            }
        },
    }

    Ok(())
}

fn open_wallet(config: &DaemonConfig, address: String) -> anyhow::Result<Wallet> {
    let address = Address::new(address);
    if !address.is_valid() {
        anyhow::bail!("invalid address: {address}");
    }
    let client = HttpLedgerClient::new(config.node_url.clone())?;
    let wallet = Wallet::new(
        address,
        config.network.clone(),
        ImportMethod::Address,
        config.services(),
    );
    wallet.mutator().ledger_client(Arc::new(client));
    wallet.mutator().set_exchange_currency(config.exchange_currency.clone());
    tracing::info!(
        address = %wallet.address(),
        network = %config.network.id,
        node = %config.node_url,
        "wallet opened"
    );
    Ok(wallet)
}

fn report_identity(outcome: IdentitySync) {
    if let IdentitySync::Preserved { reason } = outcome {
        if reason.is_not_found() {
            tracing::info!("wallet is not known to the ledger yet");
        } else {
            tracing::warn!(error = %reason, "ledger unreachable, showing last known state");
        }
    }
}

async fn sync(wallet: &Wallet) -> anyhow::Result<()> {
    let synchroniser = wallet.synchroniser();
    report_identity(synchroniser.identity().await?);

    if let Err(e) = synchroniser.votes().await {
        tracing::warn!(error = %e, "vote sync failed");
    }
    match synchroniser.tokens().await {
        Ok(report) => tracing::info!(
            synced = report.synced.len(),
            skipped = report.skipped.len(),
            "tokens synced"
        ),
        Err(e) => tracing::warn!(error = %e, "token sync failed"),
    }
    if let Err(e) = synchroniser.multi_signature().await {
        if !matches!(e, WalletError::NotSynchronized) {
            tracing::warn!(error = %e, "participant sync failed");
        }
    }

    let balance = wallet.balance();
    println!("address:   {}", wallet.address());
    println!("balance:   {} {}", balance.available, wallet.currency());
    println!("nonce:     {}", wallet.nonce());
    println!("status:    {:?}", wallet.status());
    match wallet.identity() {
        Ok(identity) => {
            println!("key:       {}", identity.primary_key());
            if let Some(username) = identity.username() {
                println!("username:  {username}");
            }
            println!("validator: {}", identity.is_validator());
        }
        Err(_) => println!("not on the ledger yet"),
    }
    let votes = wallet.votes();
    if !votes.votes.is_empty() {
        println!("votes:     {}", votes.votes.join(", "));
    }
    for token in wallet.tokens() {
        println!("token:     {} {} ({})", token.balance, token.symbol, token.contract_address);
    }
    if let Ok(participants) = wallet.multi_signature().participants() {
        let quorum = wallet.multi_signature().all()?.threshold();
        println!("multisig:  {quorum} of {}", participants.len());
        for participant in participants {
            println!("  - {}", participant.display_name());
        }
    }
    Ok(())
}

async fn list_transactions(
    wallet: &Wallet,
    direction: Direction,
    page: Option<u32>,
    limit: u32,
) -> anyhow::Result<()> {
    let mut query = TransactionQuery::default().limit(limit);
    if let Some(page) = page {
        query = query.page(page);
    }
    let index = wallet.transaction_index();
    let collection = match direction {
        Direction::All => index.all(query).await?,
        Direction::Sent => index.sent(query).await?,
        Direction::Received => index.received(query).await?,
    };

    let currency = wallet.currency().to_string();
    let exchange_currency = wallet.exchange_currency();
    for tx in &collection {
        let arrow = if tx.is_return() {
            "<>"
        } else if tx.is_sent() {
            "->"
        } else {
            "<-"
        };
        println!(
            "{} {arrow} {} {currency} ({} {exchange_currency}) confirmations={}",
            tx.id(),
            tx.total(),
            tx.converted_total().await,
            tx.confirmations(),
        );
    }
    if let Some(next) = collection.next_page() {
        println!("more: --page {next}");
    }
    Ok(())
}

fn print_pending(pending: &[PendingTransaction]) {
    println!("{} pending", pending.len());
    for p in pending {
        println!("  {} {:?}", p.id(), p.state);
    }
}

async fn watch_pending(config: &DaemonConfig, wallet: Wallet) -> anyhow::Result<()> {
    let tracker = WalletTransactions::with_interval(wallet, config.pending_poll_interval());
    let mut updates = tracker.subscribe();
    let handle = tracker.start_syncing_pending_transactions();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("received SIGINT, stopping");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let pending = updates.borrow_and_update().clone();
                print_pending(&pending);
            }
        }
    }

    tracker.stop_syncing_pending_transactions(&handle);
    handle.join().await;
    tracing::info!("pending watch exited cleanly");
    Ok(())
}
