use clap::{Args, Parser, Subcommand};
use flightsure::call::{CallBuilder, Operation};
use flightsure::gateway::{
    DispatchOutcome, Dispatcher, DispatcherConfig, Disburser, DisburserConfig, LoggingPayoutTarget,
};
use flightsure::identity::{Address, Keypair};
use flightsure::ledger::{Amount, FlightLedger, LedgerConfig};
use flightsure::storage::LedgerStore;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Operate a flight-delay insurance ledger")]
struct Cli {
    /// Directory holding the ledger snapshot and identities
    #[arg(short, long, default_value = "./flightsure-data")]
    data_dir: PathBuf,

    /// Identity relaying calls as the app gateway
    #[arg(long, default_value = "owner")]
    relayer: String,

    /// Reject calls older than this many seconds and prune older replay entries
    #[arg(long)]
    max_call_age: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Actor {
    /// Identity label signing the call
    #[arg(long = "as")]
    label: String,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy a new ledger owned by a fresh identity
    Init {
        #[arg(long, default_value = "owner")]
        owner: String,
    },
    /// Create a named identity
    NewIdentity { label: String },
    /// List stored identities with their addresses
    Identities,
    /// Admit an airline, sponsored by the signer
    Register {
        #[command(flatten)]
        actor: Actor,
        candidate: String,
    },
    /// Pay the funding contribution
    Fund {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        value: Amount,
    },
    /// Send currency with no selector
    Transfer {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        value: Amount,
    },
    /// Buy delay insurance for a flight
    Buy {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        flight: String,
        #[arg(long)]
        value: Amount,
    },
    /// Credit the passengers of a delayed flight
    Credit {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        flight: String,
    },
    /// Withdraw the signer's credit
    Withdraw {
        #[command(flatten)]
        actor: Actor,
    },
    /// Stop all state-changing operations
    Pause {
        #[command(flatten)]
        actor: Actor,
    },
    /// Re-enable state-changing operations
    Resume {
        #[command(flatten)]
        actor: Actor,
    },
    /// Allow an identity to relay app-facing calls
    Authorize {
        #[command(flatten)]
        actor: Actor,
        identity: String,
    },
    /// Revoke a relaying identity
    Deauthorize {
        #[command(flatten)]
        actor: Actor,
        identity: String,
    },
    /// Move owner currency into the pool
    Capitalize {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        value: Amount,
    },
    /// Deliver queued transfers
    Disburse,
    /// Show ledger state
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let store = LedgerStore::open(&cli.data_dir)?;

    let mut dispatch_config = DispatcherConfig::default();
    if let Some(secs) = cli.max_call_age {
        dispatch_config = dispatch_config.with_max_call_age_secs(secs);
    }
    let gateway = Gateway {
        relayer: cli.relayer.clone(),
        config: dispatch_config,
    };

    match cli.command {
        Command::Init { owner } => {
            if store.load_ledger()?.is_some() {
                return Err(format!("ledger already initialized in {}", cli.data_dir.display()).into());
            }
            let keypair = Keypair::generate();
            let owner_addr = keypair.address();
            let mut ledger = FlightLedger::deploy(owner_addr, LedgerConfig::default())?;
            ledger.authorize_caller(&owner_addr, owner_addr)?;
            ledger.poll_events();

            store.save_keypair(&owner, &keypair)?;
            store.save_ledger(&ledger)?;
            store.flush()?;
            println!("Ledger deployed, owner {} = {}", owner, owner_addr);
        }
        Command::NewIdentity { label } => {
            if store.load_keypair(&label)?.is_some() {
                return Err(format!("identity '{}' already exists", label).into());
            }
            let keypair = Keypair::generate();
            store.save_keypair(&label, &keypair)?;
            store.flush()?;
            println!("{} = {}", label, keypair.address());
        }
        Command::Identities => {
            for label in store.list_identities()? {
                if let Some(kp) = store.load_keypair(&label)? {
                    println!("{:<16} {}", label, kp.address());
                }
            }
        }
        Command::Register { actor, candidate } => {
            let candidate = resolve(&store, &candidate)?;
            submit(&store, &gateway, &actor.label, Some(Operation::RegisterAirline { candidate }), Amount::ZERO)?;
        }
        Command::Fund { actor, value } => {
            submit(&store, &gateway, &actor.label, Some(Operation::Fund), value)?;
        }
        Command::Transfer { actor, value } => {
            submit(&store, &gateway, &actor.label, None, value)?;
        }
        Command::Buy { actor, flight, value } => {
            submit(&store, &gateway, &actor.label, Some(Operation::Buy { flight }), value)?;
        }
        Command::Credit { actor, flight } => {
            submit(&store, &gateway, &actor.label, Some(Operation::CreditInsurees { flight }), Amount::ZERO)?;
        }
        Command::Withdraw { actor } => {
            submit(&store, &gateway, &actor.label, Some(Operation::Withdraw), Amount::ZERO)?;
        }
        Command::Pause { actor } => {
            let op = Operation::SetOperatingStatus { operational: false };
            submit(&store, &gateway, &actor.label, Some(op), Amount::ZERO)?;
        }
        Command::Resume { actor } => {
            let op = Operation::SetOperatingStatus { operational: true };
            submit(&store, &gateway, &actor.label, Some(op), Amount::ZERO)?;
        }
        Command::Authorize { actor, identity } => {
            let identity = resolve(&store, &identity)?;
            submit(&store, &gateway, &actor.label, Some(Operation::AuthorizeCaller { identity }), Amount::ZERO)?;
        }
        Command::Deauthorize { actor, identity } => {
            let identity = resolve(&store, &identity)?;
            submit(&store, &gateway, &actor.label, Some(Operation::DeauthorizeCaller { identity }), Amount::ZERO)?;
        }
        Command::Capitalize { actor, value } => {
            submit(&store, &gateway, &actor.label, Some(Operation::Capitalize), value)?;
        }
        Command::Disburse => {
            let mut ledger = load_ledger(&store)?;
            let transfers = ledger.drain_transfers();
            if transfers.is_empty() {
                println!("No transfers queued");
                return Ok(());
            }

            let mut disburser = Disburser::new(DisburserConfig::default(), Box::new(LoggingPayoutTarget))?;
            if let Err(e) = disburser.enqueue(&transfers) {
                ledger.requeue_transfers(transfers);
                return Err(e.into());
            }
            let mut undelivered = Vec::new();
            for result in disburser.process_all().await {
                match result {
                    Ok(receipt) => println!(
                        "paid {} to {} ({:?}) ref {}",
                        receipt.amount(),
                        receipt.to(),
                        receipt.kind(),
                        receipt.reference()
                    ),
                    Err(failure) => {
                        println!(
                            "FAILED transfer {} after {} attempts: {}",
                            failure.transfer.id(),
                            failure.attempts,
                            failure.error
                        );
                        undelivered.push(failure.transfer);
                    }
                }
            }
            ledger.requeue_transfers(undelivered);
            store.save_ledger(&ledger)?;
            store.flush()?;
        }
        Command::Status => {
            let ledger = load_ledger(&store)?;
            let solvency = ledger.solvency();
            println!("owner:            {}", ledger.owner());
            println!("operational:      {}", ledger.is_operational());
            println!(
                "airlines:         {} ({} funded)",
                ledger.registered_airlines_count(),
                ledger.registry().funded_count()
            );
            println!("consensus needed: {}", ledger.is_multi_party_consensus_required());
            for airline in ledger.registry().members() {
                println!("  {} funded={}", airline, ledger.is_airline_with_funds(airline));
            }
            println!("policies:         {}", ledger.policies().len());
            println!("custody:          {}", solvency.custody);
            println!("owed credits:     {}", solvency.outstanding_credits);
            println!("committed float:  {}", solvency.committed_float);
            println!("solvent:          {}", solvency.is_solvent());
            println!("queued transfers: {}", ledger.pending_transfers().len());
        }
    }

    Ok(())
}

fn load_ledger(store: &LedgerStore) -> Result<FlightLedger, Box<dyn Error>> {
    store
        .load_ledger()?
        .ok_or_else(|| "no ledger found, run `init` first".into())
}

fn load_keypair(store: &LedgerStore, label: &str) -> Result<Keypair, Box<dyn Error>> {
    store
        .load_keypair(label)?
        .ok_or_else(|| format!("unknown identity '{}'", label).into())
}

/// Accept either a stored label or a literal `acct:` address
fn resolve(store: &LedgerStore, name: &str) -> Result<Address, Box<dyn Error>> {
    if name.starts_with("acct:") {
        return Ok(Address::parse(name)?);
    }
    Ok(load_keypair(store, name)?.address())
}

/// How calls reach the ledger: the relaying identity and dispatcher settings
struct Gateway {
    relayer: String,
    config: DispatcherConfig,
}

fn submit(
    store: &LedgerStore,
    gateway: &Gateway,
    signer: &str,
    operation: Option<Operation>,
    value: Amount,
) -> Result<(), Box<dyn Error>> {
    let mut ledger = load_ledger(store)?;
    let relayer = resolve(store, &gateway.relayer)?;
    let keypair = load_keypair(store, signer)?;

    let mut builder = CallBuilder::new().caller(&keypair).value(value);
    if let Some(op) = operation {
        builder = builder.operation(op);
    }
    let call = builder.build()?;

    let mut dispatcher = Dispatcher::with_processed(gateway.config.clone(), store.load_processed_calls()?);
    let receipt = dispatcher.dispatch(&mut ledger, &relayer, &call)?;

    for event in ledger.poll_events() {
        info!(?event, "Ledger event");
    }
    store.save_dispatch(&ledger, &dispatcher.processed_calls())?;
    store.flush()?;

    match receipt.outcome {
        DispatchOutcome::Purchased(p) => println!(
            "{}: policy #{} retained {} refunded {}",
            receipt.operation, p.position, p.retained, p.refund
        ),
        DispatchOutcome::Credited(s) => println!(
            "{}: {} policies credited, {} total",
            receipt.operation, s.policies_credited, s.total_credited
        ),
        other => println!("{}: {:?}", receipt.operation, other),
    }
    Ok(())
}
