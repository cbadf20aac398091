use clap::{Parser, Subcommand};

pub mod config;
pub mod execute;
pub mod init;
pub mod keygen;
pub mod outbox;
pub mod propose;
pub mod session;
pub mod show;
pub mod version;
pub mod vote;

use propose::ProposalArgs;
use session::Session;

#[derive(Parser)]
#[command(name = "collectivex")]
#[command(author = "collectivex contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for collectivex threshold multisig accounts", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/collectivex/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an owner signing key
    Keygen {
        /// Output path (default: [keys] default_key from the config)
        #[arg(long)]
        output: Option<String>,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Create a multisig account
    Init {
        /// Owner id (hex public key); repeat for each owner
        #[arg(long = "owner", required = true)]
        owners: Vec<String>,

        /// Approvals required to execute a proposal
        #[arg(long)]
        threshold: u16,

        /// Creator key (default: [keys] default_key)
        #[arg(long)]
        key: Option<String>,
    },

    /// Propose an owner-set change or an invocation
    Propose {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Signing key (default: [keys] default_key)
        #[arg(long)]
        key: Option<String>,

        /// Owner id to add; may be repeated
        #[arg(long = "add-owner")]
        add_owners: Vec<String>,

        /// Owner id to remove; may be repeated
        #[arg(long = "remove-owner")]
        remove_owners: Vec<String>,

        /// New approval threshold
        #[arg(long)]
        threshold: Option<u16>,

        /// Invocation target (must be listed in [dispatch] targets to execute)
        #[arg(long)]
        invoke: Option<String>,

        /// Invocation payload (hex)
        #[arg(long)]
        data: Option<String>,

        /// Note recorded in the audit log
        #[arg(long)]
        memo: Option<String>,
    },

    /// Approve a pending proposal
    Approve {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Proposal sequence
        sequence: u64,

        /// Signing key (default: [keys] default_key)
        #[arg(long)]
        key: Option<String>,

        /// Note recorded in the audit log
        #[arg(long)]
        memo: Option<String>,
    },

    /// Reject a pending proposal
    Reject {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Proposal sequence
        sequence: u64,

        /// Signing key (default: [keys] default_key)
        #[arg(long)]
        key: Option<String>,

        /// Note recorded in the audit log
        #[arg(long)]
        memo: Option<String>,
    },

    /// Execute an approved proposal
    Execute {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Proposal sequence
        sequence: u64,

        /// Signing key (default: [keys] default_key)
        #[arg(long)]
        key: Option<String>,
    },

    /// Show a multisig account, or list accounts when no address is given
    Show {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: Option<String>,

        /// Only show this proposal
        #[arg(long)]
        sequence: Option<u64>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the audit log of a multisig account
    Log {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Only entries signed by this owner id
        #[arg(long)]
        actor: Option<String>,

        /// Maximum number of entries (newest first)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List invocations waiting for delivery, or acknowledge delivered ones
    Outbox {
        /// Multisig address (hex)
        #[arg(long)]
        multisig: String,

        /// Remove every record up to and including this sequence
        #[arg(long)]
        ack: Option<u64>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Version = cli.command {
        version::execute();
        return Ok(());
    }

    let session = Session::open(cli.config)?;

    match cli.command {
        Commands::Keygen { output, force } => keygen::execute(&session, output, force).await,
        Commands::Init {
            owners,
            threshold,
            key,
        } => init::execute(&session, owners, threshold, key).await,
        Commands::Propose {
            multisig,
            key,
            add_owners,
            remove_owners,
            threshold,
            invoke,
            data,
            memo,
        } => {
            let args = ProposalArgs {
                add_owners,
                remove_owners,
                threshold,
                invoke,
                data,
            };
            propose::execute(&session, multisig, key, args, memo).await
        }
        Commands::Approve {
            multisig,
            sequence,
            key,
            memo,
        } => vote::approve(&session, multisig, sequence, key, memo).await,
        Commands::Reject {
            multisig,
            sequence,
            key,
            memo,
        } => vote::reject(&session, multisig, sequence, key, memo).await,
        Commands::Execute {
            multisig,
            sequence,
            key,
        } => execute::execute(&session, multisig, sequence, key).await,
        Commands::Show {
            multisig,
            sequence,
            json,
        } => show::execute(&session, multisig, sequence, json).await,
        Commands::Log {
            multisig,
            actor,
            limit,
        } => show::log(&session, multisig, actor, limit).await,
        Commands::Outbox {
            multisig,
            ack,
            json,
        } => outbox::execute(&session, multisig, ack, json).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
