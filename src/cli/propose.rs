use super::init::parse_owners;
use super::session::{submit_signed, Session};
use collectivex::multisig::{Action, ConfigAction, Invocation, MultisigAddress, Outcome, Request};

/// Owner-set changes and invocation requested on the command line.
#[derive(Debug, Default)]
pub struct ProposalArgs {
    pub add_owners: Vec<String>,
    pub remove_owners: Vec<String>,
    pub threshold: Option<u16>,
    pub invoke: Option<String>,
    pub data: Option<String>,
}

/// Create a proposal
///
/// Either an owner-set change (`--add-owner`, `--remove-owner`,
/// `--threshold`, applied in that order) or an invocation (`--invoke`).
pub async fn execute(
    session: &Session,
    multisig: String,
    key: Option<String>,
    args: ProposalArgs,
    memo: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let action = build_action(args)?;
    let keypair = session.load_key(key)?;

    let program = session.program();
    let outcome = submit_signed(
        &program,
        &address,
        &keypair,
        Request::CreateProposal {
            action: action.clone(),
            memo,
        },
    )
    .await?;

    if let Outcome::Created { sequence } = outcome {
        println!("📝 Proposal {} created", sequence);
        println!("Action: {}", action);
        println!("Sequence: {}", sequence);
    }
    Ok(())
}

/// Build the proposal action from command-line arguments.
pub fn build_action(args: ProposalArgs) -> Result<Action, Box<dyn std::error::Error>> {
    let has_config =
        !args.add_owners.is_empty() || !args.remove_owners.is_empty() || args.threshold.is_some();

    if let Some(target) = args.invoke {
        if has_config {
            return Err("--invoke cannot be combined with owner or threshold changes".into());
        }
        let data = match args.data {
            Some(hex_data) => hex::decode(hex_data.trim())
                .map_err(|e| format!("Invalid --data hex: {}", e))?,
            None => Vec::new(),
        };
        return Ok(Action::Invoke(Invocation { target, data }));
    }

    if args.data.is_some() {
        return Err("--data requires --invoke".into());
    }
    if !has_config {
        return Err(
            "Nothing to propose: use --add-owner, --remove-owner, --threshold or --invoke".into(),
        );
    }

    let mut actions = Vec::new();
    for owner in parse_owners(&args.add_owners)? {
        actions.push(ConfigAction::AddOwner { owner });
    }
    for owner in parse_owners(&args.remove_owners)? {
        actions.push(ConfigAction::RemoveOwner { owner });
    }
    if let Some(threshold) = args.threshold {
        actions.push(ConfigAction::ChangeThreshold { threshold });
    }
    Ok(Action::Config(actions))
}
