use serde::Serialize;

use super::session::Session;
use collectivex::multisig::audit::{format_audit_log, query_audit_log, AuditQuery};
use collectivex::multisig::{MultisigAddress, OwnerId, Proposal};
use collectivex::program::MultisigAccount;

/// JSON view of a multisig account.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub address: String,
    pub creator: String,
    pub owners: Vec<String>,
    pub threshold: u16,
    pub config_epoch: u64,
    pub next_sequence: u64,
    pub proposals: Vec<ProposalView>,
    pub outbox: usize,
}

/// JSON view of one proposal, counted against the current owner set.
#[derive(Debug, Serialize)]
pub struct ProposalView {
    pub sequence: u64,
    pub proposer: String,
    pub action: String,
    pub status: String,
    pub approvals: usize,
    pub rejections: usize,
    pub approvers: Vec<String>,
    pub executable: bool,
}

impl AccountView {
    pub fn new(account: &MultisigAccount, sequence: Option<u64>) -> Self {
        let multisig = &account.multisig;
        let owners = multisig.owners();

        let proposals = multisig
            .proposals()
            .iter()
            .filter(|p| sequence.is_none_or(|s| p.sequence() == s))
            .map(|p| ProposalView::new(account, p))
            .collect();

        Self {
            address: account.address.to_string(),
            creator: account.creator.to_string(),
            owners: owners.owners().iter().map(OwnerId::to_string).collect(),
            threshold: owners.threshold(),
            config_epoch: owners.config_epoch(),
            next_sequence: multisig.proposals().next_sequence(),
            proposals,
            outbox: account.outbox.len(),
        }
    }
}

impl ProposalView {
    fn new(account: &MultisigAccount, proposal: &Proposal) -> Self {
        let owners = account.multisig.owners();
        Self {
            sequence: proposal.sequence(),
            proposer: proposal.proposer().to_string(),
            action: proposal.action().to_string(),
            status: proposal.status(owners).to_string(),
            approvals: proposal.approval_count(owners),
            rejections: proposal.rejection_count(owners),
            approvers: proposal
                .approvals()
                .iter()
                .filter(|id| owners.is_owner(id))
                .map(OwnerId::to_string)
                .collect(),
            executable: account.multisig.can_execute(proposal.sequence()),
        }
    }
}

/// Show a multisig account, or list all accounts
pub async fn execute(
    session: &Session,
    multisig: Option<String>,
    sequence: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let program = session.program();

    let Some(multisig) = multisig else {
        let addresses = program.list().await?;
        if json {
            let list: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        } else if addresses.is_empty() {
            println!("No multisig accounts in {}", session.config.ledger.path.display());
        } else {
            for address in addresses {
                println!("{}", address);
            }
        }
        return Ok(());
    };

    let address: MultisigAddress = multisig.parse()?;
    let account = program.load(&address).await?;
    if let Some(sequence) = sequence {
        // Surface NotFound before printing anything
        account.multisig.get(sequence)?;
    }
    let view = AccountView::new(&account, sequence);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("📊 Multisig {}", view.address);
    println!();
    println!("Threshold: {} of {}", view.threshold, view.owners.len());
    for owner in &view.owners {
        println!("  owner {}", owner);
    }
    println!("Config epoch: {}", view.config_epoch);
    println!("Next sequence: {}", view.next_sequence);
    println!("Outbox: {} invocation(s)", view.outbox);
    println!();

    if view.proposals.is_empty() {
        println!("No proposals.");
    }
    for p in &view.proposals {
        println!(
            "#{} [{}] {} ({}/{} approvals, {} rejections){}",
            p.sequence,
            p.status,
            p.action,
            p.approvals,
            view.threshold,
            p.rejections,
            if p.executable { " ready" } else { "" }
        );
    }
    Ok(())
}

/// Show the audit log of a multisig account
pub async fn log(
    session: &Session,
    multisig: String,
    actor: Option<String>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let actor = match actor {
        Some(actor) => Some(actor.parse::<OwnerId>()?),
        None => None,
    };

    let account = session.program().load(&address).await?;
    let query = AuditQuery {
        actor,
        limit: limit.or(AuditQuery::default().limit),
        ..Default::default()
    };
    let entries = query_audit_log(account.multisig.audit_log().entries(), &query);
    println!("{}", format_audit_log(&entries));
    Ok(())
}
