use super::session::{submit_signed, Session};
use collectivex::multisig::{ExecutionEffect, MultisigAddress, Outcome, Request};

/// Execute an approved proposal
pub async fn execute(
    session: &Session,
    multisig: String,
    sequence: u64,
    key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let keypair = session.load_key(key)?;
    let program = session.program();

    let outcome = submit_signed(&program, &address, &keypair, Request::Execute { sequence }).await?;

    if let Outcome::Executed { effect, .. } = outcome {
        println!("🚀 Executed proposal {}", sequence);
        match effect {
            ExecutionEffect::OwnersChanged { owners, threshold } => {
                println!("Owner set is now {} of {}", threshold, owners);
            }
            ExecutionEffect::Invoked { target } => {
                println!("Invocation for '{}' queued in the outbox", target);
            }
        }
    }
    Ok(())
}
