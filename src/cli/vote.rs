use super::session::{submit_signed, Session};
use collectivex::multisig::{MultisigAddress, Outcome, Request};

/// Approve a pending proposal
pub async fn approve(
    session: &Session,
    multisig: String,
    sequence: u64,
    key: Option<String>,
    memo: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let keypair = session.load_key(key)?;
    let program = session.program();

    let outcome = submit_signed(&program, &address, &keypair, Request::Approve { sequence, memo })
        .await?;

    if let Outcome::Approved {
        approvals,
        threshold,
        executable,
        ..
    } = outcome
    {
        println!("👍 Approved proposal {}", sequence);
        println!("Approvals: {}/{}", approvals, threshold);
        if executable {
            println!("Proposal {} is ready to execute", sequence);
        }
    }
    Ok(())
}

/// Reject a pending proposal
pub async fn reject(
    session: &Session,
    multisig: String,
    sequence: u64,
    key: Option<String>,
    memo: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let keypair = session.load_key(key)?;
    let program = session.program();

    let outcome = submit_signed(&program, &address, &keypair, Request::Reject { sequence, memo })
        .await?;

    if let Outcome::Rejected { status, .. } = outcome {
        println!("👎 Rejected proposal {}", sequence);
        println!("Status: {}", status);
    }
    Ok(())
}
