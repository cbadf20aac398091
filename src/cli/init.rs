use super::session::Session;
use collectivex::crypto::random_create_key;
use collectivex::multisig::OwnerId;

/// Create a multisig account
///
/// The signing key is recorded as creator and seeds the address together
/// with a random create key. The creator does not have to be an owner.
pub async fn execute(
    session: &Session,
    owners: Vec<String>,
    threshold: u16,
    key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let owners = parse_owners(&owners)?;
    let creator = session.load_key(key)?;
    let create_key = random_create_key()?;

    let program = session.program();
    let address = program
        .initialize(creator.owner_id(), owners.clone(), threshold, create_key)
        .await?;

    println!("✅ Multisig created");
    println!("Multisig address: {}", address);
    println!("Threshold: {} of {}", threshold, owners.len());
    for owner in &owners {
        println!("  owner {}", owner);
    }
    Ok(())
}

/// Parse hex owner ids.
pub fn parse_owners(owners: &[String]) -> Result<Vec<OwnerId>, Box<dyn std::error::Error>> {
    let mut parsed = Vec::with_capacity(owners.len());
    for owner in owners {
        let id: OwnerId = owner
            .parse()
            .map_err(|e| format!("Invalid owner '{}': {}", owner, e))?;
        parsed.push(id);
    }
    Ok(parsed)
}
