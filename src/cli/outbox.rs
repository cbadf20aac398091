use serde::Serialize;

use super::session::Session;
use collectivex::multisig::MultisigAddress;
use collectivex::program::DispatchRecord;

/// JSON view of one queued invocation.
#[derive(Debug, Serialize)]
pub struct DispatchView {
    pub sequence: u64,
    pub target: String,
    pub data: String,
}

impl From<&DispatchRecord> for DispatchView {
    fn from(record: &DispatchRecord) -> Self {
        Self {
            sequence: record.sequence,
            target: record.target.clone(),
            data: hex::encode(&record.data),
        }
    }
}

/// List the dispatch outbox, or acknowledge delivered records
///
/// With `--ack N` every record up to and including sequence N is removed
/// and the removed records are printed.
pub async fn execute(
    session: &Session,
    multisig: String,
    ack: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let address: MultisigAddress = multisig.parse()?;
    let program = session.program();

    let records = match ack {
        Some(up_to) => program.ack_dispatch(&address, up_to).await?,
        None => program.outbox(&address).await?,
    };
    let views: Vec<DispatchView> = records.iter().map(DispatchView::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        match ack {
            Some(up_to) => println!("Nothing queued up to sequence {}.", up_to),
            None => println!("Outbox is empty."),
        }
        return Ok(());
    }
    if ack.is_some() {
        println!("📬 Acknowledged {} invocation(s)", views.len());
    }
    for view in &views {
        println!("#{} {} ({})", view.sequence, view.target, view.data);
    }
    Ok(())
}
