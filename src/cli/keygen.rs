use super::session::Session;
use collectivex::crypto::OwnerKeypair;

/// Generate an owner signing key
///
/// Writes a new Ed25519 key to `output` (or the configured default key) and
/// prints the owner id other owners use to add this key to a multisig.
pub async fn execute(
    session: &Session,
    output: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = session.key_path(output)?;

    let keypair = OwnerKeypair::generate()?;
    keypair
        .save(&path, force)
        .map_err(|e| format!("Failed to write key '{}': {}", path.display(), e))?;

    println!("🔑 Key written to {}", path.display());
    println!("Owner id: {}", keypair.owner_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::CollectivexConfig;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        Session {
            config: CollectivexConfig::new(dir.path()),
            config_path: dir.path().join("config.toml"),
        }
    }

    #[tokio::test]
    async fn test_keygen_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);

        execute(&session, None, false).await.unwrap();
        assert!(dir.path().join("owner.key").exists());

        assert!(execute(&session, None, false).await.is_err());
        assert!(execute(&session, None, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_keygen_explicit_output() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        let output = dir.path().join("alice.key");

        execute(&session, Some(output.display().to_string()), false)
            .await
            .unwrap();
        assert!(OwnerKeypair::load(&output).is_ok());
    }
}
