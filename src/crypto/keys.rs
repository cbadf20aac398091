//! Owner signing keys and multisig address derivation.
//!
//! ## Key Material
//!
//! ```text
//! ring::SystemRandom
//!         │
//!         ▼
//! Ed25519 PKCS#8 document ──► key file (hex, wiped from memory on drop)
//!         │
//!         ├─► public key  → OwnerId
//!         └─► sign(signing_message(address, signer, nonce, request))
//! ```
//!
//! ## Addresses
//!
//! A multisig address is `SHA-256(ADDRESS_DOMAIN || creator || create_key)`.
//! The random create key lets one creator own any number of multisigs.

use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{self, Ed25519KeyPair, KeyPair, UnparsedPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::multisig::engine::SignatureVerifier;
use crate::multisig::owner_set::OwnerId;
use crate::multisig::request::{signing_message, MultisigAddress, Request, SignedRequest};
use crate::serialization::SerializationError;

/// Domain separation tag for address derivation (versioned for rotation)
const ADDRESS_DOMAIN: &[u8] = b"collectivex-multisig-v1";

/// Errors from key handling.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The system random source failed
    #[error("Key generation failed")]
    Generation,

    /// PKCS#8 document was not a valid Ed25519 key
    #[error("Invalid key: {0}")]
    Rejected(String),

    /// Key file could not be decoded
    #[error("Invalid key file encoding: {0}")]
    Encoding(String),

    #[error("Key file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key file already exists: {0}")]
    AlreadyExists(String),
}

/// Ed25519 signing key of one owner.
///
/// # Security
///
/// - The PKCS#8 bytes are held in `Zeroizing` and cleared on drop
/// - `Debug` prints the public owner id only
pub struct OwnerKeypair {
    pkcs8: Zeroizing<Vec<u8>>,
    pair: Ed25519KeyPair,
}

impl OwnerKeypair {
    /// Generate a fresh keypair.
    pub fn generate() -> Result<Self, KeyError> {
        let rng = SystemRandom::new();
        let document = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| KeyError::Generation)?;
        Self::from_pkcs8(document.as_ref())
    }

    /// Load from a PKCS#8 v2 document.
    pub fn from_pkcs8(bytes: &[u8]) -> Result<Self, KeyError> {
        let pair =
            Ed25519KeyPair::from_pkcs8(bytes).map_err(|e| KeyError::Rejected(e.to_string()))?;
        Ok(Self {
            pkcs8: Zeroizing::new(bytes.to_vec()),
            pair,
        })
    }

    /// Load a hex-encoded key file.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        let bytes = Zeroizing::new(
            hex::decode(contents.trim()).map_err(|e| KeyError::Encoding(e.to_string()))?,
        );
        Self::from_pkcs8(&bytes)
    }

    /// Write the key as hex. Refuses to overwrite unless `overwrite` is set.
    ///
    /// On unix the file is created owner-only (0600) before any key bytes
    /// are written to it.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<(), KeyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        owner_only(&mut options);

        let mut file = options.open(path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => KeyError::AlreadyExists(path.display().to_string()),
            _ => KeyError::Io(e),
        })?;
        // An overwritten file keeps its old mode unless narrowed here
        restrict_permissions(&file)?;

        let encoded = Zeroizing::new(hex::encode(self.pkcs8.as_slice()));
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Owner id (the Ed25519 public key).
    pub fn owner_id(&self) -> OwnerId {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(self.pair.public_key().as_ref());
        OwnerId::new(bytes)
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.pair.sign(message).as_ref().to_vec()
    }

    /// Build a signed request against `multisig` with the given nonce.
    pub fn sign_request(
        &self,
        multisig: &MultisigAddress,
        nonce: u64,
        request: Request,
    ) -> Result<SignedRequest, SerializationError> {
        let signer = self.owner_id();
        let message = signing_message(multisig, &signer, nonce, &request)?;
        Ok(SignedRequest {
            signer,
            nonce,
            request,
            signature: self.sign(&message),
        })
    }
}

impl fmt::Debug for OwnerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerKeypair")
            .field("owner", &self.owner_id().to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn owner_only(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
}

#[cfg(not(unix))]
fn owner_only(_options: &mut OpenOptions) {}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Ed25519 signature verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signer: &OwnerId, message: &[u8], signature: &[u8]) -> bool {
        UnparsedPublicKey::new(&signature::ED25519, signer.as_bytes())
            .verify(message, signature)
            .is_ok()
    }
}

/// Fresh random create key for address derivation.
pub fn random_create_key() -> Result<[u8; 32], KeyError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| KeyError::Generation)?;
    Ok(key)
}

/// Derive the address of the multisig created by `creator` with `create_key`.
pub fn derive_address(creator: &OwnerId, create_key: &[u8; 32]) -> MultisigAddress {
    let mut hasher = Sha256::new();
    hasher.update(ADDRESS_DOMAIN);
    hasher.update(creator.as_bytes());
    hasher.update(create_key);
    MultisigAddress::new(hasher.finalize().into())
}
