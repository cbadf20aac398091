/// Host cryptography for collectivex
///
/// This module implements:
/// - Ed25519 owner keys (ring) with zeroized secret storage
/// - The `SignatureVerifier` capability injected into the engine
/// - Multisig address derivation (SHA-256 with domain separation)
pub mod keys;

pub use keys::{
    derive_address, random_create_key, Ed25519Verifier, KeyError, OwnerKeypair,
};
