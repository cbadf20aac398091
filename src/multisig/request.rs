//! Signed requests submitted by owners.
//!
//! A request is authenticated by an Ed25519 signature over a domain-separated
//! CBOR message binding the multisig address, the signer and the signer's
//! current nonce. Replaying an accepted request fails the nonce check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::multisig::action::Action;
use crate::multisig::owner_set::{OwnerId, OwnerIdParseError};
use crate::serialization::{to_cbor, SerializationError};

/// Domain tag prefixed to every signed request message.
pub const REQUEST_DOMAIN: &str = "collectivex/request/v1";

/// Address of a multisig account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MultisigAddress([u8; 32]);

impl MultisigAddress {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MultisigAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for MultisigAddress {
    type Err = OwnerIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Same 32-byte hex encoding as owner ids
        let id: OwnerId = s.parse()?;
        Ok(Self(*id.as_bytes()))
    }
}

/// Operation requested by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    CreateProposal {
        action: Action,
        memo: Option<String>,
    },
    Approve {
        sequence: u64,
        memo: Option<String>,
    },
    Reject {
        sequence: u64,
        memo: Option<String>,
    },
    Execute {
        sequence: u64,
    },
}

impl Request {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateProposal { .. } => "create_proposal",
            Request::Approve { .. } => "approve",
            Request::Reject { .. } => "reject",
            Request::Execute { .. } => "execute",
        }
    }
}

/// Request together with the signer's authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub signer: OwnerId,
    pub nonce: u64,
    pub request: Request,
    pub signature: Vec<u8>,
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    domain: &'a str,
    multisig: &'a MultisigAddress,
    signer: &'a OwnerId,
    nonce: u64,
    request: &'a Request,
}

/// Bytes an owner signs to authorize `request` against `multisig`.
pub fn signing_message(
    multisig: &MultisigAddress,
    signer: &OwnerId,
    nonce: u64,
    request: &Request,
) -> Result<Vec<u8>, SerializationError> {
    to_cbor(&SigningPayload {
        domain: REQUEST_DOMAIN,
        multisig,
        signer,
        nonce,
        request,
    })
}

impl SignedRequest {
    /// Message this request's signature must cover.
    pub fn message(&self, multisig: &MultisigAddress) -> Result<Vec<u8>, SerializationError> {
        signing_message(multisig, &self.signer, self.nonce, &self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_binds_address_and_nonce() {
        let signer = OwnerId::new([1; 32]);
        let request = Request::Approve {
            sequence: 1,
            memo: None,
        };
        let a = MultisigAddress::new([7; 32]);
        let b = MultisigAddress::new([8; 32]);

        let base = signing_message(&a, &signer, 0, &request).unwrap();
        assert_eq!(base, signing_message(&a, &signer, 0, &request).unwrap());
        assert_ne!(base, signing_message(&b, &signer, 0, &request).unwrap());
        assert_ne!(base, signing_message(&a, &signer, 1, &request).unwrap());
    }

    #[test]
    fn test_address_parse() {
        let address = MultisigAddress::new([0x5a; 32]);
        let parsed: MultisigAddress = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert!("00ff".parse::<MultisigAddress>().is_err());
    }
}
