//! collectivex - Threshold Multisig Authorization Engine
//!
//! A multisig account is controlled by a set of owners and an approval
//! threshold. Owners propose actions, approve or reject them, and any
//! proposal that reaches the threshold can be executed exactly once.
//!
//! Key principles:
//! - Synchronous core: every operation is one atomic transition
//! - Approvals are counted against the current owner set, never cached
//! - The owner set changes only through executed proposals
//! - Cryptography and storage are host capabilities behind traits

pub mod crypto;
pub mod ledger;
pub mod multisig;
pub mod program;
pub mod serialization;
