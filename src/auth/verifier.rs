// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signature verification.
//!
//! Signatures and addresses are attacker-controlled input, so malformed
//! values are an ordinary `valid: false` result and never an error.

use std::str::FromStr;

use alloy::primitives::{Address, Signature as EvmSignature};
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};

use super::message::Standard;

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    /// Checksummed signer address (EIP-191 only, when recovery succeeded)
    pub recovered_address: Option<String>,
}

impl Verification {
    fn invalid() -> Self {
        Self {
            valid: false,
            recovered_address: None,
        }
    }
}

/// Check `signature` over `message` against `claimed_address`.
pub fn verify(
    standard: Standard,
    message: &str,
    signature: &str,
    claimed_address: &str,
) -> Verification {
    match standard {
        Standard::Siwe => verify_eip191(message, signature, claimed_address),
        Standard::Siws => verify_ed25519(message, signature, claimed_address),
    }
}

/// `personal_sign` recovery; hex signature (65 bytes, optional 0x).
fn verify_eip191(message: &str, signature: &str, claimed_address: &str) -> Verification {
    let Ok(claimed) = Address::from_str(claimed_address.trim()) else {
        return Verification::invalid();
    };
    let Ok(bytes) = alloy::hex::decode(signature.trim()) else {
        return Verification::invalid();
    };
    let Ok(signature) = EvmSignature::try_from(bytes.as_slice()) else {
        return Verification::invalid();
    };
    let Ok(recovered) = signature.recover_address_from_msg(message) else {
        return Verification::invalid();
    };

    Verification {
        valid: recovered == claimed,
        recovered_address: Some(recovered.to_checksum(None)),
    }
}

/// Detached ed25519; base58 signature (64 bytes) and base58 public key (32 bytes).
fn verify_ed25519(message: &str, signature: &str, claimed_address: &str) -> Verification {
    let Ok(key_bytes) = bs58::decode(claimed_address.trim()).into_vec() else {
        return Verification::invalid();
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return Verification::invalid();
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return Verification::invalid();
    };
    let Ok(sig_bytes) = bs58::decode(signature.trim()).into_vec() else {
        return Verification::invalid();
    };
    let Ok(signature) = Ed25519Signature::from_slice(&sig_bytes) else {
        return Verification::invalid();
    };

    Verification {
        valid: key.verify(message.as_bytes(), &signature).is_ok(),
        recovered_address: None,
    }
}
