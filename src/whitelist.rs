//! Whitelist commit authorization and custody-bypass authorization.
//!
//! Both mechanisms share the same shape: a trusted authority signs a fixed
//! byte payload off-chain, and the caller submits that signature alongside
//! an Ed25519 program "verify" instruction ahead of the real instruction so
//! the on-chain program can check `ix_sysvar` for a matching, already-verified
//! signature instead of doing its own curve arithmetic. The verify
//! instruction's byte layout (offsets table + pubkey + signature + message)
//! is documented and packed by hand here rather than delegated to
//! `solana_sdk::ed25519_instruction::new_ed25519_instruction`, which requires
//! a concrete `ed25519_dalek::Keypair` — this module only needs the `Signer`
//! trait, so any signer (local keypair, remote signer, hardware wallet) can
//! produce a commit authorization.

use solana_sdk::{
    ed25519_program,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Signer,
};

use crate::error::{Error, Result, WhitelistError};

/// `user ∥ auction ∥ bin_id ∥ payment_token_committed ∥ nonce ∥ expiry`, no
/// length prefixes — the exact bytes the whitelist authority signs and the
/// on-chain program reconstructs and compares byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhitelistPayload {
    pub user: Pubkey,
    pub auction: Pubkey,
    pub bin_id: u8,
    pub payment_token_committed: u64,
    pub nonce: u64,
    pub expiry: u64,
}

impl WhitelistPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 1 + 8 + 8 + 8);
        out.extend_from_slice(self.user.as_ref());
        out.extend_from_slice(self.auction.as_ref());
        out.push(self.bin_id);
        out.extend_from_slice(&self.payment_token_committed.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.expiry.to_le_bytes());
        out
    }
}

/// An off-chain-produced authorization, ready to submit alongside the
/// instruction it authorizes.
#[derive(Clone, Debug)]
pub struct Authorization {
    pub signature: [u8; 64],
    pub expiry: u64,
    /// The Ed25519 program instruction that must appear earlier in the same
    /// transaction for the on-chain program to find and validate it.
    pub verify_instruction: Instruction,
}

/// Signs a [`WhitelistPayload`] with `authority` and builds the matching
/// Ed25519 verify instruction. `expiry` is a Unix timestamp after which the
/// on-chain program must reject the authorization.
pub fn sign_commit_authorization(
    authority: &dyn Signer,
    user: &Pubkey,
    auction: &Pubkey,
    bin_id: u8,
    payment_token_committed: u64,
    nonce: u64,
    expiry: u64,
) -> Authorization {
    let payload = WhitelistPayload {
        user: *user,
        auction: *auction,
        bin_id,
        payment_token_committed,
        nonce,
        expiry,
    };
    build_authorization(authority, &payload.to_bytes(), expiry)
}

/// Signs a custody-authorization payload, used to bypass the ordinary
/// `custody` signer requirement when a user commits on behalf of a custodial
/// balance. Reuses the same Ed25519 verify-instruction mechanism as commit
/// authorizations with a payload of `user ∥ auction ∥ nonce ∥ expiry`.
pub fn sign_custody_authorization(
    authority: &dyn Signer,
    user: &Pubkey,
    auction: &Pubkey,
    nonce: u64,
    expiry: u64,
) -> Authorization {
    let mut payload = Vec::with_capacity(32 + 32 + 8 + 8);
    payload.extend_from_slice(user.as_ref());
    payload.extend_from_slice(auction.as_ref());
    payload.extend_from_slice(&nonce.to_le_bytes());
    payload.extend_from_slice(&expiry.to_le_bytes());
    build_authorization(authority, &payload, expiry)
}

fn build_authorization(authority: &dyn Signer, message: &[u8], expiry: u64) -> Authorization {
    let signature_bytes = authority.sign_message(message).as_ref().try_into().expect("ed25519 signatures are 64 bytes");
    let pubkey_bytes = authority.pubkey().to_bytes();
    let verify_instruction = new_ed25519_verify_instruction(&pubkey_bytes, &signature_bytes, message);
    Authorization { signature: signature_bytes, expiry, verify_instruction }
}

/// Size in bytes of one `Ed25519SignatureOffsets` record, per the Ed25519
/// native program's instruction data layout.
const SIGNATURE_OFFSETS_SERIALIZED_SIZE: usize = 14;
const SIGNATURE_OFFSETS_START: usize = 2;

/// Hand-packs the Ed25519 native program's verify instruction: a one-signature
/// header followed by an offsets table, then the raw pubkey, signature, and
/// message bytes the offsets point at.
fn new_ed25519_verify_instruction(pubkey: &[u8; 32], signature: &[u8; 64], message: &[u8]) -> Instruction {
    let data_start = SIGNATURE_OFFSETS_START + SIGNATURE_OFFSETS_SERIALIZED_SIZE;
    let public_key_offset = data_start;
    let signature_offset = public_key_offset + pubkey.len();
    let message_data_offset = signature_offset + signature.len();

    let mut data = Vec::with_capacity(message_data_offset + message.len());
    data.push(1u8); // num_signatures
    data.push(0u8); // padding
    data.extend_from_slice(&(signature_offset as u16).to_le_bytes());
    data.extend_from_slice(&u16::MAX.to_le_bytes()); // signature_instruction_index
    data.extend_from_slice(&(public_key_offset as u16).to_le_bytes());
    data.extend_from_slice(&u16::MAX.to_le_bytes()); // public_key_instruction_index
    data.extend_from_slice(&(message_data_offset as u16).to_le_bytes());
    data.extend_from_slice(&(message.len() as u16).to_le_bytes());
    data.extend_from_slice(&u16::MAX.to_le_bytes()); // message_instruction_index

    debug_assert_eq!(data.len(), public_key_offset);
    data.extend_from_slice(pubkey);
    debug_assert_eq!(data.len(), signature_offset);
    data.extend_from_slice(signature);
    debug_assert_eq!(data.len(), message_data_offset);
    data.extend_from_slice(message);

    Instruction { program_id: ed25519_program::id(), accounts: vec![], data }
}

/// Checks a received authorization against the expected payload on the
/// verifying side (used by tests and by any caller that wants to validate an
/// authorization before spending a transaction on it).
pub fn verify_commit_authorization(
    whitelist_authority: &Pubkey,
    signer: &Pubkey,
    payload: &WhitelistPayload,
    authorization: &Authorization,
    now: u64,
) -> Result<()> {
    if signer != whitelist_authority {
        return Err(Error::whitelist("verify_commit_authorization", WhitelistError::WrongWhitelistAuthority));
    }
    if authorization.expiry != 0 && now >= authorization.expiry {
        return Err(Error::whitelist(
            "verify_commit_authorization",
            WhitelistError::SignatureExpired { expiry: authorization.expiry, now },
        ));
    }
    let expected_message = payload.to_bytes();
    let embedded_message = &authorization.verify_instruction.data[authorization.verify_instruction.data.len() - expected_message.len()..];
    if embedded_message != expected_message.as_slice() {
        return Err(Error::whitelist("verify_commit_authorization", WhitelistError::PayloadMismatch));
    }
    Ok(())
}
