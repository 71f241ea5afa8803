//! Instruction builders.
//!
//! One function per on-chain operation; each follows the same shape as
//! manual instruction packers elsewhere in the ecosystem: derive whatever
//! PDAs are needed, assemble the `AccountMeta`
//! list in the program's fixed order, encode the payload through
//! [`crate::codec`], and hand back a ready-to-sign `Instruction` alongside
//! the pieces a caller might want to inspect (resolved addresses, raw
//! payload bytes).

use std::collections::BTreeMap;

use solana_sdk::{instruction::{AccountMeta, Instruction}, pubkey::Pubkey, system_program, sysvar};

use crate::address;
use crate::codec::{self, ClaimArgs, CommitArgs, DecreaseCommitArgs, EmergencyControlArgs, InitAuctionArgs, SetPriceArgs};
use crate::error::Result;
use crate::state::{AuctionBinParams, AuctionExtensions, EmergencyState};

/// The output of every builder function: a ready `Instruction` plus the
/// addresses the builder resolved, for callers that want to log or display
/// them without re-deriving.
#[derive(Debug, Clone)]
pub struct BuiltInstruction {
    pub instruction: Instruction,
    pub resolved_addresses: BTreeMap<&'static str, Pubkey>,
}

fn token_program_id() -> Pubkey {
    spl_token::id()
}

fn assoc_token_program_id() -> Pubkey {
    spl_associated_token_account::id()
}

pub fn init_auction(
    program_id: &Pubkey,
    authority: &Pubkey,
    sale_token_mint: &Pubkey,
    payment_token_mint: &Pubkey,
    seller_token_account: &Pubkey,
    seller_authority: &Pubkey,
    custody: &Pubkey,
    commit_start_time: i64,
    commit_end_time: i64,
    claim_start_time: i64,
    bins: Vec<AuctionBinParams>,
    extensions: Option<AuctionExtensions>,
) -> Result<BuiltInstruction> {
    let (auction, _bump) = address::derive_auction_address(program_id, sale_token_mint);
    let (vault_sale, _) = address::derive_vault_sale_address(program_id, &auction);
    let (vault_payment, _) = address::derive_vault_payment_address(program_id, &auction);

    let args = InitAuctionArgs {
        commit_start_time,
        commit_end_time,
        claim_start_time,
        bins,
        custody: *custody,
        extensions,
    };
    let data = codec::encode_instruction(codec::init_auction_discriminator(), &args)?;

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(auction, false),
        AccountMeta::new_readonly(*sale_token_mint, false),
        AccountMeta::new_readonly(*payment_token_mint, false),
        AccountMeta::new(*seller_token_account, false),
        AccountMeta::new(*seller_authority, true),
        AccountMeta::new(vault_sale, false),
        AccountMeta::new(vault_payment, false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("auction", auction);
    resolved.insert("vault_sale", vault_sale);
    resolved.insert("vault_payment", vault_payment);

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

/// Optional whitelist/custody authorization to attach to a `commit`
/// instruction. When present, the caller must also submit the matching
/// Ed25519 verify instruction (see [`crate::whitelist`]) immediately before
/// this one in the same transaction.
pub struct CommitAuthorization {
    pub whitelist_authority: Option<Pubkey>,
    pub custody_authority: Option<Pubkey>,
    pub expiry: u64,
}

pub fn commit(
    program_id: &Pubkey,
    user: &Pubkey,
    auction: &Pubkey,
    user_payment_account: &Pubkey,
    bin_id: u8,
    payment_token_committed: u64,
    authorization: Option<&CommitAuthorization>,
) -> Result<BuiltInstruction> {
    let (committed, _bump) = address::derive_committed_address(program_id, auction, user);
    let (vault_payment, _) = address::derive_vault_payment_address(program_id, auction);

    let expiry = authorization.map(|a| a.expiry).unwrap_or(0);
    let args = CommitArgs { bin_id, payment_token_committed, expiry };
    let data = codec::encode_instruction(codec::commit_discriminator(), &args)?;

    let mut accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*auction, false),
        AccountMeta::new(committed, false),
        AccountMeta::new(*user_payment_account, false),
        AccountMeta::new(vault_payment, false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("committed", committed);
    resolved.insert("vault_payment", vault_payment);

    if let Some(auth) = authorization {
        if let Some(whitelist_authority) = auth.whitelist_authority {
            accounts.push(AccountMeta::new_readonly(whitelist_authority, false));
            resolved.insert("whitelist_authority", whitelist_authority);
        }
        if let Some(custody_authority) = auth.custody_authority {
            accounts.push(AccountMeta::new_readonly(custody_authority, false));
            resolved.insert("custody_authority", custody_authority);
        }
        accounts.push(AccountMeta::new_readonly(sysvar::instructions::id(), false));
    }

    accounts.push(AccountMeta::new_readonly(token_program_id(), false));
    accounts.push(AccountMeta::new_readonly(system_program::id(), false));

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

pub fn decrease_commit(
    program_id: &Pubkey,
    user: &Pubkey,
    auction: &Pubkey,
    user_payment_account: &Pubkey,
    bin_id: u8,
    payment_token_reverted: u64,
) -> Result<BuiltInstruction> {
    let (committed, _bump) = address::derive_committed_address(program_id, auction, user);
    let (vault_payment, _) = address::derive_vault_payment_address(program_id, auction);

    let args = DecreaseCommitArgs { bin_id, payment_token_reverted };
    let data = codec::encode_instruction(codec::decrease_commit_discriminator(), &args)?;

    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*auction, false),
        AccountMeta::new(committed, false),
        AccountMeta::new(*user_payment_account, false),
        AccountMeta::new(vault_payment, false),
        AccountMeta::new_readonly(token_program_id(), false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("committed", committed);
    resolved.insert("vault_payment", vault_payment);

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

pub fn claim(
    program_id: &Pubkey,
    user: &Pubkey,
    auction: &Pubkey,
    sale_token_mint: &Pubkey,
    user_sale_account: &Pubkey,
    user_payment_account: &Pubkey,
    bin_id: u8,
    sale_token_to_claim: u64,
    payment_token_to_refund: u64,
) -> Result<BuiltInstruction> {
    let (committed, _bump) = address::derive_committed_address(program_id, auction, user);
    let (vault_sale, _) = address::derive_vault_sale_address(program_id, auction);
    let (vault_payment, _) = address::derive_vault_payment_address(program_id, auction);

    let args = ClaimArgs { bin_id, sale_token_to_claim, payment_token_to_refund };
    let data = codec::encode_instruction(codec::claim_discriminator(), &args)?;

    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*auction, false),
        AccountMeta::new(committed, false),
        AccountMeta::new_readonly(*sale_token_mint, false),
        AccountMeta::new(*user_sale_account, false),
        AccountMeta::new(*user_payment_account, false),
        AccountMeta::new(vault_sale, false),
        AccountMeta::new(vault_payment, false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(assoc_token_program_id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("committed", committed);
    resolved.insert("vault_sale", vault_sale);
    resolved.insert("vault_payment", vault_payment);

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

pub fn withdraw_funds(
    program_id: &Pubkey,
    authority: &Pubkey,
    auction: &Pubkey,
    sale_token_mint: &Pubkey,
    payment_token_mint: &Pubkey,
    sale_recipient: &Pubkey,
    payment_recipient: &Pubkey,
) -> Result<BuiltInstruction> {
    let (vault_sale, _) = address::derive_vault_sale_address(program_id, auction);
    let (vault_payment, _) = address::derive_vault_payment_address(program_id, auction);

    let data = codec::withdraw_funds_discriminator().to_vec();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*auction, false),
        AccountMeta::new_readonly(*sale_token_mint, false),
        AccountMeta::new_readonly(*payment_token_mint, false),
        AccountMeta::new(vault_sale, false),
        AccountMeta::new(vault_payment, false),
        AccountMeta::new(*sale_recipient, false),
        AccountMeta::new(*payment_recipient, false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(assoc_token_program_id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("vault_sale", vault_sale);
    resolved.insert("vault_payment", vault_payment);

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

pub fn withdraw_fees(
    program_id: &Pubkey,
    authority: &Pubkey,
    auction: &Pubkey,
    sale_token_mint: &Pubkey,
    fee_recipient: &Pubkey,
) -> Result<BuiltInstruction> {
    let (vault_sale, _) = address::derive_vault_sale_address(program_id, auction);

    let data = codec::withdraw_fees_discriminator().to_vec();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*auction, false),
        AccountMeta::new_readonly(*sale_token_mint, false),
        AccountMeta::new(vault_sale, false),
        AccountMeta::new(*fee_recipient, false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(assoc_token_program_id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    let mut resolved = BTreeMap::new();
    resolved.insert("vault_sale", vault_sale);

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: resolved })
}

pub fn set_price(program_id: &Pubkey, authority: &Pubkey, auction: &Pubkey, bin_id: u8, new_price: u64) -> Result<BuiltInstruction> {
    let args = SetPriceArgs { bin_id, new_price };
    let data = codec::encode_instruction(codec::set_price_discriminator(), &args)?;

    let accounts = vec![AccountMeta::new(*authority, true), AccountMeta::new(*auction, false)];

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: BTreeMap::new() })
}

pub fn emergency_control(program_id: &Pubkey, authority: &Pubkey, auction: &Pubkey, state: EmergencyState) -> Result<BuiltInstruction> {
    let args: EmergencyControlArgs = state.into();
    let data = codec::encode_instruction(codec::emergency_control_discriminator(), &args)?;

    let accounts = vec![AccountMeta::new(*authority, true), AccountMeta::new(*auction, false)];

    Ok(BuiltInstruction { instruction: Instruction { program_id: *program_id, accounts, data }, resolved_addresses: BTreeMap::new() })
}

pub fn get_launchpad_admin(program_id: &Pubkey) -> BuiltInstruction {
    let data = codec::get_launchpad_admin_discriminator().to_vec();
    BuiltInstruction {
        instruction: Instruction { program_id: *program_id, accounts: vec![], data },
        resolved_addresses: BTreeMap::new(),
    }
}

/// How a composite, multi-instruction operation should treat a single
/// constituent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    BestEffort,
    AllOrNothing,
}

/// Result of a composite build: the transaction-sized groups of
/// instructions, plus any per-item build failures recorded alongside
/// whatever succeeded (never silently dropped).
#[derive(Debug, Default)]
pub struct BatchBuildResult {
    pub groups: Vec<Vec<Instruction>>,
    pub failures: Vec<(usize, crate::error::Error)>,
}

/// Packs instructions into groups no larger than `max_bytes` total payload
/// size, never splitting a single instruction across groups. A pure
/// bin-packing pass; it does not know about compute budgets.
fn partition_by_size(instructions: Vec<Instruction>, max_bytes: usize) -> Vec<Vec<Instruction>> {
    let mut groups: Vec<Vec<Instruction>> = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();
    let mut current_size = 0usize;

    for ix in instructions {
        let ix_size = ix.data.len() + ix.accounts.len() * 34 + 32;
        if !current.is_empty() && current_size + ix_size > max_bytes {
            groups.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += ix_size;
        current.push(ix);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Builds one `claim` instruction per `(bin_id, sale_to_claim, payment_to_refund)`
/// tuple and partitions them into transaction-sized groups.
pub fn claim_all_available(
    program_id: &Pubkey,
    user: &Pubkey,
    auction: &Pubkey,
    sale_token_mint: &Pubkey,
    user_sale_account: &Pubkey,
    user_payment_account: &Pubkey,
    claims: &[(u8, u64, u64)],
    max_bytes: usize,
    policy: BatchPolicy,
) -> BatchBuildResult {
    let mut instructions = Vec::with_capacity(claims.len());
    let mut failures = Vec::new();

    for (i, &(bin_id, sale_to_claim, payment_to_refund)) in claims.iter().enumerate() {
        match claim(program_id, user, auction, sale_token_mint, user_sale_account, user_payment_account, bin_id, sale_to_claim, payment_to_refund) {
            Ok(built) => instructions.push(built.instruction),
            Err(e) => {
                failures.push((i, e));
                if policy == BatchPolicy::AllOrNothing {
                    return BatchBuildResult { groups: Vec::new(), failures };
                }
            }
        }
    }

    BatchBuildResult { groups: partition_by_size(instructions, max_bytes), failures }
}

/// Builds one `commit` instruction per `(bin_id, amount)` tuple against the
/// same auction and partitions them into transaction-sized groups.
pub fn batch_commit(
    program_id: &Pubkey,
    user: &Pubkey,
    auction: &Pubkey,
    user_payment_account: &Pubkey,
    commits: &[(u8, u64)],
    max_bytes: usize,
    policy: BatchPolicy,
) -> BatchBuildResult {
    let mut instructions = Vec::with_capacity(commits.len());
    let mut failures = Vec::new();

    for (i, &(bin_id, amount)) in commits.iter().enumerate() {
        match commit(program_id, user, auction, user_payment_account, bin_id, amount, None) {
            Ok(built) => instructions.push(built.instruction),
            Err(e) => {
                failures.push((i, e));
                if policy == BatchPolicy::AllOrNothing {
                    return BatchBuildResult { groups: Vec::new(), failures };
                }
            }
        }
    }

    BatchBuildResult { groups: partition_by_size(instructions, max_bytes), failures }
}
