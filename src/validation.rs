//! Pure pre-flight validation.
//!
//! Every rule here is a plain function over already-decoded values; nothing
//! in this module touches the network or the clock beyond taking `now` as a
//! parameter. Builders call these before serializing a payload so a caller
//! gets an actionable `ValidationReport` instead of a rejected transaction.

use crate::state::{Auction, AuctionBinParams, Committed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    fn finish(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>, suggestions: Vec<String>) -> Self {
        ValidationReport { is_valid: errors.is_empty(), errors, warnings, suggestions }
    }
}

/// Validates `init_auction` timing and bin parameters ahead of submission.
pub fn validate_init_auction(
    commit_start_time: i64,
    commit_end_time: i64,
    claim_start_time: i64,
    bins: &[AuctionBinParams],
    now: i64,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if !(commit_start_time < commit_end_time && commit_end_time < claim_start_time) {
        errors.push(ValidationIssue {
            code: "INVALID_TIMING",
            message: format!(
                "timestamps must satisfy commit_start < commit_end < claim_start (got {commit_start_time}, {commit_end_time}, {claim_start_time})"
            ),
        });
    } else if commit_start_time <= now {
        warnings.push(ValidationIssue {
            code: "INVALID_TIMING",
            message: format!("commit_start_time {commit_start_time} is already in the past relative to now {now}"),
        });
    }

    if bins.is_empty() || bins.len() > 10 {
        errors.push(ValidationIssue {
            code: "INVALID_BIN_COUNT",
            message: format!("expected 1..=10 bins, got {}", bins.len()),
        });
    }

    for (i, bin) in bins.iter().enumerate() {
        if bin.sale_token_price == 0 || bin.sale_token_cap == 0 {
            errors.push(ValidationIssue {
                code: "INVALID_BIN_PARAM",
                message: format!("bin {i}: price and cap must both be strictly positive"),
            });
        }
    }

    if bins.len() > 1 && bins.windows(2).any(|w| w[1].sale_token_price > w[0].sale_token_price) {
        warnings.push(ValidationIssue {
            code: "INVALID_BIN_PARAM",
            message: "bin prices are not monotonically non-increasing".into(),
        });
        suggestions.push("order bins from highest to lowest sale_token_price".into());
    }

    ValidationReport::finish(errors, warnings, suggestions)
}

/// Validates a `commit` call against the auction's current on-chain state.
pub fn validate_commit(
    auction: &Auction,
    bin_id: u8,
    amount: u64,
    existing_committed_balance: Option<u64>,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    let bin = auction.get_bin(bin_id);
    if bin.is_none() {
        errors.push(ValidationIssue { code: "INVALID_BIN_ID", message: format!("auction has no bin {bin_id}") });
    }

    if amount == 0 {
        errors.push(ValidationIssue { code: "INVALID_AMOUNT", message: "commit amount must be greater than zero".into() });
    }

    if let Some(cap) = auction.extensions.commit_cap_per_user {
        let attempted = existing_committed_balance.unwrap_or(0).saturating_add(amount);
        if attempted > cap {
            errors.push(ValidationIssue {
                code: "COMMIT_CAP_EXCEEDED",
                message: format!("committing {amount} would bring total to {attempted}, exceeding the per-user cap of {cap}"),
            });
        }
    }

    if let Some(bin) = bin {
        if let Ok(target) = crate::allocation::bin_target(bin.sale_token_cap, bin.sale_token_price) {
            if target > 0 && amount > target.saturating_mul(2) {
                warnings.push(ValidationIssue {
                    code: "INVALID_AMOUNT",
                    message: format!("commit of {amount} is more than 2x the bin's target of {target}; expect a small pro-rata allocation"),
                });
                suggestions.push("consider spreading this commitment across multiple bins".into());
            }
        }
    }

    ValidationReport::finish(errors, warnings, suggestions)
}

/// Validates a `claim` call against the auction's current state and the
/// caller's committed account.
pub fn validate_claim(auction: &Auction, committed: &Committed, bin_id: u8, now: i64) -> ValidationReport {
    let mut errors = Vec::new();
    let warnings = Vec::new();
    let suggestions = Vec::new();

    if auction.status(now) != crate::state::AuctionStatus::Claiming {
        errors.push(ValidationIssue {
            code: "INVALID_TIMING",
            message: format!("claim period has not started (claim_start_time = {}, now = {now})", auction.claim_start_time),
        });
    }

    let committed_bin = committed.find_bin(bin_id);
    if committed_bin.is_none() {
        errors.push(ValidationIssue {
            code: "INVALID_BIN_ID",
            message: format!("caller has no commitment recorded for bin {bin_id}"),
        });
    }

    if let (Some(bin), Some(committed_bin)) = (auction.get_bin(bin_id), committed_bin) {
        if let Ok(entitlement) = crate::allocation::allocate(
            committed_bin.payment_token_committed,
            bin.sale_token_cap,
            bin.payment_token_raised,
            bin.sale_token_price,
        ) {
            if committed_bin.sale_token_claimed > entitlement.entitled_sale {
                errors.push(ValidationIssue {
                    code: "INVALID_AMOUNT",
                    message: format!(
                        "already claimed {} exceeds entitlement of {}",
                        committed_bin.sale_token_claimed, entitlement.entitled_sale
                    ),
                });
            }
        }
    }

    ValidationReport::finish(errors, warnings, suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AuctionBin, AuctionExtensions, CommittedBin, EmergencyState};
    use solana_sdk::pubkey::Pubkey;

    fn bins(prices: &[u64]) -> Vec<AuctionBinParams> {
        prices.iter().map(|p| AuctionBinParams { sale_token_price: *p, sale_token_cap: 100 }).collect()
    }

    #[test]
    fn valid_init_auction_has_no_errors() {
        let report = validate_init_auction(100, 200, 300, &bins(&[10, 5]), 0);
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn out_of_order_timestamps_are_rejected() {
        let report = validate_init_auction(200, 100, 300, &bins(&[10]), 0);
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].code, "INVALID_TIMING");
    }

    #[test]
    fn zero_bins_is_rejected() {
        let report = validate_init_auction(100, 200, 300, &[], 0);
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].code, "INVALID_BIN_COUNT");
    }

    #[test]
    fn increasing_prices_warn_but_do_not_fail() {
        let report = validate_init_auction(100, 200, 300, &bins(&[5, 10]), 0);
        assert!(report.is_valid);
        assert_eq!(report.warnings[0].code, "INVALID_BIN_PARAM");
        assert!(!report.suggestions.is_empty());
    }

    fn sample_auction_with_bin(cap: u64, price: u64, raised: u64) -> Auction {
        Auction {
            authority: Pubkey::new_unique(),
            custody: Pubkey::new_unique(),
            sale_token_mint: Pubkey::new_unique(),
            payment_token_mint: Pubkey::new_unique(),
            commit_start_time: 0,
            commit_end_time: 100,
            claim_start_time: 200,
            bins: vec![AuctionBin { sale_token_price: price, sale_token_cap: cap, payment_token_raised: raised, sale_token_claimed: 0 }],
            extensions: AuctionExtensions::default(),
            emergency_state: EmergencyState::default(),
            total_participants: 0,
            total_fees_collected: 0,
            total_fees_withdrawn: 0,
            unsold_and_effective_payment_withdrawn: false,
            vault_sale_bump: 255,
            vault_payment_bump: 255,
            bump: 255,
        }
    }

    #[test]
    fn commit_cap_exceeded_is_rejected() {
        let mut auction = sample_auction_with_bin(1000, 1, 0);
        auction.extensions.commit_cap_per_user = Some(100);
        let report = validate_commit(&auction, 0, 50, Some(60));
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].code, "COMMIT_CAP_EXCEEDED");
    }

    #[test]
    fn oversubscribed_commit_warns() {
        let auction = sample_auction_with_bin(10, 1, 0);
        let report = validate_commit(&auction, 0, 100, None);
        assert!(report.is_valid);
        assert_eq!(report.warnings[0].code, "INVALID_AMOUNT");
    }

    #[test]
    fn claim_before_claim_period_is_rejected() {
        let auction = sample_auction_with_bin(10, 1, 5);
        let committed = Committed {
            auction: Pubkey::new_unique(),
            user: Pubkey::new_unique(),
            bins: vec![CommittedBin { bin_id: 0, payment_token_committed: 5, sale_token_claimed: 0, payment_token_refunded: 0 }],
            nonce: 0,
            bump: 255,
        };
        let report = validate_claim(&auction, &committed, 0, 50);
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].code, "INVALID_TIMING");
    }

    #[test]
    fn claim_for_missing_bin_is_rejected() {
        let auction = sample_auction_with_bin(10, 1, 5);
        let committed = Committed { auction: Pubkey::new_unique(), user: Pubkey::new_unique(), bins: vec![], nonce: 0, bump: 255 };
        let report = validate_claim(&auction, &committed, 0, 250);
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].code, "INVALID_BIN_ID");
    }
}
