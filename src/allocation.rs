//! Pro-rata allocation engine.
//!
//! Pure arithmetic over a single bin's state. Every product is computed in
//! `u128` before any division so large `u64` inputs near the top of their
//! range never silently wrap, mirroring the on-chain program's own
//! `calculate_claimable_amounts` / `AllocationRatio` arithmetic discipline but
//! without the fixed-point ratio intermediate (the ratio is folded directly
//! into a single numerator-first division).

use crate::error::{ArithmeticError, Error, Result};

/// Entitlement for one user's commitment to one bin, as of the bin's current
/// `payment_token_raised`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    pub entitled_sale: u64,
    pub entitled_refund: u64,
}

/// `sale_token_cap * sale_token_price`, promoted through `u128` and checked
/// back down to `u64` since a cap/price pair near `u64::MAX` would otherwise
/// silently overflow.
pub fn bin_target(sale_token_cap: u64, sale_token_price: u64) -> Result<u64> {
    let target = (sale_token_cap as u128) * (sale_token_price as u128);
    u64::try_from(target)
        .map_err(|_| Error::arithmetic("bin_target", ArithmeticError::Overflow("bin_target")))
}

/// Computes the entitled sale-token amount and refund for a single
/// commitment, given the bin's target, its actual raised amount, and price.
///
/// Edge cases: `sale_token_price == 0` yields a full refund with
/// zero entitlement; `payment_token_raised == 0` yields all zeros.
pub fn allocate(
    payment_committed: u64,
    sale_token_cap: u64,
    payment_token_raised: u64,
    sale_token_price: u64,
) -> Result<Entitlement> {
    if sale_token_price == 0 {
        return Ok(Entitlement { entitled_sale: 0, entitled_refund: payment_committed });
    }
    if payment_token_raised == 0 {
        return Ok(Entitlement { entitled_sale: 0, entitled_refund: 0 });
    }

    let target = bin_target(sale_token_cap, sale_token_price)?;

    let (entitled_sale, entitled_refund) = if payment_token_raised <= target {
        let entitled_sale = payment_committed / sale_token_price;
        let spent = (entitled_sale as u128) * (sale_token_price as u128);
        let refund = (payment_committed as u128) - spent;
        (
            entitled_sale,
            u64::try_from(refund)
                .map_err(|_| Error::arithmetic("allocate.refund", ArithmeticError::Overflow("allocate.refund")))?,
        )
    } else {
        let numerator = (payment_committed as u128) * (target as u128);
        let effective_payment = numerator / (payment_token_raised as u128);
        let entitled_sale_128 = effective_payment / (sale_token_price as u128);
        let entitled_sale = u64::try_from(entitled_sale_128).map_err(|_| {
            Error::arithmetic("allocate.entitled_sale", ArithmeticError::Overflow("allocate.entitled_sale"))
        })?;
        let spent = (entitled_sale as u128) * (sale_token_price as u128);
        let refund = (payment_committed as u128) - spent;
        (
            entitled_sale,
            u64::try_from(refund)
                .map_err(|_| Error::arithmetic("allocate.refund", ArithmeticError::Overflow("allocate.refund")))?,
        )
    };

    Ok(Entitlement { entitled_sale, entitled_refund })
}

/// The still-unclaimed deltas for a commitment given what has already been
/// claimed/refunded on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimableDelta {
    pub sale_to_claim: u64,
    pub payment_to_refund: u64,
}

pub fn claimable_delta(
    entitlement: Entitlement,
    already_claimed: u64,
    already_refunded: u64,
) -> ClaimableDelta {
    ClaimableDelta {
        sale_to_claim: entitlement.entitled_sale.saturating_sub(already_claimed),
        payment_to_refund: entitlement.entitled_refund.saturating_sub(already_refunded),
    }
}

/// Deducts the claim fee (basis points, never rounds up) from a sale-token
/// payout and returns `(amount_to_user, fee)`.
pub fn apply_claim_fee(sale_to_claim: u64, claim_fee_rate_bps: Option<u64>) -> Result<(u64, u64)> {
    let Some(bps) = claim_fee_rate_bps else {
        return Ok((sale_to_claim, 0));
    };
    let fee_128 = (sale_to_claim as u128) * (bps as u128) / 10_000u128;
    let fee = u64::try_from(fee_128)
        .map_err(|_| Error::arithmetic("apply_claim_fee", ArithmeticError::Overflow("apply_claim_fee")))?;
    Ok((sale_to_claim.saturating_sub(fee), fee))
}

/// Per-bin admin withdrawal preview: sale tokens actually sold (capped),
/// the effective payment amount that corresponds to them, and the unsold
/// remainder of the bin's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWithdrawAmounts {
    pub sale_tokens_sold: u64,
    pub payment_tokens_to_withdraw: u64,
    pub unsold_sale_tokens: u64,
}

pub fn calculate_bin_withdraw_amounts(
    payment_token_raised: u64,
    sale_token_cap: u64,
    sale_token_price: u64,
) -> Result<BinWithdrawAmounts> {
    if sale_token_price == 0 {
        return Ok(BinWithdrawAmounts {
            sale_tokens_sold: 0,
            payment_tokens_to_withdraw: 0,
            unsold_sale_tokens: sale_token_cap,
        });
    }
    let demanded = payment_token_raised / sale_token_price;
    let sold = demanded.min(sale_token_cap);
    let payment = (sold as u128) * (sale_token_price as u128);
    let payment = u64::try_from(payment).map_err(|_| {
        Error::arithmetic(
            "calculate_bin_withdraw_amounts",
            ArithmeticError::Overflow("calculate_bin_withdraw_amounts"),
        )
    })?;
    let unsold = sale_token_cap - sold;
    Ok(BinWithdrawAmounts {
        sale_tokens_sold: sold,
        payment_tokens_to_withdraw: payment,
        unsold_sale_tokens: unsold,
    })
}

/// Aggregate admin withdrawal preview across every bin of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalWithdrawAmounts {
    pub total_payment_tokens: u64,
    pub total_unsold_sale_tokens: u64,
}

pub fn calculate_total_withdraw_amounts(
    bins: &[crate::state::AuctionBin],
) -> Result<TotalWithdrawAmounts> {
    let mut total = TotalWithdrawAmounts::default();
    for bin in bins {
        let amounts = calculate_bin_withdraw_amounts(
            bin.payment_token_raised,
            bin.sale_token_cap,
            bin.sale_token_price,
        )?;
        total.total_payment_tokens = total
            .total_payment_tokens
            .checked_add(amounts.payment_tokens_to_withdraw)
            .ok_or_else(|| {
                Error::arithmetic(
                    "calculate_total_withdraw_amounts",
                    ArithmeticError::Overflow("total_payment_tokens"),
                )
            })?;
        total.total_unsold_sale_tokens = total
            .total_unsold_sale_tokens
            .checked_add(amounts.total_unsold_sale_tokens())
            .ok_or_else(|| {
                Error::arithmetic(
                    "calculate_total_withdraw_amounts",
                    ArithmeticError::Overflow("total_unsold_sale_tokens"),
                )
            })?;
    }
    Ok(total)
}

impl BinWithdrawAmounts {
    fn total_unsold_sale_tokens(&self) -> u64 {
        self.unsold_sale_tokens
    }
}

pub fn calculate_withdrawable_fees(total_collected: u64, total_withdrawn: u64) -> Result<u64> {
    total_collected.checked_sub(total_withdrawn).ok_or_else(|| {
        Error::arithmetic("calculate_withdrawable_fees", ArithmeticError::Overflow("fees_withdrawn_exceeds_collected"))
    })
}
