//! Balance ledger
//!
//! Fungible-token accounting per identity. Only `mint` and `burn` change the
//! total supply; `debit`, `credit` and `transfer` move existing tokens.

use crate::{
    context::TxContext,
    events::EventName,
    keys::{self, Namespace},
    types::{decode_u64, encode_u64, Identity, RoleClass},
    Error, Result,
};
use serde_json::json;

/// Current balance; unknown identities hold 0
pub fn balance_of(tx: &TxContext<'_>, role: &Identity) -> Result<u64> {
    let key = balance_key(role)?;
    match tx.get(&key)? {
        Some(bytes) => decode_u64(&bytes),
        None => Ok(0),
    }
}

/// Add `amount` to `role`
pub fn credit(tx: &mut TxContext<'_>, role: &Identity, amount: u64) -> Result<()> {
    let current = balance_of(tx, role)?;
    let updated = current.checked_add(amount).ok_or_else(|| {
        Error::Overflow(format!("crediting {} to {} overflows", amount, role))
    })?;
    store_balance(tx, role, updated)
}

/// Remove `amount` from `role`, failing if it holds less
pub fn debit(tx: &mut TxContext<'_>, role: &Identity, amount: u64) -> Result<()> {
    let current = balance_of(tx, role)?;
    if amount > current {
        return Err(Error::InsufficientBalance {
            role: role.to_string(),
            available: current,
            requested: amount,
        });
    }
    store_balance(tx, role, current - amount)
}

/// Move `amount` from `from` to `to`; nothing is credited if the debit fails
pub fn transfer(tx: &mut TxContext<'_>, from: &Identity, to: &Identity, amount: u64) -> Result<()> {
    debit(tx, from, amount)?;
    credit(tx, to, amount)
}

/// Create tokens; payment authority only
pub fn mint(tx: &mut TxContext<'_>, role: &Identity, amount: u64) -> Result<()> {
    require_payment_authority(tx, "mint")?;
    credit(tx, role, amount)?;
    tracing::info!(role = %role, amount, "Minted");
    tx.set_event(EventName::Mint, &json!({ "role": role, "amount": amount }))
}

/// Destroy up to `amount` tokens; payment authority only
///
/// Burning more than the balance burns the whole balance instead of failing.
/// Returns the amount actually burned.
pub fn burn(tx: &mut TxContext<'_>, role: &Identity, amount: u64) -> Result<u64> {
    require_payment_authority(tx, "burn")?;
    let current = balance_of(tx, role)?;
    let burned = amount.min(current);
    store_balance(tx, role, current - burned)?;
    if burned < amount {
        tracing::debug!(role = %role, requested = amount, burned, "Burn clamped to balance");
    }
    tx.set_event(
        EventName::Burn,
        &json!({ "role": role, "requested": amount, "burned": burned }),
    )?;
    Ok(burned)
}

fn require_payment_authority(tx: &TxContext<'_>, op: &str) -> Result<()> {
    if tx.caller_class() != RoleClass::PaymentAuthority {
        return Err(Error::Unauthorized(format!(
            "only the payment authority may {}, caller is {}",
            op,
            tx.caller()
        )));
    }
    Ok(())
}

fn store_balance(tx: &mut TxContext<'_>, role: &Identity, amount: u64) -> Result<()> {
    let key = balance_key(role)?;
    if amount == 0 {
        tx.delete(key);
    } else {
        tx.put(key, encode_u64(amount));
    }
    Ok(())
}

fn balance_key(role: &Identity) -> Result<Vec<u8>> {
    keys::key(Namespace::Balance, &[role.as_str()])
}
