//! Inventory ledger
//!
//! Materials are held as (owner, kind, batch) => quantity entries; products
//! as (owner, kind, productId) => marker entries. Draws scan an owner's
//! entries for a kind in ascending key order and build a complete plan
//! before anything is written, so a short draw leaves inventory untouched.

use crate::{
    context::TxContext,
    events::EventName,
    keys::{self, CompositeKey, Namespace},
    product,
    types::{decode_record, decode_u64, encode_record, encode_u64, Identity, MaterialLot, RoleClass},
    Error, Result,
};
use serde_json::json;
use std::collections::BTreeMap;

/// One entry touched by a draw
#[derive(Debug, Clone, PartialEq, Eq)]
struct Draw {
    /// Last key segment: batch id or product id
    item_id: String,
    key: Vec<u8>,
    held: u64,
    taken: u64,
}

impl Draw {
    fn exhausts_entry(&self) -> bool {
        self.taken == self.held
    }
}

/// Register a new material batch owned by the caller
pub fn register_material(
    tx: &mut TxContext<'_>,
    kind: &str,
    batch_id: &str,
    quantity: u64,
) -> Result<MaterialLot> {
    if tx.caller_class() != RoleClass::MaterialProducer {
        return Err(Error::Unauthorized(format!(
            "only material producers may register materials, caller is {}",
            tx.caller()
        )));
    }
    if quantity == 0 {
        return Err(Error::InvalidArguments("quantity must be positive".to_string()));
    }

    let lot_key = keys::key(Namespace::MaterialLot, &[batch_id])?;
    if tx.get(&lot_key)?.is_some() {
        return Err(Error::AlreadyExists(format!("material batch {}", batch_id)));
    }

    let owner = tx.caller().clone();
    let lot = MaterialLot {
        producer: owner.clone(),
        created_at: tx.timestamp(),
        batch_id: batch_id.to_string(),
        material_kind: kind.to_string(),
        total_quantity: quantity,
    };

    let entry_key = material_key(&owner, kind, batch_id)?;
    tx.put(entry_key, encode_u64(quantity));
    tx.put(lot_key, encode_record(&lot)?);
    tx.set_event(EventName::MaterialCreated, &lot)?;

    tracing::info!(producer = %owner, kind, batch_id, quantity, "Material registered");
    Ok(lot)
}

/// Look up a registered batch
pub fn get_material_lot(tx: &TxContext<'_>, batch_id: &str) -> Result<MaterialLot> {
    let key = keys::key(Namespace::MaterialLot, &[batch_id])?;
    let bytes = tx
        .get(&key)?
        .ok_or_else(|| Error::NotFound(format!("material batch {}", batch_id)))?;
    decode_record(&bytes)
}

/// Draw `quantity` of `kind` from the caller's own inventory
pub fn consume_material(tx: &mut TxContext<'_>, kind: &str, quantity: u64) -> Result<()> {
    if quantity == 0 {
        return Err(Error::InvalidArguments("quantity must be positive".to_string()));
    }
    let owner = tx.caller().clone();
    let plan = plan_draw(tx, Namespace::MaterialInventory, &owner, kind, quantity)?;

    for draw in &plan {
        debit_entry(tx, draw);
    }

    tracing::debug!(owner = %owner, kind, quantity, entries = plan.len(), "Material consumed");
    tx.set_event(
        EventName::MaterialConsumed,
        &json!({ "who": owner, "materialType": kind, "num": quantity }),
    )
}

/// Move `quantity` of `kind` from `from` to `to`, keeping batch ids
pub fn transfer_material(
    tx: &mut TxContext<'_>,
    from: &Identity,
    to: &Identity,
    kind: &str,
    quantity: u64,
) -> Result<()> {
    if from == to {
        return Err(Error::InvalidTransfer(format!(
            "{} cannot transfer material to itself",
            from
        )));
    }
    if quantity == 0 {
        return Err(Error::InvalidArguments("quantity must be positive".to_string()));
    }
    let plan = plan_draw(tx, Namespace::MaterialInventory, from, kind, quantity)?;

    for draw in &plan {
        debit_entry(tx, draw);

        let dest = material_key(to, kind, &draw.item_id)?;
        let existing = match tx.get(&dest)? {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        let merged = existing.checked_add(draw.taken).ok_or_else(|| {
            Error::Overflow(format!("{} batch {} of {} overflows", to, draw.item_id, kind))
        })?;
        tx.put(dest, encode_u64(merged));
    }

    tracing::debug!(from = %from, to = %to, kind, quantity, "Material transferred");
    tx.set_event(
        EventName::MaterialTransferred,
        &json!({ "from": from, "to": to, "materialType": kind, "num": quantity }),
    )
}

/// Move `count` units of product `kind` from `from` to `to`
///
/// Returns the ids of the transferred units.
pub fn transfer_units(
    tx: &mut TxContext<'_>,
    from: &Identity,
    to: &Identity,
    kind: &str,
    count: u64,
) -> Result<Vec<String>> {
    if from == to {
        return Err(Error::InvalidTransfer(format!(
            "{} cannot transfer products to itself",
            from
        )));
    }
    if count == 0 {
        return Err(Error::InvalidArguments("count must be positive".to_string()));
    }
    let plan = plan_draw(tx, Namespace::ProductInventory, from, kind, count)?;

    let mut moved = Vec::with_capacity(plan.len());
    for draw in plan {
        product::change_owner(tx, &draw.item_id, to)?;
        moved.push(draw.item_id);
    }
    Ok(moved)
}

/// Total material held by `owner`, per kind
pub fn material_holdings(tx: &TxContext<'_>, owner: &Identity) -> Result<BTreeMap<String, u64>> {
    holdings(tx, Namespace::MaterialInventory, owner)
}

/// Total of one material kind held by `owner`
pub fn material_held(tx: &TxContext<'_>, owner: &Identity, kind: &str) -> Result<u64> {
    held(tx, Namespace::MaterialInventory, owner, kind)
}

/// Product units held by `owner`, per kind
pub fn product_holdings(tx: &TxContext<'_>, owner: &Identity) -> Result<BTreeMap<String, u64>> {
    holdings(tx, Namespace::ProductInventory, owner)
}

/// Units of one product kind held by `owner`
pub fn products_held(tx: &TxContext<'_>, owner: &Identity, kind: &str) -> Result<u64> {
    held(tx, Namespace::ProductInventory, owner, kind)
}

pub(crate) fn material_key(owner: &Identity, kind: &str, batch_id: &str) -> Result<Vec<u8>> {
    keys::key(Namespace::MaterialInventory, &[owner.as_str(), kind, batch_id])
}

pub(crate) fn product_unit_key(owner: &Identity, kind: &str, product_id: &str) -> Result<Vec<u8>> {
    keys::key(Namespace::ProductInventory, &[owner.as_str(), kind, product_id])
}

/// Quantity stored in an entry; product markers count as one unit
fn entry_quantity(namespace: Namespace, value: &[u8]) -> Result<u64> {
    match namespace {
        Namespace::ProductInventory => Ok(1),
        _ => {
            let quantity = decode_u64(value)?;
            if quantity == 0 {
                return Err(Error::Storage("inventory entry stored with quantity 0".to_string()));
            }
            Ok(quantity)
        }
    }
}

/// Scan (owner, kind) and plan a draw of `quantity`, writing nothing
fn plan_draw(
    tx: &TxContext<'_>,
    namespace: Namespace,
    owner: &Identity,
    kind: &str,
    quantity: u64,
) -> Result<Vec<Draw>> {
    let prefix = keys::prefix(namespace, &[owner.as_str(), kind])?;
    let entries = tx.scan_prefix(&prefix)?;

    let mut plan = Vec::new();
    let mut remaining = quantity;
    let mut available: u64 = 0;
    for (key, value) in entries {
        let held = entry_quantity(namespace, &value)?;
        available = available.saturating_add(held);
        if remaining == 0 {
            continue;
        }
        let taken = held.min(remaining);
        remaining -= taken;
        let item_id = CompositeKey::decode(&key)?.segment(2)?.to_string();
        plan.push(Draw { item_id, key, held, taken });
    }

    if remaining > 0 {
        return Err(Error::InsufficientInventory {
            owner: owner.to_string(),
            kind: kind.to_string(),
            available,
            requested: quantity,
        });
    }
    Ok(plan)
}

/// Apply one planned draw to its source entry
fn debit_entry(tx: &mut TxContext<'_>, draw: &Draw) {
    if draw.exhausts_entry() {
        tx.delete(draw.key.clone());
    } else {
        tx.put(draw.key.clone(), encode_u64(draw.held - draw.taken));
    }
}

fn holdings(
    tx: &TxContext<'_>,
    namespace: Namespace,
    owner: &Identity,
) -> Result<BTreeMap<String, u64>> {
    let prefix = keys::prefix(namespace, &[owner.as_str()])?;
    let mut totals = BTreeMap::new();
    for (key, value) in tx.scan_prefix(&prefix)? {
        let kind = CompositeKey::decode(&key)?.segment(1)?.to_string();
        let quantity = entry_quantity(namespace, &value)?;
        let total: &mut u64 = totals.entry(kind.clone()).or_default();
        *total = total.checked_add(quantity).ok_or_else(|| {
            Error::Overflow(format!("{} holdings of {} exceed u64", owner, kind))
        })?;
    }
    Ok(totals)
}

fn held(tx: &TxContext<'_>, namespace: Namespace, owner: &Identity, kind: &str) -> Result<u64> {
    let prefix = keys::prefix(namespace, &[owner.as_str(), kind])?;
    tx.scan_prefix(&prefix)?
        .iter()
        .try_fold(0u64, |acc, (_, value)| {
            acc.checked_add(entry_quantity(namespace, value)?).ok_or_else(|| {
                Error::Overflow(format!("{} holdings of {} exceed u64", owner, kind))
            })
        })
}
