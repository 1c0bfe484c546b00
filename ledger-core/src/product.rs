//! Product lifecycle and provenance index
//!
//! Registration records the sellable unit and links it to the material
//! batches it consumed. The links are a write-only audit trail for
//! traceability; no business rule reads them.

use crate::{
    context::TxContext,
    events::EventName,
    inventory,
    keys::{self, CompositeKey, Namespace},
    types::{decode_record, encode_record, Identity, Product, RoleClass},
    Error, Result,
};
use serde_json::json;

const MARKER: [u8; 1] = [1];

/// Register a product unit owned by the caller
///
/// Material inventory is not checked or drawn here; producers consume the
/// materials in a separate call.
pub fn register_product(
    tx: &mut TxContext<'_>,
    kind: &str,
    product_id: &str,
    batch_id: &str,
    material_batches: &[String],
) -> Result<Product> {
    if tx.caller_class() != RoleClass::ProductProducer {
        return Err(Error::Unauthorized(format!(
            "only product producers may register products, caller is {}",
            tx.caller()
        )));
    }

    let key = product_key(product_id)?;
    if tx.get(&key)?.is_some() {
        return Err(Error::AlreadyExists(format!("product {}", product_id)));
    }

    let owner = tx.caller().clone();
    let product = Product {
        owner: owner.clone(),
        created_at: tx.timestamp(),
        batch_id: batch_id.to_string(),
        material_batches: material_batches.to_vec(),
        product_kind: kind.to_string(),
    };

    tx.put(key, encode_record(&product)?);
    for material_batch in material_batches {
        let link = keys::key(Namespace::Provenance, &[material_batch.as_str(), product_id])?;
        tx.put(link, MARKER.to_vec());
    }
    tx.put(inventory::product_unit_key(&owner, kind, product_id)?, MARKER.to_vec());
    tx.set_event(EventName::ProductCreated, &product)?;

    tracing::info!(
        producer = %owner,
        kind,
        product_id,
        materials = material_batches.len(),
        "Product registered"
    );
    Ok(product)
}

/// Look up a product by id
pub fn get_product(tx: &TxContext<'_>, product_id: &str) -> Result<Product> {
    let bytes = tx
        .get(&product_key(product_id)?)?
        .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;
    decode_record(&bytes)
}

/// Reassign a product to `to`, moving its unit entry in the same call
pub fn change_owner(tx: &mut TxContext<'_>, product_id: &str, to: &Identity) -> Result<()> {
    let mut product = get_product(tx, product_id)?;
    let old = std::mem::replace(&mut product.owner, to.clone());
    if &old == to {
        return Err(Error::InvalidTransfer(format!(
            "product {} already belongs to {}",
            product_id, to
        )));
    }

    let old_entry = inventory::product_unit_key(&old, &product.product_kind, product_id)?;
    if tx.get(&old_entry)?.is_none() {
        return Err(Error::Storage(format!(
            "product {} has no inventory entry for owner {}",
            product_id, old
        )));
    }

    tx.delete(old_entry);
    tx.put(
        inventory::product_unit_key(to, &product.product_kind, product_id)?,
        MARKER.to_vec(),
    );
    tx.put(product_key(product_id)?, encode_record(&product)?);
    tx.set_event(
        EventName::ProductOwnerChanged,
        &json!({ "id": product_id, "old": old, "new": to }),
    )
}

/// Product ids registered with material from `material_batch`, ascending
pub fn trace_material_batch(tx: &TxContext<'_>, material_batch: &str) -> Result<Vec<String>> {
    let prefix = keys::prefix(Namespace::Provenance, &[material_batch])?;
    tx.scan_prefix(&prefix)?
        .into_iter()
        .map(|(key, _)| Ok(CompositeKey::decode(&key)?.segment(1)?.to_string()))
        .collect()
}

fn product_key(product_id: &str) -> Result<Vec<u8>> {
    keys::key(Namespace::Product, &[product_id])
}
