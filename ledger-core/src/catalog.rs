//! Catalog: one current price per (producer, kind)

use crate::{
    context::TxContext,
    events::EventName,
    keys::{self, Namespace},
    types::{decode_u64, encode_u64, AssetClass, Identity},
    Error, Result,
};
use serde_json::json;

/// Set the caller's price for `kind`, overwriting any previous price
pub fn set_price(tx: &mut TxContext<'_>, asset: AssetClass, kind: &str, price: u64) -> Result<()> {
    if tx.caller_class() != asset.producer_class() {
        return Err(Error::Unauthorized(format!(
            "only {} producers may price {} kinds, caller is {}",
            asset,
            asset,
            tx.caller()
        )));
    }
    let producer = tx.caller().clone();
    tx.put(price_key(asset, &producer, kind)?, encode_u64(price));

    let event = match asset {
        AssetClass::Material => EventName::MaterialPriceSet,
        AssetClass::Product => EventName::ProductPriceSet,
    };
    tx.set_event(event, &json!({ "producer": producer, "kind": kind, "price": price }))
}

/// Current price of `kind` from `producer`
pub fn get_price(
    tx: &TxContext<'_>,
    asset: AssetClass,
    producer: &Identity,
    kind: &str,
) -> Result<u64> {
    match tx.get(&price_key(asset, producer, kind)?)? {
        Some(bytes) => decode_u64(&bytes),
        None => Err(Error::PriceNotSet {
            producer: producer.to_string(),
            kind: kind.to_string(),
        }),
    }
}

fn price_key(asset: AssetClass, producer: &Identity, kind: &str) -> Result<Vec<u8>> {
    let namespace = match asset {
        AssetClass::Material => Namespace::MaterialPrice,
        AssetClass::Product => Namespace::ProductPrice,
    };
    keys::key(namespace, &[producer.as_str(), kind])
}
