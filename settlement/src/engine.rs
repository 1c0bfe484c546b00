//! Order engine
//!
//! Orchestrates catalog, balance and inventory within one call:
//!
//! 1. **Make**: price check against the buyer's ceiling, escrow debit
//! 2. **Confirm**: asset transfer producer → payer, escrow released to producer
//! 3. **Cancel**: escrow split between payer and producer by who cancels
//!
//! An order is keyed by the request id of the call that created it and is
//! never deleted. It moves from `Pending` to `Settled` exactly once.

use crate::types::{Order, OrderResolution, OrderStatus};
use serde_json::json;
use supply_ledger_core::{
    balance, catalog, inventory,
    keys::{self, Namespace},
    types::{decode_record, encode_record},
    AssetClass, Error, EventName, Identity, Result, RoleClass, TxContext,
};

/// Create a pending order from the caller to `producer`
///
/// The listed price must not exceed `max_price`; the order is charged at the
/// listed price. The full amount is debited from the caller as escrow.
pub fn make_order(
    tx: &mut TxContext<'_>,
    order_class: AssetClass,
    producer: &Identity,
    kind: &str,
    count: u64,
    max_price: u64,
) -> Result<Order> {
    if count == 0 {
        return Err(Error::InvalidArguments("count must be positive".to_string()));
    }
    let payer = tx.caller().clone();
    if &payer == producer {
        return Err(Error::InvalidTransfer(format!("{} cannot order from itself", payer)));
    }

    let listed = catalog::get_price(tx, order_class, producer, kind)?;
    if listed > max_price {
        return Err(Error::PriceMismatch {
            offered: max_price,
            listed,
        });
    }
    let amount = listed.checked_mul(count).ok_or_else(|| {
        Error::Overflow(format!("{} x {} {} overflows", count, listed, kind))
    })?;

    let order_id = tx.request_id().to_string();
    let key = order_key(&order_id)?;
    if tx.get(&key)?.is_some() {
        return Err(Error::AlreadyExists(format!("order {}", order_id)));
    }

    balance::debit(tx, &payer, amount)?;

    let order = Order {
        order_id,
        payer,
        producer: producer.clone(),
        amount,
        count,
        item_kind: kind.to_string(),
        order_class,
        created_at: tx.timestamp(),
        status: OrderStatus::Pending,
        settled_at: None,
        resolution: None,
    };
    tx.put(key, encode_record(&order)?);
    tx.set_event(EventName::MakeOrder, &order)?;

    tracing::info!(
        order_id = %order.order_id,
        payer = %order.payer,
        producer = %order.producer,
        class = %order_class,
        kind,
        count,
        amount,
        "Order created"
    );
    Ok(order)
}

/// Confirm delivery; payer only
///
/// Moves `count` units producer → payer and releases the escrow to the
/// producer. If the producer cannot deliver, the whole call fails.
pub fn confirm_order(tx: &mut TxContext<'_>, order_id: &str) -> Result<Order> {
    let mut order = pending_order(tx, order_id)?;
    if tx.caller() != &order.payer {
        return Err(Error::Unauthorized(format!(
            "only the payer {} can confirm order {}, caller is {}",
            order.payer,
            order_id,
            tx.caller()
        )));
    }

    match order.order_class {
        AssetClass::Material => inventory::transfer_material(
            tx,
            &order.producer,
            &order.payer,
            &order.item_kind,
            order.count,
        )?,
        AssetClass::Product => {
            let moved = inventory::transfer_units(
                tx,
                &order.producer,
                &order.payer,
                &order.item_kind,
                order.count,
            )?;
            tracing::debug!(order_id, units = ?moved, "Product units delivered");
        }
    }
    balance::credit(tx, &order.producer, order.amount)?;

    settle(&mut order, tx, OrderResolution::Confirmed);
    tx.put(order_key(order_id)?, encode_record(&order)?);
    tx.set_event(EventName::ConfirmOrder, &order)?;

    tracing::info!(order_id, amount = order.amount, "Order confirmed");
    Ok(order)
}

/// Cancel a pending order; payer or producer only
///
/// A payer cancelling forfeits the configured compensation percentage to the
/// producer. A producer cancelling refunds the payer in full.
pub fn cancel_order(tx: &mut TxContext<'_>, order_id: &str) -> Result<Order> {
    let mut order = pending_order(tx, order_id)?;
    let caller = tx.caller().clone();

    let (return_to_payer, pay_to_producer) = if caller == order.payer {
        split_escrow(order.amount, cancel_compensate(tx)?)
    } else if caller == order.producer {
        (order.amount, 0)
    } else {
        return Err(Error::Unauthorized(format!(
            "only the payer {} or producer {} can cancel order {}, caller is {}",
            order.payer, order.producer, order_id, caller
        )));
    };

    balance::credit(tx, &order.payer, return_to_payer)?;
    if pay_to_producer > 0 {
        balance::credit(tx, &order.producer, pay_to_producer)?;
    }

    settle(
        &mut order,
        tx,
        OrderResolution::Cancelled {
            cancelled_by: caller.clone(),
            return_to_payer,
            pay_to_producer,
        },
    );
    tx.put(order_key(order_id)?, encode_record(&order)?);
    tx.set_event(
        EventName::CancelOrder,
        &json!({
            "orderId": order_id,
            "returnToPayer": return_to_payer,
            "payToProducer": pay_to_producer,
        }),
    )?;

    tracing::info!(
        order_id,
        cancelled_by = %caller,
        return_to_payer,
        pay_to_producer,
        "Order cancelled"
    );
    Ok(order)
}

/// Look up an order
pub fn get_order(tx: &TxContext<'_>, order_id: &str) -> Result<Order> {
    let bytes = tx
        .get(&order_key(order_id)?)?
        .ok_or_else(|| Error::NotFound(format!("order {}", order_id)))?;
    decode_record(&bytes)
}

/// Set the percentage a cancelling payer forfeits; payment authority only
pub fn set_cancel_compensate(tx: &mut TxContext<'_>, percent: u8) -> Result<()> {
    if tx.caller_class() != RoleClass::PaymentAuthority {
        return Err(Error::Unauthorized(format!(
            "only the payment authority may set the cancel compensation, caller is {}",
            tx.caller()
        )));
    }
    if percent > 100 {
        return Err(Error::InvalidArguments(format!(
            "cancel compensation must be 0-100, got {}",
            percent
        )));
    }
    tx.put(compensate_key()?, vec![percent]);
    tx.set_event(EventName::CancelCompensateSet, &json!({ "percent": percent }))
}

/// Current cancel compensation percentage, or the configured default
pub fn cancel_compensate(tx: &TxContext<'_>) -> Result<u8> {
    match tx.get(&compensate_key()?)? {
        None => Ok(tx.authority().default_cancel_compensate),
        Some(bytes) => match bytes.as_slice() {
            [percent] if *percent <= 100 => Ok(*percent),
            _ => Err(Error::Storage(format!(
                "cancel compensation stored as {:?}",
                bytes
            ))),
        },
    }
}

/// Split `amount` into (returned to payer, paid to producer)
///
/// The producer's share truncates; the payer's share absorbs the remainder,
/// so the two always sum to `amount`.
pub fn split_escrow(amount: u64, percent: u8) -> (u64, u64) {
    let compensate = (u128::from(amount) * u128::from(percent) / 100) as u64;
    (amount - compensate, compensate)
}

fn pending_order(tx: &TxContext<'_>, order_id: &str) -> Result<Order> {
    let order = get_order(tx, order_id)?;
    if !order.is_pending() {
        return Err(Error::InvalidState(format!("order {} is already settled", order_id)));
    }
    Ok(order)
}

fn settle(order: &mut Order, tx: &TxContext<'_>, resolution: OrderResolution) {
    order.status = OrderStatus::Settled;
    order.settled_at = Some(tx.timestamp());
    order.resolution = Some(resolution);
}

fn order_key(order_id: &str) -> Result<Vec<u8>> {
    keys::key(Namespace::Order, &[order_id])
}

fn compensate_key() -> Result<Vec<u8>> {
    keys::key::<&str>(Namespace::CancelCompensate, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id, run};
    use supply_ledger_core::{product, KvStore, MemoryStore};

    /// m1 lists LCD at 100 with 300 in stock; buyer holds 5000
    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        run(&store, "material.m1", |tx| {
            inventory::register_material(tx, "LCD", "B1", 300)
        })
        .unwrap();
        run(&store, "material.m1", |tx| {
            catalog::set_price(tx, AssetClass::Material, "LCD", 100)
        })
        .unwrap();
        run(&store, "payment", |tx| balance::mint(tx, &id("buyer"), 5000)).unwrap();
        store
    }

    fn order_lcd(store: &MemoryStore, count: u64) -> Result<Order> {
        run(store, "buyer", |tx| {
            make_order(tx, AssetClass::Material, &id("material.m1"), "LCD", count, 100)
        })
    }

    fn balance(store: &MemoryStore, role: &str) -> u64 {
        run(store, "x", |tx| balance::balance_of(tx, &id(role))).unwrap()
    }

    #[test]
    fn test_make_order_escrows_amount() {
        let store = seeded();
        let order = order_lcd(&store, 10).unwrap();

        assert_eq!(order.amount, 1000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(balance(&store, "buyer"), 4000);

        let stored = run(&store, "x", |tx| get_order(tx, &order.order_id)).unwrap();
        assert_eq!(stored, order);
        let last = store.audit_log().unwrap().pop().unwrap();
        assert_eq!(last.name, EventName::MakeOrder);
        assert_eq!(last.payload["amount"], 1000);
    }

    #[test]
    fn test_make_order_price_checks() {
        let store = seeded();
        let err = run(&store, "buyer", |tx| {
            make_order(tx, AssetClass::Material, &id("material.m1"), "LCD", 1, 99)
        })
        .unwrap_err();
        assert!(matches!(err, Error::PriceMismatch { offered: 99, listed: 100 }));

        let err = run(&store, "buyer", |tx| {
            make_order(tx, AssetClass::Product, &id("material.m1"), "LCD", 1, 100)
        })
        .unwrap_err();
        assert!(matches!(err, Error::PriceNotSet { .. }));
        assert_eq!(balance(&store, "buyer"), 5000);
    }

    #[test]
    fn test_make_order_rejects_bad_input() {
        let store = seeded();
        assert!(matches!(order_lcd(&store, 0).unwrap_err(), Error::InvalidArguments(_)));

        let err = run(&store, "material.m1", |tx| {
            make_order(tx, AssetClass::Material, &id("material.m1"), "LCD", 1, 100)
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTransfer(_)));

        let err = order_lcd(&store, u64::MAX).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn test_make_order_insufficient_balance_creates_nothing() {
        let store = seeded();
        let err = order_lcd(&store, 51).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance { available: 5000, requested: 5100, .. }
        ));
        // seed events only
        assert_eq!(store.audit_log().unwrap().len(), 3);
    }

    #[test]
    fn test_confirm_moves_goods_and_pays_producer() {
        let store = seeded();
        let order = order_lcd(&store, 10).unwrap();

        let confirmed = run(&store, "buyer", |tx| confirm_order(tx, &order.order_id)).unwrap();
        assert_eq!(confirmed.status, OrderStatus::Settled);
        assert_eq!(confirmed.resolution, Some(OrderResolution::Confirmed));
        assert!(confirmed.settled_at.is_some());

        assert_eq!(balance(&store, "material.m1"), 1000);
        assert_eq!(balance(&store, "buyer"), 4000);
        let (seller, buyer) = run(&store, "x", |tx| {
            Ok((
                inventory::material_held(tx, &id("material.m1"), "LCD")?,
                inventory::material_held(tx, &id("buyer"), "LCD")?,
            ))
        })
        .unwrap();
        assert_eq!((seller, buyer), (290, 10));

        // the nested transfer event is replaced by the confirm event
        let last = store.audit_log().unwrap().pop().unwrap();
        assert_eq!(last.name, EventName::ConfirmOrder);
    }

    #[test]
    fn test_confirm_requires_payer_and_pending() {
        let store = seeded();
        let order = order_lcd(&store, 1).unwrap();

        let err = run(&store, "material.m1", |tx| confirm_order(tx, &order.order_id))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        run(&store, "buyer", |tx| confirm_order(tx, &order.order_id)).unwrap();
        let err = run(&store, "buyer", |tx| confirm_order(tx, &order.order_id)).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        let err = run(&store, "buyer", |tx| cancel_order(tx, &order.order_id)).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let err = run(&store, "buyer", |tx| confirm_order(tx, "missing")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_confirm_fails_whole_call_when_producer_short() {
        let store = seeded();
        let order = order_lcd(&store, 10).unwrap();
        run(&store, "material.m1", |tx| inventory::consume_material(tx, "LCD", 295)).unwrap();

        let err = run(&store, "buyer", |tx| confirm_order(tx, &order.order_id)).unwrap_err();
        assert!(matches!(err, Error::InsufficientInventory { available: 5, .. }));

        let stored = run(&store, "x", |tx| get_order(tx, &order.order_id)).unwrap();
        assert!(stored.is_pending());
        assert_eq!(balance(&store, "material.m1"), 0);
    }

    #[test]
    fn test_confirm_product_order_moves_units() {
        let store = seeded();
        for unit in ["TV-1", "TV-2", "TV-3"] {
            run(&store, "product.p1", |tx| {
                product::register_product(tx, "TV", unit, "PB-1", &["B1".to_string()])
            })
            .unwrap();
        }
        run(&store, "product.p1", |tx| catalog::set_price(tx, AssetClass::Product, "TV", 700))
            .unwrap();

        let order = run(&store, "buyer", |tx| {
            make_order(tx, AssetClass::Product, &id("product.p1"), "TV", 2, 800)
        })
        .unwrap();
        assert_eq!(order.amount, 1400);
        run(&store, "buyer", |tx| confirm_order(tx, &order.order_id)).unwrap();

        let tv1 = run(&store, "x", |tx| product::get_product(tx, "TV-1")).unwrap();
        let tv3 = run(&store, "x", |tx| product::get_product(tx, "TV-3")).unwrap();
        assert_eq!(tv1.owner, id("buyer"));
        assert_eq!(tv3.owner, id("product.p1"));
        assert_eq!(balance(&store, "product.p1"), 1400);
    }

    #[test]
    fn test_payer_cancel_splits_by_ratio() {
        let store = seeded();
        run(&store, "payment", |tx| set_cancel_compensate(tx, 50)).unwrap();
        run(&store, "material.m1", |tx| {
            catalog::set_price(tx, AssetClass::Material, "LCD", 101)
        })
        .unwrap();

        let order = run(&store, "buyer", |tx| {
            make_order(tx, AssetClass::Material, &id("material.m1"), "LCD", 1, 101)
        })
        .unwrap();
        let cancelled = run(&store, "buyer", |tx| cancel_order(tx, &order.order_id)).unwrap();

        assert_eq!(
            cancelled.resolution,
            Some(OrderResolution::Cancelled {
                cancelled_by: id("buyer"),
                return_to_payer: 51,
                pay_to_producer: 50,
            })
        );
        assert_eq!(balance(&store, "buyer"), 4950);
        assert_eq!(balance(&store, "material.m1"), 50);

        let last = store.audit_log().unwrap().pop().unwrap();
        assert_eq!(last.name, EventName::CancelOrder);
        assert_eq!(last.payload["returnToPayer"], 51);
        assert_eq!(last.payload["payToProducer"], 50);
    }

    #[test]
    fn test_producer_cancel_refunds_in_full() {
        let store = seeded();
        run(&store, "payment", |tx| set_cancel_compensate(tx, 50)).unwrap();
        let order = order_lcd(&store, 3).unwrap();

        run(&store, "material.m1", |tx| cancel_order(tx, &order.order_id)).unwrap();
        assert_eq!(balance(&store, "buyer"), 5000);
        assert_eq!(balance(&store, "material.m1"), 0);
    }

    #[test]
    fn test_third_party_cannot_cancel() {
        let store = seeded();
        let order = order_lcd(&store, 1).unwrap();
        let err = run(&store, "product.p1", |tx| cancel_order(tx, &order.order_id)).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_cancel_compensate_default_and_authority() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, "x", |tx| cancel_compensate(tx)).unwrap(), 0);

        let err = run(&store, "buyer", |tx| set_cancel_compensate(tx, 10)).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        let err = run(&store, "payment", |tx| set_cancel_compensate(tx, 101)).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));

        run(&store, "payment", |tx| set_cancel_compensate(tx, 25)).unwrap();
        assert_eq!(run(&store, "x", |tx| cancel_compensate(tx)).unwrap(), 25);
    }

    #[test]
    fn test_split_escrow() {
        assert_eq!(split_escrow(100, 50), (50, 50));
        assert_eq!(split_escrow(101, 50), (51, 50));
        assert_eq!(split_escrow(100, 0), (100, 0));
        assert_eq!(split_escrow(100, 100), (0, 100));
        assert_eq!(split_escrow(u64::MAX, 100), (0, u64::MAX));
    }
}
