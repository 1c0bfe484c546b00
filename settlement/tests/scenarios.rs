//! End-to-end scenarios through the string entry points
//!
//! Each test drives an executor the way the host does: function name,
//! string arguments, caller identity, fresh request id.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use supply_ledger_core::{AuthorityConfig, EventName, MemoryStore, Metrics};
use supply_settlement::{Executor, Invocation, Receipt, Result};

struct Ledger {
    executor: Executor,
    next_request: u64,
}

impl Ledger {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            executor: Executor::new(store, AuthorityConfig::default(), Metrics::new().unwrap()),
            next_request: 0,
        }
    }

    fn call(&mut self, caller: &str, function: &str, args: &[&str]) -> Result<Receipt> {
        self.next_request += 1;
        self.executor.invoke(&Invocation {
            function: function.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            caller: caller.to_string(),
            request_id: format!("tx-{:04}", self.next_request),
            timestamp: Utc::now(),
        })
    }

    fn ok(&mut self, caller: &str, function: &str, args: &[&str]) -> Value {
        self.call(caller, function, args).unwrap().payload
    }

    fn code(&mut self, caller: &str, function: &str, args: &[&str]) -> &'static str {
        self.call(caller, function, args).unwrap_err().code()
    }

    fn balance(&mut self, role: &str) -> u64 {
        self.ok(role, "balanceOf", &[role])[role].as_u64().unwrap()
    }

    fn materials(&mut self, owner: &str) -> Value {
        self.ok(owner, "getMyMaterials", &[])
    }
}

/// m1 holds 300 LCD listed at 100; buyer holds 5000
fn seeded() -> Ledger {
    let mut ledger = Ledger::new();
    ledger.ok("material.m1", "registerMaterial", &["LCD", "300", "B1"]);
    ledger.ok("material.m1", "setMaterialPrice", &["LCD", "100"]);
    ledger.ok("payment", "mint", &["buyer", "5000"]);
    ledger
}

#[test]
fn scenario_consume_then_overdraw() {
    let mut ledger = seeded();

    ledger.ok("material.m1", "consumeMaterial", &["LCD", "20"]);
    assert_eq!(ledger.materials("material.m1"), json!({ "LCD": 280 }));

    assert_eq!(
        ledger.code("material.m1", "consumeMaterial", &["LCD", "1000"]),
        "InsufficientInventory"
    );
    assert_eq!(ledger.materials("material.m1"), json!({ "LCD": 280 }));
}

#[test]
fn scenario_material_order_confirmed() {
    let mut ledger = seeded();

    let order = ledger.ok("buyer", "makeMaterialOrder", &["material.m1", "LCD", "10", "100"]);
    let order_id = order["orderId"].as_str().unwrap().to_string();
    assert_eq!(order["amount"], 1000);
    assert_eq!(order["status"], "Pending");
    assert_eq!(ledger.balance("buyer"), 4000);

    let receipt = ledger.call("buyer", "confirmOrder", &[order_id.as_str()]).unwrap();
    assert_eq!(receipt.event.unwrap().name, EventName::ConfirmOrder);

    assert_eq!(ledger.materials("buyer"), json!({ "LCD": 10 }));
    assert_eq!(ledger.materials("material.m1"), json!({ "LCD": 290 }));
    assert_eq!(ledger.balance("material.m1"), 1000);
    assert_eq!(ledger.balance("buyer"), 4000);

    let settled = ledger.ok("anyone", "getOrder", &[order_id.as_str()]);
    assert_eq!(settled["status"], "Settled");
    assert_eq!(settled["resolution"], "confirmed");

    assert_eq!(ledger.code("buyer", "confirmOrder", &[order_id.as_str()]), "InvalidState");
    assert_eq!(ledger.code("buyer", "cancelOrder", &[order_id.as_str()]), "InvalidState");
}

#[test]
fn scenario_cancel_splits() {
    let mut ledger = seeded();
    ledger.ok("payment", "setCancelCompensate", &["50"]);

    let order = ledger.ok("buyer", "makeMaterialOrder", &["material.m1", "LCD", "1", "100"]);
    let order_id = order["orderId"].as_str().unwrap().to_string();
    let receipt = ledger.call("buyer", "cancelOrder", &[order_id.as_str()]).unwrap();

    let event = receipt.event.unwrap();
    assert_eq!(event.name, EventName::CancelOrder);
    assert_eq!(
        event.payload,
        json!({ "orderId": order_id, "returnToPayer": 50, "payToProducer": 50 })
    );
    assert_eq!(ledger.balance("buyer"), 4950);
    assert_eq!(ledger.balance("material.m1"), 50);
}

#[test]
fn scenario_cancel_authorization() {
    let mut ledger = seeded();
    let order = ledger.ok("buyer", "makeMaterialOrder", &["material.m1", "LCD", "2", "150"]);
    let order_id = order["orderId"].as_str().unwrap().to_string();

    assert_eq!(ledger.code("material.m2", "cancelOrder", &[order_id.as_str()]), "Unauthorized");
    assert_eq!(ledger.code("material.m1", "confirmOrder", &[order_id.as_str()]), "Unauthorized");

    ledger.ok("material.m1", "cancelOrder", &[order_id.as_str()]);
    assert_eq!(ledger.balance("buyer"), 5000);
}

#[test]
fn scenario_duplicate_product_registration() {
    let mut ledger = seeded();
    ledger.ok("product.p1", "registerProduct", &["TV", "TV-0001", "PB-1", "B1"]);

    assert_eq!(
        ledger.code("product.p1", "registerProduct", &["PC", "TV-0001", "PB-2", "B9"]),
        "AlreadyExists"
    );

    let product = ledger.ok("anyone", "getProduct", &["TV-0001"]);
    assert_eq!(product["productKind"], "TV");
    assert_eq!(product["materialBatches"], json!(["B1"]));
    assert_eq!(ledger.ok("anyone", "traceMaterialBatch", &["B9"]), json!([]));
    assert_eq!(ledger.ok("anyone", "traceMaterialBatch", &["B1"]), json!(["TV-0001"]));
}

#[test]
fn scenario_product_order_moves_units() {
    let mut ledger = seeded();
    for id in ["TV-0001", "TV-0002", "TV-0003"] {
        ledger.ok("product.p1", "registerProduct", &["TV", id, "PB-1", "B1"]);
    }
    ledger.ok("product.p1", "setProductPrice", &["TV", "1200"]);
    assert_eq!(ledger.ok("buyer", "getProductPrice", &["product.p1", "TV"]), json!(1200));

    assert_eq!(
        ledger.code("buyer", "makeProductOrder", &["product.p1", "TV", "2", "1000"]),
        "PriceMismatch"
    );
    let order = ledger.ok("buyer", "makeProductOrder", &["product.p1", "TV", "2", "1500"]);
    assert_eq!(order["amount"], 2400);

    let order_id = order["orderId"].as_str().unwrap().to_string();
    ledger.ok("buyer", "confirmOrder", &[order_id.as_str()]);

    assert_eq!(ledger.ok("buyer", "getMyProducts", &[]), json!({ "TV": 2 }));
    assert_eq!(ledger.ok("product.p1", "getMyProducts", &[]), json!({ "TV": 1 }));
    assert_eq!(ledger.balance("product.p1"), 2400);
}

#[test]
fn scenario_burn_exact_and_clamped() {
    let mut ledger = seeded();

    assert_eq!(ledger.ok("payment", "burn", &["buyer", "1000"]), json!({ "burned": 1000 }));
    assert_eq!(ledger.balance("buyer"), 4000);

    assert_eq!(ledger.ok("payment", "burn", &["buyer", "9999"]), json!({ "burned": 4000 }));
    assert_eq!(ledger.balance("buyer"), 0);

    assert_eq!(ledger.code("buyer", "mint", &["buyer", "1"]), "Unauthorized");
}

#[test]
fn scenario_every_mutation_emits_one_event() {
    let mut ledger = seeded();
    ledger.ok("material.m1", "consumeMaterial", &["LCD", "1"]);
    ledger.code("material.m1", "consumeMaterial", &["LCD", "100000"]);
    ledger.ok("anyone", "getMaterialLot", &["B1"]);

    let names: Vec<EventName> = ledger
        .executor
        .audit_log()
        .unwrap()
        .into_iter()
        .map(|event| event.name)
        .collect();
    assert_eq!(
        names,
        vec![
            EventName::MaterialCreated,
            EventName::MaterialPriceSet,
            EventName::Mint,
            EventName::MaterialConsumed,
        ]
    );
}
