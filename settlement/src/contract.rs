//! Entry-point dispatch
//!
//! Every external call is a function name plus positional string arguments.
//! The contract holds a table of handlers keyed by name; each handler parses
//! its arguments, runs the ledger operation against the call's context and
//! renders the response as JSON.

use crate::engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use supply_ledger_core::{
    balance, catalog, inventory, product, AssetClass, Error, Identity, Result, TxContext,
};

/// Handler for one entry point
pub type Handler = fn(&mut TxContext<'_>, &[String]) -> Result<Value>;

/// Registered entry points
pub struct Contract {
    handlers: HashMap<&'static str, Handler>,
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("functions", &self.functions())
            .finish()
    }
}

impl Default for Contract {
    fn default() -> Self {
        Self::new()
    }
}

impl Contract {
    /// Contract with every supply-chain entry point registered
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();

        // material
        handlers.insert("registerMaterial", register_material);
        handlers.insert("consumeMaterial", consume_material);
        handlers.insert("setMaterialPrice", set_material_price);
        handlers.insert("getMaterialPrice", get_material_price);
        handlers.insert("getMyMaterials", get_my_materials);
        handlers.insert("getMaterialLot", get_material_lot);

        // product
        handlers.insert("setProductPrice", set_product_price);
        handlers.insert("getProductPrice", get_product_price);
        handlers.insert("registerProduct", register_product);
        handlers.insert("getMyProducts", get_my_products);
        handlers.insert("getProduct", get_product);
        handlers.insert("traceMaterialBatch", trace_material_batch);

        // orders
        handlers.insert("makeMaterialOrder", make_material_order);
        handlers.insert("makeProductOrder", make_product_order);
        handlers.insert("confirmOrder", confirm_order);
        handlers.insert("cancelOrder", cancel_order);
        handlers.insert("getOrder", get_order);

        // payment
        handlers.insert("setCancelCompensate", set_cancel_compensate);
        handlers.insert("mint", mint);
        handlers.insert("burn", burn);
        handlers.insert("balanceOf", balance_of);

        Self { handlers }
    }

    /// Run `function` against `tx`
    pub fn dispatch(
        &self,
        tx: &mut TxContext<'_>,
        function: &str,
        args: &[String],
    ) -> Result<Value> {
        let handler = self.handlers.get(function).ok_or_else(|| {
            Error::InvalidArguments(format!("unsupported function {:?}", function))
        })?;
        handler(tx, args)
    }

    /// True if `function` is registered
    pub fn contains(&self, function: &str) -> bool {
        self.handlers.contains_key(function)
    }

    /// Registered function names, sorted
    pub fn functions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn register_material(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [kind, quantity, batch_id] = exact::<3>(args)?;
    let lot = inventory::register_material(tx, kind, batch_id, number(quantity, "quantity")?)?;
    Ok(serde_json::to_value(lot)?)
}

fn consume_material(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [kind, quantity] = exact::<2>(args)?;
    inventory::consume_material(tx, kind, number(quantity, "quantity")?)?;
    Ok(Value::Null)
}

fn set_material_price(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    set_price(tx, AssetClass::Material, args)
}

fn set_product_price(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    set_price(tx, AssetClass::Product, args)
}

fn set_price(tx: &mut TxContext<'_>, asset: AssetClass, args: &[String]) -> Result<Value> {
    let [kind, price] = exact::<2>(args)?;
    catalog::set_price(tx, asset, kind, number(price, "price")?)?;
    Ok(Value::Null)
}

fn get_material_price(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    get_price(tx, AssetClass::Material, args)
}

fn get_product_price(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    get_price(tx, AssetClass::Product, args)
}

fn get_price(tx: &TxContext<'_>, asset: AssetClass, args: &[String]) -> Result<Value> {
    let [producer, kind] = exact::<2>(args)?;
    let price = catalog::get_price(tx, asset, &identity(producer)?, kind)?;
    Ok(json!(price))
}

fn get_my_materials(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [] = exact::<0>(args)?;
    let owner = tx.caller().clone();
    Ok(serde_json::to_value(inventory::material_holdings(tx, &owner)?)?)
}

fn get_my_products(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [] = exact::<0>(args)?;
    let owner = tx.caller().clone();
    Ok(serde_json::to_value(inventory::product_holdings(tx, &owner)?)?)
}

fn get_material_lot(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [batch_id] = exact::<1>(args)?;
    Ok(serde_json::to_value(inventory::get_material_lot(tx, batch_id)?)?)
}

fn register_product(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    // kind, productId, batchId, then at least one consumed material batch
    if args.len() < 4 {
        return Err(Error::InvalidArguments(format!(
            "expected at least 4 arguments, got {}",
            args.len()
        )));
    }
    let product = product::register_product(tx, &args[0], &args[1], &args[2], &args[3..])?;
    Ok(serde_json::to_value(product)?)
}

fn get_product(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [product_id] = exact::<1>(args)?;
    Ok(serde_json::to_value(product::get_product(tx, product_id)?)?)
}

fn trace_material_batch(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [batch_id] = exact::<1>(args)?;
    Ok(json!(product::trace_material_batch(tx, batch_id)?))
}

fn make_material_order(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    make_order(tx, AssetClass::Material, args)
}

fn make_product_order(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    make_order(tx, AssetClass::Product, args)
}

fn make_order(tx: &mut TxContext<'_>, class: AssetClass, args: &[String]) -> Result<Value> {
    let [producer, kind, count, max_price] = exact::<4>(args)?;
    let order = engine::make_order(
        tx,
        class,
        &identity(producer)?,
        kind,
        number(count, "count")?,
        number(max_price, "price")?,
    )?;
    Ok(serde_json::to_value(order)?)
}

fn confirm_order(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [order_id] = exact::<1>(args)?;
    engine::confirm_order(tx, non_empty(order_id, "orderId")?)?;
    Ok(Value::Null)
}

fn cancel_order(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [order_id] = exact::<1>(args)?;
    engine::cancel_order(tx, non_empty(order_id, "orderId")?)?;
    Ok(Value::Null)
}

fn get_order(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [order_id] = exact::<1>(args)?;
    let order = engine::get_order(tx, non_empty(order_id, "orderId")?)?;
    Ok(serde_json::to_value(order)?)
}

fn set_cancel_compensate(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [percent] = exact::<1>(args)?;
    let percent: u8 = percent
        .parse()
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| {
            Error::InvalidArguments(format!("cancel compensation must be 0-100, got {:?}", percent))
        })?;
    engine::set_cancel_compensate(tx, percent)?;
    Ok(Value::Null)
}

fn mint(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [role, amount] = exact::<2>(args)?;
    balance::mint(tx, &identity(role)?, number(amount, "amount")?)?;
    Ok(Value::Null)
}

fn burn(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [role, amount] = exact::<2>(args)?;
    let burned = balance::burn(tx, &identity(role)?, number(amount, "amount")?)?;
    Ok(json!({ "burned": burned }))
}

fn balance_of(tx: &mut TxContext<'_>, args: &[String]) -> Result<Value> {
    let [role] = exact::<1>(args)?;
    let amount = balance::balance_of(tx, &identity(role)?)?;
    Ok(json!({ role.as_str(): amount }))
}

/// Borrow exactly `N` arguments
fn exact<const N: usize>(args: &[String]) -> Result<&[String; N]> {
    args.try_into().map_err(|_| {
        Error::InvalidArguments(format!("expected {} arguments, got {}", N, args.len()))
    })
}

/// Parse an unsigned decimal argument
fn number(arg: &str, name: &str) -> Result<u64> {
    arg.parse()
        .map_err(|_| Error::InvalidArguments(format!("invalid {}, got {:?}", name, arg)))
}

fn identity(arg: &str) -> Result<Identity> {
    Identity::new(arg)
}

fn non_empty<'a>(arg: &'a str, name: &str) -> Result<&'a str> {
    if arg.is_empty() {
        return Err(Error::InvalidArguments(format!("{} is empty", name)));
    }
    Ok(arg)
}
