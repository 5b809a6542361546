//! # Sale Settlement
//!
//! Turns a cart into a committed sale: validates it, drains stock, costs
//! physical lines, splits every line's revenue, and hands back the full set
//! of mutations for the caller to persist atomically.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Building ──settle()──► Validating ──ok──► Settling ──► Committed     │
//! │                              │                                          │
//! │                              └──fail──► Rejected                        │
//! │                                                                         │
//! │   Validating (no mutation)          Settling (per line, cart order)    │
//! │   ─────────────────────────         ───────────────────────────────     │
//! │   • item exists                     • physical: drain batches → COGS   │
//! │   • stock covers Σ qty per item     •           stock -= qty           │
//! │   • employee assigned               •           Usage record           │
//! │   • employee on roster, active,     •           averageCost refreshed  │
//! │     role eligible                   • split revenue at resolved rate   │
//! │   • commission rate resolvable      • subtotal += line total           │
//! │   • batch cover (Reject policy)     then tax, total                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! The settler holds no transaction. It works on copies of the state it was
//! given and only writes them back once every line has settled, so a failed
//! settlement leaves [`SettlementState`] untouched. The caller is expected
//! to wrap loading the state, settling, and persisting [`SettledSale`] in one
//! database transaction.
//!
//! ## Batch Shortfall
//! When the ledger cannot cost every unit sold, the uncovered units are
//! handled per [`ShortfallPolicy`]: costed at zero (default), costed at the
//! item's last average cost, or (checked during validation) rejected.
//! Item stock always decrements by the full quantity.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cart::Cart;
use crate::commission::split;
use crate::error::{CoreError, CoreResult};
use crate::ledger::BatchLedger;
use crate::money::Money;
use crate::roles::{RateBook, RoleEligibility};
use crate::types::{
    Employee, InventoryBatch, InventoryRecord, InventoryRecordKind, Item, Sale, SaleItem,
    SaleStatus, SettlementConfig, ShortfallPolicy,
};
use crate::validation::validate_quantity;

// =============================================================================
// Phase
// =============================================================================

/// Where a settlement is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPhase {
    Building,
    Validating,
    Settling,
    Committed,
    Rejected,
}

impl SettlementPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementPhase::Committed | SettlementPhase::Rejected)
    }
}

impl fmt::Display for SettlementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettlementPhase::Building => "building",
            SettlementPhase::Validating => "validating",
            SettlementPhase::Settling => "settling",
            SettlementPhase::Committed => "committed",
            SettlementPhase::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

// =============================================================================
// State In, Mutations Out
// =============================================================================

/// Everything a settlement reads and mutates.
///
/// The caller loads it (typically only the items, batches, employees and
/// rates the cart touches) and owns it before and after.
#[derive(Debug, Clone, Default)]
pub struct SettlementState {
    pub items: HashMap<String, Item>,
    pub employees: HashMap<String, Employee>,
    pub ledger: BatchLedger,
    pub rates: RateBook,
    pub eligibility: RoleEligibility,
}

impl SettlementState {
    pub fn new() -> Self {
        SettlementState::default()
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees.insert(employee.id.clone(), employee);
        self
    }

    pub fn with_batch(mut self, batch: InventoryBatch) -> Self {
        self.ledger.load(batch);
        self
    }
}

/// A committed sale and every mutation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledSale {
    pub sale: Sale,
    /// One `Usage` record per physical line, in cart order.
    pub inventory_records: Vec<InventoryRecord>,
    /// Items whose stock / average cost changed.
    pub updated_items: Vec<Item>,
    /// Batches whose remaining quantity changed.
    pub updated_batches: Vec<InventoryBatch>,
}

/// A line that passed validation, with its rate already resolved.
struct ValidatedLine<'c> {
    item_id: &'c str,
    employee_id: &'c str,
    quantity: i64,
    rate: Decimal,
}

// =============================================================================
// Settler
// =============================================================================

/// Drives one sale through its lifecycle.
///
/// A settler is single-use: once committed or rejected it refuses further
/// calls with `InvalidPhase`.
#[derive(Debug)]
pub struct SaleSettler {
    config: SettlementConfig,
    phase: SettlementPhase,
    date: DateTime<Utc>,
}

impl SaleSettler {
    pub fn new(config: SettlementConfig) -> Self {
        SaleSettler {
            config,
            phase: SettlementPhase::Building,
            date: Utc::now(),
        }
    }

    /// Overrides the sale timestamp (back-dated entries, tests).
    pub fn at(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn phase(&self) -> SettlementPhase {
        self.phase
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    fn transition(&mut self, next: SettlementPhase) {
        debug!(from = %self.phase, to = %next, "Settlement phase change");
        self.phase = next;
    }

    /// Validates and settles `cart` against `state`.
    ///
    /// On success `state` reflects the drained batches and decremented
    /// stock and the returned [`SettledSale`] lists the same mutations for
    /// persistence. On error `state` is unchanged.
    pub fn settle(&mut self, cart: &Cart, state: &mut SettlementState) -> CoreResult<SettledSale> {
        if self.phase != SettlementPhase::Building {
            return Err(CoreError::InvalidPhase {
                current: self.phase.to_string(),
                expected: SettlementPhase::Building.to_string(),
            });
        }

        self.transition(SettlementPhase::Validating);
        let lines = match self.validate(cart, state) {
            Ok(lines) => lines,
            Err(err) => {
                info!(error = %err, "Sale rejected");
                self.transition(SettlementPhase::Rejected);
                return Err(err);
            }
        };

        self.transition(SettlementPhase::Settling);
        let settled = self.apply(cart, &lines, state)?;

        self.transition(SettlementPhase::Committed);
        info!(
            sale_id = %settled.sale.id,
            lines = settled.sale.items.len(),
            subtotal = %settled.sale.subtotal,
            total = %settled.sale.total,
            cogs = %settled.sale.cogs_total(),
            method = %self.config.costing_method,
            "Sale settled"
        );
        Ok(settled)
    }

    // =========================================================================
    // Validating
    // =========================================================================

    fn validate<'c>(
        &self,
        cart: &'c Cart,
        state: &SettlementState,
    ) -> CoreResult<Vec<ValidatedLine<'c>>> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        // Cumulative so two lines of the same product cannot each pass alone
        let mut requested: HashMap<&str, i64> = HashMap::new();
        let mut lines = Vec::with_capacity(cart.lines().len());

        for (index, line) in cart.lines().iter().enumerate() {
            validate_quantity(line.quantity)?;

            let item = state
                .items
                .get(&line.item_id)
                .ok_or_else(|| CoreError::ItemNotFound(line.item_id.clone()))?;

            if item.is_physical() {
                let total = requested.entry(item.id.as_str()).or_insert(0);
                *total += line.quantity;

                if *total > item.stock {
                    return Err(CoreError::InsufficientStock {
                        item_id: item.id.clone(),
                        available: item.stock,
                        requested: *total,
                    });
                }

                if self.config.shortfall == ShortfallPolicy::Reject {
                    let available = state.ledger.available_quantity(&item.id);
                    let wanted = Decimal::from(*total);
                    if wanted > available {
                        return Err(CoreError::InsufficientBatchStock {
                            item_id: item.id.clone(),
                            available,
                            requested: wanted,
                        });
                    }
                }
            }

            if !line.has_employee() {
                return Err(CoreError::MissingEmployeeAssignment {
                    line: index,
                    item_id: line.item_id.clone(),
                });
            }

            let employee = state
                .employees
                .get(&line.employee_id)
                .ok_or_else(|| CoreError::EmployeeNotFound(line.employee_id.clone()))?;

            if !employee.active
                || !state
                    .eligibility
                    .is_eligible(item.category_id.as_deref(), &employee.role)
            {
                return Err(CoreError::EmployeeNotEligible {
                    employee_id: employee.id.clone(),
                    role: employee.role.clone(),
                    item_id: item.id.clone(),
                });
            }

            let resolved = state.rates.resolve(&employee.id, item).ok_or_else(|| {
                CoreError::CommissionRateNotFound {
                    employee_id: employee.id.clone(),
                    item_id: item.id.clone(),
                }
            })?;

            lines.push(ValidatedLine {
                item_id: &line.item_id,
                employee_id: &line.employee_id,
                quantity: line.quantity,
                rate: resolved.rate,
            });
        }

        debug!(lines = lines.len(), "Cart validated");
        Ok(lines)
    }

    // =========================================================================
    // Settling
    // =========================================================================

    fn apply(
        &self,
        cart: &Cart,
        lines: &[ValidatedLine<'_>],
        state: &mut SettlementState,
    ) -> CoreResult<SettledSale> {
        let sale_id = Uuid::new_v4().to_string();
        let method = self.config.costing_method;

        let mut ledger = state.ledger.clone();
        let mut items: HashMap<String, Item> = HashMap::new();
        let mut touched_items: Vec<String> = Vec::new();
        let mut touched_batches: Vec<String> = Vec::new();

        let mut sale_items = Vec::with_capacity(lines.len());
        let mut records = Vec::new();
        let mut subtotal = Money::zero();

        // Shortfall fallback stays at the pre-sale average even after an
        // earlier line of the same item has drained the ledger.
        let pre_sale_cost: HashMap<&str, Money> = lines
            .iter()
            .filter_map(|line| state.items.get(line.item_id))
            .map(|item| (item.id.as_str(), item.average_cost))
            .collect();

        for line in lines {
            if !items.contains_key(line.item_id) {
                let item = state
                    .items
                    .get(line.item_id)
                    .cloned()
                    .ok_or_else(|| CoreError::ItemNotFound(line.item_id.to_string()))?;
                items.insert(item.id.clone(), item);
            }
            let item = items
                .get_mut(line.item_id)
                .ok_or_else(|| CoreError::ItemNotFound(line.item_id.to_string()))?;

            let line_total = item.price.multiply_quantity(line.quantity);

            let cogs_total = if item.is_physical() {
                let quantity = Decimal::from(line.quantity);
                let fallback_cost = pre_sale_cost
                    .get(item.id.as_str())
                    .copied()
                    .unwrap_or(item.average_cost);
                let drained = ledger.drain_available(&item.id, quantity, method);

                let mut cogs = drained.costing.total_cost;
                if drained.shortfall > Decimal::ZERO {
                    let absorbed = match self.config.shortfall {
                        ShortfallPolicy::AverageCost => fallback_cost.multiply_decimal(drained.shortfall),
                        _ => Money::zero(),
                    };
                    warn!(
                        item_id = %item.id,
                        shortfall = %drained.shortfall,
                        policy = %self.config.shortfall,
                        absorbed_cost = %absorbed,
                        "Batch stock short of sale quantity"
                    );
                    cogs += absorbed;
                }

                item.stock -= line.quantity;
                item.average_cost = ledger.current_average_cost(&item.id);

                for used in &drained.costing.used_batches {
                    if !touched_batches.contains(&used.batch_id) {
                        touched_batches.push(used.batch_id.clone());
                    }
                }
                if !touched_items.contains(&item.id) {
                    touched_items.push(item.id.clone());
                }

                records.push(InventoryRecord {
                    id: Uuid::new_v4().to_string(),
                    item_id: item.id.clone(),
                    kind: InventoryRecordKind::Usage,
                    quantity,
                    outbound: true,
                    unit_cost: Money::from_decimal(cogs.to_decimal() / quantity),
                    total_cost: cogs,
                    cogs_total: Some(cogs),
                    used_batches: drained.costing.used_batches,
                    sale_id: Some(sale_id.clone()),
                    notes: None,
                    date: self.date,
                });

                debug!(item_id = %item.id, quantity = line.quantity, cogs = %cogs, "Line costed");
                Some(cogs)
            } else {
                None
            };

            let shares = split(line_total, line.rate)?;
            subtotal += line_total;

            sale_items.push(SaleItem {
                item_id: item.id.clone(),
                name: item.name.clone(),
                employee_id: line.employee_id.to_string(),
                quantity: line.quantity,
                price: item.price,
                total: line_total,
                commission_rate: line.rate,
                commission_amount: shares.commission_amount,
                owner_amount: shares.owner_amount,
                cogs_total,
            });
        }

        let tax = subtotal.calculate_tax(self.config.tax_rate);
        let sale = Sale {
            id: sale_id,
            date: self.date,
            customer_id: cart.customer_id().map(str::to_string),
            items: sale_items,
            subtotal,
            tax,
            total: subtotal + tax,
            costing_method: method,
            status: SaleStatus::Completed,
        };

        let updated_batches = ledger
            .batches_by_id(&touched_batches)
            .into_iter()
            .cloned()
            .collect();
        let updated_items: Vec<Item> = touched_items
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .collect();

        // Every line settled; publish the mutations
        state.ledger = ledger;
        for item in &updated_items {
            state.items.insert(item.id.clone(), item.clone());
        }

        Ok(SettledSale {
            sale,
            inventory_records: records,
            updated_items,
            updated_batches,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchKind, CostingMethod, TaxRate};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::days(n)
    }

    fn batch(id: &str, item_id: &str, qty: Decimal, cost_cents: i64, on: i64) -> InventoryBatch {
        InventoryBatch {
            id: id.to_string(),
            item_id: item_id.to_string(),
            quantity: qty,
            remaining_quantity: qty,
            unit_cost: Money::from_cents(cost_cents),
            kind: BatchKind::Purchase,
            date: day(on),
        }
    }

    fn shampoo(stock: i64) -> Item {
        Item {
            id: "shampoo".to_string(),
            name: "Shampoo".to_string(),
            category_id: Some("retail".to_string()),
            price: Money::from_cents(2500),
            is_service: false,
            stock,
            average_cost: Money::from_cents(1000),
            reorder_threshold: 5,
        }
    }

    fn haircut() -> Item {
        Item {
            id: "haircut".to_string(),
            name: "Haircut".to_string(),
            category_id: Some("hair".to_string()),
            price: Money::from_cents(4000),
            is_service: true,
            stock: 0,
            average_cost: Money::zero(),
            reorder_threshold: 0,
        }
    }

    fn employee(id: &str, role: &str) -> Employee {
        Employee {
            id: id.to_string(),
            name: id.to_uppercase(),
            role: role.to_string(),
            active: true,
        }
    }

    fn salon_state() -> SettlementState {
        let mut state = SettlementState::new()
            .with_item(shampoo(50))
            .with_item(haircut())
            .with_employee(employee("e1", "stylist"))
            .with_employee(employee("e2", "nail_technician"))
            .with_batch(batch("b1", "shampoo", dec!(50), 1000, 0));
        state.rates.set_category_rate("retail", dec!(95));
        state.rates.set_category_rate("hair", dec!(50));
        state.eligibility.allow("hair", "stylist");
        state
    }

    fn cart(lines: &[(&str, &str, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (item, employee, qty) in lines {
            cart.add_line(*item, *employee, *qty).unwrap();
        }
        cart
    }

    fn settle(config: SettlementConfig, cart: &Cart, state: &mut SettlementState) -> CoreResult<SettledSale> {
        SaleSettler::new(config).at(day(10)).settle(cart, state)
    }

    #[test]
    fn test_shampoo_end_to_end() {
        let mut state = salon_state();
        let settled = settle(
            SettlementConfig::default(),
            &cart(&[("shampoo", "e1", 2)]),
            &mut state,
        )
        .unwrap();

        let line = &settled.sale.items[0];
        assert_eq!(line.total, Money::from_cents(5000));
        assert_eq!(line.commission_amount, Money::from_cents(4750));
        assert_eq!(line.owner_amount, Money::from_cents(250));
        assert_eq!(line.cogs_total, Some(Money::from_cents(2000)));

        let record = &settled.inventory_records[0];
        assert_eq!(record.kind, InventoryRecordKind::Usage);
        assert_eq!(record.cogs_total, Some(Money::from_cents(2000)));
        assert_eq!(record.unit_cost, Money::from_cents(1000));
        assert_eq!(record.used_batches.len(), 1);
        assert_eq!(record.used_batches[0].quantity, dec!(2));
        assert_eq!(record.sale_id.as_deref(), Some(settled.sale.id.as_str()));

        let item = &state.items["shampoo"];
        assert_eq!(item.stock, 48);
        assert_eq!(item.average_cost, Money::from_cents(1000));
        assert_eq!(state.ledger.available_quantity("shampoo"), dec!(48));

        assert_eq!(settled.updated_items.len(), 1);
        assert_eq!(settled.updated_batches[0].remaining_quantity, dec!(48));

        // 10% legacy tax
        assert_eq!(settled.sale.subtotal, Money::from_cents(5000));
        assert_eq!(settled.sale.tax, Money::from_cents(500));
        assert_eq!(settled.sale.total, Money::from_cents(5500));
    }

    #[test]
    fn test_phases_advance_to_committed() {
        let mut state = salon_state();
        let mut settler = SaleSettler::new(SettlementConfig::default());
        assert_eq!(settler.phase(), SettlementPhase::Building);

        settler.settle(&cart(&[("haircut", "e1", 1)]), &mut state).unwrap();
        assert_eq!(settler.phase(), SettlementPhase::Committed);
        assert!(settler.phase().is_terminal());

        let again = settler.settle(&cart(&[("haircut", "e1", 1)]), &mut state);
        assert!(matches!(again, Err(CoreError::InvalidPhase { .. })));
    }

    #[test]
    fn test_insufficient_stock_rejects_without_mutation() {
        let mut state = salon_state();
        let mut settler = SaleSettler::new(SettlementConfig::default());

        let result = settler.settle(
            &cart(&[("haircut", "e1", 1), ("shampoo", "e1", 51)]),
            &mut state,
        );

        assert_eq!(
            result,
            Err(CoreError::InsufficientStock {
                item_id: "shampoo".to_string(),
                available: 50,
                requested: 51,
            })
        );
        assert_eq!(settler.phase(), SettlementPhase::Rejected);
        assert_eq!(state.items["shampoo"].stock, 50);
        assert_eq!(state.ledger.available_quantity("shampoo"), dec!(50));
    }

    #[test]
    fn test_stock_check_is_cumulative_across_lines() {
        let mut state = salon_state();
        state.items.insert("shampoo".to_string(), shampoo(3));

        let result = settle(
            SettlementConfig::default(),
            &cart(&[("shampoo", "e1", 2), ("shampoo", "e1", 2)]),
            &mut state,
        );
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock { requested: 4, .. })
        ));
    }

    #[test]
    fn test_missing_employee_rejects() {
        let mut state = salon_state();
        let result = settle(
            SettlementConfig::default(),
            &cart(&[("shampoo", "e1", 1), ("haircut", "", 1)]),
            &mut state,
        );

        assert_eq!(
            result,
            Err(CoreError::MissingEmployeeAssignment {
                line: 1,
                item_id: "haircut".to_string(),
            })
        );
        assert_eq!(state.items["shampoo"].stock, 50);
    }

    #[test]
    fn test_roster_and_role_checks() {
        let mut state = salon_state();

        let unknown = settle(SettlementConfig::default(), &cart(&[("haircut", "ghost", 1)]), &mut state);
        assert_eq!(unknown, Err(CoreError::EmployeeNotFound("ghost".to_string())));

        let wrong_role = settle(SettlementConfig::default(), &cart(&[("haircut", "e2", 1)]), &mut state);
        assert!(matches!(wrong_role, Err(CoreError::EmployeeNotEligible { .. })));

        state.employees.get_mut("e1").unwrap().active = false;
        let inactive = settle(SettlementConfig::default(), &cart(&[("haircut", "e1", 1)]), &mut state);
        assert!(matches!(inactive, Err(CoreError::EmployeeNotEligible { .. })));
    }

    #[test]
    fn test_unknown_item_and_missing_rate() {
        let mut state = salon_state();
        let missing = settle(SettlementConfig::default(), &cart(&[("perm", "e1", 1)]), &mut state);
        assert_eq!(missing, Err(CoreError::ItemNotFound("perm".to_string())));

        let mut no_rates = salon_state();
        no_rates.rates = RateBook::new();
        let result = settle(SettlementConfig::default(), &cart(&[("haircut", "e1", 1)]), &mut no_rates);
        assert!(matches!(result, Err(CoreError::CommissionRateNotFound { .. })));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let mut state = salon_state();
        let result = settle(SettlementConfig::default(), &Cart::new(), &mut state);
        assert_eq!(result, Err(CoreError::EmptyCart));
    }

    #[test]
    fn test_override_rate_takes_precedence() {
        let mut state = salon_state();
        state.rates.set_override("e1", "haircut", dec!(70));

        let settled = settle(SettlementConfig::default(), &cart(&[("haircut", "e1", 1)]), &mut state).unwrap();
        let line = &settled.sale.items[0];
        assert_eq!(line.commission_rate, dec!(70));
        assert_eq!(line.commission_amount, Money::from_cents(2800));
        assert_eq!(line.owner_amount, Money::from_cents(1200));
    }

    #[test]
    fn test_services_are_never_costed() {
        let mut state = salon_state();
        let settled = settle(SettlementConfig::default(), &cart(&[("haircut", "e1", 2)]), &mut state).unwrap();

        assert!(settled.inventory_records.is_empty());
        assert!(settled.updated_batches.is_empty());
        assert!(settled.updated_items.is_empty());
        assert_eq!(settled.sale.items[0].cogs_total, None);
        assert_eq!(settled.sale.cogs_total(), Money::zero());
    }

    #[test]
    fn test_one_usage_record_per_physical_line() {
        let mut state = salon_state();
        let settled = settle(
            SettlementConfig::default(),
            &cart(&[("shampoo", "e1", 1), ("haircut", "e1", 1), ("shampoo", "e1", 3)]),
            &mut state,
        )
        .unwrap();

        assert_eq!(settled.sale.items.len(), 3);
        assert_eq!(settled.inventory_records.len(), 2);
        assert_eq!(settled.inventory_records[1].quantity, dec!(3));
        assert_eq!(settled.updated_items.len(), 1);
        assert_eq!(state.items["shampoo"].stock, 46);
    }

    #[test]
    fn test_stock_decrements_even_without_batches() {
        let mut state = salon_state();
        state.ledger = BatchLedger::new();

        let settled = settle(SettlementConfig::default(), &cart(&[("shampoo", "e1", 4)]), &mut state).unwrap();

        assert_eq!(state.items["shampoo"].stock, 46);
        assert_eq!(settled.sale.items[0].cogs_total, Some(Money::zero()));
        assert!(settled.inventory_records[0].used_batches.is_empty());
        // ledger has nothing left to average
        assert_eq!(state.items["shampoo"].average_cost, Money::zero());
    }

    #[test]
    fn test_shortfall_costed_at_zero_by_default() {
        let mut state = salon_state().with_item(shampoo(10));
        state.ledger = BatchLedger::from_batches([batch("b2", "shampoo", dec!(3), 2000, 1)]);

        let settled = settle(SettlementConfig::default(), &cart(&[("shampoo", "e1", 5)]), &mut state).unwrap();

        // only the 3 batch units are costed
        assert_eq!(settled.sale.items[0].cogs_total, Some(Money::from_cents(6000)));
        assert_eq!(state.items["shampoo"].stock, 5);
    }

    #[test]
    fn test_shortfall_costed_at_average_when_configured() {
        let mut state = salon_state().with_item(shampoo(10));
        state.ledger = BatchLedger::from_batches([batch("b2", "shampoo", dec!(3), 2000, 1)]);
        let config = SettlementConfig {
            shortfall: ShortfallPolicy::AverageCost,
            ..SettlementConfig::default()
        };

        let settled = settle(config, &cart(&[("shampoo", "e1", 5)]), &mut state).unwrap();

        // 3 @ $20 from the batch + 2 @ $10 last known average
        assert_eq!(settled.sale.items[0].cogs_total, Some(Money::from_cents(8000)));
    }

    #[test]
    fn test_average_cost_shortfall_same_across_split_lines() {
        let config = SettlementConfig {
            shortfall: ShortfallPolicy::AverageCost,
            ..SettlementConfig::default()
        };
        let cheap_state = || {
            let mut state = salon_state().with_item(shampoo(10));
            state.ledger = BatchLedger::from_batches([batch("b2", "shampoo", dec!(3), 1000, 1)]);
            state
        };

        let mut state = cheap_state();
        let single = settle(config, &cart(&[("shampoo", "e1", 5)]), &mut state).unwrap();

        let mut state = cheap_state();
        let split = settle(config, &cart(&[("shampoo", "e1", 3), ("shampoo", "e1", 2)]), &mut state).unwrap();

        assert_eq!(single.sale.cogs_total(), Money::from_cents(5000));
        assert_eq!(split.sale.cogs_total(), Money::from_cents(5000));
        // second line is all shortfall, costed at the pre-sale $10
        assert_eq!(split.sale.items[1].cogs_total, Some(Money::from_cents(2000)));
        assert_eq!(state.items["shampoo"].stock, 5);
    }

    #[test]
    fn test_shortfall_rejected_when_configured() {
        let mut state = salon_state().with_item(shampoo(10));
        state.ledger = BatchLedger::from_batches([batch("b2", "shampoo", dec!(3), 2000, 1)]);
        let config = SettlementConfig {
            shortfall: ShortfallPolicy::Reject,
            ..SettlementConfig::default()
        };

        let result = settle(config, &cart(&[("shampoo", "e1", 5)]), &mut state);
        assert!(matches!(result, Err(CoreError::InsufficientBatchStock { .. })));
        assert_eq!(state.items["shampoo"].stock, 10);
        assert_eq!(state.ledger.available_quantity("shampoo"), dec!(3));
    }

    #[test]
    fn test_weighted_average_method_and_custom_tax() {
        let mut state = salon_state().with_item(shampoo(15));
        state.ledger = BatchLedger::from_batches([
            batch("b1", "shampoo", dec!(5), 1000, 0),
            batch("b2", "shampoo", dec!(5), 2000, 1),
            batch("b3", "shampoo", dec!(5), 3000, 2),
        ]);
        let config = SettlementConfig {
            costing_method: CostingMethod::WeightedAverage,
            tax_rate: TaxRate::from_bps(825),
            shortfall: ShortfallPolicy::ZeroCost,
        };

        let settled = settle(config, &cart(&[("shampoo", "e1", 7)]), &mut state).unwrap();

        assert_eq!(settled.sale.items[0].cogs_total, Some(Money::from_cents(14000)));
        assert_eq!(settled.sale.costing_method, CostingMethod::WeightedAverage);
        assert_eq!(settled.updated_batches.len(), 3);
        assert_eq!(state.ledger.available_quantity("shampoo"), dec!(8));
        assert_eq!(state.items["shampoo"].average_cost, Money::from_cents(2000));
        // $175.00 × 8.25% = $14.4375 → $14.44
        assert_eq!(settled.sale.tax, Money::from_cents(1444));
    }

    #[test]
    fn test_customer_carried_onto_sale() {
        let mut state = salon_state();
        let mut c = cart(&[("haircut", "e1", 1)]);
        c.set_customer(Some("cust-7".to_string()));

        let settled = settle(SettlementConfig::default(), &c, &mut state).unwrap();
        assert_eq!(settled.sale.customer_id.as_deref(), Some("cust-7"));
        assert_eq!(settled.sale.date, day(10));
    }

    #[test]
    fn test_every_line_reconciles() {
        let mut state = salon_state();
        state.rates.set_category_rate("hair", dec!(33.33));
        let settled = settle(
            SettlementConfig::default(),
            &cart(&[("haircut", "e1", 3), ("shampoo", "e1", 7)]),
            &mut state,
        )
        .unwrap();

        for line in &settled.sale.items {
            assert_eq!(line.commission_amount + line.owner_amount, line.total);
        }
    }
}
