//! # Reports
//!
//! Aggregations over committed sales and the batch ledger. Voided sales are
//! excluded everywhere.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::BatchLedger;
use crate::money::Money;
use crate::types::{Item, Sale, SaleStatus};

fn completed<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> impl Iterator<Item = &'a Sale> {
    sales
        .into_iter()
        .filter(|s| s.status == SaleStatus::Completed)
}

/// What an employee earned over a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionPayout {
    pub employee_id: String,
    pub lines: usize,
    /// Revenue of the lines the employee performed.
    pub revenue: Money,
    pub commission: Money,
}

/// Commission owed per employee, ordered by employee id.
pub fn commission_payouts<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Vec<CommissionPayout> {
    let mut by_employee: BTreeMap<&str, CommissionPayout> = BTreeMap::new();

    for line in completed(sales).flat_map(|s| s.items.iter()) {
        let payout = by_employee
            .entry(line.employee_id.as_str())
            .or_insert_with(|| CommissionPayout {
                employee_id: line.employee_id.clone(),
                lines: 0,
                revenue: Money::zero(),
                commission: Money::zero(),
            });
        payout.lines += 1;
        payout.revenue += line.total;
        payout.commission += line.commission_amount;
    }

    by_employee.into_values().collect()
}

/// Revenue, cost and margin over a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilitySummary {
    pub sales: usize,
    /// Σ subtotal (pre-tax).
    pub revenue: Money,
    pub tax: Money,
    pub cogs: Money,
    /// revenue − cogs
    pub gross_margin: Money,
    pub commission: Money,
    pub owner_share: Money,
    /// owner_share − cogs
    pub owner_net: Money,
}

pub fn profitability<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> ProfitabilitySummary {
    let mut summary = ProfitabilitySummary::default();

    for sale in completed(sales) {
        summary.sales += 1;
        summary.revenue += sale.subtotal;
        summary.tax += sale.tax;
        summary.cogs += sale.cogs_total();
        for line in &sale.items {
            summary.commission += line.commission_amount;
            summary.owner_share += line.owner_amount;
        }
    }

    summary.gross_margin = summary.revenue - summary.cogs;
    summary.owner_net = summary.owner_share - summary.cogs;
    summary
}

/// Shelf value of one item, from its remaining batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockValuation {
    pub item_id: String,
    pub name: String,
    pub stock: i64,
    /// Units still carried by batches (may differ from `stock`).
    #[ts(as = "String")]
    pub batch_quantity: Decimal,
    pub average_cost: Money,
    pub value: Money,
}

/// Valuation for every physical item, in the order given.
pub fn stock_valuation<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    ledger: &BatchLedger,
) -> Vec<StockValuation> {
    items
        .into_iter()
        .filter(|item| item.is_physical())
        .map(|item| StockValuation {
            item_id: item.id.clone(),
            name: item.name.clone(),
            stock: item.stock,
            batch_quantity: ledger.available_quantity(&item.id),
            average_cost: ledger.current_average_cost(&item.id),
            value: ledger.stock_value(&item.id),
        })
        .collect()
}

/// Physical items at or below their reorder threshold.
pub fn low_stock<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a Item> {
    items.into_iter().filter(|i| i.needs_reorder()).collect()
}
