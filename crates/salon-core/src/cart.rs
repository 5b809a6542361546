//! # Cart
//!
//! The Building phase of a sale: lines are assembled here with no side
//! effects. Nothing in the cart is checked against stock or the roster;
//! that happens when the cart is handed to the settlement.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Front desk action        Cart operation           Cart change          │
//! │  ─────────────────        ──────────────           ───────────          │
//! │                                                                         │
//! │  Add service/product ───► add_line() ─────────────► lines.push(line)   │
//! │  Reassign stylist ──────► set_employee() ─────────► lines[i].employee  │
//! │  Remove line ───────────► remove_line() ──────────► lines.remove(i)    │
//! │  Pick customer ─────────► set_customer() ─────────► customer_id        │
//! │                                                                         │
//! │  Checkout ──────────────► SaleSettler::settle(&cart, ...)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a grocery cart, the same item may appear on several lines: two
//! stylists can each perform a blow-dry in the same visit, and each line
//! earns its own commission.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::validation::{validate_cart_size, validate_quantity, validate_required};

/// A requested transaction line.
///
/// `employee_id` may be empty while the front desk is still assigning
/// staff; settlement rejects such lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: String,
    pub employee_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(item_id: impl Into<String>, employee_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            item_id: item_id.into(),
            employee_id: employee_id.into(),
            quantity,
        }
    }

    /// Whether an employee has been assigned.
    pub fn has_employee(&self) -> bool {
        !self.employee_id.trim().is_empty()
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Every line has quantity in `1..=999`
/// - At most 100 lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    customer_id: Option<String>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Appends a line. The employee may be assigned later.
    ///
    /// ## Returns
    /// Index of the new line.
    pub fn add_line(
        &mut self,
        item_id: impl Into<String>,
        employee_id: impl Into<String>,
        quantity: i64,
    ) -> CoreResult<usize> {
        let item_id = item_id.into();
        validate_required("item_id", &item_id)?;
        validate_quantity(quantity)?;
        validate_cart_size(self.lines.len())?;

        self.lines.push(CartLine::new(item_id, employee_id, quantity));
        Ok(self.lines.len() - 1)
    }

    /// Changes the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            self.remove_line(index);
            return Ok(());
        }
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Assigns (or reassigns) the employee performing a line.
    pub fn set_employee(&mut self, index: usize, employee_id: impl Into<String>) {
        if let Some(line) = self.lines.get_mut(index) {
            line.employee_id = employee_id.into();
        }
    }

    /// Removes a line by index. Out-of-range indexes are ignored.
    pub fn remove_line(&mut self, index: usize) -> Option<CartLine> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    pub fn set_customer(&mut self, customer_id: Option<String>) {
        self.customer_id = customer_id;
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distinct item ids in first-seen order.
    pub fn item_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for line in &self.lines {
            if !ids.contains(&line.item_id.as_str()) {
                ids.push(&line.item_id);
            }
        }
        ids
    }

    /// Distinct employee ids (non-empty only).
    pub fn employee_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for line in self.lines.iter().filter(|l| l.has_employee()) {
            if !ids.contains(&line.employee_id.as_str()) {
                ids.push(&line.employee_id);
            }
        }
        ids
    }

    /// Clears all lines and the customer.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.customer_id = None;
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        Cart {
            lines: iter.into_iter().collect(),
            customer_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_add_line() {
        let mut cart = Cart::new();
        let idx = cart.add_line("shampoo", "e1", 2).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_same_item_on_two_lines_stays_separate() {
        let mut cart = Cart::new();
        cart.add_line("blowdry", "e1", 1).unwrap();
        cart.add_line("blowdry", "e2", 1).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_ids(), vec!["blowdry"]);
        assert_eq!(cart.employee_ids(), vec!["e1", "e2"]);
    }

    #[test]
    fn test_employee_can_be_assigned_later() {
        let mut cart = Cart::new();
        let idx = cart.add_line("cut", "", 1).unwrap();
        assert!(!cart.lines()[idx].has_employee());

        cart.set_employee(idx, "e3");
        assert!(cart.lines()[idx].has_employee());
    }

    #[test]
    fn test_invalid_quantity_rejected() {
        let mut cart = Cart::new();
        assert!(cart.add_line("cut", "e1", 0).is_err());
        assert!(cart.add_line("cut", "e1", 1000).is_err());
        assert!(cart.add_line("", "e1", 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_line("cut", "e1", 1).unwrap();
        cart.update_quantity(0, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_line("cut", "e1", 1).unwrap();
        cart.set_customer(Some("c1".to_string()));
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.customer_id(), None);
    }
}
