//! # Rates and Roles
//!
//! Two lookup tables the settlement consults for every line.
//!
//! ## Commission Rate Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(employee, item)                                                │
//! │        │                                                                │
//! │        ├── override for (employee, item)? ──► yes ──► RateSource::Override
//! │        │                                                                │
//! │        ├── item has a category with a rate? ──► yes ──► RateSource::Category
//! │        │                                                                │
//! │        └── neither ──► None (sale rejected)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Role Eligibility
//! Which roles may perform items of a category is data, not code: the back
//! office maps each category to a set of role names. A category with no
//! entry (or an empty set) accepts any role.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Category, EmployeeService, Item};
use crate::validation::clamp_rate;

// =============================================================================
// Rate Book
// =============================================================================

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Override,
    Category,
}

/// A commission percentage with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    pub rate: Decimal,
    pub source: RateSource,
}

/// Category defaults plus per-(employee, item) overrides.
///
/// Every rate is clamped to `0..=100` on the way in.
#[derive(Debug, Clone, Default)]
pub struct RateBook {
    category_rates: HashMap<String, Decimal>,
    overrides: HashMap<(String, String), Decimal>,
}

impl RateBook {
    pub fn new() -> Self {
        RateBook::default()
    }

    /// Builds a rate book from stored categories and employee services.
    pub fn from_records<'a>(
        categories: impl IntoIterator<Item = &'a Category>,
        services: impl IntoIterator<Item = &'a EmployeeService>,
    ) -> Self {
        let mut book = RateBook::new();
        for category in categories {
            book.set_category_rate(&category.id, category.commission_rate);
        }
        for service in services {
            book.set_override(&service.employee_id, &service.item_id, service.commission_rate);
        }
        book
    }

    pub fn set_category_rate(&mut self, category_id: &str, rate: Decimal) {
        self.category_rates
            .insert(category_id.to_string(), clamp_rate(rate));
    }

    pub fn set_override(&mut self, employee_id: &str, item_id: &str, rate: Decimal) {
        self.overrides.insert(
            (employee_id.to_string(), item_id.to_string()),
            clamp_rate(rate),
        );
    }

    pub fn remove_override(&mut self, employee_id: &str, item_id: &str) -> Option<Decimal> {
        self.overrides
            .remove(&(employee_id.to_string(), item_id.to_string()))
    }

    /// Override first, then the item's category default.
    pub fn resolve(&self, employee_id: &str, item: &Item) -> Option<ResolvedRate> {
        if let Some(rate) = self
            .overrides
            .get(&(employee_id.to_string(), item.id.clone()))
        {
            return Some(ResolvedRate {
                rate: *rate,
                source: RateSource::Override,
            });
        }

        item.category_id
            .as_ref()
            .and_then(|category_id| self.category_rates.get(category_id))
            .map(|rate| ResolvedRate {
                rate: *rate,
                source: RateSource::Category,
            })
    }
}

// =============================================================================
// Role Eligibility
// =============================================================================

/// Category → eligible role names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleEligibility {
    roles: HashMap<String, HashSet<String>>,
}

impl RoleEligibility {
    pub fn new() -> Self {
        RoleEligibility::default()
    }

    /// Builds the mapping from `(category_id, role)` pairs.
    pub fn from_pairs<C, R>(pairs: impl IntoIterator<Item = (C, R)>) -> Self
    where
        C: Into<String>,
        R: Into<String>,
    {
        let mut eligibility = RoleEligibility::new();
        for (category, role) in pairs {
            eligibility.allow(category, role);
        }
        eligibility
    }

    pub fn allow(&mut self, category_id: impl Into<String>, role: impl Into<String>) {
        self.roles
            .entry(category_id.into())
            .or_default()
            .insert(role.into());
    }

    /// Roles allowed for a category; `None` means unrestricted.
    pub fn roles_for(&self, category_id: &str) -> Option<&HashSet<String>> {
        self.roles.get(category_id).filter(|set| !set.is_empty())
    }

    pub fn is_eligible(&self, category_id: Option<&str>, role: &str) -> bool {
        match category_id.and_then(|c| self.roles_for(c)) {
            Some(allowed) => allowed.contains(role),
            None => true,
        }
    }
}
