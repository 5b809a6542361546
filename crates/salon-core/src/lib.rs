//! # salon-core: Revenue Sharing and Inventory Costing for Salon POS
//!
//! This crate is the **heart** of the salon POS. Every sale passes through
//! it: lines are split between the performing employee and the owner, and
//! physical products are costed against the batches they were bought in.
//! Everything here is pure logic with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front desk / back office (CRUD screens)            │   │
//! │  │    Cart UI ──► Checkout ──► Reports (payouts, margin, stock)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  ledger   │  │  costing  │  │commission │  │   │
//! │  │   │  round2   │  │  batches  │  │   FIFO    │  │   split   │  │   │
//! │  │   │   Money   │  │  drain    │  │  W-Avg    │  │ remainder │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │ settlement: Building → Validating → Settling → Committed │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    salon-db (Database Layer)                    │   │
//! │  │     SQLite repositories, transactional checkout, migrations     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `round2` and the integer-cent Money type
//! - [`ledger`] - Per-item batch ledger (add, drain, average cost)
//! - [`costing`] - FIFO and weighted-average COGS policies
//! - [`commission`] - Employee/owner revenue split
//! - [`roles`] - Commission rate resolution and role eligibility
//! - [`settlement`] - The sale settlement state machine
//! - [`cart`] - Cart assembly (Building phase)
//! - [`inventory`] - Manual stock movements (purchases, usage, adjustments)
//! - [`reports`] - Payouts, profitability, stock valuation
//! - [`types`] - Domain types (Item, InventoryBatch, Sale, etc.)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: state comes in, mutations come out; the caller
//!    decides the transaction boundary
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64); decimal
//!    intermediates only become Money through `round2`
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use salon_core::commission::split;
//! use salon_core::money::Money;
//!
//! // Two bottles of shampoo at $25.00, stylist earns 95%
//! let line_total = Money::from_cents(2500).multiply_quantity(2);
//! let shares = split(line_total, Decimal::from(95)).unwrap();
//!
//! assert_eq!(shares.commission_amount.cents(), 4750);
//! assert_eq!(shares.owner_amount.cents(), 250);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod commission;
pub mod costing;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod money;
pub mod reports;
pub mod roles;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use salon_core::Money` instead of
// `use salon_core::money::Money`

pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::BatchLedger;
pub use money::{round2, Money};
pub use settlement::{SaleSettler, SettledSale, SettlementPhase, SettlementState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// A salon visit rarely exceeds a handful of services; anything near this
/// is a stuck key or a script gone wrong.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity on a single cart line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;
