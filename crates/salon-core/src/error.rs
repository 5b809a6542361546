//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API layer (400 / 500)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fatal vs. Absorbed
//! | Error                       | Settlement behavior                        |
//! |-----------------------------|--------------------------------------------|
//! | `InsufficientStock`         | Sale rejected, nothing mutated             |
//! | `MissingEmployeeAssignment` | Sale rejected, nothing mutated             |
//! | `InsufficientBatchStock`    | Absorbed per `ShortfallPolicy`             |
//! | `InvalidRate`               | Sale rejected, nothing mutated             |

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Item referenced by a cart line or stock movement does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Requested quantity exceeds the item's authoritative stock.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cart: Shampoo × 5
    ///      │
    ///      ▼
    /// Item.stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { item_id: "shampoo", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// A cart line has no employee assigned.
    #[error("Line {line} ({item_id}) has no employee assigned")]
    MissingEmployeeAssignment { line: usize, item_id: String },

    /// The batch ledger cannot cost the full drain request.
    ///
    /// Not fatal to a sale: the settlement absorbs it per the configured
    /// shortfall policy. Callers draining stock directly decide themselves.
    #[error("Insufficient batch stock for {item_id}: available {available}, requested {requested}")]
    InsufficientBatchStock {
        item_id: String,
        available: Decimal,
        requested: Decimal,
    },

    /// A commission rate outside [0, 100] reached the calculator.
    #[error("Commission rate {0} is outside 0..=100")]
    InvalidRate(Decimal),

    /// The assigned employee is not on the roster.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),

    /// The assigned employee is inactive or holds a role the item's
    /// category does not allow.
    #[error("Employee {employee_id} ({role}) cannot perform {item_id}")]
    EmployeeNotEligible {
        employee_id: String,
        role: String,
        item_id: String,
    },

    /// Neither an employee override nor a category default applies.
    #[error("No commission rate for employee {employee_id} on {item_id}")]
    CommissionRateNotFound {
        employee_id: String,
        item_id: String,
    },

    /// Stock movements apply to physical items only.
    #[error("{0} is a service and carries no stock")]
    ServiceHasNoStock(String),

    /// Checkout of a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A settlement was driven out of order (e.g. settled twice).
    #[error("Settlement is {current}, expected {expected}")]
    InvalidPhase { current: String, expected: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether this is a data/business-rule violation that should be shown
    /// to the user (HTTP 400 equivalent) rather than treated as a fault.
    ///
    /// None of these are retryable.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, CoreError::InvalidPhase { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unknown enum string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
