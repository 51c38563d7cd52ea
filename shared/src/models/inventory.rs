//! Inventory ledger and physical-count models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::validation::{ensure_non_negative, ensure_positive_quantity};

/// Warning threshold applied when a new line does not specify one
pub const DEFAULT_WARNING_THRESHOLD: i32 = 10;

/// Stock of one plate in one batch.
///
/// This is the single mutable source of truth for on-hand quantity; every
/// quantity change goes through [`receive`](Self::receive),
/// [`withdraw`](Self::withdraw) or [`InventoryCheck::reconcile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLine {
    pub id: Uuid,
    pub plate_id: Uuid,
    pub quantity: i32,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub warning_threshold: i32,
    pub last_updated: NaiveDateTime,
}

/// Derived stock figures reported alongside a line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockFigures {
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub defective_quantity: i32,
    pub low_stock: bool,
}

/// A line is low on stock when at or below its threshold
pub fn is_low_stock(quantity: i32, warning_threshold: i32) -> bool {
    quantity <= warning_threshold
}

impl InventoryLine {
    /// Open a new line for a first receipt of (plate, batch)
    pub fn open(
        plate_id: Uuid,
        batch_number: Option<String>,
        location: Option<String>,
        warning_threshold: Option<i32>,
        quantity: i32,
        now: NaiveDateTime,
    ) -> DomainResult<Self> {
        ensure_positive_quantity("quantity", quantity)?;
        let warning_threshold = warning_threshold.unwrap_or(DEFAULT_WARNING_THRESHOLD);
        ensure_non_negative("warning_threshold", warning_threshold)?;

        Ok(Self {
            id: Uuid::new_v4(),
            plate_id,
            quantity,
            location,
            batch_number,
            warning_threshold,
            last_updated: now,
        })
    }

    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.quantity, self.warning_threshold)
    }

    pub fn figures(&self) -> StockFigures {
        StockFigures {
            available_quantity: self.quantity,
            reserved_quantity: 0,
            defective_quantity: 0,
            low_stock: self.is_low_stock(),
        }
    }

    /// Fail unless the line holds at least `requested` units
    pub fn ensure_covers(&self, requested: i32) -> DomainResult<()> {
        if self.quantity < requested {
            return Err(DomainError::InsufficientStock {
                requested,
                available: self.quantity,
            });
        }
        Ok(())
    }

    /// Add received stock
    pub fn receive(&mut self, quantity: i32, now: NaiveDateTime) -> DomainResult<()> {
        ensure_positive_quantity("quantity", quantity)?;
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::QuantityOverflow {
                field: "quantity".to_string(),
            })?;
        self.last_updated = now;
        Ok(())
    }

    /// Remove stock; never lets the quantity go below zero
    pub fn withdraw(&mut self, quantity: i32, now: NaiveDateTime) -> DomainResult<()> {
        ensure_positive_quantity("quantity", quantity)?;
        self.ensure_covers(quantity)?;
        self.quantity -= quantity;
        self.last_updated = now;
        Ok(())
    }
}

/// Immutable result of a physical count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryCheck {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub expected_quantity: i32,
    pub actual_quantity: i32,
    pub difference: i32,
    pub checker_id: Uuid,
    pub check_time: NaiveDateTime,
    pub note: Option<String>,
}

impl InventoryCheck {
    /// Record a count and overwrite the line with the counted quantity.
    ///
    /// The line quantity is replaced, not adjusted by a delta.
    pub fn reconcile(
        line: &mut InventoryLine,
        actual_quantity: i32,
        checker_id: Uuid,
        note: Option<String>,
        now: NaiveDateTime,
    ) -> DomainResult<Self> {
        ensure_non_negative("actual_quantity", actual_quantity)?;

        let expected_quantity = line.quantity;
        let check = Self {
            id: Uuid::new_v4(),
            inventory_id: line.id,
            expected_quantity,
            actual_quantity,
            difference: actual_quantity - expected_quantity,
            checker_id,
            check_time: now,
            note,
        };

        line.quantity = actual_quantity;
        line.last_updated = now;
        Ok(check)
    }
}
