//! Aluminum plate catalog models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit of measure used when none is given (one sheet)
pub const DEFAULT_PLATE_UNIT: &str = "张";

/// A plate definition; (model, specification) is unique
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Plate {
    pub id: Uuid,
    pub model: String,
    pub specification: String,
    pub unit: String,
    pub supplier: Option<String>,
    pub note: Option<String>,
}

impl Plate {
    /// Human-readable label, e.g. `6061 - 10mm`
    pub fn label(&self) -> String {
        plate_label(&self.model, &self.specification)
    }
}

pub fn plate_label(model: &str, specification: &str) -> String {
    format!("{} - {}", model, specification)
}

/// Pick the unit for a new plate, falling back to sheets
pub fn unit_or_default(unit: Option<&str>) -> String {
    match unit.map(str::trim) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => DEFAULT_PLATE_UNIT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        assert_eq!(plate_label("6061", "10mm"), "6061 - 10mm");
    }

    #[test]
    fn test_unit_default() {
        assert_eq!(unit_or_default(None), "张");
        assert_eq!(unit_or_default(Some("  ")), "张");
        assert_eq!(unit_or_default(Some("kg")), "kg");
    }
}
