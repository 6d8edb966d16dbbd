//! Typed payloads for the dashboard resource groups.
//!
//! Snapshots are immutable values replaced wholesale; equality is structural
//! (`PartialEq` over the full shape), which is what lets the snapshot store
//! suppress no-op commits without serializing anything.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SyncError};

/// One named periodic fetch-and-commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskId {
    Summary,
    Chart,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Summary => write!(f, "summary"),
            TaskId::Chart => write!(f, "chart"),
        }
    }
}

/// Aggregation window for usage analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl Default for ChartPeriod {
    fn default() -> Self {
        ChartPeriod::Weekly
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartPeriod::Weekly => write!(f, "weekly"),
            ChartPeriod::Monthly => write!(f, "monthly"),
            ChartPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

/// A top-up or adjustment recorded by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub device_id: String,
    pub units: Decimal,
    pub amount: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A meter flagged by the server as running critically low
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowUnitsMeter {
    pub device_id: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub units_remaining: Decimal,
}

/// Latest known good payload for the summary resource group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummarySnapshot {
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub recent_transactions: Vec<Transaction>,
    #[serde(default)]
    pub low_units_meters: Vec<LowUnitsMeter>,
}

/// One point in the usage analytics series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub units_used: f64,
    #[serde(default)]
    pub topup_units: f64,
}

/// Latest known good payload for the chart resource group.
/// Carries the parameters it was fetched with so a period/filter change is a
/// structural change even when the series itself looks identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub period: ChartPeriod,
    pub meter_filter: String,
    pub points: Vec<ChartPoint>,
}

/// Request body for assigning an unassigned meter to a user
#[derive(Debug, Clone, Serialize)]
pub struct AssignMeterRequest {
    pub user_id: String,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Request body for an admin-side unit adjustment (top-up or deduction)
#[derive(Debug, Clone, Serialize)]
pub struct AdjustUnitsRequest {
    pub device_id: String,
    pub units: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// Maximum units an admin may add or deduct in a single adjustment
pub const MAX_ADJUST_UNITS: i64 = 10_000;

/// Device IDs are 5-20 characters: letters, digits, hyphens, underscores
pub fn validate_device_id(device_id: &str) -> Result<()> {
    let trimmed = device_id.trim();
    let len_ok = (5..=20).contains(&trimmed.len());
    let chars_ok = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(SyncError::Validation(format!(
            "invalid device id '{}': expected 5-20 alphanumeric/hyphen/underscore characters",
            device_id
        )))
    }
}

/// Adjustments must be non-zero and within the per-action cap (either sign)
pub fn validate_adjust_units(units: Decimal) -> Result<()> {
    if units == Decimal::ZERO {
        return Err(SyncError::Validation(
            "adjustment must be non-zero".to_string(),
        ));
    }
    if units.abs() > Decimal::from(MAX_ADJUST_UNITS) {
        return Err(SyncError::Validation(format!(
            "adjustment of {} units exceeds the {} unit cap",
            units, MAX_ADJUST_UNITS
        )));
    }
    Ok(())
}
