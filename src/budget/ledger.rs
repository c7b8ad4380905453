//! Budget ledgers, requests, expenses, and the forecast projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-workspace record of allocated vs. used funds.
///
/// `used <= allocated` is a health signal, not a write-time constraint:
/// pending expenses may push the projection past the allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLedger {
    pub workspace_id: Uuid,
    pub allocated: i64,
    pub used: i64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

/// Status of a budget request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl BudgetRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetRequestStatus::Pending => "pending",
            BudgetRequestStatus::Approved => "approved",
            BudgetRequestStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for BudgetRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BudgetRequestStatus::Pending),
            "approved" => Ok(BudgetRequestStatus::Approved),
            "rejected" => Ok(BudgetRequestStatus::Rejected),
            _ => Err(format!("Invalid budget request status: {}", s)),
        }
    }
}

/// A child workspace's request for funds from an ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub id: Uuid,
    pub requesting_workspace_id: Uuid,
    pub target_workspace_id: Uuid,
    pub requested_amount: i64,
    pub reason: String,
    pub status: BudgetRequestStatus,
    pub requested_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status of an expense record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Recorded but not yet settled; counts toward the projection only
    Pending,
    /// Settled; its amount has moved into the ledger's `used`
    Settled,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Settled => "settled",
        }
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExpenseStatus::Pending),
            "settled" => Ok(ExpenseStatus::Settled),
            _ => Err(format!("Invalid expense status: {}", s)),
        }
    }
}

/// A recorded expense against one workspace's budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub amount: i64,
    pub description: String,
    pub status: ExpenseStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

/// Advisory health band for a workspace's budget utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Moderate,
    High,
    OverBudget,
}

impl HealthBand {
    /// Band for a utilization ratio: <0.6 healthy, 0.6-0.79 moderate,
    /// 0.8-0.99 high, >=1.0 over budget.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 1.0 {
            HealthBand::OverBudget
        } else if ratio >= 0.8 {
            HealthBand::High
        } else if ratio >= 0.6 {
            HealthBand::Moderate
        } else {
            HealthBand::Healthy
        }
    }
}

/// Read-only derived view of a workspace's budget position. Advisory
/// output only; never blocks a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetForecast {
    pub workspace_id: Uuid,
    pub allocated: i64,
    pub used: i64,
    pub pending_expenses: i64,
    pub projected_spend: i64,
    pub utilization: f64,
    pub projected_utilization: f64,
    pub health: HealthBand,
}

impl BudgetForecast {
    /// Build the projection from ledger figures and the pending-expense
    /// total. With nothing allocated, any spend counts as over-budget and
    /// a zero spend is healthy.
    pub fn compute(workspace_id: Uuid, allocated: i64, used: i64, pending_expenses: i64) -> Self {
        let projected_spend = used + pending_expenses;
        let ratio = |spend: i64| -> f64 {
            if allocated > 0 {
                spend as f64 / allocated as f64
            } else if spend > 0 {
                f64::INFINITY
            } else {
                0.0
            }
        };
        let utilization = ratio(used);
        let projected_utilization = ratio(projected_spend);
        Self {
            workspace_id,
            allocated,
            used,
            pending_expenses,
            projected_spend,
            utilization,
            projected_utilization,
            health: HealthBand::from_ratio(projected_utilization),
        }
    }
}
