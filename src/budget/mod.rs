//! Budget request workflow and ledger forecasting

pub mod engine;
pub mod ledger;

pub use engine::BudgetWorkflowEngine;
pub use ledger::{
    BudgetForecast, BudgetLedger, BudgetRequest, BudgetRequestStatus, Expense, ExpenseStatus,
    HealthBand,
};
