use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::temporal::DateParts;

pub const COL_ACCOUNT_ID: &str = "account_id";
pub const COL_DATE: &str = "date";
pub const COL_OPERATION: &str = "operation";
pub const COL_AMOUNT: &str = "amount";
pub const COL_BALANCE: &str = "balance";

/// Columns the temporal, account and operation stages need.
pub const REQUIRED_COLUMNS: &[&str] = &[
    COL_AMOUNT,
    COL_BALANCE,
    COL_DATE,
    COL_ACCOUNT_ID,
    COL_OPERATION,
];

pub const DEFAULT_ACCOUNT_ID: i64 = 5740;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    #[serde(rename = "CASH WITHDRAWAL")]
    CashWithdrawal,
    #[serde(rename = "REMITTANCE TO ANOTHER BANK")]
    RemittanceToAnotherBank,
    #[serde(rename = "CREDIT IN CASH")]
    CreditInCash,
    #[serde(rename = "COLLECTION FROM ANOTHER BANK")]
    CollectionFromAnotherBank,
    #[serde(rename = "CREDIT CARD WITHDRAWAL")]
    CreditCardWithdrawal,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::CashWithdrawal,
        Operation::RemittanceToAnotherBank,
        Operation::CreditInCash,
        Operation::CollectionFromAnotherBank,
        Operation::CreditCardWithdrawal,
    ];

    /// The label exactly as it appears in the `operation` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CashWithdrawal => "CASH WITHDRAWAL",
            Self::RemittanceToAnotherBank => "REMITTANCE TO ANOTHER BANK",
            Self::CreditInCash => "CREDIT IN CASH",
            Self::CollectionFromAnotherBank => "COLLECTION FROM ANOTHER BANK",
            Self::CreditCardWithdrawal => "CREDIT CARD WITHDRAWAL",
        }
    }

    /// Short kebab-case key accepted on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CashWithdrawal => "cash-withdrawal",
            Self::RemittanceToAnotherBank => "remittance",
            Self::CreditInCash => "credit-in-cash",
            Self::CollectionFromAnotherBank => "collection",
            Self::CreditCardWithdrawal => "card-withdrawal",
        }
    }

    pub fn next(&self) -> Operation {
        let idx = Self::ALL.iter().position(|o| o == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Operation {
        let idx = Self::ALL.iter().position(|o| o == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Operation {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Operation::ALL
            .iter()
            .find(|op| op.label().eq_ignore_ascii_case(s) || op.key().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ScopeError::UnknownOperation(s.to_string()))
    }
}

/// Typed view of one row, used by the temporal stages.
#[derive(Debug, Clone)]
pub struct Record {
    pub account_id: Option<i64>,
    pub date: DateParts,
    pub operation: Option<String>,
    pub amount: Option<f64>,
    pub balance: Option<f64>,
}
