use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, ScopeError};
use crate::frame::{Frame, SourceInfo};
use crate::models::{
    Operation, Record, COL_ACCOUNT_ID, COL_AMOUNT, COL_BALANCE, COL_DATE, COL_OPERATION,
    DEFAULT_ACCOUNT_ID, REQUIRED_COLUMNS,
};
use crate::stats::{self, Describe, Histogram, MissingCount, OutlierReport};
use crate::temporal::decompose_date;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Params {
    pub account_id: i64,
    pub operation: Operation,
    pub bins: usize,
    pub iqr_multiplier: f64,
    pub preview_rows: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID,
            operation: Operation::default(),
            bins: stats::DEFAULT_BINS,
            iqr_multiplier: stats::DEFAULT_IQR_MULTIPLIER,
            preview_rows: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub amount: Describe,
    pub balance: Describe,
}

#[derive(Debug, Clone, Serialize)]
pub struct Distributions {
    pub amount: Histogram,
    pub balance: Histogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outliers {
    pub amount: OutlierReport,
    pub balance: OutlierReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: f64,
}

/// Balance history of one account: every balance as a line, and the
/// strictly negative ones as emphasised points on the same date axis.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSeries {
    pub account_id: i64,
    pub balances: Vec<BalancePoint>,
    pub negative: Vec<BalancePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationDistribution {
    pub operation: Operation,
    pub count: usize,
    pub histogram: Histogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemporalViews {
    pub amount_by_year: Vec<GroupTotal>,
    pub amount_by_month: Vec<GroupTotal>,
    pub amount_by_day: Vec<GroupTotal>,
    pub count_by_year: Vec<GroupCount>,
    pub count_by_month: Vec<GroupCount>,
    pub account: AccountSeries,
    pub operation: OperationDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    MissingColumns { columns: Vec<String> },
    NoAmountBalance,
    NoAccountData { account_id: i64 },
    NoOperationData { operation: Operation },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::MissingColumns { columns } => format!(
                "Missing required columns: {}. Time, account and operation analysis skipped.",
                columns.join(", ")
            ),
            Notice::NoAmountBalance => {
                "The data does not contain 'amount' and 'balance' columns.".to_string()
            }
            Notice::NoAccountData { account_id } => {
                format!("No data found for Account ID {account_id}")
            }
            Notice::NoOperationData { operation } => {
                format!("No transactions found for operation {operation}")
            }
        }
    }
}

/// A date that could not be decomposed. Everything computed before the
/// temporal stage is still reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateFailure {
    pub row: usize,
    pub value: String,
}

impl DateFailure {
    pub fn to_error(&self) -> ScopeError {
        ScopeError::InvalidDate {
            row: self.row,
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    pub params: Params,
    pub preview: Preview,
    pub missing: Vec<MissingCount>,
    pub summary: Option<Summary>,
    pub distributions: Option<Distributions>,
    pub outliers: Option<Outliers>,
    pub temporal: Option<TemporalViews>,
    pub notices: Vec<Notice>,
    pub date_failure: Option<DateFailure>,
}

impl Analysis {
    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = Some(source);
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run every stage over the held frame. Nothing is cached: callers rerun this
/// on each parameter change.
pub fn analyze(frame: &Frame, params: &Params) -> Result<Analysis> {
    let mut analysis = Analysis {
        source: None,
        params: params.clone(),
        preview: Preview {
            headers: frame.headers().to_vec(),
            rows: frame.rows().iter().take(params.preview_rows).cloned().collect(),
            total_rows: frame.len(),
        },
        missing: stats::missing_values(frame),
        summary: None,
        distributions: None,
        outliers: None,
        temporal: None,
        notices: Vec::new(),
        date_failure: None,
    };

    let amount = frame.numeric_column(COL_AMOUNT)?;
    let balance = frame.numeric_column(COL_BALANCE)?;
    let (Some(amount), Some(balance)) = (amount, balance) else {
        analysis.notices.push(Notice::NoAmountBalance);
        return Ok(analysis);
    };

    analysis.summary = Some(Summary {
        amount: stats::describe(&amount),
        balance: stats::describe(&balance),
    });

    let missing = frame.missing_columns(REQUIRED_COLUMNS);
    if !missing.is_empty() {
        warn!(?missing, "required columns absent, skipping downstream analysis");
        analysis.notices.push(Notice::MissingColumns { columns: missing });
        return Ok(analysis);
    }

    analysis.distributions = Some(Distributions {
        amount: stats::histogram(&amount, params.bins),
        balance: stats::histogram(&balance, params.bins),
    });
    analysis.outliers = Some(Outliers {
        amount: stats::outliers(COL_AMOUNT, &amount, params.iqr_multiplier),
        balance: stats::outliers(COL_BALANCE, &balance, params.iqr_multiplier),
    });

    let records = match build_records(frame, &amount, &balance) {
        Ok(records) => records,
        Err(ScopeError::InvalidDate { row, value }) => {
            warn!(row, %value, "invalid date, temporal analysis aborted");
            analysis.date_failure = Some(DateFailure { row, value });
            return Ok(analysis);
        }
        Err(e) => return Err(e),
    };

    let account = account_series(&records, params.account_id);
    if account.balances.is_empty() {
        analysis.notices.push(Notice::NoAccountData {
            account_id: params.account_id,
        });
    }
    let operation = operation_distribution(&records, params.operation, params.bins);
    if operation.count == 0 {
        analysis.notices.push(Notice::NoOperationData {
            operation: params.operation,
        });
    }

    analysis.temporal = Some(TemporalViews {
        amount_by_year: sum_by(&records, |r| r.date.year.as_str()),
        amount_by_month: sum_by(&records, |r| r.date.month.as_str()),
        amount_by_day: sum_by(&records, |r| r.date.day.as_str()),
        count_by_year: count_by(&records, |r| r.date.year.as_str()),
        count_by_month: count_by(&records, |r| r.date.month.as_str()),
        account,
        operation,
    });
    debug!(
        account_id = params.account_id,
        operation = %params.operation,
        "analysis complete"
    );
    Ok(analysis)
}

fn build_records(frame: &Frame, amount: &[Option<f64>], balance: &[Option<f64>]) -> Result<Vec<Record>> {
    let dates = frame.cells(COL_DATE).unwrap_or_default();
    let accounts = frame.integer_column(COL_ACCOUNT_ID)?.unwrap_or_default();
    let operations = frame.cells(COL_OPERATION).unwrap_or_default();

    (0..frame.len())
        .map(|i| {
            let raw = dates.get(i).copied().flatten().unwrap_or("");
            Ok(Record {
                account_id: accounts.get(i).copied().flatten(),
                date: decompose_date(raw, i + 1)?,
                operation: operations.get(i).copied().flatten().map(str::to_string),
                amount: amount.get(i).copied().flatten(),
                balance: balance.get(i).copied().flatten(),
            })
        })
        .collect()
}

/// Sum of `amount` per key, ascending by key. Missing amounts add nothing.
pub fn sum_by<F>(records: &[Record], key: F) -> Vec<GroupTotal>
where
    F: Fn(&Record) -> &str,
{
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        *groups.entry(key(r)).or_insert(0.0) += r.amount.unwrap_or(0.0);
    }
    groups
        .into_iter()
        .map(|(k, total)| GroupTotal {
            key: k.to_string(),
            total,
        })
        .collect()
}

/// Record count per key, ascending by key.
pub fn count_by<F>(records: &[Record], key: F) -> Vec<GroupCount>
where
    F: Fn(&Record) -> &str,
{
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *groups.entry(key(r)).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(k, count)| GroupCount {
            key: k.to_string(),
            count,
        })
        .collect()
}

pub fn account_series(records: &[Record], account_id: i64) -> AccountSeries {
    let mut matching: Vec<&Record> = records
        .iter()
        .filter(|r| r.account_id == Some(account_id))
        .collect();
    // stable: same-day records keep file order
    matching.sort_by_key(|r| r.date.date);

    let balances: Vec<BalancePoint> = matching
        .iter()
        .filter_map(|r| {
            r.balance.map(|balance| BalancePoint {
                date: r.date.date,
                balance,
            })
        })
        .collect();
    let negative = balances
        .iter()
        .filter(|p| p.balance < 0.0)
        .cloned()
        .collect();

    AccountSeries {
        account_id,
        balances,
        negative,
    }
}

pub fn operation_distribution(records: &[Record], operation: Operation, bins: usize) -> OperationDistribution {
    let amounts: Vec<Option<f64>> = records
        .iter()
        .filter(|r| r.operation.as_deref() == Some(operation.label()))
        .map(|r| r.amount)
        .collect();
    OperationDistribution {
        operation,
        count: amounts.len(),
        histogram: stats::histogram(&amounts, bins).with_density(&amounts),
    }
}
