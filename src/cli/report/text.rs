use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::analysis::{
    AccountSeries, Analysis, GroupCount, GroupTotal, Notice, OperationDistribution,
};
use crate::fmt::{amount, number, opt_amount, percent};
use crate::frame::SourceInfo;
use crate::stats::{Describe, Histogram, MissingCount, OutlierReport};

const BAR_WIDTH: usize = 30;

fn heading(title: &str) -> String {
    format!("{}", title.yellow().bold())
}

fn notice(text: &str) -> String {
    format!("{} {text}", "!".yellow().bold())
}

/// Horizontal bar scaled so `max` fills `BAR_WIDTH` cells.
pub fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || !value.is_finite() {
        return String::new();
    }
    let len = ((value.abs() / max) * BAR_WIDTH as f64).round() as usize;
    "\u{2588}".repeat(len.min(BAR_WIDTH))
}

fn right(s: impl std::fmt::Display) -> Cell {
    Cell::new(s).set_alignment(CellAlignment::Right)
}

// ---------------------------------------------------------------------------
// Pure formatting functions (analysis → String)
// ---------------------------------------------------------------------------

pub fn format_analysis(a: &Analysis) -> String {
    let mut sections = Vec::new();

    if let Some(source) = &a.source {
        sections.push(format_source(source));
    }
    sections.push(format_preview(a));
    sections.push(format_missing(&a.missing));
    if let Some(summary) = &a.summary {
        sections.push(format_summary(&summary.amount, &summary.balance));
    }
    if let Some(d) = &a.distributions {
        sections.push(format_histogram("Distribution of Transaction Amounts", &d.amount));
        sections.push(format_histogram("Distribution of Account Balances", &d.balance));
    }
    if let Some(o) = &a.outliers {
        sections.push(format_outliers(&[&o.amount, &o.balance], a.params.iqr_multiplier));
    }
    if let Some(t) = &a.temporal {
        sections.push(format_group_totals("Total Amount by Year", "Year", &t.amount_by_year));
        sections.push(format_group_totals("Total Amount by Month", "Month", &t.amount_by_month));
        sections.push(format_group_totals("Total Amount by Day", "Day", &t.amount_by_day));
        sections.push(format_group_counts("Transactions by Year", "Year", &t.count_by_year));
        sections.push(format_group_counts("Transactions by Month", "Month", &t.count_by_month));
        sections.push(format_account(&t.account));
        sections.push(format_operation(&t.operation));
    }
    if let Some(f) = &a.date_failure {
        sections.push(format!(
            "{}\n{}",
            heading("Time Analysis"),
            format!("Invalid date {:?} at row {}; time analysis stopped.", f.value, f.row).red()
        ));
    }
    // empty account/operation filters are already shown inside their panels
    let lines: Vec<String> = a
        .notices
        .iter()
        .filter(|n| !matches!(n, Notice::NoAccountData { .. } | Notice::NoOperationData { .. }))
        .map(|n| notice(&n.message()))
        .collect();
    if !lines.is_empty() {
        sections.push(format!("{}\n{}", heading("Notices"), lines.join("\n")));
    }

    sections.join("\n\n")
}

pub fn format_source(source: &SourceInfo) -> String {
    let mut out = format!(
        "{}\n{} ({} rows, {} columns)\nsha256 {}",
        heading("Source"),
        source.path,
        number(source.rows as i64),
        source.columns,
        source.sha256
    );
    if !source.dropped_columns.is_empty() {
        out.push_str(&format!("\ndropped index columns: {}", source.dropped_columns.join(", ")));
    }
    out
}

pub fn format_preview(a: &Analysis) -> String {
    let mut table = Table::new();
    table.set_header(a.preview.headers.clone());
    for row in &a.preview.rows {
        table.add_row(
            row.iter()
                .map(|c| Cell::new(c.as_deref().unwrap_or("NaN")))
                .collect::<Vec<_>>(),
        );
    }
    format!(
        "{} (showing {} of {} rows)\n{table}",
        heading("Transactions"),
        a.preview.rows.len(),
        number(a.preview.total_rows as i64)
    )
}

pub fn format_missing(missing: &[MissingCount]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Missing"]);
    for m in missing {
        table.add_row(vec![Cell::new(&m.column), right(m.missing)]);
    }
    format!("{}\n{table}", heading("Missing Values"))
}

pub fn format_summary(amount_stats: &Describe, balance_stats: &Describe) -> String {
    let mut table = Table::new();
    table.set_header(vec!["", "amount", "balance"]);
    table.add_row(vec![
        Cell::new("count"),
        right(number(amount_stats.count as i64)),
        right(number(balance_stats.count as i64)),
    ]);
    let rows: [(&str, fn(&Describe) -> Option<f64>); 7] = [
        ("mean", |d| d.mean),
        ("std", |d| d.std),
        ("min", |d| d.min),
        ("25%", |d| d.q25),
        ("50%", |d| d.q50),
        ("75%", |d| d.q75),
        ("max", |d| d.max),
    ];
    for (label, get) in rows {
        table.add_row(vec![
            Cell::new(label),
            right(opt_amount(get(amount_stats))),
            right(opt_amount(get(balance_stats))),
        ]);
    }
    format!("{}\n{table}", heading("Summary Statistics"))
}

pub fn format_histogram(title: &str, hist: &Histogram) -> String {
    if hist.bins.is_empty() {
        return format!("{}\nNo values.", heading(title));
    }
    let max = hist.max_count() as f64;
    let with_density = !hist.density.is_empty();
    let mut table = Table::new();
    let mut header = vec!["From", "To", "Count", ""];
    if with_density {
        header.push("Density");
    }
    table.set_header(header);
    for (i, b) in hist.bins.iter().enumerate() {
        let mut row = vec![
            right(amount(b.start)),
            right(amount(b.end)),
            right(b.count),
            Cell::new(bar(b.count as f64, max)),
        ];
        if let Some(d) = hist.density.get(i) {
            row.push(right(format!("{d:.2}")));
        }
        table.add_row(row);
    }
    format!("{} ({} values)\n{table}", heading(title), number(hist.total() as i64))
}

pub fn format_outliers(reports: &[&OutlierReport], multiplier: f64) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Lower", "Upper", "Outliers", "Percentage"]);
    for r in reports {
        let (lower, upper) = r
            .fences
            .map(|f| (amount(f.lower), amount(f.upper)))
            .unwrap_or_else(|| ("\u{2014}".into(), "\u{2014}".into()));
        table.add_row(vec![
            Cell::new(&r.column),
            right(lower),
            right(upper),
            right(number(r.count as i64)),
            right(percent(r.percentage)),
        ]);
    }
    format!(
        "{} (Q1 - {k}*IQR, Q3 + {k}*IQR)\n{table}",
        heading("Outlier Percentage"),
        k = multiplier
    )
}

pub fn format_group_totals(title: &str, key_label: &str, groups: &[GroupTotal]) -> String {
    let max = groups.iter().map(|g| g.total.abs()).fold(0.0, f64::max);
    let mut table = Table::new();
    table.set_header(vec![key_label, "Total Amount", ""]);
    for g in groups {
        let value = if g.total < 0.0 {
            amount(g.total).red().to_string()
        } else {
            amount(g.total)
        };
        table.add_row(vec![Cell::new(&g.key), right(value), Cell::new(bar(g.total, max))]);
    }
    format!("{}\n{table}", heading(title))
}

pub fn format_group_counts(title: &str, key_label: &str, groups: &[GroupCount]) -> String {
    let max = groups.iter().map(|g| g.count).max().unwrap_or(0) as f64;
    let mut table = Table::new();
    table.set_header(vec![key_label, "Transactions", ""]);
    for g in groups {
        table.add_row(vec![
            Cell::new(&g.key),
            right(number(g.count as i64)),
            Cell::new(bar(g.count as f64, max)),
        ]);
    }
    format!("{}\n{table}", heading(title))
}

pub fn format_account(series: &AccountSeries) -> String {
    let title = format!("Balance of Account {}", series.account_id);
    if series.balances.is_empty() {
        return format!(
            "{}\n{}",
            heading(&title),
            notice(&format!("No data found for Account ID {}", series.account_id))
        );
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Balance"]);
    for p in &series.balances {
        let value = if p.balance < 0.0 {
            amount(p.balance).red().bold().to_string()
        } else {
            amount(p.balance)
        };
        table.add_row(vec![Cell::new(p.date.format("%Y-%m-%d")), right(value)]);
    }
    format!(
        "{} ({} points, {} negative)\n{table}",
        heading(&title),
        series.balances.len(),
        series.negative.len()
    )
}

pub fn format_operation(dist: &OperationDistribution) -> String {
    let title = format!("Distribution of Amounts - {}", dist.operation);
    if dist.count == 0 {
        return format!(
            "{}\n{}",
            heading(&title),
            notice(&format!("No transactions found for operation {}", dist.operation))
        );
    }
    format_histogram(&title, &dist.histogram)
}
