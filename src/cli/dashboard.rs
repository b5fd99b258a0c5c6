use std::io::IsTerminal;
use std::path::Path;

use chrono::Datelike;
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Tabs,
    },
    Frame,
};
use tracing::debug;

use crate::analysis::{analyze, Analysis, GroupCount, GroupTotal, Params};
use crate::cli::report;
use crate::cli::{OutputFormat, ParamArgs};
use crate::error::Result;
use crate::fmt::{amount, compact, number, opt_amount, percent};
use crate::frame::{load_file, Frame as DataFrame, SourceInfo};
use crate::settings::load_settings;
use crate::stats::{Describe, Histogram, OutlierReport};
use crate::tui::{
    amount_span, run_view, wrap_text, View, ViewAction, FOOTER_STYLE, HEADER_STYLE, NOTICE_STYLE,
    SELECTED_STYLE,
};

const PAGES: &[&str] = &["Overview", "Distributions", "Aggregates", "Account", "Operation"];

const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);
const HEADER_ROW_STYLE: Style = Style::new()
    .fg(Color::DarkGray)
    .add_modifier(Modifier::BOLD);
const BAR_STYLE: Style = Style::new().fg(Color::Cyan);
const OPERATION_STYLE: Style = Style::new().fg(Color::LightBlue);

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Browse,
    EditAccount(String),
}

pub struct Dashboard {
    data: DataFrame,
    source: SourceInfo,
    params: Params,
    analysis: Analysis,
    page: usize,
    mode: Mode,
    status_message: Option<String>,
}

impl Dashboard {
    pub fn new(data: DataFrame, source: SourceInfo, params: Params) -> Result<Self> {
        let analysis = analyze(&data, &params)?.with_source(source.clone());
        Ok(Self {
            data,
            source,
            params,
            analysis,
            page: 0,
            mode: Mode::Browse,
            status_message: None,
        })
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Rerun the whole pipeline for the current parameters.
    fn recompute(&mut self) {
        debug!(
            account_id = self.params.account_id,
            operation = %self.params.operation,
            "recomputing"
        );
        match analyze(&self.data, &self.params) {
            Ok(a) => self.analysis = a.with_source(self.source.clone()),
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) -> ViewAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Close,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                self.page = (self.page + 1) % PAGES.len();
            }
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.page = (self.page + PAGES.len() - 1) % PAGES.len();
            }
            KeyCode::Char(c @ '1'..='5') => {
                self.page = (c as usize - '1' as usize).min(PAGES.len() - 1);
            }
            KeyCode::Char('a') => {
                self.mode = Mode::EditAccount(self.params.account_id.to_string());
            }
            KeyCode::Char('o') => {
                self.params.operation = self.params.operation.next();
                self.recompute();
            }
            KeyCode::Char('O') => {
                self.params.operation = self.params.operation.prev();
                self.recompute();
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn handle_edit_key(&mut self, code: KeyCode, mut input: String) {
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Enter => {
                match input.trim().parse::<i64>() {
                    Ok(id) => {
                        self.params.account_id = id;
                        self.recompute();
                        self.page = 3;
                    }
                    Err(_) => {
                        self.status_message = Some(format!("Invalid account ID: {input:?}"));
                    }
                }
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || (c == '-' && input.is_empty()) => {
                input.push(c);
            }
            _ => {}
        }
        self.mode = Mode::EditAccount(input);
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " ledgerscope: {}  |  account {}  |  {}",
            self.source.path, self.params.account_id, self.params.operation
        );
        frame.render_widget(Paragraph::new(title).style(HEADER_STYLE), area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let widget = match (&self.mode, &self.status_message) {
            (Mode::EditAccount(input), _) => Paragraph::new(format!(
                " Account ID: {input}_   Enter=apply  Esc=cancel"
            ))
            .style(NOTICE_STYLE),
            (Mode::Browse, Some(msg)) => Paragraph::new(format!(" {msg}")).style(NOTICE_STYLE),
            (Mode::Browse, None) => Paragraph::new(
                " Tab/\u{2190}/\u{2192}=page  a=account  o/O=operation  q=quit",
            )
            .style(FOOTER_STYLE),
        };
        frame.render_widget(widget, area);
    }

    fn draw_overview(&self, frame: &mut Frame, area: Rect) {
        let a = &self.analysis;
        let notices = self.notice_lines(area.width.saturating_sub(2) as usize);
        let notice_height = if notices.is_empty() {
            0
        } else {
            notices.len() as u16 + 2
        };
        let metrics_height = if a.outliers.is_some() { 4 } else { 0 };

        let [tables_area, metrics_area, notice_area] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(metrics_height),
            Constraint::Length(notice_height),
        ])
        .areas(area);

        let [raw_area, missing_area, summary_area] = Layout::horizontal([
            Constraint::Percentage(60),
            Constraint::Percentage(15),
            Constraint::Percentage(25),
        ])
        .areas(tables_area);

        // Raw table
        let widths = vec![Constraint::Fill(1); a.preview.headers.len().max(1)];
        let header = Row::new(a.preview.headers.iter().map(|h| Cell::from(h.clone())))
            .style(HEADER_ROW_STYLE);
        let rows: Vec<Row> = a
            .preview
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.clone().unwrap_or_else(|| "NaN".into())))))
            .collect();
        frame.render_widget(
            Table::new(rows, widths).header(header).block(
                Block::default().borders(Borders::ALL).title(format!(
                    "Transactions ({} rows)",
                    number(a.preview.total_rows as i64)
                )),
            ),
            raw_area,
        );

        // Missing values
        let rows: Vec<Row> = a
            .missing
            .iter()
            .map(|m| Row::new([Cell::from(m.column.clone()), Cell::from(m.missing.to_string())]))
            .collect();
        frame.render_widget(
            Table::new(rows, [Constraint::Fill(1), Constraint::Length(7)])
                .header(Row::new(["Column", "Missing"]).style(HEADER_ROW_STYLE))
                .block(Block::default().borders(Borders::ALL).title("Missing Values")),
            missing_area,
        );

        // Summary statistics
        let summary_block = Block::default().borders(Borders::ALL).title("Summary Statistics");
        match &a.summary {
            Some(s) => frame.render_widget(
                Table::new(
                    summary_rows(&s.amount, &s.balance),
                    [Constraint::Length(6), Constraint::Fill(1), Constraint::Fill(1)],
                )
                .header(Row::new(["", "amount", "balance"]).style(HEADER_ROW_STYLE))
                .block(summary_block),
                summary_area,
            ),
            None => frame.render_widget(
                Paragraph::new("No amount/balance columns.").block(summary_block),
                summary_area,
            ),
        }

        if let Some(o) = &a.outliers {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .areas(metrics_area);
            frame.render_widget(outlier_card("Outliers Percentage in Amount", &o.amount), left);
            frame.render_widget(outlier_card("Outliers Percentage in Balance", &o.balance), right);
        }

        if !notices.is_empty() {
            frame.render_widget(
                Paragraph::new(notices).block(Block::default().borders(Borders::ALL).title("Notices")),
                notice_area,
            );
        }
    }

    fn notice_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if let Some(f) = &self.analysis.date_failure {
            let msg = format!("Invalid date {:?} at row {}; time analysis stopped.", f.value, f.row);
            let (wrapped, _) = wrap_text(&msg, width);
            for l in wrapped.lines() {
                lines.push(Line::from(Span::styled(l.to_string(), Style::new().fg(Color::Red))));
            }
        }
        for n in &self.analysis.notices {
            let (wrapped, _) = wrap_text(&n.message(), width);
            for l in wrapped.lines() {
                lines.push(Line::from(Span::styled(l.to_string(), NOTICE_STYLE)));
            }
        }
        lines
    }

    fn draw_distributions(&self, frame: &mut Frame, area: Rect) {
        let Some(d) = &self.analysis.distributions else {
            draw_unavailable(frame, area, "Distributions", &self.unavailable_reason());
            return;
        };
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
        draw_histogram(frame, left, "Distribution of Transaction Amounts", &d.amount, BAR_STYLE);
        draw_histogram(frame, right, "Distribution of Account Balances", &d.balance, BAR_STYLE);
    }

    fn draw_aggregates(&self, frame: &mut Frame, area: Rect) {
        let Some(t) = &self.analysis.temporal else {
            draw_unavailable(frame, area, "Aggregates", &self.unavailable_reason());
            return;
        };
        let [top, bottom] =
            Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
        let [tl, tr] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);
        let [bl, br] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(bottom);
        draw_totals(frame, tl, "Total Amount by Year", &t.amount_by_year);
        draw_totals(frame, tr, "Total Amount by Month", &t.amount_by_month);
        draw_counts(frame, bl, "Transactions by Year", &t.count_by_year);
        draw_counts(frame, br, "Transactions by Month", &t.count_by_month);
    }

    fn draw_account(&self, frame: &mut Frame, area: Rect) {
        let title = format!("Balance of Account {}", self.params.account_id);
        let Some(t) = &self.analysis.temporal else {
            draw_unavailable(frame, area, &title, &self.unavailable_reason());
            return;
        };
        let series = &t.account;
        if series.balances.is_empty() {
            draw_unavailable(
                frame,
                area,
                &title,
                &format!("No data found for Account ID {}", series.account_id),
            );
            return;
        }

        let line: Vec<(f64, f64)> = series
            .balances
            .iter()
            .map(|p| (p.date.num_days_from_ce() as f64, p.balance))
            .collect();
        let negative: Vec<(f64, f64)> = series
            .negative
            .iter()
            .map(|p| (p.date.num_days_from_ce() as f64, p.balance))
            .collect();

        let (x_min, x_max) = bounds(line.iter().map(|p| p.0));
        let (y_min, y_max) = bounds(line.iter().map(|p| p.1).chain([0.0]));
        let first = series.balances.first().map(|p| p.date.to_string()).unwrap_or_default();
        let last = series.balances.last().map(|p| p.date.to_string()).unwrap_or_default();

        let datasets = vec![
            Dataset::default()
                .name("Balance")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::new().fg(Color::Blue))
                .data(&line),
            Dataset::default()
                .name("Negative balance")
                .marker(symbols::Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::new().fg(Color::Red))
                .data(&negative),
        ];
        let lowest = series
            .balances
            .iter()
            .map(|p| p.balance)
            .fold(f64::INFINITY, f64::min);
        let chart_title = Line::from(vec![
            Span::raw(format!(
                "{title} ({} points, {} negative, lowest ",
                series.balances.len(),
                series.negative.len()
            )),
            amount_span(lowest),
            Span::raw(")"),
        ]);
        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(chart_title))
            .x_axis(
                Axis::default()
                    .title("Date")
                    .style(FOOTER_STYLE)
                    .bounds([x_min, x_max])
                    .labels(vec![Span::raw(first), Span::raw(last)]),
            )
            .y_axis(
                Axis::default()
                    .title("Balance")
                    .style(FOOTER_STYLE)
                    .bounds([y_min, y_max])
                    .labels(vec![
                        Span::raw(compact(y_min)),
                        Span::raw("0"),
                        Span::raw(compact(y_max)),
                    ]),
            );
        frame.render_widget(chart, area);
    }

    fn draw_operation(&self, frame: &mut Frame, area: Rect) {
        let title = format!("Distribution of Amounts - {}", self.params.operation);
        let Some(t) = &self.analysis.temporal else {
            draw_unavailable(frame, area, &title, &self.unavailable_reason());
            return;
        };
        let dist = &t.operation;
        if dist.count == 0 {
            draw_unavailable(
                frame,
                area,
                &title,
                &format!("No transactions found for operation {}", dist.operation),
            );
            return;
        }

        let [density_area, hist_area] =
            Layout::vertical([Constraint::Length(8), Constraint::Fill(1)]).areas(area);

        let points: Vec<(f64, f64)> = dist
            .histogram
            .bins
            .iter()
            .zip(&dist.histogram.density)
            .map(|(b, d)| (b.center(), *d))
            .collect();
        let (x_min, x_max) = bounds(points.iter().map(|p| p.0));
        let (_, y_max) = bounds(points.iter().map(|p| p.1).chain([0.0]));
        let density = Chart::new(vec![Dataset::default()
            .name("Density")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(OPERATION_STYLE)
            .data(&points)])
        .block(Block::default().borders(Borders::ALL).title("Density shape"))
        .x_axis(Axis::default().bounds([x_min, x_max]))
        .y_axis(Axis::default().bounds([0.0, y_max]));
        frame.render_widget(density, density_area);

        draw_histogram(
            frame,
            hist_area,
            &format!("{title} ({} transactions)", number(dist.count as i64)),
            &dist.histogram,
            OPERATION_STYLE,
        );
    }

    fn unavailable_reason(&self) -> String {
        if let Some(f) = &self.analysis.date_failure {
            return format!("Invalid date {:?} at row {}.", f.value, f.row);
        }
        self.analysis
            .notices
            .first()
            .map(|n| n.message())
            .unwrap_or_else(|| "Not available for this file.".to_string())
    }
}

impl View for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, sep_area, tabs_area, content_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        self.draw_header(frame, header_area);
        frame.render_widget(
            Paragraph::new("━".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );
        frame.render_widget(
            Tabs::new(PAGES.iter().enumerate().map(|(i, p)| format!("{} {p}", i + 1)))
                .select(self.page)
                .highlight_style(SELECTED_STYLE),
            tabs_area,
        );

        match self.page {
            0 => self.draw_overview(frame, content_area),
            1 => self.draw_distributions(frame, content_area),
            2 => self.draw_aggregates(frame, content_area),
            3 => self.draw_account(frame, content_area),
            _ => self.draw_operation(frame, content_area),
        }

        self.draw_footer(frame, footer_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => {
                self.status_message = None;
                self.handle_browse_key(code)
            }
            Mode::EditAccount(input) => {
                self.handle_edit_key(code, input);
                ViewAction::Continue
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Widget helpers
// ---------------------------------------------------------------------------

fn summary_rows(amount_stats: &Describe, balance_stats: &Describe) -> Vec<Row<'static>> {
    let stat = |label: &str, a: Option<f64>, b: Option<f64>| {
        Row::new([
            Cell::from(Span::styled(label.to_string(), BOLD)),
            Cell::from(opt_amount(a)),
            Cell::from(opt_amount(b)),
        ])
    };
    vec![
        Row::new([
            Cell::from(Span::styled("count", BOLD)),
            Cell::from(number(amount_stats.count as i64)),
            Cell::from(number(balance_stats.count as i64)),
        ]),
        stat("mean", amount_stats.mean, balance_stats.mean),
        stat("std", amount_stats.std, balance_stats.std),
        stat("min", amount_stats.min, balance_stats.min),
        stat("25%", amount_stats.q25, balance_stats.q25),
        stat("50%", amount_stats.q50, balance_stats.q50),
        stat("75%", amount_stats.q75, balance_stats.q75),
        stat("max", amount_stats.max, balance_stats.max),
    ]
}

fn outlier_card(title: &str, report: &OutlierReport) -> Paragraph<'static> {
    let lines = vec![
        Line::from(Span::styled(
            percent(report.percentage),
            Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} of {} rows", number(report.count as i64), number(report.total as i64)),
            FOOTER_STYLE,
        )),
    ];
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title.to_string()))
}

fn draw_unavailable(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let (wrapped, _) = wrap_text(message, area.width.saturating_sub(4) as usize);
    frame.render_widget(
        Paragraph::new(wrapped)
            .style(NOTICE_STYLE)
            .block(Block::default().borders(Borders::ALL).title(title.to_string())),
        area,
    );
}

fn draw_histogram(frame: &mut Frame, area: Rect, title: &str, hist: &Histogram, style: Style) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    if hist.bins.is_empty() {
        frame.render_widget(Paragraph::new("No values.").block(block), area);
        return;
    }
    let range = format!(
        "{} \u{2026} {}",
        amount(hist.bins.first().map_or(0.0, |b| b.start)),
        amount(hist.bins.last().map_or(0.0, |b| b.end)),
    );
    let bars: Vec<Bar> = hist
        .bins
        .iter()
        .map(|b| Bar::default().value(b.count as u64).text_value(String::new()).style(style))
        .collect();
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width = (inner_width / hist.bins.len().max(1)).clamp(1, 4) as u16;
    frame.render_widget(
        BarChart::default()
            .block(block.title_bottom(Line::from(range).style(FOOTER_STYLE)))
            .bar_width(bar_width)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars)),
        area,
    );
}

fn draw_totals(frame: &mut Frame, area: Rect, title: &str, groups: &[GroupTotal]) {
    let bars: Vec<Bar> = groups
        .iter()
        .map(|g| {
            let bar = Bar::default()
                .value(g.total.abs().round() as u64)
                .text_value(compact(g.total))
                .label(Line::from(g.key.clone()));
            if g.total < 0.0 {
                bar.style(Style::new().fg(Color::Red))
            } else {
                bar.style(BAR_STYLE)
            }
        })
        .collect();
    draw_bar_groups(frame, area, title, &bars);
}

fn draw_counts(frame: &mut Frame, area: Rect, title: &str, groups: &[GroupCount]) {
    let bars: Vec<Bar> = groups
        .iter()
        .map(|g| {
            Bar::default()
                .value(g.count as u64)
                .text_value(compact(g.count as f64))
                .label(Line::from(g.key.clone()))
                .style(BAR_STYLE)
        })
        .collect();
    draw_bar_groups(frame, area, title, &bars);
}

fn draw_bar_groups(frame: &mut Frame, area: Rect, title: &str, bars: &[Bar]) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let per_bar = inner_width / bars.len().max(1);
    let bar_width = per_bar.saturating_sub(1).clamp(1, 8) as u16;
    frame.render_widget(
        BarChart::default()
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .bar_width(bar_width)
            .bar_gap(1)
            .data(BarGroup::default().bars(bars)),
        area,
    );
}

/// Min and max of the values, widened when they coincide so axes stay valid.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

pub fn run(file: &str, args: &ParamArgs) -> Result<()> {
    let params = args.resolve(&load_settings())?;
    let (data, source) = load_file(Path::new(file))?;

    if !std::io::stdout().is_terminal() {
        // No terminal to draw on: print the same panels as text.
        colored::control::set_override(false);
        let analysis = analyze(&data, &params)?.with_source(source);
        println!("{}", report::render(&analysis, OutputFormat::Text)?);
        return match &analysis.date_failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        };
    }

    let mut dashboard = Dashboard::new(data, source, params)?;
    run_view(&mut dashboard)?;

    match &dashboard.analysis().date_failure {
        Some(f) => Err(f.to_error()),
        None => Ok(()),
    }
}
