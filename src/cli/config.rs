use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path};

pub fn show() -> Result<()> {
    let s = load_settings();
    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);
    table.add_row(vec![Cell::new("account_id"), Cell::new(s.account_id)]);
    table.add_row(vec![Cell::new("operation"), Cell::new(s.operation)]);
    table.add_row(vec![Cell::new("bins"), Cell::new(s.bins)]);
    table.add_row(vec![Cell::new("iqr_multiplier"), Cell::new(s.iqr_multiplier)]);
    table.add_row(vec![Cell::new("preview_rows"), Cell::new(s.preview_rows)]);
    table.add_row(vec![Cell::new("log_level"), Cell::new(&s.log_level)]);
    println!("Settings ({})\n{table}", settings_path().display());
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.set(key, value)?;
    save_settings(&settings)?;
    println!("Set {key} in {}", settings_path().display());
    Ok(())
}
