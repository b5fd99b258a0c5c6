use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::models::Operation;

pub fn list() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Operation"]);
    for op in Operation::ALL {
        table.add_row(vec![Cell::new(op.key()), Cell::new(op.label())]);
    }
    println!("{table}");
    Ok(())
}
