pub mod text;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::analysis::{analyze, Analysis};
use crate::cli::{OutputFormat, ParamArgs};
use crate::error::Result;
use crate::frame::load_file;
use crate::settings::load_settings;

pub fn run(file: &str, args: &ParamArgs, format: OutputFormat, output: Option<String>) -> Result<()> {
    let params = args.resolve(&load_settings())?;
    let (frame, source) = load_file(Path::new(file))?;
    let analysis = analyze(&frame, &params)?.with_source(source);

    if output.is_some() || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    let rendered = render(&analysis, format)?;
    match output {
        Some(path) => write_report(&rendered, &PathBuf::from(path))?,
        None => println!("{rendered}"),
    }

    // Earlier panels are already out; the bad date still fails the run.
    if let Some(failure) = &analysis.date_failure {
        return Err(failure.to_error());
    }
    Ok(())
}

pub(crate) fn render(analysis: &Analysis, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => text::format_analysis(analysis),
        OutputFormat::Json => serde_json::to_string_pretty(analysis)?,
    })
}

fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{content}\n"))?;
    info!(path = %path.display(), "report written");
    println!("Wrote {}", path.display());
    Ok(())
}
