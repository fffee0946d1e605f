//! Output formatters for sheet listings and imported datasets

use anyhow::Result;
use colored::*;
use sheetimport::{Dataset, ImportOutcome, SheetEntry};
use std::io::{self, Write};
use std::path::Path;

const MISSING: &str = "NA";

/// Print the sheet catalog of a workbook
pub fn print_sheets(file_path: &Path, sheets: &[SheetEntry]) {
    println!("{}", format!("Workbook: {}", file_path.display()).bold());
    println!();
    for sheet in sheets {
        println!(
            "  {:>3}  {}  {}",
            sheet.index + 1,
            sheet.name.cyan().bold(),
            sheet.member.bright_black()
        );
    }
}

/// Print the dataset as an aligned table with a short summary
pub fn print_table(dataset: &Dataset, outcome: &ImportOutcome) {
    let selection = &outcome.selection;
    println!(
        "{} {} (offset {}, {})",
        "Sheet:".bold(),
        selection.sheet.cyan().bold(),
        selection.xoffset,
        selection.yoffset
    );
    if !outcome.pruned.is_empty() {
        println!(
            "{} {}",
            "Dropped empty:".yellow().bold(),
            outcome.pruned.join(", ")
        );
    }
    println!();

    let rows = rows(dataset);
    let mut widths = vec![0usize; dataset.nvars() + 1];
    let header = header(dataset);
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(cell, w)| format!("{:>w$}", cell, w = *w).bold().to_string())
        .collect();
    println!("{}", line.join("  "));

    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(j, (cell, w))| {
                let padded = format!("{:>w$}", cell, w = *w);
                if j == 0 {
                    padded.cyan().to_string()
                } else if cell == MISSING {
                    padded.bright_black().to_string()
                } else {
                    padded
                }
            })
            .collect();
        println!("{}", line.join("  "));
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Variables:".bold(), dataset.nvars());
    println!("  {} {}", "Observations:".bold(), dataset.nobs());
    if let Some(frequency) = dataset.frequency() {
        println!("  {} {}", "Frequency:".bold(), frequency.as_str());
    }
}

/// Print the dataset as CSV, missing values left empty
pub fn print_csv(dataset: &Dataset) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let header: Vec<String> = header(dataset).iter().map(|c| csv_field(c)).collect();
    writeln!(out, "{}", header.join(","))?;
    for row in rows(dataset) {
        let fields: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(j, c)| {
                if j > 0 && c == MISSING {
                    String::new()
                } else {
                    csv_field(c)
                }
            })
            .collect();
        writeln!(out, "{}", fields.join(","))?;
    }
    Ok(())
}

/// Print the dataset and the resolved selection as JSON
pub fn print_json(dataset: &Dataset, outcome: &ImportOutcome) -> Result<()> {
    let output = serde_json::json!({
        "selection": outcome.selection,
        "frequency": outcome.frequency,
        "pruned": outcome.pruned,
        "dataset": dataset,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn header(dataset: &Dataset) -> Vec<String> {
    std::iter::once("obs".to_string())
        .chain(dataset.varnames().iter().cloned())
        .collect()
}

/// Label (or 1-based position) followed by every variable's value
fn rows(dataset: &Dataset) -> Vec<Vec<String>> {
    (0..dataset.nobs())
        .map(|t| {
            let label = dataset
                .label(t)
                .map(str::to_string)
                .unwrap_or_else(|| (t + 1).to_string());
            std::iter::once(label)
                .chain((1..=dataset.nvars()).map(|i| match dataset.value(i, t) {
                    Some(v) => format!("{}", v),
                    None => MISSING.to_string(),
                }))
                .collect()
        })
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
