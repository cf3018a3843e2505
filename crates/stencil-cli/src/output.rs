//! Status output for `stencil paths` and `stencil warm`.
//!
//! `stencil render` writes the rendered template to stdout and nothing else,
//! so these helpers are never used on that path. Errors go to stderr.

use std::path::Path;

use console::style;

pub fn print_header(text: &str) {
    println!("\n{}", style(text).bold().cyan());
}

/// `[1/2] Assembling renderer...`
pub fn print_step(step: u32, total: u32, text: &str) {
    println!("{} {}", style(format!("[{step}/{total}]")).dim(), text);
}

pub fn print_success(text: &str) {
    println!("{} {}", style("[OK]").green().bold(), text);
}

pub fn print_warning(text: &str) {
    println!("{} {}", style("[WARN]").yellow().bold(), text);
}

/// A template that failed to compile, with the reason.
pub fn print_failure(key: &str, reason: &str) {
    eprintln!("{} {} {}", style("[FAIL]").red().bold(), style(key).bold(), reason);
}

/// One configured directory. `None` is the default namespace.
pub fn print_path(namespace: Option<&str>, path: &Path) {
    let namespace = match namespace {
        Some(_) => style(namespace_label(namespace)).cyan(),
        None => style(namespace_label(namespace)).dim(),
    };
    if path.is_dir() {
        println!("  {namespace:<16} {}", path.display());
    } else {
        println!(
            "  {namespace:<16} {} {}",
            path.display(),
            style("(missing)").yellow()
        );
    }
}

/// How a namespace is shown: `ns::` for named ones, `(default)` otherwise.
fn namespace_label(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{ns}::"),
        None => "(default)".to_string(),
    }
}

/// `  compiled        3`
pub fn print_count(label: &str, count: usize) {
    println!("  {:<16}{}", style(label).dim(), count);
}
