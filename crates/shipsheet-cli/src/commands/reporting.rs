use colored::Colorize;
use shipsheet_core::StageError;

/// Prints a cyan banner header.
pub(crate) fn print_banner(title: &str) {
    println!("{}", "======================================".cyan());
    println!("{}", format!("  {}", title).cyan());
    println!("{}", "======================================".cyan());
    println!();
}

/// Converts a stage error into an `anyhow` error carrying its code.
pub(crate) fn coded<E: StageError>(err: E) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", err.code(), err.message())
}
