// Output formatting for the stats report

use crate::process::ProgramUsage;
use colored::*;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print a table of current usage per program
pub fn print_usage_table(usage: &[ProgramUsage]) {
    if usage.is_empty() {
        println!("{}", "No supervised programs are running".yellow());
        return;
    }

    println!("\n{}\n", usage_table(usage));
    println!(
        "{}",
        format!("Total: {} program(s)", usage.len())
            .dimmed()
            .italic()
    );
}

fn usage_table(usage: &[ProgramUsage]) -> String {
    #[derive(Tabled)]
    struct UsageRow {
        #[tabled(rename = "Program")]
        name: String,
        #[tabled(rename = "PID")]
        pid: String,
        #[tabled(rename = "RSS")]
        rss: String,
        #[tabled(rename = "Limit")]
        limit: String,
        #[tabled(rename = "Usage")]
        usage: String,
    }

    let rows: Vec<UsageRow> = usage
        .iter()
        .map(|u| UsageRow {
            name: truncate(&u.name, 30),
            pid: u.pid.to_string(),
            rss: format_memory(u.value),
            limit: format_memory(u.limit),
            usage: format_usage_colored(u),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// Usage percentage, red when critical
fn format_usage_colored(usage: &ProgramUsage) -> String {
    let text = format!("{:.2}%", usage.percent);
    if usage.is_critical() {
        text.red().bold().to_string()
    } else if usage.percent >= 80.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Format memory usage in human-readable format
fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

/// Truncate a string to a maximum length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512B");
        assert_eq!(format_memory(2048), "2.0KB");
        assert_eq!(format_memory(2 * 1024 * 1024), "2.0MB");
        assert_eq!(format_memory(3 * 1024 * 1024 * 1024), "3.00GB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a very long string", 10), "this is...");
    }

    #[test]
    fn test_usage_table_lists_programs() {
        colored::control::set_override(false);
        let usage = vec![
            ProgramUsage::new("leaky", 7, 1500, 1000),
            ProgramUsage::new("web", 8, 2048, 1024 * 1024),
        ];

        let table = usage_table(&usage);
        assert!(table.contains("leaky"));
        assert!(table.contains("150.00%"));
        assert!(table.contains("web"));
        assert!(table.contains("2.0KB"));
    }
}
