use crate::types::{FeedbackRecord, FeedbackStatus, Sentiment, TriageSummary, Urgency};

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const RED: &'static str = "\x1b[31m";
    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

const SUMMARY_WIDTH: usize = 40;
const CUSTOMER_WIDTH: usize = 18;
const CATEGORY_WIDTH: usize = 14;

const TABLE_RULE: &str =
    "──────┼─────────────────────┼─────────┼───────────┼────────────────┼────────────────────┼──────────────────────────────────────────";

pub struct RecordFormatter {
    format: OutputFormat,
    colored: bool,
    quiet: bool,
    record_count: u64,
}

impl RecordFormatter {
    pub fn new(format: OutputFormat, colored: bool, quiet: bool) -> Self {
        Self {
            format,
            colored,
            quiet,
            record_count: 0,
        }
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn print_header(&self) {
        if self.quiet || self.format != OutputFormat::Table {
            return;
        }

        let labels = format!(
            " {:<4} │ {:<19} │ {:<7} │ {:<9} │ {:<14} │ {:<18} │ {}",
            "#", "RECEIVED", "URGENCY", "SENTIMENT", "CATEGORY", "CUSTOMER", "SUMMARY"
        );
        if self.colored {
            println!("{}{}{}", Colors::BOLD, labels, Colors::RESET);
            println!("{}{}{}", Colors::GRAY, TABLE_RULE, Colors::RESET);
        } else {
            println!("{}", labels);
            println!("{}", TABLE_RULE);
        }
    }

    pub fn print_record(&mut self, record: &FeedbackRecord) {
        self.record_count += 1;

        match self.format {
            OutputFormat::Table => {
                println!("{}", format_table_row(self.record_count, record, self.colored))
            }
            OutputFormat::Json => println!("{}", record_json(record)),
            OutputFormat::Minimal => println!("{}", format_minimal(record)),
        }
    }

    /// Full view of a single record, including its analysis and overrides.
    pub fn print_detail(&self, record: &FeedbackRecord) {
        if self.format == OutputFormat::Json {
            println!("{}", record_json(record));
            return;
        }

        let (bold, reset) = if self.colored {
            (Colors::BOLD, Colors::RESET)
        } else {
            ("", "")
        };
        let received = record
            .created_at_utc()
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| record.created_at.clone());

        println!("{bold}Feedback {}{reset}", record.id);
        println!("  From:      {} <{}>", record.customer_name, record.email);
        println!("  Received:  {}", received);
        println!("  Message:   {}", record.message);

        match (&record.analysis, record.status()) {
            (Some(analysis), _) => {
                println!(
                    "  Urgency:   {}",
                    self.paint(urgency_color(analysis.urgency_level), analysis.urgency_level.as_str())
                );
                println!(
                    "  Sentiment: {}",
                    self.paint(sentiment_color(analysis.sentiment), analysis.sentiment.as_str())
                );
                println!("  Category:  {}", analysis.category);
                println!("  Summary:   {}", analysis.summary);
                println!("  Action:    {}", analysis.recommended_action);
            }
            (None, FeedbackStatus::Failed) => {
                let error = record.analysis_error.as_deref().unwrap_or_default();
                println!("  Analysis:  {}", self.paint(Colors::BRIGHT_RED, &format!("failed ({error})")));
            }
            (None, _) => println!("  Analysis:  {}", self.paint(Colors::DIM, "pending")),
        }

        for entry in &record.overrides {
            println!(
                "  Override:  {} {} -> {} by {} ({})",
                entry.field,
                entry.old_value.as_deref().unwrap_or("-"),
                entry.new_value,
                entry.overridden_by,
                entry.reason
            );
        }
    }

    pub fn print_summary(&self, summary: &TriageSummary) {
        if self.quiet || self.format == OutputFormat::Json {
            return;
        }

        let line = format_summary(summary);
        if self.colored {
            println!("{}{}Summary:{} {}", Colors::BOLD, Colors::BRIGHT_CYAN, Colors::RESET, line);
        } else {
            println!("Summary: {}", line);
        }
    }

    pub fn print_status(&self, status: &str, message: &str) {
        if self.quiet && status != "ERROR" {
            return;
        }

        if self.colored {
            let color = match status {
                "ERROR" => Colors::BRIGHT_RED,
                "OK" => Colors::BRIGHT_GREEN,
                _ => Colors::BRIGHT_BLUE,
            };
            println!("{}{}[{}]{} {}", Colors::BOLD, color, status, Colors::RESET, message);
        } else {
            println!("[{}] {}", status, message);
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colored {
            format!("{color}{text}{}", Colors::RESET)
        } else {
            text.to_string()
        }
    }
}

pub fn urgency_color(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::High => Colors::BRIGHT_RED,
        Urgency::Medium => Colors::BRIGHT_YELLOW,
        Urgency::Low => Colors::BRIGHT_GREEN,
    }
}

pub fn sentiment_color(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Negative => Colors::BRIGHT_RED,
        Sentiment::Neutral => Colors::WHITE,
        Sentiment::Positive => Colors::BRIGHT_GREEN,
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

// Pads before coloring so escape codes do not count toward the column width.
fn cell(text: &str, width: usize, color: Option<&str>) -> String {
    let padded = format!("{:<width$}", truncate(text, width));
    match color {
        Some(color) => format!("{color}{padded}{}", Colors::RESET),
        None => padded,
    }
}

pub fn format_table_row(count: u64, record: &FeedbackRecord, colored: bool) -> String {
    let received = record
        .created_at_utc()
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| truncate(&record.created_at, 19));

    let (urgency, sentiment, category, summary) = match (&record.analysis, record.status()) {
        (Some(analysis), _) => (
            cell(
                analysis.urgency_level.as_str(),
                7,
                colored.then(|| urgency_color(analysis.urgency_level)),
            ),
            cell(
                analysis.sentiment.as_str(),
                9,
                colored.then(|| sentiment_color(analysis.sentiment)),
            ),
            cell(&analysis.category, CATEGORY_WIDTH, None),
            truncate(&analysis.summary, SUMMARY_WIDTH),
        ),
        (None, FeedbackStatus::Failed) => (
            cell("-", 7, None),
            cell("-", 9, None),
            cell("-", CATEGORY_WIDTH, None),
            cell("analysis failed", SUMMARY_WIDTH, colored.then_some(Colors::RED)),
        ),
        (None, _) => (
            cell("-", 7, None),
            cell("-", 9, None),
            cell("-", CATEGORY_WIDTH, None),
            cell("analysis pending", SUMMARY_WIDTH, colored.then_some(Colors::DIM)),
        ),
    };

    format!(
        " {:<4} │ {:<19} │ {} │ {} │ {} │ {} │ {}",
        count,
        received,
        urgency,
        sentiment,
        category,
        cell(&record.customer_name, CUSTOMER_WIDTH, None),
        summary.trim_end()
    )
}

pub fn format_minimal(record: &FeedbackRecord) -> String {
    match &record.analysis {
        Some(analysis) => format!(
            "{} {} {} {}: {}",
            record.id,
            analysis.urgency_level,
            analysis.sentiment,
            analysis.category,
            analysis.summary
        ),
        None => format!(
            "{} {}: {}",
            record.id,
            match record.status() {
                FeedbackStatus::Failed => "failed",
                _ => "pending",
            },
            truncate(&record.message, SUMMARY_WIDTH)
        ),
    }
}

pub fn record_json(record: &FeedbackRecord) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or_else(|_| serde_json::json!({ "id": record.id }))
}

pub fn format_summary(summary: &TriageSummary) -> String {
    let categories = if summary.categories.is_empty() {
        "none".to_string()
    } else {
        summary.categories.join(", ")
    };
    format!(
        "{} records, {} high urgency, {:.1}% negative, categories: {}",
        summary.total, summary.high_urgency, summary.negative_percentage, categories
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeedbackAnalysis;

    fn record(analysis: Option<FeedbackAnalysis>, error: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            id: "f-1".to_string(),
            customer_name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
            message: "The export function no longer works after the update".to_string(),
            created_at: "2024-03-01T10:15:00".to_string(),
            analysis,
            analysis_error: error.map(str::to_string),
            agent_success: None,
            overrides: Vec::new(),
        }
    }

    fn analysis() -> FeedbackAnalysis {
        FeedbackAnalysis {
            sentiment: Sentiment::Negative,
            urgency_level: Urgency::High,
            category: "Bug".to_string(),
            summary: "Export broken".to_string(),
            recommended_action: "Escalate".to_string(),
        }
    }

    #[test]
    fn output_format_defaults_to_table() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("minimal"), OutputFormat::Minimal);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Table);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
        assert_eq!(truncate("Grüße aus Köln", 6), "Grüße…");
    }

    #[test]
    fn table_row_shows_analysis() {
        let row = format_table_row(3, &record(Some(analysis()), None), false);
        assert!(row.starts_with(" 3    │ 2024-03-01 10:15:00 │ high    │ negative  │ Bug"));
        assert!(row.ends_with("Export broken"));
        assert!(row.contains("Demo User"));
    }

    #[test]
    fn table_row_marks_pending_and_failed() {
        assert!(format_table_row(1, &record(None, None), false).contains("analysis pending"));
        assert!(format_table_row(1, &record(None, Some("timeout")), false).contains("analysis failed"));
    }

    #[test]
    fn colored_row_wraps_urgency() {
        let row = format_table_row(1, &record(Some(analysis()), None), true);
        assert!(row.contains(&format!("{}high   {}", Colors::BRIGHT_RED, Colors::RESET)));
    }

    #[test]
    fn minimal_line() {
        assert_eq!(
            format_minimal(&record(Some(analysis()), None)),
            "f-1 high negative Bug: Export broken"
        );
        assert!(format_minimal(&record(None, Some("timeout"))).starts_with("f-1 failed: The export"));
    }

    #[test]
    fn summary_line() {
        let summary = TriageSummary {
            total: 4,
            high_urgency: 1,
            negative_percentage: 25.0,
            categories: vec!["Billing".to_string(), "Bug".to_string()],
        };
        assert_eq!(
            format_summary(&summary),
            "4 records, 1 high urgency, 25.0% negative, categories: Billing, Bug"
        );
        assert!(format_summary(&TriageSummary::default()).ends_with("categories: none"));
    }
}
