use std::fmt::Write as FmtWrite;

use console::style;

use crate::models::OutputFormat;
use crate::server::protocol::{AskResponse, SessionInfoResponse, StatusResponse, UploadResponse};

pub trait Formatter {
    fn format_upload(&self, upload: &UploadResponse) -> String;
    fn format_answer(&self, answer: &AskResponse) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_session(&self, session: &SessionInfoResponse) -> String;
    fn format_message(&self, message: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub daemon_running: bool,
    pub daemon: Option<StatusResponse>,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_upload(&self, upload: &UploadResponse) -> String {
        let mut output = String::new();
        writeln!(output, "{}", style("Document indexed").green().bold()).unwrap();
        writeln!(output, "  Session: {}", upload.session_id).unwrap();
        writeln!(output, "  Chunks:  {}", upload.chunk_count).unwrap();
        writeln!(output, "  Files:   {}", upload.files.join(", ")).unwrap();
        output
    }

    fn format_answer(&self, answer: &AskResponse) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.answer).unwrap();
        if !answer.sources.is_empty() {
            writeln!(output).unwrap();
            writeln!(
                output,
                "{} {}",
                style("Sources:").dim(),
                answer.sources.join(", ")
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let daemon_status = if status.daemon_running {
            "[RUNNING]"
        } else {
            "[STOPPED]"
        };
        writeln!(output, "Daemon:        {}", daemon_status).unwrap();

        if let Some(ref s) = status.daemon {
            writeln!(output, "  Sessions:    {}", s.active_sessions).unwrap();
            writeln!(output, "  Idle:        {}s", s.idle_secs).unwrap();
            writeln!(output, "  Requests:    {}", s.requests_served).unwrap();
            if let Some(ref m) = s.metrics {
                writeln!(output, "  Avg Latency: {}ms", m.avg_latency_ms).unwrap();
                if m.error_rate > 0.0 {
                    writeln!(output, "  Error Rate:  {:.1}%", m.error_rate).unwrap();
                }
            }
        }
        output
    }

    fn format_session(&self, session: &SessionInfoResponse) -> String {
        let mut output = String::new();
        writeln!(output, "Session {}", session.session_id).unwrap();
        writeln!(output, "  Provider: {}", session.provider).unwrap();
        let files = if session.files.is_empty() {
            "(none)".to_string()
        } else {
            session.files.join(", ")
        };
        writeln!(output, "  Files:    {}", files).unwrap();
        writeln!(output, "  Chunks:   {}", session.index_size).unwrap();
        writeln!(output, "  History:  {} messages", session.history_len).unwrap();
        writeln!(output, "  Started:  {} ({}s ago)", session.started_at, session.age_secs).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_upload(&self, upload: &UploadResponse) -> String {
        pretty_json(&serde_json::json!({
            "session_id": upload.session_id,
            "chunk_count": upload.chunk_count,
            "files": upload.files,
        }))
    }

    fn format_answer(&self, answer: &AskResponse) -> String {
        pretty_json(&serde_json::json!({
            "answer": answer.answer,
            "sources": answer.sources,
        }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        pretty_json(&serde_json::json!({
            "daemon_running": status.daemon_running,
            "daemon": status.daemon,
        }))
    }

    fn format_session(&self, session: &SessionInfoResponse) -> String {
        pretty_json(&serde_json::json!(session))
    }

    fn format_message(&self, message: &str) -> String {
        pretty_json(&serde_json::json!({ "message": message }))
    }
}

fn pretty_json(value: &serde_json::Value) -> String {
    let mut output = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    output.push('\n');
    output
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_upload(&self, upload: &UploadResponse) -> String {
        let mut output = String::new();
        writeln!(output, "## Document indexed\n").unwrap();
        writeln!(output, "- **Session**: `{}`", upload.session_id).unwrap();
        writeln!(output, "- **Chunks**: {}", upload.chunk_count).unwrap();
        writeln!(output, "- **Files**: {}", upload.files.join(", ")).unwrap();
        output
    }

    fn format_answer(&self, answer: &AskResponse) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.answer).unwrap();
        if !answer.sources.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "**Sources**: {}", answer.sources.join(", ")).unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();
        let state = if status.daemon_running {
            "running"
        } else {
            "stopped"
        };
        writeln!(output, "- **Daemon**: {}", state).unwrap();
        if let Some(ref s) = status.daemon {
            writeln!(output, "- **Sessions**: {}", s.active_sessions).unwrap();
            writeln!(output, "- **Requests**: {}", s.requests_served).unwrap();
        }
        output
    }

    fn format_session(&self, session: &SessionInfoResponse) -> String {
        let mut output = String::new();
        writeln!(output, "## Session `{}`\n", session.session_id).unwrap();
        writeln!(output, "- **Provider**: {}", session.provider).unwrap();
        writeln!(output, "- **Files**: {}", session.files.join(", ")).unwrap();
        writeln!(output, "- **Chunks**: {}", session.index_size).unwrap();
        writeln!(output, "- **History**: {} messages", session.history_len).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> UploadResponse {
        UploadResponse {
            session_id: "abc-123".to_string(),
            chunk_count: 4,
            files: vec!["a.txt".to_string(), "b.txt".to_string()],
        }
    }

    #[test]
    fn test_text_upload_lists_files() {
        let output = TextFormatter.format_upload(&upload());
        assert!(output.contains("abc-123"));
        assert!(output.contains("a.txt, b.txt"));
    }

    #[test]
    fn test_json_output_parses() {
        let output = JsonFormatter.format_upload(&upload());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["chunk_count"], 4);
        assert_eq!(value["files"][1], "b.txt");
    }

    #[test]
    fn test_answer_includes_sources() {
        let answer = AskResponse {
            answer: "42".to_string(),
            sources: vec!["deep-thought.txt".to_string()],
        };
        let output = TextFormatter.format_answer(&answer);
        assert!(output.contains("42"));
        assert!(output.contains("deep-thought.txt"));

        let output = MarkdownFormatter.format_answer(&answer);
        assert!(output.contains("**Sources**"));
    }

    #[test]
    fn test_status_stopped() {
        let output = TextFormatter.format_status(&StatusInfo {
            daemon_running: false,
            daemon: None,
        });
        assert!(output.contains("[STOPPED]"));
    }
}
