//! Line-oriented console transport.
//!
//! Messages are typed as blocks of lines ended by a blank line. A line
//! starting with `/` is a command and runs at once. While a field edit is
//! pending, the next non-empty line is taken as the new value.

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core_state::{CoreError, CoreReply, CoreState};
use crate::models::FieldName;
use crate::review::{render_stats, RenderedView, ReviewAction, ReviewError};

const HELP: &str = "Paste deal text and finish with an empty line.\n\
Commands: /next /prev /approve [n] /reject [n] /edit [field] /cancel\n\
          /commit /discard /reprocess /stats /help /quit";

/// A parsed console command. Deal numbers are one-based as displayed;
/// `None` means the deal on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Approve(Option<usize>),
    Reject(Option<usize>),
    Edit(Option<FieldName>),
    Cancel,
    Commit,
    Discard,
    Reprocess,
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Parse a `/command` line.
    pub fn parse(line: &str) -> Result<Self, ReviewError> {
        let mut words = line.trim().trim_start_matches('/').split_whitespace();
        let name = words.next().unwrap_or("").to_lowercase();
        let arg = words.next();

        let number = |arg: Option<&str>| -> Result<Option<usize>, ReviewError> {
            match arg {
                None => Ok(None),
                Some(raw) => match raw.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Some(n)),
                    _ => Err(ReviewError::InvalidAction(line.trim().to_string())),
                },
            }
        };

        let command = match name.as_str() {
            "next" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "approve" | "confirm" => Command::Approve(number(arg)?),
            "reject" => Command::Reject(number(arg)?),
            "edit" => match arg {
                None => Command::Edit(None),
                Some(raw) => Command::Edit(Some(parse_field(raw)?)),
            },
            "cancel" | "back" => Command::Cancel,
            "commit" => Command::Commit,
            "discard" => Command::Discard,
            "reprocess" => Command::Reprocess,
            "stats" => Command::Stats,
            "help" | "start" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(ReviewError::InvalidAction(line.trim().to_string())),
        };
        Ok(command)
    }

    /// The session action this command stands for, given the deal on screen.
    fn to_action(self, current: usize) -> Option<ReviewAction> {
        let index = |n: Option<usize>| n.map(|n| n - 1).unwrap_or(current);
        match self {
            Command::Next => Some(ReviewAction::Next),
            Command::Prev => Some(ReviewAction::Prev),
            Command::Approve(n) => Some(ReviewAction::Approve(index(n))),
            Command::Reject(n) => Some(ReviewAction::Reject(index(n))),
            Command::Edit(None) => Some(ReviewAction::Edit(current)),
            Command::Edit(Some(field)) => Some(ReviewAction::EditField(current, field)),
            Command::Cancel => Some(ReviewAction::Back),
            Command::Commit => Some(ReviewAction::Commit),
            Command::Discard => Some(ReviewAction::Discard),
            Command::Reprocess => Some(ReviewAction::Reprocess),
            Command::Stats | Command::Help | Command::Quit => None,
        }
    }
}

/// Field names as typed: `crg`, `CRG`, `deduction limit`, `model`.
fn parse_field(raw: &str) -> Result<FieldName, ReviewError> {
    let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
    let key = match key.as_str() {
        "model" | "pricing" => "pricing_model",
        "deduction" => "deduction_limit",
        other => other,
    };
    FieldName::from_str(key).map_err(|_| ReviewError::UnknownField(raw.to_string()))
}

/// Console hint for an action, shown next to its label.
fn action_hint(action: ReviewAction) -> String {
    match action {
        ReviewAction::Next => "/next".into(),
        ReviewAction::Prev => "/prev".into(),
        ReviewAction::Approve(i) => format!("/approve {}", i + 1),
        ReviewAction::Reject(i) => format!("/reject {}", i + 1),
        ReviewAction::Edit(_) => "/edit".into(),
        ReviewAction::EditField(_, field) => format!("/edit {field}"),
        ReviewAction::Back => "/cancel".into(),
        ReviewAction::Commit => "/commit".into(),
        ReviewAction::Discard => "/discard".into(),
        ReviewAction::Reprocess => "/reprocess".into(),
    }
}

pub fn format_view(view: &RenderedView) -> String {
    let mut out = view.text.clone();
    for row in &view.actions {
        let buttons: Vec<String> = row
            .iter()
            .map(|b| format!("[{}] {}", b.label, action_hint(b.action)))
            .collect();
        out.push_str("\n  ");
        out.push_str(&buttons.join("   "));
    }
    out
}

pub fn format_reply(reply: &CoreReply) -> String {
    let mut parts: Vec<String> = reply.notices.clone();
    if let Some(view) = &reply.view {
        parts.push(format_view(view));
    }
    parts.join("\n\n")
}

fn format_error(error: &CoreError) -> String {
    format!("❌ {error}")
}

// ═══════════════════════════════════════════════════════════
// Loop
// ═══════════════════════════════════════════════════════════

/// Drive `core` for a single user from `reader` until end of input or
/// `/quit`.
pub async fn run<R, W>(core: &CoreState, user_id: &str, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut buffer: Vec<String> = Vec::new();

    write_block(&mut writer, HELP).await?;

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();

        if buffer.is_empty() && trimmed.starts_with('/') {
            match Command::parse(trimmed) {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    let output = run_command(core, user_id, command).await;
                    write_block(&mut writer, &output).await?;
                }
                Err(e) => write_block(&mut writer, &format!("❌ {e}\n{HELP}")).await?,
            }
            continue;
        }

        if buffer.is_empty() && !trimmed.is_empty() && editing(core, user_id).await {
            let output = match core.handle_text(user_id, trimmed).await {
                Ok(reply) => format_reply(&reply),
                Err(e) => format_error(&e),
            };
            write_block(&mut writer, &output).await?;
            continue;
        }

        if trimmed.is_empty() {
            if !buffer.is_empty() {
                let message = buffer.join("\n");
                buffer.clear();
                let output = submit_message(core, user_id, &message).await;
                write_block(&mut writer, &output).await?;
            }
            continue;
        }
        buffer.push(line);
    }

    if !buffer.is_empty() {
        let output = submit_message(core, user_id, &buffer.join("\n")).await;
        write_block(&mut writer, &output).await?;
    }
    writer.flush().await
}

async fn editing(core: &CoreState, user_id: &str) -> bool {
    matches!(core.pending_edit(user_id).await, Ok(Some(_)))
}

async fn submit_message(core: &CoreState, user_id: &str, message: &str) -> String {
    match core.handle_text(user_id, message).await {
        Ok(reply) => format_reply(&reply),
        Err(e) => format_error(&e),
    }
}

async fn run_command(core: &CoreState, user_id: &str, command: Command) -> String {
    match command {
        Command::Help => return HELP.to_string(),
        Command::Stats => {
            return match core.stats() {
                Ok(stats) => render_stats(&stats),
                Err(e) => format_error(&e),
            }
        }
        _ => {}
    }

    let current = match core.current_index(user_id).await {
        Ok(Some(index)) => index,
        Ok(None) => return format_error(&CoreError::NoSession),
        Err(e) => return format_error(&e),
    };
    let Some(action) = command.to_action(current) else {
        return HELP.to_string();
    };
    match core.handle_action(user_id, action).await {
        Ok(reply) => format_reply(&reply),
        Err(e) => format_error(&e),
    }
}

async fn write_block<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::pipeline::extraction::PatternStrategy;
    use crate::pipeline::processor::DealPipeline;
    use crate::review::MemorySink;
    use std::sync::Arc;

    fn core(sink: Arc<MemorySink>) -> CoreState {
        CoreState::new(
            DealPipeline::new(Arc::new(PatternStrategy::new())),
            open_memory_database().unwrap(),
            sink,
        )
    }

    async fn session(core: &CoreState, input: &str) -> String {
        let mut out = Vec::new();
        run(core, "console", input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/approve").unwrap(), Command::Approve(None));
        assert_eq!(Command::parse("/reject 2").unwrap(), Command::Reject(Some(2)));
        assert_eq!(Command::parse("/edit crg").unwrap(), Command::Edit(Some(FieldName::Crg)));
        assert_eq!(
            Command::parse("/edit deduction-limit").unwrap(),
            Command::Edit(Some(FieldName::DeductionLimit))
        );
        assert_eq!(Command::parse("/edit model").unwrap(), Command::Edit(Some(FieldName::PricingModel)));
        assert_eq!(Command::parse("/QUIT").unwrap(), Command::Quit);
        assert!(matches!(Command::parse("/approve 0"), Err(ReviewError::InvalidAction(_))));
        assert!(matches!(Command::parse("/edit price"), Err(ReviewError::UnknownField(_))));
        assert!(matches!(Command::parse("/fly"), Err(ReviewError::InvalidAction(_))));
    }

    #[test]
    fn one_based_numbers_map_to_indices() {
        assert_eq!(Command::Approve(Some(2)).to_action(0), Some(ReviewAction::Approve(1)));
        assert_eq!(Command::Approve(None).to_action(3), Some(ReviewAction::Approve(3)));
        assert_eq!(Command::Stats.to_action(0), None);
    }

    #[tokio::test]
    async fn full_review_over_console() {
        let sink = Arc::new(MemorySink::new());
        let core = core(sink.clone());
        let input = "Partner: Sutra\nAU - 1300+13% - Beatskai iq (fb)\nUK - 1350+10%\n\n\
                     /edit crg\n\
                     15%\n\
                     /approve\n\
                     /reject\n\
                     /commit\n\
                     /stats\n";
        let out = session(&core, input).await;
        assert!(out.contains("📊 Deal 1/2"));
        assert!(out.contains("CRG: 15%"));
        assert!(out.contains("📋 Review complete"));
        assert!(out.contains("Committed 1 deal(s)"));
        assert!(out.contains("Total deals processed: 2"));
        assert_eq!(sink.rows().len(), 1);
        assert_eq!(sink.rows()[0].crg, Some(0.15));
    }

    #[tokio::test]
    async fn commands_without_session_report_error() {
        let core = core(Arc::new(MemorySink::new()));
        let out = session(&core, "/next\n").await;
        assert!(out.contains("No review session in progress"));
    }

    #[tokio::test]
    async fn message_at_end_of_input_is_processed() {
        let core = core(Arc::new(MemorySink::new()));
        let out = session(&core, "Partner: X\nDE - 1000+10%").await;
        assert!(out.contains("Partner: X"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let core = core(Arc::new(MemorySink::new()));
        let out = session(&core, "/quit\nPartner: X\nDE - 1000+10%\n\n").await;
        assert!(!out.contains("Partner: X"));
        assert_eq!(core.session_count(), 0);
    }
}
