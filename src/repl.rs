use std::io::Write;

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::controller::{ChatController, QuickPrompt, TurnResult};
use crate::session::Message;

const TITLE: &str = "SlotBot - Your AI Clinic Assistant";
const TAGLINE: &str = "Book Your Next Appointment in Seconds - No Calls, No Waits";
const PLACEHOLDER: &str = "Ask me anything or type 'book' to schedule an appointment...";

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Quit,
    Help,
    Prompts,
    Quick(QuickPrompt),
    Text(String),
    Unknown(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some(cmd) = trimmed.strip_prefix('/') else {
            return Line::Text(raw.to_string());
        };
        match cmd {
            "q" | "quit" | "exit" => Line::Quit,
            "h" | "help" => Line::Help,
            "p" | "prompts" => Line::Prompts,
            other => other
                .parse::<usize>()
                .ok()
                .and_then(QuickPrompt::from_index)
                .map(Line::Quick)
                .unwrap_or_else(|| Line::Unknown(trimmed.to_string())),
        }
    }
}

fn status_label(controller: &ChatController) -> &'static str {
    if controller.backend_reachable() { "connected" } else { "offline" }
}

pub fn render_header<W: Write>(controller: &ChatController, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}  [{}]", TITLE, status_label(controller))?;
    writeln!(out, "{}", TAGLINE)?;
    writeln!(out)
}

fn render_status<W: Write>(controller: &ChatController, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "[{}]", status_label(controller))
}

pub fn render_message<W: Write>(msg: &Message, out: &mut W) -> std::io::Result<()> {
    let author = if msg.is_user { "You" } else { "SlotBot" };
    let at = msg.timestamp.with_timezone(&Local).format("%H:%M");
    writeln!(out, "[{}] {}: {}", at, author, msg.content)
}

fn render_prompts<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "What would you like to do?")?;
    for (i, p) in QuickPrompt::ALL.iter().enumerate() {
        writeln!(out, "  /{}  {}", i + 1, p.text())?;
    }
    Ok(())
}

fn render_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", PLACEHOLDER)?;
    writeln!(out, "  /1../4     send a quick prompt")?;
    writeln!(out, "  /prompts   list quick prompts")?;
    writeln!(out, "  /help      show this help")?;
    writeln!(out, "  /quit      leave the chat")
}

/// Interactive loop. The network half of each turn runs on its own task so
/// input keeps being read; lines typed meanwhile are turned away. `health`
/// is the startup liveness probe, applied to the indicator when it lands.
pub async fn run<R, W>(
    controller: &mut ChatController,
    mut health: Option<JoinHandle<bool>>,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    render_header(controller, out)?;
    for msg in controller.messages() {
        render_message(msg, out)?;
    }
    render_prompts(out)?;
    out.flush()?;

    let mut lines = input.lines();
    let mut in_flight: Option<JoinHandle<TurnResult>> = None;

    loop {
        tokio::select! {
            biased;

            probed = async {
                match health.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if health.is_some() => {
                health = None;
                match probed {
                    Ok(reachable) => {
                        controller.apply_health(reachable);
                        render_status(controller, out)?;
                    }
                    Err(err) => tracing::warn!(error = %err, "health probe task failed"),
                }
            }
            joined = async {
                match in_flight.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                finish_turn(controller, joined?, out)?;
            }
            line = lines.next_line() => {
                // end of input leaves the same way /quit does
                let parsed = match line? {
                    Some(line) => Line::parse(&line),
                    None => Line::Quit,
                };
                let text = match parsed {
                    Line::Quit => {
                        if let Some(handle) = in_flight.take() {
                            finish_turn(controller, handle.await?, out)?;
                        }
                        break;
                    }
                    Line::Help => {
                        render_help(out)?;
                        continue;
                    }
                    Line::Prompts => {
                        render_prompts(out)?;
                        continue;
                    }
                    Line::Unknown(cmd) => {
                        writeln!(out, "unknown command {}, try /help", cmd)?;
                        continue;
                    }
                    Line::Quick(prompt) => prompt.text().to_string(),
                    Line::Text(text) => text,
                };
                if controller.is_pending() {
                    writeln!(out, "(still waiting on the last reply)")?;
                    continue;
                }
                controller.set_input(text);
                let input = controller.input().to_string();
                if let Some(turn) = controller.begin_turn(&input) {
                    if let Some(msg) = controller.messages().last() {
                        render_message(msg, out)?;
                    }
                    writeln!(out, "SlotBot is typing...")?;
                    in_flight = Some(tokio::spawn(turn.exchange(controller.backend())));
                }
            }
        }
        out.flush()?;
    }

    if let Some(handle) = health {
        handle.abort();
    }
    out.flush()?;
    Ok(())
}

fn finish_turn<W: Write>(controller: &mut ChatController, result: TurnResult, out: &mut W) -> std::io::Result<()> {
    if let Some(msg) = controller.resolve_turn(result) {
        render_message(msg, out)?;
    }
    Ok(())
}
