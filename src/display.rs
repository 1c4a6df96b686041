use crate::dispatch::{EventSink, TurnEvent, TurnState};
use crate::utils::text::{display_width, truncate_chars, wrap_text};
use console::style;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use termimad::MadSkin;

const PREVIEW_CHARS: usize = 160;

/// How much of the tool activity is shown while a turn runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Tool calls with arguments and full results
    Verbose,
    /// One line per tool call
    #[default]
    Minimal,
    /// Only the answer
    Hidden,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayMode::Verbose => "verbose",
            DisplayMode::Minimal => "minimal",
            DisplayMode::Hidden => "hidden",
        })
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" => Ok(DisplayMode::Verbose),
            "minimal" => Ok(DisplayMode::Minimal),
            "hidden" => Ok(DisplayMode::Hidden),
            other => Err(format!(
                "Unknown display mode '{}'. Use: verbose, minimal or hidden",
                other
            )),
        }
    }
}

fn box_width(max: usize) -> usize {
    let terminal_width = console::Term::stdout().size().1 as usize;
    terminal_width.saturating_sub(4).min(max).max(40)
}

/// Renders turn events on the terminal as they arrive.
pub struct TerminalSink {
    mode: DisplayMode,
    label: String,
    show_text: bool,
    mid_line: bool,
    thinking: bool,
}

impl TerminalSink {
    pub fn new(mode: DisplayMode, label: &str) -> Self {
        Self {
            mode,
            label: label.to_string(),
            show_text: true,
            mid_line: false,
            thinking: true,
        }
    }

    /// Keep the answer text off the terminal; the caller renders it at the end.
    pub fn without_text(mut self) -> Self {
        self.show_text = false;
        self
    }

    fn end_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }

    fn clear_thinking(&mut self) {
        if std::mem::take(&mut self.thinking) {
            let _ = console::Term::stdout().clear_line();
        }
    }
}

impl EventSink for TerminalSink {
    fn emit(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::State(TurnState::Streaming) => {
                if self.thinking {
                    print!("{}", style(format!("🤖 {} is thinking...", self.label)).dim());
                    let _ = io::stdout().flush();
                }
            }
            TurnEvent::State(TurnState::Done | TurnState::Failed) => {
                self.clear_thinking();
                self.end_line();
            }
            TurnEvent::State(_) => {}
            TurnEvent::Text(_) if !self.show_text => {}
            TurnEvent::Text(chunk) => {
                self.clear_thinking();
                print!("{}", chunk);
                let _ = io::stdout().flush();
                self.mid_line = !chunk.ends_with('\n');
            }
            TurnEvent::ToolCall(call) => {
                self.clear_thinking();
                self.end_line();
                match self.mode {
                    DisplayMode::Verbose => println!(
                        "{} {} {}",
                        style("🔧").bold(),
                        style(&call.name).bold().yellow(),
                        style(&call.arguments).dim()
                    ),
                    DisplayMode::Minimal => {
                        println!("{} {}", style("🔧").bold(), style(&call.name).yellow())
                    }
                    DisplayMode::Hidden => {}
                }
                // the next request gets its own thinking line
                self.thinking = true;
            }
            TurnEvent::ToolResult { name, output } => {
                if self.mode == DisplayMode::Verbose {
                    let marker = if output.is_error {
                        style("✗").red().bold()
                    } else {
                        style("✓").green().bold()
                    };
                    println!(
                        "{} {}: {}",
                        marker,
                        name,
                        style(truncate_chars(&output.content, PREVIEW_CHARS)).dim()
                    );
                } else if output.is_error && self.mode == DisplayMode::Minimal {
                    println!("{} {}", style("✗").red().bold(), style(&output.content).red());
                }
            }
            TurnEvent::Handoff(agent) => {
                self.clear_thinking();
                self.end_line();
                if self.mode != DisplayMode::Hidden {
                    println!(
                        "{} {}",
                        style("↪").bold(),
                        style(format!("{} is answering", agent)).cyan()
                    );
                }
                self.thinking = true;
            }
            TurnEvent::Error(message) => {
                self.clear_thinking();
                self.end_line();
                display_error(&message);
            }
        }
    }
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("❌").bold(), style(message).red());
}

pub fn display_info(message: &str) {
    println!("{}", style(message).cyan());
}

/// Render markdown with termimad.
pub fn display_markdown(text: &str) {
    let skin = MadSkin::default();
    skin.print_text(text);
}

/// Plain answer in a bordered box.
pub fn display_response(response: &str) {
    let max_width = box_width(120);
    let inner = max_width.saturating_sub(4);

    let lines: Vec<String> = response
        .lines()
        .flat_map(|line| wrap_text(line, inner))
        .collect();
    let content_width = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);
    let width = max_width.min(content_width + 4);

    println!("{}", style(format!("┌{}┐", "─".repeat(width - 2))).dim().blue());
    for line in &lines {
        let padding = width.saturating_sub(display_width(line) + 3);
        println!("│ {}{}│", style(line).bold().white(), " ".repeat(padding));
    }
    println!("{}", style(format!("└{}┘", "─".repeat(width - 2))).dim().blue());
}

/// Markdown-looking answers go through termimad, the rest into a box.
pub fn display_answer(text: &str) {
    if looks_like_markdown(text) {
        display_markdown(text);
    } else {
        display_response(text);
    }
}

fn looks_like_markdown(text: &str) -> bool {
    text.contains("```")
        || text.contains("**")
        || text.lines().any(|l| {
            let l = l.trim_start();
            l.starts_with('#') || l.starts_with("- ") || l.starts_with("* ")
        })
}

pub fn display_welcome(profile: &str, model: &str, tool_count: usize) {
    println!(
        "{} {} {}",
        style("toolchat").bold().magenta(),
        style(format!("· {} ({})", profile, model)).cyan(),
        style(format!("· {} tools", tool_count)).dim()
    );
    println!(
        "{}",
        style("Type /help for commands, /starters for ideas. Ctrl+D or /quit exits.").dim()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mode_parses_case_insensitively() {
        assert_eq!("Verbose".parse::<DisplayMode>(), Ok(DisplayMode::Verbose));
        assert_eq!("hidden".parse::<DisplayMode>(), Ok(DisplayMode::Hidden));
        assert!("loud".parse::<DisplayMode>().is_err());
        assert_eq!(DisplayMode::default().to_string(), "minimal");
    }

    #[test]
    fn markdown_detection() {
        assert!(looks_like_markdown("# Title\nbody"));
        assert!(looks_like_markdown("Use **bold** here"));
        assert!(looks_like_markdown("- one\n- two"));
        assert!(!looks_like_markdown("It is 41°C and sunny in Lahore."));
    }
}
