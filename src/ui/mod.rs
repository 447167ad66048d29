use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer::default());
}

// Global debug state
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
}

fn renderer() -> Renderer {
    RENDERER.read().map(|r| r.clone()).unwrap_or_default()
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

fn strip_ansi(input: &str) -> String {
    // Remove CSI sequences like \x1b[0m and \x1b[1;32m
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Skip until the final byte of the sequence in @..=~
            for b in chars.by_ref() {
                if ('@'..='~').contains(&b) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn render(
    r: &Renderer,
    level: Level,
    code: &str,
    message: &str,
    data: Option<serde_json::Value>,
) -> String {
    match r.format {
        OutputFormat::Text => colorize(level, message, r.color),
        OutputFormat::Json => {
            // Ensure message contains no ANSI control sequences in JSON mode
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                data,
            };
            serde_json::to_string(&ev).unwrap_or_else(|_| clean_msg.clone())
        }
    }
}

/// Print a single event. Debug events are dropped unless debug mode is on.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }
    let line = render(&renderer(), level, code, message, data);
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    let _ = writeln!(out, "{}", line);
}

pub mod prelude {
    pub use super::{Level, emit};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn strip_ansi_removes_color_sequences() {
        let colored = "\x1b[1;32mcreated user alice@pve\x1b[0m";
        assert_eq!(strip_ansi(colored), "created user alice@pve");
    }

    #[test]
    fn strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi("user bob@pve doesn't exist"), "user bob@pve doesn't exist");
    }

    #[test]
    fn json_render_is_one_event_per_line() {
        let r = Renderer {
            format: OutputFormat::Json,
            color: false,
        };
        let data = serde_json::json!({"userid": "alice@pve", "changed": true});
        let line = render(
            &r,
            Level::Success,
            "user.present.created",
            "\x1b[32mok\x1b[0m",
            Some(data),
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "success");
        assert_eq!(parsed["code"], "user.present.created");
        assert_eq!(parsed["message"], "ok");
        assert_eq!(parsed["data"]["userid"], "alice@pve");
    }

    #[test]
    fn text_render_without_color_is_verbatim() {
        let r = Renderer {
            format: OutputFormat::Text,
            color: false,
        };
        assert_eq!(render(&r, Level::Error, "x", "failed", None), "failed");
    }

    #[test]
    #[serial]
    fn debug_mode_toggles() {
        set_debug_mode(true);
        assert!(is_debug_enabled());
        set_debug_mode(false);
        assert!(!is_debug_enabled());
    }

    #[test]
    #[serial]
    fn init_switches_output_format() {
        init(OutputFormat::Json, false);
        assert_eq!(renderer().format, OutputFormat::Json);
        assert!(!renderer().color);
        init(OutputFormat::Text, true);
        assert_eq!(renderer().format, OutputFormat::Text);
    }
}
