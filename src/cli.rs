//! Command-line helpers: host argument normalization and the interactive console

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::engine::{Outbound, VolumeActorHandle};

/// Session id the console registers as
pub const CONSOLE_SESSION: &str = "console";

/// Rewrite the single-dash flags the host launches plugins with
/// (`-port 28196 -pluginUUID ...`) into the long flags clap expects.
pub fn normalize_host_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-port" => "--port".to_string(),
            "-pluginUUID" => "--plugin-uuid".to_string(),
            "-registerEvent" => "--register-event".to_string(),
            "-info" => "--info".to_string(),
            _ => arg,
        })
        .collect()
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Turn the virtual dial, optionally with a one-off step
    Rotate { ticks: i64, step: Option<Value> },
    Press,
    Set(i64),
    Read,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        match (command, args.as_slice()) {
            ("rotate" | "r", [ticks]) | ("rotate" | "r", [ticks, _]) => {
                let ticks = ticks
                    .parse::<i64>()
                    .map_err(|_| format!("invalid tick count: {}", ticks))?;
                let step = args.get(1).map(|s| json!(s));
                Ok(ConsoleCommand::Rotate { ticks, step })
            }
            ("press" | "p" | "mute", []) => Ok(ConsoleCommand::Press),
            ("set", [value]) => value
                .parse::<i64>()
                .map(ConsoleCommand::Set)
                .map_err(|_| format!("invalid volume: {}", value)),
            ("read", []) => Ok(ConsoleCommand::Read),
            ("status", []) => Ok(ConsoleCommand::Status),
            ("help" | "?", []) => Ok(ConsoleCommand::Help),
            ("quit" | "exit", []) => Ok(ConsoleCommand::Quit),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}  turn the dial (negative = down)", "rotate N [step]".cyan());
    println!("  {}            toggle mute", "press".cyan());
    println!("  {}            set an absolute volume", "set V".cyan());
    println!("  {}             read the mixer volume", "read".cyan());
    println!("  {}           show engine state", "status".cyan());
    println!("  {}             leave", "quit".cyan());
}

fn print_outbound(message: &Outbound) {
    match message {
        Outbound::Feedback { display, .. } => {
            let text = if display.muted {
                display.text.red().bold()
            } else {
                display.text.green().bold()
            };
            println!("🎚️  {}", text);
        }
        Outbound::Diagnostic(line) => println!("⚠️  {}", line.yellow()),
    }
}

/// Drive the engine from an interactive prompt, printing what a dial would show
pub async fn run_console(engine: VolumeActorHandle, mut outbound: mpsc::Receiver<Outbound>) -> Result<()> {
    let printer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            print_outbound(&message);
        }
    });

    engine.register(CONSOLE_SESSION, json!({}));

    let handle = Handle::current();
    let repl_engine = engine.clone();
    let result = tokio::task::spawn_blocking(move || repl(repl_engine, handle)).await?;

    engine.unregister(CONSOLE_SESSION);
    printer.abort();
    result
}

fn repl(engine: VolumeActorHandle, handle: Handle) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    print_help();

    loop {
        let line = match rl.readline("dial> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        if !engine.is_alive() {
            println!("{}", "Engine stopped".red());
            break;
        }

        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Rotate { ticks, step }) => engine.rotate(CONSOLE_SESSION, ticks, step),
            Ok(ConsoleCommand::Press) => engine.toggle_mute(CONSOLE_SESSION),
            Ok(ConsoleCommand::Set(volume)) => engine.set_volume(volume),
            Ok(ConsoleCommand::Read) => match handle.block_on(engine.read_volume()) {
                Ok(volume) => println!("Mixer volume: {}", format!("{}%", volume).green()),
                Err(e) => println!("{} {}", "Read failed:".red(), e),
            },
            Ok(ConsoleCommand::Status) => match handle.block_on(engine.snapshot()) {
                Some(snapshot) => match serde_json::to_string_pretty(&snapshot) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("{} {}", "Cannot render status:".red(), e),
                },
                None => println!("{}", "Engine stopped".red()),
            },
            Ok(ConsoleCommand::Help) => print_help(),
            Ok(ConsoleCommand::Quit) => break,
            Err(e) => println!("{} (type {} for commands)", e.red(), "help".cyan()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_host_args() {
        let normalized = normalize_host_args(args(&[
            "volume-dial",
            "-port",
            "28196",
            "-pluginUUID",
            "ABC",
            "-registerEvent",
            "registerPlugin",
            "-info",
            "{\"application\":{}}",
        ]));
        assert_eq!(
            normalized,
            args(&[
                "volume-dial",
                "--port",
                "28196",
                "--plugin-uuid",
                "ABC",
                "--register-event",
                "registerPlugin",
                "--info",
                "{\"application\":{}}",
            ])
        );
    }

    #[test]
    fn test_normalize_leaves_other_args_alone() {
        let input = args(&["volume-dial", "--console", "-l", "debug", "--port", "1"]);
        assert_eq!(normalize_host_args(input.clone()), input);
    }

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(
            ConsoleCommand::parse("rotate 3"),
            Ok(ConsoleCommand::Rotate { ticks: 3, step: None })
        );
        assert_eq!(
            ConsoleCommand::parse("r -2 5"),
            Ok(ConsoleCommand::Rotate {
                ticks: -2,
                step: Some(json!("5"))
            })
        );
        assert_eq!(ConsoleCommand::parse("  press "), Ok(ConsoleCommand::Press));
        assert_eq!(ConsoleCommand::parse("set 40"), Ok(ConsoleCommand::Set(40)));
        assert_eq!(ConsoleCommand::parse("read"), Ok(ConsoleCommand::Read));
        assert_eq!(ConsoleCommand::parse("status"), Ok(ConsoleCommand::Status));
        assert_eq!(ConsoleCommand::parse("exit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("rotate").is_err());
        assert!(ConsoleCommand::parse("rotate up").is_err());
        assert!(ConsoleCommand::parse("set loud").is_err());
        assert!(ConsoleCommand::parse("press twice").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }
}
