use agent_core::agent_loop::AgentLoop;
use agent_core::config::{AppConfig, HistoryPolicy};
use agent_core::session::Session;
use agent_core::types::AgentEvent;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use tokio::sync::mpsc;
use tracing::warn;

const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

const HELP: &str = "  Commands:
    /tools   — List available tools
    /history — Show how much conversation is being kept
    /clear   — Forget conversation history
    /help    — Show this help
    quit     — Exit (also: exit, q)";

/// What a line of user input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Command(&'a str),
    Turn(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let input = line.trim();
    if input.is_empty() {
        Input::Empty
    } else if QUIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w)) {
        Input::Quit
    } else if input.starts_with('/') {
        Input::Command(input)
    } else {
        Input::Turn(input)
    }
}

/// Run the interactive REPL until the user quits.
pub async fn run(
    agent: AgentLoop,
    policy: HistoryPolicy,
    model: &str,
    title: &str,
    goodbye: &str,
) -> Result<()> {
    let mut session = Session::new(policy);

    println!();
    println!("  ╔═══════════════════════════════════════════╗");
    println!("  ║  {:<41}║", title);
    println!("  ╚═══════════════════════════════════════════╝");
    println!(
        "  Model: {}  |  {} tools loaded  |  history: {}",
        model,
        agent.tools().len(),
        policy_label(session.policy())
    );
    println!("  Type a question, /help for commands, or quit to exit.");
    println!();

    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("User: ") {
            Ok(line) => match classify(&line) {
                Input::Empty => continue,
                Input::Quit => {
                    println!("{}", goodbye);
                    break;
                }
                Input::Command(cmd) => handle_command(cmd, &agent, &mut session),
                Input::Turn(input) => run_turn(&agent, &mut session, input).await?,
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", goodbye);
                break;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Run one turn, printing tool activity as it happens. Turn-level failures are
/// reported and swallowed; Ctrl-C abandons the turn without touching history.
async fn run_turn(agent: &AgentLoop, session: &mut Session, input: &str) -> Result<()> {
    let history = session.begin_turn(input);
    let (tx, mut rx) = mpsc::unbounded_channel::<AgentEvent>();

    let turn = agent.run_with_events(history, Some(&tx));
    tokio::pin!(turn);

    let result = loop {
        tokio::select! {
            res = &mut turn => break Some(res),
            Some(event) = rx.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c() => break None,
        }
    };
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }

    match result {
        Some(Ok(outcome)) => {
            println!("Assistant: {}", outcome.reply.content);
            session.commit(outcome.history);
        }
        Some(Err(e)) if e.is_turn_error() => {
            warn!("Turn failed: {}", e);
            println!("\x1b[0;31mAssistant: sorry, that request failed ({})\x1b[0m", e);
        }
        Some(Err(e)) => return Err(e.into()),
        None => println!("\n\x1b[0;33mTurn cancelled.\x1b[0m"),
    }
    Ok(())
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::RoutingToTools(calls) => {
            println!("  \x1b[0;35mRouting to tools\x1b[0m");
            for call in calls {
                println!("  \x1b[0;35m⚡ {}({})\x1b[0m", call.name, call.arguments);
            }
        }
        AgentEvent::ToolResult(output) => {
            let preview: String = output.content.chars().take(200).collect();
            let ellipsis = if output.content.chars().count() > 200 { "..." } else { "" };
            println!(
                "  \x1b[0;32m✓\x1b[0m {}: {}{}",
                output.tool_name,
                preview.replace('\n', "\n    "),
                ellipsis
            );
        }
        AgentEvent::Done(_) => {}
    }
}

fn handle_command(input: &str, agent: &AgentLoop, session: &mut Session) {
    match input.split_whitespace().next().unwrap_or("") {
        "/tools" => {
            let tools = agent.tools();
            if tools.is_empty() {
                println!("  No tools registered.");
            } else {
                println!("  Available tools ({}):", tools.len());
                for name in tools.list_names() {
                    if let Some(tool) = tools.get(name) {
                        println!("    • {} — {}", name, tool.description());
                    }
                }
            }
        }
        "/history" => println!("{}", history_summary(session)),
        "/clear" => {
            let turns = session.turn_count();
            session.clear();
            println!("Cleared conversation history ({} turn(s)).", turns);
        }
        "/help" | "/?" => println!("{}", HELP),
        other => println!("Unknown command: {}. Type /help for available commands.", other),
    }
}

fn policy_label(policy: HistoryPolicy) -> &'static str {
    match policy {
        HistoryPolicy::PerTurn => "per turn",
        HistoryPolicy::Accumulate => "kept across turns",
    }
}

fn history_summary(session: &Session) -> String {
    format!(
        "  History {}: {} turn(s), {} message(s) kept",
        policy_label(session.policy()),
        session.turn_count(),
        session.messages().len()
    )
}
