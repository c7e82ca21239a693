// ABOUTME: The interactive chat loop and its slash commands, plus one-shot mode.
// ABOUTME: Tool-set changes made here flag the conversation to recompute its tools.

use anyhow::Result;
use conch::prelude::*;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::spinner::Spinner;

const HELP: &str = "\
Commands:
  /tools             list tool groups
  /enable <group>    turn a tool group on
  /disable <group>   turn a tool group off
  /reload            reconnect MCP servers (after connecting a service)
  /clear             forget the conversation so far
  /usage             tokens used this session
  /help              show this help
  exit, quit, /q     leave (or Ctrl+D)";

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/q")
}

fn usage_line(usage: &Usage) -> String {
    format!(
        "{} tokens in, {} out, {} total",
        usage.input_tokens,
        usage.output_tokens,
        usage.input_tokens + usage.output_tokens
    )
}

async fn print_groups(conversation: &Conversation) {
    let groups = conversation.catalog().group_summaries().await;
    if groups.is_empty() {
        println!("No tools.");
        return;
    }
    for g in groups {
        println!(
            "  {:<24} {:>4}  {}",
            g.label,
            g.count,
            if g.enabled { "on" } else { "off" }
        );
    }
}

async fn slash_command(
    line: &str,
    conversation: &mut Conversation,
    ctx: &mut TurnContext,
    config: &Config,
) -> Result<()> {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        "/help" => println!("{}", HELP),
        "/tools" => print_groups(conversation).await,
        "/enable" | "/disable" => {
            if arg.is_empty() {
                println!("usage: {} <group>", command);
                return Ok(());
            }
            let catalog = conversation.catalog_mut();
            let outcome = if command == "/enable" {
                catalog.enable_group(arg).await
            } else {
                catalog.disable_group(arg).await
            };
            match outcome {
                Ok(_) => {
                    ctx.tools_changed = true;
                    println!(
                        "{} {}",
                        if command == "/enable" { "Enabled" } else { "Disabled" },
                        arg.to_lowercase()
                    );
                }
                Err(ToolError::NotFound(_)) => println!("No tool group named '{}'.", arg),
                Err(e) => eprintln!("error: {}", e),
            }
        }
        "/reload" => {
            let registry = crate::build_registry(config).await?;
            let catalog = conversation.catalog_mut();
            catalog.replace_registry(registry).await;
            let disabled = catalog.apply_startup_ceiling().await?;
            ctx.tools_changed = true;
            println!("Reloaded {} tools.", catalog.registry().count().await);
            if !disabled.is_empty() {
                println!("Disabled large tool groups: {}", disabled.join(", "));
            }
        }
        "/usage" => println!("{}", usage_line(conversation.usage())),
        "/clear" => {
            conversation.clear();
            println!("Conversation cleared.");
        }
        other => println!("Unknown command {}; try /help.", other),
    }
    Ok(())
}

async fn turn(
    conversation: &mut Conversation,
    ctx: &mut TurnContext,
    input: &str,
    spinner: &Spinner,
) -> Result<String, LlmError> {
    spinner.start("Thinking");
    let outcome = conversation.run_turn(input, ctx).await;
    spinner.stop();
    outcome
}

/// Interactive mode. Provider errors are printed and the chat continues.
pub async fn run(
    conversation: &mut Conversation,
    config: &Config,
    model: &str,
    spinner: &Spinner,
) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut ctx = TurnContext::default();

    println!("Conch chat ({}/{})", config.provider, model);
    println!("Type 'exit' or Ctrl+D to quit, /help for commands.\n");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            // Ctrl+C only abandons the current input.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }
        let _ = rl.add_history_entry(line);

        if line.starts_with('/') {
            if let Err(e) = slash_command(line, conversation, &mut ctx, config).await {
                eprintln!("error: {}", e);
            }
            continue;
        }

        match turn(conversation, &mut ctx, line, spinner).await {
            Ok(reply) if reply.is_empty() => println!("[no response]\n"),
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => eprintln!("error: {}\n", e),
        }
    }

    Ok(())
}

/// One-shot mode: a single turn, printed to stdout.
pub async fn ask_once(
    conversation: &mut Conversation,
    prompt: &str,
    spinner: &Spinner,
) -> Result<()> {
    let mut ctx = TurnContext::default();
    let reply = turn(conversation, &mut ctx, prompt, spinner).await?;
    if reply.is_empty() {
        anyhow::bail!("no response");
    }
    println!("{}", reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        for word in ["exit", "quit", "/q"] {
            assert!(is_exit(word));
        }
        assert!(!is_exit("/quit-smoking"));
        assert!(!is_exit("exit now"));
    }

    #[test]
    fn test_usage_line() {
        let usage = Usage {
            input_tokens: 1200,
            output_tokens: 34,
        };
        assert_eq!(usage_line(&usage), "1200 tokens in, 34 out, 1234 total");
    }
}
