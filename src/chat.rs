//! Interactive chat on stdin/stdout and the `classify` command.
//!
//! Each line read from stdin is one user message. Two commands are
//! recognised:
//!
//! | Input | Effect |
//! |-------|--------|
//! | `/reset` | Start the conversation over |
//! | `/quit` | Exit (end of input works too) |
//!
//! Replies go to stdout. Notices about the external responder go to stderr
//! so piped output holds only the conversation.

use anyhow::Result;
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::session::SessionRegistry;

/// Run a single-session conversation until `/quit` or end of input.
pub async fn run_chat(config: &Config) -> Result<()> {
    let registry = SessionRegistry::from_config(config)?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let interactive = std::io::stdin().is_terminal();

    tracing::debug!(session = %session_id, "chat started");
    if interactive {
        println!("Type a message and press Enter. /reset starts over, /quit exits.");
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("you> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();

        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                registry.reset_session(&session_id).await;
                println!("(conversation reset)");
                println!();
                continue;
            }
            _ => {}
        }

        let outcome = registry.submit_message(&session_id, text).await;
        if let Some(notice) = &outcome.notice {
            eprintln!("note: {}", notice);
        }
        println!("{}", outcome.reply);
        println!();
    }

    Ok(())
}

/// Print the classification of `text` as pretty JSON.
pub fn run_classify(config: &Config, text: &str) -> Result<()> {
    let engine = config.build_engine()?;
    let result = engine.classify(text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
