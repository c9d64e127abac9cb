//! Bounty board command-line client.
//!
//! # Architecture Overview
//!
//! ```text
//!   board.toml ──▶ config ──▶ RpcConnector ──▶ ConnectionContext
//!        │                                        │ watch<Binding>
//!        └── ConfigWatcher (watch mode) ──rebind──┤
//!                                                 ▼
//!                    ledger ◀── BountyBoard ── BoardController ──▶ notices (log)
//!                                                 │
//!                                                 ▼
//!                                           stdout listing
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use bounty_board::board::{
    Answer, BoardController, ConnectionContext, LoadOutcome, Notifier, Question, RpcConnector, ToggleOutcome,
    TracingNotifier, WalletEvent,
};
use bounty_board::config::watcher::ConfigWatcher;
use bounty_board::config::{load_config, BoardConfig, DisplayConfig};
use bounty_board::observability::{logging, metrics};
use bounty_board::Shutdown;

const CONNECT_PROMPT: &str = "Connect wallet to view questions (set the key named by wallet.private_key_env)";

#[derive(Parser)]
#[command(name = "bounty-board")]
#[command(about = "Post, answer and settle bounty-backed questions on a question board contract", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "board.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all questions on the board
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the answers to a question
    Answers { id: u64 },
    /// Post a question with a bounty in ether
    Post {
        #[arg(long)]
        content: String,
        #[arg(long)]
        bounty: String,
    },
    /// Answer a question
    Answer {
        #[arg(long)]
        question: u64,
        #[arg(long)]
        content: String,
    },
    /// Accept an answer to one of your questions, paying out its bounty
    Accept {
        #[arg(long)]
        question: u64,
        #[arg(long)]
        answer: u64,
    },
    /// Keep the board in sync, rebinding on config changes, until ctrl-c
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        config = %cli.config.display(),
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        contract = %config.contract.address,
        "bounty-board starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = Arc::new(ConnectionContext::new(RpcConnector::new(config.clone())));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let controller = Arc::new(BoardController::new(context.subscribe(), notifier));

    if !context.connect().await {
        tracing::warn!("Wallet not connected; reads and posting are unavailable");
    }

    match cli.command {
        Commands::List { json } => {
            let outcome = controller.load_questions().await?;
            println!("{}", render_questions(outcome, &controller.questions(), &config.display, json)?);
        }
        Commands::Answers { id } => match controller.toggle_answers(id).await? {
            ToggleOutcome::Skipped => println!("{}", CONNECT_PROMPT),
            _ => print_answers(&controller.shown_answers(id).unwrap_or_default()),
        },
        Commands::Post { content, bounty } => {
            controller.set_draft(content, bounty);
            let confirmation = controller.submit_draft().await?;
            println!("Question posted in {}", confirmation.tx_hash);
            let questions = controller.questions();
            let outcome = LoadOutcome::Loaded(questions.len());
            println!("{}", render_questions(outcome, &questions, &config.display, false)?);
        }
        Commands::Answer { question, content } => {
            let confirmation = controller.post_answer(question, &content).await?;
            println!("Answer posted in {}", confirmation.tx_hash);
            print_answers(&controller.shown_answers(question).unwrap_or_default());
        }
        Commands::Accept { question, answer } => {
            controller.load_questions().await?;
            let confirmation = controller.accept_answer(question, answer).await?;
            println!("Answer accepted in {}", confirmation.tx_hash);
            print_answers(&controller.shown_answers(question).unwrap_or_default());
        }
        Commands::Watch => watch(&cli.config, config, context, controller).await?,
    }

    Ok(())
}

async fn watch(
    path: &Path,
    config: BoardConfig,
    context: Arc<ConnectionContext>,
    controller: Arc<BoardController>,
) -> Result<(), Box<dyn Error>> {
    let shutdown = Shutdown::new();
    let sync = tokio::spawn(controller.run(shutdown.subscribe()));

    let (watcher, mut updates) = ConfigWatcher::new(path, config);
    let _watcher = watcher.run()?;

    let interrupted = shutdown.trigger_on_ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            Some(new_config) = updates.recv() => {
                tracing::info!(contract = %new_config.contract.address, "Rebinding after config change");
                context.replace_connector(RpcConnector::new(new_config));
                context.handle_event(WalletEvent::ChainChanged).await;
            }
            _ = &mut interrupted => break,
        }
    }

    sync.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Text for a question listing after a load finished with `outcome`.
fn render_questions(
    outcome: LoadOutcome,
    questions: &[Question],
    display: &DisplayConfig,
    json: bool,
) -> Result<String, serde_json::Error> {
    if outcome == LoadOutcome::Skipped {
        return Ok(CONNECT_PROMPT.to_string());
    }

    let skip = usize::from(display.first_question_is_placeholder);
    let visible = questions.get(skip..).unwrap_or_default();

    if json {
        return serde_json::to_string_pretty(visible);
    }

    if visible.is_empty() {
        return Ok("No questions yet".to_string());
    }

    let lines: Vec<String> = visible
        .iter()
        .map(|q| {
            let status = if q.answered { "Answered" } else { "Open" };
            format!(
                "Q#{}: {}\n    {} · {} ETH · {}",
                q.id,
                q.content,
                short_address(&q.author.to_string()),
                q.bounty,
                status
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

fn print_answers(answers: &[Answer]) {
    if answers.is_empty() {
        println!("No answers yet");
        return;
    }

    for answer in answers {
        let mark = if answer.accepted { " ✓ accepted" } else { "" };
        println!(
            "A#{} by {}{}\n    {}",
            answer.id,
            short_address(&answer.author.to_string()),
            mark,
            answer.content
        );
    }
}

fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn question(id: u64) -> Question {
        Question {
            id,
            content: format!("question {}", id),
            author: Address::ZERO,
            bounty: "0.1".to_string(),
            bounty_wei: U256::from(100_000_000_000_000_000u64),
            answered: false,
        }
    }

    #[test]
    fn test_unconnected_listing_prompts_for_wallet() {
        let display = DisplayConfig::default();

        let text = render_questions(LoadOutcome::Skipped, &[], &display, false).unwrap();
        assert_eq!(text, CONNECT_PROMPT);

        let text = render_questions(LoadOutcome::Loaded(0), &[], &display, false).unwrap();
        assert_eq!(text, "No questions yet");
    }

    #[test]
    fn test_placeholder_question_is_hidden_when_configured() {
        let display = DisplayConfig {
            first_question_is_placeholder: true,
        };
        let questions = vec![question(0), question(1)];

        let text = render_questions(LoadOutcome::Loaded(2), &questions, &display, false).unwrap();
        assert!(text.starts_with("Q#1: question 1"));
        assert!(!text.contains("Q#0"));
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            "0xf39f...2266"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
    }
}
