//! Interactive chat client.
//!
//! A readline loop standing in for the original browser UI: plain input is
//! sent through the session controller to the relay, assistant replies are
//! rendered as remainder text plus an interactive shopping-list checklist,
//! and slash commands manage conversations, checklist toggles, and the
//! theme preference.

use crate::checklist::{self, ChecklistStore};
use crate::config::Config;
use crate::conversation::{ConversationStore, Message, Role};
use crate::error::Result;
use crate::extractor::extract_shopping_list;
use crate::relay::client::{HttpRelayClient, Relay};
use crate::session::{ensure_user_id, ChatSession, RejectReason, SendOutcome};
use crate::storage::{Repository, KEY_THEME};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Slash commands recognized by the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    /// Start a new conversation (`/new`)
    New,
    /// List stored conversations (`/list`)
    List,
    /// Open a conversation by id prefix (`/open <id>`)
    Open(String),
    /// Delete a conversation by id prefix (`/delete <id>`)
    Delete(String),
    /// Toggle a checklist item by 1-based number (`/check <n>`)
    Check(usize),
    /// Flip the persisted theme preference (`/theme`)
    Theme,
    /// Show command help (`/help`, or any malformed slash command)
    Help,
    /// Leave the chat (`/quit`, `/exit`)
    Exit,
    /// Not a slash command: send as a chat message
    None,
}

/// The checklist most recently rendered, targeted by `/check`
struct ActiveChecklist {
    message_id: String,
    items: Vec<String>,
}

/// Parse a slash command from trimmed input
fn parse_chat_command(input: &str) -> ChatCommand {
    let mut parts = input.split_whitespace();
    match parts.next() {
        Some("/new") => ChatCommand::New,
        Some("/list") => ChatCommand::List,
        Some("/open") => match parts.next() {
            Some(id) => ChatCommand::Open(id.to_string()),
            None => ChatCommand::Help,
        },
        Some("/delete") => match parts.next() {
            Some(id) => ChatCommand::Delete(id.to_string()),
            None => ChatCommand::Help,
        },
        Some("/check") => match parts.next().and_then(|n| n.parse().ok()) {
            Some(number) => ChatCommand::Check(number),
            None => ChatCommand::Help,
        },
        Some("/theme") => ChatCommand::Theme,
        Some("/help") => ChatCommand::Help,
        Some("/quit") | Some("/exit") => ChatCommand::Exit,
        Some(other) if other.starts_with('/') => ChatCommand::Help,
        _ => ChatCommand::None,
    }
}

/// Start the interactive chat client
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `relay_url` - Optional relay URL override from the CLI
/// * `resume` - Optional conversation id (or prefix) to reopen
pub async fn run_chat(
    config: Config,
    relay_url: Option<String>,
    resume: Option<String>,
) -> Result<()> {
    let repo = super::open_repository(&config)?;
    let user_id = ensure_user_id(repo.as_ref())?;
    tracing::debug!("Chat client user id: {}", user_id);

    let relay_url = relay_url.unwrap_or_else(|| config.chat.relay_url.clone());
    let relay: Arc<dyn Relay> = Arc::new(HttpRelayClient::new(relay_url)?);

    let checklists = ChecklistStore::new(repo.clone());
    let store = ConversationStore::new(repo.clone());
    let mut session = ChatSession::new(relay.clone(), store, user_id);

    apply_theme(repo.as_ref());
    println!("{}", "Kondate | 料理AIに材料からレシピを相談".bold());
    print_health(relay.as_ref()).await;
    println!("{}", "/help でコマンド一覧".dimmed());
    println!();

    let mut last_list: Option<ActiveChecklist> = None;

    match resume {
        Some(prefix) => match session.store().find_by_prefix(&prefix)? {
            Some(conversation) => {
                session.open_conversation(&conversation.id);
                println!("{}", format!("「{}」を再開します", conversation.title).cyan());
                last_list = replay_messages(&session, &checklists, &conversation.id)?;
            }
            None => {
                println!("{}", "指定された会話が見つかりません".yellow());
                session.new_conversation().await?;
            }
        },
        None => {
            session.new_conversation().await?;
            println!("{}", "新しい相談を始めます。材料を入力してください。".green());
        }
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("あなた> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match parse_chat_command(trimmed) {
                    ChatCommand::New => {
                        session.new_conversation().await?;
                        last_list = None;
                        println!("{}", "新しい相談を始めます".green());
                    }
                    ChatCommand::List => print_conversation_list(&session)?,
                    ChatCommand::Open(prefix) => {
                        match session.store().find_by_prefix(&prefix)? {
                            Some(conversation) => {
                                session.open_conversation(&conversation.id);
                                println!(
                                    "{}",
                                    format!("「{}」を開きます", conversation.title).cyan()
                                );
                                last_list =
                                    replay_messages(&session, &checklists, &conversation.id)?;
                            }
                            None => println!("{}", "指定された会話が見つかりません".yellow()),
                        }
                    }
                    ChatCommand::Delete(prefix) => {
                        match session.store().find_by_prefix(&prefix)? {
                            Some(conversation) => {
                                session.delete_conversation(&conversation.id)?;
                                println!(
                                    "{}",
                                    format!("「{}」を削除しました", conversation.title).green()
                                );
                                if session.active_conversation().is_none() {
                                    last_list = None;
                                    println!(
                                        "{}",
                                        "/new で新しい相談を始めてください".dimmed()
                                    );
                                }
                            }
                            None => println!("{}", "指定された会話が見つかりません".yellow()),
                        }
                    }
                    ChatCommand::Check(number) => {
                        handle_check(&checklists, &last_list, number)?;
                    }
                    ChatCommand::Theme => toggle_theme(repo.as_ref())?,
                    ChatCommand::Help => print_help(),
                    ChatCommand::Exit => break,
                    ChatCommand::None => match session.send(trimmed).await? {
                        SendOutcome::Completed(message) => {
                            if let Some(active) = render_assistant(&message, &checklists)? {
                                last_list = Some(active);
                            }
                        }
                        SendOutcome::Rejected(RejectReason::Busy) => {
                            println!("{}", "送信中です。返答をお待ちください".yellow());
                        }
                        SendOutcome::Rejected(RejectReason::EmptyMessage) => {}
                        SendOutcome::Rejected(RejectReason::NoActiveConversation) => {
                            println!("{}", "/new で新しい相談を始めてください".yellow());
                        }
                    },
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("{}", "ご利用ありがとうございました".dimmed());
    Ok(())
}

/// Check relay health once at startup; the result is informational only
/// and never blocks sending.
async fn print_health(relay: &dyn Relay) {
    match relay.health().await {
        Ok(health) if health.status == "ok" && health.api_configured => {
            println!("{} {}", "●".green(), "Dify API接続済み");
        }
        Ok(health) if health.status == "ok" => {
            println!("{} {}", "●".yellow(), "APIキー未設定");
        }
        Ok(_) => println!("{} {}", "●".red(), "接続エラー"),
        Err(_) => println!("{} {}", "●".red(), "サーバーに接続できません"),
    }
}

/// Re-render a conversation's messages, returning the last checklist seen
fn replay_messages(
    session: &ChatSession,
    checklists: &ChecklistStore,
    conversation_id: &str,
) -> Result<Option<ActiveChecklist>> {
    let mut last = None;
    for message in session.store().messages(conversation_id)? {
        match message.role {
            Role::User => println!("{} {}", "あなた:".bold(), message.content),
            Role::Assistant => {
                if let Some(active) = render_assistant(&message, checklists)? {
                    last = Some(active);
                }
            }
        }
    }
    Ok(last)
}

/// Render an assistant message: remainder text, then the checklist when
/// the extractor found shopping-list items.
fn render_assistant(
    message: &Message,
    checklists: &ChecklistStore,
) -> Result<Option<ActiveChecklist>> {
    let (items, remainder) = extract_shopping_list(&message.content);

    println!("{}", "料理AI:".yellow().bold());
    let remainder = remainder.trim();
    if !remainder.is_empty() {
        println!("{}", remainder);
    }

    if items.is_empty() {
        println!();
        return Ok(None);
    }

    let checked = checklists.load(&message.id)?;
    print_checklist(&items, &checked);
    println!();

    Ok(Some(ActiveChecklist {
        message_id: message.id.clone(),
        items,
    }))
}

/// Print the checklist block with progress and completion marker
fn print_checklist(items: &[String], checked: &BTreeSet<usize>) {
    let (done, total) = checklist::progress(checked, items.len());
    println!(
        "{} {}",
        "買い物リスト".yellow().bold(),
        format!("{} / {} 完了", done, total).dimmed()
    );

    for (index, item) in items.iter().enumerate() {
        if checked.contains(&index) {
            println!(
                "  {:>2} [{}] {}",
                index + 1,
                "x".green(),
                item.strikethrough().dimmed()
            );
        } else {
            println!("  {:>2} [ ] {}", index + 1, item);
        }
    }

    if checklist::is_complete(checked, items.len()) {
        println!("{}", "✨ 買い物完了！".green().bold());
    }
}

/// Toggle one item of the most recently rendered checklist.
///
/// `/check` numbers are 1-based; this is the render-layer bounds check
/// that keeps toggled indices within the current extraction.
fn handle_check(
    checklists: &ChecklistStore,
    last_list: &Option<ActiveChecklist>,
    number: usize,
) -> Result<()> {
    let Some(active) = last_list else {
        println!("{}", "チェックできるリストがありません".yellow());
        return Ok(());
    };

    if number == 0 || number > active.items.len() {
        println!(
            "{}",
            format!("番号が範囲外です (1-{})", active.items.len()).yellow()
        );
        return Ok(());
    }

    let checked = checklists.toggle(&active.message_id, number - 1)?;
    print_checklist(&active.items, &checked);
    Ok(())
}

/// Print the numbered conversation list, marking the active one
fn print_conversation_list(session: &ChatSession) -> Result<()> {
    let conversations = session.store().conversations()?;
    if conversations.is_empty() {
        println!("{}", "保存された会話はありません".yellow());
        return Ok(());
    }

    for conversation in conversations {
        let id_short = &conversation.id[..8.min(conversation.id.len())];
        let marker = if session.active_conversation() == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} [{}] {}",
            marker,
            id_short.cyan(),
            conversation.title
        );
    }
    println!("{}", "/open <ID> で会話を開きます".dimmed());
    Ok(())
}

/// Toggle and persist the theme preference.
///
/// The light theme renders without color; the preference itself is the
/// persisted contract.
fn toggle_theme(repo: &dyn Repository) -> Result<()> {
    let current = repo.get(KEY_THEME)?.unwrap_or_else(|| "dark".to_string());
    let next = if current == "light" { "dark" } else { "light" };
    repo.set(KEY_THEME, next)?;

    colored::control::set_override(next != "light");
    println!("テーマを {} に切り替えました", next);
    Ok(())
}

/// Apply the persisted theme preference at startup
fn apply_theme(repo: &dyn Repository) {
    let theme = repo
        .get(KEY_THEME)
        .ok()
        .flatten()
        .unwrap_or_else(|| "dark".to_string());
    if theme == "light" {
        colored::control::set_override(false);
    }
}

/// Print chat command help
fn print_help() {
    println!("コマンド一覧:");
    println!("  /new           新しい相談を始める");
    println!("  /list          保存された会話を一覧表示");
    println!("  /open <ID>     会話を開く (IDは先頭一致)");
    println!("  /delete <ID>   会話を削除する");
    println!("  /check <番号>  買い物リストの項目をチェック/解除");
    println!("  /theme         テーマを切り替える");
    println!("  /help          このヘルプを表示");
    println!("  /quit          終了する");
}
