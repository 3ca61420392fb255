//! Conversation history command handlers.

use crate::checklist::{self, ChecklistStore};
use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::conversation::{ConversationStore, Role};
use crate::error::Result;
use crate::extractor::extract_shopping_list;
use chrono::DateTime;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let repo = super::open_repository(config)?;
    let store = ConversationStore::new(repo.clone());
    let checklists = ChecklistStore::new(repo);

    match command {
        HistoryCommand::List => {
            let conversations = store.conversations()?;

            if conversations.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for conversation in conversations {
                let id_short = &conversation.id[..8.min(conversation.id.len())];
                let message_count = store.messages(&conversation.id)?.len();
                let updated = DateTime::parse_from_rfc3339(&conversation.updated_at)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|_| conversation.updated_at.clone());

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    conversation.title,
                    message_count,
                    updated
                ]);
            }

            println!("\nConversation History:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a conversation.",
                "kondate chat --resume <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => {
            let Some(conversation) = store.find_by_prefix(&id)? else {
                println!("{}", format!("No conversation matches '{}'", id).yellow());
                return Ok(());
            };

            println!("\n{} ({})\n", conversation.title.bold(), conversation.id);

            for message in store.messages(&conversation.id)? {
                match message.role {
                    Role::User => println!("{} {}", "あなた:".bold(), message.content),
                    Role::Assistant => {
                        let (items, remainder) = extract_shopping_list(&message.content);
                        println!("{}", "料理AI:".yellow().bold());
                        let remainder = remainder.trim();
                        if !remainder.is_empty() {
                            println!("{}", remainder);
                        }
                        if !items.is_empty() {
                            let checked = checklists.load(&message.id)?;
                            let (done, total) = checklist::progress(&checked, items.len());
                            println!(
                                "{} {}",
                                "買い物リスト".yellow(),
                                format!("{} / {} 完了", done, total).dimmed()
                            );
                        }
                    }
                }
                println!();
            }
        }
        HistoryCommand::Delete { id } => {
            let Some(conversation) = store.find_by_prefix(&id)? else {
                println!("{}", format!("No conversation matches '{}'", id).yellow());
                return Ok(());
            };

            store.delete_conversation(&conversation.id)?;
            println!(
                "{}",
                format!("Deleted conversation {}", conversation.id).green()
            );
        }
    }

    Ok(())
}
