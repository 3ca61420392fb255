//! Chat session integration tests.
//!
//! Drives the session controller through the real HTTP relay client
//! against a wiremock relay, covering the full send path: local commits,
//! title derivation, shopping-list extraction from the reply, checklist
//! toggling, and error recovery.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kondate::checklist::{self, ChecklistStore};
use kondate::conversation::{ConversationStore, Role};
use kondate::extractor::extract_shopping_list;
use kondate::relay::client::HttpRelayClient;
use kondate::session::{ChatSession, SendOutcome, SessionState};
use kondate::storage::{MemoryRepository, Repository};

fn new_session(relay_url: String, repo: Arc<dyn Repository>) -> ChatSession {
    let relay = Arc::new(HttpRelayClient::new(relay_url).unwrap());
    ChatSession::new(relay, ConversationStore::new(repo), "user_test".to_string())
}

async fn mount_reset(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "会話がリセットされました"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fresh_conversation_with_shopping_list_reply() {
    let server = MockServer::start().await;
    mount_reset(&server).await;

    let answer = "親子丼はいかがでしょう。\n\n買い物リスト:\n・鶏もも肉 300g\n・卵 4個\n\n調理時間は約20分です。";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "message": "鶏肉、玉ねぎ",
            "userId": "user_test"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": answer,
            "conversationId": "relay-conv-1",
            "messageId": "relay-msg-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let mut session = new_session(server.uri(), repo.clone());

    session.new_conversation().await.unwrap();
    let outcome = session.send("鶏肉、玉ねぎ").await.unwrap();
    let SendOutcome::Completed(reply) = outcome else {
        panic!("expected completed send");
    };

    // Conversation title comes from the first user message, unchanged
    // because it is under 30 characters.
    let conversations = session.store().conversations().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].title, "鶏肉、玉ねぎ");

    // One user message, one assistant message with the vendor id.
    let conversation_id = session.active_conversation().unwrap().to_string();
    let messages = session.store().messages(&conversation_id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].id, "relay-msg-1");

    // The reply renders as remainder text plus a checklist of 2 unchecked
    // items.
    let (items, remainder) = extract_shopping_list(&reply.content);
    assert_eq!(items, vec!["鶏もも肉 300g", "卵 4個"]);
    assert!(remainder.contains("親子丼はいかがでしょう。"));
    assert!(remainder.contains("調理時間は約20分です。"));

    let checklists = ChecklistStore::new(repo);
    let checked = checklists.load(&reply.id).unwrap();
    assert!(checked.is_empty());
    assert_eq!(checklist::progress(&checked, items.len()), (0, 2));
}

#[tokio::test]
async fn test_checklist_toggles_persist_per_message() {
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let checklists = ChecklistStore::new(repo.clone());

    let items = vec!["鶏もも肉 300g".to_string(), "卵 4個".to_string()];

    checklists.toggle("relay-msg-1", 0).unwrap();
    let checked = checklists.toggle("relay-msg-1", 1).unwrap();
    assert!(checklist::is_complete(&checked, items.len()));

    // Reload from storage under the same message id.
    let reloaded = ChecklistStore::new(repo).load("relay-msg-1").unwrap();
    assert_eq!(reloaded, BTreeSet::from([0, 1]));
}

#[tokio::test]
async fn test_relay_500_is_absorbed_into_the_conversation() {
    let server = MockServer::start().await;
    mount_reset(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Dify APIエラー",
            "details": "upstream exploded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let mut session = new_session(server.uri(), repo);

    session.new_conversation().await.unwrap();
    let outcome = session.send("材料があります").await.unwrap();
    let SendOutcome::Completed(message) = outcome else {
        panic!("expected completed send");
    };

    assert_eq!(message.role, Role::Assistant);
    assert!(message.content.contains("エラーが発生しました"));
    assert!(message.content.contains("upstream exploded"));

    // The user message is neither lost nor duplicated, and the session is
    // back to Idle.
    let conversation_id = session.active_conversation().unwrap().to_string();
    let messages = session.store().messages(&conversation_id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "材料があります");
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_unreachable_relay_is_absorbed_too() {
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    // Nothing is listening on the discard port.
    let mut session = new_session("http://127.0.0.1:9".to_string(), repo);

    // new_conversation survives the failed reset.
    session.new_conversation().await.unwrap();

    let outcome = session.send("材料があります").await.unwrap();
    let SendOutcome::Completed(message) = outcome else {
        panic!("expected completed send");
    };
    assert!(message.content.contains("エラーが発生しました"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_long_first_message_truncates_title() {
    let server = MockServer::start().await;
    mount_reset(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "承知しました",
            "conversationId": "relay-conv-2",
            "messageId": "relay-msg-2"
        })))
        .mount(&server)
        .await;

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let mut session = new_session(server.uri(), repo);
    session.new_conversation().await.unwrap();

    let long_message: String = "あ".repeat(35);
    session.send(&long_message).await.unwrap();

    let conversations = session.store().conversations().unwrap();
    assert_eq!(conversations[0].title, format!("{}...", "あ".repeat(30)));
}

#[tokio::test]
async fn test_deleting_conversation_keeps_orphaned_checklist_state() {
    let server = MockServer::start().await;
    mount_reset(&server).await;

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let checklists = ChecklistStore::new(repo.clone());
    let mut session = new_session(server.uri(), repo);

    let conversation = session.new_conversation().await.unwrap();
    checklists.toggle("some-msg", 0).unwrap();

    session.delete_conversation(&conversation.id).unwrap();

    // Conversation and messages are gone; checklist state is accepted
    // drift and stays behind.
    assert!(session.store().conversations().unwrap().is_empty());
    assert!(checklists.load("some-msg").unwrap().contains(&0));
    assert!(session.active_conversation().is_none());
}
