//! Storage integration tests against a real on-disk SQLite database

use tempfile::TempDir;

use parlance::account::{PlanTier, RegisteredUser, User};
use parlance::chat::Conversation;
use parlance::storage::SqliteStorage;

fn open_storage(tmp: &TempDir) -> SqliteStorage {
    SqliteStorage::new_with_path(tmp.path().join("parlance.db")).unwrap()
}

#[test]
fn test_conversations_survive_reopen() {
    let tmp = TempDir::new().unwrap();

    let mut conversation = Conversation::with_greeting("hello");
    conversation.push(parlance::chat::Message::user("first question"));
    let id = conversation.id.clone();

    {
        let storage = open_storage(&tmp);
        storage.upsert_conversation(&conversation).unwrap();
    }

    // A fresh handle on the same path sees the stored conversation.
    let storage = open_storage(&tmp);
    let loaded = storage.load_conversation(&id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.messages.len(), 2);
    assert_eq!(loaded.messages[1].content, "first question");
}

#[test]
fn test_list_orders_by_most_recent_update() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp);

    let older = Conversation::with_greeting("hi");
    let mut newer = Conversation::with_greeting("hi");
    storage.upsert_conversation(&older).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(10));
    storage.upsert_conversation(&newer).unwrap();

    // Touching the older one moves it back to the front.
    std::thread::sleep(std::time::Duration::from_millis(10));
    newer.push(parlance::chat::Message::user("bump"));
    storage.upsert_conversation(&newer).unwrap();

    let summaries = storage.list_conversations().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, newer.id);
    assert_eq!(summaries[0].message_count, 2);
}

#[test]
fn test_prefix_lookup_and_delete() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp);

    let conversation = Conversation::with_greeting("hi");
    storage.upsert_conversation(&conversation).unwrap();

    let prefix = &conversation.id[..8];
    let found = storage.load_conversation(prefix).unwrap().unwrap();
    assert_eq!(found.id, conversation.id);

    storage.delete_conversation(prefix).unwrap();
    assert!(storage.load_conversation(prefix).unwrap().is_none());
    assert!(storage.list_conversations().unwrap().is_empty());
}

#[test]
fn test_current_user_roundtrip_and_logout() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp);

    assert!(storage.load_user().unwrap().is_none());

    let mut user = User::new("bob@example.com");
    user.plan = Some(PlanTier::Pro);
    user.has_selected_plan = true;
    storage.save_user(&user).unwrap();

    let loaded = storage.load_user().unwrap().unwrap();
    assert_eq!(loaded.email, "bob@example.com");
    assert_eq!(loaded.plan, Some(PlanTier::Pro));

    storage.clear_user().unwrap();
    assert!(storage.load_user().unwrap().is_none());
}

#[test]
fn test_registered_user_upsert_keeps_password() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp);

    let record = RegisteredUser {
        profile: User::new("carol@example.com"),
        password: "secret1".to_string(),
    };
    storage.save_registered_user(&record).unwrap();

    // persist_user merges updated profile fields into the registered
    // record without touching the stored password.
    let mut updated = record.profile.clone();
    updated.plan = Some(PlanTier::Free);
    updated.has_selected_plan = true;
    storage.persist_user(&updated).unwrap();

    let found = storage
        .find_registered_user("carol@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(found.password, "secret1");
    assert_eq!(found.profile.plan, Some(PlanTier::Free));
}

#[test]
fn test_corrupt_conversation_row_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("parlance.db");
    let storage = SqliteStorage::new_with_path(&db_path).unwrap();

    let good = Conversation::with_greeting("hi");
    storage.upsert_conversation(&good).unwrap();

    // Inject a row whose messages column is not valid JSON.
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "INSERT INTO conversations (id, title, created_at, updated_at, messages)
         VALUES ('broken-id', 'Broken', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z', 'not json')",
        [],
    )
    .unwrap();

    let summaries = storage.list_conversations().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, good.id);

    assert!(storage.load_conversation("broken-id").unwrap().is_none());
}
