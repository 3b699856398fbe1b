mod helpers;

use chrono::{Duration, Utc};
use helpers::{new_partner_input, new_user, test_db, user_with_partner};
use koibito::chat::messages::{insert_message, message_count, MessageSender};
use koibito::memory::maintenance::{cleanup_expired_memories, purge_expired_messages};
use koibito::memory::store::{list_memories, store_memory};
use koibito::memory::types::{MemoryType, NewMemory};
use koibito::partner::store::create_partner;
use koibito::user::{update_settings, SettingsUpdate};
use serde_json::json;

fn memory(content: &str, importance: u8) -> NewMemory {
    NewMemory {
        memory_type: MemoryType::Fact,
        content: content.into(),
        importance,
        emotional_weight: 0.0,
        tags: vec![],
        related_people: vec![],
    }
}

fn retention(days: u32) -> SettingsUpdate {
    SettingsUpdate {
        data_retention_days: Some(days),
        ..Default::default()
    }
}

#[test]
fn important_memories_outlive_the_base_period() {
    let mut conn = test_db();
    let (_, partner) = user_with_partner(&mut conn, 10);
    store_memory(&mut conn, &partner.id, &memory("昼ごはんはパン", 3), &[]).unwrap();
    store_memory(&mut conn, &partner.id, &memory("誕生日は5月3日", 8), &[]).unwrap();

    let later = Utc::now() + Duration::days(100);

    let dry = cleanup_expired_memories(&mut conn, 90, true, later).unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.candidates.len(), 1);
    assert_eq!(dry.candidates[0].content_preview, "昼ごはんはパン");
    assert_eq!(dry.deleted, 0);
    assert_eq!(list_memories(&conn, &partner.id, 10).unwrap().len(), 2);

    let result = cleanup_expired_memories(&mut conn, 90, false, later).unwrap();
    assert_eq!(result.deleted, 1);
    let left = list_memories(&conn, &partner.id, 10).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].importance, 8);

    let audit: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_log WHERE operation = 'cleanup'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(audit, 1);
}

#[test]
fn messages_are_purged_per_user_retention() {
    let mut conn = test_db();
    let (short, short_partner) = user_with_partner(&mut conn, 10);
    let keeper = new_user(&conn, "keeper@example.com");
    let keeper_partner = create_partner(&mut conn, &keeper.id, new_partner_input(10)).unwrap();
    update_settings(&conn, &short.id, &retention(30)).unwrap();
    update_settings(&conn, &keeper.id, &retention(9999)).unwrap();

    for partner_id in [&short_partner.id, &keeper_partner.id] {
        insert_message(&conn, partner_id, "おはよう", MessageSender::User, None, &json!({})).unwrap();
        insert_message(&conn, partner_id, "おはよう！", MessageSender::Partner, Some("happy"), &json!({})).unwrap();
    }

    let later = Utc::now() + Duration::days(40);
    let dry = purge_expired_messages(&mut conn, true, later).unwrap();
    assert_eq!(dry.users_checked, 1);
    assert_eq!(dry.messages_deleted, 2);
    assert_eq!(message_count(&conn, &short_partner.id).unwrap(), 2);

    let purged = purge_expired_messages(&mut conn, false, later).unwrap();
    assert_eq!(purged.messages_deleted, 2);
    assert_eq!(message_count(&conn, &short_partner.id).unwrap(), 0);
    assert_eq!(message_count(&conn, &keeper_partner.id).unwrap(), 2);
}

#[test]
fn recent_messages_survive() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    update_settings(&conn, &user.id, &retention(30)).unwrap();
    insert_message(&conn, &partner.id, "さっきの話", MessageSender::User, None, &json!({})).unwrap();

    let result = purge_expired_messages(&mut conn, false, Utc::now()).unwrap();
    assert_eq!(result.messages_deleted, 0);
    assert_eq!(message_count(&conn, &partner.id).unwrap(), 1);
}
