mod helpers;

use helpers::{new_partner_input, new_user, test_db, user_with_partner};
use koibito::error::CompanionError;
use koibito::location::{update_partner_location, DEFAULT_LOCATION_ID};
use koibito::partner::store::{
    apply_preset, create_partner, create_with_onboarding, delete_partner, get_partner, get_partner_for_user,
    update_base_image, update_intimacy,
};
use koibito::partner::{PersonalityType, SpeechStyle};
use koibito::relationship::metrics::{relationship_report, update_levels};
use koibito::relationship::{calling_style, UserNames};
use koibito::user::{get_or_create_settings, require_user, update_settings, ProfileUpdate, SettingsUpdate};

fn error_kind(err: &anyhow::Error) -> Option<&CompanionError> {
    err.downcast_ref::<CompanionError>()
}

#[test]
fn partner_gets_generated_prompt_and_defaults() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 15);

    assert_eq!(partner.user_id, user.id);
    assert!(partner.system_prompt.starts_with("あなたの名前は蓮です。"));
    assert!(partner.avatar_description.starts_with("男性、短い髪"));
    assert_eq!(partner.intimacy_level, 15);
    assert_eq!(partner.current_location_id, DEFAULT_LOCATION_ID);
    assert_eq!(partner.hobbies, vec!["料理", "読書"]);
}

#[test]
fn second_partner_is_a_conflict() {
    let mut conn = test_db();
    let (user, _) = user_with_partner(&mut conn, 0);
    let err = create_partner(&mut conn, &user.id, new_partner_input(0)).unwrap_err();
    assert!(matches!(error_kind(&err), Some(CompanionError::Conflict(_))));
}

#[test]
fn onboarding_stores_names_and_resets_intimacy() {
    let mut conn = test_db();
    let user = new_user(&conn, "new@example.com");
    let profile = ProfileUpdate {
        surname: Some("山田".into()),
        first_name: Some("太郎".into()),
        nickname: None,
        birthday: Some("1998-04-01".into()),
    };
    let partner = create_with_onboarding(&mut conn, &user.id, profile, new_partner_input(80)).unwrap();

    assert_eq!(partner.intimacy_level, 0);
    let stored = require_user(&conn, &user.id).unwrap();
    assert_eq!(stored.surname.as_deref(), Some("山田"));
    assert_eq!(stored.nickname.as_deref(), Some("蓮"));
    assert_eq!(stored.birthday.as_deref(), Some("1998-04-01"));
}

#[test]
fn intimacy_is_clamped() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 95);
    assert_eq!(update_intimacy(&conn, &partner.id, &user.id, 10).unwrap().intimacy_level, 100);
    assert_eq!(update_intimacy(&conn, &partner.id, &user.id, -150).unwrap().intimacy_level, 0);
}

#[test]
fn presets_overwrite_personality() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);

    let updated = apply_preset(&conn, &partner.id, &user.id, PersonalityType::Cool).unwrap();
    assert_eq!(updated.personality_type, PersonalityType::Cool);
    assert_eq!(updated.speech_style, SpeechStyle::CoolTone);
    assert_ne!(updated.system_prompt, partner.system_prompt);

    let err = apply_preset(&conn, &partner.id, &user.id, PersonalityType::Otaku).unwrap_err();
    assert_eq!(err.to_string(), "無効なプリセットタイプです");
}

#[test]
fn partner_access_is_scoped_to_owner() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let other = new_user(&conn, "other@example.com");

    let err = get_partner(&conn, &partner.id, &other.id).unwrap_err();
    assert!(matches!(error_kind(&err), Some(CompanionError::NotFound(_))));
    assert!(delete_partner(&conn, &partner.id, &other.id).is_err());

    delete_partner(&conn, &partner.id, &user.id).unwrap();
    assert!(get_partner_for_user(&conn, &user.id).unwrap().is_none());
}

#[test]
fn location_unlock_follows_partner_intimacy() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 20);

    let moved = update_partner_location(&conn, &partner.id, &user.id, "park").unwrap();
    assert_eq!(moved.id, "park");
    assert_eq!(get_partner(&conn, &partner.id, &user.id).unwrap().current_location_id, "park");

    let err = update_partner_location(&conn, &partner.id, &user.id, "beach").unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(CompanionError::LocationLocked { required: 50 })
    ));

    let err = update_partner_location(&conn, &partner.id, &user.id, "moon").unwrap_err();
    assert!(matches!(error_kind(&err), Some(CompanionError::NotFound(_))));
}

#[test]
fn settings_default_and_validate_retention() {
    let mut conn = test_db();
    let (user, _) = user_with_partner(&mut conn, 0);

    let settings = get_or_create_settings(&conn, &user.id).unwrap();
    assert_eq!(settings.ai_model.model, "gpt-4o-mini");

    let update = SettingsUpdate {
        data_retention_days: Some(7),
        ..Default::default()
    };
    let err = update_settings(&conn, &user.id, &update).unwrap_err();
    assert!(matches!(error_kind(&err), Some(CompanionError::Validation { .. })));

    let update = SettingsUpdate {
        data_retention_days: Some(9999),
        ..Default::default()
    };
    assert_eq!(update_settings(&conn, &user.id, &update).unwrap().data_retention_days, 9999);
}

#[test]
fn calling_style_uses_stored_names() {
    let mut conn = test_db();
    let (user, _) = user_with_partner(&mut conn, 0);
    let names = UserNames::from_user(&user);
    assert_eq!(calling_style(&names, PersonalityType::Tsundere, 10), "あんた");
    assert_eq!(calling_style(&names, PersonalityType::Tsundere, 50), "はなちゃん");
    assert_eq!(calling_style(&UserNames::default(), PersonalityType::Gentle, 50), "あなた");
}

#[test]
fn base_image_is_owner_scoped() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let stranger = new_user(&conn, "other@example.com");

    let updated = update_base_image(&conn, &partner.id, &user.id, "https://cdn.example.com/base.png").unwrap();
    assert_eq!(updated.base_image_url.as_deref(), Some("https://cdn.example.com/base.png"));

    let err = update_base_image(&conn, &partner.id, &stranger.id, "https://evil.example.com/x.png").unwrap_err();
    assert!(matches!(error_kind(&err), Some(CompanionError::NotFound(_))));
}

#[test]
fn trust_and_connection_are_clamped() {
    let mut conn = test_db();
    let (_, partner) = user_with_partner(&mut conn, 70);

    let metrics = update_levels(&conn, &partner.id, Some(150), None).unwrap();
    assert_eq!(metrics.trust_level, 100);

    let metrics = update_levels(&conn, &partner.id, None, Some(-5)).unwrap();
    assert_eq!(metrics.trust_level, 100);
    assert_eq!(metrics.emotional_connection, 0);

    let report = relationship_report(&conn, &partner.id).unwrap();
    assert_eq!(report.metrics.intimacy_level, 70);
}

#[test]
fn too_short_prompt_rejects_the_partner() {
    let mut conn = test_db();
    let user = new_user(&conn, "short@example.com");
    let input = koibito::partner::NewPartner {
        system_prompt: "優しい".into(),
        ..new_partner_input(0)
    };

    let err = create_partner(&mut conn, &user.id, input).unwrap_err();
    match error_kind(&err) {
        Some(CompanionError::Validation { message, warnings }) => {
            assert_eq!(message, "システムプロンプトに問題があります");
            assert_eq!(warnings, &vec!["プロンプトが短すぎます。より詳細な設定をお勧めします。".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(get_partner_for_user(&conn, &user.id).unwrap().is_none());
}
