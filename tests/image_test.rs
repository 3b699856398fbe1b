mod helpers;

use std::sync::Arc;

use helpers::{new_user, state_with, state_with_images, test_db, user_with_partner, FakeImages, ScriptedModel};
use koibito::db::with_conn;
use koibito::error::CompanionError;
use koibito::image::service::{
    delete_image, generate_avatar, generate_chat_image, image_history, image_stats, AvatarRequest,
    ChatImageRequest, ONBOARDING_PARTNER_ID,
};

fn avatar_for(partner_id: &str) -> AvatarRequest {
    AvatarRequest {
        partner_id: Some(partner_id.to_string()),
        emotion: Some("shy".into()),
        location: Some("park".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn partner_avatar_keeps_features_and_is_stored() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let images = Arc::new(FakeImages::default());
    let state = state_with_images(conn, ScriptedModel::new(vec![]), images.clone());

    let image = generate_avatar(&state, &user.id, avatar_for(&partner.id)).await.unwrap();

    assert_eq!(image.partner_id, partner.id);
    assert_eq!(image.generation_id, "gen-1");
    assert_eq!(image.consistency_score, 1.0);
    assert!(image
        .prompt
        .starts_with("anime style young man, black short hair, brown eyes, gentle personality"));
    assert!(image.prompt.contains("shy expression with subtle reserved"));
    assert!(image.prompt.contains("wearing sporty casual wear, in park setting"));

    let sent = images.prompts.lock().unwrap()[0].clone();
    assert_eq!((sent.width, sent.height, sent.num_images), (512, 768, 1));
    assert_eq!(sent.guidance_scale, 8.0);

    let history = image_history(&state, &user.id, &partner.id, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, image.id);
}

#[tokio::test]
async fn onboarding_avatar_uses_prompt_and_is_not_saved() {
    let conn = test_db();
    let user = new_user(&conn, "new@example.com");
    let state = state_with_images(conn, ScriptedModel::new(vec![]), Arc::new(FakeImages::default()));

    let request = AvatarRequest {
        prompt: "anime style young woman, pink hair, smiling".into(),
        ..Default::default()
    };
    let image = generate_avatar(&state, &user.id, request).await.unwrap();

    assert!(image.id.starts_with("temp-"));
    assert_eq!(image.partner_id, ONBOARDING_PARTNER_ID);
    assert_eq!(image.prompt, "anime style young woman, pink hair, smiling");
    assert_eq!(image.consistency_score, 1.0);

    let stored: i64 = with_conn(&state.db, |conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM generated_images", [], |row| row.get(0))?)
    })
    .await
    .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn invalid_size_is_rejected_before_generation() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let images = Arc::new(FakeImages::default());
    let state = state_with_images(conn, ScriptedModel::new(vec![]), images.clone());

    let request = AvatarRequest {
        width: Some(100),
        ..avatar_for(&partner.id)
    };
    let err = generate_avatar(&state, &user.id, request).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CompanionError>(),
        Some(CompanionError::Validation { .. })
    ));
    assert!(images.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chat_image_follows_situation_and_counts_references() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let state = state_with_images(conn, ScriptedModel::new(vec![]), Arc::new(FakeImages::default()));
    generate_avatar(&state, &user.id, avatar_for(&partner.id)).await.unwrap();

    let request = ChatImageRequest {
        message: "海に行きたいな".into(),
        emotion: Some("happy".into()),
        situation: Some("beach_sunset".into()),
        use_reference: true,
        ..Default::default()
    };
    let image = generate_chat_image(&state, &user.id, &partner.id, request).await.unwrap();

    assert_eq!(image.context, "chat_message: 海に行きたいな");
    assert!(image.prompt.contains("wearing beach shirt and shorts, sitting in beach_sunset"));
    assert!(image.prompt.contains("looking at viewer"));
    let metadata = image.metadata.unwrap();
    assert_eq!(metadata["referenceCount"], 1);
    assert_eq!(metadata["useReference"], true);
}

#[tokio::test]
async fn generation_requires_a_configured_generator() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let state = state_with(conn, ScriptedModel::new(vec![]));

    let err = generate_avatar(&state, &user.id, avatar_for(&partner.id)).await.unwrap_err();
    assert!(err.to_string().contains("画像生成が設定されていません"));
}

#[tokio::test]
async fn stats_history_and_delete_are_owner_scoped() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 10);
    let stranger = new_user(&conn, "stranger@example.com");
    let state = state_with_images(conn, ScriptedModel::new(vec![]), Arc::new(FakeImages::default()));

    let first = generate_avatar(&state, &user.id, avatar_for(&partner.id)).await.unwrap();
    generate_avatar(&state, &user.id, avatar_for(&partner.id)).await.unwrap();

    let stats = image_stats(&state, &user.id, &partner.id).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.recent_7_days, 2);
    assert_eq!(stats.average_consistency, 1.0);

    let best = image_history(&state, &user.id, &partner.id, None, Some(0.9)).await.unwrap();
    assert_eq!(best.len(), 2);

    let err = image_history(&state, &stranger.id, &partner.id, None, None).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<CompanionError>(), Some(CompanionError::NotFound(_))));

    delete_image(&state, &user.id, &partner.id, &first.id).await.unwrap();
    let err = delete_image(&state, &user.id, &partner.id, &first.id).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<CompanionError>(), Some(CompanionError::NotFound(_))));

    let history = image_history(&state, &user.id, &partner.id, Some(10), None).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn catalog_location_adds_scenery() {
    let mut conn = test_db();
    let (user, partner) = user_with_partner(&mut conn, 30);
    let state = state_with_images(conn, ScriptedModel::new(vec![]), Arc::new(FakeImages::default()));

    let request = ChatImageRequest {
        message: "公園を散歩しよう".into(),
        location: Some("park".into()),
        ..Default::default()
    };
    let image = generate_chat_image(&state, &user.id, &partner.id, request).await.unwrap();

    assert!(image.prompt.contains("sitting in park"));
    assert!(image.prompt.ends_with("sunny park, green trees, blue sky, outdoor activities"));
    assert!(!image.prompt.contains("sporty casual wear"));
}
