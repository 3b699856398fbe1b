use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

use koibito::config::ImageConfig;
use koibito::error::CompanionError;
use koibito::image::leonardo::{GenerationParams, ImageGenerator, LeonardoClient};

fn client(server: &MockServer, poll_attempts: u32) -> LeonardoClient {
    let config = ImageConfig {
        base_url: server.base_url(),
        poll_attempts,
        poll_interval_secs: 0,
        request_timeout_secs: 5,
        ..Default::default()
    };
    LeonardoClient::new(&config, "leo-key").unwrap()
}

fn params() -> GenerationParams {
    GenerationParams::from_config(&ImageConfig::default(), "anime style young man, black hair")
}

#[tokio::test]
async fn submits_then_polls_until_complete() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/generations")
                .header("authorization", "Bearer leo-key")
                .json_body_partial(r#"{"num_images": 1, "guidance_scale": 8, "width": 512}"#);
            then.status(200)
                .json_body(json!({"sdGenerationJob": {"generationId": "g1"}}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/generations/g1");
            then.status(200).json_body(json!({
                "generations_by_pk": {
                    "status": "COMPLETE",
                    "generated_images": [{"url": "https://cdn.leonardo.ai/g1.png"}]
                }
            }));
        })
        .await;

    let result = client(&server, 3).generate(&params()).await.unwrap();

    assert_eq!(result.generation_id, "g1");
    assert_eq!(result.image_url, "https://cdn.leonardo.ai/g1.png");
    assert_eq!(result.thumbnail_url.as_deref(), Some("https://cdn.leonardo.ai/g1.png"));
    submit.assert_async().await;
    poll.assert_hits_async(1).await;
}

#[tokio::test]
async fn failed_generation_stops_polling() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generations");
            then.status(200).json_body(json!({"generationId": "g2"}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/generations/g2");
            then.status(200)
                .json_body(json!({"generations_by_pk": {"status": "FAILED", "error": "nsfw"}}));
        })
        .await;

    let err = client(&server, 5).generate(&params()).await.unwrap_err();

    assert!(err.to_string().contains("nsfw"));
    poll.assert_hits_async(1).await;
}

#[tokio::test]
async fn pending_generation_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generations");
            then.status(200).json_body(json!({"id": "g3"}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/generations/g3");
            then.status(200)
                .json_body(json!({"generations_by_pk": {"status": "PENDING"}}));
        })
        .await;

    let err = client(&server, 3).generate(&params()).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<CompanionError>(), Some(CompanionError::Timeout(_))));
    poll.assert_hits_async(3).await;
}

#[tokio::test]
async fn missing_generation_id_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generations");
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;

    let err = client(&server, 1).generate(&params()).await.unwrap_err();
    assert!(err.to_string().contains("Generation ID"));
}

#[tokio::test]
async fn rate_limited_submit_is_classified() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/generations");
            then.status(429).body("slow down");
        })
        .await;

    let err = client(&server, 1).generate(&params()).await.unwrap_err();
    assert!(koibito::error::is_rate_limited(&err));
}

#[tokio::test]
async fn invalid_params_never_reach_the_api() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST).path("/generations");
            then.status(200).json_body(json!({"id": "never"}));
        })
        .await;

    let mut bad = params();
    bad.num_images = 0;
    let err = client(&server, 1).generate(&bad).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CompanionError>(),
        Some(CompanionError::Validation { .. })
    ));
    submit.assert_hits_async(0).await;
}
