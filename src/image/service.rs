//! Image generation flows: avatars and in-chat pictures.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::clothing::{background_elements, clothing_prompt, recommended_clothing, Season};
use super::leonardo::{GenerationParams, GenerationResult, ImageGenerator};
use super::prompt::{build_chat_prompt, build_consistent_prompt, consistency_score, SceneRequest};
use super::store::{
    self, GeneratedImage, ImageStats, NewImage, DEFAULT_HISTORY_LIMIT, HIGH_CONSISTENCY_THRESHOLD,
};
use crate::db::with_conn;
use crate::error::CompanionError;
use crate::location::location_by_id;
use crate::partner::store::get_partner;
use crate::state::AppState;

/// Placeholder owner of images generated before a partner exists.
pub const ONBOARDING_PARTNER_ID: &str = "temp-onboarding";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarRequest {
    /// `None` during onboarding: the prompt is used verbatim and nothing is
    /// stored.
    pub partner_id: Option<String>,
    pub prompt: String,
    pub context: String,
    pub emotion: Option<String>,
    pub location: Option<String>,
    pub clothing: Option<String>,
    pub intimacy_level: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub num_images: Option<u32>,
    pub guidance_scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatImageRequest {
    pub message: String,
    pub emotion: Option<String>,
    pub situation: Option<String>,
    pub location: Option<String>,
    pub intimacy_level: Option<u8>,
    pub use_reference: bool,
}

fn generator(state: &AppState) -> Result<Arc<dyn ImageGenerator>> {
    state
        .images
        .clone()
        .context("画像生成が設定されていません (LEONARDO_API_KEY)")
}

pub async fn generate_avatar(state: &AppState, user_id: &str, request: AvatarRequest) -> Result<GeneratedImage> {
    let generator = generator(state)?;

    let partner = match request.partner_id.clone() {
        Some(partner_id) => {
            let user_id = user_id.to_string();
            Some(with_conn(&state.db, move |conn| get_partner(conn, &partner_id, &user_id)).await?)
        }
        None => {
            tracing::info!("onboarding avatar, prompt used as given");
            None
        }
    };

    let prompt = match &partner {
        Some(partner) => build_consistent_prompt(
            partner,
            &SceneRequest {
                emotion: request.emotion.clone(),
                location: request.location.clone(),
                clothing: request.clothing.clone(),
                intimacy: request.intimacy_level,
            },
        ),
        None => request.prompt.clone(),
    };

    let defaults = &state.config.image;
    let params = GenerationParams {
        prompt,
        model_id: defaults.model_id.clone(),
        width: request.width.unwrap_or(defaults.width),
        height: request.height.unwrap_or(defaults.height),
        num_images: request.num_images.unwrap_or(1),
        guidance_scale: request.guidance_scale.unwrap_or(defaults.guidance_scale).round(),
    };
    params.validate()?;

    let generated = generator
        .generate(&params)
        .await
        .map_err(|e| wrap_generation_error(e, "画像生成に失敗しました"))?;

    let metadata = json!({
        "originalRequest": request,
        "leonardoParams": generated.params,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
    });

    let Some(partner) = partner else {
        return Ok(unsaved_image(generated, request.context, metadata));
    };

    let new = NewImage {
        image_url: generated.image_url,
        thumbnail_url: generated.thumbnail_url,
        consistency_score: consistency_score(&partner, &params.prompt),
        prompt: params.prompt,
        context: request.context,
        generation_id: generated.generation_id,
        model_used: params.model_id,
        metadata: Some(metadata),
    };
    let image = with_conn(&state.db, move |conn| store::insert_image(conn, &partner.id, new)).await?;
    tracing::info!(image_id = %image.id, score = image.consistency_score, "avatar generated");
    Ok(image)
}

fn unsaved_image(generated: GenerationResult, context: String, metadata: serde_json::Value) -> GeneratedImage {
    let now = chrono::Utc::now();
    GeneratedImage {
        id: format!("temp-{}", now.timestamp_millis()),
        partner_id: ONBOARDING_PARTNER_ID.into(),
        image_url: generated.image_url,
        thumbnail_url: generated.thumbnail_url,
        prompt: generated.params.prompt,
        context,
        consistency_score: 1.0,
        generation_id: generated.generation_id,
        model_used: generated.params.model_id,
        metadata: Some(metadata),
        created_at: now.to_rfc3339(),
    }
}

/// Domain errors pass through untouched; anything else gets `label`.
fn wrap_generation_error(err: anyhow::Error, label: &str) -> anyhow::Error {
    if err.downcast_ref::<CompanionError>().is_some() {
        err
    } else {
        err.context(label.to_string())
    }
}

pub async fn generate_chat_image(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    request: ChatImageRequest,
) -> Result<GeneratedImage> {
    let generator = generator(state)?;

    let (user_id, pid) = (user_id.to_string(), partner_id.to_string());
    let use_reference = request.use_reference;
    let (partner, references) = with_conn(&state.db, move |conn| {
        let partner = get_partner(conn, &pid, &user_id)?;
        let references = if use_reference {
            store::high_consistency_images(conn, &pid, HIGH_CONSISTENCY_THRESHOLD)?
        } else {
            Vec::new()
        };
        Ok((partner, references))
    })
    .await?;

    // Catalog locations dress the partner for the place and describe its scenery.
    let catalog_location = request.location.as_deref().and_then(location_by_id);
    let scene = SceneRequest {
        emotion: request.emotion.clone(),
        location: request.location.clone(),
        clothing: catalog_location.map(|loc| {
            let style = recommended_clothing(loc.id, partner.gender);
            clothing_prompt(style, partner.gender, Season::current()).prompt.to_string()
        }),
        intimacy: request.intimacy_level,
    };
    let mut prompt = build_chat_prompt(&partner, &scene, request.situation.as_deref());
    if let Some(loc) = catalog_location {
        prompt.push_str(", ");
        prompt.push_str(&background_elements(loc.id, loc.time_of_day.as_str()));
    }
    let params = GenerationParams::from_config(&state.config.image, prompt);
    tracing::info!(
        partner_id,
        emotion = ?request.emotion,
        situation = ?request.situation,
        references = references.len(),
        "generating chat image"
    );

    let generated = generator
        .generate(&params)
        .await
        .map_err(|e| wrap_generation_error(e, "チャット画像生成に失敗しました"))?;

    let new = NewImage {
        image_url: generated.image_url,
        thumbnail_url: generated.thumbnail_url,
        consistency_score: consistency_score(&partner, &params.prompt),
        prompt: params.prompt,
        context: format!("chat_message: {}", request.message),
        generation_id: generated.generation_id,
        model_used: params.model_id,
        metadata: Some(json!({
            "message": request.message,
            "emotion": request.emotion,
            "situation": request.situation,
            "useReference": request.use_reference,
            "referenceCount": references.len(),
            "generatedAt": chrono::Utc::now().to_rfc3339(),
        })),
    };
    with_conn(&state.db, move |conn| store::insert_image(conn, &partner.id, new)).await
}

/// With `min_consistency` the best-scoring images are returned instead of
/// the latest ones.
pub async fn image_history(
    state: &AppState,
    user_id: &str,
    partner_id: &str,
    limit: Option<usize>,
    min_consistency: Option<f64>,
) -> Result<Vec<GeneratedImage>> {
    let (user_id, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| {
        get_partner(conn, &pid, &user_id)?;
        match min_consistency {
            Some(min) => store::high_consistency_images(conn, &pid, min),
            None => store::image_history(conn, &pid, limit.unwrap_or(DEFAULT_HISTORY_LIMIT)),
        }
    })
    .await
}

pub async fn image_stats(state: &AppState, user_id: &str, partner_id: &str) -> Result<ImageStats> {
    let (user_id, pid) = (user_id.to_string(), partner_id.to_string());
    with_conn(&state.db, move |conn| {
        get_partner(conn, &pid, &user_id)?;
        store::image_stats(conn, &pid)
    })
    .await
}

pub async fn delete_image(state: &AppState, user_id: &str, partner_id: &str, image_id: &str) -> Result<()> {
    let (user_id, pid, image_id) = (user_id.to_string(), partner_id.to_string(), image_id.to_string());
    with_conn(&state.db, move |conn| {
        get_partner(conn, &pid, &user_id)?;
        store::delete_image(conn, &pid, &image_id)
    })
    .await
}
