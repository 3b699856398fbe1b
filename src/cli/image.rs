//! CLI `image` commands.

use anyhow::Result;
use clap::Subcommand;

use super::{print_json, Target};
use koibito::db::with_conn;
use koibito::image::backgrounds::background_images;
use koibito::image::service::{
    delete_image, generate_avatar, generate_chat_image, image_history, image_stats, AvatarRequest,
    ChatImageRequest,
};
use koibito::partner::store::update_base_image;
use koibito::state::AppState;

#[derive(Subcommand, Debug)]
pub enum ImageAction {
    /// Generate an avatar; without --partner the prompt is used as is
    Avatar {
        #[arg(long)]
        user: String,
        #[arg(long)]
        partner: Option<String>,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long)]
        emotion: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        clothing: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        num_images: Option<u32>,
        /// Make the result the partner's base image
        #[arg(long, requires = "partner")]
        set_base: bool,
    },
    /// Generate an image for a chat moment
    Chat {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        message: String,
        #[arg(long)]
        emotion: Option<String>,
        #[arg(long)]
        situation: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Reuse recent consistent images as references
        #[arg(long)]
        use_reference: bool,
    },
    /// List generated images
    History {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        limit: Option<usize>,
        /// Only images scoring at least this, best first
        #[arg(long)]
        min_consistency: Option<f64>,
    },
    /// Image counts and average consistency
    Stats {
        #[command(flatten)]
        target: Target,
    },
    /// Delete one generated image
    Delete {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        image: String,
    },
    /// List chat background images
    Backgrounds {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub async fn run(state: &AppState, action: ImageAction) -> Result<()> {
    match action {
        ImageAction::Avatar {
            user,
            partner,
            prompt,
            emotion,
            location,
            clothing,
            width,
            height,
            num_images,
            set_base,
        } => {
            let request = AvatarRequest {
                partner_id: partner.clone(),
                prompt,
                emotion,
                location,
                clothing,
                width,
                height,
                num_images,
                ..Default::default()
            };
            let image = generate_avatar(state, &user, request).await?;
            if let (true, Some(partner_id)) = (set_base, partner) {
                let url = image.image_url.clone();
                with_conn(&state.db, move |conn| update_base_image(conn, &partner_id, &user, &url)).await?;
            }
            print_json(&image)
        }
        ImageAction::Chat {
            target,
            message,
            emotion,
            situation,
            location,
            use_reference,
        } => {
            let request = ChatImageRequest {
                message,
                emotion,
                situation,
                location,
                intimacy_level: None,
                use_reference,
            };
            print_json(&generate_chat_image(state, &target.user, &target.partner, request).await?)
        }
        ImageAction::History {
            target,
            limit,
            min_consistency,
        } => {
            let images = image_history(state, &target.user, &target.partner, limit, min_consistency).await?;
            print_json(&images)
        }
        ImageAction::Stats { target } => {
            print_json(&image_stats(state, &target.user, &target.partner).await?)
        }
        ImageAction::Delete { target, image } => {
            delete_image(state, &target.user, &target.partner, &image).await?;
            println!("Image {image} deleted.");
            Ok(())
        }
        ImageAction::Backgrounds { category, limit } => {
            print_json(&background_images(category.as_deref(), limit))
        }
    }
}
