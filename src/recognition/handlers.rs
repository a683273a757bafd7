use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument};

use crate::auth::services::AuthUser;
use crate::state::AppState;

/// Candidate item fields for the client to review and submit through the
/// regular food item endpoints.
#[derive(Debug, Serialize)]
pub struct RecognitionResponse {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: Option<f64>,
    pub data_source: &'static str,
}

pub fn recognition_routes() -> Router<AppState> {
    Router::new()
        .route("/recognition", post(recognize_food))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

/// POST /recognition (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn recognize_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<RecognitionResponse>, (StatusCode, String)> {
    let mut image = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "image/jpeg".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            image = Some((data, content_type));
            break;
        }
    }

    let Some((data, content_type)) = image else {
        return Err((StatusCode::BAD_REQUEST, "No image uploaded".into()));
    };
    if data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No image uploaded".into()));
    }

    let food = state
        .recognizer
        .recognize(data, &content_type)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "food recognition failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(RecognitionResponse {
        name: food.food,
        calories: food.calories,
        protein: food.protein,
        carbs: food.carbs,
        fat: food.fats,
        confidence: food.confidence,
        data_source: "AI",
    }))
}

#[cfg(test)]
mod tests {
    use crate::state::AppState;

    #[tokio::test]
    async fn fake_recognizer_produces_a_candidate() {
        let state = AppState::fake();
        let food = state
            .recognizer
            .recognize(bytes::Bytes::from_static(b"fake-image"), "image/jpeg")
            .await
            .unwrap();
        assert!(!food.food.is_empty());
        assert!(food.calories > 0.0);
    }
}
