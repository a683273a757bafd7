use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::macros::format_description;
use time::Date;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::auth::services::AuthUser;
use crate::state::AppState;

use super::aggregate::AggregateError;
use super::dto::{
    CreateFoodItemRequest, CreateMealRequest, DailyTotalsQuery, DailyTotalsResponse,
    ItemSavedResponse, MealResponse, Pagination, UpdateFoodItemRequest,
};
use super::repo::{self, FoodItemRow};
use super::services::{self, MealOpError};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/:id", get(get_meal).delete(delete_meal))
        .route("/meals/:id/items", post(add_item))
        .route(
            "/meals/:id/items/:item_id",
            put(update_item).delete(delete_item),
        )
        .route("/totals/daily", get(daily_totals))
}

fn op_error(e: MealOpError) -> (StatusCode, String) {
    match e {
        MealOpError::Aggregate(AggregateError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
        MealOpError::Aggregate(AggregateError::NotFound) => {
            (StatusCode::NOT_FOUND, "Food item not found".into())
        }
        MealOpError::MealNotFound => (StatusCode::NOT_FOUND, "Meal not found".into()),
        MealOpError::Internal(e) => {
            error!(error = %e, "meal operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<MealResponse>), (StatusCode, String)> {
    let meal = repo::insert_meal(
        &state.db,
        user_id,
        &payload.meal_type,
        payload.source_type.as_deref(),
        payload.totals(),
    )
    .await
    .map_err(internal)?;

    info!(%user_id, meal_id = %meal.id, meal_type = %meal.meal_type, "meal logged");
    Ok((
        StatusCode::CREATED,
        Json(MealResponse::from_parts(meal, vec![])),
    ))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealResponse>>, (StatusCode, String)> {
    let meals = repo::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(internal)?;

    let ids: Vec<Uuid> = meals.iter().map(|m| m.id).collect();
    let mut by_meal: HashMap<Uuid, Vec<FoodItemRow>> = HashMap::new();
    for row in repo::list_items_for_meals(&state.db, &ids)
        .await
        .map_err(internal)?
    {
        by_meal.entry(row.meal_id).or_default().push(row);
    }

    let out = meals
        .into_iter()
        .map(|m| {
            let items = by_meal.remove(&m.id).unwrap_or_default();
            MealResponse::from_parts(m, items)
        })
        .collect();
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealResponse>, (StatusCode, String)> {
    let meal = repo::find_by_id(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))?;
    let items = repo::list_items(&state.db, meal.id)
        .await
        .map_err(internal)?;
    Ok(Json(MealResponse::from_parts(meal, items)))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_meal(&state.db, user_id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Meal not found".into()));
    }
    info!(%user_id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateFoodItemRequest>,
) -> Result<(StatusCode, Json<ItemSavedResponse>), (StatusCode, String)> {
    let (item, totals) = services::add_food_item(&state, user_id, id, payload)
        .await
        .map_err(op_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ItemSavedResponse {
            item: item.into(),
            totals,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateFoodItemRequest>,
) -> Result<Json<ItemSavedResponse>, (StatusCode, String)> {
    let (item, totals) = services::update_food_item(&state, user_id, id, item_id, payload)
        .await
        .map_err(op_error)?;
    Ok(Json(ItemSavedResponse {
        item: item.into(),
        totals,
    }))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, String)> {
    services::remove_food_item(&state, user_id, id, item_id)
        .await
        .map_err(op_error)?;
    Ok(StatusCode::NO_CONTENT)
}

const DATE_FMT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[instrument(skip(state))]
pub async fn daily_totals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DailyTotalsQuery>,
) -> Result<Json<DailyTotalsResponse>, (StatusCode, String)> {
    let date = match q.date.as_deref() {
        Some(s) => Date::parse(s, DATE_FMT)
            .map_err(|_| (StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD".to_string()))?,
        None => services::today_utc(),
    };

    let totals = services::totals_for_day(&state, user_id, date)
        .await
        .map_err(op_error)?;
    Ok(Json(DailyTotalsResponse {
        date: date.format(DATE_FMT).unwrap_or_default(),
        totals,
    }))
}
