use anyhow::Context;
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

use super::aggregate::{self, AggregateError, FoodEntry, LoggedTotals, MealTotals};
use super::dto::{CreateFoodItemRequest, UpdateFoodItemRequest};
use super::repo;

/// Outcome taxonomy for meal mutations. Validation and the two not-found
/// shapes stay distinct so the handler can map them to distinct statuses.
#[derive(Debug, Error)]
pub enum MealOpError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("meal not found")]
    MealNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Adds a food item to a meal and persists the recomputed totals atomically.
pub async fn add_food_item(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    req: CreateFoodItemRequest,
) -> Result<(FoodEntry, MealTotals), MealOpError> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let meal = repo::lock_for_update(&mut tx, user_id, meal_id)
        .await?
        .ok_or(MealOpError::MealNotFound)?;

    let mut items: Vec<FoodEntry> = repo::list_items_tx(&mut tx, meal.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let (item, totals) = aggregate::add_item(
        &mut items,
        &req.name,
        req.serving_size,
        &req.entry,
        req.data_source,
    )?;

    repo::insert_item_tx(&mut tx, meal.id, &item).await?;
    repo::set_totals_tx(&mut tx, meal.id, totals).await?;
    tx.commit().await.context("commit tx")?;

    debug!(%meal_id, item_id = %item.id, calories = item.calories, "food item added");
    Ok((item, totals))
}

pub async fn update_food_item(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    item_id: Uuid,
    req: UpdateFoodItemRequest,
) -> Result<(FoodEntry, MealTotals), MealOpError> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let meal = repo::lock_for_update(&mut tx, user_id, meal_id)
        .await?
        .ok_or(MealOpError::MealNotFound)?;

    let mut items: Vec<FoodEntry> = repo::list_items_tx(&mut tx, meal.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let (item, totals) =
        aggregate::update_item(&mut items, item_id, &req.name, req.serving_size, &req.entry)?;

    repo::update_item_tx(&mut tx, meal.id, &item).await?;
    repo::set_totals_tx(&mut tx, meal.id, totals).await?;
    tx.commit().await.context("commit tx")?;

    debug!(%meal_id, %item_id, calories = item.calories, "food item updated");
    Ok((item, totals))
}

pub async fn remove_food_item(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    item_id: Uuid,
) -> Result<MealTotals, MealOpError> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let meal = repo::lock_for_update(&mut tx, user_id, meal_id)
        .await?
        .ok_or(MealOpError::MealNotFound)?;

    let mut items: Vec<FoodEntry> = repo::list_items_tx(&mut tx, meal.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let totals = aggregate::remove_item(&mut items, item_id)?;

    repo::delete_item_tx(&mut tx, meal.id, item_id).await?;
    repo::set_totals_tx(&mut tx, meal.id, totals).await?;
    tx.commit().await.context("commit tx")?;

    debug!(%meal_id, %item_id, "food item removed");
    Ok(totals)
}

/// Rolls the user's meals for one UTC calendar day into a single total.
pub async fn totals_for_day(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<MealTotals, MealOpError> {
    let from = date.midnight().assume_utc();
    let to = from + Duration::days(1);
    let meals = repo::list_between(&state.db, user_id, from, to).await?;

    let logged: Vec<LoggedTotals> = meals
        .iter()
        .map(|m| LoggedTotals {
            logged_at: m.logged_at,
            totals: m.totals(),
        })
        .collect();
    Ok(aggregate::daily_totals(&logged, date))
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}
