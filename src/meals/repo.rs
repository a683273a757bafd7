use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::aggregate::{FoodEntry, MealTotals};

/// Meal log row with its cached aggregate fields.
#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: String,
    pub source_type: Option<String>,
    pub logged_at: OffsetDateTime,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

impl Meal {
    pub fn totals(&self) -> MealTotals {
        MealTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            fat: self.total_fat,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodItemRow {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub name: String,
    pub serving_size: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub data_source: Option<String>,
}

impl From<FoodItemRow> for FoodEntry {
    fn from(r: FoodItemRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            serving_size: r.serving_size,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
            data_source: r.data_source,
        }
    }
}

const MEAL_COLUMNS: &str = "id, user_id, meal_type, source_type, logged_at, \
     total_calories, total_protein, total_carbs, total_fat";

pub async fn insert_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_type: &str,
    source_type: Option<&str>,
    totals: MealTotals,
) -> anyhow::Result<Meal> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        INSERT INTO meals (user_id, meal_type, source_type,
                           total_calories, total_protein, total_carbs, total_fat)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(meal_type)
    .bind(source_type)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.carbs)
    .bind(totals.fat)
    .fetch_one(db)
    .await
    .context("insert meal")?;
    Ok(meal)
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
        FROM meals
        WHERE user_id = $1
        ORDER BY logged_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list meals")?;
    Ok(rows)
}

pub async fn find_by_id(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
) -> anyhow::Result<Option<Meal>> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
        FROM meals
        WHERE id = $1 AND user_id = $2
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find meal")?;
    Ok(meal)
}

/// Meals logged within [from, to), newest first.
pub async fn list_between(
    db: &PgPool,
    user_id: Uuid,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
        FROM meals
        WHERE user_id = $1 AND logged_at >= $2 AND logged_at < $3
        ORDER BY logged_at DESC
        "#
    ))
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("list meals between")?;
    Ok(rows)
}

/// Deletes the meal; food items go with it via ON DELETE CASCADE.
pub async fn delete_meal(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM meals WHERE id = $1 AND user_id = $2"#)
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal")?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_items(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Vec<FoodItemRow>> {
    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT id, meal_id, name, serving_size, calories, protein, carbs, fat, data_source
        FROM food_items
        WHERE meal_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(meal_id)
    .fetch_all(db)
    .await
    .context("list food items")?;
    Ok(rows)
}

pub async fn list_items_for_meals(
    db: &PgPool,
    meal_ids: &[Uuid],
) -> anyhow::Result<Vec<FoodItemRow>> {
    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT id, meal_id, name, serving_size, calories, protein, carbs, fat, data_source
        FROM food_items
        WHERE meal_id = ANY($1)
        ORDER BY created_at ASC
        "#,
    )
    .bind(meal_ids)
    .fetch_all(db)
    .await
    .context("list food items for meals")?;
    Ok(rows)
}

// ---- Transactional item writes ----
//
// Edits to one meal's item set go through a row lock on the meal, so two
// concurrent requests serialize into read-modify-write instead of
// interleaving into corrupted totals.

pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    meal_id: Uuid,
) -> anyhow::Result<Option<Meal>> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
        FROM meals
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock meal")?;
    Ok(meal)
}

pub async fn list_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<Vec<FoodItemRow>> {
    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT id, meal_id, name, serving_size, calories, protein, carbs, fat, data_source
        FROM food_items
        WHERE meal_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(meal_id)
    .fetch_all(&mut **tx)
    .await
    .context("list food items in tx")?;
    Ok(rows)
}

pub async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    item: &FoodEntry,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_items (id, meal_id, name, serving_size, calories, protein, carbs, fat, data_source)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(item.id)
    .bind(meal_id)
    .bind(&item.name)
    .bind(&item.serving_size)
    .bind(item.calories)
    .bind(item.protein)
    .bind(item.carbs)
    .bind(item.fat)
    .bind(&item.data_source)
    .execute(&mut **tx)
    .await
    .context("insert food item")?;
    Ok(())
}

pub async fn update_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    item: &FoodEntry,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE food_items
        SET name = $3, serving_size = $4, calories = $5, protein = $6, carbs = $7, fat = $8
        WHERE id = $1 AND meal_id = $2
        "#,
    )
    .bind(item.id)
    .bind(meal_id)
    .bind(&item.name)
    .bind(&item.serving_size)
    .bind(item.calories)
    .bind(item.protein)
    .bind(item.carbs)
    .bind(item.fat)
    .execute(&mut **tx)
    .await
    .context("update food item")?;
    Ok(())
}

pub async fn delete_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    item_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM food_items WHERE id = $1 AND meal_id = $2"#)
        .bind(item_id)
        .bind(meal_id)
        .execute(&mut **tx)
        .await
        .context("delete food item")?;
    Ok(())
}

pub async fn set_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    totals: MealTotals,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE meals
        SET total_calories = $2, total_protein = $3, total_carbs = $4, total_fat = $5
        WHERE id = $1
        "#,
    )
    .bind(meal_id)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.carbs)
    .bind(totals.fat)
    .execute(&mut **tx)
    .await
    .context("update meal totals")?;
    Ok(())
}
