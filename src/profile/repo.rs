use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Profile snapshot, one row per user, replaced wholesale on save.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub age: Option<i32>,
    pub weight_lb: Option<f64>,
    pub height_ft: Option<f64>,
    pub sex: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
    pub updated_at: OffsetDateTime,
}

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT user_id, age, weight_lb, height_ft, sex, activity_level, goal, updated_at
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(profile)
}

/// Upsert keyed by user id; every save replaces the previous snapshot.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    age: Option<i32>,
    weight_lb: Option<f64>,
    height_ft: Option<f64>,
    sex: Option<String>,
    activity_level: Option<String>,
    goal: Option<String>,
) -> anyhow::Result<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (user_id, age, weight_lb, height_ft, sex, activity_level, goal, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (user_id) DO UPDATE SET
            age = EXCLUDED.age,
            weight_lb = EXCLUDED.weight_lb,
            height_ft = EXCLUDED.height_ft,
            sex = EXCLUDED.sex,
            activity_level = EXCLUDED.activity_level,
            goal = EXCLUDED.goal,
            updated_at = now()
        RETURNING user_id, age, weight_lb, height_ft, sex, activity_level, goal, updated_at
        "#,
    )
    .bind(user_id)
    .bind(age)
    .bind(weight_lb)
    .bind(height_ft)
    .bind(sex)
    .bind(activity_level)
    .bind(goal)
    .fetch_one(db)
    .await?;
    Ok(profile)
}
