use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::aggregate::{CalorieEntry, FoodEntry, MealTotals};
use super::repo::{FoodItemRow, Meal};

/// Request body for logging a meal. Initial totals may be supplied by the
/// client before any items are attached.
#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub meal_type: String,
    pub source_type: Option<String>,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_fat: f64,
}

impl CreateMealRequest {
    pub fn totals(&self) -> MealTotals {
        MealTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            fat: self.total_fat,
        }
    }
}

/// Request body for a new food item. The calorie mode is an explicit tag:
/// `{"mode":"derived","protein":..,"carbs":..,"fat":..}` or
/// `{"mode":"manual","calories":..,...}`.
#[derive(Debug, Deserialize)]
pub struct CreateFoodItemRequest {
    pub name: String,
    pub serving_size: Option<String>,
    #[serde(flatten)]
    pub entry: CalorieEntry,
    pub data_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFoodItemRequest {
    pub name: String,
    pub serving_size: Option<String>,
    #[serde(flatten)]
    pub entry: CalorieEntry,
}

#[derive(Debug, Serialize)]
pub struct FoodItemResponse {
    pub id: Uuid,
    pub name: String,
    pub serving_size: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub data_source: Option<String>,
}

impl From<FoodEntry> for FoodItemResponse {
    fn from(e: FoodEntry) -> Self {
        Self {
            id: e.id,
            name: e.name,
            serving_size: e.serving_size,
            calories: e.calories,
            protein: e.protein,
            carbs: e.carbs,
            fat: e.fat,
            data_source: e.data_source,
        }
    }
}

impl From<FoodItemRow> for FoodItemResponse {
    fn from(r: FoodItemRow) -> Self {
        FoodEntry::from(r).into()
    }
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub meal_type: String,
    pub source_type: Option<String>,
    pub logged_at: OffsetDateTime,
    #[serde(flatten)]
    pub totals: MealTotals,
    pub items: Vec<FoodItemResponse>,
}

impl MealResponse {
    pub fn from_parts(meal: Meal, items: Vec<FoodItemRow>) -> Self {
        Self {
            id: meal.id,
            meal_type: meal.meal_type.clone(),
            source_type: meal.source_type.clone(),
            logged_at: meal.logged_at,
            totals: meal.totals(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Returned by item mutations so the client can refresh its cached meal
/// totals without a second round trip.
#[derive(Debug, Serialize)]
pub struct ItemSavedResponse {
    pub item: FoodItemResponse,
    pub totals: MealTotals,
}

#[derive(Debug, Deserialize)]
pub struct DailyTotalsQuery {
    /// Calendar date as YYYY-MM-DD; defaults to today in UTC.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyTotalsResponse {
    pub date: String,
    #[serde(flatten)]
    pub totals: MealTotals,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_item_request_parses_flattened_modes() {
        let req: CreateFoodItemRequest = serde_json::from_str(
            r#"{"name":"Oats","serving_size":"80 g","mode":"derived","protein":10,"carbs":54,"fat":6}"#,
        )
        .unwrap();
        assert_eq!(req.name, "Oats");
        assert!(matches!(req.entry, CalorieEntry::Derived { protein, .. } if protein == 10.0));

        let req: CreateFoodItemRequest = serde_json::from_str(
            r#"{"name":"Bar","mode":"manual","calories":250,"data_source":"Barcode"}"#,
        )
        .unwrap();
        assert!(matches!(req.entry, CalorieEntry::Manual { calories, .. } if calories == 250.0));
        assert_eq!(req.data_source.as_deref(), Some("Barcode"));
    }

    #[test]
    fn create_meal_request_defaults_totals_to_zero() {
        let req: CreateMealRequest = serde_json::from_str(r#"{"meal_type":"Breakfast"}"#).unwrap();
        assert_eq!(req.totals(), MealTotals::default());
    }

    #[test]
    fn meal_response_flattens_totals() {
        let meal = Meal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            meal_type: "Lunch".into(),
            source_type: None,
            logged_at: OffsetDateTime::now_utc(),
            total_calories: 350.0,
            total_protein: 20.0,
            total_carbs: 40.0,
            total_fat: 10.0,
        };
        let json = serde_json::to_value(MealResponse::from_parts(meal, vec![])).unwrap();
        assert_eq!(json["calories"], 350.0);
        assert_eq!(json["items"].as_array().unwrap().len(), 0);
    }
}
