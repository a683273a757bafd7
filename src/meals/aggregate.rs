use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
pub const CARBS_KCAL_PER_G: f64 = 4.0;
pub const FAT_KCAL_PER_G: f64 = 9.0;

/// Failures of the aggregation core. `Validation` rejects bad input before any
/// state is touched; `NotFound` means the referenced item is not in the meal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("{0}")]
    Validation(String),
    #[error("food item not found")]
    NotFound,
}

/// How the calorie value of an item is determined.
///
/// `Derived` computes calories from macros with the 4/4/9 rule; `Manual` keeps
/// the supplied calorie value even when it disagrees with the macros.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CalorieEntry {
    Derived {
        #[serde(default)]
        protein: f64,
        #[serde(default)]
        carbs: f64,
        #[serde(default)]
        fat: f64,
    },
    Manual {
        calories: f64,
        #[serde(default)]
        protein: f64,
        #[serde(default)]
        carbs: f64,
        #[serde(default)]
        fat: f64,
    },
}

impl CalorieEntry {
    pub fn derived_calories(protein: f64, carbs: f64, fat: f64) -> f64 {
        (protein * PROTEIN_KCAL_PER_G + carbs * CARBS_KCAL_PER_G + fat * FAT_KCAL_PER_G).round()
    }

    fn resolve(&self) -> (f64, f64, f64, f64) {
        match *self {
            CalorieEntry::Derived {
                protein,
                carbs,
                fat,
            } => (Self::derived_calories(protein, carbs, fat), protein, carbs, fat),
            CalorieEntry::Manual {
                calories,
                protein,
                carbs,
                fat,
            } => (calories, protein, carbs, fat),
        }
    }
}

/// One food line inside a meal.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodEntry {
    pub id: Uuid,
    pub name: String,
    pub serving_size: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub data_source: Option<String>,
}

impl FoodEntry {
    /// Validates and resolves a proposed item. Rejected input never reaches
    /// the item set.
    pub fn new(
        name: &str,
        serving_size: Option<String>,
        entry: &CalorieEntry,
        data_source: Option<String>,
    ) -> Result<Self, AggregateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AggregateError::Validation("food name is required".into()));
        }
        let (calories, protein, carbs, fat) = entry.resolve();
        if !(calories > 0.0) {
            return Err(AggregateError::Validation(
                "calories must be greater than zero".into(),
            ));
        }
        if [protein, carbs, fat].iter().any(|v| !(*v >= 0.0)) {
            return Err(AggregateError::Validation(
                "macros cannot be negative".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            serving_size: serving_size.filter(|s| !s.trim().is_empty()),
            calories,
            protein,
            carbs,
            fat,
            data_source,
        })
    }
}

/// The four cached aggregate fields of a meal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MealTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MealTotals {
    /// Exact sum over the full current item set. Always recomputed from
    /// scratch so totals cannot drift from the items over many edits.
    pub fn of(items: &[FoodEntry]) -> Self {
        items.iter().fold(Self::default(), |acc, it| Self {
            calories: acc.calories + it.calories,
            protein: acc.protein + it.protein,
            carbs: acc.carbs + it.carbs,
            fat: acc.fat + it.fat,
        })
    }

    fn add(self, other: Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }
}

/// Validates the proposed item, appends it, and returns the recomputed totals.
/// On error the item set is untouched.
pub fn add_item(
    items: &mut Vec<FoodEntry>,
    name: &str,
    serving_size: Option<String>,
    entry: &CalorieEntry,
    data_source: Option<String>,
) -> Result<(FoodEntry, MealTotals), AggregateError> {
    let item = FoodEntry::new(name, serving_size, entry, data_source)?;
    items.push(item.clone());
    Ok((item, MealTotals::of(items)))
}

/// Replaces the mutable fields of an existing item and recomputes totals.
/// The item keeps its id and provenance tag.
pub fn update_item(
    items: &mut [FoodEntry],
    item_id: Uuid,
    name: &str,
    serving_size: Option<String>,
    entry: &CalorieEntry,
) -> Result<(FoodEntry, MealTotals), AggregateError> {
    let idx = items
        .iter()
        .position(|it| it.id == item_id)
        .ok_or(AggregateError::NotFound)?;
    let mut replacement = FoodEntry::new(name, serving_size, entry, items[idx].data_source.clone())?;
    replacement.id = item_id;
    items[idx] = replacement.clone();
    Ok((replacement, MealTotals::of(items)))
}

/// Removes an item and recomputes totals; an emptied meal yields exact zeros.
pub fn remove_item(
    items: &mut Vec<FoodEntry>,
    item_id: Uuid,
) -> Result<MealTotals, AggregateError> {
    let idx = items
        .iter()
        .position(|it| it.id == item_id)
        .ok_or(AggregateError::NotFound)?;
    items.remove(idx);
    Ok(MealTotals::of(items))
}

/// A meal's cached totals together with when it was logged.
#[derive(Debug, Clone, Copy)]
pub struct LoggedTotals {
    pub logged_at: OffsetDateTime,
    pub totals: MealTotals,
}

/// Sums cached totals over meals logged on the given UTC calendar date.
/// Pure; does not mutate input.
pub fn daily_totals(meals: &[LoggedTotals], date: Date) -> MealTotals {
    meals
        .iter()
        .filter(|m| m.logged_at.to_offset(UtcOffset::UTC).date() == date)
        .fold(MealTotals::default(), |acc, m| acc.add(m.totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn manual(calories: f64) -> CalorieEntry {
        CalorieEntry::Manual {
            calories,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        }
    }

    fn totals_match_items(items: &[FoodEntry], totals: MealTotals) {
        assert_eq!(totals, MealTotals::of(items));
    }

    #[test]
    fn derived_entry_applies_four_four_nine() {
        let entry = CalorieEntry::Derived {
            protein: 25.0,
            carbs: 30.0,
            fat: 10.0,
        };
        let item = FoodEntry::new("Chicken and rice", None, &entry, None).unwrap();
        assert_eq!(item.calories, 310.0);
        assert_eq!(item.protein, 25.0);
    }

    #[test]
    fn manual_entry_keeps_calories_even_when_macros_disagree() {
        let entry = CalorieEntry::Manual {
            calories: 250.0,
            protein: 25.0,
            carbs: 30.0,
            fat: 10.0,
        };
        let item = FoodEntry::new("Protein bar", None, &entry, None).unwrap();
        // 4/4/9 would give 310, the locked value wins.
        assert_eq!(item.calories, 250.0);
    }

    #[test]
    fn empty_name_is_rejected_without_mutation() {
        let mut items = vec![FoodEntry::new("Oats", None, &manual(200.0), None).unwrap()];
        let before = items.clone();
        let err = add_item(&mut items, "   ", None, &manual(100.0), None).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
        assert_eq!(items, before);
    }

    #[test]
    fn non_positive_calories_are_rejected() {
        let mut items = Vec::new();
        for bad in [0.0, -50.0, f64::NAN] {
            let err = add_item(&mut items, "Water", None, &manual(bad), None).unwrap_err();
            assert!(matches!(err, AggregateError::Validation(_)));
        }
        assert!(items.is_empty());
    }

    #[test]
    fn negative_macro_is_rejected() {
        let entry = CalorieEntry::Manual {
            calories: 100.0,
            protein: -1.0,
            carbs: 0.0,
            fat: 0.0,
        };
        let err = FoodEntry::new("Bad row", None, &entry, None).unwrap_err();
        assert_eq!(
            err,
            AggregateError::Validation("macros cannot be negative".into())
        );
    }

    #[test]
    fn zero_macros_in_derived_mode_yield_zero_calories_and_are_rejected() {
        let entry = CalorieEntry::Derived {
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        };
        let err = FoodEntry::new("Air", None, &entry, None).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
    }

    #[test]
    fn totals_follow_add_remove_sequence() {
        let mut items = Vec::new();
        let (first, totals) = add_item(&mut items, "Eggs", None, &manual(200.0), None).unwrap();
        assert_eq!(totals.calories, 200.0);
        let (_, totals) = add_item(&mut items, "Toast", None, &manual(150.0), None).unwrap();
        assert_eq!(totals.calories, 350.0);

        let totals = remove_item(&mut items, first.id).unwrap();
        assert_eq!(totals.calories, 150.0);

        let (_, totals) = add_item(&mut items, "Juice", None, &manual(100.0), None).unwrap();
        assert_eq!(totals.calories, 250.0);
        totals_match_items(&items, totals);
    }

    #[test]
    fn update_recomputes_totals_and_keeps_id_and_source() {
        let mut items = Vec::new();
        let (item, _) = add_item(
            &mut items,
            "Yogurt",
            Some("150 g".into()),
            &manual(120.0),
            Some("AI".into()),
        )
        .unwrap();

        let entry = CalorieEntry::Derived {
            protein: 10.0,
            carbs: 5.0,
            fat: 2.0,
        };
        let (updated, totals) =
            update_item(&mut items, item.id, "Greek yogurt", None, &entry).unwrap();
        assert_eq!(updated.id, item.id);
        assert_eq!(updated.data_source.as_deref(), Some("AI"));
        assert_eq!(updated.calories, 78.0);
        assert_eq!(totals.calories, 78.0);
        totals_match_items(&items, totals);
    }

    #[test]
    fn update_with_invalid_fields_leaves_item_untouched() {
        let mut items = Vec::new();
        let (item, _) = add_item(&mut items, "Rice", None, &manual(200.0), None).unwrap();
        let before = items.clone();

        let err = update_item(&mut items, item.id, "", None, &manual(100.0)).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
        assert_eq!(items, before);
    }

    #[test]
    fn unknown_item_id_yields_not_found_and_no_mutation() {
        let mut items = vec![FoodEntry::new("Soup", None, &manual(90.0), None).unwrap()];
        let before = items.clone();

        let err = update_item(&mut items, Uuid::new_v4(), "Soup", None, &manual(90.0)).unwrap_err();
        assert_eq!(err, AggregateError::NotFound);
        let err = remove_item(&mut items, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, AggregateError::NotFound);
        assert_eq!(items, before);
    }

    #[test]
    fn removing_every_item_yields_exact_zero_totals() {
        let mut items = Vec::new();
        let (a, _) = add_item(&mut items, "A", None, &manual(123.4), None).unwrap();
        let (b, _) = add_item(&mut items, "B", None, &manual(567.8), None).unwrap();

        remove_item(&mut items, a.id).unwrap();
        let totals = remove_item(&mut items, b.id).unwrap();
        assert_eq!(totals, MealTotals::default());
        assert!(items.is_empty());
    }

    #[test]
    fn daily_totals_filter_by_utc_date() {
        let day = |t, c| LoggedTotals {
            logged_at: t,
            totals: MealTotals {
                calories: c,
                ..MealTotals::default()
            },
        };
        let meals = vec![
            day(datetime!(2025-03-01 08:00 UTC), 400.0),
            day(datetime!(2025-03-01 19:30 UTC), 600.0),
            day(datetime!(2025-03-02 00:01 UTC), 999.0),
            // 23:30 -03:00 is already March 2nd in UTC.
            day(datetime!(2025-03-01 23:30 -3), 100.0),
        ];
        let totals = daily_totals(&meals, time::macros::date!(2025 - 03 - 01));
        assert_eq!(totals.calories, 1000.0);
        let totals = daily_totals(&meals, time::macros::date!(2025 - 03 - 02));
        assert_eq!(totals.calories, 1099.0);
    }

    #[test]
    fn daily_totals_of_no_meals_is_zero() {
        let totals = daily_totals(&[], time::macros::date!(2025 - 03 - 01));
        assert_eq!(totals, MealTotals::default());
    }

    #[test]
    fn calorie_entry_deserializes_tagged_modes() {
        let derived: CalorieEntry =
            serde_json::from_str(r#"{"mode":"derived","protein":25,"carbs":30,"fat":10}"#).unwrap();
        assert_eq!(
            derived,
            CalorieEntry::Derived {
                protein: 25.0,
                carbs: 30.0,
                fat: 10.0
            }
        );

        let manual: CalorieEntry =
            serde_json::from_str(r#"{"mode":"manual","calories":250,"protein":25}"#).unwrap();
        assert_eq!(
            manual,
            CalorieEntry::Manual {
                calories: 250.0,
                protein: 25.0,
                carbs: 0.0,
                fat: 0.0
            }
        );
    }
}
