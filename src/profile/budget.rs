use serde::Serialize;

use super::repo::Profile;

pub const LB_TO_KG: f64 = 0.453592;
// The stored height is decimal feet and is converted with a flat factor,
// matching the product's input UX. 5.9 means 5.9 ft, not 5'9".
pub const FT_TO_CM: f64 = 30.48;

/// Daily calorie target and macro split for a profile, in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroBudget {
    pub daily_calories: i64,
    pub protein_g: i64,
    pub carb_g: i64,
    pub fat_g: i64,
}

/// Mifflin-St Jeor BMR. Any sex value other than "Male" uses the female
/// constant, matching the fallback the rest of the calculator applies.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age: i32, sex: &str) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    if sex == "Male" {
        base + 5.0
    } else {
        base - 161.0
    }
}

fn activity_multiplier(level: &str) -> f64 {
    match level {
        "Sedentary" => 1.2,
        "Light" => 1.375,
        "Moderate" => 1.55,
        "Very" => 1.725,
        "Super" => 1.9,
        _ => 1.2,
    }
}

fn goal_adjustment(goal: &str, tdee: f64) -> f64 {
    match goal {
        "Lose" => tdee - 500.0,
        "Gain" => tdee + 300.0,
        _ => tdee,
    }
}

/// Converts a profile into its daily budget. Deterministic, never fails:
/// missing numerics count as zero, missing or unrecognized categories fall
/// back to Male / Sedentary / Maintain. Degenerate inputs (zero weight and
/// height) are not clamped and may produce a very low or negative target.
/// Outputs are rounded half away from zero.
pub fn macro_budget(profile: &Profile) -> MacroBudget {
    let weight_kg = profile.weight_lb.unwrap_or(0.0) * LB_TO_KG;
    let height_cm = profile.height_ft.unwrap_or(0.0) * FT_TO_CM;
    let age = profile.age.unwrap_or(0);
    let sex = profile.sex.as_deref().unwrap_or("Male");
    let activity = profile.activity_level.as_deref().unwrap_or("Sedentary");
    let goal = profile.goal.as_deref().unwrap_or("Maintain");

    let bmr = basal_metabolic_rate(weight_kg, height_cm, age, sex);
    let tdee = bmr * activity_multiplier(activity);
    let target = goal_adjustment(goal, tdee);

    MacroBudget {
        daily_calories: target.round() as i64,
        protein_g: (0.30 * target / 4.0).round() as i64,
        carb_g: (0.40 * target / 4.0).round() as i64,
        fat_g: (0.30 * target / 9.0).round() as i64,
    }
}
