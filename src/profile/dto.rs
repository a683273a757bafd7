use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::profile::repo::Profile;

/// Request body for saving a profile. All fields optional; numeric fields are
/// non-negative, category fields are free text with documented fallbacks.
#[derive(Debug, Deserialize)]
pub struct SaveProfileRequest {
    pub age: Option<i32>,
    pub weight_lb: Option<f64>,
    pub height_ft: Option<f64>,
    pub sex: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
}

impl SaveProfileRequest {
    /// Negative numerics are invalid input, not a fallback case.
    pub fn validate(&self) -> Result<(), String> {
        if self.age.is_some_and(|v| v < 0) {
            return Err("age cannot be negative".into());
        }
        if self.weight_lb.is_some_and(|v| !(v >= 0.0)) {
            return Err("weight cannot be negative".into());
        }
        if self.height_ft.is_some_and(|v| !(v >= 0.0)) {
            return Err("height cannot be negative".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub age: Option<i32>,
    pub weight_lb: Option<f64>,
    pub height_ft: Option<f64>,
    pub sex: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            age: p.age,
            weight_lb: p.weight_lb,
            height_ft: p.height_ft,
            sex: p.sex,
            activity_level: p.activity_level,
            goal: p.goal,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_negative_numbers() {
        let req = SaveProfileRequest {
            age: Some(-1),
            weight_lb: None,
            height_ft: None,
            sex: None,
            activity_level: None,
            goal: None,
        };
        assert!(req.validate().is_err());

        let req = SaveProfileRequest {
            age: None,
            weight_lb: Some(-10.0),
            height_ft: None,
            sex: None,
            activity_level: None,
            goal: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_request() {
        let req: SaveProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
    }
}
