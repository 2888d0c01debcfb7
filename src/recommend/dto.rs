use serde::{Deserialize, Serialize};

use crate::store::RecommendationRecord;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub severity: String,
    /// Minutes per session; clients send either a number or a string.
    #[serde(default, alias = "timeAvailable", deserialize_with = "crate::lenient::number")]
    pub time_available: Option<f64>,
    #[serde(default)]
    pub frequency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PracticeSteps {
    pub yoga: Vec<String>,
    pub exercise: Vec<String>,
    pub ayurveda: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub recommendation: RecommendationRecord,
    pub steps: PracticeSteps,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub records: Vec<RecommendationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_available_accepts_numbers_and_strings() {
        let r: RecommendRequest =
            serde_json::from_str(r#"{"condition":"stress","severity":"mild","timeAvailable":"30"}"#)
                .unwrap();
        assert_eq!(r.time_available, Some(30.0));

        let r: RecommendRequest =
            serde_json::from_str(r#"{"condition":"stress","time_available":15}"#).unwrap();
        assert_eq!(r.time_available, Some(15.0));

        let r: RecommendRequest =
            serde_json::from_str(r#"{"condition":"stress","time_available":"soon"}"#).unwrap();
        assert_eq!(r.time_available, None);

        let r: RecommendRequest = serde_json::from_str(r#"{"condition":"stress"}"#).unwrap();
        assert_eq!(r.time_available, None);
        assert!(r.frequency.is_none());
    }
}
