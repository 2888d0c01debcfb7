//! Rule-based matching over the recommendation table.
//!
//! Candidates share the requested condition (and severity, when any row
//! has it). A single candidate wins outright; otherwise every candidate is
//! scored and the highest total wins, ties going to the earliest row.

use tracing::debug;

use super::dataset::{Dataset, DatasetRow};

pub const TIME_WEIGHT: f64 = 3.0;
pub const AGE_WEIGHT: f64 = 2.0;
pub const GENDER_BONUS: f64 = 1.5;
pub const ACTIVITY_BONUS: f64 = 1.5;
pub const BMI_BONUS: f64 = 1.0;
pub const BP_BONUS: f64 = 1.0;
pub const DIABETES_BONUS: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub condition: String,
    pub age: Option<f64>,
    pub severity: String,
    pub time_available: Option<f64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub bmi_category: Option<String>,
    pub has_bp: bool,
    pub has_diabetes: bool,
}

/// Per-term contributions to a candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub time: f64,
    pub age: f64,
    pub gender: f64,
    pub activity: f64,
    pub bmi: f64,
    pub bp: f64,
    pub diabetes: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.time + self.age + self.gender + self.activity + self.bmi + self.bp + self.diabetes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Index into [`Dataset::rows`].
    pub row_index: usize,
    pub condition: String,
    pub yoga_pose: String,
    pub exercise: String,
    pub ayurveda_tip: String,
    /// `None` when the row was the only candidate.
    pub score: Option<ScoreBreakdown>,
}

impl RuleMatch {
    fn from_row(row_index: usize, row: &DatasetRow, score: Option<ScoreBreakdown>) -> Self {
        Self {
            row_index,
            condition: row.condition.clone(),
            yoga_pose: row.yoga_pose.clone(),
            exercise: row.exercise.clone(),
            ayurveda_tip: row.ayurveda_tip.clone(),
            score,
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn normalize_opt(s: &Option<String>) -> Option<String> {
    s.as_deref().map(normalize).filter(|v| !v.is_empty())
}

/// Proximity term `(1 - diff / max_diff) * weight`; rows without a value
/// score zero and do not count toward `max_diff`.
fn proximity_terms(values: &[Option<f64>], target: Option<f64>, weight: f64) -> Vec<f64> {
    let Some(target) = target else {
        return vec![0.0; values.len()];
    };
    let diffs: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.map(|v| (v - target).abs()))
        .collect();
    let max_diff = diffs.iter().flatten().copied().fold(0.0_f64, f64::max);
    if max_diff <= 0.0 {
        return vec![0.0; values.len()];
    }
    diffs
        .into_iter()
        .map(|d| d.map_or(0.0, |d| (1.0 - d / max_diff) * weight))
        .collect()
}

/// Score every candidate; returned in candidate order.
pub fn score_candidates(candidates: &[&DatasetRow], query: &MatchQuery) -> Vec<ScoreBreakdown> {
    let times: Vec<Option<f64>> = candidates.iter().map(|r| r.time_available).collect();
    let ages: Vec<Option<f64>> = candidates.iter().map(|r| r.age).collect();
    let time_terms = proximity_terms(&times, query.time_available, TIME_WEIGHT);
    let age_terms = proximity_terms(&ages, query.age, AGE_WEIGHT);

    let gender = normalize_opt(&query.gender);
    let activity = normalize_opt(&query.activity_level);
    let bmi = normalize_opt(&query.bmi_category);

    let bonus = |wanted: &Option<String>, have: &Option<String>, points: f64| match (wanted, have)
    {
        (Some(w), Some(h)) if w == h => points,
        _ => 0.0,
    };

    candidates
        .iter()
        .enumerate()
        .map(|(i, row)| ScoreBreakdown {
            time: time_terms[i],
            age: age_terms[i],
            gender: bonus(&gender, &row.gender, GENDER_BONUS),
            activity: bonus(&activity, &row.activity_level, ACTIVITY_BONUS),
            bmi: bonus(&bmi, &row.bmi_category, BMI_BONUS),
            bp: if query.has_bp && row.has_bp { BP_BONUS } else { 0.0 },
            diabetes: if query.has_diabetes && row.has_diabetes {
                DIABETES_BONUS
            } else {
                0.0
            },
        })
        .collect()
}

pub fn match_recommendation(dataset: &Dataset, query: &MatchQuery) -> Option<RuleMatch> {
    let condition = normalize(&query.condition);
    let severity = normalize(&query.severity);

    let by_condition: Vec<(usize, &DatasetRow)> = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.condition == condition)
        .collect();

    let exact: Vec<(usize, &DatasetRow)> = by_condition
        .iter()
        .copied()
        .filter(|(_, r)| r.severity == severity)
        .collect();

    debug!(%condition, %severity, exact = exact.len(), by_condition = by_condition.len(), "dataset candidates");

    let candidates = if exact.is_empty() { by_condition } else { exact };

    match candidates.as_slice() {
        [] => None,
        [(index, row)] => Some(RuleMatch::from_row(*index, row, None)),
        _ => {
            let rows: Vec<&DatasetRow> = candidates.iter().map(|(_, r)| *r).collect();
            let scores = score_candidates(&rows, query);

            // strict `>` keeps the earliest row on ties
            let mut best = 0;
            for (i, s) in scores.iter().enumerate().skip(1) {
                if s.total() > scores[best].total() {
                    best = i;
                }
            }

            let (index, row) = candidates[best];
            debug!(row = index, score = scores[best].total(), "best dataset match");
            Some(RuleMatch::from_row(index, row, Some(scores[best])))
        }
    }
}
