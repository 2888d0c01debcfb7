//! Recommendation flow: ML when confident, otherwise the dataset matcher;
//! then the safety check, defaults and persistence.

use rand::{rngs::StdRng, Rng, SeedableRng};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dataset::Dataset,
    dto::{PracticeSteps, RecommendRequest, RecommendResponse},
    matcher::{match_recommendation, MatchQuery},
    ml::{MlInput, MlRecommendation, MlRecommender},
    safety::pose_warning,
    steps::StepsCatalog,
};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    store::{RecommendationRecord, User},
};

pub const FALLBACK_YOGA: &str = "shavasana.jpg";
pub const FALLBACK_EXERCISE: &str = "slow_walking.jpg";
pub const FALLBACK_AYURVEDA: &str = "green_tea.jpg";

const DEFAULT_ML_MINUTES: i32 = 30;

/// Whole minutes from the request; fractions are dropped, not rounded.
fn whole_minutes(req: &RecommendRequest) -> Option<i32> {
    req.time_available.map(|t| t.trunc() as i32)
}

/// The three items picked for a request, and the ML result when that path
/// served it.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub yoga_pose: String,
    pub exercise: String,
    pub ayurveda_tip: String,
    pub ml: Option<MlRecommendation>,
}

/// `"<condition> with bp, diabetes"` listing only the user's tracked
/// comorbidities in stored order; `None` when the user has none.
pub fn comorbid_condition(condition: &str, user: &User) -> Option<String> {
    let tracked: Vec<&str> = user
        .conditions
        .iter()
        .map(String::as_str)
        .filter(|c| *c == "bp" || *c == "diabetes")
        .collect();
    (!tracked.is_empty()).then(|| format!("{condition} with {}", tracked.join(", ")))
}

fn ml_input(user: &User, req: &RecommendRequest) -> MlInput {
    MlInput {
        condition: req.condition.clone(),
        age: user.age,
        gender: user.gender.clone(),
        severity: req.severity.clone(),
        has_bp: user.has_bp(),
        has_diabetes: user.has_diabetes(),
        bmi_category: user.bmi_category.clone(),
        activity_level: user.activity_level.clone(),
        // zero minutes is treated like a missing value
        time_available: whole_minutes(req)
            .filter(|t| *t != 0)
            .unwrap_or(DEFAULT_ML_MINUTES),
    }
}

fn match_query(condition: String, user: &User, req: &RecommendRequest) -> MatchQuery {
    MatchQuery {
        condition,
        age: Some(f64::from(user.age)),
        severity: req.severity.clone(),
        time_available: whole_minutes(req).map(f64::from),
        gender: Some(user.gender.clone()),
        activity_level: Some(user.activity_level.clone()),
        bmi_category: Some(user.bmi_category.clone()),
        has_bp: user.has_bp(),
        has_diabetes: user.has_diabetes(),
    }
}

/// Picks items for `user`. `None` means neither path produced anything.
pub fn choose(
    dataset: &Dataset,
    ml: Option<&MlRecommender>,
    threshold: f64,
    user: &User,
    req: &RecommendRequest,
    rng: &mut impl Rng,
) -> Option<Choice> {
    if let Some(rec) = ml.and_then(|m| m.recommend(&ml_input(user, req), threshold, rng)) {
        info!(confidence = rec.confidence, "serving ml recommendation");
        return Some(Choice {
            yoga_pose: rec.yoga_pose.clone(),
            exercise: rec.exercise.clone(),
            ayurveda_tip: rec.ayurveda_tip.clone(),
            ml: Some(rec),
        });
    }

    let conditions = comorbid_condition(&req.condition, user)
        .into_iter()
        .chain(std::iter::once(req.condition.clone()));
    for condition in conditions {
        debug!(%condition, "rule-based lookup");
        if let Some(m) = match_recommendation(dataset, &match_query(condition, user, req)) {
            return Some(Choice {
                yoga_pose: m.yoga_pose,
                exercise: m.exercise,
                ayurveda_tip: m.ayurveda_tip,
                ml: None,
            });
        }
    }
    None
}

fn or_default(item: String, fallback: &str) -> String {
    if item.trim().is_empty() {
        fallback.to_string()
    } else {
        item
    }
}

pub fn build_record(user: &User, req: &RecommendRequest, choice: Choice) -> RecommendationRecord {
    let warning = pose_warning(&choice.yoga_pose, &user.conditions);
    let female = user.is_female();

    let (ml_used, ml_confidence, categories) = match &choice.ml {
        Some(rec) => (
            true,
            rec.confidence_percent(),
            Some((
                rec.yoga_category.clone(),
                rec.exercise_category.clone(),
                rec.ayurveda_category.clone(),
            )),
        ),
        None => (false, 0.0, None),
    };
    let (yoga_category, exercise_category, ayurveda_category) = match categories {
        Some((y, e, a)) => (Some(y), Some(e), Some(a)),
        None => (None, None, None),
    };

    RecommendationRecord {
        id: Uuid::new_v4(),
        user_id: user.id,
        email: user.email.clone(),
        condition: req.condition.clone(),
        severity: req.severity.clone(),
        age: user.age,
        gender: user.gender.clone(),
        user_conditions: user.conditions.clone(),
        yoga_pose: or_default(choice.yoga_pose, FALLBACK_YOGA),
        exercise: or_default(choice.exercise, FALLBACK_EXERCISE),
        ayurveda_tip: or_default(choice.ayurveda_tip, FALLBACK_AYURVEDA),
        time_available: whole_minutes(req),
        regularity: req.frequency.clone().filter(|f| !f.trim().is_empty()),
        warning,
        ml_used,
        ml_confidence,
        yoga_category,
        exercise_category,
        ayurveda_category,
        pcod: female.then(|| user.pcod.unwrap_or(false)),
        recent_pregnancy: female.then(|| user.recent_pregnancy.unwrap_or(false)),
        created_at: OffsetDateTime::now_utc(),
    }
}

pub fn steps_for(catalog: &StepsCatalog, record: &RecommendationRecord) -> PracticeSteps {
    PracticeSteps {
        yoga: catalog.steps_for(&record.yoga_pose),
        exercise: catalog.steps_for(&record.exercise),
        ayurveda: catalog.steps_for(&record.ayurveda_tip),
    }
}

fn request_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub async fn recommend(
    state: &AppState,
    user_id: Uuid,
    mut req: RecommendRequest,
) -> ApiResult<RecommendResponse> {
    req.condition = req.condition.trim().to_string();
    req.severity = req.severity.trim().to_string();
    if req.condition.is_empty() || req.severity.is_empty() {
        return Err(ApiError::bad_request("Condition and severity are required"));
    }

    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found. Please register first."))?;

    let choice = {
        let mut rng = request_rng(state.config.ml.seed);
        choose(
            &state.dataset,
            state.ml.as_deref(),
            state.config.ml.confidence_threshold,
            &user,
            &req,
            &mut rng,
        )
    }
    .ok_or_else(|| ApiError::not_found("No recommendation found"))?;

    let record = build_record(&user, &req, choice);
    state.store.insert_recommendation(&record).await?;
    info!(
        user_id = %user.id,
        yoga = %record.yoga_pose,
        ml_used = record.ml_used,
        warned = record.warning.is_some(),
        "recommendation served"
    );

    let steps = steps_for(&state.steps, &record);
    Ok(RecommendResponse {
        success: true,
        recommendation: record,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::recommend::{
        dataset::DatasetRow,
        ml::{
            features::Encoders,
            model::{DecisionTree, TreeEnsemble},
        },
    };

    fn user(conditions: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            username: "asha".into(),
            email: "asha@gmail.com".into(),
            password_hash: "hash".into(),
            age: 30,
            blood_group: "O+".into(),
            gender: "female".into(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            other_conditions: vec![],
            height: 160.0,
            weight: 55.0,
            bmi: 21,
            bmi_category: "normal".into(),
            activity_level: "moderate".into(),
            recent_pregnancy: Some(false),
            pcod: Some(true),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn row(condition: &str, yoga: &str) -> DatasetRow {
        DatasetRow {
            condition: condition.into(),
            age: Some(30.0),
            severity: "mild".into(),
            yoga_pose: yoga.into(),
            exercise: "walking.jpg".into(),
            ayurveda_tip: "".into(),
            gender: None,
            activity_level: None,
            bmi_category: None,
            time_available: Some(20.0),
            has_bp: false,
            has_diabetes: false,
        }
    }

    fn request(condition: &str) -> RecommendRequest {
        RecommendRequest {
            condition: condition.into(),
            severity: "mild".into(),
            time_available: Some(20.0),
            frequency: Some("daily".into()),
        }
    }

    #[test]
    fn comorbid_condition_lists_tracked_conditions_in_order() {
        assert_eq!(
            comorbid_condition("back pain", &user(&["diabetes", "bp"])).as_deref(),
            Some("back pain with diabetes, bp")
        );
        assert_eq!(comorbid_condition("back pain", &user(&[])), None);
    }

    #[test]
    fn prefers_comorbid_rows_then_bare_condition() {
        let ds = Dataset::from_rows(vec![
            row("stress", "balasana.jpg"),
            row("stress with bp", "sukhasana.jpg"),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        let c = choose(&ds, None, 0.3, &user(&["bp"]), &request("stress"), &mut rng).unwrap();
        assert_eq!(c.yoga_pose, "sukhasana.jpg");
        assert!(c.ml.is_none());

        let c = choose(&ds, None, 0.3, &user(&["diabetes"]), &request("Stress"), &mut rng).unwrap();
        assert_eq!(c.yoga_pose, "balasana.jpg");

        assert!(choose(&ds, None, 0.3, &user(&[]), &request("insomnia"), &mut rng).is_none());
    }

    /// Single-leaf ensemble over `time_available` with the given class
    /// weights.
    fn constant(weights: &[f64]) -> TreeEnsemble {
        TreeEnsemble {
            n_features: 1,
            n_classes: weights.len(),
            trees: vec![DecisionTree {
                children_left: vec![-1],
                children_right: vec![-1],
                feature: vec![-2],
                threshold: vec![-2.0],
                value: vec![weights.to_vec()],
            }],
        }
    }

    fn recommender(weights: &[f64]) -> MlRecommender {
        let classes: Vec<String> = ["relaxation", "cardio", "herbal_tea", "dietary"]
            .iter()
            .take(weights.len())
            .map(|c| c.to_string())
            .collect();
        let encoders = Encoders::new(HashMap::from([
            ("yoga_category".to_string(), classes.clone()),
            ("exercise_category".to_string(), classes.clone()),
            ("ayurveda_category".to_string(), classes),
        ]));
        MlRecommender::new(
            constant(weights),
            constant(weights),
            constant(weights),
            encoders,
            vec!["time_available".into()],
        )
        .unwrap()
    }

    #[test]
    fn confident_model_is_served_before_rules() {
        let ds = Dataset::from_rows(vec![row("stress", "balasana.jpg")]);
        let ml = recommender(&[1.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(5);

        let c = choose(&ds, Some(&ml), 0.3, &user(&[]), &request("stress"), &mut rng).unwrap();
        let rec = c.ml.expect("ml result");
        assert_eq!(rec.yoga_category, "relaxation");
        assert_eq!(c.yoga_pose, rec.yoga_pose);
    }

    #[test]
    fn low_confidence_model_falls_back_to_rules() {
        let ds = Dataset::from_rows(vec![row("stress", "balasana.jpg")]);
        // uniform over four classes: 0.25 is under the 0.3 threshold
        let ml = recommender(&[1.0, 1.0, 1.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(5);

        let c = choose(&ds, Some(&ml), 0.3, &user(&[]), &request("stress"), &mut rng).unwrap();
        assert_eq!(c.yoga_pose, "balasana.jpg");
        assert!(c.ml.is_none());
    }

    #[test]
    fn failing_model_falls_back_to_rules() {
        let ds = Dataset::from_rows(vec![row("stress", "balasana.jpg")]);
        // a leaf without weight cannot be normalized, so prediction errors
        let ml = recommender(&[0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(5);

        let c = choose(&ds, Some(&ml), 0.3, &user(&[]), &request("stress"), &mut rng).unwrap();
        assert_eq!(c.yoga_pose, "balasana.jpg");
        assert!(c.ml.is_none());

        assert!(choose(&ds, Some(&ml), 0.3, &user(&[]), &request("insomnia"), &mut rng).is_none());
    }

    #[test]
    fn matcher_uses_whole_minutes() {
        let mut short = row("stress", "balasana.jpg");
        short.time_available = Some(15.0);
        let mut long = row("stress", "sukhasana.jpg");
        long.time_available = Some(30.0);
        let ds = Dataset::from_rows(vec![long, short]);

        // 22.9 is 22 minutes: 7 from the short row, 8 from the long one
        let mut req = request("stress");
        req.time_available = Some(22.9);
        let mut rng = StdRng::seed_from_u64(1);
        let c = choose(&ds, None, 0.3, &user(&[]), &req, &mut rng).unwrap();
        assert_eq!(c.yoga_pose, "balasana.jpg");
        assert_eq!(build_record(&user(&[]), &req, c).time_available, Some(22));
    }

    #[test]
    fn ml_minutes_default_to_thirty_when_missing_or_zero() {
        let u = user(&[]);
        let mut req = request("stress");

        req.time_available = Some(45.7);
        assert_eq!(ml_input(&u, &req).time_available, 45);
        req.time_available = Some(0.4);
        assert_eq!(ml_input(&u, &req).time_available, DEFAULT_ML_MINUTES);
        req.time_available = None;
        assert_eq!(ml_input(&u, &req).time_available, DEFAULT_ML_MINUTES);
    }

    #[test]
    fn record_carries_warning_defaults_and_female_flags() {
        let u = user(&["bp"]);
        let choice = Choice {
            yoga_pose: "sarvangasana.jpg".into(),
            exercise: " ".into(),
            ayurveda_tip: "".into(),
            ml: None,
        };
        let rec = build_record(&u, &request("stress"), choice);

        assert_eq!(rec.yoga_pose, "sarvangasana.jpg");
        assert!(rec.warning.as_deref().unwrap().contains("Blood Pressure"));
        assert_eq!(rec.exercise, FALLBACK_EXERCISE);
        assert_eq!(rec.ayurveda_tip, FALLBACK_AYURVEDA);
        assert_eq!(rec.time_available, Some(20));
        assert_eq!(rec.regularity.as_deref(), Some("daily"));
        assert_eq!(rec.pcod, Some(true));
        assert!(!rec.ml_used);
        assert_eq!(rec.ml_confidence, 0.0);
        assert!(rec.yoga_category.is_none());
    }

    #[test]
    fn ml_choice_is_recorded_with_confidence_and_categories() {
        let choice = Choice {
            yoga_pose: "balasana.jpg".into(),
            exercise: "cycling.jpg".into(),
            ayurveda_tip: "ginger_tea.jpg".into(),
            ml: Some(MlRecommendation {
                yoga_pose: "balasana.jpg".into(),
                exercise: "cycling.jpg".into(),
                ayurveda_tip: "ginger_tea.jpg".into(),
                yoga_category: "relaxation".into(),
                exercise_category: "cardio".into(),
                ayurveda_category: "herbal_tea".into(),
                confidence: 0.81234,
            }),
        };
        let mut u = user(&[]);
        u.gender = "male".into();
        let rec = build_record(&u, &request("stress"), choice);
        assert!(rec.ml_used);
        assert_eq!(rec.ml_confidence, 81.23);
        assert_eq!(rec.yoga_category.as_deref(), Some("relaxation"));
        assert_eq!(rec.pcod, None);
        assert!(rec.warning.is_none());
    }

    #[test]
    fn steps_fall_back_for_unknown_items() {
        let catalog = StepsCatalog::from_json(r#"{"balasana.jpg": ["Kneel."]}"#).unwrap();
        let rec = build_record(
            &user(&[]),
            &request("stress"),
            Choice {
                yoga_pose: "balasana.jpg".into(),
                exercise: "mystery.jpg".into(),
                ayurveda_tip: "".into(),
                ml: None,
            },
        );
        let steps = steps_for(&catalog, &rec);
        assert_eq!(steps.yoga, vec!["Kneel."]);
        assert_eq!(steps.exercise, vec!["Steps not available."]);
        assert_eq!(steps.ayurveda, vec!["Steps not available."]);
    }
}
