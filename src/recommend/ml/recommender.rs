use std::{collections::HashMap, path::Path};

use anyhow::{ensure, Context};
use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    features::{feature_vector, Encoders, MlInput},
    model::TreeEnsemble,
};

pub const DEFAULT_YOGA: &str = "shavasana.jpg";
pub const DEFAULT_EXERCISE: &str = "walking.jpg";
pub const DEFAULT_AYURVEDA: &str = "green_tea.jpg";

const BP_UNSAFE: [&str; 4] = [
    "shirshasana.jpg",
    "sarvangasana.jpg",
    "halasana.jpg",
    "breathing_drill.jpg",
];
const DIABETES_UNSAFE: [&str; 2] = ["shirshasana.jpg", "sarvangasana.jpg"];

fn yoga_pool(category: &str) -> &'static [&'static str] {
    match category {
        "relaxation" => &["shavasana.jpg", "sukhasana.jpg", "balasana.jpg", "viparita_karani.jpg"],
        "flexibility" => &["uttanasana.jpg", "trikonasana.jpg", "side_bends.jpg", "cat_cow_pose.jpg"],
        "strength" => &["virabhadrasana.jpg", "bhujangasana.jpg", "core_strength.jpg", "setu_bandhasana.jpg"],
        "breathing" => &["deep_breathing.jpg", "anulom_vilom.jpg", "breathing_drill.jpg", "deep_breathing.jpg"],
        "hormonal" => &["baddha_konasana.jpg", "setu_bandhasana.jpg", "malasana.jpg", "supta_baddha_konasana.jpg"],
        "joint_health" => &["balasana.jpg", "shoulder_rolls.jpg", "cat_cow_pose.jpg", "mobility_exercise.jpg"],
        _ => &[DEFAULT_YOGA],
    }
}

fn exercise_pool(category: &str) -> &'static [&'static str] {
    match category {
        "cardio" => &["brisk_walking.jpg", "light_jog.jpg", "cycling.jpg", "jumping_jacks.jpg"],
        "strength" => &["step_ups.jpg", "core_strength.jpg", "stretching.jpg", "hand_rotation.jpg"],
        "flexibility" => &["stretching.jpg", "sun_salutation.jpg", "core_strength.jpg", "balance_training.jpg"],
        "low_impact" => &["slow_walking.jpg", "mobility_exercise.jpg", "stretching.jpg", "sukhasana.jpg"],
        _ => &[DEFAULT_EXERCISE],
    }
}

fn ayurveda_pool(category: &str) -> &'static [&'static str] {
    match category {
        "herbal_tea" => &[
            "herbal_tea.jpg",
            "ginger_tea.jpg",
            "lavender_tea.jpg",
            "green_tea.jpg",
            "turmeric_milk.jpg",
            "hibiscus_tea.jpg",
        ],
        "oil_massage" => &[
            "warm_oil_massage.jpg",
            "head_massage_oil.jpg",
            "warm_oil_massage.jpg",
            "head_massage_oil.jpg",
        ],
        "dietary" => &["cinnamon_tea.jpg", "diet_control.jpg", "herbal_tea.jpg", "lemon_water.jpg"],
        // repeats weight the draw
        "powder" => &["ashwagandha_powder.jpg", "turmeric_milk.jpg", "ashwagandha_powder.jpg"],
        _ => &[DEFAULT_AYURVEDA],
    }
}

/// Yoga pool for `category` with poses unsafe for the user's comorbidities
/// removed; never empty.
pub fn safe_yoga_pool(category: &str, has_bp: bool, has_diabetes: bool) -> Vec<&'static str> {
    let safe: Vec<&'static str> = yoga_pool(category)
        .iter()
        .copied()
        .filter(|p| !(has_bp && BP_UNSAFE.contains(p)))
        .filter(|p| !(has_diabetes && DIABETES_UNSAFE.contains(p)))
        .collect();
    if safe.is_empty() {
        vec![DEFAULT_YOGA]
    } else {
        safe
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlRecommendation {
    pub yoga_pose: String,
    pub exercise: String,
    pub ayurveda_tip: String,
    pub yoga_category: String,
    pub exercise_category: String,
    pub ayurveda_category: String,
    /// Mean of the three top-class probabilities.
    pub confidence: f64,
}

impl MlRecommendation {
    /// Confidence as a percentage rounded to two decimals.
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 10_000.0).round() / 100.0
    }
}

/// Model bundle loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct MlRecommender {
    yoga: TreeEnsemble,
    exercise: TreeEnsemble,
    ayurveda: TreeEnsemble,
    encoders: Encoders,
    feature_names: Vec<String>,
}

fn pick<R: Rng + ?Sized>(pool: &[&str], rng: &mut R) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

impl MlRecommender {
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let yoga = TreeEnsemble::load(dir.join("yoga_model.json"))?;
        let exercise = TreeEnsemble::load(dir.join("exercise_model.json"))?;
        let ayurveda = TreeEnsemble::load(dir.join("ayurveda_model.json"))?;
        let encoders: HashMap<String, Vec<String>> = read_json(&dir.join("encoders.json"))?;
        let feature_names: Vec<String> = read_json(&dir.join("feature_names.json"))?;

        let recommender = Self::new(yoga, exercise, ayurveda, Encoders::new(encoders), feature_names)?;
        info!(dir = %dir.display(), features = recommender.feature_names.len(), "ml models loaded");
        Ok(recommender)
    }

    pub fn new(
        yoga: TreeEnsemble,
        exercise: TreeEnsemble,
        ayurveda: TreeEnsemble,
        encoders: Encoders,
        feature_names: Vec<String>,
    ) -> anyhow::Result<Self> {
        for (target, model) in [
            ("yoga_category", &yoga),
            ("exercise_category", &exercise),
            ("ayurveda_category", &ayurveda),
        ] {
            let classes = encoders
                .class_count(target)
                .with_context(|| format!("missing {target} encoder"))?;
            ensure!(
                classes == model.n_classes,
                "{target} encoder has {classes} classes, model has {}",
                model.n_classes
            );
            ensure!(
                model.n_features == feature_names.len(),
                "{target} model expects {} features, bundle names {}",
                model.n_features,
                feature_names.len()
            );
        }
        Ok(Self {
            yoga,
            exercise,
            ayurveda,
            encoders,
            feature_names,
        })
    }

    fn classify(&self, model: &TreeEnsemble, target: &str, x: &[f64]) -> anyhow::Result<(String, f64)> {
        let (index, proba) = model.predict(x).with_context(|| format!("predict {target}"))?;
        let category = self
            .encoders
            .decode(target, index)
            .with_context(|| format!("{target} has no class {index}"))?;
        Ok((category.to_string(), proba))
    }

    /// Predicts categories and draws concrete items, regardless of
    /// confidence.
    pub fn predict(&self, input: &MlInput, rng: &mut impl Rng) -> anyhow::Result<MlRecommendation> {
        let x = feature_vector(input, &self.encoders, &self.feature_names);

        let (yoga_category, yoga_p) = self.classify(&self.yoga, "yoga_category", &x)?;
        let (exercise_category, exercise_p) = self.classify(&self.exercise, "exercise_category", &x)?;
        let (ayurveda_category, ayurveda_p) = self.classify(&self.ayurveda, "ayurveda_category", &x)?;

        let yoga_options = safe_yoga_pool(&yoga_category, input.has_bp, input.has_diabetes);
        Ok(MlRecommendation {
            yoga_pose: pick(&yoga_options, rng),
            exercise: pick(exercise_pool(&exercise_category), rng),
            ayurveda_tip: pick(ayurveda_pool(&ayurveda_category), rng),
            yoga_category,
            exercise_category,
            ayurveda_category,
            confidence: (yoga_p + exercise_p + ayurveda_p) / 3.0,
        })
    }

    /// ML recommendation when it clears `threshold`. Internal failures are
    /// logged and treated as no result.
    pub fn recommend(
        &self,
        input: &MlInput,
        threshold: f64,
        rng: &mut impl Rng,
    ) -> Option<MlRecommendation> {
        match self.predict(input, rng) {
            Ok(rec) if rec.confidence >= threshold => {
                debug!(confidence = rec.confidence, "ml recommendation accepted");
                Some(rec)
            }
            Ok(rec) => {
                debug!(confidence = rec.confidence, threshold, "ml confidence below threshold");
                None
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "ml prediction failed; using rules");
                None
            }
        }
    }
}
