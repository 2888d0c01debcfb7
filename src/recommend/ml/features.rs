use std::collections::HashMap;

/// Profile and request attributes the classifiers are trained on.
#[derive(Debug, Clone)]
pub struct MlInput {
    pub condition: String,
    pub age: i32,
    pub gender: String,
    pub severity: String,
    pub has_bp: bool,
    pub has_diabetes: bool,
    pub bmi_category: String,
    pub activity_level: String,
    pub time_available: i32,
}

impl Default for MlInput {
    fn default() -> Self {
        Self {
            condition: "stress".into(),
            age: 30,
            gender: "other".into(),
            severity: "mild".into(),
            has_bp: false,
            has_diabetes: false,
            bmi_category: "normal".into(),
            activity_level: "moderate".into(),
            time_available: 30,
        }
    }
}

pub fn age_group(age: i32) -> &'static str {
    match age {
        i32::MIN..=17 => "child",
        18..=35 => "young_adult",
        36..=50 => "adult",
        _ => "senior",
    }
}

fn severity_numeric(severity: &str) -> f64 {
    match severity {
        "moderate" => 2.0,
        "severe" => 3.0,
        _ => 1.0,
    }
}

fn bmi_risk(category: &str) -> f64 {
    match category {
        "underweight" => 2.0,
        "overweight" => 1.0,
        "obese" => 3.0,
        _ => 0.0,
    }
}

fn activity_score(level: &str) -> f64 {
    match level {
        "sedentary" => 0.0,
        "active" => 2.0,
        _ => 1.0,
    }
}

/// Label encoders: for each name, the ordered list of known classes.
/// A value encodes to its index in that list.
#[derive(Debug, Clone, Default)]
pub struct Encoders {
    classes: HashMap<String, Vec<String>>,
}

impl Encoders {
    pub fn new(classes: HashMap<String, Vec<String>>) -> Self {
        Self { classes }
    }

    /// `None` when there is no encoder for `name` or it has never seen
    /// `value`.
    pub fn encode(&self, name: &str, value: &str) -> Option<usize> {
        self.classes.get(name)?.iter().position(|c| c == value)
    }

    pub fn decode(&self, name: &str, index: usize) -> Option<&str> {
        self.classes.get(name)?.get(index).map(String::as_str)
    }

    pub fn class_count(&self, name: &str) -> Option<usize> {
        self.classes.get(name).map(Vec::len)
    }
}

fn clean(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Builds the model input vector in `feature_names` order. Categorical
/// columns appear as `<name>_encoded`; values the encoder has not seen and
/// names with no known feature encode to 0.
pub fn feature_vector(input: &MlInput, encoders: &Encoders, feature_names: &[String]) -> Vec<f64> {
    let condition = clean(&input.condition);
    let gender = clean(&input.gender);
    let severity = clean(&input.severity);
    let bmi_category = clean(&input.bmi_category);
    let activity_level = clean(&input.activity_level);
    let age = input.age;
    let has_bp = if input.has_bp { 1.0 } else { 0.0 };
    let has_diabetes = if input.has_diabetes { 1.0 } else { 0.0 };

    let categorical: [(&str, &str); 6] = [
        ("condition", &condition),
        ("age_group", age_group(age)),
        ("gender", &gender),
        ("severity", &severity),
        ("bmi_category", &bmi_category),
        ("activity_level", &activity_level),
    ];

    let mut values: HashMap<String, f64> = HashMap::new();
    for (name, value) in categorical {
        let encoded = encoders.encode(name, value).unwrap_or(0) as f64;
        values.insert(format!("{name}_encoded"), encoded);
    }

    values.insert("age".into(), age as f64);
    values.insert("has_bp".into(), has_bp);
    values.insert("has_diabetes".into(), has_diabetes);
    values.insert("time_available".into(), input.time_available as f64);
    values.insert("is_senior".into(), if age >= 51 { 1.0 } else { 0.0 });
    values.insert("is_child".into(), if age <= 17 { 1.0 } else { 0.0 });
    values.insert("health_risk".into(), has_bp + has_diabetes);
    values.insert("severity_numeric".into(), severity_numeric(&severity));
    values.insert("bmi_risk".into(), bmi_risk(&bmi_category));
    values.insert("activity_score".into(), activity_score(&activity_level));

    feature_names
        .iter()
        .map(|name| values.get(name).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn age_group_boundaries() {
        assert_eq!(age_group(17), "child");
        assert_eq!(age_group(18), "young_adult");
        assert_eq!(age_group(35), "young_adult");
        assert_eq!(age_group(50), "adult");
        assert_eq!(age_group(51), "senior");
    }

    #[test]
    fn builds_vector_in_feature_order() {
        let encoders = Encoders::new(HashMap::from([
            ("condition".to_string(), names(&["back pain", "stress"])),
            ("age_group".to_string(), names(&["adult", "senior"])),
        ]));
        let input = MlInput {
            condition: " Stress ".into(),
            age: 60,
            severity: "severe".into(),
            has_bp: true,
            has_diabetes: true,
            bmi_category: "obese".into(),
            activity_level: "sedentary".into(),
            time_available: 20,
            ..Default::default()
        };
        let order = names(&[
            "activity_score",
            "condition_encoded",
            "age_group_encoded",
            "gender_encoded",
            "health_risk",
            "is_senior",
            "is_child",
            "severity_numeric",
            "bmi_risk",
            "time_available",
            "age",
            "something_new",
        ]);

        let x = feature_vector(&input, &encoders, &order);
        assert_eq!(
            x,
            vec![0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 0.0, 3.0, 3.0, 20.0, 60.0, 0.0]
        );
    }

    #[test]
    fn unknown_labels_encode_to_zero_and_defaults_apply() {
        let encoders = Encoders::new(HashMap::from([(
            "severity".to_string(),
            names(&["mild", "moderate", "severe"]),
        )]));
        let input = MlInput {
            severity: "extreme".into(),
            activity_level: "athletic".into(),
            ..Default::default()
        };
        let order = names(&["severity_encoded", "severity_numeric", "activity_score"]);
        assert_eq!(feature_vector(&input, &encoders, &order), vec![0.0, 1.0, 1.0]);
    }
}
