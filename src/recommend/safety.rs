//! Comorbidity warnings for the chosen yoga pose. A warning never blocks
//! the recommendation.

const BP_UNSAFE: [&str; 7] = [
    "shirshasana",
    "sarvangasana",
    "halasana",
    "kapalbhati",
    "adho_mukha_vrksasana",
    "chakrasana",
    "viparita_karani",
];
const DIABETES_UNSAFE: [&str; 2] = ["shirshasana", "sarvangasana"];

fn unsafe_poses(condition: &str) -> &'static [&'static str] {
    match condition {
        "bp" => &BP_UNSAFE,
        "diabetes" => &DIABETES_UNSAFE,
        _ => &[],
    }
}

/// Warning for the first of `conditions` (in stored order) whose unsafe
/// list matches `pose` by substring.
pub fn pose_warning(pose: &str, conditions: &[String]) -> Option<String> {
    let name = pose.to_lowercase();
    let cond = conditions
        .iter()
        .find(|c| unsafe_poses(c).iter().any(|u| name.contains(u)))?;

    Some(if cond == "bp" {
        format!("⚠️ Caution: Avoid doing this yoga pose ({pose}) excessively as you have Blood Pressure.")
    } else {
        format!(
            "⚠️ Caution: The recommended pose '{pose}' may not be suitable for people with {}. \
             Please consult your doctor before performing this.",
            cond.to_uppercase()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bp_user_gets_blood_pressure_warning() {
        let w = pose_warning("sarvangasana.jpg", &conds(&["bp"])).unwrap();
        assert_eq!(
            w,
            "⚠️ Caution: Avoid doing this yoga pose (sarvangasana.jpg) excessively as you have Blood Pressure."
        );
    }

    #[test]
    fn first_matching_condition_in_stored_order_wins() {
        let w = pose_warning("Shirshasana.jpg", &conds(&["diabetes", "bp"])).unwrap();
        assert!(w.contains("people with DIABETES"));
        assert!(w.contains("'Shirshasana.jpg'"));

        let w = pose_warning("halasana.jpg", &conds(&["diabetes", "bp"])).unwrap();
        assert!(w.contains("Blood Pressure"));
    }

    #[test]
    fn safe_pose_or_no_conditions_has_no_warning() {
        assert!(pose_warning("shavasana.jpg", &conds(&["bp", "diabetes"])).is_none());
        assert!(pose_warning("sarvangasana.jpg", &[]).is_none());
        assert!(pose_warning("kapalbhati.jpg", &conds(&["diabetes"])).is_none());
    }
}
