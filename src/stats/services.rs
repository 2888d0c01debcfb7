use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use crate::store::User;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub total_sessions: usize,
    pub longest_streak: u32,
    pub current_streak: u32,
}

/// Streaks over session dates (any order). Consecutive days extend a run,
/// repeats on the same day change nothing, larger gaps start over. The
/// current run is dropped once the last session is older than yesterday.
pub fn compute_streaks(dates: &[Date], today: Date) -> Streaks {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    let Some(&last) = sorted.last() else {
        return Streaks::default();
    };

    let mut longest = 1;
    let mut run = 1;
    for pair in sorted.windows(2) {
        match (pair[1] - pair[0]).whole_days() {
            1 => {
                run += 1;
                longest = longest.max(run);
            }
            d if d > 1 => run = 1,
            _ => {}
        }
    }

    let current = if (today - last).whole_days() > 1 { 0 } else { run };
    Streaks {
        total_sessions: sorted.len(),
        longest_streak: longest,
        current_streak: current,
    }
}

/// `back_pain` → `Back Pain`.
pub fn display_name(condition: &str) -> String {
    let mut out = String::with_capacity(condition.len());
    let mut word_start = true;
    for ch in condition.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }
    out
}

fn tracked_name(condition: &str) -> String {
    match condition {
        "bp" => "Blood Pressure".to_string(),
        "diabetes" => "Diabetes".to_string(),
        other => display_name(other),
    }
}

/// How many users report each condition, keyed by display name.
pub fn condition_counts(users: &[User]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    let mut bump = |name: String| *counts.entry(name).or_insert(0) += 1;

    for user in users {
        user.conditions
            .iter()
            .filter(|c| !c.is_empty())
            .for_each(|c| bump(tracked_name(c)));
        user.other_conditions
            .iter()
            .filter(|c| !c.is_empty())
            .for_each(|c| bump(display_name(c)));
        if user.pcod.unwrap_or(false) {
            bump("PCOS/PCOD".to_string());
        }
        if user.recent_pregnancy.unwrap_or(false) {
            bump("Recent Pregnancy".to_string());
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    #[test]
    fn no_sessions_means_zero_streaks() {
        assert_eq!(compute_streaks(&[], date!(2025 - 03 - 10)), Streaks::default());
    }

    #[test]
    fn consecutive_days_extend_and_gaps_reset() {
        let dates = [
            date!(2025 - 03 - 01),
            date!(2025 - 03 - 02),
            date!(2025 - 03 - 02),
            date!(2025 - 03 - 03),
            date!(2025 - 03 - 06),
            date!(2025 - 03 - 07),
        ];
        let s = compute_streaks(&dates, date!(2025 - 03 - 08));
        assert_eq!(s.total_sessions, 6);
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.current_streak, 2);
    }

    #[test]
    fn current_streak_lapses_after_a_missed_day() {
        let dates = [date!(2025 - 03 - 05), date!(2025 - 03 - 06)];
        assert_eq!(compute_streaks(&dates, date!(2025 - 03 - 07)).current_streak, 2);
        assert_eq!(compute_streaks(&dates, date!(2025 - 03 - 08)).current_streak, 0);
        assert_eq!(compute_streaks(&dates, date!(2025 - 03 - 08)).longest_streak, 2);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let dates = [date!(2025 - 03 - 03), date!(2025 - 03 - 01), date!(2025 - 03 - 02)];
        let s = compute_streaks(&dates, date!(2025 - 03 - 03));
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.current_streak, 3);
    }

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name("back_pain"), "Back Pain");
        assert_eq!(display_name("THYROID"), "Thyroid");
        assert_eq!(display_name("knee pain"), "Knee Pain");
    }

    fn user(conditions: &[&str], other: &[&str], pcod: Option<bool>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "n".into(),
            username: "u".into(),
            email: "u@gmail.com".into(),
            password_hash: "h".into(),
            age: 30,
            blood_group: "O+".into(),
            gender: if pcod.is_some() { "female" } else { "male" }.into(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            other_conditions: other.iter().map(|c| c.to_string()).collect(),
            height: 170.0,
            weight: 70.0,
            bmi: 24,
            bmi_category: "normal".into(),
            activity_level: "active".into(),
            recent_pregnancy: pcod.map(|_| true),
            pcod,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn counts_conditions_across_users() {
        let users = [
            user(&["bp", "diabetes"], &["back_pain"], None),
            user(&["bp"], &["", "asthma"], Some(true)),
        ];
        let counts = condition_counts(&users);
        assert_eq!(counts["Blood Pressure"], 2);
        assert_eq!(counts["Diabetes"], 1);
        assert_eq!(counts["Back Pain"], 1);
        assert_eq!(counts["Asthma"], 1);
        assert_eq!(counts["PCOS/PCOD"], 1);
        assert_eq!(counts["Recent Pregnancy"], 1);
        assert_eq!(counts.len(), 6);
    }
}
