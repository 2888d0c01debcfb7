//! Prompt assembly for the wellness companion.

use serde::Deserialize;

use crate::store::{RecommendationRecord, User};

const HISTORY_WINDOW: usize = 10;
const EMPTY_HISTORY: &str = "This is the start of the conversation.";

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
}

/// Reply language for a client code; unknown codes mean English.
pub fn language_name(code: &str) -> &'static str {
    match code {
        "te" => "Telugu",
        "kn" => "Kannada",
        "hi" => "Hindi",
        _ => "English",
    }
}

/// Last ten messages as `Patient:` / `Assistant:` lines.
pub fn format_history(history: &[HistoryMessage]) -> String {
    if history.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|m| {
            let role = if m.sender == "user" { "Patient" } else { "Assistant" };
            format!("{role}: {}", m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn user_context(user: &User) -> String {
    let all: Vec<&str> = user
        .conditions
        .iter()
        .chain(&user.other_conditions)
        .map(String::as_str)
        .collect();
    let conditions = if all.is_empty() {
        "None".to_string()
    } else {
        all.join(", ")
    };

    let mut ctx = format!(
        "Patient Background Information:\n\
         - Name: {}\n\
         - Age: {}\n\
         - Gender: {}\n\
         - Blood Group: {}\n\
         - Health Conditions: {conditions}\n",
        user.name, user.age, user.gender, user.blood_group
    );
    if user.is_female() {
        if user.recent_pregnancy.unwrap_or(false) {
            ctx.push_str("- Recent Pregnancy: Yes\n");
        }
        if user.pcod.unwrap_or(false) {
            ctx.push_str("- PCOS: Yes\n");
        }
    }
    ctx
}

pub fn recommendation_context(rec: &RecommendationRecord) -> String {
    format!(
        "Recent Health Recommendation (Date: {}):\n\
         - Issue Reported: {} (Severity: {})\n\
         - Suggested Yoga: {}\n\
         - Suggested Exercise: {}\n\
         - Ayurveda Tip: {}\n",
        rec.created_at.date(),
        rec.condition,
        rec.severity,
        rec.yoga_pose,
        rec.exercise,
        rec.ayurveda_tip
    )
}

/// Inputs for one chatbot turn. Profile and recommendation are present
/// only for signed-in callers.
#[derive(Debug, Default)]
pub struct PromptParts<'a> {
    pub message: &'a str,
    pub language: &'a str,
    pub history: &'a [HistoryMessage],
    pub user: Option<&'a User>,
    pub latest: Option<&'a RecommendationRecord>,
}

pub fn build_prompt(parts: &PromptParts<'_>) -> String {
    let lang = language_name(parts.language);
    let user_ctx = parts.user.map(user_context).unwrap_or_default();
    let rec_ctx = parts.latest.map(recommendation_context).unwrap_or_default();
    let conversation = format_history(parts.history);

    format!(
        "You are a warm, energetic, and deeply caring Wellness Best Friend. \
You are a supportive companion on the user's journey to better health.

{user_ctx}
{rec_ctx}

Your Personality & Approach:
1. **Be Super Friendly & Motivating**: Use emojis 🌿✨💪, warm greetings, and encouraging language.
2. **Short & Sweet**: Respond in 1-2 lines MAX. Just like texting a friend. No paragraphs.
3. **Casual Tone**: Talk like a real friend. Relaxed and natural.
4. **Check-in**: If they mention their condition, ask how it's going.
5. **Empathetic**: Validate their feelings briefly.
6. **LANGUAGE**: You MUST reply in {lang}. Even if the user asks in English, reply in {lang}.

Previous conversation context:
{conversation}

User's current message: \"{message}\"

Now provide a warm, motivating, and personalized response in {lang} (keep it short!):",
        message = parts.message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn msg(sender: &str, text: &str) -> HistoryMessage {
        HistoryMessage {
            sender: sender.into(),
            text: text.into(),
        }
    }

    #[test]
    fn language_codes_map_to_names() {
        assert_eq!(language_name("te"), "Telugu");
        assert_eq!(language_name("kn"), "Kannada");
        assert_eq!(language_name("hi"), "Hindi");
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("fr"), "English");
    }

    #[test]
    fn history_keeps_last_ten_with_roles() {
        assert_eq!(format_history(&[]), EMPTY_HISTORY);

        let history: Vec<_> = (0..12)
            .map(|i| msg(if i % 2 == 0 { "user" } else { "bot" }, &format!("m{i}")))
            .collect();
        let text = format_history(&history);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "Patient: m2");
        assert_eq!(lines[9], "Assistant: m11");
    }

    #[test]
    fn prompt_includes_profile_for_signed_in_female_user() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            username: "asha".into(),
            email: "asha@gmail.com".into(),
            password_hash: "hash".into(),
            age: 29,
            blood_group: "A+".into(),
            gender: "female".into(),
            conditions: vec!["bp".into()],
            other_conditions: vec!["asthma".into()],
            height: 160.0,
            weight: 60.0,
            bmi: 23,
            bmi_category: "normal".into(),
            activity_level: "moderate".into(),
            recent_pregnancy: Some(false),
            pcod: Some(true),
            created_at: OffsetDateTime::now_utc(),
        };
        let prompt = build_prompt(&PromptParts {
            message: "I feel tired",
            language: "hi",
            history: &[],
            user: Some(&user),
            latest: None,
        });
        assert!(prompt.contains("- Health Conditions: bp, asthma"));
        assert!(prompt.contains("- PCOS: Yes"));
        assert!(!prompt.contains("Recent Pregnancy"));
        assert!(prompt.contains("reply in Hindi"));
        assert!(prompt.contains("User's current message: \"I feel tired\""));
        assert!(prompt.contains(EMPTY_HISTORY));
    }

    #[test]
    fn anonymous_prompt_has_no_profile() {
        let prompt = build_prompt(&PromptParts {
            message: "hi",
            language: "en",
            ..Default::default()
        });
        assert!(!prompt.contains("Patient Background"));
        assert!(!prompt.contains("Recent Health Recommendation"));
    }
}
