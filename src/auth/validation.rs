use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

pub const ACTIVITY_LEVELS: [&str; 3] = ["sedentary", "moderate", "active"];
pub const TRACKED_CONDITIONS: [&str; 2] = ["bp", "diabetes"];

pub fn is_gmail(email: &str) -> bool {
    email.ends_with("@gmail.com")
}

/// `Err` carries the user-facing reason.
pub fn check_username(username: &str) -> Result<(), &'static str> {
    lazy_static! {
        static ref USERNAME_CHARS: Regex = Regex::new(r"^[A-Za-z0-9_.]+$").unwrap();
    }
    if !USERNAME_CHARS.is_match(username) {
        return Err("Username can only contain letters, numbers, underscores, and dots.");
    }
    if !(3..=20).contains(&username.chars().count()) {
        return Err("Username must be between 3 and 20 characters.");
    }
    Ok(())
}

/// Length, mixed case, a digit and one of `!@#$%^&*(),.?":{}|<>`.
pub fn check_password(password: &str) -> Result<(), &'static str> {
    lazy_static! {
        static ref UPPER: Regex = Regex::new(r"[A-Z]").unwrap();
        static ref LOWER: Regex = Regex::new(r"[a-z]").unwrap();
        static ref DIGIT: Regex = Regex::new(r"[0-9]").unwrap();
        static ref SPECIAL: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
    }
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long.");
    }
    if !UPPER.is_match(password) {
        return Err("Password must contain at least one uppercase letter.");
    }
    if !LOWER.is_match(password) {
        return Err("Password must contain at least one lowercase letter.");
    }
    if !DIGIT.is_match(password) {
        return Err("Password must contain at least one number.");
    }
    if !SPECIAL.is_match(password) {
        return Err("Password must contain at least one special character.");
    }
    Ok(())
}

pub fn check_age(age: i32) -> Result<(), &'static str> {
    if age <= 5 || age >= 120 {
        return Err("Age must be between 6 and 119");
    }
    Ok(())
}

pub fn check_body(height_cm: f64, weight_kg: f64) -> Result<(), &'static str> {
    if !(50.0..=250.0).contains(&height_cm) {
        return Err("Height must be between 50 and 250 cm");
    }
    if !(20.0..=300.0).contains(&weight_kg) {
        return Err("Weight must be between 20 and 300 kg");
    }
    Ok(())
}

pub fn is_activity_level(level: &str) -> bool {
    ACTIVITY_LEVELS.contains(&level)
}

/// Rounded BMI and its category; the category is taken from the rounded
/// value. Halves round to even, so 24.5 is 24 and 18.5 is 18.
pub fn bmi(height_cm: f64, weight_kg: f64) -> (i32, &'static str) {
    let height_m = height_cm / 100.0;
    let bmi = (weight_kg / (height_m * height_m)).round_ties_even() as i32;
    let category = match bmi {
        i32::MIN..=18 => "underweight",
        19..=24 => "normal",
        25..=29 => "overweight",
        _ => "obese",
    };
    (bmi, category)
}

/// Splits reported conditions into tracked comorbidities and the rest,
/// keeping the reported order.
pub fn split_conditions(conditions: &[String]) -> (Vec<String>, Vec<String>) {
    conditions
        .iter()
        .filter(|c| !c.trim().is_empty())
        .cloned()
        .partition(|c| TRACKED_CONDITIONS.contains(&c.as_str()))
}

/// `<base><10..=999>` candidate for a taken username.
pub fn username_suggestion(base: &str, rng: &mut impl Rng) -> String {
    format!("{base}{}", rng.gen_range(10..=999))
}
