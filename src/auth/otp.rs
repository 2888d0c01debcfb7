//! One-time codes for email verification and password reset.

use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    email::{otp_message, Mailer},
    error::{ApiError, ApiResult},
    store::{OtpPurpose, OtpRecord, Store},
};

pub const OTP_TTL: Duration = Duration::seconds(600);

pub fn generate_code(rng: &mut impl Rng) -> String {
    (0..6).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

pub fn is_expired(record: &OtpRecord, now: OffsetDateTime) -> bool {
    now - record.created_at > OTP_TTL
}

/// Replaces any live code for `email` and mails the new one.
pub async fn issue(
    store: &dyn Store,
    mailer: &dyn Mailer,
    email: &str,
    purpose: OtpPurpose,
) -> ApiResult<()> {
    let code = generate_code(&mut rand::thread_rng());
    store
        .upsert_otp(&OtpRecord {
            email: email.to_string(),
            code: code.clone(),
            purpose,
            verified: false,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    let (subject, body) = otp_message(&code, purpose);
    if let Err(e) = mailer.send(email, subject, &body).await {
        warn!(error = %format!("{e:#}"), %email, "otp delivery failed");
        return Err(anyhow::anyhow!("Failed to send OTP").into());
    }
    info!(%email, purpose = purpose.as_str(), "otp issued");
    Ok(())
}

/// Loads the live record for `email`, deleting it when expired.
async fn live_record(
    store: &dyn Store,
    email: &str,
    now: OffsetDateTime,
    missing: &str,
) -> ApiResult<OtpRecord> {
    let record = store
        .find_otp(email)
        .await?
        .ok_or_else(|| ApiError::bad_request(missing))?;
    if is_expired(&record, now) {
        store.delete_otp(email).await?;
        warn!(%email, "otp expired");
        return Err(ApiError::bad_request("OTP expired. Please request a new one."));
    }
    Ok(record)
}

/// Marks a registration code verified. A code verifies at most once.
pub async fn verify_registration(
    store: &dyn Store,
    email: &str,
    code: &str,
    now: OffsetDateTime,
) -> ApiResult<()> {
    let record = live_record(store, email, now, "No OTP found for this email").await?;
    if record.purpose != OtpPurpose::Registration {
        return Err(ApiError::bad_request("No OTP found for this email"));
    }
    if record.verified {
        return Err(ApiError::bad_request("OTP already used. Please request a new one."));
    }
    if record.code != code {
        warn!(%email, "otp mismatch");
        return Err(ApiError::bad_request("Invalid OTP"));
    }
    store.mark_otp_verified(email).await?;
    Ok(())
}

/// Registration may proceed only after the email's code was verified.
pub async fn require_verified_email(store: &dyn Store, email: &str) -> ApiResult<()> {
    match store.find_otp(email).await? {
        Some(r) if r.purpose == OtpPurpose::Registration && r.verified => Ok(()),
        _ => Err(ApiError::bad_request(
            "Email not verified. Please verify your email first.",
        )),
    }
}

/// Checks a password-reset code. The caller deletes the record once the
/// password is updated.
pub async fn check_reset(
    store: &dyn Store,
    email: &str,
    code: &str,
    now: OffsetDateTime,
) -> ApiResult<()> {
    let record = live_record(store, email, now, "No OTP request found").await?;
    if record.purpose != OtpPurpose::PasswordReset {
        return Err(ApiError::bad_request("No OTP request found"));
    }
    if record.code != code {
        warn!(%email, "reset otp mismatch");
        return Err(ApiError::bad_request("Invalid OTP"));
    }
    Ok(())
}
