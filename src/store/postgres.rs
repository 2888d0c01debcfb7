use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{OtpPurpose, OtpRecord, RecommendationRecord, Store, StoreError, User};

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

const USER_COLUMNS: &str = "id, name, username, email, password_hash, age, blood_group, gender, \
     conditions, other_conditions, height, weight, bmi, bmi_category, activity_level, \
     recent_pregnancy, pcod, created_at";

const RECOMMENDATION_COLUMNS: &str = "id, user_id, email, condition, severity, age, gender, \
     user_conditions, yoga_pose, exercise, ayurveda_tip, time_available, regularity, warning, \
     ml_used, ml_confidence, yoga_category, exercise_category, ayurveda_category, pcod, \
     recent_pregnancy, created_at";

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn find_user_where(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

/// Raw `otps` row; `purpose` is stored as text.
#[derive(Debug, FromRow)]
struct OtpRow {
    email: String,
    code: String,
    purpose: String,
    verified: bool,
    created_at: OffsetDateTime,
}

impl TryFrom<OtpRow> for OtpRecord {
    type Error = anyhow::Error;

    fn try_from(r: OtpRow) -> anyhow::Result<Self> {
        let purpose = OtpPurpose::parse(&r.purpose)
            .with_context(|| format!("unknown otp purpose {:?}", r.purpose))?;
        Ok(Self {
            email: r.email,
            code: r.code,
            purpose,
            verified: r.verified,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn insert_user(&self, u: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, username, email, password_hash, age, blood_group,
                               gender, conditions, other_conditions, height, weight, bmi,
                               bmi_category, activity_level, recent_pregnancy, pcod, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(u.id)
        .bind(&u.name)
        .bind(&u.username)
        .bind(&u.email)
        .bind(&u.password_hash)
        .bind(u.age)
        .bind(&u.blood_group)
        .bind(&u.gender)
        .bind(&u.conditions)
        .bind(&u.other_conditions)
        .bind(u.height)
        .bind(u.weight)
        .bind(u.bmi)
        .bind(&u.bmi_category)
        .bind(&u.activity_level)
        .bind(u.recent_pregnancy)
        .bind(u.pcod)
        .bind(u.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::Error::new(StoreError::Conflict("username or email"))
            } else {
                anyhow::Error::new(e).context("insert user")
            }
        })?;
        Ok(())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update password")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(users)
    }

    async fn upsert_otp(&self, otp: &OtpRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otps (email, code, purpose, verified, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
               SET code = EXCLUDED.code,
                   purpose = EXCLUDED.purpose,
                   verified = EXCLUDED.verified,
                   created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&otp.email)
        .bind(&otp.code)
        .bind(otp.purpose.as_str())
        .bind(otp.verified)
        .bind(otp.created_at)
        .execute(&self.db)
        .await
        .context("upsert otp")?;
        Ok(())
    }

    async fn find_otp(&self, email: &str) -> anyhow::Result<Option<OtpRecord>> {
        let row = sqlx::query_as::<_, OtpRow>(
            "SELECT email, code, purpose, verified, created_at FROM otps WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find otp")?;
        row.map(OtpRecord::try_from).transpose()
    }

    async fn mark_otp_verified(&self, email: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE otps SET verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await
            .context("mark otp verified")?;
        Ok(())
    }

    async fn delete_otp(&self, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM otps WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await
            .context("delete otp")?;
        Ok(())
    }

    async fn insert_recommendation(&self, r: &RecommendationRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recommendations (id, user_id, email, condition, severity, age, gender,
                                         user_conditions, yoga_pose, exercise, ayurveda_tip,
                                         time_available, regularity, warning, ml_used,
                                         ml_confidence, yoga_category, exercise_category,
                                         ayurveda_category, pcod, recent_pregnancy, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22)
            "#,
        )
        .bind(r.id)
        .bind(r.user_id)
        .bind(&r.email)
        .bind(&r.condition)
        .bind(&r.severity)
        .bind(r.age)
        .bind(&r.gender)
        .bind(&r.user_conditions)
        .bind(&r.yoga_pose)
        .bind(&r.exercise)
        .bind(&r.ayurveda_tip)
        .bind(r.time_available)
        .bind(&r.regularity)
        .bind(&r.warning)
        .bind(r.ml_used)
        .bind(r.ml_confidence)
        .bind(&r.yoga_category)
        .bind(&r.exercise_category)
        .bind(&r.ayurveda_category)
        .bind(r.pcod)
        .bind(r.recent_pregnancy)
        .bind(r.created_at)
        .execute(&self.db)
        .await
        .context("insert recommendation")?;
        Ok(())
    }

    async fn list_recommendations(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<RecommendationRecord>> {
        let sql = format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, RecommendationRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("list recommendations")?;
        Ok(rows)
    }

    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RecommendationRecord>> {
        let sql = format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, RecommendationRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("latest recommendation")?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_can_be_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
