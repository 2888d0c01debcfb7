use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OtpRecord, RecommendationRecord, Store, StoreError, User};

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    otps: RwLock<HashMap<String, OtpRecord>>,
    recommendations: RwLock<Vec<RecommendationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Conflict("username or email").into());
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.email == email) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn upsert_otp(&self, otp: &OtpRecord) -> anyhow::Result<()> {
        self.otps
            .write()
            .await
            .insert(otp.email.clone(), otp.clone());
        Ok(())
    }

    async fn find_otp(&self, email: &str) -> anyhow::Result<Option<OtpRecord>> {
        Ok(self.otps.read().await.get(email).cloned())
    }

    async fn mark_otp_verified(&self, email: &str) -> anyhow::Result<()> {
        if let Some(rec) = self.otps.write().await.get_mut(email) {
            rec.verified = true;
        }
        Ok(())
    }

    async fn delete_otp(&self, email: &str) -> anyhow::Result<()> {
        self.otps.write().await.remove(email);
        Ok(())
    }

    async fn insert_recommendation(&self, rec: &RecommendationRecord) -> anyhow::Result<()> {
        self.recommendations.write().await.push(rec.clone());
        Ok(())
    }

    async fn list_recommendations(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<RecommendationRecord>> {
        let recs = self.recommendations.read().await;
        let mut out: Vec<_> = recs.iter().filter(|r| r.user_id == user_id).cloned().collect();
        // stable: equal timestamps keep newest-inserted first
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RecommendationRecord>> {
        Ok(self.list_recommendations(user_id).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OtpPurpose;
    use time::{Duration, OffsetDateTime};

    fn user(email: &str, username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            age: 30,
            blood_group: "O+".into(),
            gender: "male".into(),
            conditions: vec![],
            other_conditions: vec![],
            height: 175.0,
            weight: 70.0,
            bmi: 23,
            bmi_category: "normal".into(),
            activity_level: "moderate".into(),
            recent_pregnancy: None,
            pcod: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@gmail.com", "same")).await.unwrap();
        let err = store.insert_user(&user("b@gmail.com", "same")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn upsert_otp_replaces_previous_code() {
        let store = MemoryStore::new();
        let mut otp = OtpRecord {
            email: "a@gmail.com".into(),
            code: "111111".into(),
            purpose: OtpPurpose::Registration,
            verified: true,
            created_at: OffsetDateTime::now_utc(),
        };
        store.upsert_otp(&otp).await.unwrap();
        otp.code = "222222".into();
        otp.verified = false;
        store.upsert_otp(&otp).await.unwrap();

        let found = store.find_otp("a@gmail.com").await.unwrap().unwrap();
        assert_eq!(found.code, "222222");
        assert!(!found.verified);
    }

    #[tokio::test]
    async fn recommendations_are_listed_newest_first() {
        let store = MemoryStore::new();
        let u = user("a@gmail.com", "abc");
        let now = OffsetDateTime::now_utc();
        for (i, offset) in [3i64, 1, 2].into_iter().enumerate() {
            store
                .insert_recommendation(&RecommendationRecord {
                    id: Uuid::new_v4(),
                    user_id: u.id,
                    email: u.email.clone(),
                    condition: format!("c{i}"),
                    severity: "mild".into(),
                    age: 30,
                    gender: "male".into(),
                    user_conditions: vec![],
                    yoga_pose: "shavasana.jpg".into(),
                    exercise: "walking.jpg".into(),
                    ayurveda_tip: "green_tea.jpg".into(),
                    time_available: None,
                    regularity: None,
                    warning: None,
                    ml_used: false,
                    ml_confidence: 0.0,
                    yoga_category: None,
                    exercise_category: None,
                    ayurveda_category: None,
                    pcod: None,
                    recent_pregnancy: None,
                    created_at: now - Duration::days(offset),
                })
                .await
                .unwrap();
        }

        let listed = store.list_recommendations(u.id).await.unwrap();
        let conditions: Vec<_> = listed.iter().map(|r| r.condition.as_str()).collect();
        assert_eq!(conditions, vec!["c1", "c2", "c0"]);

        let latest = store.latest_recommendation(u.id).await.unwrap().unwrap();
        assert_eq!(latest.condition, "c1");
        assert!(store
            .list_recommendations(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }
}
