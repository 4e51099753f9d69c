//! User accounts: credentials, roles, gamification counters and profile.
//!
//! Emails are stored lowercased and are unique; so are student access tokens
//! (the code a parent enters to link to a child's account). Both are checked
//! before insert. Password hashing runs on the blocking pool.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AdminSeed;
use crate::error::AppError;

use super::query::{FieldCount, ListQuery, Page};
use super::records::{Record, Records};

pub const DEFAULT_HASH_COST: u32 = 12;
pub const MIN_PASSWORD_LEN: usize = 8;
const ACCESS_TOKEN_BYTES: usize = 8;
const ACCESS_TOKEN_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
    Parent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub year_group: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_level() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub experience_points: i64,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub study_streak: i32,
    #[serde(default)]
    pub predicted_grade: Option<String>,
    #[serde(default)]
    pub current_working_average: Option<f64>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email"];
    const FILTER_FIELDS: &'static [&'static str] = &["role"];

    fn id(&self) -> &str {
        &self.id
    }
}

/// A user as returned over HTTP: everything except the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub experience_points: i64,
    pub level: i32,
    pub study_streak: i32,
    pub predicted_grade: Option<String>,
    pub current_working_average: Option<f64>,
    pub profile: UserProfile,
    pub access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            experience_points: u.experience_points,
            level: u.level,
            study_streak: u.study_streak,
            predicted_grade: u.predicted_grade,
            current_working_average: u.current_working_average,
            profile: u.profile,
            access_token: u.access_token,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub experience_points: Option<i64>,
    pub level: Option<i32>,
    pub study_streak: Option<i32>,
    pub predicted_grade: Option<String>,
    pub current_working_average: Option<f64>,
    pub profile: Option<UserProfile>,
}

#[derive(Clone)]
pub struct UserService {
    records: Records<User>,
    hash_cost: u32,
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(AppError::validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    Ok(name.to_string())
}

impl UserService {
    pub fn new(records: Records<User>) -> Self {
        Self { records, hash_cost: DEFAULT_HASH_COST }
    }

    /// Override the bcrypt cost. Low costs are for tests only.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Server(format!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Server(format!("password hashing failed: {e}")))
    }

    async fn new_access_token(&self) -> Result<String, AppError> {
        for _ in 0..ACCESS_TOKEN_ATTEMPTS {
            let token = {
                let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
                rand::rng().fill_bytes(&mut bytes);
                hex::encode(bytes)
            };
            if self.records.count_where("accessToken", &token).await? == 0 {
                return Ok(token);
            }
            warn!("access token collision, regenerating");
        }
        Err(AppError::Conflict("could not allocate a unique access token".into()))
    }

    pub async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let email = normalize_email(&new.email)?;
        let name = check_name(&new.name)?;
        check_password(&new.password)?;

        if self.count_by_email(&email).await? > 0 {
            return Err(AppError::Conflict(format!("a user with email {email} already exists")));
        }

        let role = new.role.unwrap_or(Role::Student);
        let access_token = match role {
            Role::Student => Some(self.new_access_token().await?),
            _ => None,
        };

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash: self.hash(new.password).await?,
            name,
            role,
            experience_points: 0,
            level: default_level(),
            study_streak: 0,
            predicted_grade: None,
            current_working_average: None,
            profile: new.profile.unwrap_or_default(),
            access_token,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(&user).await?;
        info!(user_id = %user.id, role = ?user.role, "user created");
        Ok(user)
    }

    pub async fn get(&self, id: &str) -> Result<User, AppError> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.records.find_one_by("email", &email.trim().to_lowercase()).await
    }

    pub async fn count_by_email(&self, email: &str) -> Result<u64, AppError> {
        self.records.count_where("email", &email.trim().to_lowercase()).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<User>, AppError> {
        self.records.list(query).await
    }

    pub async fn update(&self, id: &str, update: UserUpdate) -> Result<User, AppError> {
        let mut user = self.get(id).await?;

        if let Some(email) = update.email {
            let email = normalize_email(&email)?;
            if email != user.email {
                if self.count_by_email(&email).await? > 0 {
                    return Err(AppError::Conflict(format!("a user with email {email} already exists")));
                }
                user.email = email;
            }
        }
        if let Some(password) = update.password {
            check_password(&password)?;
            user.password_hash = self.hash(password).await?;
        }
        if let Some(name) = update.name {
            user.name = check_name(&name)?;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(xp) = update.experience_points {
            user.experience_points = xp;
        }
        if let Some(level) = update.level {
            user.level = level;
        }
        if let Some(streak) = update.study_streak {
            user.study_streak = streak;
        }
        if update.predicted_grade.is_some() {
            user.predicted_grade = update.predicted_grade;
        }
        if update.current_working_average.is_some() {
            user.current_working_average = update.current_working_average;
        }
        if let Some(profile) = update.profile {
            user.profile = profile;
        }
        user.updated_at = Utc::now();

        if !self.records.replace(&user).await? {
            return Err(AppError::not_found(format!("user {id}")));
        }
        debug!(user_id = %id, "user updated");
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.records.delete(id).await? {
            return Err(AppError::not_found(format!("user {id}")));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Add `xp` to the user's running total.
    pub async fn add_experience(&self, id: &str, xp: i64) -> Result<User, AppError> {
        let mut user = self.get(id).await?;
        user.experience_points = user.experience_points.saturating_add(xp);
        user.updated_at = Utc::now();
        if !self.records.replace(&user).await? {
            return Err(AppError::not_found(format!("user {id}")));
        }
        Ok(user)
    }

    pub async fn count_by_role(&self) -> Result<Vec<FieldCount>, AppError> {
        self.records.count_by("role").await
    }

    pub async fn count_all(&self) -> Result<u64, AppError> {
        self.records.count_all().await
    }

    /// Create the seed admin unless an account with that email exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<bool, AppError> {
        if self.find_by_email(&seed.email).await?.is_some() {
            debug!(email = %seed.email, "admin account already present");
            return Ok(false);
        }
        self.create(NewUser {
            email: seed.email.clone(),
            password: seed.password.clone(),
            name: seed.name.clone(),
            role: Some(Role::Admin),
            profile: None,
        })
        .await?;
        info!(email = %seed.email, "admin account seeded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> UserService {
        UserService::new(Records::memory()).with_hash_cost(4)
    }

    fn student(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: "correct horse".into(),
            name: "Ada Student".into(),
            role: None,
            profile: None,
        }
    }

    #[tokio::test]
    async fn create_normalises_and_hashes() {
        let svc = service();
        let user = svc.create(student("  Ada@Example.COM ")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.level, 1);
        assert_ne!(user.password_hash, "correct horse");
        assert!(user.password_hash.starts_with("$2"));
        let token = user.access_token.unwrap();
        assert_eq!(token.len(), ACCESS_TOKEN_BYTES * 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_a_second_write() {
        let svc = service();
        svc.create(student("ada@example.com")).await.unwrap();
        let err = svc.create(student("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(svc.count_by_email("ada@example.com").await.unwrap(), 1);
        assert_eq!(svc.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let svc = service();
        let mut bad = student("not-an-email");
        assert!(matches!(svc.create(bad.clone()).await.unwrap_err(), AppError::Validation(_)));
        bad.email = "ok@example.com".into();
        bad.password = "short".into();
        assert!(matches!(svc.create(bad.clone()).await.unwrap_err(), AppError::Validation(_)));
        bad.password = "long enough".into();
        bad.name = "   ".into();
        assert_eq!(svc.create(bad).await.unwrap_err().to_string(), "name is required");
    }

    #[tokio::test]
    async fn non_students_get_no_access_token() {
        let svc = service();
        let mut teacher = student("t@example.com");
        teacher.role = Some(Role::Teacher);
        assert!(svc.create(teacher).await.unwrap().access_token.is_none());
    }

    #[tokio::test]
    async fn update_rehashes_and_guards_email() {
        let svc = service();
        let a = svc.create(student("a@example.com")).await.unwrap();
        svc.create(student("b@example.com")).await.unwrap();

        let err = svc
            .update(&a.id, UserUpdate { email: Some("B@example.com".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let updated = svc
            .update(
                &a.id,
                UserUpdate {
                    password: Some("a brand new secret".into()),
                    predicted_grade: Some("7".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(updated.password_hash, a.password_hash);
        assert_eq!(updated.predicted_grade.as_deref(), Some("7"));
        assert!(bcrypt::verify("a brand new secret", &updated.password_hash).unwrap());
        assert!(!bcrypt::verify("correct horse", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn experience_accumulates() {
        let svc = service();
        let u = svc.create(student("xp@example.com")).await.unwrap();
        svc.add_experience(&u.id, 20).await.unwrap();
        let u = svc.add_experience(&u.id, 30).await.unwrap();
        assert_eq!(u.experience_points, 50);
        assert!(matches!(svc.add_experience("missing", 10).await.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let svc = service();
        let seed = AdminSeed {
            email: "admin@proacademics.test".into(),
            password: "admin-password".into(),
            name: "Administrator".into(),
        };
        assert!(svc.ensure_admin(&seed).await.unwrap());
        assert!(!svc.ensure_admin(&seed).await.unwrap());

        let roles = svc.count_by_role().await.unwrap();
        assert_eq!(roles, vec![FieldCount { value: "admin".into(), count: 1 }]);
    }

    #[tokio::test]
    async fn list_filters_by_role_and_searches_names() {
        let svc = service();
        svc.create(student("ada@example.com")).await.unwrap();
        let mut parent = student("grace@example.com");
        parent.name = "Grace Parent".into();
        parent.role = Some(Role::Parent);
        svc.create(parent).await.unwrap();

        let page = svc.list(&ListQuery::default().with_filter("role", "parent")).await.unwrap();
        assert_eq!(page.total, 1);
        let page = svc.list(&ListQuery::default().with_search("ada")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].email, "ada@example.com");
    }
}
