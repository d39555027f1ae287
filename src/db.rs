//! # Database Access
//!
//! SQLite via sqlx. One canonical schema, snake_case columns, every query
//! parameterized. Schema creation happens at startup; a handful of default
//! rewards are seeded when the catalog is empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConsumptionLog {
    pub id: String,
    pub user_id: String,
    pub product: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub spend: Option<f64>,
    pub companions: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub capture_method: String,
    /// JSON blob returned by the external analysis service, stored verbatim
    pub ai_analysis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_required: i64,
    pub category: String,
    pub is_active: bool,
}

/// Fields a handler supplies when inserting a new consumption log.
#[derive(Debug, Clone)]
pub struct NewLog {
    pub user_id: String,
    pub product: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub spend: Option<f64>,
    pub companions: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub capture_method: String,
    pub ai_analysis: Option<String>,
    pub points: i64,
}

/// Open a pool against the given sqlx URL, creating the file if missing.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    // An in-memory database exists per connection; cap the pool at one so
    // the schema and the queries see the same database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone TEXT,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            points INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consumption_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            product TEXT NOT NULL,
            brand TEXT,
            category TEXT,
            spend REAL,
            companions TEXT,
            location TEXT,
            notes TEXT,
            media_url TEXT,
            media_type TEXT,
            capture_method TEXT NOT NULL DEFAULT 'manual',
            ai_analysis TEXT,
            created_at TEXT NOT NULL,
            points INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rewards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            points_required INTEGER NOT NULL,
            category TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the reward catalog when it is empty.
pub async fn seed_rewards(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rewards")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let defaults = [
        ("Free Snack Voucher", "Redeem for one snack up to $5", 100, "voucher"),
        ("Movie Ticket", "One standard cinema ticket", 500, "entertainment"),
        ("Grocery Gift Card", "$25 grocery gift card", 1000, "gift_card"),
    ];

    for (name, description, points_required, category) in defaults {
        sqlx::query(
            "INSERT INTO rewards (id, name, description, points_required, category, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(points_required)
        .bind(category)
        .execute(pool)
        .await?;
    }

    Ok(())
}

// ---- users ----

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, email, first_name, last_name, phone, password_hash, created_at, points)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .bind(password_hash)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(User {
        id,
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone: phone.map(str::to_string),
        password_hash: password_hash.to_string(),
        created_at,
        points: 0,
    })
}

pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn add_user_points(
    pool: &SqlitePool,
    user_id: &str,
    delta: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
        .bind(delta)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Deduct `amount` only if the balance covers it. Returns whether the
/// deduction happened (a single conditional UPDATE, so concurrent
/// redemptions cannot overdraw).
pub async fn try_deduct_points(
    pool: &SqlitePool,
    user_id: &str,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET points = points - ? WHERE id = ? AND points >= ?")
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

// ---- sessions ----

pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_user_by_session(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u
         JOIN sessions s ON s.user_id = u.id
         WHERE s.token = ? AND s.expires_at > ?",
    )
    .bind(token)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- consumption logs ----

pub async fn insert_log(pool: &SqlitePool, new: &NewLog) -> Result<ConsumptionLog, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();
    sqlx::query(
        "INSERT INTO consumption_logs
         (id, user_id, product, brand, category, spend, companions, location, notes,
          media_url, media_type, capture_method, ai_analysis, created_at, points)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new.user_id)
    .bind(&new.product)
    .bind(&new.brand)
    .bind(&new.category)
    .bind(new.spend)
    .bind(&new.companions)
    .bind(&new.location)
    .bind(&new.notes)
    .bind(&new.media_url)
    .bind(&new.media_type)
    .bind(&new.capture_method)
    .bind(&new.ai_analysis)
    .bind(created_at)
    .bind(new.points)
    .execute(pool)
    .await?;

    Ok(ConsumptionLog {
        id,
        user_id: new.user_id.clone(),
        product: new.product.clone(),
        brand: new.brand.clone(),
        category: new.category.clone(),
        spend: new.spend,
        companions: new.companions.clone(),
        location: new.location.clone(),
        notes: new.notes.clone(),
        media_url: new.media_url.clone(),
        media_type: new.media_type.clone(),
        capture_method: new.capture_method.clone(),
        ai_analysis: new.ai_analysis.clone(),
        created_at,
        points: new.points,
    })
}

pub async fn list_logs(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ConsumptionLog>, sqlx::Error> {
    sqlx::query_as::<_, ConsumptionLog>(
        "SELECT * FROM consumption_logs WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_log(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<ConsumptionLog>, sqlx::Error> {
    sqlx::query_as::<_, ConsumptionLog>(
        "SELECT * FROM consumption_logs WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_log(pool: &SqlitePool, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM consumption_logs WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

// ---- rewards ----

pub async fn list_active_rewards(pool: &SqlitePool) -> Result<Vec<Reward>, sqlx::Error> {
    sqlx::query_as::<_, Reward>(
        "SELECT * FROM rewards WHERE is_active = 1 ORDER BY points_required ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_reward(pool: &SqlitePool, id: &str) -> Result<Option<Reward>, sqlx::Error> {
    sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_crud_and_points() {
        let pool = test_pool().await;
        let user = create_user(&pool, "a@b.com", "Ada", "Byron", None, "hash")
            .await
            .unwrap();
        assert_eq!(user.points, 0);

        let found = find_user_by_email(&pool, "a@b.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        add_user_points(&pool, &user.id, 15).await.unwrap();
        let found = find_user_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(found.points, 15);

        // Deduction only succeeds when the balance covers it
        assert!(try_deduct_points(&pool, &user.id, 10).await.unwrap());
        assert!(!try_deduct_points(&pool, &user.id, 10).await.unwrap());
        let found = find_user_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(found.points, 5);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = test_pool().await;
        create_user(&pool, "a@b.com", "Ada", "Byron", None, "h")
            .await
            .unwrap();
        let dup = create_user(&pool, "a@b.com", "Other", "User", None, "h").await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let pool = test_pool().await;
        let user = create_user(&pool, "a@b.com", "Ada", "Byron", None, "h")
            .await
            .unwrap();

        create_session(&pool, "live", &user.id, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        create_session(&pool, "stale", &user.id, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();

        assert!(find_user_by_session(&pool, "live").await.unwrap().is_some());
        assert!(find_user_by_session(&pool, "stale").await.unwrap().is_none());
        assert!(find_user_by_session(&pool, "missing").await.unwrap().is_none());

        delete_session(&pool, "live").await.unwrap();
        assert!(find_user_by_session(&pool, "live").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_crud_scoped_to_owner() {
        let pool = test_pool().await;
        let owner = create_user(&pool, "a@b.com", "Ada", "Byron", None, "h")
            .await
            .unwrap();
        let other = create_user(&pool, "c@d.com", "Grace", "Hopper", None, "h")
            .await
            .unwrap();

        let new = NewLog {
            user_id: owner.id.clone(),
            product: "Chips".to_string(),
            brand: Some("Crunchy Co".to_string()),
            category: Some("snack".to_string()),
            spend: Some(2.5),
            companions: None,
            location: Some("home".to_string()),
            notes: None,
            media_url: None,
            media_type: None,
            capture_method: "manual".to_string(),
            ai_analysis: None,
            points: 10,
        };
        let log = insert_log(&pool, &new).await.unwrap();

        assert_eq!(list_logs(&pool, &owner.id).await.unwrap().len(), 1);
        assert!(list_logs(&pool, &other.id).await.unwrap().is_empty());
        assert!(get_log(&pool, &log.id, &owner.id).await.unwrap().is_some());
        assert!(get_log(&pool, &log.id, &other.id).await.unwrap().is_none());

        // Non-owner cannot delete
        assert!(!delete_log(&pool, &log.id, &other.id).await.unwrap());
        assert!(delete_log(&pool, &log.id, &owner.id).await.unwrap());
        assert!(list_logs(&pool, &owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reward_seeding_is_idempotent() {
        let pool = test_pool().await;
        seed_rewards(&pool).await.unwrap();
        let first = list_active_rewards(&pool).await.unwrap();
        assert!(!first.is_empty());

        seed_rewards(&pool).await.unwrap();
        let second = list_active_rewards(&pool).await.unwrap();
        assert_eq!(first.len(), second.len());
        // Sorted by cost ascending
        assert!(first.windows(2).all(|w| w[0].points_required <= w[1].points_required));
    }
}
