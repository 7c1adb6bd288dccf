use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::core::ports::{ExclusionStore, ImageStore, ProfileStore, StoreError};
use crate::models::{
    ordered_pair, CandidatePage, Decision, IncomingRequest, MatchPreferences, MatchSummary, Profile,
    RequestStatus, TraitScores, UserId,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<PostgresError> for StoreError {
    fn from(value: PostgresError) -> Self {
        match value {
            PostgresError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

const PROFILE_COLUMNS: &str = r#"
    SELECT
        u.user_id AS id,
        u.name,
        u.gender,
        u.age,
        u.city,
        u.lat,
        u.lon,
        COALESCE(s.total_score, 0) AS total_score,
        COALESCE(s.personality, 0) AS personality,
        COALESCE(s.communication, 0) AS communication,
        COALESCE(s.emotional, 0) AS emotional,
        COALESCE(s.confidence, 0) AS confidence
    FROM users u
    LEFT JOIN scores s ON u.user_id = s.user_id
"#;

const UPSERT_EXCLUSION: &str = r#"
    INSERT INTO user_exclusions (user_id, target_id, reason)
    VALUES ($1, $2, $3)
    ON CONFLICT (user_id, target_id)
    DO UPDATE SET
        reason = EXCLUDED.reason,
        created_at = NOW()
"#;

/// Primary image of `u`, falling back to its latest upload
const PRIMARY_IMAGE: &str = r#"(
    SELECT i.public_url
    FROM user_images i
    WHERE i.user_id = u.user_id AND i.public_url IS NOT NULL
    ORDER BY i.is_primary DESC, i.uploaded_at DESC
    LIMIT 1
)"#;

/// Cap on request and match listings
const LIST_LIMIT: i64 = 100;

/// PostgreSQL-backed profile, exclusion and image store
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Create a client whose pool connects on first use
    ///
    /// Migrations are not run.
    pub fn connect_lazy(database_url: &str, acquire_timeout: Duration) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Hide `target_user_id` from `user_id`'s future recommendations
    ///
    /// Uses INSERT ... ON CONFLICT so repeated decisions overwrite the reason.
    pub async fn record_decision(
        &self,
        user_id: UserId,
        target_user_id: UserId,
        decision: Decision,
    ) -> Result<(), PostgresError> {
        sqlx::query(UPSERT_EXCLUSION)
            .bind(user_id)
            .bind(target_user_id)
            .bind(decision.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| classify_write_error(e, target_user_id))?;

        tracing::debug!(
            "Recorded decision: {} -> {} ({})",
            user_id,
            target_user_id,
            decision.as_str()
        );

        Ok(())
    }

    /// Send a match request and hide the receiver from the sender's recommendations
    ///
    /// Re-sending a rejected request reopens it; an accepted one is left alone.
    pub async fn send_match_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<RequestStatus, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let reopened: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO match_requests (sender_id, receiver_id, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT (sender_id, receiver_id)
            DO UPDATE SET
                status = 'pending',
                created_at = NOW(),
                responded_at = NULL
            WHERE match_requests.status = 'rejected'
            RETURNING status
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify_write_error(e, receiver_id))?;

        // No row back means the existing request is still pending or accepted
        let status = match reopened {
            Some(status) => parse_status(&status)?,
            None => {
                let current: String = sqlx::query_scalar(
                    "SELECT status FROM match_requests WHERE sender_id = $1 AND receiver_id = $2",
                )
                .bind(sender_id)
                .bind(receiver_id)
                .fetch_one(&mut *tx)
                .await?;
                parse_status(&current)?
            }
        };

        sqlx::query(UPSERT_EXCLUSION)
            .bind(sender_id)
            .bind(receiver_id)
            .bind(Decision::Liked.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| classify_write_error(e, receiver_id))?;

        tx.commit().await?;

        tracing::debug!(
            "Match request {} -> {} is {}",
            sender_id,
            receiver_id,
            status.as_str()
        );

        Ok(status)
    }

    /// Answer a pending request; accepting it creates the match
    ///
    /// Returns the match id when accepted. Either both users end up excluded
    /// from each other's recommendations and the request is closed, or
    /// nothing changes.
    pub async fn respond_to_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        accept: bool,
    ) -> Result<Option<i64>, PostgresError> {
        let status = RequestStatus::from_response(accept);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE match_requests
            SET status = $3, responded_at = NOW()
            WHERE sender_id = $1 AND receiver_id = $2 AND status = 'pending'
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(PostgresError::NotFound(format!(
                "pending request from user {}",
                sender_id
            )));
        }

        let decision = if accept { Decision::Liked } else { Decision::Rejected };
        sqlx::query(UPSERT_EXCLUSION)
            .bind(receiver_id)
            .bind(sender_id)
            .bind(decision.as_str())
            .execute(&mut *tx)
            .await?;

        let match_id = if accept {
            let (user1, user2) = ordered_pair(sender_id, receiver_id);
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO matches (user1_id, user2_id)
                VALUES ($1, $2)
                ON CONFLICT (user1_id, user2_id)
                DO UPDATE SET user1_id = EXCLUDED.user1_id
                RETURNING id
                "#,
            )
            .bind(user1)
            .bind(user2)
            .fetch_one(&mut *tx)
            .await?;
            Some(id)
        } else {
            None
        };

        tx.commit().await?;

        tracing::info!(
            "User {} {} match request from {}",
            receiver_id,
            status.as_str(),
            sender_id
        );

        Ok(match_id)
    }

    /// Pending requests addressed to `receiver_id`, newest first
    pub async fn incoming_requests(
        &self,
        receiver_id: UserId,
    ) -> Result<Vec<IncomingRequest>, PostgresError> {
        let query = format!(
            r#"
            SELECT
                mr.id,
                mr.sender_id,
                u.name,
                u.age,
                u.city,
                {PRIMARY_IMAGE} AS image,
                COALESCE(s.total_score, 0) AS total_score,
                mr.created_at
            FROM match_requests mr
            INNER JOIN users u ON mr.sender_id = u.user_id
            LEFT JOIN scores s ON u.user_id = s.user_id
            WHERE mr.receiver_id = $1 AND mr.status = 'pending'
            ORDER BY mr.created_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query(&query)
            .bind(receiver_id)
            .bind(LIST_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<IncomingRequest, PostgresError> {
                let sender_id: i64 = row.try_get("sender_id")?;
                Ok(IncomingRequest {
                    id: row.try_get("id")?,
                    sender_id,
                    name: row.try_get("name")?,
                    age: bounded(sender_id, "age", row.try_get("age")?, u8::MAX)?,
                    city: row.try_get("city")?,
                    image: row.try_get("image")?,
                    total_score: bounded(sender_id, "total_score", row.try_get("total_score")?, 100)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Matches `user_id` is part of, newest first
    pub async fn recent_matches(&self, user_id: UserId) -> Result<Vec<MatchSummary>, PostgresError> {
        let query = format!(
            r#"
            SELECT
                m.id AS match_id,
                u.user_id,
                u.name,
                u.age,
                u.city,
                {PRIMARY_IMAGE} AS image,
                COALESCE(s.total_score, 0) AS total_score,
                m.matched_at
            FROM matches m
            INNER JOIN users u ON u.user_id =
                CASE WHEN m.user1_id = $1 THEN m.user2_id ELSE m.user1_id END
            LEFT JOIN scores s ON u.user_id = s.user_id
            WHERE m.user1_id = $1 OR m.user2_id = $1
            ORDER BY m.matched_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(LIST_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<MatchSummary, PostgresError> {
                let other: i64 = row.try_get("user_id")?;
                Ok(MatchSummary {
                    match_id: row.try_get("match_id")?,
                    user_id: other,
                    name: row.try_get("name")?,
                    age: bounded(other, "age", row.try_get("age")?, u8::MAX)?,
                    city: row.try_get("city")?,
                    image: row.try_get("image")?,
                    total_score: bounded(other, "total_score", row.try_get("total_score")?, 100)?,
                    matched_at: row.try_get("matched_at")?,
                })
            })
            .collect()
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    async fn load_profile(&self, id: UserId) -> Result<Profile, PostgresError> {
        let mut query = QueryBuilder::<Postgres>::new(PROFILE_COLUMNS);
        query.push(" WHERE u.user_id = ").push_bind(id);

        let row = query
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("user {}", id)))?;

        profile_from_row(&row)
    }

    async fn load_candidate_page(
        &self,
        prefs: &MatchPreferences,
    ) -> Result<CandidatePage, PostgresError> {
        let mut query = build_candidate_query(prefs);

        let rows = query.build().fetch_all(&self.pool).await?;
        let profiles = rows
            .iter()
            .map(profile_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Fetched {} candidate rows after cursor {}",
            profiles.len(),
            prefs.cursor
        );

        Ok(CandidatePage::from_rows(profiles, prefs.limit))
    }

    async fn load_exclusions(&self, viewer: UserId) -> Result<HashSet<UserId>, PostgresError> {
        let query = r#"
            SELECT target_id
            FROM user_exclusions
            WHERE user_id = $1
        "#;

        let rows = sqlx::query(query).bind(viewer).fetch_all(&self.pool).await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("target_id"))
            .collect::<Result<HashSet<_>, _>>()?;

        tracing::debug!("User {} has {} exclusions", viewer, ids.len());

        Ok(ids)
    }

    async fn load_image_urls(&self, id: UserId) -> Result<Vec<String>, PostgresError> {
        let query = r#"
            SELECT public_url
            FROM user_images
            WHERE user_id = $1 AND public_url IS NOT NULL
            ORDER BY is_primary DESC, uploaded_at DESC
        "#;

        let rows = sqlx::query(query).bind(id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("public_url").map_err(Into::into))
            .collect()
    }
}

/// Candidate page query: preference filters, keyset pagination on user_id
/// and one extra row to detect whether another page exists.
fn build_candidate_query(prefs: &MatchPreferences) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(PROFILE_COLUMNS);
    query.push(" WHERE 1=1");

    if let Some(gender) = prefs.target_gender {
        query.push(" AND u.gender = ").push_bind(gender.to_string());
    }
    if let Some(age_min) = prefs.age_min {
        query.push(" AND u.age >= ").push_bind(age_min as i32);
    }
    if let Some(age_max) = prefs.age_max {
        query.push(" AND u.age <= ").push_bind(age_max as i32);
    }
    if prefs.min_score > 0 {
        query
            .push(" AND COALESCE(s.total_score, 0) >= ")
            .push_bind(prefs.min_score as i32);
    }
    if prefs.cursor > 0 {
        query.push(" AND u.user_id > ").push_bind(prefs.cursor);
    }

    query
        .push(" ORDER BY u.user_id LIMIT ")
        .push_bind((prefs.limit + 1) as i64);

    query
}

fn profile_from_row(row: &PgRow) -> Result<Profile, PostgresError> {
    let id: i64 = row.try_get("id")?;

    Ok(Profile {
        id,
        name: row.try_get("name")?,
        gender: row.try_get("gender")?,
        age: bounded(id, "age", row.try_get("age")?, u8::MAX)?,
        city: row.try_get("city")?,
        latitude: row.try_get("lat")?,
        longitude: row.try_get("lon")?,
        total_score: bounded(id, "total_score", row.try_get("total_score")?, 100)?,
        traits: TraitScores {
            personality: bounded(id, "personality", row.try_get("personality")?, 100)?,
            communication: bounded(id, "communication", row.try_get("communication")?, 100)?,
            emotional: bounded(id, "emotional", row.try_get("emotional")?, 100)?,
            confidence: bounded(id, "confidence", row.try_get("confidence")?, 100)?,
        },
    })
}

fn parse_status(value: &str) -> Result<RequestStatus, PostgresError> {
    match value {
        "pending" => Ok(RequestStatus::Pending),
        "accepted" => Ok(RequestStatus::Accepted),
        "rejected" => Ok(RequestStatus::Rejected),
        other => Err(PostgresError::InvalidData(format!("unknown request status {}", other))),
    }
}

/// A write that references a missing user is a lookup miss, not a backend fault
fn classify_write_error(err: sqlx::Error, target: UserId) -> PostgresError {
    let missing_user = matches!(
        &err,
        sqlx::Error::Database(db_err)
            if matches!(db_err.kind(), sqlx::error::ErrorKind::ForeignKeyViolation)
    );

    if missing_user {
        PostgresError::NotFound(format!("user {}", target))
    } else {
        PostgresError::SqlxError(err)
    }
}

/// Reject out-of-range columns instead of silently clamping them
fn bounded(id: UserId, column: &str, value: i32, max: u8) -> Result<u8, PostgresError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| {
            PostgresError::InvalidData(format!("user {} has {} = {}", id, column, value))
        })
}

#[async_trait]
impl ProfileStore for PostgresClient {
    async fn get_profile(&self, id: UserId) -> Result<Profile, StoreError> {
        Ok(self.load_profile(id).await?)
    }

    async fn fetch_candidate_page(
        &self,
        prefs: &MatchPreferences,
    ) -> Result<CandidatePage, StoreError> {
        Ok(self.load_candidate_page(prefs).await?)
    }
}

#[async_trait]
impl ExclusionStore for PostgresClient {
    async fn fetch_exclusions(&self, viewer: UserId) -> Result<HashSet<UserId>, StoreError> {
        Ok(self.load_exclusions(viewer).await?)
    }
}

#[async_trait]
impl ImageStore for PostgresClient {
    async fn fetch_image_urls(&self, id: UserId) -> Result<Vec<String>, StoreError> {
        Ok(self.load_image_urls(id).await?)
    }
}
