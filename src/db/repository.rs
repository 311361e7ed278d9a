//! Database repository for teams, users, pull requests and reviewer assignments.
//!
//! Every mutation runs in a write transaction opened with `BEGIN IMMEDIATE`, so
//! the database write lock is held from the first read. Concurrent mutations
//! therefore observe each other's committed state instead of racing on it.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::clock::{to_db_timestamp, Clock};
use crate::errors::AppError;
use crate::models::{
    PullRequest, PullRequestShort, PullRequestStatus, Team, TeamMember, User, UserReviews,
};
use crate::service::ReviewerPicker;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl Repository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Open a transaction that holds the write lock until commit or drop.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    // ==================== TEAM OPERATIONS ====================

    /// Create a team and upsert its members. Members listed under another team
    /// are moved to this one.
    pub async fn create_team(
        &self,
        team_name: &str,
        members: &[TeamMember],
    ) -> Result<Team, AppError> {
        let now = to_db_timestamp(self.clock.now());
        let mut tx = self.begin_write().await?;

        if team_exists(&mut tx, team_name).await? {
            return Err(AppError::TeamExists);
        }

        sqlx::query("INSERT INTO teams (team_name, created_at) VALUES (?, ?)")
            .bind(team_name)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|err| map_unique_violation(err, AppError::TeamExists))?;

        for member in members {
            sqlx::query(
                r#"INSERT INTO users (user_id, username, team_name, is_active, updated_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (user_id) DO UPDATE SET
                       username = excluded.username,
                       team_name = excluded.team_name,
                       is_active = excluded.is_active,
                       updated_at = excluded.updated_at"#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(team_name)
            .bind(member.is_active)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        let members = team_members(&mut tx, team_name).await?;
        tx.commit().await?;

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    /// Get a team with its current roster.
    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        let mut conn = self.pool.acquire().await?;

        if !team_exists(&mut conn, team_name).await? {
            return Err(AppError::not_found("team"));
        }

        let members = team_members(&mut conn, team_name).await?;
        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    /// Flip a user's active flag. Existing assignments are left untouched.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        let now = to_db_timestamp(self.clock.now());
        let row = sqlx::query(
            r#"UPDATE users SET is_active = ?, updated_at = ?
               WHERE user_id = ?
               RETURNING user_id, username, team_name, is_active"#,
        )
        .bind(is_active)
        .bind(&now)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

        Ok(User {
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            team_name: row.try_get("team_name")?,
            is_active: row.try_get("is_active")?,
        })
    }

    // ==================== PULL REQUEST OPERATIONS ====================

    /// Create a pull request and assign up to `limit` reviewers chosen by
    /// `picker` from the active members of the author's team.
    pub async fn create_pull_request(
        &self,
        pull_request_id: &str,
        pull_request_name: &str,
        author_id: &str,
        picker: &dyn ReviewerPicker,
        limit: usize,
    ) -> Result<PullRequest, AppError> {
        let now = to_db_timestamp(self.clock.now());
        let mut tx = self.begin_write().await?;

        let team_name = user_team(&mut tx, author_id)
            .await?
            .ok_or_else(|| AppError::not_found("author"))?;

        sqlx::query(
            r#"INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(pull_request_id)
        .bind(pull_request_name)
        .bind(author_id)
        .bind(PullRequestStatus::Open.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|err| map_unique_violation(err, AppError::PrExists))?;

        let candidates =
            active_members_excluding(&mut tx, &team_name, &[author_id.to_string()]).await?;
        let reviewers = picker.pick_many(&candidates, limit);

        for reviewer_id in &reviewers {
            insert_reviewer(&mut tx, pull_request_id, reviewer_id, &now).await?;
        }

        let pr = load_pull_request(&mut tx, pull_request_id).await?;
        tx.commit().await?;

        tracing::debug!(
            pull_request_id,
            candidates = candidates.len(),
            assigned = reviewers.len(),
            "Assigned reviewers"
        );
        Ok(pr)
    }

    /// Merge a pull request. Merging twice succeeds and keeps the first merge time.
    pub async fn merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let now = to_db_timestamp(self.clock.now());
        let mut tx = self.begin_write().await?;

        let result = sqlx::query(
            r#"UPDATE pull_requests
               SET status = ?, merged_at = COALESCE(merged_at, ?)
               WHERE pull_request_id = ?"#,
        )
        .bind(PullRequestStatus::Merged.as_str())
        .bind(&now)
        .bind(pull_request_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("pull request"));
        }

        let pr = load_pull_request(&mut tx, pull_request_id).await?;
        tx.commit().await?;
        Ok(pr)
    }

    /// Replace `old_reviewer_id` on an open pull request with an active member
    /// of the same team. Returns the refreshed pull request and the new reviewer.
    ///
    /// Nothing is written unless a replacement is found; a failed call leaves
    /// the reviewer set exactly as it was.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
        picker: &dyn ReviewerPicker,
    ) -> Result<(PullRequest, String), AppError> {
        let now = to_db_timestamp(self.clock.now());
        let mut tx = self.begin_write().await?;

        let row = sqlx::query("SELECT status, author_id FROM pull_requests WHERE pull_request_id = ?")
            .bind(pull_request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("pull request"))?;

        if parse_status(&row)? == PullRequestStatus::Merged {
            return Err(AppError::PrMerged);
        }
        let author_id: String = row.try_get("author_id")?;

        let reviewer_team = user_team(&mut tx, old_reviewer_id)
            .await?
            .ok_or_else(|| AppError::not_found("reviewer"))?;

        let mut excluded = assigned_reviewers(&mut tx, pull_request_id).await?;
        if !excluded.iter().any(|id| id == old_reviewer_id) {
            return Err(AppError::NotAssigned);
        }
        excluded.push(author_id);

        let candidates = active_members_excluding(&mut tx, &reviewer_team, &excluded).await?;
        let new_reviewer_id = picker.pick_one(&candidates).ok_or(AppError::NoCandidate)?;

        sqlx::query("DELETE FROM pull_request_reviewers WHERE pull_request_id = ? AND reviewer_id = ?")
            .bind(pull_request_id)
            .bind(old_reviewer_id)
            .execute(&mut *tx)
            .await?;
        insert_reviewer(&mut tx, pull_request_id, &new_reviewer_id, &now).await?;

        let pr = load_pull_request(&mut tx, pull_request_id).await?;
        tx.commit().await?;

        Ok((pr, new_reviewer_id))
    }

    /// Get a pull request with its reviewers.
    pub async fn get_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_pull_request(&mut conn, pull_request_id)
            .await?
            .ok_or_else(|| AppError::not_found("pull request"))
    }

    /// List the pull requests a user is assigned to review, newest first.
    pub async fn get_user_reviews(&self, user_id: &str) -> Result<UserReviews, AppError> {
        let rows = sqlx::query(
            r#"SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
               FROM pull_request_reviewers r
               JOIN pull_requests pr ON pr.pull_request_id = r.pull_request_id
               WHERE r.reviewer_id = ?
               ORDER BY pr.created_at DESC, pr.rowid DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let pull_requests = rows
            .iter()
            .map(|row| -> Result<PullRequestShort, AppError> {
                Ok(PullRequestShort {
                    pull_request_id: row.try_get("pull_request_id")?,
                    pull_request_name: row.try_get("pull_request_name")?,
                    author_id: row.try_get("author_id")?,
                    status: parse_status(row)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(UserReviews {
            user_id: user_id.to_string(),
            pull_requests,
        })
    }
}

// Helpers shared by pool reads and write transactions

async fn team_exists(conn: &mut SqliteConnection, team_name: &str) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT 1 FROM teams WHERE team_name = ?")
        .bind(team_name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn team_members(
    conn: &mut SqliteConnection,
    team_name: &str,
) -> Result<Vec<TeamMember>, AppError> {
    let rows = sqlx::query(
        "SELECT user_id, username, is_active FROM users WHERE team_name = ? ORDER BY username, user_id",
    )
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<TeamMember, AppError> {
            Ok(TeamMember {
                user_id: row.try_get("user_id")?,
                username: row.try_get("username")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .collect()
}

async fn user_team(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<String>, AppError> {
    let team: Option<String> = sqlx::query_scalar("SELECT team_name FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(team)
}

/// Ids of active members of `team_name` that are not in `exclude`.
async fn active_members_excluding(
    conn: &mut SqliteConnection,
    team_name: &str,
    exclude: &[String],
) -> Result<Vec<String>, AppError> {
    let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();

    let ids: Vec<String> =
        sqlx::query_scalar("SELECT user_id FROM users WHERE team_name = ? AND is_active = 1")
            .bind(team_name)
            .fetch_all(&mut *conn)
            .await?;

    Ok(ids
        .into_iter()
        .filter(|id| !excluded.contains(id.as_str()))
        .collect())
}

async fn assigned_reviewers(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
) -> Result<Vec<String>, AppError> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT reviewer_id FROM pull_request_reviewers WHERE pull_request_id = ? ORDER BY reviewer_id",
    )
    .bind(pull_request_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

async fn insert_reviewer(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
    reviewer_id: &str,
    assigned_at: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO pull_request_reviewers (pull_request_id, reviewer_id, assigned_at) VALUES (?, ?, ?)",
    )
    .bind(pull_request_id)
    .bind(reviewer_id)
    .bind(assigned_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_pull_request(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
) -> Result<Option<PullRequest>, AppError> {
    let row = sqlx::query(
        r#"SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
           FROM pull_requests WHERE pull_request_id = ?"#,
    )
    .bind(pull_request_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let reviewers = assigned_reviewers(conn, pull_request_id).await?;
    pull_request_from_row(&row, reviewers).map(Some)
}

/// Read back a pull request written earlier in the same transaction.
async fn load_pull_request(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
) -> Result<PullRequest, AppError> {
    fetch_pull_request(conn, pull_request_id)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!("pull request {} vanished mid-transaction", pull_request_id))
        })
}

// Helper functions for row conversion

fn pull_request_from_row(row: &SqliteRow, reviewers: Vec<String>) -> Result<PullRequest, AppError> {
    Ok(PullRequest {
        pull_request_id: row.try_get("pull_request_id")?,
        pull_request_name: row.try_get("pull_request_name")?,
        author_id: row.try_get("author_id")?,
        status: parse_status(row)?,
        assigned_reviewers: reviewers,
        created_at: row.try_get("created_at")?,
        merged_at: row.try_get("merged_at")?,
    })
}

fn parse_status(row: &SqliteRow) -> Result<PullRequestStatus, AppError> {
    let raw: String = row.try_get("status")?;
    PullRequestStatus::parse(&raw)
        .ok_or_else(|| AppError::Internal(format!("unknown pull request status {:?}", raw)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// The unique constraint is the final arbiter when two writers race on the same key.
fn map_unique_violation(err: sqlx::Error, on_conflict: AppError) -> AppError {
    if is_unique_violation(&err) {
        on_conflict
    } else {
        err.into()
    }
}
