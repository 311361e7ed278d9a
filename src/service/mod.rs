//! Reviewer assignment orchestration.
//!
//! `ReviewService` is the only entry point used by the HTTP layer. It hands the
//! repository a `ReviewerPicker` for the two compound operations, bounds every
//! store call with a deadline and logs successful mutations.

mod picker;

pub use picker::*;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{PullRequest, Reassignment, Team, TeamMember, User, UserReviews};

/// Number of reviewers requested for a new pull request. Fewer are assigned
/// when the team does not have enough active members.
pub const REVIEWERS_PER_PULL_REQUEST: usize = 2;

pub struct ReviewService {
    repo: Arc<Repository>,
    picker: Arc<dyn ReviewerPicker>,
    operation_timeout: Duration,
}

impl ReviewService {
    pub fn new(
        repo: Arc<Repository>,
        picker: Arc<dyn ReviewerPicker>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            picker,
            operation_timeout,
        }
    }

    /// Run a store operation under the configured deadline. On expiry the
    /// operation future is dropped, which rolls back its open transaction.
    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Operation deadline exceeded"
                );
                Err(AppError::Internal(format!("{} timed out", operation)))
            }
        }
    }

    pub async fn create_team(
        &self,
        team_name: &str,
        members: &[TeamMember],
    ) -> Result<Team, AppError> {
        let team = self
            .with_deadline("create_team", self.repo.create_team(team_name, members))
            .await?;
        tracing::info!(team_name, members = team.members.len(), "Team created");
        Ok(team)
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        self.with_deadline("get_team", self.repo.get_team(team_name))
            .await
    }

    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        let user = self
            .with_deadline("set_user_active", self.repo.set_user_active(user_id, is_active))
            .await?;
        tracing::info!(user_id, is_active, "User activity changed");
        Ok(user)
    }

    pub async fn create_pull_request(
        &self,
        pull_request_id: &str,
        pull_request_name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        let pr = self
            .with_deadline(
                "create_pull_request",
                self.repo.create_pull_request(
                    pull_request_id,
                    pull_request_name,
                    author_id,
                    self.picker.as_ref(),
                    REVIEWERS_PER_PULL_REQUEST,
                ),
            )
            .await?;
        tracing::info!(
            pull_request_id,
            author_id,
            reviewers = ?pr.assigned_reviewers,
            "Pull request created"
        );
        Ok(pr)
    }

    pub async fn merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let pr = self
            .with_deadline(
                "merge_pull_request",
                self.repo.merge_pull_request(pull_request_id),
            )
            .await?;
        tracing::info!(pull_request_id, "Pull request merged");
        Ok(pr)
    }

    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        let (pr, replaced_by) = self
            .with_deadline(
                "reassign_reviewer",
                self.repo
                    .reassign_reviewer(pull_request_id, old_reviewer_id, self.picker.as_ref()),
            )
            .await?;
        tracing::info!(
            pull_request_id,
            old_reviewer_id,
            new_reviewer_id = %replaced_by,
            "Reviewer reassigned"
        );
        Ok(Reassignment { pr, replaced_by })
    }

    pub async fn get_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        self.with_deadline("get_pull_request", self.repo.get_pull_request(pull_request_id))
            .await
    }

    pub async fn get_user_reviews(&self, user_id: &str) -> Result<UserReviews, AppError> {
        self.with_deadline("get_user_reviews", self.repo.get_user_reviews(user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::clock::SystemClock;
    use crate::db::init_database;
    use crate::models::PullRequestStatus;

    /// Records every call and delegates to `OrderedPicker`.
    #[derive(Default)]
    struct RecordingPicker {
        calls: Mutex<Vec<(Vec<String>, usize)>>,
    }

    impl ReviewerPicker for RecordingPicker {
        fn pick_many(&self, candidates: &[String], limit: usize) -> Vec<String> {
            let mut sorted = candidates.to_vec();
            sorted.sort();
            self.calls.lock().unwrap().push((sorted, limit));
            OrderedPicker.pick_many(candidates, limit)
        }
    }

    async fn setup(picker: Arc<dyn ReviewerPicker>) -> (ReviewService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool, Arc::new(SystemClock)));
        let service = ReviewService::new(repo, picker, Duration::from_secs(5));
        (service, temp_dir)
    }

    fn member(id: &str, name: &str, active: bool) -> TeamMember {
        TeamMember {
            user_id: id.to_string(),
            username: name.to_string(),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_create_pull_request_requests_two_reviewers() {
        let picker = Arc::new(RecordingPicker::default());
        let (service, _dir) = setup(picker.clone()).await;
        service
            .create_team(
                "core",
                &[
                    member("u1", "Alice", true),
                    member("u2", "Bob", true),
                    member("u3", "Carol", true),
                    member("u4", "Dave", false),
                ],
            )
            .await
            .unwrap();

        let pr = service
            .create_pull_request("pr-1", "Change", "u1")
            .await
            .unwrap();

        let calls = picker.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(vec!["u2".to_string(), "u3".to_string()], REVIEWERS_PER_PULL_REQUEST)]
        );
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u3"]);
    }

    #[tokio::test]
    async fn test_reassign_picks_a_single_replacement() {
        let picker = Arc::new(RecordingPicker::default());
        let (service, _dir) = setup(picker.clone()).await;
        service
            .create_team(
                "core",
                &[
                    member("u1", "Alice", true),
                    member("u2", "Bob", true),
                    member("u3", "Carol", true),
                    member("u4", "Dave", true),
                ],
            )
            .await
            .unwrap();
        service
            .create_pull_request("pr-1", "Change", "u1")
            .await
            .unwrap();

        let result = service.reassign_reviewer("pr-1", "u3").await.unwrap();

        assert_eq!(result.replaced_by, "u4");
        assert_eq!(result.pr.assigned_reviewers, vec!["u2", "u4"]);
        let calls = picker.calls.lock().unwrap().clone();
        assert_eq!(calls.last(), Some(&(vec!["u4".to_string()], 1)));
    }

    #[tokio::test]
    async fn test_full_review_lifecycle() {
        let (service, _dir) = setup(Arc::new(RandomPicker::with_seed(21))).await;
        service
            .create_team(
                "core",
                &[
                    member("u1", "Alice", true),
                    member("u2", "Bob", true),
                    member("u3", "Carol", true),
                ],
            )
            .await
            .unwrap();

        let pr = service
            .create_pull_request("pr-1", "Change", "u1")
            .await
            .unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u3"]);

        let reviews = service.get_user_reviews("u2").await.unwrap();
        assert_eq!(reviews.pull_requests.len(), 1);

        let merged = service.merge_pull_request("pr-1").await.unwrap();
        assert_eq!(merged.status, PullRequestStatus::Merged);

        let err = service.reassign_reviewer("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, AppError::PrMerged));

        let fetched = service.get_pull_request("pr-1").await.unwrap();
        assert_eq!(fetched, merged);
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_internal() {
        let (mut service, _dir) = setup(Arc::new(OrderedPicker)).await;
        service.operation_timeout = Duration::from_millis(50);

        let err = service
            .with_deadline("stalled", std::future::pending::<Result<(), AppError>>())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.message(), "internal error");
    }
}
