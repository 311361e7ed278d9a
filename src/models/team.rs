//! Team and user models.

use serde::{Deserialize, Serialize};

/// A user as listed inside a team roster. Missing fields deserialize empty so
/// the handler can report them as validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_active: bool,
}

/// A team with its current roster, sorted by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

/// A single user with the team it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

/// Request body for creating a team.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub members: Option<Vec<TeamMember>>,
}

/// Request body for flipping a user's active flag.
#[derive(Debug, Clone, Deserialize)]
pub struct SetIsActiveRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Query string for `GET /team/get`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamQuery {
    #[serde(default)]
    pub team_name: String,
}

/// Query string for `GET /users/getReview`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: String,
}
