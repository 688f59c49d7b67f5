//! Wire types for the LevelUp REST API.
//!
//! Field names follow the server's snake_case JSON.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A task as returned by `api/tasks/tasks/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO-8601 offset date-time, or a bare `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub stat_id: Option<i64>,
    /// Doubles as the experience reward on completion.
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Body for creating or updating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_id: Option<i64>,
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl TaskRequest {
    /// Reward used when none is chosen.
    pub const DEFAULT_PRIORITY: i64 = 50;

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            category_id: None,
            stat_id: None,
            priority: Self::DEFAULT_PRIORITY,
            is_completed: None,
        }
    }

    /// Full copy of `task` with the completion flag set.
    pub fn from_task(task: &Task, is_completed: bool) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.clone(),
            category_id: task.category_id,
            stat_id: task.stat_id,
            priority: task.priority.unwrap_or(Self::DEFAULT_PRIORITY),
            is_completed: Some(is_completed),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)
    }
}

/// A task category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }
}

/// A named numeric attribute on the user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: i64,
    #[serde(default = "default_true")]
    pub is_default: bool,
    #[serde(default)]
    pub color: Option<String>,
}

/// Body for creating or updating a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub value: i64,
    #[serde(default = "default_true")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl StatRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            value: 0,
            is_default: true,
            color: None,
        }
    }

    /// Copy of `stat` with a new value.
    pub fn with_value(stat: &Stat, value: i64) -> Self {
        Self {
            name: stat.name.clone(),
            description: stat.description.clone(),
            value,
            is_default: stat.is_default,
            color: stat.color.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }
}

fn default_true() -> bool {
    true
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
    pub token: String,
}

/// Login / resend-confirmation response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Message envelope used by most endpoints, for both success and failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenericResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub non_field_errors: Option<Vec<String>>,
}

impl GenericResponse {
    /// Lenient parse: anything that isn't the envelope yields an empty one.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Most specific error text: first non-field error, then `error`,
    /// `detail`, `message`.
    pub fn error_message(&self) -> Option<String> {
        self.non_field_errors
            .as_ref()
            .and_then(|errs| errs.first().cloned())
            .or_else(|| self.error.clone())
            .or_else(|| self.detail.clone())
            .or_else(|| self.message.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarDetails {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarResponse {
    #[serde(default)]
    pub avatar_details: Option<AvatarDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_from_server_json() {
        let json = r#"{
            "id": 7,
            "title": "Run 5k",
            "description": null,
            "due_date": "2025-06-23T10:00:00+03:00",
            "is_completed": false,
            "category_id": 2,
            "stat_id": null,
            "priority": 80
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.priority, Some(80));
        assert_eq!(task.category_id, Some(2));
        assert!(task.stat_id.is_none());
    }

    #[test]
    fn task_without_priority_deserializes() {
        let task: Task = serde_json::from_str(r#"{"id":1,"title":"x"}"#).unwrap();
        assert!(task.priority.is_none());
        assert!(!task.is_completed);
    }

    #[test]
    fn completion_request_copies_task() {
        let task = Task {
            id: 3,
            title: "Read".into(),
            description: Some("chapter 2".into()),
            due_date: Some("2025-06-23".into()),
            is_completed: false,
            category_id: Some(1),
            stat_id: Some(4),
            priority: None,
        };
        let req = TaskRequest::from_task(&task, true);
        assert_eq!(req.priority, 50);
        assert_eq!(req.is_completed, Some(true));
        assert_eq!(req.stat_id, Some(4));

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["is_completed"], true);
        assert_eq!(json["due_date"], "2025-06-23");
    }

    #[test]
    fn new_task_request_omits_completion_flag() {
        let json = serde_json::to_value(TaskRequest::new("x")).unwrap();
        assert!(json.get("is_completed").is_none());
        assert_eq!(json["priority"], 50);
    }

    #[test]
    fn blank_title_rejected() {
        assert_eq!(
            TaskRequest::new("   ").validate(),
            Err(ValidationError::Blank { field: "title" })
        );
        assert!(CategoryRequest::new("").validate().is_err());
        assert!(StatRequest::new("Strength").validate().is_ok());
    }

    #[test]
    fn stat_defaults() {
        let stat: Stat = serde_json::from_str(r#"{"id":1,"name":"Strength"}"#).unwrap();
        assert!(stat.is_default);
        assert_eq!(stat.value, 0);
    }

    #[test]
    fn error_message_priority() {
        let resp = GenericResponse::from_body(
            r#"{"message":"m","error":"e","detail":"d","non_field_errors":["nf"]}"#,
        );
        assert_eq!(resp.error_message().as_deref(), Some("nf"));

        let resp = GenericResponse::from_body(r#"{"message":"m","detail":"d"}"#);
        assert_eq!(resp.error_message().as_deref(), Some("d"));

        let resp = GenericResponse::from_body(r#"{"non_field_errors":[],"message":"m"}"#);
        assert_eq!(resp.error_message().as_deref(), Some("m"));
    }

    #[test]
    fn non_json_body_is_empty_envelope() {
        let resp = GenericResponse::from_body("<html>502</html>");
        assert_eq!(resp, GenericResponse::default());
        assert!(resp.error_message().is_none());
    }
}
