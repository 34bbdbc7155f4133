//! Data Transfer Objects - submitted forms and query parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Signup form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

/// Login form. `next` is where to go after a successful login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// `?page=` as sent by the client, unparsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?next=` on the login page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// A form as shown to the user: submitted values plus per-field errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormView<V> {
    pub values: V,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl<V> FormView<V> {
    pub fn blank(values: V) -> Self {
        Self {
            values,
            errors: BTreeMap::new(),
        }
    }

    pub fn with_errors(values: V, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self { values, errors }
    }
}

/// Same-origin redirect target, or `None` for anything that could leave the site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths_only() {
        assert_eq!(safe_next(Some("/create/")), Some("/create/"));
        assert_eq!(safe_next(Some("/?page=2")), Some("/?page=2"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_login_form_hides_password() {
        let form = LoginForm {
            username: "leo".to_string(),
            password: "hunter22".to_string(),
            next: None,
        };

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json, serde_json::json!({ "username": "leo" }));
    }
}
