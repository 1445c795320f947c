use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration form body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }

    /// Field errors, empty when the form is acceptable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let name_len = self.name.chars().count();
        if name_len == 0 {
            errors.push("Full name is required.".to_string());
        } else if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
            errors.push(format!(
                "Full name must be between {NAME_MIN} and {NAME_MAX} characters."
            ));
        }

        if self.email.is_empty() {
            errors.push("Email is required.".to_string());
        } else if !is_valid_email(&self.email) {
            errors.push("Invalid email address.".to_string());
        }

        if self.password.is_empty() {
            errors.push("Password is required.".to_string());
        } else if self.password.chars().count() < PASSWORD_MIN {
            errors.push(format!(
                "Password must be at least {PASSWORD_MIN} characters long."
            ));
        }

        if self.confirm_password != self.password {
            errors.push("Passwords must match.".to_string());
        }

        errors
    }
}

/// Login form body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn normalize(mut self) -> Self {
        self.email = self.email.trim().to_lowercase();
        self
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.email.is_empty() {
            errors.push("Email is required.".to_string());
        } else if !is_valid_email(&self.email) {
            errors.push("Invalid email address.".to_string());
        }
        if self.password.is_empty() {
            errors.push("Password is required.".to_string());
        }
        errors
    }
}
