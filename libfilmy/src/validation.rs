//! Form validation
//!
//! Pure checks run before a login or signup request is dispatched. Every
//! call returns a result value with one message slot per field; an empty
//! slot means the field passed.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum accepted password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginErrors {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginValidation {
    pub errors: LoginErrors,
    pub valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupValidation {
    pub errors: SignupErrors,
    pub valid: bool,
}

impl LoginValidation {
    /// Messages of the failing fields, in form order
    pub fn messages(&self) -> Vec<&str> {
        [self.errors.email.as_str(), self.errors.password.as_str()]
            .into_iter()
            .filter(|m| !m.is_empty())
            .collect()
    }
}

impl SignupValidation {
    pub fn messages(&self) -> Vec<&str> {
        [
            self.errors.full_name.as_str(),
            self.errors.email.as_str(),
            self.errors.password.as_str(),
            self.errors.confirm_password.as_str(),
        ]
        .into_iter()
        .filter(|m| !m.is_empty())
        .collect()
    }
}

fn check_email(email: &str) -> String {
    if email.is_empty() {
        "Email is required".to_string()
    } else if !email_pattern().is_match(email) {
        "Enter a valid email".to_string()
    } else {
        String::new()
    }
}

// Length is counted in UTF-16 code units, as the web forms do
fn check_password(password: &str) -> String {
    if password.is_empty() {
        "Password is required".to_string()
    } else if password.encode_utf16().count() < MIN_PASSWORD_LENGTH {
        format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH)
    } else {
        String::new()
    }
}

pub fn validate_login(email: &str, password: &str) -> LoginValidation {
    let errors = LoginErrors {
        email: check_email(email),
        password: check_password(password),
    };
    let valid = errors.email.is_empty() && errors.password.is_empty();

    LoginValidation { errors, valid }
}

pub fn validate_signup(
    full_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> SignupValidation {
    let errors = SignupErrors {
        full_name: if full_name.is_empty() {
            "Full name is required".to_string()
        } else {
            String::new()
        },
        email: check_email(email),
        password: check_password(password),
        confirm_password: if password != confirm_password {
            "Passwords do not match".to_string()
        } else {
            String::new()
        },
    };
    let valid = errors.full_name.is_empty()
        && errors.email.is_empty()
        && errors.password.is_empty()
        && errors.confirm_password.is_empty();

    SignupValidation { errors, valid }
}
