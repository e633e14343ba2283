use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::{LoginPayload, RegisterPayload};
use crate::store::{CredentialStore, StoreResult};

/// Validation feedback, field name to human-readable messages. BTreeMap keeps
/// the serialized order stable.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

pub fn taken_message(field: &str) -> &'static str {
    match field {
        "email" => "Please use a different email address.",
        _ => "Please use a different username.",
    }
}

// --- field rules ---
//
// Each field owns an ordered rule list; evaluation stops at the first failing
// rule so an empty field reports "required" alone. Cross-field and
// store-backed checks run afterwards, against fields that passed their own
// rules.

type RuleSet<'a> = &'a [&'a dyn Fn(&str) -> Result<(), String>];

fn required(message: &'static str) -> impl Fn(&str) -> Result<(), String> {
    move |value| {
        if value.is_empty() {
            Err(message.to_string())
        } else {
            Ok(())
        }
    }
}

fn length_between(
    min: usize,
    max: usize,
    message: &'static str,
) -> impl Fn(&str) -> Result<(), String> {
    move |value| {
        let n = value.chars().count();
        if n < min || n > max {
            Err(message.to_string())
        } else {
            Ok(())
        }
    }
}

fn min_length(min: usize, message: &'static str) -> impl Fn(&str) -> Result<(), String> {
    move |value| {
        if value.chars().count() < min {
            Err(message.to_string())
        } else {
            Ok(())
        }
    }
}

fn matching(re: &'static Regex, message: &'static str) -> impl Fn(&str) -> Result<(), String> {
    move |value| {
        if re.is_match(value) {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }
}

/// Run a field's rules in order; record the first failure. Returns whether
/// the field passed.
fn check(field: &'static str, value: &str, rules: RuleSet<'_>, errors: &mut FieldErrors) -> bool {
    for rule in rules {
        if let Err(message) = rule(value) {
            errors.entry(field).or_default().push(message);
            return false;
        }
    }
    true
}

/// HTML checkboxes post "on" (or nothing at all); absent and the usual falsy
/// spellings mean unchecked.
fn parse_checkbox(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => false,
        Some("") => false,
        Some(v) => !matches!(
            v.to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
    }
}

// --- validated forms ---

/// Login input after validation and normalization.
#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(payload: &LoginPayload) -> Result<Self, FieldErrors> {
        let username = payload
            .username
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();
        let password = payload.password.clone().unwrap_or_default();

        let mut errors = FieldErrors::new();
        check(
            "username",
            &username,
            &[&required("Username is required")],
            &mut errors,
        );
        check(
            "password",
            &password,
            &[&required("Password is required")],
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            username,
            password,
            remember: parse_checkbox(payload.remember.as_deref()),
        })
    }
}

/// Registration input after validation and normalization. The username keeps
/// its casing; the email is lowercased.
#[derive(Debug)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    /// The store lookups here are advisory, read-only feedback; the insert
    /// itself re-checks uniqueness and settles any race.
    pub async fn validate(
        payload: &RegisterPayload,
        store: &dyn CredentialStore,
    ) -> StoreResult<Result<Self, FieldErrors>> {
        let username = payload
            .username
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();
        let email = payload
            .email
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let password = payload.password.clone().unwrap_or_default();
        let confirm = payload.confirm_password.clone().unwrap_or_default();

        let mut errors = FieldErrors::new();
        let username_ok = check(
            "username",
            &username,
            &[
                &required("Username is required"),
                &length_between(3, 20, "Username must be between 3 and 20 characters"),
                &matching(
                    &USERNAME_RE,
                    "Username may only contain letters, numbers, and underscores",
                ),
            ],
            &mut errors,
        );
        let email_ok = check(
            "email",
            &email,
            &[
                &required("Email is required"),
                &matching(&EMAIL_RE, "Please enter a valid email address"),
            ],
            &mut errors,
        );
        let password_ok = check(
            "password",
            &password,
            &[
                &required("Password is required"),
                &min_length(8, "Password must be at least 8 characters long"),
            ],
            &mut errors,
        );
        let confirm_ok = check(
            "confirm_password",
            &confirm,
            &[&required("Please confirm your password")],
            &mut errors,
        );

        if password_ok && confirm_ok && password != confirm {
            errors
                .entry("confirm_password")
                .or_default()
                .push("Passwords must match".to_string());
        }

        if username_ok && store.exists_username(&username).await? {
            errors
                .entry("username")
                .or_default()
                .push(taken_message("username").to_string());
        }
        if email_ok && store.exists_email(&email).await? {
            errors
                .entry("email")
                .or_default()
                .push(taken_message("email").to_string());
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(Self {
            username,
            email,
            password,
        }))
    }
}
