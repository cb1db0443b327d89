use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::models::{NewCat, Race, Sex};
use crate::services::{CatInput, ServiceError};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex compiles")
});

const MAX_AGE_IN_MONTH: i64 = 120_082;

/// Collects per-field problems so a client sees every bad field at once.
#[derive(Debug, Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| reason.into());
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.add(field, format!("must be between {} and {} characters", min, max));
        }
    }

    fn email(&mut self, value: &str) {
        if value.len() > 255 || !EMAIL_RE.is_match(value) {
            self.add("email", "must be a valid email address");
        }
    }

    fn finish(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            return Ok(());
        }
        let message = self
            .0
            .iter()
            .map(|(field, reason)| format!("{} {}", field, reason))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ServiceError::InvalidArgument {
            message,
            fields: self.0,
        })
    }
}

pub fn registration(email: &str, name: &str, password: &str) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::default();
    errors.email(email);
    errors.length("name", name, 5, 50);
    errors.length("password", password, 5, 15);
    errors.finish()
}

pub fn login(email: &str, password: &str) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::default();
    errors.email(email);
    errors.length("password", password, 5, 15);
    errors.finish()
}

pub fn match_message(message: &str) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::default();
    errors.length("message", message, 5, 120);
    errors.finish()
}

/// Check a cat payload and convert it to storage form.
pub fn cat(input: &CatInput) -> Result<NewCat, ServiceError> {
    let mut errors = FieldErrors::default();

    errors.length("name", &input.name, 1, 30);
    errors.length("description", &input.description, 1, 200);

    let race = input.race.parse::<Race>().ok();
    if race.is_none() {
        let allowed: Vec<&str> = Race::ALL.iter().map(Race::as_str).collect();
        errors.add("race", format!("must be one of: {}", allowed.join(", ")));
    }

    let sex = input.sex.parse::<Sex>().ok();
    if sex.is_none() {
        errors.add("sex", "must be male or female");
    }

    if !(1..=MAX_AGE_IN_MONTH).contains(&input.age_in_month) {
        errors.add("ageInMonth", format!("must be between 1 and {}", MAX_AGE_IN_MONTH));
    }

    if input.image_urls.is_empty() {
        errors.add("imageUrls", "must contain at least one URL");
    } else if let Some(bad) = input.image_urls.iter().find(|u| !is_web_url(u)) {
        errors.add("imageUrls", format!("not a valid http(s) URL: {}", bad));
    }

    errors.finish()?;

    match (race, sex) {
        (Some(race), Some(sex)) => Ok(NewCat {
            name: input.name.clone(),
            race,
            sex,
            age_in_month: input.age_in_month as i32,
            description: input.description.clone(),
            image_urls: input.image_urls.clone(),
        }),
        _ => Err(ServiceError::invalid("invalid cat payload")),
    }
}

fn is_web_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
