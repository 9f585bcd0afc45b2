//! Validation of entry drafts and registration forms
//!
//! Both validators check every field in a fixed order and accumulate all
//! violations, so the caller can show every problem at once. Malformed input
//! is a normal validation failure, never a panic.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::entry::{EntryDraft, EntryStatus, EntryType, FinancialEntry};
use super::identity::{NewUser, UserId};
use super::result::ValidationError;

pub const DESCRIPTION_REQUIRED: &str = "description is required";
pub const MONTH_INVALID: &str = "month is required/invalid";
pub const YEAR_INVALID: &str = "year is required/invalid";
pub const TYPE_REQUIRED: &str = "type is required";
pub const AMOUNT_INVALID: &str = "amount is required/invalid";

pub const NAME_REQUIRED: &str = "name is required";
pub const EMAIL_INVALID: &str = "email is required/invalid";
pub const PASSWORD_REQUIRED: &str = "password is required";
pub const PASSWORD_TOO_LONG: &str = "password must be at most 20 characters";
pub const PASSWORDS_DO_NOT_MATCH: &str = "passwords do not match";

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LEN: usize = 20;

/// Integer digits that fit the stored `DECIMAL(18, 2)` amount
pub const MAX_AMOUNT_DIGITS: usize = 16;

fn parse_month(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|m| (1..=12).contains(m))
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1000..=9999).contains(y))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Positive decimal with at most two fractional digits
///
/// Only plain `digits[.digits]` text is accepted: no sign, exponent or
/// separators.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let (integer, fraction) = match raw.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (raw, None),
    };
    if !is_digits(integer) || !fraction.map_or(true, is_digits) {
        return None;
    }
    if integer.trim_start_matches('0').len() > MAX_AMOUNT_DIGITS {
        return None;
    }

    let amount = Decimal::from_str(raw).ok()?;
    if amount <= Decimal::ZERO || amount.normalize().scale() > 2 {
        return None;
    }
    Some(amount)
}

/// Validate an entry draft before it is persisted
pub fn validate_entry(draft: &EntryDraft) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if draft.description.trim().is_empty() {
        messages.push(DESCRIPTION_REQUIRED.to_string());
    }
    if parse_month(&draft.month).is_none() {
        messages.push(MONTH_INVALID.to_string());
    }
    if parse_year(&draft.year).is_none() {
        messages.push(YEAR_INVALID.to_string());
    }
    if EntryType::parse(&draft.entry_type).is_none() {
        messages.push(TYPE_REQUIRED.to_string());
    }
    if parse_amount(&draft.amount).is_none() {
        messages.push(AMOUNT_INVALID.to_string());
    }

    ValidationError::check(messages)
}

impl EntryDraft {
    /// Validate and convert into an entry owned by `owner_id`
    ///
    /// New drafts get the default status; loaded drafts keep theirs.
    pub fn to_entry(&self, owner_id: UserId) -> Result<FinancialEntry, ValidationError> {
        validate_entry(self)?;

        match (
            parse_month(&self.month),
            parse_year(&self.year),
            EntryType::parse(&self.entry_type),
            parse_amount(&self.amount),
        ) {
            (Some(month), Some(year), Some(entry_type), Some(amount)) => Ok(FinancialEntry {
                id: self.id,
                description: self.description.trim().to_string(),
                amount,
                month,
                year,
                entry_type,
                status: self.status.unwrap_or(EntryStatus::Pending),
                owner_id,
            }),
            _ => Err(ValidationError::default()),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

/// Validate a user registration form
pub fn validate_registration(user: &NewUser) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if user.name.trim().is_empty() {
        messages.push(NAME_REQUIRED.to_string());
    }
    if !email_pattern().is_match(user.email.trim()) {
        messages.push(EMAIL_INVALID.to_string());
    }
    if user.password.is_empty() {
        messages.push(PASSWORD_REQUIRED.to_string());
    } else if user.password.chars().count() > MAX_PASSWORD_LEN {
        messages.push(PASSWORD_TOO_LONG.to_string());
    }
    if user.password != user.password_confirmation {
        messages.push(PASSWORDS_DO_NOT_MATCH.to_string());
    }

    ValidationError::check(messages)
}
