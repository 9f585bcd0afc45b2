//! Financial entry domain model

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::identity::UserId;

/// Identifier of a persisted entry
pub type EntryId = i64;

/// Whether an entry adds to or subtracts from the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Income => "INCOME",
            EntryType::Expense => "EXPENSE",
        }
    }

    /// Parse a type label, ignoring case and surrounding whitespace
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Some(EntryType::Income),
            "EXPENSE" => Some(EntryType::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status, owned by the persistence side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    #[default]
    Pending,
    Effective,
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Effective => "EFFECTIVE",
            EntryStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(EntryStatus::Pending),
            "EFFECTIVE" => Some(EntryStatus::Effective),
            "CANCELLED" => Some(EntryStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single income or expense belonging to one user for a month/year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEntry {
    /// Absent until persisted
    pub id: Option<EntryId>,
    pub description: String,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
    pub entry_type: EntryType,
    pub status: EntryStatus,
    pub owner_id: UserId,
}

impl FinancialEntry {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Amount with the sign it contributes to the balance
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Income => self.amount,
            EntryType::Expense => -self.amount,
        }
    }
}

/// Editable fields of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Description,
    Amount,
    Month,
    Year,
    Type,
}

impl EntryField {
    pub fn name(&self) -> &'static str {
        match self {
            EntryField::Description => "description",
            EntryField::Amount => "amount",
            EntryField::Month => "month",
            EntryField::Year => "year",
            EntryField::Type => "type",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "description" => Some(EntryField::Description),
            "amount" => Some(EntryField::Amount),
            "month" => Some(EntryField::Month),
            "year" => Some(EntryField::Year),
            "type" => Some(EntryField::Type),
            _ => None,
        }
    }
}

/// Client-side form state of an entry being composed or edited
///
/// Editable fields hold the raw text typed by the user. `id` and `status`
/// are copied from a loaded entry and are never edited through the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub id: Option<EntryId>,
    pub description: String,
    pub amount: String,
    pub month: String,
    pub year: String,
    pub entry_type: String,
    pub status: Option<EntryStatus>,
}

impl EntryDraft {
    pub fn new(
        description: impl Into<String>,
        amount: impl Into<String>,
        month: impl Into<String>,
        year: impl Into<String>,
        entry_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            description: description.into(),
            amount: amount.into(),
            month: month.into(),
            year: year.into(),
            entry_type: entry_type.into(),
            status: None,
        }
    }

    /// Draft pre-filled from a persisted entry
    pub fn from_entry(entry: &FinancialEntry) -> Self {
        Self {
            id: entry.id,
            description: entry.description.clone(),
            amount: entry.amount.to_string(),
            month: entry.month.to_string(),
            year: entry.year.to_string(),
            entry_type: entry.entry_type.as_str().to_string(),
            status: Some(entry.status),
        }
    }

    pub fn set(&mut self, field: EntryField, value: impl Into<String>) {
        let value = value.into();
        match field {
            EntryField::Description => self.description = value,
            EntryField::Amount => self.amount = value,
            EntryField::Month => self.month = value,
            EntryField::Year => self.year = value,
            EntryField::Type => self.entry_type = value,
        }
    }

    pub fn get(&self, field: EntryField) -> &str {
        match field {
            EntryField::Description => &self.description,
            EntryField::Amount => &self.amount,
            EntryField::Month => &self.month,
            EntryField::Year => &self.year,
            EntryField::Type => &self.entry_type,
        }
    }
}

/// Listing filter, always scoped to one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub owner_id: UserId,
    pub description: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
}

impl EntryFilter {
    pub fn for_owner(owner_id: UserId) -> Self {
        Self {
            owner_id,
            description: None,
            month: None,
            year: None,
            entry_type: None,
            status: None,
        }
    }

    /// Whether an entry satisfies every filter that is set
    pub fn matches(&self, entry: &FinancialEntry) -> bool {
        if entry.owner_id != self.owner_id {
            return false;
        }
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let needle = description.trim().to_lowercase();
            if !entry.description.to_lowercase().contains(&needle) {
                return false;
            }
        }
        self.month.map_or(true, |m| entry.month == m)
            && self.year.map_or(true, |y| entry.year == y)
            && self.entry_type.map_or(true, |t| entry.entry_type == t)
            && self.status.map_or(true, |s| entry.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(description: &str, entry_type: EntryType) -> FinancialEntry {
        FinancialEntry {
            id: Some(1),
            description: description.to_string(),
            amount: Decimal::new(12_50, 2),
            month: 3,
            year: 2024,
            entry_type,
            status: EntryStatus::Pending,
            owner_id: 9,
        }
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(EntryType::parse(" income "), Some(EntryType::Income));
        assert_eq!(EntryType::parse("EXPENSE"), Some(EntryType::Expense));
        assert_eq!(EntryType::parse(""), None);
        assert_eq!(EntryType::parse("TRANSFER"), None);
        assert_eq!(
            serde_json::to_string(&EntryType::Expense).unwrap(),
            "\"EXPENSE\""
        );
    }

    #[test]
    fn test_status_defaults_to_pending() {
        assert_eq!(EntryStatus::default(), EntryStatus::Pending);
        assert_eq!(EntryStatus::parse("cancelled"), Some(EntryStatus::Cancelled));
    }

    #[test]
    fn test_signed_amount() {
        assert_eq!(entry("Salary", EntryType::Income).signed_amount(), Decimal::new(1250, 2));
        assert_eq!(entry("Rent", EntryType::Expense).signed_amount(), Decimal::new(-1250, 2));
    }

    #[test]
    fn test_draft_from_entry_keeps_read_only_fields() {
        let draft = EntryDraft::from_entry(&entry("Salary", EntryType::Income));
        assert_eq!(draft.id, Some(1));
        assert_eq!(draft.status, Some(EntryStatus::Pending));
        assert_eq!(draft.amount, "12.50");
        assert_eq!(draft.month, "3");
        assert_eq!(draft.entry_type, "INCOME");
    }

    #[test]
    fn test_draft_set_and_get() {
        let mut draft = EntryDraft::default();
        draft.set(EntryField::Description, "Groceries");
        draft.set(EntryField::Type, "EXPENSE");
        assert_eq!(draft.get(EntryField::Description), "Groceries");
        assert_eq!(draft.get(EntryField::Type), "EXPENSE");
        assert_eq!(EntryField::parse("amount"), Some(EntryField::Amount));
        assert_eq!(EntryField::parse("status"), None);
    }

    #[test]
    fn test_filter_matches() {
        let salary = entry("Monthly Salary", EntryType::Income);

        let mut filter = EntryFilter::for_owner(9);
        assert!(filter.matches(&salary));

        filter.description = Some("salary".to_string());
        assert!(filter.matches(&salary));

        filter.entry_type = Some(EntryType::Expense);
        assert!(!filter.matches(&salary));

        assert!(!EntryFilter::for_owner(10).matches(&salary));
    }
}
