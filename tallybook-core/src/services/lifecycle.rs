//! Entry lifecycle - the create/update state machine behind the entry form
//!
//! One `EntryLifecycle` drives a single in-progress entry:
//!
//! ```text
//! Composing --submit--> Submitting --ok--> Submitted --> Composing (fresh draft)
//!                                  \-err-> SubmitFailed --> Composing (draft kept)
//! Composing --begin_edit--> Loading(id) --ok--> Editing
//!                                       \-err-> Composing
//! Editing --update--> Updating --ok--> Submitted (navigate to listing)
//!                              \-err-> UpdateFailed --> Editing
//! ```
//!
//! Every transition is published to subscribers as a [`LifecycleSnapshot`].
//! Operations take `&mut self`, so a second call cannot start while one is
//! awaiting the repository. There is no timeout: a repository call that never
//! resolves leaves the machine in its transitional state.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_entry, EntryDraft, EntryField, EntryId, EntryStatus, FinancialEntry, Route,
    ValidationError,
};
use crate::ports::EntryRepository;

use super::observer::Listeners;
use super::session::SessionStore;

pub const ENTRY_CREATED: &str = "entry registered successfully";
pub const ENTRY_UPDATED: &str = "entry updated successfully";

/// States of the entry form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum LifecycleState {
    Composing,
    Submitting,
    Submitted,
    SubmitFailed,
    Loading(EntryId),
    Editing,
    Updating,
    UpdateFailed,
}

impl LifecycleState {
    /// Whether a repository call is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            LifecycleState::Submitting | LifecycleState::Loading(_) | LifecycleState::Updating
        )
    }

    pub fn accepts_edits(&self) -> bool {
        matches!(self, LifecycleState::Composing | LifecycleState::Editing)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Composing => f.write_str("composing"),
            LifecycleState::Submitting => f.write_str("submitting"),
            LifecycleState::Submitted => f.write_str("submitted"),
            LifecycleState::SubmitFailed => f.write_str("submit failed"),
            LifecycleState::Loading(id) => write!(f, "loading entry {}", id),
            LifecycleState::Editing => f.write_str("editing"),
            LifecycleState::Updating => f.write_str("updating"),
            LifecycleState::UpdateFailed => f.write_str("update failed"),
        }
    }
}

/// Message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notification {
    Success(String),
    Error(String),
}

/// Everything the view layer needs to render the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,
    pub draft: EntryDraft,
    /// Validation messages from the last submit or update, in check order
    pub errors: Vec<String>,
    pub notifications: Vec<Notification>,
    pub navigate_to: Option<Route>,
}

/// Domain result of a lifecycle operation
#[derive(Debug)]
pub enum Outcome {
    /// `begin_edit` loaded the entry into the draft
    Loaded(FinancialEntry),
    /// `submit` or `update` stored the entry
    Persisted(FinancialEntry),
    /// The draft did not validate; nothing was sent
    Invalid(ValidationError),
    /// The repository or the session refused the operation
    Failed(Error),
}

/// State machine for composing and editing one financial entry
pub struct EntryLifecycle {
    repository: Arc<dyn EntryRepository>,
    session: SessionStore,
    state: LifecycleState,
    draft: EntryDraft,
    errors: Vec<String>,
    notifications: Vec<Notification>,
    navigate_to: Option<Route>,
    listeners: Listeners<LifecycleSnapshot>,
}

impl EntryLifecycle {
    pub fn new(repository: Arc<dyn EntryRepository>, session: SessionStore) -> Self {
        Self {
            repository,
            session,
            state: LifecycleState::Composing,
            draft: EntryDraft::default(),
            errors: Vec::new(),
            notifications: Vec::new(),
            navigate_to: None,
            listeners: Listeners::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn draft(&self) -> &EntryDraft {
        &self.draft
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn navigate_to(&self) -> Option<Route> {
        self.navigate_to
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            state: self.state,
            draft: self.draft.clone(),
            errors: self.errors.clone(),
            notifications: self.notifications.clone(),
            navigate_to: self.navigate_to,
        }
    }

    /// Register a listener called after every transition
    pub fn subscribe(&self, listener: impl Fn(&LifecycleSnapshot) + Send + Sync + 'static) {
        self.listeners.subscribe(listener);
    }

    /// Load an existing entry for update
    ///
    /// Entries owned by someone other than the signed-in user are reported
    /// as not found.
    pub async fn begin_edit(&mut self, id: EntryId) -> Result<Outcome> {
        self.ensure("begin_edit", self.state == LifecycleState::Composing)?;
        self.clear_feedback();
        self.transition(LifecycleState::Loading(id));

        let fetched = self.repository.fetch_by_id(id).await;
        match fetched.and_then(|entry| self.owned(entry, id)) {
            Ok(entry) => {
                self.draft = EntryDraft::from_entry(&entry);
                self.transition(LifecycleState::Editing);
                Ok(Outcome::Loaded(entry))
            }
            Err(e) => {
                tracing::debug!(entry_id = id, "entry could not be loaded: {}", e);
                self.draft = EntryDraft::default();
                self.notifications.push(Notification::Error(e.to_string()));
                self.transition(LifecycleState::Composing);
                Ok(Outcome::Failed(e))
            }
        }
    }

    /// Validate and create a new entry owned by the signed-in user
    pub async fn submit(&mut self, draft: EntryDraft) -> Result<Outcome> {
        self.ensure("submit", self.state == LifecycleState::Composing)?;
        self.clear_feedback();
        self.draft = draft;

        let mut entry = match self.prepare() {
            Ok(entry) => entry,
            Err(outcome) => return Ok(outcome),
        };
        entry.id = None;
        entry.status = EntryStatus::Pending;

        self.transition(LifecycleState::Submitting);
        match self.repository.create(&entry).await {
            Ok(saved) => {
                self.transition(LifecycleState::Submitted);
                self.draft = EntryDraft::default();
                self.notifications
                    .push(Notification::Success(ENTRY_CREATED.to_string()));
                self.transition(LifecycleState::Composing);
                Ok(Outcome::Persisted(saved))
            }
            Err(e) => {
                self.notifications.push(Notification::Error(e.to_string()));
                self.transition(LifecycleState::SubmitFailed);
                self.transition(LifecycleState::Composing);
                Ok(Outcome::Failed(e))
            }
        }
    }

    /// Store the edited version of the loaded entry
    ///
    /// The id always comes from the loaded entry. Its status is kept when
    /// `edited` leaves it unset. The draft is validated again before
    /// anything is sent.
    pub async fn update(&mut self, mut edited: EntryDraft) -> Result<Outcome> {
        self.ensure("update", self.state == LifecycleState::Editing)?;
        self.clear_feedback();
        edited.id = self.draft.id;
        edited.status = edited.status.or(self.draft.status);
        self.draft = edited;

        let entry = match self.prepare() {
            Ok(entry) => entry,
            Err(outcome) => return Ok(outcome),
        };

        self.transition(LifecycleState::Updating);
        match self.repository.update(&entry).await {
            Ok(saved) => {
                self.notifications
                    .push(Notification::Success(ENTRY_UPDATED.to_string()));
                self.navigate_to = Some(Route::EntryList);
                self.transition(LifecycleState::Submitted);
                Ok(Outcome::Persisted(saved))
            }
            Err(e) => {
                self.notifications.push(Notification::Error(e.to_string()));
                self.transition(LifecycleState::UpdateFailed);
                self.transition(LifecycleState::Editing);
                Ok(Outcome::Failed(e))
            }
        }
    }

    /// Change one field of the draft; no validation happens here
    pub fn field_changed(&mut self, field: EntryField, value: impl Into<String>) -> Result<()> {
        self.ensure("field_changed", self.state.accepts_edits())?;
        self.draft.set(field, value);
        self.emit();
        Ok(())
    }

    /// Drop the draft and leave the form for the listing
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure("cancel", self.state.accepts_edits())?;
        self.clear_feedback();
        self.draft = EntryDraft::default();
        self.navigate_to = Some(Route::EntryList);
        self.transition(LifecycleState::Composing);
        Ok(())
    }

    /// Start a fresh draft after a completed update
    pub fn reset(&mut self) -> Result<()> {
        self.ensure("reset", self.state == LifecycleState::Submitted)?;
        self.clear_feedback();
        self.draft = EntryDraft::default();
        self.transition(LifecycleState::Composing);
        Ok(())
    }

    /// Validate the current draft and attach the session owner
    ///
    /// On failure the state is left unchanged and the returned outcome has
    /// already been surfaced.
    fn prepare(&mut self) -> std::result::Result<FinancialEntry, Outcome> {
        if let Err(invalid) = validate_entry(&self.draft) {
            return Err(self.reject(invalid));
        }

        let Some(owner) = self.session.current_identity() else {
            let e = Error::Unauthenticated;
            self.notifications.push(Notification::Error(e.to_string()));
            self.emit();
            return Err(Outcome::Failed(e));
        };

        self.draft.to_entry(owner.id).map_err(|invalid| self.reject(invalid))
    }

    fn owned(&self, entry: FinancialEntry, id: EntryId) -> Result<FinancialEntry> {
        match self.session.current_identity() {
            Some(owner) if owner.id == entry.owner_id => Ok(entry),
            _ => Err(Error::not_found(format!("entry {}", id))),
        }
    }

    fn reject(&mut self, invalid: ValidationError) -> Outcome {
        self.errors = invalid.messages.clone();
        self.notifications.extend(
            invalid
                .messages
                .iter()
                .map(|m| Notification::Error(m.clone())),
        );
        self.emit();
        Outcome::Invalid(invalid)
    }

    fn ensure(&self, operation: &'static str, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            tracing::warn!(operation, state = %self.state, "lifecycle operation rejected");
            Err(Error::invalid_transition(operation, self.state))
        }
    }

    fn clear_feedback(&mut self) {
        self.errors.clear();
        self.notifications.clear();
        self.navigate_to = None;
    }

    fn transition(&mut self, state: LifecycleState) {
        tracing::debug!(from = %self.state, to = %state, "lifecycle transition");
        self.state = state;
        self.emit();
    }

    fn emit(&self) {
        if !self.listeners.is_empty() {
            self.listeners.notify(&self.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::adapters::session_file::MemorySessionStorage;
    use crate::domain::validation::{AMOUNT_INVALID, DESCRIPTION_REQUIRED, MONTH_INVALID};
    use crate::domain::{EntryFilter, EntryType, Identity};

    #[derive(Default)]
    struct FakeRepository {
        entries: Mutex<HashMap<EntryId, FinancialEntry>>,
        create_calls: AtomicUsize,
        update_calls: AtomicUsize,
        fail_with: Mutex<Option<String>>,
    }

    impl FakeRepository {
        fn failing(message: &str) -> Self {
            let repo = Self::default();
            *repo.fail_with.lock().unwrap() = Some(message.to_string());
            repo
        }

        fn failure(&self) -> Option<Error> {
            self.fail_with.lock().unwrap().clone().map(Error::persistence)
        }

        fn insert(&self, entry: FinancialEntry) {
            let id = entry.id.unwrap();
            self.entries.lock().unwrap().insert(id, entry);
        }
    }

    #[async_trait]
    impl EntryRepository for FakeRepository {
        async fn create(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.failure() {
                return Err(e);
            }
            let mut entries = self.entries.lock().unwrap();
            let mut saved = entry.clone();
            saved.id = Some(entries.len() as EntryId + 1);
            entries.insert(saved.id.unwrap(), saved.clone());
            Ok(saved)
        }

        async fn update(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.failure() {
                return Err(e);
            }
            self.insert(entry.clone());
            Ok(entry.clone())
        }

        async fn fetch_by_id(&self, id: EntryId) -> Result<FinancialEntry> {
            self.entries
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("entry {}", id)))
        }

        async fn query(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .values()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect())
        }
    }

    fn signed_in() -> SessionStore {
        let session = SessionStore::new(Arc::new(MemorySessionStorage::new()));
        session.start_session(Identity::new(7, "Ana", "ana@example.com"));
        session
    }

    fn lifecycle(repo: &Arc<FakeRepository>, session: SessionStore) -> EntryLifecycle {
        EntryLifecycle::new(repo.clone(), session)
    }

    fn record_states(lifecycle: &EntryLifecycle) -> Arc<Mutex<Vec<LifecycleState>>> {
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        lifecycle.subscribe(move |snapshot| {
            let mut states = sink.lock().unwrap();
            if states.last() != Some(&snapshot.state) {
                states.push(snapshot.state);
            }
        });
        states
    }

    fn stored(id: EntryId) -> FinancialEntry {
        FinancialEntry {
            id: Some(id),
            description: "Rent".to_string(),
            amount: Decimal::new(120000, 2),
            month: 5,
            year: 2024,
            entry_type: EntryType::Expense,
            status: EntryStatus::Effective,
            owner_id: 7,
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let repo = Arc::new(FakeRepository::default());
        let lc = lifecycle(&repo, signed_in());
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &EntryDraft::default());
        assert!(lc.errors().is_empty());
    }

    #[tokio::test]
    async fn test_submit_valid_draft() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());
        let states = record_states(&lc);

        let outcome = lc
            .submit(EntryDraft::new("Salary", "1000.00", "5", "2024", "INCOME"))
            .await
            .unwrap();

        let Outcome::Persisted(saved) = outcome else {
            panic!("expected persisted outcome");
        };
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.owner_id, 7);
        assert_eq!(saved.status, EntryStatus::Pending);
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 1);

        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &EntryDraft::default());
        assert_eq!(
            lc.notifications(),
            &[Notification::Success(ENTRY_CREATED.to_string())]
        );
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                LifecycleState::Submitting,
                LifecycleState::Submitted,
                LifecycleState::Composing
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_repository() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());

        let outcome = lc.submit(EntryDraft::default()).await.unwrap();

        assert!(matches!(outcome, Outcome::Invalid(ref v) if v.messages.len() == 5));
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.errors()[0], DESCRIPTION_REQUIRED);
        assert_eq!(lc.notifications().len(), 5);
    }

    #[tokio::test]
    async fn test_month_thirteen_rejected() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());

        let draft = EntryDraft::new("Salary", "1000.00", "13", "2024", "INCOME");
        let outcome = lc.submit(draft.clone()).await.unwrap();

        let Outcome::Invalid(invalid) = outcome else {
            panic!("expected invalid outcome");
        };
        assert_eq!(invalid.messages, vec![MONTH_INVALID]);
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &draft);
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());

        let outcome = lc
            .submit(EntryDraft::new("Rent", "-50", "5", "2024", "EXPENSE"))
            .await
            .unwrap();

        let Outcome::Invalid(invalid) = outcome else {
            panic!("expected invalid outcome");
        };
        assert_eq!(invalid.messages, vec![AMOUNT_INVALID]);
        assert_eq!(lc.state(), LifecycleState::Composing);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_draft() {
        let repo = Arc::new(FakeRepository::failing("Usuario não encontrado"));
        let mut lc = lifecycle(&repo, signed_in());
        let states = record_states(&lc);

        let draft = EntryDraft::new("Salary", "1000.00", "5", "2024", "INCOME");
        let outcome = lc.submit(draft.clone()).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(Error::Persistence(_))));
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &draft);
        assert_eq!(
            lc.notifications(),
            &[Notification::Error("Usuario não encontrado".to_string())]
        );
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                LifecycleState::Submitting,
                LifecycleState::SubmitFailed,
                LifecycleState::Composing
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_without_session() {
        let repo = Arc::new(FakeRepository::default());
        let session = SessionStore::new(Arc::new(MemorySessionStorage::new()));
        let mut lc = lifecycle(&repo, session);

        let outcome = lc
            .submit(EntryDraft::new("Salary", "10", "5", "2024", "INCOME"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Failed(Error::Unauthenticated)));
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lc.state(), LifecycleState::Composing);
    }

    #[tokio::test]
    async fn test_begin_edit_not_found() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());
        let states = record_states(&lc);

        let outcome = lc.begin_edit(42).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.is_not_found()));
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &EntryDraft::default());
        assert!(matches!(lc.notifications(), [Notification::Error(_)]));
        assert_eq!(
            *states.lock().unwrap(),
            vec![LifecycleState::Loading(42), LifecycleState::Composing]
        );
    }

    #[tokio::test]
    async fn test_begin_edit_foreign_entry_not_found() {
        let repo = Arc::new(FakeRepository::default());
        let mut foreign = stored(5);
        foreign.owner_id = 8;
        foreign.description = "Private bill".to_string();
        repo.insert(foreign);
        let mut lc = lifecycle(&repo, signed_in());

        let outcome = lc.begin_edit(5).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.is_not_found()));
        assert_eq!(lc.state(), LifecycleState::Composing);
        assert_eq!(lc.draft(), &EntryDraft::default());
        assert!(lc.update(EntryDraft::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_begin_edit_without_session_not_found() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let session = SessionStore::new(Arc::new(MemorySessionStorage::new()));
        let mut lc = lifecycle(&repo, session);

        let outcome = lc.begin_edit(3).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.is_not_found()));
        assert_eq!(lc.draft(), &EntryDraft::default());
    }

    #[tokio::test]
    async fn test_update_keeps_loaded_id() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let mut lc = lifecycle(&repo, signed_in());
        lc.begin_edit(3).await.unwrap();

        let mut edited = lc.draft().clone();
        edited.id = Some(99);
        edited.description = "Rent and fees".to_string();
        let Outcome::Persisted(saved) = lc.update(edited).await.unwrap() else {
            panic!("expected persisted outcome");
        };

        assert_eq!(saved.id, Some(3));
        let entries = repo.entries.lock().unwrap();
        assert!(!entries.contains_key(&99));
        assert_eq!(entries[&3].description, "Rent and fees");
    }

    #[tokio::test]
    async fn test_edit_and_update() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let mut lc = lifecycle(&repo, signed_in());

        let outcome = lc.begin_edit(3).await.unwrap();
        assert!(matches!(outcome, Outcome::Loaded(_)));
        assert_eq!(lc.state(), LifecycleState::Editing);
        assert_eq!(lc.draft().description, "Rent");

        lc.field_changed(EntryField::Amount, "1300.00").unwrap();
        let mut edited = lc.draft().clone();
        edited.id = None;
        edited.status = None;

        let outcome = lc.update(edited).await.unwrap();
        let Outcome::Persisted(saved) = outcome else {
            panic!("expected persisted outcome");
        };
        assert_eq!(saved.id, Some(3));
        assert_eq!(saved.status, EntryStatus::Effective);
        assert_eq!(saved.amount, Decimal::new(130000, 2));
        assert_eq!(repo.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lc.state(), LifecycleState::Submitted);
        assert_eq!(lc.navigate_to(), Some(Route::EntryList));

        lc.reset().unwrap();
        assert_eq!(lc.state(), LifecycleState::Composing);
    }

    #[tokio::test]
    async fn test_update_failure_returns_to_editing() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let mut lc = lifecycle(&repo, signed_in());
        lc.begin_edit(3).await.unwrap();

        *repo.fail_with.lock().unwrap() = Some("Lancamento não encontrado".to_string());
        let edited = lc.draft().clone();
        let outcome = lc.update(edited).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(lc.state(), LifecycleState::Editing);
        assert_eq!(lc.navigate_to(), None);
    }

    #[tokio::test]
    async fn test_update_revalidates() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let mut lc = lifecycle(&repo, signed_in());
        lc.begin_edit(3).await.unwrap();

        let mut edited = lc.draft().clone();
        edited.description = String::new();
        let outcome = lc.update(edited).await.unwrap();

        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(repo.update_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lc.state(), LifecycleState::Editing);
        assert_eq!(lc.errors(), &[DESCRIPTION_REQUIRED.to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_state_is_programming_error() {
        let repo = Arc::new(FakeRepository::default());
        repo.insert(stored(3));
        let mut lc = lifecycle(&repo, signed_in());

        let err = lc.update(EntryDraft::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { operation: "update", .. }));
        assert!(lc.reset().is_err());

        lc.begin_edit(3).await.unwrap();
        let err = lc.submit(EntryDraft::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { operation: "submit", .. }));
        assert!(lc.begin_edit(3).await.is_err());
        assert_eq!(lc.state(), LifecycleState::Editing);
    }

    #[tokio::test]
    async fn test_field_changed_and_cancel() {
        let repo = Arc::new(FakeRepository::default());
        let mut lc = lifecycle(&repo, signed_in());

        lc.field_changed(EntryField::Description, "Coffee").unwrap();
        lc.field_changed(EntryField::Month, "99").unwrap();
        assert_eq!(lc.draft().description, "Coffee");
        assert!(lc.errors().is_empty());

        lc.cancel().unwrap();
        assert_eq!(lc.draft(), &EntryDraft::default());
        assert_eq!(lc.navigate_to(), Some(Route::EntryList));
        assert_eq!(lc.state(), LifecycleState::Composing);
    }

    #[test]
    fn test_busy_states() {
        assert!(LifecycleState::Submitting.is_busy());
        assert!(LifecycleState::Loading(1).is_busy());
        assert!(!LifecycleState::Editing.is_busy());
        assert!(!LifecycleState::Submitted.accepts_edits());
    }
}
