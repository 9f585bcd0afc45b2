//! Navigation destinations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entry::EntryId;

/// A destination the view layer can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Login,
    Register,
    Home,
    EntryList,
    /// New entry form, or the update form when `id` is set
    EntryForm { id: Option<EntryId> },
}

impl Route {
    /// Login and registration are reachable without a session
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Home => "/home".to_string(),
            Route::EntryList => "/entries".to_string(),
            Route::EntryForm { id: None } => "/entries/form".to_string(),
            Route::EntryForm { id: Some(id) } => format!("/entries/form/{}", id),
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        match trimmed {
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "" | "/home" => Some(Route::Home),
            "/entries" => Some(Route::EntryList),
            "/entries/form" => Some(Route::EntryForm { id: None }),
            other => other
                .strip_prefix("/entries/form/")
                .and_then(|id| id.parse().ok())
                .map(|id| Route::EntryForm { id: Some(id) }),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
