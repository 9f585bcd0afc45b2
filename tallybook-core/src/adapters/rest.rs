//! REST client for the remote finance backend
//!
//! Speaks the backend's JSON contract (`/api/usuarios`, `/api/lancamentos`).
//! Field and enum names on the wire are the backend's; everything is mapped
//! to domain types at this boundary.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    EntryFilter, EntryId, EntryStatus, EntryType, FinancialEntry, Identity, NewUser, UserId,
};
use crate::ports::{BalanceProvider, EntryRepository, UserRepository};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

const REQUEST_TIMEOUT_SECS: u64 = 30;

fn wire_type(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Income => "RECEITA",
        EntryType::Expense => "DESPESA",
    }
}

fn parse_wire_type(label: &str) -> Option<EntryType> {
    match label {
        "RECEITA" => Some(EntryType::Income),
        "DESPESA" => Some(EntryType::Expense),
        other => EntryType::parse(other),
    }
}

fn wire_status(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Pending => "PENDENTE",
        EntryStatus::Effective => "EFETIVADO",
        EntryStatus::Cancelled => "CANCELADO",
    }
}

fn parse_wire_status(label: &str) -> Option<EntryStatus> {
    match label {
        "PENDENTE" => Some(EntryStatus::Pending),
        "EFETIVADO" => Some(EntryStatus::Effective),
        "CANCELADO" => Some(EntryStatus::Cancelled),
        other => EntryStatus::parse(other),
    }
}

/// Decimal sent as a JSON number or string
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s,
        _ => return Err(D::Error::custom("expected number or string for amount")),
    };
    text.parse::<Decimal>()
        .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e)))
}

/// Owner sent either as a bare id or as the embedded user object
fn deserialize_owner<'de, D>(deserializer: D) -> std::result::Result<UserId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    let id = match &value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::Object(user) => user.get("id").and_then(JsonValue::as_i64),
        _ => None,
    };
    id.ok_or_else(|| D::Error::custom("expected user id or user object"))
}

/// Entry as exchanged with the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor", deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "usuario", deserialize_with = "deserialize_owner")]
    pub owner_id: UserId,
    #[serde(rename = "tipo")]
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EntryDto {
    pub fn from_entry(entry: &FinancialEntry) -> Self {
        Self {
            id: entry.id,
            description: entry.description.clone(),
            amount: entry.amount,
            month: entry.month,
            year: entry.year,
            owner_id: entry.owner_id,
            entry_type: wire_type(entry.entry_type).to_string(),
            status: Some(wire_status(entry.status).to_string()),
        }
    }

    pub fn into_entry(self) -> Result<FinancialEntry> {
        let entry_type = parse_wire_type(&self.entry_type).ok_or_else(|| {
            Error::persistence(format!("backend sent unknown entry type {}", self.entry_type))
        })?;
        let status = match self.status.as_deref() {
            None => EntryStatus::default(),
            Some(label) => parse_wire_status(label).ok_or_else(|| {
                Error::persistence(format!("backend sent unknown entry status {}", label))
            })?,
        };
        Ok(FinancialEntry {
            id: self.id,
            description: self.description,
            amount: self.amount,
            month: self.month,
            year: self.year,
            entry_type,
            status,
            owner_id: self.owner_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct UserDto<'a> {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
    #[serde(rename = "senha")]
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: UserId,
    #[serde(rename = "nome")]
    name: String,
    email: String,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity::new(user.id, user.name, user.email)
    }
}

/// Client for the remote backend
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::persistence(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn map_request_error(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::persistence(format!(
                "Connection timed out after {} seconds",
                REQUEST_TIMEOUT_SECS
            ))
        } else if error.is_connect() {
            Error::persistence("Unable to connect to the backend")
        } else {
            Error::persistence(format!("Backend request failed: {}", error))
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(Self::map_request_error)
    }

    /// Message the backend put in an error body, or the status line
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) if !body.trim().is_empty() => body.trim().trim_matches('"').to_string(),
            _ => format!("Backend error: HTTP {}", status),
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| Error::persistence(format!("Unreadable backend response: {}", e)))
    }

    /// Decode a success body or surface the backend's message
    async fn expect_success<T: DeserializeOwned>(response: Response) -> Result<T> {
        if response.status().is_success() {
            Self::parse(response).await
        } else {
            Err(Error::persistence(Self::failure_message(response).await))
        }
    }

    fn filter_query(filter: &EntryFilter) -> Vec<(&'static str, String)> {
        let mut query = vec![("usuario", filter.owner_id.to_string())];
        if let Some(description) = filter
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            query.push(("descricao", description.to_string()));
        }
        if let Some(month) = filter.month {
            query.push(("mes", month.to_string()));
        }
        if let Some(year) = filter.year {
            query.push(("ano", year.to_string()));
        }
        if let Some(entry_type) = filter.entry_type {
            query.push(("tipo", wire_type(entry_type).to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", wire_status(status).to_string()));
        }
        query
    }
}

#[async_trait]
impl EntryRepository for RestClient {
    async fn create(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        let mut dto = EntryDto::from_entry(entry);
        dto.id = None;
        let url = self.endpoint("api/lancamentos")?;
        let response = Self::send(self.client.post(url).json(&dto)).await?;
        Self::expect_success::<EntryDto>(response).await?.into_entry()
    }

    async fn update(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        let id = entry
            .id
            .ok_or_else(|| Error::persistence("entry has no id and cannot be updated"))?;
        let url = self.endpoint(&format!("api/lancamentos/{}", id))?;
        let response = Self::send(self.client.put(url).json(&EntryDto::from_entry(entry))).await?;
        Self::expect_success::<EntryDto>(response).await?.into_entry()
    }

    async fn fetch_by_id(&self, id: EntryId) -> Result<FinancialEntry> {
        let url = self.endpoint(&format!("api/lancamentos/{}", id))?;
        let response = Self::send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("entry {}", id)));
        }
        Self::expect_success::<EntryDto>(response).await?.into_entry()
    }

    async fn query(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>> {
        let url = self.endpoint("api/lancamentos")?;
        let request = self.client.get(url).query(&Self::filter_query(filter));
        let response = Self::send(request).await?;
        Self::expect_success::<Vec<EntryDto>>(response)
            .await?
            .into_iter()
            .map(EntryDto::into_entry)
            .collect()
    }
}

#[async_trait]
impl UserRepository for RestClient {
    async fn create(&self, user: &NewUser) -> Result<Identity> {
        let body = UserDto {
            name: Some(user.name.trim()),
            email: user.email.trim(),
            password: &user.password,
        };
        let url = self.endpoint("api/usuarios")?;
        let response = Self::send(self.client.post(url).json(&body)).await?;
        Ok(Self::expect_success::<UserResponse>(response).await?.into())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity> {
        let body = UserDto {
            name: None,
            email,
            password,
        };
        let url = self.endpoint("api/usuarios/autenticar")?;
        let response = Self::send(self.client.post(url).json(&body)).await?;
        if response.status().is_success() {
            Ok(Self::parse::<UserResponse>(response).await?.into())
        } else {
            Err(Error::authentication(Self::failure_message(response).await))
        }
    }
}

#[async_trait]
impl BalanceProvider for RestClient {
    async fn balance_for_owner(&self, owner_id: UserId) -> Result<Decimal> {
        let url = self.endpoint(&format!("api/usuarios/{}/saldo", owner_id))?;
        let response = Self::send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("user {}", owner_id)));
        }
        if !response.status().is_success() {
            return Err(Error::persistence(Self::failure_message(response).await));
        }
        let body = response.text().await.map_err(Self::map_request_error)?;
        parse_balance(&body)
    }
}

/// Balance body: a bare number, a quoted number, or nothing when there are no entries
fn parse_balance(body: &str) -> Result<Decimal> {
    let text = body.trim().trim_matches('"');
    if text.is_empty() || text == "null" {
        return Ok(Decimal::ZERO);
    }
    text.parse::<Decimal>()
        .map_err(|e| Error::persistence(format!("Unreadable balance {}: {}", text, e)))
}
