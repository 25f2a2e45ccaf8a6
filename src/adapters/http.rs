use crate::domain::model::{QueryParams, Record};
use crate::domain::ports::{Mutator, RecordSource};
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

pub const CSRF_HEADER: &str = "X-CSRFToken";
const CSRF_COOKIE: &str = "csrftoken";
const ENVELOPE_KEYS: [&str; 3] = ["results", "data", "dados"];

/// Per-process context attached to every request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
}

impl Session {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    fn cookie_header(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(session) = &self.session_cookie {
            parts.push(format!("sessionid={}", session));
        }
        if let Some(token) = &self.csrf_token {
            parts.push(format!("{}={}", CSRF_COOKIE, token));
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub csrf_path: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            csrf_path: "ensure-csrf/".to_string(),
        }
    }
}

pub struct ApiClient {
    client: Client,
    session: Session,
    settings: ClientSettings,
}

impl ApiClient {
    pub fn new(session: Session, settings: ClientSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            session,
            settings,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.session.base_url,
            resource.trim_start_matches('/')
        )
    }

    /// Fetches the CSRF token once; mutating requests reuse it.
    pub async fn ensure_csrf(&mut self) -> Result<String> {
        let url = self.url(&self.settings.csrf_path);
        tracing::debug!("Requesting CSRF token from: {}", url);

        let response = self.with_cookies(self.client.get(&url)).send().await?;
        let status = response.status();
        let cookie_token = csrf_from_cookies(response.headers());
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        let body_token = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
            v.get("csrfToken")
                .or_else(|| v.get("csrf_token"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        let token = body_token.or(cookie_token).ok_or_else(|| HubError::ServerFaultError {
            status: status.as_u16(),
            message: "CSRF token missing from response".to_string(),
        })?;
        self.session.csrf_token = Some(token.clone());
        tracing::info!("CSRF token acquired");
        Ok(token)
    }

    pub async fn patch(&self, resource: &str, payload: &Value) -> Result<Value> {
        let request = self.client.patch(self.url(resource)).json(payload);
        self.send_mutation(request).await
    }

    pub async fn delete(&self, resource: &str) -> Result<Value> {
        let request = self.client.delete(self.url(resource));
        self.send_mutation(request).await
    }

    /// Multipart upload of a CSV or Excel file plus extra form fields.
    pub async fn upload(
        &self,
        resource: &str,
        file_name: &str,
        bytes: Vec<u8>,
        fields: &[(String, String)],
    ) -> Result<Value> {
        let mime = if file_name.ends_with(".csv") {
            "text/csv"
        } else {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        };
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let mut form = reqwest::multipart::Form::new().part("arquivo", part);
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }
        tracing::debug!("Uploading {} to {}", file_name, resource);
        let request = self.client.post(self.url(resource)).multipart(form);
        self.send_mutation(request).await
    }

    fn with_cookies(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.cookie_header() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    async fn send_mutation(&self, request: RequestBuilder) -> Result<Value> {
        let mut request = self.with_cookies(request);
        match &self.session.csrf_token {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => tracing::warn!("Sending mutation without CSRF token; call ensure_csrf first"),
        }
        let response = request.send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch_records(&self, resource: &str, params: &QueryParams) -> Result<Vec<Record>> {
        let url = self.url(resource);
        tracing::debug!("Making API request to: {}", url);

        let request = self.with_cookies(self.client.get(&url).query(&params.to_pairs()));
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());

        let body = read_json(response).await?;
        let records = records_from_json(body);
        tracing::info!("📡 Fetched {} records from {}", records.len(), resource);
        Ok(records)
    }
}

#[async_trait]
impl Mutator for ApiClient {
    async fn submit(&self, resource: &str, payload: &Value) -> Result<Value> {
        let request = self.client.post(self.url(resource)).json(payload);
        self.send_mutation(request).await
    }
}

async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let err = classify_failure(status.as_u16(), &body);
        tracing::warn!("Request failed: {}", err);
        return Err(err);
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    if looks_like_html(&body) {
        return Err(classify_failure(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn csrf_from_cookies(headers: &HeaderMap<HeaderValue>) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == CSRF_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

/// Array of objects, an envelope holding one, or a single object.
pub fn records_from_json(body: Value) -> Vec<Record> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(Record::from_object(obj)),
                other => {
                    tracing::warn!("Skipping non-object list item: {}", other);
                    None
                }
            })
            .collect(),
        Value::Object(mut obj) => {
            for key in ENVELOPE_KEYS {
                if matches!(obj.get(key), Some(Value::Array(_))) {
                    if let Some(list) = obj.remove(key) {
                        return records_from_json(list);
                    }
                }
            }
            vec![Record::from_object(obj)]
        }
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("Unexpected response shape: {}", other);
            Vec::new()
        }
    }
}

pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(512).collect::<String>().to_lowercase();
    head.contains("<!doctype html") || head.contains("<html")
}

/// `detail` first, then `non_field_errors`, then field-keyed messages.
fn extract_messages(body: &str) -> (Option<String>, BTreeMap<String, Vec<String>>) {
    let mut fields = BTreeMap::new();
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) else {
        let raw = body.trim();
        let message = (!raw.is_empty()).then(|| raw.chars().take(200).collect::<String>());
        return (message, fields);
    };

    let mut detail = None;
    for (key, value) in obj {
        let messages: Vec<String> = match value {
            Value::String(s) => vec![s],
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            _ => continue,
        };
        match key.as_str() {
            "detail" | "error" | "message" if detail.is_none() => detail = messages.into_iter().next(),
            "non_field_errors" if detail.is_none() => detail = Some(messages.join(" ")),
            _ => {
                fields.insert(key.clone(), messages);
            }
        }
    }

    let message = detail.or_else(|| {
        (!fields.is_empty()).then(|| {
            fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.join(" ")))
                .collect::<Vec<_>>()
                .join("; ")
        })
    });
    (message, fields)
}

/// Maps a non-2xx (or HTML) response onto the error taxonomy.
pub fn classify_failure(status: u16, body: &str) -> HubError {
    if looks_like_html(body) {
        return HubError::ServerFaultError {
            status,
            message: format!("Erro no servidor (HTTP {})", status),
        };
    }

    let (message, field_errors) = extract_messages(body);
    match status {
        400 | 422 => HubError::ServerValidationError {
            status,
            message: message.unwrap_or_else(|| "Dados inválidos".to_string()),
            field_errors,
        },
        s if s >= 500 => HubError::ServerFaultError {
            status,
            message: message.unwrap_or_else(|| format!("Erro no servidor (HTTP {})", status)),
        },
        _ => HubError::ServerFaultError {
            status,
            message: message.unwrap_or_else(|| format!("HTTP {}", status)),
        },
    }
}
