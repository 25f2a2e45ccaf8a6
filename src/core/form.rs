//! Submission state machine shared by the dashboard forms.

use crate::domain::ports::Mutator;
use crate::utils::error::HubError;
use crate::utils::validation::{require_date_order, require_field, require_form_url};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormError {
    /// Messages attached to a known form field.
    pub field_errors: BTreeMap<String, String>,
    /// Anything that could not be attached to a field.
    pub banner: Option<String>,
}

impl FormError {
    fn from_client(errors: &[HubError]) -> Self {
        let mut out = FormError::default();
        for e in errors {
            match e {
                HubError::ClientValidationError { field, reason } => {
                    out.field_errors
                        .entry(field.clone())
                        .or_insert_with(|| reason.clone());
                }
                other => out.banner = Some(other.user_friendly_message()),
            }
        }
        out
    }

    fn from_server(error: &HubError, known_fields: &[&str]) -> Self {
        let mut out = FormError::default();
        let mut unmatched = Vec::new();

        if let Some(fields) = error.field_errors() {
            for (field, messages) in fields {
                if known_fields.contains(&field.as_str()) {
                    out.field_errors.insert(field.clone(), messages.join(" "));
                } else {
                    unmatched.push(format!("{}: {}", field, messages.join(" ")));
                }
            }
        }

        if out.field_errors.is_empty() {
            out.banner = Some(error.user_friendly_message());
        } else if !unmatched.is_empty() {
            out.banner = Some(unmatched.join("; "));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Validating,
    Submitting,
    Success(Value),
    Error(FormError),
}

pub trait FormModel {
    const KNOWN_FIELDS: &'static [&'static str];

    fn resource(&self) -> &str;

    /// Every client-side violation; empty when the form may be sent.
    fn check(&self) -> Vec<HubError>;

    fn payload(&self) -> Value;
}

#[derive(Debug, Default)]
pub struct FormController {
    state: FormState,
    last_error: Option<HubError>,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = FormState::Idle;
        self.last_error = None;
    }

    /// The error behind the current `Error` state, with every server field message intact.
    pub fn take_error(&mut self) -> Option<HubError> {
        self.last_error.take()
    }

    /// Validates locally, then submits. Invalid forms never reach the network.
    pub async fn submit<F, M>(&mut self, form: &F, mutator: &M) -> &FormState
    where
        F: FormModel,
        M: Mutator + ?Sized,
    {
        self.last_error = None;
        self.state = FormState::Validating;
        let errors = form.check();
        if !errors.is_empty() {
            tracing::debug!("Form blocked by {} validation errors", errors.len());
            self.state = FormState::Error(FormError::from_client(&errors));
            self.last_error = errors.into_iter().next();
            return &self.state;
        }

        self.state = FormState::Submitting;
        self.state = match mutator.submit(form.resource(), &form.payload()).await {
            Ok(value) => FormState::Success(value),
            Err(e) => {
                tracing::error!("❌ Submit to {} failed: {}", form.resource(), e);
                let state = FormState::Error(FormError::from_server(&e, F::KNOWN_FIELDS));
                self.last_error = Some(e);
                state
            }
        };
        &self.state
    }
}

/// Ad-boosting (engajamento) order.
#[derive(Debug, Clone, Serialize)]
pub struct EngajamentoForm {
    pub url: String,
    pub quantidade: u32,
    pub tipo: String,
}

impl FormModel for EngajamentoForm {
    const KNOWN_FIELDS: &'static [&'static str] = &["url", "quantidade", "tipo"];

    fn resource(&self) -> &str {
        "engajamentos/pedidos/"
    }

    fn check(&self) -> Vec<HubError> {
        let mut errors: Vec<HubError> = [
            require_form_url("url", &self.url).err(),
            require_field("tipo", &self.tipo).err(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if self.quantidade == 0 {
            errors.push(HubError::client_validation("quantidade", "Informe uma quantidade maior que zero"));
        }
        errors
    }

    fn payload(&self) -> Value {
        serde_json::json!({
            "url": self.url.trim(),
            "quantidade": self.quantidade,
            "tipo": self.tipo,
        })
    }
}

/// AI project registration.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectForm {
    pub nome: String,
    pub status: String,
    pub criadores: Vec<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

impl FormModel for ProjectForm {
    const KNOWN_FIELDS: &'static [&'static str] =
        &["nome", "status", "criadores", "data_inicio", "data_fim"];

    fn resource(&self) -> &str {
        "aiprojects/"
    }

    fn check(&self) -> Vec<HubError> {
        let mut errors: Vec<HubError> = [
            require_field("nome", &self.nome).err(),
            require_field("status", &self.status).err(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if let (Some(start), Some(end)) = (self.data_inicio, self.data_fim) {
            errors.extend(require_date_order("data_fim", start, end).err());
        }
        errors
    }

    fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        calls: AtomicUsize,
        reply: fn() -> Result<Value>,
    }

    #[async_trait]
    impl Mutator for FakeBackend {
        async fn submit(&self, _resource: &str, _payload: &Value) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn backend(reply: fn() -> Result<Value>) -> FakeBackend {
        FakeBackend {
            calls: AtomicUsize::new(0),
            reply,
        }
    }

    fn order(url: &str) -> EngajamentoForm {
        EngajamentoForm {
            url: url.to_string(),
            quantidade: 100,
            tipo: "curtidas".to_string(),
        }
    }

    #[tokio::test]
    async fn test_client_validation_blocks_network() {
        let backend = backend(|| Ok(Value::Null));
        let mut form = FormController::new();
        let state = form.submit(&order("nao-e-url"), &backend).await.clone();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        match state {
            FormState::Error(e) => assert_eq!(e.field_errors["url"], "URL inválida"),
            other => panic!("unexpected state {:?}", other),
        }
        assert!(matches!(
            form.take_error(),
            Some(HubError::ClientValidationError { ref field, .. }) if field == "url"
        ));
    }

    #[tokio::test]
    async fn test_success() {
        let backend = backend(|| Ok(serde_json::json!({"id": 42})));
        let mut form = FormController::new();
        let state = form.submit(&order("https://instagram.com/p/x1"), &backend).await;
        assert_eq!(*state, FormState::Success(serde_json::json!({"id": 42})));
        form.reset();
        assert_eq!(*form.state(), FormState::Idle);
    }

    #[tokio::test]
    async fn test_server_errors_map_to_known_fields() {
        let backend = backend(|| {
            let mut fields = BTreeMap::new();
            fields.insert("quantidade".to_string(), vec!["Máximo 5000".to_string()]);
            fields.insert("saldo".to_string(), vec!["Saldo insuficiente".to_string()]);
            Err(HubError::ServerValidationError {
                status: 400,
                message: "x".to_string(),
                field_errors: fields,
            })
        });
        let mut form = FormController::new();
        let state = form.submit(&order("https://instagram.com/p/x1"), &backend).await.clone();
        let FormState::Error(e) = state else {
            panic!("expected error state");
        };
        assert_eq!(e.field_errors["quantidade"], "Máximo 5000");
        assert_eq!(e.banner.as_deref(), Some("saldo: Saldo insuficiente"));

        let err = form.take_error().expect("server error kept");
        let fields = err.field_errors().expect("field errors");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["saldo"], vec!["Saldo insuficiente"]);
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::ServerValidation);
        assert!(form.take_error().is_none());
    }

    #[tokio::test]
    async fn test_server_fault_becomes_banner() {
        let backend = backend(|| {
            Err(HubError::ServerFaultError {
                status: 500,
                message: "Erro no servidor (HTTP 500)".to_string(),
            })
        });
        let mut form = FormController::new();
        let state = form.submit(&order("https://instagram.com/p/x1"), &backend).await.clone();
        let FormState::Error(e) = state else {
            panic!("expected error state");
        };
        assert!(e.field_errors.is_empty());
        assert!(e.banner.unwrap().contains("500"));
    }

    #[test]
    fn test_project_date_order() {
        let form = ProjectForm {
            nome: "Bot".to_string(),
            status: "ativo".to_string(),
            criadores: vec!["Ana".to_string()],
            data_inicio: NaiveDate::from_ymd_opt(2024, 3, 1),
            data_fim: NaiveDate::from_ymd_opt(2024, 2, 1),
        };
        let errors = form.check();
        assert_eq!(errors.len(), 1);
        assert_eq!(form.payload()["data_inicio"], "2024-03-01");
    }
}
