use crate::adapters::http::{ClientSettings, Session};
use crate::core::aggregate::{RatioSpec, SummarySpec, DEFAULT_TOP_N};
use crate::core::debounce::DEFAULT_SEARCH_DEBOUNCE;
use crate::core::filter::FilterFields;
use crate::core::sort::SortState;
use crate::domain::schema::RecordSchema;
use crate::utils::error::{HubError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static env var pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub chat_widget: Option<ChatWidgetConfig>,
    #[serde(default)]
    pub views: Vec<ViewDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub csrf_path: Option<String>,
    pub session_cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
        }
    }
}

/// The embedded chat widget only needs its fixed webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatWidgetConfig {
    pub webhook_url: String,
}

/// One tabular page: where its records live and how they are filtered and summarised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
    pub resource: String,
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default = "default_status_field")]
    pub status_field: String,
    #[serde(default)]
    pub status_vocabulary: Vec<String>,
    pub creator_field: Option<String>,
    pub date_field: Option<String>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    pub sum_field: Option<String>,
    pub group_field: Option<String>,
    #[serde(default)]
    pub ratios: Vec<RatioSpec>,
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    pub precision: Option<u32>,
    pub top_n: Option<usize>,
    pub default_sort: Option<SortState>,
}

fn default_key_field() -> String {
    "id".to_string()
}

fn default_status_field() -> String {
    "status".to_string()
}

impl ViewDefinition {
    pub fn filter_fields(&self) -> FilterFields {
        FilterFields {
            status_field: self.status_field.clone(),
            creator_field: self.creator_field.clone(),
            date_field: self.date_field.clone(),
            search_fields: self.search_fields.clone(),
        }
    }

    pub fn summary_spec(&self) -> SummarySpec {
        SummarySpec {
            status_field: self.status_field.clone(),
            status_vocabulary: self.status_vocabulary.clone(),
            sum_field: self.sum_field.clone(),
            group_field: self.group_field.clone().or_else(|| self.creator_field.clone()),
            ratios: self.ratios.clone(),
            precision: self.precision(),
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
        }
    }

    pub fn schema(&self) -> RecordSchema {
        self.required_columns
            .iter()
            .fold(RecordSchema::new(&self.key_field), |s, c| s.require(c))
    }

    pub fn precision(&self) -> u32 {
        self.precision.unwrap_or(1)
    }
}

impl HubConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HubError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| HubError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn view(&self, name: &str) -> Result<&ViewDefinition> {
        self.views.iter().find(|v| v.name == name).ok_or_else(|| HubError::ConfigError {
            message: format!(
                "Unknown view '{}'. Configured views: {}",
                name,
                self.views.iter().map(|v| v.name.as_str()).collect::<Vec<_>>().join(", ")
            ),
        })
    }

    pub fn session(&self) -> Session {
        let mut session = Session::new(&self.api.base_url);
        session.session_cookie = self
            .api
            .session_cookie
            .clone()
            .filter(|c| !c.is_empty() && !c.starts_with("${"));
        session
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            timeout: self
                .api
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            csrf_path: self.api.csrf_path.clone().unwrap_or(defaults.csrf_path),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

impl Validate for HubConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        if let Some(timeout) = self.api.timeout_seconds {
            validate_range("api.timeout_seconds", timeout, 1, 600)?;
        }
        validate_positive_number("search.debounce_ms", self.search.debounce_ms as usize, 1)?;
        if let Some(chat) = &self.chat_widget {
            validate_url("chat_widget.webhook_url", &chat.webhook_url)?;
        }

        let mut names = HashSet::new();
        for view in &self.views {
            validate_non_empty_string("views.name", &view.name)?;
            validate_non_empty_string(&format!("views.{}.resource", view.name), &view.resource)?;
            validate_non_empty_string(&format!("views.{}.key_field", view.name), &view.key_field)?;
            if let Some(p) = view.precision {
                validate_range(&format!("views.{}.precision", view.name), p, 0, 6)?;
            }
            if !names.insert(view.name.as_str()) {
                return Err(HubError::InvalidConfigValueError {
                    field: "views.name".to_string(),
                    value: view.name.clone(),
                    reason: "Duplicate view name".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sort::SortDirection;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[api]
base_url = "https://hub.example.com/api"
timeout_seconds = 20

[chat_widget]
webhook_url = "https://n8n.example.com/webhook/chat"

[[views]]
name = "projetos"
resource = "aiprojects/"
status_vocabulary = ["ativo", "arquivado"]
creator_field = "criadores_nomes"
date_field = "data_criacao"
search_fields = ["nome", "descricao"]
columns = ["id", "nome", "status"]
default_sort = { column = "nome", direction = "desc" }

[[views.ratios]]
name = "ativos"
numerator = ["ativo"]
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = HubConfig::from_toml_str(BASIC).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.client_settings().timeout, Duration::from_secs(20));
        assert_eq!(config.client_settings().csrf_path, "ensure-csrf/");

        let view = config.view("projetos").unwrap();
        assert_eq!(view.key_field, "id");
        assert_eq!(view.default_sort.as_ref().unwrap().direction, SortDirection::Desc);
        let spec = view.summary_spec();
        assert_eq!(spec.group_field.as_deref(), Some("criadores_nomes"));
        assert_eq!(spec.ratios[0].numerator, vec!["ativo"]);
        assert!(config.view("inexistente").is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CHEGOU_TEST_BASE_URL", "https://test.api.com");

        let config = HubConfig::from_toml_str(
            r#"
[api]
base_url = "${CHEGOU_TEST_BASE_URL}"
session_cookie = "${CHEGOU_TEST_UNSET_COOKIE}"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://test.api.com");
        assert_eq!(config.session().session_cookie, None);

        std::env::remove_var("CHEGOU_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = HubConfig::from_toml_str("[api]\nbase_url = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let dup = format!("{}\n[[views]]\nname = \"projetos\"\nresource = \"x/\"\n", BASIC);
        let config = HubConfig::from_toml_str(&dup).unwrap();
        assert!(matches!(
            config.validate(),
            Err(HubError::InvalidConfigValueError { ref reason, .. }) if reason == "Duplicate view name"
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();
        let config = HubConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.views.len(), 1);
    }
}
