use askql_core::{Column, TableSchema};
use askql_llm::{gemini, openai, PromptExample, ProviderOptions};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub schema: SchemaConfig,
    pub prompt: PromptConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Frontend origins allowed to call the API; `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenAi,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Takes precedence over the individual connection fields below.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub max_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    pub max_question_chars: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub hidden_columns: Vec<String>,
    pub humanize_columns: bool,
    pub drop_empty_values: bool,
    pub raw_data_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchemaConfig {
    /// Read tables from `information_schema`; otherwise only `tables` is used.
    pub discover: bool,
    pub schema_name: String,
    pub sample_values: usize,
    pub sample_columns: usize,
    pub exclude_columns: Vec<String>,
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub dialect: String,
    pub hints: Vec<String>,
    pub examples: Vec<ExampleConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExampleConfig {
    pub question: String,
    pub sql: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".into(),
            cors_origins: vec![
                "http://localhost:5173".into(),
                "http://localhost:3000".into(),
            ],
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:9898".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: None,
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            temperature: 0.1,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            name: None,
            user: None,
            password: None,
            max_connections: 8,
            acquire_timeout_secs: 5,
            query_timeout_secs: 15,
            max_rows: 1000,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_question_chars: 2000,
            default_limit: 50,
            max_limit: 500,
            hidden_columns: Vec::new(),
            humanize_columns: false,
            drop_empty_values: false,
            raw_data_rows: 10,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            discover: true,
            schema_name: "public".into(),
            sample_values: 2,
            sample_columns: 10,
            exclude_columns: vec!["created_at".into(), "updated_at".into()],
            tables: Vec::new(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dialect: "PostgreSQL".into(),
            hints: vec![
                "Use ILIKE with % wildcards for flexible text matching.".into(),
                "If no exact match is likely, prefer broader ILIKE terms.".into(),
            ],
            examples: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl Config {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads the file (if any), applies environment overrides once, and validates.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = lookup("DB_HOST") {
            self.database.host = Some(host);
        }
        if let Some(port) = lookup("DB_PORT") {
            let port = port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_PORT is not a valid port: {port}"))?;
            self.database.port = Some(port);
        }
        if let Some(name) = lookup("DB_NAME") {
            self.database.name = Some(name);
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = Some(password);
        }

        let provider_key = match self.llm.provider {
            LlmProvider::Gemini => "GOOGLE_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        };
        if let Some(key) = lookup("ASKQL_LLM_API_KEY").or_else(|| lookup(provider_key)) {
            self.llm.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("ASKQL_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if let Some(addr) = lookup("ASKQL_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(anyhow::anyhow!("llm api key missing"));
        }
        self.database.connect_options()?;
        if self.llm.timeout_secs == 0 || self.database.query_timeout_secs == 0 {
            return Err(anyhow::anyhow!("timeouts must be greater than zero"));
        }
        if self.query.max_question_chars == 0 {
            return Err(anyhow::anyhow!("query.max_question_chars must be greater than zero"));
        }
        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(anyhow::anyhow!(format!(
                "query.default_limit must be between 1 and max_limit ({})",
                self.query.max_limit
            )));
        }
        if self.database.max_rows == 0 {
            return Err(anyhow::anyhow!("database.max_rows must be greater than zero"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("database.max_connections must be greater than zero"));
        }
        if !self.schema.discover && self.schema.tables.is_empty() {
            return Err(anyhow::anyhow!(
                "schema discovery disabled but no schema.tables configured"
            ));
        }
        for table in &self.schema.tables {
            if table.name.trim().is_empty() {
                return Err(anyhow::anyhow!("schema table with empty name"));
            }
        }
        Ok(())
    }

    pub fn provider_options(&self) -> ProviderOptions {
        let (endpoint, model) = match self.llm.provider {
            LlmProvider::Gemini => (gemini::DEFAULT_ENDPOINT, gemini::DEFAULT_MODEL),
            LlmProvider::OpenAi => (openai::DEFAULT_ENDPOINT, openai::DEFAULT_MODEL),
        };
        ProviderOptions {
            api_key: self.llm.api_key.clone().unwrap_or_default(),
            model: self.llm.model.clone().unwrap_or_else(|| model.to_string()),
            endpoint: self.llm.endpoint.clone().unwrap_or_else(|| endpoint.to_string()),
            timeout: Duration::from_secs(self.llm.timeout_secs),
            temperature: self.llm.temperature,
        }
    }

    /// Configured tables as schema entries, in file order.
    pub fn schema_tables(&self) -> Vec<TableSchema> {
        self.schema
            .tables
            .iter()
            .map(|table| TableSchema {
                name: table.name.clone(),
                description: table.description.clone(),
                record_count: None,
                columns: table
                    .columns
                    .iter()
                    .map(|c| Column {
                        name: c.name.clone(),
                        data_type: c.data_type.clone(),
                        nullable: true,
                        description: c.description.clone(),
                        samples: Vec::new(),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn prompt_examples(&self) -> Vec<PromptExample> {
        self.prompt
            .examples
            .iter()
            .map(|e| PromptExample {
                question: e.question.clone(),
                sql: e.sql.clone(),
            })
            .collect()
    }
}

impl DatabaseConfig {
    fn has_parts(&self) -> bool {
        self.host.is_some()
            || self.port.is_some()
            || self.name.is_some()
            || self.user.is_some()
            || self.password.is_some()
    }

    /// `url` when set, otherwise the individual fields with local defaults.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse()
                .map_err(|err| anyhow::anyhow!("invalid database url: {err}"));
        }
        if !self.has_parts() {
            return Err(anyhow::anyhow!(
                "database connection missing: set database.url, DATABASE_URL or DB_HOST"
            ));
        }
        let mut options = PgConnectOptions::new()
            .host(self.host.as_deref().unwrap_or("localhost"))
            .port(self.port.unwrap_or(5432))
            .username(self.user.as_deref().unwrap_or("postgres"))
            .database(self.name.as_deref().unwrap_or("llm_query_db"));
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}
