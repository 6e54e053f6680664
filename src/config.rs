//! Configuração carregada de `migrate.toml` e combinada com a linha de comando.
//!
//! [`MigrateConfig`] é a camada do arquivo; toda chave é opcional e usa um
//! default embutido quando ausente. [`Settings`] é a visão resolvida com que o
//! binário roda: flags da CLI têm precedência, depois `OJ_USERNAME`/`OJ_PASSWORD`
//! para credenciais, depois o arquivo.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::api::{ActionKind, DEFAULT_BASE_URL};
use crate::cli::Cli;
use crate::error::MigrateError;
use crate::pipeline::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONSUMERS, DEFAULT_QUEUE_CAPACITY, PipelinePlan,
};

pub const USERNAME_ENV: &str = "OJ_USERNAME";
pub const PASSWORD_ENV: &str = "OJ_PASSWORD";

const DEFAULT_OFFSET: u64 = 0;
const DEFAULT_COUNT: u64 = 10;

/// Conteúdo de `migrate.toml`.
#[derive(Clone, Deserialize)]
pub struct MigrateConfig {
    /// Raiz da API, sem barra final.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Tamanho de página por requisição de listagem.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Ids em buffer entre o produtor e os workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Tamanho do pool de workers quando `--consumers` não é informado.
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Ações por submissão quando nenhum `--action` é informado.
    #[serde(default = "default_actions")]
    pub actions: Vec<ActionKind>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

// Valor padrão para a raiz da API: "http://localhost:8080/api".
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Valor padrão para o tamanho de página: 100.
fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

// Valor padrão para a capacidade da fila: 1000.
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

// Valor padrão para o número de workers: 5.
fn default_consumers() -> usize {
    DEFAULT_CONSUMERS
}

// Valor padrão para as ações: apenas `migrate-code`.
fn default_actions() -> Vec<ActionKind> {
    vec![ActionKind::Code]
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chunk_size: default_chunk_size(),
            queue_capacity: default_queue_capacity(),
            consumers: default_consumers(),
            actions: default_actions(),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for MigrateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrateConfig")
            .field("base_url", &self.base_url)
            .field("chunk_size", &self.chunk_size)
            .field("queue_capacity", &self.queue_capacity)
            .field("consumers", &self.consumers)
            .field("actions", &self.actions)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl MigrateConfig {
    /// Carrega `path`, ou os valores padrão se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self, MigrateError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Configuração de execução totalmente resolvida.
#[derive(Clone)]
pub struct Settings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub plan: PipelinePlan,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("plan", &self.plan)
            .finish()
    }
}

impl Settings {
    /// Combina a linha de comando, o ambiente (consultado via `env`) e a
    /// camada do arquivo.
    pub fn resolve(
        cli: &Cli,
        config: MigrateConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MigrateError> {
        let username = first_non_empty([cli.username.clone(), env(USERNAME_ENV), config.username])
            .ok_or(MigrateError::MissingCredentials)?;
        let password = first_non_empty([cli.password.clone(), env(PASSWORD_ENV), config.password])
            .ok_or(MigrateError::MissingCredentials)?;

        let offset = window_arg(
            cli.offset,
            cli.positional_offset.as_deref(),
            "offset",
            DEFAULT_OFFSET,
        );
        let count = window_arg(
            cli.count,
            cli.positional_count.as_deref(),
            "count",
            DEFAULT_COUNT,
        );

        let consumers = cli.consumers.unwrap_or(config.consumers);
        if consumers == 0 {
            return Err(MigrateError::Config("consumers must be at least 1".into()));
        }
        if config.chunk_size == 0 {
            return Err(MigrateError::Config("chunk_size must be at least 1".into()));
        }
        if config.queue_capacity == 0 {
            return Err(MigrateError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }

        let actions = if cli.actions.is_empty() {
            config.actions
        } else {
            cli.actions.iter().copied().map(ActionKind::from).collect()
        };
        let actions = dedup_in_order(actions);
        if actions.is_empty() {
            return Err(MigrateError::Config(
                "at least one action must be configured".into(),
            ));
        }

        Ok(Self {
            base_url: config.base_url,
            username,
            password,
            plan: PipelinePlan {
                offset,
                count,
                chunk_size: config.chunk_size,
                queue_capacity: config.queue_capacity,
                consumers,
                actions,
            },
        })
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}

// A flag sempre vence; o posicional só é usado sem a flag e é ignorado com
// um aviso se não for um número válido.
fn window_arg(flag: Option<u64>, positional: Option<&str>, name: &str, default: u64) -> u64 {
    if let Some(value) = flag {
        return value;
    }
    match positional.map(str::parse::<u64>) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            warn!(
                argument = name,
                error = %e,
                "could not parse positional argument, using default or flag value"
            );
            default
        }
        None => default,
    }
}

fn dedup_in_order(actions: Vec<ActionKind>) -> Vec<ActionKind> {
    let mut seen = Vec::with_capacity(actions.len());
    for action in actions {
        if !seen.contains(&action) {
            seen.push(action);
        }
    }
    seen
}
