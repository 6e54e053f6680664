//! Tipos de erro do cliente da API de submissões.
//!
//! [`ApiError`] cobre as falhas que interrompem quem chama: login recusado,
//! listagem que não respondeu 200, corpo de listagem que não decodifica e
//! falhas de transporte. Ações de migração nunca produzem `ApiError`; suas
//! falhas são reportadas como valores de
//! [`ActionOutcome`](super::types::ActionOutcome).

use thiserror::Error;

/// Erros retornados pelo login e pela busca de páginas.
#[derive(Debug, Error)]
pub enum ApiError {
    /// O endpoint de login respondeu com algo diferente de HTTP 200.
    #[error("login failed: status code {status}, body: {body}")]
    Auth { status: u16, body: String },

    /// O endpoint de listagem respondeu com algo diferente de HTTP 200.
    #[error("failed to fetch submissions: status code {status}")]
    Fetch { status: u16 },

    /// O corpo da listagem não era o envelope JSON esperado.
    #[error("failed to decode submission response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Falha de conexão, DNS ou timeout abaixo do HTTP.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Status HTTP associado ao erro, se o servidor chegou a responder.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. } | ApiError::Fetch { status } => Some(*status),
            ApiError::Decode(_) | ApiError::Network(_) => None,
        }
    }
}
