//! Tipos de dados para as respostas do backend de ideias.
//!
//! As structs derivam `Serialize` e `Deserialize` para conversão JSON
//! conforme o formato servido pelos endpoints `/ideas/*` do backend.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Idea;

/// Resposta do endpoint `GET /ideas/all` — a lista completa de ideias
/// mais um objeto de configuração opaco que o orquestrador ignora.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeasOut {
    /// Todas as ideias do usuário, em ordem arbitrária.
    pub ideas: Vec<Idea>,
    /// Configuração do quadro servida junto com a lista. Não interpretada aqui.
    #[serde(default)]
    pub config: serde_json::Value,
}
