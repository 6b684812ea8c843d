//! Tipos de erro para o cliente da API de ideias.
//!
//! Define [`ApiError`] com variantes para registro inexistente, erros da API
//! e falhas de rede. Usa `thiserror` para derivar `Display` e `Error`
//! automaticamente a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o backend de ideias.
///
/// As variantes cobrem os cenários de falha relevantes para o orquestrador:
/// - [`NotFound`](ApiError::NotFound) — o servidor retornou HTTP 404; a ideia
///   não existe mais no armazenamento (caminho "idea vanished")
/// - [`Request`](ApiError::Request) — qualquer outro erro HTTP (4xx/5xx),
///   incluindo falhas de validação ao disparar um job
/// - [`Network`](ApiError::Network) — falha na camada de rede
/// - [`Parse`](ApiError::Parse) — resposta com corpo inesperado
#[derive(Debug, Error)]
pub enum ApiError {
    /// O servidor retornou HTTP 404 para a ideia indicada.
    #[error("idea not found: {0}")]
    NotFound(String),

    /// Erro retornado pela API (ex.: 422 validação, 500 erro interno).
    /// Contém o código de status HTTP e a mensagem de erro do corpo da resposta.
    #[error("API error (status {status}): {message}")]
    Request { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Corpo de resposta que não pôde ser desserializado.
    #[error("failed to parse API response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Verdadeiro quando o erro significa que a ideia sumiu do armazenamento.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}
