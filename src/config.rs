//! Configuração do funil carregada a partir de `funil.toml`.
//!
//! A struct [`FunilConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `FUNIL_API_URL` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::error::FunilError;
use crate::poller::Poller;

/// Configuração de nível superior carregada de `funil.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FunilConfig {
    /// URL base do backend de ideias.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Intervalo entre re-leituras durante a espera pelo deep-dive.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Número máximo de leituras antes de desistir da espera.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Período da reconciliação de fundo com o armazenamento completo.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

// Valor padrão para a URL do backend: o servidor local de desenvolvimento.
fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

// Valor padrão para o intervalo de polling: 2000ms.
fn default_poll_interval_ms() -> u64 {
    2000
}

// Valor padrão para o limite de tentativas: 30 (~60s de espera).
fn default_poll_max_attempts() -> u32 {
    30
}

// Valor padrão para o período de reconciliação: 10s.
fn default_reconcile_interval_ms() -> u64 {
    10_000
}

impl Default for FunilConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
        }
    }
}

impl FunilConfig {
    /// Carrega a configuração de `funil.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("funil.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FunilConfig>(&contents)
                .map_err(|e| FunilError::Config(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(url) = std::env::var("FUNIL_API_URL")
            && !url.is_empty()
        {
            config.api_base_url = url;
        }

        Ok(config)
    }

    /// O poller de conclusão configurado por este arquivo.
    pub fn poller(&self) -> Poller {
        Poller::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }

    /// O período da reconciliação de fundo.
    pub fn reconcile_period(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}
