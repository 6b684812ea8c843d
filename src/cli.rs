//! Interface de linha de comando do funil baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (move, status, watch,
//! demo) e flags globais (--interval-ms, --max-attempts, --verbose).

use clap::{Parser, Subcommand};

/// funil — Orquestrador de transições de estágio do ciclo de vida de ideias.
#[derive(Debug, Parser)]
#[command(name = "funil", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Intervalo entre leituras de polling, em milissegundos.
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Número máximo de leituras antes de desistir da espera.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move uma ideia para outro estágio, executando os jobs de apoio.
    Move {
        /// Identificador da ideia no armazenamento.
        idea_id: String,

        /// Estágio de destino (suggested, deep_dive, iterating, considering, closed).
        to: String,

        /// Motivo do encerramento, exigido ao mover para `closed`.
        /// Sem esta flag o motivo é perguntado no terminal.
        #[arg(long)]
        reason: Option<String>,
    },

    /// Lista as ideias do quadro agrupadas por estágio.
    Status,

    /// Runs the background reconciliation loop, printing the board on each pass.
    Watch,

    /// Executa a demonstração embutida contra um armazenamento em memória.
    Demo,
}
