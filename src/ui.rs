//! Interface de terminal do funil — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`TransitionProgress`] acompanha visualmente
//! uma transição de estágio e implementa o coletor de notificações
//! consumido pelo executor de cascata.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::IdeaStore;
use crate::lifecycle::Idea;
use crate::notify::{Notification, Notifier, NotifyKind};
use crate::orchestrator::{TransitionReport, TransitionState};
use crate::reconcile::Reconciler;

/// Indicador visual de progresso para uma transição no terminal.
///
/// Exibe um spinner animado enquanto os jobs de apoio executam e mensagens
/// coloridas para sucesso (verde), falha (vermelho) e timeout (amarelo).
/// Clonar compartilha a mesma barra de progresso subjacente.
#[derive(Clone)]
pub struct TransitionProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para avisos e timeouts.
    yellow: Style,
}

impl TransitionProgress {
    /// Inicia o spinner com o título da ideia e retorna a instância de progresso.
    pub fn start(idea_title: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("MOVING: {idea_title}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resultado da transição.
    pub fn finish(&self, report: &TransitionReport) {
        self.pb.finish_and_clear();
        match report.state {
            TransitionState::Committed => {
                println!("  {} {}", self.green.apply_to("✓"), report.message);
            }
            _ => {
                println!("  {} {}", self.red.apply_to("✗"), report.message);
            }
        }
    }

    /// Imprime o relatório estruturado em JSON com estilo colorido.
    pub fn print_report(&self, report: &TransitionReport) {
        let status_style = match report.state {
            TransitionState::Committed => &self.green,
            TransitionState::RolledBack => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", status_style.apply_to("─── Transition Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl Notifier for TransitionProgress {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotifyKind::Started => {
                self.pb
                    .set_message(format!("{}: {}", notification.job, notification.idea_title));
            }
            NotifyKind::Completed => {
                self.pb.println(format!(
                    "  {} {} completed",
                    self.green.apply_to("✓"),
                    notification.job
                ));
            }
            NotifyKind::TimedOut => {
                self.pb.println(format!(
                    "  {} {} timed out waiting for results",
                    self.yellow.apply_to("⏱"),
                    notification.job
                ));
            }
            NotifyKind::Failed => {
                self.pb.println(format!(
                    "  {} {} failed",
                    self.red.apply_to("✗"),
                    notification.job
                ));
            }
        }
    }
}

/// Imprime o quadro de ideias agrupado por estágio.
pub fn print_board<S: IdeaStore>(reconciler: &Reconciler<S>) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    for (stage, count) in reconciler.counts_by_stage() {
        println!("{} ({count})", bold.apply_to(stage.to_string()));
        for idea in reconciler.snapshot() {
            if idea.status == stage {
                println!("  - {} {}", idea.title, dim.apply_to(format!("[{}]", idea.id)));
            }
        }
    }
}

/// Pergunta o motivo do encerramento no terminal.
/// Uma linha vazia significa que o usuário desistiu do encerramento.
pub fn prompt_closure_reason(idea: &Idea) -> std::io::Result<Option<String>> {
    let term = console::Term::stderr();
    term.write_str(&format!(
        "Closing \"{}\" — reason (empty line aborts): ",
        idea.title
    ))?;
    let line = term.read_line()?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    })
}
