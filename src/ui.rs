//! Relatório de terminal ao fim da execução.
//!
//! Usa `console` para saída colorida. Verde quando toda migração foi aceita,
//! amarelo quando alguma foi recusada e vermelho quando o produtor parou por
//! falha ao buscar uma página.

use console::Style;

use crate::pipeline::{ProducerState, RunSummary};

/// Estilo do título para uma execução concluída.
fn summary_style(summary: &RunSummary) -> Style {
    if summary.producer_state == ProducerState::Failed {
        Style::new().red().bold()
    } else if summary.actions_failed > 0 {
        Style::new().yellow().bold()
    } else {
        Style::new().green().bold()
    }
}

fn headline(summary: &RunSummary) -> String {
    format!(
        "{} submission(s) processed, {}/{} migration(s) accepted, producer {}",
        summary.records_processed,
        summary.actions_succeeded,
        summary.actions_invoked(),
        summary.producer_state,
    )
}

/// Imprime o título e o resumo completo como JSON formatado.
pub fn print_summary(summary: &RunSummary) {
    let style = summary_style(summary);
    println!();
    println!("{}", style.apply_to("─── Migration Summary ───"));
    println!("{}", style.apply_to(headline(summary)));
    println!(
        "{}",
        serde_json::to_string_pretty(summary).unwrap_or_default()
    );
}
