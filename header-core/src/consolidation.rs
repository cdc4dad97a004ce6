//! # Consolidação Bibliográfica
//!
//! | Modo | Nível | Efeito |
//! |------|-------|--------|
//! | `Skip` | 0 | registro inalterado |
//! | `Correct` | 1 | campos autoritativos do registro externo sobrescrevem os locais |
//! | `InjectIdentifier` | 2 | só os identificadores ausentes são copiados |
//!
//! Falha do serviço nunca derruba o documento: o erro é registrado e o
//! registro segue sem consolidação.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parsers::Consolidator;
use crate::record::BiblioRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationMode {
    #[default]
    Skip,
    Correct,
    InjectIdentifier,
}

impl ConsolidationMode {
    /// Converte o nível numérico (0, 1, 2); níveis desconhecidos desligam a consolidação
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => ConsolidationMode::Correct,
            2 => ConsolidationMode::InjectIdentifier,
            _ => ConsolidationMode::Skip,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            ConsolidationMode::Skip => 0,
            ConsolidationMode::Correct => 1,
            ConsolidationMode::InjectIdentifier => 2,
        }
    }
}

/// O que a consolidação fez com o registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationOutcome {
    Skipped,
    NoMatch,
    Corrected,
    Injected { identifiers: usize },
    /// O serviço falhou; registro mantido sem consolidação
    Failed,
}

/// Aplica o modo de consolidação ao registro, rebaixando falhas.
pub fn consolidate(
    record: &mut BiblioRecord,
    mode: ConsolidationMode,
    consolidator: &dyn Consolidator,
) -> ConsolidationOutcome {
    if mode == ConsolidationMode::Skip {
        return ConsolidationOutcome::Skipped;
    }
    let external = match consolidator.consolidate(record) {
        Ok(Some(external)) => external,
        Ok(None) => {
            debug!("consolidação sem correspondência");
            return ConsolidationOutcome::NoMatch;
        }
        Err(e) => {
            warn!(error = %e, "consolidação falhou, mantendo registro extraído");
            return ConsolidationOutcome::Failed;
        }
    };
    match mode {
        ConsolidationMode::Correct => {
            record.correct(&external);
            ConsolidationOutcome::Corrected
        }
        ConsolidationMode::InjectIdentifier => ConsolidationOutcome::Injected {
            identifiers: record.inject_identifiers(&external),
        },
        ConsolidationMode::Skip => ConsolidationOutcome::Skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalError;

    fn extracted() -> BiblioRecord {
        BiblioRecord {
            title: Some("Header Extraction".to_string()),
            ..Default::default()
        }
    }

    fn matching(doi: Option<&str>) -> impl Consolidator {
        let doi = doi.map(str::to_string);
        move |_: &BiblioRecord| -> Result<Option<BiblioRecord>, ExternalError> {
            Ok(Some(BiblioRecord {
                title: Some("Header Extraction: Revised".to_string()),
                doi: doi.clone(),
                ..Default::default()
            }))
        }
    }

    #[test]
    fn test_skip_leaves_record_unchanged() {
        let mut record = extracted();
        let outcome = consolidate(&mut record, ConsolidationMode::Skip, &matching(Some("10.1/x")));
        assert_eq!(outcome, ConsolidationOutcome::Skipped);
        assert_eq!(record, extracted());
    }

    #[test]
    fn test_inject_without_external_identifier_is_noop() {
        let mut record = extracted();
        let outcome = consolidate(&mut record, ConsolidationMode::InjectIdentifier, &matching(None));
        assert_eq!(outcome, ConsolidationOutcome::Injected { identifiers: 0 });
        assert_eq!(record, extracted());
    }

    #[test]
    fn test_inject_copies_identifier_only() {
        let mut record = extracted();
        consolidate(&mut record, ConsolidationMode::InjectIdentifier, &matching(Some("10.1/x")));
        assert_eq!(record.doi.as_deref(), Some("10.1/x"));
        assert_eq!(record.title.as_deref(), Some("Header Extraction"));
    }

    #[test]
    fn test_correct_overwrites_title() {
        let mut record = extracted();
        let outcome = consolidate(&mut record, ConsolidationMode::Correct, &matching(None));
        assert_eq!(outcome, ConsolidationOutcome::Corrected);
        assert_eq!(record.title.as_deref(), Some("Header Extraction: Revised"));
    }

    #[test]
    fn test_failure_degrades_gracefully() {
        let failing = |_: &BiblioRecord| -> Result<Option<BiblioRecord>, ExternalError> {
            Err("timeout".into())
        };
        let mut record = extracted();
        let outcome = consolidate(&mut record, ConsolidationMode::Correct, &failing);
        assert_eq!(outcome, ConsolidationOutcome::Failed);
        assert_eq!(record, extracted());
    }

    #[test]
    fn test_levels() {
        assert_eq!(ConsolidationMode::from_level(2), ConsolidationMode::InjectIdentifier);
        assert_eq!(ConsolidationMode::from_level(9), ConsolidationMode::Skip);
        assert_eq!(ConsolidationMode::Correct.level(), 1);
    }
}
