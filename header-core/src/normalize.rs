//! # Normalização do Registro
//!
//! Passos, sempre nesta ordem:
//!
//! 1. título e resumo deshifenizados; um "1" solto no início do título é removido
//! 2. identificação de idioma sobre título + resumo, completada com o corpo do
//!    documento quando a amostra é curta; o idioma vai para o registro e para o documento
//! 3. palavras-chave limpas e segmentadas
//! 4. DOI: só quando exatamente um candidato foi encontrado no documento
//! 5. consolidação externa (opcional, nunca fatal)
//! 6. datas de publicação, submissão, download e servidor normalizadas,
//!    guardando o primeiro candidato de cada uma

use tracing::debug;

use crate::config::HeaderConfig;
use crate::consolidation::{consolidate, ConsolidationOutcome};
use crate::error::{HeaderError, Result};
use crate::layout::Document;
use crate::parsers::{Consolidator, DateParser, LanguageIdentifier};
use crate::pipeline::PipelineStage;
use crate::record::{clean_keywords, segment_keywords, BiblioRecord, Date};
use crate::text::{collapse_whitespace, dehyphenize, dehyphenize_hard};

/// Remove o artefato "1" do início de um título já aparado.
pub fn strip_title_artifact(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() > 1 {
        if let Some(rest) = trimmed.strip_prefix('1') {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Amostra de texto para identificação de idioma.
pub fn language_sample(record: &BiblioRecord, doc: &Document, threshold: usize) -> String {
    let mut sample = String::new();
    if let Some(title) = &record.title {
        sample.push_str(title);
    }
    if let Some(abstract_text) = &record.abstract_text {
        sample.push('\n');
        sample.push_str(abstract_text);
    }
    if sample.chars().count() < threshold {
        let body = doc.zone_text(&doc.body_ranges());
        if !body.is_empty() {
            sample.push(' ');
            sample.push_str(&body);
        }
    }
    sample
}

/// Normalizador de um documento
pub struct Normalizer<'a> {
    pub config: &'a HeaderConfig,
    pub language: &'a dyn LanguageIdentifier,
    pub dates: &'a dyn DateParser,
    pub consolidator: &'a dyn Consolidator,
}

impl<'a> Normalizer<'a> {
    /// Executa todos os passos; devolve o resultado da consolidação.
    pub fn normalize(
        &self,
        record: &mut BiblioRecord,
        doc: &mut Document,
    ) -> Result<ConsolidationOutcome> {
        self.clean_text_fields(record);
        self.identify_language(record, doc);
        normalize_keywords(record);
        assign_single_doi(record, doc);
        let outcome = consolidate(record, self.config.consolidate, self.consolidator);
        self.normalize_dates(record)?;
        debug!(?outcome, language = ?record.language, "registro normalizado");
        Ok(outcome)
    }

    fn clean_text_fields(&self, record: &mut BiblioRecord) {
        if let Some(abstract_text) = record.abstract_text.take() {
            record.abstract_text = Some(dehyphenize_hard(&abstract_text));
        }
        if let Some(title) = record.title.take() {
            record.title = Some(dehyphenize(&title));
        }
        record.clean_title();
        if let Some(title) = record.title.take() {
            let title = strip_title_artifact(&title);
            record.title = (!title.is_empty()).then_some(title);
        }
    }

    fn identify_language(&self, record: &mut BiblioRecord, doc: &mut Document) {
        let sample = language_sample(record, doc, self.config.language_sample_threshold);
        if let Some(lang) = self.language.identify(&sample) {
            doc.language = Some(lang.clone());
            record.language = Some(lang);
        }
    }

    fn normalize_dates(&self, record: &mut BiblioRecord) -> Result<()> {
        record.normalized_publication_date = self.first_date(&record.publication_date)?;
        record.normalized_submission_date = self.first_date(&record.submission_date)?;
        record.normalized_download_date = self.first_date(&record.download_date)?;
        record.normalized_server_date = self.first_date(&record.server_date)?;
        Ok(())
    }

    fn first_date(&self, raw: &Option<String>) -> Result<Option<Date>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let candidates = self
            .dates
            .parse(raw)
            .map_err(|e| HeaderError::stage(PipelineStage::Normalized, e))?;
        Ok(candidates.into_iter().next())
    }
}

/// Palavras-chave: deshifenização, limpeza do prefixo e segmentação
pub fn normalize_keywords(record: &mut BiblioRecord) {
    let Some(raw) = record.keyword.take() else {
        return;
    };
    let cleaned = clean_keywords(&dehyphenize(&raw));
    let keywords = segment_keywords(&cleaned);
    record.keyword = Some(collapse_whitespace(&cleaned));
    if !keywords.is_empty() {
        record.keywords = keywords;
    }
}

/// Atribui o DOI quando o documento tem exatamente um candidato.
pub fn assign_single_doi(record: &mut BiblioRecord, doc: &Document) {
    let candidates = doc.doi_matches();
    if let [doi] = candidates.as_slice() {
        record.doi = Some(doi.clone());
    } else if candidates.len() > 1 {
        debug!(candidates = candidates.len(), "DOI ambíguo, campo não preenchido");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::ConsolidationMode;
    use crate::error::ExternalError;
    use crate::layout::{BlockStyle, DocumentBuilder};

    struct FirstYear;

    impl DateParser for FirstYear {
        fn parse(&self, text: &str) -> Result<Vec<Date>, ExternalError> {
            Ok(text
                .split(|c: char| !c.is_ascii_digit())
                .filter(|w| w.len() == 4)
                .filter_map(|w| w.parse().ok())
                .map(|year| Date {
                    year: Some(year),
                    raw: text.to_string(),
                    ..Default::default()
                })
                .collect())
        }
    }

    struct Fixed(Option<&'static str>);

    impl LanguageIdentifier for Fixed {
        fn identify(&self, _: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn no_match(_: &BiblioRecord) -> Result<Option<BiblioRecord>, ExternalError> {
        Ok(None)
    }

    fn doc_with(lines: &[&str]) -> Document {
        DocumentBuilder::new()
            .block(BlockStyle::new("F", 10.0), lines)
            .header_blocks(0, 1)
            .body_blocks(0, 1)
            .build()
    }

    fn run(record: &mut BiblioRecord, doc: &mut Document, config: &HeaderConfig) {
        let normalizer = Normalizer {
            config,
            language: &Fixed(Some("en")),
            dates: &FirstYear,
            consolidator: &no_match,
        };
        normalizer.normalize(record, doc).unwrap();
    }

    #[test]
    fn test_title_artifact_and_dehyphenation() {
        assert_eq!(strip_title_artifact("  1 Header Extraction "), "Header Extraction");
        assert_eq!(strip_title_artifact("1"), "1");

        let mut record = BiblioRecord {
            title: Some("1 Header extrac-\ntion".to_string()),
            abstract_text: Some("We pro-\npose a Multi-\nStage method".to_string()),
            ..Default::default()
        };
        run(&mut record, &mut doc_with(&["x"]), &HeaderConfig::default());
        assert_eq!(record.title.as_deref(), Some("Header extraction"));
        assert_eq!(record.abstract_text.as_deref(), Some("We propose a MultiStage method"));
    }

    #[test]
    fn test_language_sample_falls_back_to_body() {
        let doc = doc_with(&["Le corps du document"]);
        let record = BiblioRecord {
            title: Some("Titre".to_string()),
            ..Default::default()
        };
        let sample = language_sample(&record, &doc, 200);
        assert_eq!(sample, "Titre Le corps du document");

        let long = BiblioRecord {
            title: Some("t".repeat(250)),
            ..Default::default()
        };
        assert_eq!(language_sample(&long, &doc, 200).len(), 250);
    }

    #[test]
    fn test_language_is_set_on_record_and_document() {
        let mut record = BiblioRecord::default();
        let mut doc = doc_with(&["body"]);
        run(&mut record, &mut doc, &HeaderConfig::default());
        assert_eq!(record.language.as_deref(), Some("en"));
        assert_eq!(doc.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_single_doi_is_assigned() {
        let mut record = BiblioRecord::default();
        assign_single_doi(&mut record, &doc_with(&["doi: 10.1145/3292500.3330701."]));
        assert_eq!(record.doi.as_deref(), Some("10.1145/3292500.3330701"));
    }

    #[test]
    fn test_ambiguous_or_missing_doi_is_ignored() {
        let mut record = BiblioRecord::default();
        assign_single_doi(&mut record, &doc_with(&["10.1000/abc and 10.2000/xyz"]));
        assert!(record.doi.is_none());
        assign_single_doi(&mut record, &doc_with(&["no identifier here"]));
        assert!(record.doi.is_none());
    }

    #[test]
    fn test_dates_keep_first_candidate() {
        let mut record = BiblioRecord {
            publication_date: Some("Received 2018, published 2019".to_string()),
            submission_date: Some("no year".to_string()),
            ..Default::default()
        };
        run(&mut record, &mut doc_with(&["x"]), &HeaderConfig::default());
        assert_eq!(
            record.normalized_publication_date.as_ref().and_then(|d| d.year),
            Some(2018)
        );
        assert!(record.normalized_submission_date.is_none());
    }

    #[test]
    fn test_keywords_are_segmented() {
        let mut record = BiblioRecord {
            keyword: Some("Keywords: header \n metadata; digi-\ntal libraries".to_string()),
            ..Default::default()
        };
        normalize_keywords(&mut record);
        let texts: Vec<&str> = record.keywords.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["header metadata", "digital libraries"]);
    }

    #[test]
    fn test_consolidation_failure_keeps_record() {
        let failing = |_: &BiblioRecord| -> Result<Option<BiblioRecord>, ExternalError> {
            Err("indisponível".into())
        };
        let config = HeaderConfig {
            consolidate: ConsolidationMode::Correct,
            ..Default::default()
        };
        let normalizer = Normalizer {
            config: &config,
            language: &Fixed(None),
            dates: &FirstYear,
            consolidator: &failing,
        };
        let mut record = BiblioRecord {
            title: Some("Kept".to_string()),
            ..Default::default()
        };
        let outcome = normalizer.normalize(&mut record, &mut doc_with(&["x"])).unwrap();
        assert_eq!(outcome, ConsolidationOutcome::Failed);
        assert_eq!(record.title.as_deref(), Some("Kept"));
    }
}
