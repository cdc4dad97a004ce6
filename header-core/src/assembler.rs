//! # Montagem do Registro a partir dos Clusters
//!
//! Cada rótulo tem uma política de fusão explícita em [`MERGE_RULES`]. O
//! montador percorre os clusters em ordem de documento e aplica a regra do
//! rótulo ao campo correspondente de [`BiblioRecord`]; rótulos sem regra
//! (`<other>`, rótulos desconhecidos) são ignorados.
//!
//! | Política | Efeito |
//! |----------|--------|
//! | `KeepFirst` | só a primeira ocorrência |
//! | `KeepLongest` | a variante textualmente mais longa |
//! | `Concat(sep)` | concatena com `sep` |
//! | `ConcatIfDistinct(sep)` | concatena se o conteúdo difere |
//! | `ConcatIfNotIncluded(sep)` | concatena se não estiver contido |
//! | `AuthorSegments` | tokens + token `\t` entre clusters |
//! | `Identifier` | PUBNUM com validação de identificador |
//!
//! O registro guarda o intervalo de tokens de cada cluster já fundido; um
//! cluster com intervalo conhecido é pulado, então reaplicar os mesmos
//! clusters sobre o registro não muda nada.

use serde::Serialize;
use tracing::debug;

use crate::cluster::LabelCluster;
use crate::labels::HeaderLabel;
use crate::layout::LayoutToken;
use crate::record::BiblioRecord;
use crate::text::{is_different_and_not_included, is_different_content};

/// Delimitador de segmentos de autores (texto e token)
pub const AUTHOR_SEGMENT_DELIMITER: &str = "\t";

/// Qual forma de texto do cluster a regra consome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentForm {
    /// Deshifenizado, quebras normalizadas
    Normalized,
    /// Concatenação exata dos tokens
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergePolicy {
    KeepFirst,
    KeepLongest,
    Concat(&'static str),
    ConcatIfDistinct(&'static str),
    ConcatIfNotIncluded(&'static str),
    AuthorSegments,
    Identifier,
}

/// Campo textual de destino no registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordField {
    Title,
    Authors,
    PublicationDate,
    SubmissionDate,
    DownloadDate,
    PageRange,
    Editors,
    Abstract,
    Reference,
    Keyword,
    Funding,
    Copyright,
    Note,
    Affiliation,
    Address,
    Email,
    Phone,
    Web,
    Pubnum,
    Meeting,
    Submission,
    DocumentType,
    WorkingGroup,
    Publisher,
    Journal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeRule {
    pub label: HeaderLabel,
    pub field: RecordField,
    pub policy: MergePolicy,
    pub form: ContentForm,
}

const fn rule(
    label: HeaderLabel,
    field: RecordField,
    policy: MergePolicy,
    form: ContentForm,
) -> MergeRule {
    MergeRule {
        label,
        field,
        policy,
        form,
    }
}

use ContentForm::{Normalized, Raw};
use MergePolicy::*;

/// Tabela completa de fusão por rótulo
pub static MERGE_RULES: [MergeRule; 25] = [
    rule(HeaderLabel::Title, RecordField::Title, KeepFirst, Normalized),
    rule(HeaderLabel::Author, RecordField::Authors, AuthorSegments, Raw),
    rule(HeaderLabel::Date, RecordField::PublicationDate, KeepLongest, Raw),
    rule(HeaderLabel::DateSubmission, RecordField::SubmissionDate, ConcatIfNotIncluded(" "), Raw),
    rule(HeaderLabel::DateDownload, RecordField::DownloadDate, ConcatIfNotIncluded(" "), Raw),
    rule(HeaderLabel::Page, RecordField::PageRange, KeepFirst, Normalized),
    rule(HeaderLabel::Editor, RecordField::Editors, Concat("\n"), Raw),
    rule(HeaderLabel::Abstract, RecordField::Abstract, KeepFirst, Normalized),
    rule(HeaderLabel::Reference, RecordField::Reference, KeepLongest, Raw),
    rule(HeaderLabel::Keyword, RecordField::Keyword, Concat(" \n "), Normalized),
    rule(HeaderLabel::Funding, RecordField::Funding, Concat(" \n "), Normalized),
    rule(HeaderLabel::Copyright, RecordField::Copyright, Concat(" "), Normalized),
    rule(HeaderLabel::Note, RecordField::Note, Concat(" "), Normalized),
    rule(HeaderLabel::Affiliation, RecordField::Affiliation, Concat(" ; "), Normalized),
    rule(HeaderLabel::Address, RecordField::Address, Concat(" "), Normalized),
    rule(HeaderLabel::Email, RecordField::Email, Concat("\t"), Raw),
    rule(HeaderLabel::Phone, RecordField::Phone, Concat(""), Raw),
    rule(HeaderLabel::Web, RecordField::Web, Concat(""), Raw),
    rule(HeaderLabel::Pubnum, RecordField::Pubnum, Identifier, Normalized),
    rule(HeaderLabel::Meeting, RecordField::Meeting, Concat(", "), Normalized),
    rule(HeaderLabel::Submission, RecordField::Submission, Concat(" "), Normalized),
    rule(HeaderLabel::DocType, RecordField::DocumentType, ConcatIfDistinct(" \n "), Normalized),
    rule(HeaderLabel::WorkingGroup, RecordField::WorkingGroup, KeepFirst, Normalized),
    rule(HeaderLabel::Publisher, RecordField::Publisher, KeepFirst, Normalized),
    rule(HeaderLabel::Journal, RecordField::Journal, KeepFirst, Normalized),
];

/// Regra do rótulo, `None` para rótulos ignorados
pub fn merge_rule(label: HeaderLabel) -> Option<&'static MergeRule> {
    MERGE_RULES.iter().find(|r| r.label == label)
}

impl BiblioRecord {
    /// Campo textual de destino de uma regra
    pub fn field_mut(&mut self, field: RecordField) -> &mut Option<String> {
        match field {
            RecordField::Title => &mut self.title,
            RecordField::Authors => &mut self.authors,
            RecordField::PublicationDate => &mut self.publication_date,
            RecordField::SubmissionDate => &mut self.submission_date,
            RecordField::DownloadDate => &mut self.download_date,
            RecordField::PageRange => &mut self.page_range,
            RecordField::Editors => &mut self.editors,
            RecordField::Abstract => &mut self.abstract_text,
            RecordField::Reference => &mut self.reference,
            RecordField::Keyword => &mut self.keyword,
            RecordField::Funding => &mut self.funding,
            RecordField::Copyright => &mut self.copyright,
            RecordField::Note => &mut self.note,
            RecordField::Affiliation => &mut self.affiliation,
            RecordField::Address => &mut self.address,
            RecordField::Email => &mut self.email,
            RecordField::Phone => &mut self.phone,
            RecordField::Web => &mut self.web,
            RecordField::Pubnum => &mut self.pubnum,
            RecordField::Meeting => &mut self.meeting,
            RecordField::Submission => &mut self.submission,
            RecordField::DocumentType => &mut self.document_type,
            RecordField::WorkingGroup => &mut self.working_group,
            RecordField::Publisher => &mut self.publisher,
            RecordField::Journal => &mut self.journal,
        }
    }
}

/// Aplica as regras de fusão aos clusters rotulados.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssembler {
    rules: &'static [MergeRule],
}

impl ClusterAssembler {
    pub fn new() -> Self {
        Self {
            rules: &MERGE_RULES,
        }
    }

    pub fn rules(&self) -> &'static [MergeRule] {
        self.rules
    }

    /// Funde os clusters no registro; devolve quantos clusters tinham regra.
    pub fn assemble(&self, clusters: &[LabelCluster], record: &mut BiblioRecord) -> usize {
        let mut merged = 0;
        for cluster in clusters {
            let Some(rule) = self.rules.iter().find(|r| r.label == cluster.label) else {
                debug!(tag = %cluster.tag, "cluster ignorado");
                continue;
            };
            let content = match rule.form {
                ContentForm::Normalized => cluster.text.as_str(),
                ContentForm::Raw => cluster.raw_text.as_str(),
            };
            if content.is_empty() {
                continue;
            }
            let span = (cluster.start, cluster.end);
            if record.merged_spans.contains(&span) {
                debug!(label = %cluster.label, start = span.0, end = span.1, "cluster já fundido");
                continue;
            }
            debug!(label = %cluster.label, policy = ?rule.policy, "fundindo cluster");
            apply_rule(rule, cluster, content, record);
            record.merged_spans.push(span);
            merged += 1;
        }
        merged
    }
}

impl Default for ClusterAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_rule(rule: &MergeRule, cluster: &LabelCluster, content: &str, record: &mut BiblioRecord) {
    match rule.policy {
        MergePolicy::AuthorSegments => merge_author(cluster, content, record),
        MergePolicy::Identifier => merge_identifier(content, record),
        MergePolicy::KeepFirst => {
            let slot = record.field_mut(rule.field);
            if slot.is_none() {
                *slot = Some(content.to_string());
                if rule.field == RecordField::Title {
                    record.title_tokens = visible_tokens(&cluster.tokens);
                }
            }
        }
        MergePolicy::KeepLongest => {
            let slot = record.field_mut(rule.field);
            let longer = slot
                .as_ref()
                .map_or(true, |existing| existing.chars().count() < content.chars().count());
            if longer {
                *slot = Some(content.to_string());
            }
        }
        MergePolicy::Concat(sep) => {
            concat_into(record.field_mut(rule.field), sep, content, |_| true);
        }
        MergePolicy::ConcatIfDistinct(sep) => {
            concat_into(record.field_mut(rule.field), sep, content, |existing| {
                let seen = existing
                    .split(sep)
                    .any(|seg| !is_different_content(seg, content));
                !seen && is_different_content(existing, content)
            });
        }
        MergePolicy::ConcatIfNotIncluded(sep) => {
            concat_into(record.field_mut(rule.field), sep, content, |existing| {
                is_different_and_not_included(existing, content)
            });
        }
    }
}

/// Preenche o campo vazio ou acrescenta `sep + content` se `accept` aprovar
fn concat_into(
    slot: &mut Option<String>,
    sep: &str,
    content: &str,
    accept: impl FnOnce(&str) -> bool,
) {
    if slot.is_none() {
        *slot = Some(content.to_string());
        return;
    }
    if let Some(existing) = slot {
        if accept(existing.as_str()) {
            existing.push_str(sep);
            existing.push_str(content);
        }
    }
}

/// Autores: texto bruto unido por `\t` e tokens com um token `\t` entre clusters
fn merge_author(cluster: &LabelCluster, content: &str, record: &mut BiblioRecord) {
    if let Some(existing) = record.authors.as_mut() {
        existing.push_str(AUTHOR_SEGMENT_DELIMITER);
        existing.push_str(content);
        record
            .author_tokens
            .push(LayoutToken::plain(AUTHOR_SEGMENT_DELIMITER));
    } else {
        record.authors = Some(content.to_string());
    }
    record.author_tokens.extend(cluster.tokens.iter().cloned());
}

/// PUBNUM: um valor novo e diferente é validado e depois descartado em favor
/// do anterior; o campo derivado da validação permanece. Um valor igual ou
/// contido no atual substitui o atual.
fn merge_identifier(content: &str, record: &mut BiblioRecord) {
    let previous = record.pubnum.replace(content.to_string());
    record.check_identifier();
    if let Some(current) = previous {
        if is_different_and_not_included(&current, content) {
            record.pubnum = Some(current);
        }
    }
}

fn visible_tokens(tokens: &[LayoutToken]) -> Vec<LayoutToken> {
    tokens.iter().filter(|t| t.is_visible()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cluster_labels;
    use crate::features::FeatureExtractor;
    use crate::layout::{BlockStyle, DocumentBuilder};
    use crate::lexicon::Lexicon;

    fn cluster(label: HeaderLabel, text: &str) -> LabelCluster {
        let tokens: Vec<LayoutToken> = crate::tokenizer::tokenize_line(text)
            .into_iter()
            .map(LayoutToken::plain)
            .collect();
        LabelCluster {
            label,
            tag: label.tag().to_string(),
            start: 0,
            end: tokens.len(),
            text: text.to_string(),
            raw_text: text.to_string(),
            tokens,
        }
    }

    /// Monta clusters soltos como se fossem consecutivos no documento
    fn assemble(clusters: &[LabelCluster]) -> BiblioRecord {
        let mut offset = 0;
        let placed: Vec<LabelCluster> = clusters
            .iter()
            .cloned()
            .map(|mut c| {
                c.start = offset;
                c.end = offset + c.tokens.len().max(1);
                offset = c.end;
                c
            })
            .collect();
        let mut record = BiblioRecord::default();
        ClusterAssembler::new().assemble(&placed, &mut record);
        record
    }

    #[test]
    fn test_every_label_except_other_has_one_rule() {
        for label in HeaderLabel::ALL {
            let count = MERGE_RULES.iter().filter(|r| r.label == label).count();
            let expected = usize::from(label != HeaderLabel::Other);
            assert_eq!(count, expected, "regras para {label}");
        }
        assert!(merge_rule(HeaderLabel::Unknown).is_none());
    }

    #[test]
    fn test_keep_first_and_longest() {
        let record = assemble(&[
            cluster(HeaderLabel::Title, "First Title"),
            cluster(HeaderLabel::Title, "Second Title"),
            cluster(HeaderLabel::Date, "2019"),
            cluster(HeaderLabel::Date, "March 2019"),
            cluster(HeaderLabel::Date, "2020"),
            cluster(HeaderLabel::Abstract, "We study things."),
            cluster(HeaderLabel::Abstract, "More text."),
        ]);
        assert_eq!(record.title.as_deref(), Some("First Title"));
        assert_eq!(record.title_tokens.len(), 2);
        assert_eq!(record.publication_date.as_deref(), Some("March 2019"));
        assert_eq!(record.abstract_text.as_deref(), Some("We study things."));
    }

    #[test]
    fn test_concatenation_separators() {
        let record = assemble(&[
            cluster(HeaderLabel::Affiliation, "University of Paris"),
            cluster(HeaderLabel::Affiliation, "MIT"),
            cluster(HeaderLabel::Email, "a@x.org"),
            cluster(HeaderLabel::Email, "b@y.org"),
            cluster(HeaderLabel::Keyword, "CRF"),
            cluster(HeaderLabel::Keyword, "metadata"),
            cluster(HeaderLabel::Editor, "A. Editor"),
            cluster(HeaderLabel::Editor, "B. Editor"),
            cluster(HeaderLabel::Meeting, "SIGIR"),
            cluster(HeaderLabel::Meeting, "Paris"),
            cluster(HeaderLabel::Phone, "+33 1"),
            cluster(HeaderLabel::Phone, " 23"),
        ]);
        assert_eq!(record.affiliation.as_deref(), Some("University of Paris ; MIT"));
        assert_eq!(record.email.as_deref(), Some("a@x.org\tb@y.org"));
        assert_eq!(record.keyword.as_deref(), Some("CRF \n metadata"));
        assert_eq!(record.editors.as_deref(), Some("A. Editor\nB. Editor"));
        assert_eq!(record.meeting.as_deref(), Some("SIGIR, Paris"));
        assert_eq!(record.phone.as_deref(), Some("+33 1 23"));
    }

    #[test]
    fn test_raw_concat_keeps_repeated_fragments() {
        let record = assemble(&[
            cluster(HeaderLabel::Phone, "+33 1 44"),
            cluster(HeaderLabel::Phone, "44"),
            cluster(HeaderLabel::Web, "http://lab.org/"),
            cluster(HeaderLabel::Web, "lab"),
        ]);
        assert_eq!(record.phone.as_deref(), Some("+33 1 4444"));
        assert_eq!(record.web.as_deref(), Some("http://lab.org/lab"));
    }

    #[test]
    fn test_repeated_emails_and_authors_are_kept() {
        let record = assemble(&[
            cluster(HeaderLabel::Author, "Jane Doe"),
            cluster(HeaderLabel::Email, "info@lab.org"),
            cluster(HeaderLabel::Author, "Jane Doe"),
            cluster(HeaderLabel::Email, "info@lab.org"),
        ]);
        assert_eq!(record.email.as_deref(), Some("info@lab.org\tinfo@lab.org"));
        assert_eq!(record.authors.as_deref(), Some("Jane Doe\tJane Doe"));
        let delimiters = record.author_tokens.iter().filter(|t| t.text == "\t").count();
        assert_eq!(delimiters, 1);
    }

    #[test]
    fn test_doctype_concatenates_only_distinct() {
        let record = assemble(&[
            cluster(HeaderLabel::DocType, "Research Article"),
            cluster(HeaderLabel::DocType, "research  article"),
            cluster(HeaderLabel::DocType, "Open Access"),
        ]);
        assert_eq!(record.document_type.as_deref(), Some("Research Article \n Open Access"));
    }

    #[test]
    fn test_submission_date_skips_included_content() {
        let record = assemble(&[
            cluster(HeaderLabel::DateSubmission, "Received 3 May 2019"),
            cluster(HeaderLabel::DateSubmission, "3 May 2019"),
            cluster(HeaderLabel::DateSubmission, "revised 9 June 2019"),
        ]);
        assert_eq!(
            record.submission_date.as_deref(),
            Some("Received 3 May 2019 revised 9 June 2019")
        );
    }

    #[test]
    fn test_authors_get_segment_delimiter_tokens() {
        let record = assemble(&[
            cluster(HeaderLabel::Author, "Jane Doe"),
            cluster(HeaderLabel::Title, "T"),
            cluster(HeaderLabel::Author, "John Smith"),
        ]);
        assert_eq!(record.authors.as_deref(), Some("Jane Doe\tJohn Smith"));
        let texts: Vec<&str> = record.author_tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Jane", " ", "Doe", "\t", "John", " ", "Smith"]);
    }

    #[test]
    fn test_pubnum_conflict_restores_previous_value() {
        let record = assemble(&[
            cluster(HeaderLabel::Pubnum, "Tech Report 12"),
            cluster(HeaderLabel::Pubnum, "doi:10.1000/xyz123"),
        ]);
        assert_eq!(record.pubnum.as_deref(), Some("Tech Report 12"));
        assert_eq!(record.doi.as_deref(), Some("10.1000/xyz123"));
    }

    #[test]
    fn test_pubnum_included_value_replaces_current() {
        let record = assemble(&[
            cluster(HeaderLabel::Pubnum, "DOI: 10.1000/XYZ123"),
            cluster(HeaderLabel::Pubnum, "10.1000/xyz123"),
        ]);
        assert_eq!(record.pubnum.as_deref(), Some("10.1000/xyz123"));
        assert!(record.doi.is_some());
    }

    #[test]
    fn test_other_and_unknown_are_ignored() {
        let mut record = BiblioRecord::default();
        let mut unknown = cluster(HeaderLabel::Unknown, "x");
        unknown.tag = "<dedication>".to_string();
        let merged = ClusterAssembler::new()
            .assemble(&[cluster(HeaderLabel::Other, "noise"), unknown], &mut record);
        assert_eq!(merged, 0);
        assert!(record.is_empty());
    }

    #[test]
    fn test_replaying_clusters_is_idempotent() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 14.0), &["A Title"])
            .block(BlockStyle::new("F", 10.0), &["Jane Doe"])
            .block(BlockStyle::new("F", 10.0), &["John Smith"])
            .block(BlockStyle::new("F", 9.0), &["Univ A", "Univ B"])
            .block(BlockStyle::new("F", 9.0), &["Keywords: CRF"])
            .header_blocks(0, 5)
            .build();
        let header = FeatureExtractor::new(&doc, Lexicon::shared())
            .extract(&doc.header_ranges())
            .unwrap();
        let labels: Vec<String> = [
            "I-<title>", "<title>", "I-<author>", "<author>", "I-<author>", "<author>",
            "I-<affiliation>", "<affiliation>", "I-<affiliation>", "<affiliation>", "I-<keyword>",
            "<keyword>", "<keyword>",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let clusters = cluster_labels(&header, &labels, &doc.tokens).unwrap();

        let assembler = ClusterAssembler::new();
        let mut record = BiblioRecord::default();
        assembler.assemble(&clusters, &mut record);
        let once = record.clone();
        assembler.assemble(&clusters, &mut record);
        assert_eq!(record, once);
        assert_eq!(record.author_tokens, once.author_tokens);
        assert_eq!(record.merged_spans.len(), clusters.len());
        assert_eq!(record.authors.as_deref(), Some("Jane Doe\tJohn Smith"));
        assert_eq!(record.affiliation.as_deref(), Some("Univ A ; Univ B"));
    }
}
