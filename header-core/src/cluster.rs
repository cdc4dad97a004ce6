//! # Agrupamento de Tokens Rotulados
//!
//! Percorre os rótulos alinhados aos tokens retidos e abre um novo cluster
//! sempre que o rótulo muda ou quando a linha traz o prefixo `I-`. A fronteira
//! é pura igualdade de rótulo, sem limiares.
//!
//! Cada cluster guarda a fatia contínua de tokens do documento entre o seu
//! primeiro e o seu último token retido (espaços e quebras de linha incluídos),
//! de onde saem as duas formas de texto:
//! - `text`: deshifenizado e com quebras normalizadas;
//! - `raw_text`: concatenação exata, para e-mails, identificadores e autores.

use serde::{Deserialize, Serialize};

use crate::error::{HeaderError, Result};
use crate::features::FeaturedHeader;
use crate::labels::{HeaderLabel, TaggedLabel};
use crate::layout::LayoutToken;
use crate::text::{tokens_to_dehyphenized_text, tokens_to_raw_text};

/// Sequência máxima de tokens contíguos com o mesmo rótulo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCluster {
    pub label: HeaderLabel,
    /// Rótulo original normalizado (preserva rótulos desconhecidos)
    pub tag: String,
    /// Posição inicial (inclusiva) na lista de tokens retidos
    pub start: usize,
    /// Posição final (exclusiva) na lista de tokens retidos
    pub end: usize,
    /// Fatia do documento do primeiro ao último token retido do cluster
    pub tokens: Vec<LayoutToken>,
    pub text: String,
    pub raw_text: String,
}

impl LabelCluster {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Agrupa os tokens retidos segundo os rótulos do tagger.
///
/// `doc_tokens` é a lista completa de tokens do documento, usada para recuperar
/// os espaços entre tokens retidos.
pub fn cluster_labels(
    header: &FeaturedHeader,
    labels: &[String],
    doc_tokens: &[LayoutToken],
) -> Result<Vec<LabelCluster>> {
    if labels.len() != header.len() {
        return Err(HeaderError::LabelCountMismatch {
            expected: header.len(),
            found: labels.len(),
        });
    }

    let parsed: Vec<TaggedLabel> = labels.iter().map(|l| TaggedLabel::parse(l)).collect();
    let mut clusters = Vec::new();
    let mut start = 0;

    for i in 1..=parsed.len() {
        let boundary = i == parsed.len() || parsed[i].begin || parsed[i].tag != parsed[i - 1].tag;
        if boundary {
            clusters.push(build_cluster(header, &parsed[start], start, i, doc_tokens));
            start = i;
        }
    }
    Ok(clusters)
}

fn build_cluster(
    header: &FeaturedHeader,
    label: &TaggedLabel,
    start: usize,
    end: usize,
    doc_tokens: &[LayoutToken],
) -> LabelCluster {
    let first = header.token_indices[start];
    let last = header.token_indices[end - 1];
    let tokens: Vec<LayoutToken> = if last < doc_tokens.len() {
        doc_tokens[first..=last].to_vec()
    } else {
        header.tokens[start..end].to_vec()
    };
    LabelCluster {
        label: label.label,
        tag: label.tag.clone(),
        start,
        end,
        text: tokens_to_dehyphenized_text(&tokens),
        raw_text: tokens_to_raw_text(&tokens),
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::layout::{BlockStyle, Document, DocumentBuilder};
    use crate::lexicon::Lexicon;

    fn header_of(doc: &Document) -> FeaturedHeader {
        FeatureExtractor::new(doc, Lexicon::shared())
            .extract(&doc.header_ranges())
            .unwrap()
    }

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clusters_break_on_label_change_and_begin_marker() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 12.0), &["A B C D E"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let lbl = labels(&["I-<title>", "<title>", "I-<title>", "<author>", "<author>"]);
        let clusters = cluster_labels(&header, &lbl, &doc.tokens).unwrap();
        let spans: Vec<(usize, usize)> = clusters.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(0, 2), (2, 3), (3, 5)]);
        assert_eq!(clusters[0].text, "A B");
        assert_eq!(clusters[2].label, HeaderLabel::Author);
    }

    #[test]
    fn test_clusters_cover_all_tokens_in_order() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 12.0), &["one two three", "four five six"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let lbl = labels(&["<title>", "<note>", "<note>", "<xyz>", "I-<xyz>", "<title>"]);
        let clusters = cluster_labels(&header, &lbl, &doc.tokens).unwrap();
        let mut next = 0;
        for c in &clusters {
            assert_eq!(c.start, next);
            assert!(!c.is_empty());
            next = c.end;
        }
        assert_eq!(next, header.len());
        assert_eq!(clusters[2].label, HeaderLabel::Unknown);
        assert_eq!(clusters[2].tag, "<xyz>");
    }

    #[test]
    fn test_dehyphenized_and_raw_forms() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 12.0), &["header extrac-", "tion"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let lbl = vec!["<title>".to_string(); header.len()];
        let clusters = cluster_labels(&header, &lbl, &doc.tokens).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].text, "header extraction");
        assert_eq!(clusters[0].raw_text, "header extrac-\ntion");
    }

    #[test]
    fn test_label_count_mismatch_is_error() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 12.0), &["A B"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let err = cluster_labels(&header, &labels(&["<title>"]), &doc.tokens).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::LabelCountMismatch { expected: 2, found: 1 }
        ));
    }
}
