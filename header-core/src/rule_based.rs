//! # Rotulador por Regras
//!
//! Implementação leve de [`SequenceTagger`] que lê o próprio texto de
//! features, sem modelo treinado. Serve para demonstrações, testes de ponta a
//! ponta e como rede de segurança quando nenhum modelo está configurado.
//!
//! ## Estratégia
//!
//! As linhas de features são agrupadas em blocos visuais (`BLOCKSTART` até
//! `BLOCKEND`) e cada bloco recebe um rótulo, nesta ordem de prioridade:
//!
//! | Regra | Condição | Rótulo |
//! |-------|----------|--------|
//! | 1 | primeira palavra "abstract"/"summary" | `<abstract>` |
//! | 2 | primeira palavra "keywords"/"key words"/"index terms" | `<keyword>` |
//! | 3 | "©" ou "copyright" | `<copyright>` |
//! | 4 | "doi", "arxiv", "isbn" ou "issn" | `<pubnum>` |
//! | 5 | "received", "accepted", "revised" ou "submitted" | `<date-submission>` |
//! | 6 | bloco curto com ano e mês | `<date>` |
//! | 7 | só tokens de e-mail | `<email>` |
//! | 8 | palavra-chave institucional | `<affiliation>` |
//! | 9 | primeiro bloco na maior fonte | `<title>` |
//! | 10 | depois do título, só palavras capitalizadas | `<author>` |
//! | 11 | depois do resumo | `<abstract>` |
//! | 12 | só nomes de lugar | `<address>` |
//!
//! Dentro de qualquer bloco, tokens marcados como e-mail ou URL recebem
//! `<email>` e `<web>`. O prefixo `I-` marca o início de cada bloco e cada
//! mudança de rótulo, então dois blocos de autores viram dois clusters.

use crate::error::ExternalError;
use crate::features::{
    BlockStatus, Capitalisation, DigitClass, FeatureVector, FontSizeTrend, PunctClass,
};
use crate::labels::HeaderLabel;
use crate::parsers::SequenceTagger;

/// Índices das colunas de features consultadas pelas regras
mod column {
    pub const STRING: usize = 0;
    pub const LOWERCASE: usize = 1;
    pub const BLOCK: usize = 10;
    pub const FONT_SIZE: usize = 14;
    pub const CAPITALISATION: usize = 17;
    pub const DIGIT: usize = 18;
    pub const SINGLE_CHAR: usize = 19;
    pub const YEAR: usize = 22;
    pub const MONTH: usize = 23;
    pub const LOCATION: usize = 24;
    pub const EMAIL: usize = 25;
    pub const HTTP: usize = 26;
    pub const PUNCT: usize = 27;
    pub const LARGEST_FONT: usize = 28;
}

/// Uma linha de features já separada em colunas
struct Row<'a> {
    cols: Vec<&'a str>,
}

impl<'a> Row<'a> {
    fn text(&self) -> &'a str {
        self.cols[column::STRING]
    }

    fn lower(&self) -> &'a str {
        self.cols[column::LOWERCASE]
    }

    fn flag(&self, col: usize) -> bool {
        self.cols.get(col) == Some(&"1")
    }

    fn is(&self, col: usize, symbol: &str) -> bool {
        self.cols.get(col) == Some(&symbol)
    }

    /// Palavra alfabética: sem dígitos e sem pontuação
    fn is_word(&self) -> bool {
        self.is(column::DIGIT, DigitClass::NoDigit.symbol())
            && self.is(column::PUNCT, PunctClass::NoPunct.symbol())
    }
}

/// Estado que atravessa os blocos do cabeçalho
#[derive(Debug, Default)]
struct TaggerState {
    title_seen: bool,
    abstract_started: bool,
}

/// Rotulador de cabeçalho baseado em regras de layout e léxico
#[derive(Debug, Clone)]
pub struct RuleTagger {
    affiliation_keywords: Vec<String>,
    submission_markers: Vec<String>,
    pubnum_markers: Vec<String>,
    name_connectors: Vec<String>,
    /// Máximo de linhas para um bloco ainda ser lido como data
    max_date_rows: usize,
}

impl RuleTagger {
    pub fn new() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            affiliation_keywords: owned(&[
                "university", "université", "universität", "universidade", "universidad",
                "department", "dept", "institute", "institut", "laboratory", "laboratoire",
                "lab", "school", "college", "faculty", "centre", "center", "inria", "cnrs",
            ]),
            submission_markers: owned(&["received", "accepted", "revised", "submitted"]),
            pubnum_markers: owned(&["doi", "arxiv", "isbn", "issn"]),
            name_connectors: owned(&["and", "&", "de", "da", "van", "von", "der", "del", "la"]),
            max_date_rows: 12,
        }
    }

    /// Acrescenta uma palavra que identifica blocos de afiliação
    pub fn add_affiliation_keyword(&mut self, word: &str) {
        self.affiliation_keywords.push(word.to_lowercase());
    }

    /// Rotula o texto de features, um rótulo por linha.
    pub fn tag(&self, feature_text: &str) -> Result<Vec<String>, ExternalError> {
        let mut rows = Vec::new();
        for (n, line) in feature_text.lines().enumerate() {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.is_empty() {
                continue;
            }
            if cols.len() < FeatureVector::COLUMN_COUNT {
                return Err(format!(
                    "linha {} com {} colunas, esperado {}",
                    n + 1,
                    cols.len(),
                    FeatureVector::COLUMN_COUNT
                )
                .into());
            }
            rows.push(Row { cols });
        }

        let mut state = TaggerState::default();
        let mut labels: Vec<HeaderLabel> = Vec::with_capacity(rows.len());
        let mut block_starts = Vec::new();
        for block in split_blocks(&rows) {
            let block_rows = &rows[block.clone()];
            let label = self.classify_block(block_rows, &mut state);
            block_starts.push(block.start);
            for row in block_rows {
                labels.push(token_override(row).unwrap_or(label));
            }
        }

        let mut tagged = Vec::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            let starts = block_starts.contains(&i) || (i > 0 && labels[i - 1] != *label);
            if starts {
                tagged.push(format!("I-{}", label.tag()));
            } else {
                tagged.push(label.tag().to_string());
            }
        }
        Ok(tagged)
    }

    fn classify_block(&self, rows: &[Row], state: &mut TaggerState) -> HeaderLabel {
        let words: Vec<&str> = rows.iter().map(|r| r.lower()).collect();
        let first = words.first().copied().unwrap_or_default();
        let second = words.get(1).copied().unwrap_or_default();
        let has = |list: &[String]| words.iter().any(|w| list.iter().any(|m| m == w));

        // 1. Resumo explícito
        if first == "abstract" || first == "summary" {
            state.abstract_started = true;
            return HeaderLabel::Abstract;
        }

        // 2. Palavras-chave
        if matches!(first, "keywords" | "keyword")
            || (first == "key" && second == "words")
            || (first == "index" && second == "terms")
        {
            return HeaderLabel::Keyword;
        }

        // 3. Direitos autorais
        if words.iter().any(|w| *w == "©" || *w == "copyright") {
            return HeaderLabel::Copyright;
        }

        // 4. Identificadores
        if has(&self.pubnum_markers) {
            return HeaderLabel::Pubnum;
        }

        // 5-6. Datas
        if has(&self.submission_markers) {
            return HeaderLabel::DateSubmission;
        }
        let has_year = rows.iter().any(|r| r.flag(column::YEAR));
        let has_month = rows.iter().any(|r| r.flag(column::MONTH));
        if has_year && has_month && rows.len() <= self.max_date_rows {
            return HeaderLabel::Date;
        }

        // 7. Bloco só de e-mails
        if rows.iter().all(|r| r.flag(column::EMAIL)) {
            return HeaderLabel::Email;
        }

        // 8. Afiliação
        if words.iter().any(|w| {
            self.affiliation_keywords
                .iter()
                .any(|k| w == k || (k.len() > 4 && w.starts_with(k.as_str())))
        }) {
            return HeaderLabel::Affiliation;
        }

        // 9. Título: primeiro bloco na maior fonte da zona
        if !state.title_seen && rows.first().is_some_and(|r| r.flag(column::LARGEST_FONT)) {
            state.title_seen = true;
            return HeaderLabel::Title;
        }

        // 10. Autores
        if state.title_seen && !state.abstract_started && self.looks_like_authors(rows) {
            return HeaderLabel::Author;
        }

        // 11. Continuação do resumo
        if state.abstract_started {
            return HeaderLabel::Abstract;
        }

        // 12. Endereço
        let word_rows: Vec<&Row> = rows.iter().filter(|r| r.is_word()).collect();
        if !word_rows.is_empty() && word_rows.iter().all(|r| r.flag(column::LOCATION)) {
            return HeaderLabel::Address;
        }

        // um bloco em fonte maior que o anterior, ainda sem título, é título
        if !state.title_seen
            && rows
                .first()
                .is_some_and(|r| r.is(column::FONT_SIZE, FontSizeTrend::HigherFont.symbol()))
            && rows.len() > 1
        {
            state.title_seen = true;
            return HeaderLabel::Title;
        }

        HeaderLabel::Other
    }

    /// Bloco de nomes: palavras capitalizadas, iniciais, conectores e
    /// pontuação leve, sem palavras comuns.
    fn looks_like_authors(&self, rows: &[Row]) -> bool {
        let mut names = 0;
        for row in rows {
            let lower = row.lower();
            if self.name_connectors.iter().any(|c| c == lower) {
                continue;
            }
            if !row.is_word() {
                // marcadores numéricos curtos e pontuação de lista são tolerados
                let short_marker = row.is(column::DIGIT, DigitClass::AllDigit.symbol())
                    && row.text().chars().count() <= 2;
                let list_punct = row.is(column::PUNCT, PunctClass::Comma.symbol())
                    || row.is(column::PUNCT, PunctClass::Dot.symbol())
                    || row.text() == "*";
                if short_marker || list_punct || row.is(column::DIGIT, DigitClass::ContainsDigits.symbol()) {
                    continue;
                }
                return false;
            }
            let capitalised = row.is(column::CAPITALISATION, Capitalisation::InitCap.symbol())
                || row.is(column::CAPITALISATION, Capitalisation::AllCap.symbol());
            if !capitalised && !row.flag(column::SINGLE_CHAR) {
                return false;
            }
            names += 1;
        }
        (2..=40).contains(&names)
    }
}

impl Default for RuleTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceTagger for RuleTagger {
    fn label(&self, feature_text: &str) -> Result<Vec<String>, ExternalError> {
        self.tag(feature_text)
    }
}

/// Rótulo imposto ao token independentemente do bloco
fn token_override(row: &Row) -> Option<HeaderLabel> {
    if row.flag(column::EMAIL) {
        Some(HeaderLabel::Email)
    } else if row.flag(column::HTTP) {
        Some(HeaderLabel::Web)
    } else {
        None
    }
}

/// Intervalos de linhas de cada bloco visual.
///
/// Um bloco de um único token chega marcado só como `BLOCKEND`, então um
/// bloco novo começa em `BLOCKSTART` ou logo depois de um `BLOCKEND`.
fn split_blocks(rows: &[Row]) -> Vec<std::ops::Range<usize>> {
    let mut blocks = Vec::new();
    let mut start = 0;
    for i in 1..rows.len() {
        let opens = rows[i].is(column::BLOCK, BlockStatus::BlockStart.symbol())
            || rows[i - 1].is(column::BLOCK, BlockStatus::BlockEnd.symbol());
        if opens {
            blocks.push(start..i);
            start = i;
        }
    }
    if !rows.is_empty() {
        blocks.push(start..rows.len());
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::labels::TaggedLabel;
    use crate::layout::{BlockStyle, Document, DocumentBuilder};
    use crate::lexicon::Lexicon;

    fn paper() -> Document {
        DocumentBuilder::new()
            .block(BlockStyle::new("Times-Bold", 16.0).bold(), &["Header Extraction", "for Scanned Papers"])
            .block(BlockStyle::new("Times", 11.0), &["Jane Doe and John Smith"])
            .block(BlockStyle::new("Times-Italic", 9.0).italic(), &["University of Paris, France"])
            .block(BlockStyle::new("Times", 9.0), &["jane.doe@uni.edu"])
            .block(BlockStyle::new("Times", 10.0), &["Abstract", "We study header extraction."])
            .block(BlockStyle::new("Times", 10.0), &["Keywords: metadata; parsing"])
            .header_blocks(0, 6)
            .build()
    }

    fn tagged(doc: &Document) -> Vec<(String, HeaderLabel, bool)> {
        let header = FeatureExtractor::new(doc, Lexicon::shared())
            .extract(&doc.header_ranges())
            .unwrap();
        let labels = RuleTagger::new().label(&header.feature_text).unwrap();
        assert_eq!(labels.len(), header.len());
        header
            .vectors
            .iter()
            .zip(labels)
            .map(|(v, l)| {
                let parsed = TaggedLabel::parse(&l);
                (v.string.clone(), parsed.label, parsed.begin)
            })
            .collect()
    }

    fn label_of(rows: &[(String, HeaderLabel, bool)], word: &str) -> HeaderLabel {
        rows.iter()
            .find(|(w, _, _)| w == word)
            .map(|(_, l, _)| *l)
            .unwrap()
    }

    #[test]
    fn test_labels_blocks_of_a_paper() {
        let rows = tagged(&paper());
        assert_eq!(label_of(&rows, "Extraction"), HeaderLabel::Title);
        assert_eq!(label_of(&rows, "Papers"), HeaderLabel::Title);
        assert_eq!(label_of(&rows, "Smith"), HeaderLabel::Author);
        assert_eq!(label_of(&rows, "University"), HeaderLabel::Affiliation);
        assert_eq!(label_of(&rows, "jane"), HeaderLabel::Email);
        assert_eq!(label_of(&rows, "study"), HeaderLabel::Abstract);
        assert_eq!(label_of(&rows, "metadata"), HeaderLabel::Keyword);
    }

    #[test]
    fn test_block_start_gets_begin_prefix() {
        let rows = tagged(&paper());
        assert!(rows[0].2);
        assert!(!rows[1].2);
        let jane = rows.iter().position(|(w, _, _)| w == "Jane").unwrap();
        assert!(rows[jane].2);
    }

    #[test]
    fn test_two_author_blocks_stay_separate() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 16.0), &["A Big Title"])
            .block(BlockStyle::new("F", 11.0), &["Jane Doe"])
            .block(BlockStyle::new("F", 11.0), &["John Smith"])
            .header_blocks(0, 3)
            .build();
        let rows = tagged(&doc);
        let begins: Vec<&str> = rows
            .iter()
            .filter(|(_, l, b)| *l == HeaderLabel::Author && *b)
            .map(|(w, _, _)| w.as_str())
            .collect();
        assert_eq!(begins, vec!["Jane", "John"]);
    }

    #[test]
    fn test_submission_dates_and_identifiers() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 16.0), &["A Big Title"])
            .block(BlockStyle::new("F", 9.0), &["Received 12 March 2019"])
            .block(BlockStyle::new("F", 9.0), &["doi: 10.1000/xyz"])
            .header_blocks(0, 3)
            .build();
        let rows = tagged(&doc);
        assert_eq!(label_of(&rows, "March"), HeaderLabel::DateSubmission);
        assert_eq!(label_of(&rows, "xyz"), HeaderLabel::Pubnum);
    }

    #[test]
    fn test_short_rows_are_rejected() {
        let err = RuleTagger::new().label("Title BLOCKSTART\n").unwrap_err();
        assert!(err.to_string().contains("colunas"));
    }

    #[test]
    fn test_empty_text_has_no_labels() {
        assert!(RuleTagger::new().label("").unwrap().is_empty());
    }
}
