//! # Rótulos do Modelo de Cabeçalho
//!
//! O tagger devolve um rótulo por linha de features no formato `<title>`,
//! `<author>`... Um prefixo `I-` (ex: `I-<author>`) marca o **início** de um
//! novo campo: dois campos vizinhos com o mesmo rótulo continuam separados.
//!
//! | Rótulo | Campo |
//! |--------|-------|
//! | `<title>` | título |
//! | `<author>` | autores |
//! | `<affiliation>` / `<address>` | afiliação / endereço |
//! | `<email>` `<phone>` `<web>` | contato |
//! | `<date>` `<date-submission>` `<date-download>` | datas |
//! | `<abstract>` `<keyword>` | resumo, palavras-chave |
//! | `<pubnum>` | identificador (DOI, arXiv...) |
//! | `<other>` | ruído, ignorado |

use serde::{Deserialize, Serialize};

/// Categorias semânticas reconhecidas pelo montador de clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderLabel {
    Title,
    Author,
    Affiliation,
    Address,
    Email,
    Phone,
    Web,
    Date,
    DateSubmission,
    DateDownload,
    Page,
    Editor,
    Note,
    Abstract,
    Reference,
    Funding,
    Copyright,
    Keyword,
    Pubnum,
    Meeting,
    Submission,
    DocType,
    WorkingGroup,
    Publisher,
    Journal,
    /// Texto sem papel bibliográfico
    Other,
    /// Rótulo que este crate não conhece (conjunto de rótulos do modelo cresceu)
    Unknown,
}

impl HeaderLabel {
    pub const ALL: [HeaderLabel; 26] = [
        HeaderLabel::Title,
        HeaderLabel::Author,
        HeaderLabel::Affiliation,
        HeaderLabel::Address,
        HeaderLabel::Email,
        HeaderLabel::Phone,
        HeaderLabel::Web,
        HeaderLabel::Date,
        HeaderLabel::DateSubmission,
        HeaderLabel::DateDownload,
        HeaderLabel::Page,
        HeaderLabel::Editor,
        HeaderLabel::Note,
        HeaderLabel::Abstract,
        HeaderLabel::Reference,
        HeaderLabel::Funding,
        HeaderLabel::Copyright,
        HeaderLabel::Keyword,
        HeaderLabel::Pubnum,
        HeaderLabel::Meeting,
        HeaderLabel::Submission,
        HeaderLabel::DocType,
        HeaderLabel::WorkingGroup,
        HeaderLabel::Publisher,
        HeaderLabel::Journal,
        HeaderLabel::Other,
    ];

    /// Forma usada pelo modelo (ex: `<title>`)
    pub fn tag(&self) -> &'static str {
        match self {
            HeaderLabel::Title => "<title>",
            HeaderLabel::Author => "<author>",
            HeaderLabel::Affiliation => "<affiliation>",
            HeaderLabel::Address => "<address>",
            HeaderLabel::Email => "<email>",
            HeaderLabel::Phone => "<phone>",
            HeaderLabel::Web => "<web>",
            HeaderLabel::Date => "<date>",
            HeaderLabel::DateSubmission => "<date-submission>",
            HeaderLabel::DateDownload => "<date-download>",
            HeaderLabel::Page => "<page>",
            HeaderLabel::Editor => "<editor>",
            HeaderLabel::Note => "<note>",
            HeaderLabel::Abstract => "<abstract>",
            HeaderLabel::Reference => "<reference>",
            HeaderLabel::Funding => "<funding>",
            HeaderLabel::Copyright => "<copyright>",
            HeaderLabel::Keyword => "<keyword>",
            HeaderLabel::Pubnum => "<pubnum>",
            HeaderLabel::Meeting => "<meeting>",
            HeaderLabel::Submission => "<submission>",
            HeaderLabel::DocType => "<doctype>",
            HeaderLabel::WorkingGroup => "<group>",
            HeaderLabel::Publisher => "<publisher>",
            HeaderLabel::Journal => "<journal>",
            HeaderLabel::Other => "<other>",
            HeaderLabel::Unknown => "<unknown>",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.tag() == tag)
    }
}

impl std::fmt::Display for HeaderLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = self.tag();
        write!(f, "{}", tag[1..tag.len() - 1].to_uppercase())
    }
}

/// Rótulo de uma linha já interpretado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedLabel {
    pub label: HeaderLabel,
    /// Rótulo normalizado sem o prefixo `I-` (ex: `<title>`)
    pub tag: String,
    /// `true` quando a linha trazia `I-`: início forçado de campo
    pub begin: bool,
}

impl TaggedLabel {
    /// Interpreta `<title>`, `I-<title>`, `title` ou `TITLE`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (begin, rest) = match raw.strip_prefix("I-") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let tag = if rest.starts_with('<') {
            rest.to_string()
        } else {
            format!("<{}>", rest.to_lowercase())
        };
        let label = HeaderLabel::from_tag(&tag).unwrap_or(HeaderLabel::Unknown);
        Self { label, tag, begin }
    }
}

/// Extrai o rótulo (última coluna) de cada linha de um resultado rotulado.
///
/// O formato é o texto de features com o rótulo acrescentado ao fim de cada
/// linha, separado por espaço ou tabulação; linhas vazias são ignoradas.
pub fn labels_from_result(result: &str) -> Vec<String> {
    result
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}
