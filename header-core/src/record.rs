//! # Registro Bibliográfico
//!
//! [`BiblioRecord`] é o agregado de saída do pipeline: nasce vazio, é
//! preenchido pelo montador de clusters e pelo normalizador, e é entregue ao
//! serializador sem mais mutações.
//!
//! Também reúne os pós-processamentos que dependem só do próprio registro:
//! validação de identificadores, associação de e-mails, limpeza de título e de
//! palavras-chave, e a fusão com um registro externo (consolidação).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::layout::LayoutToken;
use crate::text::collapse_whitespace;

static DOI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(10\.\d{4,9}/[^\s,;]+)").expect("regex DOI válida"));
static ARXIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)arxiv\s*:?\s*((\d{4}\.\d{4,5}|[a-z\-]+(\.[a-z]{2})?/\d{7})(v\d+)?)")
        .expect("regex arXiv válida")
});
static PMCID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(PMC\d{4,9})\b").expect("regex PMCID válida"));
static PMID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPMID\s*:?\s*(\d{4,9})\b").expect("regex PMID válida"));
static ISBN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bISBN(?:-1[03])?\s*:?\s*([0-9][0-9\- ]{8,15}[0-9Xx])")
        .expect("regex ISBN válida")
});
static KEYWORD_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(key\s*-?\s*words?|index\s+terms|mots[\s-]cl[ée]s)\s*[:.\-–—]?\s*")
        .expect("regex de prefixo válida")
});

/// Pessoa (autor ou editor)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub forename: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub suffix: Option<String>,
    /// Marcadores de referência (sobrescritos, notas) ligando a afiliações
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub affiliations: Vec<Affiliation>,
    pub email: Option<String>,
    /// Segmento de autores de onde a pessoa veio
    pub segment_index: Option<usize>,
    /// Marcado pelo parser de nomes como ruído
    #[serde(default)]
    pub noise: bool,
}

impl Person {
    pub fn full_name(&self) -> String {
        [&self.forename, &self.middle_name, &self.surname]
            .iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Nome para comparação: minúsculas e sem espaços
    pub fn normalized_name(&self) -> String {
        self.full_name()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    pub fn has_surname(&self) -> bool {
        self.surname.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Une marcadores e afiliações de outra entrada da mesma pessoa
    pub fn merge_references(&mut self, other: &Person) {
        for marker in &other.markers {
            if !self.markers.contains(marker) {
                self.markers.push(marker.clone());
            }
        }
        for affiliation in &other.affiliations {
            if !self.affiliations.contains(affiliation) {
                self.affiliations.push(affiliation.clone());
            }
        }
        if self.email.is_none() {
            self.email = other.email.clone();
        }
    }
}

/// Bloco de afiliação já analisado
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    pub raw: String,
    pub marker: Option<String>,
    #[serde(default)]
    pub institutions: Vec<String>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub laboratories: Vec<String>,
    pub address: Option<String>,
}

/// Data normalizada; campos ausentes ficam `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
}

/// Tipos de identificador estruturado reconhecidos em PUBNUM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Doi,
    Arxiv,
    Pmid,
    Pmcid,
    Isbn,
}

/// Procura um identificador estruturado no texto.
///
/// A ordem de tentativa é DOI, arXiv, PMCID, PMID e ISBN; o primeiro que casar vence.
pub fn detect_identifier(text: &str) -> Option<(IdentifierKind, String)> {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    if let Some(doi) = capture(&DOI) {
        let doi = doi.trim_end_matches(['.', ')', ']']).to_string();
        return Some((IdentifierKind::Doi, doi));
    }
    if let Some(id) = capture(&ARXIV) {
        return Some((IdentifierKind::Arxiv, id));
    }
    if let Some(id) = capture(&PMCID) {
        return Some((IdentifierKind::Pmcid, id.to_uppercase()));
    }
    if let Some(id) = capture(&PMID) {
        return Some((IdentifierKind::Pmid, id));
    }
    if let Some(id) = capture(&ISBN) {
        let digits: String = id.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if digits.len() == 10 || digits.len() == 13 {
            return Some((IdentifierKind::Isbn, digits.to_uppercase()));
        }
    }
    None
}

/// Metadados do cabeçalho
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiblioRecord {
    pub title: Option<String>,
    #[serde(skip)]
    pub title_tokens: Vec<LayoutToken>,

    /// Autores brutos; segmentos separados por `\t`
    pub authors: Option<String>,
    /// Tokens de autores com um token `\t` entre clusters
    #[serde(skip)]
    pub author_tokens: Vec<LayoutToken>,
    /// Intervalos `(início, fim)` dos clusters já fundidos
    #[serde(skip)]
    pub merged_spans: Vec<(usize, usize)>,
    #[serde(default)]
    pub full_authors: Vec<Person>,
    #[serde(default)]
    pub fragmented_authors: bool,

    pub editors: Option<String>,
    #[serde(default)]
    pub full_editors: Vec<Person>,

    pub affiliation: Option<String>,
    /// Blocos de afiliação ainda não associados a autores
    #[serde(default)]
    pub full_affiliations: Vec<Affiliation>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub web: Option<String>,
    pub meeting: Option<String>,

    pub publication_date: Option<String>,
    pub submission_date: Option<String>,
    pub download_date: Option<String>,
    pub server_date: Option<String>,
    pub normalized_publication_date: Option<Date>,
    pub normalized_submission_date: Option<Date>,
    pub normalized_download_date: Option<Date>,
    pub normalized_server_date: Option<Date>,

    pub page_range: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub reference: Option<String>,
    pub keyword: Option<String>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    pub funding: Option<String>,
    pub copyright: Option<String>,
    pub note: Option<String>,
    pub submission: Option<String>,
    pub document_type: Option<String>,
    pub working_group: Option<String>,
    pub publisher: Option<String>,
    pub journal: Option<String>,

    pub pubnum: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub isbn: Option<String>,

    pub language: Option<String>,
}

impl BiblioRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` se nenhum campo textual foi preenchido
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        match kind {
            IdentifierKind::Doi => self.doi.as_deref(),
            IdentifierKind::Arxiv => self.arxiv_id.as_deref(),
            IdentifierKind::Pmid => self.pmid.as_deref(),
            IdentifierKind::Pmcid => self.pmcid.as_deref(),
            IdentifierKind::Isbn => self.isbn.as_deref(),
        }
    }

    fn identifier_slot(&mut self, kind: IdentifierKind) -> &mut Option<String> {
        match kind {
            IdentifierKind::Doi => &mut self.doi,
            IdentifierKind::Arxiv => &mut self.arxiv_id,
            IdentifierKind::Pmid => &mut self.pmid,
            IdentifierKind::Pmcid => &mut self.pmcid,
            IdentifierKind::Isbn => &mut self.isbn,
        }
    }

    /// Valida o PUBNUM corrente como identificador estruturado e preenche o
    /// campo derivado correspondente.
    ///
    /// Um PUBNUM que não casa com nenhum formato é apenas informativo: o
    /// método não falha e não altera o registro. Um campo derivado já
    /// preenchido não é sobrescrito.
    pub fn check_identifier(&mut self) -> Option<IdentifierKind> {
        let pubnum = self.pubnum.clone()?;
        let (kind, value) = detect_identifier(&pubnum)?;
        let slot = self.identifier_slot(kind);
        if slot.is_none() {
            *slot = Some(value);
        }
        Some(kind)
    }

    /// Associa os endereços do campo de e-mail aos autores.
    ///
    /// Mesma quantidade de e-mails e autores: associação em ordem. Caso
    /// contrário, cada e-mail vai para o autor cujo sobrenome aparece na parte
    /// local do endereço.
    pub fn attach_emails(&mut self) {
        let Some(raw) = self.email.as_deref() else {
            return;
        };
        let emails = split_emails(raw);
        if emails.is_empty() || self.full_authors.is_empty() {
            return;
        }

        if emails.len() == self.full_authors.len() {
            for (person, email) in self.full_authors.iter_mut().zip(emails) {
                person.email = Some(email);
            }
            return;
        }

        for email in emails {
            let local = email.split('@').next().unwrap_or_default().to_lowercase();
            let owner = self.full_authors.iter_mut().find(|p| {
                p.email.is_none()
                    && p.surname
                        .as_deref()
                        .map(|s| s.to_lowercase())
                        .is_some_and(|s| s.len() > 1 && local.contains(&s))
            });
            if let Some(person) = owner {
                person.email = Some(email);
            }
        }
    }

    /// Normaliza espaços do título e remove pontuação solta nas pontas.
    pub fn clean_title(&mut self) {
        if let Some(title) = self.title.take() {
            let cleaned = collapse_whitespace(&title)
                .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '*' | '·' | '•'))
                .trim()
                .to_string();
            self.title = (!cleaned.is_empty()).then_some(cleaned);
        }
    }

    /// Copia os campos em que o registro externo é autoritativo e corrige
    /// prenomes de autores com o mesmo sobrenome.
    pub fn correct(&mut self, other: &BiblioRecord) {
        let overwrite = |target: &mut Option<String>, source: &Option<String>| {
            if let Some(value) = source {
                if !value.trim().is_empty() {
                    *target = Some(value.clone());
                }
            }
        };
        overwrite(&mut self.title, &other.title);
        overwrite(&mut self.journal, &other.journal);
        overwrite(&mut self.publisher, &other.publisher);
        overwrite(&mut self.page_range, &other.page_range);
        overwrite(&mut self.publication_date, &other.publication_date);
        overwrite(&mut self.doi, &other.doi);
        overwrite(&mut self.arxiv_id, &other.arxiv_id);
        overwrite(&mut self.pmid, &other.pmid);
        overwrite(&mut self.pmcid, &other.pmcid);
        overwrite(&mut self.isbn, &other.isbn);
        if other.normalized_publication_date.is_some() {
            self.normalized_publication_date = other.normalized_publication_date.clone();
        }

        if self.full_authors.is_empty() {
            self.full_authors = other.full_authors.clone();
            return;
        }
        for person in &mut self.full_authors {
            let surname = person.surname.as_deref().map(str::to_lowercase);
            let matched = other
                .full_authors
                .iter()
                .find(|o| o.surname.as_deref().map(str::to_lowercase) == surname);
            if let Some(reference) = matched {
                if reference.forename.is_some() {
                    person.forename = reference.forename.clone();
                    person.middle_name = reference.middle_name.clone();
                }
            }
        }
    }

    /// Copia apenas os identificadores que faltam no registro; devolve quantos foram copiados.
    pub fn inject_identifiers(&mut self, other: &BiblioRecord) -> usize {
        let mut injected = 0;
        for kind in [
            IdentifierKind::Doi,
            IdentifierKind::Arxiv,
            IdentifierKind::Pmid,
            IdentifierKind::Pmcid,
            IdentifierKind::Isbn,
        ] {
            let target = self.identifier_slot(kind);
            if target.is_some() {
                continue;
            }
            if let Some(value) = other.identifier(kind) {
                *target = Some(value.to_string());
                injected += 1;
            }
        }
        injected
    }
}

/// Separa endereços de e-mail (tab, vírgula, ponto-e-vírgula ou espaço) e
/// remove espaços internos do OCR.
pub fn split_emails(raw: &str) -> Vec<String> {
    raw.split(['\t', '\n', ',', ';'])
        .flat_map(|part| {
            let compact: String = part.split_whitespace().collect::<Vec<_>>().join("");
            if compact.matches('@').count() > 1 {
                part.split_whitespace().map(str::to_string).collect()
            } else {
                vec![compact]
            }
        })
        .map(|e| e.trim_matches(|c: char| matches!(c, '{' | '}' | '(' | ')' | '.')).to_string())
        .filter(|e| e.contains('@'))
        .collect()
}

/// Remove o prefixo "Keywords:" e a pontuação final do campo de palavras-chave.
pub fn clean_keywords(text: &str) -> String {
    let stripped = KEYWORD_PREFIX.replace(text, "");
    stripped.trim().trim_end_matches('.').trim().to_string()
}

/// Divide o campo em palavras-chave individuais.
pub fn segment_keywords(text: &str) -> Vec<Keyword> {
    let separators: &[char] = if text.contains([';', '·', '•']) {
        &[';', '·', '•', '\n']
    } else {
        &[',', '\n']
    };
    text.split(separators)
        .map(collapse_whitespace)
        .map(|k| k.trim_end_matches('.').to_string())
        .filter(|k| !k.is_empty())
        .map(|text| Keyword { text })
        .collect()
}
