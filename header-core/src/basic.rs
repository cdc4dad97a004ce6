//! # Colaboradores Embutidos
//!
//! Implementações simples dos contratos de [`crate::parsers`], suficientes
//! para rodar o pipeline inteiro sem modelos externos:
//!
//! - [`RuleTagger`]: rotulação por regras de layout (ver [`crate::rule_based`])
//! - [`SimpleNameParser`]: nomes separados por vírgula, ponto e vírgula ou "and"
//! - [`RegexDateParser`]: datas ISO, "12 March 2019", "March 12, 2019", "March 2019" e anos soltos
//! - [`ClusterAffiliationParser`]: um bloco por marcador, com instituições e departamentos
//! - [`StopwordLanguageIdentifier`]: contagem de palavras funcionais por idioma
//! - [`StaticConsolidator`]: catálogo em memória indexado por DOI e título

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_segmentation::UnicodeSegmentation;

use crate::cluster::LabelCluster;
use crate::error::ExternalError;
use crate::labels::HeaderLabel;
use crate::layout::LayoutToken;
use crate::parsers::{AffiliationParser, Consolidator, DateParser, LanguageIdentifier, NameParser};
use crate::record::{Affiliation, BiblioRecord, Date, Person};
use crate::text::{simplify, tokens_to_dehyphenized_text};

pub use crate::rule_based::RuleTagger;

// ============================================================
// NOMES
// ============================================================

const PERSON_TITLES: &[&str] = &["dr", "prof", "professor", "mr", "mrs", "ms", "sir"];
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];
const SURNAME_PARTICLES: &[&str] = &["van", "von", "de", "da", "del", "der", "di", "la", "le", "du"];
const REFERENCE_MARKS: &[&str] = &["*", "†", "‡", "§", "¶"];

/// Parser de nomes por regras.
///
/// A última palavra (com partículas como "van" ou "de") é o sobrenome, a
/// primeira é o prenome e o resto vira nome do meio. Tokens sobrescritos,
/// números curtos e símbolos como `*` ou `†` são marcadores de afiliação.
#[derive(Debug, Clone, Default)]
pub struct SimpleNameParser;

#[derive(Default)]
struct PendingName {
    words: Vec<String>,
    markers: Vec<String>,
}

impl PendingName {
    fn push_marker(&mut self, marker: &str) {
        let marker = marker.trim();
        if !marker.is_empty() && !self.markers.iter().any(|m| m == marker) {
            self.markers.push(marker.to_string());
        }
    }

    fn finish(&mut self, persons: &mut Vec<Person>) {
        let pending = std::mem::take(self);
        if pending.words.is_empty() {
            // marcador solto depois da vírgula pertence ao autor anterior
            if let Some(last) = persons.last_mut() {
                for marker in pending.markers {
                    if !last.markers.contains(&marker) {
                        last.markers.push(marker);
                    }
                }
            }
            return;
        }
        persons.push(build_person(pending.words, pending.markers));
    }
}

fn build_person(mut words: Vec<String>, markers: Vec<String>) -> Person {
    let bare = |w: &str| w.trim_end_matches('.').to_lowercase();

    let title = match words.first() {
        Some(first) if words.len() > 1 && PERSON_TITLES.contains(&bare(first).as_str()) => {
            Some(words.remove(0))
        }
        _ => None,
    };
    let suffix = match words.last() {
        Some(last) if words.len() > 1 && NAME_SUFFIXES.contains(&bare(last).as_str()) => words.pop(),
        _ => None,
    };

    let noise = words.len() > 6 || words.iter().any(|w| !w.chars().any(char::is_alphabetic));

    let mut surname_start = words.len().saturating_sub(1);
    while surname_start > 1 && SURNAME_PARTICLES.contains(&words[surname_start - 1].to_lowercase().as_str()) {
        surname_start -= 1;
    }
    let surname = words[surname_start..].join(" ");
    let given = &words[..surname_start];

    Person {
        forename: given.first().cloned(),
        middle_name: (given.len() > 1).then(|| given[1..].join(" ")),
        surname: (!surname.is_empty()).then_some(surname),
        title,
        suffix,
        markers,
        noise,
        ..Default::default()
    }
}

impl NameParser for SimpleNameParser {
    fn parse_tokens(&self, tokens: &[LayoutToken]) -> Result<Vec<Person>, ExternalError> {
        let mut persons = Vec::new();
        let mut pending = PendingName::default();

        for token in tokens {
            if !token.is_visible() {
                continue;
            }
            let text = token.text.trim();
            if token.superscript {
                for marker in text.split(',') {
                    pending.push_marker(marker);
                }
                continue;
            }
            if matches!(text, "," | ";" | "&") || text.eq_ignore_ascii_case("and") {
                pending.finish(&mut persons);
                continue;
            }
            if REFERENCE_MARKS.contains(&text) {
                pending.push_marker(text);
                continue;
            }
            if text.chars().all(|c| c.is_ascii_digit()) {
                if text.len() <= 2 {
                    pending.push_marker(text);
                }
                continue;
            }
            if text == "." {
                if let Some(last) = pending.words.last_mut() {
                    if last.chars().count() == 1 {
                        last.push('.');
                    }
                }
                continue;
            }
            if !text.chars().any(char::is_alphabetic) {
                continue;
            }
            // "Doe1" → palavra "Doe" + marcador "1"
            let word = text.trim_end_matches(|c: char| c.is_ascii_digit());
            if word.len() < text.len() {
                pending.push_marker(&text[word.len()..]);
            }
            pending.words.push(word.to_string());
        }
        pending.finish(&mut persons);
        Ok(persons)
    }
}

// ============================================================
// DATAS
// ============================================================

const MONTH_ALTERNATION: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("regex de data ISO válida")
});
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTH_ALTERNATION})[a-z]*\.?,?\s+(\d{{4}})\b"
    ))
    .expect("regex dia-mês-ano válida")
});
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_ALTERNATION})[a-z]*\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .expect("regex mês-dia-ano válida")
});
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTH_ALTERNATION})[a-z]*\.?,?\s+(\d{{4}})\b"))
        .expect("regex mês-ano válida")
});
static YEAR_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").expect("regex de ano válida"));

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    MONTH_ALTERNATION
        .split('|')
        .position(|m| m == prefix)
        .map(|i| i as u32 + 1)
}

fn number<T: std::str::FromStr>(caps: &Captures, group: usize) -> Option<T> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Padrão de data com a função que interpreta as capturas
type DatePattern = (&'static Lazy<Regex>, fn(&Captures) -> Option<(i32, Option<u32>, Option<u32>)>);

static DATE_PATTERNS: [DatePattern; 5] = [
    (&ISO_DATE, |c| Some((number(c, 1)?, number(c, 2), number(c, 3)))),
    (&DAY_MONTH_YEAR, |c| {
        Some((number(c, 3)?, month_number(c.get(2)?.as_str()), number(c, 1)))
    }),
    (&MONTH_DAY_YEAR, |c| {
        Some((number(c, 3)?, month_number(c.get(1)?.as_str()), number(c, 2)))
    }),
    (&MONTH_YEAR, |c| Some((number(c, 2)?, month_number(c.get(1)?.as_str()), None))),
    (&YEAR_ONLY, |c| Some((number(c, 1)?, None, None))),
];

/// Parser de datas por expressões regulares.
///
/// Os padrões mais específicos são tentados primeiro; um trecho já
/// reconhecido não é reaproveitado por um padrão mais fraco. Os candidatos
/// saem na ordem em que aparecem no texto.
#[derive(Debug, Clone, Default)]
pub struct RegexDateParser;

impl DateParser for RegexDateParser {
    fn parse(&self, text: &str) -> Result<Vec<Date>, ExternalError> {
        let mut found: Vec<(usize, usize, Date)> = Vec::new();
        for (pattern, interpret) in DATE_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let overlaps = found
                    .iter()
                    .any(|(s, e, _)| whole.start() < *e && *s < whole.end());
                if overlaps {
                    continue;
                }
                let Some((year, month, day)) = interpret(&caps) else {
                    continue;
                };
                let month = month.filter(|m| (1..=12).contains(m));
                let day = day.filter(|d| (1..=31).contains(d) && month.is_some());
                found.push((
                    whole.start(),
                    whole.end(),
                    Date {
                        year: Some(year),
                        month,
                        day,
                        raw: whole.as_str().to_string(),
                    },
                ));
            }
        }
        found.sort_by_key(|(start, _, _)| *start);
        Ok(found.into_iter().map(|(_, _, date)| date).collect())
    }
}

// ============================================================
// AFILIAÇÕES
// ============================================================

const INSTITUTION_WORDS: &[&str] = &[
    "universit", "institut", "college", "school", "academy", "inria", "cnrs", "hospital",
    "polytechn", "corporation", "inc",
];
const DEPARTMENT_WORDS: &[&str] = &["department", "dept", "faculty", "division", "dpto"];
const LABORATORY_WORDS: &[&str] = &["laborator", "lab", "group", "center", "centre", "team"];

/// Parser de afiliações a partir dos clusters rotulados.
///
/// Cada cluster AFFILIATION é dividido em blocos nos marcadores (token
/// sobrescrito, símbolo de nota ou número curto no início de linha). As
/// partes separadas por vírgula são classificadas como instituição,
/// departamento ou laboratório; o que sobra forma o endereço. Um cluster
/// ADDRESS completa o endereço do último bloco.
#[derive(Debug, Clone, Default)]
pub struct ClusterAffiliationParser;

fn is_marker_token(token: &LayoutToken, line_start: bool) -> bool {
    let text = token.text.trim();
    if text.is_empty() {
        return false;
    }
    token.superscript
        || REFERENCE_MARKS.contains(&text)
        || (line_start && text.len() <= 2 && text.chars().all(|c| c.is_ascii_digit()))
}

/// Divide os tokens do cluster em (marcador, tokens do bloco)
fn split_on_markers(tokens: &[LayoutToken]) -> Vec<(Option<String>, Vec<LayoutToken>)> {
    let mut blocks: Vec<(Option<String>, Vec<LayoutToken>)> = Vec::new();
    let mut line_start = true;
    for token in tokens {
        if token.is_newline() {
            line_start = true;
            if let Some((_, current)) = blocks.last_mut() {
                current.push(token.clone());
            }
            continue;
        }
        if !token.is_visible() {
            if let Some((_, current)) = blocks.last_mut() {
                current.push(token.clone());
            }
            continue;
        }
        if is_marker_token(token, line_start) {
            let marker = token.text.trim().to_string();
            match blocks.last_mut() {
                // marcadores seguidos ("1,2") ficam no mesmo bloco
                Some((Some(existing), current)) if !current.iter().any(LayoutToken::is_visible) => {
                    existing.push(',');
                    existing.push_str(&marker);
                }
                _ => blocks.push((Some(marker), Vec::new())),
            }
            line_start = false;
            continue;
        }
        line_start = false;
        match blocks.last_mut() {
            Some((_, current)) => current.push(token.clone()),
            None => blocks.push((None, vec![token.clone()])),
        }
    }
    blocks
        .into_iter()
        .filter(|(_, tokens)| tokens.iter().any(LayoutToken::is_visible))
        .collect()
}

fn matches_any(part: &str, words: &[&str]) -> bool {
    let lower = part.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| words.iter().any(|k| w.starts_with(k)))
}

fn classify_affiliation(marker: Option<String>, raw: String) -> Affiliation {
    let mut affiliation = Affiliation {
        marker,
        ..Default::default()
    };
    let mut rest = Vec::new();
    for part in raw.split([',', ';']).map(str::trim).filter(|p| !p.is_empty()) {
        if matches_any(part, DEPARTMENT_WORDS) {
            affiliation.departments.push(part.to_string());
        } else if matches_any(part, LABORATORY_WORDS) {
            affiliation.laboratories.push(part.to_string());
        } else if matches_any(part, INSTITUTION_WORDS) {
            affiliation.institutions.push(part.to_string());
        } else {
            rest.push(part);
        }
    }
    if !rest.is_empty() {
        affiliation.address = Some(rest.join(", "));
    }
    affiliation.raw = raw;
    affiliation
}

impl AffiliationParser for ClusterAffiliationParser {
    fn parse(&self, clusters: &[LabelCluster]) -> Result<Vec<Affiliation>, ExternalError> {
        let mut affiliations: Vec<Affiliation> = Vec::new();
        for cluster in clusters {
            match cluster.label {
                HeaderLabel::Affiliation => {
                    for (marker, tokens) in split_on_markers(&cluster.tokens) {
                        let raw = tokens_to_dehyphenized_text(&tokens);
                        if !raw.is_empty() {
                            affiliations.push(classify_affiliation(marker, raw));
                        }
                    }
                }
                HeaderLabel::Address => {
                    if let Some(last) = affiliations.last_mut() {
                        last.address = Some(match last.address.take() {
                            Some(existing) => format!("{existing}, {}", cluster.text),
                            None => cluster.text.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(affiliations)
    }
}

// ============================================================
// IDIOMA
// ============================================================

const LANGUAGE_PROFILES: &[(&str, &[&str])] = &[
    ("en", &["the", "of", "and", "to", "in", "is", "that", "for", "with", "are", "this", "we", "on", "by"]),
    ("fr", &["le", "la", "les", "des", "et", "est", "dans", "une", "pour", "que", "du", "sur", "nous", "au"]),
    ("de", &["der", "die", "das", "und", "ist", "nicht", "mit", "den", "ein", "eine", "für", "wir", "auf", "zu"]),
    ("es", &["el", "los", "las", "y", "es", "en", "una", "para", "que", "del", "por", "con", "se", "al"]),
    ("pt", &["o", "os", "as", "e", "é", "em", "uma", "para", "que", "do", "da", "dos", "com", "não"]),
    ("it", &["il", "gli", "e", "è", "di", "che", "una", "per", "della", "nel", "con", "sono", "non", "alla"]),
];

/// Identificação de idioma por palavras funcionais.
///
/// Conta, para cada perfil, quantas palavras do texto são palavras
/// funcionais do idioma; vence o perfil com mais ocorrências, desde que
/// atinja o mínimo e não empate com outro.
#[derive(Debug, Clone)]
pub struct StopwordLanguageIdentifier {
    min_hits: usize,
}

impl StopwordLanguageIdentifier {
    pub fn new() -> Self {
        Self { min_hits: 2 }
    }

    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits.max(1);
        self
    }

    /// Contagem por idioma, na ordem dos perfis
    pub fn scores(&self, text: &str) -> Vec<(&'static str, usize)> {
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
        LANGUAGE_PROFILES
            .iter()
            .map(|(lang, stopwords)| {
                let hits = words.iter().filter(|w| stopwords.contains(&w.as_str())).count();
                (*lang, hits)
            })
            .collect()
    }
}

impl Default for StopwordLanguageIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageIdentifier for StopwordLanguageIdentifier {
    fn identify(&self, text: &str) -> Option<String> {
        let scores = self.scores(text);
        let best = scores.iter().map(|(_, hits)| *hits).max()?;
        if best < self.min_hits {
            return None;
        }
        let mut winners = scores.iter().filter(|(_, hits)| *hits == best);
        let (lang, _) = winners.next()?;
        if winners.next().is_some() {
            return None;
        }
        Some(lang.to_string())
    }
}

// ============================================================
// CONSOLIDAÇÃO
// ============================================================

/// Catálogo bibliográfico em memória.
///
/// Procura primeiro pelo DOI (sem diferenciar maiúsculas) e depois pelo
/// título simplificado.
#[derive(Debug, Clone, Default)]
pub struct StaticConsolidator {
    entries: Vec<BiblioRecord>,
}

impl StaticConsolidator {
    pub fn new(entries: Vec<BiblioRecord>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: BiblioRecord) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, record: &BiblioRecord) -> Option<&BiblioRecord> {
        if let Some(doi) = record.doi.as_deref() {
            let by_doi = self.entries.iter().find(|e| {
                e.doi
                    .as_deref()
                    .is_some_and(|other| other.eq_ignore_ascii_case(doi))
            });
            if by_doi.is_some() {
                return by_doi;
            }
        }
        let title = simplify(record.title.as_deref()?);
        if title.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.title.as_deref().is_some_and(|t| simplify(t) == title))
    }
}

impl Consolidator for StaticConsolidator {
    fn consolidate(&self, record: &BiblioRecord) -> Result<Option<BiblioRecord>, ExternalError> {
        Ok(self.find(record).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::text_to_layout_tokens;

    fn cluster(label: HeaderLabel, tokens: Vec<LayoutToken>) -> LabelCluster {
        let text = tokens_to_dehyphenized_text(&tokens);
        LabelCluster {
            label,
            tag: label.tag().to_string(),
            start: 0,
            end: tokens.len(),
            raw_text: text.clone(),
            text,
            tokens,
        }
    }

    // --- nomes ---

    #[test]
    fn test_names_split_on_comma_and_and() {
        let persons = SimpleNameParser.parse_text("Jane Doe, John Smith and Ann Lee").unwrap();
        let surnames: Vec<&str> = persons.iter().filter_map(|p| p.surname.as_deref()).collect();
        assert_eq!(surnames, vec!["Doe", "Smith", "Lee"]);
        assert_eq!(persons[0].forename.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_initials_middle_names_and_particles() {
        let persons = SimpleNameParser.parse_text("Dr. J. R. R. Tolkien; Ludwig van Beethoven Jr.").unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].title.as_deref(), Some("Dr"));
        assert_eq!(persons[0].forename.as_deref(), Some("J."));
        assert_eq!(persons[0].middle_name.as_deref(), Some("R. R."));
        assert_eq!(persons[1].surname.as_deref(), Some("van Beethoven"));
        assert_eq!(persons[1].suffix.as_deref(), Some("Jr"));
    }

    #[test]
    fn test_markers_from_superscripts_and_glued_digits() {
        let mut tokens = text_to_layout_tokens("Jane Doe 1 , John Smith2 *");
        for token in tokens.iter_mut().filter(|t| t.text == "1") {
            token.superscript = true;
        }
        let persons = SimpleNameParser.parse_tokens(&tokens).unwrap();
        assert_eq!(persons[0].markers, vec!["1"]);
        assert_eq!(persons[1].surname.as_deref(), Some("Smith"));
        assert_eq!(persons[1].markers, vec!["2", "*"]);
    }

    // --- datas ---

    #[test]
    fn test_date_formats() {
        let dates = RegexDateParser.parse("Published 2019-03-12").unwrap();
        assert_eq!((dates[0].year, dates[0].month, dates[0].day), (Some(2019), Some(3), Some(12)));

        let dates = RegexDateParser.parse("12 March 2019").unwrap();
        assert_eq!((dates[0].month, dates[0].day), (Some(3), Some(12)));

        let dates = RegexDateParser.parse("Sept. 5, 2001").unwrap();
        assert_eq!((dates[0].year, dates[0].month, dates[0].day), (Some(2001), Some(9), Some(5)));

        let dates = RegexDateParser.parse("June 1998").unwrap();
        assert_eq!((dates[0].month, dates[0].day), (Some(6), None));
    }

    #[test]
    fn test_dates_in_text_order_without_overlap() {
        let dates = RegexDateParser
            .parse("Received 1 May 2018; accepted in 2019")
            .unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].year, Some(2018));
        assert_eq!(dates[0].raw, "1 May 2018");
        assert_eq!(dates[1].year, Some(2019));
        assert!(RegexDateParser.parse("no date here").unwrap().is_empty());
    }

    // --- afiliações ---

    #[test]
    fn test_affiliation_blocks_split_on_markers() {
        let tokens = text_to_layout_tokens(
            "1 Department of Computer Science, University of Paris, France\n2 INRIA, Grenoble",
        );
        let parsed = ClusterAffiliationParser
            .parse(&[cluster(HeaderLabel::Affiliation, tokens)])
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].marker.as_deref(), Some("1"));
        assert_eq!(parsed[0].departments, vec!["Department of Computer Science"]);
        assert_eq!(parsed[0].institutions, vec!["University of Paris"]);
        assert_eq!(parsed[0].address.as_deref(), Some("France"));
        assert_eq!(parsed[1].marker.as_deref(), Some("2"));
        assert_eq!(parsed[1].institutions, vec!["INRIA"]);
    }

    #[test]
    fn test_address_cluster_completes_last_block() {
        let parsed = ClusterAffiliationParser
            .parse(&[
                cluster(HeaderLabel::Affiliation, text_to_layout_tokens("Research Lab")),
                cluster(HeaderLabel::Address, text_to_layout_tokens("Berlin, Germany")),
            ])
            .unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].marker.is_none());
        assert_eq!(parsed[0].laboratories, vec!["Research Lab"]);
        assert_eq!(parsed[0].address.as_deref(), Some("Berlin, Germany"));
    }

    // --- idioma ---

    #[test]
    fn test_language_profiles() {
        let id = StopwordLanguageIdentifier::new();
        assert_eq!(
            id.identify("We present the results of a study on the extraction of headers").as_deref(),
            Some("en")
        );
        assert_eq!(
            id.identify("Nous présentons les résultats dans une étude sur la extraction des en-têtes").as_deref(),
            Some("fr")
        );
        assert_eq!(id.identify("Kryptonite").as_deref(), None);
    }

    // --- consolidação ---

    #[test]
    fn test_static_lookup_by_doi_then_title() {
        let catalog = StaticConsolidator::new(vec![BiblioRecord {
            title: Some("Header Extraction".to_string()),
            doi: Some("10.1000/ABC".to_string()),
            ..Default::default()
        }]);
        let by_doi = BiblioRecord {
            doi: Some("10.1000/abc".to_string()),
            ..Default::default()
        };
        assert!(catalog.consolidate(&by_doi).unwrap().is_some());

        let by_title = BiblioRecord {
            title: Some("header  extraction".to_string()),
            ..Default::default()
        };
        assert!(catalog.consolidate(&by_title).unwrap().is_some());

        let unknown = BiblioRecord {
            title: Some("Something Else".to_string()),
            ..Default::default()
        };
        assert!(catalog.consolidate(&unknown).unwrap().is_none());
    }
}
