//! # Léxico Compartilhado
//!
//! Dicionários e padrões consultados pelo extrator de features:
//! palavras comuns, nomes próprios, meses, nomes de lugares, e expressões
//! regulares para ano, e-mail e URL.
//!
//! O léxico é construído uma única vez por processo ([`Lexicon::shared`]) e
//! depois só é lido, então pode ser compartilhado entre pipelines que rodam em
//! threads diferentes.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::layout::LayoutToken;

/// Intervalo de tokens `[start, end]` (inclusivo) dentro de uma fatia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPosition {
    pub start: usize,
    pub end: usize,
}

impl OffsetPosition {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }
}

const COMMON_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "with", "we", "our",
    "abstract", "introduction", "keywords", "paper", "study", "analysis", "approach", "method",
    "methods", "results", "using", "based", "new", "model", "models", "data", "system",
    "systems", "learning", "university", "department", "institute", "laboratory", "school",
    "center", "centre", "research", "science", "sciences", "journal", "proceedings",
    "conference", "received", "accepted", "published", "available", "online", "copyright",
    "rights", "reserved", "email", "correspondence", "author", "authors", "volume", "issue",
];

const PROPER_NAMES: &[&str] = &[
    "adam", "alice", "andrew", "anna", "ben", "carlos", "charles", "chen", "daniel", "david",
    "doe", "elena", "emma", "eric", "fatima", "garcia", "george", "hans", "ivan", "james",
    "jane", "jean", "john", "jones", "jose", "julia", "kim", "lee", "li", "liu", "maria",
    "mark", "martin", "michael", "mohamed", "muller", "nguyen", "paul", "peter", "pierre",
    "robert", "rossi", "sarah", "silva", "smith", "sophie", "thomas", "wang", "wei", "william",
    "williams", "zhang", "brown", "johnson", "miller", "davis", "wilson", "taylor", "moore",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "sept", "oct", "nov", "dec",
];

const LOCATIONS: &[&str] = &[
    "paris", "berlin", "london", "new york", "san francisco", "los angeles", "boston",
    "cambridge", "oxford", "tokyo", "beijing", "shanghai", "montreal", "toronto", "sydney",
    "madrid", "barcelona", "rome", "milan", "munich", "zurich", "geneva", "amsterdam",
    "stockholm", "vienna", "prague", "lisbon", "são paulo", "rio de janeiro", "france",
    "germany", "usa", "united states", "united kingdom", "uk", "china", "japan", "canada",
    "australia", "spain", "italy", "switzerland", "netherlands", "sweden", "brazil", "india",
];

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[12][0-9]{3}").expect("regex de ano válida"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+\s*@\s*[A-Za-z0-9\-]+(\s*\.\s*[A-Za-z0-9\-]+)+")
        .expect("regex de e-mail válida")
});
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?\s*:\s*/\s*/|www\s*\.)[^\s]+").expect("regex de URL válida")
});

static SHARED: Lazy<Lexicon> = Lazy::new(Lexicon::new);

/// Recursos lexicais somente-leitura
#[derive(Debug, Clone)]
pub struct Lexicon {
    common_words: HashSet<String>,
    proper_names: HashSet<String>,
    months: HashSet<String>,
    /// Nomes de lugares como sequências de palavras em minúsculas
    locations: Vec<Vec<String>>,
}

impl Lexicon {
    pub fn new() -> Self {
        let to_set = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            common_words: to_set(COMMON_WORDS),
            proper_names: to_set(PROPER_NAMES),
            months: to_set(MONTHS),
            locations: LOCATIONS
                .iter()
                .map(|l| l.split_whitespace().map(str::to_string).collect())
                .collect(),
        }
    }

    /// Instância compartilhada por todo o processo
    pub fn shared() -> &'static Lexicon {
        &SHARED
    }

    pub fn add_proper_name(&mut self, name: &str) {
        self.proper_names.insert(name.to_lowercase());
    }

    pub fn add_location(&mut self, name: &str) {
        let parts: Vec<String> = name.split_whitespace().map(|p| p.to_lowercase()).collect();
        if !parts.is_empty() {
            self.locations.push(parts);
        }
    }

    pub fn is_common_word(&self, word: &str) -> bool {
        self.common_words.contains(&word.to_lowercase())
    }

    pub fn is_proper_name(&self, word: &str) -> bool {
        self.proper_names.contains(&word.to_lowercase())
    }

    pub fn is_month(&self, word: &str) -> bool {
        self.months.contains(&word.to_lowercase())
    }

    pub fn is_year(&self, word: &str) -> bool {
        YEAR_PATTERN.is_match(word)
    }

    /// Posições de nomes de lugar (multi-palavra) na fatia de tokens.
    ///
    /// Tokens brancos e quebras de linha entre as palavras são ignorados.
    pub fn location_positions(&self, tokens: &[LayoutToken]) -> Vec<OffsetPosition> {
        let visible: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_visible())
            .map(|(i, _)| i)
            .collect();

        let mut positions = Vec::new();
        let mut v = 0;
        while v < visible.len() {
            let mut longest = 0;
            for parts in &self.locations {
                if parts.len() > longest
                    && v + parts.len() <= visible.len()
                    && parts
                        .iter()
                        .enumerate()
                        .all(|(j, p)| tokens[visible[v + j]].text.to_lowercase() == *p)
                {
                    longest = parts.len();
                }
            }
            if longest > 0 {
                positions.push(OffsetPosition {
                    start: visible[v],
                    end: visible[v + longest - 1],
                });
                v += longest;
            } else {
                v += 1;
            }
        }
        positions
    }

    pub fn email_positions(&self, tokens: &[LayoutToken]) -> Vec<OffsetPosition> {
        pattern_positions(tokens, &EMAIL_PATTERN)
    }

    pub fn url_positions(&self, tokens: &[LayoutToken]) -> Vec<OffsetPosition> {
        pattern_positions(tokens, &URL_PATTERN)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

/// Aplica a regex ao texto concatenado e converte offsets de byte em índices de token.
fn pattern_positions(tokens: &[LayoutToken], pattern: &Regex) -> Vec<OffsetPosition> {
    let mut text = String::new();
    let mut starts = Vec::with_capacity(tokens.len());
    for token in tokens {
        starts.push(text.len());
        text.push_str(&token.text);
    }

    let token_at = |byte: usize| starts.partition_point(|s| *s <= byte).saturating_sub(1);

    pattern
        .find_iter(&text)
        .filter(|m| m.end() > m.start())
        .map(|m| OffsetPosition {
            start: token_at(m.start()),
            end: token_at(m.end() - 1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_line;

    fn tokens(text: &str) -> Vec<LayoutToken> {
        tokenize_line(text).into_iter().map(LayoutToken::plain).collect()
    }

    #[test]
    fn test_dictionary_probes() {
        let lex = Lexicon::shared();
        assert!(lex.is_common_word("The"));
        assert!(lex.is_proper_name("Smith"));
        assert!(lex.is_month("March"));
        assert!(lex.is_year("2019"));
        assert!(!lex.is_year("319"));
    }

    #[test]
    fn test_email_positions_cover_all_pieces() {
        let toks = tokens("contact: jane.doe@uni.edu now");
        // "contact", ":", " ", "jane", ".", "doe", "@", "uni", ".", "edu", " ", "now"
        let positions = Lexicon::shared().email_positions(&toks);
        assert_eq!(positions, vec![OffsetPosition { start: 3, end: 9 }]);
    }

    #[test]
    fn test_url_positions() {
        let toks = tokens("see https://example.org/x");
        let positions = Lexicon::shared().url_positions(&toks);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].start, 2);
        assert_eq!(positions[0].end, toks.len() - 1);
    }

    #[test]
    fn test_multiword_location() {
        let toks = tokens("Paris and New York");
        let positions = Lexicon::shared().location_positions(&toks);
        assert_eq!(
            positions,
            vec![
                OffsetPosition { start: 0, end: 0 },
                OffsetPosition { start: 4, end: 6 },
            ]
        );
    }

    #[test]
    fn test_added_location_is_found() {
        let mut lex = Lexicon::new();
        lex.add_location("Porto Alegre");
        let toks = tokens("Porto Alegre");
        assert_eq!(lex.location_positions(&toks).len(), 1);
    }
}
