//! # Tokenizador de Linhas de Layout
//!
//! Divide o texto de uma linha nas mesmas unidades que o extrator de layout
//! produz: palavras, cada sinal de pontuação isolado, e espaços como tokens
//! explícitos (`" "`). Os espaços nunca viram linha de features, mas guiam a
//! reconstrução do texto de cada cluster e a marcação de treinamento.
//!
//! ## Exemplo
//!
//! ```rust
//! use header_core::tokenizer::tokenize_line;
//!
//! let pieces = tokenize_line("Doe, J.");
//! assert_eq!(pieces, vec!["Doe", ",", " ", "J", "."]);
//! ```

use crate::layout::LayoutToken;

/// Delimitadores que sempre formam um token próprio
pub const DELIMITERS: &str = "\n\r\t\u{00A0}([^%‰‱@°#$&*+,-./:;<=>?_`{|}~)]\"'’‘“”–—•·†‡§¶";

fn is_delimiter(c: char) -> bool {
    c == ' ' || DELIMITERS.contains(c)
}

/// Tokeniza uma linha preservando espaços como tokens.
///
/// Espaços consecutivos viram um único token `" "`.
pub fn tokenize_line(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_delimiter(c) {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if c == ' ' {
                if pieces.last().map(|p| p == " ").unwrap_or(false) {
                    continue;
                }
                pieces.push(" ".to_string());
            } else {
                pieces.push(c.to_string());
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Converte texto livre (possivelmente multi-linha) em tokens de layout sem geometria.
///
/// Usado quando um campo só existe como string (ex: editores) e precisa ser
/// enviado a um parser que consome tokens.
pub fn text_to_layout_tokens(text: &str) -> Vec<LayoutToken> {
    let mut tokens = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(LayoutToken::newline());
        }
        tokens.extend(tokenize_line(line).into_iter().map(LayoutToken::plain));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_is_split() {
        assert_eq!(
            tokenize_line("(Doe et al.)"),
            vec!["(", "Doe", " ", "et", " ", "al", ".", ")"]
        );
    }

    #[test]
    fn test_spaces_collapse() {
        assert_eq!(tokenize_line("a   b"), vec!["a", " ", "b"]);
    }

    #[test]
    fn test_email_is_split_on_at_and_dot() {
        let pieces = tokenize_line("jane@uni.edu");
        assert_eq!(pieces, vec!["jane", "@", "uni", ".", "edu"]);
    }

    #[test]
    fn test_multiline_text_gets_newline_tokens() {
        let tokens = text_to_layout_tokens("Jane Doe\nJohn Smith");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Jane", " ", "Doe", "\n", "John", " ", "Smith"]);
    }
}
