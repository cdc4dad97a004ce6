//! Utilitários de texto: reconstrução a partir de tokens e deshifenização.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::layout::LayoutToken;

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("regex válida"));
static SOFT_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\p{L})-[ \t]*\n[ \t]*(\p{Ll})").expect("regex de hifenização válida")
});
static HARD_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\p{L})-[ \t]*\n[ \t]*(\p{L})").expect("regex de hifenização válida")
});

/// Concatenação exata do texto dos tokens, sem o espaço das pontas
pub fn tokens_to_raw_text(tokens: &[LayoutToken]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Texto normalizado de um cluster: palavras hifenizadas no fim de linha são
/// reunidas e as quebras viram espaço simples.
pub fn tokens_to_dehyphenized_text(tokens: &[LayoutToken]) -> String {
    dehyphenize(&tokens.iter().map(|t| t.text.as_str()).collect::<String>())
}

/// Junta `pala-\nvra` em `palavra` quando a continuação começa em minúscula.
pub fn dehyphenize(text: &str) -> String {
    collapse_whitespace(&SOFT_BREAK.replace_all(text, "$1$2"))
}

/// Variante agressiva usada no resumo: junta qualquer hífen de fim de linha.
pub fn dehyphenize_hard(text: &str) -> String {
    collapse_whitespace(&HARD_BREAK.replace_all(text, "$1$2"))
}

/// Quebras de linha e brancos consecutivos viram um espaço
pub fn collapse_whitespace(text: &str) -> String {
    let unbroken = text.replace(['\n', '\r'], " ");
    SPACES.replace_all(&unbroken, " ").trim().to_string()
}

/// Forma simplificada para comparar conteúdos: minúsculas, sem espaços
pub fn simplify(text: &str) -> String {
    text.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// `true` se o novo conteúdo difere do existente (comparação simplificada)
pub fn is_different_content(existing: &str, new: &str) -> bool {
    simplify(existing) != simplify(new)
}

/// `true` se o novo conteúdo não é igual nem está contido no existente
/// (ignorando maiúsculas, espaços e hífens).
pub fn is_different_and_not_included(existing: &str, new: &str) -> bool {
    let strip = |s: &str| simplify(s).replace('-', "");
    let existing = strip(existing);
    let new = strip(new);
    new != existing && !existing.contains(&new)
}

/// Escapa `&`, `<` e `>` para a marcação de treinamento
pub fn html_encode(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
