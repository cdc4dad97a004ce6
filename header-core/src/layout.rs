//! # Modelo de Layout do Documento
//!
//! Tipos produzidos pela camada de decodificação de PDF (externa a este crate)
//! e consumidos em modo somente-leitura pelo pipeline de cabeçalho:
//!
//! - [`LayoutToken`]: unidade atômica de texto com geometria e tipografia.
//! - [`Block`]: sequência máxima de tokens com o mesmo layout (parágrafo visual).
//! - [`TokenRange`]: intervalo `[start, end)` de índices absolutos de tokens.
//! - [`Document`]: tokens + blocos + zonas (cabeçalho, corpo).
//!
//! O [`DocumentBuilder`] monta documentos a partir de linhas estilizadas, para
//! demonstrações e testes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tokenizer::tokenize_line;

/// Um token de layout: texto + posição + fonte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutToken {
    pub text: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Identificador da família de fonte
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub superscript: bool,
}

impl LayoutToken {
    /// Token sem geometria nem fonte
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            font: String::new(),
            font_size: 0.0,
            bold: false,
            italic: false,
            superscript: false,
        }
    }

    pub fn newline() -> Self {
        Self::plain("\n")
    }

    pub fn space() -> Self {
        Self::plain(" ")
    }

    /// Quebra rígida de linha (`\n` ou `\r`)
    pub fn is_newline(&self) -> bool {
        self.text == "\n" || self.text == "\r"
    }

    /// Vazio depois de remover espaços comuns e não-quebráveis
    pub fn is_blank(&self) -> bool {
        self.text
            .chars()
            .all(|c| c == ' ' || c == '\u{00A0}' || c == '\t')
    }

    /// Marcadores de imagem/página inseridos pela extração de PDF
    pub fn is_layout_marker(&self) -> bool {
        is_layout_marker_text(&self.text)
    }

    /// Token com conteúdo visível (nem branco, nem quebra, nem marcador)
    pub fn is_visible(&self) -> bool {
        !self.is_blank() && !self.is_newline() && !self.is_layout_marker()
    }
}

/// Texto que representa um marcador de imagem/página e nunca vira feature
pub fn is_layout_marker_text(text: &str) -> bool {
    const MARKERS: &[&str] = &["@IMAGE", "@PAGE", ".pbm", ".ppm", ".png", ".svg", ".jpg"];
    MARKERS.iter().any(|m| text.contains(m))
}

/// Intervalo semi-aberto `[start, end)` de índices absolutos de tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    /// Cria o intervalo; `start > end` vira intervalo vazio em `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Ordena, limita ao tamanho do documento e funde intervalos sobrepostos.
pub fn normalize_ranges(ranges: &[TokenRange], token_count: usize) -> Vec<TokenRange> {
    let mut sorted: Vec<TokenRange> = ranges
        .iter()
        .map(|r| TokenRange::new(r.start.min(token_count), r.end.min(token_count)))
        .filter(|r| !r.is_empty())
        .collect();
    sorted.sort();

    let mut merged: Vec<TokenRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Bloco visual: tokens `[start_token, end_token)` do documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub start_token: usize,
    pub end_token: usize,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub page: usize,
}

impl Block {
    pub fn tokens<'a>(&self, all: &'a [LayoutToken]) -> &'a [LayoutToken] {
        let end = self.end_token.min(all.len());
        let start = self.start_token.min(end);
        &all[start..end]
    }

    pub fn text(&self, all: &[LayoutToken]) -> String {
        self.tokens(all).iter().map(|t| t.text.as_str()).collect()
    }

    pub fn range(&self) -> TokenRange {
        TokenRange::new(self.start_token, self.end_token)
    }

    /// Densidade de caracteres: comprimento do texto / (altura × largura).
    ///
    /// Zero quando a área é nula ou o bloco é um marcador de imagem/página.
    pub fn character_density(&self, all: &[LayoutToken]) -> f64 {
        if self.height == 0.0 || self.width == 0.0 {
            return 0.0;
        }
        let text = self.text(all);
        if text.contains("@PAGE") || text.contains("@IMAGE") {
            return 0.0;
        }
        text.chars().count() as f64 / (self.height * self.width)
    }
}

/// Trecho de um bloco que cai dentro de um intervalo de zona
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub block_index: usize,
    pub start: usize,
    pub end: usize,
}

static DOI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b10\.\d{4,9}/[^\s"<>]+"#).expect("regex DOI válida"));

/// Documento com tokens, blocos e zonas rotuladas pela segmentação.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub tokens: Vec<LayoutToken>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Zona de cabeçalho
    #[serde(default)]
    pub header: Vec<TokenRange>,
    /// Zona de corpo (amostra para identificação de idioma)
    #[serde(default)]
    pub body: Vec<TokenRange>,
    /// Idioma detectado pelo pipeline
    #[serde(default)]
    pub language: Option<String>,
}

impl Document {
    pub fn header_ranges(&self) -> Vec<TokenRange> {
        normalize_ranges(&self.header, self.tokens.len())
    }

    pub fn body_ranges(&self) -> Vec<TokenRange> {
        normalize_ranges(&self.body, self.tokens.len())
    }

    /// Trechos de bloco cobertos pelos intervalos, em ordem de documento.
    pub fn block_spans(&self, ranges: &[TokenRange]) -> Vec<BlockSpan> {
        let mut spans = Vec::new();
        for range in ranges {
            for (block_index, block) in self.blocks.iter().enumerate() {
                let start = block.start_token.max(range.start);
                let end = block.end_token.min(range.end).min(self.tokens.len());
                if start < end {
                    spans.push(BlockSpan {
                        block_index,
                        start,
                        end,
                    });
                }
            }
        }
        spans
    }

    /// Limites globais (mínimo, máximo) de densidade entre os blocos com densidade positiva.
    pub fn density_bounds(&self) -> (f64, f64) {
        let densities: Vec<f64> = self
            .blocks
            .iter()
            .map(|b| b.character_density(&self.tokens))
            .filter(|d| *d > 0.0)
            .collect();
        if densities.is_empty() {
            return (0.0, 0.0);
        }
        let min = densities.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = densities.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    /// Texto das zonas, um espaço entre tokens visíveis
    pub fn zone_text(&self, ranges: &[TokenRange]) -> String {
        ranges
            .iter()
            .flat_map(|r| self.tokens[r.start..r.end].iter())
            .filter(|t| t.is_visible())
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn full_text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Strings distintas com formato de DOI encontradas no documento inteiro.
    pub fn doi_matches(&self) -> Vec<String> {
        let text = self.full_text();
        let mut found: Vec<String> = Vec::new();
        for m in DOI_PATTERN.find_iter(&text) {
            let doi = m
                .as_str()
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ')' | ']'))
                .to_string();
            if !found.contains(&doi) {
                found.push(doi);
            }
        }
        found
    }
}

/// Estilo tipográfico de um bloco montado pelo [`DocumentBuilder`]
#[derive(Debug, Clone)]
pub struct BlockStyle {
    pub font: String,
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub x: f64,
}

impl BlockStyle {
    pub fn new(font: &str, font_size: f64) -> Self {
        Self {
            font: font.to_string(),
            font_size,
            bold: false,
            italic: false,
            x: 50.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn at(mut self, x: f64) -> Self {
        self.x = x;
        self
    }

    fn char_width(&self) -> f64 {
        self.font_size * 0.5
    }
}

/// Monta um [`Document`] a partir de blocos de linhas estilizadas.
///
/// Cada caractere ocupa meia largura de fonte; espaços iniciais de uma linha
/// deslocam seu início (útil para simular recuo). Entre linhas de um bloco é
/// inserido um token `\n`.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    tokens: Vec<LayoutToken>,
    blocks: Vec<Block>,
    header_blocks: Option<(usize, usize)>,
    body_blocks: Option<(usize, usize)>,
    cursor_y: f64,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            cursor_y: 50.0,
            ..Default::default()
        }
    }

    pub fn block(mut self, style: BlockStyle, lines: &[&str]) -> Self {
        let start_token = self.tokens.len();
        let line_height = style.font_size * 1.2;
        let char_width = style.char_width();
        let mut max_width: f64 = 0.0;
        let top = self.cursor_y;

        for (line_no, line) in lines.iter().enumerate() {
            if line_no > 0 {
                self.tokens.push(LayoutToken::newline());
            }
            let indent = line.chars().take_while(|c| *c == ' ').count();
            let mut x = style.x + indent as f64 * char_width;
            let y = top + line_no as f64 * line_height;
            for piece in tokenize_line(line.trim_start()) {
                let width = piece.chars().count() as f64 * char_width;
                self.tokens.push(LayoutToken {
                    text: piece,
                    x,
                    y,
                    width,
                    height: style.font_size,
                    font: style.font.clone(),
                    font_size: style.font_size,
                    bold: style.bold,
                    italic: style.italic,
                    superscript: false,
                });
                x += width;
            }
            max_width = max_width.max(x - style.x);
        }

        let height = lines.len() as f64 * line_height;
        self.cursor_y += height + line_height;
        self.blocks.push(Block {
            start_token,
            end_token: self.tokens.len(),
            x: style.x,
            y: top,
            width: max_width,
            height,
            page: 0,
        });
        self
    }

    /// Marca os blocos `[first, last)` como zona de cabeçalho
    pub fn header_blocks(mut self, first: usize, last: usize) -> Self {
        self.header_blocks = Some((first, last));
        self
    }

    /// Marca os blocos `[first, last)` como zona de corpo
    pub fn body_blocks(mut self, first: usize, last: usize) -> Self {
        self.body_blocks = Some((first, last));
        self
    }

    fn zone(&self, blocks: Option<(usize, usize)>) -> Vec<TokenRange> {
        match blocks {
            Some((first, last)) if first < last && last <= self.blocks.len() => {
                vec![TokenRange::new(
                    self.blocks[first].start_token,
                    self.blocks[last - 1].end_token,
                )]
            }
            _ => vec![],
        }
    }

    pub fn build(self) -> Document {
        let header = self.zone(self.header_blocks);
        let body = self.zone(self.body_blocks);
        Document {
            tokens: self.tokens,
            blocks: self.blocks,
            header,
            body,
            language: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_sorted_and_merged() {
        let ranges = vec![
            TokenRange::new(10, 20),
            TokenRange::new(0, 5),
            TokenRange::new(15, 30),
            TokenRange::new(40, 35),
        ];
        let merged = normalize_ranges(&ranges, 25);
        assert_eq!(merged, vec![TokenRange::new(0, 5), TokenRange::new(10, 25)]);
    }

    #[test]
    fn test_density_is_text_over_area() {
        let mut tokens = Vec::new();
        for _ in 0..10 {
            tokens.push(LayoutToken::plain("abcdefghij"));
        }
        let block = Block {
            start_token: 0,
            end_token: 10,
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
            page: 0,
        };
        assert!((block.character_density(&tokens) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_density_of_page_marker_block_is_zero() {
        let tokens = vec![LayoutToken::plain("@PAGE")];
        let block = Block {
            start_token: 0,
            end_token: 1,
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
            page: 0,
        };
        assert_eq!(block.character_density(&tokens), 0.0);
    }

    #[test]
    fn test_builder_inserts_newlines_and_zones() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F1", 14.0), &["A Title", "Continued"])
            .block(BlockStyle::new("F2", 10.0), &["Body text"])
            .header_blocks(0, 1)
            .body_blocks(1, 2)
            .build();
        let texts: Vec<&str> = doc.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts[..5], ["A", " ", "Title", "\n", "Continued"]);
        assert_eq!(doc.header, vec![TokenRange::new(0, 5)]);
        assert_eq!(doc.body, vec![TokenRange::new(5, 8)]);
    }

    #[test]
    fn test_block_spans_clip_to_range() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F1", 14.0), &["one two"])
            .block(BlockStyle::new("F1", 14.0), &["three four"])
            .build();
        let spans = doc.block_spans(&[TokenRange::new(2, 5)]);
        assert_eq!(
            spans,
            vec![
                BlockSpan { block_index: 0, start: 2, end: 3 },
                BlockSpan { block_index: 1, start: 3, end: 5 },
            ]
        );
    }

    #[test]
    fn test_doi_matches_are_distinct() {
        let doc = DocumentBuilder::new()
            .block(
                BlockStyle::new("F1", 10.0),
                &["doi 10.1000/xyz123 and again 10.1000/xyz123."],
            )
            .build();
        assert_eq!(doc.doi_matches(), vec!["10.1000/xyz123".to_string()]);
    }
}
