//! # Extração de Features de Layout
//!
//! Converte os tokens da zona de cabeçalho no esquema simbólico de colunas fixas
//! que o modelo de rotulação sequencial espera: uma linha por token retido,
//! colunas separadas por espaço, sempre na mesma ordem.
//!
//! ## Colunas (32)
//!
//! | # | Coluna | Valores |
//! |---|--------|---------|
//! | 1-2 | token, minúsculas | texto |
//! | 3-10 | prefixos e sufixos de 1 a 4 caracteres | texto |
//! | 11 | bloco | `BLOCKSTART` `BLOCKIN` `BLOCKEND` |
//! | 12 | linha | `LINESTART` `LINEIN` `LINEEND` |
//! | 13 | alinhamento | `ALIGNEDLEFT` `LINEINDENT` |
//! | 14 | fonte | `NEWFONT` `SAMEFONT` |
//! | 15 | tamanho de fonte | `HIGHERFONT` `SAMEFONTSIZE` `LOWERFONT` |
//! | 16-17 | negrito, itálico | `0`/`1` |
//! | 18 | capitalização | `ALLCAP` `INITCAP` `NOCAPS` |
//! | 19 | dígitos | `ALLDIGIT` `CONTAINSDIGITS` `NODIGIT` |
//! | 20 | caractere único | `0`/`1` |
//! | 21-27 | nome próprio, palavra comum, ano, mês, lugar, e-mail, URL | `0`/`1` |
//! | 28 | pontuação | `OPENBRACKET` `ENDBRACKET` `DOT` `COMMA` `HYPHEN` `QUOTE` `PUNCT` `NOPUNCT` |
//! | 29-31 | maior fonte, menor fonte, acima da média | `0`/`1` |
//! | 32 | faixa de densidade de caracteres | `0..bins` |
//!
//! Nenhuma coluna fica ausente: quando nenhuma condição dispara, vale o
//! marcador padrão (`NOCAPS`, `NODIGIT`, `NOPUNCT`, `0`...).
//!
//! ## Emissão com atraso de um token
//!
//! O status de fim de bloco só é conhecido depois de ver o próximo token.
//! [`FeatureRows`] guarda a linha pendente num segundo slot e só a entrega
//! quando a seguinte está pronta; no fim de cada trecho de bloco, a pendente é
//! forçada para `LINEEND`/`BLOCKEND` e descarregada.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_DENSITY_BINS;
use crate::layout::{is_layout_marker_text, BlockSpan, Document, LayoutToken, TokenRange};
use crate::lexicon::{Lexicon, OffsetPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    LineStart,
    LineIn,
    LineEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    BlockStart,
    BlockIn,
    BlockEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    AlignedLeft,
    LineIndent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontStatus {
    NewFont,
    SameFont,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontSizeTrend {
    HigherFont,
    SameFontSize,
    LowerFont,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capitalisation {
    AllCap,
    InitCap,
    NoCaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigitClass {
    AllDigit,
    ContainsDigits,
    NoDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PunctClass {
    OpenBracket,
    EndBracket,
    Dot,
    Comma,
    Hyphen,
    Quote,
    Punct,
    NoPunct,
}

macro_rules! symbol_display {
    ($ty:ty { $($variant:ident => $symbol:literal),+ $(,)? }) => {
        impl $ty {
            pub fn symbol(&self) -> &'static str {
                match self {
                    $(Self::$variant => $symbol),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.symbol())
            }
        }
    };
}

symbol_display!(LineStatus { LineStart => "LINESTART", LineIn => "LINEIN", LineEnd => "LINEEND" });
symbol_display!(BlockStatus { BlockStart => "BLOCKSTART", BlockIn => "BLOCKIN", BlockEnd => "BLOCKEND" });
symbol_display!(Alignment { AlignedLeft => "ALIGNEDLEFT", LineIndent => "LINEINDENT" });
symbol_display!(FontStatus { NewFont => "NEWFONT", SameFont => "SAMEFONT" });
symbol_display!(FontSizeTrend {
    HigherFont => "HIGHERFONT",
    SameFontSize => "SAMEFONTSIZE",
    LowerFont => "LOWERFONT",
});
symbol_display!(Capitalisation { AllCap => "ALLCAP", InitCap => "INITCAP", NoCaps => "NOCAPS" });
symbol_display!(DigitClass {
    AllDigit => "ALLDIGIT",
    ContainsDigits => "CONTAINSDIGITS",
    NoDigit => "NODIGIT",
});
symbol_display!(PunctClass {
    OpenBracket => "OPENBRACKET",
    EndBracket => "ENDBRACKET",
    Dot => "DOT",
    Comma => "COMMA",
    Hyphen => "HYPHEN",
    Quote => "QUOTE",
    Punct => "PUNCT",
    NoPunct => "NOPUNCT",
});

/// Vetor de features de um token retido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub string: String,
    pub block_status: BlockStatus,
    pub line_status: LineStatus,
    pub alignment: Alignment,
    pub font_status: FontStatus,
    pub font_size: FontSizeTrend,
    pub bold: bool,
    pub italic: bool,
    pub capitalisation: Capitalisation,
    pub digit: DigitClass,
    pub single_char: bool,
    pub proper_name: bool,
    pub common_name: bool,
    pub year: bool,
    pub month: bool,
    pub location_name: bool,
    pub email: bool,
    pub http: bool,
    pub punct: PunctClass,
    pub largest_font: bool,
    pub smallest_font: bool,
    pub larger_than_average_font: bool,
    pub density_bin: usize,
}

impl FeatureVector {
    /// Número fixo de colunas exigido pelo modelo
    pub const COLUMN_COUNT: usize = 32;

    /// Vetor com todos os marcadores padrão
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            block_status: BlockStatus::BlockIn,
            line_status: LineStatus::LineIn,
            alignment: Alignment::AlignedLeft,
            font_status: FontStatus::SameFont,
            font_size: FontSizeTrend::SameFontSize,
            bold: false,
            italic: false,
            capitalisation: Capitalisation::NoCaps,
            digit: DigitClass::NoDigit,
            single_char: false,
            proper_name: false,
            common_name: false,
            year: false,
            month: false,
            location_name: false,
            email: false,
            http: false,
            punct: PunctClass::NoPunct,
            largest_font: false,
            smallest_font: false,
            larger_than_average_font: false,
            density_bin: 0,
        }
    }

    /// Colunas na ordem do esquema
    pub fn columns(&self) -> Vec<String> {
        let flag = |b: bool| if b { "1".to_string() } else { "0".to_string() };
        let mut cols = Vec::with_capacity(Self::COLUMN_COUNT);
        cols.push(self.string.clone());
        cols.push(self.string.to_lowercase());
        for n in 1..=4 {
            cols.push(prefix(&self.string, n));
        }
        for n in 1..=4 {
            cols.push(suffix(&self.string, n));
        }
        cols.push(self.block_status.to_string());
        cols.push(self.line_status.to_string());
        cols.push(self.alignment.to_string());
        cols.push(self.font_status.to_string());
        cols.push(self.font_size.to_string());
        cols.push(flag(self.bold));
        cols.push(flag(self.italic));
        cols.push(self.capitalisation.to_string());
        cols.push(self.digit.to_string());
        cols.push(flag(self.single_char));
        cols.push(flag(self.proper_name));
        cols.push(flag(self.common_name));
        cols.push(flag(self.year));
        cols.push(flag(self.month));
        cols.push(flag(self.location_name));
        cols.push(flag(self.email));
        cols.push(flag(self.http));
        cols.push(self.punct.to_string());
        cols.push(flag(self.largest_font));
        cols.push(flag(self.smallest_font));
        cols.push(flag(self.larger_than_average_font));
        cols.push(self.density_bin.to_string());
        cols
    }

    fn force_end(&mut self) {
        self.line_status = LineStatus::LineEnd;
        self.block_status = BlockStatus::BlockEnd;
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.columns().join(" "))
    }
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn suffix(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

/// Escala linear em `bins` faixas, limitada a `[0, bins-1]`.
///
/// `value` e `total` já vêm deslocados pelo mínimo global.
pub fn linear_scaling(value: f64, total: f64, bins: usize) -> usize {
    if bins == 0 || total <= 0.0 || !value.is_finite() || !total.is_finite() {
        return 0;
    }
    let bin = (value / total * bins as f64).floor();
    if bin < 0.0 {
        0
    } else {
        (bin as usize).min(bins - 1)
    }
}

pub fn classify_punctuation(text: &str) -> PunctClass {
    match text {
        "(" | "[" => PunctClass::OpenBracket,
        ")" | "]" => PunctClass::EndBracket,
        "." => PunctClass::Dot,
        "," => PunctClass::Comma,
        "-" => PunctClass::Hyphen,
        "\"" | "'" | "`" => PunctClass::Quote,
        _ if !text.is_empty() && text.chars().all(|c| !c.is_alphanumeric()) => PunctClass::Punct,
        _ => PunctClass::NoPunct,
    }
}

pub fn classify_capitalisation(text: &str) -> Capitalisation {
    if !text.is_empty() && text.chars().all(char::is_uppercase) {
        Capitalisation::AllCap
    } else if text.chars().next().map(char::is_uppercase).unwrap_or(false) {
        Capitalisation::InitCap
    } else {
        Capitalisation::NoCaps
    }
}

pub fn classify_digits(text: &str) -> DigitClass {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        DigitClass::AllDigit
    } else if text.chars().any(|c| c.is_ascii_digit()) {
        DigitClass::ContainsDigits
    } else {
        DigitClass::NoDigit
    }
}

/// Linha de features pronta, com o índice absoluto do token de origem
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub token_index: usize,
    pub vector: FeatureVector,
}

/// Saída do extrator: texto de features + tokens retidos alinhados 1:1
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedHeader {
    /// Uma linha por token retido, terminada em `\n`
    pub feature_text: String,
    pub vectors: Vec<FeatureVector>,
    pub tokens: Vec<LayoutToken>,
    /// Índice absoluto de cada token retido no documento
    pub token_indices: Vec<usize>,
}

impl FeaturedHeader {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.feature_text.lines()
    }
}

/// Agregados tipográficos da zona, calculados antes da varredura
#[derive(Debug, Clone, Copy, PartialEq)]
struct ZoneStats {
    largest_font: f64,
    smallest_font: f64,
    average_font: f64,
    min_density: f64,
    max_density: f64,
}

/// Extrator de features para as zonas de um documento.
///
/// Todo o estado de varredura (fonte corrente, recuo, linha pendente) vive no
/// iterador [`FeatureRows`], então um extrator pode ser reutilizado e dois
/// documentos nunca compartilham estado.
pub struct FeatureExtractor<'a> {
    doc: &'a Document,
    lexicon: &'a Lexicon,
    density_bins: usize,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(doc: &'a Document, lexicon: &'a Lexicon) -> Self {
        Self {
            doc,
            lexicon,
            density_bins: DEFAULT_DENSITY_BINS,
        }
    }

    pub fn with_density_bins(mut self, bins: usize) -> Self {
        self.density_bins = bins.max(1);
        self
    }

    /// Iterador de linhas finalizadas para as zonas dadas
    pub fn rows(&self, ranges: &[TokenRange]) -> FeatureRows<'a> {
        let spans = self.doc.block_spans(ranges);
        let stats = zone_stats(self.doc, &spans);
        FeatureRows {
            doc: self.doc,
            lexicon: self.lexicon,
            density_bins: self.density_bins,
            stats,
            spans,
            span_idx: 0,
            span: None,
            current_font: None,
            current_font_size: None,
            line_start_x: None,
            indented: false,
            pending: None,
        }
    }

    /// Extrai o texto de features das zonas.
    ///
    /// `None` quando a zona não tem nenhum token retido: nada a extrair.
    pub fn extract(&self, ranges: &[TokenRange]) -> Option<FeaturedHeader> {
        let mut feature_text = String::new();
        let mut vectors = Vec::new();
        let mut tokens = Vec::new();
        let mut token_indices = Vec::new();

        for row in self.rows(ranges) {
            feature_text.push_str(&row.vector.to_string());
            feature_text.push('\n');
            tokens.push(self.doc.tokens[row.token_index].clone());
            token_indices.push(row.token_index);
            vectors.push(row.vector);
        }

        if tokens.is_empty() {
            return None;
        }
        Some(FeaturedHeader {
            feature_text,
            vectors,
            tokens,
            token_indices,
        })
    }
}

fn zone_stats(doc: &Document, spans: &[BlockSpan]) -> Option<ZoneStats> {
    let sizes: Vec<f64> = spans
        .iter()
        .flat_map(|s| doc.tokens[s.start..s.end].iter())
        .filter(|t| t.is_visible())
        .map(|t| t.font_size)
        .collect();
    if sizes.is_empty() {
        return None;
    }
    let largest_font = sizes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let smallest_font = sizes.iter().cloned().fold(f64::INFINITY, f64::min);
    let average_font = sizes.iter().sum::<f64>() / sizes.len() as f64;
    let (min_density, max_density) = doc.density_bounds();
    Some(ZoneStats {
        largest_font,
        smallest_font,
        average_font,
        min_density,
        max_density,
    })
}

/// Estado local de um trecho de bloco
struct SpanState {
    span: BlockSpan,
    block_start: usize,
    next: usize,
    block_started: bool,
    previous_newline: bool,
    density_bin: usize,
    locations: Vec<OffsetPosition>,
    emails: Vec<OffsetPosition>,
    urls: Vec<OffsetPosition>,
}

/// Iterador que produz linhas de features finalizadas (ver documentação do módulo).
pub struct FeatureRows<'a> {
    doc: &'a Document,
    lexicon: &'a Lexicon,
    density_bins: usize,
    stats: Option<ZoneStats>,
    spans: Vec<BlockSpan>,
    span_idx: usize,
    span: Option<SpanState>,
    current_font: Option<String>,
    current_font_size: Option<i64>,
    line_start_x: Option<f64>,
    indented: bool,
    pending: Option<FeatureRow>,
}

impl<'a> FeatureRows<'a> {
    fn open_span(&self, span: BlockSpan, stats: &ZoneStats) -> SpanState {
        let block = &self.doc.blocks[span.block_index];
        let block_tokens = block.tokens(&self.doc.tokens);
        let density = block.character_density(&self.doc.tokens);
        SpanState {
            span,
            block_start: block.start_token,
            next: span.start,
            block_started: false,
            previous_newline: true,
            density_bin: linear_scaling(
                density - stats.min_density,
                stats.max_density - stats.min_density,
                self.density_bins,
            ),
            locations: self.lexicon.location_positions(block_tokens),
            emails: self.lexicon.email_positions(block_tokens),
            urls: self.lexicon.url_positions(block_tokens),
        }
    }

    /// Fim de linha: nenhum conteúdo visível antes da próxima quebra ou do fim do trecho
    fn is_line_end(&self, index: usize, end: usize) -> bool {
        for token in &self.doc.tokens[index + 1..end] {
            if token.is_newline() {
                return true;
            }
            if token.is_visible() {
                return false;
            }
        }
        true
    }

    fn scan_token(&mut self, index: usize, stats: ZoneStats) -> Option<FeatureRow> {
        let doc = self.doc;
        let token = &doc.tokens[index];
        let mut state = self.span.take()?;
        let row = self.scan_with_state(token, index, &mut state, stats);
        self.span = Some(state);
        row
    }

    fn scan_with_state(
        &mut self,
        token: &LayoutToken,
        index: usize,
        state: &mut SpanState,
        stats: ZoneStats,
    ) -> Option<FeatureRow> {
        if token.is_newline() {
            state.previous_newline = true;
            return None;
        }
        if token.is_blank() {
            return None;
        }
        let text: String = token.text.chars().filter(|c| *c != ' ' && *c != '\n').collect();
        if text.is_empty() || is_layout_marker_text(&text) {
            return None;
        }

        let newline = std::mem::replace(&mut state.previous_newline, false);
        if newline {
            let char_width = token.width / text.chars().count() as f64;
            if let Some(previous_x) = self.line_start_x {
                if token.x - previous_x > char_width {
                    self.indented = true;
                } else if previous_x - token.x > char_width {
                    self.indented = false;
                }
            }
            self.line_start_x = Some(token.x);
        }

        let mut fv = FeatureVector::new(text.as_str());

        if !state.block_started {
            state.block_started = true;
            fv.line_status = LineStatus::LineStart;
            fv.block_status = BlockStatus::BlockStart;
        } else if newline {
            fv.line_status = LineStatus::LineStart;
        } else if self.is_line_end(index, state.span.end) {
            fv.line_status = LineStatus::LineEnd;
            state.previous_newline = true;
        }

        if self.indented {
            fv.alignment = Alignment::LineIndent;
        }

        fv.punct = classify_punctuation(&text);
        fv.capitalisation = classify_capitalisation(&text);
        fv.digit = classify_digits(&text);
        fv.single_char = text.chars().count() == 1;
        fv.common_name = self.lexicon.is_common_word(&text);
        fv.proper_name = self.lexicon.is_proper_name(&text);
        fv.month = self.lexicon.is_month(&text);
        fv.year = self.lexicon.is_year(&text);

        let relative = index - state.block_start;
        fv.location_name = state.locations.iter().any(|p| p.contains(relative));
        fv.email = state.emails.iter().any(|p| p.contains(relative));
        fv.http = state.urls.iter().any(|p| p.contains(relative));

        fv.font_status = match &self.current_font {
            Some(font) if *font == token.font => FontStatus::SameFont,
            _ => {
                self.current_font = Some(token.font.clone());
                FontStatus::NewFont
            }
        };

        let size = token.font_size as i64;
        fv.font_size = match self.current_font_size {
            Some(current) if current == size => FontSizeTrend::SameFontSize,
            Some(current) if current > size => FontSizeTrend::LowerFont,
            _ => FontSizeTrend::HigherFont,
        };
        self.current_font_size = Some(size);

        fv.largest_font = token.font_size == stats.largest_font;
        fv.smallest_font = token.font_size == stats.smallest_font;
        fv.larger_than_average_font = token.font_size > stats.average_font;
        fv.bold = token.bold;
        fv.italic = token.italic;
        fv.density_bin = state.density_bin;

        Some(FeatureRow {
            token_index: index,
            vector: fv,
        })
    }
}

impl Iterator for FeatureRows<'_> {
    type Item = FeatureRow;

    fn next(&mut self) -> Option<FeatureRow> {
        let stats = self.stats?;
        loop {
            if self.span.is_none() {
                let span = *self.spans.get(self.span_idx)?;
                self.span = Some(self.open_span(span, &stats));
            }

            let (index, end) = match &self.span {
                Some(state) => (state.next, state.span.end),
                None => return None,
            };

            if index >= end {
                self.span = None;
                self.span_idx += 1;
                if let Some(mut last) = self.pending.take() {
                    last.vector.force_end();
                    return Some(last);
                }
                continue;
            }

            if let Some(state) = self.span.as_mut() {
                state.next += 1;
            }
            if let Some(row) = self.scan_token(index, stats) {
                if let Some(ready) = self.pending.replace(row) {
                    return Some(ready);
                }
            }
        }
    }
}
