//! # Marcação de Treinamento
//!
//! Reconstrói o cabeçalho rotulado como texto marcado, usado para gerar
//! dados de treinamento do modelo. A marcação de cada rótulo vem da tabela
//! [`TRAINING_MARKUP`]; um rótulo novo é só uma entrada nova.
//!
//! - `<lb/>` antes de cada token que inicia linha
//! - espaço entre tokens quando o documento original tinha um token de espaço
//! - tokens consecutivos com o mesmo rótulo (inclusive após `I-`) ficam no
//!   mesmo elemento
//! - `&`, `<` e `>` escapados

use crate::error::{HeaderError, Result};
use crate::features::{FeaturedHeader, LineStatus};
use crate::labels::{HeaderLabel, TaggedLabel};
use crate::layout::LayoutToken;
use crate::text::html_encode;

/// Rótulo → (abertura, fechamento)
pub static TRAINING_MARKUP: [(HeaderLabel, &str, &str); 26] = [
    (HeaderLabel::Title, "<docTitle>\n\t<titlePart>", "</titlePart>\n\t</docTitle>\n"),
    (HeaderLabel::Author, "<byline>\n\t<docAuthor>", "</docAuthor>\n\t</byline>\n"),
    (HeaderLabel::Affiliation, "<byline>\n\t<affiliation>", "</affiliation>\n\t</byline>\n"),
    (HeaderLabel::Address, "<address>", "</address>\n"),
    (HeaderLabel::Email, "<email>", "</email>\n"),
    (HeaderLabel::Phone, "<phone>", "</phone>\n"),
    (HeaderLabel::Web, "<ptr type=\"web\">", "</ptr>\n"),
    (HeaderLabel::Date, "<date>", "</date>\n"),
    (HeaderLabel::DateSubmission, "<date type=\"submission\">", "</date>\n"),
    (HeaderLabel::DateDownload, "<date type=\"download\">", "</date>\n"),
    (HeaderLabel::Page, "<page>", "</page>\n"),
    (HeaderLabel::Editor, "<editor>", "</editor>\n"),
    (HeaderLabel::Note, "<note>", "</note>\n"),
    (HeaderLabel::Abstract, "<div type=\"abstract\">", "</div>\n"),
    (HeaderLabel::Reference, "<reference>", "</reference>\n"),
    (HeaderLabel::Funding, "<note type=\"funding\">", "</note>\n"),
    (HeaderLabel::Copyright, "<note type=\"copyright\">", "</note>\n"),
    (HeaderLabel::Keyword, "<keyword>", "</keyword>\n"),
    (HeaderLabel::Pubnum, "<idno>", "</idno>\n"),
    (HeaderLabel::Meeting, "<meeting>", "</meeting>\n"),
    (HeaderLabel::Submission, "<note type=\"submission\">", "</note>\n"),
    (HeaderLabel::DocType, "<note type=\"doctype\">", "</note>\n"),
    (HeaderLabel::WorkingGroup, "<note type=\"group\">", "</note>\n"),
    (HeaderLabel::Publisher, "<publisher>", "</publisher>\n"),
    (HeaderLabel::Journal, "<journal>", "</journal>\n"),
    (HeaderLabel::Other, "", ""),
];

/// Marcação do rótulo; rótulos sem entrada saem sem marcação
pub fn markup_for(label: HeaderLabel) -> (&'static str, &'static str) {
    TRAINING_MARKUP
        .iter()
        .find(|(l, _, _)| *l == label)
        .map(|(_, open, close)| (*open, *close))
        .unwrap_or(("", ""))
}

struct MarkupRow {
    text: String,
    line_start: bool,
    label: TaggedLabel,
    space_before: bool,
}

/// Marcação a partir do cabeçalho com features e dos rótulos do tagger.
pub fn training_markup(
    header: &FeaturedHeader,
    labels: &[String],
    doc_tokens: &[LayoutToken],
) -> Result<String> {
    if labels.len() != header.len() {
        return Err(HeaderError::LabelCountMismatch {
            expected: header.len(),
            found: labels.len(),
        });
    }
    let mut previous: Option<usize> = None;
    let rows: Vec<MarkupRow> = header
        .vectors
        .iter()
        .zip(&header.token_indices)
        .zip(labels)
        .map(|((vector, &index), label)| {
            let from = previous.map_or(0, |p| p + 1);
            let space_before = doc_tokens
                .get(from..index)
                .is_some_and(|between| between.iter().any(is_space_token));
            previous = Some(index);
            MarkupRow {
                text: vector.string.clone(),
                line_start: vector.line_status == LineStatus::LineStart,
                label: TaggedLabel::parse(label),
                space_before,
            }
        })
        .collect();
    Ok(render(&rows))
}

/// Marcação a partir do resultado rotulado bruto: uma linha por token, a
/// primeira coluna é o token e a última o rótulo.
///
/// Os espaços são recuperados percorrendo `doc_tokens` até o token de cada linha.
pub fn training_markup_from_result(result: &str, doc_tokens: &[LayoutToken]) -> String {
    let mut cursor = 0;
    let mut rows = Vec::new();
    for line in result.lines() {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let (Some(first), Some(last)) = (columns.first(), columns.last()) else {
            continue;
        };
        let mut space_before = false;
        while cursor < doc_tokens.len() {
            let token = &doc_tokens[cursor];
            cursor += 1;
            if is_space_token(token) {
                space_before = true;
            } else if token.text == *first {
                break;
            }
        }
        let middle = if columns.len() > 2 {
            &columns[1..columns.len() - 1]
        } else {
            &[][..]
        };
        rows.push(MarkupRow {
            text: first.to_string(),
            line_start: middle.contains(&LineStatus::LineStart.symbol()),
            label: TaggedLabel::parse(last),
            space_before,
        });
    }
    render(&rows)
}

fn is_space_token(token: &LayoutToken) -> bool {
    token.text == " " || token.text == "\u{00A0}"
}

fn render(rows: &[MarkupRow]) -> String {
    let mut buffer = String::new();
    let mut last: Option<&TaggedLabel> = None;

    for row in rows {
        if row.line_start {
            buffer.push_str("<lb/>");
        }
        let continues = last.is_some_and(|l| l.tag == row.label.tag);
        if let Some(previous) = last {
            if !continues {
                buffer.push_str(markup_for(previous.label).1);
            }
        }
        let text = html_encode(&row.text);
        if continues {
            if row.space_before {
                buffer.push(' ');
            }
            buffer.push_str(&text);
        } else {
            buffer.push_str("\n\t");
            buffer.push_str(markup_for(row.label.label).0);
            buffer.push_str(&text);
        }
        last = Some(&row.label);
    }
    if let Some(previous) = last {
        buffer.push_str(markup_for(previous.label).1);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::layout::{BlockStyle, Document, DocumentBuilder};
    use crate::lexicon::Lexicon;

    fn two_block_doc() -> Document {
        DocumentBuilder::new()
            .block(BlockStyle::new("F", 14.0), &["A Title"])
            .block(BlockStyle::new("F", 10.0), &["Jane Doe"])
            .header_blocks(0, 2)
            .build()
    }

    fn header_of(doc: &Document) -> FeaturedHeader {
        FeatureExtractor::new(doc, Lexicon::shared())
            .extract(&doc.header_ranges())
            .unwrap()
    }

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    const EXPECTED: &str = "<lb/>\n\t<docTitle>\n\t<titlePart>A Title<lb/></titlePart>\n\t</docTitle>\n\n\t<byline>\n\t<docAuthor>Jane Doe</docAuthor>\n\t</byline>\n";

    #[test]
    fn test_markup_from_featured_header() {
        let doc = two_block_doc();
        let header = header_of(&doc);
        let markup = training_markup(
            &header,
            &labels(&["I-<title>", "<title>", "I-<author>", "<author>"]),
            &doc.tokens,
        )
        .unwrap();
        assert_eq!(markup, EXPECTED);
    }

    #[test]
    fn test_markup_from_result_text_matches() {
        let doc = two_block_doc();
        let header = header_of(&doc);
        let tags = ["I-<title>", "<title>", "I-<author>", "<author>"];
        let result: String = header
            .lines()
            .zip(tags)
            .map(|(line, tag)| format!("{line} {tag}\n"))
            .collect();
        assert_eq!(training_markup_from_result(&result, &doc.tokens), EXPECTED);
    }

    #[test]
    fn test_begin_marker_of_same_label_stays_in_element() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 10.0), &["Jane Doe"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let markup = training_markup(
            &header,
            &labels(&["I-<author>", "I-<author>"]),
            &doc.tokens,
        )
        .unwrap();
        assert_eq!(markup.matches("<docAuthor>").count(), 1);
        assert!(markup.contains("Jane Doe"));
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = DocumentBuilder::new()
            .block(BlockStyle::new("F", 10.0), &["R&D"])
            .header_blocks(0, 1)
            .build();
        let header = header_of(&doc);
        let tags = vec!["<note>".to_string(); header.len()];
        let markup = training_markup(&header, &tags, &doc.tokens).unwrap();
        assert!(markup.contains("R&amp;D"));
        assert!(markup.ends_with("</note>\n"));
    }

    #[test]
    fn test_every_known_label_has_markup() {
        for label in HeaderLabel::ALL {
            assert!(TRAINING_MARKUP.iter().any(|(l, _, _)| *l == label), "{label}");
        }
    }
}
