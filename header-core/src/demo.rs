//! # Documentos de Demonstração
//!
//! Cabeçalhos de artigos montados com o [`DocumentBuilder`], cobrindo os
//! casos que o pipeline trata de forma diferente:
//!
//! - **marcadores**: autores com números sobrescritos ligando às afiliações
//! - **fragmentado**: um bloco por autor e um bloco de afiliação por autor, sem marcadores
//! - **francês**: cabeçalho curto, idioma decidido com ajuda do corpo

use crate::layout::{BlockStyle, Document, DocumentBuilder};

/// Um documento de demonstração com nome e descrição
pub struct DemoDocument {
    pub name: &'static str,
    pub description: &'static str,
    pub document: Document,
}

fn title_style() -> BlockStyle {
    BlockStyle::new("Times-Bold", 16.0).bold()
}

fn author_style() -> BlockStyle {
    BlockStyle::new("Times-Roman", 11.0)
}

fn affiliation_style() -> BlockStyle {
    BlockStyle::new("Times-Italic", 9.0).italic()
}

fn text_style() -> BlockStyle {
    BlockStyle::new("Times-Roman", 10.0)
}

fn small_style() -> BlockStyle {
    BlockStyle::new("Times-Roman", 9.0)
}

/// Artigo completo: autores com marcadores, e-mails, datas, resumo,
/// palavras-chave e DOI.
pub fn demo_document() -> Document {
    DocumentBuilder::new()
        .block(title_style(), &["Header Extraction for", "Scanned Scholarly Papers"])
        .block(author_style(), &["Jane Doe1 and John Smith2"])
        .block(affiliation_style(), &["1 University of Paris, France"])
        .block(affiliation_style(), &["2 Department of Physics, University of Lyon"])
        .block(small_style(), &["jane.doe@uni.edu john.smith@uni.edu"])
        .block(small_style(), &["Received 12 March 2019; accepted 3 June 2019"])
        .block(
            text_style(),
            &[
                "Abstract",
                "We present a method for the extrac-",
                "tion of header metadata from scanned papers.",
            ],
        )
        .block(text_style(), &["Keywords: metadata; digital libraries"])
        .block(small_style(), &["doi: 10.1145/3292500.3330701"])
        .block(
            text_style(),
            &[
                "1 Introduction",
                "The extraction of bibliographic metadata is a classic problem.",
            ],
        )
        .header_blocks(0, 9)
        .body_blocks(9, 10)
        .build()
}

/// Autores em blocos separados, cada um com o seu bloco de afiliação
pub fn fragmented_document() -> Document {
    DocumentBuilder::new()
        .block(title_style(), &["Layout Features for", "Metadata Labelling"])
        .block(author_style(), &["Jane Doe"])
        .block(author_style(), &["John Smith"])
        .block(affiliation_style(), &["University of Paris, France"])
        .block(affiliation_style(), &["University of Lyon, France"])
        .block(text_style(), &["Abstract", "We label each token of the header with its field."])
        .header_blocks(0, 6)
        .build()
}

/// Cabeçalho em francês com resumo curto
pub fn french_document() -> Document {
    DocumentBuilder::new()
        .block(title_style(), &["Extraction des En-têtes"])
        .block(author_style(), &["Marie Curie"])
        .block(affiliation_style(), &["Université de Paris"])
        .block(
            text_style(),
            &[
                "Dans cet article nous présentons une méthode pour la",
                "reconnaissance des métadonnées dans les documents.",
            ],
        )
        .header_blocks(0, 3)
        .body_blocks(3, 4)
        .build()
}

/// Todos os documentos de demonstração
pub fn demo_documents() -> Vec<DemoDocument> {
    vec![
        DemoDocument {
            name: "marcadores",
            description: "autores com marcadores de afiliação, e-mails, datas e DOI",
            document: demo_document(),
        },
        DemoDocument {
            name: "fragmentado",
            description: "um bloco por autor e uma afiliação por bloco, sem marcadores",
            document: fragmented_document(),
        },
        DemoDocument {
            name: "frances",
            description: "cabeçalho curto em francês; idioma completado com o corpo",
            document: french_document(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_documents_have_header_zones() {
        for demo in demo_documents() {
            assert!(!demo.document.header_ranges().is_empty(), "{}", demo.name);
            assert!(!demo.document.blocks.is_empty());
        }
    }

    #[test]
    fn test_body_is_outside_header() {
        let doc = demo_document();
        let header_end = doc.header_ranges().last().map(|r| r.end).unwrap();
        let body_start = doc.body_ranges().first().map(|r| r.start).unwrap();
        assert!(body_start >= header_end);
    }
}
