//! # header-core — Extração de Metadados de Cabeçalho de Artigos Científicos
//!
//! Este crate transforma a zona de cabeçalho de um documento já decodificado
//! (tokens com posição e fonte) num registro bibliográfico estruturado:
//! título, autores com afiliações e e-mails, datas, resumo, palavras-chave e
//! identificadores.
//!
//! ## Arquitetura do Sistema
//!
//! O sistema segue uma arquitetura de pipeline linear, onde o dado flui e é transformado passo a passo:
//!
//! 1.  **Entrada**: [`Document`] com tokens, blocos e a zona de cabeçalho.
//! 2.  **Extração de Features** ([`features`]): cada token vira uma linha de 32 colunas simbólicas.
//! 3.  **Rotulação** ([`parsers::SequenceTagger`]): um rótulo por linha (`<title>`, `I-<author>`...).
//!     O [`RuleTagger`] embutido rotula por regras de layout.
//! 4.  **Clusters** ([`cluster`]) e **Montagem** ([`assembler`]): trechos com o mesmo
//!     rótulo são fundidos no [`BiblioRecord`] segundo a política de cada rótulo.
//! 5.  **Autores** ([`authors`]): segmentação, parsing de nomes, associação de
//!     afiliações e e-mails, deduplicação.
//! 6.  **Normalização** ([`normalize`]): deshifenização, idioma, palavras-chave,
//!     DOI, consolidação ([`consolidation`]) e datas.
//! 7.  **Saída**: [`HeaderResult`] com o registro e os estágios percorridos;
//!     opcionalmente a marcação de treinamento ([`training`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use header_core::{demo::demo_document, HeaderPipeline};
//!
//! // 1. Instancia o pipeline com os colaboradores embutidos
//! let pipeline = HeaderPipeline::new();
//!
//! // 2. Documento de demonstração (cabeçalho + corpo)
//! let mut doc = demo_document();
//!
//! // 3. Executa todos os estágios
//! let result = pipeline.process(&mut doc).unwrap();
//!
//! // 4. Exibe os autores encontrados
//! for author in &result.record.full_authors {
//!     println!("Autor: {} {:?}", author.full_name(), author.markers);
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador que conecta todos os estágios e emite eventos.
//! - [`features`]: esquema de colunas consumido pelo modelo de rotulação.
//! - [`parsers`]: contratos dos colaboradores externos; [`basic`] traz implementações leves.
//! - [`demo`]: documentos de demonstração.

pub mod assembler;
pub mod authors;
pub mod basic;
pub mod cluster;
pub mod config;
pub mod consolidation;
pub mod demo;
pub mod error;
pub mod features;
pub mod labels;
pub mod layout;
pub mod lexicon;
pub mod normalize;
pub mod parsers;
pub mod pipeline;
pub mod record;
pub mod rule_based;
pub mod text;
pub mod tokenizer;
pub mod training;

pub use basic::RuleTagger;
pub use config::HeaderConfig;
pub use consolidation::{ConsolidationMode, ConsolidationOutcome};
pub use error::{HeaderError, Result};
pub use labels::HeaderLabel;
pub use layout::{Document, DocumentBuilder, LayoutToken};
pub use pipeline::{HeaderPipeline, HeaderResult, PipelineEvent, PipelineStage};
pub use record::{Affiliation, BiblioRecord, Date, Person};
