//! # Pipeline de Cabeçalho — Orquestrador com Eventos Observáveis
//!
//! O pipeline coordena todos os módulos (features, rotulação, clusters,
//! autores, normalização) e emite eventos em cada passo via um canal Rust
//! (`mpsc`), permitindo que o servidor WebSocket transmita o progresso em
//! tempo real para o cliente.
//!
//! ## Estágios
//!
//! ```text
//! RAW → FEATURED → LABELED → CLUSTERED → AUTHORS_RESOLVED → NORMALIZED → [CONSOLIDATED] → FINAL
//! ```
//!
//! Sem transições para trás. Uma zona de cabeçalho vazia leva direto a
//! `FINAL` com registro vazio; falha de um colaborador aborta só o documento
//! corrente com um [`HeaderError::Stage`].

use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembler::ClusterAssembler;
use crate::authors::resolve_authors;
use crate::basic::{
    ClusterAffiliationParser, RegexDateParser, RuleTagger, SimpleNameParser, StaticConsolidator,
    StopwordLanguageIdentifier,
};
use crate::cluster::{cluster_labels, LabelCluster};
use crate::config::HeaderConfig;
use crate::consolidation::{ConsolidationMode, ConsolidationOutcome};
use crate::error::{HeaderError, Result};
use crate::features::{FeatureExtractor, FeaturedHeader};
use crate::labels::HeaderLabel;
use crate::layout::Document;
use crate::lexicon::Lexicon;
use crate::normalize::Normalizer;
use crate::parsers::{
    AffiliationParser, Consolidator, DateParser, LanguageIdentifier, NameParser, SequenceTagger,
};
use crate::record::{BiblioRecord, Person};
use crate::training::training_markup;

/// Estágio do pipeline de um documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Raw,
    Featured,
    Labeled,
    Clustered,
    AuthorsResolved,
    Normalized,
    /// Só aparece quando a consolidação está ligada
    Consolidated,
    Final,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Raw => "RAW",
            PipelineStage::Featured => "FEATURED",
            PipelineStage::Labeled => "LABELED",
            PipelineStage::Clustered => "CLUSTERED",
            PipelineStage::AuthorsResolved => "AUTHORS_RESOLVED",
            PipelineStage::Normalized => "NORMALIZED",
            PipelineStage::Consolidated => "CONSOLIDATED",
            PipelineStage::Final => "FINAL",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Eventos emitidos pelo pipeline durante o processamento.
///
/// Permitem que a UI acompanhe cada estágio do documento. Cada variante
/// carrega os dados necessários para renderizar aquela etapa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Um novo estágio começou
    StageEntered { stage: PipelineStage },
    /// Texto de features pronto, uma linha por token retido
    FeaturesExtracted { lines: usize, feature_text: String },
    /// Rótulos devolvidos pelo tagger, alinhados às linhas de features
    Labeled { labels: Vec<String> },
    /// Um cluster foi formado e entregue ao montador
    ClusterFormed {
        tag: String,
        text: String,
        start: usize,
        end: usize,
    },
    /// Autores resolvidos, com afiliações e e-mails associados
    AuthorsResolved {
        authors: Vec<Person>,
        fragmented: bool,
    },
    /// Normalização concluída
    Normalized { language: Option<String> },
    /// Resultado da consolidação externa
    Consolidated { outcome: ConsolidationOutcome },
    /// **Conclusão**: registro final e estágios percorridos
    Done {
        record: BiblioRecord,
        stages: Vec<PipelineStage>,
        training_markup: Option<String>,
        processing_ms: u64,
    },
    /// **Falha**: o documento foi abortado
    Error {
        stage: Option<PipelineStage>,
        message: String,
    },
}

/// Resultado do processamento de um documento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderResult {
    pub record: BiblioRecord,
    /// Estágios percorridos, em ordem
    pub stages: Vec<PipelineStage>,
    pub consolidation: ConsolidationOutcome,
    /// Marcação de treinamento, quando ligada na configuração
    pub training_markup: Option<String>,
    pub processing_ms: u64,
}

/// O pipeline de cabeçalho.
///
/// Os colaboradores externos ficam atrás de traits `Send + Sync`; o léxico
/// é compartilhado e só lido. Todo o estado de varredura é criado a cada
/// documento, então um mesmo pipeline pode processar vários documentos em
/// paralelo ([`HeaderPipeline::process_batch`]).
///
/// # Modos de Uso
/// - **Sync**: [`HeaderPipeline::process`] para chamadas diretas.
/// - **Streaming**: [`HeaderPipeline::process_streaming`] para UIs reativas (via WebSocket).
pub struct HeaderPipeline {
    pub config: HeaderConfig,
    lexicon: &'static Lexicon,
    assembler: ClusterAssembler,
    tagger: Box<dyn SequenceTagger>,
    names: Box<dyn NameParser>,
    dates: Box<dyn DateParser>,
    affiliations: Box<dyn AffiliationParser>,
    language: Box<dyn LanguageIdentifier>,
    consolidator: Box<dyn Consolidator>,
}

impl HeaderPipeline {
    /// Pipeline com a configuração padrão e os colaboradores embutidos.
    pub fn new() -> Self {
        Self::with_config(HeaderConfig::default())
    }

    pub fn with_config(config: HeaderConfig) -> Self {
        Self {
            config,
            lexicon: Lexicon::shared(),
            assembler: ClusterAssembler::new(),
            tagger: Box::new(RuleTagger::new()),
            names: Box::new(SimpleNameParser),
            dates: Box::new(RegexDateParser),
            affiliations: Box::new(ClusterAffiliationParser),
            language: Box::new(StopwordLanguageIdentifier::new()),
            consolidator: Box::new(StaticConsolidator::default()),
        }
    }

    /// Troca o léxico compartilhado (deve viver pelo processo inteiro)
    pub fn with_lexicon(mut self, lexicon: &'static Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn with_tagger(mut self, tagger: impl SequenceTagger + 'static) -> Self {
        self.tagger = Box::new(tagger);
        self
    }

    pub fn with_name_parser(mut self, names: impl NameParser + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    pub fn with_date_parser(mut self, dates: impl DateParser + 'static) -> Self {
        self.dates = Box::new(dates);
        self
    }

    pub fn with_affiliation_parser(mut self, affiliations: impl AffiliationParser + 'static) -> Self {
        self.affiliations = Box::new(affiliations);
        self
    }

    pub fn with_language_identifier(mut self, language: impl LanguageIdentifier + 'static) -> Self {
        self.language = Box::new(language);
        self
    }

    pub fn with_consolidator(mut self, consolidator: impl Consolidator + 'static) -> Self {
        self.consolidator = Box::new(consolidator);
        self
    }

    /// Texto de features da zona de cabeçalho; `None` quando a zona está vazia.
    pub fn features(&self, doc: &Document) -> Option<FeaturedHeader> {
        FeatureExtractor::new(doc, self.lexicon)
            .with_density_bins(self.config.density_bins)
            .extract(&doc.header_ranges())
    }

    /// Rotula o cabeçalho e devolve só a marcação de treinamento.
    pub fn training(&self, doc: &Document) -> Result<Option<String>> {
        let Some(header) = self.features(doc) else {
            return Ok(None);
        };
        let labels = self.label(&header)?;
        training_markup(&header, &labels, &doc.tokens).map(Some)
    }

    /// Processa o documento de forma síncrona e retorna o resultado final.
    pub fn process(&self, doc: &mut Document) -> Result<HeaderResult> {
        self.run(doc, &mut |_| {})
    }

    /// Executa o pipeline enviando eventos de progresso em tempo real.
    ///
    /// Não retorna valores diretamente: o último evento é sempre `Done` ou `Error`.
    pub fn process_streaming(&self, doc: &mut Document, tx: mpsc::Sender<PipelineEvent>) {
        let outcome = self.run(doc, &mut |event| {
            let _ = tx.send(event);
        });
        let last = match outcome {
            Ok(result) => PipelineEvent::Done {
                record: result.record,
                stages: result.stages,
                training_markup: result.training_markup,
                processing_ms: result.processing_ms,
            },
            Err(e) => PipelineEvent::Error {
                stage: e.failed_stage(),
                message: e.to_string(),
            },
        };
        let _ = tx.send(last);
    }

    /// Processa vários documentos em paralelo; um resultado por documento, na mesma ordem.
    pub fn process_batch(&self, docs: &mut [Document]) -> Vec<Result<HeaderResult>> {
        docs.par_iter_mut().map(|doc| self.process(doc)).collect()
    }

    fn label(&self, header: &FeaturedHeader) -> Result<Vec<String>> {
        let labels = self
            .tagger
            .label(&header.feature_text)
            .map_err(|e| HeaderError::stage(PipelineStage::Labeled, e))?;
        if labels.len() != header.len() {
            return Err(HeaderError::LabelCountMismatch {
                expected: header.len(),
                found: labels.len(),
            });
        }
        Ok(labels)
    }

    fn run(
        &self,
        doc: &mut Document,
        emit: &mut dyn FnMut(PipelineEvent),
    ) -> Result<HeaderResult> {
        let start = Instant::now();
        let mut stages = Vec::with_capacity(8);

        enter(&mut stages, PipelineStage::Raw, emit);
        let mut record = BiblioRecord::new();

        // === Passo 1: Features ===
        let Some(header) = self.features(doc) else {
            debug!("zona de cabeçalho vazia");
            enter(&mut stages, PipelineStage::Final, emit);
            return Ok(HeaderResult {
                record,
                stages,
                consolidation: ConsolidationOutcome::Skipped,
                training_markup: None,
                processing_ms: start.elapsed().as_millis() as u64,
            });
        };
        enter(&mut stages, PipelineStage::Featured, emit);
        emit(PipelineEvent::FeaturesExtracted {
            lines: header.len(),
            feature_text: header.feature_text.clone(),
        });

        // === Passo 2: Rotulação ===
        let labels = self.label(&header)?;
        enter(&mut stages, PipelineStage::Labeled, emit);
        emit(PipelineEvent::Labeled {
            labels: labels.clone(),
        });

        // === Passo 3: Clusters e montagem ===
        let clusters = cluster_labels(&header, &labels, &doc.tokens)?;
        let merged = self.assembler.assemble(&clusters, &mut record);
        enter(&mut stages, PipelineStage::Clustered, emit);
        for cluster in &clusters {
            emit(PipelineEvent::ClusterFormed {
                tag: cluster.tag.clone(),
                text: cluster.text.clone(),
                start: cluster.start,
                end: cluster.end,
            });
        }

        // === Passo 4: Afiliações e autores ===
        let affiliation_clusters: Vec<LabelCluster> = clusters
            .iter()
            .filter(|c| matches!(c.label, HeaderLabel::Affiliation | HeaderLabel::Address))
            .cloned()
            .collect();
        if !affiliation_clusters.is_empty() {
            record.full_affiliations = self
                .affiliations
                .parse(&affiliation_clusters)
                .map_err(|e| HeaderError::stage(PipelineStage::AuthorsResolved, e))?;
        }
        resolve_authors(&mut record, self.names.as_ref(), self.affiliations.as_ref())?;
        enter(&mut stages, PipelineStage::AuthorsResolved, emit);
        emit(PipelineEvent::AuthorsResolved {
            authors: record.full_authors.clone(),
            fragmented: record.fragmented_authors,
        });

        // === Passo 5: Normalização (consolidação inclusa) ===
        let normalizer = Normalizer {
            config: &self.config,
            language: self.language.as_ref(),
            dates: self.dates.as_ref(),
            consolidator: self.consolidator.as_ref(),
        };
        let consolidation = normalizer.normalize(&mut record, doc)?;
        enter(&mut stages, PipelineStage::Normalized, emit);
        emit(PipelineEvent::Normalized {
            language: record.language.clone(),
        });
        if self.config.consolidate != ConsolidationMode::Skip {
            enter(&mut stages, PipelineStage::Consolidated, emit);
            emit(PipelineEvent::Consolidated {
                outcome: consolidation,
            });
        }

        // === Passo 6: Marcação de treinamento (opcional) ===
        let markup = if self.config.training_markup {
            Some(training_markup(&header, &labels, &doc.tokens)?)
        } else {
            None
        };

        enter(&mut stages, PipelineStage::Final, emit);
        let processing_ms = start.elapsed().as_millis() as u64;
        info!(
            tokens = header.len(),
            clusters = clusters.len(),
            merged,
            authors = record.full_authors.len(),
            language = ?record.language,
            ?consolidation,
            processing_ms,
            "cabeçalho processado"
        );
        Ok(HeaderResult {
            record,
            stages,
            consolidation,
            training_markup: markup,
            processing_ms,
        })
    }
}

fn enter(
    stages: &mut Vec<PipelineStage>,
    stage: PipelineStage,
    emit: &mut dyn FnMut(PipelineEvent),
) {
    debug!(%stage, "estágio");
    stages.push(stage);
    emit(PipelineEvent::StageEntered { stage });
}

impl Default for HeaderPipeline {
    fn default() -> Self {
        Self::new()
    }
}
