//! # Colaboradores Externos
//!
//! Contratos dos componentes que o pipeline consome mas não implementa: o
//! modelo de rotulação, os sub-parsers de nomes, datas e afiliações, a
//! identificação de idioma e o serviço de consolidação.
//!
//! Todos são `Send + Sync` para que um mesmo conjunto de colaboradores sirva a
//! vários documentos em paralelo. Falhas voltam como [`ExternalError`]; o
//! pipeline as embrulha com o estágio em que ocorreram.
//!
//! Implementações leves de todos eles estão em [`crate::basic`].

use crate::cluster::LabelCluster;
use crate::error::ExternalError;
use crate::layout::LayoutToken;
use crate::record::{Affiliation, BiblioRecord, Date, Person};
use crate::tokenizer::text_to_layout_tokens;

/// Modelo de rotulação de sequência.
///
/// Recebe o texto de features (uma linha por token) e devolve um rótulo por
/// linha, na convenção `<label>` / `I-<label>`.
pub trait SequenceTagger: Send + Sync {
    fn label(&self, feature_text: &str) -> Result<Vec<String>, ExternalError>;
}

impl<F> SequenceTagger for F
where
    F: Fn(&str) -> Result<Vec<String>, ExternalError> + Send + Sync,
{
    fn label(&self, feature_text: &str) -> Result<Vec<String>, ExternalError> {
        self(feature_text)
    }
}

/// Parser de nomes de pessoas
pub trait NameParser: Send + Sync {
    fn parse_tokens(&self, tokens: &[LayoutToken]) -> Result<Vec<Person>, ExternalError>;

    fn parse_text(&self, text: &str) -> Result<Vec<Person>, ExternalError> {
        self.parse_tokens(&text_to_layout_tokens(text))
    }
}

/// Parser de datas: devolve os candidatos em ordem, o chamador usa o primeiro
pub trait DateParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Vec<Date>, ExternalError>;
}

/// Parser de afiliações e endereços
pub trait AffiliationParser: Send + Sync {
    /// Blocos de afiliação a partir dos clusters AFFILIATION/ADDRESS, na ordem
    /// do documento.
    fn parse(&self, clusters: &[LabelCluster]) -> Result<Vec<Affiliation>, ExternalError>;

    /// Associação por marcadores, usada quando a associação por segmento não se aplica.
    ///
    /// Cada pessoa recebe os blocos cujo marcador aparece entre os seus; um
    /// único bloco sem marcadores em jogo vai para todos os autores. Blocos
    /// associados saem da lista de afiliações soltas.
    fn attach_by_markers(&self, record: &mut BiblioRecord) {
        if record.full_affiliations.is_empty() || record.full_authors.is_empty() {
            return;
        }
        let any_marker = record.full_authors.iter().any(|p| !p.markers.is_empty());
        if !any_marker {
            if record.full_affiliations.len() == 1 {
                let affiliation = record.full_affiliations.remove(0);
                for person in &mut record.full_authors {
                    person.affiliations.push(affiliation.clone());
                }
            }
            return;
        }

        let mut attached = vec![false; record.full_affiliations.len()];
        for person in &mut record.full_authors {
            for (i, affiliation) in record.full_affiliations.iter().enumerate() {
                let matches = affiliation
                    .marker
                    .as_ref()
                    .is_some_and(|m| person.markers.contains(m));
                if matches && !person.affiliations.contains(affiliation) {
                    person.affiliations.push(affiliation.clone());
                    attached[i] = true;
                }
            }
        }
        let mut flags = attached.into_iter();
        record
            .full_affiliations
            .retain(|_| !flags.next().unwrap_or(false));
    }
}

/// Identificação de idioma; `None` quando o texto não basta
pub trait LanguageIdentifier: Send + Sync {
    fn identify(&self, text: &str) -> Option<String>;
}

/// Serviço de consolidação bibliográfica
pub trait Consolidator: Send + Sync {
    /// Registro externo correspondente, `None` se nada casar
    fn consolidate(&self, record: &BiblioRecord) -> Result<Option<BiblioRecord>, ExternalError>;
}

impl<F> Consolidator for F
where
    F: Fn(&BiblioRecord) -> Result<Option<BiblioRecord>, ExternalError> + Send + Sync,
{
    fn consolidate(&self, record: &BiblioRecord) -> Result<Option<BiblioRecord>, ExternalError> {
        self(record)
    }
}
