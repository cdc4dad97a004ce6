//! # Segmentação de Autores e Associação de Afiliações
//!
//! O campo de autores chega como uma lista de tokens em que um token `\t`
//! separa clusters AUTHOR distintos. Cada segmento é enviado ao parser de
//! nomes e as pessoas resultantes guardam o índice do segmento de origem.
//!
//! Associação por segmento: quando há mais de um segmento (autores
//! *fragmentados*), nenhuma pessoa tem marcador e o número de blocos de
//! afiliação é igual ao número de segmentos, o bloco *i* vai para as pessoas
//! do segmento *i*. Nos outros casos a associação fica a cargo do parser de
//! afiliações, por marcadores.

use tracing::debug;

use crate::assembler::AUTHOR_SEGMENT_DELIMITER;
use crate::error::{HeaderError, Result};
use crate::layout::LayoutToken;
use crate::parsers::{AffiliationParser, NameParser};
use crate::pipeline::PipelineStage;
use crate::record::{BiblioRecord, Person};

/// Divide os tokens de autores no delimitador, descartando segmentos vazios
/// ou só de brancos.
pub fn split_author_segments(tokens: &[LayoutToken]) -> Vec<Vec<LayoutToken>> {
    tokens
        .split(|t| t.text == AUTHOR_SEGMENT_DELIMITER)
        .filter(|segment| segment.iter().any(|t| t.is_visible()))
        .map(|segment| segment.to_vec())
        .collect()
}

/// Resultado da segmentação
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentedAuthors {
    pub persons: Vec<Person>,
    pub segment_count: usize,
    pub fragmented: bool,
    pub has_marker: bool,
}

/// Envia cada segmento ao parser de nomes, preservando a ordem.
pub fn parse_author_segments(
    tokens: &[LayoutToken],
    parser: &dyn NameParser,
) -> Result<SegmentedAuthors> {
    let segments = split_author_segments(tokens);
    let mut persons = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        let parsed = parser
            .parse_tokens(segment)
            .map_err(|e| HeaderError::stage(PipelineStage::AuthorsResolved, e))?;
        for mut person in parsed {
            person.segment_index = Some(index);
            persons.push(person);
        }
    }
    let has_marker = persons.iter().any(|p| !p.markers.is_empty());
    Ok(SegmentedAuthors {
        persons,
        segment_count: segments.len(),
        fragmented: segments.len() > 1,
        has_marker,
    })
}

/// Associa afiliações por índice de segmento; devolve `true` se aplicou.
///
/// Em caso de sucesso a lista de afiliações soltas e o texto bruto de
/// afiliação são esvaziados, pois tudo foi distribuído.
pub fn attach_by_segment(record: &mut BiblioRecord, segments: &SegmentedAuthors) -> bool {
    if !segments.fragmented
        || segments.has_marker
        || record.full_affiliations.len() != segments.segment_count
    {
        return false;
    }
    for person in &mut record.full_authors {
        if let Some(affiliation) = person
            .segment_index
            .and_then(|i| record.full_affiliations.get(i))
        {
            person.affiliations.push(affiliation.clone());
        }
    }
    record.full_affiliations.clear();
    record.affiliation = None;
    true
}

/// Remove entradas sem sobrenome ou marcadas como ruído
pub fn sanity_check(persons: Vec<Person>) -> Vec<Person> {
    persons
        .into_iter()
        .filter(|p| p.has_surname() && !p.noise)
        .collect()
}

/// Une pessoas com o mesmo nome normalizado (minúsculas, sem espaços).
///
/// A primeira entrada é mantida e recebe os marcadores e afiliações das
/// duplicatas.
pub fn deduplicate(persons: Vec<Person>) -> Vec<Person> {
    let mut unique: Vec<Person> = Vec::with_capacity(persons.len());
    for person in persons {
        let key = person.normalized_name();
        match unique.iter_mut().find(|p| p.normalized_name() == key) {
            Some(first) => first.merge_references(&person),
            None => unique.push(person),
        }
    }
    unique
}

/// Resolve os autores do registro: segmentação, parsing, associação e limpeza.
pub fn resolve_authors(
    record: &mut BiblioRecord,
    names: &dyn NameParser,
    affiliations: &dyn AffiliationParser,
) -> Result<()> {
    let segments = parse_author_segments(&record.author_tokens, names)?;
    record.fragmented_authors = segments.fragmented;
    record.full_authors = sanity_check(segments.persons.clone());
    record.attach_emails();

    let by_segment = attach_by_segment(record, &segments);
    if !by_segment {
        affiliations.attach_by_markers(record);
    }
    record.full_authors = deduplicate(std::mem::take(&mut record.full_authors));

    if let Some(editors) = record.editors.as_deref() {
        record.full_editors = names
            .parse_text(editors)
            .map_err(|e| HeaderError::stage(PipelineStage::AuthorsResolved, e))?;
    }

    debug!(
        authors = record.full_authors.len(),
        segments = segments.segment_count,
        fragmented = segments.fragmented,
        by_segment,
        "autores resolvidos"
    );
    Ok(())
}
