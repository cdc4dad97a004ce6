//! # Erros do Pipeline de Cabeçalho
//!
//! Taxonomia de falhas:
//! - **Entrada vazia** (sem zona de cabeçalho, bloco sem tokens): nunca é erro,
//!   os estágios devolvem resultado vazio.
//! - **Falha de colaborador externo** (tagger, parsers de nomes/datas/afiliações):
//!   embrulhada em [`HeaderError::Stage`] identificando o estágio, aborta só o
//!   documento corrente.
//! - **Consolidação**: falha é registrada em log e rebaixada para "sem consolidação".

use thiserror::Error;

use crate::pipeline::PipelineStage;

/// Erro devolvido pelos colaboradores externos (tagger, sub-parsers, consolidação).
pub type ExternalError = Box<dyn std::error::Error + Send + Sync>;

/// Result com o erro do crate
pub type Result<T, E = HeaderError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum HeaderError {
    /// Um colaborador externo falhou durante um estágio do pipeline
    #[error("falha no estágio {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: ExternalError,
    },

    /// O tagger devolveu um número de rótulos diferente do número de linhas de features
    #[error("tagger devolveu {found} rótulos para {expected} linhas de features")]
    LabelCountMismatch { expected: usize, found: usize },

    /// Configuração JSON inválida
    #[error("configuração inválida: {0}")]
    Config(#[from] serde_json::Error),

    /// Erro de IO ao ler configuração
    #[error("erro de IO: {0}")]
    Io(#[from] std::io::Error),
}

impl HeaderError {
    pub fn stage(stage: PipelineStage, source: ExternalError) -> Self {
        HeaderError::Stage { stage, source }
    }

    /// Estágio que originou a falha, quando houver
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            HeaderError::Stage { stage, .. } => Some(*stage),
            HeaderError::LabelCountMismatch { .. } => Some(PipelineStage::Labeled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message_names_stage() {
        let err = HeaderError::stage(PipelineStage::Labeled, "modelo indisponível".into());
        let msg = err.to_string();
        assert!(msg.contains("LABELED"));
        assert!(msg.contains("modelo indisponível"));
        assert_eq!(err.failed_stage(), Some(PipelineStage::Labeled));
    }

    #[test]
    fn test_config_error_has_no_stage() {
        let err: HeaderError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.failed_stage().is_none());
    }
}
