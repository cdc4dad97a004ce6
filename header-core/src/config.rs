//! # Configuração do Pipeline
//!
//! Todos os campos têm valor padrão, então um JSON vazio (`{}`) é uma
//! configuração válida.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consolidation::ConsolidationMode;
use crate::error::Result;

/// Número de faixas usadas na discretização da densidade de caracteres
pub const DEFAULT_DENSITY_BINS: usize = 5;

/// Abaixo deste número de caracteres (título + resumo) o identificador de idioma
/// recebe também uma amostra do corpo do documento.
pub const DEFAULT_LANGUAGE_SAMPLE_THRESHOLD: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Modo de consolidação com a base bibliográfica externa
    pub consolidate: ConsolidationMode,
    /// Faixas de densidade de caracteres (coluna de densidade do vetor de features)
    pub density_bins: usize,
    /// Limite mínimo da amostra de texto para identificação de idioma
    pub language_sample_threshold: usize,
    /// Também gera a marcação de treinamento junto com o registro
    pub training_markup: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            consolidate: ConsolidationMode::Skip,
            density_bins: DEFAULT_DENSITY_BINS,
            language_sample_threshold: DEFAULT_LANGUAGE_SAMPLE_THRESHOLD,
            training_markup: false,
        }
    }
}

impl HeaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HeaderConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    // zero faixas tornaria a escala linear indefinida
    fn sanitized(mut self) -> Self {
        if self.density_bins == 0 {
            self.density_bins = DEFAULT_DENSITY_BINS;
        }
        self
    }
}
