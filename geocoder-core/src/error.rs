//! # Erros do geocoder
//!
//! Só a construção pode falhar: configuração inválida, linhas de gazetteer
//! malformadas ou I/O ao ler esses arquivos. Consultas (`resolve`, `match`)
//! nunca retornam erro; ausência de resultado é `None` ou lista vazia.

use thiserror::Error;

use crate::category::Category;

/// Erros de construção do índice e de leitura dos insumos.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A tabela de limiares de população não cobre todas as categorias.
    #[error("population threshold missing for categories: {missing:?}")]
    MissingThresholds { missing: Vec<Category> },

    /// Tabela de participação de atividade online inválida.
    #[error("invalid activity share: {0}")]
    InvalidActivityShare(String),

    /// Um código foi registrado em categoria mais fina que a da própria entidade.
    #[error("location {id} ({category:?}) cannot carry a {code_category:?} code")]
    CodeFinerThanCategory {
        id: u32,
        category: Category,
        code_category: Category,
    },

    /// Peso negativo ou não finito num snapshot desserializado.
    #[error("location {id} has invalid weight {weight}")]
    InvalidWeight { id: u32, weight: f64 },

    /// Mesmo id aparece duas vezes num snapshot.
    #[error("duplicate location id {0}")]
    DuplicateLocation(u32),

    /// Linha de configuração no formato `CHAVE,VALOR` não reconhecida.
    #[error("invalid configuration line {line}: {reason}")]
    InvalidConfigLine { line: usize, reason: String },

    /// Linha do gazetteer (GeoNames) malformada.
    #[error("malformed gazetteer row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resultado padrão das operações de construção.
pub type Result<T> = std::result::Result<T, GeoError>;
