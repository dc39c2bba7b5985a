//! # Tokenizador de Localizações em Texto Livre
//!
//! Divide o texto em tokens para servir de chave do índice de nomes. O campo
//! "localização" de redes sociais é ruidoso ("LONDON.", ",san Francisco",
//! "London@US"), então o esquema é propositalmente grosseiro:
//!
//! - Qualquer caractere que não seja letra (`\p{L}`) nem dígito decimal
//!   (`\p{Nd}`) separa tokens; fragmentos vazios são descartados.
//! - Tokens com 3 ou mais caracteres vão para maiúsculas.
//! - Tokens com menos de 3 caracteres mantêm a caixa original, para que
//!   siglas como "US", "NY" ou "LA" não colidam com palavras comuns
//!   ("us", "la").
//!
//! O comprimento é medido em grafemas (`unicode-segmentation`), não em bytes.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use geocoder_core::tokenizer::tokenize;
//!
//! assert_eq!(tokenize(",san Francisco"), vec!["SAN", "FRANCISCO"]);
//! assert_eq!(tokenize("London@US"), vec!["LONDON", "US"]);
//! assert_eq!(tokenize("I am in LA"), vec!["I", "am", "in", "LA"]);
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokens mais curtos que isso não são normalizados.
pub const MIN_NORMALIZED_LEN: usize = 3;

/// Um token extraído do texto original.
///
/// Mantém a posição em bytes no texto de entrada para que a camada web possa
/// destacar os trechos reconhecidos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Texto normalizado (ex: "FRANCISCO", "US").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusivo).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista.
    pub index: usize,
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{Nd}]+").expect("constant pattern is valid"))
}

/// Tokeniza o texto e devolve apenas as chaves normalizadas.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with_offsets(text)
        .into_iter()
        .map(|t| t.text)
        .collect()
}

/// Tokeniza preservando offsets no texto original.
pub fn tokenize_with_offsets(text: &str) -> Vec<Token> {
    word_pattern()
        .find_iter(text)
        .enumerate()
        .map(|(index, m)| Token {
            text: normalize(m.as_str()),
            start: m.start(),
            end: m.end(),
            index,
        })
        .collect()
}

/// Normaliza um fragmento já separado.
fn normalize(fragment: &str) -> String {
    if char_len(fragment) < MIN_NORMALIZED_LEN {
        fragment.to_string()
    } else {
        fragment.to_uppercase()
    }
}

/// Comprimento em caracteres percebidos pelo usuário.
pub fn char_len(s: &str) -> usize {
    s.graphemes(true).count()
}
