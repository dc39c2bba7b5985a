//! # Insumos de Configuração
//!
//! Duas tabelas alimentam a construção do índice:
//!
//! - [`PopulationThresholds`]: população mínima por categoria. Precisa cobrir
//!   **todas** as categorias; caso contrário a construção aborta com
//!   [`GeoError::MissingThresholds`].
//! - [`ActivityShare`]: fração da atividade online global por código de país.
//!   Cobertura parcial é permitida; a soma das frações não passa de 1.
//!
//! Ambas podem ser lidas de arquivos texto no formato `CHAVE,VALOR`, uma
//! entrada por linha (linhas vazias e comentários `#` são ignorados):
//!
//! ```text
//! # population.threshold.txt
//! PCL,500000
//! ADM1,30000
//! ...
//! ```

use std::collections::BTreeMap;
use std::io::{BufRead, Read};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{GeoError, Result};

/// Tolerância numérica para a soma das frações de atividade.
const SHARE_EPSILON: f64 = 1e-9;

/// População mínima para que uma entidade de cada categoria seja indexada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Category, u64>", into = "BTreeMap<Category, u64>")]
pub struct PopulationThresholds {
    thresholds: BTreeMap<Category, u64>,
}

impl PopulationThresholds {
    /// Valida que todas as categorias têm limiar.
    pub fn new(thresholds: impl IntoIterator<Item = (Category, u64)>) -> Result<Self> {
        let thresholds: BTreeMap<Category, u64> = thresholds.into_iter().collect();
        let missing: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| !thresholds.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(GeoError::MissingThresholds { missing });
        }
        Ok(Self { thresholds })
    }

    /// Lê o formato `CATEGORIA,POPULACAO`. A categoria pode ser o nome
    /// GeoNames (`PCL`, `ADM1`, `SUBADM`) ou o nome da variante (`Country`).
    pub fn parse(text: &str) -> Result<Self> {
        let mut thresholds = BTreeMap::new();
        for (line, key, value) in parse_pairs(text)? {
            let category = Category::from_name(key).ok_or_else(|| GeoError::InvalidConfigLine {
                line,
                reason: format!("unknown category '{}'", key),
            })?;
            let population: u64 = value.parse().map_err(|_| GeoError::InvalidConfigLine {
                line,
                reason: format!("invalid population '{}'", value),
            })?;
            if thresholds.insert(category, population).is_some() {
                return Err(GeoError::InvalidConfigLine {
                    line,
                    reason: format!("duplicate threshold for {}", category),
                });
            }
        }
        Self::new(thresholds)
    }

    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn threshold(&self, category: Category) -> u64 {
        // Cobertura total garantida em `new`.
        self.thresholds.get(&category).copied().unwrap_or(u64::MAX)
    }

    /// População ausente conta como zero.
    pub fn admits(&self, category: Category, population: Option<u64>) -> bool {
        population.unwrap_or(0) >= self.threshold(category)
    }
}

impl TryFrom<BTreeMap<Category, u64>> for PopulationThresholds {
    type Error = GeoError;

    fn try_from(value: BTreeMap<Category, u64>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PopulationThresholds> for BTreeMap<Category, u64> {
    fn from(value: PopulationThresholds) -> Self {
        value.thresholds
    }
}

/// Participação de cada país na atividade online global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ActivityShare {
    shares: BTreeMap<String, f64>,
}

impl ActivityShare {
    /// Cada fração deve estar em `[0, 1]` e a soma não pode passar de 1.
    pub fn new<I, S>(shares: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let shares: BTreeMap<String, f64> = shares
            .into_iter()
            .map(|(code, share)| (code.into(), share))
            .collect();

        if let Some((code, share)) = shares
            .iter()
            .find(|(_, s)| !s.is_finite() || **s < 0.0 || **s > 1.0)
        {
            return Err(GeoError::InvalidActivityShare(format!(
                "share for {} out of range: {}",
                code, share
            )));
        }
        let total: f64 = shares.values().sum();
        if total > 1.0 + SHARE_EPSILON {
            return Err(GeoError::InvalidActivityShare(format!(
                "shares sum to {}, more than 1",
                total
            )));
        }
        Ok(Self { shares })
    }

    /// Lê o formato `PAIS,FRACAO`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut shares = Vec::new();
        for (line, key, value) in parse_pairs(text)? {
            let share: f64 = value.parse().map_err(|_| GeoError::InvalidConfigLine {
                line,
                reason: format!("invalid share '{}'", value),
            })?;
            shares.push((key.to_string(), share));
        }
        Self::new(shares)
    }

    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn share(&self, country: &str) -> Option<f64> {
        self.shares.get(country).copied()
    }

    pub fn covers(&self, country: &str) -> bool {
        self.shares.contains_key(country)
    }

    /// Soma das frações dos países cobertos.
    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }
}

impl TryFrom<BTreeMap<String, f64>> for ActivityShare {
    type Error = GeoError;

    fn try_from(value: BTreeMap<String, f64>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ActivityShare> for BTreeMap<String, f64> {
    fn from(value: ActivityShare) -> Self {
        value.shares
    }
}

/// Quebra o texto em `(linha, chave, valor)`, numerando linhas a partir de 1.
fn parse_pairs(text: &str) -> Result<Vec<(usize, &str, &str)>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, content)| match content.split_once(',') {
            Some((key, value)) if !key.trim().is_empty() => Ok((line, key.trim(), value.trim())),
            _ => Err(GeoError::InvalidConfigLine {
                line,
                reason: format!("expected KEY,VALUE but got '{}'", content),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: &str = "\
# limiares de teste
PCL,500000
ADM1,30000
ADM2,1000
ADM3,1000
ADM4,1000
SUBADM,1000
";

    #[test]
    fn test_parse_thresholds() {
        let th = PopulationThresholds::parse(THRESHOLDS).unwrap();
        assert_eq!(th.threshold(Category::Country), 500_000);
        assert_eq!(th.threshold(Category::LocalPlace), 1_000);
        assert!(th.admits(Category::Region1, Some(30_000)));
        assert!(!th.admits(Category::Region1, Some(29_999)));
        assert!(!th.admits(Category::Region1, None));
    }

    #[test]
    fn test_missing_category_is_an_error() {
        let err = PopulationThresholds::parse("PCL,1\nADM1,1\n").unwrap_err();
        match err {
            GeoError::MissingThresholds { missing } => {
                assert_eq!(
                    missing,
                    vec![
                        Category::Region2,
                        Category::Region3,
                        Category::Region4,
                        Category::LocalPlace
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_threshold_line_errors() {
        assert!(matches!(
            PopulationThresholds::parse("PCL;10"),
            Err(GeoError::InvalidConfigLine { line: 1, .. })
        ));
        assert!(matches!(
            PopulationThresholds::parse("PCL,10\nXYZ,3"),
            Err(GeoError::InvalidConfigLine { line: 2, .. })
        ));
        assert!(matches!(
            PopulationThresholds::parse("PCL,10\nPCL,20"),
            Err(GeoError::InvalidConfigLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_activity_share() {
        let share = ActivityShare::parse("US,0.2\nGB,0.1\n\n").unwrap();
        assert_eq!(share.share("US"), Some(0.2));
        assert!(share.covers("GB"));
        assert!(!share.covers("BR"));
        assert!((share.total() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_activity_share_sum_over_one() {
        assert!(matches!(
            ActivityShare::new([("US", 0.7), ("GB", 0.6)]),
            Err(GeoError::InvalidActivityShare(_))
        ));
        assert!(matches!(
            ActivityShare::new([("US", -0.1)]),
            Err(GeoError::InvalidActivityShare(_))
        ));
    }

    #[test]
    fn test_thresholds_deserialize_validates() {
        let ok: PopulationThresholds = serde_json::from_str(
            r#"{"country":1,"region1":1,"region2":1,"region3":1,"region4":1,"local_place":1}"#,
        )
        .unwrap();
        assert_eq!(ok.threshold(Category::Region4), 1);
        let missing = serde_json::from_str::<PopulationThresholds>(r#"{"country":1}"#);
        assert!(missing.is_err());
    }
}
