//! # Índice de Nomes e Construção
//!
//! O [`GeoIndex`] mapeia a sequência **exata** de tokens de um nome para o
//! conjunto de entidades que compartilham esse nome:
//!
//! ```text
//! ["LONDON"]             -> {2643743 (GB), 4517009 (US, OH), 6058560 (CA), ...}
//! ["SAN", "FRANCISCO"]   -> {5391959, ...}
//! ["US"]                 -> {6252001}
//! ```
//!
//! Junto com ele é mantido um mapa `id -> entidade`, usado para resolver as
//! regras de substituição sem varrer o índice.
//!
//! ## Construção
//!
//! [`IndexBuilder::build`] executa a pipeline completa:
//!
//! 1. Descarta registros abaixo do limiar da categoria e ids duplicados.
//! 2. Calibra pesos ([`Calibration`]) e finaliza cada registro em [`Location`].
//! 3. Tokeniza todos os nomes (em paralelo com `rayon`) e agrupa por chave.
//!
//! O índice produzido é imutável; para refletir dados novos, reconstrua.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::Calibration;
use crate::category::Category;
use crate::config::{ActivityShare, PopulationThresholds};
use crate::error::{GeoError, Result};
use crate::location::{Location, LocationId, LocationRecord};
use crate::tokenizer::tokenize;

/// Índice imutável nome tokenizado -> entidades.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "IndexSnapshot", try_from = "IndexSnapshot")]
pub struct GeoIndex {
    /// Ids ordenados e sem repetição por chave.
    entries: HashMap<Vec<String>, Vec<LocationId>>,
    locations: HashMap<LocationId, Location>,
}

impl GeoIndex {
    /// Monta o índice a partir de entidades já finalizadas.
    fn from_locations(locations: Vec<Location>) -> Self {
        let pairs: Vec<(Vec<String>, LocationId)> = locations
            .par_iter()
            .flat_map_iter(|location| {
                let id = location.id();
                location
                    .names()
                    .iter()
                    .map(move |name| (tokenize(name), id))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();

        let mut entries: HashMap<Vec<String>, Vec<LocationId>> =
            HashMap::with_capacity(locations.len());
        for (key, id) in pairs {
            entries.entry(key).or_default().push(id);
        }
        for ids in entries.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        let locations = locations.into_iter().map(|l| (l.id(), l)).collect();
        Self { entries, locations }
    }

    /// Entidades cujo nome tokeniza exatamente para `key`, em ordem de id.
    pub fn lookup(&self, key: &[String]) -> Option<Vec<&Location>> {
        self.entries
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.locations.get(id)).collect())
    }

    pub fn contains_key(&self, key: &[String]) -> bool {
        self.entries.contains_key(key)
    }

    /// Busca direta por id.
    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Número de entidades indexadas.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Número de chaves (nomes tokenizados distintos).
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Contagem de entidades por categoria.
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.locations.values().filter(|l| l.category() == c).count()))
            .collect()
    }

    /// Grava o snapshot JSON do índice.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Lê um snapshot gravado por [`GeoIndex::save`], revalidando as entidades.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let index: GeoIndex = serde_json::from_str(&json)?;
        info!(locations = index.len(), keys = index.key_count(), "geo index loaded");
        Ok(index)
    }
}

/// Forma serializada do índice: apenas as entidades finalizadas. As chaves são
/// recalculadas na desserialização, pois derivam dos nomes.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub locations: Vec<Location>,
}

impl From<GeoIndex> for IndexSnapshot {
    fn from(index: GeoIndex) -> Self {
        let mut locations: Vec<Location> = index.locations.into_values().collect();
        locations.sort_by_key(Location::id);
        Self { locations }
    }
}

impl TryFrom<IndexSnapshot> for GeoIndex {
    type Error = GeoError;

    fn try_from(snapshot: IndexSnapshot) -> Result<Self> {
        let mut seen = HashSet::with_capacity(snapshot.locations.len());
        for location in &snapshot.locations {
            location.validate()?;
            if !seen.insert(location.id()) {
                return Err(GeoError::DuplicateLocation(location.id()));
            }
        }
        Ok(GeoIndex::from_locations(snapshot.locations))
    }
}

/// Constrói [`GeoIndex`] a partir de registros e das tabelas de calibração.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    thresholds: PopulationThresholds,
    activity_share: ActivityShare,
}

impl IndexBuilder {
    pub fn new(thresholds: PopulationThresholds, activity_share: ActivityShare) -> Self {
        Self {
            thresholds,
            activity_share,
        }
    }

    /// Valida as tabelas cruas. Falha se algum limiar estiver faltando.
    pub fn from_tables<T, A, S>(thresholds: T, activity_share: A) -> Result<Self>
    where
        T: IntoIterator<Item = (Category, u64)>,
        A: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Ok(Self::new(
            PopulationThresholds::new(thresholds)?,
            ActivityShare::new(activity_share)?,
        ))
    }

    pub fn thresholds(&self) -> &PopulationThresholds {
        &self.thresholds
    }

    /// Filtra, calibra e indexa os registros.
    pub fn build<I>(&self, records: I) -> GeoIndex
    where
        I: IntoIterator<Item = LocationRecord>,
    {
        let mut seen = HashSet::new();
        let mut below_threshold = 0usize;
        let mut duplicates = 0usize;

        let admitted: Vec<LocationRecord> = records
            .into_iter()
            .filter(|record| {
                if !self.thresholds.admits(record.category(), record.population()) {
                    debug!(
                        id = record.id(),
                        category = %record.category(),
                        population = ?record.population(),
                        "record below population threshold"
                    );
                    below_threshold += 1;
                    return false;
                }
                if !seen.insert(record.id()) {
                    warn!(id = record.id(), "duplicate location id, keeping first");
                    duplicates += 1;
                    return false;
                }
                true
            })
            .collect();

        let calibration = Calibration::new(&admitted, &self.activity_share);
        let locations: Vec<Location> = admitted
            .into_iter()
            .map(|record| calibration.finalize(record))
            .collect();

        let index = GeoIndex::from_locations(locations);
        info!(
            locations = index.len(),
            keys = index.key_count(),
            below_threshold,
            duplicates,
            "geo index built"
        );
        index
    }
}
