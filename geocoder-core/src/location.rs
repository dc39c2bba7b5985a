//! # Modelo de Entidades Geográficas
//!
//! Uma entidade passa por dois estados:
//!
//! 1. [`LocationRecord`]: registro vindo da ingestão (gazetteer), ainda sem
//!    peso. Construído via [`LocationRecordBuilder`], que valida os códigos
//!    e deriva o conjunto de nomes indexáveis.
//! 2. [`Location`]: entidade finalizada pela calibração
//!    ([`crate::calibration::Calibration::finalize`]), com peso definido uma
//!    única vez. Não há setters; depois de criada ela é imutável.
//!
//! Identidade e igualdade são dadas apenas pelo `id`.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{GeoError, Result};
use crate::tokenizer::char_len;

/// Identificador global (geonameid).
pub type LocationId = u32;

/// Registro de uma localidade antes da calibração de peso.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub(crate) id: LocationId,
    pub(crate) default_name: String,
    pub(crate) feature_code: Option<String>,
    pub(crate) category: Category,
    pub(crate) codes: BTreeMap<Category, String>,
    pub(crate) population: Option<u64>,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) names: BTreeSet<String>,
}

impl LocationRecord {
    /// Inicia a construção de um registro.
    pub fn builder(
        id: LocationId,
        default_name: impl Into<String>,
        category: Category,
    ) -> LocationRecordBuilder {
        LocationRecordBuilder {
            id,
            default_name: default_name.into(),
            category,
            feature_code: None,
            codes: BTreeMap::new(),
            population: None,
            latitude: 0.0,
            longitude: 0.0,
            alternate_names: Vec::new(),
        }
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn population(&self) -> Option<u64> {
        self.population
    }

    pub fn code(&self, category: Category) -> Option<&str> {
        self.codes.get(&category).map(String::as_str)
    }

    /// Código do país (categoria `Country`), se conhecido.
    pub fn country_code(&self) -> Option<&str> {
        self.code(Category::Country)
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }
}

/// Builder de [`LocationRecord`].
#[derive(Debug, Clone)]
pub struct LocationRecordBuilder {
    id: LocationId,
    default_name: String,
    category: Category,
    feature_code: Option<String>,
    codes: BTreeMap<Category, String>,
    population: Option<u64>,
    latitude: f64,
    longitude: f64,
    alternate_names: Vec<String>,
}

impl LocationRecordBuilder {
    pub fn feature_code(mut self, code: impl Into<String>) -> Self {
        self.feature_code = Some(code.into());
        self
    }

    /// Registra o código da entidade em `category`. Códigos vazios são ignorados.
    pub fn code(mut self, category: Category, code: impl Into<String>) -> Self {
        let code = code.into();
        if !code.is_empty() {
            self.codes.insert(category, code);
        }
        self
    }

    pub fn population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn alternate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Valida os códigos e deriva o conjunto de nomes.
    ///
    /// Falha se algum código estiver numa categoria mais fina que a da
    /// própria entidade (um estado não tem código de município).
    pub fn build(self) -> Result<LocationRecord> {
        check_codes(self.id, self.category, &self.codes)?;

        let own_code = self.codes.get(&self.category).map(String::as_str);
        let names = derive_names(&self.alternate_names, &self.default_name, own_code);

        Ok(LocationRecord {
            id: self.id,
            default_name: self.default_name,
            feature_code: self.feature_code,
            category: self.category,
            codes: self.codes,
            population: self.population,
            latitude: self.latitude,
            longitude: self.longitude,
            names,
        })
    }
}

fn check_codes(
    id: LocationId,
    category: Category,
    codes: &BTreeMap<Category, String>,
) -> Result<()> {
    match codes.keys().copied().find(|c| c.is_finer_than(category)) {
        Some(finer) => Err(GeoError::CodeFinerThanCategory {
            id,
            category,
            code_category: finer,
        }),
        None => Ok(()),
    }
}

/// Nomes alternativos + nome padrão com mais de um caractere, mais o código
/// próprio da entidade (ex: "GB" para o Reino Unido, "CA" para a Califórnia).
pub fn derive_names(
    alternate_names: &[String],
    default_name: &str,
    own_code: Option<&str>,
) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = alternate_names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(default_name))
        .filter(|name| char_len(name) > 1)
        .map(str::to_string)
        .collect();

    if let Some(code) = own_code.filter(|c| !c.is_empty()) {
        names.insert(code.to_string());
    }
    names
}

/// Entidade geográfica finalizada, com peso calibrado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    default_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_code: Option<String>,
    category: Category,
    codes: BTreeMap<Category, String>,
    population: Option<u64>,
    weight: f64,
    latitude: f64,
    longitude: f64,
    names: BTreeSet<String>,
}

impl Location {
    /// Único ponto de criação a partir de um registro: o peso entra aqui e
    /// nunca mais muda.
    pub(crate) fn from_record(record: LocationRecord, weight: f64) -> Self {
        Self {
            id: record.id,
            default_name: record.default_name,
            feature_code: record.feature_code,
            category: record.category,
            codes: record.codes,
            population: record.population,
            weight,
            latitude: record.latitude,
            longitude: record.longitude,
            names: record.names,
        }
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn feature_code(&self) -> Option<&str> {
        self.feature_code.as_deref()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn codes(&self) -> &BTreeMap<Category, String> {
        &self.codes
    }

    pub fn code(&self, category: Category) -> Option<&str> {
        self.codes.get(&category).map(String::as_str)
    }

    pub fn country_code(&self) -> Option<&str> {
        self.code(Category::Country)
    }

    pub fn population(&self) -> Option<u64> {
        self.population
    }

    /// Prior calibrado pela participação de atividade online do país.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// `self` contém `child`?
    ///
    /// Exige que `child` seja estritamente mais fino e que, de `Country` até a
    /// categoria de `self`, os códigos presentes dos dois lados coincidam.
    /// Código ausente em qualquer lado não conta como divergência.
    pub fn contains(&self, child: &Location) -> bool {
        if !child.category.is_finer_than(self.category) {
            return false;
        }
        self.category.down_to().all(|category| {
            match (self.code(category), child.code(category)) {
                (Some(parent_code), Some(child_code)) => parent_code == child_code,
                _ => true,
            }
        })
    }

    /// Verifica os invariantes de uma entidade vinda de fora (ex: snapshot
    /// desserializado).
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(GeoError::InvalidWeight {
                id: self.id,
                weight: self.weight,
            });
        }
        check_codes(self.id, self.category, &self.codes)
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
