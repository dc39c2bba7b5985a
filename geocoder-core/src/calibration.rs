//! # Calibração de Pesos por Atividade Online
//!
//! População crua é um prior ruim para texto de redes sociais: um país muito
//! populoso mas pouco conectado apareceria mais do que aparece de fato. A
//! calibração redistribui o prior populacional pela participação medida de
//! cada país na atividade online global.
//!
//! ## Fórmula
//!
//! Seja `pop[c]` a soma das populações das entidades `Country` com código `c`,
//! `mundo = Σ pop[c]`, `conhecida = Σ pop[c]` para os países cobertos pela
//! tabela de atividade e `resto = mundo - conhecida`. Com
//! `share_resto = 1 - Σ share[c]`, para uma entidade `e` do país `c`:
//!
//! - `c` sem população registrada (ou zero): `peso = 0`
//! - `c` coberto: `peso = share[c] * pop(e) / pop[c]`
//! - `c` não coberto: `peso = (pop[c] / resto) * share_resto * pop(e) / pop[c]`

use std::collections::HashMap;

use tracing::debug;

use crate::category::Category;
use crate::config::ActivityShare;
use crate::location::{Location, LocationRecord};

/// Estatísticas por país derivadas dos registros, prontas para finalizar
/// entidades.
#[derive(Debug, Clone)]
pub struct Calibration {
    country_population: HashMap<String, f64>,
    activity_share: ActivityShare,
    world_population: f64,
    rest_population: f64,
    rest_share: f64,
}

impl Calibration {
    /// Agrega a população por país a partir das entidades `Country`.
    pub fn new<'a, I>(records: I, activity_share: &ActivityShare) -> Self
    where
        I: IntoIterator<Item = &'a LocationRecord>,
    {
        let mut country_population: HashMap<String, f64> = HashMap::new();
        for record in records {
            if record.category() != Category::Country {
                continue;
            }
            if let Some(code) = record.country_code() {
                *country_population.entry(code.to_string()).or_insert(0.0) +=
                    record.population().unwrap_or(0) as f64;
            }
        }

        let world_population: f64 = country_population.values().sum();
        let known_population: f64 = country_population
            .iter()
            .filter(|(code, _)| activity_share.covers(code))
            .map(|(_, pop)| *pop)
            .sum();
        let rest_population = world_population - known_population;
        let rest_share = (1.0 - activity_share.total()).max(0.0);

        debug!(
            countries = country_population.len(),
            world_population,
            known_population,
            rest_population,
            rest_share,
            "calibration statistics"
        );

        Self {
            country_population,
            activity_share: activity_share.clone(),
            world_population,
            rest_population,
            rest_share,
        }
    }

    /// Prior calibrado de um registro. Nunca negativo.
    pub fn weight_for(&self, record: &LocationRecord) -> f64 {
        let Some(country) = record.country_code() else {
            return 0.0;
        };
        let Some(country_pop) = self.country_population(country).filter(|p| *p > 0.0) else {
            // País pequeno demais para ter entrado no índice: aproxima com zero.
            return 0.0;
        };

        let in_country = record.population().unwrap_or(0) as f64 / country_pop;
        let country_share = match self.activity_share.share(country) {
            Some(share) => share,
            None if self.rest_population > 0.0 => {
                (country_pop / self.rest_population) * self.rest_share
            }
            None => 0.0,
        };
        (country_share * in_country).max(0.0)
    }

    /// Converte o registro na entidade imutável, com o peso calculado.
    pub fn finalize(&self, record: LocationRecord) -> Location {
        let weight = self.weight_for(&record);
        Location::from_record(record, weight)
    }

    pub fn country_population(&self, country: &str) -> Option<f64> {
        self.country_population.get(country).copied()
    }

    pub fn world_population(&self) -> f64 {
        self.world_population
    }

    pub fn rest_population(&self) -> f64 {
        self.rest_population
    }

    pub fn rest_share(&self) -> f64 {
        self.rest_share
    }
}
