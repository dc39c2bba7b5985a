//! # Regras de Substituição
//!
//! Alguns nomes muito ambíguos são resolvidos, pelo peso, para a entidade
//! "errada" do ponto de vista de quem escreve em redes sociais. Quem escreve
//! "NY" quase sempre quer a cidade, não o estado; "LA" quase sempre é Los
//! Angeles e não a entidade genérica "LA" do gazetteer.
//!
//! Cada regra é uma linha `(gatilho, token exigido, substituto)`. Ela só é
//! verificada contra o **primeiro** candidato após a ordenação por peso: se o
//! id dele é o gatilho e a consulta contém o token, o substituto é devolvido.
//! Para estender, adicione linhas à tabela.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::GeoIndex;
use crate::location::{Location, LocationId};

/// Uma linha da tabela de substituição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub trigger: LocationId,
    pub required_token: String,
    pub replacement: LocationId,
}

impl OverrideRule {
    pub fn new(trigger: LocationId, required_token: impl Into<String>, replacement: LocationId) -> Self {
        Self {
            trigger,
            required_token: required_token.into(),
            replacement,
        }
    }
}

/// Tabela padrão, avaliada em ordem.
pub fn default_rules() -> Vec<OverrideRule> {
    vec![
        // Estado de Nova York -> cidade de Nova York
        OverrideRule::new(5128638, "NY", 5128581),
        // "LA" genérico -> Los Angeles
        OverrideRule::new(4331987, "LA", 5368361),
    ]
}

/// Regras cujo substituto existe no índice. Regras com substituto ausente
/// ficam inertes e são descartadas na construção.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    pub fn resolve<I>(rules: I, index: &GeoIndex) -> Self
    where
        I: IntoIterator<Item = OverrideRule>,
    {
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let present = index.get(rule.replacement).is_some();
                if !present {
                    debug!(
                        trigger = rule.trigger,
                        replacement = rule.replacement,
                        "override target not indexed, rule is inert"
                    );
                }
                present
            })
            .collect();
        Self { rules }
    }

    /// Regras ativas.
    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    /// Aplica a primeira regra que casar com `top`; senão devolve `top`.
    pub fn apply<'a>(&self, top: &'a Location, tokens: &[String], index: &'a GeoIndex) -> &'a Location {
        self.rules
            .iter()
            .find(|rule| rule.trigger == top.id() && tokens.contains(&rule.required_token))
            .and_then(|rule| index.get(rule.replacement))
            .unwrap_or(top)
    }
}
