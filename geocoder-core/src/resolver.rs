//! # Resolução de Localizações: Segmentação e Desambiguação Hierárquica
//!
//! O [`Geocoder`] recebe texto livre e devolve no máximo uma entidade:
//!
//! 1. **Tokenização** ([`crate::tokenizer`]).
//! 2. **Segmentação gulosa** ([`Geocoder::match_tokens`]): a janela de busca
//!    começa na entrada inteira; testa prefixos do maior para o menor e o
//!    primeiro que existir no índice vira um *span*. Sem match, descarta o
//!    token mais à esquerda e tenta de novo; com um único token restante sem
//!    match, para.
//! 3. **Consistência**: nos dois sentidos (ordem original e invertida), o
//!    primeiro span fornece as hipóteses "mais finas". Cada hipótese precisa
//!    encontrar um pai ([`Location::contains`]) em cada um dos spans seguintes;
//!    o primeiro span sem pai encerra a caminhada. Consistente em qualquer
//!    sentido vence.
//! 4. **Desempate por peso**: consistentes, se houver; senão os
//!    inconsistentes. Ordena por peso decrescente (estável).
//! 5. **Substituições** ([`crate::overrides`]) sobre o primeiro colocado.
//!
//! ## Exemplo
//!
//! ```text
//! "London, US"
//!   tokens : ["LONDON", "US"]
//!   spans  : [{London GB, London OH}, {United States}]
//!   →      : London GB não está nos EUA; London OH está → London OH
//!
//! "London, India"
//!   spans  : [{London GB, London OH}, {India}]
//!   →      : nada consistente; cai no maior peso entre todos
//! ```
//!
//! Depois de construído, o `Geocoder` só é lido: pode ser compartilhado
//! entre threads sem sincronização.

use serde::Serialize;
use tracing::trace;

use crate::index::GeoIndex;
use crate::location::Location;
use crate::overrides::{default_rules, OverrideRule, OverrideTable};
use crate::tokenizer::tokenize;

/// Trecho da consulta casado com uma chave do índice.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedSpan<'a> {
    /// Índice do primeiro token (inclusivo).
    pub start: usize,
    /// Índice do último token (exclusivo).
    pub end: usize,
    /// Entidades que compartilham o nome casado.
    pub candidates: Vec<&'a Location>,
}

impl MatchedSpan<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Sentido em que os spans são percorridos na verificação de consistência.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Hipóteses classificadas, em ordem de descoberta (sentido direto primeiro).
#[derive(Debug, Default)]
struct Consistency<'a> {
    consistent: Vec<&'a Location>,
    inconsistent: Vec<&'a Location>,
}

impl<'a> Consistency<'a> {
    fn classify(spans: &[MatchedSpan<'a>]) -> Self {
        let mut verdict = Self::default();
        verdict.walk(spans, Direction::Forward);
        verdict.walk(spans, Direction::Backward);
        // Consistente em qualquer sentido domina.
        let consistent = &verdict.consistent;
        verdict.inconsistent.retain(|l| !consistent.contains(l));
        verdict
    }

    fn walk(&mut self, spans: &[MatchedSpan<'a>], direction: Direction) {
        let ordered: Vec<&[&'a Location]> = match direction {
            Direction::Forward => spans.iter().map(|s| s.candidates.as_slice()).collect(),
            Direction::Backward => spans.iter().rev().map(|s| s.candidates.as_slice()).collect(),
        };
        let Some((finest, coarser)) = ordered.split_first() else {
            return;
        };

        for &hypothesis in finest.iter() {
            let has_parents = coarser
                .iter()
                .take_while(|span| !span.is_empty())
                .all(|span| span.iter().any(|parent| parent.contains(hypothesis)));

            let bucket = if has_parents {
                &mut self.consistent
            } else {
                &mut self.inconsistent
            };
            if !bucket.contains(&hypothesis) {
                bucket.push(hypothesis);
            }
        }
    }

    /// Pool final ordenado por peso decrescente.
    fn ranked(&self) -> Vec<&'a Location> {
        let mut pool = if self.consistent.is_empty() {
            self.inconsistent.clone()
        } else {
            self.consistent.clone()
        };
        pool.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
        pool
    }
}

/// Passo a passo de uma resolução, para depuração e visualização.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution<'a> {
    pub tokens: Vec<String>,
    pub spans: Vec<MatchedSpan<'a>>,
    pub consistent: Vec<&'a Location>,
    pub inconsistent: Vec<&'a Location>,
    /// Pool escolhido, já ordenado por peso.
    pub ranked: Vec<&'a Location>,
    /// `true` se uma regra de substituição trocou o primeiro colocado.
    pub overridden: bool,
    pub location: Option<&'a Location>,
}

/// Resolve texto livre para entidades do índice.
#[derive(Debug, Clone)]
pub struct Geocoder {
    index: GeoIndex,
    overrides: OverrideTable,
}

impl Geocoder {
    /// Geocoder com a tabela de substituições padrão.
    pub fn new(index: GeoIndex) -> Self {
        Self::with_overrides(index, default_rules())
    }

    /// Geocoder com uma tabela de substituições própria.
    pub fn with_overrides<I>(index: GeoIndex, rules: I) -> Self
    where
        I: IntoIterator<Item = OverrideRule>,
    {
        let overrides = OverrideTable::resolve(rules, &index);
        Self { index, overrides }
    }

    pub fn index(&self) -> &GeoIndex {
        &self.index
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Resolve o texto para uma única entidade, se houver.
    pub fn resolve(&self, text: &str) -> Option<&Location> {
        self.resolve_tokens(&tokenize(text))
    }

    /// Como [`Geocoder::resolve`], para entrada já tokenizada.
    pub fn resolve_tokens(&self, tokens: &[String]) -> Option<&Location> {
        let spans = self.match_tokens(tokens);
        let ranked = Consistency::classify(&spans).ranked();
        let resolved = self.pick(tokens, &ranked).map(|(location, _)| location);
        trace!(
            ?tokens,
            spans = spans.len(),
            resolved = ?resolved.map(Location::id),
            "resolve"
        );
        resolved
    }

    /// Segmentação crua: spans ambíguos da esquerda para a direita.
    pub fn match_text(&self, text: &str) -> Vec<MatchedSpan<'_>> {
        self.match_tokens(&tokenize(text))
    }

    pub fn match_tokens(&self, tokens: &[String]) -> Vec<MatchedSpan<'_>> {
        let mut spans = Vec::new();
        let mut offset = 0;
        loop {
            let window = &tokens[offset..];
            if let Some((consumed, candidates)) = self.search_greedily(window) {
                spans.push(MatchedSpan {
                    start: offset,
                    end: offset + consumed,
                    candidates,
                });
                offset += consumed;
            } else if window.len() > 1 {
                // Descarta o token mais à esquerda.
                offset += 1;
            } else {
                break;
            }
        }
        spans
    }

    /// Resolução completa, devolvendo todos os passos intermediários.
    pub fn explain(&self, text: &str) -> Resolution<'_> {
        let tokens = tokenize(text);
        let spans = self.match_tokens(&tokens);
        let verdict = Consistency::classify(&spans);
        let ranked = verdict.ranked();
        let picked = self.pick(&tokens, &ranked);
        Resolution {
            spans,
            consistent: verdict.consistent,
            inconsistent: verdict.inconsistent,
            ranked,
            overridden: picked.map(|(_, overridden)| overridden).unwrap_or(false),
            location: picked.map(|(location, _)| location),
            tokens,
        }
    }

    /// Maior prefixo de `window` presente no índice.
    fn search_greedily(&self, window: &[String]) -> Option<(usize, Vec<&Location>)> {
        (1..=window.len())
            .rev()
            .find_map(|len| self.index.lookup(&window[..len]).map(|found| (len, found)))
    }

    fn pick<'a>(&'a self, tokens: &[String], ranked: &[&'a Location]) -> Option<(&'a Location, bool)> {
        let top = ranked.first().copied()?;
        let chosen = self.overrides.apply(top, tokens, &self.index);
        Some((chosen, chosen.id() != top.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::index::IndexBuilder;
    use crate::location::LocationRecord;

    fn record(
        id: u32,
        name: &str,
        category: Category,
        codes: &[(Category, &str)],
        alternates: &[&str],
        population: u64,
    ) -> LocationRecord {
        codes
            .iter()
            .fold(LocationRecord::builder(id, name, category), |b, (c, code)| {
                b.code(*c, *code)
            })
            .alternate_names(alternates.iter().copied())
            .population(population)
            .build()
            .unwrap()
    }

    fn geocoder() -> Geocoder {
        use Category::*;
        let records = vec![
            record(6252001, "United States", Country, &[(Country, "US")], &["USA"], 310_232_863),
            record(2635167, "United Kingdom", Country, &[(Country, "GB")], &["UK"], 62_348_447),
            record(1269750, "India", Country, &[(Country, "IN")], &[], 1_173_108_018),
            record(5332921, "California", Region1, &[(Country, "US"), (Region1, "CA")], &[], 37_691_912),
            record(5165418, "Ohio", Region1, &[(Country, "US"), (Region1, "OH")], &[], 11_544_225),
            record(5128638, "New York", Region1, &[(Country, "US"), (Region1, "NY")], &[], 19_274_244),
            record(
                5128581,
                "New York City",
                LocalPlace,
                &[(Country, "US"), (Region1, "NY")],
                &["New York", "NYC"],
                8_175_133,
            ),
            record(
                5391959,
                "San Francisco",
                LocalPlace,
                &[(Country, "US"), (Region1, "CA")],
                &["SF"],
                805_235,
            ),
            record(2643743, "London", LocalPlace, &[(Country, "GB"), (Region1, "ENG")], &[], 7_556_900),
            record(4517009, "London", LocalPlace, &[(Country, "US"), (Region1, "OH")], &[], 9_904),
            record(4331987, "LA", LocalPlace, &[(Country, "US")], &[], 4_500_000),
            record(
                5368361,
                "Los Angeles",
                LocalPlace,
                &[(Country, "US"), (Region1, "CA")],
                &["LA"],
                3_792_621,
            ),
        ];
        let index = IndexBuilder::from_tables(
            [
                (Country, 500_000),
                (Region1, 30_000),
                (Region2, 1_000),
                (Region3, 1_000),
                (Region4, 1_000),
                (LocalPlace, 1_000),
            ],
            [("US", 0.2), ("GB", 0.1)],
        )
        .unwrap()
        .build(records);
        Geocoder::new(index)
    }

    fn resolved_id(g: &Geocoder, text: &str) -> Option<u32> {
        g.resolve(text).map(Location::id)
    }

    #[test]
    fn test_single_exact_match() {
        let g = geocoder();
        let uk = g.resolve("UK").unwrap();
        assert_eq!(uk.id(), 2635167);
        assert!((uk.weight() - 0.1).abs() < 1e-12);
        assert_eq!(resolved_id(&g, "LONDON."), Some(2643743));
        assert_eq!(resolved_id(&g, ",san Francisco"), Some(5391959));
    }

    #[test]
    fn test_no_match() {
        let g = geocoder();
        assert_eq!(resolved_id(&g, "ZZQX"), None);
        assert_eq!(resolved_id(&g, ""), None);
        assert_eq!(resolved_id(&g, "!!! ..."), None);
    }

    #[test]
    fn test_prefer_consistency_over_prior() {
        let g = geocoder();
        assert_eq!(resolved_id(&g, "London, US"), Some(4517009));
        assert_eq!(resolved_id(&g, "US, London"), Some(4517009));
        assert_eq!(resolved_id(&g, "London@US"), Some(4517009));
    }

    #[test]
    fn test_prefer_prior_if_inconsistent() {
        let g = geocoder();
        assert_eq!(resolved_id(&g, "London, India"), Some(1269750));
        assert_eq!(resolved_id(&g, "India, London"), Some(1269750));
        assert_eq!(resolved_id(&g, "London@India"), Some(1269750));
    }

    #[test]
    fn test_hierarchy_with_finest_at_either_end() {
        let g = geocoder();
        for text in [
            "San Francisco, California, US",
            "US, California, San Francisco",
            "San Francisco, US, California",
            "California, US, San Francisco",
        ] {
            assert_eq!(resolved_id(&g, text), Some(5391959), "{text}");
        }
    }

    #[test]
    fn test_finest_in_the_middle_is_not_evaluated() {
        // Só os spans das pontas geram hipóteses; a cidade no meio não entra.
        let g = geocoder();
        let explained = g.explain("California, San Francisco, US");
        assert!(explained.consistent.is_empty());
        assert!(explained.inconsistent.iter().all(|l| l.id() != 5391959));
        assert_eq!(explained.location.map(Location::id), Some(6252001));
    }

    #[test]
    fn test_greedy_match_consumes_all_tokens() {
        let g = geocoder();
        let spans = g.match_text("new york city / san francisco");
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (0, 3));
        assert_eq!((spans[1].start, spans[1].end), (3, 5));
        assert_eq!(spans.iter().map(MatchedSpan::len).sum::<usize>(), 5);
        assert_eq!(spans[0].candidates[0].id(), 5128581);
    }

    #[test]
    fn test_match_skips_unknown_prefix_tokens() {
        let g = geocoder();
        let spans = g.match_text("Living in sunny Ohio");
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (3, 4));
        // Um único token sem match encerra a segmentação.
        assert!(g.match_text("Ohio sunny").len() == 1);
        assert!(g.match_text("nowhere").is_empty());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let g = geocoder();
        let spans = g.match_text("New York City");
        assert_eq!(spans.len(), 1);
        let ids: Vec<u32> = spans[0].candidates.iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec![5128581]);

        let spans = g.match_text("New York");
        let ids: Vec<u32> = spans[0].candidates.iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec![5128581, 5128638]);
    }

    #[test]
    fn test_city_within_state_abbreviation() {
        let g = geocoder();
        assert_eq!(resolved_id(&g, "New York, NY"), Some(5128581));
    }

    #[test]
    fn test_override_new_york_state() {
        let g = geocoder();
        let explained = g.explain("NY");
        assert_eq!(explained.ranked[0].id(), 5128638);
        assert!(explained.overridden);
        assert_eq!(explained.location.map(Location::id), Some(5128581));
    }

    #[test]
    fn test_override_los_angeles() {
        let g = geocoder();
        assert_eq!(resolved_id(&g, "I am in LA"), Some(5368361));
        // Sem o token em maiúsculas, "la" não casa com nada.
        assert_eq!(resolved_id(&g, "I am in la"), None);
    }

    #[test]
    fn test_without_overrides() {
        let g = geocoder();
        let plain = Geocoder::with_overrides(g.index().clone(), Vec::new());
        assert_eq!(plain.resolve("NY").map(Location::id), Some(5128638));
    }

    #[test]
    fn test_idempotent() {
        let g = geocoder();
        for text in ["London, US", "I am in LA", "India, London", "ZZQX"] {
            assert_eq!(resolved_id(&g, text), resolved_id(&g, text));
        }
    }

    #[test]
    fn test_explain_matches_resolve() {
        let g = geocoder();
        for text in ["London, US", "NY", "London, India", "nowhere"] {
            assert_eq!(
                g.explain(text).location.map(Location::id),
                resolved_id(&g, text),
                "{text}"
            );
        }
    }

    #[test]
    fn test_geocoder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Geocoder>();
    }
}
