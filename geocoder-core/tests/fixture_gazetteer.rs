//! Fluxo completo sobre um pequeno gazetteer no formato GeoNames:
//! ingestão -> construção do índice -> resolução.

use geocoder_core::gazetteer::{compress, read_gazetteer};
use geocoder_core::{
    ActivityShare, Category, GeoIndex, Geocoder, IndexBuilder, Location, PopulationThresholds,
};

const GAZETTEER: &str = include_str!("data/gazetteer.txt");
const THRESHOLDS: &str = include_str!("data/population.threshold.txt");
const ACTIVITY: &str = include_str!("data/activity.share.txt");

fn thresholds() -> PopulationThresholds {
    PopulationThresholds::parse(THRESHOLDS).unwrap()
}

fn build_index() -> GeoIndex {
    let records = read_gazetteer(GAZETTEER.as_bytes(), &thresholds()).unwrap();
    let builder = IndexBuilder::new(thresholds(), ActivityShare::parse(ACTIVITY).unwrap());
    builder.build(records)
}

fn geocoder() -> Geocoder {
    Geocoder::new(build_index())
}

fn resolved(g: &Geocoder, text: &str) -> Option<u32> {
    g.resolve(text).map(Location::id)
}

#[test]
fn test_ingestion_filters_rows() {
    let index = build_index();
    assert_eq!(index.len(), 16);
    // Rio (feature code fora da tabela), região sem população e vilarejo.
    assert!(index.get(2636063).is_none());
    assert!(index.get(6269131).is_none());
    assert!(index.get(9999999).is_none());

    let counts: Vec<(Category, usize)> = index.category_counts();
    assert_eq!(counts[0], (Category::Country, 4));
    assert_eq!(counts[1], (Category::Region1, 3));
    assert_eq!(counts[5], (Category::LocalPlace, 9));
}

#[test]
fn test_country_alias() {
    let g = geocoder();
    let uk = g.resolve("UK").unwrap();
    assert_eq!(uk.id(), 2635167);
    assert!((uk.weight() - 0.1).abs() < 1e-12);
    assert_eq!(resolved(&g, "Great Britain!!"), Some(2635167));
}

#[test]
fn test_unknown_text() {
    let g = geocoder();
    assert_eq!(resolved(&g, "ZZQX"), None);
    assert_eq!(resolved(&g, "somewhere over the rainbow"), None);
}

#[test]
fn test_ambiguous_city_uses_weight() {
    let g = geocoder();
    assert_eq!(resolved(&g, "London"), Some(2643743));
    assert_eq!(resolved(&g, "LONDON."), Some(2643743));
}

#[test]
fn test_ambiguous_city_uses_context() {
    let g = geocoder();
    assert_eq!(resolved(&g, "London, US"), Some(4517009));
    assert_eq!(resolved(&g, "London, Ohio"), Some(4517009));
    assert_eq!(resolved(&g, "London, CA"), Some(6058560));
    assert_eq!(resolved(&g, "London, Canada"), Some(6058560));
    assert_eq!(resolved(&g, "San Francisco, CA"), Some(5391959));
}

#[test]
fn test_inconsistent_context_falls_back_to_weight() {
    let g = geocoder();
    assert_eq!(resolved(&g, "London, India"), Some(1269750));
}

#[test]
fn test_country_without_activity_gets_zero_weight() {
    let g = geocoder();
    let paris_fr = g.index().get(2988507).unwrap();
    assert_eq!(paris_fr.weight(), 0.0);
    // Sem entidade de país para FR, Paris (TX) vence.
    assert_eq!(resolved(&g, "Paris"), Some(4717560));
}

#[test]
fn test_default_overrides() {
    let g = geocoder();
    assert_eq!(resolved(&g, "I am in LA"), Some(5368361));
    assert_eq!(resolved(&g, "NY"), Some(5128581));
    assert_eq!(resolved(&g, "New York, NY"), Some(5128581));
    assert_eq!(g.overrides().rules().len(), 2);
}

#[test]
fn test_match_two_keys() {
    let g = geocoder();
    let spans = g.match_text("London/San Francisco");
    assert_eq!(spans.len(), 2);
    assert_eq!((spans[0].start, spans[0].end), (0, 1));
    assert_eq!((spans[1].start, spans[1].end), (1, 3));
    assert_eq!(spans[0].candidates.len(), 3);
}

#[test]
fn test_compressed_gazetteer_builds_same_index() {
    let mut compressed = Vec::new();
    let written = compress(GAZETTEER.as_bytes(), &mut compressed, &thresholds()).unwrap();
    assert_eq!(written, 16);

    let from_compressed = read_gazetteer(compressed.as_slice(), &thresholds()).unwrap();
    let mut ids: Vec<u32> = from_compressed.iter().map(|r| r.id()).collect();
    ids.sort_unstable();
    let mut expected: Vec<u32> = build_index().locations().map(Location::id).collect();
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn test_snapshot_resolves_the_same() {
    let g = geocoder();
    let json = serde_json::to_string(g.index()).unwrap();
    let restored = Geocoder::new(serde_json::from_str(&json).unwrap());
    for text in ["UK", "London, US", "I am in LA", "London, India", "Paris", "ZZQX"] {
        assert_eq!(resolved(&restored, text), resolved(&g, text), "{text}");
    }
}
