//! # Ingestão do Gazetteer GeoNames
//!
//! Lê o dump `allCountries.txt` do GeoNames (uma entidade por linha, colunas
//! separadas por TAB) e produz [`LocationRecord`]s prontos para o
//! [`crate::index::IndexBuilder`].
//!
//! Colunas usadas:
//!
//! | Coluna | Conteúdo                                   |
//! |--------|--------------------------------------------|
//! | 0      | geonameid                                  |
//! | 1      | nome padrão                                |
//! | 3      | nomes alternativos, separados por vírgula  |
//! | 4, 5   | latitude, longitude                        |
//! | 7      | feature code                               |
//! | 8      | código do país                             |
//! | 10..13 | códigos admin1..admin4                     |
//! | 14     | população                                  |
//!
//! Linhas sem feature code ou país, ou com feature code fora da tabela de
//! categorias, não viram registro. Campos numéricos inválidos são erro, com o
//! número da linha.
//!
//! O dump completo tem milhões de linhas; [`compress`] copia só as linhas que
//! passam pelos limiares de população, gerando um arquivo bem menor com o
//! mesmo formato.

use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::str::FromStr;

use tracing::{debug, info, trace, warn};

use crate::category::Category;
use crate::config::PopulationThresholds;
use crate::error::{GeoError, Result};
use crate::location::LocationRecord;

const COLUMNS: usize = 15;

/// Categoria de cada coluna de código administrativo.
const CODE_COLUMNS: [(usize, Category); 5] = [
    (8, Category::Country),
    (10, Category::Region1),
    (11, Category::Region2),
    (12, Category::Region3),
    (13, Category::Region4),
];

/// Interpreta uma linha do dump. `line_no` começa em 1 e só é usado nas
/// mensagens de erro.
pub fn parse_row(line: &str, line_no: usize) -> Result<Option<LocationRecord>> {
    let columns: Vec<&str> = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
    if columns.len() < COLUMNS {
        return Err(GeoError::MalformedRow {
            line: line_no,
            reason: format!("expected {} columns, found {}", COLUMNS, columns.len()),
        });
    }

    let id: u32 = numeric(&columns, 0, line_no)?;
    let latitude: f64 = numeric(&columns, 4, line_no)?;
    let longitude: f64 = numeric(&columns, 5, line_no)?;
    let population: u64 = numeric(&columns, 14, line_no)?;

    let feature_code = columns[7].trim();
    if feature_code.is_empty() || columns[8].trim().is_empty() {
        trace!(line = line_no, id, "row without feature or country code");
        return Ok(None);
    }
    let Some(category) = Category::from_feature_code(feature_code) else {
        return Ok(None);
    };

    let alternates = columns[3]
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty());

    // Códigos mais finos que a própria categoria não fazem parte da identidade.
    let builder = CODE_COLUMNS
        .iter()
        .filter(|(_, code_category)| !code_category.is_finer_than(category))
        .fold(
            LocationRecord::builder(id, columns[1].trim(), category),
            |builder, (column, code_category)| builder.code(*code_category, columns[*column].trim()),
        );

    builder
        .feature_code(feature_code)
        .coordinates(latitude, longitude)
        .population(population)
        .alternate_names(alternates)
        .build()
        .map(Some)
}

fn numeric<T: FromStr>(columns: &[&str], column: usize, line_no: usize) -> Result<T> {
    let raw = columns[column].trim();
    raw.parse().map_err(|_| GeoError::MalformedRow {
        line: line_no,
        reason: format!("column {} is not numeric: '{}'", column, raw),
    })
}

/// Lê o gazetteer inteiro, aplicando os limiares de população e descartando
/// ids repetidos (fica a primeira ocorrência).
pub fn read_gazetteer<R: BufRead>(
    reader: R,
    thresholds: &PopulationThresholds,
) -> Result<Vec<LocationRecord>> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut rows = 0usize;

    for_each_admitted(reader, thresholds, |_, record| {
        rows += 1;
        if seen.insert(record.id()) {
            records.push(record);
        } else {
            warn!(id = record.id(), "duplicate gazetteer id, keeping first");
        }
        Ok(())
    })?;

    info!(admitted = rows, records = records.len(), "gazetteer loaded");
    Ok(records)
}

/// Copia para `writer` apenas as linhas que passam pelos limiares, sem
/// alterá-las. Devolve quantas linhas foram escritas.
pub fn compress<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    thresholds: &PopulationThresholds,
) -> Result<usize> {
    let mut written = 0usize;
    for_each_admitted(reader, thresholds, |line, _| {
        writeln!(writer, "{}", line)?;
        written += 1;
        Ok(())
    })?;
    writer.flush()?;
    info!(written, "gazetteer compressed");
    Ok(written)
}

/// Percorre as linhas, chamando `visit` para cada registro admitido.
fn for_each_admitted<R, F>(reader: R, thresholds: &PopulationThresholds, mut visit: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&str, LocationRecord) -> Result<()>,
{
    let mut below_threshold = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(record) = parse_row(&line, i + 1)? else {
            continue;
        };
        if !thresholds.admits(record.category(), record.population()) {
            below_threshold += 1;
            continue;
        }
        visit(line.trim_end_matches('\r'), record)?;
    }
    debug!(below_threshold, "gazetteer rows below population threshold");
    Ok(())
}
