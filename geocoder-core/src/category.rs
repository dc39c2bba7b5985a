//! # Hierarquia de Categorias Administrativas
//!
//! Define a ordem total das categorias usadas para raciocinar sobre contenção
//! geográfica ("Manhattan está dentro de Nova York, que está dentro dos EUA").
//!
//! | Categoria    | GeoNames | Feature codes                                   |
//! |--------------|----------|-------------------------------------------------|
//! | Country      | PCL      | PCL, PCLI                                       |
//! | Region1      | ADM1     | ADM1                                            |
//! | Region2      | ADM2     | ADM2                                            |
//! | Region3      | ADM3     | ADM3                                            |
//! | Region4      | ADM4     | ADM4                                            |
//! | LocalPlace   | SUBADM   | ADM5, ADMD, PPL, PPLA..PPLA4, PPLC, PPLG, PPLS  |
//!
//! A ordem vem de [`Category::rank`], não da posição de declaração: comparar
//! categorias nunca depende de como as variantes estão listadas.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Nível administrativo de uma entidade, do mais grosso (país) ao mais fino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// **País**: entidade política soberana. Ex: "Brasil", "United Kingdom".
    Country,
    /// **Região nível 1**: estado, província. Ex: "São Paulo", "California".
    Region1,
    /// **Região nível 2**: condado, município.
    Region2,
    /// **Região nível 3**.
    Region3,
    /// **Região nível 4**.
    Region4,
    /// **Lugar local**: cidades, vilas, bairros e subdivisões abaixo de ADM4.
    LocalPlace,
}

impl Category {
    /// Todas as categorias, da mais grossa para a mais fina.
    pub const ALL: [Category; 6] = [
        Category::Country,
        Category::Region1,
        Category::Region2,
        Category::Region3,
        Category::Region4,
        Category::LocalPlace,
    ];

    /// Posição explícita na hierarquia (0 = país).
    pub const fn rank(self) -> u8 {
        match self {
            Category::Country => 0,
            Category::Region1 => 1,
            Category::Region2 => 2,
            Category::Region3 => 3,
            Category::Region4 => 4,
            Category::LocalPlace => 5,
        }
    }

    /// `true` se `self` está estritamente abaixo de `other` na hierarquia.
    pub fn is_finer_than(self, other: Category) -> bool {
        self.rank() > other.rank()
    }

    /// Categorias de `Country` até `self`, inclusive.
    pub fn down_to(self) -> impl Iterator<Item = Category> {
        Category::ALL
            .into_iter()
            .filter(move |c| c.rank() <= self.rank())
    }

    /// Nome usado pelo GeoNames e pelos arquivos de configuração.
    pub fn geonames_name(self) -> &'static str {
        match self {
            Category::Country => "PCL",
            Category::Region1 => "ADM1",
            Category::Region2 => "ADM2",
            Category::Region3 => "ADM3",
            Category::Region4 => "ADM4",
            Category::LocalPlace => "SUBADM",
        }
    }

    /// Feature codes do GeoNames agrupados nesta categoria.
    pub fn feature_codes(self) -> &'static [&'static str] {
        match self {
            Category::Country => &["PCL", "PCLI"],
            Category::Region1 => &["ADM1"],
            Category::Region2 => &["ADM2"],
            Category::Region3 => &["ADM3"],
            Category::Region4 => &["ADM4"],
            Category::LocalPlace => &[
                "ADM5", "ADMD", "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLG", "PPLS",
            ],
        }
    }

    /// Traduz um feature code do GeoNames; `None` para códigos que não indexamos
    /// (rios, montanhas, aeroportos...).
    pub fn from_feature_code(code: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.feature_codes().contains(&code))
    }

    /// Aceita tanto o nome GeoNames (`ADM1`) quanto o nome da variante
    /// (`Region1`, `region1`).
    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim();
        Category::ALL.into_iter().find(|c| {
            c.geonames_name().eq_ignore_ascii_case(name)
                || format!("{:?}", c).eq_ignore_ascii_case(name)
                || name.eq_ignore_ascii_case(&snake_case(*c))
        })
    }
}

fn snake_case(category: Category) -> String {
    match category {
        Category::LocalPlace => "local_place".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.geonames_name())
    }
}
