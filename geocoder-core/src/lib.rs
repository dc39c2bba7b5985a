//! # geocoder-core: Geocodificação de Texto Livre
//!
//! Converte o campo "localização" escrito por usuários de redes sociais
//! ("London, US", "I am in LA", "san francisco!!") em **uma** entidade
//! geográfica canônica de um gazetteer (GeoNames), ou em nada.
//!
//! ## Arquitetura
//!
//! A construção é feita uma vez; as consultas só leem:
//!
//! 1.  **Ingestão** ([`gazetteer`], [`config`]): linhas do GeoNames viram
//!     [`LocationRecord`]s; limiares de população e participação de
//!     atividade online são validados.
//! 2.  **Construção do índice** ([`index`]): filtra por população, calibra os
//!     pesos ([`calibration`]) e indexa cada nome tokenizado ([`tokenizer`]).
//! 3.  **Resolução** ([`resolver`]): segmentação gulosa da consulta,
//!     verificação de consistência hierárquica ([`category`],
//!     [`location`]), desempate por peso e regras de substituição
//!     ([`overrides`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use geocoder_core::{Category, Geocoder, IndexBuilder, LocationRecord};
//!
//! let records = vec![
//!     LocationRecord::builder(6252001, "United States", Category::Country)
//!         .code(Category::Country, "US")
//!         .population(310_232_863)
//!         .build()?,
//!     LocationRecord::builder(4517009, "London", Category::LocalPlace)
//!         .code(Category::Country, "US")
//!         .code(Category::Region1, "OH")
//!         .population(9_904)
//!         .build()?,
//! ];
//!
//! let builder = IndexBuilder::from_tables(
//!     Category::ALL.into_iter().map(|c| (c, 0)),
//!     [("US", 0.2)],
//! )?;
//! let geocoder = Geocoder::new(builder.build(records));
//!
//! let hit = geocoder.resolve("London@US").map(|l| l.id());
//! assert_eq!(hit, Some(4517009));
//! assert!(geocoder.resolve("ZZQX").is_none());
//! # Ok::<(), geocoder_core::GeoError>(())
//! ```

pub mod calibration;
pub mod category;
pub mod config;
pub mod error;
pub mod gazetteer;
pub mod index;
pub mod location;
pub mod overrides;
pub mod resolver;
pub mod tokenizer;

pub use category::Category;
pub use config::{ActivityShare, PopulationThresholds};
pub use error::{GeoError, Result};
pub use index::{GeoIndex, IndexBuilder, IndexSnapshot};
pub use location::{Location, LocationId, LocationRecord, LocationRecordBuilder};
pub use overrides::{default_rules, OverrideRule, OverrideTable};
pub use resolver::{Geocoder, MatchedSpan, Resolution};
pub use tokenizer::{tokenize, Token};
