//! Controlled vocabulary for instrument and platform descriptions.
//!
//! Entries follow the GCMD keyword layout. Mappers store them as JSON in the
//! `instrument` and `platform` metadata fields. A tag the vocabulary does not
//! know leaves the field out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use raster_common::MetadataMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// GCMD instrument keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Class", default)]
    pub class: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Subtype", default)]
    pub subtype: String,
    #[serde(rename = "Short_Name")]
    pub short_name: String,
    #[serde(rename = "Long_Name", default)]
    pub long_name: String,
}

/// GCMD platform keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Series_Entity", default)]
    pub series_entity: String,
    #[serde(rename = "Short_Name")]
    pub short_name: String,
    #[serde(rename = "Long_Name", default)]
    pub long_name: String,
}

/// Lookup of instrument and platform descriptions by source tag.
///
/// Lookups never fail; an unknown tag is `None`.
pub trait Vocabulary: Send + Sync {
    fn instrument(&self, tag: &str) -> Option<Instrument>;
    fn platform(&self, tag: &str) -> Option<Platform>;
}

/// Override file layout:
///
/// ```yaml
/// instruments:
///   seviri:
///     Category: Earth Remote Sensing Instruments
///     Short_Name: SEVIRI
/// platforms:
///   msg-4:
///     Category: Space-based Platforms
///     Short_Name: MSG-4
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyFile {
    #[serde(default)]
    pub instruments: BTreeMap<String, Instrument>,
    #[serde(default)]
    pub platforms: BTreeMap<String, Platform>,
}

/// In-memory GCMD keyword table, keyed by lowercase tag.
#[derive(Debug, Clone, Default)]
pub struct GcmdVocabulary {
    instruments: BTreeMap<String, Instrument>,
    platforms: BTreeMap<String, Platform>,
}

fn gcmd_instrument(
    category: &str,
    class: &str,
    kind: &str,
    subtype: &str,
    short: &str,
    long: &str,
) -> Instrument {
    Instrument {
        category: category.to_string(),
        class: class.to_string(),
        kind: kind.to_string(),
        subtype: subtype.to_string(),
        short_name: short.to_string(),
        long_name: long.to_string(),
    }
}

fn gcmd_platform(category: &str, series: &str, short: &str, long: &str) -> Platform {
    Platform {
        category: category.to_string(),
        series_entity: series.to_string(),
        short_name: short.to_string(),
        long_name: long.to_string(),
    }
}

const SPACE_BASED: &str = "Space-based Platforms";
const MODELS: &str = "Models/Analyses";

impl GcmdVocabulary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keywords for every product family the built-in mappers recognise.
    pub fn builtin() -> Self {
        let mut vocab = Self::default();

        vocab.add_instrument(
            "computer",
            gcmd_instrument(
                "In Situ/Laboratory Instruments",
                "Data Analysis",
                "Environmental Modeling",
                "",
                "Computer",
                "Computer",
            ),
        );
        vocab.add_instrument(
            "abi",
            gcmd_instrument(
                "Earth Remote Sensing Instruments",
                "Passive Remote Sensing",
                "Spectrometers/Radiometers",
                "Imaging Spectrometers/Radiometers",
                "ABI",
                "Advanced Baseline Imager",
            ),
        );

        vocab.add_platform("models", gcmd_platform(MODELS, "", "MODELS", ""));
        vocab.add_platform(
            "ncep-gfs",
            gcmd_platform(MODELS, "", "NCEP-GFS", "NCEP Global Forecast System"),
        );
        for n in 16..=19 {
            vocab.add_platform(
                &format!("goes-{}", n),
                gcmd_platform(
                    SPACE_BASED,
                    "GOES",
                    &format!("GOES-{}", n),
                    &format!("Geostationary Operational Environmental Satellite {}", n),
                ),
            );
        }
        vocab
    }

    /// Built-in table with the entries of a YAML override file on top.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let file: VocabularyFile = serde_yaml::from_str(&content)?;
        let mut vocab = Self::builtin();
        debug!(
            path = %path.display(),
            instruments = file.instruments.len(),
            platforms = file.platforms.len(),
            "Loaded vocabulary overrides"
        );
        vocab.merge(file);
        Ok(vocab)
    }

    pub fn merge(&mut self, file: VocabularyFile) {
        for (tag, entry) in file.instruments {
            self.add_instrument(&tag, entry);
        }
        for (tag, entry) in file.platforms {
            self.add_platform(&tag, entry);
        }
    }

    pub fn add_instrument(&mut self, tag: &str, entry: Instrument) {
        self.instruments.insert(tag.to_lowercase(), entry);
    }

    pub fn add_platform(&mut self, tag: &str, entry: Platform) {
        self.platforms.insert(tag.to_lowercase(), entry);
    }
}

impl Vocabulary for GcmdVocabulary {
    /// Matches the tag, then the short name, then the long name, ignoring case.
    fn instrument(&self, tag: &str) -> Option<Instrument> {
        let tag = tag.to_lowercase();
        self.instruments
            .get(&tag)
            .or_else(|| {
                self.instruments.values().find(|i| {
                    i.short_name.to_lowercase() == tag || i.long_name.to_lowercase() == tag
                })
            })
            .cloned()
    }

    fn platform(&self, tag: &str) -> Option<Platform> {
        let tag = tag.to_lowercase();
        self.platforms
            .get(&tag)
            .or_else(|| {
                self.platforms.values().find(|p| {
                    p.short_name.to_lowercase() == tag || p.long_name.to_lowercase() == tag
                })
            })
            .cloned()
    }
}

/// Store the vocabulary entries for `instrument_tag` and `platform_tag` as
/// JSON under `instrument` / `platform`. Misses are logged and skipped.
pub fn inject_instrument_platform(
    metadata: &mut MetadataMap,
    vocabulary: &dyn Vocabulary,
    instrument_tag: &str,
    platform_tag: &str,
) {
    inject_instrument(metadata, vocabulary, instrument_tag);
    inject_platform(metadata, vocabulary, platform_tag);
}

pub fn inject_instrument(metadata: &mut MetadataMap, vocabulary: &dyn Vocabulary, tag: &str) {
    match vocabulary.instrument(tag).map(|i| serde_json::to_string(&i)) {
        Some(Ok(json)) => {
            metadata.insert("instrument".to_string(), json);
        }
        Some(Err(e)) => warn!(tag, error = %e, "Cannot serialize instrument"),
        None => debug!(tag, "Instrument not in vocabulary"),
    }
}

pub fn inject_platform(metadata: &mut MetadataMap, vocabulary: &dyn Vocabulary, tag: &str) {
    match vocabulary.platform(tag).map(|p| serde_json::to_string(&p)) {
        Some(Ok(json)) => {
            metadata.insert("platform".to_string(), json);
        }
        Some(Err(e)) => warn!(tag, error = %e, "Cannot serialize platform"),
        None => debug!(tag, "Platform not in vocabulary"),
    }
}
