use crate::config::CatalogConfig;
use crate::normalize::{ImageSource, RawImage};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCategory {
    MalignantMelanocyticProliferations,
    MalignantBcc,
    MalignantScc,
    PigmentedBenignKeratosis,
    BenignDermatofibroma,
    BenignVascularLesions,
}

/// Fixed display order: malignant categories first.
pub const CATEGORY_ORDER: [SampleCategory; 6] = [
    SampleCategory::MalignantMelanocyticProliferations,
    SampleCategory::MalignantBcc,
    SampleCategory::MalignantScc,
    SampleCategory::PigmentedBenignKeratosis,
    SampleCategory::BenignDermatofibroma,
    SampleCategory::BenignVascularLesions,
];

impl SampleCategory {
    pub fn title(&self) -> &'static str {
        match self {
            SampleCategory::MalignantMelanocyticProliferations => {
                "Malignant - Melanocytic proliferations (MEL)"
            }
            SampleCategory::MalignantBcc => "Malignant - Basal cell carcinoma (BCC)",
            SampleCategory::MalignantScc => "Malignant - Squamous cell carcinoma (SCC)",
            SampleCategory::PigmentedBenignKeratosis => "Benign - Keratosis (BKL)",
            SampleCategory::BenignDermatofibroma => "Benign - Dermatofibroma (DF)",
            SampleCategory::BenignVascularLesions => "Benign - Vascular lesion (VASC)",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SampleImage {
    /// ISIC filename stem, e.g. `ISIC_0011865`.
    pub id: String,
    /// Digits portion of the ISIC id, e.g. `0011865`.
    pub isic_number: String,
    pub category: SampleCategory,
    /// Path relative to the catalog image directory.
    pub src: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    category: String,
    src: String,
    filename: String,
}

fn extract_isic_number(id: &str) -> String {
    let rest = id
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("ISIC"))
        .map(|_| id[4..].trim_start_matches(['_', '-']))
        .unwrap_or(id);
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.to_string()
    } else {
        id.to_string()
    }
}

pub struct SampleCatalog {
    images: Vec<SampleImage>,
    image_dir: PathBuf,
}

impl SampleCatalog {
    pub fn load(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(&config.index_file)?;
        Self::from_json(&json, config.image_dir.clone())
    }

    pub fn from_json(json: &str, image_dir: PathBuf) -> Result<Self, CatalogError> {
        let entries: Vec<RawEntry> = serde_json::from_str(json)?;

        let mut images = Vec::with_capacity(entries.len());
        for entry in entries {
            // A new category added to the index must not take the catalog down.
            let Ok(category) =
                serde_json::from_value::<SampleCategory>(serde_json::Value::String(
                    entry.category.clone(),
                ))
            else {
                tracing::warn!(category = %entry.category, id = %entry.id, "unknown sample category, skipping");
                continue;
            };
            images.push(SampleImage {
                isic_number: extract_isic_number(&entry.id),
                id: entry.id,
                category,
                src: entry.src,
                filename: entry.filename,
            });
        }

        Ok(Self { images, image_dir })
    }

    pub fn get(&self, id: &str) -> Option<&SampleImage> {
        let wanted = id.trim();
        self.images
            .iter()
            .find(|img| img.id.eq_ignore_ascii_case(wanted))
    }

    /// Samples grouped by category in the fixed display order. Empty
    /// categories are kept so the gallery layout is stable.
    pub fn grouped(&self) -> Vec<(SampleCategory, Vec<&SampleImage>)> {
        CATEGORY_ORDER
            .iter()
            .map(|&category| {
                let group = self
                    .images
                    .iter()
                    .filter(|img| img.category == category)
                    .collect();
                (category, group)
            })
            .collect()
    }

    fn image_path(&self, sample: &SampleImage) -> PathBuf {
        let relative = sample.src.trim_start_matches('/');
        self.image_dir.join(Path::new(relative))
    }

    /// Reads a catalog entry's bytes into a fresh `RawImage`.
    pub async fn raw_image(&self, sample: &SampleImage) -> Result<RawImage, CatalogError> {
        let bytes = tokio::fs::read(self.image_path(sample)).await?;
        Ok(RawImage {
            data: Bytes::from(bytes),
            filename: sample.filename.clone(),
            source: ImageSource::Sample {
                id: sample.id.clone(),
            },
        })
    }
}
