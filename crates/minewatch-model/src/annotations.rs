//! COCO-style annotation loading.

use crate::{ModelError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// ============================================================================
// JSON Schema Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CocoDataset {
    #[serde(default)]
    images: Vec<CocoImage>,
    #[serde(default)]
    annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    id: u64,
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    segmentation: Segmentation,
}

/// Polygon rings, a bare flat ring, or anything else (RLE masks).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Segmentation {
    Rings(Vec<Vec<f64>>),
    Flat(Vec<f64>),
    Other(serde_json::Value),
}

impl Default for Segmentation {
    fn default() -> Self {
        Segmentation::Rings(Vec::new())
    }
}

impl Segmentation {
    /// The first ring; empty when there is none.
    fn into_first_ring(self) -> Vec<f64> {
        match self {
            Segmentation::Rings(rings) => rings.into_iter().next().unwrap_or_default(),
            Segmentation::Flat(ring) => ring,
            Segmentation::Other(_) => Vec::new(),
        }
    }
}

// ============================================================================
// Public Types
// ============================================================================

/// One annotated site, in annotation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Annotation id from the source file.
    pub id: u64,
    /// Zero-based position in the file.
    pub index: usize,
    /// Human label derived from the category name.
    pub label: String,
    /// Category id, if present.
    pub category_id: Option<u64>,
    /// First segmentation ring as a flat `x, y` list in image pixels.
    ///
    /// Left unchecked; malformed rings surface when the polygon is built.
    pub segmentation: Vec<f64>,
}

impl Annotation {
    /// Build an annotation directly from a flat ring.
    pub fn new(id: u64, index: usize, label: impl Into<String>, segmentation: Vec<f64>) -> Self {
        Self {
            id,
            index,
            label: label.into(),
            category_id: None,
            segmentation,
        }
    }
}

/// All annotations from one file, plus the image they were drawn on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationSet {
    /// `(width, height)` of `images[0]`, when listed.
    pub image_size: Option<(u32, u32)>,
    /// Annotations in file order.
    pub annotations: Vec<Annotation>,
}

/// Turn `open_pit_north` into `Open Pit North`.
fn humanize(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Parse a COCO JSON document.
pub fn parse_coco(text: &str) -> Result<AnnotationSet> {
    let dataset: CocoDataset = serde_json::from_str(text)?;

    let categories: HashMap<u64, &str> = dataset
        .categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let image_size = dataset
        .images
        .first()
        .filter(|image| image.width > 0 && image.height > 0)
        .map(|image| (image.width, image.height));

    let annotations: Vec<Annotation> = dataset
        .annotations
        .into_iter()
        .enumerate()
        .map(|(index, a)| {
            let label = a
                .category_id
                .and_then(|id| categories.get(&id))
                .map(|name| humanize(name))
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| format!("Site {}", index + 1));
            Annotation {
                id: a.id,
                index,
                label,
                category_id: a.category_id,
                segmentation: a.segmentation.into_first_ring(),
            }
        })
        .collect();

    debug!(
        annotations = annotations.len(),
        image_size = ?image_size,
        "Parsed COCO annotations"
    );

    Ok(AnnotationSet {
        image_size,
        annotations,
    })
}

/// Load a COCO JSON file.
pub fn load_coco<P: AsRef<Path>>(path: P) -> Result<AnnotationSet> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    parse_coco(&text)
}
