use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, RgbImage, imageops::FilterType};
use ndarray::{Array4, CowArray};
use once_cell::sync::Lazy;
use ort::{
    GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
    tensor::OrtOwnedTensor, value::Value,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod labels;

/// Crate version, surfaced in the GUI settings panel.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of predictions returned when the caller does not override it.
pub const DEFAULT_TOP_K: usize = 5;

/// How many of the highest-probability classes are scanned for wildlife
/// species before giving up on the wildlife path.
const CANDIDATE_POOL: usize = 100;

/// A ranked species prediction.
///
/// `confidence` is a percentage in `[0, 100]` as reported per class. When two
/// classes share a species name the later occurrence adds half its percentage
/// to the earlier one, so aggregated values are not renormalized and may
/// exceed the raw class probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub species: String,
    pub confidence: f32,
}

/// Rank wildlife species in a classifier probability vector.
///
/// Scans the 100 highest-probability classes in descending order and collects
/// those with a known species name, aggregating duplicate names. Collection
/// stops once `2 * top_k` distinct names are found. When no scanned class maps
/// to a species, the plain top-`top_k` classes are returned instead, labelled
/// `Class {index}` where unmapped.
pub fn rank_species(probs: &[f32], top_k: usize) -> Vec<Prediction> {
    rank_with_lookup(probs, top_k, labels::species_for)
}

fn rank_with_lookup(
    probs: &[f32],
    top_k: usize,
    lookup: impl Fn(usize) -> Option<&'static str>,
) -> Vec<Prediction> {
    let pool = top_indices(probs, CANDIDATE_POOL);

    let mut picks: Vec<Prediction> = Vec::new();
    for &(idx, prob) in &pool {
        let Some(name) = lookup(idx) else { continue };
        let pct = prob * 100.0;
        if let Some(existing) = picks.iter_mut().find(|p| p.species == name) {
            // Repeat occurrence of an already-seen name counts at half weight.
            existing.confidence += pct * 0.5;
        } else {
            picks.push(Prediction {
                species: name.to_string(),
                confidence: pct,
            });
        }
        if picks.len() >= top_k * 2 {
            break;
        }
    }

    if picks.is_empty() {
        return general_predictions(probs, top_k, lookup);
    }

    picks.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    picks.truncate(top_k);
    picks
}

/// Fallback when nothing in the candidate pool maps to a species: the plain
/// top-`top_k` classes of the full vector.
fn general_predictions(
    probs: &[f32],
    top_k: usize,
    lookup: impl Fn(usize) -> Option<&'static str>,
) -> Vec<Prediction> {
    top_indices(probs, top_k)
        .into_iter()
        .map(|(idx, prob)| Prediction {
            species: lookup(idx)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Class {idx}")),
            confidence: prob * 100.0,
        })
        .collect()
}

/// Indices of the `k` largest probabilities, descending. Ties break toward the
/// lower class index so output is deterministic for identical inputs.
fn top_indices(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
        Some(Ordering::Equal) | None => a.0.cmp(&b.0),
        Some(ord) => ord,
    });
    indexed.truncate(k);
    indexed
}

/// Export ranked predictions to CSV with headers:
/// rank,species,confidence_pct
pub fn export_csv(rows: &[Prediction], path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["rank", "species", "confidence_pct"])?;

    for (rank, pred) in rows.iter().enumerate() {
        wtr.write_record([
            (rank + 1).to_string().as_str(),
            pred.species.as_str(),
            format!("{:.2}", pred.confidence).as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

static ORT_ENV: Lazy<Arc<Environment>> = Lazy::new(|| {
    Environment::builder()
        .with_name("wildlife-recognition")
        .build()
        .expect("failed to initialize ONNX Runtime environment")
        .into_arc()
});

/// Configuration for the ONNX-based ImageNet classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    /// Shorter image edge after the initial resize.
    pub resize_edge: u32,
    /// Side length of the square center crop fed to the network.
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/resnet18.onnx"),
            resize_edge: 256,
            input_size: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl ClassifierConfig {
    /// Load a configuration from a TOML file. Missing keys fall back to the
    /// defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read classifier config: {}", path.display()))?;
        toml::from_str(&raw).context("classifier config is not valid TOML")
    }
}

/// ResNet-18 ImageNet classifier backed by ONNX Runtime.
pub struct ResNetOrt {
    session: Session,
    resize_edge: u32,
    input_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ResNetOrt {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
        if !cfg.model_path.exists() {
            anyhow::bail!("model file missing: {}", cfg.model_path.to_string_lossy());
        }
        let env = ORT_ENV.clone();
        let session = SessionBuilder::new(&env)?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_model_from_file(&cfg.model_path)?;
        tracing::debug!("model loaded: {}", cfg.model_path.display());

        Ok(Self {
            session,
            resize_edge: cfg.resize_edge,
            input_size: cfg.input_size,
            mean: cfg.mean,
            std: cfg.std,
        })
    }

    /// Classify one image and rank its wildlife species.
    pub fn predict(&self, path: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        let probs = self.probabilities(path)?;
        Ok(rank_species(&probs, top_k))
    }

    /// One forward pass: softmaxed probabilities over all model classes.
    pub fn probabilities(&self, path: &Path) -> Result<Vec<f32>> {
        let tensor = self.prepare_input(path)?;
        let input_array = tensor.into_dyn();
        let cow = CowArray::from(input_array.view());
        let input = Value::from_array(self.session.allocator(), &cow)
            .map_err(|e| anyhow!("could not build input tensor: {e}"))?;
        let outputs: Vec<Value> = self.session.run(vec![input])?;
        if outputs.is_empty() {
            anyhow::bail!("model produced no output");
        }
        let logits: OrtOwnedTensor<f32, _> = outputs[0].try_extract()?;
        let view = logits.view();
        let scores: Vec<f32> = view.iter().cloned().collect();
        if scores.is_empty() {
            anyhow::bail!("empty logits");
        }
        Ok(softmax(&scores))
    }

    fn prepare_input(&self, path: &Path) -> Result<Array4<f32>> {
        let img = image::open(path)
            .with_context(|| format!("cannot open image: {}", path.display()))?;
        let cropped = center_crop(resize_shorter_edge(img, self.resize_edge), self.input_size);
        let size = self.input_size as usize;
        let mut array = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in cropped.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let (row, col) = (y as usize, x as usize);
            array[[0, 0, row, col]] = normalize_channel(r, self.mean[0], self.std[0]);
            array[[0, 1, row, col]] = normalize_channel(g, self.mean[1], self.std[1]);
            array[[0, 2, row, col]] = normalize_channel(b, self.mean[2], self.std[2]);
        }
        Ok(array)
    }
}

/// Resize so the shorter edge equals `target`, preserving aspect ratio.
fn resize_shorter_edge(img: DynamicImage, target: u32) -> DynamicImage {
    let (w, h) = (img.width().max(1), img.height().max(1));
    let (new_w, new_h) = if w <= h {
        let scaled = ((h as f64 * target as f64) / w as f64).round() as u32;
        (target, scaled.max(1))
    } else {
        let scaled = ((w as f64 * target as f64) / h as f64).round() as u32;
        (scaled.max(1), target)
    };
    img.resize_exact(new_w, new_h, FilterType::Triangle)
}

fn center_crop(img: DynamicImage, size: u32) -> RgbImage {
    let x = img.width().saturating_sub(size) / 2;
    let y = img.height().saturating_sub(size) / 2;
    img.crop_imm(x, y, size, size).to_rgb8()
}

fn normalize_channel(value: u8, mean: f32, std: f32) -> f32 {
    let v = value as f32 / 255.0;
    (v - mean) / std
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|x| x / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    fn vector_with(entries: &[(usize, f32)]) -> Vec<f32> {
        let mut probs = vec![0.0_f32; 1000];
        for &(idx, p) in entries {
            probs[idx] = p;
        }
        probs
    }

    #[test]
    fn dominant_mapped_class_ranks_first() {
        // 291 = Lion, 340 = Zebra
        let probs = vector_with(&[(291, 0.8), (340, 0.1)]);
        let preds = rank_species(&probs, DEFAULT_TOP_K);
        assert_eq!(preds[0].species, "Lion");
        assert_relative_eq!(preds[0].confidence, 80.0, epsilon = 1e-4);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    #[case(10)]
    fn output_never_exceeds_top_k(#[case] top_k: usize) {
        let probs = vector_with(&[
            (291, 0.3),
            (292, 0.2),
            (293, 0.1),
            (294, 0.08),
            (295, 0.06),
            (296, 0.05),
            (297, 0.04),
            (340, 0.03),
            (341, 0.02),
            (342, 0.01),
            (343, 0.008),
            (344, 0.006),
        ]);
        assert!(rank_species(&probs, top_k).len() <= top_k);
    }

    #[test]
    fn names_are_unique_within_one_call() {
        let probs = vector_with(&[(291, 0.4), (292, 0.3), (293, 0.2)]);
        let preds = rank_species(&probs, DEFAULT_TOP_K);
        let mut names: Vec<&str> = preds.iter().map(|p| p.species.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), preds.len());
    }

    #[test]
    fn duplicate_names_aggregate_with_half_weight() {
        let lookup = |idx: usize| match idx {
            10 | 20 => Some("Monkey"),
            30 => Some("Other"),
            _ => None,
        };
        let probs = vector_with(&[(10, 0.4), (20, 0.2), (30, 0.1)]);
        let preds = rank_with_lookup(&probs, 5, lookup);
        assert_eq!(preds[0].species, "Monkey");
        // 40% from the first class, plus half of the repeat's 20%.
        assert_relative_eq!(preds[0].confidence, 50.0, epsilon = 1e-4);
        assert_eq!(preds[1].species, "Other");
        assert_relative_eq!(preds[1].confidence, 10.0, epsilon = 1e-4);
        // Aggregation does not renormalize: totals need not sum to 100.
        let total: f32 = preds.iter().map(|p| p.confidence).sum();
        assert_relative_eq!(total, 60.0, epsilon = 1e-4);
    }

    #[test]
    fn collection_stops_at_twice_top_k_distinct_names() {
        // Eleven distinct names at descending probabilities, with a repeat of
        // the tenth name ranked just below it. With top_k = 5 scanning stops
        // at ten distinct names, so neither the repeat nor the eleventh name
        // is considered.
        static NAMES: [&str; 11] = [
            "A0", "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10",
        ];
        let lookup = |idx: usize| match idx {
            0..=10 => Some(NAMES[idx]),
            11 => Some("A9"),
            _ => None,
        };
        let probs = {
            let mut v = vec![0.0_f32; 1000];
            for i in 0..=8 {
                v[i] = 0.5 - 0.01 * i as f32;
            }
            v[9] = 0.41; // A9
            v[11] = 0.405; // repeat of A9, scanned after it
            v[10] = 0.35; // A10, scanned last
            v
        };
        let preds = rank_with_lookup(&probs, 5, lookup);
        assert_eq!(preds.len(), 5);
        // Had the repeat been aggregated, A9 would lead at 41 + 40.5 / 2.
        assert_eq!(preds[0].species, "A0");
        assert!(!preds.iter().any(|p| p.species == "A9"));
        assert!(!preds.iter().any(|p| p.species == "A10"));
    }

    #[test]
    fn all_unmapped_pool_triggers_fallback_with_class_labels() {
        // Exactly 100 nonzero entries, all outside the species table.
        let entries: Vec<(usize, f32)> = (400..500).map(|i| (i, (1000 - i) as f32 / 1e5)).collect();
        let probs = vector_with(&entries);
        let preds = rank_species(&probs, DEFAULT_TOP_K);
        assert_eq!(preds.len(), DEFAULT_TOP_K);
        for pred in &preds {
            let is_class_label = pred
                .species
                .strip_prefix("Class ")
                .is_some_and(|rest| rest.parse::<usize>().is_ok());
            let is_species = labels::WILDLIFE_CLASSES
                .iter()
                .any(|&(_, name)| name == pred.species);
            assert!(is_class_label || is_species, "bad label: {}", pred.species);
        }
        assert_eq!(preds[0].species, "Class 400");
    }

    #[test]
    fn fallback_keeps_species_name_for_mapped_index() {
        let probs = vector_with(&[(291, 0.9), (400, 0.05)]);
        let preds = general_predictions(&probs, 2, labels::species_for);
        assert_eq!(preds[0].species, "Lion");
        assert_eq!(preds[1].species, "Class 400");
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let probs = vector_with(&[(291, 0.4), (292, 0.3), (9, 0.1), (700, 0.05)]);
        assert_eq!(rank_species(&probs, 5), rank_species(&probs, 5));
    }

    #[test]
    fn short_vectors_use_the_whole_pool() {
        // Indices 0..=6 sit below the first table entry, so all are unmapped.
        let probs = vec![0.05, 0.1, 0.2, 0.01, 0.3, 0.02, 0.03];
        let preds = rank_species(&probs, 3);
        assert_eq!(preds.len(), 3);
        assert_eq!(preds[0].species, "Class 4");
        assert_eq!(preds[1].species, "Class 2");
        assert_eq!(preds[2].species, "Class 1");
    }

    #[test]
    fn softmax_is_a_probability_distribution() {
        let probs = softmax(&[1.0, 2.0, 3.0, -1.0]);
        let sum: f32 = probs.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
        assert!(probs[0] < probs[1] && probs[1] < probs[2]);
    }

    #[test]
    fn softmax_of_equal_logits_is_uniform() {
        let probs = softmax(&[0.5; 4]);
        for &p in &probs {
            assert_relative_eq!(p, 0.25, epsilon = 1e-6);
        }
    }

    #[rstest]
    #[case(400, 300, 341, 256)]
    #[case(300, 400, 256, 341)]
    #[case(256, 256, 256, 256)]
    fn resize_targets_the_shorter_edge(
        #[case] w: u32,
        #[case] h: u32,
        #[case] expect_w: u32,
        #[case] expect_h: u32,
    ) {
        let img = DynamicImage::new_rgb8(w, h);
        let resized = resize_shorter_edge(img, 256);
        assert_eq!((resized.width(), resized.height()), (expect_w, expect_h));
    }

    #[test]
    fn center_crop_produces_square_input() {
        let img = DynamicImage::new_rgb8(341, 256);
        let cropped = center_crop(img, 224);
        assert_eq!((cropped.width(), cropped.height()), (224, 224));
    }

    #[test]
    fn export_csv_writes_expected_headers_and_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        let rows = vec![
            Prediction {
                species: "Lion".into(),
                confidence: 81.25,
            },
            Prediction {
                species: "Class 400".into(),
                confidence: 4.5,
            },
        ];

        export_csv(&rows, &path)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["rank", "species", "confidence_pct"]
        );

        let mut recs = rdr.records();
        let r1 = recs.next().unwrap()?;
        assert_eq!(&r1[0], "1");
        assert_eq!(&r1[1], "Lion");
        assert_eq!(&r1[2], "81.25");

        let r2 = recs.next().unwrap()?;
        assert_eq!(&r2[0], "2");
        assert_eq!(&r2[1], "Class 400");
        assert_eq!(&r2[2], "4.50");

        assert!(recs.next().is_none());
        Ok(())
    }

    #[test]
    fn classifier_config_defaults_match_imagenet_preprocessing() {
        let cfg = ClassifierConfig::default();
        assert_eq!(cfg.resize_edge, 256);
        assert_eq!(cfg.input_size, 224);
        assert_relative_eq!(cfg.mean[0], 0.485, epsilon = 1e-6);
        assert_relative_eq!(cfg.std[2], 0.225, epsilon = 1e-6);
    }

    #[test]
    fn classifier_config_loads_partial_toml() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("classifier.toml");
        fs::write(&path, "model_path = \"models/custom.onnx\"\ninput_size = 299\n")?;

        let cfg = ClassifierConfig::from_toml_file(&path)?;
        assert_eq!(cfg.model_path, PathBuf::from("models/custom.onnx"));
        assert_eq!(cfg.input_size, 299);
        // Unspecified keys keep their defaults.
        assert_eq!(cfg.resize_edge, 256);
        Ok(())
    }

    #[test]
    fn missing_model_file_is_a_clear_error() {
        let cfg = ClassifierConfig {
            model_path: PathBuf::from("does/not/exist.onnx"),
            ..ClassifierConfig::default()
        };
        let err = ResNetOrt::new(&cfg).unwrap_err();
        assert!(err.to_string().contains("model file missing"));
    }
}
