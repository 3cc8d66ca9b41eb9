use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use ndarray::{Array2, Axis};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::*;

use crate::{
    consts::{LINE_TYPE_MODEL_FILE, MODEL_CACHE_DIR_ENV_NAME, PARAGRAPH_MODEL_FILE},
    error::{DedocError, ModelDecodeSnafu, ModelLoadSnafu, ModelReadSnafu, ModelWriteSnafu},
    features::matrix::FeatureMatrix,
    inference::{linear::LinearModel, tree::TreeEnsemble},
};

/// A trained decision model behind a probability contract.
pub trait Classifier {
    /// Class names in output column order.
    fn classes(&self) -> &[String];

    /// One row of class probabilities per feature row.
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, DedocError>;

    /// Most probable class per row; ties go to the first class.
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<String>, DedocError> {
        let proba = self.predict_proba(features)?;
        let classes = self.classes();
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (id, &p)| if p > best.1 { (id, p) } else { best })
                    .0;
                classes.get(best).cloned().unwrap_or_default()
            })
            .collect())
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Row-wise softmax, shifted by the row maximum.
pub(crate) fn softmax_rows(mut scores: Array2<f64>) -> Array2<f64> {
    for mut row in scores.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|x| x / sum);
    }
    scores
}

/// Decision model family, picked by the `kind` field of the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionModel {
    TreeEnsemble(TreeEnsemble),
    Linear(LinearModel),
}

impl DecisionModel {
    pub fn validate(&self) -> Result<(), DedocError> {
        match self {
            DecisionModel::TreeEnsemble(model) => model.validate(),
            DecisionModel::Linear(model) => model.validate(),
        }
    }
}

impl Classifier for DecisionModel {
    fn classes(&self) -> &[String] {
        match self {
            DecisionModel::TreeEnsemble(model) => model.classes(),
            DecisionModel::Linear(model) => model.classes(),
        }
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, DedocError> {
        match self {
            DecisionModel::TreeEnsemble(model) => model.predict_proba(features),
            DecisionModel::Linear(model) => model.predict_proba(features),
        }
    }
}

/// A trained classifier with the feature columns it was trained on and the
/// parameters of its feature extractor.
///
/// Stored as gzip compressed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classifier: DecisionModel,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ModelArtifact {
    pub fn from_reader(reader: impl Read, path: &str) -> Result<Self, DedocError> {
        let artifact: ModelArtifact =
            serde_json::from_reader(GzDecoder::new(reader)).context(ModelDecodeSnafu { path })?;
        artifact.classifier.validate()?;
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, DedocError> {
        let display = path.display().to_string();
        let file = File::open(path).context(ModelReadSnafu { path: &display })?;
        Self::from_reader(BufReader::new(file), &display)
    }

    pub fn save(&self, path: &Path) -> Result<(), DedocError> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(ModelWriteSnafu { path: &display })?;
        }
        let file = File::create(path).context(ModelWriteSnafu { path: &display })?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, self)
            .map_err(std::io::Error::from)
            .context(ModelWriteSnafu { path: &display })?;
        encoder
            .finish()
            .and_then(|mut writer| writer.flush())
            .context(ModelWriteSnafu { path: display })
    }

    /// Probabilities for a feature matrix whose columns must match the
    /// training columns exactly (order aside).
    pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Array2<f64>, DedocError> {
        let features = features.conform_to(&self.feature_names)?;
        self.classifier.predict_proba(features.values())
    }

    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, DedocError> {
        let features = features.conform_to(&self.feature_names)?;
        self.classifier.predict(features.values())
    }
}

/// Where a model artifact is cached and, optionally, where it can be
/// downloaded from on a cache miss.
///
/// No artifact is published for download: exported models are placed into
/// [`model_cache_dir`] or passed by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSource {
    pub cache_path: PathBuf,
    #[serde(default)]
    pub url: Option<String>,
}

/// Cache directory: `$DEDOC_MODEL_CACHE`, else `dedoc` in the temp dir.
pub fn model_cache_dir() -> PathBuf {
    std::env::var_os(MODEL_CACHE_DIR_ENV_NAME)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("dedoc"))
}

impl ModelSource {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn paragraph() -> Self {
        Self::new(model_cache_dir().join(PARAGRAPH_MODEL_FILE))
    }

    pub fn line_type() -> Self {
        Self::new(model_cache_dir().join(LINE_TYPE_MODEL_FILE))
    }

    /// Reads the cached artifact, downloading it first when it is not cached
    /// and a url is known.
    pub fn fetch(&self) -> Result<ModelArtifact, DedocError> {
        if !self.cache_path.is_file() {
            let display = self.cache_path.display().to_string();
            let Some(url) = self.url.as_deref() else {
                return ModelLoadSnafu {
                    path: display,
                    message: "artifact is not cached and has no download url",
                }
                .fail();
            };
            if let Err(e) = self.download(url) {
                return ModelLoadSnafu {
                    path: display,
                    message: format!("download from `{}` failed: {}", url, e),
                }
                .fail();
            }
        }
        info!("Loading model from {}", self.cache_path.display());
        ModelArtifact::load(&self.cache_path)
    }

    fn download(&self, url: &str) -> Result<(), DownloadError> {
        info!("Model {} is not cached, downloading {}", self.cache_path.display(), url);

        let bytes = reqwest::blocking::get(url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())?;

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        // write next to the target first so a broken download never looks cached
        let partial = self.cache_path.with_extension("part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, &self.cache_path)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
enum DownloadError {
    #[snafu(display("{}", source), context(false))]
    Http { source: reqwest::Error },
    #[snafu(display("{}", source), context(false))]
    Io { source: std::io::Error },
}

/// A model artifact loaded on first use.
///
/// Concurrent first users wait for a single load. A failed load is not
/// remembered, so the next call tries again.
#[derive(Debug)]
pub struct LazyModel {
    source: Option<ModelSource>,
    artifact: OnceCell<ModelArtifact>,
}

impl LazyModel {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source: Some(source),
            artifact: OnceCell::new(),
        }
    }

    /// A model that is already in memory.
    pub fn preloaded(artifact: ModelArtifact) -> Self {
        Self {
            source: None,
            artifact: OnceCell::with_value(artifact),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.get().is_some()
    }

    /// Loads the artifact if needed.
    pub fn get(&self) -> Result<&ModelArtifact, DedocError> {
        self.artifact.get_or_try_init(|| match &self.source {
            Some(source) => source.fetch(),
            None => Err(DedocError::ModelLoad {
                path: "<memory>".to_string(),
                message: "model has no source".to_string(),
            }),
        })
    }
}
