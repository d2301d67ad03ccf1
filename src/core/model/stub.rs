//! Deterministic test doubles for the external-library seams. The stub
//! backend records what every fitting call observed so tests can assert
//! the masking contract; its "models" embed cells by truncating the
//! expression matrix and predict by nearest labelled fitting cell.

use std::sync::Mutex;

use faer::Mat;

use crate::core::classify::{FittedClassifier, NeighborClassifier};
use crate::core::data::annotated::AnnotatedMatrix;
use crate::core::model::backend::{
    GeneRanker, GenerativeBackend, LabelPredictor, LatentSpace, QueryRef,
};
use crate::core::model::config::{CovariateSetup, ModelParams, TrainParams};
use crate::error::{CellcastError, Result};

//////////////////
// Stub backend //
//////////////////

/// Which fitting operation produced a `FitEvent`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStage {
    Base,
    Refine,
    Query,
}

/// One recorded fitting call
///
/// `labels_seen` is the content of the registered label column at the
/// time of the call, or `None` if no label column was registered.
#[derive(Clone, Debug)]
pub struct FitEvent {
    pub stage: FitStage,
    pub n_obs: usize,
    pub labels_seen: Option<Vec<String>>,
}

/// Recording stand-in for the deep generative-modeling library
pub struct StubBackend {
    events: Mutex<Vec<FitEvent>>,
}

impl StubBackend {
    pub fn new() -> Self {
        StubBackend {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all fitting calls observed so far
    pub fn events(&self) -> Vec<FitEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, stage: FitStage, data: &AnnotatedMatrix, labels_key: Option<&str>) {
        let labels_seen = labels_key.and_then(|key| data.categorical(key).ok().map(|v| v.to_vec()));
        self.events.lock().unwrap().push(FitEvent {
            stage,
            n_obs: data.n_obs(),
            labels_seen,
        });
    }
}

/// Fake fitted model: remembers its fitting data and registered labels
pub struct StubModel {
    x: Mat<f64>,
    labels: Vec<String>,
    labels_key: Option<String>,
    n_latent: usize,
    unlabeled: Option<String>,
}

impl LatentSpace for StubModel {
    fn latent(&self, data: &AnnotatedMatrix) -> Result<Mat<f32>> {
        let k = self.n_latent.min(data.n_vars());
        Ok(Mat::from_fn(data.n_obs(), k, |i, j| {
            *data.x().get(i, j) as f32
        }))
    }
}

impl LabelPredictor for StubModel {
    fn predict(&self, data: &AnnotatedMatrix) -> Result<Vec<String>> {
        if data.n_vars() != self.x.ncols() {
            return Err(CellcastError::Backend(format!(
                "stub model fitted on {} genes, asked to predict on {}",
                self.x.ncols(),
                data.n_vars()
            )));
        }

        let labelled: Vec<usize> = (0..self.x.nrows())
            .filter(|&i| match &self.unlabeled {
                Some(sentinel) => self.labels.get(i).is_some_and(|l| l != sentinel),
                None => i < self.labels.len(),
            })
            .collect();

        if labelled.is_empty() {
            return Err(CellcastError::Backend(
                "stub model has no labelled cells to predict from".to_string(),
            ));
        }

        let mut predictions = Vec::with_capacity(data.n_obs());
        for r in 0..data.n_obs() {
            let mut best = labelled[0];
            let mut best_dist = f64::INFINITY;
            for &t in &labelled {
                let mut dist = 0.0;
                for j in 0..data.n_vars() {
                    let diff = *data.x().get(r, j) - self.x[(t, j)];
                    dist += diff * diff;
                }
                if dist < best_dist {
                    best_dist = dist;
                    best = t;
                }
            }
            predictions.push(self.labels[best].clone());
        }

        Ok(predictions)
    }
}

impl GenerativeBackend for StubBackend {
    type Base = StubModel;
    type Refined = StubModel;

    fn version(&self) -> String {
        "stub-0.0.0".to_string()
    }

    fn fit_base(
        &self,
        data: &AnnotatedMatrix,
        setup: &CovariateSetup,
        model: &ModelParams,
        _train: &TrainParams,
    ) -> Result<Self::Base> {
        data.categorical(&setup.batch_key)?;
        let labels = match &setup.labels_key {
            Some(key) => data.categorical(key)?.to_vec(),
            None => Vec::new(),
        };

        self.record(FitStage::Base, data, setup.labels_key.as_deref());

        Ok(StubModel {
            x: data.x().cloned(),
            labels,
            labels_key: setup.labels_key.clone(),
            n_latent: model.n_latent,
            unlabeled: None,
        })
    }

    fn refine(
        &self,
        base: Self::Base,
        data: &AnnotatedMatrix,
        unlabeled_category: &str,
        _train: &TrainParams,
    ) -> Result<Self::Refined> {
        if base.labels_key.is_none() {
            return Err(CellcastError::Backend(
                "refinement requires a registered label column".to_string(),
            ));
        }

        self.record(FitStage::Refine, data, base.labels_key.as_deref());

        Ok(StubModel {
            unlabeled: Some(unlabeled_category.to_string()),
            ..base
        })
    }

    fn adapt_query(
        &self,
        reference: QueryRef<'_, Self>,
        query: &AnnotatedMatrix,
        _train: &TrainParams,
    ) -> Result<Self::Refined> {
        let (x, labels, labels_key, n_latent, unlabeled) = match reference {
            QueryRef::Base(model) => (
                model.x.cloned(),
                model.labels.clone(),
                model.labels_key.clone(),
                model.n_latent,
                model.unlabeled.clone(),
            ),
            QueryRef::Refined(model) => (
                model.x.cloned(),
                model.labels.clone(),
                model.labels_key.clone(),
                model.n_latent,
                model.unlabeled.clone(),
            ),
        };

        self.record(FitStage::Query, query, labels_key.as_deref());

        Ok(StubModel {
            x,
            labels,
            labels_key,
            n_latent,
            unlabeled,
        })
    }
}

/////////////////
// Stub ranker //
/////////////////

/// Variance-proxy stand-in for the gene-ranking library
///
/// Flags the `n_top` genes with the largest plain variance (all genes if
/// fewer exist) and records the cell count of every ranking call, so
/// tests can assert the ranking only ever saw the training split.
pub struct StubRanker {
    calls: Mutex<Vec<usize>>,
}

impl StubRanker {
    pub fn new() -> Self {
        StubRanker {
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Cell counts of the ranking calls observed so far
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl GeneRanker for StubRanker {
    fn highly_variable(
        &self,
        data: &AnnotatedMatrix,
        n_top: usize,
        batch_key: &str,
    ) -> Result<Vec<bool>> {
        data.categorical(batch_key)?;
        self.calls.lock().unwrap().push(data.n_obs());

        let n = data.n_obs() as f64;
        let mut variances: Vec<(usize, f64)> = (0..data.n_vars())
            .map(|j| {
                let mean = (0..data.n_obs()).map(|i| *data.x().get(i, j)).sum::<f64>() / n;
                let var = (0..data.n_obs())
                    .map(|i| (*data.x().get(i, j) - mean).powi(2))
                    .sum::<f64>()
                    / n;
                (j, var)
            })
            .collect();

        variances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));

        let mut mask = vec![false; data.n_vars()];
        for &(j, _) in variances.iter().take(n_top.min(data.n_vars())) {
            mask[j] = true;
        }

        Ok(mask)
    }
}

/////////////////////
// Stub classifier //
/////////////////////

/// Classifier double that returns the same label for every query
pub struct FixedClassifier {
    pub label: String,
}

pub struct FixedFit {
    label: String,
}

impl NeighborClassifier for FixedClassifier {
    type Fitted = FixedFit;

    fn fit(&self, _features: faer::MatRef<f32>, _labels: &[String]) -> Result<FixedFit> {
        Ok(FixedFit {
            label: self.label.clone(),
        })
    }
}

impl FittedClassifier for FixedFit {
    fn predict(&self, features: faer::MatRef<f32>) -> Result<Vec<String>> {
        Ok(vec![self.label.clone(); features.nrows()])
    }
}
