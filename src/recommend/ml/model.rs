//! Tree-ensemble classifiers exported by the offline trainer as JSON.
//!
//! Each tree uses the flat array layout: node `i` has `children_left[i]`,
//! `children_right[i]`, `feature[i]`, `threshold[i]` and `value[i]`
//! (per-class weights). A node whose left child is `-1` is a leaf.

use std::path::Path;

use anyhow::{bail, ensure, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_classes: usize) -> anyhow::Result<()> {
        let n = self.children_left.len();
        ensure!(n > 0, "empty tree");
        ensure!(
            self.children_right.len() == n
                && self.feature.len() == n
                && self.threshold.len() == n
                && self.value.len() == n,
            "tree arrays have different lengths"
        );
        for (i, v) in self.value.iter().enumerate() {
            ensure!(v.len() == n_classes, "node {i} has {} class weights, expected {n_classes}", v.len());
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `x`.
    pub fn leaf_proba(&self, x: &[f64]) -> anyhow::Result<Vec<f64>> {
        let mut node = 0usize;
        // a well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..=self.children_left.len() {
            let left = self.children_left[node];
            if left == -1 {
                let weights = &self.value[node];
                let sum: f64 = weights.iter().sum();
                ensure!(sum > 0.0, "leaf {node} has no weight");
                return Ok(weights.iter().map(|w| w / sum).collect());
            }

            let feature = usize::try_from(self.feature[node])
                .with_context(|| format!("node {node} has negative feature index"))?;
            let value = *x
                .get(feature)
                .with_context(|| format!("feature {feature} out of range ({} given)", x.len()))?;

            let next = if value <= self.threshold[node] {
                left
            } else {
                self.children_right[node]
            };
            node = usize::try_from(next)
                .ok()
                .filter(|n| *n < self.children_left.len())
                .with_context(|| format!("node {node} points at invalid child {next}"))?;
        }
        bail!("tree walk did not terminate")
    }
}

/// Random-forest style ensemble: class probabilities are the mean of the
/// per-tree leaf distributions.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read model {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parse model {}", path.display()))?;
        model
            .validate()
            .with_context(|| format!("invalid model {}", path.display()))?;
        Ok(model)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.trees.is_empty(), "ensemble has no trees");
        ensure!(self.n_classes > 0, "ensemble has no classes");
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_classes)
                .with_context(|| format!("tree {i}"))?;
        }
        Ok(())
    }

    pub fn predict_proba(&self, x: &[f64]) -> anyhow::Result<Vec<f64>> {
        ensure!(
            x.len() == self.n_features,
            "expected {} features, got {}",
            self.n_features,
            x.len()
        );
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf_proba(x)?) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(acc.into_iter().map(|a| a / n).collect())
    }

    /// Class index with the highest probability (first on ties) and that
    /// probability.
    pub fn predict(&self, x: &[f64]) -> anyhow::Result<(usize, f64)> {
        let proba = self.predict_proba(x)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok((best, proba[best]))
    }
}
