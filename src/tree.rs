use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};
use crate::features::{FeatureLayout, FeatureSet};
use crate::player::string_or_empty;

/// Resolved against the model layout at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRef {
    pub name: String,
    slot: Option<usize>,
}

impl FeatureRef {
    pub fn new(name: impl Into<String>, layout: FeatureLayout) -> Self {
        let name = name.into();
        let slot = layout.index_of(&name);
        Self { name, slot }
    }

    pub fn is_known(&self) -> bool {
        self.slot.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf(f64),
    Split {
        feature: FeatureRef,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        Self::Leaf(value)
    }

    pub fn split(feature: FeatureRef, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        Self::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Walks to a leaf. `value <= threshold` goes left.
    fn walk(&self, lookup: impl Fn(&FeatureRef) -> f64) -> f64 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf(value) => return *value,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if lookup(feature) <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    fn collect_unknown<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Self::Split {
            feature,
            left,
            right,
            ..
        } = self
        {
            if !feature.is_known() && !out.contains(&feature.name.as_str()) {
                out.push(&feature.name);
            }
            left.collect_unknown(out);
            right.collect_unknown(out);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub mae: f64,
    #[serde(default)]
    pub rmse: f64,
    #[serde(default)]
    pub r2: f64,
    #[serde(default)]
    pub within_2: f64,
}

#[derive(Debug, Clone)]
pub struct TreeModel {
    pub model_type: String,
    pub version: String,
    pub max_depth: usize,
    pub n_leaves: usize,
    pub features: Vec<String>,
    pub metrics: ModelMetrics,
    pub layout: FeatureLayout,
    root: TreeNode,
}

impl TreeModel {
    pub fn from_root(layout: FeatureLayout, root: TreeNode) -> Self {
        Self {
            model_type: "Decision Tree".to_string(),
            version: String::new(),
            max_depth: root.depth(),
            n_leaves: root.leaf_count(),
            features: Vec::new(),
            metrics: ModelMetrics::default(),
            layout,
            root,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Raw leaf value for a feature set. Features the set lacks read as zero.
    pub fn evaluate(&self, features: &FeatureSet) -> f64 {
        if features.layout() == self.layout {
            self.root.walk(|f| f.slot.map(|i| features.value_at(i)).unwrap_or(0.0))
        } else {
            self.root.walk(|f| features.get(&f.name))
        }
    }

    pub fn unknown_features(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_unknown(&mut out);
        out
    }
}

#[derive(Debug, Deserialize)]
struct RawModel {
    #[serde(default, deserialize_with = "string_or_empty")]
    model_type: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    version: String,
    #[serde(default)]
    max_depth: Option<usize>,
    #[serde(default)]
    n_leaves: Option<usize>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    metrics: ModelMetrics,
    #[serde(default)]
    feature_layout: Option<FeatureLayout>,
    tree: RawNode,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    left: Option<Box<RawNode>>,
    #[serde(default)]
    right: Option<Box<RawNode>>,
}

// Nesting is bounded by serde_json's recursion limit, not here.
fn build_node(raw: RawNode, layout: FeatureLayout, path: &str) -> ScoringResult<TreeNode> {
    // Older exports drop the `type` tag and mark leaves by the presence of `value`.
    let is_leaf = match raw.kind.as_deref() {
        Some("leaf") => true,
        Some(_) => false,
        None => raw.value.is_some(),
    };

    if is_leaf {
        let value = raw.value.ok_or_else(|| ScoringError::MalformedNode {
            path: path.to_string(),
        })?;
        if !value.is_finite() {
            return Err(ScoringError::InvalidNode {
                path: path.to_string(),
                field: "value",
            });
        }
        return Ok(TreeNode::Leaf(value));
    }

    let (Some(feature), Some(threshold), Some(left), Some(right)) =
        (raw.feature, raw.threshold, raw.left, raw.right)
    else {
        return Err(ScoringError::MalformedNode {
            path: path.to_string(),
        });
    };
    if !threshold.is_finite() {
        return Err(ScoringError::InvalidNode {
            path: path.to_string(),
            field: "threshold",
        });
    }

    let left = build_node(*left, layout, &format!("{path}.L"))?;
    let right = build_node(*right, layout, &format!("{path}.R"))?;
    Ok(TreeNode::split(
        FeatureRef::new(feature, layout),
        threshold,
        left,
        right,
    ))
}

pub fn parse_tree_model_json(raw: &str) -> Result<TreeModel> {
    let model: RawModel = serde_json::from_str(raw.trim()).context("invalid tree model json")?;
    let layout = model.feature_layout.unwrap_or_default();
    let root = build_node(model.tree, layout, "root").context("invalid tree structure")?;

    let out = TreeModel {
        model_type: if model.model_type.is_empty() {
            "Decision Tree".to_string()
        } else {
            model.model_type
        },
        version: model.version,
        max_depth: model.max_depth.unwrap_or_else(|| root.depth()),
        n_leaves: model.n_leaves.unwrap_or_else(|| root.leaf_count()),
        features: model.features,
        metrics: model.metrics,
        layout,
        root,
    };

    let unknown = out.unknown_features();
    if !unknown.is_empty() {
        log::warn!(
            "tree model splits on {} feature(s) outside the {:?} layout (read as 0): {}",
            unknown.len(),
            layout,
            unknown.join(", ")
        );
    }
    log::info!(
        "loaded {} v{} (depth {}, {} leaves, MAE {:.3}, R2 {:.3})",
        out.model_type,
        out.version,
        out.max_depth,
        out.n_leaves,
        out.metrics.mae,
        out.metrics.r2
    );
    Ok(out)
}

pub fn load_tree_model(path: &Path) -> Result<TreeModel> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read tree model {}", path.display()))?;
    parse_tree_model_json(&raw).with_context(|| format!("parse tree model {}", path.display()))
}
