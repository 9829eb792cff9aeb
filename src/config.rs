use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::fixtures::{FixtureDifficulty, NeutralDifficulty};
use crate::predictor::{
    DraftBlendPredictor, HeuristicPredictor, HeuristicWeights, PointPredictor, TreePredictor,
};
use crate::tree::load_tree_model;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoringStrategy {
    #[default]
    Heuristic,
    Tree,
    Blend,
}

impl ScoringStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "weighted" => Some(Self::Heuristic),
            "tree" | "ml" => Some(Self::Tree),
            "blend" | "draft" => Some(Self::Blend),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Tree => "tree",
            Self::Blend => "blend",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    pub model_path: Option<PathBuf>,
    pub weights: HeuristicWeights,
    pub parallel: bool,
    pub threads: Option<usize>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: ScoringStrategy::default(),
            model_path: None,
            weights: HeuristicWeights::default(),
            parallel: true,
            threads: None,
        }
    }
}

impl ScoringConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset or unparseable values keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = HeuristicWeights::default();
        let float = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let strategy = match lookup("SCORING_STRATEGY") {
            Some(raw) => ScoringStrategy::parse(&raw).unwrap_or_else(|| {
                log::warn!("unknown SCORING_STRATEGY {raw:?}, using heuristic");
                ScoringStrategy::Heuristic
            }),
            None => ScoringStrategy::default(),
        };
        let model_path = lookup("SCORING_MODEL_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let weights = HeuristicWeights {
            low_minutes: float("SCORING_LOW_MINUTES")
                .filter(|v| *v >= 0.0)
                .unwrap_or(defaults.low_minutes),
            low_minutes_factor: float("SCORING_LOW_MINUTES_PENALTY")
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.low_minutes_factor),
            xgi_weight: float("SCORING_XGI_WEIGHT")
                .filter(|v| *v >= 0.0)
                .unwrap_or(defaults.xgi_weight),
            transfer_scale: float("SCORING_TRANSFER_SCALE")
                .filter(|v| *v >= 1.0)
                .unwrap_or(defaults.transfer_scale),
            horizon_gw: lookup("SCORING_HORIZON_GW")
                .and_then(|v| v.trim().parse::<u8>().ok())
                .unwrap_or(defaults.horizon_gw)
                .clamp(1, 10),
            ..defaults
        };

        let parallel = lookup("SCORING_PARALLEL")
            .map(|v| {
                let t = v.trim().to_ascii_lowercase();
                !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
            })
            .unwrap_or(true);
        let threads = lookup("SCORING_THREADS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(64));

        Self {
            strategy,
            model_path,
            weights,
            parallel,
            threads,
        }
    }

    /// Constructs the configured predictor. Tree strategies load the model from
    /// `model_path`; the difficulty hook applies to heuristic and blend.
    pub fn build_predictor(
        &self,
        difficulty: Option<Box<dyn FixtureDifficulty>>,
    ) -> Result<Box<dyn PointPredictor>> {
        let difficulty = difficulty.unwrap_or_else(|| Box::new(NeutralDifficulty));
        let predictor: Box<dyn PointPredictor> = match self.strategy {
            ScoringStrategy::Heuristic => {
                Box::new(HeuristicPredictor::new(self.weights).with_boxed_difficulty(difficulty))
            }
            ScoringStrategy::Tree => Box::new(TreePredictor::new(self.load_model()?)),
            ScoringStrategy::Blend => Box::new(
                DraftBlendPredictor::new(self.load_model()?).with_boxed_difficulty(difficulty),
            ),
        };
        log::info!("{:<32}{:<32}", "scoring strategy", predictor.name());
        Ok(predictor)
    }

    fn load_model(&self) -> Result<Arc<crate::tree::TreeModel>> {
        let Some(path) = self.model_path.as_deref() else {
            bail!(
                "SCORING_STRATEGY={} needs SCORING_MODEL_PATH",
                self.strategy.label()
            );
        };
        Ok(Arc::new(load_tree_model(path)?))
    }
}
