//! Linear power models and per-container power attribution
//!
//! Converts a single container's forecast CPU usage into a physically
//! bounded power estimate without per-container power telemetry:
//! cores → node utilization → node power → container share.

use crate::error::{EstimatorError, Result};
use crate::models::{ConfidenceInterval, Cores, Percent, SiblingContainer, Watts};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literature defaults measured on a Dell X3430 reference server
pub mod defaults {
    pub const CONTAINER_TO_NODE_SLOPE: f64 = 23.993;
    pub const CONTAINER_TO_NODE_INTERCEPT: f64 = 4.5347;
    pub const NODE_UTIL_TO_POWER_SLOPE: f64 = 0.7254;
    pub const NODE_UTIL_TO_POWER_INTERCEPT: f64 = 53.88;
    pub const NODE_IDLE_POWER_WATTS: f64 = 53.88;
    pub const NODE_MAX_POWER_WATTS: f64 = 126.34;
}

/// Number of standard deviations spanned by the confidence interval
pub const CONFIDENCE_SIGMAS: f64 = 1.0;

/// Two affine sub-models plus the node power envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerModel {
    /// Node utilization percent induced per container core
    pub container_to_node_slope: f64,
    pub container_to_node_intercept: f64,
    /// Node watts per percent of node utilization
    pub node_util_to_power_slope: f64,
    pub node_util_to_power_intercept: f64,
    pub node_idle_power_watts: f64,
    pub node_max_power_watts: f64,
}

impl Default for PowerModel {
    fn default() -> Self {
        Self::literature_default()
    }
}

/// Pipeline stage at which a value was clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampStage {
    /// Container-induced node utilization outside [0, 100]
    ContainerUtilization,
    /// Projected node utilization outside [0, 100]
    ProjectedUtilization,
    /// Node power outside [idle, max]
    NodePower,
}

/// Non-fatal notice that a value was clamped into its physical range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsWarning {
    pub stage: ClampStage,
    pub raw: f64,
    pub clamped: f64,
}

impl fmt::Display for BoundsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.stage {
            ClampStage::ContainerUtilization => "container utilization",
            ClampStage::ProjectedUtilization => "projected node utilization",
            ClampStage::NodePower => "node power",
        };
        write!(f, "{} {:.3} clamped to {:.3}", what, self.raw, self.clamped)
    }
}

/// Node-side inputs for applying the model to one container
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node_current_util: Percent,
    pub node_idle_util: Percent,
    pub siblings: &'a [SiblingContainer],
    /// The container's CPU reservation, used to estimate its current share of
    /// node load when no live measurement is available
    pub container_cpu_request: Cores,
}

/// Result of running the pipeline for one CPU-usage value
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub own_util: Percent,
    pub sibling_util: Percent,
    pub projected_util: Percent,
    pub node_power: Watts,
    /// Fraction of node power attributed to the container, in [0, 1]
    pub attribution_share: f64,
    pub predicted_power: Watts,
    pub warnings: Vec<BoundsWarning>,
}

impl PowerModel {
    pub const fn literature_default() -> Self {
        Self {
            container_to_node_slope: defaults::CONTAINER_TO_NODE_SLOPE,
            container_to_node_intercept: defaults::CONTAINER_TO_NODE_INTERCEPT,
            node_util_to_power_slope: defaults::NODE_UTIL_TO_POWER_SLOPE,
            node_util_to_power_intercept: defaults::NODE_UTIL_TO_POWER_INTERCEPT,
            node_idle_power_watts: defaults::NODE_IDLE_POWER_WATTS,
            node_max_power_watts: defaults::NODE_MAX_POWER_WATTS,
        }
    }

    /// Check that every parameter is finite and idle <= max
    pub fn validate(&self) -> Result<()> {
        let params = [
            self.container_to_node_slope,
            self.container_to_node_intercept,
            self.node_util_to_power_slope,
            self.node_util_to_power_intercept,
            self.node_idle_power_watts,
            self.node_max_power_watts,
        ];
        if params.iter().any(|p| !p.is_finite()) {
            return Err(EstimatorError::InvalidRequest(
                "power model parameters must be finite".to_string(),
            ));
        }
        if self.node_idle_power_watts > self.node_max_power_watts {
            return Err(EstimatorError::InvalidRequest(format!(
                "idle power {:.2} W exceeds max power {:.2} W",
                self.node_idle_power_watts, self.node_max_power_watts
            )));
        }
        Ok(())
    }

    /// Unclamped node utilization induced by `cores`
    pub fn raw_container_util(&self, cores: Cores) -> f64 {
        self.container_to_node_slope * cores.0 + self.container_to_node_intercept
    }

    /// Unclamped node power at `util`
    pub fn raw_node_power(&self, util: Percent) -> f64 {
        self.node_util_to_power_slope * util.0 + self.node_util_to_power_intercept
    }

    /// Run the attribution pipeline for a predicted CPU usage
    pub fn apply(&self, predicted_cores: Cores, ctx: &NodeContext<'_>) -> Application {
        let mut warnings = Vec::new();

        // 1. utilization the container alone induces
        let raw_own = self.raw_container_util(predicted_cores);
        let own = clamp_recorded(
            raw_own,
            0.0,
            100.0,
            ClampStage::ContainerUtilization,
            &mut warnings,
        );

        // 2. siblings are measured, not re-derived
        let sibling_util: f64 = ctx.siblings.iter().map(|s| s.cpu_util.0).sum();

        // 3. swap the container's current contribution for its predicted one
        let current_container = self
            .raw_container_util(ctx.container_cpu_request)
            .clamp(0.0, 100.0);
        let raw_projected =
            (ctx.node_current_util.0 - current_container + own).max(ctx.node_idle_util.0);
        let projected = clamp_recorded(
            raw_projected,
            0.0,
            100.0,
            ClampStage::ProjectedUtilization,
            &mut warnings,
        );

        // 4. node power within the physical envelope
        let node_power = clamp_recorded(
            self.raw_node_power(Percent(projected)),
            self.node_idle_power_watts,
            self.node_max_power_watts,
            ClampStage::NodePower,
            &mut warnings,
        );

        // 5. share of node power attributable to the container
        let share = if projected > 0.0 {
            (own / projected).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Application {
            own_util: Percent(own),
            sibling_util: Percent(sibling_util),
            projected_util: Percent(projected),
            node_power: Watts(node_power),
            attribution_share: share,
            // 6.
            predicted_power: Watts(node_power * share),
            warnings,
        }
    }

    /// Apply the model at `point ± k·σ` and return the ascending power interval
    pub fn confidence_interval(
        &self,
        point_cores: Cores,
        std_dev_cores: f64,
        ctx: &NodeContext<'_>,
    ) -> ConfidenceInterval {
        let spread = CONFIDENCE_SIGMAS * std_dev_cores.max(0.0);
        let low = self.apply(Cores((point_cores.0 - spread).max(0.0)), ctx);
        let high = self.apply(Cores(point_cores.0 + spread), ctx);
        ConfidenceInterval::ordered(low.predicted_power, high.predicted_power)
    }
}

fn clamp_recorded(
    raw: f64,
    min: f64,
    max: f64,
    stage: ClampStage,
    warnings: &mut Vec<BoundsWarning>,
) -> f64 {
    // max-then-min instead of f64::clamp, which panics when min > max
    let clamped = raw.max(min).min(max);
    if clamped != raw {
        warnings.push(BoundsWarning { stage, raw, clamped });
    }
    clamped
}
