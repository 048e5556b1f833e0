//! Seams to the systems that supply a prediction's inputs
//!
//! Production deployments back these with a metrics store and the
//! orchestrator's pod listing; the in-memory implementation serves tests and
//! local runs.

use crate::models::{ContainerRef, SiblingContainer};
use crate::series::HistoricalSeries;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Source of a container's recent CPU usage
#[async_trait]
pub trait MetricsHistoryProvider: Send + Sync {
    /// Samples for `target` covering at most `window` back from the newest one
    async fn fetch_history(&self, target: &ContainerRef, window: Duration)
        -> Result<HistoricalSeries>;
}

/// Source of the other containers sharing the target's node
#[async_trait]
pub trait SiblingEnumerator: Send + Sync {
    async fn siblings(&self, target: &ContainerRef) -> Result<Vec<SiblingContainer>>;
}

/// Map-backed collaborators
#[derive(Debug, Default)]
pub struct InMemoryCollaborators {
    histories: RwLock<HashMap<ContainerRef, HistoricalSeries>>,
    siblings: RwLock<HashMap<ContainerRef, Vec<SiblingContainer>>>,
}

impl InMemoryCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_history(&self, target: ContainerRef, series: HistoricalSeries) {
        self.histories.write().await.insert(target, series);
    }

    pub async fn record_siblings(&self, target: ContainerRef, siblings: Vec<SiblingContainer>) {
        self.siblings.write().await.insert(target, siblings);
    }
}

#[async_trait]
impl MetricsHistoryProvider for InMemoryCollaborators {
    async fn fetch_history(
        &self,
        target: &ContainerRef,
        window: Duration,
    ) -> Result<HistoricalSeries> {
        let histories = self.histories.read().await;
        let series = histories
            .get(target)
            .ok_or_else(|| anyhow!("no history recorded for {}", target))?;

        let Some(newest) = series.timestamps().last().copied() else {
            return Ok(series.clone());
        };
        let cutoff = newest - window;
        let (timestamps, values): (Vec<_>, Vec<_>) = series
            .timestamps()
            .iter()
            .zip(series.values())
            .filter(|(ts, _)| **ts >= cutoff)
            .map(|(ts, v)| (*ts, *v))
            .unzip();
        Ok(HistoricalSeries::new(timestamps, values)?)
    }
}

#[async_trait]
impl SiblingEnumerator for InMemoryCollaborators {
    async fn siblings(&self, target: &ContainerRef) -> Result<Vec<SiblingContainer>> {
        // An unknown target simply has no known neighbours
        Ok(self
            .siblings
            .read()
            .await
            .get(target)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cores, Percent};
    use chrono::{TimeZone, Utc};

    fn target() -> ContainerRef {
        ContainerRef::new("web", "web-7d9f", "default")
    }

    #[tokio::test]
    async fn test_history_window_filters_old_samples() {
        let store = InMemoryCollaborators::new();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let series = HistoricalSeries::from_values(
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            end,
            Duration::minutes(10),
        )
        .unwrap();
        store.record_history(target(), series).await;

        let recent = store
            .fetch_history(&target(), Duration::minutes(20))
            .await
            .unwrap();
        assert_eq!(recent.values(), &[3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let store = InMemoryCollaborators::new();
        let err = store
            .fetch_history(&target(), Duration::minutes(60))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("default/web-7d9f/web"));
        assert!(store.siblings(&target()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_siblings_round_trip() {
        let store = InMemoryCollaborators::new();
        let sibling = SiblingContainer {
            cpu_request: Cores(0.5),
            cpu_util: Percent(12.0),
        };
        store.record_siblings(target(), vec![sibling]).await;
        assert_eq!(store.siblings(&target()).await.unwrap(), vec![sibling]);
    }
}
