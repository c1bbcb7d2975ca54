use crate::domain::errors::{AlpacaError, Result};
use crate::domain::market::DataFeed;
use crate::domain::ports::FeedStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of walking a feed chain.
#[derive(Debug)]
pub enum FallbackOutcome<F, T> {
    Success {
        tier: F,
        value: T,
        attempts: Vec<F>,
    },
    /// Every tier failed; `error` is the last tier's failure.
    Exhausted { error: AlpacaError, attempts: Vec<F> },
}

impl<F: Copy, T> FallbackOutcome<F, T> {
    pub fn attempts(&self) -> &[F] {
        match self {
            FallbackOutcome::Success { attempts, .. } => attempts,
            FallbackOutcome::Exhausted { attempts, .. } => attempts,
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            FallbackOutcome::Success { value, .. } => Ok(value),
            FallbackOutcome::Exhausted { error, .. } => Err(error),
        }
    }
}

/// Walks a family's feed tiers in priority order until one answers, and
/// remembers the tier that did.
///
/// Any failure advances to the next tier, whatever its cause. Each tier gets
/// its own timeout so a fully exhausted chain can take the sum of them.
#[derive(Clone)]
pub struct FeedFallback {
    store: Arc<dyn FeedStore>,
}

impl FeedFallback {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Last tier that answered for `F`'s family, if it still parses.
    pub fn remembered<F: DataFeed>(&self) -> Option<F> {
        let stored = self.store.load(F::FAMILY)?;
        match stored.parse::<F>() {
            Ok(tier) => Some(tier),
            Err(_) => {
                warn!(
                    "FeedFallback: ignoring unknown remembered {} tier '{}'",
                    F::FAMILY,
                    stored
                );
                None
            }
        }
    }

    /// Explicit tier, else the remembered one, else the top of the chain.
    pub fn starting_tier<F: DataFeed>(&self, requested: Option<F>) -> F {
        requested
            .or_else(|| self.remembered::<F>())
            .unwrap_or_else(|| F::chain()[0])
    }

    pub async fn run<F, T, Op, Fut>(&self, requested: Option<F>, mut op: Op) -> FallbackOutcome<F, T>
    where
        F: DataFeed,
        Op: FnMut(F) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = self.starting_tier(requested);
        let mut attempts = Vec::new();
        let mut last_error = None;

        for &tier in start.fallback_chain() {
            attempts.push(tier);
            debug!("FeedFallback: trying {} tier {}", F::FAMILY, tier);

            match op(tier).await {
                Ok(value) => {
                    self.remember(tier);
                    if attempts.len() > 1 {
                        info!(
                            "FeedFallback: {} served by {} after {} attempts",
                            F::FAMILY,
                            tier,
                            attempts.len()
                        );
                    }
                    return FallbackOutcome::Success {
                        tier,
                        value,
                        attempts,
                    };
                }
                Err(e) => {
                    warn!("FeedFallback: {} tier {} failed: {}", F::FAMILY, tier, e);
                    last_error = Some(e);
                }
            }
        }

        warn!(
            "FeedFallback: all {} tiers exhausted ({:?})",
            F::FAMILY,
            attempts
        );
        let error = last_error
            .unwrap_or_else(|| AlpacaError::server(format!("no {} tiers to try", F::FAMILY), None));
        FallbackOutcome::Exhausted { error, attempts }
    }

    /// Single-item lookups surface the last tier's error on exhaustion.
    pub async fn fetch_single<F, T, Op, Fut>(&self, requested: Option<F>, op: Op) -> Result<T>
    where
        F: DataFeed,
        Op: FnMut(F) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(requested, op).await.into_result()
    }

    /// Bulk lookups degrade to an empty result on exhaustion.
    pub async fn fetch_bulk<F, T, Op, Fut>(&self, requested: Option<F>, op: Op) -> T
    where
        F: DataFeed,
        T: Default,
        Op: FnMut(F) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.run(requested, op).await {
            FallbackOutcome::Success { value, .. } => value,
            FallbackOutcome::Exhausted { .. } => T::default(),
        }
    }

    fn remember<F: DataFeed>(&self, tier: F) {
        if let Err(e) = self.store.save(F::FAMILY, tier.as_str()) {
            warn!(
                "FeedFallback: failed to remember {} tier {}: {:#}",
                F::FAMILY,
                tier,
                e
            );
        }
    }
}
