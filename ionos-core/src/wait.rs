//! Wait - Poll an asynchronous cloud operation until it settles
//!
//! Cloud APIs accept a mutating request and finish the work in the
//! background. Every Create/Update/Delete handler follows the call with a
//! wait: a refresh function reads the resource, the observation is
//! classified against the `pending` and `target` labels of a
//! [`WaitConfig`], and polling
//! continues on a fixed interval until the resource is ready (or gone),
//! reports a failure, or the timeout elapses.
//!
//! ```ignore
//! let config = WaitConfig::new(["BUSY", "DEPLOYING"], ["AVAILABLE"])
//!     .with_timeout(Duration::from_secs(600));
//!
//! wait_until_ready(&config, || async {
//!     let state = client.get(&path).await?;
//!     Ok(Observation::State(state))
//! })
//! .await?;
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::provider::{ProviderError, ProviderResult};

/// Default upper bound for a single wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default delay between two refresh calls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive "not found" observations tolerated
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// What a refresh saw when it looked at the resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A provisioning state label (e.g. "BUSY", "AVAILABLE")
    State(String),
    /// The cloud reports the operation as failed
    Failed(String),
    /// The resource is not visible (yet, or any more)
    NotFound,
}

impl Observation {
    pub fn state(label: impl Into<String>) -> Self {
        Observation::State(label.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Observation::Failed(reason.into())
    }
}

/// Errors that end a wait without reaching the target
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("invalid wait configuration: {0}")]
    InvalidConfig(String),

    #[error("resource entered a failed state: {reason}")]
    Failed { reason: String },

    #[error("unexpected state '{state}', wanted target '{}'", target.join(", "))]
    UnexpectedState { state: String, target: Vec<String> },

    #[error(
        "timeout while waiting for state to become '{}' (last state: '{}', timeout: {timeout:?})",
        target.join(", "),
        last_state.as_deref().unwrap_or("unknown")
    )]
    TimedOut {
        target: Vec<String>,
        last_state: Option<String>,
        timeout: Duration,
    },

    #[error("couldn't find resource (checked {checks} times)")]
    NotFound { checks: u32 },

    #[error(transparent)]
    Refresh(#[from] ProviderError),
}

impl From<WaitError> for ProviderError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Refresh(inner) => inner,
            other => ProviderError::new(other.to_string()).with_cause(other),
        }
    }
}

/// Settings for one polling operation
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Labels that mean "keep waiting"
    pub pending: HashSet<String>,
    /// Labels that mean "done"
    pub target: HashSet<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub initial_delay: Duration,
    /// Consecutive "not found" observations tolerated before giving up
    pub not_found_checks: u32,
}

impl WaitConfig {
    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_delay: Duration::ZERO,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    fn sorted_target(&self) -> Vec<String> {
        let mut target: Vec<String> = self.target.iter().cloned().collect();
        target.sort();
        target
    }

    fn check(&self, needs_target: bool) -> Result<(), WaitError> {
        if self.timeout.is_zero() {
            return Err(WaitError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if needs_target && self.target.is_empty() {
            return Err(WaitError::InvalidConfig(
                "at least one target state is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the loop treats a "not found" observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    Ready,
    Gone,
}

enum Step {
    Done(Option<String>),
    Continue,
}

/// Poll `refresh` until it reports one of the target states.
///
/// Returns the target label that ended the wait.
pub async fn wait_until_ready<F, Fut>(config: &WaitConfig, refresh: F) -> Result<String, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Observation>>,
{
    config.check(true)?;
    let label = run(config, Goal::Ready, refresh).await?;
    Ok(label.unwrap_or_default())
}

/// Poll `refresh` until the resource can no longer be found.
///
/// Labels in `target` also count as gone (e.g. "DESTROYED").
pub async fn wait_until_deleted<F, Fut>(config: &WaitConfig, refresh: F) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Observation>>,
{
    config.check(false)?;
    run(config, Goal::Gone, refresh).await.map(|_| ())
}

async fn run<F, Fut>(config: &WaitConfig, goal: Goal, mut refresh: F) -> Result<Option<String>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Observation>>,
{
    // A timeout too large to represent as an instant means no deadline
    let deadline = Instant::now().checked_add(config.timeout);
    let mut last_state: Option<String> = None;

    let result = match deadline {
        Some(deadline) => {
            let outcome = tokio::time::timeout_at(
                deadline,
                poll_loop(config, goal, Some(deadline), &mut refresh, &mut last_state),
            )
            .await;
            match outcome {
                Ok(result) => result,
                Err(_) => Err(timed_out(config, last_state)),
            }
        }
        None => poll_loop(config, goal, None, &mut refresh, &mut last_state).await,
    };

    match &result {
        Ok(label) => log::info!(
            "wait: finished in state '{}'",
            label.as_deref().unwrap_or("gone")
        ),
        Err(e) => log::debug!("wait: stopped: {}", e),
    }
    result
}

async fn poll_loop<F, Fut>(
    config: &WaitConfig,
    goal: Goal,
    deadline: Option<Instant>,
    refresh: &mut F,
    last_state: &mut Option<String>,
) -> Result<Option<String>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Observation>>,
{
    let mut not_found = 0u32;

    if !config.initial_delay.is_zero() {
        tokio::time::sleep(config.initial_delay).await;
    }

    loop {
        let observation = refresh().await?;
        log::debug!("wait: observed {:?}", observation);

        if let Step::Done(label) = classify(config, goal, observation, &mut not_found, last_state)? {
            return Ok(label);
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(timed_out(config, last_state.clone()));
                }
                config.poll_interval.min(deadline - now)
            }
            None => config.poll_interval,
        };
        tokio::time::sleep(pause).await;
    }
}

fn classify(
    config: &WaitConfig,
    goal: Goal,
    observation: Observation,
    not_found: &mut u32,
    last_state: &mut Option<String>,
) -> Result<Step, WaitError> {
    match observation {
        Observation::Failed(reason) => Err(WaitError::Failed { reason }),
        Observation::NotFound => {
            if goal == Goal::Gone {
                return Ok(Step::Done(None));
            }
            *not_found += 1;
            if *not_found > config.not_found_checks {
                return Err(WaitError::NotFound {
                    checks: config.not_found_checks,
                });
            }
            log::warn!(
                "wait: resource not found yet ({}/{})",
                not_found,
                config.not_found_checks
            );
            Ok(Step::Continue)
        }
        Observation::State(label) => {
            *not_found = 0;
            if config.target.contains(&label) {
                return Ok(Step::Done(Some(label)));
            }
            if config.pending.contains(&label) {
                *last_state = Some(label);
                return Ok(Step::Continue);
            }
            Err(WaitError::UnexpectedState {
                state: label,
                target: config.sorted_target(),
            })
        }
    }
}

fn timed_out(config: &WaitConfig, last_state: Option<String>) -> WaitError {
    WaitError::TimedOut {
        target: config.sorted_target(),
        last_state,
        timeout: config.timeout,
    }
}
