//! Periodic liveness checks against the backend.

use std::{future::Future, time::Duration};

use tokio::{
    select,
    time::{Interval, MissedTickBehavior, interval},
};
use tracing::{info, warn};

use crate::client::BackendClient;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Issues one `ping`. Returns `true` only on a `success: true` reply.
pub async fn probe_once(client: &BackendClient) -> bool {
    match client.ping().await {
        Ok(()) => true,
        Err(error) => {
            warn!(backend = %client.addr(), %error, "backend liveness probe failed");
            false
        }
    }
}

// A slow ping pushes the schedule back instead of firing catch-up pings.
fn probe_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Pings the backend every `period` until `shutdown` resolves.
///
/// A zero `period` is treated as one millisecond. Returns the number of probes
/// that failed.
pub async fn run_probe<F>(client: BackendClient, period: Duration, shutdown: F) -> u64
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);
    let mut ticker = probe_ticker(period);
    let mut healthy = true;
    let mut failures = 0;

    loop {
        select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let alive = probe_once(&client).await;
                if !alive {
                    failures += 1;
                } else if !healthy {
                    info!(backend = %client.addr(), "backend is reachable again");
                }
                healthy = alive;
            }
        }
    }

    failures
}
