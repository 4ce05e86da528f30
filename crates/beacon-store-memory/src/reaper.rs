//! Optional expiry of alerts whose sender stopped putting.
//!
//! Without it an alert lives until its sender clears it. A sender that crashed
//! or lost connectivity mid-emergency would leave its record active forever.

use std::time::Duration;

use tokio::{
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::MemoryStore;

/// Spawn a task that expires records idle for longer than `ttl`, checking
/// every `every` (floored at one millisecond). The task ends when the store
/// shuts down.
pub fn spawn_reaper(
  store: MemoryStore,
  ttl: Duration,
  every: Duration,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut timer = interval(every.max(Duration::from_millis(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(?ttl, ?every, "alert reaper started");
    loop {
      timer.tick().await;
      match store.expire_idle(ttl).await {
        Ok(expired) if expired.is_empty() => {}
        Ok(expired) => debug!(count = expired.len(), "reaper sweep expired alerts"),
        Err(_) => {
          info!("alert store closed, reaper exiting");
          break;
        }
      }
    }
  })
}
