// ── Cross-tab session sync ──
//
// Feeds writes made by other tabs or processes into the session store so
// its subscribers (guards, mostly) re-evaluate. Push-capable storage is
// watched; everything else is polled.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::SessionStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Run until `cancel` fires, calling [`SessionStore::sync_from_storage`]
/// whenever the backing storage changes underneath this process.
pub fn spawn_storage_sync(
    store: SessionStore,
    cancel: CancellationToken,
    poll_interval: Duration,
) -> JoinHandle<()> {
    // Subscribe before spawning so no write between here and the first
    // poll of the task is missed.
    let watch = store.storage().watch();
    tokio::spawn(async move {
        match watch {
            Some(mut watch) => loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    change = watch.changed() => {
                        let Some(change) = change else { break };
                        debug!(key = ?change.key, "storage changed in another tab");
                        resync(&store);
                    }
                }
            },
            None => {
                let mut ticker = tokio::time::interval(poll_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        _ = ticker.tick() => match store.storage().reload() {
                            Ok(true) => resync(&store),
                            Ok(false) => {}
                            Err(e) => warn!("session storage poll failed: {e}"),
                        },
                    }
                }
            }
        }
        debug!("storage sync stopped");
    })
}

fn resync(store: &SessionStore) {
    if let Err(e) = store.sync_from_storage() {
        warn!("failed to re-read session storage: {e}");
    }
}
