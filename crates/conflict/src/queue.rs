use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::manager::ConflictResolver;

/// Single-consumer auto-resolution loop (spec.md §5: "the conflict queue has
/// a single consumer"). Pops one conflict id per tick and resolves it;
/// failures transition the conflict to escalated and are never retried
/// blindly. Mirrors the daemon's `tokio::select!` shutdown pattern.
pub async fn run_resolution_loop(
    resolver: Arc<ConflictResolver>,
    mut queue: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("conflict resolution loop started");
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_ok() && *shutdown.borrow() {
                    break;
                }
            }
            next = queue.recv() => {
                match next {
                    Some(conflict_id) => {
                        if let Err(err) = resolver.resolve(&conflict_id).await {
                            warn!(conflict_id, ?err, "auto-resolution failed; escalating");
                            if let Err(escalate_err) = resolver.escalate(&conflict_id).await {
                                error!(conflict_id, ?escalate_err, "failed to escalate conflict");
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }
    info!("conflict resolution loop stopped");
}
