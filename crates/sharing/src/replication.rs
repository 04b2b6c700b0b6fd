use async_trait::async_trait;

use agentmem_model::Replica;

/// A replication send to one peer (spec.md §4.10: "replication to a peer is
/// a network send that may fail"). Swappable so the sharing manager doesn't
/// hard-code a transport.
#[async_trait]
pub trait ReplicationTransport: Send + Sync {
    async fn send(&self, replica: &Replica, payload: &[u8]) -> bool;
}

/// Always-succeeds transport, the default in absence of a real peer-to-peer
/// backend (no such backend is in scope per spec.md §1 non-goals on RPC
/// frameworks).
#[derive(Debug, Default)]
pub struct AlwaysSucceedsTransport;

#[async_trait]
impl ReplicationTransport for AlwaysSucceedsTransport {
    async fn send(&self, _replica: &Replica, _payload: &[u8]) -> bool {
        true
    }
}
