//! In-process session transport.
//!
//! All nodes of one process share a hub. A session is a pair of unbounded
//! channels; the initiator-side end is also parked in a registry keyed by
//! session id, so a flow resumed from a checkpoint can re-attach and keep
//! waiting for the reply it never received.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use cl_02_flow_engine::{
    FlowError, FlowSession, IncomingSession, SessionAcceptor, SessionTransport,
};
use shared_types::{PartyId, SessionId, SessionMessage};

/// One endpoint's half of a session channel pair.
#[derive(Clone)]
struct SessionEnd {
    tx: mpsc::UnboundedSender<SessionMessage>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<SessionMessage>>>,
}

#[derive(Default)]
struct HubInner {
    /// Inbound-session queues by party name.
    inboxes: RwLock<HashMap<String, mpsc::UnboundedSender<IncomingSession>>>,
    /// Initiator-side ends kept for re-attachment.
    initiator_ends: RwLock<HashMap<SessionId, SessionEnd>>,
}

/// The shared hub joining every node of one process.
#[derive(Default)]
pub struct InProcessHub {
    inner: Arc<HubInner>,
}

impl InProcessHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node to the hub under its identity.
    #[must_use]
    pub fn join(&self, identity: PartyId) -> NodeTransport {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        self.inner
            .inboxes
            .write()
            .insert(identity.name.clone(), inbox_tx);
        NodeTransport {
            identity,
            inner: Arc::clone(&self.inner),
            inbox: Arc::new(Mutex::new(inbox_rx)),
        }
    }
}

/// One node's view of the transport.
pub struct NodeTransport {
    identity: PartyId,
    inner: Arc<HubInner>,
    inbox: Arc<Mutex<mpsc::UnboundedReceiver<IncomingSession>>>,
}

#[async_trait]
impl SessionTransport for NodeTransport {
    async fn open(&self, counterparty: &PartyId) -> Result<Box<dyn FlowSession>, FlowError> {
        let session_id = SessionId::fresh();
        let (to_responder_tx, to_responder_rx) = mpsc::unbounded_channel();
        let (to_initiator_tx, to_initiator_rx) = mpsc::unbounded_channel();

        let initiator_end = SessionEnd {
            tx: to_responder_tx,
            rx: Arc::new(Mutex::new(to_initiator_rx)),
        };
        let responder_end = SessionEnd {
            tx: to_initiator_tx,
            rx: Arc::new(Mutex::new(to_responder_rx)),
        };

        let inbox = self
            .inner
            .inboxes
            .read()
            .get(&counterparty.name)
            .cloned()
            .ok_or_else(|| FlowError::UnknownParty {
                name: counterparty.name.clone(),
            })?;

        self.inner
            .initiator_ends
            .write()
            .insert(session_id, initiator_end.clone());

        inbox
            .send(IncomingSession {
                initiator: self.identity.clone(),
                session: Box::new(InProcessSession {
                    id: session_id,
                    end: responder_end,
                    hub: None,
                }),
            })
            .map_err(|_| FlowError::SessionClosed)?;

        debug!(session_id = %session_id, counterparty = %counterparty, "Session opened");
        Ok(Box::new(InProcessSession {
            id: session_id,
            end: initiator_end,
            hub: Some(Arc::clone(&self.inner)),
        }))
    }

    async fn reattach(&self, session_id: SessionId) -> Result<Box<dyn FlowSession>, FlowError> {
        let end = self
            .inner
            .initiator_ends
            .read()
            .get(&session_id)
            .cloned()
            .ok_or(FlowError::SessionClosed)?;
        debug!(session_id = %session_id, "Session re-attached");
        Ok(Box::new(InProcessSession {
            id: session_id,
            end,
            hub: Some(Arc::clone(&self.inner)),
        }))
    }
}

#[async_trait]
impl SessionAcceptor for NodeTransport {
    async fn accept(&self) -> Option<IncomingSession> {
        self.inbox.lock().await.recv().await
    }
}

/// A channel-backed session endpoint.
struct InProcessSession {
    id: SessionId,
    end: SessionEnd,
    /// Set on the initiator side only; closing unparks the registry entry.
    hub: Option<Arc<HubInner>>,
}

#[async_trait]
impl FlowSession for InProcessSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn send(&mut self, message: SessionMessage) -> Result<(), FlowError> {
        self.end
            .tx
            .send(message)
            .map_err(|_| FlowError::SessionClosed)
    }

    async fn recv(&mut self) -> Result<SessionMessage, FlowError> {
        self.end
            .rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(FlowError::SessionClosed)
    }

    async fn close(&mut self) {
        if let Some(hub) = &self.hub {
            hub.initiator_ends.write().remove(&self.id);
        }
    }
}
