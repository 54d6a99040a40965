//! The in-process network.
//!
//! One hub, one notary, one canonical ledger, one update bridge; nodes are
//! added under their configured names and wired to the shared pieces.

use std::sync::Arc;

use tracing::info;

use cl_02_flow_engine::{FlowEngine, FlowEngineConfig, ResponderService};
use cl_03_notary::{FinalityConfig, FinalityService, NotaryAuthority};
use cl_04_update_bridge::LedgerUpdateBridge;
use shared_types::{Keypair, PartyId};

use crate::adapters::{
    FinalityAdapter, InMemoryCheckpointStore, InMemoryDirectory, InMemoryLedger,
    InProcessHub, InProcessNotaryClient, NodeKeystore, NodeVault, VaultDelivery,
};
use crate::config::{NetworkConfig, NodeConfig};
use crate::node::Node;

/// A process-local network of party nodes plus the shared services.
pub struct InProcessNetwork {
    hub: InProcessHub,
    directory: Arc<InMemoryDirectory>,
    notary: Arc<NotaryAuthority>,
    ledger: Arc<InMemoryLedger>,
    bridge: Arc<LedgerUpdateBridge>,
    delivery: Arc<VaultDelivery>,
}

impl InProcessNetwork {
    /// Stand up the shared services: hub, notary, ledger, bridge.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        let notary = Arc::new(NotaryAuthority::new(
            config.notary_name.clone(),
            Keypair::generate(),
        ));
        let (ledger, feed) = InMemoryLedger::new();
        let ledger = Arc::new(ledger);
        let bridge = Arc::new(LedgerUpdateBridge::start(feed, config.update_buffer));
        let directory = Arc::new(InMemoryDirectory::new());
        directory.register(notary.identity());

        info!(notary = %notary.identity(), "In-process network up");
        Self {
            hub: InProcessHub::new(),
            directory,
            notary,
            ledger,
            bridge,
            delivery: Arc::new(VaultDelivery::new()),
        }
    }

    /// The ordering authority's identity.
    #[must_use]
    pub fn notary_identity(&self) -> PartyId {
        self.notary.identity()
    }

    /// The transport hub, for attaching additional endpoints.
    #[must_use]
    pub fn hub(&self) -> &InProcessHub {
        &self.hub
    }

    /// The shared party directory.
    #[must_use]
    pub fn directory(&self) -> Arc<InMemoryDirectory> {
        Arc::clone(&self.directory)
    }

    /// The canonical ledger.
    #[must_use]
    pub fn ledger(&self) -> Arc<InMemoryLedger> {
        Arc::clone(&self.ledger)
    }

    /// The shared update bridge.
    #[must_use]
    pub fn bridge(&self) -> Arc<LedgerUpdateBridge> {
        Arc::clone(&self.bridge)
    }

    /// Add a party node and wire it into the network.
    #[must_use]
    pub fn add_node(&self, config: NodeConfig) -> Node {
        let keystore = Arc::new(NodeKeystore::generate(config.name.clone()));
        let identity = keystore.identity();
        self.directory.register(identity.clone());

        let vault = Arc::new(NodeVault::new(config.name.clone()));
        self.delivery.register(config.name.clone(), Arc::clone(&vault));

        let transport = Arc::new(self.hub.join(identity.clone()));

        let finality = FinalityService::new(
            FinalityConfig {
                notary_timeout: config.notary_timeout,
                delivery_attempts: config.delivery_attempts,
            },
            Arc::new(InProcessNotaryClient::new(Arc::clone(&self.notary))),
            Arc::clone(&self.ledger),
            Arc::clone(&self.delivery),
        );

        let engine = FlowEngine::new(
            FlowEngineConfig {
                identity: identity.clone(),
                notary: self.notary.identity(),
                counterparty_timeout: config.counterparty_timeout,
            },
            Arc::clone(&transport),
            Arc::clone(&keystore),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(FinalityAdapter::new(finality)),
        );

        let responder = ResponderService::new(
            identity.clone(),
            Arc::clone(&transport),
            Arc::clone(&keystore),
        );
        let responder_task = tokio::spawn(responder.run());

        info!(identity = %identity, "Node joined network");
        Node::new(
            identity,
            engine,
            Arc::clone(&self.directory),
            Arc::clone(&self.bridge),
            Arc::clone(&self.ledger),
            vault,
            responder_task,
        )
    }
}
