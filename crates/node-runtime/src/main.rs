//! Demo entry point: two parties and a notary in one process.
//!
//! PartyA posts a message to PartyB, the progress steps and the resulting
//! ledger update are printed, then the snapshot query shows the committed
//! record.

use anyhow::Result;
use tokio_stream::StreamExt;
use tracing::info;

use node_runtime::{InProcessNetwork, NetworkConfig, NodeConfig, PostMessage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let network = InProcessNetwork::new(NetworkConfig::default());
    let party_a = network.add_node(NodeConfig::named("O=PartyA,L=London,C=GB"));
    let party_b = network.add_node(NodeConfig::named("O=PartyB,L=New York,C=US"));

    // Subscribe before posting so the commit is seen live.
    let mut updates = party_b.updates();

    let mut steps = party_a.post(PostMessage {
        recipient: "O=PartyB,L=New York,C=US".into(),
        contents: "hello there".into(),
    });
    while let Some(step) = steps.next().await {
        println!("STEP: {step}");
    }

    if let Some(Ok(update)) = updates.next().await {
        println!(
            "UPDATE: flow {} produced {} state(s)",
            update.flow_id,
            update.produced.len()
        );
    }

    let snapshot = party_b.snapshot().await;
    info!(records = snapshot.len(), "Snapshot after commit");
    for record in snapshot {
        println!(
            "RECORD: {} -> {}: {:?}",
            record.sender, record.recipient, record.contents
        );
    }

    Ok(())
}
