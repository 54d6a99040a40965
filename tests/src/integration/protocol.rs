//! # End-to-End Protocol Tests
//!
//! Drives the full stack through the in-process network:
//!
//! ```text
//! [PartyA engine] ──session──→ [PartyB responder]
//!        │
//!        └──finalize──→ [Notary] ──→ [Ledger] ──→ [Vaults]
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: progress sequence and terminal transaction id
//! 2. **Rejection**: the responder's independent re-validation
//! 3. **Timeout**: silent counterparty, no ledger mutation
//! 4. **Cancellation**: windows before and after finalization
//! 5. **Resume**: checkpointed instances surviving a restart
//! 6. **Double Spend**: conflicting inputs at the notary

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use tokio::time::timeout;
#[cfg(test)]
use tokio_stream::StreamExt;

#[cfg(test)]
use cl_01_transaction::TransactionBuilder;
#[cfg(test)]
use cl_02_flow_engine::{
    CheckpointStage, CheckpointStore, FlowCheckpoint, FlowEngine, FlowEngineConfig, FlowError,
    FlowSession, PartyDirectory, ResponderService, SessionTransport, TransactionSigner,
};
#[cfg(test)]
use cl_03_notary::{FinalityApi, FinalityConfig, FinalityService, NotaryAuthority};
#[cfg(test)]
use node_runtime::adapters::{
    FinalityAdapter, InMemoryCheckpointStore, InMemoryLedger, InProcessHub,
    InProcessNotaryClient, NodeKeystore, NodeVault, VaultDelivery,
};
#[cfg(test)]
use node_runtime::{InProcessNetwork, NetworkConfig, NodeConfig, PostMessage};
#[cfg(test)]
use shared_types::{
    FlowId, Keypair, MessageRecord, NotaryRejection, PartySignature, SessionMessage,
    SignedTransaction, StateRef, TransactionId,
};

#[cfg(test)]
const PARTY_A: &str = "O=PartyA,L=London,C=GB";
#[cfg(test)]
const PARTY_B: &str = "O=PartyB,L=New York,C=US";

/// Collect every item of a post stream.
#[cfg(test)]
async fn collect_post(
    stream: tokio_stream::wrappers::UnboundedReceiverStream<String>,
) -> Vec<String> {
    timeout(Duration::from_secs(10), stream.collect::<Vec<_>>())
        .await
        .expect("post stream did not terminate")
}

#[cfg(test)]
mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_happy_path_progress_then_transaction_id() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let party_a = network.add_node(NodeConfig::named(PARTY_A));
        let _party_b = network.add_node(NodeConfig::named(PARTY_B));

        let items = collect_post(party_a.post(PostMessage {
            recipient: PARTY_B.into(),
            contents: "hello there".into(),
        }))
        .await;

        assert_eq!(
            &items[..5],
            &[
                "Creating",
                "Verifying",
                "Signing",
                "Sending to Counterparty",
                "Finalising"
            ]
        );
        let terminal = items.last().expect("terminal item");
        assert_eq!(terminal.len(), 64, "terminal item is a hex transaction id");
        assert!(terminal.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(network.ledger().transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_reaches_both_vaults_and_snapshot() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let party_a = network.add_node(NodeConfig::named(PARTY_A));
        let party_b = network.add_node(NodeConfig::named(PARTY_B));

        collect_post(party_a.post(PostMessage {
            recipient: PARTY_B.into(),
            contents: "hello there".into(),
        }))
        .await;

        assert_eq!(party_a.vault().records().len(), 1);
        assert_eq!(party_b.vault().records().len(), 1);
        assert_eq!(party_b.vault().records()[0].contents, "hello there");

        let snapshot = party_b.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].sender.name, PARTY_A);
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_a_single_error() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let party_a = network.add_node(NodeConfig::named(PARTY_A));

        let items = collect_post(party_a.post(PostMessage {
            recipient: "O=Nobody,L=Nowhere,C=XX".into(),
            contents: "hello?".into(),
        }))
        .await;

        assert_eq!(items.len(), 1);
        assert!(items[0].starts_with("Error: Unknown party name"));
        assert_eq!(network.ledger().transaction_count(), 0);
    }

    /// Scenario B: the responder re-validates independently and rejects a
    /// structurally invalid proposal that a dishonest initiator sends
    /// around its own validation step.
    #[tokio::test]
    async fn test_responder_rejects_two_output_proposal() {
        let hub = InProcessHub::new();
        let keystore_a = Arc::new(NodeKeystore::generate(PARTY_A));
        let keystore_b = Arc::new(NodeKeystore::generate(PARTY_B));
        let notary = Keypair::generate().party("O=Notary,L=London,C=GB");

        let transport_b = Arc::new(hub.join(keystore_b.identity()));
        tokio::spawn(
            ResponderService::new(
                keystore_b.identity(),
                Arc::clone(&transport_b),
                Arc::clone(&keystore_b),
            )
            .run(),
        );

        let record = MessageRecord::new(
            keystore_a.identity(),
            keystore_b.identity(),
            "hello there",
        );
        let mut tx = TransactionBuilder::build(record, notary);
        tx.outputs.push(tx.outputs[0].clone());
        let mut stx = SignedTransaction::new(tx);
        let id = stx.id();
        stx.add_signature(keystore_a.sign(&id));

        let transport_a = hub.join(keystore_a.identity());
        let mut session = transport_a
            .open(&keystore_b.identity())
            .await
            .expect("open");
        session
            .send(SessionMessage::SignatureRequest { transaction: stx })
            .await
            .expect("send");

        let reply = timeout(Duration::from_secs(5), session.recv())
            .await
            .expect("no reply")
            .expect("session closed");
        match reply {
            SessionMessage::Rejection { reason } => {
                assert_eq!(
                    reason,
                    "Contract violation: Only one output state should be created \
                     when sending a message."
                );
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    /// Scenario C: the counterparty is present on the network but never
    /// responds; the flow times out without touching the ledger.
    #[tokio::test]
    async fn test_silent_counterparty_times_out() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let mut config = NodeConfig::named(PARTY_A);
        config.counterparty_timeout = Duration::from_millis(200);
        let party_a = network.add_node(config);

        // PartyB joins the transport and the directory but runs no
        // responder.
        let silent = NodeKeystore::generate(PARTY_B);
        network.directory().register(silent.identity());
        let _silent_transport = network.hub().join(silent.identity());

        let items = collect_post(party_a.post(PostMessage {
            recipient: PARTY_B.into(),
            contents: "anyone home?".into(),
        }))
        .await;

        let terminal = items.last().expect("terminal item");
        assert!(
            terminal.contains("Timed out waiting for counterparty"),
            "got {terminal}"
        );
        assert_eq!(network.ledger().transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_counterparty_reply() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let party_a = network.add_node(NodeConfig::named(PARTY_A));

        let silent = NodeKeystore::generate(PARTY_B);
        network.directory().register(silent.identity());
        let _silent_transport = network.hub().join(silent.identity());

        let record = MessageRecord::new(
            party_a.identity(),
            silent.identity(),
            "never mind",
        );
        let mut handle = party_a.post_record(record);
        tokio::task::yield_now().await;

        party_a.cancel(handle.flow_id).expect("cancel allowed");

        let outcome = timeout(Duration::from_secs(5), &mut handle.result)
            .await
            .expect("flow did not react to cancel")
            .expect("result channel");
        assert_eq!(outcome, Err(FlowError::Cancelled));
        assert_eq!(network.ledger().transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_finality_is_denied() {
        let network = InProcessNetwork::new(NetworkConfig::default());
        let party_a = network.add_node(NodeConfig::named(PARTY_A));
        let _party_b = network.add_node(NodeConfig::named(PARTY_B));

        let record = MessageRecord::new(
            party_a.identity(),
            network.directory().resolve_by_name(PARTY_B).expect("resolve"),
            "hello there",
        );
        let mut handle = party_a.post_record(record);
        timeout(Duration::from_secs(5), &mut handle.result)
            .await
            .expect("flow timed out")
            .expect("result channel")
            .expect("flow failed");

        let denied = party_a.cancel(handle.flow_id);
        assert!(matches!(denied, Err(FlowError::CancellationDenied { .. })));
        assert_eq!(network.ledger().transaction_count(), 1);
    }
}

#[cfg(test)]
mod resume {
    use super::*;

    /// A restart while awaiting the counterparty: the checkpointed
    /// instance re-attaches its session and completes without resending
    /// the proposal.
    #[tokio::test]
    async fn test_resume_across_restart_completes_flow() {
        let hub = InProcessHub::new();
        let keystore_a = Arc::new(NodeKeystore::generate(PARTY_A));
        let keystore_b = Arc::new(NodeKeystore::generate(PARTY_B));
        let notary = Arc::new(NotaryAuthority::new(
            "O=Notary,L=London,C=GB",
            Keypair::generate(),
        ));

        let (ledger, _feed) = InMemoryLedger::new();
        let ledger = Arc::new(ledger);
        let delivery = Arc::new(VaultDelivery::new());
        delivery.register(PARTY_A, Arc::new(NodeVault::new(PARTY_A)));
        delivery.register(PARTY_B, Arc::new(NodeVault::new(PARTY_B)));

        let transport_a = Arc::new(hub.join(keystore_a.identity()));
        let transport_b = Arc::new(hub.join(keystore_b.identity()));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());

        // Pre-restart: the instance built, validated, signed, opened a
        // session, checkpointed, and sent the proposal.
        let record = MessageRecord::new(
            keystore_a.identity(),
            keystore_b.identity(),
            "hello there",
        );
        let mut stx = SignedTransaction::new(TransactionBuilder::build(
            record.clone(),
            notary.identity(),
        ));
        let id = stx.id();
        stx.add_signature(keystore_a.sign(&id));

        let mut session = transport_a
            .open(&keystore_b.identity())
            .await
            .expect("open");
        let flow_id = FlowId::fresh();
        let checkpoint = FlowCheckpoint {
            flow_id,
            record,
            stage: CheckpointStage::AwaitingCounterparty {
                session_id: session.id(),
                transaction: stx.clone(),
            },
        };
        checkpoints
            .save(flow_id, checkpoint.to_bytes().expect("encode"))
            .await
            .expect("save");
        session
            .send(SessionMessage::SignatureRequest { transaction: stx })
            .await
            .expect("send");
        drop(session); // the process dies here

        // The counterparty comes up and replies while the initiator is
        // still down.
        tokio::spawn(
            ResponderService::new(
                keystore_b.identity(),
                Arc::clone(&transport_b),
                Arc::clone(&keystore_b),
            )
            .run(),
        );

        // Post-restart: a fresh engine over the same checkpoint store and
        // transport.
        let finality = FinalityService::new(
            FinalityConfig::default(),
            Arc::new(InProcessNotaryClient::new(Arc::clone(&notary))),
            Arc::clone(&ledger),
            Arc::clone(&delivery),
        );
        let engine = FlowEngine::new(
            FlowEngineConfig {
                identity: keystore_a.identity(),
                notary: notary.identity(),
                counterparty_timeout: Duration::from_secs(5),
            },
            Arc::clone(&transport_a),
            Arc::clone(&keystore_a),
            Arc::clone(&checkpoints),
            Arc::new(FinalityAdapter::new(finality)),
        );

        let mut handles = engine.resume_pending().await.expect("resume");
        assert_eq!(handles.len(), 1);
        let mut handle = handles.remove(0);
        assert_eq!(handle.flow_id, flow_id);

        let committed = timeout(Duration::from_secs(5), &mut handle.result)
            .await
            .expect("resumed flow timed out")
            .expect("result channel")
            .expect("resumed flow failed");

        assert!(committed.transaction.is_fully_signed());
        assert_eq!(ledger.transaction_count(), 1);
        assert!(checkpoints.is_empty());
    }
}

#[cfg(test)]
mod notarization {
    use super::*;

    fn fully_signed_with_input(
        contents: &str,
        input: StateRef,
        notary: &NotaryAuthority,
    ) -> SignedTransaction {
        let sender = Keypair::from_seed([1u8; 32]);
        let recipient = Keypair::from_seed([2u8; 32]);
        let record = MessageRecord::new(
            sender.party(PARTY_A),
            recipient.party(PARTY_B),
            contents,
        );
        let mut tx = TransactionBuilder::build(record, notary.identity());
        tx.inputs.push(input);
        let mut stx = SignedTransaction::new(tx);
        let id = stx.id();
        stx.add_signature(PartySignature {
            by: sender.public_key(),
            signature: sender.sign(&id.0),
        });
        stx.add_signature(PartySignature {
            by: recipient.public_key(),
            signature: recipient.sign(&id.0),
        });
        stx
    }

    /// Two transactions race for the same input; the notary lets exactly
    /// one through.
    #[tokio::test]
    async fn test_double_spend_rejected_at_notary() {
        let notary = Arc::new(NotaryAuthority::new(
            "O=Notary,L=London,C=GB",
            Keypair::generate(),
        ));
        let (ledger, _feed) = InMemoryLedger::new();
        let ledger = Arc::new(ledger);
        let delivery = Arc::new(VaultDelivery::new());
        delivery.register(PARTY_A, Arc::new(NodeVault::new(PARTY_A)));
        delivery.register(PARTY_B, Arc::new(NodeVault::new(PARTY_B)));

        let finality = FinalityService::new(
            FinalityConfig::default(),
            Arc::new(InProcessNotaryClient::new(Arc::clone(&notary))),
            Arc::clone(&ledger),
            Arc::clone(&delivery),
        );

        let contested = StateRef {
            tx_id: TransactionId([0xAA; 32]),
            index: 0,
        };
        let first = fully_signed_with_input("first", contested, &notary);
        let second = fully_signed_with_input("second", contested, &notary);

        finality
            .finalize(first, FlowId::fresh())
            .await
            .expect("first spend commits");
        let verdict = finality.finalize(second, FlowId::fresh()).await;

        match verdict {
            Err(cl_03_notary::FinalityError::Rejected(NotaryRejection::DoubleSpend {
                conflicting_ref,
            })) => assert_eq!(conflicting_ref, contested),
            other => panic!("expected double-spend rejection, got {other:?}"),
        }
        assert_eq!(ledger.transaction_count(), 1);
    }

    /// Finalizing the same transaction twice (an at-least-once retry)
    /// leaves one commit, one update, one vault entry.
    #[tokio::test]
    async fn test_refinalize_is_idempotent() {
        let notary = Arc::new(NotaryAuthority::new(
            "O=Notary,L=London,C=GB",
            Keypair::generate(),
        ));
        let (ledger, mut feed) = InMemoryLedger::new();
        let ledger = Arc::new(ledger);
        let vault_b = Arc::new(NodeVault::new(PARTY_B));
        let delivery = Arc::new(VaultDelivery::new());
        delivery.register(PARTY_A, Arc::new(NodeVault::new(PARTY_A)));
        delivery.register(PARTY_B, Arc::clone(&vault_b));

        let finality = FinalityService::new(
            FinalityConfig::default(),
            Arc::new(InProcessNotaryClient::new(Arc::clone(&notary))),
            Arc::clone(&ledger),
            Arc::clone(&delivery),
        );

        let input = StateRef {
            tx_id: TransactionId([0xBB; 32]),
            index: 0,
        };
        let stx = fully_signed_with_input("again", input, &notary);
        let flow_id = FlowId::fresh();

        finality
            .finalize(stx.clone(), flow_id)
            .await
            .expect("first finalize");
        finality
            .finalize(stx, flow_id)
            .await
            .expect("retried finalize");

        assert_eq!(ledger.transaction_count(), 1);
        assert_eq!(vault_b.transaction_count(), 1);
        feed.recv().await.expect("exactly one update");
        assert!(feed.try_recv().is_err());
    }
}
