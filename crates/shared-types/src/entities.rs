//! # Core Domain Entities
//!
//! Defines the ledger entities shared across all subsystems.
//!
//! ## Clusters
//!
//! - **Records**: `MessageRecord`, `LinearId`, `RecordType`
//! - **Transactions**: `Command`, `UnsignedTransaction`, `SignedTransaction`,
//!   `CommittedTransaction`, `TransactionId`, `StateRef`
//! - **Ledger Feed**: `LedgerUpdate`, `UpdateType`
//! - **Protocol Wire**: `SessionMessage`, `SessionId`, `FlowId`

use crate::identity::{verify_signature, PartyId, PublicKey, Signature, SignatureError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: RECORDS
// =============================================================================

/// Stable identifier for a record across its revisions.
///
/// Only the creation event exists in the current protocol, but every record
/// keeps its linear id so future revisions can chain to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinearId(pub Uuid);

impl LinearId {
    /// Mint a fresh linear id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LinearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of record types the ledger can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordType {
    /// A point-to-point message record.
    Message,
}

/// A message exchanged between two parties and recorded on the ledger.
///
/// Immutable once constructed. The participants are always exactly the
/// sender and the recipient; they are derived rather than stored so the two
/// can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// The party proposing the message.
    pub sender: PartyId,
    /// The party the message is addressed to.
    pub recipient: PartyId,
    /// Free-form message body.
    pub contents: String,
    /// Stable identity of this record.
    pub linear_id: LinearId,
}

impl MessageRecord {
    /// Create a record with a freshly minted linear id.
    pub fn new(sender: PartyId, recipient: PartyId, contents: impl Into<String>) -> Self {
        Self {
            sender,
            recipient,
            contents: contents.into(),
            linear_id: LinearId::fresh(),
        }
    }

    /// The parties that must sign any transaction carrying this record.
    ///
    /// Order-insensitive: `{sender, recipient}` as a set.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<&PartyId> {
        [&self.sender, &self.recipient].into_iter().collect()
    }

    /// The owning keys of the participants.
    #[must_use]
    pub fn participant_keys(&self) -> BTreeSet<PublicKey> {
        self.participants().iter().map(|p| p.owning_key).collect()
    }
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// Identifier of the contract that validates an output.
pub type ContractId = String;

/// The id of a committed or proposed transaction (SHA-256 over its content).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub [u8; 32]);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("transaction id must be 32 bytes"))?;
        Ok(Self(array))
    }
}

/// Reference to a single output state of a committed transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StateRef {
    /// Transaction that produced the state.
    pub tx_id: TransactionId,
    /// Position within that transaction's outputs.
    pub index: u32,
}

/// Closed set of command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandTag {
    /// Record a new message on the ledger.
    Send,
}

impl CommandTag {
    fn discriminant(self) -> u8 {
        match self {
            Self::Send => 0,
        }
    }
}

/// A command attached to a transaction, naming the keys that must sign it.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// What the transaction does.
    pub tag: CommandTag,
    /// Every key whose signature the transaction requires.
    pub required_signers: Vec<PublicKey>,
}

impl Command {
    /// A `Send` command requiring the given signers.
    pub fn send(required_signers: Vec<PublicKey>) -> Self {
        Self {
            tag: CommandTag::Send,
            required_signers,
        }
    }
}

/// An output state paired with the contract that validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputState {
    /// The record being created.
    pub record: MessageRecord,
    /// The contract responsible for this output.
    pub contract_id: ContractId,
}

/// A proposed transaction before any signature is attached.
///
/// Built once per flow invocation, consumed by validation and signing, then
/// replaced by a [`SignedTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// States consumed. Always empty for `Send`.
    pub inputs: Vec<StateRef>,
    /// States created, in output order.
    pub outputs: Vec<OutputState>,
    /// Commands governing the transaction, in attachment order.
    pub commands: Vec<Command>,
    /// The notary that will order and finalize this transaction.
    pub notary: PartyId,
}

impl UnsignedTransaction {
    /// Compute the transaction id over the full content.
    ///
    /// Signatures are made over these 32 bytes, so every field that affects
    /// meaning must be folded in.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        let mut hasher = Sha256::new();
        hasher.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.tx_id.0);
            hasher.update(input.index.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.record.sender.owning_key);
            hasher.update(output.record.sender.name.as_bytes());
            hasher.update(output.record.recipient.owning_key);
            hasher.update(output.record.recipient.name.as_bytes());
            hasher.update(output.record.contents.as_bytes());
            hasher.update(output.record.linear_id.0.as_bytes());
            hasher.update(output.contract_id.as_bytes());
        }
        hasher.update((self.commands.len() as u64).to_le_bytes());
        for command in &self.commands {
            hasher.update([command.tag.discriminant()]);
            for signer in &command.required_signers {
                hasher.update(signer);
            }
        }
        hasher.update(self.notary.owning_key);
        TransactionId(hasher.finalize().into())
    }

    /// The union of every command's required signers.
    #[must_use]
    pub fn required_signers(&self) -> BTreeSet<PublicKey> {
        self.commands
            .iter()
            .flat_map(|c| c.required_signers.iter().copied())
            .collect()
    }
}

/// A single party's signature over a transaction id.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySignature {
    /// The key that produced the signature.
    pub by: PublicKey,
    /// Ed25519 signature over the transaction id bytes.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// A transaction plus the signatures collected so far.
///
/// Signatures are kept in insertion order (initiator, then counterparty,
/// then notary), but acceptance compares key sets, never order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The transaction content being signed.
    pub content: UnsignedTransaction,
    /// Collected signatures, oldest first.
    pub signatures: Vec<PartySignature>,
}

impl SignedTransaction {
    /// Wrap an unsigned transaction with no signatures yet.
    #[must_use]
    pub fn new(content: UnsignedTransaction) -> Self {
        Self {
            content,
            signatures: Vec::new(),
        }
    }

    /// The id of the underlying transaction content.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.content.id()
    }

    /// Append a signature, ignoring exact duplicates.
    pub fn add_signature(&mut self, signature: PartySignature) {
        if !self.signatures.contains(&signature) {
            self.signatures.push(signature);
        }
    }

    /// The set of keys that have signed.
    #[must_use]
    pub fn signer_set(&self) -> BTreeSet<PublicKey> {
        self.signatures.iter().map(|s| s.by).collect()
    }

    /// Required signers that have not signed yet.
    #[must_use]
    pub fn missing_signers(&self) -> BTreeSet<PublicKey> {
        let signed = self.signer_set();
        self.content
            .required_signers()
            .into_iter()
            .filter(|key| !signed.contains(key))
            .collect()
    }

    /// True once every key required by every command has a signature.
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Verify every collected signature over the transaction id, in the
    /// order they were applied.
    pub fn verify_signatures(&self) -> Result<(), SignatureError> {
        let id = self.id();
        for sig in &self.signatures {
            verify_signature(&sig.by, &id.0, &sig.signature)?;
        }
        Ok(())
    }

    /// Verify the signature of one specific key, if present.
    pub fn verify_signature_of(&self, key: &PublicKey) -> Result<(), SignatureError> {
        let id = self.id();
        let sig = self
            .signatures
            .iter()
            .find(|s| &s.by == key)
            .ok_or_else(|| SignatureError::VerificationFailed {
                by: hex::encode(key),
            })?;
        verify_signature(key, &id.0, &sig.signature)
    }
}

/// A transaction the notary has signed and the ledger has accepted.
///
/// Irrevocable. The wrapper exists so a merely fully-signed transaction can
/// never be mistaken for a finalized one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    /// The notarized transaction, notary signature last.
    pub transaction: SignedTransaction,
}

impl CommittedTransaction {
    /// The committed transaction's id.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.transaction.id()
    }

    /// State references produced by this transaction.
    #[must_use]
    pub fn produced_refs(&self) -> BTreeSet<StateRef> {
        let tx_id = self.id();
        (0..self.transaction.content.outputs.len())
            .map(|index| StateRef {
                tx_id,
                index: index as u32,
            })
            .collect()
    }
}

// =============================================================================
// CLUSTER C: LEDGER FEED
// =============================================================================

/// Kind of ledger change an update describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateType {
    /// Ordinary state transition.
    General,
    /// A contract upgrade replaced the validating contract.
    ContractUpgrade,
    /// The notary for a state changed.
    NotaryChange,
}

/// One committed state change, as seen by subscribers.
///
/// Produced exactly once per committed transaction by the ledger, never
/// mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUpdate {
    /// State references invalidated by the transaction.
    pub consumed: BTreeSet<StateRef>,
    /// State references created by the transaction.
    pub produced: BTreeSet<StateRef>,
    /// The flow that originated the transaction.
    pub flow_id: FlowId,
    /// What kind of change this is.
    pub update_type: UpdateType,
    /// The record type the transaction carries, for subscriber filtering.
    pub record_type: RecordType,
}

// =============================================================================
// CLUSTER D: PROTOCOL WIRE
// =============================================================================

/// Identifier of one flow instance. Distinct from transaction and record ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub Uuid);

impl FlowId {
    /// Mint a fresh flow id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one initiator/responder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Mint a fresh session id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages exchanged over a flow session.
///
/// Closed tagged encoding: the `type` discriminator is written and read
/// explicitly on both ends; unknown variants are a deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionMessage {
    /// Initiator → responder: a partially signed proposal to co-sign.
    SignatureRequest {
        /// The proposal, bearing at least the initiator's signature.
        transaction: SignedTransaction,
    },
    /// Responder → initiator: the counterparty's signature.
    SignatureResponse {
        /// Signature over the proposal's transaction id.
        signature: PartySignature,
    },
    /// Responder → initiator: refusal to sign.
    Rejection {
        /// Why the proposal was refused.
        reason: String,
    },
}
