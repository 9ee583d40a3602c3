//! Named ledger functions
//!
//! A transaction names one function and passes its arguments as a JSON
//! object. Signatures travel as standard base64 strings; timestamps as
//! RFC 3339. [`Invocation::execute`] runs the function against a world state
//! and returns its result as JSON.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use sigchain_core::{Payload, Result, SigChainError};

use crate::context::TxContext;
use crate::graph::{BranchRequest, GraphEngine, NewNode, TransferRequest};
use crate::material::{MaterialContract, NewMaterial, SplitRequest};
use crate::storage::WorldState;
use crate::token::TokenLedger;

/// One ledger function call
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "function", content = "args")]
pub enum Invocation {
    CreateNode(CreateNodeArgs),
    GetNode(IdArgs),
    FinalizeNode(SignedIdArgs),
    CreateEdge(CreateEdgeArgs),
    CreateReferencedNodesAndFinalize(BranchArgs),
    TransferNodeOwnership(TransferArgs),
    NodeExists(IdArgs),
    AreIdsAvailable(IdsArgs),
    CreateToken(CreateTokenArgs),
    GetToken(IdArgs),
    ConsumeToken(ConsumeTokenArgs),
    CreateMaterial(CreateMaterialArgs),
    GetMaterial(IdArgs),
    TransferMaterial(TransferArgs),
    SplitMaterial(SplitArgs),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdsArgs {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedIdArgs {
    pub id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNodeArgs {
    pub id: String,
    #[serde(default)]
    pub payload: Payload,
    pub owner_public_key: String,
    pub created_time: DateTime<Utc>,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEdgeArgs {
    pub id_a: String,
    pub id_b: String,
    pub signature_a: String,
    pub signature_b: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchArgs {
    pub parent_id: String,
    pub parent_signature: String,
    pub ids: Vec<String>,
    pub payloads: Vec<Payload>,
    pub owner_public_keys: Vec<String>,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferArgs {
    pub old_id: String,
    pub new_id: String,
    pub new_owner_public_key: String,
    pub old_signature: String,
    pub new_signature: String,
    pub transfer_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTokenArgs {
    pub seed: String,
    pub accept_policy_endpoint: String,
    pub send_policy_endpoint: String,
    pub owner_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeTokenArgs {
    pub consumed_id: String,
    pub consuming_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialArgs {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub quantity: String,
    pub owner_public_key: String,
    pub created_time: DateTime<Utc>,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitArgs {
    pub id: String,
    pub quantities: Vec<Decimal>,
    pub new_ids: Vec<String>,
    pub owner_public_keys: Vec<String>,
    pub signature: String,
    pub child_signatures: Vec<String>,
}

impl TransferArgs {
    fn into_request(self) -> Result<TransferRequest> {
        Ok(TransferRequest {
            old_signature: decode_signature("old_signature", &self.old_signature)?,
            new_signature: decode_signature("new_signature", &self.new_signature)?,
            old_id: self.old_id,
            new_id: self.new_id,
            new_owner_public_key: self.new_owner_public_key,
            transfer_time: self.transfer_time,
        })
    }
}

impl Invocation {
    /// Every function name a transaction may carry
    pub const FUNCTIONS: [&'static str; 15] = [
        "CreateNode",
        "GetNode",
        "FinalizeNode",
        "CreateEdge",
        "CreateReferencedNodesAndFinalize",
        "TransferNodeOwnership",
        "NodeExists",
        "AreIdsAvailable",
        "CreateToken",
        "GetToken",
        "ConsumeToken",
        "CreateMaterial",
        "GetMaterial",
        "TransferMaterial",
        "SplitMaterial",
    ];

    /// Whether `function` names a ledger function
    pub fn is_known(function: &str) -> bool {
        Self::FUNCTIONS.contains(&function)
    }

    /// Parse a function name and its argument object
    pub fn parse(function: &str, args: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(json!({ "function": function, "args": args }))
    }

    /// Function name as it appears in requests
    pub fn name(&self) -> &'static str {
        match self {
            Invocation::CreateNode(_) => "CreateNode",
            Invocation::GetNode(_) => "GetNode",
            Invocation::FinalizeNode(_) => "FinalizeNode",
            Invocation::CreateEdge(_) => "CreateEdge",
            Invocation::CreateReferencedNodesAndFinalize(_) => "CreateReferencedNodesAndFinalize",
            Invocation::TransferNodeOwnership(_) => "TransferNodeOwnership",
            Invocation::NodeExists(_) => "NodeExists",
            Invocation::AreIdsAvailable(_) => "AreIdsAvailable",
            Invocation::CreateToken(_) => "CreateToken",
            Invocation::GetToken(_) => "GetToken",
            Invocation::ConsumeToken(_) => "ConsumeToken",
            Invocation::CreateMaterial(_) => "CreateMaterial",
            Invocation::GetMaterial(_) => "GetMaterial",
            Invocation::TransferMaterial(_) => "TransferMaterial",
            Invocation::SplitMaterial(_) => "SplitMaterial",
        }
    }

    /// Whether the function only reads
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Invocation::GetNode(_)
                | Invocation::NodeExists(_)
                | Invocation::AreIdsAvailable(_)
                | Invocation::GetToken(_)
                | Invocation::GetMaterial(_)
        )
    }

    /// Run against `store` inside transaction `ctx`
    pub fn execute<S>(self, store: &S, ctx: &TxContext, max_clock_skew_secs: i64) -> Result<Value>
    where
        S: WorldState + ?Sized,
    {
        let graph = GraphEngine::new(store);
        let tokens = TokenLedger::new(store);
        let materials = MaterialContract::with_max_clock_skew(store, max_clock_skew_secs);

        let result = match self {
            Invocation::CreateNode(args) => to_json(graph.create_node(
                ctx,
                NewNode {
                    signature: decode_signature("signature", &args.signature)?,
                    id: args.id,
                    payload: args.payload,
                    owner_public_key: args.owner_public_key,
                    created_time: args.created_time,
                },
            )?)?,
            Invocation::GetNode(args) => to_json(graph.get_node(&args.id)?)?,
            Invocation::FinalizeNode(args) => {
                let signature = decode_signature("signature", &args.signature)?;
                to_json(graph.finalize_node(ctx, &args.id, &signature)?)?
            }
            Invocation::CreateEdge(args) => {
                let signature_a = decode_signature("signature_a", &args.signature_a)?;
                let signature_b = decode_signature("signature_b", &args.signature_b)?;
                let (a, b) =
                    graph.create_edge(ctx, &args.id_a, &args.id_b, &signature_a, &signature_b)?;
                json!({ "from": to_json(a)?, "to": to_json(b)? })
            }
            Invocation::CreateReferencedNodesAndFinalize(args) => {
                let request = BranchRequest {
                    parent_signature: decode_signature("parent_signature", &args.parent_signature)?,
                    signatures: decode_signatures("signatures", &args.signatures)?,
                    ids: args.ids,
                    payloads: args.payloads,
                    owner_public_keys: args.owner_public_keys,
                };
                to_json(graph.create_referenced_nodes_and_finalize(ctx, &args.parent_id, request)?)?
            }
            Invocation::TransferNodeOwnership(args) => {
                to_json(graph.transfer_node_ownership(ctx, args.into_request()?)?)?
            }
            Invocation::NodeExists(args) => Value::Bool(graph.node_exists(&args.id)?),
            Invocation::AreIdsAvailable(args) => to_json(graph.ids_available(&args.ids)?)?,
            Invocation::CreateToken(args) => Value::String(tokens.create_token(
                ctx,
                &args.seed,
                &args.accept_policy_endpoint,
                &args.send_policy_endpoint,
                &args.owner_public_key,
            )?),
            Invocation::GetToken(args) => to_json(tokens.get_token(&args.id)?)?,
            Invocation::ConsumeToken(args) => {
                let (consumed, consuming) =
                    tokens.consume_token(ctx, &args.consumed_id, &args.consuming_id)?;
                json!({ "consumed": to_json(consumed)?, "consuming": to_json(consuming)? })
            }
            Invocation::CreateMaterial(args) => to_json(materials.create_material(
                ctx,
                NewMaterial {
                    signature: decode_signature("signature", &args.signature)?,
                    id: args.id,
                    name: args.name,
                    unit: args.unit,
                    quantity: args.quantity,
                    owner_public_key: args.owner_public_key,
                    created_time: args.created_time,
                },
            )?)?,
            Invocation::GetMaterial(args) => to_json(materials.get_material(&args.id)?.0)?,
            Invocation::TransferMaterial(args) => {
                to_json(materials.transfer_material(ctx, args.into_request()?)?)?
            }
            Invocation::SplitMaterial(args) => {
                let request = SplitRequest {
                    signature: decode_signature("signature", &args.signature)?,
                    child_signatures: decode_signatures("child_signatures", &args.child_signatures)?,
                    quantities: args.quantities,
                    new_ids: args.new_ids,
                    owner_public_keys: args.owner_public_keys,
                };
                to_json(materials.split_material(ctx, &args.id, request)?)?
            }
        };
        Ok(result)
    }
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(SigChainError::from)
}

fn decode_signature(field: &str, encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| SigChainError::InvalidArgument(format!("{} is not valid base64: {}", field, e)))
}

fn decode_signatures(field: &str, encoded: &[String]) -> Result<Vec<Vec<u8>>> {
    encoded
        .iter()
        .enumerate()
        .map(|(i, s)| decode_signature(&format!("{}[{}]", field, i), s))
        .collect()
}
