//! Restricted single-consumption ledger
//!
//! Tokens are keyed by the SHA-512 of a secret seed. A token may be consumed
//! once; the consuming token records every token it has consumed.
//!
//! Whether a consumption may happen is decided by a [`ConsumptionPolicy`]
//! consulted with the endpoints stored on both tokens. The bundled
//! [`PlaceholderPolicy`] approves everything.

use std::fmt::Debug;
use tracing::{debug, info, warn};

use sigchain_core::{token_id_from_seed, Result, SigChainError, Token};

use crate::context::TxContext;
use crate::storage::WorldState;

/// Decides whether one token may consume another
pub trait ConsumptionPolicy: Send + Sync + Debug {
    /// Ask the consumed token's send endpoint to release it
    fn approve_send(&self, endpoint: &str, consumed: &Token, consuming: &Token) -> bool;

    /// Ask the consuming token's accept endpoint to take the consumed token
    fn approve_accept(&self, endpoint: &str, consumed: &Token, consuming: &Token) -> bool;
}

/// Approves every request
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderPolicy;

impl ConsumptionPolicy for PlaceholderPolicy {
    fn approve_send(&self, _endpoint: &str, _consumed: &Token, _consuming: &Token) -> bool {
        true
    }

    fn approve_accept(&self, _endpoint: &str, _consumed: &Token, _consuming: &Token) -> bool {
        true
    }
}

/// Token ledger over a world state
#[derive(Debug)]
pub struct TokenLedger<'s, S: WorldState + ?Sized, P: ConsumptionPolicy = PlaceholderPolicy> {
    store: &'s S,
    policy: P,
}

impl<'s, S: WorldState + ?Sized> TokenLedger<'s, S> {
    /// Ledger with the placeholder policy
    pub fn new(store: &'s S) -> Self {
        Self::with_policy(store, PlaceholderPolicy)
    }
}

impl<'s, S: WorldState + ?Sized, P: ConsumptionPolicy> TokenLedger<'s, S, P> {
    pub fn with_policy(store: &'s S, policy: P) -> Self {
        Self { store, policy }
    }

    /// Create an unconsumed token whose id derives from `seed`
    ///
    /// Returns the token id.
    pub fn create_token(
        &self,
        ctx: &TxContext,
        seed: &str,
        accept_policy_endpoint: &str,
        send_policy_endpoint: &str,
        owner_public_key: &str,
    ) -> Result<String> {
        let id = token_id_from_seed(seed);
        if self.token_exists(&id)? {
            return Err(SigChainError::AlreadyExists(format!("token '{}'", id)));
        }

        let token = Token::from_seed(
            seed,
            accept_policy_endpoint,
            send_policy_endpoint,
            owner_public_key,
        );
        self.put_token(&token)?;

        info!(tx_id = %ctx.tx_id, token_id = %id, "Created token");
        Ok(id)
    }

    /// Load a token
    pub fn get_token(&self, id: &str) -> Result<Token> {
        debug!(token_id = %id, "Reading token");
        let bytes = self
            .store
            .get_state(id)?
            .ok_or_else(|| SigChainError::NotFound(format!("token '{}'", id)))?;
        Token::from_bytes(&bytes)
    }

    /// Whether `id` holds a record
    pub fn token_exists(&self, id: &str) -> Result<bool> {
        Ok(self.store.contains(id)?)
    }

    /// Let `consuming_id` consume `consumed_id`
    ///
    /// A consumed token stays consumed: any later attempt on the same
    /// `consumed_id` fails `AlreadyConsumed` before the consuming side is read.
    /// Returns both tokens as written.
    pub fn consume_token(
        &self,
        ctx: &TxContext,
        consumed_id: &str,
        consuming_id: &str,
    ) -> Result<(Token, Token)> {
        let mut consumed = self.get_token(consumed_id)?;
        if consumed.is_consumed() {
            warn!(
                tx_id = %ctx.tx_id,
                token_id = %consumed_id,
                consumer = %consumed.consuming_token_id,
                "Rejected second consumption"
            );
            return Err(SigChainError::AlreadyConsumed(consumed_id.to_string()));
        }

        let mut consuming = self.get_token(consuming_id)?;
        if consumed_id == consuming_id {
            return Err(SigChainError::InvalidArgument(format!(
                "token '{}' cannot consume itself",
                consumed_id
            )));
        }

        self.authorize(ctx, &consumed, &consuming)?;

        consumed.consuming_token_id = consuming_id.to_string();
        consuming.consumed_token_ids.push(consumed_id.to_string());

        self.put_token(&consumed)?;
        self.put_token(&consuming)?;

        info!(
            tx_id = %ctx.tx_id,
            consumed = %consumed_id,
            consuming = %consuming_id,
            "Consumed token"
        );
        Ok((consumed, consuming))
    }

    fn authorize(&self, ctx: &TxContext, consumed: &Token, consuming: &Token) -> Result<()> {
        let refuse = |reason: String| -> Result<()> {
            warn!(
                tx_id = %ctx.tx_id,
                consumed = %consumed.id,
                consuming = %consuming.id,
                reason = %reason,
                "Refused consumption"
            );
            Err(SigChainError::ConsumptionRefused(reason))
        };

        let send = consumed.send_policy_endpoint.as_str();
        let accept = consuming.accept_policy_endpoint.as_str();

        if send.is_empty() {
            return refuse(format!("token '{}' has no send endpoint", consumed.id));
        }
        if accept.is_empty() {
            return refuse(format!("token '{}' has no accept endpoint", consuming.id));
        }
        if !self.policy.approve_send(send, consumed, consuming) {
            return refuse(format!("send endpoint '{}' declined", send));
        }
        if !self.policy.approve_accept(accept, consumed, consuming) {
            return refuse(format!("accept endpoint '{}' declined", accept));
        }
        Ok(())
    }

    fn put_token(&self, token: &Token) -> Result<()> {
        self.store.put_state(&token.id, token.to_bytes()?)?;
        Ok(())
    }
}
