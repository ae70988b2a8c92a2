// src/wallet/prompt.rs
//! Prompt-mediated signing.
//!
//! [`PromptSigner`] models a wallet that asks its user before every
//! signature. Each request becomes a [`SigningPrompt`] delivered over a
//! channel to whatever presents it (a UI, a CLI, a test), and the signature
//! is produced only once the prompt is approved.

use super::key_management::KeyManager;
use crate::credential::{CredentialDigest, CredentialSigner, SignatureResponse, SigningError};
use async_trait::async_trait;
use ethers::types::Address;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptDecision {
    Approve,
    Reject(String),
}

/// A pending request for the user's approval.
///
/// Dropping the prompt without answering counts as a decline.
#[derive(Debug)]
pub struct SigningPrompt {
    pub digest: CredentialDigest,
    pub address: Address,
    responder: oneshot::Sender<PromptDecision>,
}

impl SigningPrompt {
    pub fn approve(self) {
        self.answer(PromptDecision::Approve);
    }

    pub fn reject(self, reason: impl Into<String>) {
        self.answer(PromptDecision::Reject(reason.into()));
    }

    pub fn answer(self, decision: PromptDecision) {
        // requester already gone (timed out or cancelled)
        let _ = self.responder.send(decision);
    }
}

/// Signing agent that waits for an explicit approval per signature.
///
/// The signer is unavailable once the prompt receiver has been dropped.
#[derive(Clone)]
pub struct PromptSigner {
    keys: KeyManager,
    prompts: mpsc::Sender<SigningPrompt>,
}

impl PromptSigner {
    /// Creates a signer and the receiving end its prompts are delivered to.
    pub fn new(keys: KeyManager, buffer: usize) -> (Self, mpsc::Receiver<SigningPrompt>) {
        let (prompts, receiver) = mpsc::channel(buffer.max(1));
        (PromptSigner { keys, prompts }, receiver)
    }
}

#[async_trait]
impl CredentialSigner for PromptSigner {
    fn address(&self) -> Result<Address, SigningError> {
        if self.prompts.is_closed() {
            return Err(SigningError::Unavailable);
        }
        Ok(self.keys.address())
    }

    async fn sign_digest(
        &self,
        digest: &CredentialDigest,
    ) -> Result<SignatureResponse, SigningError> {
        let (responder, decision) = oneshot::channel();
        let prompt = SigningPrompt {
            digest: *digest,
            address: self.keys.address(),
            responder,
        };
        self.prompts
            .send(prompt)
            .await
            .map_err(|_| SigningError::Unavailable)?;

        match decision.await {
            Ok(PromptDecision::Approve) => {
                let signature = self
                    .keys
                    .sign(digest)
                    .map_err(|e| SigningError::Failed(e.to_string()))?;
                Ok(SignatureResponse {
                    signature,
                    address: self.keys.address(),
                })
            }
            Ok(PromptDecision::Reject(reason)) => {
                log::info!("signing prompt for {} rejected: {}", digest, reason);
                Err(SigningError::Declined(reason))
            }
            Err(_) => Err(SigningError::Declined("prompt abandoned".into())),
        }
    }
}
