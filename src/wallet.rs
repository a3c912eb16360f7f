//! Transaction signer wrapper.
//!
//! This type only signs; it never reads, writes, or persists key material.
//! Callers are responsible for constructing the `Keypair` from whatever
//! external store they use.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};

/// Thin signing handle passed into `OperationTask`. Cloning is cheap: it
/// clones the `Arc`, not the key material.
#[derive(Clone)]
pub struct TransactionSigner {
    keypair: Arc<Keypair>,
}

impl TransactionSigner {
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self { keypair }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }

    pub fn keypair(&self) -> &Arc<Keypair> {
        &self.keypair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_matches_underlying_keypair() {
        let keypair = Arc::new(Keypair::new());
        let signer = TransactionSigner::new(keypair.clone());
        assert_eq!(signer.pubkey(), keypair.pubkey());
    }
}
