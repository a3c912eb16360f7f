//! One-shot per-token setup guard.
//!
//! "Each adapter maintains a `(init_done, current_token_mint)` pair under a
//! mutex; re-initialization is triggered only when `current_token_mint`
//! differs from the request. Double-checked locking is permitted so long as
//! the outer read is under the same lock as the writer's commit."

use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;

use crate::error::EngineResult;

pub struct TokenSetupGuard {
    state: Mutex<(bool, Option<Pubkey>)>,
}

impl Default for TokenSetupGuard {
    fn default() -> Self {
        Self { state: Mutex::new((false, None)) }
    }
}

impl TokenSetupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `setup` only if this is the first call for `mint`, or if the
    /// previously set-up mint differs. The commit (marking init done for
    /// this mint) happens under the same mutex as the read that decided
    /// setup was needed.
    pub async fn ensure<F, Fut>(&self, mint: Pubkey, setup: F) -> EngineResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = EngineResult<()>>,
    {
        {
            let state = self.state.lock();
            if state.0 && state.1 == Some(mint) {
                return Ok(());
            }
        }

        setup().await?;

        let mut state = self.state.lock();
        *state = (true, Some(mint));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_setup_once_for_the_same_mint() {
        let guard = TokenSetupGuard::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mint = Pubkey::new_unique();

        for _ in 0..3 {
            let calls = calls.clone();
            guard
                .ensure(mint, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reruns_setup_when_mint_changes() {
        let guard = TokenSetupGuard::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let mint = Pubkey::new_unique();
            guard
                .ensure(mint, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
