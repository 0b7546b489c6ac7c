use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{error::BuildError, AuthRequest, Error, Result, Strategy};

/// Several strategies tried in order until one succeeds.
///
/// Strategies after the first success are not evaluated. When all of them
/// fail the result is [`Error::AuthenticationFailed`]; the individual errors
/// are only logged.
#[derive(Clone)]
pub struct Composed {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl fmt::Debug for Composed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composed")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

impl Composed {
    /// Composes the given strategies, which must not be empty.
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> std::result::Result<Self, BuildError> {
        if strategies.is_empty() {
            return Err(BuildError::NoStrategies);
        }

        Ok(Self { strategies })
    }
}

#[async_trait]
impl Strategy for Composed {
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        for (position, strategy) in self.strategies.iter().enumerate() {
            match strategy.authenticate(request).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::debug!(position, kind = ?err.kind(), "strategy failed: {err}");
                }
            }
        }

        Err(Error::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{body::Bytes, http::Request};

    use super::*;
    use crate::{from_fn, ErrorKind};

    fn request() -> AuthRequest {
        Request::builder().body(Bytes::new()).unwrap()
    }

    fn succeeds() -> Arc<dyn Strategy> {
        Arc::new(from_fn(|_| Ok(())))
    }

    fn fails() -> Arc<dyn Strategy> {
        Arc::new(from_fn(|_| Err(Error::CredentialsMissing)))
    }

    fn counted(calls: &Arc<AtomicUsize>) -> Arc<dyn Strategy> {
        let calls = calls.clone();
        Arc::new(from_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    #[tokio::test]
    async fn second_succeeds() {
        let composed = Composed::new(vec![fails(), succeeds()]).unwrap();
        composed.authenticate(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn all_fail() {
        let composed = Composed::new(vec![
            fails(),
            Arc::new(from_fn(|_| Err(Error::Rejected(eyre::eyre!("nope"))))),
        ])
        .unwrap();

        let err = composed.authenticate(&request()).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed));
        assert_eq!(err.kind(), ErrorKind::CompositionExhausted);
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composed = Composed::new(vec![succeeds(), counted(&calls)]).unwrap();

        composed.authenticate(&request()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tried_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composed = Composed::new(vec![fails(), counted(&calls), counted(&calls)]).unwrap();

        composed.authenticate(&request()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nested() {
        let inner: Arc<dyn Strategy> = Arc::new(Composed::new(vec![fails(), fails()]).unwrap());
        let composed = Composed::new(vec![inner, succeeds()]).unwrap();
        composed.authenticate(&request()).await.unwrap();
    }

    #[test]
    fn empty() {
        assert_eq!(
            Composed::new(Vec::new()).unwrap_err(),
            BuildError::NoStrategies
        );
    }
}
