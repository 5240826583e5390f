//! Tests for strategy ordering and fallback with stub strategies.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use terabox_link::error::{ResolveError, Result};
use terabox_link::strategy::ShareLinkGenerator;
use terabox_link::{
    CancellationToken, ResolutionChain, ResolutionStrategy, ResolveRequest, ResolvedFile,
    ResolverConfig, ShareReference, StrategyContext,
};

type CallLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone)]
enum Behavior {
    Decline,
    TransportFailure,
    Resolve(&'static str),
}

struct StubStrategy {
    name: &'static str,
    needs_credentials: bool,
    behavior: Behavior,
    log: CallLog,
}

#[async_trait]
impl ResolutionStrategy for StubStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn requires_credentials(&self) -> bool {
        self.needs_credentials
    }

    async fn attempt(
        &self,
        _share: &ShareReference,
        _ctx: &StrategyContext<'_>,
    ) -> Result<Option<ResolvedFile>> {
        self.log.lock().unwrap().push(self.name);
        match &self.behavior {
            Behavior::Decline => Ok(None),
            Behavior::TransportFailure => Err(ResolveError::NetworkError("timed out".to_string())),
            Behavior::Resolve(filename) => Ok(Some(ResolvedFile {
                filename: filename.to_string(),
                size_bytes: Some(10),
                direct_link: format!("https://d/{}", filename),
            })),
        }
    }
}

fn stub(name: &'static str, needs_credentials: bool, behavior: Behavior, log: &CallLog) -> Box<dyn ResolutionStrategy> {
    Box::new(StubStrategy {
        name,
        needs_credentials,
        behavior,
        log: Arc::clone(log),
    })
}

fn chain(auth: Behavior, public: Behavior, bypass: Behavior, log: &CallLog) -> ResolutionChain {
    let links = ShareLinkGenerator::new(Client::new(), Arc::new(ResolverConfig::default()));
    ResolutionChain::new(
        vec![
            stub("authenticated", true, auth, log),
            stub("public", false, public, log),
            stub("bypass", false, bypass, log),
        ],
        links,
    )
}

fn share() -> ShareReference {
    ShareReference::new("https://www.terabox.com/s/1abc", "abc").unwrap()
}

fn calls(log: &CallLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

mod ordering {
    use super::*;

    #[tokio::test]
    async fn falls_through_in_priority_order() {
        let log = CallLog::default();
        let chain = chain(Behavior::Decline, Behavior::Decline, Behavior::Resolve("b.mp4"), &log);
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: Some("ndus=secret"),
            auth: None,
            cancel: &cancel,
        };

        let file = chain.resolve(&share(), &request).await.unwrap();

        assert_eq!(file.filename, "b.mp4");
        assert_eq!(calls(&log), vec!["authenticated", "public", "bypass"]);
    }

    #[tokio::test]
    async fn skips_authenticated_without_credentials() {
        let log = CallLog::default();
        let chain = chain(Behavior::Resolve("a.mp4"), Behavior::Decline, Behavior::Resolve("b.mp4"), &log);
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: None,
            auth: None,
            cancel: &cancel,
        };

        let file = chain.resolve(&share(), &request).await.unwrap();

        assert_eq!(file.filename, "b.mp4");
        assert_eq!(calls(&log), vec!["public", "bypass"]);
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let log = CallLog::default();
        let chain = chain(Behavior::Decline, Behavior::Resolve("p.mp4"), Behavior::Resolve("b.mp4"), &log);
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: Some("ndus=secret"),
            auth: None,
            cancel: &cancel,
        };

        let file = chain.resolve(&share(), &request).await.unwrap();

        assert_eq!(file.filename, "p.mp4");
        assert_eq!(calls(&log), vec!["authenticated", "public"]);
    }

    #[tokio::test]
    async fn transport_failure_is_not_fatal() {
        let log = CallLog::default();
        let chain = chain(
            Behavior::TransportFailure,
            Behavior::TransportFailure,
            Behavior::Resolve("b.mp4"),
            &log,
        );
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: Some("ndus=secret"),
            auth: None,
            cancel: &cancel,
        };

        let file = chain.resolve(&share(), &request).await.unwrap();
        assert_eq!(file.filename, "b.mp4");
        assert_eq!(calls(&log).len(), 3);
    }

    #[tokio::test]
    async fn fourth_strategy_runs_last() {
        let log = CallLog::default();
        let chain = chain(Behavior::Decline, Behavior::Decline, Behavior::Decline, &log)
            .with_strategy(stub("mirror", false, Behavior::Resolve("m.mp4"), &log));
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: None,
            auth: None,
            cancel: &cancel,
        };

        assert_eq!(chain.strategy_names(), vec!["authenticated", "public", "bypass", "mirror"]);
        let file = chain.resolve(&share(), &request).await.unwrap();
        assert_eq!(file.filename, "m.mp4");
        assert_eq!(calls(&log), vec!["public", "bypass", "mirror"]);
    }
}

mod exhaustion {
    use super::*;

    #[tokio::test]
    async fn all_declined_is_exhaustion() {
        let log = CallLog::default();
        let chain = chain(Behavior::Decline, Behavior::Decline, Behavior::Decline, &log);
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: Some("ndus=secret"),
            auth: None,
            cancel: &cancel,
        };

        let err = chain.resolve(&share(), &request).await.unwrap_err();
        assert!(matches!(err, ResolveError::AllStrategiesExhausted));
        assert_eq!(calls(&log).len(), 3);
    }

    #[tokio::test]
    async fn mixed_failures_are_exhaustion() {
        let log = CallLog::default();
        let chain = chain(Behavior::Decline, Behavior::TransportFailure, Behavior::Decline, &log);
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: None,
            auth: None,
            cancel: &cancel,
        };

        let err = chain.resolve(&share(), &request).await.unwrap_err();
        assert!(matches!(err, ResolveError::AllStrategiesExhausted));
    }

    #[tokio::test]
    async fn only_transport_failures_is_exhaustion() {
        let log = CallLog::default();
        let chain = chain(
            Behavior::TransportFailure,
            Behavior::TransportFailure,
            Behavior::TransportFailure,
            &log,
        );
        let cancel = CancellationToken::new();
        let request = ResolveRequest {
            credentials: None,
            auth: None,
            cancel: &cancel,
        };

        let err = chain.resolve(&share(), &request).await.unwrap_err();
        assert!(matches!(err, ResolveError::AllStrategiesExhausted));
        assert_eq!(calls(&log).len(), 2);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancelled_before_first_attempt() {
        let log = CallLog::default();
        let chain = chain(Behavior::Resolve("a"), Behavior::Resolve("p"), Behavior::Resolve("b"), &log);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = ResolveRequest {
            credentials: Some("ndus=secret"),
            auth: None,
            cancel: &cancel,
        };

        let err = chain.resolve(&share(), &request).await.unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled));
        assert!(calls(&log).is_empty());
    }
}
