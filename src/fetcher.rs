use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::domain::TVError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Transport,
    Status(u16),
    Malformed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub text: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() || err.is_request() || err.is_redirect() {
            FailureKind::Transport
        } else if err.is_decode() || err.is_body() {
            FailureKind::Malformed
        } else {
            FailureKind::Unknown
        };
        Self::new(kind, err.to_string())
    }
}

pub type Outcome = Result<Value, FetchFailure>;

/// Blocking JSON GET. Runs on worker threads, never on the UI thread.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Outcome;
}

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(server: &str, timeout: Duration) -> Result<Self, TVError> {
        let base = Url::parse(server).map_err(|_| TVError::InvalidServerUrl(server.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn host(&self) -> String {
        match (self.base.host_str(), self.base.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Outcome {
        let target = self
            .base
            .join(url)
            .map_err(|e| FetchFailure::new(FailureKind::Unknown, e.to_string()))?;
        let response = self
            .client
            .get(target)
            .send()
            .map_err(FetchFailure::from_reqwest)?;
        let status = response.status();
        let body = response.text().map_err(FetchFailure::from_reqwest)?;
        if !status.is_success() {
            return Err(FetchFailure::new(
                FailureKind::Status(status.as_u16()),
                body,
            ));
        }
        serde_json::from_str(&body)
            .map_err(|e| FetchFailure::new(FailureKind::Malformed, e.to_string()))
    }
}

/// Applies a completion handler to an outcome.
///
/// The handler returns `true` when it dealt with the outcome itself. When it
/// returns `false` for a failure, the raw error text is handed back so the
/// caller can show it, unless that text is empty or the failure reason is
/// unknown.
pub fn complete<F>(outcome: &Outcome, on_complete: F) -> Option<String>
where
    F: FnOnce(Option<&Value>, Option<&str>) -> bool,
{
    let handled = match outcome {
        Ok(payload) => on_complete(Some(payload), None),
        Err(failure) => on_complete(None, Some(&failure.text)),
    };
    match outcome {
        Err(failure)
            if !handled && !failure.text.is_empty() && failure.kind != FailureKind::Unknown =>
        {
            Some(failure.text.clone())
        }
        _ => None,
    }
}

/// Monotonic request counter shared between an issuer and its tickets.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: Arc<AtomicU64>,
}

impl Sequencer {
    pub fn issue(&self) -> Ticket {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        Ticket {
            seq,
            latest: Arc::clone(&self.latest),
        }
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Whether `ticket` was issued by this sequencer.
    pub fn owns(&self, ticket: &Ticket) -> bool {
        Arc::ptr_eq(&self.latest, &ticket.latest)
    }

    /// Whether `ticket` is the latest one issued by this sequencer.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.owns(ticket) && ticket.seq == self.latest()
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.seq
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Grid(String),
    Action(u64),
    Context(String),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub target: Target,
    pub ticket: Ticket,
    pub url: String,
}

#[derive(Debug)]
pub struct Completion {
    pub target: Target,
    pub ticket: Ticket,
    pub outcome: Outcome,
}

pub trait Dispatch {
    fn dispatch(&self, request: Request);
}

/// Runs requests on worker threads and hands completions back to the thread
/// that polls it.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { transport, tx, rx }
    }

    pub fn poll(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }

    #[cfg(test)]
    pub fn wait(&self, timeout: Duration) -> Option<Completion> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Dispatch for Fetcher {
    fn dispatch(&self, request: Request) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        debug!(
            "Request #{} for {:?}: {}",
            request.ticket.seq(),
            request.target,
            request.url
        );
        thread::spawn(move || {
            let Request {
                target,
                ticket,
                url,
            } = request;
            if ticket.is_superseded() {
                trace!("Skipping superseded request #{} {url}", ticket.seq());
                return;
            }
            let outcome = transport.get(&url);
            if let Err(failure) = &outcome {
                warn!("Request {url} failed: {:?} {}", failure.kind, failure.text);
            }
            // The receiver is gone once the ui shut down.
            let _ = tx.send(Completion {
                target,
                ticket,
                outcome,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedTransport {
        seen: Mutex<Vec<String>>,
        reply: Outcome,
    }

    impl Transport for CannedTransport {
        fn get(&self, url: &str) -> Outcome {
            self.seen.lock().unwrap().push(url.to_string());
            self.reply.clone()
        }
    }

    #[rstest]
    #[case::handled(FailureKind::Status(500), "boom", true, None)]
    #[case::unhandled(FailureKind::Status(500), "boom", false, Some("boom"))]
    #[case::empty_text(FailureKind::Timeout, "", false, None)]
    #[case::unknown_reason(FailureKind::Unknown, "boom", false, None)]
    fn failure_surfacing(
        #[case] kind: FailureKind,
        #[case] text: &str,
        #[case] handled: bool,
        #[case] expected: Option<&str>,
    ) {
        let outcome: Outcome = Err(FetchFailure::new(kind, text));
        let mut seen = None;
        let surfaced = complete(&outcome, |data, err| {
            assert!(data.is_none());
            seen = err.map(str::to_string);
            handled
        });
        assert_eq!(seen.as_deref(), Some(text));
        assert_eq!(surfaced.as_deref(), expected);
    }

    #[test]
    fn success_is_never_surfaced() {
        let outcome: Outcome = Ok(json!({"data": []}));
        let surfaced = complete(&outcome, |data, err| {
            assert!(data.is_some());
            assert!(err.is_none());
            false
        });
        assert_eq!(surfaced, None);
    }

    #[test]
    fn tickets_know_when_they_are_superseded() {
        let sequencer = Sequencer::default();
        let first = sequencer.issue();
        assert!(!first.is_superseded());
        assert!(sequencer.is_current(&first));

        let second = sequencer.issue();
        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert_eq!(second.seq(), first.seq() + 1);

        // Same number, different issuer.
        let other = Sequencer::default();
        let foreign = other.issue();
        let _ = other.issue();
        assert_eq!(foreign.seq(), first.seq());
        assert!(!sequencer.owns(&foreign));
        assert!(!sequencer.is_current(&foreign));
    }

    #[test]
    fn fetcher_delivers_completions_back() {
        let transport = Arc::new(CannedTransport {
            seen: Mutex::new(Vec::new()),
            reply: Ok(json!({"count": 0})),
        });
        let fetcher = Fetcher::new(transport.clone());
        let sequencer = Sequencer::default();
        fetcher.dispatch(Request {
            target: Target::Grid("channels".into()),
            ticket: sequencer.issue(),
            url: "tvd?a=b".into(),
        });

        let completion = fetcher
            .wait(Duration::from_secs(5))
            .expect("completion should arrive");
        assert_eq!(completion.target, Target::Grid("channels".into()));
        assert_eq!(completion.outcome, Ok(json!({"count": 0})));
        assert_eq!(transport.seen.lock().unwrap().as_slice(), ["tvd?a=b"]);
    }

    #[test]
    fn superseded_requests_are_not_sent() {
        let transport = Arc::new(CannedTransport {
            seen: Mutex::new(Vec::new()),
            reply: Ok(json!({})),
        });
        let fetcher = Fetcher::new(transport.clone());
        let sequencer = Sequencer::default();
        let stale = sequencer.issue();
        let _current = sequencer.issue();
        fetcher.dispatch(Request {
            target: Target::Grid("epg".into()),
            ticket: stale,
            url: "old".into(),
        });

        assert!(fetcher.wait(Duration::from_millis(200)).is_none());
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn relative_endpoints_resolve_against_the_server() {
        let transport =
            HttpTransport::new("http://tv.local:7777/", Duration::from_millis(3000)).unwrap();
        assert_eq!(transport.host(), "tv.local:7777");
        assert_eq!(
            transport
                .base
                .join("tvd?c=tvdaemon&a=get_channels")
                .unwrap()
                .as_str(),
            "http://tv.local:7777/tvd?c=tvdaemon&a=get_channels"
        );
    }

    #[test]
    fn invalid_server_is_rejected() {
        assert!(matches!(
            HttpTransport::new("not a url", Duration::from_millis(10)),
            Err(TVError::InvalidServerUrl(_))
        ));
    }
}
