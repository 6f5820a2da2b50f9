//! Fire-and-forget engagement reporting.
//!
//! Every copy, download, and completed share is posted to the counter API as
//! `{ id, area, event }`. Reporting must never surface an error or hold up
//! the session, so [`HttpReporter::report`] only enqueues:
//!
//! 1. **Beacon**: the event goes onto a channel drained by a detached
//!    delivery task that keeps running after the caller moves on.
//! 2. **One-shot**: if the beacon channel is gone, a detached task is
//!    spawned for this single POST.
//!
//! Delivery failures are logged at debug level and otherwise dropped.

use crate::area::Area;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A counted user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementEvent {
    Share,
    Download,
    Copy,
}

impl EngagementEvent {
    pub const ALL: [EngagementEvent; 3] = [
        EngagementEvent::Share,
        EngagementEvent::Download,
        EngagementEvent::Copy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngagementEvent::Share => "share",
            EngagementEvent::Download => "download",
            EngagementEvent::Copy => "copy",
        }
    }
}

impl fmt::Display for EngagementEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementEvent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngagementEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or(())
    }
}

/// Body of `POST /api/track`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub id: String,
    pub area: String,
    pub event: EngagementEvent,
}

/// Where engagement events go. Implementations must not block or fail.
pub trait EngagementSink {
    fn report(&self, event: EngagementEvent, id: &str, area: Area);
}

/// Sink used when tracking is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl EngagementSink for NoopReporter {
    fn report(&self, event: EngagementEvent, id: &str, area: Area) {
        tracing::trace!(%event, id, %area, "tracking disabled");
    }
}

/// Posts events to the counter API from detached tasks.
pub struct HttpReporter {
    endpoint: String,
    client: reqwest::Client,
    beacon: Option<mpsc::UnboundedSender<TrackEvent>>,
    delivery: Option<JoinHandle<()>>,
}

impl HttpReporter {
    /// Start the delivery task. Must be called inside a tokio runtime.
    pub fn spawn(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let client = reqwest::Client::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<TrackEvent>();
        let task_client = client.clone();
        let task_endpoint = endpoint.clone();
        let delivery = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(&task_client, &task_endpoint, &event).await;
            }
        });
        Self {
            endpoint,
            client,
            beacon: Some(tx),
            delivery: Some(delivery),
        }
    }

    /// Stop accepting events and give queued deliveries up to `grace` to
    /// finish.
    pub async fn close(mut self, grace: Duration) {
        self.beacon = None;
        let Some(delivery) = self.delivery.take() else {
            return;
        };
        if tokio::time::timeout(grace, delivery).await.is_err() {
            tracing::debug!("engagement delivery still pending at shutdown");
        }
    }

    fn one_shot(&self, event: TrackEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(event = %event.event, "no runtime for engagement report, dropped");
            return;
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        runtime.spawn(async move { deliver(&client, &endpoint, &event).await });
    }
}

impl EngagementSink for HttpReporter {
    fn report(&self, event: EngagementEvent, id: &str, area: Area) {
        let event = TrackEvent {
            id: id.to_string(),
            area: area.key().to_string(),
            event,
        };
        let event = match &self.beacon {
            Some(beacon) => match beacon.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };
        self.one_shot(event);
    }
}

async fn deliver(client: &reqwest::Client, endpoint: &str, event: &TrackEvent) {
    match client.post(endpoint).json(event).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::trace!(event = %event.event, id = %event.id, "engagement recorded");
        }
        Ok(resp) => {
            tracing::debug!(status = %resp.status(), event = %event.event, "engagement rejected");
        }
        Err(e) => {
            tracing::debug!(error = %e, event = %event.event, "engagement delivery failed");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    /// Sink that remembers every report, for session and export tests.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: RefCell<Vec<(EngagementEvent, String, Area)>>,
    }

    impl EngagementSink for RecordingSink {
        fn report(&self, event: EngagementEvent, id: &str, area: Area) {
            self.events.borrow_mut().push((event, id.to_string(), area));
        }
    }

    async fn capture_server() -> (String, Arc<Mutex<Vec<TrackEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let app = Router::new().route(
            "/api/track",
            post(move |Json(event): Json<TrackEvent>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(event);
                    "ok"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/api/track"), seen)
    }

    #[test]
    fn event_names_round_trip() {
        for event in EngagementEvent::ALL {
            assert_eq!(event.as_str().parse::<EngagementEvent>(), Ok(event));
        }
        assert!("bogus".parse::<EngagementEvent>().is_err());
        assert_eq!(
            serde_json::to_string(&EngagementEvent::Download).unwrap(),
            "\"download\""
        );
    }

    #[tokio::test]
    async fn beacon_delivers_in_the_background() {
        let (endpoint, seen) = capture_server().await;
        let reporter = HttpReporter::spawn(endpoint);
        reporter.report(EngagementEvent::Copy, "01g5xz8j", Area::Seo);
        reporter.report(EngagementEvent::Share, "01ajqkvc", Area::Brand);
        reporter.close(Duration::from_secs(5)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                TrackEvent {
                    id: "01g5xz8j".into(),
                    area: "seo".into(),
                    event: EngagementEvent::Copy,
                },
                TrackEvent {
                    id: "01ajqkvc".into(),
                    area: "brand".into(),
                    event: EngagementEvent::Share,
                },
            ]
        );
    }

    #[tokio::test]
    async fn closed_beacon_falls_back_to_one_shot() {
        let (endpoint, seen) = capture_server().await;
        let mut reporter = HttpReporter::spawn(endpoint);
        reporter.beacon = None;
        reporter.report(EngagementEvent::Download, "01g5xz8j", Area::Seo);
        for _ in 0..100 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_swallowed() {
        let reporter = HttpReporter::spawn("http://127.0.0.1:9/api/track");
        reporter.report(EngagementEvent::Copy, "01g5xz8j", Area::Seo);
        reporter.close(Duration::from_secs(5)).await;
    }
}
