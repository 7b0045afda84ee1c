use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::caption::{CaptionContext, CaptionGenerator};
use crate::models::{Face, Reading, SharedSnapshot, Status, StatusSnapshot};
use crate::notifier::{periodic_message, status_message, ImagePolicy, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterState {
    pub last_status: Option<Status>,
    pub last_report_time: DateTime<Local>,
}

/// What a single reading triggered. `Some(ok)` means a notification was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub transition: Option<bool>,
    pub periodic: Option<bool>,
}

pub struct Reporter {
    state: ReporterState,
    report_interval: Duration,
    snapshot: SharedSnapshot,
    notifier: Arc<dyn Notifier>,
    captions: Box<dyn CaptionGenerator>,
    images: ImagePolicy,
}

impl Reporter {
    pub fn new(
        started_at: DateTime<Local>,
        report_interval: Duration,
        snapshot: SharedSnapshot,
        notifier: Arc<dyn Notifier>,
        captions: Box<dyn CaptionGenerator>,
        images: ImagePolicy,
    ) -> Self {
        Self {
            state: ReporterState {
                last_status: None,
                last_report_time: started_at,
            },
            report_interval,
            snapshot,
            notifier,
            captions,
            images,
        }
    }

    pub fn state(&self) -> ReporterState {
        self.state
    }

    pub async fn process(&mut self, reading: Reading, now: DateTime<Local>) -> Outcome {
        let status = Status::classify(reading.percentage);
        let message = status_message(&reading, now);

        self.publish(reading, status, &message, now).await;

        let transition = match self.state.last_status {
            Some(previous) if previous != status => {
                warn!("[CHANGE] moisture {} -> {} ({}%)", previous.as_str(), status.as_str(), reading.percentage);
                let image_url = match status {
                    Status::Sufficient => self.images.image_url(),
                    _ => None,
                };
                Some(self.notifier.send(&message, image_url.as_deref()).await)
            }
            _ => None,
        };

        let periodic = if self.report_due(now) {
            info!("Sending periodic report");
            let text = periodic_message(&reading, now, self.report_interval);
            let sent = self.notifier.send(&text, None).await;
            self.state.last_report_time = now;
            Some(sent)
        } else {
            None
        };

        self.state.last_status = Some(status);

        Outcome { status, transition, periodic }
    }

    fn report_due(&self, now: DateTime<Local>) -> bool {
        let elapsed = (now - self.state.last_report_time).to_std().unwrap_or(Duration::ZERO);
        elapsed >= self.report_interval
    }

    async fn publish(&self, reading: Reading, status: Status, message: &str, now: DateTime<Local>) {
        let character_message = self
            .captions
            .generate(CaptionContext {
                percentage: reading.percentage,
                status: Some(status),
            })
            .await;

        let next = StatusSnapshot {
            percentage: reading.percentage,
            raw_value: reading.raw_value,
            status: Some(status),
            last_update: Some(now),
            message: message.to_string(),
            character_message,
            character_face: Face::from(status),
        };
        info!("Snapshot updated: {}% ({}) | {}", next.percentage, status.as_str(), next.character_message);
        *self.snapshot.write().await = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CannedCaptions;
    use crate::models::shared_snapshot;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, Option<String>)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn failing() -> Self {
            Self { sent: Mutex::default(), fail: true }
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str, image_url: Option<&str>) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), image_url.map(str::to_string)));
            !self.fail
        }
    }

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Local> {
        t0() + chrono::Duration::seconds(n)
    }

    fn reading(percentage: i64) -> Reading {
        Reading { raw_value: percentage * 10, percentage }
    }

    fn no_images() -> ImagePolicy {
        ImagePolicy {
            public_url: "http://localhost:5000".into(),
            image_dir: ".".into(),
            image_name: "missing.png".into(),
        }
    }

    fn reporter(notifier: Arc<RecordingNotifier>, images: ImagePolicy) -> (Reporter, SharedSnapshot) {
        let snapshot = shared_snapshot(StatusSnapshot::starting("hi".into()));
        let reporter = Reporter::new(
            t0(),
            Duration::from_secs(300),
            snapshot.clone(),
            notifier,
            Box::new(CannedCaptions),
            images,
        );
        (reporter, snapshot)
    }

    #[tokio::test]
    async fn first_reading_sets_baseline_without_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, snapshot) = reporter(notifier.clone(), no_images());

        let outcome = reporter.process(reading(10), secs(1)).await;

        assert_eq!(outcome, Outcome { status: Status::Low, transition: None, periodic: None });
        assert_eq!(notifier.count(), 0);
        assert_eq!(reporter.state().last_status, Some(Status::Low));

        let snap = snapshot.read().await;
        assert_eq!(snap.percentage, 10);
        assert_eq!(snap.raw_value, 100);
        assert_eq!(snap.status, Some(Status::Low));
        assert_eq!(snap.character_face, Face::Sad);
        assert_eq!(snap.last_update, Some(secs(1)));
    }

    #[tokio::test]
    async fn one_transition_for_moderate_moderate_low() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        let a = reporter.process(reading(45), secs(1)).await;
        let b = reporter.process(reading(50), secs(2)).await;
        let c = reporter.process(reading(20), secs(3)).await;

        assert_eq!(a.transition, None);
        assert_eq!(b.transition, None);
        assert_eq!(c.transition, Some(true));
        assert_eq!(notifier.count(), 1);
        assert!(notifier.sent.lock().unwrap()[0].0.starts_with("🔴"));
    }

    #[tokio::test]
    async fn periodic_report_without_transition() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        reporter.process(reading(45), secs(10)).await;
        let outcome = reporter.process(reading(47), secs(400)).await;

        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.periodic, Some(true));
        assert_eq!(notifier.count(), 1);
        assert!(notifier.sent.lock().unwrap()[0].0.starts_with("📊 Periodic report"));
        assert_eq!(reporter.state().last_report_time, secs(400));
    }

    #[tokio::test]
    async fn periodic_fires_at_exact_interval_and_then_waits() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        assert_eq!(reporter.process(reading(45), secs(299)).await.periodic, None);
        assert_eq!(reporter.process(reading(45), secs(300)).await.periodic, Some(true));
        assert_eq!(reporter.process(reading(45), secs(599)).await.periodic, None);
        assert_eq!(reporter.process(reading(45), secs(600)).await.periodic, Some(true));
    }

    #[tokio::test]
    async fn transition_and_periodic_can_both_fire() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        reporter.process(reading(45), secs(1)).await;
        let outcome = reporter.process(reading(80), secs(301)).await;

        assert_eq!(outcome.transition, Some(true));
        assert_eq!(outcome.periodic, Some(true));
        assert_eq!(notifier.count(), 2);
    }

    #[tokio::test]
    async fn failed_notification_still_advances_state() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        reporter.process(reading(45), secs(1)).await;
        let outcome = reporter.process(reading(20), secs(302)).await;

        assert_eq!(outcome.transition, Some(false));
        assert_eq!(outcome.periodic, Some(false));
        assert_eq!(reporter.state().last_status, Some(Status::Low));
        assert_eq!(reporter.state().last_report_time, secs(302));

        // Same status again: no retry of the dropped transition.
        let again = reporter.process(reading(22), secs(303)).await;
        assert_eq!(again.transition, None);
        assert_eq!(notifier.count(), 2);
    }

    #[tokio::test]
    async fn boundary_oscillation_notifies_every_crossing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        for (i, p) in [60, 61, 60, 61].into_iter().enumerate() {
            reporter.process(reading(p), secs(i as i64 + 1)).await;
        }
        assert_eq!(notifier.count(), 3);
    }

    #[tokio::test]
    async fn image_attached_only_for_sufficient() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ohana.png"), b"png").unwrap();
        let images = ImagePolicy {
            public_url: "https://plants.example.com".into(),
            image_dir: dir.path().to_path_buf(),
            image_name: "ohana.png".into(),
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), images);

        reporter.process(reading(45), secs(1)).await;
        reporter.process(reading(90), secs(2)).await;
        reporter.process(reading(10), secs(3)).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1.as_deref(), Some("https://plants.example.com/image/ohana.png"));
        assert_eq!(sent[1].1, None);
    }

    #[tokio::test]
    async fn sufficient_without_secure_url_sends_text_only() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut reporter, _) = reporter(notifier.clone(), no_images());

        reporter.process(reading(45), secs(1)).await;
        reporter.process(reading(90), secs(2)).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, None);
    }
}
