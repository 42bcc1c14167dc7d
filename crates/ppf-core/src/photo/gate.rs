//! Capture gating on live-frame quality.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use image::DynamicImage;
use log::{debug, warn};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use super::analysis::{FrameAnalyzer, FrameAssessment};

/// Supplies the frame currently shown by the camera view.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// `None` while no frame is available, e.g. the camera is still starting.
    async fn current_frame(&self) -> Option<DynamicImage>;
}

/// Holds the latest frame assessment and decides whether the capture
/// control is enabled.
#[derive(Debug)]
pub struct CaptureGate {
    min_score: f64,
    latest: watch::Sender<Option<FrameAssessment>>,
}

impl CaptureGate {
    pub fn new(min_score: f64) -> Self {
        let (latest, _) = watch::channel(None);
        Self { min_score, latest }
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Replaces the latest assessment and notifies subscribers.
    pub fn publish(&self, assessment: FrameAssessment) {
        self.latest.send_replace(Some(assessment));
    }

    pub fn latest(&self) -> Option<FrameAssessment> {
        self.latest.borrow().clone()
    }

    /// True once the last assessed frame clears the minimum score.
    pub fn can_capture(&self) -> bool {
        self.latest
            .borrow()
            .as_ref()
            .is_some_and(|a| a.score >= self.min_score)
    }

    /// Receiver for UI updates of the capture control.
    pub fn subscribe(&self) -> watch::Receiver<Option<FrameAssessment>> {
        self.latest.subscribe()
    }
}

/// Periodic frame check. Stops when dropped.
#[derive(Debug)]
pub struct ValidationLoop {
    handle: JoinHandle<()>,
}

impl ValidationLoop {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ValidationLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Re-assesses the live frame every `interval` and publishes the result on
/// `gate`. Analysis runs on the blocking pool.
pub fn spawn_validation_loop(
    gate: Arc<CaptureGate>,
    source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn FrameAnalyzer>,
    interval: Duration,
) -> ValidationLoop {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(frame) = source.current_frame().await else {
                continue;
            };
            let analyzer = Arc::clone(&analyzer);
            match tokio::task::spawn_blocking(move || analyzer.assess(&frame)).await {
                Ok(assessment) => {
                    debug!(
                        "Frame score {:.1}, defects {:?}",
                        assessment.score, assessment.defects
                    );
                    gate.publish(assessment);
                }
                Err(e) => warn!("Frame analysis task failed: {e}"),
            }
        }
    });
    ValidationLoop { handle }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::photo::analysis::SharpnessAnalyzer;

    struct StaticFrame(DynamicImage);

    #[async_trait]
    impl FrameSource for StaticFrame {
        async fn current_frame(&self) -> Option<DynamicImage> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_gate_closed_until_threshold_cleared() {
        let gate = CaptureGate::new(60.0);
        assert!(!gate.can_capture());

        gate.publish(FrameAssessment {
            score: 59.9,
            defects: Vec::new(),
        });
        assert!(!gate.can_capture());

        gate.publish(FrameAssessment {
            score: 60.0,
            defects: Vec::new(),
        });
        assert!(gate.can_capture());
    }

    #[tokio::test]
    async fn test_validation_loop_publishes_assessments() {
        let gate = Arc::new(CaptureGate::new(60.0));
        let mut updates = gate.subscribe();
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([0])));

        let validation = spawn_validation_loop(
            Arc::clone(&gate),
            Arc::new(StaticFrame(frame)),
            Arc::new(SharpnessAnalyzer::default()),
            Duration::from_millis(10),
        );

        updates.changed().await.unwrap();
        let assessment = gate.latest().unwrap();
        assert!(assessment.score < 60.0);
        assert!(!gate.can_capture());
        validation.stop();
    }
}
