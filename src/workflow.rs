//! Detection/upload workflow.
//!
//! Every submission bumps a generation counter and gets a [`Submission`]
//! ticket carrying it. A response is only applied when its ticket still
//! matches, so a late answer to a superseded submission is dropped.
//! Applied results carry their own counter; assignments are tied to that one.

use crate::backend::ImageSelection;
use crate::error::ClientError;
use crate::session::Session;
use crate::types::{
    Allocation, DetectedPlate, Notification, ParkingSpot, PresenceStatus, UploadResponse,
};
use log::{debug, info, warn};
use std::collections::BTreeSet;

pub const UPLOAD_FAILED: &str = "Error processing image.";

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Submitting,
    /// The last upload succeeded; holds the notification surfaced for it, if any.
    Detected(Option<Notification>),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// The one dismissible message shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Ticket for an upload in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub(crate) generation: u64,
}

#[derive(Debug)]
pub struct Workflow {
    pub(crate) generation: u64,
    /// Bumped only when a detection result is applied.
    pub(crate) results_generation: u64,
    pub(crate) phase: Phase,
    pub(crate) plates: Vec<DetectedPlate>,
    pub(crate) allocations: Vec<Allocation>,
    pub(crate) parking_spots: Vec<ParkingSpot>,
    pub(crate) entry_eligible: BTreeSet<String>,
    pub(crate) assigning: BTreeSet<String>,
    pub(crate) notice: Option<Notice>,
}

impl Default for Workflow {
    fn default() -> Self {
        Workflow::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Workflow {
            generation: 0,
            results_generation: 0,
            phase: Phase::Idle,
            plates: vec![],
            allocations: vec![],
            parking_spots: vec![],
            entry_eligible: BTreeSet::new(),
            assigning: BTreeSet::new(),
            notice: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn plates(&self) -> &[DetectedPlate] {
        &self.plates
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn parking_spots(&self) -> &[ParkingSpot] {
        &self.parking_spots
    }

    pub fn entry_eligible(&self) -> &BTreeSet<String> {
        &self.entry_eligible
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Whether the submit control is enabled. It is disabled, not queued, while an upload is in flight.
    pub fn submit_enabled(&self) -> bool {
        self.phase != Phase::Submitting
    }

    /// Starts a new submission, superseding any earlier one still in flight.
    ///
    /// Returns `None` and leaves the state untouched when no file is selected.
    pub fn begin_submit(&mut self, selection: Option<&ImageSelection>) -> Option<Submission> {
        match selection {
            Some(s) if !s.bytes.is_empty() => {}
            _ => {
                debug!("Submit without an image selection; ignoring");
                return None;
            }
        }
        self.generation += 1;
        self.phase = Phase::Submitting;
        self.notice = None;
        Some(Submission {
            generation: self.generation,
        })
    }

    /// Applies the outcome of `submission`. Returns false if a newer submission superseded it.
    pub fn complete_submit(
        &mut self,
        submission: Submission,
        result: Result<UploadResponse, ClientError>,
    ) -> bool {
        if submission.generation != self.generation {
            debug!(
                "Discarding upload result for generation {} (current {})",
                submission.generation, self.generation
            );
            return false;
        }
        match result {
            Ok(response) => self.apply_detection(response),
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.phase = Phase::Failed;
                self.notice = Some(Notice::error(UPLOAD_FAILED));
            }
        }
        true
    }

    /// Shows why an upload never left the console; prior results stay.
    pub fn refuse_upload(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Upload refused: {}", reason);
        self.notice = Some(Notice::error(reason));
    }

    fn apply_detection(&mut self, response: UploadResponse) {
        self.results_generation += 1;
        self.plates = response.plates;
        self.allocations = response
            .allocations
            .into_iter()
            .map(Allocation::from)
            .collect();
        self.parking_spots.clear();
        self.entry_eligible.clear();
        self.assigning.clear();

        // Only the first notification is surfaced.
        let notification = response.notifications.into_iter().next();
        self.notice = notification.as_ref().map(|n| Notice::info(n.message()));
        if let Some(n) = &notification {
            info!("{}", n.message());
            if n.status == PresenceStatus::Entry {
                self.entry_eligible.insert(n.plate.clone());
            }
        }
        self.phase = Phase::Detected(notification);
    }
}

/// An upload that passed the submit gate and still has to go out.
#[derive(Debug)]
pub struct PendingUpload {
    submission: Submission,
    selection: ImageSelection,
}

/// Applies the submit gate. `None` when nothing is selected or an upload is
/// already in flight; otherwise the workflow is `Submitting` on return.
pub async fn start_submit(
    session: &Session,
    selection: Option<ImageSelection>,
) -> Option<PendingUpload> {
    let mut workflow = session.workflow.lock().await;
    if !workflow.submit_enabled() {
        info!("Upload already in progress; ignoring submit");
        return None;
    }
    let submission = workflow.begin_submit(selection.as_ref())?;
    selection.map(|selection| PendingUpload {
        submission,
        selection,
    })
}

/// Sends a started upload and folds the response into the workflow.
pub async fn finish_submit(session: &Session, pending: PendingUpload) -> bool {
    let result = session.backend.upload(&pending.selection).await;
    session
        .workflow
        .lock()
        .await
        .complete_submit(pending.submission, result)
}

/// Uploads `selection` and folds the response into the session's workflow.
///
/// Returns false without touching the network when nothing is selected or an
/// upload is already in flight.
pub async fn submit(session: &Session, selection: Option<ImageSelection>) -> bool {
    match start_submit(session, selection).await {
        Some(pending) => finish_submit(session, pending).await,
        None => false,
    }
}
