//! Parking assignment for plates that just entered.

use crate::error::ClientError;
use crate::session::Session;
use crate::types::{Allocation, AssignResponse, ParkingSpot};
use crate::workflow::{Notice, Workflow};
use log::{debug, info, warn};

/// Ticket for an assignment in flight, tied to the detection results that offered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    results_generation: u64,
    plate: String,
}

impl Assignment {
    pub fn plate(&self) -> &str {
        &self.plate
    }
}

impl Workflow {
    /// Whether "find parking" is available for `plate`.
    pub fn find_parking_enabled(&self, plate: &str) -> bool {
        self.entry_eligible.contains(plate) && !self.assigning.contains(plate)
    }

    pub fn is_assigning(&self, plate: &str) -> bool {
        self.assigning.contains(plate)
    }

    pub fn has_assignments_in_flight(&self) -> bool {
        !self.assigning.is_empty()
    }

    /// Marks `plate` busy. `None` if the plate is not eligible or already has a request in flight.
    pub fn begin_assignment(&mut self, plate: &str) -> Option<Assignment> {
        if !self.find_parking_enabled(plate) {
            debug!("Find parking unavailable for plate {}", plate);
            return None;
        }
        self.assigning.insert(plate.to_string());
        Some(Assignment {
            results_generation: self.results_generation,
            plate: plate.to_string(),
        })
    }

    /// Merges the spot inventory and the assignment outcome once both have resolved.
    /// Returns false if newer detection results have replaced the ones this
    /// assignment was made for. Uploads that fail or are still in flight leave
    /// the results, and so the assignment, current.
    pub fn complete_assignment(
        &mut self,
        assignment: Assignment,
        spots: Result<Vec<ParkingSpot>, ClientError>,
        outcome: Result<AssignResponse, ClientError>,
    ) -> bool {
        if assignment.results_generation != self.results_generation {
            // Applying the newer results already released every in-flight plate.
            debug!(
                "Discarding assignment for plate {} from results {}",
                assignment.plate, assignment.results_generation
            );
            return false;
        }
        self.assigning.remove(&assignment.plate);

        match spots {
            Ok(spots) => self.parking_spots = spots,
            Err(e) => {
                warn!("Error fetching parking status: {}", e);
                self.parking_spots.clear();
            }
        }

        self.notice = Some(match outcome {
            Ok(AssignResponse {
                assigned_spot: Some(record),
                ..
            }) => {
                let mut allocation = Allocation::from(record);
                if allocation.plate_text.is_empty() {
                    allocation.plate_text = assignment.plate.clone();
                }
                let text = format!(
                    "Spot {} assigned to plate {}",
                    allocation.spot_id, assignment.plate
                );
                info!("{}", text);
                self.allocations = vec![allocation];
                Notice::success(text)
            }
            Ok(AssignResponse {
                message: Some(message),
                ..
            }) => Notice::success(message),
            Ok(_) => failure_notice(&ClientError::Malformed(
                "Assignment response had neither a spot nor a message".to_string(),
            )),
            Err(e) => failure_notice(&e),
        });
        true
    }
}

fn failure_notice(e: &ClientError) -> Notice {
    warn!("Parking assignment failed: {}", e);
    match e.backend_error() {
        Some(error) => Notice::error(error),
        None => Notice::error(format!("Failed to assign parking spot: {}", e)),
    }
}

/// Marks `plate` busy if find parking is available for it.
pub async fn start_assignment(session: &Session, plate: &str) -> Option<Assignment> {
    session.workflow.lock().await.begin_assignment(plate)
}

/// Fetches the spot inventory, then asks for an assignment, then merges both
/// into the workflow.
pub async fn finish_assignment(session: &Session, assignment: Assignment) -> bool {
    let spots = session.backend.parking_status().await;
    let outcome = session.backend.assign_parking(assignment.plate()).await;
    session
        .workflow
        .lock()
        .await
        .complete_assignment(assignment, spots, outcome)
}

/// Requests a spot for `plate`.
///
/// Returns false without touching the network when the action is unavailable for `plate`.
pub async fn find_parking(session: &Session, plate: &str) -> bool {
    match start_assignment(session, plate).await {
        Some(assignment) => finish_assignment(session, assignment).await,
        None => false,
    }
}
