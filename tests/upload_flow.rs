mod common;

use common::{delayed, ok, status, MockBackend};
use plate_console::backend::ImageSelection;
use plate_console::parking;
use plate_console::workflow::{self, Notice, NoticeKind, Phase};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn selection() -> ImageSelection {
    ImageSelection::new("car.jpg", vec![0xff, 0xd8, 0xff, 0xe0, 0x00])
}

#[tokio::test]
async fn empty_selection_sends_nothing() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    let session = common::session(&mock);

    assert!(!workflow::submit(&session, None).await);
    assert!(!workflow::submit(&session, Some(ImageSelection::new("x.jpg", Vec::new()))).await);

    assert_eq!(mock.hits("upload"), 0);
    let w = session.workflow.lock().await;
    assert_eq!(w.phase(), &Phase::Idle);
    assert!(w.notice().is_none());
}

#[tokio::test]
async fn exit_upload_surfaces_duration() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({
            "plates": [{"text": "ABC123", "image": "aGk="}],
            "notifications": [{"plate": "ABC123", "status": "exit", "duration": "2h"}]
        })),
    );
    let session = common::session(&mock);

    assert!(workflow::submit(&session, Some(selection())).await);
    let w = session.workflow.lock().await;
    assert_eq!(
        w.notice(),
        Some(&Notice::info("Plate ABC123 has exited after 2h"))
    );
    assert!(w.entry_eligible().is_empty());
    assert!(!w.find_parking_enabled("ABC123"));
}

#[tokio::test]
async fn failed_upload_keeps_previous_results() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({"plates": [{"text": "ABC123", "image": "aGk="}]})),
    );
    mock.script("upload", status(500, json!({})));
    let session = common::session(&mock);

    workflow::submit(&session, Some(selection())).await;
    workflow::submit(&session, Some(selection())).await;

    let w = session.workflow.lock().await;
    assert_eq!(w.phase(), &Phase::Failed);
    assert_eq!(w.plates()[0].text, "ABC123");
    assert_eq!(w.notice().unwrap().kind, NoticeKind::Error);
    assert_eq!(w.notice().unwrap().text, "Error processing image.");
}

#[tokio::test]
async fn ineligible_plate_never_reaches_backend() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({
            "plates": [{"text": "XYZ999", "image": "aGk="}, {"text": "ABC123", "image": "aGk="}],
            "notifications": [{"plate": "XYZ999", "status": "entry"}]
        })),
    );
    let session = common::session(&mock);
    workflow::submit(&session, Some(selection())).await;

    {
        let w = session.workflow.lock().await;
        assert!(w.find_parking_enabled("XYZ999"));
        assert!(!w.find_parking_enabled("ABC123"));
    }
    assert!(!parking::find_parking(&session, "ABC123").await);
    assert_eq!(mock.hits("parking-status"), 0);
    assert_eq!(mock.hits("assign-parking"), 0);
}

#[tokio::test]
async fn assignment_fetches_status_then_assigns() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({
            "plates": [{"text": "XYZ999", "image": "aGk="}],
            "allocations": [{"plate_text": "OLD1", "spot_id": "Z1", "coordinates": [0, 0, 5, 5]}],
            "notifications": [{"plate": "XYZ999", "status": "entry"}]
        })),
    );
    mock.script(
        "parking-status",
        ok(json!({"parking_spots": [
            {"spot_id": "A1", "status": "occupied", "assigned_plate": "XYZ999"},
            {"spot_id": "A2", "status": "free"}
        ]})),
    );
    mock.script(
        "assign-parking",
        ok(json!({"assigned_spot": {"spot_id": "A1", "coordinates": {"x": 40, "y": 60}}})),
    );
    let session = common::session(&mock);
    workflow::submit(&session, Some(selection())).await;

    assert!(parking::find_parking(&session, "XYZ999").await);
    assert_eq!(
        mock.order(),
        vec!["upload", "parking-status", "assign-parking"]
    );

    let w = session.workflow.lock().await;
    assert_eq!(
        w.notice(),
        Some(&Notice::success("Spot A1 assigned to plate XYZ999"))
    );
    assert_eq!(w.allocations().len(), 1);
    assert_eq!(w.allocations()[0].plate_text, "XYZ999");
    assert_eq!(w.allocations()[0].position.x, 40.0);
    assert_eq!(w.parking_spots().len(), 2);
    assert!(w.find_parking_enabled("XYZ999"));
}

#[tokio::test]
async fn failed_assignment_still_shows_inventory() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({"notifications": [{"plate": "XYZ999", "status": "entry"}]})),
    );
    mock.script(
        "parking-status",
        ok(json!({"parking_spots": [{"spot_id": "A1", "status": "occupied"}]})),
    );
    mock.script("assign-parking", status(409, json!({"error": "Lot is full"})));
    let session = common::session(&mock);
    workflow::submit(&session, Some(selection())).await;

    parking::find_parking(&session, "XYZ999").await;

    let w = session.workflow.lock().await;
    assert_eq!(w.notice(), Some(&Notice::error("Lot is full")));
    assert_eq!(w.parking_spots()[0].spot_id, "A1");
}

#[tokio::test]
async fn assignment_in_flight_disables_the_plate() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({"notifications": [{"plate": "XYZ999", "status": "entry"}]})),
    );
    mock.script("parking-status", delayed(300, json!({"parking_spots": []})));
    mock.script("assign-parking", ok(json!({"message": "Assigned"})));
    let session = common::session(&mock);
    workflow::submit(&session, Some(selection())).await;

    let background = session.clone();
    let task = tokio::spawn(async move { parking::find_parking(&background, "XYZ999").await });
    sleep(Duration::from_millis(100)).await;
    {
        let w = session.workflow.lock().await;
        assert!(w.is_assigning("XYZ999"));
        assert!(!w.find_parking_enabled("XYZ999"));
    }
    assert!(!parking::find_parking(&session, "XYZ999").await);

    assert!(task.await.unwrap());
    assert_eq!(mock.hits("assign-parking"), 1);
    let w = session.workflow.lock().await;
    assert_eq!(w.notice(), Some(&Notice::success("Assigned")));
}

#[tokio::test]
async fn failed_upload_during_assignment_keeps_it_current() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        ok(json!({"notifications": [{"plate": "XYZ999", "status": "entry"}]})),
    );
    mock.script("upload", status(500, json!({})));
    mock.script("parking-status", delayed(300, json!({"parking_spots": []})));
    mock.script("assign-parking", ok(json!({"message": "No free spots"})));
    let session = common::session(&mock);
    assert!(workflow::submit(&session, Some(selection())).await);

    let background = session.clone();
    let task = tokio::spawn(async move { parking::find_parking(&background, "XYZ999").await });
    sleep(Duration::from_millis(100)).await;
    assert!(session.workflow.lock().await.is_assigning("XYZ999"));

    // Second upload fails while the assignment is still waiting on the backend.
    assert!(workflow::submit(&session, Some(selection())).await);
    assert_eq!(session.workflow.lock().await.phase(), &Phase::Failed);

    assert!(task.await.unwrap());
    assert_eq!(mock.hits("assign-parking"), 1);
    {
        let w = session.workflow.lock().await;
        assert!(!w.has_assignments_in_flight());
        assert!(w.find_parking_enabled("XYZ999"));
        assert_eq!(w.notice(), Some(&Notice::success("No free spots")));
        assert!(plate_console::render::upload_refresh(&w).is_none());
    }

    assert!(parking::find_parking(&session, "XYZ999").await);
    assert_eq!(mock.hits("assign-parking"), 2);
}

#[tokio::test]
async fn later_submission_wins() {
    common::init_logger();
    let mock = Arc::new(MockBackend::default());
    mock.script(
        "upload",
        delayed(
            300,
            json!({
                "plates": [{"text": "FIRST1", "image": "aGk="}],
                "notifications": [{"plate": "FIRST1", "status": "entry"}]
            }),
        ),
    );
    mock.script(
        "upload",
        ok(json!({
            "plates": [{"text": "SECOND", "image": "aGk="}],
            "notifications": [{"plate": "SECOND", "status": "exit", "duration": "1h"}]
        })),
    );
    let session = common::session(&mock);

    let first = session
        .workflow
        .lock()
        .await
        .begin_submit(Some(&selection()))
        .unwrap();
    let background = session.clone();
    let first_task = tokio::spawn(async move {
        let result = background.backend.upload(&selection()).await;
        background
            .workflow
            .lock()
            .await
            .complete_submit(first, result)
    });
    sleep(Duration::from_millis(50)).await;

    let second = session
        .workflow
        .lock()
        .await
        .begin_submit(Some(&selection()))
        .unwrap();
    let result = session.backend.upload(&selection()).await;
    assert!(session
        .workflow
        .lock()
        .await
        .complete_submit(second, result));

    assert!(!first_task.await.unwrap());
    let w = session.workflow.lock().await;
    assert_eq!(w.plates()[0].text, "SECOND");
    assert!(w.entry_eligible().is_empty());
    assert_eq!(
        w.notice(),
        Some(&Notice::info("Plate SECOND has exited after 1h"))
    );
}
