//! HTML for the operator's browser.

use crate::overlay::Overlay;
use crate::types::{Allocation, HistoryRecord, StoredPlate};
use crate::views::Listing;
use crate::workflow::{NoticeKind, Phase, Workflow};
use std::fmt::Write;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn refresh_meta(refresh_secs: Option<u64>) -> String {
    refresh_secs
        .map(|secs| format!(r#"<meta http-equiv="refresh" content="{}">"#, secs))
        .unwrap_or_default()
}

/// A full page. `video_feed_url` is set while the live view is on.
///
/// `refresh_secs` reloads the whole page; the live overlay refreshes itself
/// inside its own frame so a reload never interrupts the operator.
pub fn page(
    title: &str,
    video_feed_url: Option<&str>,
    refresh_secs: Option<u64>,
    body: &str,
) -> String {
    let refresh = refresh_meta(refresh_secs);
    let (toggle_class, toggle_label) = if video_feed_url.is_some() {
        ("btn-danger", "Hide Live Feed")
    } else {
        ("btn-success", "Show Live Feed")
    };
    let live = video_feed_url.map(live_frame).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{refresh}
<title>{title} - PlateVision</title>
</head>
<body>
<nav class="navbar">
<a class="brand" href="/">PlateVision</a>
<a href="/">Home</a>
<a href="/stored">View Stored Plates</a>
<a href="/registered">Registered Cars</a>
<form method="post" action="/live/toggle"><button class="btn {toggle_class}" type="submit">{toggle_label}</button></form>
</nav>
<main>
{live}
{body}
</main>
</body>
</html>
"#,
        refresh = refresh,
        title = escape(title),
        toggle_class = toggle_class,
        toggle_label = toggle_label,
        live = live,
        body = body,
    )
}

/// Camera feed with the `/live` overlay frame stacked on top of it.
fn live_frame(video_feed_url: &str) -> String {
    format!(
        r#"<section class="live"><h5>Live Parking Allocation</h5><div style="position: relative; display: inline-block"><img src="{}" alt="Live camera feed" style="max-width: 100%; border: 1px solid #ddd; display: block"><iframe src="/live" title="Parking allocations" style="position: absolute; left: 0; top: 0; width: 100%; height: 100%; border: 0; background: transparent" allowtransparency="true"></iframe></div></section>"#,
        escape(video_feed_url)
    )
}

/// Allocation markers and the caption beneath them.
pub fn overlay(overlay: &Overlay) -> String {
    let mut html = String::new();
    for marker in &overlay.markers {
        let _ = write!(
            html,
            r#"<div class="marker" style="position: absolute; left: {}px; top: {}px; background-color: rgba(255, 0, 0, 0.7); color: white; padding: 2px 5px; font-weight: bold">{}</div>"#,
            marker.x,
            marker.y,
            escape(&marker.label)
        );
    }
    let (class, caption) = if overlay.is_empty() {
        ("overlay-empty", "No parking allocations currently")
    } else {
        ("overlay-caption", "Current allocations displayed in red")
    };
    let _ = write!(
        html,
        r#"<p class="{}" style="position: absolute; left: 0; bottom: 0; margin: 0; padding: 2px 5px; background-color: rgba(255, 255, 255, 0.8)">{}</p>"#,
        class, caption
    );
    html
}

/// Document served to the overlay frame. It reloads itself every
/// `refresh_secs` while the live view is on; `None` means the view is off.
pub fn live_document(overlay: Option<&Overlay>, refresh_secs: u64) -> String {
    let (refresh, content) = match overlay {
        Some(o) => (refresh_meta(Some(refresh_secs)), self::overlay(o)),
        None => (
            String::new(),
            r#"<p class="live-off">Live feed is off</p>"#.to_string(),
        ),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{}
</head>
<body style="margin: 0; background: transparent">
{}
</body>
</html>
"#,
        refresh, content
    )
}

fn image(base64: &str, alt: &str) -> String {
    format!(
        r#"<img src="data:image/jpeg;base64,{}" alt="{}" style="width: 100%; border: 1px solid #ccc">"#,
        escape(base64),
        escape(alt)
    )
}

fn alert(class: &str, text: &str) -> String {
    format!(r#"<div class="alert alert-{}">{}</div>"#, class, escape(text))
}

fn describe_position(allocation: &Allocation) -> String {
    let p = &allocation.position;
    match p.size {
        Some((w, h)) => format!("(x: {}, y: {}, w: {}, h: {})", p.x, p.y, w, h),
        None => format!("(x: {}, y: {})", p.x, p.y),
    }
}

pub fn upload_page(workflow: &Workflow) -> String {
    let mut html = String::from("<h2>Upload an Image for Plate Detection</h2>");
    let submitting = !workflow.submit_enabled();
    let _ = write!(
        html,
        r#"<form method="post" action="/upload" enctype="multipart/form-data"><input type="file" name="image" accept="image/*" required><button type="submit"{}>{}</button></form>"#,
        if submitting { " disabled" } else { "" },
        if submitting {
            r#"<span class="spinner">Detecting...</span>"#
        } else {
            "Detect Plate"
        }
    );

    if let Some(notice) = workflow.notice() {
        let class = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Success => "success",
            NoticeKind::Error => "danger",
        };
        let _ = write!(
            html,
            r#"<div class="alert alert-{} alert-dismissible">{}<form method="post" action="/notice/dismiss"><button type="submit" class="btn-close" aria-label="Close">&times;</button></form></div>"#,
            class,
            escape(&notice.text)
        );
    }

    if !workflow.plates().is_empty() {
        html.push_str("<h4>Detected Plates:</h4>");
        for (i, plate) in workflow.plates().iter().enumerate() {
            let _ = write!(
                html,
                r#"<div class="card"><h5 class="text-success">Plate Number: {}</h5>{}"#,
                escape(&plate.text),
                image(&plate.image, &format!("Plate {}", i))
            );
            if workflow.entry_eligible().contains(&plate.text) {
                let busy = workflow.is_assigning(&plate.text);
                let _ = write!(
                    html,
                    r#"<form method="post" action="/assign"><input type="hidden" name="plate" value="{}"><button type="submit"{}>{}</button></form>"#,
                    escape(&plate.text),
                    if workflow.find_parking_enabled(&plate.text) { "" } else { " disabled" },
                    if busy { "Finding parking..." } else { "Find Parking" }
                );
            }
            html.push_str("</div>");
        }
    }

    if !workflow.allocations().is_empty() {
        html.push_str("<h4>Parking Spot Allocations:</h4>");
        for (i, allocation) in workflow.allocations().iter().enumerate() {
            let _ = write!(
                html,
                r#"<div class="card"><h5 class="text-warning">Spot {} allocated: {}</h5><p>Spot Coordinates: {}</p>"#,
                escape(&allocation.spot_id),
                escape(&allocation.plate_text),
                describe_position(allocation)
            );
            if let Some(img) = &allocation.image {
                html.push_str(&image(img, &format!("Allocated Spot {}", i)));
            }
            html.push_str("</div>");
        }
    }

    if !workflow.parking_spots().is_empty() {
        html.push_str("<h4>Parking Spots:</h4><table><tr><th>Spot</th><th>Status</th><th>Plate</th></tr>");
        for spot in workflow.parking_spots() {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&spot.spot_id),
                escape(&spot.status),
                escape(spot.assigned_plate.as_deref().unwrap_or("-"))
            );
        }
        html.push_str("</table>");
    }
    html
}

pub fn stored_plates(listing: &Listing<StoredPlate>) -> String {
    let mut html = String::from("<h2>Stored Plate Numbers</h2>");
    match listing {
        Listing::Loading => html.push_str(r#"<div class="spinner">Loading...</div>"#),
        Listing::Failed(message) => html.push_str(&alert("danger", message)),
        Listing::Empty => html.push_str(&alert("info", "No stored plates available.")),
        Listing::Loaded(plates) => {
            for (i, plate) in plates.iter().enumerate() {
                let _ = write!(
                    html,
                    r#"<div class="card"><p><strong>Plate:</strong> {}</p>"#,
                    escape(&plate.text)
                );
                if let Some(spot) = &plate.parking_spot {
                    let _ = write!(html, "<p><strong>Spot:</strong> {}</p>", escape(spot));
                }
                if let Some(ts) = &plate.timestamp {
                    let _ = write!(html, "<p><strong>Since:</strong> {}</p>", escape(ts));
                }
                if let Some(img) = plate.image.as_deref().filter(|s| !s.is_empty()) {
                    html.push_str(&image(img, &format!("Plate {}", i)));
                }
                html.push_str("</div>");
            }
        }
    }
    html
}

pub fn history(listing: &Listing<HistoryRecord>) -> String {
    let mut html = String::from("<h2>Entry/Exit History</h2>");
    match listing {
        Listing::Loading => html.push_str(r#"<div class="spinner">Loading...</div>"#),
        Listing::Failed(message) => html.push_str(&alert("danger", message)),
        Listing::Empty => html.push_str(&alert("info", "No entry/exit logs found.")),
        Listing::Loaded(records) => {
            for record in records {
                let _ = write!(
                    html,
                    r#"<div class="card"><p><strong>Plate:</strong> {}<br><strong>Status:</strong> {}<br><strong>Time:</strong> {}</p>"#,
                    escape(&record.text),
                    escape(&record.status.to_uppercase()),
                    escape(&record.timestamp)
                );
                if let Some(img) = record.image.as_deref().filter(|s| !s.is_empty()) {
                    html.push_str(&image(img, &format!("Plate {}", record.text)));
                }
                html.push_str("</div>");
            }
        }
    }
    html
}

/// Refresh interval for the upload page: short while work is in flight.
pub fn upload_refresh(workflow: &Workflow) -> Option<u64> {
    if *workflow.phase() == Phase::Submitting || workflow.has_assignments_in_flight() {
        Some(1)
    } else {
        None
    }
}

/// Refresh interval for a listing page: reload until the fetch has landed.
pub fn listing_refresh<T>(listing: &Listing<T>) -> Option<u64> {
    match listing {
        Listing::Loading => Some(1),
        _ => None,
    }
}
