use crate::backend::ImageSelection;
use crate::overlay;
use crate::parking;
use crate::render;
use crate::session::Session;
use crate::views;
use crate::workflow;
use bytes::{Buf, BytesMut};
use futures::{pin_mut, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::Uri;
use warp::multipart::FormData;
use warp::reject::PayloadTooLarge;
use warp::{Filter, Rejection, Reply};

pub const UPLOAD_UNREADABLE: &str = "Could not read the uploaded image.";

#[derive(Debug, Deserialize)]
struct AssignForm {
    plate: String,
}

pub async fn run(session: Arc<Session>, addr: SocketAddr) -> Result<(), failure::Error> {
    let (bound, server) = warp::serve(routes(session))
        .try_bind_ephemeral(addr)
        .map_err(|e| format_err!("Unable to bind {}: {}", addr, e))?;
    info!("Serving operator console on {}", bound);
    server.await;
    Ok(())
}

pub fn routes(
    session: Arc<Session>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let max_upload = session.max_upload_bytes;
    let refusing = session.clone();
    let with_session = warp::any().map(move || session.clone());

    let home = warp::get()
        .and(warp::path::end())
        .and(with_session.clone())
        .and_then(home);
    let upload = warp::post()
        .and(warp::path!("upload"))
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_session.clone())
        .and_then(upload)
        .recover(move |rejection| refuse_oversize(rejection, refusing.clone()));
    let assign = warp::post()
        .and(warp::path!("assign"))
        .and(warp::body::form())
        .and(with_session.clone())
        .and_then(assign);
    let dismiss = warp::post()
        .and(warp::path!("notice" / "dismiss"))
        .and(with_session.clone())
        .and_then(dismiss);
    let toggle = warp::post()
        .and(warp::path!("live" / "toggle"))
        .and(with_session.clone())
        .and_then(toggle_live);
    let live = warp::get()
        .and(warp::path!("live"))
        .and(with_session.clone())
        .and_then(live);
    let stored = warp::get()
        .and(warp::path!("stored"))
        .and(with_session.clone())
        .and_then(stored);
    let registered = warp::get()
        .and(warp::path!("registered"))
        .and(with_session)
        .and_then(registered);

    home.or(upload)
        .or(assign)
        .or(dismiss)
        .or(toggle)
        .or(live)
        .or(stored)
        .or(registered)
}

fn back_home() -> impl Reply {
    warp::redirect::see_other(Uri::from_static("/"))
}

/// Collects the `image` part. An absent or empty part means nothing was selected.
async fn read_selection(mut form: FormData) -> Result<Option<ImageSelection>, warp::Error> {
    let mut selection = None;
    while let Some(part) = form.next().await {
        let part = part?;
        debug!("Got part {}", part.name());
        if part.name() != "image" {
            warn!("Ignoring part {}", part.name());
            continue;
        }
        let file_name = part.filename().unwrap_or("upload").to_string();
        let mut data = BytesMut::new();
        let stream = part.stream();
        pin_mut!(stream);
        while let Some(buf) = stream.next().await {
            data.extend_from_slice(buf?.chunk());
        }
        if !data.is_empty() {
            selection = Some(ImageSelection::new(file_name, data.freeze()));
        }
    }
    Ok(selection)
}

pub fn too_large(max_upload_bytes: u64) -> String {
    format!(
        "Image exceeds the {} byte upload limit.",
        max_upload_bytes
    )
}

/// Turns an oversized upload into a notice on the home page.
async fn refuse_oversize(
    rejection: Rejection,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    if rejection.find::<PayloadTooLarge>().is_none() {
        return Err(rejection);
    }
    session
        .workflow
        .lock()
        .await
        .refuse_upload(too_large(session.max_upload_bytes));
    Ok(back_home())
}

/// Kicks off the upload in the background; the page shows the busy state until it lands.
///
/// The submit gate is applied before replying, so a second post while the
/// first is in flight is ignored.
async fn upload(form: FormData, session: Arc<Session>) -> Result<impl Reply, Infallible> {
    let selection = match read_selection(form).await {
        Ok(selection) => selection,
        Err(e) => {
            error!("Error reading upload form: {}", e);
            session.workflow.lock().await.refuse_upload(UPLOAD_UNREADABLE);
            return Ok(back_home());
        }
    };
    if selection.is_none() {
        info!("Upload submitted without an image");
    }
    if let Some(pending) = workflow::start_submit(&session, selection).await {
        tokio::spawn(async move {
            workflow::finish_submit(&session, pending).await;
        });
    }
    Ok(back_home())
}

async fn assign(form: AssignForm, session: Arc<Session>) -> Result<impl Reply, Infallible> {
    match parking::start_assignment(&session, &form.plate).await {
        Some(assignment) => {
            tokio::spawn(async move {
                parking::finish_assignment(&session, assignment).await;
            });
        }
        None => warn!("Find parking unavailable for plate {}", form.plate),
    }
    Ok(back_home())
}

async fn dismiss(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    session.workflow.lock().await.dismiss_notice();
    Ok(back_home())
}

async fn toggle_live(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    session.live.toggle().await;
    Ok(back_home())
}

/// Renders a full page with the camera feed on top when the live view is on.
async fn full_page(session: &Session, title: &str, refresh: Option<u64>, body: &str) -> String {
    let video_feed_url = if session.live.is_active().await {
        Some(session.backend.video_feed_url())
    } else {
        None
    };
    render::page(title, video_feed_url.as_deref(), refresh, body)
}

async fn home(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    let (body, refresh) = {
        let workflow = session.workflow.lock().await;
        (render::upload_page(&workflow), render::upload_refresh(&workflow))
    };
    Ok(warp::reply::html(
        full_page(&session, "Home", refresh, &body).await,
    ))
}

/// The overlay frame; it reloads itself at the poll period while the view is on.
async fn live(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    let overlay = if session.live.is_active().await {
        Some(overlay::layout(&session.live.allocations().await))
    } else {
        None
    };
    let period = session.live.period().as_secs().max(1);
    Ok(warp::reply::html(render::live_document(overlay.as_ref(), period)))
}

async fn stored(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    let backend = session.backend.clone();
    let listing = session
        .stored
        .view(async move { views::stored_plates(&backend).await })
        .await;
    let body = render::stored_plates(&listing);
    Ok(warp::reply::html(
        full_page(&session, "Stored Plates", render::listing_refresh(&listing), &body).await,
    ))
}

async fn registered(session: Arc<Session>) -> Result<impl Reply, Infallible> {
    let backend = session.backend.clone();
    let listing = session
        .history
        .view(async move { views::history(&backend).await })
        .await;
    let body = render::history(&listing);
    Ok(warp::reply::html(
        full_page(&session, "Registered Cars", render::listing_refresh(&listing), &body).await,
    ))
}
