// =============================================================================
// Dashboard feed — the rendered view pushed over a WebSocket
// =============================================================================
//
// A subscriber gets the view it would read from `/api/v1/dashboard` right
// after the upgrade, then a new copy each time the session re-renders. The
// session's `state_version` is polled every `VIEW_POLL_INTERVAL`; several
// renders between two polls collapse into one frame carrying the latest view.
//
// The feed is one-way. Inbound Ping gets a Pong, Close ends the feed and any
// other frame is dropped.
// =============================================================================

use std::ops::ControlFlow;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app_state::DashboardSession;

const VIEW_POLL_INTERVAL: Duration = Duration::from_millis(500);

type FeedSink = SplitSink<WebSocket, Message>;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(session): State<Arc<DashboardSession>>,
) -> impl IntoResponse {
    debug!("dashboard feed upgrade requested");
    ws.on_upgrade(move |socket| run_feed(socket, session))
}

async fn run_feed(socket: WebSocket, session: Arc<DashboardSession>) {
    let (mut sink, mut inbound) = socket.split();
    let symbol = session.controls().symbol;
    info!(symbol = %symbol, "dashboard feed subscribed");

    let mut pushed_version = session.current_state_version();
    if push_view(&mut sink, &session).await.is_err() {
        return;
    }

    let mut poll = interval(VIEW_POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let flow = tokio::select! {
            _ = poll.tick() => {
                let version = session.current_state_version();
                if version == pushed_version {
                    ControlFlow::Continue(())
                } else {
                    pushed_version = version;
                    match push_view(&mut sink, &session).await {
                        Ok(()) => ControlFlow::Continue(()),
                        Err(()) => ControlFlow::Break(()),
                    }
                }
            }
            frame = inbound.next() => on_inbound(&mut sink, frame).await,
        };

        if flow.is_break() {
            break;
        }
    }

    info!(symbol = %symbol, "dashboard feed closed");
}

async fn on_inbound(
    sink: &mut FeedSink,
    frame: Option<Result<Message, axum::Error>>,
) -> ControlFlow<()> {
    match frame {
        Some(Ok(Message::Ping(payload))) => match sink.send(Message::Pong(payload)).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                debug!(error = %e, "pong not delivered");
                ControlFlow::Break(())
            }
        },
        Some(Ok(Message::Close(_))) | None => ControlFlow::Break(()),
        Some(Ok(_)) => ControlFlow::Continue(()),
        Some(Err(e)) => {
            warn!(error = %e, "dashboard feed read failed");
            ControlFlow::Break(())
        }
    }
}

/// Send the session's current view as one text frame. `Err` means the
/// subscriber is gone.
async fn push_view(sink: &mut FeedSink, session: &DashboardSession) -> Result<(), ()> {
    let view = session.view();
    let json = match serde_json::to_string(&view) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "dashboard view not serialisable, frame skipped");
            return Ok(());
        }
    };

    if let Err(e) = sink.send(Message::Text(json)).await {
        debug!(error = %e, "dashboard feed write failed");
        return Err(());
    }

    let seq = session.ws_sequence_number.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(seq, symbol = %view.symbol, "dashboard view pushed");
    Ok(())
}
