//! Routing of client messages to engine operations.

use tracing::{debug, warn};

use greenai_core::types::{ConnectionId, RoomId};

use crate::connection::handle::ConnectionHandle;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{clamp_page_limit, validate_room_id};
use crate::server::RealtimeEngine;

impl RealtimeEngine {
    /// Processes one raw text frame from a client.
    ///
    /// Nothing here fails the connection: bad input is answered with an
    /// `error` message and dropped.
    pub async fn handle_inbound(&self, conn_id: ConnectionId, raw: &str) {
        let handle = match self.connection(conn_id) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Message from unknown connection");
                return;
            }
        };
        self.metrics.message_received();

        if let Err(e) = self.rate_limiter.admit(handle.user_id).await {
            self.metrics.event_rate_limited();
            self.send(&handle, OutboundMessage::error("RATE_LIMITED", e.message));
            return;
        }

        let msg = match deserialize_inbound(raw) {
            Ok(msg) => msg,
            Err(e) => {
                self.send(&handle, OutboundMessage::error("INVALID_MESSAGE", e.message));
                return;
            }
        };

        self.touch(&handle);
        debug!(conn_id = %conn_id, kind = msg.kind(), "Inbound message");
        self.dispatch(&handle, msg).await;
    }

    /// Executes a parsed client message.
    pub async fn dispatch(&self, handle: &ConnectionHandle, msg: InboundMessage) {
        match msg {
            InboundMessage::JoinRoom { room_id } => {
                if self.check_room(handle, &room_id) {
                    self.on_join_room(handle.id, &room_id);
                }
            }
            InboundMessage::LeaveRoom { room_id } => {
                if self.check_room(handle, &room_id) {
                    self.on_leave_room(handle.id, &room_id);
                }
            }
            InboundMessage::TypingStart { room_id } => {
                if self.check_room(handle, &room_id) {
                    self.on_typing_start(handle.id, &room_id);
                }
            }
            InboundMessage::TypingStop { room_id } => {
                if self.check_room(handle, &room_id) {
                    self.on_typing_stop(handle.id, &room_id);
                }
            }
            InboundMessage::UpdateStatus { status } => {
                self.set_status(handle.id, status);
            }
            InboundMessage::MarkNotificationRead { notification_id } => {
                match self
                    .notifications
                    .mark_read(handle.user_id, notification_id)
                    .await
                {
                    Ok(updated) => {
                        self.send(
                            handle,
                            OutboundMessage::NotificationRead {
                                notification_id,
                                updated,
                            },
                        );
                    }
                    Err(e) => {
                        warn!(conn_id = %handle.id, error = %e, "Mark read failed");
                        self.send(
                            handle,
                            OutboundMessage::error("NOTIFICATION_ERROR", "Could not update notification"),
                        );
                    }
                }
            }
            InboundMessage::GetNotifications { page, limit } => {
                let page = page.max(1);
                match self
                    .notifications
                    .page(handle.user_id, page, clamp_page_limit(limit))
                    .await
                {
                    Ok(items) => {
                        self.send(handle, OutboundMessage::Notifications { page, items });
                    }
                    Err(e) => {
                        warn!(conn_id = %handle.id, error = %e, "Notification fetch failed");
                        self.send(
                            handle,
                            OutboundMessage::error("NOTIFICATION_ERROR", "Could not load notifications"),
                        );
                    }
                }
            }
            InboundMessage::Pong { .. } => {}
        }
    }

    fn check_room(&self, handle: &ConnectionHandle, room_id: &RoomId) -> bool {
        match validate_room_id(room_id) {
            Ok(()) => true,
            Err(e) => {
                self.send(handle, OutboundMessage::error("INVALID_ROOM", e.message));
                false
            }
        }
    }
}
