//! User-data stream over WebSocket.
//!
//! The feed yields [`StreamEvent::Ready`] once the socket is connected and
//! then one decoded event per text frame. It ends on a close frame; a socket
//! error or an undecodable frame is yielded as a final error item.

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use log::{debug, warn};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::errors::Error;
use crate::grid::types::StreamEvent;

use super::events::decode_event;

pub type EventFeed = BoxStream<'static, Result<StreamEvent, Error>>;

pub fn stream_url(ws_url: &str, listen_key: &str) -> Result<Url, Error> {
    Ok(Url::parse(&format!("{}/ws/{}", ws_url.trim_end_matches('/'), listen_key))?)
}

/// Connect to the user-data stream authorised by `listen_key`
pub async fn connect_user_stream(ws_url: &str, listen_key: &str) -> Result<EventFeed, Error> {
    let url = stream_url(ws_url, listen_key)?;
    let (socket, _) = connect_async(url.as_str()).await?;
    debug!("User data stream connected");

    let frames = stream::unfold(Some(socket), |state| async move {
        let mut socket = state?;
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return match decode_event(&text) {
                        Ok(event) => Some((Ok(event), Some(socket))),
                        Err(e) => Some((Err(e), None)),
                    };
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!("User data stream closed by server: {:?}", frame);
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some((Err(Error::from(e)), None)),
                None => return None,
            }
        }
    });

    Ok(stream::once(async { Ok(StreamEvent::Ready) }).chain(frames).boxed())
}
