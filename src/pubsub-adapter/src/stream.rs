// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::backend::{Handler, Listener, ListenerHandle};
use crate::model::{Message, ReceivedMessage, Subscription};
use crate::options::SubscribeOptions;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A stream of acknowledged messages from a subscription.
///
/// Every message yielded by this stream has already been acknowledged with the
/// backend. Dropping the stream deregisters its listener.
///
/// `None` represents the end of the stream. In practice the stream stays open
/// until it is dropped, or the backend stops delivering to its listener.
///
/// # Example
/// ```
/// # use pubsub_adapter::stream::MessageStream;
/// # async fn sample(mut stream: MessageStream) {
/// while let Some(m) = stream.next().await {
///     println!("received message m={m:?}");
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct MessageStream {
    subscription: Subscription,
    rx: Receiver,
    _handle: ListenerHandle,
}

impl MessageStream {
    pub(crate) fn new(subscription: Subscription, rx: Receiver, handle: ListenerHandle) -> Self {
        Self {
            subscription,
            rx,
            _handle: handle,
        }
    }

    /// Returns the next message received on the subscription.
    pub async fn next(&mut self) -> Option<Message> {
        std::future::poll_fn(|cx| self.rx.poll_recv(cx)).await
    }

    /// The subscription this stream receives messages from.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl futures::Stream for MessageStream {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Creates the two halves of a bridge from backend callbacks to a stream.
///
/// The listener acknowledges each message before it enters the buffer. If the
/// buffer cannot take the message, the listener nacks it instead.
pub(crate) fn bridge(
    subscription: &Subscription,
    options: &SubscribeOptions,
) -> (Listener, Receiver) {
    let (tx, rx) = match options.max_buffered_messages {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (Sender::Bounded(tx), Receiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Sender::Unbounded(tx), Receiver::Unbounded(rx))
        }
    };
    let subscription = subscription.name.clone();
    let listener = Listener::new(move |received| tx.forward(&subscription, received));
    (listener, rx)
}

#[derive(Debug)]
enum Sender {
    Bounded(mpsc::Sender<Message>),
    Unbounded(mpsc::UnboundedSender<Message>),
}

impl Sender {
    fn forward(&self, subscription: &str, received: ReceivedMessage) {
        let ReceivedMessage { message, handler } = received;
        match self {
            Sender::Bounded(tx) => match tx.try_reserve() {
                Ok(permit) => {
                    ack(subscription, &message, handler);
                    if tx.is_closed() {
                        return discard(subscription, &message);
                    }
                    permit.send(message);
                }
                Err(TrySendError::Full(())) => reject(subscription, &message, handler, "full"),
                Err(TrySendError::Closed(())) => reject(subscription, &message, handler, "closed"),
            },
            Sender::Unbounded(tx) => {
                if tx.is_closed() {
                    return reject(subscription, &message, handler, "closed");
                }
                ack(subscription, &message, handler);
                // The consumer may go away between the check and the send.
                if let Err(mpsc::error::SendError(message)) = tx.send(message) {
                    discard(subscription, &message);
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum Receiver {
    Bounded(mpsc::Receiver<Message>),
    Unbounded(mpsc::UnboundedReceiver<Message>),
}

impl Receiver {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        match self {
            Receiver::Bounded(rx) => rx.poll_recv(cx),
            Receiver::Unbounded(rx) => rx.poll_recv(cx),
        }
    }
}

fn ack(subscription: &str, message: &Message, handler: Handler) {
    if let Err(e) = handler.ack() {
        tracing::warn!(
            subscription,
            message_id = %message.id,
            "ignoring acknowledgement error: {e}"
        );
    }
}

fn discard(subscription: &str, message: &Message) {
    tracing::warn!(
        subscription,
        message_id = %message.id,
        "message acknowledged but the stream is closed, dropping it"
    );
}

fn reject(subscription: &str, message: &Message, handler: Handler, buffer: &str) {
    tracing::debug!(
        subscription,
        message_id = %message.id,
        buffer,
        "cannot buffer message, rejecting it"
    );
    if let Err(e) = handler.nack() {
        tracing::warn!(
            subscription,
            message_id = %message.id,
            "ignoring nack error: {e}"
        );
    }
}
