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

//! The interface between the adapter and a messaging service.
//!
//! Authentication, transport, and the wire protocol are the responsibility of
//! the [MessagingBackend] implementation. The adapter only uses the operations
//! defined here.

use crate::Result;
use crate::model::{ReceivedMessage, Subscription, Topic};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The operations the adapter requires from a messaging service.
///
/// Implementations must be safe to share between tasks. Listeners registered
/// with [register_message_listener][MessagingBackend::register_message_listener]
/// may be invoked from any thread, including concurrently.
#[async_trait::async_trait]
pub trait MessagingBackend: std::fmt::Debug + Send + Sync {
    /// Returns all the topics visible to this backend.
    async fn list_topics(&self) -> Result<Vec<Topic>>;

    /// Creates a topic with the given short name.
    async fn create_topic(&self, name: &str) -> Result<Topic>;

    /// Returns the subscriptions attached to `topic`.
    async fn list_subscriptions(&self, topic: &Topic) -> Result<Vec<Subscription>>;

    /// Creates a subscription with the given short name on `topic`.
    async fn create_subscription(&self, topic: &Topic, name: &str) -> Result<Subscription>;

    /// Starts delivering the messages of `subscription` to `listener`.
    ///
    /// Delivery continues until the returned handle is dropped or cancelled.
    /// Backends should stop invoking the listener, and release it, soon after
    /// [ListenerHandle::is_cancelled] becomes `true`.
    async fn register_message_listener(
        &self,
        subscription: &Subscription,
        listener: Listener,
    ) -> Result<ListenerHandle>;
}

/// Settles a single message with the backend.
///
/// Backends implement this trait and wrap it in a [Handler] when they deliver
/// a message.
pub trait Acknowledge: std::fmt::Debug + Send {
    /// Acknowledges the message.
    fn ack(self: Box<Self>) -> Result<()>;

    /// Rejects the message, making it available for redelivery.
    fn nack(self: Box<Self>) -> Result<()>;
}

/// A handler for acknowledging or rejecting a message.
#[derive(Debug)]
pub struct Handler {
    inner: Box<dyn Acknowledge>,
}

impl Handler {
    /// Creates a new handler from the backend's implementation.
    pub fn new<T>(inner: T) -> Self
    where
        T: Acknowledge + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Acknowledges the message associated with this handler.
    ///
    /// The acknowledgement is best effort. Even if this succeeds, the message
    /// may be redelivered to this client, or another client.
    pub fn ack(self) -> Result<()> {
        self.inner.ack()
    }

    /// Rejects the message associated with this handler.
    ///
    /// The backend will redeliver this message, possibly to another client.
    pub fn nack(self) -> Result<()> {
        self.inner.nack()
    }
}

/// The callback a backend invokes for each delivered message.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<dyn Fn(ReceivedMessage) + Send + Sync>,
}

impl Listener {
    /// Creates a listener from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ReceivedMessage) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Delivers one message to the listener.
    pub fn deliver(&self, received: ReceivedMessage) {
        (self.inner)(received)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

/// Keeps a listener registered.
///
/// Dropping the handle cancels the registration. Backends observe the
/// cancellation through the token they created the handle with.
#[derive(Debug)]
pub struct ListenerHandle {
    token: CancellationToken,
}

impl ListenerHandle {
    /// Creates a handle that cancels `token` when dropped.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancels the registration.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the registration is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
