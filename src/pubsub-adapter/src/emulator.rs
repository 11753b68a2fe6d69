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

//! An in-process messaging backend.
//!
//! Use [InMemoryBackend] to run the adapter without a messaging service, for
//! example in tests and samples. It implements the same resource naming and
//! error codes as a managed service, but keeps everything in memory.
//!
//! # Example
//! ```
//! # use pubsub_adapter::PubSubAdapter;
//! # use pubsub_adapter::emulator::InMemoryBackend;
//! # use pubsub_adapter::model::Message;
//! # async fn sample() -> anyhow::Result<()> {
//! let backend = InMemoryBackend::new("my-project");
//! let adapter = PubSubAdapter::from_backend(backend.clone());
//! let mut stream = adapter.subscribe("orders", "worker-1").await?;
//! backend.publish("orders", Message::new().set_data("hello"))?;
//! let m = stream.next().await;
//! println!("received message m={m:?}");
//! # Ok(()) }
//! ```

use crate::backend::{Acknowledge, Handler, Listener, ListenerHandle, MessagingBackend};
use crate::error::{Code, Status};
use crate::model::{Message, ReceivedMessage, Subscription, Topic};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// A [MessagingBackend] that keeps topics, subscriptions, and messages in
/// memory.
///
/// Topics are named `projects/{project}/topics/{name}` and subscriptions
/// `projects/{project}/subscriptions/{name}`. Each published message is copied
/// to every subscription of its topic. A subscription hands its messages to
/// its listeners in turn, or keeps them in a backlog while it has no
/// listeners.
///
/// Rejected (nacked) messages return to the front of the backlog. They are
/// redelivered on the next publish, listener registration, or call to
/// [redeliver][InMemoryBackend::redeliver].
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct InMemoryBackend {
    project: Arc<str>,
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    topics: BTreeMap<String, Topic>,
    subscriptions: BTreeMap<String, SubscriptionState>,
}

#[derive(Debug)]
struct SubscriptionState {
    subscription: Subscription,
    registrations: Vec<Registration>,
    next_listener: usize,
    next_ack_id: u64,
    backlog: VecDeque<Message>,
    // Keyed by ack id, a message may be delivered more than once.
    outstanding: HashMap<String, Message>,
    acknowledged: Vec<String>,
}

#[derive(Debug)]
struct Registration {
    token: CancellationToken,
    listener: Listener,
}

impl SubscriptionState {
    fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            registrations: Vec::new(),
            next_listener: 0,
            next_ack_id: 0,
            backlog: VecDeque::new(),
            outstanding: HashMap::new(),
            acknowledged: Vec::new(),
        }
    }

    fn prune(&mut self) {
        self.registrations.retain(|r| !r.token.is_cancelled());
    }

    /// Moves the backlog into the outstanding set, assigning each message to
    /// a listener in round-robin order.
    fn take_deliveries(&mut self) -> Vec<(Listener, String, Message)> {
        self.prune();
        if self.registrations.is_empty() {
            return Vec::new();
        }
        let mut deliveries = Vec::with_capacity(self.backlog.len());
        while let Some(message) = self.backlog.pop_front() {
            let index = self.next_listener % self.registrations.len();
            self.next_listener = self.next_listener.wrapping_add(1);
            let ack_id = self.next_ack_id.to_string();
            self.next_ack_id = self.next_ack_id.wrapping_add(1);
            self.outstanding.insert(ack_id.clone(), message.clone());
            deliveries.push((self.registrations[index].listener.clone(), ack_id, message));
        }
        deliveries
    }
}

impl InMemoryBackend {
    /// Creates an empty backend for `project`.
    pub fn new<T: Into<String>>(project: T) -> Self {
        let project: String = project.into();
        Self {
            project: project.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// The project that scopes all resource names.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Publishes `message` to `topic`, returning the message id.
    ///
    /// `topic` may be a short or a fully-qualified name. The backend assigns
    /// an id if `message.id` is empty, and always sets the publish time.
    pub fn publish<T: AsRef<str>>(&self, topic: T, message: Message) -> Result<String> {
        let topic = self.topic_name(topic.as_ref());
        let message = if message.id.is_empty() {
            message.set_id(uuid::Uuid::new_v4().to_string())
        } else {
            message
        };
        let message = message.set_publish_time(chrono::Utc::now());
        let id = message.id.clone();

        let targets = {
            let mut state = self.lock();
            if !state.topics.contains_key(&topic) {
                return Err(not_found("topic", &topic));
            }
            let mut targets = Vec::new();
            for (name, sub) in state.subscriptions.iter_mut() {
                if sub.subscription.topic == topic {
                    sub.backlog.push_back(message.clone());
                    targets.push(name.clone());
                }
            }
            targets
        };
        tracing::debug!(
            topic = %topic,
            message_id = %id,
            subscriptions = targets.len(),
            "published message"
        );
        for name in targets {
            self.dispatch(&name);
        }
        Ok(id)
    }

    /// Delivers any messages waiting in the backlog of `subscription`.
    pub fn redeliver<T: AsRef<str>>(&self, subscription: T) {
        let name = self.subscription_name(subscription.as_ref());
        self.dispatch(&name);
    }

    /// The ids of the messages acknowledged on `subscription`, in order.
    ///
    /// The backend keeps every acknowledged id until
    /// [clear_acknowledged][InMemoryBackend::clear_acknowledged] is called.
    pub fn acknowledged<T: AsRef<str>>(&self, subscription: T) -> Vec<String> {
        self.inspect(subscription.as_ref(), |s| s.acknowledged.clone())
            .unwrap_or_default()
    }

    /// Forgets the acknowledged ids of `subscription`, returning them.
    pub fn clear_acknowledged<T: AsRef<str>>(&self, subscription: T) -> Vec<String> {
        let name = self.subscription_name(subscription.as_ref());
        self.lock()
            .subscriptions
            .get_mut(&name)
            .map(|s| std::mem::take(&mut s.acknowledged))
            .unwrap_or_default()
    }

    /// The number of messages delivered on `subscription` and not yet
    /// acknowledged or rejected.
    pub fn outstanding<T: AsRef<str>>(&self, subscription: T) -> usize {
        self.inspect(subscription.as_ref(), |s| s.outstanding.len())
            .unwrap_or_default()
    }

    /// The number of messages on `subscription` waiting for a listener.
    pub fn backlog<T: AsRef<str>>(&self, subscription: T) -> usize {
        self.inspect(subscription.as_ref(), |s| s.backlog.len())
            .unwrap_or_default()
    }

    /// The number of active listeners on `subscription`.
    pub fn listener_count<T: AsRef<str>>(&self, subscription: T) -> usize {
        let name = self.subscription_name(subscription.as_ref());
        let mut state = self.lock();
        state
            .subscriptions
            .get_mut(&name)
            .map(|s| {
                s.prune();
                s.registrations.len()
            })
            .unwrap_or_default()
    }

    fn inspect<F, R>(&self, subscription: &str, f: F) -> Option<R>
    where
        F: FnOnce(&SubscriptionState) -> R,
    {
        let name = self.subscription_name(subscription);
        self.lock().subscriptions.get(&name).map(f)
    }

    fn dispatch(&self, subscription: &str) {
        let deliveries = match self.lock().subscriptions.get_mut(subscription) {
            Some(s) => s.take_deliveries(),
            None => return,
        };
        // Listeners may settle messages synchronously, which needs the lock.
        for (listener, ack_id, message) in deliveries {
            let handler = Handler::new(InMemoryAck {
                backend: self.clone(),
                subscription: subscription.to_string(),
                ack_id,
            });
            listener.deliver(ReceivedMessage { message, handler });
        }
    }

    fn settle(&self, subscription: &str, ack_id: &str, ack: bool) -> Result<()> {
        let mut state = self.lock();
        let sub = state
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| not_found("subscription", subscription))?;
        let message = sub.outstanding.remove(ack_id).ok_or_else(|| {
            Error::service(
                Status::default()
                    .set_code(Code::FailedPrecondition)
                    .set_message(format!(
                        "ack id {ack_id} is not outstanding on {subscription}"
                    )),
            )
        })?;
        if ack {
            sub.acknowledged.push(message.id);
        } else {
            sub.backlog.push_front(message);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn topic_name(&self, name: &str) -> String {
        if name.contains('/') {
            return name.to_string();
        }
        format!("projects/{}/topics/{name}", self.project)
    }

    fn subscription_name(&self, name: &str) -> String {
        if name.contains('/') {
            return name.to_string();
        }
        format!("projects/{}/subscriptions/{name}", self.project)
    }
}

#[async_trait::async_trait]
impl MessagingBackend for InMemoryBackend {
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        Ok(self.lock().topics.values().cloned().collect())
    }

    async fn create_topic(&self, name: &str) -> Result<Topic> {
        validate_id("topic", name)?;
        let topic = Topic::new(self.topic_name(name));
        let mut state = self.lock();
        if state.topics.contains_key(&topic.name) {
            return Err(already_exists("topic", &topic.name));
        }
        state.topics.insert(topic.name.clone(), topic.clone());
        Ok(topic)
    }

    async fn list_subscriptions(&self, topic: &Topic) -> Result<Vec<Subscription>> {
        let state = self.lock();
        if !state.topics.contains_key(&topic.name) {
            return Err(not_found("topic", &topic.name));
        }
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.subscription.topic == topic.name)
            .map(|s| s.subscription.clone())
            .collect())
    }

    async fn create_subscription(&self, topic: &Topic, name: &str) -> Result<Subscription> {
        validate_id("subscription", name)?;
        let subscription = Subscription::new(self.subscription_name(name), topic.name.clone());
        let mut state = self.lock();
        if !state.topics.contains_key(&topic.name) {
            return Err(not_found("topic", &topic.name));
        }
        if state.subscriptions.contains_key(&subscription.name) {
            return Err(already_exists("subscription", &subscription.name));
        }
        state.subscriptions.insert(
            subscription.name.clone(),
            SubscriptionState::new(subscription.clone()),
        );
        Ok(subscription)
    }

    async fn register_message_listener(
        &self,
        subscription: &Subscription,
        listener: Listener,
    ) -> Result<ListenerHandle> {
        let token = CancellationToken::new();
        {
            let mut state = self.lock();
            let sub = state
                .subscriptions
                .get_mut(&subscription.name)
                .ok_or_else(|| not_found("subscription", &subscription.name))?;
            sub.registrations.push(Registration {
                token: token.clone(),
                listener,
            });
        }
        self.dispatch(&subscription.name);
        Ok(ListenerHandle::new(token))
    }
}

#[derive(Debug)]
struct InMemoryAck {
    backend: InMemoryBackend,
    subscription: String,
    ack_id: String,
}

impl Acknowledge for InMemoryAck {
    fn ack(self: Box<Self>) -> Result<()> {
        self.backend
            .settle(&self.subscription, &self.ack_id, true)
    }

    fn nack(self: Box<Self>) -> Result<()> {
        self.backend
            .settle(&self.subscription, &self.ack_id, false)
    }
}

fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') {
        return Err(Error::service(
            Status::default()
                .set_code(Code::InvalidArgument)
                .set_message(format!("invalid {kind} id: {id:?}")),
        ));
    }
    Ok(())
}

fn not_found(kind: &str, name: &str) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::NotFound)
            .set_message(format!("{kind} not found: {name}")),
    )
}

fn already_exists(kind: &str, name: &str) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::AlreadyExists)
            .set_message(format!("{kind} already exists: {name}")),
    )
}
