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

use crate::backend::MessagingBackend;
use crate::error::Code;
use crate::model::{Message, Subscription, Topic};
use crate::options::SubscribeOptions;
use crate::stream::{self, MessageStream};
use crate::{Error, Result};
use futures::stream::BoxStream;
use futures::{StreamExt as _, TryStreamExt as _};
use std::sync::Arc;

/// Maps "subscribe to a topic/subscription pair" requests onto a messaging
/// backend.
///
/// The adapter creates the topic and subscription if they do not exist, and
/// then streams the messages delivered to the subscription. Each message is
/// acknowledged as soon as the backend delivers it.
///
/// # Example
/// ```
/// # use pubsub_adapter::PubSubAdapter;
/// # use pubsub_adapter::emulator::InMemoryBackend;
/// # async fn sample() -> anyhow::Result<()> {
/// let adapter = PubSubAdapter::from_backend(InMemoryBackend::new("my-project"));
/// let mut stream = adapter.subscribe("orders", "worker-1").await?;
/// while let Some(m) = stream.next().await {
///     println!("received message m={m:?}");
/// }
/// # Ok(()) }
/// ```
///
/// # Pooling and Cloning
///
/// `PubSubAdapter` holds the backend in an [Arc], cloning it is cheap and all
/// the clones share the same backend.
#[derive(Clone, Debug)]
pub struct PubSubAdapter {
    inner: Arc<dyn MessagingBackend>,
    options: SubscribeOptions,
}

impl PubSubAdapter {
    /// Returns a builder for [PubSubAdapter].
    ///
    /// # Example
    /// ```
    /// # use pubsub_adapter::PubSubAdapter;
    /// # use pubsub_adapter::emulator::InMemoryBackend;
    /// let adapter = PubSubAdapter::builder(InMemoryBackend::new("my-project"))
    ///     .with_max_buffered_messages(100)
    ///     .build();
    /// ```
    pub fn builder<T>(backend: T) -> AdapterBuilder
    where
        T: MessagingBackend + 'static,
    {
        AdapterBuilder::new(Arc::new(backend))
    }

    /// Creates an adapter with the default options.
    pub fn from_backend<T>(backend: T) -> Self
    where
        T: MessagingBackend + 'static,
    {
        Self::builder(backend).build()
    }

    /// The options used by [subscribe][Self::subscribe].
    pub fn options(&self) -> &SubscribeOptions {
        &self.options
    }

    /// Finds the topic whose short name is exactly `name`.
    ///
    /// The short name is the last segment of the fully-qualified topic name.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_topic(&self, name: &str) -> Result<Option<Topic>> {
        let topics = self.inner.list_topics().await?;
        Ok(topics.into_iter().find(|t| t.short_name() == name))
    }

    /// Creates a topic named `name`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn create_topic(&self, name: &str) -> Result<Topic> {
        self.inner.create_topic(name).await
    }

    /// Returns the topic named `name`, creating it if needed.
    ///
    /// Two callers may race to create the same topic. If the backend rejects
    /// the creation because the topic already exists, the existing topic is
    /// returned.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn ensure_topic(&self, name: &str) -> Result<Topic> {
        if let Some(topic) = self.get_topic(name).await? {
            return Ok(topic);
        }
        match self.create_topic(name).await {
            Ok(topic) => {
                tracing::debug!(topic = %topic.name, "created topic");
                Ok(topic)
            }
            Err(e) if e.code() == Some(Code::AlreadyExists) => {
                self.get_topic(name).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Finds the subscription on `topic` whose name ends with `name`.
    ///
    /// Unlike [get_topic][Self::get_topic] this is a plain suffix match on the
    /// fully-qualified name, and not limited to its last segment.
    #[tracing::instrument(level = "debug", skip(self, topic), fields(topic = %topic.name))]
    pub async fn get_subscription(
        &self,
        topic: &Topic,
        name: &str,
    ) -> Result<Option<Subscription>> {
        let subscriptions = self.inner.list_subscriptions(topic).await?;
        Ok(subscriptions.into_iter().find(|s| s.name.ends_with(name)))
    }

    /// Creates a subscription named `name` on `topic`.
    #[tracing::instrument(level = "debug", skip(self, topic), fields(topic = %topic.name))]
    pub async fn create_subscription(&self, topic: &Topic, name: &str) -> Result<Subscription> {
        self.inner.create_subscription(topic, name).await
    }

    /// Returns the subscription named `name` on `topic`, creating it if
    /// needed.
    ///
    /// Lost creation races are resolved as in
    /// [ensure_topic][Self::ensure_topic].
    #[tracing::instrument(level = "debug", skip(self, topic), fields(topic = %topic.name))]
    pub async fn ensure_subscription(&self, topic: &Topic, name: &str) -> Result<Subscription> {
        if let Some(subscription) = self.get_subscription(topic, name).await? {
            return Ok(subscription);
        }
        match self.create_subscription(topic, name).await {
            Ok(subscription) => {
                tracing::debug!(subscription = %subscription.name, "created subscription");
                Ok(subscription)
            }
            Err(e) if e.code() == Some(Code::AlreadyExists) => {
                self.get_subscription(topic, name).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Ensures the topic and subscription exist, then starts receiving
    /// messages.
    ///
    /// The returned stream yields each message after it is acknowledged. If
    /// resolving the topic or subscription fails no listener is registered,
    /// and the error is returned.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn subscribe(&self, topic: &str, subscription: &str) -> Result<MessageStream> {
        let topic = self.ensure_topic(topic).await?;
        let subscription = self.ensure_subscription(&topic, subscription).await?;
        let (listener, rx) = stream::bridge(&subscription, &self.options);
        let handle = self
            .inner
            .register_message_listener(&subscription, listener)
            .await?;
        tracing::debug!(subscription = %subscription.name, "listening for messages");
        Ok(MessageStream::new(subscription, rx, handle))
    }

    /// The lazy form of [subscribe][Self::subscribe].
    ///
    /// Nothing happens until the stream is first polled. If the topic or
    /// subscription cannot be resolved the stream yields that error and ends.
    ///
    /// # Example
    /// ```
    /// # use pubsub_adapter::PubSubAdapter;
    /// # async fn sample(adapter: PubSubAdapter) -> anyhow::Result<()> {
    /// use futures::StreamExt as _;
    /// let mut stream = adapter.subscribe_stream("orders", "worker-1");
    /// while let Some(m) = stream.next().await.transpose()? {
    ///     println!("received message m={m:?}");
    /// }
    /// # Ok(()) }
    /// ```
    pub fn subscribe_stream<T, S>(
        &self,
        topic: T,
        subscription: S,
    ) -> BoxStream<'static, Result<Message>>
    where
        T: Into<String>,
        S: Into<String>,
    {
        let adapter = self.clone();
        let topic = topic.into();
        let subscription = subscription.into();
        futures::stream::once(async move { adapter.subscribe(&topic, &subscription).await })
            .map_ok(|s| s.map(Ok::<Message, Error>))
            .try_flatten()
            .boxed()
    }
}

/// A builder for [PubSubAdapter].
///
/// # Example
/// ```
/// # use pubsub_adapter::PubSubAdapter;
/// # use pubsub_adapter::emulator::InMemoryBackend;
/// # use pubsub_adapter::options::SubscribeOptions;
/// let adapter = PubSubAdapter::builder(InMemoryBackend::new("my-project"))
///     .with_subscribe_options(SubscribeOptions::new().set_max_buffered_messages(10_usize))
///     .build();
/// ```
#[derive(Debug)]
pub struct AdapterBuilder {
    inner: Arc<dyn MessagingBackend>,
    options: SubscribeOptions,
}

impl AdapterBuilder {
    fn new(inner: Arc<dyn MessagingBackend>) -> Self {
        Self {
            inner,
            options: SubscribeOptions::default(),
        }
    }

    /// Creates the adapter.
    pub fn build(self) -> PubSubAdapter {
        PubSubAdapter {
            inner: self.inner,
            options: self.options,
        }
    }

    /// Replaces the flow control options.
    pub fn with_subscribe_options(mut self, v: SubscribeOptions) -> Self {
        self.options = v;
        self
    }

    /// Bounds the number of acknowledged messages waiting for the
    /// application.
    ///
    /// See [SubscribeOptions::max_buffered_messages].
    pub fn with_max_buffered_messages(mut self, v: usize) -> Self {
        self.options = self.options.set_max_buffered_messages(v);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{MockBackend, Settled, Settlements, test_message};
    use crate::backend::{Listener, ListenerHandle};
    use crate::error::Status;
    use mockall::Sequence;
    use test_case::test_case;
    use tokio_util::sync::CancellationToken;

    fn orders() -> Topic {
        Topic::new("projects/p/topics/orders")
    }

    fn worker() -> Subscription {
        Subscription::new("projects/p/subscriptions/worker-1", "projects/p/topics/orders")
    }

    fn service_error(code: Code) -> Error {
        Error::service(Status::default().set_code(code).set_message("test-only"))
    }

    #[tokio::test]
    async fn ensure_topic_existing() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics().times(1).returning(|| {
            Ok(vec![
                Topic::new("projects/p/topics/payments"),
                orders(),
                Topic::new("projects/p/topics/shipping"),
            ])
        });
        mock.expect_create_topic().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let topic = adapter.ensure_topic("orders").await?;
        assert_eq!(topic, orders());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_topic_creates() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(|| Ok(vec![Topic::new("projects/p/topics/payments")]));
        mock.expect_create_topic()
            .times(1)
            .withf(|name| name == "orders")
            .returning(|name| Ok(Topic::new(format!("projects/p/topics/{name}"))));

        let adapter = PubSubAdapter::from_backend(mock);
        let topic = adapter.ensure_topic("orders").await?;
        assert_eq!(topic, orders());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_topic_list_error() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(|| Err(service_error(Code::PermissionDenied)));
        mock.expect_create_topic().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .ensure_topic("orders")
            .await
            .expect_err("listing fails");
        assert_eq!(err.code(), Some(Code::PermissionDenied), "{err:?}");
        Ok(())
    }

    #[test_case(Code::ResourceExhausted)]
    #[test_case(Code::PermissionDenied)]
    #[test_case(Code::Unavailable)]
    #[tokio::test]
    async fn ensure_topic_create_error(code: Code) -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics().times(1).returning(|| Ok(Vec::new()));
        mock.expect_create_topic()
            .times(1)
            .returning(move |_| Err(service_error(code)));

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .ensure_topic("orders")
            .await
            .expect_err("creation fails");
        assert_eq!(err.code(), Some(code), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn ensure_topic_io_error() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(|| Err(Error::io("connection reset")));

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .ensure_topic("orders")
            .await
            .expect_err("listing fails");
        assert!(err.is_io(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn ensure_topic_lost_race() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));
        mock.expect_create_topic()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(service_error(Code::AlreadyExists)));
        mock.expect_list_topics()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![orders()]));

        let adapter = PubSubAdapter::from_backend(mock);
        let topic = adapter.ensure_topic("orders").await?;
        assert_eq!(topic, orders());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_topic_already_exists_but_missing() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics().times(2).returning(|| Ok(Vec::new()));
        mock.expect_create_topic()
            .times(1)
            .returning(|_| Err(service_error(Code::AlreadyExists)));

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .ensure_topic("orders")
            .await
            .expect_err("the topic cannot be found");
        assert_eq!(err.code(), Some(Code::AlreadyExists), "{err:?}");
        Ok(())
    }

    #[test_case("projects/p/topics/big-orders"; "longer suffix")]
    #[test_case("projects/p/topics/orders-v2"; "longer prefix")]
    #[test_case("projects/orders/topics/other"; "earlier segment")]
    #[tokio::test]
    async fn get_topic_matches_last_segment(existing: &'static str) -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(move || Ok(vec![Topic::new(existing)]));

        let adapter = PubSubAdapter::from_backend(mock);
        let topic = adapter.get_topic("orders").await?;
        assert_eq!(topic, None);
        Ok(())
    }

    #[tokio::test]
    async fn create_topic() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics().never();
        mock.expect_create_topic()
            .times(1)
            .withf(|name| name == "orders")
            .returning(|_| Ok(orders()));

        let adapter = PubSubAdapter::from_backend(mock);
        assert_eq!(adapter.create_topic("orders").await?, orders());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_subscription_existing() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_subscriptions()
            .times(1)
            .withf(|topic| topic == &orders())
            .returning(|_| Ok(vec![worker()]));
        mock.expect_create_subscription().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let sub = adapter.ensure_subscription(&orders(), "worker-1").await?;
        assert_eq!(sub, worker());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_subscription_creates() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_subscriptions()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        mock.expect_create_subscription()
            .times(1)
            .withf(|topic, name| topic == &orders() && name == "worker-1")
            .returning(|topic, name| {
                Ok(Subscription::new(
                    format!("projects/p/subscriptions/{name}"),
                    topic.name.clone(),
                ))
            });

        let adapter = PubSubAdapter::from_backend(mock);
        let sub = adapter.ensure_subscription(&orders(), "worker-1").await?;
        assert_eq!(sub, worker());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_subscription_suffix_match() -> anyhow::Result<()> {
        let existing = Subscription::new(
            "projects/p/subscriptions/team-worker-1",
            "projects/p/topics/orders",
        );
        let mut mock = MockBackend::new();
        mock.expect_list_subscriptions().times(1).returning({
            let existing = existing.clone();
            move |_| Ok(vec![existing.clone()])
        });
        mock.expect_create_subscription().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let sub = adapter.ensure_subscription(&orders(), "worker-1").await?;
        assert_eq!(sub, existing);
        Ok(())
    }

    #[tokio::test]
    async fn ensure_subscription_errors() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_subscriptions()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        mock.expect_create_subscription()
            .times(1)
            .returning(|_, _| Err(service_error(Code::NotFound)));

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .ensure_subscription(&orders(), "worker-1")
            .await
            .expect_err("creation fails");
        assert_eq!(err.code(), Some(Code::NotFound), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn ensure_subscription_lost_race() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        mock.expect_list_subscriptions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));
        mock.expect_create_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(service_error(Code::AlreadyExists)));
        mock.expect_list_subscriptions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![worker()]));

        let adapter = PubSubAdapter::from_backend(mock);
        let sub = adapter.ensure_subscription(&orders(), "worker-1").await?;
        assert_eq!(sub, worker());
        Ok(())
    }

    fn expect_resolution(mock: &mut MockBackend, seq: &mut Sequence) {
        mock.expect_list_topics()
            .times(1)
            .in_sequence(seq)
            .returning(|| Ok(vec![orders()]));
        mock.expect_list_subscriptions()
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(vec![worker()]));
    }

    #[tokio::test]
    async fn subscribe_acks_before_emit() -> anyhow::Result<()> {
        let settlements = Settlements::default();
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        expect_resolution(&mut mock, &mut seq);
        mock.expect_register_message_listener()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|subscription, _| subscription == &worker())
            .returning({
                let settlements = settlements.clone();
                move |_, listener: Listener| {
                    listener.deliver(settlements.received("m-1"));
                    listener.deliver(settlements.received("m-2"));
                    Ok(ListenerHandle::new(CancellationToken::new()))
                }
            });

        let adapter = PubSubAdapter::from_backend(mock);
        let mut stream = adapter.subscribe("orders", "worker-1").await?;
        assert_eq!(stream.subscription(), &worker());

        let m = stream.next().await;
        assert_eq!(m, Some(test_message("m-1")));
        assert!(
            settlements.get().contains(&Settled::Ack("m-1".to_string())),
            "{:?}",
            settlements.get()
        );
        let m = stream.next().await;
        assert_eq!(m, Some(test_message("m-2")));
        assert_eq!(
            settlements.get(),
            vec![
                Settled::Ack("m-1".to_string()),
                Settled::Ack("m-2".to_string())
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_creates_missing() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));
        mock.expect_create_topic()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(orders()));
        mock.expect_list_subscriptions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));
        mock.expect_create_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(worker()));
        mock.expect_register_message_listener()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(ListenerHandle::new(CancellationToken::new())));

        let adapter = PubSubAdapter::from_backend(mock);
        let stream = adapter.subscribe("orders", "worker-1").await?;
        assert_eq!(stream.subscription(), &worker());
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_resolution_error() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(|| Ok(vec![orders()]));
        mock.expect_list_subscriptions()
            .times(1)
            .returning(|_| Err(service_error(Code::PermissionDenied)));
        mock.expect_register_message_listener().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .subscribe("orders", "worker-1")
            .await
            .expect_err("resolution fails");
        assert_eq!(err.code(), Some(Code::PermissionDenied), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_register_error() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        expect_resolution(&mut mock, &mut seq);
        mock.expect_register_message_listener()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(Error::io("stream closed")));

        let adapter = PubSubAdapter::from_backend(mock);
        let err = adapter
            .subscribe("orders", "worker-1")
            .await
            .expect_err("registration fails");
        assert!(err.is_io(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_drop_deregisters() -> anyhow::Result<()> {
        let token = CancellationToken::new();
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        expect_resolution(&mut mock, &mut seq);
        mock.expect_register_message_listener()
            .times(1)
            .in_sequence(&mut seq)
            .returning({
                let token = token.clone();
                move |_, _| Ok(ListenerHandle::new(token.clone()))
            });

        let adapter = PubSubAdapter::from_backend(mock);
        let stream = adapter.subscribe("orders", "worker-1").await?;
        assert!(!token.is_cancelled());
        drop(stream);
        assert!(token.is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_fresh_listener_per_call() -> anyhow::Result<()> {
        let settlements = Settlements::default();
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(2)
            .returning(|| Ok(vec![orders()]));
        mock.expect_list_subscriptions()
            .times(2)
            .returning(|_| Ok(vec![worker()]));
        mock.expect_register_message_listener()
            .times(2)
            .returning({
                let settlements = settlements.clone();
                move |_, listener| {
                    listener.deliver(settlements.received("m-1"));
                    Ok(ListenerHandle::new(CancellationToken::new()))
                }
            });

        let adapter = PubSubAdapter::from_backend(mock);
        let mut s1 = adapter.subscribe("orders", "worker-1").await?;
        let mut s2 = adapter.subscribe("orders", "worker-1").await?;
        assert_eq!(s1.next().await, Some(test_message("m-1")));
        assert_eq!(s2.next().await, Some(test_message("m-1")));
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_stream_is_lazy() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics().never();
        mock.expect_register_message_listener().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let stream = adapter.subscribe_stream("orders", "worker-1");
        drop(stream);
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_stream_messages() -> anyhow::Result<()> {
        let settlements = Settlements::default();
        let mut seq = Sequence::new();
        let mut mock = MockBackend::new();
        expect_resolution(&mut mock, &mut seq);
        mock.expect_register_message_listener()
            .times(1)
            .in_sequence(&mut seq)
            .returning({
                let settlements = settlements.clone();
                move |_, listener| {
                    listener.deliver(settlements.received("m-1"));
                    Ok(ListenerHandle::new(CancellationToken::new()))
                }
            });

        let adapter = PubSubAdapter::from_backend(mock);
        let mut stream = adapter.subscribe_stream("orders", "worker-1");
        let m = stream.next().await.transpose()?;
        assert_eq!(m, Some(test_message("m-1")));
        assert_eq!(settlements.get(), vec![Settled::Ack("m-1".to_string())]);
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_stream_resolution_error() -> anyhow::Result<()> {
        let mut mock = MockBackend::new();
        mock.expect_list_topics()
            .times(1)
            .returning(|| Err(service_error(Code::Unavailable)));
        mock.expect_register_message_listener().never();

        let adapter = PubSubAdapter::from_backend(mock);
        let mut stream = adapter.subscribe_stream("orders", "worker-1");
        let err = stream
            .next()
            .await
            .expect("the stream yields the error")
            .expect_err("resolution fails");
        assert_eq!(err.code(), Some(Code::Unavailable), "{err:?}");
        assert!(stream.next().await.is_none());
        Ok(())
    }

    #[test]
    fn builder() {
        let adapter = PubSubAdapter::builder(MockBackend::new())
            .with_max_buffered_messages(32)
            .build();
        assert_eq!(adapter.options().max_buffered_messages, Some(32));

        let options = SubscribeOptions::new().set_max_buffered_messages(8_usize);
        let adapter = PubSubAdapter::builder(MockBackend::new())
            .with_subscribe_options(options.clone())
            .build();
        assert_eq!(adapter.options(), &options);

        let adapter = PubSubAdapter::from_backend(MockBackend::new());
        assert_eq!(adapter.options(), &SubscribeOptions::default());
    }
}
