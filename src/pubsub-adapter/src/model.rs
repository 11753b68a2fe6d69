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

use crate::backend::Handler;
use std::collections::HashMap;

/// A named channel that publishers send messages to.
///
/// The `name` is the fully-qualified name assigned by the backend, for
/// example `projects/my-project/topics/orders`. The adapter treats it as an
/// opaque identifier and only interprets its last path segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct Topic {
    /// The fully-qualified name of the topic.
    pub name: String,
}

impl Topic {
    /// Creates a new instance.
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self { name: name.into() }
    }

    /// The text after the last `/` in the topic name.
    ///
    /// # Example
    /// ```
    /// # use pubsub_adapter::model::Topic;
    /// let topic = Topic::new("projects/my-project/topics/orders");
    /// assert_eq!(topic.short_name(), "orders");
    /// ```
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// A named cursor over the messages of a topic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct Subscription {
    /// The fully-qualified name of the subscription, for example
    /// `projects/my-project/subscriptions/worker-1`.
    pub name: String,

    /// The fully-qualified name of the topic this subscription belongs to.
    pub topic: String,
}

impl Subscription {
    /// Creates a new instance.
    pub fn new<N: Into<String>, T: Into<String>>(name: N, topic: T) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
        }
    }

    /// The text after the last `/` in the subscription name.
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// A message received from a subscription.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Message {
    /// The identifier assigned by the backend when the message was published.
    pub id: String,

    /// The message payload.
    pub data: bytes::Bytes,

    /// Attributes attached by the publisher.
    pub attributes: HashMap<String, String>,

    /// When the backend accepted the message, if known.
    pub publish_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Message {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for [id][Message::id].
    pub fn set_id<T: Into<String>>(mut self, v: T) -> Self {
        self.id = v.into();
        self
    }

    /// Sets the value for [data][Message::data].
    pub fn set_data<T: Into<bytes::Bytes>>(mut self, v: T) -> Self {
        self.data = v.into();
        self
    }

    /// Sets the value for [attributes][Message::attributes].
    pub fn set_attributes<T, K, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes = v.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Sets the value for [publish_time][Message::publish_time].
    pub fn set_publish_time<T: Into<chrono::DateTime<chrono::Utc>>>(mut self, v: T) -> Self {
        self.publish_time = Some(v.into());
        self
    }
}

/// A message as delivered by a backend, paired with the means to settle it.
#[derive(Debug)]
pub struct ReceivedMessage {
    /// The message contents.
    pub message: Message,
    /// Acknowledges or rejects `message`.
    pub handler: Handler,
}

fn short_name(name: &str) -> &str {
    name.rsplit_once('/').map(|(_, n)| n).unwrap_or(name)
}
