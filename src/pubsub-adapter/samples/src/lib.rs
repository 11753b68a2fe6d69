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

mod quickstart_subscriber;
mod subscribe_stream;
mod subscription;
mod topic;
pub mod tracing;

use pubsub_adapter::PubSubAdapter;
use pubsub_adapter::emulator::InMemoryBackend;
use pubsub_adapter::model::{Message, Topic};

/// The project used when `GOOGLE_CLOUD_PROJECT` is not set.
pub const DEFAULT_PROJECT: &str = "test-project";

pub fn project_id() -> String {
    std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|_| DEFAULT_PROJECT.to_string())
}

pub async fn run_topic_samples(adapter: &PubSubAdapter, topic_id: &str) -> anyhow::Result<Topic> {
    topic::create_topic::sample(adapter, topic_id).await?;
    // A second call finds the topic created above.
    let topic = topic::ensure_topic::sample(adapter, topic_id).await?;
    Ok(topic)
}

pub async fn run_subscription_samples(
    adapter: &PubSubAdapter,
    topic: &Topic,
    subscription_id: &str,
) -> anyhow::Result<()> {
    subscription::ensure_subscription::sample(adapter, topic, subscription_id).await?;
    subscription::get_subscription::sample(adapter, topic, subscription_id).await?;
    Ok(())
}

/// Publishes `count` messages to `topic_id` using the in-memory backend.
pub fn publish_messages(
    backend: &InMemoryBackend,
    topic_id: &str,
    count: usize,
) -> anyhow::Result<Vec<String>> {
    let ids = (0..count)
        .map(|i| backend.publish(topic_id, Message::new().set_data(format!("message {i}"))))
        .collect::<pubsub_adapter::Result<Vec<_>>>()?;
    Ok(ids)
}

pub async fn run_subscriber_samples(
    adapter: &PubSubAdapter,
    backend: &InMemoryBackend,
    topic_id: &str,
    subscription_id: &str,
    count: usize,
) -> anyhow::Result<(usize, usize)> {
    publish_messages(backend, topic_id, count)?;
    let received = quickstart_subscriber::sample(adapter, topic_id, subscription_id).await?;
    ::tracing::info!("quickstart received {received} messages");

    publish_messages(backend, topic_id, count)?;
    let streamed = subscribe_stream::sample(adapter.clone(), topic_id, subscription_id).await?;
    ::tracing::info!("stream sample received {streamed} messages");
    Ok((received, streamed))
}
