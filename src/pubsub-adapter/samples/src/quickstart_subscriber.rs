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

// [START pubsub_adapter_quickstart_subscriber]
use pubsub_adapter::PubSubAdapter;

pub async fn sample(
    adapter: &PubSubAdapter,
    topic_id: &str,
    subscription_id: &str,
) -> anyhow::Result<usize> {
    let mut stream = adapter.subscribe(topic_id, subscription_id).await?;

    println!("listening for messages...");

    // Terminate the sample after 1 second. Applications typically process
    // messages indefinitely in a long-running loop.
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);

    let mut count = 0;
    while let Ok(Some(message)) = tokio::time::timeout_at(deadline, stream.next()).await {
        println!("received message: {message:?}");
        count += 1;
    }

    println!("done listening for messages");
    Ok(count)
}
// [END pubsub_adapter_quickstart_subscriber]
