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

// [START pubsub_adapter_subscribe_stream]
use futures::StreamExt as _;
use pubsub_adapter::PubSubAdapter;
use std::time::Duration;

pub async fn sample(
    adapter: PubSubAdapter,
    topic_id: &str,
    subscription_id: &str,
) -> anyhow::Result<usize> {
    // Nothing happens until the stream is polled.
    let stream = adapter.subscribe_stream(topic_id, subscription_id);

    println!("listening for messages using streams...");

    // Collect messages for 1 second.
    let deadline = tokio::time::sleep(Duration::from_secs(1));
    let stream = stream.take_until(deadline);
    tokio::pin!(stream);

    let mut count = 0;
    while let Some(message) = stream.next().await.transpose()? {
        println!(
            "received message: {:?}",
            String::from_utf8_lossy(&message.data)
        );
        count += 1;
    }

    println!("done listening for messages");
    Ok(count)
}
// [END pubsub_adapter_subscribe_stream]
