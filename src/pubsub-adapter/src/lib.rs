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

//! Subscribe to a topic/subscription pair on a managed pub/sub service.
//!
//! This crate maps "subscribe to `topic` with `subscription`" requests onto a
//! [MessagingBackend][backend::MessagingBackend]. The [PubSubAdapter] creates
//! the topic and subscription if they do not exist, registers a listener, and
//! returns a stream of messages. Each message is acknowledged before it is
//! yielded by the stream.
//!
//! The message broker itself, including durability, ordering, and
//! authentication, is owned by the backend.
//!
//! # Example
//! ```
//! # use pubsub_adapter::PubSubAdapter;
//! # use pubsub_adapter::emulator::InMemoryBackend;
//! # async fn sample() -> anyhow::Result<()> {
//! let adapter = PubSubAdapter::from_backend(InMemoryBackend::new("my-project"));
//! let mut stream = adapter.subscribe("orders", "worker-1").await?;
//! while let Some(m) = stream.next().await {
//!     println!("received message m={m:?}");
//! }
//! # Ok(()) }
//! ```

pub mod backend;
pub mod emulator;
pub mod error;
pub mod model;
pub mod options;
pub mod stream;

mod adapter;

pub use adapter::{AdapterBuilder, PubSubAdapter};
pub use error::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
