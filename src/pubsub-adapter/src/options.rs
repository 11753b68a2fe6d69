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

/// Flow control for the streams returned by
/// [PubSubAdapter::subscribe][crate::PubSubAdapter::subscribe].
///
/// Backends push messages into a buffer, the application pulls them out of
/// the stream. By default the buffer is unbounded. With a bounded buffer,
/// messages that arrive while the buffer is full are rejected (nacked) instead
/// of acknowledged, and the backend redelivers them later.
///
/// # Example
/// ```
/// # use pubsub_adapter::options::SubscribeOptions;
/// let options = SubscribeOptions::new().set_max_buffered_messages(100_usize);
/// assert_eq!(options.max_buffered_messages, Some(100));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct SubscribeOptions {
    /// The maximum number of acknowledged messages waiting for the
    /// application. `None` means unbounded.
    pub max_buffered_messages: Option<usize>,
}

impl SubscribeOptions {
    /// Create a new instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [max_buffered_messages][Self::max_buffered_messages] field.
    ///
    /// A value of zero is treated as one.
    pub fn set_max_buffered_messages<V: Into<usize>>(mut self, v: V) -> Self {
        self.max_buffered_messages = Some(v.into().max(1));
        self
    }

    /// Removes any limit on the number of buffered messages.
    pub fn set_unbounded(mut self) -> Self {
        self.max_buffered_messages = None;
        self
    }
}
