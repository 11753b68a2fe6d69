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

//! Errors reported by the adapter and its backends.
//!
//! The adapter never classifies or wraps backend failures. Whatever a
//! [MessagingBackend][crate::backend::MessagingBackend] returns is what the
//! caller receives.

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error returned by all operations in this crate.
///
/// Backends report either a [Status] from the messaging service, or a
/// transport-level problem. Most applications just return or log the error.
/// Applications that need more details can use the predicates and accessors.
///
/// # Example
/// ```
/// use pubsub_adapter::error::{Code, Error, Status};
/// let error = Error::service(Status::default().set_code(Code::NotFound).set_message("NOT FOUND"));
/// match error.status() {
///     Some(s) if s.code == Code::NotFound => println!("missing: {}", s.message),
///     _ => println!("some other error {error}"),
/// }
/// ```
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("the service reports an error with code {} described as: {}", .0.code, .0.message)]
    Service(Status),
    #[error("cannot communicate with the messaging backend: {0}")]
    Io(#[source] BoxError),
}

impl Error {
    /// Creates an error with the information returned by the messaging service.
    ///
    /// # Example
    /// ```
    /// use pubsub_adapter::error::{Code, Error, Status};
    /// let status = Status::default().set_code(Code::AlreadyExists).set_message("taken");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// ```
    pub fn service(status: Status) -> Self {
        Self {
            kind: ErrorKind::Service(status),
        }
    }

    /// Creates an error representing a transport problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use pubsub_adapter::error::Error;
    /// let error = Error::io("connection reset");
    /// assert!(error.is_io());
    /// assert!(error.source().is_some());
    /// ```
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Io(source.into()),
        }
    }

    /// The backend could not be reached, or the connection was lost.
    ///
    /// The request may or may not have reached the service. Operations that
    /// create resources may have completed.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::Io(_))
    }

    /// The error details returned by the service, if any.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(s) => Some(s),
            ErrorKind::Io(_) => None,
        }
    }

    /// The status code returned by the service, if any.
    pub fn code(&self) -> Option<Code> {
        self.status().map(|s| s.code)
    }
}

/// The status reported by the messaging service for a failed request.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Status {
    /// The status code.
    pub code: Code,
    /// A developer-facing description of the problem.
    pub message: String,
}

impl Status {
    /// Sets the value for [code][Status::code].
    pub fn set_code<T: Into<Code>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][Status::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }
}

/// The canonical status codes used by messaging backends.
///
/// These are the subset of the gRPC status codes that a messaging backend
/// reports for administrative and delivery operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Code {
    /// The operation was cancelled, typically by the caller.
    Cancelled,
    /// Unknown error.
    #[default]
    Unknown,
    /// The client specified an invalid argument, such as an empty name.
    InvalidArgument,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded,
    /// Some requested entity (e.g., a topic) was not found.
    NotFound,
    /// The entity that a client attempted to create already exists.
    AlreadyExists,
    /// The caller does not have permission to execute the operation.
    PermissionDenied,
    /// Some resource has been exhausted, such as a per-project quota.
    ResourceExhausted,
    /// The system is not in a state required for the operation, such as
    /// acknowledging a message that is no longer outstanding.
    FailedPrecondition,
    /// The operation was aborted, typically due to a concurrency issue.
    Aborted,
    /// Internal errors in the service.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// The request does not have valid authentication credentials.
    Unauthenticated,
}

impl Code {
    /// The name of the code, as used in the gRPC specification.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
