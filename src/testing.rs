//! Test doubles for code built on [`Executor`].
//!
//! [`MockExecutor`] replays scripted reply frames in order and records
//! every command it receives, so facade behaviour can be checked without a
//! running server.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};

use crate::core::command::Cmd;
use crate::proto::frame::Frame;
use crate::{Error, Executor, Result};

/// Scripted [`Executor`].
///
/// ```
/// use redkey::testing::MockExecutor;
/// use redkey::proto::frame::Frame;
///
/// let mock = MockExecutor::new().reply(Frame::Integer(1));
/// assert_eq!(mock.remaining(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockExecutor {
    replies: Mutex<VecDeque<Frame>>,
    sent: Mutex<Vec<Cmd>>,
}

impl MockExecutor {
    /// Creates a mock with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply frame.
    pub fn reply(self, frame: Frame) -> Self {
        lock(&self.replies).push_back(frame);
        self
    }

    /// Queues a `+status` reply.
    pub fn status(self, status: &str) -> Self {
        self.reply(Frame::SimpleString(status.as_bytes().to_vec()))
    }

    /// Queues a `-error` reply.
    pub fn error(self, message: &str) -> Self {
        self.reply(Frame::Error(message.as_bytes().to_vec()))
    }

    /// Queues an `:integer` reply.
    pub fn integer(self, n: i64) -> Self {
        self.reply(Frame::Integer(n))
    }

    /// Queues a bulk string reply.
    pub fn bulk(self, data: impl Into<Bytes>) -> Self {
        self.reply(Frame::BulkString(Some(data.into())))
    }

    /// Queues a nil bulk string reply.
    pub fn nil(self) -> Self {
        self.reply(Frame::BulkString(None))
    }

    /// Commands received so far, rendered as UTF-8 argument lists.
    pub fn sent(&self) -> Vec<Vec<String>> {
        lock(&self.sent)
            .iter()
            .map(|cmd| {
                cmd.args()
                    .iter()
                    .map(|a| String::from_utf8_lossy(a).into_owned())
                    .collect()
            })
            .collect()
    }

    /// The last command received, if any.
    pub fn last_sent(&self) -> Option<Vec<String>> {
        self.sent().pop()
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, cmd: Cmd) -> BoxFuture<'_, Result<Frame>> {
        let reply = lock(&self.replies).pop_front();
        lock(&self.sent).push(cmd);
        let result = reply.ok_or_else(|| Error::Protocol {
            message: "mock executor has no scripted reply left".to_string(),
        });
        future::ready(result).boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
