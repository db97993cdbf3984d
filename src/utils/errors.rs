// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    QueueError(String),
}

impl From<crate::queue::QueueError> for WorkerError {
    fn from(err: crate::queue::QueueError) -> Self {
        WorkerError::QueueError(err.to_string())
    }
}
