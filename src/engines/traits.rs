// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// 抓取错误类型
///
/// 只在抓取器内部使用，对外以 [`FetchResult::error`] 字符串的形式返回。
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败
    #[error("{0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 超时
    #[error("request timeout after {0}ms")]
    Timeout(u64),
    /// 重定向次数超过上限
    #[error("too many redirects")]
    TooManyRedirects,
    /// 目标地址无效
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// 抓取选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// 单次请求超时（毫秒）
    pub timeout_ms: u64,
    /// 是否跟随重定向
    pub follow_redirects: bool,
    /// 最多跟随的重定向次数
    pub max_redirects: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// 抓取结果
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub success: bool,
    /// 响应头，名称为小写
    pub headers: HashMap<String, String>,
    pub status_code: Option<u16>,
    /// 最后一跳的地址
    pub final_url: String,
    /// 每次重定向前的地址，按顺序
    pub redirect_chain: Vec<String>,
    pub error: Option<String>,
}

impl FetchResult {
    /// 构造失败结果
    pub fn failure(final_url: impl Into<String>, redirect_chain: Vec<String>, error: &FetchError) -> Self {
        Self {
            success: false,
            headers: HashMap::new(),
            status_code: None,
            final_url: final_url.into(),
            redirect_chain,
            error: Some(error.to_string()),
        }
    }
}

/// 响应头抓取器特质
///
/// 从不返回错误：所有失败都以 `success = false` 加上描述性的 `error` 表示。
#[async_trait]
pub trait HeaderFetcher: Send + Sync {
    /// 抓取目标地址的响应头
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchResult;

    /// 抓取器名称
    fn name(&self) -> &'static str;
}
