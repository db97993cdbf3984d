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

use crate::engines::traits::{FetchError, FetchOptions, FetchResult, HeaderFetcher};
use crate::utils::url_utils::{normalize_target, resolve_url};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect, Method, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = "ShieldCSP-Scanner/1.0";

/// 响应头抓取器
///
/// 基于reqwest实现。先发 HEAD，响应不带任何头或者服务器拒绝 HEAD 时
/// 再退回 GET。重定向由这里手动处理，以便记录完整的跳转链。
pub struct ReqwestHeaderFetcher {
    client: reqwest::Client,
}

impl ReqwestHeaderFetcher {
    /// 创建抓取器
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, method: Method, url: &Url, timeout_ms: u64) -> Result<Response, FetchError> {
        let request = self.client.request(method, url.clone()).send();
        match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FetchError::Timeout(timeout_ms)),
        }
    }

    /// 对单个地址发起请求，必要时退回 GET
    async fn probe(&self, url: &Url, timeout_ms: u64) -> Result<Response, FetchError> {
        let response = self.send(Method::HEAD, url, timeout_ms).await?;
        let rejected = matches!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        );
        if response.headers().is_empty() || rejected {
            debug!("HEAD unusable for {}, falling back to GET", url);
            return self.send(Method::GET, url, timeout_ms).await;
        }
        Ok(response)
    }

    /// 逐跳请求直到拿到非重定向响应，`current` 始终指向最后一跳
    async fn follow(
        &self,
        current: &mut Url,
        options: &FetchOptions,
        redirect_chain: &mut Vec<String>,
    ) -> Result<(StatusCode, HashMap<String, String>), FetchError> {
        let mut hops = 0u32;

        loop {
            let response = self.probe(current, options.timeout_ms).await?;
            let status = response.status();

            if options.follow_redirects && status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if let Some(location) = location {
                    if hops >= options.max_redirects {
                        return Err(FetchError::TooManyRedirects);
                    }
                    let next = resolve_url(current, &location)?;
                    redirect_chain.push(current.to_string());
                    *current = next;
                    hops += 1;
                    continue;
                }
            }

            return Ok((status, collect_headers(response.headers())));
        }
    }
}

/// 把响应头转换为小写名称到取值的映射
///
/// 同名响应头（例如多个 `Content-Security-Policy`）按出现顺序用 `", "`
/// 合并为一个值，不能只保留最后一个。无法按 ASCII 解读的取值被跳过。
fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            if values.is_empty() {
                return None;
            }
            Some((name.as_str().to_ascii_lowercase(), values.join(", ")))
        })
        .collect()
}

#[async_trait]
impl HeaderFetcher for ReqwestHeaderFetcher {
    /// 抓取响应头
    ///
    /// 收到任何 HTTP 响应（包括 4xx/5xx）都视为成功，只有网络层失败、
    /// 超时和重定向超限才返回失败。
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchResult {
        let target = normalize_target(url);
        let mut current = match Url::parse(&target) {
            Ok(url) => url,
            Err(e) => return FetchResult::failure(target, Vec::new(), &FetchError::from(e)),
        };

        let mut redirect_chain = Vec::new();
        match self
            .follow(&mut current, options, &mut redirect_chain)
            .await
        {
            Ok((status, headers)) => FetchResult {
                success: true,
                headers,
                status_code: Some(status.as_u16()),
                final_url: current.to_string(),
                redirect_chain,
                error: None,
            },
            Err(e) => {
                debug!("Fetch of {} failed: {}", current, e);
                FetchResult::failure(current.to_string(), redirect_chain, &e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "header_fetcher_test.rs"]
mod tests;
