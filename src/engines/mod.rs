// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod header_fetcher;
pub mod traits;

pub use header_fetcher::ReqwestHeaderFetcher;
pub use traits::{FetchOptions, FetchResult, HeaderFetcher};
