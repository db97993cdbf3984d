// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod csp_parser;
pub mod grade;
pub mod header_analyzer;

pub use csp_parser::{CspDirective, CspParser, CspPolicy, PolicyCspScore};
pub use grade::Grade;
pub use header_analyzer::{HeaderAnalysis, HeaderAnalyzer, HeaderCspScore, SecurityHeader};
