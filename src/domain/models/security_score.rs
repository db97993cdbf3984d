// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::analysis::grade::Grade;
use crate::domain::analysis::header_analyzer::SecurityHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单个响应头的评分记录
///
/// 每条记录只属于一次扫描，创建后不可修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScore {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub header_name: String,
    pub is_present: bool,
    /// 0-100
    pub score: i32,
    pub grade: Grade,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl SecurityScore {
    /// 由分析结果生成评分记录
    pub fn from_header(scan_id: Uuid, header: &SecurityHeader) -> Self {
        Self {
            id: Uuid::new_v4(),
            scan_id,
            header_name: header.name.clone(),
            is_present: header.present,
            score: header.score,
            grade: header.grade,
            issues: header.issues.clone(),
            recommendations: header.recommendations.clone(),
        }
    }
}
