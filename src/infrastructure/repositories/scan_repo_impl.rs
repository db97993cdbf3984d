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

use crate::domain::analysis::grade::Grade;
use crate::domain::models::scan::{Scan, ScanStatus, ScanType};
use crate::domain::models::security_score::SecurityScore;
use crate::domain::repositories::{RepositoryError, ScanRepository};
use crate::infrastructure::database::entities::scan::{self, SeaScanStatus};
use crate::infrastructure::database::entities::security_score;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// 扫描结果仓库实现
#[derive(Clone)]
pub struct ScanRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ScanRepositoryImpl {
    /// 创建新的扫描结果仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<ScanStatus> for SeaScanStatus {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Pending => SeaScanStatus::Pending,
            ScanStatus::Running => SeaScanStatus::Running,
            ScanStatus::Completed => SeaScanStatus::Completed,
            ScanStatus::Failed => SeaScanStatus::Failed,
        }
    }
}

impl From<SeaScanStatus> for ScanStatus {
    fn from(status: SeaScanStatus) -> Self {
        match status {
            SeaScanStatus::Pending => ScanStatus::Pending,
            SeaScanStatus::Running => ScanStatus::Running,
            SeaScanStatus::Completed => ScanStatus::Completed,
            SeaScanStatus::Failed => ScanStatus::Failed,
        }
    }
}

fn parse_grade(value: &str) -> Result<Grade, RepositoryError> {
    value
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("unknown grade '{}'", value)))
}

impl TryFrom<scan::Model> for Scan {
    type Error = RepositoryError;

    fn try_from(model: scan::Model) -> Result<Self, Self::Error> {
        let scan_type = model.scan_type.parse::<ScanType>().map_err(|_| {
            RepositoryError::Serialization(format!("unknown scan type '{}'", model.scan_type))
        })?;

        Ok(Self {
            id: model.id,
            domain_id: model.domain_id,
            scan_type,
            status: model.status.into(),
            overall_score: model.overall_score,
            overall_grade: model.overall_grade.as_deref().map(parse_grade).transpose()?,
            raw_headers: model.raw_headers.map(serde_json::from_value).transpose()?,
            csp_policy: model.csp_policy,
            csp_grade: model.csp_grade.as_deref().map(parse_grade).transpose()?,
            csp_issues: serde_json::from_value(model.csp_issues)?,
            scan_duration_ms: model.scan_duration_ms,
            error_message: model.error_message,
            scanned_at: model.scanned_at.with_timezone(&Utc),
        })
    }
}

impl TryFrom<security_score::Model> for SecurityScore {
    type Error = RepositoryError;

    fn try_from(model: security_score::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            scan_id: model.scan_id,
            header_name: model.header_name,
            is_present: model.is_present,
            score: model.score,
            grade: parse_grade(&model.grade)?,
            issues: serde_json::from_value(model.issues)?,
            recommendations: serde_json::from_value(model.recommendations)?,
        })
    }
}

fn scan_active_model(scan: &Scan) -> Result<scan::ActiveModel, RepositoryError> {
    Ok(scan::ActiveModel {
        id: Set(scan.id),
        domain_id: Set(scan.domain_id),
        scan_type: Set(scan.scan_type.to_string()),
        status: Set(scan.status.into()),
        overall_score: Set(scan.overall_score),
        overall_grade: Set(scan.overall_grade.map(|g| g.to_string())),
        raw_headers: Set(scan
            .raw_headers
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?),
        csp_policy: Set(scan.csp_policy.clone()),
        csp_grade: Set(scan.csp_grade.map(|g| g.to_string())),
        csp_issues: Set(serde_json::to_value(&scan.csp_issues)?),
        scan_duration_ms: Set(scan.scan_duration_ms),
        error_message: Set(scan.error_message.clone()),
        scanned_at: Set(scan.scanned_at.into()),
    })
}

fn score_active_model(score: &SecurityScore) -> Result<security_score::ActiveModel, RepositoryError> {
    Ok(security_score::ActiveModel {
        id: Set(score.id),
        scan_id: Set(score.scan_id),
        header_name: Set(score.header_name.clone()),
        is_present: Set(score.is_present),
        score: Set(score.score),
        grade: Set(score.grade.to_string()),
        issues: Set(serde_json::to_value(&score.issues)?),
        recommendations: Set(serde_json::to_value(&score.recommendations)?),
    })
}

#[async_trait]
impl ScanRepository for ScanRepositoryImpl {
    async fn create_scan(
        &self,
        scan: &Scan,
        scores: &[SecurityScore],
    ) -> Result<Scan, RepositoryError> {
        let scan_model = scan_active_model(scan)?;
        let score_models = scores
            .iter()
            .map(score_active_model)
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;
        scan::Entity::insert(scan_model).exec(&txn).await?;
        if !score_models.is_empty() {
            security_score::Entity::insert_many(score_models)
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        Ok(scan.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Scan>, RepositoryError> {
        let model = scan::Entity::find_by_id(id).one(self.db.as_ref()).await?;
        model.map(Scan::try_from).transpose()
    }

    async fn find_latest_completed(
        &self,
        domain_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Option<Scan>, RepositoryError> {
        let mut query = scan::Entity::find()
            .filter(scan::Column::DomainId.eq(domain_id))
            .filter(scan::Column::Status.eq(SeaScanStatus::Completed));
        if let Some(excluded) = exclude {
            query = query.filter(scan::Column::Id.ne(excluded));
        }

        let model = query
            .order_by_desc(scan::Column::ScannedAt)
            .one(self.db.as_ref())
            .await?;

        model.map(Scan::try_from).transpose()
    }

    async fn find_scores(&self, scan_id: Uuid) -> Result<Vec<SecurityScore>, RepositoryError> {
        let models = security_score::Entity::find()
            .filter(security_score::Column::ScanId.eq(scan_id))
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(SecurityScore::try_from).collect()
    }

    async fn list_by_domain(
        &self,
        domain_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Scan>, RepositoryError> {
        let models = scan::Entity::find()
            .filter(scan::Column::DomainId.eq(domain_id))
            .order_by_desc(scan::Column::ScannedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Scan::try_from).collect()
    }
}

#[cfg(test)]
#[path = "scan_repo_impl_test.rs"]
mod tests;
