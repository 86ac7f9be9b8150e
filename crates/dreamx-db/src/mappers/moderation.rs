//! Moderation mappers

use dreamx_core::entities::{
    Appeal, AppealKind, AppealStatus, AuditEntry, Block, Report, ReportStatus, ReportSubject,
};
use dreamx_core::value_objects::Snowflake;

use super::parse_json;
use crate::models::{AppealModel, AuditEntryModel, BlockModel, ReportModel};

impl From<BlockModel> for Block {
    fn from(model: BlockModel) -> Self {
        Block {
            blocker_id: Snowflake::new(model.blocker_id),
            blocked_id: Snowflake::new(model.blocked_id),
            created_at: model.created_at,
        }
    }
}

impl From<ReportModel> for Report {
    fn from(model: ReportModel) -> Self {
        Report {
            id: Snowflake::new(model.id),
            reporter_id: Snowflake::new(model.reporter_id),
            subject_type: ReportSubject::parse(&model.subject_type).unwrap_or(ReportSubject::User),
            subject_id: Snowflake::new(model.subject_id),
            reason: model.reason,
            details: model.details,
            status: ReportStatus::parse(&model.status).unwrap_or(ReportStatus::Open),
            reviewer_id: model.reviewer_id.map(Snowflake::new),
            resolution_note: model.resolution_note,
            created_at: model.created_at,
            resolved_at: model.resolved_at,
        }
    }
}

impl From<AuditEntryModel> for AuditEntry {
    fn from(model: AuditEntryModel) -> Self {
        AuditEntry {
            id: Snowflake::new(model.id),
            actor_id: Snowflake::new(model.actor_id),
            action: model.action,
            target_type: model.target_type,
            target_id: model.target_id.map(Snowflake::new),
            details: parse_json(&model.details),
            created_at: model.created_at,
        }
    }
}

impl From<AppealModel> for Appeal {
    fn from(model: AppealModel) -> Self {
        Appeal {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            kind: AppealKind::parse(&model.kind).unwrap_or(AppealKind::Account),
            subject_id: model.subject_id.map(Snowflake::new),
            message: model.message,
            status: AppealStatus::parse(&model.status).unwrap_or(AppealStatus::Pending),
            reviewer_id: model.reviewer_id.map(Snowflake::new),
            decision_note: model.decision_note,
            created_at: model.created_at,
            decided_at: model.decided_at,
        }
    }
}
