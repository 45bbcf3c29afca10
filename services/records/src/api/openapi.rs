//! OpenAPI schema aggregation for the registry API.
use crate::api::types::{
    ErrorResponse, HealthStatus, ModuleInfo, PendingMineCount, PendingMineResponse, ReasonRequest,
    RecordFields, RecordListResponse, SweepRequest, SystemInfo,
};
use crate::api::{events, maintenance, pending, records, system};
use crate::model::{
    Actor, ActorRef, ApprovalStatus, Module, Record, RecordStatus, Role, Tombstone,
};
use crate::workflow::{
    DeleteOutcome, ModuleSweep, PendingCounts, PendingEvent, PendingEventKind, Resolution,
    SweepReport,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "records",
        version = "v1",
        description = "International-affairs record registry with approval workflow"
    ),
    paths(
        system::system_info,
        system::system_health,
        records::list_records,
        records::create_record,
        records::get_record,
        records::update_record,
        records::delete_record,
        pending::module_pending,
        pending::approve,
        pending::reject,
        pending::list_pending,
        pending::pending_mine,
        pending::pending_mine_count,
        pending::pending_count,
        events::pending_events,
        maintenance::run_expiry_sweep
    ),
    components(schemas(
        Actor,
        ActorRef,
        ApprovalStatus,
        DeleteOutcome,
        ErrorResponse,
        HealthStatus,
        Module,
        ModuleInfo,
        ModuleSweep,
        PendingCounts,
        PendingEvent,
        PendingEventKind,
        PendingMineCount,
        PendingMineResponse,
        ReasonRequest,
        Record,
        RecordFields,
        RecordListResponse,
        RecordStatus,
        Resolution,
        Role,
        SweepReport,
        SweepRequest,
        SystemInfo,
        Tombstone
    )),
    tags(
        (name = "records", description = "Per-module record CRUD"),
        (name = "pending", description = "Proposal review and pending-set views"),
        (name = "maintenance", description = "Operator tasks"),
        (name = "system", description = "Service metadata and health")
    )
)]
pub struct ApiDoc;
