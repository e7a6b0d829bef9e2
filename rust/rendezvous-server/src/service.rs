//! gRPC service implementation for the rendezvous server.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};

use elastic_core::rendezvous::proto::rendezvous_service_server::RendezvousService;
use elastic_core::rendezvous::proto::{
    JoinRequest as ProtoJoinRequest, JoinResponse, KeepAliveRequest, KeepAliveResponse,
    LeaveRequest, LeaveResponse, MarkCompleteRequest, MarkCompleteResponse, ObserveRequest,
    RoundInfo, RoundObservation as ProtoRoundObservation, WaitRoundRequest,
};
use elastic_core::rendezvous::{JoinRequest, RendezvousStore};
use elastic_core::ElasticError;

/// Longest a single `WaitRound` call may block.
const MAX_WAIT: Duration = Duration::from_secs(3600);

pub struct RendezvousServiceImpl {
    store: Arc<RendezvousStore>,
}

impl RendezvousServiceImpl {
    pub fn new(store: Arc<RendezvousStore>) -> Self {
        Self { store }
    }
}

fn to_status(error: ElasticError) -> Status {
    match &error {
        ElasticError::RendezvousTimeout { .. } => Status::deadline_exceeded(error.to_string()),
        ElasticError::Rendezvous { .. } | ElasticError::Config { .. } => {
            Status::failed_precondition(error.to_string())
        }
        _ => Status::internal(error.to_string()),
    }
}

fn require(field: &str, value: &str) -> Result<(), Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(format!("{} is required", field)));
    }
    Ok(())
}

#[tonic::async_trait]
impl RendezvousService for RendezvousServiceImpl {
    async fn join(
        &self,
        request: Request<ProtoJoinRequest>,
    ) -> Result<Response<JoinResponse>, Status> {
        let req = request.into_inner();
        require("run_id", &req.run_id)?;
        let req = JoinRequest::try_from(req).map_err(to_status)?;

        let ticket = self.store.join(&req).await.map_err(to_status)?;
        tracing::debug!(
            run_id = %req.run_id,
            node = %req.node,
            version = ticket.version,
            admitted = ticket.admitted,
            "Join"
        );

        Ok(Response::new(ticket.into()))
    }

    async fn wait_round(
        &self,
        request: Request<WaitRoundRequest>,
    ) -> Result<Response<RoundInfo>, Status> {
        let req = request.into_inner();
        require("run_id", &req.run_id)?;
        require("node_id", &req.node_id)?;

        let timeout = Duration::from_millis(req.timeout_ms).min(MAX_WAIT);
        let round = self
            .store
            .wait_round(&req.run_id, &req.node_id, timeout)
            .await
            .map_err(to_status)?;

        Ok(Response::new(round.into()))
    }

    async fn keep_alive(
        &self,
        request: Request<KeepAliveRequest>,
    ) -> Result<Response<KeepAliveResponse>, Status> {
        let req = request.into_inner();
        let member = self
            .store
            .keep_alive(&req.run_id, &req.node_id, req.version)
            .await
            .map_err(to_status)?;

        Ok(Response::new(KeepAliveResponse { member }))
    }

    async fn observe(
        &self,
        request: Request<ObserveRequest>,
    ) -> Result<Response<ProtoRoundObservation>, Status> {
        let req = request.into_inner();
        require("run_id", &req.run_id)?;

        let obs = self.store.observe(&req.run_id).await.map_err(to_status)?;
        Ok(Response::new(obs.into()))
    }

    async fn mark_complete(
        &self,
        request: Request<MarkCompleteRequest>,
    ) -> Result<Response<MarkCompleteResponse>, Status> {
        let req = request.into_inner();
        let (completed, participants) = self
            .store
            .mark_complete(&req.run_id, &req.node_id, req.version)
            .await
            .map_err(to_status)?;

        tracing::info!(
            run_id = %req.run_id,
            node_id = %req.node_id,
            completed,
            participants,
            "Node completed"
        );

        Ok(Response::new(MarkCompleteResponse {
            completed,
            participants,
        }))
    }

    async fn leave(
        &self,
        request: Request<LeaveRequest>,
    ) -> Result<Response<LeaveResponse>, Status> {
        let req = request.into_inner();
        let removed = self
            .store
            .leave(&req.run_id, &req.node_id)
            .await
            .map_err(to_status)?;

        Ok(Response::new(LeaveResponse { removed }))
    }
}
