//! Rendezvous client implementation.
//!
//! This module provides the gRPC client agents use to reach a
//! `dtr-rendezvous` server.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

use super::backend::RendezvousBackend;
use super::proto::rendezvous_service_client::RendezvousServiceClient;
use super::proto::{
    KeepAliveRequest, LeaveRequest, MarkCompleteRequest, ObserveRequest, WaitRoundRequest,
};
use super::protocol::{JoinRequest, JoinTicket, RendezvousRound, RoundObservation};
use crate::config::RendezvousConfig;
use crate::error::{ElasticError, Result};

/// Extra time granted to a blocking `WaitRound` call on top of its own
/// timeout, so the server reports the timeout rather than the transport.
const WAIT_ROUND_MARGIN: Duration = Duration::from_secs(5);

/// gRPC-based rendezvous backend.
#[derive(Clone)]
pub struct GrpcRendezvousClient {
    endpoint: String,
    client: RendezvousServiceClient<Channel>,
    request_timeout: Duration,
}

impl GrpcRendezvousClient {
    /// Connect to the rendezvous server named by `config.endpoint`.
    pub async fn connect(config: &RendezvousConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{}", config.endpoint))
            .map_err(|e| {
                ElasticError::config_with_source(
                    format!("invalid rendezvous endpoint '{}'", config.endpoint),
                    e,
                )
            })?
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms));

        let channel = endpoint.connect().await.map_err(|e| {
            ElasticError::backend_unavailable_with_source(
                format!("failed to connect to rendezvous server at {}", config.endpoint),
                e,
            )
        })?;

        tracing::info!(endpoint = %config.endpoint, "Connected to rendezvous server");

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client: RendezvousServiceClient::new(channel),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }

    fn request<T>(&self, message: T, timeout: Duration) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(timeout);
        request
    }

    fn map_status(&self, run_id: &str, what: &str, status: Status, timeout: Duration) -> ElasticError {
        match status.code() {
            Code::DeadlineExceeded => {
                ElasticError::rendezvous_timeout(run_id, timeout, status.message().to_string())
            }
            Code::Unavailable | Code::Unknown | Code::Cancelled | Code::ResourceExhausted => {
                ElasticError::backend_unavailable_with_source(
                    format!("{} failed against {}", what, self.endpoint),
                    status,
                )
            }
            _ => ElasticError::rendezvous(run_id, format!("{} failed: {}", what, status.message())),
        }
    }
}

#[async_trait]
impl RendezvousBackend for GrpcRendezvousClient {
    async fn join(&self, request: &JoinRequest) -> Result<JoinTicket> {
        let mut client = self.client.clone();
        let run_id = request.run_id.clone();

        let response = client
            .join(self.request(request.clone().into(), self.request_timeout))
            .await
            .map_err(|s| self.map_status(&run_id, "join", s, self.request_timeout))?;

        Ok(JoinTicket::from(response.into_inner()))
    }

    async fn wait_round(
        &self,
        run_id: &str,
        node_id: &str,
        timeout: Duration,
    ) -> Result<RendezvousRound> {
        let mut client = self.client.clone();

        let request = self.request(
            WaitRoundRequest {
                run_id: run_id.to_string(),
                node_id: node_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            timeout + WAIT_ROUND_MARGIN,
        );

        let response = client
            .wait_round(request)
            .await
            .map_err(|s| self.map_status(run_id, "wait_round", s, timeout))?;

        RendezvousRound::try_from(response.into_inner())
    }

    async fn keep_alive(&self, run_id: &str, node_id: &str, version: u64) -> Result<bool> {
        let mut client = self.client.clone();

        let request = self.request(
            KeepAliveRequest {
                run_id: run_id.to_string(),
                node_id: node_id.to_string(),
                version,
            },
            self.request_timeout,
        );

        let response = client
            .keep_alive(request)
            .await
            .map_err(|s| self.map_status(run_id, "keep_alive", s, self.request_timeout))?;

        Ok(response.into_inner().member)
    }

    async fn observe(&self, run_id: &str) -> Result<RoundObservation> {
        let mut client = self.client.clone();

        let request = self.request(
            ObserveRequest {
                run_id: run_id.to_string(),
            },
            self.request_timeout,
        );

        let response = client
            .observe(request)
            .await
            .map_err(|s| self.map_status(run_id, "observe", s, self.request_timeout))?;

        Ok(RoundObservation::from(response.into_inner()))
    }

    async fn mark_complete(
        &self,
        run_id: &str,
        node_id: &str,
        version: u64,
    ) -> Result<(u32, u32)> {
        let mut client = self.client.clone();

        let request = self.request(
            MarkCompleteRequest {
                run_id: run_id.to_string(),
                node_id: node_id.to_string(),
                version,
            },
            self.request_timeout,
        );

        let response = client
            .mark_complete(request)
            .await
            .map_err(|s| self.map_status(run_id, "mark_complete", s, self.request_timeout))?
            .into_inner();

        Ok((response.completed, response.participants))
    }

    async fn leave(&self, run_id: &str, node_id: &str) -> Result<bool> {
        let mut client = self.client.clone();

        let request = self.request(
            LeaveRequest {
                run_id: run_id.to_string(),
                node_id: node_id.to_string(),
            },
            self.request_timeout,
        );

        let response = client
            .leave(request)
            .await
            .map_err(|s| self.map_status(run_id, "leave", s, self.request_timeout))?;

        Ok(response.into_inner().removed)
    }
}
