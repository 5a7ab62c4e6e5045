//! Worker registry keyed by project id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::WrapErr as _;
use push_convert::{ConverterKind, new_converter};
use push_core::{ProviderKind, PushBody, Request, Response};
use push_provider::{A2Transport, ApnsAdapter, ApnsEndpoint, FcmAdapter, HttpFcmTransport};
use push_worker::{CancellationToken, ResponseStream, Worker};

use crate::config::{ApnsConfig, ApnsCredentials, Config, FcmConfig};

/// Routes generic push requests to the worker that owns the project.
#[trait_variant::make(Send)]
pub trait Dispatch: Send + Sync {
    /// Dispatch and collect every device response.
    ///
    /// Returns `None` when no worker serves `project_id`.
    async fn dispatch(
        &self,
        project_id: &str,
        devices: Vec<String>,
        body: PushBody,
    ) -> Option<Vec<Response>>;
}

/// A configured worker, by provider.
pub enum Dispatcher {
    Apns(Worker<ApnsAdapter<A2Transport>>),
    Fcm(Worker<FcmAdapter<HttpFcmTransport>>),
}

impl Dispatcher {
    pub async fn send(&self, ctx: CancellationToken, req: Request) -> ResponseStream {
        match self {
            Self::Apns(worker) => worker.send(ctx, req).await,
            Self::Fcm(worker) => worker.send(ctx, req).await,
        }
    }

    pub async fn shutdown(&self) {
        match self {
            Self::Apns(worker) => worker.shutdown().await,
            Self::Fcm(worker) => worker.shutdown().await,
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            Self::Apns(worker) => worker.project_id(),
            Self::Fcm(worker) => worker.project_id(),
        }
    }
}

/// All workers of a gateway process.
#[derive(Clone)]
pub struct Registry {
    workers: Arc<HashMap<String, Dispatcher>>,
    cancel: CancellationToken,
}

impl Registry {
    /// Build every worker named in the config.
    pub fn from_config(config: &Config) -> color_eyre::eyre::Result<Self> {
        let mut workers = HashMap::new();

        for cfg in &config.apns {
            let worker = apns_worker(cfg)
                .wrap_err_with(|| format!("failed to build APNs worker {}", cfg.worker.project_id))?;
            workers.insert(cfg.worker.project_id.clone(), Dispatcher::Apns(worker));
        }

        for cfg in &config.fcm {
            let worker = fcm_worker(cfg)
                .wrap_err_with(|| format!("failed to build FCM worker {}", cfg.worker.project_id))?;
            workers.insert(cfg.worker.project_id.clone(), Dispatcher::Fcm(worker));
        }

        Ok(Self::new(workers))
    }

    pub fn new(workers: HashMap<String, Dispatcher>) -> Self {
        Self {
            workers: Arc::new(workers),
            cancel: CancellationToken::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Shut every worker down, cancelling in-flight sends after `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        let drain = async {
            for worker in self.workers.values() {
                worker.shutdown().await;
            }
        };

        tokio::pin!(drain);

        if tokio::time::timeout(grace, &mut drain).await.is_err() {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "workers still busy after grace period, cancelling in-flight sends"
            );
            self.cancel.cancel();
            drain.await;
        }

        tracing::info!(workers = self.workers.len(), "all workers stopped");
    }
}

impl Dispatch for Registry {
    async fn dispatch(
        &self,
        project_id: &str,
        devices: Vec<String>,
        body: PushBody,
    ) -> Option<Vec<Response>> {
        let worker = self.workers.get(project_id)?;

        let req = Request::new(project_id, devices, body);
        let mut rx = worker.send(self.cancel.child_token(), req).await;

        let mut responses = Vec::new();
        while let Some(resp) = rx.recv().await {
            responses.push(resp);
        }

        Some(responses)
    }
}

fn apns_worker(cfg: &ApnsConfig) -> color_eyre::eyre::Result<Worker<ApnsAdapter<A2Transport>>> {
    let endpoint = if cfg.sandbox {
        ApnsEndpoint::Sandbox
    } else {
        ApnsEndpoint::Production
    };

    let transport = match &cfg.credentials {
        ApnsCredentials::Certificate { path, password } => {
            let der = std::fs::read(path)
                .wrap_err_with(|| format!("failed to read certificate {}", path.display()))?;
            A2Transport::certificate(&der, password, endpoint)?
        }
        ApnsCredentials::Token {
            key_path,
            key_id,
            team_id,
        } => {
            let pem = std::fs::read(key_path)
                .wrap_err_with(|| format!("failed to read signing key {}", key_path.display()))?;
            A2Transport::token(&pem, key_id, team_id, endpoint)?
        }
    };

    let converter = new_converter(cfg.converter, ProviderKind::Apns, cfg.capabilities())?;
    let worker = Worker::new(&cfg.worker, converter, ApnsAdapter::new(transport))?;

    tracing::info!(
        project_id = %worker.project_id(),
        pool_size = worker.pool_size(),
        nop_mode = worker.nop_mode(),
        sandbox = cfg.sandbox,
        "APNs worker ready"
    );

    Ok(worker)
}

fn fcm_worker(cfg: &FcmConfig) -> color_eyre::eyre::Result<Worker<FcmAdapter<HttpFcmTransport>>> {
    let transport = HttpFcmTransport::new(&cfg.endpoint, &cfg.server_key, cfg.timeout())?;

    let converter = new_converter(ConverterKind::Api, ProviderKind::Fcm, cfg.capabilities())?;
    let worker = Worker::new(&cfg.worker, converter, FcmAdapter::new(transport))?;

    tracing::info!(
        project_id = %worker.project_id(),
        pool_size = worker.pool_size(),
        nop_mode = worker.nop_mode(),
        "FCM worker ready"
    );

    Ok(worker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fcm_workers_from_config() {
        let config = Config::parse(
            r#"
            [[fcm]]
            project_id = "android"
            server_key = "AAAA"
            threads = 3
            nop_mode = true
            "#,
        )
        .unwrap();

        let registry = Registry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);

        let responses = registry
            .dispatch(
                "android",
                vec!["t1".into(), "t2".into()],
                PushBody::new(push_core::PushKind::Silent),
            )
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(Response::is_success));

        registry.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let registry = Registry::new(HashMap::new());
        assert!(registry.is_empty());
        assert!(
            registry
                .dispatch("missing", vec!["t".into()], PushBody::default())
                .await
                .is_none()
        );
    }

    #[test]
    fn test_missing_certificate_fails() {
        let config = Config::parse(
            r#"
            [[apns]]
            project_id = "ios"
            credentials = { kind = "certificate", path = "/nonexistent/ios.p12" }
            "#,
        )
        .unwrap();

        let err = Registry::from_config(&config).err().unwrap();
        assert!(format!("{err:?}").contains("failed to build APNs worker ios"));
    }
}
