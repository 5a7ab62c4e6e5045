//! Dispatch worker.

use std::sync::Arc;

use push_convert::Converter;
use push_core::{DispatchError, ProviderKind, Request, Response, token_hash};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{Adapter, WorkerConfig};

/// Per-request stream of device responses, in device order.
pub type ResponseStream = mpsc::Receiver<Response>;

/// Dispatch worker for one provider.
///
/// At most `pool_size` requests fan out at once. Each request is converted
/// once and delivered to its devices sequentially, reusing one notification.
pub struct Worker<A> {
    project_id: String,
    provider: ProviderKind,
    nop_mode: bool,
    pool_size: u32,
    permits: Arc<Semaphore>,
    converter: Arc<dyn Converter>,
    adapter: Arc<A>,
}

impl<A> Worker<A>
where
    A: Adapter + 'static,
{
    /// Create a worker.
    ///
    /// Fails with [`DispatchError::InvalidOutputType`] when the converter and
    /// the adapter disagree on the provider.
    pub fn new(
        config: &WorkerConfig,
        converter: Arc<dyn Converter>,
        adapter: A,
    ) -> Result<Self, DispatchError> {
        let provider = converter.provider();
        let actual = adapter.new_notification().provider();
        if provider != actual {
            return Err(DispatchError::InvalidOutputType {
                expected: provider,
                actual,
            });
        }

        let pool_size = config.pool_size();

        Ok(Self {
            project_id: config.project_id.clone(),
            provider,
            nop_mode: config.nop_mode,
            pool_size,
            permits: Arc::new(Semaphore::new(pool_size as usize)),
            converter,
            adapter: Arc::new(adapter),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn nop_mode(&self) -> bool {
        self.nop_mode
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    /// Permits not currently held by a fan-out.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Dispatch a request.
    ///
    /// Waits for a free permit, then returns while the fan-out runs in the
    /// background. The permit is held until the last device is processed.
    /// `ctx` is handed to every device send; the fan-out itself does not stop
    /// when it is cancelled.
    pub async fn send(&self, ctx: CancellationToken, req: Request) -> ResponseStream {
        let (tx, rx) = mpsc::channel(req.devices.len().max(1));

        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            self.reject(&req, DispatchError::Shutdown, &tx);
            return rx;
        };

        let dispatch = Dispatch {
            project_id: self.project_id.clone(),
            nop_mode: self.nop_mode,
            converter: Arc::clone(&self.converter),
            adapter: Arc::clone(&self.adapter),
        };

        tokio::spawn(async move {
            let _permit = permit;
            dispatch.run(&ctx, req, tx).await;
        });

        rx
    }

    /// Wait until no fan-out holds a permit.
    ///
    /// Returns immediately once the worker is shut down.
    pub async fn wait_idle(&self) {
        let _all = self.permits.acquire_many(self.pool_size).await;
    }

    /// Stop accepting requests and wait for in-flight fan-outs to finish.
    pub async fn shutdown(&self) {
        if let Ok(all) = self.permits.acquire_many(self.pool_size).await {
            all.forget();
        }
        self.permits.close();

        tracing::info!(project_id = %self.project_id, "worker shut down");
    }

    fn reject(&self, req: &Request, error: DispatchError, tx: &mpsc::Sender<Response>) {
        tracing::warn!(project_id = %req.project_id, error = %error, "rejecting request");

        if req.devices.is_empty() {
            let _ = tx.try_send(Response::failure(&self.project_id, "", error));
            return;
        }

        for token in &req.devices {
            let _ = tx.try_send(Response::failure(&self.project_id, token, error.clone()));
        }
    }
}

/// State moved into one request's fan-out task.
struct Dispatch<A> {
    project_id: String,
    nop_mode: bool,
    converter: Arc<dyn Converter>,
    adapter: Arc<A>,
}

impl<A: Adapter> Dispatch<A> {
    async fn run(&self, ctx: &CancellationToken, req: Request, tx: mpsc::Sender<Response>) {
        let Request {
            project_id: label,
            devices,
            payload,
        } = req;

        if devices.is_empty() {
            let error = DispatchError::InvalidDeviceToken;
            tracing::error!(project_id = %label, error = %error, "request has no devices");
            self.emit(&tx, Response::failure(&self.project_id, "", error))
                .await;
            return;
        }

        let mut notification = self.adapter.new_notification();
        let converted = self.converter.convert(&payload, &mut notification);

        for token in devices {
            let token_hash = token_hash(&token);

            let error = match &converted {
                Err(e) => {
                    tracing::error!(project_id = %label, %token_hash, error = %e, "convert incoming message");
                    Some(e.clone())
                }
                Ok(()) if self.nop_mode => None,
                Ok(()) => {
                    match self.adapter.send_one(ctx, &token, &mut notification).await {
                        Ok(()) => {
                            tracing::info!(project_id = %label, %token_hash, "success send");
                            None
                        }
                        Err(e) => {
                            tracing::error!(project_id = %label, %token_hash, error = %e, "failed to send");
                            Some(e)
                        }
                    }
                }
            };

            let response = Response {
                project_id: self.project_id.clone(),
                device_token: token,
                error,
            };

            if self.nop_mode && converted.is_ok() {
                tracing::info!(
                    project_id = %response.project_id,
                    %token_hash,
                    error = ?response.error,
                    "nop mode, send notification"
                );
            }

            self.emit(&tx, response).await;
        }
    }

    async fn emit(&self, tx: &mpsc::Sender<Response>, response: Response) {
        if tx.send(response).await.is_err() {
            tracing::debug!(project_id = %self.project_id, "response stream dropped by caller");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use push_convert::{ApiFcmConverter, ConverterKind, Notification, new_converter};
    use push_core::{AlertingPush, Capabilities, EncryptedPush, PushBody, PushKind, VoipPush};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sent {
        token: String,
        empty: bool,
        cancelled: bool,
    }

    #[derive(Default)]
    struct MockAdapter {
        sent: Arc<Mutex<Vec<Sent>>>,
        failing: Vec<String>,
        panic_on: Option<String>,
        gate: Option<Arc<Semaphore>>,
    }

    impl Adapter for MockAdapter {
        fn new_notification(&self) -> Notification {
            Notification::empty(ProviderKind::Apns)
        }

        async fn send_one(
            &self,
            ctx: &CancellationToken,
            token: &str,
            notification: &mut Notification,
        ) -> Result<(), DispatchError> {
            if let Some(gate) = &self.gate {
                let _open = gate.acquire().await;
            }
            if self.panic_on.as_deref() == Some(token) {
                panic!("adapter blew up");
            }

            let req = notification.as_apns_mut()?;
            req.token = token.to_string();

            self.sent.lock().unwrap().push(Sent {
                token: token.to_string(),
                empty: req.is_empty(),
                cancelled: ctx.is_cancelled(),
            });

            if self.failing.iter().any(|t| t == token) {
                Err(DispatchError::send_failure(400, "BadDeviceToken"))
            } else {
                Ok(())
            }
        }
    }

    fn worker(config: WorkerConfig, adapter: MockAdapter) -> Worker<MockAdapter> {
        let converter = new_converter(
            ConverterKind::Api,
            ProviderKind::Apns,
            Capabilities::alerting(),
        )
        .unwrap();
        Worker::new(&config, converter, adapter).unwrap()
    }

    fn request(devices: &[&str], payload: PushBody) -> Request {
        Request::new(
            "proj",
            devices.iter().map(|d| d.to_string()).collect(),
            payload,
        )
    }

    fn alert() -> PushBody {
        PushBody::new(PushKind::Alerting(AlertingPush::plain("Hi", "There")))
    }

    async fn collect(mut rx: ResponseStream) -> Vec<Response> {
        let mut out = Vec::new();
        while let Some(resp) = rx.recv().await {
            out.push(resp);
        }
        out
    }

    fn tokens(responses: &[Response]) -> Vec<&str> {
        responses.iter().map(|r| r.device_token.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fan_out_in_device_order() {
        let adapter = MockAdapter::default();
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(
            worker
                .send(CancellationToken::new(), request(&["a", "b", "a"], alert()))
                .await,
        )
        .await;

        assert_eq!(tokens(&responses), vec!["a", "b", "a"]);
        assert!(responses.iter().all(Response::is_success));
        assert!(responses.iter().all(|r| r.project_id == "ios"));

        let sent = sent.lock().unwrap();
        let sent_tokens: Vec<&str> = sent.iter().map(|s| s.token.as_str()).collect();
        assert_eq!(sent_tokens, vec!["a", "b", "a"]);
        assert!(sent.iter().all(|s| !s.empty));
    }

    #[tokio::test]
    async fn test_empty_devices() {
        let adapter = MockAdapter::default();
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(worker.send(CancellationToken::new(), request(&[], alert())).await).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].device_token, "");
        assert_eq!(responses[0].error, Some(DispatchError::InvalidDeviceToken));
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(worker.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_conversion_failure_broadcast() {
        let adapter = MockAdapter::default();
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(
            worker
                .send(
                    CancellationToken::new(),
                    request(&["a", "b", "c"], PushBody::default()),
                )
                .await,
        )
        .await;

        assert_eq!(tokens(&responses), vec!["a", "b", "c"]);
        assert!(
            responses
                .iter()
                .all(|r| r.error == Some(DispatchError::UnknownMessageKind))
        );
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nop_mode_skips_transport() {
        let adapter = MockAdapter {
            failing: vec!["a".into()],
            ..Default::default()
        };
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios").with_nop_mode(true), adapter);
        assert!(worker.nop_mode());

        let responses =
            collect(worker.send(CancellationToken::new(), request(&["a", "b"], alert())).await)
                .await;

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(Response::is_success));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_payload_reaches_every_device() {
        let cases = [
            (
                PushBody::new(PushKind::Encrypted(EncryptedPush::default())),
                DispatchError::EmptyEncryptedPayload,
            ),
            (
                PushBody::new(PushKind::Voip(VoipPush::default())),
                DispatchError::UnsupportedCapability(
                    "attempted voip-push using non-voip credential".to_string(),
                ),
            ),
        ];

        for (payload, expected) in cases {
            let adapter = MockAdapter::default();
            let sent = adapter.sent.clone();
            let worker = worker(WorkerConfig::new("ios"), adapter);

            let responses = collect(
                worker
                    .send(CancellationToken::new(), request(&["a", "b", "c"], payload))
                    .await,
            )
            .await;

            assert_eq!(tokens(&responses), vec!["a", "b", "c"]);
            assert!(responses.iter().all(|r| r.error.as_ref() == Some(&expected)));
            assert!(sent.lock().unwrap().is_empty());
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_nop_mode_logs_response_without_token() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let worker = worker(
            WorkerConfig::new("ios").with_nop_mode(true),
            MockAdapter::default(),
        );
        let responses = collect(
            worker
                .send(
                    CancellationToken::new(),
                    request(&["secret-device-token"], alert()),
                )
                .await,
        )
        .await;
        assert!(responses[0].is_success());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("nop mode, send notification"));
        assert!(output.contains("project_id=ios"));
        assert!(output.contains(&token_hash("secret-device-token")));
        assert!(output.contains("error=None"));
        assert!(!output.contains("secret-device-token"));
    }

    #[tokio::test]
    async fn test_device_failure_is_isolated() {
        let adapter = MockAdapter {
            failing: vec!["b".into()],
            ..Default::default()
        };
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(
            worker
                .send(CancellationToken::new(), request(&["a", "b", "c"], alert()))
                .await,
        )
        .await;

        assert!(responses[0].is_success());
        assert_eq!(
            responses[1].error,
            Some(DispatchError::send_failure(400, "BadDeviceToken"))
        );
        assert!(responses[2].is_success());
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_silent_push_reaches_adapter_empty() {
        let adapter = MockAdapter::default();
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(
            worker
                .send(
                    CancellationToken::new(),
                    request(&["a", "b"], PushBody::new(PushKind::Silent)),
                )
                .await,
        )
        .await;

        assert!(responses.iter().all(Response::is_success));
        assert!(sent.lock().unwrap().iter().all(|s| s.empty));
    }

    #[tokio::test]
    async fn test_pool_blocks_extra_request() {
        let gate = Arc::new(Semaphore::new(0));
        let adapter = MockAdapter {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let worker = worker(WorkerConfig::new("ios").with_threads(1), adapter);

        let first = worker
            .send(CancellationToken::new(), request(&["a"], alert()))
            .await;
        assert_eq!(worker.available_permits(), 0);

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            worker.send(CancellationToken::new(), request(&["b"], alert())),
        )
        .await;
        assert!(blocked.is_err(), "second request must wait for a permit");

        gate.add_permits(16);
        assert_eq!(collect(first).await.len(), 1);

        let second = tokio::time::timeout(
            Duration::from_secs(1),
            worker.send(CancellationToken::new(), request(&["b"], alert())),
        )
        .await
        .expect("permit released after first fan-out");
        assert_eq!(tokens(&collect(second).await), vec!["b"]);
    }

    #[tokio::test]
    async fn test_cancellation_does_not_stop_fan_out() {
        // cancellation is only observed by the adapter
        let adapter = MockAdapter::default();
        let sent = adapter.sent.clone();
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let ctx = CancellationToken::new();
        ctx.cancel();

        let responses = collect(worker.send(ctx, request(&["a", "b", "c"], alert())).await).await;

        assert_eq!(responses.len(), 3);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|s| s.cancelled));
    }

    #[tokio::test]
    async fn test_shutdown_waits_then_rejects() {
        let gate = Arc::new(Semaphore::new(0));
        let adapter = MockAdapter {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let worker = worker(WorkerConfig::new("ios").with_threads(2), adapter);

        let in_flight = worker
            .send(CancellationToken::new(), request(&["a"], alert()))
            .await;

        let pending = tokio::time::timeout(Duration::from_millis(50), worker.shutdown()).await;
        assert!(pending.is_err(), "shutdown waits for the in-flight fan-out");

        gate.add_permits(16);
        assert!(collect(in_flight).await[0].is_success());
        worker.shutdown().await;

        let responses = collect(
            worker
                .send(CancellationToken::new(), request(&["x", "y"], alert()))
                .await,
        )
        .await;
        assert_eq!(tokens(&responses), vec!["x", "y"]);
        assert!(
            responses
                .iter()
                .all(|r| r.error == Some(DispatchError::Shutdown))
        );
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let gate = Arc::new(Semaphore::new(0));
        let adapter = MockAdapter {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let worker = worker(WorkerConfig::new("ios").with_threads(2), adapter);

        let in_flight = worker
            .send(CancellationToken::new(), request(&["a"], alert()))
            .await;

        let busy = tokio::time::timeout(Duration::from_millis(50), worker.wait_idle()).await;
        assert!(busy.is_err());

        gate.add_permits(16);
        assert_eq!(collect(in_flight).await.len(), 1);
        tokio::time::timeout(Duration::from_secs(1), worker.wait_idle())
            .await
            .expect("idle once the fan-out finished");

        // still accepting work
        assert_eq!(worker.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_panic_releases_permit() {
        let adapter = MockAdapter {
            panic_on: Some("boom".into()),
            ..Default::default()
        };
        let worker = worker(WorkerConfig::new("ios"), adapter);

        let responses = collect(
            worker
                .send(CancellationToken::new(), request(&["ok", "boom"], alert()))
                .await,
        )
        .await;

        assert_eq!(tokens(&responses), vec!["ok"]);
        tokio::task::yield_now().await;
        assert_eq!(worker.available_permits(), 1);
    }

    #[test]
    fn test_provider_mismatch_rejected() {
        let converter = Arc::new(ApiFcmConverter::new(Capabilities::alerting()));
        let result = Worker::new(&WorkerConfig::new("ios"), converter, MockAdapter::default());

        assert!(matches!(
            result,
            Err(DispatchError::InvalidOutputType {
                expected: ProviderKind::Fcm,
                actual: ProviderKind::Apns,
            })
        ));
    }
}
