use crate::api::{ApiResponse, Transport};
use crate::error::TransportError;
use crate::sync::{Outgoing, RequestId, SyncController};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// The answer to one request, on its way back to the controller.
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub result: Result<ApiResponse, TransportError>,
}

/// Puts queued requests on the wire and hands the answers back.
///
/// Requests run as tasks on a tokio runtime; finished ones land in a channel that the owning
/// thread drains with `pump`, so the controller itself is never touched off-thread.
pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    runtime: Arc<Runtime>,
    tx: async_channel::Sender<Completion>,
    rx: async_channel::Receiver<Completion>,
    in_flight: usize,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("bridge-editor-net")
            .build()?;
        Ok(Self::with_runtime(transport, Arc::new(runtime)))
    }

    pub fn with_runtime(transport: T, runtime: Arc<Runtime>) -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            transport: Arc::new(transport),
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, outgoing: Outgoing) {
        let Outgoing { id, request } = outgoing;
        log::debug!("Dispatching {} request {id}", request.name());

        let future = self.transport.send(request);
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let result = future.await;
            if tx.send(Completion { id, result }).await.is_err() {
                log::debug!("Dispatcher gone, dropping answer to request {id}");
            }
        });
    }

    /// Send everything the controller queued and apply whatever has come back so far.
    /// Returns the number of completions applied.
    pub fn pump(&mut self, controller: &mut SyncController) -> usize {
        for outgoing in controller.take_requests() {
            self.dispatch(outgoing);
        }

        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(controller, completion);
            applied += 1;
        }
        applied
    }

    /// Like `pump`, but waits until no request is left in flight, including the follow-up
    /// requests answers trigger (a save is followed by a fetch).
    pub fn pump_blocking(&mut self, controller: &mut SyncController) {
        loop {
            for outgoing in controller.take_requests() {
                self.dispatch(outgoing);
            }
            if self.in_flight == 0 {
                break;
            }
            match self.rx.recv_blocking() {
                Ok(completion) => self.apply(controller, completion),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, controller: &mut SyncController, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        controller.handle_completion(completion.id, completion.result);
    }
}
