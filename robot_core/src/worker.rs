use crate::engine::budget::CancelToken;
use crate::engine::config::SearchConfig;
use crate::engine::controller::SearchController;
use crate::engine::error::SearchError;
use crate::engine::{GameAdapter, SearchOutcome};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

type Reply<M> = Result<SearchOutcome<M>, SearchError>;

/// Runs one search on its own thread so the caller (a UI or game loop) can
/// keep polling while the robot thinks.
pub struct SearchWorker;

impl SearchWorker {
    pub fn spawn<G>(config: SearchConfig, position: G) -> Result<SearchHandle<G::Move>, SearchError>
    where
        G: GameAdapter + 'static,
    {
        let controller = SearchController::new(config)?;
        let cancel = controller.cancel_token();
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name(format!("search-move-{}", position.move_number()))
            .spawn(move || {
                let reply = controller.search(&position);
                if tx.send(reply).is_err() {
                    log::debug!("search handle dropped before the reply arrived");
                }
            })?;
        Ok(SearchHandle {
            cancel,
            rx,
            result: None,
            thread: Some(thread),
        })
    }
}

pub struct SearchHandle<M> {
    cancel: CancelToken,
    rx: Receiver<Reply<M>>,
    result: Option<Reply<M>>,
    thread: Option<JoinHandle<()>>,
}

impl<M> SearchHandle<M> {
    /// Ask the search to stop and report its best move so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&mut self) -> bool {
        self.poll();
        self.result.is_some()
    }

    /// The result if the search has finished, without blocking.
    pub fn try_result(&mut self) -> Option<Reply<M>> {
        self.poll();
        let result = self.result.take();
        if result.is_some() {
            self.join();
        }
        result
    }

    /// Block until the search finishes.
    pub fn wait(mut self) -> Reply<M> {
        let result = match self.result.take() {
            Some(result) => result,
            None => self.rx.recv().unwrap_or(Err(SearchError::WorkerLost)),
        };
        self.join();
        result
    }

    fn poll(&mut self) {
        if self.result.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(reply) => self.result = Some(reply),
            Err(TryRecvError::Disconnected) => self.result = Some(Err(SearchError::WorkerLost)),
            Err(TryRecvError::Empty) => {}
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("search thread panicked");
            }
        }
    }
}

impl<M> Drop for SearchHandle<M> {
    fn drop(&mut self) {
        // Detach: the thread sees the cancel and exits on its own.
        self.cancel.cancel();
    }
}
