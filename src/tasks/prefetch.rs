use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::select;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::{JoinError, JoinHandle, spawn_blocking};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::events::{DecodedImage, Notice};
use crate::placeholder;
use crate::tasks::files::{Frames, ImageSource, Step};
use crate::tasks::loader::Decoder;

/// Decoded images held ahead of the consumer.
pub const PREFETCH_CAPACITY: usize = 1;

/// Single-slot handoff between one producer task and the session.
///
/// Once the source is drained every `receive` yields the "no more images"
/// marker until the channel is cancelled. A cancelled channel never yields
/// another item and is not reused. Dropping the channel cancels it.
pub struct PrefetchChannel {
    rx: Receiver<DecodedImage>,
    cancel: CancellationToken,
    producer: Option<JoinHandle<()>>,
    root: PathBuf,
}

impl PrefetchChannel {
    /// Start the producer for `source`. Must be called inside a tokio runtime.
    pub fn spawn(source: ImageSource, decoder: Arc<dyn Decoder>) -> Self {
        let (tx, rx) = mpsc::channel(PREFETCH_CAPACITY);
        let cancel = CancellationToken::new();
        let root = source.root().to_path_buf();
        let producer = tokio::spawn(run(source, decoder, tx, cancel.clone()));
        Self {
            rx,
            cancel,
            producer: Some(producer),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for the next image. `None` once cancelled or if the producer died.
    pub async fn receive(&mut self) -> Option<DecodedImage> {
        if self.cancel.is_cancelled() {
            return None;
        }
        select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    /// Stop the producer and drop anything already buffered.
    pub fn cancel(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!(root = %self.root.display(), "cancelling prefetch");
        self.cancel.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait until the producer task has exited.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        self.cancel();
        match self.producer.take() {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }
}

impl Drop for PrefetchChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum ProducerState {
    /// Draining the shuffled candidates.
    Scanning(Frames),
    /// Candidates drained; the marker is sent on every request.
    Exhausted(DecodedImage),
}

#[instrument(skip_all, fields(root = %source.root().display()))]
async fn run(
    source: ImageSource,
    decoder: Arc<dyn Decoder>,
    tx: Sender<DecodedImage>,
    cancel: CancellationToken,
) {
    let scan = spawn_blocking(move || source.produce(decoder));
    let frames = select! {
        _ = cancel.cancelled() => {
            debug!("cancel received during scan; exiting producer");
            return;
        }
        res = scan => match res {
            Ok(frames) => frames,
            Err(err) => {
                error!("scan worker failed: {err}");
                return;
            }
        }
    };

    let mut state = ProducerState::Scanning(frames);
    loop {
        let (next, item) = match state {
            ProducerState::Scanning(mut frames) => {
                // checkpoint before each decode
                if cancel.is_cancelled() {
                    break;
                }
                let step = spawn_blocking(move || {
                    let step = frames.advance();
                    (frames, step)
                });
                let res = select! {
                    _ = cancel.cancelled() => break,
                    res = step => res,
                };
                match res {
                    Ok((frames, Step::Decoded(image))) => {
                        (ProducerState::Scanning(frames), Some(image))
                    }
                    Ok((frames, Step::Skipped(_))) => (ProducerState::Scanning(frames), None),
                    Ok((_, Step::Done)) => {
                        info!("all candidates delivered; switching to exhaustion marker");
                        let marker = placeholder::render_blocking(Notice::NoMoreImages).await;
                        (ProducerState::Exhausted(marker), None)
                    }
                    Err(err) => {
                        error!("decode worker failed: {err}");
                        break;
                    }
                }
            }
            ProducerState::Exhausted(marker) => {
                let item = marker.clone();
                (ProducerState::Exhausted(marker), Some(item))
            }
        };
        state = next;

        let Some(item) = item else {
            continue;
        };
        // checkpoint before blocking on a full buffer
        select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancel received while sending; dropping item");
                break;
            }
            res = tx.send(item) => {
                if res.is_err() {
                    debug!("consumer gone; exiting producer");
                    break;
                }
            }
        }
    }
    debug!("producer exited");
}
