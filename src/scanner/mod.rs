//! Origin probing engine
//!
//! Expands base requests into batches of transactions, dispatches every
//! transaction of a batch concurrently and classifies the answers.

pub mod classifier;
pub mod origins;
pub mod transaction;

use crate::error::{Result, TransactionError};
use crate::http::Transport;
use crate::models::{Batch, BaseRequest, Transaction};
use crate::report::OutputSink;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info};

pub use classifier::classify;
pub use origins::{generate_variants, target_host, GeneratorOptions};
pub use transaction::expand;

/// Builds one batch per base request
pub fn build_batches(requests: &[BaseRequest], options: &GeneratorOptions) -> Vec<Batch> {
    requests
        .iter()
        .map(|request| {
            let target_host = target_host(&request.url);
            let variants = generate_variants(&request.url, options);
            for variant in &variants {
                debug!("Origin variant [{}] {}", variant.label(), variant.value);
            }
            Batch {
                request: request.clone(),
                transactions: expand(request, &variants, target_host.as_deref()),
                target_host,
            }
        })
        .collect()
}

/// Sends the transactions of each batch and reports them to a sink
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    sink: Arc<Mutex<Box<dyn OutputSink>>>,
    delay: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no delay between launches
    pub fn new(transport: Arc<dyn Transport>, sink: Box<dyn OutputSink>) -> Self {
        Self {
            transport,
            sink: Arc::new(Mutex::new(sink)),
            delay: Duration::ZERO,
            shutdown: None,
        }
    }

    /// Waits `delay` after launching each transaction
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stops launching transactions once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs every batch in order and hands the results to the sink.
    ///
    /// Returns the dispatched batches with their transactions in launch
    /// order. After a shutdown request, transactions that were never
    /// launched are left out.
    pub async fn run(&self, batches: Vec<Batch>) -> Result<Vec<Batch>> {
        let mut shutdown = self.shutdown.clone();
        let mut done = Vec::with_capacity(batches.len());

        for batch in batches {
            if is_shutdown(&shutdown) {
                info!("Shutdown requested, skipping {}", batch.request.url);
                continue;
            }
            done.push(self.run_batch(batch, &mut shutdown).await);
        }

        lock(&self.sink).complete(&done)?;
        Ok(done)
    }

    async fn run_batch(
        &self,
        mut batch: Batch,
        shutdown: &mut Option<watch::Receiver<bool>>,
    ) -> Batch {
        lock(&self.sink).batch_header(&batch.request);

        let transactions = std::mem::take(&mut batch.transactions);
        let total = transactions.len();
        info!("Launching {total} transactions against {}", batch.request.url);

        let mut set = JoinSet::new();
        let mut launched = 0;

        for (index, transaction) in transactions.into_iter().enumerate() {
            if is_shutdown(shutdown) {
                info!("Shutdown requested after {launched}/{total} transactions");
                break;
            }

            let transport = Arc::clone(&self.transport);
            let sink = Arc::clone(&self.sink);
            set.spawn(async move {
                let transaction = process_isolated(transaction, transport.as_ref()).await;
                render_row(&sink, &transaction);
                (index, transaction)
            });
            launched += 1;

            self.pause(shutdown).await;
        }

        let mut slots: Vec<Option<Transaction>> = vec![None; launched];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, transaction)) => slots[index] = Some(transaction),
                Err(e) => error!("Transaction task failed: {e}"),
            }
        }

        batch.transactions = slots.into_iter().flatten().collect();
        batch
    }

    async fn pause(&self, shutdown: &mut Option<watch::Receiver<bool>>) {
        if self.delay.is_zero() {
            return;
        }

        match shutdown.as_mut() {
            Some(rx) => {
                tokio::select! {
                    _ = sleep(self.delay) => {}
                    Ok(()) = rx.changed() => {}
                }
            }
            None => sleep(self.delay).await,
        }
    }
}

/// Sends and classifies one transaction
pub async fn process(mut transaction: Transaction, transport: &dyn Transport) -> Transaction {
    transaction::execute(&mut transaction, transport).await;
    transaction.tags = classify(&transaction);
    transaction
}

/// Like [`process`], but a panic is recorded as the transaction's error
async fn process_isolated(transaction: Transaction, transport: &dyn Transport) -> Transaction {
    let fallback = transaction.clone();

    match AssertUnwindSafe(process(transaction, transport))
        .catch_unwind()
        .await
    {
        Ok(transaction) => transaction,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(
                "Transaction for {} with Origin '{}' panicked: {message}",
                fallback.request.url,
                fallback.origin()
            );
            let mut transaction = fallback;
            transaction.set_error(TransactionError::Panicked(message));
            transaction.tags = classify(&transaction);
            transaction
        }
    }
}

/// Hands a finished transaction to the sink; a panicking sink only loses the row
fn render_row(sink: &Mutex<Box<dyn OutputSink>>, transaction: &Transaction) {
    let rendered = std::panic::catch_unwind(AssertUnwindSafe(|| {
        lock(sink).transaction_row(transaction);
    }));

    if let Err(panic) = rendered {
        error!(
            "Rendering the row for {} with Origin '{}' panicked: {}",
            transaction.request.url,
            transaction.origin(),
            panic_message(panic.as_ref())
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn is_shutdown(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
