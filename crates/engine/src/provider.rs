use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tokio::sync::broadcast;

use kts_storage::{SqliteStorage, Storage};

use crate::config::ProviderConfig;
use crate::error::EngineError;
use crate::generator::{self, GeneratorOptions, TickReport};
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::request::{Request, ResourceKind};
use crate::resolver::Resolver;
use crate::response::Outcome;

/// Shareable handle to a [`Resolver`]. Every call takes the lock, so
/// requests from any number of clones are applied one at a time.
pub struct Provider<S: Storage> {
    inner: Arc<Mutex<Resolver<S>>>,
    notifier: ChangeNotifier,
}

impl<S: Storage> Clone for Provider<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notifier: self.notifier.clone(),
        }
    }
}

impl Provider<SqliteStorage> {
    pub fn open(config: &ProviderConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let storage = config.open_storage()?;
        Ok(Self::new(Resolver::new(storage, config)))
    }
}

impl<S: Storage> Provider<S> {
    pub fn new(resolver: Resolver<S>) -> Self {
        let notifier = resolver.notifier().clone();
        Self {
            inner: Arc::new(Mutex::new(resolver)),
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Resolver<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn resolve(&self, request: Request) -> Outcome {
        self.lock().resolve(request)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    pub fn with_resolver<T>(&self, f: impl FnOnce(&mut Resolver<S>) -> T) -> T {
        f(&mut self.lock())
    }

    /// Clears the store and writes the starter artist with its albums.
    pub fn seed(&self) -> Result<(), EngineError> {
        let mut resolver = self.lock();
        generator::seed(resolver.storage_mut())?;
        self.notifier.notify(vec![ResourceKind::Artist, ResourceKind::Album]);
        Ok(())
    }

    /// Runs one generator tick and notifies observers if it wrote anything.
    pub fn generate<R: Rng + ?Sized>(&self, options: GeneratorOptions, rng: &mut R) -> Result<TickReport, EngineError> {
        let report = {
            let mut resolver = self.lock();
            generator::tick(resolver.storage_mut(), options, rng)?
        };
        if report.changed() {
            self.notifier.notify(report.kinds());
        }
        Ok(report)
    }
}
