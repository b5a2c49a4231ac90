//! Shared prompt services.
//!
//! Hosts that open the same vault from several places should share one
//! [`PromptService`] so usage ranking stays consistent. The application
//! creates one registry at startup and hands it to whatever needs a service;
//! the registry keeps one service per repository identity.
//!
//! ```text
//! PromptServiceRegistry
//!   ├── "fs:/home/me/vault" → Arc<PromptService>
//!   └── "memory:3"          → Arc<PromptService>
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::prompt::PromptService;
use crate::config::PromptSettings;
use crate::storage::NoteRepository;
use crate::{Error, Result};

/// One [`PromptService`] per repository.
///
/// The first construction for a repository wins. Later requests with
/// different settings get the existing service and a logged warning.
#[derive(Default)]
pub struct PromptServiceRegistry {
    services: Mutex<HashMap<String, Arc<PromptService>>>,
}

impl PromptServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the service for `repository`, creating one with `settings`
    /// if none exists.
    ///
    /// An existing service is returned even when it was built with different
    /// settings; the mismatch is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn get_or_create(
        &self,
        repository: Arc<dyn NoteRepository>,
        settings: PromptSettings,
    ) -> Result<Arc<PromptService>> {
        let id = repository.id().to_string();
        if let Some(existing) = self.get(&id)? {
            if existing.settings() != &settings {
                tracing::warn!(
                    repository = %id,
                    existing_folder = %existing.settings().folder,
                    requested_folder = %settings.folder,
                    "Prompt service already exists with different settings; keeping the first"
                );
            }
            return Ok(existing);
        }
        self.get_or_insert_with(&id, || PromptService::new(repository, settings))
    }

    /// Returns the service registered under `repository_id`, building it with
    /// `build` if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn get_or_insert_with<F>(&self, repository_id: &str, build: F) -> Result<Arc<PromptService>>
    where
        F: FnOnce() -> PromptService,
    {
        let mut services = self.lock()?;
        if let Some(existing) = services.get(repository_id) {
            return Ok(Arc::clone(existing));
        }

        let service = Arc::new(build());
        tracing::debug!(
            repository = repository_id,
            folder = %service.settings().folder,
            "Registered prompt service"
        );
        services.insert(repository_id.to_string(), Arc::clone(&service));
        Ok(service)
    }

    /// Returns the service registered under `repository_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn get(&self, repository_id: &str) -> Result<Option<Arc<PromptService>>> {
        Ok(self.lock()?.get(repository_id).cloned())
    }

    /// Returns the number of registered services.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Returns true if no service is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<PromptService>>>> {
        self.services
            .lock()
            .map_err(|_| Error::operation("prompt_service_registry", "Lock poisoned"))
    }
}
