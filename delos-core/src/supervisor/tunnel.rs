//! WireGuard tunnel supervision
//!
//! Tunnels are brought up and down by run-to-completion `wg-quick`
//! commands. No process handle is kept: whether a tunnel is up is asked of
//! the tool every time.

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use super::commands::CommandProvider;
use super::process::{run_captured, run_captured_blocking};
use super::registry::{Instance, Registry};
use crate::error::SupervisorError;
use crate::types::{TunnelStatus, TunnelStatusMap};

/// A named WireGuard configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelInstance {
    name: String,
}

impl Instance for TunnelInstance {
    fn name(&self) -> &str {
        &self.name
    }
}

impl TunnelInstance {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bring the tunnel up
    pub async fn start(&self, provider: &dyn CommandProvider) -> Result<(), SupervisorError> {
        info!(config = %self.name, "Starting WireGuard [ {} ]", self.name);
        let command = provider.tunnel_up(&self.name)?;
        let result = run_captured(&command)
            .await
            .map_err(|e| self.spawn_failed(e))?;

        if !result.success {
            warn!(config = %self.name, "wg-quick up failed: {}", result.output);
            return Err(SupervisorError::StartFailed {
                name: self.name.clone(),
                output: result.output,
            });
        }
        info!(config = %self.name, "WireGuard [ {} ] started", self.name);
        Ok(())
    }

    /// Bring the tunnel down
    pub async fn stop(&self, provider: &dyn CommandProvider) -> Result<(), SupervisorError> {
        info!(config = %self.name, "Stopping WireGuard [ {} ]", self.name);
        let command = provider.tunnel_down(&self.name)?;
        let result = run_captured(&command)
            .await
            .map_err(|e| self.spawn_failed(e))?;

        if !result.success {
            warn!(config = %self.name, "wg-quick down failed: {}", result.output);
            return Err(SupervisorError::StopFailed {
                name: self.name.clone(),
                output: result.output,
            });
        }
        info!(config = %self.name, "WireGuard [ {} ] stopped", self.name);
        Ok(())
    }

    /// Ask the tool whether this tunnel is up
    ///
    /// The tunnel counts as up iff the status output mentions its name. A
    /// status command that cannot be built or run reports "down".
    pub async fn is_running(&self, provider: &dyn CommandProvider) -> bool {
        let command = match provider.tunnel_status(&self.name) {
            Ok(command) => command,
            Err(e) => {
                warn!(config = %self.name, "{}", e);
                return false;
            }
        };

        match run_captured(&command).await {
            Ok(result) => result.output.contains(&self.name),
            Err(e) => {
                warn!(config = %self.name, "Status query failed: {}", e);
                false
            }
        }
    }

    fn spawn_failed(&self, e: std::io::Error) -> SupervisorError {
        SupervisorError::SpawnFailed {
            name: self.name.clone(),
            reason: e.to_string(),
        }
    }
}

/// Supervisor owning every WireGuard tunnel of this process
#[derive(Debug)]
pub struct TunnelSupervisor {
    registry: Registry<TunnelInstance>,
    provider: Arc<dyn CommandProvider>,
}

impl TunnelSupervisor {
    pub fn new(provider: Arc<dyn CommandProvider>) -> Self {
        info!("Starting WireGuard manager");
        Self {
            registry: Registry::new(),
            provider,
        }
    }

    /// Register a configuration; nothing is started
    pub fn add(&mut self, name: &str) -> Result<&TunnelInstance, SupervisorError> {
        let instance = self.registry.add(TunnelInstance::new(name))?;
        info!(config = %name, "Added WireGuard config {}", name);
        Ok(instance)
    }

    /// Register a configuration and optionally bring it up right away
    ///
    /// A failed start leaves the configuration registered.
    pub async fn add_and_start(&mut self, name: &str, autostart: bool) -> Result<(), SupervisorError> {
        self.add(name)?;
        if autostart {
            self.start(name).await?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&TunnelInstance> {
        self.registry.lookup(name)
    }

    pub async fn start(&mut self, name: &str) -> Result<(), SupervisorError> {
        let instance = self.registry.get_mut(name)?;
        instance.start(self.provider.as_ref()).await
    }

    pub async fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        let instance = self.registry.get_mut(name)?;
        instance.stop(self.provider.as_ref()).await
    }

    /// Fresh query for one tunnel
    pub async fn is_running(&self, name: &str) -> Result<bool, SupervisorError> {
        let instance = self
            .registry
            .lookup(name)
            .ok_or_else(|| SupervisorError::NotFound {
                name: name.to_string(),
            })?;
        Ok(instance.is_running(self.provider.as_ref()).await)
    }

    /// Remove a configuration, bringing it down first when up
    ///
    /// The entry is gone even when stopping fails; the failure is returned.
    pub async fn remove(&mut self, name: &str) -> Result<(), SupervisorError> {
        let instance = self.registry.take(name)?;
        let result = Self::halt(&instance, self.provider.as_ref()).await;
        info!(config = %name, "Removed WireGuard config {}", name);
        result
    }

    /// Live snapshot; every entry queries the tool
    pub async fn status(&self) -> TunnelStatusMap {
        let mut status = TunnelStatusMap::new();
        for instance in self.registry.iter() {
            let started = instance.is_running(self.provider.as_ref()).await;
            status.insert(instance.name.clone(), TunnelStatus { started });
        }
        status
    }

    /// Stop and remove every configuration, in name order
    ///
    /// Returns the failures; the registry is empty afterwards regardless.
    pub async fn shutdown(&mut self) -> Vec<SupervisorError> {
        let instances = self.registry.drain();
        if !instances.is_empty() {
            info!("Stopping {} WireGuard config(s)", instances.len());
        }

        let mut failures = Vec::new();
        for instance in instances {
            if let Err(e) = Self::halt(&instance, self.provider.as_ref()).await {
                warn!(config = %instance.name, "Teardown failed: {}", e);
                failures.push(e);
            }
        }
        failures
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    async fn halt(
        instance: &TunnelInstance,
        provider: &dyn CommandProvider,
    ) -> Result<(), SupervisorError> {
        if instance.is_running(provider).await {
            instance.stop(provider).await
        } else {
            debug!(config = %instance.name, "Not running, nothing to stop");
            Ok(())
        }
    }
}

impl TunnelSupervisor {
    /// Bring down whatever is still registered using blocking commands
    fn stop_remaining_blocking(&mut self) {
        for instance in self.registry.drain() {
            let (Ok(status), Ok(down)) = (
                self.provider.tunnel_status(&instance.name),
                self.provider.tunnel_down(&instance.name),
            ) else {
                continue;
            };

            let running = run_captured_blocking(&status)
                .map(|result| result.output.contains(&instance.name))
                .unwrap_or(false);
            if !running {
                continue;
            }

            match run_captured_blocking(&down) {
                Ok(result) if result.success => {
                    info!(config = %instance.name, "WireGuard [ {} ] stopped", instance.name)
                }
                Ok(result) => warn!(config = %instance.name, "wg-quick down failed: {}", result.output),
                Err(e) => warn!(config = %instance.name, "wg-quick down failed: {}", e),
            }
        }
    }
}

impl Drop for TunnelSupervisor {
    fn drop(&mut self) {
        if self.registry.is_empty() {
            return;
        }

        warn!(
            "WireGuard manager dropped without shutdown, stopping {} config(s)",
            self.registry.len()
        );

        // block_in_place panics on a current-thread runtime
        let on_worker = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if on_worker {
            tokio::task::block_in_place(|| self.stop_remaining_blocking());
        } else {
            self.stop_remaining_blocking();
        }
    }
}
