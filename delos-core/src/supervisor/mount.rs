//! rclone mount supervision
//!
//! Each remote is kept mounted by one long-running `rclone mount` process.
//! Unmounting runs the platform unmount command and then retires that
//! process through the termination escalation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::commands::CommandProvider;
use super::process::{run_captured, ProcessHandle, Termination};
use super::registry::{Instance, Registry};
use super::SupervisorSettings;
use crate::error::SupervisorError;
use crate::types::{MountStatus, MountStatusMap};

/// A remote bound to a local mount path
#[derive(Debug)]
pub struct MountInstance {
    name: String,
    mount_path: PathBuf,
    handle: Option<ProcessHandle>,
}

impl Instance for MountInstance {
    fn name(&self) -> &str {
        &self.name
    }
}

impl MountInstance {
    fn new(name: &str, mount_path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            mount_path,
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// PID of the background mount process, if one is held
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ProcessHandle::pid)
    }

    /// True iff a handle is held and its process is alive
    pub fn is_running(&mut self) -> bool {
        self.handle.as_mut().is_some_and(ProcessHandle::is_alive)
    }

    async fn mount(
        &mut self,
        provider: &dyn CommandProvider,
        settings: &SupervisorSettings,
    ) -> Result<(), SupervisorError> {
        if self.is_running() {
            return Err(SupervisorError::AlreadyRunning {
                name: self.name.clone(),
            });
        }
        // A dead handle from a crashed mount is simply replaced
        self.handle = None;

        let command = provider.mount(&self.name, &self.mount_path)?;
        info!(
            remote = %self.name,
            "Mounting {} to {}",
            self.name,
            self.mount_path.display()
        );

        let mut handle =
            ProcessHandle::spawn(&command, &self.name).map_err(|e| SupervisorError::SpawnFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        if !settings.settle_delay.is_zero() {
            tokio::time::sleep(settings.settle_delay).await;
        }

        if let Some(status) = handle.exit_status() {
            warn!(remote = %self.name, "Mount process exited during startup: {}", status);
            return Err(SupervisorError::MountExited {
                name: self.name.clone(),
                status: status.to_string(),
                output: handle.output_tail(),
            });
        }

        info!(
            remote = %self.name,
            pid = handle.pid(),
            "Mounted {} to {} successfully.",
            self.name,
            self.mount_path.display()
        );
        self.handle = Some(handle);
        Ok(())
    }

    async fn unmount(
        &mut self,
        provider: &dyn CommandProvider,
        settings: &SupervisorSettings,
    ) -> Result<(), SupervisorError> {
        if self.handle.is_none() {
            debug!(remote = %self.name, "Not mounted, nothing to unmount");
            return Ok(());
        }
        if !self.is_running() {
            self.retire(settings).await?;
            return Ok(());
        }

        info!(
            remote = %self.name,
            "Unmounting {} from {}",
            self.name,
            self.mount_path.display()
        );
        self.run_unmount(provider).await?;
        self.retire(settings).await?;

        info!(
            remote = %self.name,
            "Unmounted {} from {} successfully.",
            self.name,
            self.mount_path.display()
        );
        Ok(())
    }

    /// Best-effort stop used by remove and teardown
    ///
    /// The process is escalated even when the unmount command fails; the
    /// first failure is reported.
    async fn halt(
        &mut self,
        provider: &dyn CommandProvider,
        settings: &SupervisorSettings,
    ) -> Result<(), SupervisorError> {
        if !self.is_running() {
            self.handle = None;
            return Ok(());
        }

        info!(remote = %self.name, "Stopping {} before removal", self.name);
        let unmounted = self.run_unmount(provider).await;
        if let Err(e) = &unmounted {
            warn!(remote = %self.name, "{}; retiring mount process anyway", e);
        }
        let retired = self.retire(settings).await.map(|_| ());
        unmounted.and(retired)
    }

    async fn run_unmount(&self, provider: &dyn CommandProvider) -> Result<(), SupervisorError> {
        let command = provider.unmount(&self.mount_path)?;
        let result = run_captured(&command)
            .await
            .map_err(|e| SupervisorError::SpawnFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        if !result.success {
            warn!(remote = %self.name, "Unmount command failed: {}", result.output);
            return Err(SupervisorError::UnmountFailed {
                name: self.name.clone(),
                output: result.output,
            });
        }
        Ok(())
    }

    /// Escalate the held handle; it is dropped only once the process is gone
    async fn retire(
        &mut self,
        settings: &SupervisorSettings,
    ) -> Result<Option<Termination>, SupervisorError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };
        let outcome = handle
            .retire(settings.grace_period, settings.kill_wait)
            .await?;
        self.handle = None;
        Ok(Some(outcome))
    }

    fn status(&mut self) -> MountStatus {
        MountStatus {
            mounted: self.is_running(),
            mount_path: self.mount_path.clone(),
        }
    }
}

/// Supervisor owning every rclone mount of this process
#[derive(Debug)]
pub struct MountSupervisor {
    registry: Registry<MountInstance>,
    provider: Arc<dyn CommandProvider>,
    settings: SupervisorSettings,
}

impl MountSupervisor {
    pub fn new(provider: Arc<dyn CommandProvider>, settings: SupervisorSettings) -> Self {
        info!("Starting rclone manager");
        Self {
            registry: Registry::new(),
            provider,
            settings,
        }
    }

    /// Register a remote; it starts unmounted
    pub fn add(
        &mut self,
        name: &str,
        mount_path: impl Into<PathBuf>,
    ) -> Result<&MountInstance, SupervisorError> {
        let instance = self.registry.add(MountInstance::new(name, mount_path.into()))?;
        info!(remote = %name, "Added remote {}", name);
        Ok(instance)
    }

    /// Register a remote and optionally mount it right away
    ///
    /// A failed mount leaves the remote registered and unmounted.
    pub async fn add_and_mount(
        &mut self,
        name: &str,
        mount_path: impl Into<PathBuf>,
        automount: bool,
    ) -> Result<(), SupervisorError> {
        self.add(name, mount_path)?;
        if automount {
            self.mount(name).await?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&MountInstance> {
        self.registry.lookup(name)
    }

    pub async fn mount(&mut self, name: &str) -> Result<(), SupervisorError> {
        let instance = self.registry.get_mut(name)?;
        instance.mount(self.provider.as_ref(), &self.settings).await
    }

    /// Unmount a remote; succeeds without action when it is not mounted
    ///
    /// On `UnmountFailed` the process handle stays in place.
    pub async fn unmount(&mut self, name: &str) -> Result<(), SupervisorError> {
        let instance = self.registry.get_mut(name)?;
        instance.unmount(self.provider.as_ref(), &self.settings).await
    }

    /// Remove a remote, stopping it first when mounted
    ///
    /// The entry is gone even when stopping fails; the failure is returned.
    pub async fn remove(&mut self, name: &str) -> Result<(), SupervisorError> {
        let mut instance = self.registry.take(name)?;
        let result = instance.halt(self.provider.as_ref(), &self.settings).await;
        info!(remote = %name, "Removed remote {}", name);
        result
    }

    /// Live snapshot; every entry is re-polled
    pub fn status(&mut self) -> MountStatusMap {
        self.registry
            .iter_mut()
            .map(|instance| (instance.name.clone(), instance.status()))
            .collect()
    }

    /// Stop and remove every remote, in name order
    ///
    /// Returns the failures; the registry is empty afterwards regardless.
    pub async fn shutdown(&mut self) -> Vec<SupervisorError> {
        let instances = self.registry.drain();
        if !instances.is_empty() {
            info!("Unmounting {} remote(s)", instances.len());
        }

        let mut failures = Vec::new();
        for mut instance in instances {
            if let Err(e) = instance.halt(self.provider.as_ref(), &self.settings).await {
                warn!(remote = %instance.name, "Teardown failed: {}", e);
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
}

impl Drop for MountSupervisor {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            warn!(
                "rclone manager dropped without shutdown, killing {} mount process(es)",
                self.registry.len()
            );
        }
    }
}
