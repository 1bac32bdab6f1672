//! Best-effort admin bootstrap run at startup.
//!
//! In development, a fresh tenant has no admin and nobody could create one
//! through the API. The initializer dispatches a `TeamCloudUserCreate` for the
//! configured admin user when no admin exists yet. It never fails the host:
//! every error is logged and reported as [`InitializationStatus::Errored`].

use std::sync::Arc;

use anyhow::{Context, bail};
use futures::StreamExt;
use tracing::{error, info, warn};

use orbit_core::{CommandId, UserId};
use orbit_model::{Command, User, UserRole, UserType};

use crate::command_dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::config::{HostEnvironment, OrbitConfig};
use crate::document_store::DocumentStore;
use crate::orchestrator::Orchestrator;
use crate::repositories::UserRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializationStatus {
    /// Not a development host; nothing attempted.
    SkippedEnvironment,
    /// An admin user already exists.
    AlreadyInitialized,
    Initialized { command_id: CommandId },
    /// The command was dispatched but did not complete.
    Failed { reason: String },
    /// Something went wrong before or during dispatch.
    Errored { message: String },
}

pub struct AdminInitializer<S, O> {
    environment: HostEnvironment,
    admin_user_id: Option<UserId>,
    users: Arc<UserRepository<S>>,
    dispatcher: CommandDispatcher<O>,
}

impl<S, O> AdminInitializer<S, O>
where
    S: DocumentStore,
    O: Orchestrator,
{
    pub fn new(
        environment: HostEnvironment,
        users: Arc<UserRepository<S>>,
        dispatcher: CommandDispatcher<O>,
    ) -> Self {
        Self {
            environment,
            admin_user_id: None,
            users,
            dispatcher,
        }
    }

    pub fn from_config(
        config: &OrbitConfig,
        users: Arc<UserRepository<S>>,
        dispatcher: CommandDispatcher<O>,
    ) -> Self {
        let initializer = Self::new(config.environment, users, dispatcher);
        match &config.admin_user_id {
            Some(id) => initializer.with_admin_user(id.clone()),
            None => initializer,
        }
    }

    pub fn with_admin_user(mut self, user_id: UserId) -> Self {
        self.admin_user_id = Some(user_id);
        self
    }

    pub async fn run(&self) -> InitializationStatus {
        match self.try_run().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %format!("{e:#}"), "admin initialization failed");
                InitializationStatus::Errored {
                    message: format!("{e:#}"),
                }
            }
        }
    }

    async fn try_run(&self) -> anyhow::Result<InitializationStatus> {
        if !self.environment.is_development() {
            info!(environment = %self.environment, "skipping admin initialization");
            return Ok(InitializationStatus::SkippedEnvironment);
        }

        let mut admins = self.users.list_admins();
        if let Some(admin) = admins.next().await {
            let admin = admin.context("listing admin users")?;
            info!(user_id = %admin.id, "admin user already present");
            return Ok(InitializationStatus::AlreadyInitialized);
        }

        let Some(user_id) = self.admin_user_id.clone() else {
            bail!("no admin user id configured");
        };

        let mut admin = User::new(user_id).with_role(UserRole::Admin);
        admin.user_type = UserType::User;
        let command = Command::teamcloud_user_create(admin.clone(), admin)
            .context("building admin user command")?;
        let command_id = command.command_id();

        let report = self
            .dispatcher
            .dispatch(&command)
            .await
            .context("dispatching admin user command")?;

        match report.outcome {
            DispatchOutcome::Completed => {
                info!(command_id = %command_id, "admin user created");
                Ok(InitializationStatus::Initialized { command_id })
            }
            outcome => {
                warn!(command_id = %command_id, outcome = %outcome, "admin user command did not complete");
                Ok(InitializationStatus::Failed {
                    reason: outcome.to_string(),
                })
            }
        }
    }
}
