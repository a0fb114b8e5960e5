//! Windows service integration
//!
//! `install` registers the current executable as an auto-start service
//! launched with `service --config <path>`; the hidden `service` command
//! hands control to the Service Control Manager dispatcher.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use windows_service::service::{
    ServiceAccess, ServiceControl, ServiceControlAccept, ServiceErrorControl, ServiceExitCode,
    ServiceInfo, ServiceStartType, ServiceState, ServiceStatus, ServiceType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};
use windows_service::{define_windows_service, service_dispatcher};

pub const SERVICE_NAME: &str = "DiskMonitorService";
const SERVICE_DESCRIPTION: &str = "Monitors physical disk reliability counters and reports changes to Telegram";
const SERVICE_TYPE: ServiceType = ServiceType::OWN_PROCESS;

// The dispatcher callback takes no user data
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

pub fn install(config_path: &Path) -> Result<()> {
    let manager = ServiceManager::local_computer(
        None::<&str>,
        ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE,
    )
    .context("Failed to connect to the service manager")?;

    if manager.open_service(SERVICE_NAME, ServiceAccess::QUERY_STATUS).is_ok() {
        anyhow::bail!("service {} already exists", SERVICE_NAME);
    }

    let executable_path = std::env::current_exe().context("Failed to get executable path")?;
    let service_info = ServiceInfo {
        name: OsString::from(SERVICE_NAME),
        display_name: OsString::from(SERVICE_NAME),
        service_type: SERVICE_TYPE,
        start_type: ServiceStartType::AutoStart,
        error_control: ServiceErrorControl::Normal,
        executable_path,
        launch_arguments: vec![
            OsString::from("service"),
            OsString::from("--config"),
            config_path.as_os_str().to_os_string(),
        ],
        dependencies: vec![],
        account_name: None,
        account_password: None,
    };

    let service = manager
        .create_service(&service_info, ServiceAccess::CHANGE_CONFIG)
        .with_context(|| format!("Failed to create service {}", SERVICE_NAME))?;
    service
        .set_description(SERVICE_DESCRIPTION)
        .context("Failed to set service description")?;

    info!("Service {} installed successfully.", SERVICE_NAME);
    Ok(())
}

pub fn remove() -> Result<()> {
    let manager = ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)
        .context("Failed to connect to the service manager")?;

    let service = manager
        .open_service(SERVICE_NAME, ServiceAccess::DELETE)
        .with_context(|| format!("service {} is not installed", SERVICE_NAME))?;
    service
        .delete()
        .with_context(|| format!("Failed to remove service {}", SERVICE_NAME))?;

    info!("Service {} removed successfully.", SERVICE_NAME);
    Ok(())
}

/// Blocks until the service is stopped
pub fn run_dispatcher(config_path: PathBuf) -> Result<()> {
    let _ = CONFIG_PATH.set(config_path);
    info!("Service {} starting to run...", SERVICE_NAME);
    service_dispatcher::start(SERVICE_NAME, ffi_service_main)
        .context("Failed to start service dispatcher")?;
    info!("Service {} stopped.", SERVICE_NAME);
    Ok(())
}

fn service_main(_arguments: Vec<OsString>) {
    if let Err(e) = run_service() {
        error!("Service {} failed: {:#}", SERVICE_NAME, e);
    }
}

fn run_service() -> Result<()> {
    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();

    let event_handler = move |control| -> ServiceControlHandlerResult {
        match control {
            ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
            ServiceControl::Stop | ServiceControl::Shutdown => {
                info!("{} stopping due to external command", SERVICE_NAME);
                handler_token.cancel();
                ServiceControlHandlerResult::NoError
            }
            other => {
                warn!("Unexpected control request: {:?}", other);
                ServiceControlHandlerResult::NotImplemented
            }
        }
    };

    let status_handle = service_control_handler::register(SERVICE_NAME, event_handler)
        .context("Failed to register service control handler")?;
    set_state(&status_handle, ServiceState::StartPending, 0)?;

    let config_path = CONFIG_PATH
        .get()
        .cloned()
        .context("Service started without a configuration path")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    let result = runtime.block_on(async {
        let orchestrator = crate::build_orchestrator(&config_path).await?;

        set_state(&status_handle, ServiceState::Running, 0)?;
        info!("{} started", SERVICE_NAME);

        orchestrator.run(shutdown).await;
        Ok::<(), anyhow::Error>(())
    });

    let exit_code = if result.is_ok() { 0 } else { 1 };
    set_state(&status_handle, ServiceState::Stopped, exit_code)?;
    result
}

fn set_state(handle: &ServiceStatusHandle, state: ServiceState, exit_code: u32) -> Result<()> {
    let controls_accepted = match state {
        ServiceState::Running => ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN,
        _ => ServiceControlAccept::empty(),
    };

    handle
        .set_service_status(ServiceStatus {
            service_type: SERVICE_TYPE,
            current_state: state,
            controls_accepted,
            exit_code: ServiceExitCode::Win32(exit_code),
            checkpoint: 0,
            wait_hint: Duration::default(),
            process_id: None,
        })
        .with_context(|| format!("Failed to report service state {:?}", state))
}
