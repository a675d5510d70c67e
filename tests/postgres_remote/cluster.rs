//! Embedded `PostgreSQL` cluster shared by the remote store tests.

use super::env::{EnvVarGuard, bootstrap_env_changes, env_vars_to_os};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use diesel::prelude::*;
use pg_embedded_setup_unpriv::worker_process_test_api::{
    WorkerOperation, WorkerRequest, WorkerRequestArgs, run as run_worker,
};
use pg_embedded_setup_unpriv::{ExecutionPrivileges, TestBootstrapSettings, bootstrap_for_tests};
use postgresql_embedded::{PostgreSQL, Settings, Status};
use rstest::fixture;
use std::path::Path;
use std::sync::OnceLock;
use tokio::runtime::Runtime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared `PostgreSQL` cluster handle for integration tests.
pub type PostgresCluster = &'static ManagedCluster;

/// Set to fail the run when no cluster can be started.
const REQUIRE_ENV: &str = "CANOPY_REQUIRE_POSTGRES";

static SHARED_CLUSTER: OnceLock<Option<ManagedCluster>> = OnceLock::new();

/// A running cluster. Lives for the whole test binary.
pub struct ManagedCluster {
    settings: Settings,
    _runtime: Option<Runtime>,
    _postgres: Option<PostgreSQL>,
}

impl ManagedCluster {
    fn start() -> Result<Self, BoxError> {
        let bootstrap_guard = EnvVarGuard::set_many(&bootstrap_env_changes()?);
        let mut bootstrap = bootstrap_for_tests().map_err(|err| Box::new(err) as BoxError)?;
        drop(bootstrap_guard);
        sync_password_from_file(&mut bootstrap.settings)?;
        match bootstrap.privileges {
            ExecutionPrivileges::Root => Self::start_via_worker(bootstrap),
            ExecutionPrivileges::Unprivileged => Self::start_in_process(bootstrap),
        }
    }

    fn start_in_process(mut bootstrap: TestBootstrapSettings) -> Result<Self, BoxError> {
        let env_vars = bootstrap.environment.to_env();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let env_guard = EnvVarGuard::set_many(&env_vars_to_os(&env_vars));
        let mut postgres = PostgreSQL::new(bootstrap.settings.clone());
        let started = runtime.block_on(async {
            postgres
                .setup()
                .await
                .map_err(|err| Box::new(err) as BoxError)?;
            if !matches!(postgres.status(), Status::Started) {
                postgres
                    .start()
                    .await
                    .map_err(|err| Box::new(err) as BoxError)?;
            }
            Ok::<(), BoxError>(())
        });
        drop(env_guard);
        started?;
        bootstrap.settings = postgres.settings().clone();
        sync_port_from_pid(&mut bootstrap.settings)?;
        Ok(Self {
            settings: bootstrap.settings,
            _runtime: Some(runtime),
            _postgres: Some(postgres),
        })
    }

    fn start_via_worker(mut bootstrap: TestBootstrapSettings) -> Result<Self, BoxError> {
        let env_vars = bootstrap.environment.to_env();
        let worker = bootstrap
            .worker_binary
            .as_ref()
            .ok_or_else(|| BoxError::from("PG_EMBEDDED_WORKER is not set for worker operation"))?;
        for (operation, timeout) in [
            (WorkerOperation::Setup, bootstrap.setup_timeout),
            (WorkerOperation::Start, bootstrap.start_timeout),
        ] {
            let args = WorkerRequestArgs {
                worker: worker.as_path(),
                settings: &bootstrap.settings,
                env_vars: &env_vars,
                operation,
                timeout,
            };
            run_worker(&WorkerRequest::new(args)).map_err(|err| Box::new(err) as BoxError)?;
        }
        sync_port_from_pid(&mut bootstrap.settings)?;
        Ok(Self {
            settings: bootstrap.settings,
            _runtime: None,
            _postgres: None,
        })
    }

    /// Returns the connection URL for `database`.
    #[must_use]
    pub fn database_url(&self, database: &str) -> String {
        self.settings.url(database)
    }

    /// Creates an empty database.
    pub fn create_database(&self, name: &str) -> Result<(), BoxError> {
        self.execute_admin_sql(&format!("CREATE DATABASE {}", quote_identifier(name)))
    }

    /// Drops a database, disconnecting any sessions still attached.
    pub fn drop_database(&self, name: &str) -> Result<(), BoxError> {
        self.execute_admin_sql(&format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(name)
        ))
    }

    fn execute_admin_sql(&self, sql: &str) -> Result<(), BoxError> {
        let mut conn = PgConnection::establish(&self.database_url("postgres"))?;
        diesel::sql_query(sql).execute(&mut conn)?;
        Ok(())
    }
}

/// Provides the shared cluster, or `None` when it cannot be started.
///
/// # Panics
///
/// Panics when the cluster is unavailable and `CANOPY_REQUIRE_POSTGRES` is
/// set.
#[fixture]
pub fn postgres_cluster() -> Option<PostgresCluster> {
    SHARED_CLUSTER
        .get_or_init(|| {
            if tracing_subscriber::fmt().with_test_writer().try_init().is_err() {
                // Another test binary component installed a subscriber first.
            }
            // Bootstrap drives its own runtime, so keep it off the test's.
            let started = std::thread::spawn(ManagedCluster::start)
                .join()
                .unwrap_or_else(|_| Err(BoxError::from("cluster start panicked")));
            match started {
                Ok(cluster) => Some(cluster),
                Err(err) if std::env::var_os(REQUIRE_ENV).is_some() => {
                    panic!("failed to start PostgreSQL: {err}")
                }
                Err(err) => {
                    tracing::warn!(error = %err, "PostgreSQL unavailable, skipping remote tests");
                    None
                }
            }
        })
        .as_ref()
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sync_password_from_file(settings: &mut Settings) -> Result<(), BoxError> {
    let file_name = settings
        .password_file
        .file_name()
        .ok_or_else(|| BoxError::from("password file path must include a file name"))?;
    let parent = settings.password_file.parent().unwrap_or_else(|| Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    match dir.read_to_string(file_name) {
        Ok(contents) => {
            let password = contents.trim_end();
            if !password.is_empty() {
                settings.password = password.to_owned();
            }
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// The fourth line of `postmaster.pid` holds the port the server bound.
fn sync_port_from_pid(settings: &mut Settings) -> Result<(), BoxError> {
    let data_dir = Dir::open_ambient_dir(&settings.data_dir, ambient_authority())?;
    let contents = match data_dir.read_to_string("postmaster.pid") {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    if let Some(port) = contents
        .lines()
        .nth(3)
        .and_then(|line| line.trim().parse::<u16>().ok())
    {
        settings.port = port;
    }
    Ok(())
}
