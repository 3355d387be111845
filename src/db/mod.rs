use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use tokio::sync::oneshot;

mod queries;

pub use queries::ActivePlayerTime;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub busy_timeout: Duration,
    pub ensure_indexes: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(1),
            ensure_indexes: false,
        }
    }
}

/// Handle to the game's save database. The connection lives on a dedicated
/// thread; every query is shipped there and answered over a oneshot channel.
#[derive(Clone)]
pub struct SaveDatabase {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl SaveDatabase {
    /// Opens an existing database. Never creates one.
    pub fn open(db_path: PathBuf, options: DatabaseOptions) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("daywatch-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&path_for_thread, &options) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Save database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Save database opened at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}

fn open_connection(path: &Path, options: &DatabaseOptions) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(path, flags)
        .with_context(|| format!("failed to open save database {}", path.display()))?;

    conn.busy_timeout(options.busy_timeout)
        .context("failed to set busy timeout")?;

    // The game owns this file; a pragma it refuses is not worth failing over.
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "locking_mode", "NORMAL") {
        error!("Failed to set locking mode: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "synchronous", "NORMAL") {
        error!("Failed to set synchronous mode: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "read_uncommitted", true) {
        error!("Failed to enable read_uncommitted: {err}");
    }

    if options.ensure_indexes {
        if let Err(err) = queries::ensure_indexes(&conn) {
            error!("Failed to create lookup indexes: {err:#}");
        }
    }

    Ok(conn)
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::{params, Connection};
    use std::path::Path;

    /// Creates the three tables the poller reads, with one controlled player.
    pub fn seed_save_database(path: &Path, time_of_day: Option<f64>) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE entity (id INTEGER PRIMARY KEY, class TEXT, flags INTEGER, entity_system_id INTEGER);
             CREATE TABLE entity_system (id INTEGER PRIMARY KEY, user_profile_id INTEGER);
             CREATE TABLE weather_parameters (user_profile_id INTEGER, time_of_day REAL);
             INSERT INTO entity (class, flags, entity_system_id) VALUES ('FPrisonerEntity', 1, 10);
             INSERT INTO entity (class, flags, entity_system_id) VALUES ('FPrisonerEntity', 0, 20);
             INSERT INTO entity (class, flags, entity_system_id) VALUES ('FVehicleEntity', 0, 30);
             INSERT INTO entity_system (id, user_profile_id) VALUES (10, 1), (20, 2), (30, 3);
             INSERT INTO weather_parameters (user_profile_id, time_of_day) VALUES (1, 3.0), (3, 4.0);",
        )
        .unwrap();

        if let Some(time) = time_of_day {
            conn.execute(
                "INSERT INTO weather_parameters (user_profile_id, time_of_day) VALUES (?1, ?2)",
                params![2, time],
            )
            .unwrap();
        }
    }
}
