//! Session retry, timeout, cancellation and transaction behavior against a
//! scripted driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sqldb_core::{
    Backend, Data, Driver, DriverConn, DriverError, DriverErrorKind, DriverResult, DriverTx,
    ErrorKind, Scope, Value,
};
use sqldb_session::{BackendEngine, Database, DatabaseOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ok,
    /// Fail with `Busy` for the given number of attempts, then succeed.
    BusyFor(usize),
    AlwaysBusy,
    Fatal,
    /// Block until the operation scope is done, then report an interrupt.
    Block,
    /// Ignore the deadline and block until the operation is cancelled.
    HoldUntilCancelled,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    opens: AtomicUsize,
}

struct Script {
    mode: Mutex<Mode>,
    counters: Counters,
    log: Mutex<Vec<String>>,
    /// Number of upcoming `begin` calls that fail with `Busy`.
    busy_begins: AtomicUsize,
}

impl Script {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            counters: Counters::default(),
            log: Mutex::new(Vec::new()),
            busy_begins: AtomicUsize::new(0),
        })
    }

    fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    fn run(&self, scope: &Scope, stmt: &str, tx: bool) -> DriverResult<u64> {
        let n = self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .push(format!("{}{}", if tx { "tx: " } else { "" }, stmt));
        let mode = *self.mode.lock();
        match mode {
            Mode::Ok => Ok(1),
            Mode::BusyFor(k) if n < k => Err(DriverError::new(
                DriverErrorKind::Busy,
                "database is locked",
            )),
            Mode::BusyFor(_) => Ok(1),
            Mode::AlwaysBusy => Err(DriverError::new(
                DriverErrorKind::Busy,
                "database is locked",
            )),
            Mode::Fatal => Err(DriverError::other("no such table: missing")),
            Mode::Block => {
                while !scope.is_done() {
                    scope.wait(Duration::from_millis(500));
                }
                Err(DriverError::new(DriverErrorKind::Interrupted, "interrupted"))
            }
            Mode::HoldUntilCancelled => {
                while !scope.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(DriverError::new(DriverErrorKind::Interrupted, "interrupted"))
            }
        }
    }
}

struct ScriptConn(Arc<Script>);

impl DriverConn for ScriptConn {
    fn execute(&self, scope: &Scope, stmt: &str, _params: &[Value]) -> DriverResult<u64> {
        self.0.run(scope, stmt, false)
    }

    fn query(&self, scope: &Scope, stmt: &str, _params: &[Value]) -> DriverResult<Vec<Data>> {
        self.0
            .run(scope, stmt, false)
            .map(|_| vec![Data::new().with("count", 1)])
    }

    fn begin(&self) -> DriverResult<Box<dyn DriverTx>> {
        self.0.counters.begins.fetch_add(1, Ordering::SeqCst);
        let busy = self
            .0
            .busy_begins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if busy {
            return Err(DriverError::new(
                DriverErrorKind::Busy,
                "database is locked",
            ));
        }
        Ok(Box::new(ScriptTx(Arc::clone(&self.0))))
    }

    fn ping(&self) -> DriverResult<()> {
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

struct ScriptTx(Arc<Script>);

impl DriverTx for ScriptTx {
    fn execute(&self, scope: &Scope, stmt: &str, _params: &[Value]) -> DriverResult<u64> {
        self.0.run(scope, stmt, true)
    }

    fn query(&self, scope: &Scope, stmt: &str, _params: &[Value]) -> DriverResult<Vec<Data>> {
        self.0.run(scope, stmt, true).map(|_| Vec::new())
    }

    fn commit(self: Box<Self>) -> DriverResult<()> {
        self.0.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> DriverResult<()> {
        self.0.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptDriver(Arc<Script>);

impl Driver for ScriptDriver {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn open(&self, _dsn: &str) -> DriverResult<Arc<dyn DriverConn>> {
        self.0.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptConn(Arc::clone(&self.0))))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn database(script: &Arc<Script>, options: DatabaseOptions) -> Database {
    init_tracing();
    let driver = Arc::new(ScriptDriver(Arc::clone(script)));
    let engine = BackendEngine::new(Backend::Sqlite, "script.db", driver);
    Database::new(Arc::new(engine), options)
}

fn opts(timeout: f64, interval: f64) -> DatabaseOptions {
    DatabaseOptions::default()
        .with_operation_timeout(timeout)
        .with_retry_interval(interval)
}

// ============================================================================
// Retry
// ============================================================================

#[test]
fn transient_errors_are_retried_until_success() {
    let script = Script::new(Mode::BusyFor(3));
    let db = database(&script, opts(5.0, 0.01));

    let rows = db
        .session()
        .exec("UPDATE t SET a={?}", &[Value::Int(1)])
        .expect("exec after retries");
    assert_eq!(rows, 1);
    assert_eq!(script.attempts(), 4);
}

#[test]
fn statements_are_rendered_in_native_placeholders() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));

    db.session()
        .exec("DELETE FROM t WHERE a={?} AND b={?}", &[1.into(), 2.into()])
        .expect("exec");
    assert_eq!(
        script.log.lock().as_slice(),
        ["DELETE FROM t WHERE a=? AND b=?"]
    );
}

#[test]
fn timeout_fires_within_one_interval_of_the_deadline() {
    let script = Script::new(Mode::AlwaysBusy);
    let db = database(&script, opts(0.2, 0.05));

    let start = Instant::now();
    let err = db.session().exec("SELECT 1", &[]).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is(ErrorKind::Timeout), "unexpected error: {err}");
    assert_eq!(
        err.driver_error().map(|e| e.kind),
        Some(DriverErrorKind::Busy)
    );
    assert!(elapsed >= Duration::from_millis(200), "too early: {elapsed:?}");
    // One retry interval plus scheduling slack.
    assert!(elapsed < Duration::from_millis(400), "too late: {elapsed:?}");
    assert!(script.attempts() >= 2);
}

#[test]
fn non_retryable_error_fails_immediately() {
    let script = Script::new(Mode::Fatal);
    let db = database(&script, opts(5.0, 0.01));

    let err = db.session().fetch("SELECT * FROM missing", &[]).unwrap_err();
    assert!(err.is(ErrorKind::Operation));
    assert!(err.to_string().contains("no such table"));
    assert_eq!(script.attempts(), 1);
}

#[test]
fn deadline_interrupts_blocking_statement() {
    let script = Script::new(Mode::Block);
    let db = database(&script, opts(0.1, 0.05));

    let err = db.session().exec("SELECT 1", &[]).unwrap_err();
    assert!(err.is(ErrorKind::Timeout), "unexpected error: {err}");
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancel_breaks_the_retry_sleep() {
    let script = Script::new(Mode::AlwaysBusy);
    // Interval far beyond the cancel delay.
    let db = database(&script, opts(0.0, 10.0));
    let session = db.session();
    let canceller = session.canceller();

    let start = Instant::now();
    let err = thread::scope(|s| {
        s.spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });
        session.exec("SELECT 1", &[]).unwrap_err()
    });

    assert!(err.is(ErrorKind::Break), "unexpected error: {err}");
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancel_wins_over_an_expired_deadline() {
    let script = Script::new(Mode::HoldUntilCancelled);
    let db = database(&script, opts(0.05, 0.01));
    let session = db.session();
    let canceller = session.canceller();

    // Cancelled well after the deadline expired.
    let err = thread::scope(|s| {
        s.spawn(move || {
            thread::sleep(Duration::from_millis(200));
            canceller.cancel();
        });
        session.exec("SELECT 1", &[]).unwrap_err()
    });
    assert!(err.is(ErrorKind::Break), "unexpected error: {err}");
}

#[test]
fn cancel_only_affects_the_running_operation() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));
    let session = db.session();

    session.cancel();
    assert_eq!(session.exec("SELECT 1", &[]).expect("exec"), 1);
}

#[test]
fn shutdown_interrupts_in_flight_and_closes() {
    let script = Script::new(Mode::AlwaysBusy);
    let db = database(&script, opts(0.0, 0.05));

    let err = thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(100));
            db.shutdown().expect("shutdown");
        });
        db.session().exec("SELECT 1", &[]).unwrap_err()
    });
    assert!(err.is(ErrorKind::Break), "unexpected error: {err}");

    assert!(db.is_closed());
    let err = db.session().exec("SELECT 1", &[]).unwrap_err();
    assert!(err.is(ErrorKind::Closed));
    assert!(db.ping().unwrap_err().is(ErrorKind::Closed));
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn statements_run_on_the_open_transaction() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));
    let mut session = db.session();

    session.begin().expect("begin");
    session.begin().expect("begin again");
    assert!(session.in_transaction());
    session.exec("INSERT INTO t (a) VALUES ({?})", &[1.into()]).expect("insert");
    session.exec("INSERT INTO t (a) VALUES ({?})", &[2.into()]).expect("insert");
    session.commit().expect("commit");
    assert!(!session.in_transaction());

    assert_eq!(script.counters.begins.load(Ordering::SeqCst), 1);
    assert_eq!(script.counters.commits.load(Ordering::SeqCst), 1);
    assert_eq!(
        script.log.lock().as_slice(),
        [
            "tx: INSERT INTO t (a) VALUES (?)",
            "tx: INSERT INTO t (a) VALUES (?)"
        ]
    );
}

#[test]
fn busy_begin_is_retried() {
    let script = Script::new(Mode::Ok);
    script.busy_begins.store(3, Ordering::SeqCst);
    let db = database(&script, opts(5.0, 0.01));
    let mut session = db.session();

    session.begin().expect("begin after retries");
    assert!(session.in_transaction());
    assert_eq!(script.counters.begins.load(Ordering::SeqCst), 4);
    session.commit().expect("commit");
}

#[test]
fn begin_times_out_while_the_lock_is_held() {
    let script = Script::new(Mode::Ok);
    script.busy_begins.store(usize::MAX, Ordering::SeqCst);
    let db = database(&script, opts(0.2, 0.05));
    let mut session = db.session();

    let start = Instant::now();
    let err = session.begin().unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is(ErrorKind::Timeout), "unexpected error: {err}");
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(!session.in_transaction());
    assert!(script.counters.begins.load(Ordering::SeqCst) > 1);
}

#[test]
fn commit_and_rollback_need_a_transaction() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));
    let mut session = db.session();

    let err = session.commit().unwrap_err();
    assert!(err.is(ErrorKind::Operation));
    assert!(err.to_string().contains("not in transaction"));
    assert!(session.rollback().unwrap_err().is(ErrorKind::Operation));
}

#[test]
fn transaction_rolls_back_on_error() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));
    let mut session = db.session();

    let err = session
        .transaction(|s| {
            s.exec("INSERT INTO t (a) VALUES (1)", &[])?;
            Err::<(), _>(sqldb_core::Error::operation("seed failed"))
        })
        .unwrap_err();
    assert!(err.to_string().contains("seed failed"));
    assert_eq!(script.counters.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(script.counters.commits.load(Ordering::SeqCst), 0);
    assert!(!session.in_transaction());

    session
        .transaction(|s| s.exec("INSERT INTO t (a) VALUES (2)", &[]).map(|_| ()))
        .expect("transaction");
    assert_eq!(script.counters.commits.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_a_session_rolls_back() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));
    {
        let mut session = db.session();
        session.begin().expect("begin");
    }
    assert_eq!(script.counters.rollbacks.load(Ordering::SeqCst), 1);
}

#[test]
fn handle_is_opened_once_across_sessions() {
    let script = Script::new(Mode::Ok);
    let db = database(&script, opts(5.0, 0.01));

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let session = db.session();
                for _ in 0..10 {
                    session.exec("SELECT 1", &[]).expect("exec");
                }
            });
        }
    });
    assert_eq!(script.counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(script.attempts(), 40);
    db.ping().expect("ping");
}
