//! Integration tests for the asynchronous wrapper: whole operations
//! dispatched to the worker pool, results and failures surfacing at join.

use std::sync::Arc;

use rowcast::{
    params, ArrayList, AsyncRunner, ErrorKind, QueryRunner, RecordList, RowcastError, Value,
    WorkerPool,
};
use rowcast_harness::{row, MemDataSource};

rowcast::record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Person {
        pub id: i64,
        pub first_name: String,
    }
}

fn people_source() -> MemDataSource {
    MemDataSource::with_columns(
        &["id", "first_name"],
        vec![row![1_i64, "ada"], row![2_i64, "grace"]],
    )
}

#[test]
fn async_query_resolves_to_the_synchronous_result() {
    let source = people_source();
    let log = source.log();
    let runner = AsyncRunner::new(QueryRunner::with_source(Arc::new(source)), 2);

    let handle = runner.query(
        "select id, first_name from person",
        vec![],
        RecordList::<Person>::new(),
    );
    let people = handle.join().unwrap();

    assert_eq!(people.len(), 2);
    assert_eq!(people[0].first_name, "ada");
    assert!(log.all_released());
}

#[test]
fn async_update_and_batch() {
    let source = people_source().update_count(2);
    let runner = AsyncRunner::new(QueryRunner::with_source(Arc::new(source)), 2);

    let update = runner.update("update person set first_name = ?", vec![Value::from("x")]);
    assert_eq!(update.join().unwrap(), 2);

    let batch = runner.batch(
        "insert into t values (?)",
        vec![vec![Value::from("a")], vec![Value::from("b")]],
    );
    assert_eq!(batch.join().unwrap(), vec![2, 2]);
}

#[test]
fn async_failure_surfaces_at_join_with_resources_released() {
    let source = people_source().fail_execution();
    let log = source.log();
    let runner = AsyncRunner::new(QueryRunner::with_source(Arc::new(source)), 1);

    let handle = runner.query("select 1", vec![], ArrayList::new());
    let err = handle.join().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(log.all_released());
}

#[test]
fn async_bind_error_surfaces_at_join() {
    let source = people_source();
    let log = source.log();
    let runner = AsyncRunner::new(QueryRunner::with_source(Arc::new(source)), 1);

    let handle = runner.update("update t set a = ? where b = ?", vec![Value::from(1_i64)]);
    let err = handle.join().unwrap_err();

    assert!(matches!(err, RowcastError::ParameterMismatch { .. }));
    assert!(log.all_released());
}

#[test]
fn concurrent_operations_each_own_their_resources() {
    let source = people_source();
    let log = source.log();
    let runner = AsyncRunner::new(QueryRunner::with_source(Arc::new(source)), 4);

    let handles: Vec<_> = (0..6)
        .map(|_| runner.query("select id, first_name from person", vec![], ArrayList::new()))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 2);
    }

    assert!(log.all_released());
    assert_eq!(log.connections_opened(), 6);
    assert_eq!(log.connections_closed(), 6);
}

#[test]
fn cancelled_task_reports_through_the_handle() {
    let pool = Arc::new(WorkerPool::new(1));
    let source = people_source();
    let runner = AsyncRunner::with_pool(QueryRunner::with_source(Arc::new(source)), pool.clone());

    // Occupy the single worker so the next submission waits in the queue.
    let blocker = pool.submit(|| {
        std::thread::sleep(std::time::Duration::from_millis(50));
        Ok(())
    });

    let victim = runner.query("select 1", vec![], ArrayList::new());
    assert!(victim.cancel());
    assert!(matches!(victim.join(), Err(RowcastError::TaskCancelled)));
    blocker.join().unwrap();
}

#[test]
fn params_macro_builds_values() {
    let p = params![1_i64, "hello", 2.5_f64, true, None::<i64>];
    assert_eq!(p.len(), 5);
    assert_eq!(p[0], Value::Integer(1));
    assert_eq!(p[1], Value::Text("hello".into()));
    assert_eq!(p[2], Value::Float(2.5));
    assert_eq!(p[3], Value::Integer(1));
    assert_eq!(p[4], Value::Null);
    assert!(params![].is_empty());
}
