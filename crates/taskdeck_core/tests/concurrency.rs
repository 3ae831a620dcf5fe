use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use taskdeck_core::db::open_db;
use taskdeck_core::{
    MockDecomposer, NewTask, OwnerLocks, SqliteTaskRepository, SqliteUserRepository, TaskApi,
    TaskService, UserId, UserRepository,
};

fn register(path: &Path, email: &str) -> UserId {
    let conn = open_db(path).unwrap();
    SqliteUserRepository::try_new(&conn)
        .unwrap()
        .create_user(email, "opaque-hash")
        .unwrap()
        .id
}

#[test]
fn concurrent_creates_for_one_owner_get_unique_dense_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("concurrent.sqlite3"));
    let owner = register(&path, "alice@example.com");
    let locks = Arc::new(OwnerLocks::new());

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let path = Arc::clone(&path);
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                let conn = open_db(path.as_path()).unwrap();
                let service =
                    TaskService::with_locks(SqliteTaskRepository::try_new(&conn).unwrap(), locks);
                for index in 0..10 {
                    service
                        .create_task(owner, NewTask::new(format!("w{worker} #{index}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(path.as_path()).unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let tasks = service.list_tasks(owner).unwrap();
    let positions: Vec<i64> = tasks.iter().map(|task| task.position).collect();
    assert_eq!(positions, (0..40).collect::<Vec<i64>>());
    assert!(!locks.is_held(owner));
}

#[test]
fn readers_never_observe_a_half_applied_reorder() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("readers.sqlite3"));
    let owner = register(&path, "alice@example.com");
    let locks = Arc::new(OwnerLocks::new());

    let conn = open_db(path.as_path()).unwrap();
    let writer = TaskService::with_locks(
        SqliteTaskRepository::try_new(&conn).unwrap(),
        Arc::clone(&locks),
    );
    let mut order: Vec<i64> = (0..12)
        .map(|index| {
            writer
                .create_task(owner, NewTask::new(format!("task {index}")))
                .unwrap()
                .id
        })
        .collect();
    let expected_count = order.len();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let path = Arc::clone(&path);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let conn = open_db(path.as_path()).unwrap();
            let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
            let mut snapshots = 0;
            while !done.load(Ordering::SeqCst) || snapshots == 0 {
                let tasks = service.list_tasks(owner).unwrap();
                let positions: Vec<i64> = tasks.iter().map(|task| task.position).collect();
                assert_eq!(tasks.len(), expected_count);
                assert_eq!(positions, (0..expected_count as i64).collect::<Vec<_>>());
                snapshots += 1;
            }
            snapshots
        })
    };

    for round in 0..30 {
        order.rotate_left(round % 7 + 1);
        writer.reorder_tasks(owner, &order).unwrap();
    }
    done.store(true, Ordering::SeqCst);

    assert!(reader.join().unwrap() > 0);
    let final_ids: Vec<i64> = writer
        .list_tasks(owner)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(final_ids, order);
}

#[test]
fn a_busy_owner_does_not_block_other_owners() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("owners.sqlite3"));
    let alice = register(&path, "alice@example.com");
    let bob = register(&path, "bob@example.com");
    let locks = Arc::new(OwnerLocks::new());

    let held = locks.acquire(alice);

    let (sender, receiver) = mpsc::channel();
    let worker = {
        let path = Arc::clone(&path);
        let locks = Arc::clone(&locks);
        thread::spawn(move || {
            let conn = open_db(path.as_path()).unwrap();
            let service =
                TaskService::with_locks(SqliteTaskRepository::try_new(&conn).unwrap(), locks);
            let created = service.create_task(bob, NewTask::new("Bob's task")).unwrap();
            sender.send(created.id).unwrap();
        })
    };

    let created = receiver.recv_timeout(Duration::from_secs(5));
    assert!(created.is_ok(), "bob's create waited on alice's lock");
    drop(held);
    worker.join().unwrap();
}

#[test]
fn same_owner_mutation_waits_for_the_held_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("waits.sqlite3"));
    let owner = register(&path, "alice@example.com");
    let locks = Arc::new(OwnerLocks::new());

    let held = locks.acquire(owner);

    let (sender, receiver) = mpsc::channel();
    let worker = {
        let path = Arc::clone(&path);
        let locks = Arc::clone(&locks);
        thread::spawn(move || {
            let conn = open_db(path.as_path()).unwrap();
            let service =
                TaskService::with_locks(SqliteTaskRepository::try_new(&conn).unwrap(), locks);
            service.create_task(owner, NewTask::new("queued")).unwrap();
            sender.send(()).unwrap();
        })
    };

    assert!(receiver.recv_timeout(Duration::from_millis(200)).is_err());
    drop(held);
    assert!(receiver.recv_timeout(Duration::from_secs(5)).is_ok());
    worker.join().unwrap();
}

#[test]
fn concurrent_decompositions_keep_each_batch_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("batches.sqlite3"));
    let owner = register(&path, "alice@example.com");
    let locks = Arc::new(OwnerLocks::new());

    let handles: Vec<_> = ["Alpha", "Beta", "Gamma"]
        .into_iter()
        .map(|title| {
            let path = Arc::clone(&path);
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                let conn = open_db(path.as_path()).unwrap();
                let api = TaskApi::new(
                    TaskService::with_locks(SqliteTaskRepository::try_new(&conn).unwrap(), locks),
                    Box::new(MockDecomposer::default()),
                );
                api.decompose_task(owner, title).unwrap().created.len()
            })
        })
        .collect();
    let created: usize = handles.into_iter().map(|handle| handle.join().unwrap()).sum();
    assert_eq!(created, 9);

    let conn = open_db(path.as_path()).unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let titles: Vec<String> = service
        .list_tasks(owner)
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    for batch in titles.chunks(3) {
        assert!(batch[0].starts_with("Step 1: Research "));
        let source = batch[0].trim_start_matches("Step 1: Research ");
        assert_eq!(batch[1], format!("Step 2: Plan {source}"));
        assert_eq!(batch[2], format!("Step 3: Prepare for {source}"));
    }
}
