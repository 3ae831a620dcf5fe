use rusqlite::Connection;
use taskdeck_core::db::open_db_in_memory;
use taskdeck_core::model::task::TITLE_MAX_CHARS;
use taskdeck_core::{
    CoreError, NewTask, RepoError, SqliteTaskRepository, SqliteUserRepository, TaskPatch,
    TaskRepository, TaskService, TaskValidationError, UserId, UserRepository,
};

fn register(conn: &Connection, email: &str) -> UserId {
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(email, "opaque-hash")
        .unwrap()
        .id
}

fn titles(service: &TaskService<SqliteTaskRepository<'_>>, owner: UserId) -> Vec<String> {
    service
        .list_tasks(owner)
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect()
}

#[test]
fn create_appends_after_existing_tasks() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let first = service.create_task(owner, NewTask::new("Buy milk")).unwrap();
    let second = service
        .create_task(owner, NewTask::new("Call mom").with_description("after work"))
        .unwrap();
    let third = service.create_task(owner, NewTask::new("Pay rent")).unwrap();

    assert_eq!(
        [first.position, second.position, third.position],
        [0, 1, 2]
    );
    assert!(first.id < second.id && second.id < third.id);
    assert!(!second.completed);
    assert_eq!(second.owner_id, owner);
    assert_eq!(second.description.as_deref(), Some("after work"));
    assert_eq!(titles(&service, owner), ["Buy milk", "Call mom", "Pay rent"]);
}

#[test]
fn create_trims_title_and_rejects_blank_or_long_titles() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let task = service
        .create_task(owner, NewTask::new("  Water plants  "))
        .unwrap();
    assert_eq!(task.title, "Water plants");

    let err = service.create_task(owner, NewTask::new("")).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    let err = service.create_task(owner, NewTask::new(" \t ")).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let long = "x".repeat(TITLE_MAX_CHARS + 1);
    let err = service.create_task(owner, NewTask::new(long)).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    assert_eq!(service.list_tasks(owner).unwrap().len(), 1);
}

#[test]
fn repository_reports_validation_detail() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let err = repo.create_task(owner, &NewTask::new("   ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TaskValidationError::EmptyTitle)
    ));
}

#[test]
fn update_patches_only_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = service
        .create_task(owner, NewTask::new("Draft").with_description("notes"))
        .unwrap();

    let renamed = service
        .update_task(
            owner,
            task.id,
            TaskPatch {
                title: Some(" Final ".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.title, "Final");
    assert_eq!(renamed.description.as_deref(), Some("notes"));
    assert!(!renamed.completed);
    assert_eq!(renamed.position, task.position);
    assert_eq!(renamed.created_at, task.created_at);

    let completed = service
        .update_task(owner, task.id, TaskPatch::completed(true))
        .unwrap();
    assert!(completed.completed);
    assert_eq!(completed.title, "Final");

    let cleared = service
        .update_task(
            owner,
            task.id,
            TaskPatch {
                description: Some(None),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.description, None);
    assert!(cleared.completed);
}

#[test]
fn empty_patch_returns_current_task() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = service.create_task(owner, NewTask::new("Same")).unwrap();

    let unchanged = service
        .update_task(owner, task.id, TaskPatch::default())
        .unwrap();
    assert_eq!(unchanged, task);
}

#[test]
fn update_with_blank_title_is_rejected_and_leaves_task_intact() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = service.create_task(owner, NewTask::new("Keep me")).unwrap();

    let err = service
        .update_task(
            owner,
            task.id,
            TaskPatch {
                title: Some("  ".to_string()),
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(service.get_task(owner, task.id).unwrap(), task);
}

#[test]
fn owners_cannot_see_or_touch_each_others_tasks() {
    let conn = open_db_in_memory().unwrap();
    let alice = register(&conn, "alice@example.com");
    let bob = register(&conn, "bob@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let secret = service.create_task(bob, NewTask::new("Bob's task")).unwrap();
    service.create_task(alice, NewTask::new("Alice's task")).unwrap();

    assert_eq!(titles(&service, alice), ["Alice's task"]);
    assert!(matches!(
        service.get_task(alice, secret.id),
        Err(CoreError::NotFound(id)) if id == secret.id
    ));
    assert!(matches!(
        service.update_task(alice, secret.id, TaskPatch::completed(true)),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        service.delete_task(alice, secret.id),
        Err(CoreError::NotFound(_))
    ));

    assert_eq!(service.get_task(bob, secret.id).unwrap(), secret);
}

#[test]
fn missing_and_foreign_ids_report_the_same_error() {
    let conn = open_db_in_memory().unwrap();
    let alice = register(&conn, "alice@example.com");
    let bob = register(&conn, "bob@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let foreign = service.create_task(bob, NewTask::new("Bob's task")).unwrap();

    let missing_err = service.delete_task(alice, 9_999).unwrap_err();
    let foreign_err = service.delete_task(alice, foreign.id).unwrap_err();
    assert_eq!(missing_err.code(), foreign_err.code());
    assert_eq!(missing_err.code(), "not_found");
}

#[test]
fn delete_is_permanent_and_repeatable_without_panicking() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let a = service.create_task(owner, NewTask::new("A")).unwrap();
    let b = service.create_task(owner, NewTask::new("B")).unwrap();
    let c = service.create_task(owner, NewTask::new("C")).unwrap();

    service.delete_task(owner, b.id).unwrap();
    assert!(matches!(
        service.delete_task(owner, b.id),
        Err(CoreError::NotFound(_))
    ));

    let ids: Vec<_> = service
        .list_tasks(owner)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(ids, [a.id, c.id]);
}

#[test]
fn ids_are_never_reused_after_delete() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let last = service.create_task(owner, NewTask::new("Temp")).unwrap();
    service.delete_task(owner, last.id).unwrap();
    let next = service.create_task(owner, NewTask::new("Next")).unwrap();

    assert!(next.id > last.id);
}

#[test]
fn list_order_follows_position_then_id_across_mixed_operations() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let mut alive = Vec::new();
    for index in 0..8 {
        let task = service
            .create_task(owner, NewTask::new(format!("task {index}")))
            .unwrap();
        alive.push(task.id);
        if index % 3 == 2 {
            let removed = alive.remove(0);
            service.delete_task(owner, removed).unwrap();
        }
        if index % 2 == 1 {
            service
                .update_task(owner, task.id, TaskPatch::completed(true))
                .unwrap();
        }
    }

    let listed = service.list_tasks(owner).unwrap();
    assert!(listed
        .windows(2)
        .all(|pair| (pair[0].position, pair[0].id) < (pair[1].position, pair[1].id)));
    let mut listed_ids: Vec<_> = listed.iter().map(|task| task.id).collect();
    listed_ids.sort_unstable();
    alive.sort_unstable();
    assert_eq!(listed_ids, alive);
}

#[test]
fn new_owner_has_empty_list() {
    let conn = open_db_in_memory().unwrap();
    let owner = register(&conn, "alice@example.com");
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());

    assert!(service.list_tasks(owner).unwrap().is_empty());
}
