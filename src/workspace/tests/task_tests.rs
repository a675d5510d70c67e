//! Task service tests: completion, ordering, moves, and bulk edits.

use super::support::{Harness, harness};
use crate::workspace::{
    domain::{Branch, ChangeSet, PersonId, Task, TaskId, TaskPatch},
    ports::{LocalStore, TaskFilter},
    services::{MoveDirection, WorkspaceError},
};
use rstest::rstest;

fn branches(harness: &Harness) -> (Branch, Branch) {
    let hierarchy = &harness.workspace.hierarchy;
    let project = hierarchy.create_project("Atlas").expect("project");
    let root = hierarchy
        .branch(project.root_branch_id())
        .expect("root branch");
    let side = hierarchy
        .add_branch(root.id(), Some("Side"))
        .expect("side branch");
    (root, side)
}

fn add_all(harness: &Harness, branch: &Branch, titles: &[&str]) -> Vec<Task> {
    titles
        .iter()
        .map(|title| {
            harness
                .workspace
                .tasks
                .add_task(branch.id(), title)
                .expect("task")
        })
        .collect()
}

fn listed(harness: &Harness, branch: &Branch) -> Vec<String> {
    harness
        .workspace
        .tasks
        .list_tasks(branch.id(), TaskFilter::All)
        .expect("tasks")
        .iter()
        .map(|task| task.title().to_owned())
        .collect()
}

fn complete(harness: &Harness, branch: &Branch, task: TaskId) -> Task {
    harness
        .workspace
        .tasks
        .update_task(
            branch.id(),
            task,
            TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .expect("complete")
}

#[rstest]
fn completing_stamps_clock_time_and_sorts_last(harness: Harness) {
    let (root, _) = branches(&harness);
    let tasks = add_all(&harness, &root, &["Draft", "Review"]);
    let draft = tasks.first().expect("draft");

    let done = complete(&harness, &root, draft.id());

    assert!(done.completed());
    assert_eq!(done.completed_at(), Some(harness.clock.0));
    assert_eq!(listed(&harness, &root), vec!["Review", "Draft"]);
    let open = harness
        .workspace
        .tasks
        .list_tasks(root.id(), TaskFilter::OpenOnly)
        .expect("open tasks");
    assert_eq!(open.len(), 1);

    let reopened = harness
        .workspace
        .tasks
        .update_task(
            root.id(),
            draft.id(),
            TaskPatch {
                completed: Some(false),
                ..TaskPatch::default()
            },
        )
        .expect("reopen");
    assert_eq!(reopened.completed_at(), None);
}

#[rstest]
fn updates_through_the_wrong_branch_are_rejected(harness: Harness) {
    let (root, side) = branches(&harness);
    let task = harness
        .workspace
        .tasks
        .add_task(root.id(), "Draft")
        .expect("task");

    let err = harness
        .workspace
        .tasks
        .update_task(side.id(), task.id(), TaskPatch::default())
        .expect_err("wrong branch");
    assert!(matches!(
        err,
        WorkspaceError::TaskNotInBranch { task_id, branch_id }
            if task_id == task.id() && branch_id == side.id()
    ));
}

#[rstest]
fn unknown_assignee_is_rejected(harness: Harness) {
    let (root, _) = branches(&harness);
    let task = harness
        .workspace
        .tasks
        .add_task(root.id(), "Draft")
        .expect("task");
    let stranger = PersonId::new();

    let err = harness
        .workspace
        .tasks
        .update_task(
            root.id(),
            task.id(),
            TaskPatch {
                assignee_id: Some(Some(stranger)),
                ..TaskPatch::default()
            },
        )
        .expect_err("unknown assignee");
    assert!(matches!(err, WorkspaceError::PersonNotFound(id) if id == stranger));
}

#[rstest]
fn moves_swap_only_within_the_same_completion_state(harness: Harness) {
    let (root, _) = branches(&harness);
    let tasks = add_all(&harness, &root, &["One", "Two", "Three"]);
    let (Some(one), Some(two), Some(three)) = (tasks.first(), tasks.get(1), tasks.get(2)) else {
        panic!("three tasks expected");
    };
    complete(&harness, &root, two.id());
    let service = &harness.workspace.tasks;

    assert!(
        service
            .move_task(root.id(), three.id(), MoveDirection::Previous)
            .expect("move")
    );
    assert_eq!(listed(&harness, &root), vec!["Three", "One", "Two"]);

    assert!(
        !service
            .move_task(root.id(), two.id(), MoveDirection::Next)
            .expect("edge")
    );
    assert!(
        !service
            .move_task(root.id(), two.id(), MoveDirection::Previous)
            .expect("alone among completed")
    );
    assert!(
        !service
            .move_task(root.id(), three.id(), MoveDirection::Previous)
            .expect("first open task")
    );
    assert!(
        service
            .move_task(root.id(), one.id(), MoveDirection::Previous)
            .expect("move back")
    );
    assert_eq!(listed(&harness, &root), vec!["One", "Three", "Two"]);
}

#[rstest]
fn tied_tasks_are_renumbered_before_swapping(harness: Harness) {
    let (root, _) = branches(&harness);
    let tied_a = Task::new(root.id(), "Tied A", 0, &harness.clock).expect("task");
    let tied_b = Task::new(root.id(), "Tied B", 0, &harness.clock).expect("task");
    let last = Task::new(root.id(), "Last", 1, &harness.clock).expect("task");
    harness
        .store
        .commit(&ChangeSet::new().with(tied_a).with(tied_b).with(last))
        .expect("seed");
    let service = &harness.workspace.tasks;
    let before: Vec<TaskId> = service
        .list_tasks(root.id(), TaskFilter::All)
        .expect("tasks")
        .iter()
        .map(Task::id)
        .collect();
    let [leader, middle, trailer] = before.as_slice() else {
        panic!("three tasks expected");
    };

    assert!(
        service
            .move_task(root.id(), *trailer, MoveDirection::Previous)
            .expect("move")
    );

    let after = service.list_tasks(root.id(), TaskFilter::All).expect("tasks");
    let order: Vec<(TaskId, i64)> = after.iter().map(|task| (task.id(), task.position())).collect();
    assert_eq!(order, vec![(*leader, 0), (*trailer, 1), (*middle, 2)]);
}

#[rstest]
fn moving_to_another_branch_appends_there(harness: Harness) {
    let (root, side) = branches(&harness);
    add_all(&harness, &side, &["Existing A", "Existing B"]);
    let task = harness
        .workspace
        .tasks
        .add_task(root.id(), "Traveller")
        .expect("task");

    let moved = harness
        .workspace
        .tasks
        .move_task_to_branch(task.id(), root.id(), side.id())
        .expect("move");

    assert_eq!(moved.branch_id(), side.id());
    assert_eq!(moved.position(), 2);
    assert!(listed(&harness, &root).is_empty());
    assert!(matches!(
        harness
            .workspace
            .tasks
            .move_task_to_branch(task.id(), root.id(), side.id()),
        Err(WorkspaceError::TaskNotInBranch { .. })
    ));
}

#[rstest]
fn bulk_update_is_additive_and_skips_known_titles(harness: Harness) {
    let (root, _) = branches(&harness);
    let existing = add_all(&harness, &root, &["Keep", "Finished"]);
    complete(&harness, &root, existing.get(1).expect("finished").id());

    let added = harness
        .workspace
        .tasks
        .bulk_update_tasks(root.id(), "Keep\n\n  New one  \nFinished\nNew one\n")
        .expect("bulk update");

    let added_titles: Vec<&str> = added.iter().map(Task::title).collect();
    assert_eq!(added_titles, vec!["New one", "Finished"]);
    assert_eq!(
        listed(&harness, &root),
        vec!["Keep", "New one", "Finished", "Finished"]
    );
}

#[rstest]
fn bulk_move_carries_every_task(harness: Harness) {
    let (root, side) = branches(&harness);
    let tasks = add_all(&harness, &root, &["One", "Two"]);
    let ids: Vec<TaskId> = tasks.iter().map(Task::id).collect();

    let moved = harness
        .workspace
        .tasks
        .bulk_move_tasks(&ids, root.id(), side.id())
        .expect("bulk move");

    assert_eq!(moved.len(), 2);
    assert!(listed(&harness, &root).is_empty());
    assert_eq!(listed(&harness, &side), vec!["One", "Two"]);
}

#[rstest]
fn deleted_tasks_disappear(harness: Harness) {
    let (root, _) = branches(&harness);
    let task = harness
        .workspace
        .tasks
        .add_task(root.id(), "Draft")
        .expect("task");

    harness.workspace.tasks.delete_task(task.id()).expect("delete");

    assert!(listed(&harness, &root).is_empty());
    assert!(matches!(
        harness.workspace.tasks.task(task.id()),
        Err(WorkspaceError::TaskNotFound(_))
    ));
}
