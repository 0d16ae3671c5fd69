// tests/combinators.rs

mod common;
use crate::common::{
    assert_progress, count, counting_callback, counting_task, drive_until_idle, init_tracing,
    ManualTasks,
};

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use taskdriver::{
    DependentTask, Limit, NotifyingTask, NotifyingTaskBatch, RepeatingTask, Task, TaskDriver,
};

#[test]
fn dependent_task_waits_for_every_dependency() {
    init_tracing();
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();

    let a = NotifyingTask::new(manual.labelled("A"));
    let b = NotifyingTask::new(manual.labelled("B"));
    let c = NotifyingTask::new(manual.labelled("C"));
    let dependent = DependentTask::new(manual.labelled("dependent"));
    dependent.schedule(&driver, [&a, &b, &c]).unwrap();

    for task in [&a, &b, &c] {
        driver.submit(task.clone()).unwrap();
    }
    assert_progress(&driver, 0, 3, 0);

    manual.finish("A").unwrap();
    manual.finish("B").unwrap();
    assert_progress(&driver, 0, 1, 2);
    assert!(!manual.started().contains(&"dependent"));

    manual.finish("C").unwrap();
    assert_progress(&driver, 0, 1, 3);
    assert_eq!(manual.started().last(), Some(&"dependent"));

    manual.finish("dependent").unwrap();
    assert!(dependent.has_completed());
}

#[test]
fn dependents_can_chain() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::with_limit(Limit::bounded(1).unwrap());

    let root = NotifyingTask::new(manual.labelled("root"));
    let middle = DependentTask::new(manual.labelled("middle"));
    let leaf = DependentTask::new(manual.labelled("leaf"));
    middle.schedule(&driver, [&root]).unwrap();
    leaf.schedule(&driver, [middle.notifying()]).unwrap();

    driver.submit(root.clone()).unwrap();
    let steps = drive_until_idle(&driver, &manual, 10).unwrap();

    assert_eq!(steps, 3);
    assert_eq!(manual.started(), vec!["root", "middle", "leaf"]);
}

#[test]
fn late_subscription_after_completion_fires_immediately() {
    let driver = TaskDriver::new();
    let task = NotifyingTask::new(Task::synchronous(|| Ok(())));
    driver.submit(task.clone()).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    task.subscribe(counting_callback(&fired)).unwrap();

    assert_eq!(count(&fired), 1);
}

#[test]
fn completed_flag_survives_resubmission() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let task = NotifyingTask::new(manual.task());
    let fired = Arc::new(AtomicUsize::new(0));
    task.subscribe(counting_callback(&fired)).unwrap();

    driver.submit(task.clone()).unwrap();
    manual.finish_next().unwrap();
    assert_eq!(count(&fired), 1);

    // Reused and in flight again: a new subscriber still fires at once.
    driver.submit(task.clone()).unwrap();
    let late = Arc::new(AtomicUsize::new(0));
    task.subscribe(counting_callback(&late)).unwrap();
    assert_eq!(count(&late), 1);

    manual.finish_next().unwrap();
    assert_eq!(count(&fired), 2);
    assert_eq!(count(&late), 2);
}

#[test]
fn notifying_batch_notifies_once_per_submission() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let notified = Arc::new(AtomicUsize::new(0));
    let mut batch = NotifyingTaskBatch::new(counting_callback(&notified));
    batch.add(manual.task()).add(manual.task());

    driver.submit_batch(&batch).unwrap();
    manual.finish_next().unwrap();
    assert_eq!(count(&notified), 0);
    manual.finish_next().unwrap();
    assert_eq!(count(&notified), 1);

    // Second submission sees the updated membership.
    batch.add(manual.task());
    driver.submit_batch(&batch).unwrap();
    assert_eq!(manual.pending(), 3);
    manual.finish_next().unwrap();
    manual.finish_next().unwrap();
    assert_eq!(count(&notified), 1);
    manual.finish_next().unwrap();
    assert_eq!(count(&notified), 2);
}

#[test]
fn notifying_batch_mixes_sync_and_async_members() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let notified = Arc::new(AtomicUsize::new(0));

    driver
        .submit_notifying(
            [counting_task(&runs), manual.task(), counting_task(&runs)],
            counting_callback(&notified),
        )
        .unwrap();
    assert_eq!(count(&runs), 2);
    assert_eq!(count(&notified), 0);

    manual.finish_next().unwrap();
    assert_eq!(count(&notified), 1);
    assert_progress(&driver, 0, 0, 3);
}

#[test]
fn repeating_task_stops_at_its_limit() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let repeating = RepeatingTask::bounded(manual.task(), 3).unwrap();
    driver.submit(repeating.clone()).unwrap();
    assert_eq!(manual.start_count(), 1);

    manual.finish_next().unwrap();
    manual.finish_next().unwrap();
    assert_eq!(repeating.completed_runs(), 2);
    assert_eq!(manual.start_count(), 3);
    assert_progress(&driver, 0, 1, 0);

    manual.finish_next().unwrap();
    assert_progress(&driver, 0, 0, 1);
    assert_eq!(manual.start_count(), 3);
    assert_eq!(manual.pending(), 0);
}

#[test]
fn unbounded_repeating_task_runs_until_stopped() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let repeating = RepeatingTask::new(manual.task());
    driver.submit(repeating.clone()).unwrap();

    for _ in 0..10 {
        manual.finish_next().unwrap();
    }
    assert_progress(&driver, 0, 1, 0);

    repeating.stop();
    manual.finish_next().unwrap();
    assert_progress(&driver, 0, 0, 1);
    assert_eq!(repeating.completed_runs(), 11);
}

#[test]
fn repeating_notifying_task_notifies_once_per_outer_run() {
    let manual = ManualTasks::new();
    let driver = TaskDriver::new();
    let outer = NotifyingTask::new(RepeatingTask::bounded(manual.task(), 2).unwrap().into());
    let fired = Arc::new(AtomicUsize::new(0));
    outer.subscribe(counting_callback(&fired)).unwrap();

    driver.submit(outer.clone()).unwrap();
    manual.finish_next().unwrap();
    assert_eq!(count(&fired), 0);
    manual.finish_next().unwrap();
    assert_eq!(count(&fired), 1);
}
