//! Property-based JSON tests for the task model.
//!
//! Uses proptest to verify:
//! 1. Any task list (offline bookkeeping included) survives encode → decode.
//! 2. Any queue of pending creations survives encode → decode.
//! 3. Random bytes never cause a panic in `decode` (returns `Err` gracefully).

use proptest::prelude::*;
use todosync_proto::codec;
use todosync_proto::mutation::PendingMutation;
use todosync_proto::task::{ChecklistItem, SyncStatus, Task, TaskDraft, TaskId};

/// Strategy for permanent and temporary ids in both JSON forms.
fn arb_task_id() -> impl Strategy<Value = TaskId> {
    prop_oneof![
        any::<u64>().prop_map(TaskId::Number),
        "[a-z0-9-]{1,36}".prop_map(TaskId::Text),
        any::<u64>().prop_map(TaskId::temporary_at),
    ]
}

fn arb_sync_status() -> impl Strategy<Value = Option<SyncStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(SyncStatus::Pending)),
        Just(Some(SyncStatus::Syncing)),
        Just(Some(SyncStatus::Error)),
        Just(Some(SyncStatus::Synced)),
    ]
}

fn arb_checklist() -> impl Strategy<Value = Vec<ChecklistItem>> {
    prop::collection::vec(
        ("[^\x00]{0,32}", any::<bool>()).prop_map(|(text, done)| ChecklistItem { text, done }),
        0..5,
    )
}

fn arb_draft() -> impl Strategy<Value = TaskDraft> {
    (
        "[^\x00]{1,64}",
        any::<bool>(),
        prop::option::of("[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}"),
        "[^\x00]{0,64}",
        arb_checklist(),
    )
        .prop_map(
            |(text, completed, due_date, description, checklist)| TaskDraft {
                text,
                completed,
                due_date,
                description,
                checklist,
            },
        )
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        arb_draft(),
        any::<bool>(),
        arb_sync_status(),
        0u32..10,
    )
        .prop_map(|(id, draft, offline, sync_status, retries)| {
            let mut task = Task::from_draft(id, draft);
            task.offline = offline;
            task.sync_status = sync_status;
            task.retries = retries;
            task
        })
}

proptest! {
    #[test]
    fn task_list_round_trip(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let bytes = codec::encode(&tasks).unwrap();
        let decoded: Vec<Task> = codec::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, tasks);
    }

    #[test]
    fn pending_queue_round_trip(
        entries in prop::collection::vec((arb_task_id(), arb_draft(), 0u32..10), 0..8)
    ) {
        let queue: Vec<PendingMutation> = entries
            .into_iter()
            .map(|(id, payload, retries)| PendingMutation { id, payload, retries })
            .collect();
        let bytes = codec::encode(&queue).unwrap();
        let decoded: Vec<PendingMutation> = codec::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, queue);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode::<Vec<Task>>(&bytes);
        let _ = codec::decode::<Vec<PendingMutation>>(&bytes);
    }
}
