mod common;

use common::{connect, service_in, ScriptedDrive};
use core_library::{
    create_pool, DatabaseConfig, ExternalFileRepository, SqliteExternalFileRepository,
};
use core_service::CoreError;

#[tokio::test]
async fn create_report_writes_pointer_and_mapping() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::returning("abc123")).await;
    connect(t.secure_store.clone()).await;

    let linked = t
        .service
        .create_linked_document(workspace.path(), "Report")
        .await
        .unwrap();

    let pointer = workspace.path().join("Report.goox");
    assert_eq!(linked.local_path, pointer);
    assert_eq!(linked.remote_id, "abc123");
    assert_eq!(linked.url, "https://docs.google.com/document/d/abc123/edit");
    assert_eq!(std::fs::read_to_string(&pointer).unwrap(), "abc123");
    assert_eq!(t.drive.created.lock().unwrap().as_slice(), ["Report"]);

    let listed = t.service.list_linked_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].local_path, pointer.to_string_lossy());
    assert_eq!(listed[0].remote_id, "abc123");
}

#[tokio::test]
async fn failed_remote_create_leaves_nothing_behind() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::failing()).await;
    connect(t.secure_store.clone()).await;

    let result = t
        .service
        .create_linked_document(workspace.path(), "Report")
        .await;

    assert!(matches!(result, Err(CoreError::RemoteCreateFailed(_))));
    assert!(!workspace.path().join("Report.goox").exists());
    assert!(t.service.list_linked_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_without_connection_is_rejected() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::returning("abc123")).await;

    let result = t
        .service
        .create_linked_document(workspace.path(), "Report")
        .await;

    assert!(matches!(result, Err(CoreError::NotConnected)));
    assert!(t.drive.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn open_falls_back_to_pointer_content() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::returning("unused")).await;

    // A pointer whose mapping row was lost.
    let pointer = workspace.path().join("Budget.goox");
    std::fs::write(&pointer, "xyz789\n").unwrap();

    assert_eq!(
        t.service.resolve_linked_document(&pointer).await.unwrap(),
        "xyz789"
    );

    let opened = t.service.open_linked_document(&pointer).await.unwrap();
    assert_eq!(opened.remote_id, "xyz789");
    assert_eq!(
        t.opener.opened.lock().unwrap().as_slice(),
        ["https://docs.google.com/document/d/xyz789/edit"]
    );
}

#[tokio::test]
async fn deleted_row_still_resolves_after_create() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::returning("xyz789")).await;
    connect(t.secure_store.clone()).await;

    let linked = t
        .service
        .create_linked_document(workspace.path(), "Plan")
        .await
        .unwrap();

    // Drop the mapping behind the service's back through a second pool.
    let pool = create_pool(DatabaseConfig::new(data.path().join("state").join("finder.db")))
        .await
        .unwrap();
    let references = SqliteExternalFileRepository::new(pool);
    references
        .remove(&linked.local_path.to_string_lossy())
        .await
        .unwrap();

    assert_eq!(
        t.service
            .resolve_linked_document(&linked.local_path)
            .await
            .unwrap(),
        "xyz789"
    );
}

#[tokio::test]
async fn rename_and_delete_keep_stores_in_step() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let t = service_in(data.path(), ScriptedDrive::returning("abc123")).await;
    connect(t.secure_store.clone()).await;
    let mut events = t.service.subscribe();

    let linked = t
        .service
        .create_linked_document(workspace.path(), "Report")
        .await
        .unwrap();
    let moved = workspace.path().join("archive").join("Report.goox");
    std::fs::create_dir_all(moved.parent().unwrap()).unwrap();

    t.service
        .rename_linked_document(&linked.local_path, &moved)
        .await
        .unwrap();
    let listed = t.service.list_linked_documents().await.unwrap();
    assert_eq!(listed[0].local_path, moved.to_string_lossy());

    t.service.delete_linked_document(&moved).await.unwrap();
    assert!(!moved.exists());
    assert!(t.service.list_linked_documents().await.unwrap().is_empty());

    use core_runtime::events::{CoreEvent, LinkEvent};
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Link(LinkEvent::Created { .. })
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Link(LinkEvent::Renamed { .. })
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Link(LinkEvent::Removed { .. })
    ));
}

#[tokio::test]
async fn mappings_survive_restart() {
    let data = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    {
        let t = service_in(data.path(), ScriptedDrive::returning("abc123")).await;
        connect(t.secure_store.clone()).await;
        t.service
            .create_linked_document(workspace.path(), "Report")
            .await
            .unwrap();
    }

    let t = service_in(data.path(), ScriptedDrive::failing()).await;
    let listed = t.service.list_linked_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].remote_id, "abc123");
}
