mod common;

use common::{count_rows, legacy_price, open, product, CatalogRecord, LEGACY_PRICE, PRODUCT};
use savegate_core::{
    AuditedSession, ChangeKind, Entity, FixedClock, RecordListQuery, SaveContext, SaveError,
    SaveInterceptor,
};
use uuid::Uuid;

type Session<'conn> = AuditedSession<'conn, CatalogRecord, Uuid>;

#[test]
fn widget_lifecycle_tracks_versions_and_actors() {
    let conn = open();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(u1));

    let widget = product("Widget", 1_000);
    let id = *widget.id();
    session.add(widget);
    let report = session.save_changes().unwrap();
    assert_eq!(report.inserted, 1);

    let mut stored = session.find_live(PRODUCT, &id).unwrap();
    {
        let audit = &stored.product().audit;
        assert_eq!(audit.version, 1);
        assert_eq!(audit.created_by, Some(u1));
        assert_eq!(audit.modified_by, Some(u1));
        assert_eq!(audit.created_on, audit.modified_on);
    }

    session.set_actor(Some(u2));
    stored.product_mut().price_cents = 1_250;
    session.update(stored);
    assert_eq!(session.save_changes().unwrap().updated, 1);

    let stored = session.find_live(PRODUCT, &id).unwrap();
    let audit = &stored.product().audit;
    assert_eq!(stored.product().price_cents, 1_250);
    assert_eq!(audit.version, 2);
    assert_eq!(audit.created_by, Some(u1));
    assert_eq!(audit.modified_by, Some(u2));
    assert!(audit.created_on <= audit.modified_on);

    session.set_actor(Some(u1));
    session.remove(stored);
    let report = session.save_changes().unwrap();
    assert_eq!(report.soft_deleted, 1);
    assert_eq!(report.deleted, 0);

    let err = session.find_live(PRODUCT, &id).unwrap_err();
    assert!(matches!(err, SaveError::NotFound { ref entity_type, .. } if entity_type == PRODUCT));

    let tombstone = session.get(PRODUCT, &id, true).unwrap().unwrap();
    assert!(tombstone.product().is_deleted);
    assert_eq!(tombstone.product().audit.version, 2);
    assert_eq!(tombstone.product().audit.modified_by, Some(u1));
    assert_eq!(count_rows(&conn), 1);
}

#[test]
fn anonymous_insert_is_timestamped_but_not_versioned() {
    let conn = open();
    let mut session: AuditedSession<'_, CatalogRecord, Uuid, FixedClock> = AuditedSession::with_parts(
        &conn,
        SaveInterceptor::with_clock(FixedClock(1_700_000_000_000)),
        SaveContext::<Uuid>::anonymous(),
    );

    let record = product("Gadget", 500);
    let id = *record.id();
    session.add(record);
    session.save_changes().unwrap();

    let stored = session.find_live(PRODUCT, &id).unwrap();
    let audit = &stored.product().audit;
    assert_eq!(audit.created_on, 1_700_000_000_000);
    assert_eq!(audit.modified_on, 1_700_000_000_000);
    assert!(audit.created_by.is_none());
    assert!(audit.modified_by.is_none());
    assert_eq!(audit.version, 0);
}

#[test]
fn update_without_actor_keeps_creator_and_version() {
    let conn = open();
    let creator = Uuid::new_v4();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(creator));

    let record = product("Gizmo", 10);
    let id = *record.id();
    session.add(record);
    session.save_changes().unwrap();

    session.set_actor(None);
    let mut stored = session.find_live(PRODUCT, &id).unwrap();
    stored.product_mut().name = "Gizmo 2".to_string();
    session.update(stored);
    session.save_changes().unwrap();

    let stored = session.find_live(PRODUCT, &id).unwrap();
    assert_eq!(stored.product().name, "Gizmo 2");
    assert_eq!(stored.product().audit.created_by, Some(creator));
    assert_eq!(stored.product().audit.modified_by, Some(creator));
    assert_eq!(stored.product().audit.version, 1);
}

#[test]
fn read_only_scope_rejects_commit_and_mutates_nothing() {
    let conn = open();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(Uuid::new_v4()));
    let record = product("Widget", 1);
    let id = *record.id();
    session.add(record.clone());

    let scope = session.enter_read_only();
    let err = session.save_changes().unwrap_err();
    assert!(matches!(err, SaveError::ReadOnlyScope { pending: 1 }));
    assert_eq!(count_rows(&conn), 0);
    assert_eq!(session.pending_len(), 1);
    assert_eq!(record.product().audit.version, 0);

    scope.exit();
    session.save_changes().unwrap();
    assert_eq!(session.find_live(PRODUCT, &id).unwrap().product().audit.version, 1);
}

#[test]
fn nested_read_only_scopes_stay_active_until_outermost_exit() {
    let conn = open();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(Uuid::new_v4()));
    session.add(product("Widget", 1));

    let outer = session.enter_read_only();
    let inner = session.enter_read_only();
    inner.exit();
    assert!(matches!(
        session.save_changes().unwrap_err(),
        SaveError::ReadOnlyScope { .. }
    ));

    drop(outer);
    assert_eq!(session.save_changes().unwrap().inserted, 1);
}

#[test]
fn read_only_entity_is_rejected_without_any_scope() {
    let conn = open();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(Uuid::new_v4()));

    let stages: [(fn(&mut Session<'_>, CatalogRecord), ChangeKind); 3] = [
        (|s, record| s.add(record), ChangeKind::Insert),
        (|s, record| s.update(record), ChangeKind::Update),
        (|s, record| s.remove(record), ChangeKind::Delete),
    ];

    for (stage, expected) in stages {
        session.discard_pending();
        session.add(product("Widget", 1));
        stage(&mut session, legacy_price("SKU-1"));

        match session.save_changes().unwrap_err() {
            SaveError::ReadOnlyEntity {
                entity_type,
                operation,
            } => {
                assert_eq!(entity_type, LEGACY_PRICE);
                assert_eq!(operation, expected);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(count_rows(&conn), 0);
    }
}

#[test]
fn read_only_entity_error_reports_attempted_operation() {
    let conn = open();
    let mut session: Session<'_> = AuditedSession::new(&conn, None);
    session.remove(legacy_price("SKU-9"));

    let err = session.save_changes().unwrap_err();
    assert_eq!(err.to_string(), "cannot delete read-only entity `legacy_price`");
}

#[test]
fn deleting_twice_keeps_tombstone_and_version() {
    let conn = open();
    let actor = Uuid::new_v4();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(actor));
    let record = product("Widget", 1);
    let id = *record.id();
    session.add(record);
    session.save_changes().unwrap();

    let stored = session.find_live(PRODUCT, &id).unwrap();
    session.remove(stored);
    session.save_changes().unwrap();

    let tombstone = session.get(PRODUCT, &id, true).unwrap().unwrap();
    session.remove(tombstone);
    session.save_changes().unwrap();

    let tombstone = session.get(PRODUCT, &id, true).unwrap().unwrap();
    assert!(tombstone.product().is_deleted);
    assert_eq!(tombstone.product().audit.version, 1);
    assert_eq!(count_rows(&conn), 1);
}

#[test]
fn list_hides_tombstones_unless_requested() {
    let conn = open();
    let mut session: Session<'_> = AuditedSession::new(&conn, Some(Uuid::new_v4()));
    let keep = product("Keep", 1);
    let drop_me = product("Drop", 2);
    let drop_id = *drop_me.id();
    session.add(keep);
    session.add(drop_me);
    session.save_changes().unwrap();

    let stored = session.find_live(PRODUCT, &drop_id).unwrap();
    session.remove(stored);
    session.save_changes().unwrap();

    let live = session.list(&RecordListQuery::default()).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].product().name, "Keep");

    let all = session
        .list(&RecordListQuery {
            entity_type: Some(PRODUCT.to_string()),
            include_deleted: true,
            ..RecordListQuery::default()
        })
        .unwrap();
    assert_eq!(all.len(), 2);
}
