use itemsvc_core::{
    BatchConfig, ItemDto, ItemService, ItemStore, ServiceError, SqliteItemStore, PROCESSED_STATUS,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn service() -> (Arc<SqliteItemStore>, ItemService<SqliteItemStore>) {
    let store = Arc::new(SqliteItemStore::open_in_memory().unwrap());
    let service = ItemService::new(Arc::clone(&store), BatchConfig::immediate(4)).unwrap();
    (store, service)
}

fn dto(number: u32) -> ItemDto {
    ItemDto {
        id: None,
        name: format!("Item {number}"),
        description: format!("Description {number}"),
        status: "NEW".to_string(),
        email: format!("item{number}@gmail.com"),
    }
}

#[test]
fn save_creates_item_with_assigned_id() {
    let (_, service) = service();

    let saved = service.save(&dto(1)).unwrap();

    assert!(saved.id.is_some());
    assert_eq!(saved.email, "item1@gmail.com");
    assert_eq!(service.get_by_id(saved.id.unwrap()).unwrap(), saved);
}

#[test]
fn list_all_returns_every_item() {
    let (_, service) = service();
    let first = service.save(&dto(1)).unwrap();
    let second = service.save(&dto(2)).unwrap();

    let all = service.list_all().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&first));
    assert!(all.contains(&second));
}

#[test]
fn get_by_unknown_id_is_not_found() {
    let (_, service) = service();
    let id = Uuid::new_v4();

    let err = service.get_by_id(id).unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(_)));
    assert_eq!(err.to_string(), format!("Item with id: {id} not found!"));
}

#[test]
fn get_by_email_finds_item_or_reports_not_found() {
    let (_, service) = service();
    let saved = service.save(&dto(1)).unwrap();

    assert_eq!(service.get_by_email("item1@gmail.com").unwrap(), saved);

    let err = service.get_by_email("item1@gmal.com").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Item with email: item1@gmal.com not found!"
    );
}

#[test]
fn duplicate_email_is_conflict_and_keeps_single_record() {
    let (store, service) = service();
    let mut first = dto(1);
    first.email = "a@b.com".to_string();
    let original = service.save(&first).unwrap();

    let mut second = dto(2);
    second.email = "a@b.com".to_string();
    let err = service.save(&second).unwrap_err();

    assert!(matches!(&err, ServiceError::Conflict(_)));
    assert_eq!(err.to_string(), "Item with email: a@b.com already exists!");
    let owner = store.find_by_email("a@b.com").unwrap().unwrap();
    assert_eq!(owner.id, original.id);
    assert_eq!(owner.name, "Item 1");
    assert_eq!(store.list_ids().unwrap().len(), 1);
}

#[test]
fn save_rejects_invalid_fields() {
    let (store, service) = service();
    let mut invalid = dto(1);
    invalid.description = String::new();

    let err = service.save(&invalid).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(err.to_string(), "description: Description is mandatory!");
    assert!(store.list_ids().unwrap().is_empty());
}

#[test]
fn update_replaces_fields_and_keeps_id() {
    let (_, service) = service();
    let saved = service.save(&dto(1)).unwrap();
    let id = saved.id.unwrap();

    let mut changes = dto(9);
    changes.id = Some(Uuid::new_v4());
    let updated = service.update(id, &changes).unwrap();

    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.name, "Item 9");
    assert_eq!(updated.email, "item9@gmail.com");
    assert_eq!(service.list_all().unwrap().len(), 1);
}

#[test]
fn update_with_same_email_is_allowed() {
    let (_, service) = service();
    let saved = service.save(&dto(1)).unwrap();

    let mut changes = dto(1);
    changes.status = "IN_PROGRESS".to_string();
    let updated = service.update(saved.id.unwrap(), &changes).unwrap();

    assert_eq!(updated.status, "IN_PROGRESS");
}

#[test]
fn update_to_email_of_other_item_is_conflict() {
    let (_, service) = service();
    let first = service.save(&dto(1)).unwrap();
    service.save(&dto(2)).unwrap();

    let mut changes = dto(1);
    changes.email = "item2@gmail.com".to_string();
    let err = service.update(first.id.unwrap(), &changes).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Item with email: item2@gmail.com already exists!"
    );
    assert_eq!(
        service.get_by_id(first.id.unwrap()).unwrap().email,
        "item1@gmail.com"
    );
}

#[test]
fn update_unknown_id_is_not_found() {
    let (_, service) = service();

    let err = service.update(Uuid::new_v4(), &dto(1)).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn delete_removes_item_and_second_delete_is_not_found() {
    let (_, service) = service();
    let id = service.save(&dto(1)).unwrap().id.unwrap();

    service.delete_by_id(id).unwrap();
    assert!(matches!(
        service.get_by_id(id).unwrap_err(),
        ServiceError::NotFound(_)
    ));

    let err = service.delete_by_id(id).unwrap_err();
    assert_eq!(err.to_string(), format!("Item with id: {id} not found!"));
}

#[test]
fn process_all_returns_transitioned_dtos() {
    let (_, service) = service();
    let first = service.save(&dto(1)).unwrap();
    let second = service.save(&dto(2)).unwrap();
    let mut done = dto(3);
    done.status = PROCESSED_STATUS.to_string();
    service.save(&done).unwrap();

    let processed = service.process_all().unwrap();

    let ids = processed.iter().filter_map(|item| item.id).collect::<HashSet<_>>();
    assert_eq!(ids, HashSet::from([first.id.unwrap(), second.id.unwrap()]));
    assert!(processed.iter().all(|item| item.status == PROCESSED_STATUS));
}

#[test]
fn process_all_async_matches_blocking_result() {
    let (_, service) = service();
    service.save(&dto(1)).unwrap();
    service.save(&dto(2)).unwrap();

    let report = service.process_all_async().unwrap().wait().unwrap();

    assert_eq!(report.transitioned.len(), 2);
    assert!(service.process_all().unwrap().is_empty());
}

#[test]
fn shutdown_makes_batch_calls_fail() {
    let (_, service) = service();
    service.save(&dto(1)).unwrap();

    service.shutdown();

    assert!(matches!(
        service.process_all().unwrap_err(),
        ServiceError::Batch(_)
    ));
    assert!(service.get_by_email("item1@gmail.com").is_ok());
}
