//! Wire shape of an item and conversions to/from storage.
//!
//! Both directions are pure field copies; validation happens on the
//! storage shape.

use crate::model::item::{Item, ItemId};
use serde::{Deserialize, Serialize};

/// Item as exchanged with API callers.
///
/// Missing JSON fields deserialize to empty strings so that validation
/// reports them by field name instead of failing at decode time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDto {
    pub id: Option<ItemId>,
    pub name: String,
    pub description: String,
    pub status: String,
    pub email: String,
}

/// Converts a wire item into its storage shape.
pub fn to_storage(dto: &ItemDto) -> Item {
    Item {
        id: dto.id,
        name: dto.name.clone(),
        description: dto.description.clone(),
        status: dto.status.clone(),
        email: dto.email.clone(),
    }
}

/// Converts a stored item into its wire shape.
pub fn to_wire(item: &Item) -> ItemDto {
    ItemDto {
        id: item.id,
        name: item.name.clone(),
        description: item.description.clone(),
        status: item.status.clone(),
        email: item.email.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{to_storage, to_wire, ItemDto};
    use uuid::Uuid;

    #[test]
    fn to_storage_keeps_every_field() {
        let dto = ItemDto {
            id: Some(Uuid::new_v4()),
            name: "Item 1".to_string(),
            description: "Description 1".to_string(),
            status: "NEW".to_string(),
            email: "item1@gmail.com".to_string(),
        };

        let item = to_storage(&dto);
        assert_eq!(item.id, dto.id);
        assert_eq!(item.email, "item1@gmail.com");
        assert_eq!(to_wire(&item), dto);
    }

    #[test]
    fn missing_json_fields_default_to_empty() {
        let dto: ItemDto = serde_json::from_str(r#"{"name":"only name"}"#).unwrap();
        assert_eq!(dto.id, None);
        assert_eq!(dto.name, "only name");
        assert!(dto.email.is_empty());
        assert!(to_storage(&dto).validate().is_err());
    }
}
