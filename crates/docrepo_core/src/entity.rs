//! Entity trait and static descriptors.

use crate::error::{CoreError, CoreResult};
use docrepo_document::{from_document, to_document, Document, ObjectId, ID_FIELD};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type stored as one document per instance.
///
/// The collection binding is a constant of the type, so it is fixed when
/// the type is defined and never looked up at call time.
///
/// Implementors must provide:
/// - `COLLECTION_NAME`: The collection holding instances of this type
/// - `id()` / `set_id()`: The store-assigned identity, absent until created
/// - `to_fields()` / `from_fields()`: Mapping to and from a flat document
///
/// The identity lives outside the field map. `to_fields` must not emit
/// `_id`; the engine strips it from stored documents before calling
/// `from_fields`.
///
/// # Example
///
/// ```rust
/// use docrepo_core::{CoreResult, Document, Entity, ObjectId};
///
/// struct Note {
///     id: Option<ObjectId>,
///     text: String,
/// }
///
/// impl Entity for Note {
///     const COLLECTION_NAME: &'static str = "notes";
///
///     fn id(&self) -> Option<ObjectId> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: ObjectId) {
///         self.id = Some(id);
///     }
///
///     fn to_fields(&self) -> CoreResult<Document> {
///         let mut fields = Document::new();
///         fields.insert("text", self.text.as_str());
///         Ok(fields)
///     }
///
///     fn from_fields(id: ObjectId, fields: Document) -> CoreResult<Self> {
///         Ok(Note {
///             id: Some(id),
///             text: fields.get_str("text")?.to_string(),
///         })
///     }
/// }
/// ```
pub trait Entity: Sized + 'static {
    /// Name of the collection instances are stored in.
    const COLLECTION_NAME: &'static str;

    /// Returns the identity, or `None` if the record was never created.
    fn id(&self) -> Option<ObjectId>;

    /// Assigns the store-issued identity.
    ///
    /// Called by the engine exactly once, after a successful insert.
    fn set_id(&mut self, id: ObjectId);

    /// Maps the record's fields to a document, without `_id`.
    fn to_fields(&self) -> CoreResult<Document>;

    /// Rebuilds a record from its identity and stored fields.
    fn from_fields(id: ObjectId, fields: Document) -> CoreResult<Self>;
}

/// Static metadata of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: &'static str,
    collection_name: &'static str,
}

impl EntityDescriptor {
    /// Resolves and validates the descriptor of `E`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Definition` if the collection name is unusable.
    pub fn of<E: Entity>() -> CoreResult<Self> {
        let type_name = std::any::type_name::<E>();
        validate_collection_name(E::COLLECTION_NAME)
            .map_err(|message| CoreError::definition(type_name, message))?;
        Ok(Self {
            type_name,
            collection_name: E::COLLECTION_NAME,
        })
    }

    /// Returns the Rust type name of the entity.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the collection name.
    pub fn collection_name(&self) -> &'static str {
        self.collection_name
    }
}

/// Checks that `name` can name a collection.
///
/// # Errors
///
/// Returns a description of the first rule the name breaks.
pub fn validate_collection_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        Err("collection name is empty")
    } else if name.contains('$') {
        Err("collection name contains '$'")
    } else if name.contains('\0') {
        Err("collection name contains a NUL character")
    } else if name.starts_with("system.") {
        Err("collection names starting with 'system.' are reserved")
    } else {
        Ok(())
    }
}

/// Maps a serde record to entity fields, dropping any `_id` it emits.
///
/// Used by [`impl_serde_entity!`](crate::impl_serde_entity).
pub fn serde_to_fields<T: Serialize>(record: &T) -> CoreResult<Document> {
    let mut fields = to_document(record)?;
    fields.remove(ID_FIELD);
    Ok(fields)
}

/// Rebuilds a serde record from entity fields.
///
/// Used by [`impl_serde_entity!`](crate::impl_serde_entity).
pub fn serde_from_fields<T: DeserializeOwned>(fields: &Document) -> CoreResult<T> {
    Ok(from_document(fields)?)
}

/// Implements [`Entity`] for a serde record.
///
/// The record's identity field must be an `Option<ObjectId>` marked
/// `#[serde(skip)]`.
///
/// # Example
///
/// ```rust
/// use docrepo_core::{impl_serde_entity, ObjectId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(skip)]
///     id: Option<ObjectId>,
///     text: String,
/// }
///
/// impl_serde_entity!(Note, "notes", id);
/// ```
#[macro_export]
macro_rules! impl_serde_entity {
    ($entity:ty, $collection:expr, $id:ident) => {
        impl $crate::Entity for $entity {
            const COLLECTION_NAME: &'static str = $collection;

            fn id(&self) -> ::core::option::Option<$crate::ObjectId> {
                self.$id
            }

            fn set_id(&mut self, id: $crate::ObjectId) {
                self.$id = ::core::option::Option::Some(id);
            }

            fn to_fields(&self) -> $crate::CoreResult<$crate::Document> {
                $crate::entity::serde_to_fields(self)
            }

            fn from_fields(
                id: $crate::ObjectId,
                fields: $crate::Document,
            ) -> $crate::CoreResult<Self> {
                let mut entity: Self = $crate::entity::serde_from_fields(&fields)?;
                entity.$id = ::core::option::Option::Some(id);
                ::core::result::Result::Ok(entity)
            }
        }
    };
}
