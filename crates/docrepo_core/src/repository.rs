//! Generic repositories.

use crate::entity::{Entity, EntityDescriptor};
use crate::error::{CoreError, CoreResult};
use crate::scope::TransactionScope;
use docrepo_document::{Document, ObjectId, ID_FIELD};
use docrepo_driver::{Client, Collection, Filter, Session};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// The fixed set of transactional repository operations.
///
/// Every repository method maps to exactly one of these and goes through
/// the same dispatch: enter a scope, run against the scope's session,
/// exit with the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Insert a new record.
    Create,
    /// Look up one record by identity.
    FindById,
    /// Read every record.
    FindAll,
    /// Read records matching field equality criteria.
    FindByAttributes,
    /// Replace a stored record.
    Update,
    /// Remove a record.
    Delete,
    /// Remove a record by identity.
    DeleteById,
    /// Count records.
    Count,
    /// Check whether an identity exists.
    Exists,
    /// Run caller-supplied work as one unit.
    Transaction,
}

impl Operation {
    /// Returns the operation name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::FindById => "find_by_id",
            Operation::FindAll => "find_all",
            Operation::FindByAttributes => "find_by_attributes",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::DeleteById => "delete_by_id",
            Operation::Count => "count",
            Operation::Exists => "exists",
            Operation::Transaction => "transaction",
        }
    }

    /// Returns true if the operation writes to the store.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete | Operation::DeleteById
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-safe CRUD access to the collection of one entity type.
///
/// Every operation runs inside a transaction scope: called on its own it
/// commits or aborts by itself; called while the current call chain is
/// already inside a transaction it joins that transaction.
///
/// Obtain repositories from [`crate::Database::repository`] to get the
/// single shared instance per repository type.
///
/// # Example
///
/// ```rust
/// use docrepo_core::{impl_serde_entity, Database, ObjectId, Repository};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Person {
///     #[serde(skip)]
///     id: Option<ObjectId>,
///     name: String,
/// }
///
/// impl_serde_entity!(Person, "people", id);
///
/// let db = Database::open_in_memory("app");
/// let people = db.repository::<Repository<Person>>().unwrap();
///
/// let mut frank = Person { id: None, name: "Frank".into() };
/// let id = people.create(&mut frank).unwrap();
/// assert_eq!(frank.id, Some(id));
/// assert_eq!(people.find_by_id(id).unwrap(), Some(frank));
/// ```
pub struct Repository<E: Entity> {
    descriptor: EntityDescriptor,
    client: Arc<dyn Client>,
    collection: Arc<dyn Collection>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    /// Binds a repository to `E`'s collection on `client`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Definition` if `E`'s descriptor is invalid, or
    /// a driver error if the collection cannot be acquired.
    pub fn new(client: Arc<dyn Client>) -> CoreResult<Self> {
        let descriptor = EntityDescriptor::of::<E>()?;
        let collection = client.collection(descriptor.collection_name())?;
        Ok(Self {
            descriptor,
            client,
            collection,
            _marker: PhantomData,
        })
    }

    /// Returns the entity descriptor.
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Returns the collection name.
    pub fn collection_name(&self) -> &'static str {
        self.descriptor.collection_name()
    }

    /// Returns the client this repository is bound to.
    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Inserts a record and assigns its store-issued identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAlreadyAssigned` if the record already has an
    /// identity, or the driver error if the insert or commit fails.
    pub fn create(&self, entity: &mut E) -> CoreResult<ObjectId> {
        if let Some(id) = entity.id() {
            return Err(CoreError::IdentityAlreadyAssigned {
                collection: self.collection_name().to_string(),
                id,
            });
        }
        let mut document = entity.to_fields()?;
        document.remove(ID_FIELD);

        let id = self.dispatch(Operation::Create, |collection, session| {
            Ok(collection.insert_one(document, Some(session))?)
        })?;
        entity.set_id(id);
        Ok(id)
    }

    /// Looks up a record by identity. A miss returns `None`.
    pub fn find_by_id(&self, id: ObjectId) -> CoreResult<Option<E>> {
        self.dispatch(Operation::FindById, |collection, session| {
            collection
                .find_one(&Filter::by_id(id), Some(session))?
                .map(hydrate)
                .transpose()
        })
    }

    /// Returns every record in store order.
    pub fn find_all(&self) -> CoreResult<Vec<E>> {
        self.dispatch(Operation::FindAll, |collection, session| {
            hydrate_all(collection.find(&Filter::all(), Some(session))?)
        })
    }

    /// Returns every record whose fields equal all `criteria`.
    ///
    /// Empty criteria return the same records as [`Repository::find_all`].
    pub fn find_by_attributes(&self, criteria: impl Into<Filter>) -> CoreResult<Vec<E>> {
        let filter = criteria.into();
        self.dispatch(Operation::FindByAttributes, |collection, session| {
            hydrate_all(collection.find(&filter, Some(session))?)
        })
    }

    /// Replaces the stored document with the record's current fields.
    ///
    /// Returns false if no document has the record's identity.
    pub fn update(&self, entity: &E) -> CoreResult<bool> {
        let id = self.require_id(entity)?;
        let mut document = entity.to_fields()?;
        document.remove(ID_FIELD);

        self.dispatch(Operation::Update, |collection, session| {
            let result = collection.replace_one(&Filter::by_id(id), document, Some(session))?;
            Ok(result.matched > 0)
        })
    }

    /// Removes the record's document.
    ///
    /// Returns false if it was already absent.
    pub fn delete(&self, entity: &E) -> CoreResult<bool> {
        let id = self.require_id(entity)?;
        self.remove(Operation::Delete, id)
    }

    /// Removes the document with identity `id`.
    ///
    /// Returns false if it was already absent.
    pub fn delete_by_id(&self, id: ObjectId) -> CoreResult<bool> {
        self.remove(Operation::DeleteById, id)
    }

    /// Counts the records.
    pub fn count(&self) -> CoreResult<usize> {
        self.dispatch(Operation::Count, |collection, session| {
            Ok(collection.find(&Filter::all(), Some(session))?.len())
        })
    }

    /// Returns whether a record with identity `id` exists.
    pub fn exists(&self, id: ObjectId) -> CoreResult<bool> {
        self.dispatch(Operation::Exists, |collection, session| {
            Ok(collection
                .find_one(&Filter::by_id(id), Some(session))?
                .is_some())
        })
    }

    /// Runs `f` as one transactional unit.
    ///
    /// Repository calls made inside `f`, on this or any other repository
    /// sharing the call chain, join the same transaction. If `f` fails the
    /// whole unit is rolled back and `f`'s error is returned unchanged.
    pub fn transaction<T, Er, F>(&self, f: F) -> Result<T, Er>
    where
        F: FnOnce(&Self) -> Result<T, Er>,
        Er: From<CoreError>,
    {
        trace!(
            collection = self.collection_name(),
            operation = %Operation::Transaction,
            "dispatching"
        );
        TransactionScope::run(self.client.as_ref(), |_| f(self))
    }

    fn remove(&self, operation: Operation, id: ObjectId) -> CoreResult<bool> {
        self.dispatch(operation, |collection, session| {
            Ok(collection.delete_one(&Filter::by_id(id), Some(session))?.deleted > 0)
        })
    }

    fn require_id(&self, entity: &E) -> CoreResult<ObjectId> {
        entity.id().ok_or_else(|| CoreError::MissingIdentity {
            collection: self.collection_name().to_string(),
        })
    }

    /// Runs one operation against the collection inside a transaction scope.
    fn dispatch<T, F>(&self, operation: Operation, f: F) -> CoreResult<T>
    where
        F: FnOnce(&dyn Collection, &dyn Session) -> CoreResult<T>,
    {
        let collection = self.collection_name();
        if operation.is_write() {
            debug!(collection, %operation, "dispatching write");
        } else {
            trace!(collection, %operation, "dispatching read");
        }

        let result = TransactionScope::run(self.client.as_ref(), |handle| {
            handle.with(|session| f(self.collection.as_ref(), &*session))
        });
        if let Err(err) = &result {
            debug!(collection, %operation, error = %err, "operation failed");
        }
        result
    }
}

fn hydrate<E: Entity>(mut document: Document) -> CoreResult<E> {
    let id = document.get_object_id(ID_FIELD)?;
    document.remove(ID_FIELD);
    E::from_fields(id, document)
}

fn hydrate_all<E: Entity>(documents: Vec<Document>) -> CoreResult<Vec<E>> {
    documents.into_iter().map(hydrate).collect()
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.descriptor.type_name())
            .field("collection", &self.collection_name())
            .finish()
    }
}

/// A repository type managed by the registry.
///
/// [`Repository<E>`] implements this for itself. Custom repositories wrap
/// a `Repository<E>` and add their own methods on top:
///
/// ```rust
/// use docrepo_core::{impl_serde_entity, CoreResult, ObjectId, Repository, RepositoryType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Account {
///     #[serde(skip)]
///     id: Option<ObjectId>,
///     owner: String,
///     balance: i64,
/// }
///
/// impl_serde_entity!(Account, "accounts", id);
///
/// struct AccountRepository(Repository<Account>);
///
/// impl RepositoryType for AccountRepository {
///     type Entity = Account;
///
///     fn from_repository(repository: Repository<Account>) -> Self {
///         Self(repository)
///     }
/// }
///
/// impl AccountRepository {
///     fn by_owner(&self, owner: &str) -> CoreResult<Vec<Account>> {
///         self.0.find_by_attributes(docrepo_core::Filter::eq("owner", owner))
///     }
/// }
/// ```
pub trait RepositoryType: Send + Sync + 'static {
    /// The entity type this repository manages.
    type Entity: Entity;

    /// Wraps the generic repository bound to the entity's collection.
    fn from_repository(repository: Repository<Self::Entity>) -> Self;
}

impl<E: Entity> RepositoryType for Repository<E> {
    type Entity = E;

    fn from_repository(repository: Repository<E>) -> Self {
        repository
    }
}
