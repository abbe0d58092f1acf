//! Typed collection view.

use crate::error::{CoreError, CoreResult};
use crate::query::{Document, Predicate};
use crate::store::{Connection, DocumentStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// A collection whose documents are (de)serialized as `T`.
///
/// `Collection<T>` is a thin view over [`DocumentStore`]: every call is a
/// store call plus a `serde_json` conversion. Filtering stays in the host
/// language, or uses a [`Predicate`] for equality matches:
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { name: String, age: u32 }
///
/// let users = store.collection::<User>(&db, "users");
/// users.insert(&User { name: "Rahul".into(), age: 20 })?;
///
/// let adults: Vec<User> = users.all()?.into_iter().filter(|u| u.age >= 18).collect();
/// let rahul = users.get_where(&Predicate::all().with("name", "Rahul"))?;
/// ```
pub struct Collection<T> {
    store: DocumentStore,
    conn: Connection,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            conn: self.conn.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    pub(crate) fn new(store: DocumentStore, conn: Connection, name: String) -> Self {
        Self {
            store,
            conn,
            name,
            _marker: PhantomData,
        }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// `Validation` if `T` does not serialize to a JSON object.
    pub fn insert(&self, value: &T) -> CoreResult<usize> {
        self.store.insert(&self.conn, &self.name, to_value(value)?)
    }

    /// Appends values in order, all or nothing.
    pub fn insert_many<'a, I>(&self, values: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let values = values
            .into_iter()
            .map(to_value)
            .collect::<CoreResult<Vec<_>>>()?;
        self.store.insert_many(&self.conn, &self.name, values)
    }

    /// Returns every document as `T`, in stored order.
    ///
    /// # Errors
    ///
    /// `Validation` if a stored document does not deserialize as `T`.
    pub fn all(&self) -> CoreResult<Vec<T>> {
        self.store
            .get_all(&self.conn, &self.name)?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Returns the first document matching `predicate` as `T`.
    pub fn get_where(&self, predicate: &Predicate) -> CoreResult<Option<T>> {
        self.store
            .get_where(&self.conn, &self.name, predicate)?
            .map(from_document)
            .transpose()
    }

    /// Returns every document matching `predicate` as `T`.
    pub fn find(&self, predicate: &Predicate) -> CoreResult<Vec<T>> {
        self.store
            .find(&self.conn, &self.name, predicate)?
            .into_iter()
            .map(from_document)
            .collect()
    }
}

fn to_value<T: Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::validation(format!("cannot serialize document: {e}")))
}

fn from_document<T: DeserializeOwned>(document: Document) -> CoreResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| CoreError::validation(format!("document does not match type: {e}")))
}
