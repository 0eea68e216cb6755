//! Client-side document identifiers

use mongodb::bson::Bson;
use mongodb::bson::oid::ObjectId;

/// Produces fresh, globally unique `_id` values.
///
/// Generation must not depend on state shared with other generators, so a
/// single generator can be used from any number of tasks at once.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier.
    fn generate(&self) -> Bson;
}

/// Default generator: a new `ObjectId` per call
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn generate(&self) -> Bson {
        Bson::ObjectId(ObjectId::new())
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> Bson + Send + Sync,
{
    fn generate(&self) -> Bson {
        self()
    }
}
