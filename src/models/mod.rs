//! Typed records, create inputs and enums for the photo-order schema.

mod enums;
mod inputs;
mod records;

pub use enums::*;
pub use inputs::*;
pub use records::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Ties a record type to its schema model and create input.
pub trait Model: DeserializeOwned + Send + Sync + 'static {
    /// Model id in the schema document (`"order"`, `"uploaded_photo"`, ...).
    const NAME: &'static str;
    type Create: Serialize + Send + Sync;
}

macro_rules! impl_model {
    ($($ty:ty => $name:literal, $create:ty;)+) => {
        $(impl Model for $ty {
            const NAME: &'static str = $name;
            type Create = $create;
        })+
    };
}

impl_model! {
    User => "user", NewUser;
    Account => "account", NewAccount;
    Session => "session", NewSession;
    Profile => "profile", NewProfile;
    Order => "order", NewOrder;
    UploadedPhoto => "uploaded_photo", NewUploadedPhoto;
    GeneratedPhoto => "generated_photo", NewGeneratedPhoto;
    PhotoRequest => "photo_request", NewPhotoRequest;
    ErrorLog => "error_log", NewErrorLog;
}
