//! Typed access to the marketplace CRUD collections

use super::{AuthMode, CampusClient, ClientError, RequestBody, RequestOptions};
use campuskart_core::{
    Gig, GigUpdate, Item, ItemUpdate, NewGig, NewItem, NewNote, NewWantedItem, Note, NoteUpdate,
    WantedItem, WantedItemUpdate,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Conversion of a create/update payload into a request body
pub trait IntoRequestBody {
    fn into_request_body(self) -> Result<RequestBody, ClientError>;
}

/// A REST collection exposed under `PATH` (with leading and trailing slash)
pub trait Resource: DeserializeOwned {
    const PATH: &'static str;

    /// Query parameter restricting a listing to the caller's own records
    const OWNER_FILTER: Option<&'static str> = None;

    type Create: IntoRequestBody;
    type Update: IntoRequestBody;
}

impl Resource for Item {
    const PATH: &'static str = "/items/";
    const OWNER_FILTER: Option<&'static str> = Some("my_items");
    type Create = NewItem;
    type Update = ItemUpdate;
}

impl Resource for Gig {
    const PATH: &'static str = "/gigs/";
    const OWNER_FILTER: Option<&'static str> = Some("my_gigs");
    type Create = NewGig;
    type Update = GigUpdate;
}

impl Resource for WantedItem {
    const PATH: &'static str = "/wanted-items/";
    type Create = NewWantedItem;
    type Update = WantedItemUpdate;
}

impl Resource for Note {
    const PATH: &'static str = "/notes/";
    type Create = NewNote;
    type Update = NoteUpdate;
}

impl IntoRequestBody for NewItem {
    fn into_request_body(self) -> Result<RequestBody, ClientError> {
        RequestBody::multipart(&self, [("image", self.image.as_ref())])
    }
}

impl IntoRequestBody for ItemUpdate {
    fn into_request_body(self) -> Result<RequestBody, ClientError> {
        RequestBody::multipart(&self, [("image", self.image.as_ref())])
    }
}

impl IntoRequestBody for NewNote {
    fn into_request_body(self) -> Result<RequestBody, ClientError> {
        RequestBody::with_files(&self, [("file", self.file.as_ref())])
    }
}

macro_rules! json_body {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoRequestBody for $ty {
                fn into_request_body(self) -> Result<RequestBody, ClientError> {
                    RequestBody::json(&self)
                }
            }
        )*
    };
}

json_body!(NewGig, GigUpdate, NewWantedItem, WantedItemUpdate, NoteUpdate);

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    mine: bool,
    params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the caller's own records; makes the listing an authenticated call
    pub fn mine(mut self) -> Self {
        self.mine = true;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// Handle on one collection, borrowed from a client
pub struct Collection<'a, R> {
    client: &'a CampusClient,
    _resource: PhantomData<R>,
}

impl<R: Resource> Collection<'_, R> {
    fn detail_path(id: u64) -> String {
        format!("{}{id}/", R::PATH)
    }

    /// List records; public unless restricted to the caller's own
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<R>, ClientError> {
        let mut options = RequestOptions::get();
        let mut auth = AuthMode::Public;

        if query.mine {
            match R::OWNER_FILTER {
                Some(filter) => {
                    options = options.query(filter, "true");
                    auth = AuthMode::Required;
                }
                None => {
                    return Err(ClientError::Configuration(format!(
                        "{} has no owner filter",
                        R::PATH
                    )));
                }
            }
        }
        for (key, value) in &query.params {
            options = options.query(key.clone(), value.clone());
        }

        match self.client.request(R::PATH, &options, auth).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, id: u64) -> Result<R, ClientError> {
        self.client
            .request_json(&Self::detail_path(id), &RequestOptions::get(), AuthMode::Public)
            .await
    }

    pub async fn create(&self, record: R::Create) -> Result<R, ClientError> {
        let options = RequestOptions::post(record.into_request_body()?);
        self.client
            .request_json(R::PATH, &options, AuthMode::Required)
            .await
    }

    /// Partial update (PATCH)
    pub async fn update(&self, id: u64, changes: R::Update) -> Result<R, ClientError> {
        let options = RequestOptions::patch(changes.into_request_body()?);
        self.client
            .request_json(&Self::detail_path(id), &options, AuthMode::Required)
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<Option<Value>, ClientError> {
        self.client
            .request(&Self::detail_path(id), &RequestOptions::delete(), AuthMode::Required)
            .await
    }
}

impl CampusClient {
    pub fn collection<R: Resource>(&self) -> Collection<'_, R> {
        Collection {
            client: self,
            _resource: PhantomData,
        }
    }

    pub fn items(&self) -> Collection<'_, Item> {
        self.collection()
    }

    pub fn gigs(&self) -> Collection<'_, Gig> {
        self.collection()
    }

    pub fn wanted_items(&self) -> Collection<'_, WantedItem> {
        self.collection()
    }

    pub fn notes(&self) -> Collection<'_, Note> {
        self.collection()
    }
}
