//! The minimal browser surface the login flow drives.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Opaque reference to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
}

pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<(), AuthError>;

    /// Looks the element up once. `Ok(None)` means it is not on the page yet.
    fn find_by_id(&mut self, id: &str) -> Result<Option<ElementHandle>, AuthError>;

    fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), AuthError>;

    /// Submits the form the element belongs to.
    fn submit(&mut self, element: &ElementHandle) -> Result<(), AuthError>;

    fn local_storage_item(&mut self, key: &str) -> Result<Option<String>, AuthError>;

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError>;

    /// Ends the browser session. Called exactly once per login attempt.
    fn quit(&mut self) -> Result<(), AuthError>;
}
