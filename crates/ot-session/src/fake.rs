//! Scripted browser for login tests.

use std::collections::HashMap;

use crate::browser::{Browser, BrowserCookie, ElementHandle};
use crate::error::AuthError;

/// Elements become visible once the given number of form submits happened.
#[derive(Debug, Default)]
pub(crate) struct FakeBrowser {
    pub visible_after: HashMap<String, usize>,
    pub submits: usize,
    pub typed: Vec<(String, String)>,
    pub navigated: Vec<String>,
    pub local_storage: HashMap<String, String>,
    pub cookies: Vec<BrowserCookie>,
    pub quit_calls: usize,
}

impl FakeBrowser {
    pub fn happy_path() -> Self {
        let mut browser = Self::default()
            .with_element("ot_form-element_0", 0)
            .with_element("okta-signin-username", 1)
            .with_element("okta-signin-password", 1)
            .with_element("MyApps", 2);
        browser
            .local_storage
            .insert("access_token".to_string(), "token-123".to_string());
        browser.cookies.push(BrowserCookie {
            name: "JSESSIONID".to_string(),
            value: "abc".to_string(),
        });
        browser
    }

    pub fn with_element(mut self, id: &str, after_submits: usize) -> Self {
        self.visible_after.insert(id.to_string(), after_submits);
        self
    }

    pub fn without(mut self, id: &str) -> Self {
        self.visible_after.remove(id);
        self
    }
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), AuthError> {
        self.navigated.push(url.to_string());
        Ok(())
    }

    fn find_by_id(&mut self, id: &str) -> Result<Option<ElementHandle>, AuthError> {
        Ok(self
            .visible_after
            .get(id)
            .filter(|after| self.submits >= **after)
            .map(|_| ElementHandle(id.to_string())))
    }

    fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), AuthError> {
        self.typed.push((element.0.clone(), text.to_string()));
        Ok(())
    }

    fn submit(&mut self, _element: &ElementHandle) -> Result<(), AuthError> {
        self.submits += 1;
        Ok(())
    }

    fn local_storage_item(&mut self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.local_storage.get(key).cloned())
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError> {
        Ok(self.cookies.clone())
    }

    fn quit(&mut self) -> Result<(), AuthError> {
        self.quit_calls += 1;
        Ok(())
    }
}
