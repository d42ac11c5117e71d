//! Shell variables
//!
//! Every variable holds a list of words. Functions live in the same table
//! under the `fn-` prefix, which is what completion expects.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use xs_input::Namespace;
use xs_input::completion::FUNCTION_PREFIX;

/// Shared variable table; clones see the same variables.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    table: Rc<RefCell<BTreeMap<String, Vec<String>>>>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import the process environment. `PATH` becomes the list `path` and
    /// `HOME` becomes `home`; everything else keeps its name.
    pub fn from_env() -> Self {
        let vars = Vars::new();
        for (name, value) in std::env::vars() {
            match name.as_str() {
                "PATH" => vars.set(
                    "path",
                    value
                        .split(':')
                        .map(|dir| if dir.is_empty() { "." } else { dir })
                        .map(str::to_string)
                        .collect(),
                ),
                "HOME" => vars.set("home", vec![value]),
                _ => vars.set(&name, vec![value]),
            }
        }
        vars
    }

    pub fn get(&self, name: &str) -> Option<Vec<String>> {
        self.table.borrow().get(name).cloned()
    }

    /// Set `name`; an empty list removes it.
    pub fn set(&self, name: &str, value: Vec<String>) {
        let mut table = self.table.borrow_mut();
        if value.is_empty() {
            table.remove(name);
        } else {
            table.insert(name.to_string(), value);
        }
    }

    pub fn function(&self, name: &str) -> Option<Vec<String>> {
        self.get(&format!("{}{}", FUNCTION_PREFIX, name))
    }

    pub fn define_function(&self, name: &str, body: Vec<String>) {
        self.set(&format!("{}{}", FUNCTION_PREFIX, name), body);
    }
}

impl Namespace for Vars {
    fn search_path(&self) -> Vec<PathBuf> {
        self.get("path")
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn names(&self) -> Vec<String> {
        self.table.borrow().keys().cloned().collect()
    }
}
