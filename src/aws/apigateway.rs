/// REST API route table
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::resource::{Declare, Reference};

/// What a route resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum RouteTarget {
    /// Invoke a declared function
    Function(Reference),
    /// Serve files from a local directory (uploaded by the engine)
    StaticDir(PathBuf),
}

/// One entry in the API's route table
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSpec {
    pub path: String,
    pub method: Option<String>,
    pub target: RouteTarget,
}

impl RouteSpec {
    /// `method path` invoking a function
    pub fn function(path: impl Into<String>, method: impl Into<String>, handler: Reference) -> Self {
        Self {
            path: path.into(),
            method: Some(method.into()),
            target: RouteTarget::Function(handler),
        }
    }

    /// Static content under `path`
    pub fn static_dir(path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            method: None,
            target: RouteTarget::StaticDir(dir.into()),
        }
    }
}

impl Serialize for RouteSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("path", &self.path)?;
        if let Some(method) = &self.method {
            map.serialize_entry("method", method)?;
        }
        match &self.target {
            RouteTarget::Function(handler) => map.serialize_entry("eventHandler", handler)?,
            RouteTarget::StaticDir(dir) => map.serialize_entry("localPath", dir)?,
        }
        map.end()
    }
}

/// REST API component; routes are kept exactly in declaration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestApiSpec {
    routes: Vec<RouteSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

impl RestApiSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. No deduplication or reordering happens here.
    pub fn route(mut self, route: RouteSpec) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }
}

impl Declare for RestApiSpec {
    const TYPE_TOKEN: &'static str = "aws-apigateway:index:RestAPI";
}
