//! Rails-like request router.
//!
//! Routes are `/`-delimited patterns made of literal segments and `:name` variables,
//! each carrying default params. Matching is an ordered elimination: a candidate is
//! dropped as soon as one of its literal segments differs from the path segment at the
//! same index, or when its segment count differs from the path's. The first survivor in
//! registration order wins.

use crate::error::{AppError, ConfigError};
use crate::params::{ParamValue, Params};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Var(String),
}

#[derive(Clone, Debug)]
pub struct Route {
    pub pattern: String,
    pub segments: Vec<Segment>,
    pub defaults: Params,
}

impl Route {
    pub fn parse(pattern: &str, defaults: Params) -> Result<Self, ConfigError> {
        if pattern.trim().is_empty() {
            return Err(ConfigError::MissingPattern);
        }
        let segments = split_path(pattern)
            .into_iter()
            .map(|s| match s.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Var(name.to_string()),
                _ => Segment::Literal(s.to_string()),
            })
            .collect();
        Ok(Route {
            pattern: pattern.to_string(),
            segments,
            defaults,
        })
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    fn admits(&self, index: usize, part: &str) -> bool {
        match self.segments.get(index) {
            Some(Segment::Var(_)) => true,
            Some(Segment::Literal(lit)) => lit == part,
            None => false,
        }
    }
}

/// Path segments without leading/trailing slashes; the root path has none.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// `:var` bindings taken from the path.
    pub bindings: Params,
}

#[derive(Clone, Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    defaults: Params,
    base_path: String,
    public_url: Option<String>,
}

impl Router {
    /// Router with params applied to every request (lowest priority).
    pub fn new(defaults: Params) -> Self {
        Router {
            routes: Vec::new(),
            defaults,
            base_path: String::new(),
            public_url: None,
        }
    }

    /// Mount point of the application and its public `scheme://host[:port]`.
    pub fn with_base(mut self, base_path: &str, public_url: Option<String>) -> Self {
        self.base_path = base_path.trim_end_matches('/').to_string();
        self.public_url = public_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn add(&mut self, pattern: &str, defaults: Params) -> Result<(), ConfigError> {
        let route = Route::parse(pattern, defaults)?;
        tracing::debug!(pattern = %route.pattern, "route added");
        self.routes.push(route);
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// `path` below the mount point; paths outside it match nothing.
    fn relative<'p>(&self, path: &'p str) -> Result<&'p str, AppError> {
        if self.base_path.is_empty() {
            return Ok(path);
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => Ok("/"),
            Some(rest) if rest.starts_with('/') => Ok(rest),
            _ => Err(AppError::NotFound(format!(
                "'{}' is outside the mount point '{}'",
                path, self.base_path
            ))),
        }
    }

    pub fn match_path(&self, path: &str) -> Result<RouteMatch<'_>, AppError> {
        let parts = split_path(self.relative(path)?);
        let mut candidates: Vec<&Route> = self.routes.iter().collect();
        for (i, part) in parts.iter().enumerate() {
            candidates.retain(|r| r.admits(i, part));
        }
        candidates.retain(|r| r.segments.len() == parts.len());
        let route = candidates
            .first()
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("no route matching '{}'", path)))?;

        let mut bindings = Params::new();
        for (segment, part) in route.segments.iter().zip(parts.iter()) {
            if let Segment::Var(name) = segment {
                bindings.insert(name.clone(), ParamValue::Text((*part).to_string()));
            }
        }
        Ok(RouteMatch { route, bindings })
    }

    /// Match `path` and merge params: router defaults < route defaults < path variables < request params.
    pub fn route(&self, path: &str, request: Params) -> Result<Params, AppError> {
        let matched = self.match_path(path)?;
        tracing::info!(path = %path, pattern = %matched.route.pattern, "matched route");
        let mut params = self.defaults.clone();
        params.merge(matched.route.defaults.clone());
        params.merge(matched.bindings);
        params.merge(request);
        tracing::debug!(params = ?params, "final params");
        Ok(params)
    }

    /// Reverse routing: substitute `params` into a route pattern.
    ///
    /// With `pattern`, that route is used; otherwise the first route whose variables are
    /// all present in `params`.
    pub fn url_from(
        &self,
        params: &Params,
        pattern: Option<&str>,
        suffix: Option<&str>,
        full: bool,
    ) -> Result<String, AppError> {
        let route = match pattern {
            Some(p) => self
                .routes
                .iter()
                .find(|r| r.pattern == p)
                .ok_or_else(|| AppError::NotFound(format!("no route with pattern '{}'", p)))?,
            None => self
                .routes
                .iter()
                .find(|r| r.variables().all(|v| params.text(v).is_some()))
                .ok_or_else(|| AppError::BadRequest("no route can be built from the given params".into()))?,
        };
        let mut parts = Vec::with_capacity(route.segments.len());
        for segment in &route.segments {
            match segment {
                Segment::Literal(lit) => parts.push(lit.clone()),
                Segment::Var(name) => {
                    let value = params.text(name).ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "missing route parameter ':{}' for '{}'",
                            name, route.pattern
                        ))
                    })?;
                    parts.push(value.to_string());
                }
            }
        }
        let mut url = String::new();
        if full {
            if let Some(public) = &self.public_url {
                url.push_str(public);
            }
        }
        url.push_str(&self.base_path);
        url.push('/');
        url.push_str(&parts.join("/"));
        if let Some(suffix) = suffix {
            url.push_str(suffix);
        }
        Ok(url)
    }

    /// Target of an `xredirect` param, relative to the mount point.
    pub fn redirect_url(&self, target: &str) -> String {
        format!("{}/{}", self.base_path, target.trim_start_matches('/'))
    }
}
