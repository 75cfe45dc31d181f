use crate::config::ScopeConfig;
use crate::core::{DbcError, DbcResult};
use crate::registry::Driver;
use regex::{Regex, RegexBuilder};

/// Case-insensitive filter over registry listings.
///
/// A pattern matches a driver's path and title, and its description unless
/// `names_only` is set. No pattern matches everything.
#[derive(Debug)]
pub struct DriverQuery {
    matcher: Option<Regex>,
    names_only: bool,
}

impl DriverQuery {
    pub fn new(pattern: Option<&str>, names_only: bool) -> DbcResult<Self> {
        let matcher = pattern
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| DbcError::Config(format!("Invalid search pattern '{}': {}", p, e)))
            })
            .transpose()?;
        Ok(Self {
            matcher,
            names_only,
        })
    }

    pub fn matches(&self, driver: &Driver) -> bool {
        match &self.matcher {
            None => true,
            Some(re) => {
                re.is_match(&driver.path)
                    || re.is_match(&driver.title)
                    || (!self.names_only && re.is_match(&driver.description))
            }
        }
    }

    pub fn filter<'a>(&self, drivers: &'a [Driver]) -> Vec<&'a Driver> {
        drivers.iter().filter(|d| self.matches(d)).collect()
    }
}

/// ` [installed: env=>1.1.0, user=>1.0.0]` in scope order, or empty
pub fn installed_annotation(scopes: &[ScopeConfig], id: &str) -> String {
    let installed: Vec<String> = scopes
        .iter()
        .filter_map(|scope| {
            scope
                .installed(id)
                .map(|r| format!("{}=>{}", scope.level, r.version))
        })
        .collect();

    if installed.is_empty() {
        String::new()
    } else {
        format!(" [installed: {}]", installed.join(", "))
    }
}
