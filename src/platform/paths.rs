//! Path template resolution.
//!
//! Profiles name locations as templates such as `%ProgramFiles%\Adobe` or
//! `~/.config/autostart`. A template that references a variable which is
//! not set resolves to nothing: a missing `%ProgramFiles(x86)%` on a 32-bit
//! system must not collapse into a relative `\Adobe`.

use camino::Utf8PathBuf;
use indexmap::IndexMap;

/// Resolves path templates against a set of environment variables.
#[derive(Debug, Clone)]
pub struct PathResolver {
    vars: IndexMap<String, String>,
    home: Option<Utf8PathBuf>,
    temp_dir: Utf8PathBuf,
}

impl PathResolver {
    /// Resolver backed by the process environment.
    ///
    /// `temp_override` replaces the OS temp directory when set.
    pub fn from_env(temp_override: Option<&str>) -> Self {
        let vars = std::env::vars()
            .map(|(name, value)| (name.to_uppercase(), value))
            .collect();
        let home = dirs::home_dir().and_then(|h| Utf8PathBuf::from_path_buf(h).ok());
        let temp_dir = match temp_override {
            Some(dir) => Utf8PathBuf::from(dir),
            None => Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned())),
        };
        Self {
            vars,
            home,
            temp_dir,
        }
    }

    /// Resolver over an explicit variable set.
    pub fn with_vars<I, K, V>(vars: I, home: Option<&str>, temp_dir: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into().to_uppercase(), v.into()))
                .collect(),
            home: home.map(Utf8PathBuf::from),
            temp_dir: Utf8PathBuf::from(temp_dir),
        }
    }

    pub fn temp_dir(&self) -> &Utf8PathBuf {
        &self.temp_dir
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&name.to_uppercase())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Expand `%VAR%`, `${VAR}` and a leading `~`.
    ///
    /// Returns `None` when any referenced variable is unset.
    pub fn resolve(&self, template: &str) -> Option<Utf8PathBuf> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        if let Some(after) = rest.strip_prefix('~') {
            if after.is_empty() || after.starts_with('/') || after.starts_with('\\') {
                out.push_str(self.home.as_ref()?.as_str());
                rest = after;
            }
        }

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('%') {
                let end = after.find('%')?;
                out.push_str(self.var(&after[..end])?);
                rest = &after[end + 1..];
            } else if let Some(after) = rest.strip_prefix("${") {
                let end = after.find('}')?;
                out.push_str(self.var(&after[..end])?);
                rest = &after[end + 1..];
            } else {
                let next = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| *c == '%' || *c == '$')
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                out.push_str(&rest[..next]);
                rest = &rest[next..];
            }
        }

        Some(Utf8PathBuf::from(out))
    }

    /// Resolve every template, dropping unresolvable ones and duplicates.
    pub fn resolve_all(&self, templates: &[String]) -> Vec<Utf8PathBuf> {
        let mut resolved: Vec<Utf8PathBuf> = Vec::new();
        for template in templates {
            match self.resolve(template) {
                Some(path) => {
                    let lowered = path.as_str().to_lowercase();
                    if !resolved.iter().any(|p| p.as_str().to_lowercase() == lowered) {
                        resolved.push(path);
                    }
                }
                None => tracing::debug!("Skipping unresolvable path template: {}", template),
            }
        }
        resolved
    }
}
