use std::borrow::{Borrow, Cow};
use std::{fmt, hash};

use crate::logs::AnyValue;

/// Name of a log attribute, map entry or resource attribute.
///
/// Keys built from string literals borrow them; the const
/// [`Key::from_static_str`] allows keys in `const` items.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// A key for `name`.
    ///
    /// ```
    /// use otellogs::Key;
    ///
    /// let literal = Key::new("http.method");
    /// let owned = Key::new(format!("retry.{}", 2));
    /// assert_eq!(owned.as_str(), "retry.2");
    /// # let _ = literal;
    /// ```
    pub fn new(name: impl Into<Key>) -> Self {
        name.into()
    }

    /// A key borrowing a literal, usable in `const` context.
    pub const fn from_static_str(name: &'static str) -> Self {
        Key(Cow::Borrowed(name))
    }

    /// The key's text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key(Cow::Owned(name))
    }
}

impl From<Cow<'static, str>> for Key {
    fn from(name: Cow<'static, str>) -> Self {
        Key(name)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// An attribute of a resource or of an instrumentation scope.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct KeyValue {
    /// Attribute name.
    pub key: Key,

    /// Attribute value.
    pub value: AnyValue,
}

impl KeyValue {
    /// Pairs `key` with `value`.
    pub fn new(key: impl Into<Key>, value: impl Into<AnyValue>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Names the library or module that produced a log record.
///
/// Two scopes are the same scope when their name, version and schema URL
/// agree. Attributes ride along but are ignored when grouping records.
#[derive(Debug, Default, Clone)]
pub struct InstrumentationScope {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
}

impl InstrumentationScope {
    /// Starts a scope named `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> InstrumentationScopeBuilder {
        InstrumentationScopeBuilder {
            scope: InstrumentationScope {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Scope name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope version, if set.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Schema URL, if set.
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// Scope attributes in the order they were given.
    pub fn attributes(&self) -> impl Iterator<Item = &KeyValue> {
        self.attributes.iter()
    }

    fn identity(&self) -> (&str, Option<&str>, Option<&str>) {
        (self.name(), self.version(), self.schema_url())
    }
}

impl PartialEq for InstrumentationScope {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for InstrumentationScope {}

impl hash::Hash for InstrumentationScope {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state)
    }
}

/// Builder for [`InstrumentationScope`].
///
/// ```
/// let scope = otellogs::InstrumentationScope::builder("billing")
///     .with_version("2.4.1")
///     .build();
/// assert_eq!(scope.version(), Some("2.4.1"));
/// ```
#[derive(Debug)]
pub struct InstrumentationScopeBuilder {
    scope: InstrumentationScope,
}

impl InstrumentationScopeBuilder {
    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.scope.version = Some(version.into());
        self
    }

    /// Sets the schema URL.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.scope.schema_url = Some(schema_url.into());
        self
    }

    /// Replaces the attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.scope.attributes = attributes.into_iter().collect();
        self
    }

    /// Finishes the scope.
    pub fn build(self) -> InstrumentationScope {
        self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn borrowed_and_owned_keys_are_equal() {
        const NAME: Key = Key::from_static_str("service.name");
        let owned = Key::from(String::from("service.name"));
        let cow = Key::from(Cow::<'static, str>::Owned("service.name".into()));

        assert_eq!(NAME, owned);
        assert_eq!(owned, cow);
        assert_eq!(format!("{NAME} {NAME:?}"), "service.name \"service.name\"");
    }

    #[test]
    fn scope_identity_ignores_attributes() {
        let with_attrs = InstrumentationScope::builder("lib")
            .with_version("1.0")
            .with_attributes([KeyValue::new("k", "v")])
            .build();
        let without_attrs = InstrumentationScope::builder("lib")
            .with_version("1.0")
            .build();
        assert_eq!(with_attrs, without_attrs);

        let mut set = HashSet::new();
        set.insert(with_attrs);
        assert!(set.contains(&without_attrs));
    }

    #[test]
    fn scope_schema_url_takes_part_in_identity() {
        let plain = InstrumentationScope::builder("lib").build();
        let versioned_schema = InstrumentationScope::builder("lib")
            .with_schema_url("https://opentelemetry.io/schemas/1.21.0")
            .build();

        assert_ne!(plain, versioned_schema);
        assert_eq!(versioned_schema.attributes().count(), 0);
    }
}
