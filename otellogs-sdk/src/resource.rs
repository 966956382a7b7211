//! Representations of entities producing telemetry.
//!
//! A [Resource] is an immutable set of attributes describing the entity that
//! produces logs, for example a service name and its version. One resource is
//! attached to a [`SdkLoggerProvider`](crate::logs::SdkLoggerProvider) and
//! shared by every record it emits.
use otellogs::logs::AnyValue;
use otellogs::{Key, KeyValue};
use std::borrow::Cow;

/// Logical name of the service.
pub const SERVICE_NAME: &str = "service.name";
/// The name of the telemetry SDK.
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
/// The language of the telemetry SDK.
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
/// The version string of the telemetry SDK.
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";

/// An immutable representation of the entity producing telemetry as
/// attributes.
///
/// Attributes keep insertion order; adding a key that already exists replaces
/// its value in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    attrs: Vec<(Key, AnyValue)>,
    schema_url: Option<Cow<'static, str>>,
}

impl Default for Resource {
    /// The SDK provided resource: `service.name=unknown_service` plus the
    /// `telemetry.sdk.*` attributes.
    fn default() -> Self {
        Resource::builder_empty()
            .with_service_name("unknown_service")
            .with_attributes([
                KeyValue::new(TELEMETRY_SDK_NAME, "otellogs"),
                KeyValue::new(TELEMETRY_SDK_LANGUAGE, "rust"),
                KeyValue::new(TELEMETRY_SDK_VERSION, env!("CARGO_PKG_VERSION")),
            ])
            .build()
    }
}

impl Resource {
    /// A builder starting from [`Resource::default`].
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource::default(),
        }
    }

    /// A builder starting from an empty resource.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource::empty(),
        }
    }

    /// A resource with no attributes and no schema URL.
    pub fn empty() -> Self {
        Resource {
            attrs: Vec::new(),
            schema_url: None,
        }
    }

    /// Returns the schema URL, if any.
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if the resource has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterates attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &AnyValue)> {
        self.attrs.iter().map(|(k, v)| (k, v))
    }

    /// Retrieve the value for `key`.
    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        self.attrs
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    fn upsert(&mut self, kv: KeyValue) {
        match self.attrs.iter_mut().find(|(k, _)| *k == kv.key) {
            Some(slot) => slot.1 = kv.value,
            None => self.attrs.push((kv.key, kv.value)),
        }
    }
}

/// Builder to allow easy composition of a [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    /// Add a [KeyValue] to the resource.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.resource.upsert(kv);
        self
    }

    /// Add multiple [KeyValue]s to the resource.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        for kv in kvs {
            self.resource.upsert(kv);
        }
        self
    }

    /// Add the `service.name` attribute.
    pub fn with_service_name(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.with_attribute(KeyValue::new(SERVICE_NAME, AnyValue::String(name.into())))
    }

    /// Set the schema URL. An empty string clears it.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        let schema_url = schema_url.into();
        self.resource.schema_url = (!schema_url.is_empty()).then_some(schema_url);
        self
    }

    /// Create a [Resource] with the options provided to the [ResourceBuilder].
    pub fn build(self) -> Resource {
        self.resource
    }
}
