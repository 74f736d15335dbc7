use crate::value::Value;
use catalog_primitives::PropertyType;

///
/// PropertyDef
///
/// A single typed, flagged slot within an `AspectDef`. Immutable
/// after construction; equality is structural over all fields.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    name: String,
    property_type: PropertyType,
    default: Option<Value>,
    readable: bool,
    writable: bool,
    nullable: bool,
    removable: bool,
    multivalued: bool,
}

impl PropertyDef {
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            default: None,
            readable: true,
            writable: true,
            nullable: true,
            removable: true,
            multivalued: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub const fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    #[must_use]
    pub const fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub const fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    #[must_use]
    pub const fn multivalued(mut self, multivalued: bool) -> Self {
        self.multivalued = multivalued;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        self.property_type
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn is_removable(&self) -> bool {
        self.removable
    }

    #[must_use]
    pub const fn is_multivalued(&self) -> bool {
        self.multivalued
    }
}
