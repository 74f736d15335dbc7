///
/// HierarchyKind
///
/// The five hierarchy container kinds. Each Catalog hierarchy is
/// tagged with exactly one kind for its lifetime.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HierarchyKind {
    EntityList,
    EntitySet,
    EntityDir,
    EntityTree,
    AspectMap,
}

impl HierarchyKind {
    /// Three-letter-ish wire tag used by the JSON codec and, by
    /// extension, the `hierarchy_type` column of the SQL schema.
    #[must_use]
    pub const fn type_code(self) -> &'static str {
        match self {
            Self::EntityList => "ENTITY_LIST",
            Self::EntitySet => "ENTITY_SET",
            Self::EntityDir => "ENTITY_DIR",
            Self::EntityTree => "ENTITY_TREE",
            Self::AspectMap => "ASPECT_MAP",
        }
    }

    #[must_use]
    pub fn from_type_code(code: &str) -> Option<Self> {
        Some(match code {
            "ENTITY_LIST" => Self::EntityList,
            "ENTITY_SET" => Self::EntitySet,
            "ENTITY_DIR" => Self::EntityDir,
            "ENTITY_TREE" => Self::EntityTree,
            "ASPECT_MAP" => Self::AspectMap,
            _ => return None,
        })
    }
}

impl std::fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_code())
    }
}

///
/// HierarchyDef
///
/// Definition-time declaration of one hierarchy: its name, kind, and
/// whether it is modifiable after construction (CatalogDef).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HierarchyDef {
    name: String,
    kind: HierarchyKind,
    modifiable: bool,
}

impl HierarchyDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: HierarchyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiable: true,
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> HierarchyKind {
        self.kind
    }

    #[must_use]
    pub const fn is_modifiable(&self) -> bool {
        self.modifiable
    }
}
